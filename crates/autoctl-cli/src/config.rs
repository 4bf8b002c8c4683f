use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use autoctl_control::{PostgresSetup, ServiceName};
use autoctl_supervisor::ServiceSpec;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("Configuration file \"{}\" does not exist", .0.display())]
	NotFound(PathBuf),
	#[error("Failed to read configuration file \"{}\": {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("Failed to parse configuration file \"{}\": {source}", path.display())]
	Parse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},
	#[error("Unrecognized configuration file \"{}\"", .0.display())]
	Unrecognized(PathBuf),
	#[error("No command configured for the {service} service in \"{}\"", path.display())]
	MissingCommand { service: ServiceName, path: PathBuf },
}

// ── Roles ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	Monitor,
	Keeper,
}

impl Role {
	fn from_name(name: &str) -> Option<Self> {
		match name {
			"monitor" => Some(Role::Monitor),
			"keeper" => Some(Role::Keeper),
			_ => None,
		}
	}
}

impl std::fmt::Display for Role {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Role::Monitor => write!(f, "monitor"),
			Role::Keeper => write!(f, "keeper"),
		}
	}
}

/// Reads only `pg_autoctl.role` from the configuration file.
pub fn probe_role(path: &Path) -> Result<Role, ConfigError> {
	let content = read_config(path)?;
	let value: toml::Value = toml::from_str(&content).map_err(|source| ConfigError::Parse {
		path: path.to_path_buf(),
		source,
	})?;

	let role = value
		.get("pg_autoctl")
		.and_then(|section| section.get("role"))
		.and_then(|role| role.as_str())
		.and_then(Role::from_name)
		.ok_or_else(|| ConfigError::Unrecognized(path.to_path_buf()))?;

	tracing::debug!("Probed configuration file \"{}\": role is {}", path.display(), role);
	Ok(role)
}

// ── pg_autoctl.toml format ───────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
	pub pg_autoctl: NodeSection,
	#[serde(default)]
	pub postgresql: PostgresqlConfig,
	#[serde(default)]
	pub supervisor: SupervisorSection,
	#[serde(default)]
	pub services: BTreeMap<String, ServiceDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeSection {
	pub role: Role,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostgresqlConfig {
	pub host: Option<String>,
	#[serde(default = "default_port")]
	pub port: u16,
}

impl Default for PostgresqlConfig {
	fn default() -> Self {
		Self { host: None, port: default_port() }
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct SupervisorSection {
	#[serde(default = "default_restart_delay_ms")]
	pub restart_delay_ms: u64,
}

impl Default for SupervisorSection {
	fn default() -> Self {
		Self { restart_delay_ms: default_restart_delay_ms() }
	}
}

fn default_port() -> u16 {
	5432
}

fn default_restart_delay_ms() -> u64 {
	500
}

/// A service command: either a bare command string or a full table.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ServiceDef {
	Simple(String),
	Full {
		command: String,
		#[serde(default)]
		env: HashMap<String, String>,
	},
}

impl ServiceDef {
	fn into_spec(self, name: ServiceName) -> ServiceSpec {
		match self {
			ServiceDef::Simple(command) => ServiceSpec::shell(name.as_str(), &command),
			ServiceDef::Full { command, env } => {
				env.into_iter().fold(ServiceSpec::shell(name.as_str(), &command), |spec, (k, v)| spec.env(k, v))
			}
		}
	}
}

impl NodeConfig {
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let content = read_config(path)?;
		let config: NodeConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
			path: path.to_path_buf(),
			source,
		})?;
		tracing::debug!(
			"Loaded {} configuration from \"{}\" with {} service(s) configured",
			config.pg_autoctl.role,
			path.display(),
			config.services.len()
		);
		Ok(config)
	}

	/// Loads the file when present; a missing file is not an error.
	pub fn load_optional(path: &Path) -> Result<Option<Self>, ConfigError> {
		match Self::load(path) {
			Ok(config) => Ok(Some(config)),
			Err(ConfigError::NotFound(_)) => Ok(None),
			Err(e) => Err(e),
		}
	}

	pub fn restart_delay(&self) -> Duration {
		Duration::from_millis(self.supervisor.restart_delay_ms)
	}

	pub fn postgres_setup(&self, pgdata: &Path) -> PostgresSetup {
		PostgresSetup::new(pgdata)
			.with_host(self.postgresql.host.clone())
			.with_port(Some(self.postgresql.port))
	}

	fn service_def(&self, name: ServiceName) -> Option<&ServiceDef> {
		self.services
			.get(name.as_str())
			.or_else(|| self.services.get(name.cli_name()))
	}

	/// Resolves the command for `name`. Postgres falls back to the `postgres` binary.
	pub fn service_spec(&self, name: ServiceName, pgdata: &Path, path: &Path) -> Result<ServiceSpec, ConfigError> {
		let spec = match (self.service_def(name), name) {
			(Some(def), _) => def.clone().into_spec(name),
			(None, ServiceName::Postgres) => {
				let mut spec = ServiceSpec::new(name.as_str(), "postgres")
					.args(["-D".to_string(), pgdata.display().to_string()])
					.args(["-p".to_string(), self.postgresql.port.to_string()]);
				if let Some(host) = &self.postgresql.host {
					spec = spec.args(["-h".to_string(), host.clone()]);
				}
				spec
			}
			(None, _) => {
				return Err(ConfigError::MissingCommand { service: name, path: path.to_path_buf() });
			}
		};

		let spec = spec
			.env("PGDATA", pgdata.display().to_string())
			.env("PGPORT", self.postgresql.port.to_string());
		Ok(match &self.postgresql.host {
			Some(host) => spec.env("PGHOST", host.clone()),
			None => spec,
		})
	}
}

fn read_config(path: &Path) -> Result<String, ConfigError> {
	std::fs::read_to_string(path).map_err(|e| match e.kind() {
		std::io::ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
		_ => ConfigError::Io { path: path.to_path_buf(), source: e },
	})
}
