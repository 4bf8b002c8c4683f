//! The process registry file.
//!
//! ```text
//! <supervisor pid>
//! <sync object id>
//! <pid> <service name>
//! <pid> <service name>
//! ```
//!
//! Only the supervisor writes it, always in full. Readers go by line
//! position and must cope with a file caught in the middle of a rewrite:
//! bad service lines are skipped, never fatal.

use std::fmt;
use std::io;
use std::path::Path;

use serde::Serialize;

use crate::error::RegistryError;

pub const LINE_SUPERVISOR_PID: usize = 0;
pub const LINE_SYNC_OBJECT_ID: usize = 1;
pub const LINE_FIRST_SERVICE: usize = 2;

/// Services a pg_autoctl supervisor is known to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceName {
	Postgres,
	Listener,
	NodeActive,
}

impl ServiceName {
	/// Name as registered in the pid file.
	pub fn as_str(&self) -> &'static str {
		match self {
			ServiceName::Postgres => "postgres",
			ServiceName::Listener => "listener",
			ServiceName::NodeActive => "node active",
		}
	}

	/// Name as typed on the command line.
	pub fn cli_name(&self) -> &'static str {
		match self {
			ServiceName::Postgres => "postgres",
			ServiceName::Listener => "listener",
			ServiceName::NodeActive => "node-active",
		}
	}

	pub fn from_name(name: &str) -> Option<Self> {
		match name {
			"postgres" => Some(ServiceName::Postgres),
			"listener" => Some(ServiceName::Listener),
			"node active" | "node-active" => Some(ServiceName::NodeActive),
			_ => None,
		}
	}
}

impl fmt::Display for ServiceName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceEntry {
	pub pid: i32,
	pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProcessRegistry {
	#[serde(rename = "pid")]
	pub supervisor_pid: Option<i32>,
	/// Owned by the supervisor; carried through untouched.
	#[serde(rename = "semId")]
	pub sync_object_id: Option<String>,
	pub services: Vec<ServiceEntry>,
}

impl ProcessRegistry {
	pub fn new(supervisor_pid: i32, sync_object_id: impl Into<String>) -> Self {
		Self {
			supervisor_pid: Some(supervisor_pid),
			sync_object_id: Some(sync_object_id.into()),
			services: Vec::new(),
		}
	}

	pub fn parse(contents: &str) -> Self {
		let mut registry = ProcessRegistry::default();

		for (number, line) in contents.lines().enumerate() {
			let line = line.trim_end_matches('\r');

			match number {
				LINE_SUPERVISOR_PID => match line.trim().parse() {
					Ok(pid) => registry.supervisor_pid = Some(pid),
					Err(_) => tracing::debug!("Failed to parse supervisor pid \"{}\"", line),
				},
				LINE_SYNC_OBJECT_ID => {
					let id = line.trim();
					if !id.is_empty() {
						registry.sync_object_id = Some(id.to_string());
					}
				}
				_ => {
					if line.trim().is_empty() {
						continue;
					}
					if let Some(entry) = parse_service_line(line) {
						registry.services.push(entry);
					}
				}
			}
		}

		registry
	}

	/// First entry with this name, in file order.
	pub fn find(&self, name: &str) -> Option<&ServiceEntry> {
		self.services.iter().find(|entry| entry.name == name)
	}

	pub fn set_service(&mut self, name: &str, pid: Option<i32>) {
		let position = self.services.iter().position(|entry| entry.name == name);
		match (position, pid) {
			(Some(i), Some(pid)) => self.services[i].pid = pid,
			(Some(i), None) => {
				self.services.remove(i);
			}
			(None, Some(pid)) => self.services.push(ServiceEntry { pid, name: name.to_string() }),
			(None, None) => {}
		}
	}
}

impl fmt::Display for ProcessRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.supervisor_pid {
			Some(pid) => writeln!(f, "{}", pid)?,
			None => writeln!(f)?,
		}
		writeln!(f, "{}", self.sync_object_id.as_deref().unwrap_or(""))?;
		for entry in &self.services {
			writeln!(f, "{} {}", entry.pid, entry.name)?;
		}
		Ok(())
	}
}

fn parse_service_line(line: &str) -> Option<ServiceEntry> {
	let Some((pid, name)) = line.split_once(' ') else {
		tracing::debug!("Failed to find a space separator in line: \"{}\"", line);
		return None;
	};
	match pid.parse() {
		Ok(pid) if !name.is_empty() => Some(ServiceEntry { pid, name: name.to_string() }),
		_ => {
			tracing::debug!("Failed to parse service pid and name in line: \"{}\"", line);
			None
		}
	}
}

pub fn parse_registry(path: &Path) -> Result<ProcessRegistry, RegistryError> {
	let contents = match std::fs::read_to_string(path) {
		Ok(c) => c,
		Err(e) if e.kind() == io::ErrorKind::NotFound => {
			return Err(RegistryError::NotFound(path.to_path_buf()));
		}
		Err(e) => {
			return Err(RegistryError::Io { path: path.to_path_buf(), source: e });
		}
	};

	if contents.trim().is_empty() {
		return Err(RegistryError::Malformed {
			path: path.to_path_buf(),
			reason: "file is empty".to_string(),
		});
	}

	Ok(ProcessRegistry::parse(&contents))
}

pub fn read_supervisor_pid(path: &Path) -> Result<i32, RegistryError> {
	parse_registry(path)?
		.supervisor_pid
		.ok_or_else(|| RegistryError::Malformed {
			path: path.to_path_buf(),
			reason: "first line is not a pid".to_string(),
		})
}

/// Replace the registry file as a whole, so readers see either the old or the new contents.
pub fn write_registry(path: &Path, registry: &ProcessRegistry) -> io::Result<()> {
	if let Some(dir) = path.parent() {
		std::fs::create_dir_all(dir)?;
	}
	let mut tmp = path.as_os_str().to_owned();
	tmp.push(".tmp");
	std::fs::write(&tmp, registry.to_string())?;
	std::fs::rename(&tmp, path)
}
