use std::io::{IsTerminal, Write};

use autoctl_control::{
	read_supervisor_pid, service_status, Control, DatabaseProbe, Kernel, Pathnames, RestartConfirmator, Restarted,
	ServiceName, Signaller, StatusSnapshot, StopMode,
};
use autoctl_supervisor::{Supervisor, SupervisorConfig};
use owo_colors::OwoColorize;

use crate::config::{self, NodeConfig, Role};
use crate::error::CommandError;

/// What `restart` acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RestartTarget {
	All,
	Postgres,
	Listener,
	NodeActive,
}

impl RestartTarget {
	fn service(self) -> Option<ServiceName> {
		match self {
			RestartTarget::All => None,
			RestartTarget::Postgres => Some(ServiceName::Postgres),
			RestartTarget::Listener => Some(ServiceName::Listener),
			RestartTarget::NodeActive => Some(ServiceName::NodeActive),
		}
	}
}

// ── run ──────────────────────────────────────────────────────────────────────

pub fn cmd_run(paths: &Pathnames) -> Result<(), CommandError> {
	let role = config::probe_role(&paths.config)?;
	tracing::debug!("Running pg_autoctl {} for PGDATA \"{}\"", role, paths.pgdata.display());

	match role {
		Role::Monitor => run_monitor(paths),
		Role::Keeper => run_keeper(paths),
	}
}

fn run_monitor(paths: &Pathnames) -> Result<(), CommandError> {
	let config = NodeConfig::load(&paths.config)?;
	if !paths.pgdata.is_dir() {
		return Err(CommandError::MissingPgdataDir(paths.pgdata.clone()));
	}
	log_database(&config, paths);

	let services = vec![
		config.service_spec(ServiceName::Postgres, &paths.pgdata, &paths.config)?,
		config.service_spec(ServiceName::Listener, &paths.pgdata, &paths.config)?,
	];
	supervise(paths, &config, services)
}

fn run_keeper(paths: &Pathnames) -> Result<(), CommandError> {
	let config = NodeConfig::load(&paths.config)?;
	if paths.pgdata.is_dir() {
		log_database(&config, paths);
	} else {
		tracing::info!("PGDATA \"{}\" does not exist yet", paths.pgdata.display());
	}

	let services = vec![
		config.service_spec(ServiceName::Postgres, &paths.pgdata, &paths.config)?,
		config.service_spec(ServiceName::NodeActive, &paths.pgdata, &paths.config)?,
	];
	supervise(paths, &config, services)
}

fn log_database(config: &NodeConfig, paths: &Pathnames) {
	let facts = config.postgres_setup(&paths.pgdata).probe();
	match facts.pid {
		Some(pid) if facts.running => tracing::info!(
			"Postgres is already running at \"{}\" with pid {}",
			paths.pgdata.display(),
			pid
		),
		_ => tracing::debug!("Postgres is not running at \"{}\"", paths.pgdata.display()),
	}
}

fn supervise(
	paths: &Pathnames,
	config: &NodeConfig,
	services: Vec<autoctl_supervisor::ServiceSpec>,
) -> Result<(), CommandError> {
	let supervisor = Supervisor::new(
		SupervisorConfig {
			registry_path: paths.pid.clone(),
			restart_delay: config.restart_delay(),
		},
		services,
	);

	let runtime = tokio::runtime::Builder::new_multi_thread()
		.enable_all()
		.build()
		.map_err(CommandError::Runtime)?;
	runtime.block_on(supervisor.run())?;
	Ok(())
}

// ── stop / reload ────────────────────────────────────────────────────────────

pub fn cmd_stop(paths: &Pathnames, fast: bool, immediate: bool) -> Result<(), CommandError> {
	// checked before anything is read or signalled
	let mode = StopMode::from_flags(fast, immediate)?;
	let pid = read_supervisor_pid(&paths.pid)?;
	signal_supervisor(pid, Control::Stop(mode))
}

pub fn cmd_reload(paths: &Pathnames) -> Result<(), CommandError> {
	let pid = match read_supervisor_pid(&paths.pid) {
		Ok(pid) => pid,
		Err(e) if e.is_not_found() => {
			tracing::info!(
				"pg_autoctl is not running, pid file \"{}\" does not exist: skipping reload",
				paths.pid.display()
			);
			return Ok(());
		}
		Err(e) => return Err(e.into()),
	};
	signal_supervisor(pid, Control::Reload)
}

fn signal_supervisor(pid: i32, control: Control) -> Result<(), CommandError> {
	Kernel
		.send(pid, control)
		.map_err(|source| CommandError::Deliver { control, pid, source })?;
	tracing::info!("Sent {} to pg_autoctl pid {}", control, pid);
	Ok(())
}

// ── status ───────────────────────────────────────────────────────────────────

pub fn cmd_status(paths: &Pathnames, json: bool) -> Result<(), CommandError> {
	let setup = match NodeConfig::load_optional(&paths.config)? {
		Some(config) => config.postgres_setup(&paths.pgdata),
		None => autoctl_control::PostgresSetup::new(&paths.pgdata),
	};

	let status = service_status(&paths.pid, &setup, &Kernel)?;
	let snapshot = status.snapshot();

	if json {
		println!("{}", serde_json::to_string_pretty(&snapshot.to_json())?);
	} else {
		print_status(&snapshot);
	}
	Ok(())
}

fn print_status(snapshot: &StatusSnapshot) {
	let colored = std::io::stdout().is_terminal();
	let text = snapshot.render_text();
	for (i, line) in text.lines().enumerate() {
		if !colored {
			println!("{}", line);
			continue;
		}
		let up = if i == 0 { snapshot.supervisor_alive } else { snapshot.database.running };
		if up {
			println!("{} {}", "●".green(), line);
		} else {
			println!("{} {}", "○".dimmed(), line);
		}
	}
}

// ── restart ──────────────────────────────────────────────────────────────────

/// Prints the pid each restarted service had before the restart.
pub fn cmd_restart(paths: &Pathnames, target: RestartTarget) -> Result<(), CommandError> {
	let confirmator = RestartConfirmator::new(&paths.pid, Kernel);
	restart_and_report(&confirmator, target, &mut std::io::stdout())
}

/// Writes each old pid as soon as its restart is confirmed.
fn restart_and_report<S, W>(
	confirmator: &RestartConfirmator<S>,
	target: RestartTarget,
	out: &mut W,
) -> Result<(), CommandError>
where
	S: Signaller,
	W: Write,
{
	let mut report = |restarted: &Restarted| {
		if let Err(e) = writeln!(out, "{}", restarted.old_pid).and_then(|_| out.flush()) {
			tracing::warn!("Failed to print pid of service \"{}\": {}", restarted.service, e);
		}
	};

	match target.service() {
		Some(name) => report(&confirmator.restart(name.as_str())?),
		None => {
			confirmator.restart_each(report)?;
		}
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::cell::Cell;
	use std::path::{Path, PathBuf};
	use std::time::Duration;

	use autoctl_control::{parse_registry, write_registry, ProcessRegistry, SignalError};
	use nix::sys::signal::Signal;

	/// Rewrites the registry with a fresh pid for every service it signals, except `refused`.
	struct ScriptedSupervisor {
		registry: PathBuf,
		next_pid: Cell<i32>,
		refused: Option<i32>,
	}

	impl Signaller for ScriptedSupervisor {
		fn deliver(&self, pid: i32, _signal: Option<Signal>) -> Result<(), SignalError> {
			if self.refused == Some(pid) {
				return Err(SignalError::Permission { pid });
			}
			let mut registry = parse_registry(&self.registry).unwrap();
			let entry = registry.services.iter_mut().find(|e| e.pid == pid).unwrap();
			entry.pid = self.next_pid.get();
			self.next_pid.set(self.next_pid.get() + 1);
			write_registry(&self.registry, &registry).unwrap();
			Ok(())
		}
	}

	fn registry_file(name: &str, contents: &str) -> PathBuf {
		let dir = std::env::temp_dir().join(format!("autoctl-cli-restart-{}-{}", std::process::id(), name));
		std::fs::create_dir_all(&dir).unwrap();
		let path = dir.join("pg_autoctl.pid");
		write_registry(&path, &ProcessRegistry::parse(contents)).unwrap();
		path
	}

	fn confirmator(path: &Path, refused: Option<i32>) -> RestartConfirmator<ScriptedSupervisor> {
		let supervisor = ScriptedSupervisor { registry: path.to_path_buf(), next_pid: Cell::new(100), refused };
		RestartConfirmator::new(path, supervisor).with_interval(Duration::from_millis(1))
	}

	#[test]
	fn test_restart_one_prints_old_pid() {
		let path = registry_file("one", "1\n2\n10 postgres\n11 node active\n");
		let mut out = Vec::new();
		restart_and_report(&confirmator(&path, None), RestartTarget::NodeActive, &mut out).unwrap();
		assert_eq!(String::from_utf8(out).unwrap(), "11\n");
	}

	#[test]
	fn test_restart_all_prints_each_old_pid() {
		let path = registry_file("all", "1\n2\n10 postgres\n11 listener\n");
		let mut out = Vec::new();
		restart_and_report(&confirmator(&path, None), RestartTarget::All, &mut out).unwrap();
		assert_eq!(String::from_utf8(out).unwrap(), "10\n11\n");
	}

	#[test]
	fn test_restart_all_reports_pids_before_a_failure() {
		let path = registry_file("all-partial", "1\n2\n10 postgres\n11 listener\n");
		let mut out = Vec::new();
		let err = restart_and_report(&confirmator(&path, Some(11)), RestartTarget::All, &mut out).unwrap_err();

		assert_eq!(err.exit_class(), crate::exit::ExitClass::Internal);
		assert_eq!(String::from_utf8(out).unwrap(), "10\n");
	}
}
