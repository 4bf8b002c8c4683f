use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors from reading the process registry file.
#[derive(Debug, Error)]
pub enum RegistryError {
	/// The file does not exist: the supervisor is not running (yet).
	#[error("pg_autoctl pid file \"{}\" does not exist", .0.display())]
	NotFound(PathBuf),
	#[error("pg_autoctl pid file \"{}\" is malformed: {reason}", path.display())]
	Malformed { path: PathBuf, reason: String },
	#[error("failed to read pg_autoctl pid file \"{}\": {source}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: io::Error,
	},
}

impl RegistryError {
	pub fn is_not_found(&self) -> bool {
		matches!(self, RegistryError::NotFound(_))
	}
}

/// Errors from looking up a service pid by name.
#[derive(Debug, Error)]
pub enum LocateError {
	#[error(transparent)]
	Registry(#[from] RegistryError),
	#[error("no service named \"{name}\" in pid file \"{}\"", path.display())]
	NoSuchService { name: String, path: PathBuf },
}

impl LocateError {
	/// Both "no registry" and "no such entry" mean the service cannot be targeted.
	pub fn is_not_found(&self) -> bool {
		match self {
			LocateError::Registry(e) => e.is_not_found(),
			LocateError::NoSuchService { .. } => true,
		}
	}
}

/// Errors from delivering a signal to a pid.
#[derive(Debug, Error)]
pub enum SignalError {
	#[error("no such process {pid}")]
	NoSuchProcess { pid: i32 },
	#[error("not permitted to signal pid {pid}")]
	Permission { pid: i32 },
	#[error("failed to signal pid {pid}: {source}")]
	Os {
		pid: i32,
		#[source]
		source: nix::errno::Errno,
	},
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Please use either --fast or --immediate, not both")]
pub struct ConflictingStopModes;

/// Errors from the restart-and-confirm protocol.
#[derive(Debug, Error)]
pub enum RestartError {
	#[error("failed to find pid for service name \"{name}\": {source}")]
	Locate {
		name: String,
		#[source]
		source: LocateError,
	},
	#[error(transparent)]
	Registry(#[from] RegistryError),
	#[error("failed to send the TERM signal to service \"{name}\": {source}")]
	Signal {
		name: String,
		#[source]
		source: SignalError,
	},
	#[error("gave up waiting for service \"{name}\" with pid {pid} to restart")]
	Cancelled { name: String, pid: i32 },
}

/// Inconsistent or failed states found by the status reporter.
#[derive(Debug, Error)]
pub enum StatusError {
	#[error(
		"pg_autoctl pid file \"{}\" does not exist, yet Postgres is running at \"{}\" with pid {pid}",
		registry.display(),
		pgdata.display()
	)]
	OrphanedDatabase { registry: PathBuf, pgdata: PathBuf, pid: i32 },
	#[error("pg_autoctl pid file contains stale pid {pid}")]
	StalePid { pid: i32 },
	#[error("Postgres is not ready at \"{}\"", pgdata.display())]
	DatabaseNotReady { pgdata: PathBuf },
	#[error(transparent)]
	Registry(#[from] RegistryError),
	#[error(transparent)]
	Signal(#[from] SignalError),
}
