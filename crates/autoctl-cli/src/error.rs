use std::path::PathBuf;

use autoctl_control::{ConflictingStopModes, Control, RegistryError, RestartError, SignalError, StatusError};
use autoctl_supervisor::SupervisorError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::exit::ExitClass;

/// Everything a command can fail with, each variant tied to an exit class.
#[derive(Debug, Error)]
pub enum CommandError {
	#[error("Failed to get PGDATA either from the environment or from --pgdata")]
	MissingPgdata,
	#[error(transparent)]
	StopModes(#[from] ConflictingStopModes),
	#[error("{0}")]
	BadArgs(String),
	#[error(transparent)]
	Config(#[from] ConfigError),
	#[error("{0}")]
	BadState(String),
	#[error("PGDATA \"{}\" does not exist", .0.display())]
	MissingPgdataDir(PathBuf),
	#[error(transparent)]
	Registry(#[from] RegistryError),
	#[error("Failed to send {control} to pg_autoctl pid {pid}: {source}")]
	Deliver {
		control: Control,
		pid: i32,
		#[source]
		source: SignalError,
	},
	#[error(transparent)]
	Restart(#[from] RestartError),
	#[error(transparent)]
	Status(#[from] StatusError),
	#[error(transparent)]
	Supervisor(#[from] SupervisorError),
	#[error("failed to start the async runtime: {0}")]
	Runtime(#[source] std::io::Error),
	#[error("failed to serialize JSON output: {0}")]
	Json(#[from] serde_json::Error),
}

impl CommandError {
	pub fn exit_class(&self) -> ExitClass {
		match self {
			CommandError::MissingPgdata | CommandError::StopModes(_) | CommandError::BadArgs(_) => {
				ExitClass::BadArgs
			}
			CommandError::Config(_) => ExitClass::BadConfig,
			CommandError::BadState(_) | CommandError::Registry(_) => ExitClass::BadState,
			CommandError::MissingPgdataDir(_) => ExitClass::Pgctl,
			CommandError::Restart(RestartError::Registry(_)) => ExitClass::BadState,
			CommandError::Status(e) => match e {
				StatusError::DatabaseNotReady { .. } => ExitClass::Pgctl,
				StatusError::Registry(_) => ExitClass::BadState,
				StatusError::OrphanedDatabase { .. }
				| StatusError::StalePid { .. }
				| StatusError::Signal(_) => ExitClass::Internal,
			},
			CommandError::Deliver { .. }
			| CommandError::Restart(_)
			| CommandError::Supervisor(_)
			| CommandError::Runtime(_)
			| CommandError::Json(_) => ExitClass::Internal,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use autoctl_control::LocateError;

	#[test]
	fn test_argument_errors() {
		assert_eq!(CommandError::MissingPgdata.exit_class(), ExitClass::BadArgs);
		assert_eq!(CommandError::from(ConflictingStopModes).exit_class(), ExitClass::BadArgs);
	}

	#[test]
	fn test_status_errors() {
		let not_ready = StatusError::DatabaseNotReady { pgdata: "/data".into() };
		assert_eq!(CommandError::from(not_ready).exit_class(), ExitClass::Pgctl);
		assert_eq!(
			CommandError::from(StatusError::StalePid { pid: 42 }).exit_class(),
			ExitClass::Internal
		);
		let orphan = StatusError::OrphanedDatabase {
			registry: "/run/pg_autoctl.pid".into(),
			pgdata: "/data".into(),
			pid: 42,
		};
		assert_eq!(CommandError::from(orphan).exit_class(), ExitClass::Internal);
		let malformed = StatusError::Registry(RegistryError::Malformed {
			path: "/run/pg_autoctl.pid".into(),
			reason: "empty".into(),
		});
		assert_eq!(CommandError::from(malformed).exit_class(), ExitClass::BadState);
	}

	#[test]
	fn test_restart_errors() {
		let missing = RestartError::Registry(RegistryError::NotFound("/run/pg_autoctl.pid".into()));
		assert_eq!(CommandError::from(missing).exit_class(), ExitClass::BadState);

		let unknown = RestartError::Locate {
			name: "listener".into(),
			source: LocateError::NoSuchService {
				name: "listener".into(),
				path: "/run/pg_autoctl.pid".into(),
			},
		};
		assert_eq!(CommandError::from(unknown).exit_class(), ExitClass::Internal);
	}
}
