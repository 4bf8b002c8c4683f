use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SupervisorError {
	#[error("no services to supervise")]
	NoServices,
	#[error("failed to install signal handlers: {0}")]
	Signals(#[source] io::Error),
	#[error("failed to write pid file \"{}\": {source}", path.display())]
	Registry {
		path: PathBuf,
		#[source]
		source: io::Error,
	},
	#[error("failed to start service \"{service}\": {source}")]
	Spawn {
		service: String,
		#[source]
		source: io::Error,
	},
	#[error("service task failed: {0}")]
	Task(#[from] tokio::task::JoinError),
}
