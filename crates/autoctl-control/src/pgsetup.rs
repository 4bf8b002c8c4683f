use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::signal::{Kernel, Signaller};

// postmaster.pid, one-based
const PM_LINE_PID: usize = 1;
const PM_LINE_PORT: usize = 4;
const PM_LINE_SOCKET_DIR: usize = 5;
const PM_LINE_LISTEN_ADDR: usize = 6;
const PM_LINE_STATUS: usize = 8;

const PM_STATUS_READY: &str = "ready";

/// What is known about the local Postgres instance at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostgresFacts {
	pub pgdata: PathBuf,
	pub host: Option<String>,
	pub port: Option<u16>,
	pub pid: Option<i32>,
	pub running: bool,
	pub ready: bool,
}

/// Readiness and liveness of the database the supervisor manages.
pub trait DatabaseProbe {
	fn probe(&self) -> PostgresFacts;
}

/// The local Postgres instance, observed through its `postmaster.pid`.
#[derive(Debug, Clone)]
pub struct PostgresSetup {
	pub pgdata: PathBuf,
	pub host: Option<String>,
	pub port: Option<u16>,
}

impl PostgresSetup {
	pub fn new(pgdata: impl AsRef<Path>) -> Self {
		Self {
			pgdata: pgdata.as_ref().to_path_buf(),
			host: None,
			port: None,
		}
	}

	pub fn with_host(mut self, host: Option<String>) -> Self {
		self.host = host;
		self
	}

	pub fn with_port(mut self, port: Option<u16>) -> Self {
		self.port = port;
		self
	}

	pub fn postmaster_pid_path(&self) -> PathBuf {
		self.pgdata.join("postmaster.pid")
	}

	fn read_postmaster_pid(&self) -> Option<Vec<String>> {
		let contents = std::fs::read_to_string(self.postmaster_pid_path()).ok()?;
		Some(contents.lines().map(|l| l.trim().to_string()).collect())
	}
}

impl DatabaseProbe for PostgresSetup {
	fn probe(&self) -> PostgresFacts {
		let mut facts = PostgresFacts {
			pgdata: self.pgdata.clone(),
			host: self.host.clone(),
			port: self.port,
			pid: None,
			running: false,
			ready: false,
		};

		let Some(lines) = self.read_postmaster_pid() else {
			tracing::debug!("No postmaster.pid in \"{}\"", self.pgdata.display());
			return facts;
		};
		let line = |n: usize| lines.get(n - 1).map(String::as_str).filter(|l| !l.is_empty());

		facts.pid = line(PM_LINE_PID).and_then(|l| l.parse().ok());
		if let Some(port) = line(PM_LINE_PORT).and_then(|l| l.parse().ok()) {
			facts.port = Some(port);
		}
		if facts.host.is_none() {
			facts.host = line(PM_LINE_LISTEN_ADDR)
				.or_else(|| line(PM_LINE_SOCKET_DIR))
				.map(|l| l.split(',').next().unwrap_or(l).trim().to_string());
		}

		facts.running = match facts.pid {
			Some(pid) => match Kernel.is_alive(pid) {
				Ok(alive) => alive,
				// exists, owned by someone else
				Err(crate::error::SignalError::Permission { .. }) => true,
				Err(e) => {
					tracing::warn!("Failed to probe Postgres pid {}: {}", pid, e);
					false
				}
			},
			None => false,
		};
		facts.ready = facts.running && line(PM_LINE_STATUS) == Some(PM_STATUS_READY);

		facts
	}
}
