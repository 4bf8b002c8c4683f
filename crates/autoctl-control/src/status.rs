//! Status of a pg_autoctl node.
//!
//! Three facts are observed independently and may race with each other:
//! whether the registry exists, whether the supervisor pid it records is
//! alive, and whether Postgres is running and ready. Combinations that
//! only a crash or manual tampering can produce are errors, never "stopped".

use std::path::{Path, PathBuf};

use serde_json::json;

use crate::error::StatusError;
use crate::pgsetup::{DatabaseProbe, PostgresFacts};
use crate::registry::read_supervisor_pid;
use crate::signal::Signaller;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSnapshot {
	pub registry_exists: bool,
	pub supervisor_pid: Option<i32>,
	pub supervisor_alive: bool,
	pub database: PostgresFacts,
}

impl StatusSnapshot {
	pub fn database_ready(&self) -> bool {
		self.database.ready
	}

	/// The same facts as [`render_text`](Self::render_text).
	pub fn to_json(&self) -> serde_json::Value {
		json!({
			"postgres": self.database,
			"pg_autoctl": {
				"pid": self.supervisor_pid,
				"running": self.supervisor_alive,
			},
		})
	}

	pub fn render_text(&self) -> String {
		let mut out = String::new();
		match (self.supervisor_pid, self.supervisor_alive) {
			(Some(pid), true) => out.push_str(&format!("pg_autoctl is running with pid {}\n", pid)),
			(Some(pid), false) => out.push_str(&format!("pg_autoctl is not running, pid file lists pid {}\n", pid)),
			(None, _) => out.push_str("pg_autoctl is not running\n"),
		}

		let db = &self.database;
		let host = db.host.as_deref().unwrap_or("-");
		let port = db.port.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string());
		let line = match (db.running, db.ready, db.pid) {
			(true, true, Some(pid)) => format!(
				"Postgres is serving PGDATA \"{}\" on host {} port {} with pid {}",
				db.pgdata.display(),
				host,
				port,
				pid
			),
			(true, _, pid) => format!(
				"Postgres is running but not ready at PGDATA \"{}\" on host {} port {} with pid {}",
				db.pgdata.display(),
				host,
				port,
				pid.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string())
			),
			(false, _, _) => format!(
				"Postgres is not running at PGDATA \"{}\" on host {} port {}",
				db.pgdata.display(),
				host,
				port
			),
		};
		out.push_str(&line);
		out.push('\n');
		out
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceStatus {
	/// No registry and no Postgres: nothing to report on.
	NotRunning { registry: PathBuf, database: PostgresFacts },
	Running(StatusSnapshot),
}

impl ServiceStatus {
	pub fn is_running(&self) -> bool {
		matches!(self, ServiceStatus::Running(_))
	}

	/// The facts behind either outcome, in the shape `status` prints them.
	pub fn snapshot(&self) -> StatusSnapshot {
		match self {
			ServiceStatus::NotRunning { database, .. } => StatusSnapshot {
				registry_exists: false,
				supervisor_pid: None,
				supervisor_alive: false,
				database: database.clone(),
			},
			ServiceStatus::Running(snapshot) => snapshot.clone(),
		}
	}
}

pub fn service_status<P, S>(registry: &Path, probe: &P, signaller: &S) -> Result<ServiceStatus, StatusError>
where
	P: DatabaseProbe,
	S: Signaller,
{
	let database = probe.probe();

	if !registry.exists() {
		tracing::info!("pg_autoctl pid file \"{}\" does not exist", registry.display());

		if database.running {
			return Err(StatusError::OrphanedDatabase {
				registry: registry.to_path_buf(),
				pgdata: database.pgdata.clone(),
				pid: database.pid.unwrap_or_default(),
			});
		}
		return Ok(ServiceStatus::NotRunning { registry: registry.to_path_buf(), database });
	}

	let pid = read_supervisor_pid(registry)?;
	match signaller.is_alive(pid) {
		Ok(true) => {}
		Ok(false) => return Err(StatusError::StalePid { pid }),
		Err(e) => return Err(StatusError::Signal(e)),
	}
	tracing::info!("pg_autoctl is running with pid {}", pid);

	if !database.ready {
		return Err(StatusError::DatabaseNotReady { pgdata: database.pgdata.clone() });
	}
	tracing::info!(
		"Postgres is serving PGDATA \"{}\" on port {} with pid {}",
		database.pgdata.display(),
		database.port.unwrap_or_default(),
		database.pid.unwrap_or_default()
	);

	Ok(ServiceStatus::Running(StatusSnapshot {
		registry_exists: true,
		supervisor_pid: Some(pid),
		supervisor_alive: true,
		database,
	}))
}
