//! # autoctl-supervisor
//!
//! The parent process behind `pg_autoctl run`.
//!
//! Launches each service, relaunches it whenever it terminates, and keeps
//! the pid registry read by [`autoctl_control`] up to date. Stop and reload
//! requests arrive as signals (SIGTERM, SIGINT, SIGQUIT, SIGHUP) and are
//! forwarded to every service.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use autoctl_supervisor::{ServiceSpec, Supervisor, SupervisorConfig};
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let sup = Supervisor::new(
//! 	SupervisorConfig {
//! 		registry_path: "/tmp/pg_autoctl/pg_autoctl.pid".into(),
//! 		restart_delay: Duration::from_millis(500),
//! 	},
//! 	vec![
//! 		ServiceSpec::new("postgres", "postgres").args(["-D", "/var/lib/pgsql/data"]),
//! 		ServiceSpec::shell("listener", "my-listener --pgdata /var/lib/pgsql/data"),
//! 	],
//! );
//!
//! sup.run().await.unwrap();
//! # }
//! ```

pub mod error;
pub mod supervisor;
pub mod types;

pub use error::SupervisorError;
pub use supervisor::{Supervisor, SupervisorCommand, SupervisorConfig, SupervisorHandle};
pub use types::*;
