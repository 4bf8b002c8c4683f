//! # autoctl-control
//!
//! Control plane for a running pg_autoctl supervisor tree.
//!
//! The supervisor publishes its own pid and the pid of every service it
//! runs in a line-oriented registry file. This crate reads that file and
//! talks to the processes it names with POSIX signals: nothing else is
//! shared between a control invocation and the supervisor.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use autoctl_control::{Kernel, Pathnames, RestartConfirmator};
//!
//! let paths = Pathnames::from_pgdata("/var/lib/postgresql/data");
//! let restarted = RestartConfirmator::new(&paths.pid, Kernel)
//! 	.restart("listener")
//! 	.unwrap();
//! println!("{}", restarted.old_pid);
//! ```

pub mod error;
pub mod locator;
pub mod paths;
pub mod pgsetup;
pub mod registry;
pub mod restart;
pub mod signal;
pub mod status;

pub use error::{ConflictingStopModes, LocateError, RegistryError, RestartError, SignalError, StatusError};
pub use locator::find_service_pid;
pub use paths::Pathnames;
pub use pgsetup::{DatabaseProbe, PostgresFacts, PostgresSetup};
pub use registry::{parse_registry, read_supervisor_pid, write_registry, ProcessRegistry, ServiceEntry, ServiceName};
pub use restart::{CancelToken, RestartConfirmator, Restarted, POLL_INTERVAL};
pub use signal::{deliver_signal, Control, Kernel, Signaller, StopMode};
pub use status::{service_status, ServiceStatus, StatusSnapshot};
