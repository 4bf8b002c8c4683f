use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::RestartError;
use crate::locator::find_service_pid;
use crate::registry::parse_registry;
use crate::signal::{Control, Signaller};

pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Stops a restart poll from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn cancel(&self) {
		self.0.store(true, Ordering::SeqCst);
	}

	pub fn is_cancelled(&self) -> bool {
		self.0.load(Ordering::SeqCst)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restarted {
	pub service: String,
	pub old_pid: i32,
	pub new_pid: i32,
}

/// Signals a service and waits for the supervisor to register a new pid for it.
///
/// The supervisor never acknowledges anything, so the registry is the only
/// evidence: any pid change for the name counts as the restart. That says
/// nothing about the new process being healthy. Without a [`CancelToken`]
/// the wait has no upper bound.
pub struct RestartConfirmator<S> {
	registry: PathBuf,
	signaller: S,
	interval: Duration,
	cancel: Option<CancelToken>,
}

impl<S: Signaller> RestartConfirmator<S> {
	pub fn new(registry: impl AsRef<Path>, signaller: S) -> Self {
		Self {
			registry: registry.as_ref().to_path_buf(),
			signaller,
			interval: POLL_INTERVAL,
			cancel: None,
		}
	}

	pub fn with_interval(mut self, interval: Duration) -> Self {
		self.interval = interval;
		self
	}

	pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
		self.cancel = Some(cancel);
		self
	}

	pub fn restart(&self, name: &str) -> Result<Restarted, RestartError> {
		let pid = self.locate(name)?;

		tracing::info!("Sending the TERM signal to service \"{}\" with pid {}", name, pid);

		self.signaller
			.send(pid, Control::RestartService)
			.map_err(|e| RestartError::Signal { name: name.to_string(), source: e })?;

		loop {
			if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
				return Err(RestartError::Cancelled { name: name.to_string(), pid });
			}

			let new_pid = self.locate(name)?;
			if new_pid != pid {
				tracing::info!("Service \"{}\" has been restarted with pid {}", name, new_pid);
				return Ok(Restarted { service: name.to_string(), old_pid: pid, new_pid });
			}

			tracing::trace!(
				"pidfile \"{}\" still contains pid {} for service \"{}\"",
				self.registry.display(),
				new_pid,
				name
			);
			std::thread::sleep(self.interval);
		}
	}

	/// Restarts every registered service, one after the other, in file order.
	pub fn restart_all(&self) -> Result<Vec<Restarted>, RestartError> {
		self.restart_each(|_| {})
	}

	/// Like [`restart_all`](Self::restart_all), calling `confirmed` as soon as
	/// each restart is seen, so earlier results survive a later failure.
	pub fn restart_each<F>(&self, mut confirmed: F) -> Result<Vec<Restarted>, RestartError>
	where
		F: FnMut(&Restarted),
	{
		let registry = parse_registry(&self.registry)?;
		let mut seen = HashSet::new();
		let mut restarted = Vec::new();

		for entry in &registry.services {
			if !seen.insert(entry.name.as_str()) {
				continue;
			}
			tracing::info!("Restarting service \"{}\" with pid {}", entry.name, entry.pid);
			let done = self.restart(&entry.name)?;
			confirmed(&done);
			restarted.push(done);
		}

		Ok(restarted)
	}

	fn locate(&self, name: &str) -> Result<i32, RestartError> {
		find_service_pid(&self.registry, name)
			.map_err(|e| RestartError::Locate { name: name.to_string(), source: e })
	}
}
