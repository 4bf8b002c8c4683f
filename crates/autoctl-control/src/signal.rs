use std::fmt;

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

use crate::error::{ConflictingStopModes, SignalError};

/// How hard a stop request should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopMode {
	#[default]
	Graceful,
	Fast,
	Immediate,
}

impl StopMode {
	pub fn from_flags(fast: bool, immediate: bool) -> Result<Self, ConflictingStopModes> {
		let mut mode = StopMode::Graceful;
		if fast {
			mode = StopMode::Fast;
		}
		if immediate {
			if mode != StopMode::Graceful {
				return Err(ConflictingStopModes);
			}
			mode = StopMode::Immediate;
		}
		Ok(mode)
	}

	pub fn signal(self) -> Signal {
		match self {
			StopMode::Graceful => Signal::SIGTERM,
			StopMode::Fast => Signal::SIGINT,
			StopMode::Immediate => Signal::SIGQUIT,
		}
	}
}

/// What an operator asks of a running supervisor tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
	/// Sent to the supervisor pid.
	Stop(StopMode),
	/// Sent to the supervisor pid.
	Reload,
	/// Sent to one service pid. The supervisor brings the service back
	/// only because every service it runs is restarted on termination;
	/// nothing here checks that.
	RestartService,
	/// Liveness check only.
	Probe,
}

impl Control {
	pub fn signal(self) -> Option<Signal> {
		match self {
			Control::Stop(mode) => Some(mode.signal()),
			Control::Reload => Some(Signal::SIGHUP),
			Control::RestartService => Some(Signal::SIGTERM),
			Control::Probe => None,
		}
	}
}

impl fmt::Display for Control {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.signal() {
			Some(signal) => f.write_str(signal.as_str()),
			None => f.write_str("signal 0"),
		}
	}
}

/// Delivers signals to processes.
pub trait Signaller {
	/// `None` sends no signal and only checks the pid can be signalled.
	fn deliver(&self, pid: i32, signal: Option<Signal>) -> Result<(), SignalError>;

	fn send(&self, pid: i32, control: Control) -> Result<(), SignalError> {
		self.deliver(pid, control.signal())
	}

	fn is_alive(&self, pid: i32) -> Result<bool, SignalError> {
		match self.deliver(pid, None) {
			Ok(()) => Ok(true),
			Err(SignalError::NoSuchProcess { .. }) => Ok(false),
			Err(e) => Err(e),
		}
	}
}

/// The operating system's `kill(2)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Kernel;

impl Signaller for Kernel {
	fn deliver(&self, pid: i32, signal: Option<Signal>) -> Result<(), SignalError> {
		deliver_signal(pid, signal)
	}
}

pub fn deliver_signal(pid: i32, signal: Option<Signal>) -> Result<(), SignalError> {
	// pid 0 and negative pids address process groups, never a single service
	if pid <= 0 {
		return Err(SignalError::Permission { pid });
	}

	match kill(Pid::from_raw(pid), signal) {
		Ok(()) => Ok(()),
		Err(Errno::ESRCH) => Err(SignalError::NoSuchProcess { pid }),
		Err(Errno::EPERM) => Err(SignalError::Permission { pid }),
		Err(e) => Err(SignalError::Os { pid, source: e }),
	}
}
