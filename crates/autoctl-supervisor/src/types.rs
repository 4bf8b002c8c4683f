use std::collections::HashMap;

/// One program the supervisor keeps running.
///
/// There is a single restart policy: whenever the process terminates, for
/// whatever reason, it is started again under the same name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceSpec {
	pub name: String,
	pub program: String,
	pub args: Vec<String>,
	pub env: HashMap<String, String>,
}

impl ServiceSpec {
	pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			program: program.into(),
			args: Vec::new(),
			env: HashMap::new(),
		}
	}

	/// Runs `command` through `sh`, exec'ed so the registered pid is the command itself.
	pub fn shell(name: impl Into<String>, command: &str) -> Self {
		Self::new(name, "sh").args(["-c".to_string(), format!("exec {}", command)])
	}

	pub fn args<I, S>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.args.extend(args.into_iter().map(Into::into));
		self
	}

	pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.env.insert(key.into(), value.into());
		self
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
	Stopped,
	Running { pid: u32, restarts: u32 },
	/// Between a termination and the relaunch. The registry keeps listing
	/// `last_pid` until the new process replaces it.
	Restarting { last_pid: Option<u32>, restarts: u32 },
}

impl ProcessState {
	pub fn pid(&self) -> Option<u32> {
		match self {
			ProcessState::Running { pid, .. } => Some(*pid),
			_ => None,
		}
	}

	/// The pid the registry lists for this service.
	pub fn registered_pid(&self) -> Option<u32> {
		match self {
			ProcessState::Running { pid, .. } => Some(*pid),
			ProcessState::Restarting { last_pid, .. } => *last_pid,
			ProcessState::Stopped => None,
		}
	}

	pub fn is_running(&self) -> bool {
		matches!(self, ProcessState::Running { .. })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn shell_spec_execs_command() {
		let spec = ServiceSpec::shell("listener", "sleep 60");
		assert_eq!(spec.program, "sh");
		assert_eq!(spec.args, vec!["-c".to_string(), "exec sleep 60".to_string()]);
	}

	#[test]
	fn process_state_pid() {
		assert_eq!(ProcessState::Running { pid: 7, restarts: 0 }.pid(), Some(7));
		assert_eq!(ProcessState::Restarting { last_pid: Some(7), restarts: 1 }.pid(), None);
		assert!(!ProcessState::Stopped.is_running());
	}

	#[test]
	fn restarting_service_stays_registered() {
		assert_eq!(ProcessState::Running { pid: 7, restarts: 0 }.registered_pid(), Some(7));
		assert_eq!(ProcessState::Restarting { last_pid: Some(7), restarts: 1 }.registered_pid(), Some(7));
		assert_eq!(ProcessState::Restarting { last_pid: None, restarts: 1 }.registered_pid(), None);
		assert_eq!(ProcessState::Stopped.registered_pid(), None);
		assert!(!ProcessState::Stopped.is_running());
	}
}
