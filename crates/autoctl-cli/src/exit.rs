use std::process::ExitCode;

/// Process exit statuses shared by every pg_autoctl command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitClass {
	Quit,
	BadArgs,
	BadConfig,
	BadState,
	Pgctl,
	Internal,
}

impl ExitClass {
	pub fn code(self) -> u8 {
		match self {
			ExitClass::Quit => 0,
			ExitClass::BadArgs => 1,
			ExitClass::BadConfig => 2,
			ExitClass::BadState => 3,
			ExitClass::Pgctl => 5,
			ExitClass::Internal => 12,
		}
	}
}

impl From<ExitClass> for ExitCode {
	fn from(class: ExitClass) -> Self {
		ExitCode::from(class.code())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_exit_codes() {
		assert_eq!(ExitClass::Quit.code(), 0);
		assert_eq!(ExitClass::BadArgs.code(), 1);
		assert_eq!(ExitClass::BadConfig.code(), 2);
		assert_eq!(ExitClass::BadState.code(), 3);
		assert_eq!(ExitClass::Pgctl.code(), 5);
		assert_eq!(ExitClass::Internal.code(), 12);
	}
}
