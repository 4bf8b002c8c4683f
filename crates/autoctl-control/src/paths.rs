use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "pg_autoctl";

/// Every file pg_autoctl keeps for one PGDATA.
///
/// Each lives under an XDG base directory, in a sub-tree mirroring the
/// absolute PGDATA path, so several nodes can share one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pathnames {
	pub pgdata: PathBuf,
	pub config: PathBuf,
	pub state: PathBuf,
	pub init: PathBuf,
	pub pid: PathBuf,
}

impl Pathnames {
	pub fn from_pgdata(pgdata: impl AsRef<Path>) -> Self {
		let pgdata = absolute_pgdata(pgdata.as_ref());
		let relative = pgdata.strip_prefix("/").unwrap_or(&pgdata).to_path_buf();

		let config_dir = config_home().join(APP_NAME).join(&relative);
		let data_dir = data_home().join(APP_NAME).join(&relative);
		let runtime_dir = runtime_dir().join(APP_NAME).join(&relative);

		Self {
			config: config_dir.join(format!("{}.toml", APP_NAME)),
			state: data_dir.join(format!("{}.state", APP_NAME)),
			init: data_dir.join(format!("{}.init", APP_NAME)),
			pid: runtime_dir.join(format!("{}.pid", APP_NAME)),
			pgdata,
		}
	}
}

fn absolute_pgdata(pgdata: &Path) -> PathBuf {
	if let Ok(real) = pgdata.canonicalize() {
		return real;
	}
	if pgdata.is_absolute() {
		return pgdata.to_path_buf();
	}
	std::env::current_dir()
		.map(|cwd| cwd.join(pgdata))
		.unwrap_or_else(|_| pgdata.to_path_buf())
}

fn config_home() -> PathBuf {
	if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
		PathBuf::from(dir)
	} else if let Some(home) = home_dir() {
		home.join(".config")
	} else {
		PathBuf::from("/tmp").join("config")
	}
}

fn data_home() -> PathBuf {
	if let Ok(dir) = std::env::var("XDG_DATA_HOME") {
		PathBuf::from(dir)
	} else if let Some(home) = home_dir() {
		home.join(".local").join("share")
	} else {
		PathBuf::from("/tmp").join("data")
	}
}

fn runtime_dir() -> PathBuf {
	std::env::var("XDG_RUNTIME_DIR")
		.map(PathBuf::from)
		.unwrap_or_else(|_| PathBuf::from("/tmp"))
}

fn home_dir() -> Option<PathBuf> {
	std::env::var("HOME").ok().map(PathBuf::from)
}
