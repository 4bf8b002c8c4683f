use std::path::Path;

use autoctl_control::{parse_registry, Pathnames, RegistryError};
use owo_colors::OwoColorize;
use serde_json::json;

use crate::config::{self, ConfigError, Role};
use crate::error::CommandError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSelection {
	All,
	Config,
	State,
	Init,
	Pid,
}

impl FileSelection {
	/// At most one selector may be given; none means `--all`.
	pub fn from_flags(all: bool, config: bool, state: bool, init: bool, pid: bool) -> Result<Self, CommandError> {
		let selected: Vec<FileSelection> = [
			(all, FileSelection::All),
			(config, FileSelection::Config),
			(state, FileSelection::State),
			(init, FileSelection::Init),
			(pid, FileSelection::Pid),
		]
		.into_iter()
		.filter_map(|(set, selection)| set.then_some(selection))
		.collect();

		match selected.as_slice() {
			[] => Ok(FileSelection::All),
			[one] => Ok(*one),
			_ => Err(CommandError::BadArgs(
				"Please use only one of --all --config --state --init --pid".to_string(),
			)),
		}
	}

	fn label(self) -> &'static str {
		match self {
			FileSelection::All => "all",
			FileSelection::Config => "config",
			FileSelection::State => "state",
			FileSelection::Init => "init",
			FileSelection::Pid => "pid",
		}
	}
}

pub fn cmd_show_file(paths: &Pathnames, selection: FileSelection, contents: bool, json: bool) -> Result<(), CommandError> {
	let role = config::probe_role(&paths.config).ok();

	match selection {
		FileSelection::All => show_all(paths, role, json),
		FileSelection::Config if contents => show_config_contents(&paths.config, json),
		FileSelection::Pid if contents => show_registry_contents(&paths.pid, json),
		FileSelection::State | FileSelection::Init => {
			if role == Some(Role::Monitor) {
				return Err(CommandError::BadArgs(format!("A monitor has no {} file", selection.label())));
			}
			let path = if selection == FileSelection::State { &paths.state } else { &paths.init };
			if contents {
				show_raw_contents(path)
			} else {
				print_path(selection, path, json)
			}
		}
		FileSelection::Config => print_path(selection, &paths.config, json),
		FileSelection::Pid => print_path(selection, &paths.pid, json),
	}
}

fn listed_files(paths: &Pathnames, role: Option<Role>) -> Vec<(&'static str, &Path)> {
	let mut files = vec![("config", paths.config.as_path())];
	if role != Some(Role::Monitor) {
		files.push(("state", paths.state.as_path()));
		files.push(("init", paths.init.as_path()));
	}
	files.push(("pid", paths.pid.as_path()));
	files
}

fn show_all(paths: &Pathnames, role: Option<Role>, json: bool) -> Result<(), CommandError> {
	let files = listed_files(paths, role);

	if json {
		let map: serde_json::Map<String, serde_json::Value> = files
			.iter()
			.map(|(name, path)| (name.to_string(), json!(path.display().to_string())))
			.collect();
		println!("{}", serde_json::to_string_pretty(&map)?);
		return Ok(());
	}

	println!("{:>7} | {}", "File".bold(), "Path".bold());
	println!("{:->8}+{:-<40}", "", "");
	for (name, path) in files {
		println!("{:>7} | {}", capitalize(name), path.display());
	}
	Ok(())
}

fn capitalize(name: &str) -> String {
	let mut chars = name.chars();
	match chars.next() {
		Some(first) => first.to_uppercase().chain(chars).collect(),
		None => String::new(),
	}
}

fn print_path(selection: FileSelection, path: &Path, json: bool) -> Result<(), CommandError> {
	if json {
		let mut map = serde_json::Map::new();
		map.insert(selection.label().to_string(), json!(path.display().to_string()));
		println!("{}", serde_json::to_string_pretty(&map)?);
	} else {
		println!("{}", path.display());
	}
	Ok(())
}

fn show_config_contents(path: &Path, json: bool) -> Result<(), CommandError> {
	let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
		std::io::ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
		_ => ConfigError::Io { path: path.to_path_buf(), source: e },
	})?;

	if !json {
		print!("{}", content);
		return Ok(());
	}
	let value: toml::Value = toml::from_str(&content).map_err(|source| ConfigError::Parse {
		path: path.to_path_buf(),
		source,
	})?;
	println!("{}", serde_json::to_string_pretty(&value)?);
	Ok(())
}

fn show_registry_contents(path: &Path, json: bool) -> Result<(), CommandError> {
	if json {
		let registry = parse_registry(path)?;
		println!("{}", serde_json::to_string_pretty(&registry)?);
		return Ok(());
	}
	let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
		std::io::ErrorKind::NotFound => RegistryError::NotFound(path.to_path_buf()),
		_ => RegistryError::Io { path: path.to_path_buf(), source: e },
	})?;
	print!("{}", content);
	Ok(())
}

fn show_raw_contents(path: &Path) -> Result<(), CommandError> {
	let bytes = std::fs::read(path)
		.map_err(|e| CommandError::BadState(format!("Failed to read file \"{}\": {}", path.display(), e)))?;
	print!("{}", String::from_utf8_lossy(&bytes));
	Ok(())
}
