use std::path::Path;

use crate::error::LocateError;
use crate::registry::parse_registry;

/// Current pid of the named service, read from disk on every call.
///
/// Duplicate names are not expected; when they happen the first line wins.
pub fn find_service_pid(registry_path: &Path, name: &str) -> Result<i32, LocateError> {
	let registry = parse_registry(registry_path)?;
	registry
		.find(name)
		.map(|entry| entry.pid)
		.ok_or_else(|| LocateError::NoSuchService {
			name: name.to_string(),
			path: registry_path.to_path_buf(),
		})
}
