use tracing::Level;

pub fn level(verbose: u8, quiet: bool) -> Level {
	if quiet {
		return Level::ERROR;
	}
	match verbose {
		0 => Level::INFO,
		1 => Level::DEBUG,
		_ => Level::TRACE,
	}
}

/// Log lines go to stderr; stdout is reserved for command output.
pub fn init(verbose: u8, quiet: bool) {
	let _ = tracing_subscriber::fmt()
		.with_max_level(level(verbose, quiet))
		.with_writer(std::io::stderr)
		.with_target(false)
		.try_init();
}
