mod config;
mod error;
mod exit;
mod logs;
mod service;
mod show;

use std::path::PathBuf;
use std::process::ExitCode;

use autoctl_control::Pathnames;
use clap::{ArgAction, Args, Parser, Subcommand};

use error::CommandError;
use exit::ExitClass;
use service::RestartTarget;
use show::FileSelection;

#[derive(Debug, Parser)]
#[command(name = "pg_autoctl", version, about = "Control a pg_autoctl node and the services it supervises")]
struct Cli {
	/// Increase log verbosity (-v debug, -vv trace)
	#[arg(short, long, action = ArgAction::Count, global = true)]
	verbose: u8,
	/// Only log errors
	#[arg(short, long, global = true)]
	quiet: bool,
	#[command(subcommand)]
	command: Commands,
}

#[derive(Debug, Args)]
struct PgdataArg {
	/// Path to the Postgres data directory
	#[arg(short = 'D', long, env = "PGDATA", value_name = "PATH")]
	pgdata: Option<PathBuf>,
}

impl PgdataArg {
	fn pathnames(&self) -> Result<Pathnames, CommandError> {
		let pgdata = self.pgdata.as_ref().ok_or(CommandError::MissingPgdata)?;
		let paths = Pathnames::from_pgdata(pgdata);
		tracing::debug!("Using pid file \"{}\"", paths.pid.display());
		Ok(paths)
	}
}

#[derive(Debug, Subcommand)]
enum Commands {
	/// Run the pg_autoctl service (monitor or keeper)
	Run {
		#[command(flatten)]
		pgdata: PgdataArg,
	},
	/// Signal the pg_autoctl service to stop
	Stop {
		#[command(flatten)]
		pgdata: PgdataArg,
		/// Fast shutdown mode for the keeper
		#[arg(long)]
		fast: bool,
		/// Immediate shutdown mode for the keeper
		#[arg(long)]
		immediate: bool,
	},
	/// Signal the pg_autoctl service to reload its configuration
	Reload {
		#[command(flatten)]
		pgdata: PgdataArg,
	},
	/// Display the current status of the pg_autoctl service
	Status {
		#[command(flatten)]
		pgdata: PgdataArg,
		/// Output a JSON formatted data
		#[arg(long)]
		json: bool,
	},
	/// Restart pg_autoctl sub-processes (services)
	Restart {
		#[arg(value_enum)]
		service: RestartTarget,
		#[command(flatten)]
		pgdata: PgdataArg,
	},
	/// Show pg_autoctl information
	#[command(subcommand)]
	Show(ShowCommand),
}

#[derive(Debug, Subcommand)]
enum ShowCommand {
	/// List pg_autoctl internal files (config, state, pid)
	File(ShowFileArgs),
}

#[derive(Debug, Args)]
struct ShowFileArgs {
	#[command(flatten)]
	pgdata: PgdataArg,
	/// Show all the files
	#[arg(long)]
	all: bool,
	/// Show the configuration file
	#[arg(long)]
	config: bool,
	/// Show the state file
	#[arg(long)]
	state: bool,
	/// Show the init state file
	#[arg(long)]
	init: bool,
	/// Show the pid file
	#[arg(long)]
	pid: bool,
	/// Show the contents of the selected file
	#[arg(long)]
	contents: bool,
	/// Output a JSON formatted data
	#[arg(long)]
	json: bool,
}

fn main() -> ExitCode {
	let cli = match Cli::try_parse() {
		Ok(cli) => cli,
		Err(e) => {
			let _ = e.print();
			let class = if e.use_stderr() { ExitClass::BadArgs } else { ExitClass::Quit };
			return class.into();
		}
	};
	logs::init(cli.verbose, cli.quiet);

	match execute(cli.command) {
		Ok(()) => ExitClass::Quit.into(),
		Err(e) => {
			tracing::error!("{}", e);
			e.exit_class().into()
		}
	}
}

fn execute(command: Commands) -> Result<(), CommandError> {
	match command {
		Commands::Run { pgdata } => service::cmd_run(&pgdata.pathnames()?),
		Commands::Stop { pgdata, fast, immediate } => {
			let paths = pgdata.pathnames()?;
			service::cmd_stop(&paths, fast, immediate)
		}
		Commands::Reload { pgdata } => service::cmd_reload(&pgdata.pathnames()?),
		Commands::Status { pgdata, json } => service::cmd_status(&pgdata.pathnames()?, json),
		Commands::Restart { service, pgdata } => service::cmd_restart(&pgdata.pathnames()?, service),
		Commands::Show(ShowCommand::File(args)) => {
			let selection = FileSelection::from_flags(args.all, args.config, args.state, args.init, args.pid)?;
			show::cmd_show_file(&args.pgdata.pathnames()?, selection, args.contents, args.json)
		}
	}
}
