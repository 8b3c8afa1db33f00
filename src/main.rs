use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use node_energy::Config;

/// Reports per-interval node energy by domain
#[derive(Debug, Parser)]
#[command(name = "node-energy", version, about)]
struct Cli {
	/// Path to a TOML configuration file
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Enable debug logging
	#[arg(short, long)]
	verbose: bool,

	/// Stop after this many intervals
	#[arg(short = 'n', long)]
	iterations: Option<u64>,
}

fn main() -> ExitCode {
	let cli = Cli::parse();

	let filter = if cli.verbose {
		EnvFilter::new("debug")
	} else {
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
	};
	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.try_init();

	let mut config = match Config::load_from(cli.config.as_deref()) {
		Ok(config) => config,
		Err(e) => {
			tracing::error!(error = %e, "failed to load configuration");
			return ExitCode::FAILURE;
		},
	};
	if cli.iterations.is_some() {
		config.iterations = cli.iterations;
	}
	tracing::debug!(?config, "loaded configuration");

	if let Err(e) = node_energy::monitor_node_energy(&config) {
		tracing::error!(error = %e, "monitoring stopped");
		return ExitCode::FAILURE;
	}
	ExitCode::SUCCESS
}
