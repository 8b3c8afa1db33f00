pub mod config;
pub mod constants;
pub mod counter;
pub mod cpu_type;
pub mod domain;
pub mod energy;
pub mod error;
pub mod export;
pub mod monitor;
pub mod node;
pub mod source;
pub mod topology;
pub mod util;

use std::io;
use std::time::Duration;

pub use crate::config::Config;
pub use crate::counter::{DeltaCounter, DeltaCounterSet};
pub use crate::domain::EnergyDomain;
pub use crate::energy::{EnergyReadings, PackageEnergy};
pub use crate::error::{Error, Result};
pub use crate::export::{NodeLabels, RowExporter};
pub use crate::monitor::NodeMonitor;
pub use crate::node::{NodeEnergy, PackageBreakdown};

/// Resolves the static node labels, preferring configured overrides
///
/// Computed once at startup and handed to the exporter.
pub fn resolve_labels(config: &Config) -> NodeLabels {
	let node_name = config.node_name.clone().unwrap_or_else(util::host::hostname);
	let cpu_arch = config.cpu_arch.clone().unwrap_or_else(cpu_type::detect_cpu_arch);
	NodeLabels::new(node_name, cpu_arch)
}

/// Starts monitoring node energy and prints one row per interval to stdout
///
/// This is the main entry point for the exporter loop.
pub fn monitor_node_energy(config: &Config) -> Result<()> {
	let labels = resolve_labels(config);
	tracing::info!(
		node = %labels.node_name,
		arch = %labels.cpu_arch,
		interval_ms = config.interval_ms,
		source = ?config.source,
		"monitoring node energy"
	);

	let source = source::create_energy_source(config)?;
	let exporter = RowExporter::new(labels, config.usage_metrics.clone(), config.energy_domains.clone());
	let mut monitor = NodeMonitor::new(source, exporter);

	let stdout = io::stdout();
	let mut out = stdout.lock();
	monitor.run(Duration::from_millis(config.interval_ms), config.iterations, &mut out)
}
