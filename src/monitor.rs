use std::io::Write;
use std::thread;
use std::time::Duration;

use crate::error::Result;
use crate::export::RowExporter;
use crate::node::NodeEnergy;
use crate::source::EnergySource;
use crate::util::cpu::CpuUsage;

/// Drives one node's polling loop: read, aggregate, export
#[derive(Debug)]
pub struct NodeMonitor {
	source: Box<dyn EnergySource>,
	node: NodeEnergy,
	exporter: RowExporter,
	cpu_usage: Option<CpuUsage>,
}

impl NodeMonitor {
	/// Creates a monitor that also samples CPU usage from /proc/stat
	pub fn new(source: Box<dyn EnergySource>, exporter: RowExporter) -> Self {
		Self {
			source,
			node: NodeEnergy::new(),
			exporter,
			cpu_usage: Some(CpuUsage::new()),
		}
	}

	/// Disables CPU usage sampling; usage columns then export as zero
	pub fn without_usage(mut self) -> Self {
		self.cpu_usage = None;
		self
	}

	pub fn node(&self) -> &NodeEnergy {
		&self.node
	}

	pub fn exporter(&self) -> &RowExporter {
		&self.exporter
	}

	/// Runs one interval and returns the exported row
	pub fn poll(&mut self) -> Result<Vec<String>> {
		let readings = self.source.read_all()?;

		let usage = match self.cpu_usage.as_mut().map(CpuUsage::sample) {
			Some(Ok(usage)) => usage,
			Some(Err(e)) => {
				tracing::warn!(error = %e, "cpu usage sample failed");
				Default::default()
			},
			None => Default::default(),
		};

		self.node.reset();
		self.node
			.set_values(&readings.sensors, &readings.packages, readings.gpu_delta, usage);
		tracing::debug!("{}", self.node);

		Ok(self.exporter.row(&self.node))
	}

	/// Polls every `interval`, writing a header and then one tab-separated row per interval
	///
	/// Runs until `iterations` rows are written, or forever when `None`.
	pub fn run<W: Write>(&mut self, interval: Duration, iterations: Option<u64>, out: &mut W) -> Result<()> {
		writeln!(out, "{}", self.exporter.header().join("\t"))?;

		// The first poll measures counters from zero; discard it as a baseline
		self.poll()?;

		let mut completed = 0u64;
		while iterations.is_none_or(|limit| completed < limit) {
			thread::sleep(interval);
			let row = self.poll()?;
			writeln!(out, "{}", row.join("\t"))?;
			out.flush()?;
			completed += 1;
		}
		Ok(())
	}
}
