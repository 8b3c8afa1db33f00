use crate::constants::MILLI_PER_UNIT;
use crate::domain::EnergyDomain;
use crate::node::NodeEnergy;

/// Static labels identifying the node in exported rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeLabels {
	pub node_name: String,
	pub cpu_arch: String,
}

impl NodeLabels {
	pub fn new(node_name: impl Into<String>, cpu_arch: impl Into<String>) -> Self {
		Self {
			node_name: node_name.into(),
			cpu_arch: cpu_arch.into(),
		}
	}
}

/// Formats a node's interval values as a positional metrics row
///
/// Rows are `[node_name, cpu_arch, usage..., energy...]`; the caller
/// interprets positions using the same metric and domain order.
#[derive(Debug, Clone)]
pub struct RowExporter {
	labels: NodeLabels,
	usage_metrics: Vec<String>,
	energy_domains: Vec<EnergyDomain>,
}

impl RowExporter {
	pub fn new(labels: NodeLabels, usage_metrics: Vec<String>, energy_domains: Vec<EnergyDomain>) -> Self {
		Self {
			labels,
			usage_metrics,
			energy_domains,
		}
	}

	pub fn labels(&self) -> &NodeLabels {
		&self.labels
	}

	/// Column names matching the positions of [`RowExporter::row`]
	pub fn header(&self) -> Vec<String> {
		let mut header = Vec::with_capacity(2 + self.usage_metrics.len() + self.energy_domains.len());
		header.push("node_name".to_string());
		header.push("cpu_arch".to_string());
		header.extend(self.usage_metrics.iter().cloned());
		header.extend(self.energy_domains.iter().map(|d| format!("{}_joules", d.as_str())));
		header
	}

	/// Builds the row for the node's current interval
	///
	/// Usage values are truncated to integers (missing metrics are 0) and
	/// energy totals are converted from millijoules to joules.
	pub fn row(&self, node: &NodeEnergy) -> Vec<String> {
		let mut values = Vec::with_capacity(2 + self.usage_metrics.len() + self.energy_domains.len());
		values.push(self.labels.node_name.clone());
		values.push(self.labels.cpu_arch.clone());

		let usage = node.usage();
		for metric in &self.usage_metrics {
			let value = usage.get(metric).copied().unwrap_or(0.0);
			values.push((value as u64).to_string());
		}

		for &domain in &self.energy_domains {
			values.push(format_joules(node.domain_total(domain)));
		}

		values
	}
}

/// Formats a millijoule total as joules with six decimals
pub fn format_joules(millijoules: u64) -> String {
	format!("{:.6}", millijoules as f64 / MILLI_PER_UNIT)
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use super::*;
	use crate::energy::PackageEnergy;

	fn populated_node() -> NodeEnergy {
		let mut node = NodeEnergy::new();
		node.reset();
		node.set_values(
			&HashMap::from([("s1".to_string(), 500.0)]),
			&HashMap::from([(
				0,
				PackageEnergy {
					core: 0,
					dram: 100,
					uncore: 20,
					package: 300,
				},
			)]),
			50,
			HashMap::from([("cpu".to_string(), 12.9)]),
		);
		node
	}

	#[test]
	fn test_row_layout() {
		let exporter = RowExporter::new(
			NodeLabels::new("worker-1", "Sapphire Rapids"),
			vec!["cpu".to_string(), "memory".to_string()],
			EnergyDomain::ALL.to_vec(),
		);
		let row = exporter.row(&populated_node());
		assert_eq!(
			row,
			vec![
				"worker-1",
				"Sapphire Rapids",
				"12",
				"0",
				"0.180000",
				"0.100000",
				"0.020000",
				"0.300000",
				"0.050000",
				"0.150000",
			]
		);
	}

	#[test]
	fn test_header_matches_row_width() {
		let exporter = RowExporter::new(
			NodeLabels::new("n", "a"),
			vec!["cpu".to_string()],
			vec![EnergyDomain::Package, EnergyDomain::Other],
		);
		let header = exporter.header();
		assert_eq!(header, vec!["node_name", "cpu_arch", "cpu", "pkg_joules", "other_joules"]);
		assert_eq!(header.len(), exporter.row(&populated_node()).len());
	}

	#[test]
	fn test_format_joules_round_trip() {
		for total in [0u64, 1, 999, 1_000, 123_456, 987_654_321] {
			let parsed: f64 = format_joules(total).parse().unwrap();
			assert!((parsed - total as f64 / 1000.0).abs() < 1e-6);
		}
	}
}
