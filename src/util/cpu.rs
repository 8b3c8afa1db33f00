use std::collections::HashMap;
use std::fs;

use crate::constants::{USAGE_CPU_TIME, USAGE_CPU_UTILIZATION};
use crate::error::Result;

const PROC_STAT_PATH: &str = "/proc/stat";

/// Aggregate CPU tick counters from the `cpu` line of /proc/stat
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuStats {
	pub user: u64,
	pub nice: u64,
	pub system: u64,
	pub idle: u64,
	pub iowait: u64,
	pub irq: u64,
	pub softirq: u64,
	pub steal: u64,
}

impl CpuStats {
	/// Parses the aggregate `cpu ` line out of /proc/stat content
	pub fn parse(stat: &str) -> Option<Self> {
		let line = stat.lines().find(|line| line.starts_with("cpu "))?;
		let fields: Vec<u64> = line
			.split_whitespace()
			.skip(1)
			.map(|v| v.parse().unwrap_or(0))
			.collect();
		if fields.len() < 7 {
			return None;
		}

		Some(Self {
			user: fields[0],
			nice: fields[1],
			system: fields[2],
			idle: fields[3],
			iowait: fields[4],
			irq: fields[5],
			softirq: fields[6],
			steal: fields.get(7).copied().unwrap_or(0),
		})
	}

	pub fn idle_total(&self) -> u64 {
		self.idle + self.iowait
	}

	pub fn total(&self) -> u64 {
		self.user + self.nice + self.system + self.idle + self.iowait + self.irq + self.softirq + self.steal
	}

	pub fn busy(&self) -> u64 {
		self.total() - self.idle_total()
	}
}

/// Samples node CPU usage between polling intervals
///
/// Produces the usage map handed to the aggregator: busy ticks spent during
/// the interval and the busy percentage.
#[derive(Debug, Clone, Default)]
pub struct CpuUsage {
	prev: Option<CpuStats>,
}

impl CpuUsage {
	pub fn new() -> Self {
		Self::default()
	}

	/// Reads /proc/stat and returns usage since the previous call
	pub fn sample(&mut self) -> Result<HashMap<String, f64>> {
		let stat = fs::read_to_string(PROC_STAT_PATH)?;
		Ok(self.sample_from(&stat))
	}

	/// Computes usage from /proc/stat content; the first sample reports zero
	pub fn sample_from(&mut self, stat: &str) -> HashMap<String, f64> {
		let mut usage = HashMap::new();
		let Some(current) = CpuStats::parse(stat) else {
			tracing::warn!("no aggregate cpu line in /proc/stat");
			return usage;
		};

		let (busy, utilization) = match self.prev {
			Some(prev) => {
				let total_diff = current.total().saturating_sub(prev.total());
				let busy_diff = current.busy().saturating_sub(prev.busy());
				let utilization = if total_diff > 0 {
					busy_diff as f64 / total_diff as f64 * 100.0
				} else {
					0.0
				};
				(busy_diff as f64, utilization)
			},
			None => (0.0, 0.0),
		};

		usage.insert(USAGE_CPU_TIME.to_string(), busy);
		usage.insert(USAGE_CPU_UTILIZATION.to_string(), utilization);
		self.prev = Some(current);
		usage
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const STAT_T0: &str = "cpu  100 0 100 700 100 0 0 0 0 0\ncpu0 50 0 50 350 50 0 0 0 0 0\n";
	const STAT_T1: &str = "cpu  150 0 150 750 150 0 0 0 0 0\ncpu0 75 0 75 375 75 0 0 0 0 0\n";

	#[test]
	fn test_parse_aggregate_line() {
		let stats = CpuStats::parse(STAT_T0).unwrap();
		assert_eq!(stats.user, 100);
		assert_eq!(stats.total(), 1000);
		assert_eq!(stats.busy(), 200);
	}

	#[test]
	fn test_parse_rejects_short_line() {
		assert!(CpuStats::parse("cpu  1 2 3\n").is_none());
		assert!(CpuStats::parse("intr 12345\n").is_none());
	}

	#[test]
	fn test_first_sample_is_zero() {
		let mut usage = CpuUsage::new();
		let sample = usage.sample_from(STAT_T0);
		assert_eq!(sample[USAGE_CPU_TIME], 0.0);
		assert_eq!(sample[USAGE_CPU_UTILIZATION], 0.0);
	}

	#[test]
	fn test_usage_between_samples() {
		let mut usage = CpuUsage::new();
		usage.sample_from(STAT_T0);
		let sample = usage.sample_from(STAT_T1);
		// 100 busy ticks out of 200
		assert_eq!(sample[USAGE_CPU_TIME], 100.0);
		assert!((sample[USAGE_CPU_UTILIZATION] - 50.0).abs() < 1e-9);
	}
}
