use std::collections::HashMap;

/// Cumulative energy readings of one CPU package, in millijoules
///
/// A domain the platform does not expose is reported as zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackageEnergy {
	/// Energy consumed by the cores (RAPL PP0)
	pub core: u64,

	/// Energy consumed by memory attached to the package
	pub dram: u64,

	/// Energy consumed outside the cores (RAPL PP1)
	pub uncore: u64,

	/// Energy consumed by the whole package
	pub package: u64,
}

/// One interval's worth of raw inputs for the aggregator
#[derive(Debug, Clone, Default)]
pub struct EnergyReadings {
	/// Sensor ID -> cumulative reading
	pub sensors: HashMap<String, f64>,

	/// Package ID -> cumulative readings per domain
	pub packages: HashMap<usize, PackageEnergy>,

	/// GPU energy consumed during the interval (already a delta)
	pub gpu_delta: u64,
}
