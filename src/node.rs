use std::collections::HashMap;
use std::fmt;

use crate::counter::DeltaCounterSet;
use crate::domain::EnergyDomain;
use crate::energy::PackageEnergy;

/// Core, DRAM and uncore energy of one package for the last interval
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackageBreakdown {
	pub core: u64,
	pub dram: u64,
	pub uncore: u64,
}

/// Per-interval energy accounting for a node
///
/// Owns one delta counter set per hardware domain plus the GPU and residual
/// scalars. Call [`NodeEnergy::reset`] before each [`NodeEnergy::set_values`];
/// totals are valid between `set_values` and the next reset.
///
/// A domain whose total is exactly zero is taken as not measured by the
/// platform and is derived from the package total, with priority
/// core > dram > uncore.
#[derive(Debug, Clone, Default)]
pub struct NodeEnergy {
	core: DeltaCounterSet<usize>,
	dram: DeltaCounterSet<usize>,
	uncore: DeltaCounterSet<usize>,
	package: DeltaCounterSet<usize>,
	sensor: DeltaCounterSet<String>,
	gpu: u64,
	other: u64,
	usage: HashMap<String, f64>,
}

impl NodeEnergy {
	pub fn new() -> Self {
		Self::default()
	}

	/// Clears the interval values, keeping counter history for the next deltas
	pub fn reset(&mut self) {
		self.usage.clear();
		self.core.reset();
		self.dram.reset();
		self.uncore.reset();
		self.package.reset();
		self.sensor.reset();
		self.gpu = 0;
		self.other = 0;
	}

	/// Ingests one interval of cumulative readings
	///
	/// Sensor readings are truncated to integer millijoules; negative or NaN
	/// readings count as zero.
	pub fn set_values(
		&mut self,
		sensors: &HashMap<String, f64>,
		packages: &HashMap<usize, PackageEnergy>,
		gpu_delta: u64,
		usage: HashMap<String, f64>,
	) {
		tracing::debug!(?sensors, ?packages, gpu_delta, "node energy readings");

		for (sensor_id, &energy) in sensors {
			// `as` saturates and maps NaN to zero
			self.sensor.update(sensor_id.clone(), energy as u64);
		}

		for (&pkg_id, energy) in packages {
			self.core.update(pkg_id, energy.core);
			self.dram.update(pkg_id, energy.dram);
			self.uncore.update(pkg_id, energy.uncore);
			self.package.update(pkg_id, energy.package);
		}

		self.gpu = gpu_delta;

		let total_sensor = self.sensor.total();
		let attributed = self.package.total().saturating_add(gpu_delta);
		self.other = total_sensor.saturating_sub(attributed);

		self.usage = usage;

		tracing::debug!(
			core = self.core.total(),
			dram = self.dram.total(),
			uncore = self.uncore.total(),
			pkg = self.package.total(),
			gpu = self.gpu,
			sensor = total_sensor,
			other = self.other,
			"node energy deltas"
		);
	}

	/// Raw interval total of a domain, without any derivation
	pub fn measured_total(&self, domain: EnergyDomain) -> u64 {
		match domain {
			EnergyDomain::Core => self.core.total(),
			EnergyDomain::Dram => self.dram.total(),
			EnergyDomain::Uncore => self.uncore.total(),
			EnergyDomain::Package => self.package.total(),
			EnergyDomain::Gpu => self.gpu,
			EnergyDomain::Other => self.other,
		}
	}

	/// Interval total of a domain, deriving core and DRAM when not measured
	///
	/// If neither core nor DRAM is measured, all package energy not claimed
	/// by uncore is reported as core and DRAM stays zero.
	pub fn domain_total(&self, domain: EnergyDomain) -> u64 {
		let val = self.measured_total(domain);
		if val != 0 {
			return val;
		}

		let pkg = self.package.total();
		let uncore = self.uncore.total();
		match domain {
			EnergyDomain::Core => pkg.saturating_sub(self.dram.total()).saturating_sub(uncore),
			EnergyDomain::Dram => {
				let core = self.core.total();
				if core > 0 {
					pkg.saturating_sub(core).saturating_sub(uncore)
				} else {
					0
				}
			},
			_ => 0,
		}
	}

	/// Total node energy for the interval: package + GPU + other
	pub fn node_total(&self) -> u64 {
		self.package.total().saturating_add(self.gpu).saturating_add(self.other)
	}

	/// Core, DRAM and uncore energy of a single package
	///
	/// Applies the same core > dram > uncore priority as [`NodeEnergy::domain_total`]
	/// using that package's own deltas. Unknown packages yield zeros.
	pub fn package_breakdown(&self, pkg_id: usize) -> PackageBreakdown {
		let pkg = self.package.delta(&pkg_id);
		let mut breakdown = PackageBreakdown {
			core: self.core.delta(&pkg_id),
			dram: self.dram.delta(&pkg_id),
			uncore: self.uncore.delta(&pkg_id),
		};

		if breakdown.core == 0 {
			breakdown.core = pkg.saturating_sub(breakdown.dram).saturating_sub(breakdown.uncore);
		} else if breakdown.dram == 0 {
			breakdown.dram = pkg.saturating_sub(breakdown.core).saturating_sub(breakdown.uncore);
		}
		breakdown
	}

	/// Package IDs seen so far
	pub fn package_ids(&self) -> impl Iterator<Item = &usize> {
		self.package.ids()
	}

	/// Sum of all sensor deltas for the interval
	pub fn sensor_total(&self) -> u64 {
		self.sensor.total()
	}

	/// Usage snapshot passed in with the last readings
	pub fn usage(&self) -> &HashMap<String, f64> {
		&self.usage
	}
}

impl fmt::Display for NodeEnergy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"node energy (mJ): pkg: {} (core: {} dram: {} uncore: {}) gpu: {} other: {}",
			self.package.total(),
			self.core.total(),
			self.dram.total(),
			self.uncore.total(),
			self.gpu,
			self.other
		)
	}
}
