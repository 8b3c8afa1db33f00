use std::collections::HashMap;
use std::fmt::Debug;

use crate::constants::*;
use crate::cpu_type::{CpuType, detect_cpu_type};
use crate::energy::PackageEnergy;
use crate::error::Result;
use crate::source::EnergySource;
use crate::topology::PackageTopology;
use crate::util::msr::read_msr;
use crate::util::raw_to_millijoules;

/// Reads model-specific registers
pub trait MsrReader: Debug + Send {
	fn read(&self, address: u32, cpu: usize) -> Result<u64>;
}

/// Reads MSRs through `/dev/cpu/N/msr`
#[derive(Debug, Clone, Copy, Default)]
pub struct DevCpuMsr;

impl MsrReader for DevCpuMsr {
	fn read(&self, address: u32, cpu: usize) -> Result<u64> {
		read_msr(address, cpu)
	}
}

/// Extends a 32-bit RAPL energy counter into a monotonic 64-bit count
#[derive(Debug, Clone, Copy, Default)]
struct WrappingCounter {
	last: Option<u64>,
	total: u64,
}

impl WrappingCounter {
	fn advance(&mut self, raw: u64) -> u64 {
		let raw = raw & ENERGY_COUNTER_MASK;
		match self.last {
			Some(last) if raw < last => {
				// Handle counter wrap-around
				self.total += raw + ENERGY_COUNTER_MASK + 1 - last;
			},
			Some(last) => self.total += raw - last,
			None => self.total = raw,
		}
		self.last = Some(raw);
		self.total
	}
}

/// RAPL energy source backed by model-specific registers
///
/// Intel exposes package, PP0 (core), PP1 (uncore) and DRAM counters per
/// package. AMD exposes a package counter plus one counter per physical
/// core, which are summed into the core domain.
#[derive(Debug)]
pub struct MsrSource<R: MsrReader = DevCpuMsr> {
	reader: R,
	cpu_type: CpuType,
	topology: PackageTopology,

	/// Package ID -> energy status unit exponent
	energy_units: HashMap<usize, u64>,

	/// (MSR address, CPU) -> wrap-corrected counter
	counters: HashMap<(u32, usize), WrappingCounter>,
}

impl MsrSource<DevCpuMsr> {
	/// Creates a source for the running machine
	pub fn new() -> Result<Self> {
		let cpu_type = match detect_cpu_type() {
			CpuType::Unsupported => {
				tracing::warn!("unsupported CPU vendor, defaulting to Intel RAPL registers");
				CpuType::Intel
			},
			cpu_type => cpu_type,
		};
		Self::with_reader(DevCpuMsr, cpu_type, PackageTopology::detect())
	}
}

impl<R: MsrReader> MsrSource<R> {
	/// Creates a source with an explicit reader, vendor and topology
	///
	/// Fails if the energy unit register of any package cannot be read.
	pub fn with_reader(reader: R, cpu_type: CpuType, topology: PackageTopology) -> Result<Self> {
		let unit_msr = match cpu_type {
			CpuType::Amd => AMD_ENERGY_UNIT_MSR,
			_ => INTEL_POWER_UNIT_MSR,
		};

		let mut energy_units = HashMap::new();
		for (pkg_id, cpu) in topology.package_leaders() {
			let unit = (reader.read(unit_msr, cpu)? >> ENERGY_UNIT_SHIFT) & ENERGY_UNIT_MASK;
			energy_units.insert(pkg_id, unit);
		}

		tracing::info!(
			vendor = cpu_type.as_str(),
			packages = topology.package_count(),
			"RAPL MSR source ready"
		);

		Ok(Self {
			reader,
			cpu_type,
			topology,
			energy_units,
			counters: HashMap::new(),
		})
	}

	/// Reads one counter as cumulative millijoules
	fn read_counter(&mut self, address: u32, cpu: usize, unit: u64) -> Result<u64> {
		let raw = self.reader.read(address, cpu)?;
		let total = self.counters.entry((address, cpu)).or_default().advance(raw);
		Ok(raw_to_millijoules(total, unit))
	}

	/// Reads a counter the platform may not implement; absent domains read as zero
	fn read_optional(&mut self, address: u32, cpu: usize, unit: u64) -> u64 {
		self.read_counter(address, cpu, unit).unwrap_or_else(|e| {
			tracing::trace!(address, cpu, error = %e, "optional RAPL domain unavailable");
			0
		})
	}

	fn read_package(&mut self, pkg_id: usize, cpu: usize) -> Result<PackageEnergy> {
		let unit = self.energy_units.get(&pkg_id).copied().unwrap_or_default();

		match self.cpu_type {
			CpuType::Amd => {
				let package = self.read_counter(AMD_ENERGY_PKG_MSR, cpu, unit)?;
				let core_cpus: Vec<usize> = self.topology.core_leaders(pkg_id).collect();
				let core = core_cpus
					.into_iter()
					.map(|core_cpu| self.read_optional(AMD_ENERGY_CORE_MSR, core_cpu, unit))
					.fold(0u64, u64::saturating_add);
				Ok(PackageEnergy {
					core,
					dram: 0,
					uncore: 0,
					package,
				})
			},
			_ => Ok(PackageEnergy {
				package: self.read_counter(INTEL_PKG_ENERGY_MSR, cpu, unit)?,
				core: self.read_optional(INTEL_PP0_ENERGY_MSR, cpu, unit),
				uncore: self.read_optional(INTEL_PP1_ENERGY_MSR, cpu, unit),
				dram: self.read_optional(INTEL_DRAM_ENERGY_MSR, cpu, unit),
			}),
		}
	}
}

impl<R: MsrReader> EnergySource for MsrSource<R> {
	fn name(&self) -> &'static str {
		"msr"
	}

	fn read_packages(&mut self) -> Result<HashMap<usize, PackageEnergy>> {
		let leaders: Vec<(usize, usize)> = self.topology.package_leaders().collect();
		let mut packages = HashMap::with_capacity(leaders.len());
		for (pkg_id, cpu) in leaders {
			packages.insert(pkg_id, self.read_package(pkg_id, cpu)?);
		}
		Ok(packages)
	}
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeMap;
	use std::sync::{Arc, Mutex};

	use super::*;
	use crate::error::Error;

	/// Register file keyed by (address, cpu); missing registers fail to read
	#[derive(Debug, Clone, Default)]
	struct FakeMsr(Arc<Mutex<HashMap<(u32, usize), u64>>>);

	impl FakeMsr {
		fn set(&self, address: u32, cpu: usize, value: u64) {
			self.0.lock().unwrap().insert((address, cpu), value);
		}
	}

	impl MsrReader for FakeMsr {
		fn read(&self, address: u32, cpu: usize) -> Result<u64> {
			self.0
				.lock()
				.unwrap()
				.get(&(address, cpu))
				.copied()
				.ok_or_else(|| Error::msr(address, cpu, "no such register"))
		}
	}

	// Unit exponent 10: one tick is 1/1024 J
	const UNIT_10: u64 = 10 << ENERGY_UNIT_SHIFT;

	fn two_package_topology() -> PackageTopology {
		PackageTopology {
			packages: BTreeMap::from([(0, vec![0, 1]), (1, vec![2, 3])]),
			cores: BTreeMap::from([
				(0, BTreeMap::from([(0, 0), (1, 1)])),
				(1, BTreeMap::from([(0, 2), (1, 3)])),
			]),
		}
	}

	#[test]
	fn test_wrapping_counter_extends_past_32_bits() {
		let mut counter = WrappingCounter::default();
		assert_eq!(counter.advance(0xFFFF_FF00), 0xFFFF_FF00);
		assert_eq!(counter.advance(0x10), 0x1_0000_0010);
		assert_eq!(counter.advance(0x20), 0x1_0000_0020);
	}

	#[test]
	fn test_intel_reads_all_domains_per_package() {
		let msr = FakeMsr::default();
		for cpu in [0, 2] {
			msr.set(INTEL_POWER_UNIT_MSR, cpu, UNIT_10);
			msr.set(INTEL_PKG_ENERGY_MSR, cpu, 10_240);
			msr.set(INTEL_PP0_ENERGY_MSR, cpu, 5_120);
		}
		msr.set(INTEL_DRAM_ENERGY_MSR, 0, 2_048);

		let mut source = MsrSource::with_reader(msr, CpuType::Intel, two_package_topology()).unwrap();
		let packages = source.read_packages().unwrap();

		assert_eq!(
			packages[&0],
			PackageEnergy {
				core: 5_000,
				dram: 2_000,
				uncore: 0,
				package: 10_000,
			}
		);
		assert_eq!(packages[&1].dram, 0);
		assert_eq!(packages[&1].package, 10_000);
	}

	#[test]
	fn test_amd_sums_core_counters() {
		let msr = FakeMsr::default();
		msr.set(AMD_ENERGY_UNIT_MSR, 0, UNIT_10);
		msr.set(AMD_ENERGY_PKG_MSR, 0, 4_096);
		msr.set(AMD_ENERGY_CORE_MSR, 0, 1_024);
		msr.set(AMD_ENERGY_CORE_MSR, 1, 2_048);
		let topology = PackageTopology {
			packages: BTreeMap::from([(0, vec![0, 1])]),
			cores: BTreeMap::from([(0, BTreeMap::from([(0, 0), (1, 1)]))]),
		};

		let mut source = MsrSource::with_reader(msr, CpuType::Amd, topology).unwrap();
		let packages = source.read_packages().unwrap();
		assert_eq!(packages[&0].package, 4_000);
		assert_eq!(packages[&0].core, 3_000);
	}

	#[test]
	fn test_missing_unit_register_fails() {
		let result = MsrSource::with_reader(FakeMsr::default(), CpuType::Intel, two_package_topology());
		assert!(matches!(result, Err(Error::Msr { address: INTEL_POWER_UNIT_MSR, .. })));
	}

	#[test]
	fn test_counter_wrap_stays_monotonic() {
		let msr = FakeMsr::default();
		msr.set(INTEL_POWER_UNIT_MSR, 0, 0);
		msr.set(INTEL_PKG_ENERGY_MSR, 0, 0xFFFF_FFFF);
		let topology = PackageTopology::single_package(1);

		let mut source = MsrSource::with_reader(msr.clone(), CpuType::Intel, topology).unwrap();
		let first = source.read_packages().unwrap()[&0].package;
		msr.set(INTEL_PKG_ENERGY_MSR, 0, 1);
		let second = source.read_packages().unwrap()[&0].package;
		assert_eq!(second - first, 2_000);
	}
}
