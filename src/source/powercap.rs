use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::PSYS_ZONE_NAME;
use crate::energy::PackageEnergy;
use crate::error::{Error, Result};
use crate::source::EnergySource;
use crate::util::microjoules_to_millijoules;

const RAPL_ZONE_PREFIX: &str = "intel-rapl:";
const PACKAGE_ZONE_PREFIX: &str = "package-";

/// One `energy_uj` file, corrected for wrap-around at `max_energy_range_uj`
#[derive(Debug, Clone)]
struct ZoneCounter {
	path: PathBuf,
	range: Option<u64>,
	last: Option<u64>,
	total: u64,
}

impl ZoneCounter {
	fn new(zone_dir: &Path) -> Self {
		Self {
			path: zone_dir.join("energy_uj"),
			range: read_u64(&zone_dir.join("max_energy_range_uj")).ok(),
			last: None,
			total: 0,
		}
	}

	/// Cumulative millijoules since the first read
	fn read(&mut self) -> Result<u64> {
		let raw = read_u64(&self.path)?;
		self.total = match (self.last, self.range) {
			(Some(last), _) if raw >= last => self.total + (raw - last),
			(Some(last), Some(range)) => self.total + range.saturating_sub(last) + raw,
			// No known range: the aggregator sees the drop as a restart
			_ => raw,
		};
		self.last = Some(raw);
		Ok(microjoules_to_millijoules(self.total))
	}
}

/// Counters of one package zone and its subzones
#[derive(Debug, Clone)]
struct PackageZone {
	package: ZoneCounter,
	core: Option<ZoneCounter>,
	uncore: Option<ZoneCounter>,
	dram: Option<ZoneCounter>,
}

/// RAPL energy source backed by the Linux powercap sysfs tree
///
/// Package zones (`package-N`) supply the package domain and their `core`,
/// `uncore` and `dram` subzones. A top-level `psys` zone is reported as a
/// platform sensor.
#[derive(Debug)]
pub struct PowercapSource {
	packages: HashMap<usize, PackageZone>,
	sensors: HashMap<String, ZoneCounter>,
}

impl PowercapSource {
	/// Discovers RAPL zones under `root`, usually `/sys/class/powercap`
	pub fn new(root: &Path) -> Result<Self> {
		let mut packages = HashMap::new();
		let mut sensors = HashMap::new();

		for zone_dir in rapl_zones(root, RAPL_ZONE_PREFIX)? {
			let Ok(name) = read_name(&zone_dir) else {
				continue;
			};

			if name == PSYS_ZONE_NAME {
				sensors.insert(name, ZoneCounter::new(&zone_dir));
				continue;
			}

			let Some(pkg_id) = name
				.strip_prefix(PACKAGE_ZONE_PREFIX)
				.and_then(|id| id.parse::<usize>().ok())
			else {
				tracing::debug!(zone = %zone_dir.display(), %name, "skipping powercap zone");
				continue;
			};

			let mut zone = PackageZone {
				package: ZoneCounter::new(&zone_dir),
				core: None,
				uncore: None,
				dram: None,
			};

			let sub_prefix = format!("{}:", file_name(&zone_dir));
			for sub_dir in rapl_zones(&zone_dir, &sub_prefix)? {
				match read_name(&sub_dir).as_deref() {
					Ok("core") => zone.core = Some(ZoneCounter::new(&sub_dir)),
					Ok("uncore") => zone.uncore = Some(ZoneCounter::new(&sub_dir)),
					Ok("dram") => zone.dram = Some(ZoneCounter::new(&sub_dir)),
					_ => {},
				}
			}

			packages.insert(pkg_id, zone);
		}

		if packages.is_empty() {
			return Err(Error::topology(format!(
				"no RAPL package zones under {}",
				root.display()
			)));
		}

		tracing::info!(
			packages = packages.len(),
			sensors = sensors.len(),
			"powercap source ready"
		);
		Ok(Self { packages, sensors })
	}
}

impl EnergySource for PowercapSource {
	fn name(&self) -> &'static str {
		"powercap"
	}

	fn read_packages(&mut self) -> Result<HashMap<usize, PackageEnergy>> {
		let mut readings = HashMap::with_capacity(self.packages.len());
		for (&pkg_id, zone) in &mut self.packages {
			readings.insert(
				pkg_id,
				PackageEnergy {
					package: zone.package.read()?,
					core: read_optional(&mut zone.core),
					uncore: read_optional(&mut zone.uncore),
					dram: read_optional(&mut zone.dram),
				},
			);
		}
		Ok(readings)
	}

	fn read_sensors(&mut self) -> Result<HashMap<String, f64>> {
		let mut readings = HashMap::with_capacity(self.sensors.len());
		for (name, counter) in &mut self.sensors {
			readings.insert(name.clone(), counter.read()? as f64);
		}
		Ok(readings)
	}
}

fn read_optional(counter: &mut Option<ZoneCounter>) -> u64 {
	match counter {
		Some(counter) => counter.read().unwrap_or_else(|e| {
			tracing::trace!(path = %counter.path.display(), error = %e, "powercap subzone unreadable");
			0
		}),
		None => 0,
	}
}

/// Directories under `dir` named `<prefix><index>`
fn rapl_zones(dir: &Path, prefix: &str) -> Result<Vec<PathBuf>> {
	let mut zones: Vec<PathBuf> = fs::read_dir(dir)?
		.filter_map(|e| e.ok())
		.map(|e| e.path())
		.filter(|path| {
			file_name(path)
				.strip_prefix(prefix)
				.is_some_and(|rest| rest.parse::<usize>().is_ok())
		})
		.collect();
	zones.sort();
	Ok(zones)
}

fn file_name(path: &Path) -> String {
	path.file_name().unwrap_or_default().to_string_lossy().into_owned()
}

fn read_name(zone_dir: &Path) -> Result<String> {
	Ok(fs::read_to_string(zone_dir.join("name"))?.trim().to_string())
}

fn read_u64(path: &Path) -> Result<u64> {
	let content = fs::read_to_string(path)?;
	content
		.trim()
		.parse()
		.map_err(|e| Error::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

#[cfg(test)]
mod tests {
	use super::*;

	fn write_zone(dir: &Path, name: &str, energy_uj: u64) {
		fs::create_dir_all(dir).unwrap();
		fs::write(dir.join("name"), format!("{name}\n")).unwrap();
		fs::write(dir.join("energy_uj"), format!("{energy_uj}\n")).unwrap();
		fs::write(dir.join("max_energy_range_uj"), "262143328850\n").unwrap();
	}

	fn set_energy(dir: &Path, energy_uj: u64) {
		fs::write(dir.join("energy_uj"), format!("{energy_uj}\n")).unwrap();
	}

	#[test]
	fn test_discovers_packages_subzones_and_psys() {
		let root = tempfile::tempdir().unwrap();
		let pkg0 = root.path().join("intel-rapl:0");
		write_zone(&pkg0, "package-0", 10_000_000);
		write_zone(&pkg0.join("intel-rapl:0:0"), "core", 6_000_000);
		write_zone(&pkg0.join("intel-rapl:0:1"), "dram", 2_500_000);
		write_zone(&root.path().join("intel-rapl:1"), "psys", 20_000_000);
		// Aliases such as intel-rapl-mmio are not RAPL MSR zones
		write_zone(&root.path().join("intel-rapl-mmio:0"), "package-0", 1);

		let mut source = PowercapSource::new(root.path()).unwrap();
		let packages = source.read_packages().unwrap();
		assert_eq!(packages.len(), 1);
		assert_eq!(
			packages[&0],
			PackageEnergy {
				core: 6_000,
				dram: 2_500,
				uncore: 0,
				package: 10_000,
			}
		);

		let sensors = source.read_sensors().unwrap();
		assert_eq!(sensors["psys"], 20_000.0);
	}

	#[test]
	fn test_wrap_at_max_energy_range() {
		let root = tempfile::tempdir().unwrap();
		let pkg0 = root.path().join("intel-rapl:0");
		write_zone(&pkg0, "package-0", 262_143_000_000);
		fs::write(pkg0.join("max_energy_range_uj"), "262144000000\n").unwrap();

		let mut source = PowercapSource::new(root.path()).unwrap();
		let first = source.read_packages().unwrap()[&0].package;
		set_energy(&pkg0, 500_000);
		let second = source.read_packages().unwrap()[&0].package;
		assert_eq!(second - first, 1_500);
	}

	#[test]
	fn test_no_package_zone_is_an_error() {
		let root = tempfile::tempdir().unwrap();
		write_zone(&root.path().join("intel-rapl:0"), "psys", 1);
		assert!(matches!(PowercapSource::new(root.path()), Err(Error::Topology(_))));
	}
}
