use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

const SYSFS_CPU_ROOT: &str = "/sys/devices/system/cpu";

/// Maps physical CPU packages to their cores and logical processors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageTopology {
	/// Package ID -> logical CPU IDs, sorted
	pub packages: BTreeMap<usize, Vec<usize>>,

	/// Package ID -> physical core ID -> first logical CPU of that core
	pub cores: BTreeMap<usize, BTreeMap<usize, usize>>,
}

impl PackageTopology {
	/// Detects the package layout, preferring sysfs
	///
	/// Without sysfs all logical CPUs are assumed to sit on package 0.
	pub fn detect() -> Self {
		match Self::from_sysfs(Path::new(SYSFS_CPU_ROOT)) {
			Ok(topology) => topology,
			Err(e) => {
				tracing::warn!(error = %e, "falling back to single-package topology");
				Self::single_package(num_cpus::get())
			},
		}
	}

	/// Reads `cpuN/topology/{physical_package_id,core_id}` entries under `root`
	pub fn from_sysfs(root: &Path) -> Result<Self> {
		let mut packages: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
		let mut cores: BTreeMap<usize, BTreeMap<usize, usize>> = BTreeMap::new();

		for entry in fs::read_dir(root)?.filter_map(|e| e.ok()) {
			let filename = entry.file_name();
			let Some(cpu_id) = filename
				.to_str()
				.and_then(|name| name.strip_prefix("cpu"))
				.and_then(|id| id.parse::<usize>().ok())
			else {
				continue;
			};

			let topology_dir = entry.path().join("topology");
			let Some(package_id) = read_id(&topology_dir.join("physical_package_id")) else {
				continue;
			};
			packages.entry(package_id).or_default().push(cpu_id);

			// Without core_id every logical CPU counts as its own core
			let core_id = read_id(&topology_dir.join("core_id")).unwrap_or(cpu_id);
			let leader = cores.entry(package_id).or_default().entry(core_id).or_insert(cpu_id);
			*leader = (*leader).min(cpu_id);
		}

		if packages.is_empty() {
			return Err(Error::topology(format!(
				"no physical_package_id entries under {}",
				root.display()
			)));
		}

		for cpus in packages.values_mut() {
			cpus.sort_unstable();
		}
		Ok(Self { packages, cores })
	}

	/// One package owning CPUs `0..cpus`, one core per CPU
	pub fn single_package(cpus: usize) -> Self {
		let cpus: Vec<usize> = (0..cpus.max(1)).collect();
		Self {
			cores: BTreeMap::from([(0, cpus.iter().map(|&cpu| (cpu, cpu)).collect())]),
			packages: BTreeMap::from([(0, cpus)]),
		}
	}

	/// First logical CPU of each package, used to address package-scoped MSRs
	pub fn package_leaders(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
		self.packages
			.iter()
			.filter_map(|(&pkg_id, cpus)| cpus.first().map(|&cpu| (pkg_id, cpu)))
	}

	/// First logical CPU of each physical core on a package, used for per-core MSRs
	pub fn core_leaders(&self, pkg_id: usize) -> impl Iterator<Item = usize> + '_ {
		self.cores.get(&pkg_id).into_iter().flat_map(|cores| cores.values().copied())
	}

	pub fn package_count(&self) -> usize {
		self.packages.len()
	}
}

fn read_id(path: &Path) -> Option<usize> {
	fs::read_to_string(path).ok()?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn write_cpu(root: &Path, cpu: usize, package: &str, core: &str) {
		let dir = root.join(format!("cpu{cpu}/topology"));
		fs::create_dir_all(&dir).unwrap();
		fs::write(dir.join("physical_package_id"), package).unwrap();
		fs::write(dir.join("core_id"), core).unwrap();
	}

	#[test]
	fn test_reads_packages_from_sysfs() {
		let root = tempfile::tempdir().unwrap();
		// cpu0/cpu2 and cpu1/cpu3 are SMT siblings
		write_cpu(root.path(), 0, "0\n", "0\n");
		write_cpu(root.path(), 3, "1\n", "0\n");
		write_cpu(root.path(), 1, "1\n", "0\n");
		write_cpu(root.path(), 2, "0\n", "0\n");
		write_cpu(root.path(), 4, "0\n", "1\n");
		fs::create_dir_all(root.path().join("cpufreq")).unwrap();

		let topology = PackageTopology::from_sysfs(root.path()).unwrap();
		assert_eq!(topology.package_count(), 2);
		assert_eq!(topology.packages[&0], vec![0, 2, 4]);
		assert_eq!(topology.packages[&1], vec![1, 3]);
		assert_eq!(topology.package_leaders().collect::<Vec<_>>(), vec![(0, 0), (1, 1)]);
		assert_eq!(topology.core_leaders(0).collect::<Vec<_>>(), vec![0, 4]);
		assert_eq!(topology.core_leaders(1).collect::<Vec<_>>(), vec![1]);
		assert_eq!(topology.core_leaders(7).count(), 0);
	}

	#[test]
	fn test_empty_sysfs_is_an_error() {
		let root = tempfile::tempdir().unwrap();
		assert!(matches!(
			PackageTopology::from_sysfs(root.path()),
			Err(Error::Topology(_))
		));
	}

	#[test]
	fn test_single_package_fallback() {
		let topology = PackageTopology::single_package(4);
		assert_eq!(topology.packages[&0], vec![0, 1, 2, 3]);
		assert_eq!(topology.core_leaders(0).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
		assert_eq!(PackageTopology::single_package(0).packages[&0], vec![0]);
	}
}
