//! Configuration loading.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_INTERVAL_MS, DEFAULT_POWERCAP_ROOT, USAGE_CPU_TIME, USAGE_CPU_UTILIZATION};
use crate::domain::EnergyDomain;
use crate::error::Result;

/// Where package energy counters are read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
	/// RAPL model-specific registers (needs the msr module and root)
	Msr,
	/// Linux powercap sysfs zones
	Powercap,
}

/// Exporter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	/// Polling interval in milliseconds
	pub interval_ms: u64,

	/// Energy counter source
	pub source: SourceKind,

	/// Root of the powercap sysfs tree
	pub powercap_root: PathBuf,

	/// Overrides the detected hostname label
	pub node_name: Option<String>,

	/// Overrides the detected CPU architecture label
	pub cpu_arch: Option<String>,

	/// Usage metrics exported, in column order
	pub usage_metrics: Vec<String>,

	/// Energy domains exported, in column order
	pub energy_domains: Vec<EnergyDomain>,

	/// Stop after this many intervals; runs forever when unset
	pub iterations: Option<u64>,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			interval_ms: DEFAULT_INTERVAL_MS,
			source: SourceKind::Powercap,
			powercap_root: PathBuf::from(DEFAULT_POWERCAP_ROOT),
			node_name: None,
			cpu_arch: None,
			usage_metrics: vec![USAGE_CPU_TIME.to_string(), USAGE_CPU_UTILIZATION.to_string()],
			energy_domains: EnergyDomain::ALL.to_vec(),
			iterations: None,
		}
	}
}

impl Config {
	/// Loads defaults, then the optional TOML file, then `NODE_ENERGY_*` variables
	pub fn load_from(config_path: Option<&Path>) -> Result<Self> {
		let mut figment = Figment::from(Serialized::defaults(Self::default()));

		if let Some(path) = config_path {
			figment = figment.merge(Toml::file(path));
		}

		figment = figment.merge(Env::prefixed("NODE_ENERGY_"));

		Ok(figment.extract()?)
	}
}

#[cfg(test)]
mod tests {
	use std::fs;

	use super::*;

	#[test]
	fn test_defaults() {
		let config = Config::default();
		assert_eq!(config.interval_ms, 3000);
		assert_eq!(config.source, SourceKind::Powercap);
		assert_eq!(config.energy_domains, EnergyDomain::ALL.to_vec());
		assert_eq!(config.usage_metrics, vec!["cpu_time", "cpu_utilization"]);
	}

	#[test]
	fn test_toml_overrides_defaults() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("node-energy.toml");
		fs::write(
			&path,
			"interval_ms = 500\nsource = \"msr\"\nnode_name = \"worker-7\"\nenergy_domains = [\"pkg\", \"other\"]\n",
		)
		.unwrap();

		let config = Config::load_from(Some(&path)).unwrap();
		assert_eq!(config.interval_ms, 500);
		assert_eq!(config.source, SourceKind::Msr);
		assert_eq!(config.node_name.as_deref(), Some("worker-7"));
		assert_eq!(config.energy_domains, vec![EnergyDomain::Package, EnergyDomain::Other]);
		assert_eq!(config.powercap_root, PathBuf::from("/sys/class/powercap"));
	}

	#[test]
	fn test_unknown_domain_is_rejected() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("node-energy.toml");
		fs::write(&path, "energy_domains = [\"sensor\"]\n").unwrap();

		assert!(Config::load_from(Some(&path)).is_err());
	}
}
