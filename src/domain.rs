use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Energy accounting domains reported for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum EnergyDomain {
	/// CPU cores (RAPL PP0)
	Core,
	/// Memory attached to the package
	Dram,
	/// Package energy outside the cores (RAPL PP1)
	Uncore,
	/// Whole CPU package
	Package,
	/// GPU, supplied as a ready-made delta
	Gpu,
	/// Residual seen by platform sensors but not by the package or GPU
	Other,
}

impl EnergyDomain {
	/// Every domain, in the order used for export by default
	pub const ALL: [EnergyDomain; 6] = [
		EnergyDomain::Core,
		EnergyDomain::Dram,
		EnergyDomain::Uncore,
		EnergyDomain::Package,
		EnergyDomain::Gpu,
		EnergyDomain::Other,
	];

	/// Returns the label key used for this domain in exported metrics
	pub fn as_str(&self) -> &'static str {
		match self {
			EnergyDomain::Core => "core",
			EnergyDomain::Dram => "dram",
			EnergyDomain::Uncore => "uncore",
			EnergyDomain::Package => "pkg",
			EnergyDomain::Gpu => "gpu",
			EnergyDomain::Other => "other",
		}
	}
}

impl fmt::Display for EnergyDomain {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for EnergyDomain {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"core" => Ok(EnergyDomain::Core),
			"dram" => Ok(EnergyDomain::Dram),
			"uncore" => Ok(EnergyDomain::Uncore),
			"pkg" | "package" => Ok(EnergyDomain::Package),
			"gpu" => Ok(EnergyDomain::Gpu),
			"other" => Ok(EnergyDomain::Other),
			_ => Err(Error::UnknownDomain(s.to_string())),
		}
	}
}

impl TryFrom<String> for EnergyDomain {
	type Error = Error;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		value.parse()
	}
}

impl From<EnergyDomain> for String {
	fn from(domain: EnergyDomain) -> Self {
		domain.as_str().to_string()
	}
}
