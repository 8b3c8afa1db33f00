pub mod msr;
pub mod powercap;

use std::collections::HashMap;
use std::fmt::Debug;

use crate::config::{Config, SourceKind};
use crate::energy::{EnergyReadings, PackageEnergy};
use crate::error::Result;

/// Supplies raw energy readings for the aggregator
///
/// Package and sensor readings are cumulative millijoules; the GPU value is
/// the energy consumed since the previous read.
pub trait EnergySource: Debug + Send {
	/// Short name used in logs
	fn name(&self) -> &'static str;

	/// Reads cumulative energy per CPU package
	fn read_packages(&mut self) -> Result<HashMap<usize, PackageEnergy>>;

	/// Reads cumulative energy per platform sensor
	fn read_sensors(&mut self) -> Result<HashMap<String, f64>> {
		Ok(HashMap::new())
	}

	/// Reads GPU energy consumed since the previous call
	fn read_gpu_delta(&mut self) -> Result<u64> {
		Ok(0)
	}

	/// Collects one interval's readings
	///
	/// Sensor and GPU failures are logged and treated as absent; package
	/// failures are returned.
	fn read_all(&mut self) -> Result<EnergyReadings> {
		let packages = self.read_packages()?;
		let sensors = self.read_sensors().unwrap_or_else(|e| {
			tracing::warn!(source = self.name(), error = %e, "sensor read failed");
			HashMap::new()
		});
		let gpu_delta = self.read_gpu_delta().unwrap_or_else(|e| {
			tracing::warn!(source = self.name(), error = %e, "gpu read failed");
			0
		});
		Ok(EnergyReadings {
			sensors,
			packages,
			gpu_delta,
		})
	}
}

/// Factory function to create the configured energy source
pub fn create_energy_source(config: &Config) -> Result<Box<dyn EnergySource>> {
	match config.source {
		SourceKind::Msr => Ok(Box::new(msr::MsrSource::new()?)),
		SourceKind::Powercap => Ok(Box::new(powercap::PowercapSource::new(&config.powercap_root)?)),
	}
}
