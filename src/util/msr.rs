use msru::{Accessor, Msr};

use crate::error::{Error, Result};

/// Reads a value from a Model-Specific Register (MSR)
///
/// # Arguments
///
/// * `msr_address` - The address of the MSR to read
/// * `cpu_id` - The logical CPU to read the MSR from
///
/// # Returns
///
/// The raw register value, or an [`Error::Msr`] naming the register and CPU
pub fn read_msr(msr_address: u32, cpu_id: usize) -> Result<u64> {
	let cpu = u16::try_from(cpu_id).map_err(|_| Error::msr(msr_address, cpu_id, "cpu id out of range"))?;
	Msr::new(msr_address, cpu)
		.map_err(|e| Error::msr(msr_address, cpu_id, e.to_string()))?
		.read()
		.map_err(|e| Error::msr(msr_address, cpu_id, e.to_string()))
}
