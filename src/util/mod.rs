pub mod cpu;
pub mod host;
pub mod msr;

/// Converts a raw RAPL counter value to millijoules
///
/// # Arguments
///
/// * `raw` - Counter value read from an energy status MSR
/// * `energy_unit` - Energy status unit from the unit MSR (energy is `raw / 2^unit` joules)
///
/// # Returns
///
/// Energy in millijoules, truncated
pub const fn raw_to_millijoules(raw: u64, energy_unit: u64) -> u64 {
	// Widen before scaling so large 64-bit AMD counters cannot overflow
	((raw as u128 * 1000) >> energy_unit) as u64
}

/// Converts microjoules, as exposed by powercap, to millijoules
pub const fn microjoules_to_millijoules(uj: u64) -> u64 {
	uj / 1000
}
