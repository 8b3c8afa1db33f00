// AMD RAPL MSR addresses
pub const AMD_ENERGY_UNIT_MSR: u32 = 0xC001_0299;
pub const AMD_ENERGY_CORE_MSR: u32 = 0xC001_029A;
pub const AMD_ENERGY_PKG_MSR: u32 = 0xC001_029B;

// Intel RAPL MSR addresses
pub const INTEL_POWER_UNIT_MSR: u32 = 0x606;
pub const INTEL_PKG_ENERGY_MSR: u32 = 0x611;
pub const INTEL_DRAM_ENERGY_MSR: u32 = 0x619;
pub const INTEL_PP0_ENERGY_MSR: u32 = 0x639;
pub const INTEL_PP1_ENERGY_MSR: u32 = 0x641;

// Energy status unit lives in bits 12:8 of the unit MSR on both vendors
pub const ENERGY_UNIT_SHIFT: u64 = 8;
pub const ENERGY_UNIT_MASK: u64 = 0x1F;

// RAPL energy status counters are 32 bits wide
pub const ENERGY_COUNTER_MASK: u64 = 0xFFFF_FFFF;

/// Raw readings are millijoules; exported values are joules
pub const MILLI_PER_UNIT: f64 = 1000.0;

/// Sysfs zone name reported as a platform sensor by the powercap source
pub const PSYS_ZONE_NAME: &str = "psys";

// Polling defaults
pub const DEFAULT_INTERVAL_MS: u64 = 3000;
pub const DEFAULT_POWERCAP_ROOT: &str = "/sys/class/powercap";

// Usage metric names produced by the CPU usage sampler
pub const USAGE_CPU_TIME: &str = "cpu_time";
pub const USAGE_CPU_UTILIZATION: &str = "cpu_utilization";

pub const UNKNOWN_LABEL: &str = "unknown";
