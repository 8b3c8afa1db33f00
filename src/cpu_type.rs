use std::fs;

use crate::constants::UNKNOWN_LABEL;

const CPUINFO_PATH: &str = "/proc/cpuinfo";

/// Represents CPU manufacturer types that can be detected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuType {
	/// Intel CPU architecture
	Intel,
	/// AMD CPU architecture
	Amd,
	/// Any other CPU architecture not explicitly supported
	Unsupported,
}

impl CpuType {
	/// Returns the vendor name used in logs
	pub fn as_str(&self) -> &'static str {
		match self {
			CpuType::Intel => "intel",
			CpuType::Amd => "amd",
			CpuType::Unsupported => "unsupported",
		}
	}

	fn from_cpuinfo(cpuinfo: &str) -> Self {
		if cpuinfo.contains("GenuineIntel") {
			CpuType::Intel
		} else if cpuinfo.contains("AuthenticAMD") {
			CpuType::Amd
		} else {
			CpuType::Unsupported
		}
	}
}

/// Detects the CPU manufacturer by reading /proc/cpuinfo
pub fn detect_cpu_type() -> CpuType {
	let cpuinfo = fs::read_to_string(CPUINFO_PATH).unwrap_or_default();
	CpuType::from_cpuinfo(&cpuinfo)
}

/// Detects the CPU architecture label, e.g. the processor model name
///
/// Falls back to "unknown" when /proc/cpuinfo is unreadable or carries no
/// model name.
pub fn detect_cpu_arch() -> String {
	match fs::read_to_string(CPUINFO_PATH) {
		Ok(cpuinfo) => cpu_arch_from_cpuinfo(&cpuinfo),
		Err(e) => {
			tracing::warn!(error = %e, "cannot read {CPUINFO_PATH}");
			UNKNOWN_LABEL.to_string()
		},
	}
}

fn cpu_arch_from_cpuinfo(cpuinfo: &str) -> String {
	cpuinfo
		.lines()
		.filter_map(|line| line.split_once(':'))
		.find(|(key, _)| key.trim() == "model name")
		.map(|(_, value)| value.trim())
		.filter(|value| !value.is_empty())
		.unwrap_or(UNKNOWN_LABEL)
		.to_string()
}
