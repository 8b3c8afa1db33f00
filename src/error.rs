use std::io;

/// Errors raised by the collaborators that feed the aggregator
///
/// The aggregator itself never fails; these cover hardware access,
/// topology discovery and configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("I/O error: {0}")]
	Io(#[from] io::Error),

	#[error("MSR {address:#x} on cpu {cpu}: {message}")]
	Msr { address: u32, cpu: usize, message: String },

	#[error("topology error: {0}")]
	Topology(String),

	#[error("unknown energy domain: {0}")]
	UnknownDomain(String),

	#[error("configuration error: {0}")]
	Config(#[from] Box<figment::Error>),
}

impl Error {
	pub(crate) fn msr<S: Into<String>>(address: u32, cpu: usize, message: S) -> Self {
		Error::Msr {
			address,
			cpu,
			message: message.into(),
		}
	}

	pub(crate) fn topology<S: Into<String>>(msg: S) -> Self {
		Error::Topology(msg.into())
	}
}

impl From<figment::Error> for Error {
	fn from(err: figment::Error) -> Self {
		Error::Config(Box::new(err))
	}
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;
