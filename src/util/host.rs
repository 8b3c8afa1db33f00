use std::io;

use crate::constants::UNKNOWN_LABEL;

/// Returns the node's hostname, or "unknown" if it cannot be read
pub fn hostname() -> String {
	match read_hostname() {
		Ok(name) if !name.is_empty() => name,
		Ok(_) => UNKNOWN_LABEL.to_string(),
		Err(e) => {
			tracing::warn!(error = %e, "cannot read hostname");
			UNKNOWN_LABEL.to_string()
		},
	}
}

fn read_hostname() -> io::Result<String> {
	let mut buf = [0u8; 256];
	// SAFETY: buf is valid for writes of buf.len() bytes
	let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast::<libc::c_char>(), buf.len()) };
	if rc != 0 {
		return Err(io::Error::last_os_error());
	}
	let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
	Ok(String::from_utf8_lossy(&buf[..len]).into_owned())
}
