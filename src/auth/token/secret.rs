//! Secret wrapper for provider credentials and bearer values.

// crates.io
use oauth2::http::{HeaderValue, header::InvalidHeaderValue};
// self
use crate::_prelude::*;

/// Client secret, owner password, or provider token.
///
/// `Debug` and `Display` print `<redacted>`; serde keeps the raw value so caches can persist it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps a new secret string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// `Authorization` value (`Bearer <secret>`), flagged sensitive so `http` and `hyper`
	/// skip it in their own debug output.
	pub fn bearer_header(&self) -> Result<HeaderValue, InvalidHeaderValue> {
		let mut value = HeaderValue::try_from(format!("Bearer {}", self.0))?;

		value.set_sensitive(true);

		Ok(value)
	}
}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("TokenSecret(<redacted>)")
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn formatters_redact_while_serde_keeps_the_value() {
		let secret = TokenSecret::new("factus-access");

		assert_eq!(format!("{secret:?}"), "TokenSecret(<redacted>)");
		assert_eq!(format!("{secret}"), "<redacted>");
		assert_eq!(
			serde_json::to_string(&secret).expect("Secret should serialize."),
			"\"factus-access\""
		);
	}

	#[test]
	fn bearer_header_is_sensitive_and_rejects_control_characters() {
		let header = TokenSecret::new("abc").bearer_header().expect("Header should build.");

		assert_eq!(header, "Bearer abc");
		assert!(header.is_sensitive());
		assert!(TokenSecret::new("abc\ndef").bearer_header().is_err());
	}
}
