//! Strongly typed identifiers enforced across the broker domain.

// std
use std::{borrow::Borrow, ops::Deref};
// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal, $validate:path) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				$validate($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				$validate($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 128;

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty or whitespace.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (provider, session, invoice).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (provider, session, invoice).
		kind: &'static str,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (provider, session, invoice).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
	/// The identifier is a `.` or `..` dot segment, which URL normalization drops.
	#[error("{kind} identifier cannot be a dot segment.")]
	DotSegment {
		/// Kind of identifier (provider, session, invoice).
		kind: &'static str,
	},
	/// The identifier contains a character that would change the request path.
	#[error("{kind} identifier contains the reserved character `{character}`.")]
	ReservedCharacter {
		/// Kind of identifier (provider, session, invoice).
		kind: &'static str,
		/// Offending character.
		character: char,
	},
}

def_id! { ProviderId, "Identifier for a provider descriptor.", "Provider", validate_view }
def_id! {
	SessionId,
	"Key for one client session; scopes cached tokens and renewal guards.",
	"Session",
	validate_view
}
def_id! {
	InvoiceId,
	"Provider-side invoice identifier (number or reference) used in lookup paths.",
	"Invoice",
	validate_path_segment
}
impl SessionId {
	/// Derives an opaque session key from a locally issued bearer token.
	///
	/// The key is the URL-safe, unpadded base64 of the token's SHA-256 digest, so the raw
	/// bearer never ends up in cache keys or logs.
	pub fn from_bearer(token: &str) -> Self {
		let digest = Sha256::digest(token.as_bytes());

		Self(URL_SAFE_NO_PAD.encode(digest))
	}
}

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

fn validate_path_segment(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	validate_view(kind, view)?;

	if matches!(view, "." | "..") {
		return Err(IdentifierError::DotSegment { kind });
	}
	if let Some(character) = view.chars().find(|c| matches!(c, '/' | '?' | '#' | '%' | '\\')) {
		return Err(IdentifierError::ReservedCharacter { kind, character });
	}

	Ok(())
}
