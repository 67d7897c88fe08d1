//! Resource-owner credentials used by the password grant.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Username/password pair of the provider account the broker authenticates as.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceOwner {
	/// Account username (usually an e-mail address).
	pub username: String,
	/// Account password.
	pub password: TokenSecret,
}
impl ResourceOwner {
	/// Creates a credential pair.
	pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
		Self { username: username.into(), password: TokenSecret::new(password) }
	}
}
impl Debug for ResourceOwner {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ResourceOwner")
			.field("username", &self.username)
			.field("password", &self.password)
			.finish()
	}
}
