// self
use crate::_prelude::*;

/// OAuth 2.0 grant types the broker can use against the provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
	/// Resource-owner password grant (client id/secret + username/password).
	Password,
	/// Refresh Token grant, used when a cached token carries a refresh token.
	RefreshToken,
}
impl GrantType {
	/// Returns the RFC 6749 identifier for the grant type.
	pub fn as_str(self) -> &'static str {
		match self {
			GrantType::Password => "password",
			GrantType::RefreshToken => "refresh_token",
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Collection of grant flags wired into the descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupportedGrants {
	/// Indicates whether the password grant is enabled.
	pub password: bool,
	/// Indicates whether the Refresh Token grant is enabled.
	pub refresh_token: bool,
}
impl SupportedGrants {
	/// Returns true if the provided grant is supported.
	pub fn supports(self, grant: GrantType) -> bool {
		match grant {
			GrantType::Password => self.password,
			GrantType::RefreshToken => self.refresh_token,
		}
	}

	/// Marks a grant as supported.
	pub fn enable(mut self, grant: GrantType) -> Self {
		match grant {
			GrantType::Password => self.password = true,
			GrantType::RefreshToken => self.refresh_token = true,
		}

		self
	}

	/// Marks a grant as unsupported.
	pub fn disable(mut self, grant: GrantType) -> Self {
		match grant {
			GrantType::Password => self.password = false,
			GrantType::RefreshToken => self.refresh_token = false,
		}

		self
	}
}
impl Default for SupportedGrants {
	fn default() -> Self {
		Self { password: true, refresh_token: true }
	}
}
