//! Provider access token, its lifecycle helpers, and builder.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Margin before expiry within which a cached token is treated as unusable.
pub const RENEWAL_MARGIN: Duration = Duration::seconds(60);

/// Lifecycle status of an [`AccessToken`] relative to a renewal margin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Token remains valid for longer than the renewal margin.
	Fresh,
	/// Token has not expired yet but sits inside the renewal margin.
	Renewable,
	/// Token reached its expiry instant.
	Expired,
}

/// Errors produced by [`AccessTokenBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum AccessTokenBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via expires_at or expires_in.")]
	MissingExpiry,
	/// Issued when `issued_at + expires_in` falls outside the representable range.
	#[error("Expiry is out of the supported date range.")]
	ExpiryOutOfRange,
}

/// Access token issued by the provider's `/oauth/token` endpoint.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AccessToken {
	/// Bearer value attached to provider calls; callers must avoid logging it.
	pub value: TokenSecret,
	/// Refresh token, if the provider issued one.
	pub refresh_token: Option<TokenSecret>,
	/// Instant the token was received.
	pub issued_at: OffsetDateTime,
	/// Absolute expiry derived from `issued_at + expires_in`.
	pub expires_at: OffsetDateTime,
}
impl AccessToken {
	/// Returns a builder.
	pub fn builder() -> AccessTokenBuilder {
		AccessTokenBuilder::default()
	}

	/// Computes the status at `instant` for the provided renewal margin.
	pub fn status_at(&self, instant: OffsetDateTime, margin: Duration) -> TokenStatus {
		if instant >= self.expires_at {
			return TokenStatus::Expired;
		}
		if self.expires_at - instant <= margin {
			return TokenStatus::Renewable;
		}

		TokenStatus::Fresh
	}

	/// Returns `true` while `instant < expires_at - margin`.
	pub fn is_valid_at(&self, instant: OffsetDateTime, margin: Duration) -> bool {
		matches!(self.status_at(instant, margin), TokenStatus::Fresh)
	}

	/// Checks validity against the current clock and the default [`RENEWAL_MARGIN`].
	pub fn is_valid(&self) -> bool {
		self.is_valid_at(OffsetDateTime::now_utc(), RENEWAL_MARGIN)
	}

	/// Remaining lifetime at `instant`, clamped at zero.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		let remaining = self.expires_at - instant;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}

	/// Expiry as milliseconds since the Unix epoch (the `factusExpiration` cookie value).
	pub fn expires_at_millis(&self) -> i64 {
		i64::try_from(self.expires_at.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("value", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`AccessToken`].
#[derive(Clone, Debug, Default)]
pub struct AccessTokenBuilder {
	value: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl AccessTokenBuilder {
	/// Sets the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute expiry instant.
	pub fn expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets an absolute expiry from epoch milliseconds.
	pub fn expires_at_millis(self, millis: i64) -> Self {
		let instant =
			OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).ok();

		Self { expires_at: instant, ..self }
	}

	/// Sets a relative expiry duration from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Provides the access token value.
	pub fn value(mut self, token: impl Into<String>) -> Self {
		self.value = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Consumes the builder and produces an [`AccessToken`].
	pub fn build(self) -> Result<AccessToken, AccessTokenBuilderError> {
		let value = self.value.ok_or(AccessTokenBuilderError::MissingAccessToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match (self.expires_at, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) =>
				issued_at.checked_add(delta).ok_or(AccessTokenBuilderError::ExpiryOutOfRange)?,
			(None, None) => return Err(AccessTokenBuilderError::MissingExpiry),
		};

		Ok(AccessToken { value, refresh_token: self.refresh_token, issued_at, expires_at })
	}
}
