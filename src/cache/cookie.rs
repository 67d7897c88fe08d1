//! Cookie-backed [`TokenCache`] scoped to a single HTTP request.
//!
//! The provider token travels in two cookies: `factusToken` (opaque bearer value) and
//! `factusExpiration` (absolute expiry in epoch milliseconds). A [`CookieCache`] is built
//! from the inbound request headers; renewals and clears are recorded as `Set-Cookie`
//! values that the caller copies onto the response with [`CookieCache::apply`].

// crates.io
use oauth2::http::{
	HeaderMap, HeaderValue,
	header::{COOKIE, SET_COOKIE},
};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, SessionId},
	cache::{CacheError, CacheFuture, TokenCache},
};

/// Cookie carrying the provider access token.
pub const TOKEN_COOKIE: &str = "factusToken";
/// Cookie carrying the token expiry in epoch milliseconds.
pub const EXPIRATION_COOKIE: &str = "factusExpiration";

/// Attributes stamped on every cookie the cache emits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookiePolicy {
	/// Adds the `Secure` attribute (production deployments).
	pub secure: bool,
	/// Cookie path.
	pub path: String,
}
impl CookiePolicy {
	/// Policy for production: `Secure` cookies.
	pub fn production() -> Self {
		Self { secure: true, ..Self::default() }
	}
}
impl Default for CookiePolicy {
	fn default() -> Self {
		Self { secure: false, path: "/".into() }
	}
}

#[derive(Debug, Default)]
struct CookieState {
	current: Option<AccessToken>,
	pending: Vec<HeaderValue>,
}

/// Per-request token cache reading `Cookie` headers and producing `Set-Cookie` headers.
///
/// The session argument of [`TokenCache`] is ignored: the cookie jar already belongs to one
/// client session.
#[derive(Debug)]
pub struct CookieCache {
	policy: CookiePolicy,
	state: Mutex<CookieState>,
}
impl CookieCache {
	/// Builds a cache from every `Cookie` header of an inbound request.
	///
	/// A missing token, a missing expiry, or an expiry that is not an integer leaves the
	/// cache empty so the broker treats the token as absent.
	pub fn from_headers(headers: &HeaderMap, policy: CookiePolicy) -> Self {
		let pairs = headers
			.get_all(COOKIE)
			.iter()
			.filter_map(|value| value.to_str().ok())
			.flat_map(parse_cookie_pairs)
			.collect::<Vec<_>>();

		Self::from_pairs(pairs, policy)
	}

	/// Builds a cache from a raw `Cookie` header value.
	pub fn from_cookie_header(header: &str, policy: CookiePolicy) -> Self {
		Self::from_pairs(parse_cookie_pairs(header).collect(), policy)
	}

	/// Builds an empty cache (no inbound cookies).
	pub fn empty(policy: CookiePolicy) -> Self {
		Self { policy, state: Mutex::new(CookieState::default()) }
	}

	fn from_pairs(pairs: Vec<(&str, &str)>, policy: CookiePolicy) -> Self {
		let lookup = |name: &str| {
			pairs.iter().rev().find(|(key, _)| *key == name).map(|(_, value)| *value)
		};
		let current = match (lookup(TOKEN_COOKIE), lookup(EXPIRATION_COOKIE)) {
			(Some(token), Some(expiration)) if !token.is_empty() => expiration
				.trim()
				.parse::<i64>()
				.ok()
				.and_then(|millis| {
					AccessToken::builder().value(token).expires_at_millis(millis).build().ok()
				}),
			_ => None,
		};

		Self { policy, state: Mutex::new(CookieState { current, pending: Vec::new() }) }
	}

	/// Token currently held by the jar (inbound or renewed).
	pub fn current(&self) -> Option<AccessToken> {
		self.state.lock().current.clone()
	}

	/// `Set-Cookie` values accumulated so far, in emission order.
	pub fn set_cookie_headers(&self) -> Vec<HeaderValue> {
		self.state.lock().pending.clone()
	}

	/// Appends the accumulated `Set-Cookie` values to a response header map and drains them.
	pub fn apply(&self, headers: &mut HeaderMap) {
		for value in self.state.lock().pending.drain(..) {
			headers.append(SET_COOKIE, value);
		}
	}

	fn render(&self, name: &str, value: &str, max_age: i64) -> Result<HeaderValue, CacheError> {
		if !value.chars().all(is_cookie_octet) {
			return Err(CacheError::Serialization {
				message: format!("Value for cookie `{name}` contains characters cookies cannot carry"),
			});
		}

		let mut rendered = format!(
			"{name}={value}; Max-Age={max_age}; Path={}; HttpOnly; SameSite=Strict",
			self.policy.path
		);

		if self.policy.secure {
			rendered.push_str("; Secure");
		}

		HeaderValue::from_str(&rendered).map_err(|e| CacheError::Serialization {
			message: format!("Failed to encode cookie `{name}`: {e}"),
		})
	}
}
impl TokenCache for CookieCache {
	fn fetch<'a>(&'a self, _session: &'a SessionId) -> CacheFuture<'a, Option<AccessToken>> {
		Box::pin(async move { Ok(self.current()) })
	}

	fn save<'a>(&'a self, _session: &'a SessionId, token: AccessToken) -> CacheFuture<'a, ()> {
		Box::pin(async move {
			let max_age = token.remaining_at(OffsetDateTime::now_utc()).whole_seconds();
			let token_cookie = self.render(TOKEN_COOKIE, token.value.expose(), max_age)?;
			let expiration_cookie =
				self.render(EXPIRATION_COOKIE, &token.expires_at_millis().to_string(), max_age)?;
			let mut state = self.state.lock();

			state.pending.push(token_cookie);
			state.pending.push(expiration_cookie);
			state.current = Some(token);

			Ok(())
		})
	}

	fn clear<'a>(&'a self, _session: &'a SessionId) -> CacheFuture<'a, Option<AccessToken>> {
		Box::pin(async move {
			let token_cookie = self.render(TOKEN_COOKIE, "", 0)?;
			let expiration_cookie = self.render(EXPIRATION_COOKIE, "", 0)?;
			let mut state = self.state.lock();

			state.pending.push(token_cookie);
			state.pending.push(expiration_cookie);

			Ok(state.current.take())
		})
	}
}

fn parse_cookie_pairs(header: &str) -> impl Iterator<Item = (&str, &str)> {
	header.split(';').filter_map(|pair| {
		let (name, value) = pair.split_once('=')?;
		let value = value.trim();

		Some((name.trim(), value.strip_prefix('"').and_then(|v| v.strip_suffix('"')).unwrap_or(value)))
	})
}

// RFC 6265 cookie-octet.
fn is_cookie_octet(c: char) -> bool {
	c.is_ascii_graphic() && !matches!(c, '"' | ',' | ';' | '\\')
}
