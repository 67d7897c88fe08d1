//! Token cache contract and the built-in cache implementations.
//!
//! The broker never reaches for ambient state: every flow receives a [`TokenCache`] and reads
//! or writes the session's provider token through it. [`MemoryCache`] and [`FileCache`] are
//! shared across requests, while [`CookieCache`] wraps a single request's cookies and
//! collects the `Set-Cookie` headers the response must carry.

pub mod cookie;
pub mod file;
pub mod memory;

pub use cookie::{CookieCache, CookiePolicy};
pub use file::FileCache;
pub use memory::MemoryCache;

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, SessionId},
};

/// Boxed future returned by [`TokenCache`] operations.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, CacheError>> + 'a + Send>>;

/// Storage capability the token broker reads and renews through.
pub trait TokenCache
where
	Self: Send + Sync,
{
	/// Returns the cached token for `session`, if one is present and well formed.
	fn fetch<'a>(&'a self, session: &'a SessionId) -> CacheFuture<'a, Option<AccessToken>>;

	/// Persists or replaces the token for `session`.
	fn save<'a>(&'a self, session: &'a SessionId, token: AccessToken) -> CacheFuture<'a, ()>;

	/// Drops the token for `session`, returning the previous value.
	fn clear<'a>(&'a self, session: &'a SessionId) -> CacheFuture<'a, Option<AccessToken>>;
}

/// Error type produced by [`TokenCache`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CacheError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
