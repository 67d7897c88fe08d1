//! Thread-safe in-memory [`TokenCache`] shared by every request of a process.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, SessionId},
	cache::{CacheError, CacheFuture, TokenCache},
};

type CacheMap = Arc<RwLock<HashMap<SessionId, AccessToken>>>;

/// Keeps provider tokens in-process, keyed by session.
#[derive(Clone, Debug, Default)]
pub struct MemoryCache(CacheMap);
impl MemoryCache {
	/// Number of sessions currently holding a token.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when no session holds a token.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn save_now(map: CacheMap, session: SessionId, token: AccessToken) -> Result<(), CacheError> {
		map.write().insert(session, token);

		Ok(())
	}
}
impl TokenCache for MemoryCache {
	fn fetch<'a>(&'a self, session: &'a SessionId) -> CacheFuture<'a, Option<AccessToken>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.read().get(session).cloned()) })
	}

	fn save<'a>(&'a self, session: &'a SessionId, token: AccessToken) -> CacheFuture<'a, ()> {
		let map = self.0.clone();
		let session = session.to_owned();

		Box::pin(async move { Self::save_now(map, session, token) })
	}

	fn clear<'a>(&'a self, session: &'a SessionId) -> CacheFuture<'a, Option<AccessToken>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(map.write().remove(session)) })
	}
}
