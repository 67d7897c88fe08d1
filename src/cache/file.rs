//! File-backed [`TokenCache`] for daemons that should keep their provider token across
//! restarts.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, SessionId},
	cache::{CacheError, CacheFuture, TokenCache},
};

/// Persists cached tokens to a JSON file after each mutation.
#[derive(Clone, Debug)]
pub struct FileCache {
	path: PathBuf,
	inner: Arc<RwLock<HashMap<SessionId, AccessToken>>>,
}
impl FileCache {
	/// Opens (or creates) a cache at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, CacheError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the JSON snapshot.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<HashMap<SessionId, AccessToken>, CacheError> {
		if !path.exists() {
			return Ok(HashMap::new());
		}

		let bytes = fs::read(path).map_err(|e| CacheError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(HashMap::new());
		}

		let entries: Vec<(SessionId, AccessToken)> =
			serde_json::from_slice(&bytes).map_err(|e| CacheError::Serialization {
				message: format!("Failed to parse {}: {e}", path.display()),
			})?;

		Ok(entries.into_iter().collect())
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), CacheError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| CacheError::Backend {
				message: format!("Failed to create cache directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: &HashMap<SessionId, AccessToken>) -> Result<(), CacheError> {
		let snapshot: Vec<_> = contents.iter().collect();
		let serialized =
			serde_json::to_vec_pretty(&snapshot).map_err(|e| CacheError::Serialization {
				message: format!("Failed to serialize cache snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| CacheError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| CacheError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| CacheError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| CacheError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl TokenCache for FileCache {
	fn fetch<'a>(&'a self, session: &'a SessionId) -> CacheFuture<'a, Option<AccessToken>> {
		Box::pin(async move { Ok(self.inner.read().get(session).cloned()) })
	}

	fn save<'a>(&'a self, session: &'a SessionId, token: AccessToken) -> CacheFuture<'a, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			guard.insert(session.clone(), token);
			self.persist_locked(&guard)
		})
	}

	fn clear<'a>(&'a self, session: &'a SessionId) -> CacheFuture<'a, Option<AccessToken>> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let previous = guard.remove(session);

			if previous.is_some() {
				self.persist_locked(&guard)?;
			}

			Ok(previous)
		})
	}
}
