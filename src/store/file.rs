//! Simple file-backed [`InstallationStore`] for single-process deployments.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::Installation,
	store::{self, InstallationKey, InstallationStore, StoreError, StoreFuture},
};

type Snapshot = HashMap<InstallationKey, Installation>;

/// Persists installations to a JSON file after each save.
///
/// The whole map is rewritten through a temporary file and renamed into place, so a crash
/// leaves either the previous or the new snapshot on disk.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<Snapshot>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		ensure_parent_exists(&path)?;

		let snapshot = load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the JSON snapshot.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn persist_locked(&self, contents: &Snapshot) -> Result<(), StoreError> {
		ensure_parent_exists(&self.path)?;

		let entries = contents.iter().collect::<Vec<_>>();
		let serialized =
			serde_json::to_vec_pretty(&entries).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl InstallationStore for FileStore {
	fn save(&self, installation: Installation) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let (tenant, user) = store::save_keys(&installation)?;
			let mut guard = self.inner.write();

			guard.insert(user, installation.clone());
			guard.insert(tenant, installation);

			self.persist_locked(&guard)
		})
	}

	fn fetch<'a>(&'a self, key: &'a InstallationKey) -> StoreFuture<'a, Option<Installation>> {
		Box::pin(async move { Ok(self.inner.read().get(key).cloned()) })
	}
}

fn load_snapshot(path: &Path) -> Result<Snapshot, StoreError> {
	if !path.exists() {
		return Ok(HashMap::new());
	}

	let bytes = fs::read(path).map_err(|e| StoreError::Backend {
		message: format!("Failed to read {}: {e}", path.display()),
	})?;

	if bytes.is_empty() {
		return Ok(HashMap::new());
	}

	let entries: Vec<(InstallationKey, Installation)> =
		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})?;

	Ok(entries.into_iter().collect())
}

fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
			message: format!("Failed to create store directory {}: {e}", parent.display()),
		})?;
	}

	Ok(())
}
