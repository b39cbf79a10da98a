//! Storage contracts and built-in installation stores.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{
	_prelude::*,
	auth::{EnterpriseId, Installation, InstallationQuery, TeamId, UserId},
};

/// Boxed future returned by [`InstallationStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence contract for installations.
///
/// Implementations must tolerate concurrent readers and apply writes from one process in the
/// order they are issued; no other atomicity is assumed.
pub trait InstallationStore
where
	Self: Send + Sync,
{
	/// Persists `installation` under its tenant key and its authorizing user's key.
	fn save(&self, installation: Installation) -> StoreFuture<'_, ()>;

	/// Fetches the installation stored under `key`, if present.
	fn fetch<'a>(&'a self, key: &'a InstallationKey) -> StoreFuture<'a, Option<Installation>>;
}

/// Error type produced by [`InstallationStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
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
	/// No installation is stored under the key.
	#[error("No installation found for {key}.")]
	NotFound {
		/// Rendered lookup key.
		key: String,
	},
	/// The query or installation lacks the identifiers a key needs.
	#[error("Installation key is incomplete: {reason}.")]
	InvalidKey {
		/// Missing identifier.
		reason: String,
	},
}

/// Storage key, dispatched on whether the installation is org-wide.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InstallationKey {
	/// Team-scoped installation; grid workspaces are keyed by team alone.
	Team {
		/// Workspace.
		team_id: TeamId,
		/// Authorizing user, for user-level entries.
		user_id: Option<UserId>,
	},
	/// Org-wide installation.
	Enterprise {
		/// Organization.
		enterprise_id: EnterpriseId,
		/// Authorizing user, for user-level entries.
		user_id: Option<UserId>,
	},
}
impl InstallationKey {
	/// Builds the lookup key for a request-time query.
	pub fn from_query(query: &InstallationQuery) -> Result<Self, StoreError> {
		if query.is_enterprise_install {
			let enterprise_id =
				query.enterprise_id.clone().ok_or_else(|| missing("enterprise_id"))?;

			return Ok(Self::Enterprise { enterprise_id, user_id: query.user_id.clone() });
		}

		Ok(Self::Team {
			team_id: query.team_id.clone().ok_or_else(|| missing("team_id"))?,
			user_id: query.user_id.clone(),
		})
	}

	/// Builds the tenant-level key an installation is saved under.
	pub fn from_installation(installation: &Installation) -> Result<Self, StoreError> {
		if installation.is_enterprise_install {
			return Ok(Self::Enterprise {
				enterprise_id: installation
					.enterprise_id()
					.cloned()
					.ok_or_else(|| missing("enterprise_id"))?,
				user_id: None,
			});
		}

		Ok(Self::Team {
			team_id: installation.team_id().cloned().ok_or_else(|| missing("team_id"))?,
			user_id: None,
		})
	}

	/// Returns the same tenant key narrowed to `user_id`.
	pub fn with_user(self, user: UserId) -> Self {
		match self {
			Self::Team { team_id, .. } => Self::Team { team_id, user_id: Some(user) },
			Self::Enterprise { enterprise_id, .. } =>
				Self::Enterprise { enterprise_id, user_id: Some(user) },
		}
	}

	/// Whether the key addresses an org-wide installation.
	pub fn is_enterprise(&self) -> bool {
		matches!(self, Self::Enterprise { .. })
	}
}
impl Display for InstallationKey {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		fn or_dash<T>(value: Option<&T>) -> &str
		where
			T: AsRef<str>,
		{
			value.map(|inner| inner.as_ref()).unwrap_or("-")
		}

		match self {
			Self::Team { team_id, user_id } =>
				write!(f, "team:{}:{}", team_id, or_dash(user_id.as_ref())),
			Self::Enterprise { enterprise_id, user_id } => write!(
				f,
				"enterprise:{}:{}",
				enterprise_id,
				or_dash(user_id.as_ref())
			),
		}
	}
}

/// Both keys a save writes: tenant-latest first, then the authorizing user's entry.
pub(crate) fn save_keys(
	installation: &Installation,
) -> Result<(InstallationKey, InstallationKey), StoreError> {
	let tenant = InstallationKey::from_installation(installation)?;
	let user = tenant.clone().with_user(installation.user.id.clone());

	Ok((tenant, user))
}

fn missing(field: &str) -> StoreError {
	StoreError::InvalidKey { reason: format!("`{field}` is required") }
}
