//! Thread-safe in-memory [`InstallationStore`] for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::Installation,
	store::{self, InstallationKey, InstallationStore, StoreError, StoreFuture},
};

type StoreMap = Arc<RwLock<HashMap<InstallationKey, Installation>>>;

/// Keeps installations in-process; clones share the same map.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Number of stored entries, counting tenant and user entries separately.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns true when nothing has been saved.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}

	fn save_now(map: StoreMap, installation: Installation) -> Result<(), StoreError> {
		let (tenant, user) = store::save_keys(&installation)?;
		let mut guard = map.write();

		guard.insert(user, installation.clone());
		guard.insert(tenant, installation);

		Ok(())
	}
}
impl InstallationStore for MemoryStore {
	fn save(&self, installation: Installation) -> StoreFuture<'_, ()> {
		let map = self.0.clone();

		Box::pin(async move { Self::save_now(map, installation) })
	}

	fn fetch<'a>(&'a self, key: &'a InstallationKey) -> StoreFuture<'a, Option<Installation>> {
		let found = self.0.read().get(key).cloned();

		Box::pin(async move { Ok(found) })
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::{
		_preludet::rotating_team_installation,
		auth::{InstallationQuery, TeamId, UserId},
	};

	#[tokio::test]
	async fn save_writes_tenant_and_user_entries() {
		let store = MemoryStore::default();
		let installation = rotating_team_installation(macros::datetime!(2025-01-01 00:00 UTC));

		store.save(installation.clone()).await.expect("Saving the fixture should succeed.");

		assert_eq!(store.len(), 2);

		let team = TeamId::new("T100").expect("Team fixture should be valid.");
		let tenant = InstallationKey::from_query(&InstallationQuery::team(team.clone()))
			.expect("Team query should produce a key.");
		let user = InstallationKey::from_query(
			&InstallationQuery::team(team)
				.with_user(UserId::new("U100").expect("User fixture should be valid.")),
		)
		.expect("User query should produce a key.");

		assert_eq!(
			store.fetch(&tenant).await.expect("Tenant fetch should succeed."),
			Some(installation.clone())
		);
		assert_eq!(
			store.fetch(&user).await.expect("User fetch should succeed."),
			Some(installation)
		);
	}

	#[tokio::test]
	async fn save_rejects_records_without_tenant_ids() {
		let store = MemoryStore::default();
		let mut installation =
			rotating_team_installation(macros::datetime!(2025-01-01 00:00 UTC));

		installation.team = None;

		assert!(matches!(
			store.save(installation).await,
			Err(StoreError::InvalidKey { .. })
		));
		assert!(store.is_empty());
	}
}
