//! Request-time authorization: stored installation to live credentials.

// self
use crate::{
	_prelude::*,
	auth::{AuthorizeResult, InstallationQuery},
	error::AuthorizationError,
	flows::InstallProvider,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	store::{InstallationKey, StoreError},
};

impl InstallProvider {
	/// Resolves `query` into credentials, rotating expiring tokens first.
	pub async fn authorize(&self, query: &InstallationQuery) -> Result<AuthorizeResult> {
		self.authorize_at(query, OffsetDateTime::now_utc()).await
	}

	/// Same as [`authorize`](Self::authorize) with an explicit clock.
	///
	/// Every failure (missing record, store error, persistence error during rotation) is
	/// wrapped in [`AuthorizationError::Failed`]. Failed refresh exchanges do not fail the
	/// call; the affected grants are listed in [`AuthorizeResult::rotation_failures`].
	pub async fn authorize_at(
		&self,
		query: &InstallationQuery,
		now: OffsetDateTime,
	) -> Result<AuthorizeResult> {
		const KIND: FlowKind = FlowKind::Authorize;

		let span = FlowSpan::new(KIND, "authorize");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let key = InstallationKey::from_query(query)?;
				let mut installation = self
					.installation_store
					.fetch(&key)
					.await?
					.ok_or_else(|| StoreError::NotFound { key: key.to_string() })?;
				let mut result = AuthorizeResult::from_installation(&installation, query);

				self.rotator.rotate(&mut installation, &mut result, now).await?;

				Ok::<_, Error>(result)
			})
			.await
			.map_err(|e| Error::from(AuthorizationError::failed(e)));

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(e) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				obs::warn_flow(KIND, "authorize", e);
			},
		}

		result
	}
}
