//! Authorization URL assembly for the first leg of an install.

// self
use crate::{
	_prelude::*,
	auth::AuthVersion,
	flows::InstallProvider,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	state::InstallOptions,
};

/// Assembles the authorization redirect URL from install options and an optional state.
#[derive(Clone, Copy, Debug)]
pub struct InstallUrlBuilder<'a> {
	authorization_url: &'a Url,
	client_id: &'a str,
	version: AuthVersion,
	options: &'a InstallOptions,
	state: Option<&'a str>,
}
impl<'a> InstallUrlBuilder<'a> {
	/// Starts a URL for `client_id` against `authorization_url`.
	pub fn new(
		authorization_url: &'a Url,
		client_id: &'a str,
		version: AuthVersion,
		options: &'a InstallOptions,
	) -> Self {
		Self { authorization_url, client_id, version, options, state: None }
	}

	/// Attaches the signed state parameter.
	pub fn state(mut self, state: &'a str) -> Self {
		self.state = Some(state);

		self
	}

	/// Renders the URL.
	///
	/// Parameters are appended in a fixed order: `scope`, `state`, `client_id`,
	/// `redirect_uri`, `team`, `user_scope`. User scopes are dropped for v1 installs.
	pub fn build(self) -> Result<Url> {
		let options = self.options;

		if options.scopes.is_empty() {
			return Err(Error::GenerateInstallUrl { reason: "no scopes were requested".into() });
		}

		let mut url = self.authorization_url.clone();

		{
			let mut query = url.query_pairs_mut();

			query.append_pair("scope", &options.scopes.to_comma_separated());

			if let Some(state) = self.state {
				query.append_pair("state", state);
			}

			query.append_pair("client_id", self.client_id);

			if let Some(redirect_uri) = &options.redirect_uri {
				query.append_pair("redirect_uri", redirect_uri.as_str());
			}
			if let Some(team_id) = &options.team_id {
				query.append_pair("team", team_id);
			}
			if let (AuthVersion::V2, Some(user_scopes)) = (self.version, &options.user_scopes) {
				query.append_pair("user_scope", &user_scopes.to_comma_separated());
			}
		}

		Ok(url)
	}
}

impl InstallProvider {
	/// Generates an install URL, signing a fresh state unless `with_state` is false.
	///
	/// State is only generated when verification is enabled on the provider.
	pub async fn generate_install_url(
		&self,
		options: &InstallOptions,
		with_state: bool,
	) -> Result<Url> {
		self.generate_install_url_at(options, with_state, OffsetDateTime::now_utc()).await
	}

	/// Same as [`generate_install_url`](Self::generate_install_url) with an explicit clock.
	pub async fn generate_install_url_at(
		&self,
		options: &InstallOptions,
		with_state: bool,
		now: OffsetDateTime,
	) -> Result<Url> {
		const KIND: FlowKind = FlowKind::InstallUrl;

		let span = FlowSpan::new(KIND, "generate_install_url");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let builder = InstallUrlBuilder::new(
					&self.authorization_url,
					&self.credentials.client_id,
					self.auth_version,
					options,
				);

				// Reject missing scopes before touching the state store.
				builder.build()?;

				let state = match (&self.state_store, self.state_verification && with_state) {
					(Some(store), true) => Some(store.generate(options, now).await?),
					_ => None,
				};

				match &state {
					Some(state) => builder.state(state).build(),
					None => builder.build(),
				}
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(e) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				obs::warn_flow(KIND, "generate_install_url", e);
			},
		}

		result
	}
}
