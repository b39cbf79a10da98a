//! Redirect callback handling: state verification, code exchange, and persistence.
//!
//! [`InstallProvider::handle_callback`] never returns an error on its own; every outcome is a
//! [`CallbackResult`] carrying the best install options known at the point of exit, so the
//! HTTP layer can render a success or failure page without extra bookkeeping.

// self
use crate::{
	_prelude::*,
	auth::Installation,
	client::{CodeExchangeRequest, OAuthAccess},
	error::{AuthorizationError, InitializationError},
	flows::{InstallProvider, installation},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	state::InstallOptions,
};

/// Per-call callback configuration.
#[derive(Clone, Debug, Default)]
pub struct CallbackOptions {
	/// Options used when state verification is disabled; defaults to an empty scope list.
	pub install_options: Option<InstallOptions>,
}
impl CallbackOptions {
	/// Supplies the options an unverified callback should assume.
	pub fn with_install_options(mut self, install_options: InstallOptions) -> Self {
		self.install_options = Some(install_options);

		self
	}
}

/// Successful callback outcome.
#[derive(Clone, Debug)]
pub struct InstallSuccess {
	/// Installation as persisted.
	pub installation: Installation,
	/// Options recovered from the state (or supplied by the caller).
	pub install_options: InstallOptions,
}

/// Failed callback outcome.
#[derive(Debug)]
pub struct InstallFailure {
	/// What went wrong.
	pub error: Error,
	/// Options recovered before the failure, or the empty default.
	pub install_options: InstallOptions,
}

/// Discriminated outcome of [`InstallProvider::handle_callback`].
pub type CallbackResult = std::result::Result<InstallSuccess, InstallFailure>;

impl InstallProvider {
	/// Handles the redirect to the callback URL using the current time.
	pub async fn handle_callback(
		&self,
		request_uri: &str,
		options: &CallbackOptions,
	) -> CallbackResult {
		self.handle_callback_at(request_uri, options, OffsetDateTime::now_utc()).await
	}

	/// Handles the redirect to the callback URL at `now`.
	///
	/// `request_uri` may be absolute or a path with a query string. Errors from parameter
	/// checks and state verification are reported as is; exchange, identity, and persistence
	/// failures are wrapped in [`AuthorizationError::Failed`].
	pub async fn handle_callback_at(
		&self,
		request_uri: &str,
		options: &CallbackOptions,
		now: OffsetDateTime,
	) -> CallbackResult {
		const KIND: FlowKind = FlowKind::Callback;

		let span = FlowSpan::new(KIND, "handle_callback");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let mut recovered = None;
		let result =
			span.instrument(self.run_callback(request_uri, options, now, &mut recovered)).await;
		let install_options = recovered.unwrap_or_default();

		match result {
			Ok(installation) => {
				obs::record_flow_outcome(KIND, FlowOutcome::Success);

				Ok(InstallSuccess { installation, install_options })
			},
			Err(e) => {
				let error = classify_failure(e);

				obs::record_flow_outcome(KIND, FlowOutcome::Failure);
				obs::warn_flow(KIND, "handle_callback", &error);

				Err(InstallFailure { error, install_options })
			},
		}
	}

	async fn run_callback(
		&self,
		request_uri: &str,
		options: &CallbackOptions,
		now: OffsetDateTime,
		recovered: &mut Option<InstallOptions>,
	) -> Result<Installation> {
		if !self.state_verification {
			*recovered = options.install_options.clone();
		}

		let params = CallbackParams::parse(request_uri)?;

		if let Some(error) = params.error {
			return Err(match error.as_str() {
				"access_denied" => AuthorizationError::AccessDenied,
				_ => AuthorizationError::Provider { error },
			}
			.into());
		}

		let code = params.code.ok_or(Error::MissingCode)?;
		let install_options = if self.state_verification {
			let state = params.state.ok_or(Error::MissingState)?;
			let store =
				self.state_store.as_ref().ok_or(InitializationError::MissingStateStore)?;

			store.verify(now, &state).await?
		} else {
			options.install_options.clone().unwrap_or_default()
		};

		*recovered = Some(install_options.clone());

		let access = self
			.auth_client
			.exchange_code(CodeExchangeRequest {
				version: self.auth_version,
				code: &code,
				credentials: &self.credentials,
				redirect_uri: install_options.redirect_uri.as_ref(),
			})
			.await?;
		let mut installation = self.build_installation(access, now).await?;

		installation.metadata = install_options.metadata;

		self.installation_store.save(installation.clone()).await?;

		Ok(installation)
	}

	async fn build_installation(
		&self,
		access: OAuthAccess,
		now: OffsetDateTime,
	) -> Result<Installation> {
		let installation = match access {
			OAuthAccess::V1(response) => {
				let identity = match &response.bot {
					Some(bot) =>
						Some(self.auth_client.verify_identity(&bot.bot_access_token).await?),
					None => None,
				};

				installation::from_v1(&response, identity.as_ref(), now)?
			},
			OAuthAccess::V2(response) => {
				let identity = match installation::v2_identity_token(&response) {
					Some(token) => Some(self.auth_client.verify_identity(token).await?),
					None => None,
				};

				installation::from_v2(&response, identity.as_ref(), now)?
			},
		};

		Ok(installation)
	}
}

#[derive(Debug, Default)]
struct CallbackParams {
	code: Option<String>,
	state: Option<String>,
	error: Option<String>,
}
impl CallbackParams {
	fn parse(request_uri: &str) -> Result<Self> {
		let unknown = |e: url::ParseError| Error::Unknown { reason: e.to_string() };
		let base = Url::parse("http://localhost").map_err(unknown)?;
		let url = Url::options().base_url(Some(&base)).parse(request_uri).map_err(unknown)?;
		let mut params = Self::default();

		// First occurrence wins; empty values count as absent.
		for (name, value) in url.query_pairs() {
			let slot = match &*name {
				"code" => &mut params.code,
				"state" => &mut params.state,
				"error" => &mut params.error,
				_ => continue,
			};

			if slot.is_none() && !value.is_empty() {
				*slot = Some(value.into_owned());
			}
		}

		Ok(params)
	}
}

fn classify_failure(error: Error) -> Error {
	match error {
		Error::MissingCode
		| Error::MissingState
		| Error::StateVerification(_)
		| Error::Authorization(_)
		| Error::Unknown { .. } => error,
		other => AuthorizationError::failed(other).into(),
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::{
		_preludet::{FailingStore, ScriptedAuthClient},
		auth::{AuthVersion, GrantKind, InstallationQuery, ScopeList, TeamId},
		client::{AuthedUser, TeamPayload, V1AccessResponse, V1Bot, V2AccessResponse},
		state::{HmacStateStore, StateVerificationError},
		store::{InstallationKey, InstallationStore, MemoryStore, StoreError},
	};

	const SECRET: &str = "0123456789abcdef0123456789abcdef";
	const NOW: OffsetDateTime = macros::datetime!(2025-01-01 00:00 UTC);

	fn v2_access() -> OAuthAccess {
		OAuthAccess::V2(V2AccessResponse {
			access_token: Some("xoxb-1".into()),
			token_type: Some("bot".into()),
			scope: Some("chat:write".into()),
			bot_user_id: Some("U-BOT".into()),
			app_id: Some("A100".into()),
			team: Some(TeamPayload { id: "T100".into(), name: Some("Acme".into()) }),
			authed_user: AuthedUser { id: "U100".into(), ..Default::default() },
			..Default::default()
		})
	}

	fn options() -> InstallOptions {
		InstallOptions::new(ScopeList::new(["chat:write"]).expect("Scope fixture should be valid."))
			.with_redirect_uri(
				Url::parse("https://app.example.test/slack/oauth_redirect")
					.expect("Redirect fixture should parse."),
			)
			.with_metadata("tenant=acme")
	}

	struct Harness {
		provider: InstallProvider,
		client: Arc<ScriptedAuthClient>,
		store: MemoryStore,
		states: HmacStateStore,
	}
	impl Harness {
		fn new(client: ScriptedAuthClient) -> Self {
			let client = Arc::new(client);
			let store = MemoryStore::default();
			let provider = InstallProvider::builder("111.222", "client-secret")
				.auth_client(client.clone())
				.installation_store(Arc::new(store.clone()))
				.state_secret(SECRET)
				.build()
				.expect("Provider fixture should build.");
			let states = HmacStateStore::new(SECRET, HmacStateStore::DEFAULT_TTL)
				.expect("State store fixture should build.");

			Self { provider, client, store, states }
		}

		fn state(&self) -> String {
			self.states.seal_at(&options(), NOW).expect("State fixture should seal.")
		}

		async fn callback(&self, uri: &str) -> CallbackResult {
			self.provider.handle_callback_at(uri, &CallbackOptions::default(), NOW).await
		}
	}

	fn expect_failure(result: CallbackResult) -> InstallFailure {
		match result {
			Err(failure) => failure,
			Ok(success) => panic!("Expected a failed callback, got {success:?}."),
		}
	}

	#[tokio::test]
	async fn v2_callback_persists_installation_with_metadata() {
		let harness = Harness::new(
			ScriptedAuthClient::default()
				.with_access(v2_access())
				.with_identity(Some("B100"), Some("https://acme.slack.com/")),
		);
		let uri = format!("/slack/oauth_redirect?code=abc&state={}", harness.state());
		let success = harness.callback(&uri).await.expect("Callback should succeed.");

		assert_eq!(success.install_options, options());
		assert_eq!(success.installation.metadata.as_deref(), Some("tenant=acme"));
		assert_eq!(
			success.installation.bot.as_ref().and_then(|bot| bot.id.as_deref()),
			Some("B100")
		);
		assert_eq!(*harness.client.exchange_calls.lock(), ["abc"]);
		assert_eq!(*harness.client.identity_calls.lock(), ["xoxb-1"]);

		let key = InstallationKey::from_query(&InstallationQuery::team(
			TeamId::new("T100").expect("Team fixture should be valid."),
		))
		.expect("Team query should produce a key.");
		let stored = harness
			.store
			.fetch(&key)
			.await
			.expect("Store fetch should succeed.")
			.expect("Callback should persist the installation.");

		assert_eq!(stored, success.installation);
	}

	#[tokio::test]
	async fn access_denied_wins_over_other_parameters() {
		let harness = Harness::new(ScriptedAuthClient::default().with_access(v2_access()));
		let uri = format!("/cb?error=access_denied&code=abc&state={}", harness.state());
		let failure = expect_failure(harness.callback(&uri).await);

		assert!(matches!(failure.error, Error::Authorization(AuthorizationError::AccessDenied)));
		assert_eq!(failure.install_options, InstallOptions::default());
		assert!(harness.client.exchange_calls.lock().is_empty());

		let uri = "/cb?error=invalid_team_for_non_distributed_app";
		let failure = expect_failure(harness.callback(uri).await);

		assert!(matches!(
			failure.error,
			Error::Authorization(AuthorizationError::Provider { ref error })
				if error == "invalid_team_for_non_distributed_app"
		));
	}

	#[tokio::test]
	async fn missing_parameters_are_reported_in_order() {
		let harness = Harness::new(ScriptedAuthClient::default().with_access(v2_access()));

		assert!(matches!(
			expect_failure(harness.callback("/cb").await).error,
			Error::MissingCode
		));
		assert!(matches!(
			expect_failure(harness.callback("/cb?code=").await).error,
			Error::MissingCode
		));
		assert!(matches!(
			expect_failure(harness.callback("/cb?code=abc").await).error,
			Error::MissingState
		));
		assert!(matches!(
			expect_failure(harness.callback("http://[broken").await).error,
			Error::Unknown { .. }
		));
	}

	#[tokio::test]
	async fn tampered_and_expired_states_are_rejected() {
		let harness = Harness::new(ScriptedAuthClient::default().with_access(v2_access()));
		let mut tampered = harness.state();

		tampered.push('A');

		let uri = format!("/cb?code=abc&state={tampered}");
		let failure = expect_failure(harness.callback(&uri).await);

		assert!(matches!(failure.error, Error::StateVerification(_)));

		let uri = format!("/cb?code=abc&state={}", harness.state());
		let late = harness
			.provider
			.handle_callback_at(&uri, &CallbackOptions::default(), NOW + Duration::minutes(11))
			.await;

		assert!(matches!(
			expect_failure(late).error,
			Error::StateVerification(StateVerificationError::Expired { .. })
		));
		assert!(harness.client.exchange_calls.lock().is_empty());
	}

	#[tokio::test]
	async fn exchange_failures_are_wrapped_and_keep_recovered_options() {
		let harness = Harness::new(ScriptedAuthClient::default());
		let uri = format!("/cb?code=abc&state={}", harness.state());
		let failure = expect_failure(harness.callback(&uri).await);

		assert_eq!(failure.install_options, options());
		assert!(matches!(
			failure.error,
			Error::Authorization(AuthorizationError::Failed { ref source })
				if matches!(**source, Error::InvalidGrant { .. })
		));
		assert!(harness.store.is_empty());
	}

	#[tokio::test]
	async fn disabled_verification_accepts_any_state_and_uses_caller_options() {
		let client = Arc::new(ScriptedAuthClient::default().with_access(v2_access()));
		let provider = InstallProvider::builder("111.222", "client-secret")
			.auth_client(client.clone())
			.state_verification(false)
			.build()
			.expect("Provider without state verification should build.");
		let callback_options = CallbackOptions::default().with_install_options(options());
		let success = provider
			.handle_callback_at("/cb?code=abc&state=anything", &callback_options, NOW)
			.await
			.expect("Unverified callback should succeed.");

		assert_eq!(success.install_options, options());

		let success = provider
			.handle_callback_at("/cb?code=abc", &CallbackOptions::default(), NOW)
			.await
			.expect("Unverified callback without state should succeed.");

		assert!(success.install_options.scopes.is_empty());
		assert!(success.installation.metadata.is_none());
	}

	#[tokio::test]
	async fn v1_callback_verifies_the_bot_token() {
		let access = OAuthAccess::V1(V1AccessResponse {
			access_token: "xoxp-1".into(),
			scope: "identify,bot".into(),
			user_id: "U100".into(),
			team_id: "T100".into(),
			bot: Some(V1Bot { bot_user_id: "U-BOT".into(), bot_access_token: "xoxb-1".into() }),
			..Default::default()
		});
		let client = Arc::new(
			ScriptedAuthClient::default().with_access(access).with_identity(Some("B100"), None),
		);
		let provider = InstallProvider::builder("111.222", "client-secret")
			.auth_version(AuthVersion::V1)
			.auth_client(client.clone())
			.state_verification(false)
			.build()
			.expect("V1 provider should build.");
		let success = provider
			.handle_callback_at("/cb?code=abc", &CallbackOptions::default(), NOW)
			.await
			.expect("V1 callback should succeed.");
		let bot = success.installation.grant(GrantKind::Bot).expect("Bot grant should exist.");

		assert_eq!(bot.scopes.to_comma_separated(), "bot");
		assert_eq!(*client.identity_calls.lock(), ["xoxb-1"]);
	}

	#[tokio::test]
	async fn persistence_failure_reports_recovered_options() {
		let store = MemoryStore::default();
		let provider = InstallProvider::builder("111.222", "client-secret")
			.auth_client(Arc::new(
				ScriptedAuthClient::default()
					.with_access(v2_access())
					.with_identity(Some("B100"), None),
			))
			.installation_store(Arc::new(FailingStore::new(store.clone(), 1)))
			.state_secret(SECRET)
			.build()
			.expect("Provider fixture should build.");
		let states = HmacStateStore::new(SECRET, HmacStateStore::DEFAULT_TTL)
			.expect("State store fixture should build.");
		let state = states.seal_at(&options(), NOW).expect("State fixture should seal.");
		let failure = expect_failure(
			provider
				.handle_callback_at(
					&format!("/slack/oauth_redirect?code=abc&state={state}"),
					&CallbackOptions::default(),
					NOW,
				)
				.await,
		);

		assert!(matches!(
			failure.error,
			Error::Authorization(AuthorizationError::Failed { ref source })
				if matches!(**source, Error::Storage(StoreError::Backend { .. }))
		));
		assert_eq!(failure.install_options, options());
		assert!(store.is_empty());
	}
}
