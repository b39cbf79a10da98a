//! Installation flows coordinated by [`InstallProvider`].
//!
//! The provider owns the client credentials, state store, installation store, and auth
//! client so each flow (install URL, callback, authorize) focuses on its own sequencing.

pub mod authorize;
pub mod callback;
pub mod install_url;
pub mod installation;
pub mod rotation;

pub use callback::*;
pub use install_url::*;
pub use rotation::*;

// self
use crate::{
	_prelude::*,
	auth::AuthVersion,
	client::{AuthClient, ClientCredentials},
	error::InitializationError,
	state::{HmacStateStore, StateStore},
	store::{InstallationStore, MemoryStore},
};

/// Authorization endpoint used for v2 installs when none is configured.
pub const DEFAULT_V2_AUTHORIZATION_URL: &str = "https://slack.com/oauth/v2/authorize";
/// Authorization endpoint used for v1 installs when none is configured.
pub const DEFAULT_V1_AUTHORIZATION_URL: &str = "https://slack.com/oauth/authorize";

/// Server-side half of the "add application" flow for one application.
///
/// Construct it once through [`InstallProvider::builder`]; it holds no per-request state, so
/// a single instance can serve concurrent callbacks and authorize calls.
#[derive(Clone)]
pub struct InstallProvider {
	credentials: ClientCredentials,
	auth_version: AuthVersion,
	authorization_url: Url,
	state_verification: bool,
	state_store: Option<Arc<dyn StateStore>>,
	installation_store: Arc<dyn InstallationStore>,
	auth_client: Arc<dyn AuthClient>,
	rotator: TokenRotator,
}
impl InstallProvider {
	/// Starts configuring a provider for the given application credentials.
	pub fn builder(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> InstallProviderBuilder {
		InstallProviderBuilder::new(client_id, client_secret)
	}

	/// Exchange flavour used for every install.
	pub fn auth_version(&self) -> AuthVersion {
		self.auth_version
	}

	/// Authorization endpoint install URLs point at.
	pub fn authorization_url(&self) -> &Url {
		&self.authorization_url
	}

	/// Whether callbacks must carry a verified state parameter.
	pub fn state_verification(&self) -> bool {
		self.state_verification
	}

	/// Store installations are written to and read from.
	pub fn installation_store(&self) -> &Arc<dyn InstallationStore> {
		&self.installation_store
	}

	/// Counters for refresh exchanges performed during authorization.
	pub fn rotation_metrics(&self) -> &RotationMetrics {
		self.rotator.metrics()
	}

	/// Rotation component used by [`authorize`](InstallProvider::authorize).
	pub fn rotator(&self) -> &TokenRotator {
		&self.rotator
	}
}
impl Debug for InstallProvider {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("InstallProvider")
			.field("client_id", &self.credentials.client_id)
			.field("auth_version", &self.auth_version)
			.field("authorization_url", &self.authorization_url.as_str())
			.field("state_verification", &self.state_verification)
			.field("state_store_set", &self.state_store.is_some())
			.finish()
	}
}

/// Builder for [`InstallProvider`]; validation happens in [`build`](Self::build).
pub struct InstallProviderBuilder {
	client_id: String,
	client_secret: String,
	auth_version: AuthVersion,
	state_secret: Option<Vec<u8>>,
	state_store: Option<Arc<dyn StateStore>>,
	state_ttl: Duration,
	state_verification: bool,
	installation_store: Option<Arc<dyn InstallationStore>>,
	auth_client: Option<Arc<dyn AuthClient>>,
	authorization_url: Option<Url>,
	rotation_window: Duration,
}
impl InstallProviderBuilder {
	/// Creates a builder seeded with the application credentials.
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self {
			client_id: client_id.into(),
			client_secret: client_secret.into(),
			auth_version: AuthVersion::default(),
			state_secret: None,
			state_store: None,
			state_ttl: HmacStateStore::DEFAULT_TTL,
			state_verification: true,
			installation_store: None,
			auth_client: None,
			authorization_url: None,
			rotation_window: TokenRotator::DEFAULT_WINDOW,
		}
	}

	/// Selects the v1 or v2 exchange.
	pub fn auth_version(mut self, version: AuthVersion) -> Self {
		self.auth_version = version;

		self
	}

	/// Signs states with an [`HmacStateStore`] keyed by `secret`.
	pub fn state_secret(mut self, secret: impl AsRef<[u8]>) -> Self {
		self.state_secret = Some(secret.as_ref().to_vec());

		self
	}

	/// Uses a custom state store; takes precedence over [`state_secret`](Self::state_secret).
	pub fn state_store(mut self, store: Arc<dyn StateStore>) -> Self {
		self.state_store = Some(store);

		self
	}

	/// Lifetime of states signed with [`state_secret`](Self::state_secret).
	pub fn state_ttl(mut self, ttl: Duration) -> Self {
		self.state_ttl = ttl;

		self
	}

	/// Enables or disables state verification globally.
	///
	/// Disabling it makes callbacks accept any `state` value; reserve it for flows started
	/// outside the install URL, such as admin-initiated installs.
	pub fn state_verification(mut self, enabled: bool) -> Self {
		self.state_verification = enabled;

		self
	}

	/// Persists installations in `store` instead of the default [`MemoryStore`].
	pub fn installation_store(mut self, store: Arc<dyn InstallationStore>) -> Self {
		self.installation_store = Some(store);

		self
	}

	/// Injects the outbound Web API capability.
	pub fn auth_client(mut self, client: Arc<dyn AuthClient>) -> Self {
		self.auth_client = Some(client);

		self
	}

	/// Overrides the authorization endpoint; it must use HTTPS.
	pub fn authorization_url(mut self, url: Url) -> Self {
		self.authorization_url = Some(url);

		self
	}

	/// Refreshes tokens whose expiry falls within `window`; negative values clamp to zero.
	pub fn rotation_window(mut self, window: Duration) -> Self {
		self.rotation_window = if window.is_negative() { Duration::ZERO } else { window };

		self
	}

	/// Validates the configuration and builds the provider.
	pub fn build(self) -> Result<InstallProvider> {
		if self.client_id.trim().is_empty() {
			return Err(InitializationError::MissingClientId.into());
		}
		if self.client_secret.trim().is_empty() {
			return Err(InitializationError::MissingClientSecret.into());
		}

		let state_store = match (self.state_store, self.state_secret) {
			(Some(store), _) => Some(store),
			(None, Some(secret)) =>
				Some(Arc::new(HmacStateStore::new(secret, self.state_ttl)?) as Arc<dyn StateStore>),
			(None, None) if self.state_verification =>
				return Err(InitializationError::MissingStateStore.into()),
			(None, None) => None,
		};
		let authorization_url = match self.authorization_url {
			Some(url) => url,
			None => default_authorization_url(self.auth_version)?,
		};

		if authorization_url.scheme() != "https" {
			return Err(InitializationError::InsecureEndpoint {
				endpoint: "authorization",
				url: authorization_url.to_string(),
			}
			.into());
		}

		let auth_client = match self.auth_client {
			Some(client) => client,
			None => default_auth_client()?,
		};
		let installation_store = self
			.installation_store
			.unwrap_or_else(|| Arc::new(MemoryStore::default()) as Arc<dyn InstallationStore>);
		let credentials = ClientCredentials::new(self.client_id, self.client_secret);
		let rotator = TokenRotator::new(
			auth_client.clone(),
			installation_store.clone(),
			credentials.clone(),
		)
		.with_window(self.rotation_window);

		Ok(InstallProvider {
			credentials,
			auth_version: self.auth_version,
			authorization_url,
			state_verification: self.state_verification,
			state_store,
			installation_store,
			auth_client,
			rotator,
		})
	}
}
impl Debug for InstallProviderBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("InstallProviderBuilder")
			.field("client_id", &self.client_id)
			.field("auth_version", &self.auth_version)
			.field("state_verification", &self.state_verification)
			.field("state_ttl", &self.state_ttl)
			.field("rotation_window", &self.rotation_window)
			.finish_non_exhaustive()
	}
}

fn default_authorization_url(version: AuthVersion) -> Result<Url, InitializationError> {
	let raw = match version {
		AuthVersion::V1 => DEFAULT_V1_AUTHORIZATION_URL,
		AuthVersion::V2 => DEFAULT_V2_AUTHORIZATION_URL,
	};

	Url::parse(raw).map_err(|source| InitializationError::InvalidEndpoint {
		endpoint: "authorization",
		source,
	})
}

#[cfg(feature = "reqwest")]
fn default_auth_client() -> Result<Arc<dyn AuthClient>> {
	Ok(Arc::new(crate::client::HttpAuthClient::reqwest()?))
}

#[cfg(not(feature = "reqwest"))]
fn default_auth_client() -> Result<Arc<dyn AuthClient>> {
	Err(InitializationError::MissingAuthClient.into())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::_preludet::ScriptedAuthClient;

	const SECRET: &str = "0123456789abcdef0123456789abcdef";

	fn builder() -> InstallProviderBuilder {
		InstallProvider::builder("111.222", "client-secret")
			.auth_client(Arc::new(ScriptedAuthClient::default()))
	}

	fn init_error(result: Result<InstallProvider>) -> InitializationError {
		match result {
			Err(Error::Initialization(err)) => err,
			other => panic!("Expected an initialization error, got {other:?}."),
		}
	}

	#[test]
	fn credentials_are_required() {
		assert_eq!(
			init_error(InstallProvider::builder("", "secret").state_secret(SECRET).build()),
			InitializationError::MissingClientId
		);
		assert_eq!(
			init_error(InstallProvider::builder("id", " ").state_secret(SECRET).build()),
			InitializationError::MissingClientSecret
		);
	}

	#[test]
	fn state_verification_needs_a_signer() {
		assert_eq!(init_error(builder().build()), InitializationError::MissingStateStore);
		assert_eq!(
			init_error(builder().state_secret("short").build()),
			InitializationError::WeakStateSecret { min: 32 }
		);

		let provider = builder()
			.state_verification(false)
			.build()
			.expect("Disabled verification should not need a state store.");

		assert!(!provider.state_verification());
	}

	#[test]
	fn authorization_url_defaults_follow_version_and_require_https() {
		let v2 = builder().state_secret(SECRET).build().expect("Default provider should build.");

		assert_eq!(v2.authorization_url().as_str(), DEFAULT_V2_AUTHORIZATION_URL);

		let v1 = builder()
			.state_secret(SECRET)
			.auth_version(AuthVersion::V1)
			.build()
			.expect("V1 provider should build.");

		assert_eq!(v1.authorization_url().as_str(), DEFAULT_V1_AUTHORIZATION_URL);

		let insecure = builder()
			.state_secret(SECRET)
			.authorization_url(
				Url::parse("http://example.test/authorize").expect("Fixture URL should parse."),
			)
			.build();

		assert!(matches!(
			init_error(insecure),
			InitializationError::InsecureEndpoint { endpoint: "authorization", .. }
		));
	}

	#[test]
	fn rotation_window_clamps_negative_values() {
		let provider = builder()
			.state_secret(SECRET)
			.rotation_window(Duration::minutes(-5))
			.build()
			.expect("Provider should build.");

		assert_eq!(provider.rotator().window(), Duration::ZERO);
	}
}
