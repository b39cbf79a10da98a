//! Outbound Web API capability: code exchange, token refresh, and identity verification.
//!
//! Flows depend only on the [`AuthClient`] trait. [`api::HttpAuthClient`] is the default
//! implementation; tests and alternative transports inject their own.

pub mod api;
pub mod http;

pub use api::*;
pub use http::*;

// self
use crate::{
	_prelude::*,
	auth::{AuthVersion, TokenSecret},
};

/// Boxed future returned by [`AuthClient`] operations.
pub type AuthClientFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Application credentials presented on every exchange.
#[derive(Clone, Debug)]
pub struct ClientCredentials {
	/// Public client identifier.
	pub client_id: String,
	/// Client secret; redacted in `Debug`.
	pub client_secret: TokenSecret,
}
impl ClientCredentials {
	/// Creates a credential pair.
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self { client_id: client_id.into(), client_secret: TokenSecret::new(client_secret) }
	}
}

/// Input to [`AuthClient::exchange_code`].
#[derive(Clone, Copy, Debug)]
pub struct CodeExchangeRequest<'a> {
	/// Selects `oauth.access` (v1) or `oauth.v2.access` (v2).
	pub version: AuthVersion,
	/// Authorization code from the callback.
	pub code: &'a str,
	/// Application credentials.
	pub credentials: &'a ClientCredentials,
	/// Redirect URI used when the install URL was generated.
	pub redirect_uri: Option<&'a Url>,
}

/// Input to [`AuthClient::refresh_token`].
#[derive(Clone, Copy, Debug)]
pub struct RefreshRequest<'a> {
	/// Application credentials.
	pub credentials: &'a ClientCredentials,
	/// Refresh token being exchanged.
	pub refresh_token: &'a str,
}

/// Capability performing the three outbound operations the installer needs.
pub trait AuthClient
where
	Self: Send + Sync,
{
	/// Exchanges an authorization code using the version-specific endpoint.
	fn exchange_code<'a>(
		&'a self,
		request: CodeExchangeRequest<'a>,
	) -> AuthClientFuture<'a, OAuthAccess>;

	/// Exchanges a refresh token for a new access token.
	fn refresh_token<'a>(
		&'a self,
		request: RefreshRequest<'a>,
	) -> AuthClientFuture<'a, RefreshedToken>;

	/// Introspects `token` to recover the bot id and workspace or organization URL.
	fn verify_identity<'a>(&'a self, token: &'a str) -> AuthClientFuture<'a, Identity>;
}

/// Version-tagged code-exchange response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OAuthAccess {
	/// Flat `oauth.access` response.
	V1(V1AccessResponse),
	/// Nested `oauth.v2.access` response.
	V2(V2AccessResponse),
}

/// `oauth.access` body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct V1AccessResponse {
	/// User access token.
	pub access_token: String,
	/// Comma-delimited scopes granted to the user token.
	#[serde(default)]
	pub scope: String,
	/// Authorizing user.
	pub user_id: String,
	/// Workspace identifier.
	pub team_id: String,
	/// Workspace name.
	#[serde(default)]
	pub team_name: Option<String>,
	/// Enterprise identifier for enterprise-grid workspaces.
	#[serde(default)]
	pub enterprise_id: Option<String>,
	/// Reported token type.
	#[serde(default)]
	pub token_type: Option<String>,
	/// Refresh token when rotation is enabled.
	#[serde(default)]
	pub refresh_token: Option<String>,
	/// Seconds until the access token expires, when rotation is enabled.
	#[serde(default)]
	pub expires_in: Option<i64>,
	/// Classic bot payload.
	#[serde(default)]
	pub bot: Option<V1Bot>,
	/// Incoming webhook, when requested.
	#[serde(default)]
	pub incoming_webhook: Option<IncomingWebhookPayload>,
}

/// Bot section of an `oauth.access` body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct V1Bot {
	/// Bot user identifier.
	pub bot_user_id: String,
	/// Bot access token.
	pub bot_access_token: String,
}

/// `oauth.v2.access` body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct V2AccessResponse {
	/// Bot access token.
	#[serde(default)]
	pub access_token: Option<String>,
	/// Token type of the top-level token.
	#[serde(default)]
	pub token_type: Option<String>,
	/// Comma-delimited bot scopes.
	#[serde(default)]
	pub scope: Option<String>,
	/// Bot user identifier.
	#[serde(default)]
	pub bot_user_id: Option<String>,
	/// Application identifier.
	#[serde(default)]
	pub app_id: Option<String>,
	/// Workspace; `null` for org-wide installs.
	#[serde(default)]
	pub team: Option<TeamPayload>,
	/// Enterprise; `null` outside enterprise grid.
	#[serde(default)]
	pub enterprise: Option<EnterprisePayload>,
	/// Whether the app was installed org-wide.
	#[serde(default)]
	pub is_enterprise_install: bool,
	/// Bot refresh token when rotation is enabled.
	#[serde(default)]
	pub refresh_token: Option<String>,
	/// Seconds until the bot token expires, when rotation is enabled.
	#[serde(default)]
	pub expires_in: Option<i64>,
	/// Authorizing user and the user token, if user scopes were requested.
	pub authed_user: AuthedUser,
	/// Incoming webhook, when requested.
	#[serde(default)]
	pub incoming_webhook: Option<IncomingWebhookPayload>,
}

/// `authed_user` section of an `oauth.v2.access` body.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthedUser {
	/// Authorizing user.
	pub id: String,
	/// Comma-delimited user scopes.
	#[serde(default)]
	pub scope: Option<String>,
	/// User access token.
	#[serde(default)]
	pub access_token: Option<String>,
	/// User token type.
	#[serde(default)]
	pub token_type: Option<String>,
	/// User refresh token when rotation is enabled.
	#[serde(default)]
	pub refresh_token: Option<String>,
	/// Seconds until the user token expires, when rotation is enabled.
	#[serde(default)]
	pub expires_in: Option<i64>,
}

/// Workspace object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamPayload {
	/// Workspace identifier.
	pub id: String,
	/// Workspace name.
	#[serde(default)]
	pub name: Option<String>,
}

/// Enterprise object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnterprisePayload {
	/// Enterprise identifier.
	pub id: String,
	/// Enterprise name.
	#[serde(default)]
	pub name: Option<String>,
}

/// Incoming webhook object, shared by both exchange flavours.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingWebhookPayload {
	/// Webhook POST URL.
	pub url: String,
	/// Channel name.
	#[serde(default)]
	pub channel: Option<String>,
	/// Channel identifier.
	#[serde(default)]
	pub channel_id: Option<String>,
	/// Settings page for the webhook.
	#[serde(default)]
	pub configuration_url: Option<String>,
}

/// Refresh-token exchange response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshedToken {
	/// New access token.
	pub access_token: String,
	/// Replacement refresh token; the previous one is invalidated.
	pub refresh_token: String,
	/// Seconds until the new access token expires.
	pub expires_in: i64,
	/// Reported token type (`bot` or `user`).
	#[serde(default)]
	pub token_type: Option<String>,
}

/// `auth.test` identity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
	/// Bot identifier, present when the token is a bot token.
	#[serde(default)]
	pub bot_id: Option<String>,
	/// Workspace or organization URL.
	#[serde(default)]
	pub url: Option<String>,
	/// User the token acts as.
	#[serde(default)]
	pub user_id: Option<String>,
}
