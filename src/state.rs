//! CSRF state: the signed, time-bound token carried through the authorization redirect.
//!
//! A [`StateStore`] turns the caller's [`InstallOptions`] into an opaque string when the
//! install URL is generated and recovers them when the callback arrives. Verification must
//! reject tampered, malformed, and expired states; it never substitutes defaults.

pub mod hmac;

pub use self::hmac::HmacStateStore;

// self
use crate::{
	_prelude::*,
	auth::{ScopeList, TeamId},
};

/// Boxed future returned by [`StateStore`] operations.
pub type StateFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, StateVerificationError>> + 'a + Send>>;

/// Options chosen when starting an installation; round-tripped through the state parameter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallOptions {
	/// Bot (or, under v1, all) scopes to request.
	pub scopes: ScopeList,
	/// User scopes to request; honored under v2 only.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub user_scopes: Option<ScopeList>,
	/// Redirect URI registered with the platform.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub redirect_uri: Option<Url>,
	/// Pre-selects the workspace on the consent screen.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub team_id: Option<TeamId>,
	/// Opaque caller data copied onto the resulting installation.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub metadata: Option<String>,
}
impl InstallOptions {
	/// Creates options requesting the given bot scopes.
	pub fn new(scopes: ScopeList) -> Self {
		Self { scopes, ..Default::default() }
	}

	/// Requests user scopes alongside the bot scopes.
	pub fn with_user_scopes(mut self, user_scopes: ScopeList) -> Self {
		self.user_scopes = Some(user_scopes);

		self
	}

	/// Sets the redirect URI.
	pub fn with_redirect_uri(mut self, redirect_uri: Url) -> Self {
		self.redirect_uri = Some(redirect_uri);

		self
	}

	/// Pre-selects a workspace.
	pub fn with_team(mut self, team_id: TeamId) -> Self {
		self.team_id = Some(team_id);

		self
	}

	/// Attaches opaque metadata.
	pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
		self.metadata = Some(metadata.into());

		self
	}
}

/// Signed content of a state parameter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatePayload {
	/// Options the flow was started with.
	pub install_options: InstallOptions,
	/// Issue instant, UTC epoch seconds.
	#[serde(with = "time::serde::timestamp")]
	pub issued_at: OffsetDateTime,
	/// Expiry instant, UTC epoch seconds.
	#[serde(with = "time::serde::timestamp")]
	pub expires_at: OffsetDateTime,
	/// Random value keeping otherwise identical states distinct.
	pub nonce: String,
}
impl StatePayload {
	/// Returns true once `now` is past the expiry instant.
	pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
		now > self.expires_at
	}
}

/// Reasons a state parameter is rejected.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum StateVerificationError {
	/// The value is not in the expected `payload.signature` shape or fails to decode.
	#[error("State parameter is malformed: {reason}.")]
	Malformed {
		/// Decoding failure summary.
		reason: String,
	},
	/// The signature does not match the payload.
	#[error("State parameter signature is invalid.")]
	InvalidSignature,
	/// The state outlived its TTL.
	#[error("State parameter expired at {expires_at}.")]
	Expired {
		/// Expiry instant recorded in the payload.
		expires_at: OffsetDateTime,
	},
	/// A custom store failed to generate or look up a state.
	#[error("State store failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Generates and verifies state parameters.
///
/// Implementations must be deterministic apart from the signature and nonce: the same
/// options and instant always encode the same payload fields, and `verify(now,
/// generate(options, now))` yields `options` for any `now` within the TTL.
pub trait StateStore
where
	Self: Send + Sync,
{
	/// Encodes `options` into an opaque state string issued at `now`.
	fn generate<'a>(
		&'a self,
		options: &'a InstallOptions,
		now: OffsetDateTime,
	) -> StateFuture<'a, String>;

	/// Verifies `state` at `now` and returns the options it was generated from.
	fn verify<'a>(
		&'a self,
		now: OffsetDateTime,
		state: &'a str,
	) -> StateFuture<'a, InstallOptions>;
}
