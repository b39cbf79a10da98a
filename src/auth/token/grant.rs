//! Per-actor grants (bot or authorizing user) and their optional rotation state.

// self
use crate::{
	_prelude::*,
	auth::{ScopeList, TokenSecret},
};

/// Actor a grant was issued for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantKind {
	/// Bot token issued to the installed application.
	Bot,
	/// User token issued to the authorizing user.
	User,
}
impl GrantKind {
	/// Returns the platform's `token_type` label.
	pub const fn as_str(self) -> &'static str {
		match self {
			GrantKind::Bot => "bot",
			GrantKind::User => "user",
		}
	}
}
impl Display for GrantKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Refresh material attached to a rotating grant.
///
/// A refresh token and an expiry always travel together; a grant without this struct is
/// long-lived and never rotated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRotation {
	/// Secret exchanged for a fresh access token.
	pub refresh_token: TokenSecret,
	/// Expiry of the current access token, persisted as UTC epoch seconds.
	#[serde(with = "time::serde::timestamp")]
	pub expires_at: OffsetDateTime,
}
impl TokenRotation {
	/// Builds rotation state from a relative `expires_in` (seconds) observed at `now`.
	pub fn from_expires_in(
		refresh_token: impl Into<String>,
		expires_in: i64,
		now: OffsetDateTime,
	) -> Self {
		Self {
			refresh_token: TokenSecret::new(refresh_token),
			expires_at: now + Duration::seconds(expires_in),
		}
	}
}

/// Token plus metadata issued for one actor within an installation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
	/// Access token; callers must avoid logging it.
	pub token: TokenSecret,
	/// Scopes granted to the token, in the order the platform reported them.
	pub scopes: ScopeList,
	/// Rotation state when token rotation is enabled for this grant.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub rotation: Option<TokenRotation>,
}
impl Grant {
	/// Creates a non-rotating grant.
	pub fn new(token: impl Into<String>, scopes: ScopeList) -> Self {
		Self { token: TokenSecret::new(token), scopes, rotation: None }
	}

	/// Attaches rotation state when both a refresh token and `expires_in` are present.
	pub fn with_rotation(
		mut self,
		refresh_token: Option<String>,
		expires_in: Option<i64>,
		now: OffsetDateTime,
	) -> Self {
		if let (Some(refresh_token), Some(expires_in)) = (refresh_token, expires_in) {
			self.rotation = Some(TokenRotation::from_expires_in(refresh_token, expires_in, now));
		}

		self
	}

	/// Refresh token, if the grant rotates.
	pub fn refresh_token(&self) -> Option<&TokenSecret> {
		self.rotation.as_ref().map(|rotation| &rotation.refresh_token)
	}

	/// Access-token expiry, if the grant rotates.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.rotation.as_ref().map(|rotation| rotation.expires_at)
	}

	/// Replaces the token and rotation state after a successful refresh.
	pub fn rotate(
		&mut self,
		token: TokenSecret,
		refresh_token: TokenSecret,
		expires_at: OffsetDateTime,
	) {
		self.token = token;
		self.rotation = Some(TokenRotation { refresh_token, expires_at });
	}
}
