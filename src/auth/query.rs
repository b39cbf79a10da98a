//! Request-time lookup keys and the flattened credential bundle resolved from them.

// self
use crate::{
	_prelude::*,
	auth::{BotId, EnterpriseId, GrantKind, Installation, TeamId, TokenSecret, UserId},
};

/// Lookup key built by the caller for each authenticated request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstallationQuery {
	/// Workspace the request originated from.
	pub team_id: Option<TeamId>,
	/// Enterprise the request originated from.
	pub enterprise_id: Option<EnterpriseId>,
	/// User whose token should be resolved, for user-level lookups.
	pub user_id: Option<UserId>,
	/// Selects the org-wide installation instead of a team installation.
	pub is_enterprise_install: bool,
}
impl InstallationQuery {
	/// Query for a team-scoped installation.
	pub fn team(team_id: TeamId) -> Self {
		Self { team_id: Some(team_id), ..Default::default() }
	}

	/// Query for an org-wide installation.
	pub fn enterprise(enterprise_id: EnterpriseId) -> Self {
		Self {
			enterprise_id: Some(enterprise_id),
			is_enterprise_install: true,
			..Default::default()
		}
	}

	/// Adds the enterprise a team belongs to.
	pub fn with_enterprise(mut self, enterprise_id: EnterpriseId) -> Self {
		self.enterprise_id = Some(enterprise_id);

		self
	}

	/// Narrows the lookup to one user's token.
	pub fn with_user(mut self, user_id: UserId) -> Self {
		self.user_id = Some(user_id);

		self
	}
}

/// Flattened, per-call view of an installation used to authorize a request.
///
/// Never cached: every `authorize` call recomputes it from the store.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthorizeResult {
	/// Bot access token.
	pub bot_token: Option<TokenSecret>,
	/// Bot identifier.
	pub bot_id: Option<BotId>,
	/// Bot user identifier.
	pub bot_user_id: Option<UserId>,
	/// Bot refresh token, for rotating bot grants.
	pub bot_refresh_token: Option<TokenSecret>,
	/// Bot access-token expiry, for rotating bot grants.
	pub bot_token_expires_at: Option<OffsetDateTime>,
	/// User access token.
	pub user_token: Option<TokenSecret>,
	/// User refresh token, for rotating user grants.
	pub user_refresh_token: Option<TokenSecret>,
	/// User access-token expiry, for rotating user grants.
	pub user_token_expires_at: Option<OffsetDateTime>,
	/// Team identifier, falling back to the query's when the record has none.
	pub team_id: Option<TeamId>,
	/// Enterprise identifier, falling back to the query's when the record has none.
	pub enterprise_id: Option<EnterpriseId>,
	/// Grants whose refresh was attempted during this call and failed; their tokens are stale.
	pub rotation_failures: Vec<GrantKind>,
}
impl AuthorizeResult {
	/// Flattens an installation, preferring its own tenant ids over the query's.
	pub fn from_installation(installation: &Installation, query: &InstallationQuery) -> Self {
		let mut result = Self {
			team_id: installation.team_id().cloned().or_else(|| query.team_id.clone()),
			enterprise_id: installation
				.enterprise_id()
				.cloned()
				.or_else(|| query.enterprise_id.clone()),
			..Default::default()
		};

		if let Some(bot) = &installation.bot {
			result.bot_token = Some(bot.grant.token.clone());
			result.bot_id = bot.id.clone();
			result.bot_user_id = Some(bot.user_id.clone());
			result.bot_refresh_token = bot.grant.refresh_token().cloned();
			result.bot_token_expires_at = bot.grant.expires_at();
		}
		if let Some(grant) = &installation.user.grant {
			result.user_token = Some(grant.token.clone());
			result.user_refresh_token = grant.refresh_token().cloned();
			result.user_token_expires_at = grant.expires_at();
		}

		result
	}

	/// Refresh token and expiry for the given actor, when both are present.
	pub fn rotation(&self, kind: GrantKind) -> Option<(&TokenSecret, OffsetDateTime)> {
		match kind {
			GrantKind::Bot => self.bot_refresh_token.as_ref().zip(self.bot_token_expires_at),
			GrantKind::User => self.user_refresh_token.as_ref().zip(self.user_token_expires_at),
		}
	}

	/// Mirrors a refreshed token into the matching fields.
	pub fn apply_refresh(
		&mut self,
		kind: GrantKind,
		token: TokenSecret,
		refresh_token: TokenSecret,
		expires_at: OffsetDateTime,
	) {
		match kind {
			GrantKind::Bot => {
				self.bot_token = Some(token);
				self.bot_refresh_token = Some(refresh_token);
				self.bot_token_expires_at = Some(expires_at);
			},
			GrantKind::User => {
				self.user_token = Some(token);
				self.user_refresh_token = Some(refresh_token);
				self.user_token_expires_at = Some(expires_at);
			},
		}
	}
}
impl Debug for AuthorizeResult {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthorizeResult")
			.field("bot_token_set", &self.bot_token.is_some())
			.field("bot_id", &self.bot_id)
			.field("bot_user_id", &self.bot_user_id)
			.field("bot_token_expires_at", &self.bot_token_expires_at)
			.field("user_token_set", &self.user_token.is_some())
			.field("user_token_expires_at", &self.user_token_expires_at)
			.field("team_id", &self.team_id)
			.field("enterprise_id", &self.enterprise_id)
			.field("rotation_failures", &self.rotation_failures)
			.finish()
	}
}
