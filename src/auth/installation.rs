//! Durable installation records produced by a completed callback.

// self
use crate::{
	_prelude::*,
	auth::{AppId, BotId, EnterpriseId, Grant, GrantKind, TeamId, UserId},
};

/// OAuth flavour an installation was created with; fixed for the record's lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthVersion {
	/// Classic flat `oauth.access` exchange.
	V1,
	/// Granular `oauth.v2.access` exchange with separate bot and user grants.
	#[default]
	V2,
}
impl AuthVersion {
	/// Returns the stable label used in logs and persisted records.
	pub const fn as_str(self) -> &'static str {
		match self {
			AuthVersion::V1 => "v1",
			AuthVersion::V2 => "v2",
		}
	}
}
impl Display for AuthVersion {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Workspace the application was installed into.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
	/// Team identifier.
	pub id: TeamId,
	/// Display name, when reported.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
}

/// Enterprise (organization) the installation belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enterprise {
	/// Enterprise identifier.
	pub id: EnterpriseId,
	/// Display name, when reported.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	/// Canonical organization URL, recovered for org-wide installs.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
}

/// Incoming webhook created during installation, stored verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingWebhook {
	/// Webhook POST URL.
	pub url: String,
	/// Channel name, when reported.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub channel: Option<String>,
	/// Channel identifier, when reported.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub channel_id: Option<String>,
	/// Settings page for the webhook, when reported.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub configuration_url: Option<String>,
}

/// Bot grant together with the bot's platform identities.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotInstallation {
	/// Bot identifier recovered through identity verification.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<BotId>,
	/// User identifier of the bot user.
	pub user_id: UserId,
	/// Token material.
	pub grant: Grant,
}

/// Authorizing user and, when user scopes were granted, the user's token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInstallation {
	/// Authorizing user identifier.
	pub id: UserId,
	/// User token material; absent for bot-only installs.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub grant: Option<Grant>,
}

/// Record of one completed authorization between the application and a tenant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installation {
	/// Exchange flavour used to create the record.
	pub auth_version: AuthVersion,
	/// Whether the app was installed org-wide.
	pub is_enterprise_install: bool,
	/// Workspace, absent for org-wide installs.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub team: Option<Team>,
	/// Enterprise, present for enterprise-grid and org-wide installs.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub enterprise: Option<Enterprise>,
	/// Application identifier (v2 only).
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub app_id: Option<AppId>,
	/// Top-level `token_type` reported by the exchange.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub token_type: Option<String>,
	/// Opaque caller-supplied metadata carried through the state parameter.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub metadata: Option<String>,
	/// Incoming webhook, when one was requested.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub incoming_webhook: Option<IncomingWebhook>,
	/// Bot grant, when the response carried a complete one.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub bot: Option<BotInstallation>,
	/// Authorizing user.
	pub user: UserInstallation,
}
impl Installation {
	/// Team identifier, if the record is team-scoped.
	pub fn team_id(&self) -> Option<&TeamId> {
		self.team.as_ref().map(|team| &team.id)
	}

	/// Enterprise identifier, if the record belongs to an enterprise.
	pub fn enterprise_id(&self) -> Option<&EnterpriseId> {
		self.enterprise.as_ref().map(|enterprise| &enterprise.id)
	}

	/// Grant for the given actor, if present.
	pub fn grant(&self, kind: GrantKind) -> Option<&Grant> {
		match kind {
			GrantKind::Bot => self.bot.as_ref().map(|bot| &bot.grant),
			GrantKind::User => self.user.grant.as_ref(),
		}
	}

	/// Mutable grant for the given actor, if present.
	pub fn grant_mut(&mut self, kind: GrantKind) -> Option<&mut Grant> {
		match kind {
			GrantKind::Bot => self.bot.as_mut().map(|bot| &mut bot.grant),
			GrantKind::User => self.user.grant.as_mut(),
		}
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::_preludet::rotating_team_installation;

	#[test]
	fn grant_lookup_follows_kind() {
		let mut installation =
			rotating_team_installation(macros::datetime!(2025-01-01 00:00 UTC));

		assert!(installation.grant(GrantKind::Bot).is_some());
		assert!(installation.grant(GrantKind::User).is_none());
		assert!(installation.grant_mut(GrantKind::User).is_none());
		assert_eq!(installation.team_id().map(|id| id.as_ref()), Some("T100"));
		assert!(installation.enterprise_id().is_none());
	}

	#[test]
	fn serde_round_trip_keeps_rotation_and_version() {
		let installation = rotating_team_installation(macros::datetime!(2025-01-01 00:00 UTC));
		let payload =
			serde_json::to_string(&installation).expect("Installation should serialize to JSON.");

		assert!(payload.contains("\"auth_version\":\"v2\""));

		let decoded: Installation =
			serde_json::from_str(&payload).expect("Installation should deserialize from JSON.");

		assert_eq!(decoded, installation);
	}
}
