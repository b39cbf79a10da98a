//! Platform-facing knowledge: Web API method names and error-code classification.
//!
//! [`ApiMethod`] names the endpoints the installer calls. `strategy` defines
//! [`ProviderStrategy`], an HTTP-client-agnostic hook used by the API client to decorate
//! outgoing forms and map platform error codes into the installer error taxonomy.

pub mod strategy;

pub use strategy::*;

// self
use crate::_prelude::*;

/// Web API methods invoked by the installer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiMethod {
	/// Classic code exchange (`oauth.access`).
	OAuthAccess,
	/// Granular code exchange (`oauth.v2.access`).
	OAuthV2Access,
	/// Token refresh, sent to `oauth.v2.access` with `grant_type=refresh_token`.
	RefreshToken,
	/// Token introspection (`auth.test`).
	AuthTest,
}
impl ApiMethod {
	/// Path segment appended to the Web API base URL.
	pub const fn path(self) -> &'static str {
		match self {
			ApiMethod::OAuthAccess => "oauth.access",
			ApiMethod::OAuthV2Access | ApiMethod::RefreshToken => "oauth.v2.access",
			ApiMethod::AuthTest => "auth.test",
		}
	}

	/// Stable label used in logs and errors.
	pub const fn as_str(self) -> &'static str {
		match self {
			ApiMethod::OAuthAccess => "oauth.access",
			ApiMethod::OAuthV2Access => "oauth.v2.access",
			ApiMethod::RefreshToken => "oauth.v2.access(refresh_token)",
			ApiMethod::AuthTest => "auth.test",
		}
	}
}
impl Display for ApiMethod {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn refresh_shares_the_v2_endpoint() {
		assert_eq!(ApiMethod::RefreshToken.path(), ApiMethod::OAuthV2Access.path());
		assert_ne!(ApiMethod::RefreshToken.to_string(), ApiMethod::OAuthV2Access.to_string());
		assert_eq!(ApiMethod::OAuthAccess.path(), "oauth.access");
	}
}
