//! Installer-level error types shared across flows, clients, and stores.

// self
use crate::{_prelude::*, provider::ApiMethod, state::StateVerificationError};

/// Installer-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical installer error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Provider configuration is invalid; raised while building.
	#[error(transparent)]
	Initialization(#[from] InitializationError),
	/// Install URL could not be generated.
	#[error("Install URL could not be generated: {reason}.")]
	GenerateInstallUrl {
		/// Why the URL could not be assembled.
		reason: String,
	},
	/// Callback query string carried no `code` parameter.
	#[error("Callback is missing the authorization code.")]
	MissingCode,
	/// Callback query string carried no `state` parameter while verification is enabled.
	#[error("Callback is missing the state parameter.")]
	MissingState,
	/// State parameter failed verification.
	#[error(transparent)]
	StateVerification(#[from] StateVerificationError),
	/// Authorization was cancelled or a downstream step failed.
	#[error(transparent)]
	Authorization(#[from] AuthorizationError),
	/// Callback request could not be interpreted at all.
	#[error("Callback request is malformed: {reason}.")]
	Unknown {
		/// Parsing failure summary.
		reason: String,
	},

	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration or payload mapping problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Temporary upstream failure; retry with backoff.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Platform rejected the grant (e.g., bad code or refresh token).
	#[error("Platform rejected the grant: {reason}.")]
	InvalidGrant {
		/// Platform- or installer-supplied reason string.
		reason: String,
	},
	/// Client authentication failed or credentials are malformed.
	#[error("Client authentication failed: {reason}.")]
	InvalidClient {
		/// Platform- or installer-supplied reason string.
		reason: String,
	},
	/// Token lacks the scopes the API method requires.
	#[error("Token lacks the required scopes: {reason}.")]
	InsufficientScope {
		/// Platform- or installer-supplied reason string.
		reason: String,
	},
	/// Token has been revoked or expired and must not be reused.
	#[error("Token has been revoked.")]
	Revoked,
	/// Platform returned an error code with no finer classification.
	#[error("Web API method {method} failed with `{code}`.")]
	Api {
		/// Method that reported the failure.
		method: ApiMethod,
		/// Platform error code.
		code: String,
	},
}

/// Construction-time failures; always fatal.
#[derive(Debug, PartialEq, Eq, ThisError)]
pub enum InitializationError {
	/// Client identifier was empty.
	#[error("Client ID is required.")]
	MissingClientId,
	/// Client secret was empty.
	#[error("Client secret is required.")]
	MissingClientSecret,
	/// State verification is enabled but nothing can sign states.
	#[error("State verification requires either a state store or a state secret.")]
	MissingStateStore,
	/// The configured state secret is too short to sign with.
	#[error("State secret must be at least {min} bytes.")]
	WeakStateSecret {
		/// Minimum accepted length in bytes.
		min: usize,
	},
	/// State TTL must be positive.
	#[error("State TTL must be positive.")]
	NonPositiveStateTtl,
	/// An endpoint did not use HTTPS.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// A built-in URL constant could not be parsed.
	#[error("The {endpoint} endpoint is invalid.")]
	InvalidEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// No auth client was supplied and no default transport is compiled in.
	#[error("An auth client is required when the `reqwest` feature is disabled.")]
	MissingAuthClient,
}

/// Authorization failures surfaced by the callback and authorize paths.
#[derive(Debug, ThisError)]
pub enum AuthorizationError {
	/// End user declined the installation.
	#[error("User cancelled the installation.")]
	AccessDenied,
	/// Authorization server redirected back with an error other than `access_denied`.
	#[error("Authorization server returned `{error}`.")]
	Provider {
		/// Raw `error` query value.
		error: String,
	},
	/// A downstream step (exchange, identity, persistence, rotation) failed.
	#[error("Authorization failed: {source}")]
	Failed {
		/// Original failure.
		#[source]
		source: Box<Error>,
	},
}
impl AuthorizationError {
	/// Wraps any installer error as the cause of an authorization failure.
	pub fn failed(source: impl Into<Error>) -> Self {
		Self::Failed { source: Box::new(source.into()) }
	}
}

/// Configuration and payload validation failures raised by the installer.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Web API base URL could not be joined with a method name.
	#[error("Web API URL is invalid.")]
	InvalidApiUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A platform payload carried an identifier that failed validation.
	#[error("Platform returned an invalid identifier.")]
	InvalidIdentifier(#[from] crate::auth::IdentifierError),
	/// A platform payload carried scopes that failed validation.
	#[error("Platform returned invalid scopes.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// A response omitted a field the installer depends on.
	#[error("Response from {method} is missing `{field}`.")]
	MissingField {
		/// Method whose response was incomplete.
		method: ApiMethod,
		/// Missing field name.
		field: &'static str,
	},
	/// Token endpoint returned a non-positive `expires_in`.
	#[error("The expires_in value must be positive.")]
	NonPositiveExpiresIn,
	/// Token endpoint returned an excessively large `expires_in`.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Temporary failure variants (safe to retry).
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Platform returned an unexpected but non-fatal response.
	#[error("Web API returned an unexpected response: {message}.")]
	Upstream {
		/// Platform- or installer-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Web API responded with malformed JSON that could not be parsed.
	#[error("Web API method {method} returned malformed JSON.")]
	ResponseParse {
		/// Method whose body failed to parse.
		method: ApiMethod,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::error::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the Web API.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the Web API.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
