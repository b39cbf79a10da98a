//! Provider strategy hooks that customize Web API calls.
//!
//! Implementations decorate outgoing forms and normalize error mapping without tying the
//! API client to any particular HTTP stack.

// self
use crate::{_prelude::*, provider::ApiMethod};

/// Strategy hook that allows deployments to decorate requests and classify errors.
///
/// Implementors are required to be `Send + Sync`, and the hooks use crate-owned data types
/// so downstream crates never depend on reqwest-specific structures. Only
/// [`classify_api_error`](ProviderStrategy::classify_api_error) is required.
pub trait ProviderStrategy: Send + Sync {
	/// Maps a failed Web API call into the installer taxonomy.
	fn classify_api_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind;

	/// Adds custom form parameters before a request is dispatched.
	///
	/// The default implementation does nothing. Credentials and the method's own fields are
	/// already present; entries written here override them.
	fn augment_request(&self, _method: ApiMethod, _form: &mut BTreeMap<String, String>) {}
}

/// Canonical error categories produced by strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderErrorKind {
	/// The code or refresh token was rejected.
	InvalidGrant,
	/// Client credentials or the redirect URI were rejected.
	InvalidClient,
	/// The token lacks a scope the method requires.
	InsufficientScope,
	/// The token was revoked, expired, or belongs to an inactive account.
	Revoked,
	/// Failure is temporary and should be retried.
	Transient,
	/// Any other platform error; surfaced with its raw code.
	Rejected,
}

/// Context passed to provider strategies when classifying failures.
///
/// Only primitive data is kept (status code, platform `error` field, body preview) so
/// strategies stay decoupled from any HTTP client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderErrorContext {
	/// Method associated with the failing request.
	pub method: ApiMethod,
	/// HTTP status code, when available.
	pub http_status: Option<u16>,
	/// Platform `error` field from an `ok: false` envelope.
	pub api_error: Option<String>,
	/// Preview of the response body for non-JSON payloads.
	pub body_preview: Option<String>,
	/// Whether the failure originated from the network layer.
	pub network_error: bool,
}
impl ProviderErrorContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Creates a new context scoped to the provided method.
	pub fn new(method: ApiMethod) -> Self {
		Self {
			method,
			http_status: None,
			api_error: None,
			body_preview: None,
			network_error: false,
		}
	}

	/// Convenience constructor for transport-level failures.
	pub fn network_failure(method: ApiMethod) -> Self {
		let mut ctx = Self::new(method);

		ctx.network_error = true;

		ctx
	}

	/// Adds an HTTP status code.
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds the platform error code.
	pub fn with_api_error(mut self, error: impl Into<String>) -> Self {
		self.api_error = Some(error.into());

		self
	}

	/// Adds a body preview for non-JSON payloads.
	pub fn with_body_preview(mut self, body: impl Into<String>) -> Self {
		self.body_preview = Some(truncate_preview(body.into()));

		self
	}
}

/// Default strategy for the platform's documented OAuth error codes.
///
/// Structured `error` codes win, then body hints, then the HTTP status. Network failures are
/// always transient.
#[derive(Debug, Default)]
pub struct DefaultProviderStrategy;
impl Display for DefaultProviderStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("default-provider-strategy")
	}
}
impl ProviderStrategy for DefaultProviderStrategy {
	fn classify_api_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind {
		if ctx.network_error {
			return ProviderErrorKind::Transient;
		}
		if let Some(code) = ctx.api_error.as_deref() {
			return classify_code(code);
		}
		if let Some(kind) = classify_body(ctx.body_preview.as_deref()) {
			return kind;
		}

		classify_status(ctx.http_status)
	}
}

fn truncate_preview(body: String) -> String {
	if body.chars().count() <= ProviderErrorContext::BODY_PREVIEW_LIMIT {
		return body;
	}

	let mut buf = body.chars().take(ProviderErrorContext::BODY_PREVIEW_LIMIT).collect::<String>();

	buf.push('…');

	buf
}

fn classify_code(code: &str) -> ProviderErrorKind {
	match code {
		"invalid_code" | "invalid_refresh_token" | "invalid_grant_type" | "code_already_used" =>
			ProviderErrorKind::InvalidGrant,
		"invalid_client_id" | "bad_client_secret" | "bad_redirect_uri" | "invalid_client" =>
			ProviderErrorKind::InvalidClient,
		"token_revoked" | "token_expired" | "invalid_auth" | "account_inactive" | "not_authed" =>
			ProviderErrorKind::Revoked,
		"missing_scope" => ProviderErrorKind::InsufficientScope,
		"ratelimited" | "internal_error" | "fatal_error" | "service_unavailable"
		| "request_timeout" => ProviderErrorKind::Transient,
		_ => ProviderErrorKind::Rejected,
	}
}

fn classify_body(body: Option<&str>) -> Option<ProviderErrorKind> {
	let lowered = body?.to_ascii_lowercase();

	match lowered.as_str() {
		text if text.contains("ratelimited") || text.contains("rate limited") =>
			Some(ProviderErrorKind::Transient),
		text if text.contains("service unavailable") || text.contains("bad gateway") =>
			Some(ProviderErrorKind::Transient),
		_ => None,
	}
}

fn classify_status(status: Option<u16>) -> ProviderErrorKind {
	match status {
		Some(401) => ProviderErrorKind::InvalidClient,
		Some(403) => ProviderErrorKind::InsufficientScope,
		Some(429) => ProviderErrorKind::Transient,
		Some(code) if code >= 500 => ProviderErrorKind::Transient,
		Some(_) => ProviderErrorKind::Rejected,
		None => ProviderErrorKind::Transient,
	}
}
