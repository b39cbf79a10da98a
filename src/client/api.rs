//! Web API implementation of [`AuthClient`] over an [`ApiHttpClient`] transport.

// crates.io
use oauth2::{
	AsyncHttpClient, HttpClientError, HttpRequest, HttpResponse,
	http::{
		Method,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	auth::AuthVersion,
	client::{
		AuthClient, AuthClientFuture, ClientCredentials, CodeExchangeRequest, Identity, OAuthAccess,
		RefreshRequest, RefreshedToken,
		http::{ApiHttpClient, ResponseMetadata, ResponseMetadataSlot},
	},
	error::{ConfigError, TransientError, TransportError},
	provider::{
		ApiMethod, DefaultProviderStrategy, ProviderErrorContext, ProviderErrorKind,
		ProviderStrategy,
	},
};
#[cfg(feature = "reqwest")] use crate::client::http::ReqwestHttpClient;

/// Default Web API base URL.
pub const DEFAULT_API_BASE: &str = "https://slack.com/api/";

/// [`HttpAuthClient`] over reqwest with the default error mapper.
#[cfg(feature = "reqwest")]
pub type ReqwestAuthClient = HttpAuthClient<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Maps HTTP transport failures into installer [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into an installer error.
	fn map_transport_error(
		&self,
		strategy: &dyn ProviderStrategy,
		method: ApiMethod,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		strategy: &dyn ProviderStrategy,
		method: ApiMethod,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(strategy, method, meta, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => map_generic_transport_error(method, meta, message),
			_ => map_generic_transport_error(method, meta, "unknown transport failure"),
		}
	}
}

/// Calls `oauth.access`, `oauth.v2.access`, and `auth.test` with form-encoded requests.
///
/// Client credentials travel in the form body. Every response is checked for the
/// `{"ok": false, "error": ...}` envelope before its typed body is decoded, and failures are
/// classified by the configured [`ProviderStrategy`].
pub struct HttpAuthClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	api_base: Url,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
	strategy: Arc<dyn ProviderStrategy>,
}
impl<C, M> HttpAuthClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a client rooted at `api_base` using the default strategy.
	///
	/// A trailing `/` is appended to the base path when missing so method names join
	/// beneath it.
	pub fn new(
		api_base: Url,
		http_client: impl Into<Arc<C>>,
		error_mapper: impl Into<Arc<M>>,
	) -> Self {
		let mut api_base = api_base;

		if !api_base.path().ends_with('/') {
			let path = format!("{}/", api_base.path());

			api_base.set_path(&path);
		}

		Self {
			api_base,
			http_client: http_client.into(),
			error_mapper: error_mapper.into(),
			strategy: Arc::new(DefaultProviderStrategy),
		}
	}

	/// Replaces the error-classification strategy.
	pub fn with_strategy(mut self, strategy: Arc<dyn ProviderStrategy>) -> Self {
		self.strategy = strategy;

		self
	}

	/// Base URL the method names are joined onto.
	pub fn api_base(&self) -> &Url {
		&self.api_base
	}

	async fn call<T>(
		&self,
		method: ApiMethod,
		mut form: BTreeMap<String, String>,
		bearer: Option<&str>,
	) -> Result<T>
	where
		T: DeserializeOwned,
	{
		self.strategy.augment_request(method, &mut form);

		let request = self.build_request(method, &form, bearer)?;
		let slot = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(slot.clone());
		let response = handle.call(request).await.map_err(|err| {
			self.error_mapper.map_transport_error(
				self.strategy.as_ref(),
				method,
				slot.take().as_ref(),
				err,
			)
		})?;
		let retry_after = slot.take().and_then(|meta| meta.retry_after);

		self.decode(method, response, retry_after)
	}

	fn build_request(
		&self,
		method: ApiMethod,
		form: &BTreeMap<String, String>,
		bearer: Option<&str>,
	) -> Result<HttpRequest> {
		let url = self
			.api_base
			.join(method.path())
			.map_err(|source| ConfigError::InvalidApiUrl { source })?;
		let body = url::form_urlencoded::Serializer::new(String::new())
			.extend_pairs(form.iter())
			.finish();
		let mut builder = oauth2::http::Request::builder()
			.method(Method::POST)
			.uri(url.as_str())
			.header(ACCEPT, "application/json")
			.header(CONTENT_TYPE, "application/x-www-form-urlencoded");

		if let Some(token) = bearer {
			builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
		}

		builder.body(body.into_bytes()).map_err(|e| ConfigError::from(e).into())
	}

	fn decode<T>(
		&self,
		method: ApiMethod,
		response: HttpResponse,
		retry_after: Option<Duration>,
	) -> Result<T>
	where
		T: DeserializeOwned,
	{
		let status = response.status().as_u16();
		let body = response.body();

		if !response.status().is_success() {
			let ctx = ProviderErrorContext::new(method).with_http_status(status);
			let ctx = match serde_json::from_slice::<Envelope>(body) {
				Ok(Envelope { error: Some(code), .. }) => ctx.with_api_error(code),
				_ => ctx.with_body_preview(String::from_utf8_lossy(body)),
			};

			return Err(self.classify(ctx, retry_after));
		}

		let envelope = parse_json::<Envelope>(method, body, status)?;

		if !envelope.ok {
			let code = envelope.error.unwrap_or_else(|| "unknown_error".into());
			let ctx =
				ProviderErrorContext::new(method).with_http_status(status).with_api_error(code);

			return Err(self.classify(ctx, retry_after));
		}

		parse_json(method, body, status)
	}

	fn classify(&self, ctx: ProviderErrorContext, retry_after: Option<Duration>) -> Error {
		let reason = match (&ctx.api_error, ctx.http_status) {
			(Some(code), _) => code.clone(),
			(None, Some(status)) => format!("http_{status}"),
			(None, None) => "unknown_error".into(),
		};

		match self.strategy.classify_api_error(&ctx) {
			ProviderErrorKind::InvalidGrant => Error::InvalidGrant { reason },
			ProviderErrorKind::InvalidClient => Error::InvalidClient { reason },
			ProviderErrorKind::InsufficientScope => Error::InsufficientScope { reason },
			ProviderErrorKind::Revoked => Error::Revoked,
			ProviderErrorKind::Transient => TransientError::Upstream {
				message: format!("{} returned `{reason}`", ctx.method),
				status: ctx.http_status,
				retry_after,
			}
			.into(),
			ProviderErrorKind::Rejected => Error::Api { method: ctx.method, code: reason },
		}
	}
}
#[cfg(feature = "reqwest")]
impl HttpAuthClient<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Reqwest-backed client against [`DEFAULT_API_BASE`] with redirects disabled.
	pub fn reqwest() -> Result<Self> {
		let api_base = Url::parse(DEFAULT_API_BASE)
			.map_err(|source| ConfigError::InvalidApiUrl { source })?;

		Ok(Self::new(
			api_base,
			ReqwestHttpClient::without_redirects()?,
			ReqwestTransportErrorMapper,
		))
	}
}
impl<C, M> Debug for HttpAuthClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HttpAuthClient").field("api_base", &self.api_base.as_str()).finish()
	}
}
impl<C, M> AuthClient for HttpAuthClient<C, M>
where
	C: ?Sized + ApiHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn exchange_code<'a>(
		&'a self,
		request: CodeExchangeRequest<'a>,
	) -> AuthClientFuture<'a, OAuthAccess> {
		Box::pin(async move {
			let mut form = credentials_form(request.credentials);

			form.insert("code".into(), request.code.to_owned());

			if let Some(redirect_uri) = request.redirect_uri {
				form.insert("redirect_uri".into(), redirect_uri.to_string());
			}

			match request.version {
				AuthVersion::V1 =>
					self.call(ApiMethod::OAuthAccess, form, None).await.map(OAuthAccess::V1),
				AuthVersion::V2 =>
					self.call(ApiMethod::OAuthV2Access, form, None).await.map(OAuthAccess::V2),
			}
		})
	}

	fn refresh_token<'a>(
		&'a self,
		request: RefreshRequest<'a>,
	) -> AuthClientFuture<'a, RefreshedToken> {
		Box::pin(async move {
			let mut form = credentials_form(request.credentials);

			form.insert("grant_type".into(), "refresh_token".into());
			form.insert("refresh_token".into(), request.refresh_token.to_owned());

			let refreshed: RefreshedToken = self.call(ApiMethod::RefreshToken, form, None).await?;

			if refreshed.expires_in <= 0 {
				return Err(ConfigError::NonPositiveExpiresIn.into());
			}

			Ok(refreshed)
		})
	}

	fn verify_identity<'a>(&'a self, token: &'a str) -> AuthClientFuture<'a, Identity> {
		Box::pin(async move { self.call(ApiMethod::AuthTest, BTreeMap::new(), Some(token)).await })
	}
}

#[derive(Deserialize)]
struct Envelope {
	#[serde(default)]
	ok: bool,
	#[serde(default)]
	error: Option<String>,
}

fn credentials_form(credentials: &ClientCredentials) -> BTreeMap<String, String> {
	BTreeMap::from([
		("client_id".to_owned(), credentials.client_id.clone()),
		("client_secret".to_owned(), credentials.client_secret.expose().to_owned()),
	])
}

fn parse_json<T>(method: ApiMethod, body: &[u8], status: u16) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
		TransientError::ResponseParse { method, source, status: Some(status) }.into()
	})
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(
	strategy: &dyn ProviderStrategy,
	method: ApiMethod,
	meta: Option<&ResponseMetadata>,
	err: ReqwestError,
) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() || err.is_connect() {
		let ctx = ProviderErrorContext::network_failure(method);

		if strategy.classify_api_error(&ctx) == ProviderErrorKind::Transient {
			return TransientError::Upstream {
				message: format!("{method} could not be reached: {err}"),
				status: meta_status(meta).or_else(|| err.status().map(|code| code.as_u16())),
				retry_after: meta.and_then(|value| value.retry_after),
			}
			.into();
		}
	}

	TransportError::from(err).into()
}

fn map_generic_transport_error(
	method: ApiMethod,
	meta: Option<&ResponseMetadata>,
	message: impl Display,
) -> Error {
	TransientError::Upstream {
		message: format!("HTTP client error occurred while calling {method}: {message}"),
		status: meta_status(meta),
		retry_after: meta.and_then(|value| value.retry_after),
	}
	.into()
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::http::StatusCode;
	// self
	use super::*;

	struct NoopTransport;
	impl ApiHttpClient for NoopTransport {
		type Handle = NoopHandle;
		type TransportError = std::io::Error;

		fn with_metadata(&self, _slot: ResponseMetadataSlot) -> Self::Handle {
			NoopHandle
		}
	}

	struct NoopHandle;
	impl<'c> AsyncHttpClient<'c> for NoopHandle {
		type Error = HttpClientError<std::io::Error>;
		type Future =
			Pin<Box<dyn Future<Output = Result<HttpResponse, Self::Error>> + 'c + Send + Sync>>;

		fn call(&'c self, _request: HttpRequest) -> Self::Future {
			Box::pin(async { Err(HttpClientError::Other("offline".into())) })
		}
	}

	struct PassthroughMapper;
	impl TransportErrorMapper<std::io::Error> for PassthroughMapper {
		fn map_transport_error(
			&self,
			_strategy: &dyn ProviderStrategy,
			method: ApiMethod,
			meta: Option<&ResponseMetadata>,
			_error: HttpClientError<std::io::Error>,
		) -> Error {
			map_generic_transport_error(method, meta, "offline")
		}
	}

	fn client(base: &str) -> HttpAuthClient<NoopTransport, PassthroughMapper> {
		HttpAuthClient::new(
			Url::parse(base).expect("Base URL fixture should parse."),
			NoopTransport,
			PassthroughMapper,
		)
	}

	fn response(status: u16, body: &str) -> HttpResponse {
		let mut response = HttpResponse::new(body.as_bytes().to_vec());

		*response.status_mut() = StatusCode::from_u16(status).expect("Status should be valid.");

		response
	}

	#[test]
	fn base_path_gains_trailing_slash() {
		let client = client("https://example.test/api");

		assert_eq!(client.api_base().as_str(), "https://example.test/api/");
	}

	#[test]
	fn request_carries_form_credentials_and_bearer() {
		let client = client("https://example.test/api/");
		let form = credentials_form(&ClientCredentials::new("id", "s&cret"));
		let request = client
			.build_request(ApiMethod::AuthTest, &form, Some("xoxb-1"))
			.expect("Request should build.");
		let body = String::from_utf8(request.body().clone()).expect("Body should be UTF-8.");

		assert_eq!(request.uri(), "https://example.test/api/auth.test");
		assert_eq!(body, "client_id=id&client_secret=s%26cret");
		assert_eq!(
			request.headers().get(AUTHORIZATION).and_then(|value| value.to_str().ok()),
			Some("Bearer xoxb-1")
		);
	}

	#[test]
	fn envelope_errors_are_classified() {
		let client = client("https://example.test/api/");
		let err = client
			.decode::<Identity>(
				ApiMethod::OAuthV2Access,
				response(200, r#"{"ok":false,"error":"invalid_code"}"#),
				None,
			)
			.expect_err("Envelope failure should surface.");

		assert!(matches!(err, Error::InvalidGrant { ref reason } if reason == "invalid_code"));

		let err = client
			.decode::<Identity>(
				ApiMethod::AuthTest,
				response(200, r#"{"ok":false,"error":"team_added_to_org"}"#),
				None,
			)
			.expect_err("Unclassified codes should surface.");

		assert!(matches!(
			err,
			Error::Api { method: ApiMethod::AuthTest, ref code } if code == "team_added_to_org"
		));
	}

	#[test]
	fn rate_limits_keep_retry_hints() {
		let client = client("https://example.test/api/");
		let err = client
			.decode::<Identity>(
				ApiMethod::AuthTest,
				response(429, r#"{"ok":false,"error":"ratelimited"}"#),
				Some(Duration::seconds(30)),
			)
			.expect_err("Rate limits should surface.");

		assert!(matches!(
			err,
			Error::Transient(TransientError::Upstream {
				status: Some(429),
				retry_after: Some(retry_after),
				..
			}) if retry_after == Duration::seconds(30)
		));
	}

	#[test]
	fn malformed_bodies_report_field_paths() {
		let client = client("https://example.test/api/");
		let err = client
			.decode::<RefreshedToken>(
				ApiMethod::RefreshToken,
				response(
					200,
					r#"{"ok":true,"access_token":"a","refresh_token":"r","expires_in":"soon"}"#,
				),
				None,
			)
			.expect_err("Malformed bodies should surface.");

		match err {
			Error::Transient(TransientError::ResponseParse { source, .. }) =>
				assert_eq!(source.path().to_string(), "expires_in"),
			other => panic!("Unexpected error: {other:?}."),
		}
	}

	#[tokio::test]
	async fn transport_failures_route_through_the_mapper() {
		let client = client("https://example.test/api/");
		let err = client
			.verify_identity("xoxb-1")
			.await
			.expect_err("Offline transport should fail.");

		assert!(matches!(err, Error::Transient(TransientError::Upstream { .. })));
	}
}
