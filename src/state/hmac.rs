//! Stateless state store that signs the install options with HMAC-SHA256.

// crates.io
use ::hmac::{Hmac, Mac};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::{Rng, distr::Alphanumeric};
use sha2::Sha256;
// self
use crate::{
	_prelude::*,
	error::InitializationError,
	state::{InstallOptions, StateFuture, StatePayload, StateStore, StateVerificationError},
};

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 16;

/// Signs state parameters as `base64url(json(payload)).base64url(hmac)`.
///
/// Nothing is stored server-side; any process holding the same secret can verify a state
/// issued by another.
#[derive(Clone)]
pub struct HmacStateStore {
	secret: Arc<[u8]>,
	ttl: Duration,
}
impl HmacStateStore {
	/// Shortest secret accepted, in bytes.
	pub const MIN_SECRET_LEN: usize = 32;
	/// Lifetime applied when none is configured.
	pub const DEFAULT_TTL: Duration = Duration::seconds(600);

	/// Creates a store with the given secret and state lifetime.
	pub fn new(secret: impl AsRef<[u8]>, ttl: Duration) -> Result<Self, InitializationError> {
		let secret = secret.as_ref();

		if secret.len() < Self::MIN_SECRET_LEN {
			return Err(InitializationError::WeakStateSecret { min: Self::MIN_SECRET_LEN });
		}
		if !ttl.is_positive() {
			return Err(InitializationError::NonPositiveStateTtl);
		}

		Ok(Self { secret: Arc::from(secret), ttl })
	}

	/// Lifetime granted to each issued state.
	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	/// Encodes and signs `options` issued at `now`.
	pub fn seal_at(
		&self,
		options: &InstallOptions,
		now: OffsetDateTime,
	) -> Result<String, StateVerificationError> {
		// Payload instants are whole seconds; the expiry rounds up so the TTL is never shortened.
		let issued_at = now.replace_nanosecond(0).map_err(|e| StateVerificationError::Backend {
			message: format!("state issue time is invalid: {e}"),
		})?;
		let expires_at = now.checked_add(self.ttl).and_then(ceil_to_second).ok_or_else(|| {
			StateVerificationError::Backend {
				message: "state expiry exceeds the supported time range".into(),
			}
		})?;
		let payload = StatePayload {
			install_options: options.clone(),
			issued_at,
			expires_at,
			nonce: random_nonce(NONCE_LEN),
		};
		let json = serde_json::to_vec(&payload).map_err(|e| StateVerificationError::Backend {
			message: format!("state payload failed to serialize: {e}"),
		})?;
		let encoded = URL_SAFE_NO_PAD.encode(json);
		let signature = URL_SAFE_NO_PAD.encode(self.mac(&encoded)?.finalize().into_bytes());

		Ok(format!("{encoded}.{signature}"))
	}

	/// Verifies the signature and expiry of `state` at `now` and returns its payload.
	pub fn open_at(
		&self,
		now: OffsetDateTime,
		state: &str,
	) -> Result<StatePayload, StateVerificationError> {
		let (encoded, signature) =
			state.split_once('.').ok_or_else(|| malformed("missing signature segment"))?;

		if signature.contains('.') {
			return Err(malformed("unexpected extra segment"));
		}

		let signature = URL_SAFE_NO_PAD
			.decode(signature.as_bytes())
			.map_err(|_| malformed("signature is not valid base64url"))?;

		self.mac(encoded)?
			.verify_slice(&signature)
			.map_err(|_| StateVerificationError::InvalidSignature)?;

		let json = URL_SAFE_NO_PAD
			.decode(encoded.as_bytes())
			.map_err(|_| malformed("payload is not valid base64url"))?;
		let payload = serde_json::from_slice::<StatePayload>(&json)
			.map_err(|e| malformed(&format!("payload is not valid JSON: {e}")))?;

		if payload.is_expired_at(now) {
			return Err(StateVerificationError::Expired { expires_at: payload.expires_at });
		}

		Ok(payload)
	}

	fn mac(&self, encoded: &str) -> Result<HmacSha256, StateVerificationError> {
		let mut mac = HmacSha256::new_from_slice(&self.secret).map_err(|e| {
			StateVerificationError::Backend { message: format!("HMAC key rejected: {e}") }
		})?;

		mac.update(encoded.as_bytes());

		Ok(mac)
	}
}
impl Debug for HmacStateStore {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("HmacStateStore").field("ttl", &self.ttl).finish_non_exhaustive()
	}
}
impl StateStore for HmacStateStore {
	fn generate<'a>(
		&'a self,
		options: &'a InstallOptions,
		now: OffsetDateTime,
	) -> StateFuture<'a, String> {
		let sealed = self.seal_at(options, now);

		Box::pin(async move { sealed })
	}

	fn verify<'a>(
		&'a self,
		now: OffsetDateTime,
		state: &'a str,
	) -> StateFuture<'a, InstallOptions> {
		let opened = self.open_at(now, state).map(|payload| payload.install_options);

		Box::pin(async move { opened })
	}
}

fn malformed(reason: &str) -> StateVerificationError {
	StateVerificationError::Malformed { reason: reason.to_owned() }
}

fn ceil_to_second(instant: OffsetDateTime) -> Option<OffsetDateTime> {
	let floor = instant.replace_nanosecond(0).ok()?;

	if floor == instant { Some(floor) } else { floor.checked_add(Duration::SECOND) }
}

fn random_nonce(len: usize) -> String {
	rand::rng().sample_iter(Alphanumeric).take(len).map(char::from).collect()
}
