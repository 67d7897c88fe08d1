//! Shared helpers for flow implementations (cached-token request state, singleflight guards).

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, RENEWAL_MARGIN, SessionId},
	flows::Broker,
	http::ProviderHttpClient,
	oauth::TransportErrorMapper,
};

/// Parameters for operations that evaluate the cached token before contacting the provider.
#[derive(Clone, Debug)]
pub struct TokenRequest {
	/// Session whose cached token is read and renewed.
	pub session: SessionId,
	/// Forces a renewal even when the cached token is still fresh.
	pub force: bool,
	/// Margin before expiry within which the cached token is renewed.
	pub renewal_margin: Duration,
}
impl TokenRequest {
	/// Creates a new request for the provided session with the default 60 second margin.
	pub fn new(session: SessionId) -> Self {
		Self { session, force: false, renewal_margin: RENEWAL_MARGIN }
	}

	/// Forces the broker to bypass cache checks.
	pub fn force_renewal(mut self) -> Self {
		self.force = true;

		self
	}

	/// Overrides the force flag.
	pub fn with_force(mut self, force: bool) -> Self {
		self.force = force;

		self
	}

	/// Overrides the renewal margin; negative values clamp to zero.
	pub fn with_renewal_margin(mut self, margin: Duration) -> Self {
		self.renewal_margin = if margin.is_negative() { Duration::ZERO } else { margin };

		self
	}

	/// Determines whether the cached token must be renewed at `now`.
	pub fn should_renew(&self, token: &AccessToken, now: OffsetDateTime) -> bool {
		self.force || !token.is_valid_at(now, self.renewal_margin)
	}
}

/// Returns (and creates on demand) the singleflight guard for a session.
pub(crate) fn flow_guard<C, M>(broker: &Broker<C, M>, session: &SessionId) -> Arc<AsyncMutex<()>>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let mut guards = broker.flow_guards.lock();

	guards.entry(session.clone()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
}

/// Drops the session's guard once no other caller holds or awaits it.
pub(crate) fn release_flow_guard<C, M>(
	broker: &Broker<C, M>,
	session: &SessionId,
	guard: Arc<AsyncMutex<()>>,
) where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let mut guards = broker.flow_guards.lock();

	// One reference lives in the map, the other is `guard`.
	if Arc::strong_count(&guard) <= 2
		&& guards.get(session).is_some_and(|entry| Arc::ptr_eq(entry, &guard))
	{
		guards.remove(session);
	}
}
