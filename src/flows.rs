//! High-level flow orchestrators powered by the broker facade.

pub mod common;
pub mod invoice;
pub mod token;

pub use common::*;
pub use invoice::*;
pub use token::*;

// self
use crate::{
	_prelude::*,
	auth::{ResourceOwner, SessionId},
	http::ProviderHttpClient,
	oauth::TransportErrorMapper,
	provider::{ProviderDescriptor, ProviderStrategy},
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Broker specialized for the crate's default reqwest transport stack.
pub type ReqwestBroker = Broker<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Coordinates token renewal and invoice calls against a single provider descriptor.
///
/// The broker owns the HTTP client, provider descriptor, strategy, and account credentials.
/// It holds no token itself: every operation receives the [`TokenCache`] to read and renew
/// through, so the same broker can serve an in-process cache, a file snapshot, or the
/// per-request cookie jar.
///
/// [`TokenCache`]: crate::cache::TokenCache
#[derive(Clone)]
pub struct Broker<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// HTTP client wrapper used for every outbound provider request.
	pub http_client: Arc<C>,
	/// Mapper applied to transport-layer errors before surfacing them to callers.
	pub transport_mapper: Arc<M>,
	/// Provider descriptor that defines the token and invoice endpoints.
	pub descriptor: ProviderDescriptor,
	/// Strategy responsible for classifying provider errors.
	pub strategy: Arc<dyn ProviderStrategy>,
	/// OAuth 2.0 client identifier used in every grant.
	pub client_id: String,
	/// Optional client secret sent alongside the client identifier.
	pub client_secret: Option<String>,
	/// Provider account the password grant authenticates as.
	pub owner: ResourceOwner,
	/// Shared counters for token renewal outcomes.
	pub renewal_metrics: Arc<RenewalMetrics>,
	flow_guards: Arc<Mutex<HashMap<SessionId, Arc<AsyncMutex<()>>>>>,
}
impl<C, M> Broker<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a broker that reuses the caller-provided transport + mapper pair.
	pub fn with_http_client(
		descriptor: ProviderDescriptor,
		strategy: Arc<dyn ProviderStrategy>,
		client_id: impl Into<String>,
		owner: ResourceOwner,
		http_client: impl Into<Arc<C>>,
		mapper: impl Into<Arc<M>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			transport_mapper: mapper.into(),
			descriptor,
			strategy,
			client_id: client_id.into(),
			client_secret: None,
			owner,
			renewal_metrics: Default::default(),
			flow_guards: Default::default(),
		}
	}

	/// Sets or replaces the client secret.
	pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
		self.client_secret = Some(secret.into());

		self
	}
}
#[cfg(feature = "reqwest")]
impl Broker<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a new broker for the provided descriptor and credentials.
	///
	/// The broker provisions its own reqwest-backed transport (10 second timeout, no
	/// redirects) so callers do not need to pass HTTP handles explicitly.
	pub fn new(
		descriptor: ProviderDescriptor,
		strategy: Arc<dyn ProviderStrategy>,
		client_id: impl Into<String>,
		owner: ResourceOwner,
	) -> Self {
		Self::with_http_client(
			descriptor,
			strategy,
			client_id,
			owner,
			ReqwestHttpClient::default(),
			Arc::new(ReqwestTransportErrorMapper),
		)
	}
}
impl<C, M> Debug for Broker<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Broker")
			.field("descriptor", &self.descriptor)
			.field("client_id", &self.client_id)
			.field("client_secret_set", &self.client_secret.is_some())
			.field("owner", &self.owner)
			.finish()
	}
}
