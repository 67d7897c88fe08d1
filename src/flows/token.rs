//! Token renewal orchestration with singleflight guards and metrics.
//!
//! [`Broker::ensure_token`] hands callers a provider token that stays valid for at least the
//! request's renewal margin. Each call acquires a per-session guard, re-reads the cache, and
//! either reuses the cached token or performs exactly one exchange against the token
//! endpoint (`grant_type=refresh_token` when the cached token carries a refresh token,
//! `grant_type=password` otherwise). Renewed tokens are written back into the same cache.

mod metrics;

pub use metrics::RenewalMetrics;

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, SessionId},
	cache::TokenCache,
	flows::{Broker, TokenRequest, common},
	http::ProviderHttpClient,
	oauth::{BasicFacade, OAuth2Facade, TransportErrorMapper},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::GrantType,
};

impl<C, M> Broker<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Returns a token valid for at least `request.renewal_margin`, renewing it when needed.
	///
	/// # Errors
	///
	/// - [`Error::Authentication`] when the token endpoint rejects the exchange, answers with a
	///   malformed body, or cannot be reached.
	/// - [`Error::UpstreamTimeout`] when the exchange exceeds the client timeout.
	/// - [`Error::Cache`] when the cache cannot be read or written.
	pub async fn ensure_token(
		&self,
		cache: &dyn TokenCache,
		request: TokenRequest,
	) -> Result<AccessToken> {
		const KIND: FlowKind = FlowKind::EnsureToken;

		let span = FlowSpan::new(KIND, "ensure_token");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				self.renewal_metrics.record_attempt();

				let guard = common::flow_guard(self, &request.session);
				let result = {
					let _singleflight = guard.lock().await;

					self.renew_if_needed(cache, &request).await
				};

				common::release_flow_guard(self, &request.session, guard);

				if result.is_err() {
					self.renewal_metrics.record_failure();
				}

				result
			})
			.await;

		match &result {
			Ok(_) => obs::record_flow_outcome(KIND, FlowOutcome::Success),
			Err(err) => {
				obs::flow_warn(KIND, err);
				obs::record_flow_failure(KIND, err);
			},
		}

		result
	}

	/// Drops the session's cached token (for cookies: emits expiring cookies).
	///
	/// Returns `true` when a token was present.
	pub async fn invalidate_token(&self, cache: &dyn TokenCache, session: &SessionId) -> Result<bool> {
		let previous = cache.clear(session).await?;

		Ok(previous.is_some())
	}

	async fn renew_if_needed(
		&self,
		cache: &dyn TokenCache,
		request: &TokenRequest,
	) -> Result<AccessToken> {
		let current = cache.fetch(&request.session).await?;
		let now = OffsetDateTime::now_utc();

		if let Some(token) = current.as_ref().filter(|token| !request.should_renew(token, now)) {
			self.renewal_metrics.record_reuse();
			obs::flow_debug(FlowKind::EnsureToken, "Cached provider token reused.");

			return Ok(token.clone());
		}

		let facade = <BasicFacade<C, M>>::from_descriptor(
			&self.descriptor,
			&self.client_id,
			self.client_secret.as_deref(),
			self.http_client.clone(),
			self.transport_mapper.clone(),
		)?;
		let previous_refresh = current
			.and_then(|token| token.refresh_token)
			.filter(|_| self.descriptor.supports(GrantType::RefreshToken));
		let token = match previous_refresh {
			Some(refresh) => {
				let refreshed = facade.refresh_token(self.strategy.as_ref(), refresh.expose()).await;

				match refreshed {
					Ok(mut token) => {
						if token.refresh_token.is_none() {
							token.refresh_token = Some(refresh);
						}

						token
					},
					// The provider answered and refused the refresh token; start over.
					Err(Error::Authentication { status: Some(_), .. }) => {
						obs::flow_debug(
							FlowKind::EnsureToken,
							"Refresh token rejected; falling back to the password grant.",
						);

						facade.exchange_password(self.strategy.as_ref(), &self.owner).await?
					},
					Err(err) => return Err(err),
				}
			},
			None => facade.exchange_password(self.strategy.as_ref(), &self.owner).await?,
		};

		cache.save(&request.session, token.clone()).await?;
		self.renewal_metrics.record_renewal();
		obs::flow_debug(FlowKind::EnsureToken, "Provider token renewed.");

		Ok(token)
	}
}
