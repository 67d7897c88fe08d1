//! Invoice gateway: preview-then-confirm submission, lookups, and listings.
//!
//! Every provider call first runs [`Broker::ensure_token`], then sends one request through the
//! broker's [`ProviderHttpClient`] with the token as a bearer credential. Non-2xx answers are
//! classified by the [`ProviderStrategy`](crate::provider::ProviderStrategy); a `401` also
//! drops the session's cached token so the next call re-authenticates.

mod model;

pub use model::*;

// crates.io
use oauth2::{
	AsyncHttpClient, HttpRequest, HttpResponse,
	http::{
		Method,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, InvoiceId},
	cache::TokenCache,
	error::ConfigError,
	flows::{Broker, TokenRequest},
	http::{ProviderCall, ProviderHttpClient, ResponseMetadataSlot},
	oauth::TransportErrorMapper,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	provider::{ProviderErrorContext, ProviderErrorKind},
};

const JSON: &str = "application/json";

struct BusinessCall {
	call: ProviderCall,
	method: Method,
	url: Url,
	body: Option<Vec<u8>>,
	resource: String,
}

impl<C, M> Broker<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Previews or submits an invoice.
	///
	/// With `confirmed == false` the draft is echoed back as
	/// [`InvoiceSubmission::PendingConfirmation`] and neither the token endpoint nor the
	/// invoice endpoint is contacted. With `confirmed == true` the draft bytes are posted to
	/// the invoice endpoint and the provider's body is returned unchanged.
	pub async fn create_invoice(
		&self,
		cache: &dyn TokenCache,
		request: TokenRequest,
		draft: InvoiceDraft,
		confirmed: bool,
	) -> Result<InvoiceSubmission> {
		const KIND: FlowKind = FlowKind::CreateInvoice;

		if !confirmed {
			obs::flow_debug(KIND, "Invoice draft echoed for confirmation.");

			return Ok(InvoiceSubmission::PendingConfirmation { data: draft });
		}

		self.observe(KIND, "create_invoice", async {
			let call = BusinessCall {
				call: ProviderCall::CreateInvoice,
				method: Method::POST,
				url: self.descriptor.endpoints.invoices.clone(),
				body: Some(draft.as_str().as_bytes().to_vec()),
				resource: "invoice endpoint".into(),
			};

			self.send(cache, &request, call).await
		})
		.await
		.map(InvoiceSubmission::Submitted)
	}

	/// Looks up a single invoice (`GET {invoices}/{id}`).
	///
	/// A provider `404` surfaces as [`Error::NotFound`]; any other non-2xx as
	/// [`Error::Upstream`].
	pub async fn get_invoice_status(
		&self,
		cache: &dyn TokenCache,
		request: TokenRequest,
		id: &InvoiceId,
	) -> Result<ProviderPayload> {
		self.observe(FlowKind::GetInvoiceStatus, "get_invoice_status", async {
			let call = BusinessCall {
				call: ProviderCall::GetInvoice,
				method: Method::GET,
				url: self.descriptor.invoice_url(id)?,
				body: None,
				resource: format!("invoice {id}"),
			};

			self.send(cache, &request, call).await
		})
		.await
	}

	/// Lists invoices, forwarding only the filters that are present.
	///
	/// `page == 0` is rejected with [`Error::Validation`] before any network call.
	pub async fn list_invoices(
		&self,
		cache: &dyn TokenCache,
		request: TokenRequest,
		filters: &InvoiceFilters,
	) -> Result<ProviderPayload> {
		self.observe(FlowKind::ListInvoices, "list_invoices", async {
			let query = filters.query_string()?;
			let mut url = self.descriptor.endpoints.invoice_list.clone();

			url.set_query(query.as_deref());

			let call = BusinessCall {
				call: ProviderCall::ListInvoices,
				method: Method::GET,
				url,
				body: None,
				resource: "invoice list".into(),
			};

			self.send(cache, &request, call).await
		})
		.await
	}

	async fn observe<F, T>(&self, kind: FlowKind, stage: &'static str, fut: F) -> Result<T>
	where
		F: Future<Output = Result<T>>,
	{
		let span = FlowSpan::new(kind, stage);

		obs::record_flow_outcome(kind, FlowOutcome::Attempt);

		let result = span.instrument(fut).await;

		match &result {
			Ok(_) => obs::record_flow_outcome(kind, FlowOutcome::Success),
			Err(err) => {
				obs::flow_warn(kind, err);
				obs::record_flow_failure(kind, err);
			},
		}

		result
	}

	async fn send(
		&self,
		cache: &dyn TokenCache,
		request: &TokenRequest,
		call: BusinessCall,
	) -> Result<ProviderPayload> {
		let token = self.ensure_token(cache, request.clone()).await?;
		let http_request = build_request(&call, &token)?;
		let meta = ResponseMetadataSlot::default();
		let handle = self.http_client.with_metadata(meta.clone());
		let response = handle.call(http_request).await.map_err(|err| {
			self.transport_mapper.map_transport_error(call.call, meta.take().as_ref(), err)
		})?;

		if response.status().is_success() {
			let status = response.status().as_u16();

			return ProviderPayload::from_body(response.body()).ok_or_else(|| Error::Upstream {
				message: format!("{} answered HTTP {status} with a non-JSON body", call.call),
				status,
				payload: Some(String::from_utf8_lossy(response.body()).into_owned()),
			});
		}

		Err(self.classify_failure(cache, request, &call, &response).await)
	}

	async fn classify_failure(
		&self,
		cache: &dyn TokenCache,
		request: &TokenRequest,
		call: &BusinessCall,
		response: &HttpResponse,
	) -> Error {
		let status = response.status().as_u16();
		let payload = String::from_utf8_lossy(response.body()).into_owned();
		let described = self.strategy.describe_error(response.body());
		let mut ctx =
			ProviderErrorContext::new(call.call, status).with_body_preview(payload.clone());

		if let Some(message) = described.as_ref() {
			ctx = ctx.with_message(message.clone());
		}

		let message = described.unwrap_or_else(|| default_message(call.call, status));

		match self.strategy.classify_error(&ctx) {
			ProviderErrorKind::NotFound => Error::NotFound { resource: call.resource.clone(), message },
			ProviderErrorKind::Unauthorized => {
				// Best effort.
				if let Err(err) = cache.clear(&request.session).await {
					obs::flow_warn(FlowKind::EnsureToken, &Error::from(err));
				}

				Error::Upstream { message, status, payload: Some(payload) }
			},
			ProviderErrorKind::Rejected => Error::Upstream { message, status, payload: Some(payload) },
		}
	}
}

fn build_request(call: &BusinessCall, token: &AccessToken) -> Result<HttpRequest> {
	let authorization = token.value.bearer_header().map_err(|e| Error::Authentication {
		message: "provider token cannot be sent as a bearer header".into(),
		status: None,
		payload: None,
		source: Some(Box::new(e)),
	})?;
	let mut builder = oauth2::http::Request::builder()
		.method(call.method.clone())
		.uri(call.url.as_str())
		.header(AUTHORIZATION, authorization)
		.header(ACCEPT, JSON);

	if call.body.is_some() {
		builder = builder.header(CONTENT_TYPE, JSON);
	}

	builder.body(call.body.clone().unwrap_or_default()).map_err(|e| ConfigError::from(e).into())
}

fn default_message(call: ProviderCall, status: u16) -> String {
	match status {
		404 => format!("{call} target does not exist"),
		401 => format!("{call} was refused with HTTP 401; the provider token is no longer accepted"),
		_ => format!("{call} failed with HTTP {status}"),
	}
}
