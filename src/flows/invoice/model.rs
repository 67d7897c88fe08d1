//! Invoice payload wrappers and listing filters.

// crates.io
use serde::{
	Deserializer, Serializer,
	de::{DeserializeOwned, Error as _},
	ser::SerializeMap,
};
use serde_json::value::RawValue;
// self
use crate::{_prelude::*, error::ValidationError};

/// Unconfirmed invoice payload, kept as the caller's raw JSON.
///
/// The draft is forwarded to the provider and echoed back without re-encoding, so field
/// order, number formatting, and unknown fields survive untouched. It must be a JSON object.
#[derive(Clone, Debug)]
pub struct InvoiceDraft(Box<RawValue>);
impl InvoiceDraft {
	/// Parses a draft from JSON text.
	pub fn from_json(json: impl Into<String>) -> Result<Self, ValidationError> {
		let raw = RawValue::from_string(json.into())
			.map_err(|e| ValidationError::new("draft", format!("not valid JSON ({e})")))?;

		Self::from_raw(raw)
	}

	/// Parses a draft from a request body.
	pub fn from_slice(body: &[u8]) -> Result<Self, ValidationError> {
		let text = std::str::from_utf8(body)
			.map_err(|_| ValidationError::new("draft", "body is not UTF-8"))?;

		Self::from_json(text)
	}

	/// Draft JSON text, exactly as received.
	pub fn as_str(&self) -> &str {
		self.0.get()
	}

	fn from_raw(raw: Box<RawValue>) -> Result<Self, ValidationError> {
		if !raw.get().starts_with('{') {
			return Err(ValidationError::new("draft", "must be a JSON object"));
		}

		Ok(Self(raw))
	}
}
impl PartialEq for InvoiceDraft {
	fn eq(&self, other: &Self) -> bool {
		self.as_str() == other.as_str()
	}
}
impl Eq for InvoiceDraft {}
impl FromStr for InvoiceDraft {
	type Err = ValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::from_json(s)
	}
}
impl Serialize for InvoiceDraft {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		self.0.serialize(serializer)
	}
}
impl<'de> Deserialize<'de> for InvoiceDraft {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let raw = Box::<RawValue>::deserialize(deserializer)?;

		Self::from_raw(raw).map_err(D::Error::custom)
	}
}

/// Provider response body, passed through verbatim.
#[derive(Clone, Debug)]
pub struct ProviderPayload(Box<RawValue>);
impl ProviderPayload {
	/// Wraps a successful provider body; `None` when it is not JSON.
	pub(crate) fn from_body(body: &[u8]) -> Option<Self> {
		let text = std::str::from_utf8(body).ok()?;

		RawValue::from_string(text.to_owned()).ok().map(Self)
	}

	/// Body JSON text, exactly as returned by the provider.
	pub fn as_str(&self) -> &str {
		self.0.get()
	}

	/// Decodes the body into a typed view, reporting the failing path on mismatch.
	pub fn parse<T>(&self) -> Result<T, serde_path_to_error::Error<serde_json::Error>>
	where
		T: DeserializeOwned,
	{
		serde_path_to_error::deserialize(&mut serde_json::Deserializer::from_str(self.as_str()))
	}
}
impl PartialEq for ProviderPayload {
	fn eq(&self, other: &Self) -> bool {
		self.as_str() == other.as_str()
	}
}
impl Eq for ProviderPayload {}
impl Serialize for ProviderPayload {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		self.0.serialize(serializer)
	}
}

/// Outcome of [`Broker::create_invoice`](crate::flows::Broker::create_invoice).
///
/// Serializes as `{"status":"pending_confirmation","data":<draft>}` for previews and as the
/// provider's body, unchanged, for submissions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvoiceSubmission {
	/// Preview: the draft echoed back, nothing sent to the provider.
	PendingConfirmation {
		/// Draft awaiting confirmation.
		data: InvoiceDraft,
	},
	/// Confirmed submission and the provider's raw answer.
	Submitted(ProviderPayload),
}
impl InvoiceSubmission {
	/// Status label used in preview bodies.
	pub const PENDING_CONFIRMATION: &'static str = "pending_confirmation";

	/// Returns `true` for previews.
	pub fn is_pending(&self) -> bool {
		matches!(self, Self::PendingConfirmation { .. })
	}
}
impl Serialize for InvoiceSubmission {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		match self {
			Self::PendingConfirmation { data } => {
				let mut map = serializer.serialize_map(Some(2))?;

				map.serialize_entry("status", Self::PENDING_CONFIRMATION)?;
				map.serialize_entry("data", data)?;
				map.end()
			},
			Self::Submitted(payload) => payload.serialize(serializer),
		}
	}
}

/// Optional listing filters forwarded as `filter[...]` query parameters.
///
/// Empty strings count as absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceFilters {
	/// Customer identification number.
	pub identification: Option<String>,
	/// Customer names.
	pub names: Option<String>,
	/// Invoice number.
	pub number: Option<String>,
	/// Numbering-range prefix.
	pub prefix: Option<String>,
	/// Caller-side reference code.
	pub reference_code: Option<String>,
	/// Provider status code (`1` validated, `0` pending).
	pub status: Option<String>,
	/// One-based page number.
	pub page: Option<u32>,
}
impl InvoiceFilters {
	/// Filters by customer identification.
	pub fn identification(mut self, value: impl Into<String>) -> Self {
		self.identification = Some(value.into());

		self
	}

	/// Filters by customer names.
	pub fn names(mut self, value: impl Into<String>) -> Self {
		self.names = Some(value.into());

		self
	}

	/// Filters by invoice number.
	pub fn number(mut self, value: impl Into<String>) -> Self {
		self.number = Some(value.into());

		self
	}

	/// Filters by prefix.
	pub fn prefix(mut self, value: impl Into<String>) -> Self {
		self.prefix = Some(value.into());

		self
	}

	/// Filters by reference code.
	pub fn reference_code(mut self, value: impl Into<String>) -> Self {
		self.reference_code = Some(value.into());

		self
	}

	/// Filters by provider status.
	pub fn status(mut self, value: impl ToString) -> Self {
		self.status = Some(value.to_string());

		self
	}

	/// Requests a page.
	pub fn page(mut self, page: u32) -> Self {
		self.page = Some(page);

		self
	}

	/// Query pairs in wire order: filters first, then `page`.
	pub fn query_pairs(&self) -> Result<Vec<(String, String)>, ValidationError> {
		if self.page == Some(0) {
			return Err(ValidationError::new("page", "must be at least 1"));
		}

		let filters = [
			("identification", &self.identification),
			("names", &self.names),
			("number", &self.number),
			("prefix", &self.prefix),
			("reference_code", &self.reference_code),
			("status", &self.status),
		];
		let mut pairs = filters
			.into_iter()
			.filter_map(|(key, value)| {
				value
					.as_deref()
					.filter(|value| !value.is_empty())
					.map(|value| (format!("filter[{key}]"), value.to_owned()))
			})
			.collect::<Vec<_>>();

		if let Some(page) = self.page {
			pairs.push(("page".into(), page.to_string()));
		}

		Ok(pairs)
	}

	/// Wire query: `filter[key]=value&...&page=N`, brackets left literal and values
	/// form-encoded. `None` when no filter is present.
	pub fn query_string(&self) -> Result<Option<String>, ValidationError> {
		let pairs = self.query_pairs()?;

		if pairs.is_empty() {
			return Ok(None);
		}

		let query = pairs
			.iter()
			.map(|(key, value)| {
				let value = url::form_urlencoded::byte_serialize(value.as_bytes()).collect::<String>();

				format!("{key}={value}")
			})
			.collect::<Vec<_>>()
			.join("&");

		Ok(Some(query))
	}
}
