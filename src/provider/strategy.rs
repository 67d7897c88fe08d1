//! Provider strategy hooks that classify failed provider calls.
//!
//! Implementations turn a non-2xx business response into the broker taxonomy and pull a
//! human-readable message out of the provider's error body, without tying flows to any
//! particular HTTP client.

// self
use crate::{_prelude::*, http::ProviderCall};

/// Strategy hook that classifies provider errors and extracts their messages.
///
/// Implementors are required to be `Send + Sync`. Only [`classify_error`] is mandatory;
/// [`describe_error`] defaults to reading the usual JSON fields.
///
/// [`classify_error`]: ProviderStrategy::classify_error
/// [`describe_error`]: ProviderStrategy::describe_error
pub trait ProviderStrategy: Send + Sync {
	/// Maps a failed business call into the broker taxonomy.
	fn classify_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind;

	/// Extracts the provider's message from an error body.
	///
	/// The default looks for `message`, then `error_description`, then `error` in a JSON
	/// object body.
	fn describe_error(&self, body: &[u8]) -> Option<String> {
		extract_message(body)
	}
}

/// Canonical provider error categories used by strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderErrorKind {
	/// The requested resource does not exist.
	NotFound,
	/// The bearer token was refused; the cached token must be dropped.
	Unauthorized,
	/// Any other rejection (validation, conflict, server error).
	Rejected,
}

/// Context passed to provider strategies when classifying errors.
///
/// The struct keeps only primitive data so strategies stay decoupled from any HTTP
/// client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderErrorContext {
	/// Provider call that failed.
	pub call: ProviderCall,
	/// HTTP status code returned by the provider.
	pub http_status: u16,
	/// Message extracted from the error body, if any.
	pub message: Option<String>,
	/// Preview of the response body.
	pub body_preview: Option<String>,
}
impl ProviderErrorContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Creates a new context for `call` failing with `http_status`.
	pub fn new(call: ProviderCall, http_status: u16) -> Self {
		Self { call, http_status, message: None, body_preview: None }
	}

	/// Adds the provider's message.
	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.message = Some(message.into());

		self
	}

	/// Adds a body preview, truncated to a bounded length.
	pub fn with_body_preview(mut self, body: impl Into<String>) -> Self {
		self.body_preview = Some(truncate_preview(body.into()));

		self
	}
}

/// Default strategy for the Factus API: 404 is not-found, 401 invalidates the token, and
/// everything else is a rejection.
#[derive(Debug, Default)]
pub struct DefaultProviderStrategy;
impl Display for DefaultProviderStrategy {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("default-provider-strategy")
	}
}
impl ProviderStrategy for DefaultProviderStrategy {
	fn classify_error(&self, ctx: &ProviderErrorContext) -> ProviderErrorKind {
		match ctx.http_status {
			404 | 410 => ProviderErrorKind::NotFound,
			401 => ProviderErrorKind::Unauthorized,
			_ => ProviderErrorKind::Rejected,
		}
	}
}

/// Reads the provider's message from a JSON error body.
pub fn extract_message(body: &[u8]) -> Option<String> {
	let value: serde_json::Value = serde_json::from_slice(body).ok()?;
	let object = value.as_object()?;

	["message", "error_description", "error"]
		.iter()
		.filter_map(|key| object.get(*key).and_then(|field| field.as_str()))
		.map(str::trim)
		.find(|text| !text.is_empty())
		.map(ToOwned::to_owned)
}

fn truncate_preview(body: String) -> String {
	if body.chars().count() <= ProviderErrorContext::BODY_PREVIEW_LIMIT {
		return body;
	}

	let mut buf = String::new();

	for (idx, ch) in body.chars().enumerate() {
		if idx >= ProviderErrorContext::BODY_PREVIEW_LIMIT {
			buf.push('…');

			break;
		}
		buf.push(ch);
	}

	buf
}
