//! Boundary helpers for services exposing the broker over HTTP.
//!
//! These cover the request and response plumbing around the invoice entry point
//! (`POST /api/factus/facturas?confirmar=...`): the confirmation flag, the structured failure
//! body, error-to-status mapping, and the session key derived from the caller's bearer token.

// crates.io
use oauth2::http::{
	HeaderMap, StatusCode,
	header::{AUTHORIZATION, COOKIE},
};
// self
use crate::{_prelude::*, auth::SessionId};

/// Query parameter carrying the confirmation flag.
pub const CONFIRMATION_PARAM: &str = "confirmar";
/// Cookie carrying the caller's own session token.
pub const SESSION_COOKIE: &str = "token";

/// Parsed `confirmar` query flag.
///
/// Only `true` (any case) and `1` confirm; anything else, including an absent flag, previews.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationFlag(pub bool);
impl ConfirmationFlag {
	/// Interprets a raw flag value.
	pub fn from_value(value: Option<&str>) -> Self {
		Self(value.is_some_and(|raw| {
			let raw = raw.trim();

			raw == "1" || raw.eq_ignore_ascii_case("true")
		}))
	}

	/// Reads the flag from a raw (undecoded) query string.
	pub fn from_query(query: &str) -> Self {
		let value = url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
			.find(|(key, _)| key == CONFIRMATION_PARAM)
			.map(|(_, value)| value.into_owned());

		Self::from_value(value.as_deref())
	}

	/// Returns `true` when the caller confirmed the submission.
	pub fn is_confirmed(self) -> bool {
		self.0
	}
}

/// Structured failure body: `{"success":false,"message":"..."}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureBody {
	/// Always `false`.
	pub success: bool,
	/// Message for the caller; provider messages are preserved.
	pub message: String,
}
impl FailureBody {
	/// Builds a failure body with `message`.
	pub fn new(message: impl Into<String>) -> Self {
		Self { success: false, message: message.into() }
	}
}
impl From<&Error> for FailureBody {
	fn from(error: &Error) -> Self {
		match error {
			Error::Authentication { message, .. }
			| Error::Upstream { message, .. }
			| Error::NotFound { message, .. } => Self::new(message.clone()),
			other => Self::new(other.to_string()),
		}
	}
}

/// HTTP status a service should answer with for `error`.
pub fn status_for(error: &Error) -> StatusCode {
	match error {
		Error::Validation(_) => StatusCode::BAD_REQUEST,
		Error::Authentication { .. } => StatusCode::UNAUTHORIZED,
		Error::NotFound { .. } => StatusCode::NOT_FOUND,
		Error::Upstream { .. } | Error::Transport(_) => StatusCode::BAD_GATEWAY,
		Error::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
		Error::Config(_) | Error::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
	}
}

/// Extracts the caller's bearer token: the `token` cookie first, then an
/// `Authorization: Bearer` header, then a top-level `token` field of a JSON body.
pub fn extract_bearer(headers: &HeaderMap, body: Option<&[u8]>) -> Option<String> {
	cookie_token(headers)
		.or_else(|| authorization_token(headers))
		.or_else(|| body.and_then(body_token))
		.filter(|token| !token.is_empty())
}

/// Session key for the caller, derived from the bearer token without exposing it.
pub fn session_for(headers: &HeaderMap, body: Option<&[u8]>) -> Option<SessionId> {
	extract_bearer(headers, body).map(|token| SessionId::from_bearer(&token))
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
	headers
		.get_all(COOKIE)
		.iter()
		.filter_map(|value| value.to_str().ok())
		.flat_map(|header| header.split(';'))
		.filter_map(|pair| pair.split_once('='))
		.find(|(name, _)| name.trim() == SESSION_COOKIE)
		.map(|(_, value)| value.trim().to_owned())
}

fn authorization_token(headers: &HeaderMap) -> Option<String> {
	let raw = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
	let (scheme, token) = raw.split_once(' ')?;

	scheme.eq_ignore_ascii_case("bearer").then(|| token.trim().to_owned())
}

fn body_token(body: &[u8]) -> Option<String> {
	#[derive(Deserialize)]
	struct TokenField {
		token: Option<String>,
	}

	serde_json::from_slice::<TokenField>(body).ok()?.token
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::http::HeaderValue;
	// self
	use super::*;
	use crate::error::ValidationError;

	#[test]
	fn only_true_or_one_confirms() {
		for (value, expected) in [
			(None, false),
			(Some("true"), true),
			(Some("TRUE"), true),
			(Some("1"), true),
			(Some("false"), false),
			(Some("yes"), false),
			(Some(""), false),
		] {
			assert_eq!(ConfirmationFlag::from_value(value).is_confirmed(), expected, "{value:?}");
		}

		assert!(ConfirmationFlag::from_query("?confirmar=true").is_confirmed());
		assert!(ConfirmationFlag::from_query("debug=1&confirmar=1").is_confirmed());
		assert!(!ConfirmationFlag::from_query("confirm=true").is_confirmed());
	}

	#[test]
	fn errors_map_to_statuses_and_bodies() {
		let upstream = Error::Upstream {
			message: "Documento con errores en campos mandatorios".into(),
			status: 422,
			payload: None,
		};

		assert_eq!(status_for(&upstream), StatusCode::BAD_GATEWAY);
		assert_eq!(
			serde_json::to_string(&FailureBody::from(&upstream)).expect("Body should serialize."),
			r#"{"success":false,"message":"Documento con errores en campos mandatorios"}"#
		);
		assert_eq!(
			status_for(&ValidationError::new("page", "must be at least 1").into()),
			StatusCode::BAD_REQUEST
		);
		assert_eq!(status_for(&Error::authentication("bad password")), StatusCode::UNAUTHORIZED);
		assert_eq!(
			status_for(&Error::UpstreamTimeout { endpoint: "token" }),
			StatusCode::GATEWAY_TIMEOUT
		);
		assert_eq!(
			status_for(&Error::NotFound { resource: "invoice X".into(), message: "missing".into() }),
			StatusCode::NOT_FOUND
		);
	}

	#[test]
	fn bearer_lookup_prefers_cookie_then_header_then_body() {
		let mut headers = HeaderMap::new();

		headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));

		assert_eq!(extract_bearer(&headers, None).as_deref(), Some("from-header"));

		headers.insert(COOKIE, HeaderValue::from_static("factusToken=x; token=from-cookie"));

		assert_eq!(extract_bearer(&headers, None).as_deref(), Some("from-cookie"));
		assert_eq!(
			extract_bearer(&HeaderMap::new(), Some(br#"{"token":"from-body"}"#)).as_deref(),
			Some("from-body")
		);
		assert_eq!(extract_bearer(&HeaderMap::new(), Some(b"not json")), None);

		let session = session_for(&headers, None).expect("Session should be derived.");

		assert_eq!(session, SessionId::from_bearer("from-cookie"));
		assert!(!session.contains("from-cookie"));
	}
}
