//! Broker-level error types shared across flows, providers, and caches.

// self
use crate::_prelude::*;

/// Broker-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical broker error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Token cache failure.
	#[error("{0}")]
	Cache(
		#[from]
		#[source]
		crate::cache::CacheError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS) on a business call.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Input rejected locally before any network call.
	#[error(transparent)]
	Validation(#[from] ValidationError),

	/// The credential exchange against the provider's token endpoint failed.
	#[error("Provider authentication failed: {message}.")]
	Authentication {
		/// Provider- or broker-supplied message.
		message: String,
		/// HTTP status code, when a response was received.
		status: Option<u16>,
		/// Raw provider error payload, when one was returned.
		payload: Option<String>,
		/// Underlying transport or parse failure, if any.
		#[source]
		source: Option<BoxError>,
	},
	/// Provider answered a business call with a non-2xx status.
	#[error("Provider rejected the request: {message}.")]
	Upstream {
		/// Provider message when present, otherwise a status-derived summary.
		message: String,
		/// HTTP status code returned by the provider.
		status: u16,
		/// Raw provider error payload.
		payload: Option<String>,
	},
	/// Request exceeded the HTTP client's timeout.
	#[error("Provider did not answer the {endpoint} call in time.")]
	UpstreamTimeout {
		/// Logical endpoint label (`token`, `invoice`, ...).
		endpoint: &'static str,
	},
	/// Provider reports the requested resource as missing.
	#[error("Provider could not find {resource}: {message}.")]
	NotFound {
		/// Resource label, e.g. `invoice SETP990000001`.
		resource: String,
		/// Provider message when present.
		message: String,
	},
}
impl Error {
	pub(crate) fn authentication(message: impl Into<String>) -> Self {
		Self::Authentication { message: message.into(), status: None, payload: None, source: None }
	}

	/// Returns the provider's HTTP status code carried by the error, if any.
	pub fn upstream_status(&self) -> Option<u16> {
		match self {
			Self::Authentication { status, .. } => *status,
			Self::Upstream { status, .. } => Some(*status),
			Self::NotFound { .. } => Some(404),
			_ => None,
		}
	}
}

/// Local input that failed validation, with the offending field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
#[error("Invalid `{field}`: {message}.")]
pub struct ValidationError {
	/// Field (or request part) that failed validation.
	pub field: String,
	/// Human-readable reason.
	pub message: String,
}
impl ValidationError {
	/// Creates a validation error for `field`.
	pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
		Self { field: field.into(), message: message.into() }
	}
}

/// Configuration and construction failures raised by the broker.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Provider descriptor contains an invalid URL.
	#[error("Descriptor contains an invalid URL.")]
	InvalidDescriptor {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Provider descriptor could not be built.
	#[error(transparent)]
	Descriptor(#[from] crate::provider::ProviderDescriptorError),
	/// A required setting is absent.
	#[error("Missing required setting `{name}`.")]
	MissingSetting {
		/// Setting (or environment variable) name.
		name: &'static str,
	},
	/// A setting could not be parsed.
	#[error("Setting `{name}` is invalid: {reason}.")]
	InvalidSetting {
		/// Setting (or environment variable) name.
		name: &'static str,
		/// Parse failure description.
		reason: String,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the provider.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling the provider.")]
	Io(#[from] std::io::Error),
	/// The HTTP client failed without a more specific cause.
	#[error("HTTP client error occurred while calling the provider: {message}.")]
	Other {
		/// Client-supplied description.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
