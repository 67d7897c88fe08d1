// std
use std::net::IpAddr;
// self
use crate::{
	_prelude::*,
	auth::ProviderId,
	provider::{ClientAuthMethod, GrantType, ProviderDescriptor, ProviderEndpoints, SupportedGrants},
};

const TOKEN_PATH: &str = "oauth/token";
const INVOICE_PATH: &str = "v2/invoice";
const INVOICE_LIST_PATH: &str = "v2/facturas";

/// Errors raised while constructing or validating descriptors.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ProviderDescriptorError {
	/// Token endpoint is mandatory.
	#[error("Missing token endpoint.")]
	MissingTokenEndpoint,
	/// Invoice endpoint is mandatory.
	#[error("Missing invoice endpoint.")]
	MissingInvoiceEndpoint,
	/// Invoice listing endpoint is mandatory.
	#[error("Missing invoice list endpoint.")]
	MissingInvoiceListEndpoint,
	/// The password grant bootstraps every session and cannot be disabled.
	#[error("Descriptor must enable the password grant.")]
	PasswordGrantDisabled,
	/// Base URL cannot be used to derive endpoints.
	#[error("The base URL cannot be used to derive endpoints: {url}.")]
	InvalidBaseUrl {
		/// Base URL that failed validation.
		url: String,
	},
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} endpoint must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
}

/// Builder for [`ProviderDescriptor`] values.
#[derive(Debug)]
pub struct ProviderDescriptorBuilder {
	/// Identifier for the descriptor being constructed.
	pub id: ProviderId,
	/// Base URL the default endpoint paths are resolved against.
	pub base_url: Option<Url>,
	/// Explicit token endpoint; overrides the base-derived one.
	pub token_endpoint: Option<Url>,
	/// Explicit invoice endpoint; overrides the base-derived one.
	pub invoice_endpoint: Option<Url>,
	/// Explicit invoice listing endpoint; overrides the base-derived one.
	pub invoice_list_endpoint: Option<Url>,
	/// Grants enabled for the provider.
	pub supported_grants: SupportedGrants,
	/// Preferred client authentication method for the token endpoint.
	pub preferred_client_auth_method: ClientAuthMethod,
}
impl ProviderDescriptorBuilder {
	/// Creates a new builder seeded with the provided identifier.
	pub fn new(id: ProviderId) -> Self {
		Self {
			id,
			base_url: None,
			token_endpoint: None,
			invoice_endpoint: None,
			invoice_list_endpoint: None,
			supported_grants: SupportedGrants::default(),
			preferred_client_auth_method: ClientAuthMethod::default(),
		}
	}

	/// Sets the API base URL (`/oauth/token`, `/v2/invoice`, and `/v2/facturas` hang off it).
	pub fn base_url(mut self, url: Url) -> Self {
		self.base_url = Some(url);

		self
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the invoice endpoint.
	pub fn invoice_endpoint(mut self, url: Url) -> Self {
		self.invoice_endpoint = Some(url);

		self
	}

	/// Sets the invoice listing endpoint.
	pub fn invoice_list_endpoint(mut self, url: Url) -> Self {
		self.invoice_list_endpoint = Some(url);

		self
	}

	/// Disables the refresh-token grant so every renewal uses the password grant.
	pub fn without_refresh_grant(mut self) -> Self {
		self.supported_grants = self.supported_grants.disable(GrantType::RefreshToken);

		self
	}

	/// Overrides the preferred client authentication method.
	pub fn preferred_client_auth_method(mut self, method: ClientAuthMethod) -> Self {
		self.preferred_client_auth_method = method;

		self
	}

	/// Consumes the builder and validates the resulting descriptor.
	pub fn build(self) -> Result<ProviderDescriptor, ProviderDescriptorError> {
		let base = self.base_url.map(with_trailing_slash).transpose()?;
		let derive = |path: &str| base.as_ref().and_then(|base| base.join(path).ok());
		let token = self
			.token_endpoint
			.or_else(|| derive(TOKEN_PATH))
			.ok_or(ProviderDescriptorError::MissingTokenEndpoint)?;
		let invoices = self
			.invoice_endpoint
			.or_else(|| derive(INVOICE_PATH))
			.ok_or(ProviderDescriptorError::MissingInvoiceEndpoint)?;
		let invoice_list = self
			.invoice_list_endpoint
			.or_else(|| derive(INVOICE_LIST_PATH))
			.ok_or(ProviderDescriptorError::MissingInvoiceListEndpoint)?;
		let descriptor = ProviderDescriptor {
			id: self.id,
			endpoints: ProviderEndpoints { token, invoices, invoice_list },
			supported_grants: self.supported_grants,
			preferred_client_auth_method: self.preferred_client_auth_method,
		};

		descriptor.validate()?;

		Ok(descriptor)
	}
}

impl ProviderDescriptor {
	/// Validates invariants for the descriptor.
	fn validate(&self) -> Result<(), ProviderDescriptorError> {
		if !self.supports(GrantType::Password) {
			return Err(ProviderDescriptorError::PasswordGrantDisabled);
		}

		validate_endpoint("token", &self.endpoints.token)?;
		validate_endpoint("invoice", &self.endpoints.invoices)?;
		validate_endpoint("invoice list", &self.endpoints.invoice_list)?;

		Ok(())
	}
}

fn with_trailing_slash(mut url: Url) -> Result<Url, ProviderDescriptorError> {
	if url.cannot_be_a_base() {
		return Err(ProviderDescriptorError::InvalidBaseUrl { url: url.to_string() });
	}
	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());

		url.set_path(&path);
	}

	Ok(url)
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ProviderDescriptorError> {
	if url.scheme() == "https" || (url.scheme() == "http" && is_loopback(url)) {
		Ok(())
	} else {
		Err(ProviderDescriptorError::InsecureEndpoint { endpoint: name, url: url.to_string() })
	}
}

fn is_loopback(url: &Url) -> bool {
	match url.host_str() {
		Some("localhost") => true,
		Some(host) => host
			.trim_start_matches('[')
			.trim_end_matches(']')
			.parse::<IpAddr>()
			.map(|ip| ip.is_loopback())
			.unwrap_or(false),
		None => false,
	}
}
