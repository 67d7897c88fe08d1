//! Provider descriptor data structures and helpers shared by all flows.

/// Builder API for assembling provider descriptors.
pub mod builder;
/// Grant helpers wired into provider descriptors.
pub mod grant;

pub use builder::*;
pub use grant::*;

// self
use crate::{
	_prelude::*,
	auth::{InvoiceId, ProviderId},
	error::ConfigError,
};

/// Client authentication modes for token endpoint calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
	#[default]
	/// Form body parameters for `client_id`/`client_secret` (what Factus expects).
	ClientSecretPost,
	/// HTTP Basic with `client_id`/`client_secret`.
	ClientSecretBasic,
}

/// Endpoint set declared by a provider descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderEndpoints {
	/// OAuth token endpoint (`/oauth/token`).
	pub token: Url,
	/// Invoice collection endpoint (`/v2/invoice`); lookups append the invoice id.
	pub invoices: Url,
	/// Filterable invoice listing endpoint (`/v2/facturas`).
	pub invoice_list: Url,
}

/// Immutable provider descriptor consumed by flows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
	/// Descriptor identifier.
	pub id: ProviderId,
	/// Endpoint definitions exposed by the provider.
	pub endpoints: ProviderEndpoints,
	/// Supported grant flags.
	pub supported_grants: SupportedGrants,
	/// Preferred client authentication mechanism.
	pub preferred_client_auth_method: ClientAuthMethod,
}
impl ProviderDescriptor {
	/// Creates a new builder for the provided identifier.
	pub fn builder(id: ProviderId) -> ProviderDescriptorBuilder {
		ProviderDescriptorBuilder::new(id)
	}

	/// Checks whether the descriptor supports a given grant.
	pub fn supports(&self, grant: GrantType) -> bool {
		self.supported_grants.supports(grant)
	}

	/// Lookup URL for a single invoice (`{invoices}/{id}`).
	pub fn invoice_url(&self, id: &InvoiceId) -> Result<Url, ConfigError> {
		let mut url = self.endpoints.invoices.clone();

		url.path_segments_mut()
			.map_err(|_| ConfigError::InvalidSetting {
				name: "invoice_endpoint",
				reason: "URL cannot carry path segments".into(),
			})?
			.pop_if_empty()
			.push(id.as_ref());

		Ok(url)
	}
}
