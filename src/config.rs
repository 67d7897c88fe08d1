//! Deployment settings and broker construction.
//!
//! [`BrokerSettings`] deserializes from any serde source and can be read from `FACTUS_*`
//! environment variables:
//!
//! | Variable | Setting | Default |
//! | --- | --- | --- |
//! | `FACTUS_BASE_URL` | `base_url` | required |
//! | `FACTUS_CLIENT_ID` | `client_id` | required |
//! | `FACTUS_CLIENT_SECRET` | `client_secret` | required |
//! | `FACTUS_USERNAME` | `username` | required |
//! | `FACTUS_PASSWORD` | `password` | required |
//! | `FACTUS_REQUEST_TIMEOUT_SECS` | `request_timeout_secs` | `10` |
//! | `FACTUS_RENEWAL_MARGIN_SECS` | `renewal_margin_secs` | `60` |
//! | `FACTUS_ENV` | `environment` | `development` |

// self
use crate::{
	_prelude::*,
	auth::{ProviderId, ResourceOwner, SessionId, TokenSecret},
	cache::CookiePolicy,
	error::ConfigError,
	flows::TokenRequest,
	provider::ProviderDescriptor,
};
#[cfg(feature = "reqwest")]
use crate::{
	flows::{Broker, ReqwestBroker},
	http::ReqwestHttpClient,
	oauth::ReqwestTransportErrorMapper,
	provider::DefaultProviderStrategy,
};

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RENEWAL_MARGIN_SECS: u64 = 60;

/// Deployment environment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
	/// Local development.
	#[default]
	Development,
	/// Staging/test deployments.
	Staging,
	/// Production; cookies are marked `Secure`.
	Production,
}
impl Environment {
	/// Returns `true` in production.
	pub fn is_production(self) -> bool {
		matches!(self, Self::Production)
	}

	/// Cookie attributes for this environment.
	pub fn cookie_policy(self) -> CookiePolicy {
		if self.is_production() { CookiePolicy::production() } else { CookiePolicy::default() }
	}
}
impl Display for Environment {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(match self {
			Self::Development => "development",
			Self::Staging => "staging",
			Self::Production => "production",
		})
	}
}
impl FromStr for Environment {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"development" | "dev" => Ok(Self::Development),
			"staging" | "stage" | "test" => Ok(Self::Staging),
			"production" | "prod" => Ok(Self::Production),
			other => Err(ConfigError::InvalidSetting {
				name: "FACTUS_ENV",
				reason: format!("unknown environment `{other}`"),
			}),
		}
	}
}

/// Settings needed to talk to the provider.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerSettings {
	/// API base URL; token and invoice endpoints hang off it.
	pub base_url: Url,
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
	/// Provider account username.
	pub username: String,
	/// Provider account password.
	pub password: TokenSecret,
	/// Per-call timeout in seconds.
	#[serde(default = "default_request_timeout_secs")]
	pub request_timeout_secs: u64,
	/// Renewal margin in seconds.
	#[serde(default = "default_renewal_margin_secs")]
	pub renewal_margin_secs: u64,
	/// Deployment environment.
	#[serde(default)]
	pub environment: Environment,
}
impl BrokerSettings {
	/// Reads settings from `FACTUS_*` environment variables.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| std::env::var(name).ok())
	}

	/// Reads settings through `lookup`, which maps a variable name to its value.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let required = |name: &'static str| {
			lookup(name)
				.filter(|value| !value.trim().is_empty())
				.ok_or(ConfigError::MissingSetting { name })
		};
		let seconds = |name: &'static str, default: u64| match lookup(name) {
			Some(raw) => raw
				.trim()
				.parse::<u64>()
				.map_err(|e| ConfigError::InvalidSetting { name, reason: e.to_string() }),
			None => Ok(default),
		};
		let base_url = Url::parse(&required("FACTUS_BASE_URL")?)
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let environment = match lookup("FACTUS_ENV") {
			Some(raw) => raw.parse()?,
			None => Environment::default(),
		};

		Ok(Self {
			base_url,
			client_id: required("FACTUS_CLIENT_ID")?,
			client_secret: TokenSecret::new(required("FACTUS_CLIENT_SECRET")?),
			username: required("FACTUS_USERNAME")?,
			password: TokenSecret::new(required("FACTUS_PASSWORD")?),
			request_timeout_secs: seconds(
				"FACTUS_REQUEST_TIMEOUT_SECS",
				DEFAULT_REQUEST_TIMEOUT_SECS,
			)?,
			renewal_margin_secs: seconds("FACTUS_RENEWAL_MARGIN_SECS", DEFAULT_RENEWAL_MARGIN_SECS)?,
			environment,
		})
	}

	/// Descriptor with endpoints derived from [`Self::base_url`].
	pub fn descriptor(&self) -> Result<ProviderDescriptor, ConfigError> {
		let id = ProviderId::new("factus").map_err(|e| ConfigError::InvalidSetting {
			name: "provider_id",
			reason: e.to_string(),
		})?;

		Ok(ProviderDescriptor::builder(id).base_url(self.base_url.clone()).build()?)
	}

	/// Resource-owner credentials for the password grant.
	pub fn owner(&self) -> ResourceOwner {
		ResourceOwner { username: self.username.clone(), password: self.password.clone() }
	}

	/// Cookie attributes for the configured environment.
	pub fn cookie_policy(&self) -> CookiePolicy {
		self.environment.cookie_policy()
	}

	/// Token request for `session` carrying the configured renewal margin.
	pub fn token_request(&self, session: SessionId) -> TokenRequest {
		let margin = i64::try_from(self.renewal_margin_secs).unwrap_or(i64::MAX);

		TokenRequest::new(session).with_renewal_margin(Duration::seconds(margin))
	}

	/// Builds the reqwest-backed broker: descriptor, client with the configured timeout and
	/// no redirects, default strategy, and credentials.
	#[cfg(feature = "reqwest")]
	pub fn into_broker(self) -> Result<ReqwestBroker, ConfigError> {
		let descriptor = self.descriptor()?;
		let http_client = ReqwestHttpClient::with_timeout(std::time::Duration::from_secs(
			self.request_timeout_secs,
		))?;
		let owner = self.owner();

		Ok(Broker::with_http_client(
			descriptor,
			Arc::new(DefaultProviderStrategy),
			self.client_id,
			owner,
			http_client,
			Arc::new(ReqwestTransportErrorMapper),
		)
		.with_client_secret(self.client_secret.expose()))
	}
}
impl Debug for BrokerSettings {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BrokerSettings")
			.field("base_url", &self.base_url.as_str())
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret)
			.field("username", &self.username)
			.field("password", &self.password)
			.field("request_timeout_secs", &self.request_timeout_secs)
			.field("renewal_margin_secs", &self.renewal_margin_secs)
			.field("environment", &self.environment)
			.finish()
	}
}

fn default_request_timeout_secs() -> u64 {
	DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_renewal_margin_secs() -> u64 {
	DEFAULT_RENEWAL_MARGIN_SECS
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let vars = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect::<HashMap<_, _>>();

		move |name| vars.get(name).cloned()
	}

	const BASE: [(&str, &str); 5] = [
		("FACTUS_BASE_URL", "https://api-sandbox.factus.com.co"),
		("FACTUS_CLIENT_ID", "client"),
		("FACTUS_CLIENT_SECRET", "very-secret"),
		("FACTUS_USERNAME", "sandbox@factus.com.co"),
		("FACTUS_PASSWORD", "sandbox-password"),
	];

	#[test]
	fn defaults_apply_when_optional_variables_are_absent() {
		let settings = BrokerSettings::from_lookup(lookup(&BASE)).expect("Settings should load.");

		assert_eq!(settings.request_timeout_secs, 10);
		assert_eq!(settings.renewal_margin_secs, 60);
		assert_eq!(settings.environment, Environment::Development);
		assert!(!settings.cookie_policy().secure);

		let descriptor = settings.descriptor().expect("Descriptor should build.");

		assert_eq!(
			descriptor.endpoints.token.as_str(),
			"https://api-sandbox.factus.com.co/oauth/token"
		);
		assert_eq!(
			descriptor.endpoints.invoice_list.as_str(),
			"https://api-sandbox.factus.com.co/v2/facturas"
		);

		let request = settings
			.token_request(SessionId::new("s-1").expect("Session fixture should be valid."));

		assert_eq!(request.renewal_margin, Duration::seconds(60));
	}

	#[test]
	fn production_and_overrides_are_parsed() {
		let mut vars = BASE.to_vec();

		vars.extend([
			("FACTUS_ENV", "PROD"),
			("FACTUS_REQUEST_TIMEOUT_SECS", "3"),
			("FACTUS_RENEWAL_MARGIN_SECS", "120"),
		]);

		let settings = BrokerSettings::from_lookup(lookup(&vars)).expect("Settings should load.");

		assert_eq!(settings.environment, Environment::Production);
		assert!(settings.cookie_policy().secure);
		assert_eq!(settings.request_timeout_secs, 3);
		assert_eq!(settings.renewal_margin_secs, 120);
	}

	#[test]
	fn missing_and_invalid_settings_are_reported() {
		let err = BrokerSettings::from_lookup(lookup(&BASE[..4]))
			.expect_err("Password is required.");

		assert!(matches!(err, ConfigError::MissingSetting { name: "FACTUS_PASSWORD" }));

		let mut vars = BASE.to_vec();

		vars.push(("FACTUS_REQUEST_TIMEOUT_SECS", "soon"));

		let err = BrokerSettings::from_lookup(lookup(&vars)).expect_err("Timeout must be numeric.");

		assert!(matches!(err, ConfigError::InvalidSetting { name: "FACTUS_REQUEST_TIMEOUT_SECS", .. }));
	}

	#[test]
	fn debug_output_redacts_secrets() {
		let settings = BrokerSettings::from_lookup(lookup(&BASE)).expect("Settings should load.");
		let rendered = format!("{settings:?}");

		assert!(!rendered.contains("very-secret"));
		assert!(!rendered.contains("sandbox-password"));
		assert!(rendered.contains("sandbox@factus.com.co"));
	}

	#[test]
	fn deserializes_with_defaults() {
		let settings: BrokerSettings = serde_json::from_str(
			r#"{"base_url":"https://api.factus.test/","client_id":"c","client_secret":"s","username":"u","password":"p","environment":"staging"}"#,
		)
		.expect("Settings should deserialize.");

		assert_eq!(settings.environment, Environment::Staging);
		assert_eq!(settings.request_timeout_secs, 10);
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn into_broker_wires_credentials() {
		let broker = BrokerSettings::from_lookup(lookup(&BASE))
			.expect("Settings should load.")
			.into_broker()
			.expect("Broker should build.");

		assert_eq!(broker.client_id, "client");
		assert_eq!(broker.client_secret.as_deref(), Some("very-secret"));
		assert_eq!(broker.owner.username, "sandbox@factus.com.co");
	}
}
