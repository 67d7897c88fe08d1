//! Internal OAuth client facade over the provider's `/oauth/token` endpoint.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, Client, ClientId, ClientSecret, EndpointNotSet, EndpointSet, HttpClientError,
	RefreshToken, RequestTokenError, ResourceOwnerPassword, ResourceOwnerUsername, Scope,
	StandardRevocableToken, TokenResponse, TokenUrl,
	basic::{
		BasicErrorResponse, BasicRequestTokenError, BasicRevocationErrorResponse,
		BasicTokenIntrospectionResponse, BasicTokenType,
	},
};
// self
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;
use crate::{
	_prelude::*,
	auth::{AccessToken, ResourceOwner},
	error::{ConfigError, TransportError},
	http::{ProviderCall, ProviderHttpClient, ResponseMetadata, ResponseMetadataSlot},
	provider::{ClientAuthMethod, ProviderDescriptor, ProviderStrategy},
};

type FactusClient<HasTokenUrl = EndpointNotSet> = Client<
	BasicErrorResponse,
	FactusTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	HasTokenUrl,
>;
type ConfiguredClient = FactusClient<EndpointSet>;
type FacadeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + 'a + Send>>;

/// Maps HTTP transport failures into broker [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a broker error.
	///
	/// Failures on [`ProviderCall::Token`] that map to [`Error::Transport`] are re-wrapped
	/// as [`Error::Authentication`] by the token flow.
	fn map_transport_error(
		&self,
		call: ProviderCall,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		call: ProviderCall,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		// Metadata is only informative for reqwest; timeouts carry no status.
		let _ = meta;

		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(call, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => TransportError::Other { message }.into(),
			_ => TransportError::Other { message: format!("unknown failure during {call}") }.into(),
		}
	}
}

/// Token endpoint payload.
///
/// Factus answers `{access_token, refresh_token?, expires_in}` and may leave out
/// `token_type`; a missing type is read as `Bearer`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub(crate) struct FactusTokenResponse {
	access_token: oauth2::AccessToken,
	#[serde(default = "bearer")]
	token_type: BasicTokenType,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	expires_in: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	refresh_token: Option<RefreshToken>,
	#[serde(skip)]
	scopes: Option<Vec<Scope>>,
}
impl TokenResponse for FactusTokenResponse {
	type TokenType = BasicTokenType;

	fn access_token(&self) -> &oauth2::AccessToken {
		&self.access_token
	}

	fn token_type(&self) -> &Self::TokenType {
		&self.token_type
	}

	fn expires_in(&self) -> Option<std::time::Duration> {
		self.expires_in.map(std::time::Duration::from_secs)
	}

	fn refresh_token(&self) -> Option<&RefreshToken> {
		self.refresh_token.as_ref()
	}

	fn scopes(&self) -> Option<&Vec<Scope>> {
		self.scopes.as_ref()
	}
}

fn bearer() -> BasicTokenType {
	BasicTokenType::Bearer
}

pub(crate) trait OAuth2Facade {
	fn exchange_password<'a>(
		&'a self,
		strategy: &'a dyn ProviderStrategy,
		owner: &'a ResourceOwner,
	) -> FacadeFuture<'a, AccessToken>;

	fn refresh_token<'a>(
		&'a self,
		strategy: &'a dyn ProviderStrategy,
		refresh_token: &'a str,
	) -> FacadeFuture<'a, AccessToken>;
}

#[cfg(feature = "reqwest")]
pub(crate) struct BasicFacade<C = ReqwestHttpClient, M = ReqwestTransportErrorMapper>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredClient,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
#[cfg(not(feature = "reqwest"))]
pub(crate) struct BasicFacade<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	oauth_client: ConfiguredClient,
	http_client: Arc<C>,
	error_mapper: Arc<M>,
}
impl<C, M> BasicFacade<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	pub(crate) fn from_descriptor(
		descriptor: &ProviderDescriptor,
		client_id: &str,
		client_secret: Option<&str>,
		http_client: impl Into<Arc<C>>,
		error_mapper: impl Into<Arc<M>>,
	) -> Result<Self> {
		let token_url = TokenUrl::new(descriptor.endpoints.token.to_string())
			.map_err(|source| ConfigError::InvalidDescriptor { source })?;
		let mut oauth_client =
			FactusClient::new(ClientId::new(client_id.to_owned())).set_token_uri(token_url);

		if let Some(secret) = client_secret {
			oauth_client = oauth_client.set_client_secret(ClientSecret::new(secret.to_owned()));
		}
		if matches!(descriptor.preferred_client_auth_method, ClientAuthMethod::ClientSecretPost) {
			oauth_client = oauth_client.set_auth_type(AuthType::RequestBody);
		}

		Ok(Self {
			oauth_client,
			http_client: http_client.into(),
			error_mapper: error_mapper.into(),
		})
	}
}
impl<C, M> OAuth2Facade for BasicFacade<C, M>
where
	C: ?Sized + ProviderHttpClient,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn exchange_password<'a>(
		&'a self,
		strategy: &'a dyn ProviderStrategy,
		owner: &'a ResourceOwner,
	) -> FacadeFuture<'a, AccessToken> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let username = ResourceOwnerUsername::new(owner.username.clone());
			let password = ResourceOwnerPassword::new(owner.password.expose().to_owned());
			let response = self
				.oauth_client
				.exchange_password(&username, &password)
				.request_async(&instrumented)
				.await
				.map_err(|err| {
					map_request_error(strategy, meta.take(), err, self.error_mapper.as_ref())
				})?;

			map_token_response(response)
		})
	}

	fn refresh_token<'a>(
		&'a self,
		strategy: &'a dyn ProviderStrategy,
		refresh_token: &'a str,
	) -> FacadeFuture<'a, AccessToken> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let refresh_secret = RefreshToken::new(refresh_token.to_owned());
			let response = self
				.oauth_client
				.exchange_refresh_token(&refresh_secret)
				.request_async(&instrumented)
				.await
				.map_err(|err| {
					map_request_error(strategy, meta.take(), err, self.error_mapper.as_ref())
				})?;

			map_token_response(response)
		})
	}
}

fn map_token_response(response: FactusTokenResponse) -> Result<AccessToken> {
	let expires_in = response
		.expires_in()
		.ok_or_else(|| Error::authentication("token endpoint response is missing expires_in"))?
		.as_secs();
	let expires_in = i64::try_from(expires_in)
		.map_err(|_| Error::authentication("expires_in exceeds the supported range"))?;

	if expires_in <= 0 {
		return Err(Error::authentication("expires_in must be positive"));
	}

	let issued_at = OffsetDateTime::now_utc();
	let mut builder = AccessToken::builder()
		.value(response.access_token().secret().to_owned())
		.issued_at(issued_at)
		.expires_in(Duration::seconds(expires_in));

	if let Some(refresh) = response.refresh_token() {
		builder = builder.refresh_token(refresh.secret().to_owned());
	}

	builder.build().map_err(|err| Error::Authentication {
		message: format!("token endpoint returned an unusable expires_in ({expires_in}s)"),
		status: None,
		payload: None,
		source: Some(Box::new(err)),
	})
}

fn map_request_error<E, M>(
	strategy: &dyn ProviderStrategy,
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let status = meta.as_ref().and_then(|value| value.status);

	match err {
		RequestTokenError::ServerResponse(response) => map_server_response_error(response, status),
		RequestTokenError::Request(error) =>
			match mapper.map_transport_error(ProviderCall::Token, meta.as_ref(), error) {
				Error::Transport(source) => Error::Authentication {
					message: "token endpoint could not be reached".into(),
					status,
					payload: None,
					source: Some(Box::new(source)),
				},
				other => other,
			},
		RequestTokenError::Parse(error, body) => {
			let message = strategy.describe_error(&body).unwrap_or_else(|| match status {
				Some(code) if !(200..300).contains(&code) =>
					format!("token endpoint returned HTTP {code}"),
				_ => "token endpoint returned a malformed response".into(),
			});

			Error::Authentication {
				message,
				status,
				payload: Some(String::from_utf8_lossy(&body).into_owned()),
				source: Some(Box::new(error)),
			}
		},
		RequestTokenError::Other(message) =>
			Error::Authentication { message, status, payload: None, source: None },
	}
}

fn map_server_response_error(response: BasicErrorResponse, status: Option<u16>) -> Error {
	let message = match response.error_description() {
		Some(description) => format!("{}: {description}", response.error().as_ref()),
		None => response.error().as_ref().to_string(),
	};

	Error::Authentication {
		message,
		status,
		payload: serde_json::to_string(&response).ok(),
		source: None,
	}
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(call: ProviderCall, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return Error::UpstreamTimeout { endpoint: call.as_str() };
	}

	TransportError::from(err).into()
}

#[cfg(all(test, feature = "reqwest"))]
mod tests {
	// self
	use super::*;
	use crate::{auth::ProviderId, provider::DefaultProviderStrategy};

	fn descriptor(method: ClientAuthMethod) -> ProviderDescriptor {
		ProviderDescriptor::builder(
			ProviderId::new("test-provider").expect("Failed to construct provider identifier."),
		)
		.base_url(Url::parse("https://example.com/").expect("Failed to parse base URL."))
		.preferred_client_auth_method(method)
		.build()
		.expect("Failed to build provider descriptor.")
	}

	#[test]
	fn builds_post_auth_client() {
		let result = <BasicFacade<ReqwestHttpClient, ReqwestTransportErrorMapper>>::from_descriptor(
			&descriptor(ClientAuthMethod::ClientSecretPost),
			"client-id",
			Some("secret"),
			Arc::new(ReqwestHttpClient::default()),
			Arc::new(ReqwestTransportErrorMapper),
		);

		assert!(result.is_ok());
	}

	#[test]
	fn builds_basic_auth_client_without_secret() {
		let result = <BasicFacade<ReqwestHttpClient, ReqwestTransportErrorMapper>>::from_descriptor(
			&descriptor(ClientAuthMethod::ClientSecretBasic),
			"client-id",
			None,
			Arc::new(ReqwestHttpClient::default()),
			Arc::new(ReqwestTransportErrorMapper),
		);

		assert!(result.is_ok());
	}

	fn token_response(body: &str) -> FactusTokenResponse {
		serde_json::from_str(body).expect("Token response fixture should deserialize.")
	}

	#[test]
	fn token_type_defaults_to_bearer() {
		let response = token_response(r#"{"access_token":"abc","expires_in":3600}"#);

		assert_eq!(response.token_type(), &BasicTokenType::Bearer);
		assert!(response.refresh_token().is_none());

		let token = map_token_response(response).expect("Token should map.");

		assert_eq!(token.value.expose(), "abc");
		assert_eq!(token.expires_at - token.issued_at, Duration::hours(1));

		let response = token_response(
			r#"{"token_type":"bearer","access_token":"def","refresh_token":"r1","expires_in":60}"#,
		);

		assert_eq!(response.token_type(), &BasicTokenType::Bearer);
		assert_eq!(response.refresh_token().map(|token| token.secret().as_str()), Some("r1"));
	}

	#[test]
	fn oversized_expires_in_is_an_authentication_failure() {
		let err = map_token_response(token_response(
			r#"{"access_token":"abc","token_type":"Bearer","expires_in":900000000000000}"#,
		))
		.expect_err("An out-of-range expiry must not build a token.");

		match err {
			Error::Authentication { message, source, .. } => {
				assert!(message.contains("expires_in"));
				assert!(source.is_some());
			},
			other => panic!("Unexpected error variant: {other:?}."),
		}

		assert!(matches!(
			map_token_response(token_response(r#"{"access_token":"abc","expires_in":0}"#)),
			Err(Error::Authentication { .. })
		));
	}

	#[test]
	fn parse_failures_keep_the_provider_payload() {
		let body = br#"{"message":"Unauthenticated."}"#.to_vec();
		let parse_error = serde_path_to_error::deserialize::<_, BasicErrorResponse>(
			&mut serde_json::Deserializer::from_slice(&body),
		)
		.expect_err("Factus error bodies are not OAuth error responses.");
		let err = map_request_error::<ReqwestError, ReqwestTransportErrorMapper>(
			&DefaultProviderStrategy,
			Some(ResponseMetadata { status: Some(401) }),
			RequestTokenError::Parse(parse_error, body),
			&ReqwestTransportErrorMapper,
		);

		match err {
			Error::Authentication { message, status, payload, .. } => {
				assert_eq!(message, "Unauthenticated.");
				assert_eq!(status, Some(401));
				assert_eq!(payload.as_deref(), Some(r#"{"message":"Unauthenticated."}"#));
			},
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}
}
