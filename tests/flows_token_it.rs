#![cfg(feature = "reqwest")]

// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use factus_broker::{
	_preludet::*,
	auth::{AccessToken, SessionId},
	cache::{CookieCache, CookiePolicy, MemoryCache, TokenCache},
	flows::TokenRequest,
};

const TOKEN_PATH: &str = "/oauth/token";

fn session(id: &str) -> SessionId {
	SessionId::new(id).expect("Session identifier fixture should be valid.")
}

fn token_expiring_in(value: &str, refresh: Option<&str>, remaining: Duration) -> AccessToken {
	let mut builder = AccessToken::builder()
		.value(value)
		.issued_at(OffsetDateTime::now_utc() - Duration::minutes(50))
		.expires_at(OffsetDateTime::now_utc() + remaining);

	if let Some(refresh) = refresh {
		builder = builder.refresh_token(refresh);
	}

	builder.build().expect("Token fixture should build.")
}

async fn seed(cache: &MemoryCache, session: &SessionId, token: AccessToken) {
	cache.save(session, token).await.expect("Seeding the memory cache should succeed.");
}

#[tokio::test]
async fn fresh_cached_token_is_reused_without_network_calls() {
	let server = MockServer::start_async().await;
	let (broker, cache) =
		build_reqwest_test_broker(test_descriptor(&server.base_url()), test_reqwest_http_client());
	let session = session("session-fresh");
	let cached = token_expiring_in("cached-access", None, Duration::seconds(61));

	seed(&cache, &session, cached.clone()).await;

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(500);
		})
		.await;
	let token = broker
		.ensure_token(cache.as_ref(), TokenRequest::new(session))
		.await
		.expect("Fresh token should be returned from the cache.");

	assert_eq!(token, cached);
	assert_eq!(broker.renewal_metrics.reuses(), 1);
	assert_eq!(broker.renewal_metrics.renewals(), 0);

	mock.assert_calls_async(0).await;
}

#[tokio::test]
async fn token_inside_renewal_margin_triggers_one_password_exchange() -> Result<()> {
	let server = MockServer::start_async().await;
	let (broker, cache) =
		build_reqwest_test_broker(test_descriptor(&server.base_url()), test_reqwest_http_client());
	let session = session("session-margin");

	seed(&cache, &session, token_expiring_in("stale-access", None, Duration::seconds(60))).await;

	let mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.form_urlencoded_tuple("grant_type", "password")
				.form_urlencoded_tuple("username", TEST_USERNAME)
				.form_urlencoded_tuple("password", TEST_PASSWORD)
				.form_urlencoded_tuple("client_id", TEST_CLIENT_ID)
				.form_urlencoded_tuple("client_secret", TEST_CLIENT_SECRET);
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"renewed-access","token_type":"Bearer","expires_in":3600}"#);
		})
		.await;
	let before = OffsetDateTime::now_utc();
	let token = broker.ensure_token(cache.as_ref(), TokenRequest::new(session.clone())).await?;
	let after = OffsetDateTime::now_utc();

	mock.assert_calls_async(1).await;

	assert_eq!(token.value.expose(), "renewed-access");
	assert!(token.expires_at >= before + Duration::seconds(3600));
	assert!(token.expires_at <= after + Duration::seconds(3600));

	let stored = cache.fetch(&session).await?.expect("Renewed token should be cached.");

	assert_eq!(stored, token);
	assert_eq!(broker.renewal_metrics.renewals(), 1);

	Ok(())
}

#[tokio::test]
async fn absent_cookie_cache_receives_the_new_token() -> Result<()> {
	let server = MockServer::start_async().await;
	let (broker, _) =
		build_reqwest_test_broker(test_descriptor(&server.base_url()), test_reqwest_http_client());
	let cookies = CookieCache::empty(CookiePolicy::default());
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"abc","expires_in":3600}"#);
		})
		.await;
	let now_millis = OffsetDateTime::now_utc().unix_timestamp() * 1_000;

	broker.ensure_token(&cookies, TokenRequest::new(session("cookie-session"))).await?;

	mock.assert_calls_async(1).await;

	let rendered = cookies
		.set_cookie_headers()
		.iter()
		.map(|value| value.to_str().expect("Cookies should be ASCII.").to_owned())
		.collect::<Vec<_>>();

	assert_eq!(rendered.len(), 2);
	assert!(rendered[0].starts_with("factusToken=abc;"));

	let expiration = rendered[1]
		.strip_prefix("factusExpiration=")
		.and_then(|rest| rest.split(';').next())
		.and_then(|millis| millis.parse::<i64>().ok())
		.expect("Expiration cookie should carry epoch milliseconds.");

	assert!((expiration - (now_millis + 3_600_000)).abs() < 5_000);
	assert!(rendered.iter().all(|cookie| cookie.contains("Max-Age=3599") || cookie.contains("Max-Age=3600")));

	Ok(())
}

#[tokio::test]
async fn malformed_cookies_force_a_new_exchange() {
	let server = MockServer::start_async().await;
	let (broker, _) =
		build_reqwest_test_broker(test_descriptor(&server.base_url()), test_reqwest_http_client());
	let cookies = CookieCache::from_cookie_header(
		"factusToken=old; factusExpiration=not-a-number",
		CookiePolicy::default(),
	);
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"from-scratch","expires_in":600}"#);
		})
		.await;
	let token = broker
		.ensure_token(&cookies, TokenRequest::new(session("cookie-malformed")))
		.await
		.expect("Exchange should succeed.");

	mock.assert_calls_async(1).await;

	assert_eq!(token.value.expose(), "from-scratch");
	assert_eq!(cookies.current().map(|token| token.value.expose().to_owned()), Some("from-scratch".into()));
}

#[tokio::test]
async fn rejected_credentials_surface_as_authentication_errors() {
	let server = MockServer::start_async().await;
	let (broker, cache) =
		build_reqwest_test_broker(test_descriptor(&server.base_url()), test_reqwest_http_client());
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(401)
				.header("content-type", "application/json")
				.body(r#"{"error":"invalid_client","error_description":"Client authentication failed"}"#);
		})
		.await;
	let err = broker
		.ensure_token(cache.as_ref(), TokenRequest::new(session("session-401")))
		.await
		.expect_err("A 401 from the token endpoint must fail.");

	mock.assert_calls_async(1).await;

	match err {
		Error::Authentication { message, status, payload, .. } => {
			assert!(message.contains("Client authentication failed"));
			assert_eq!(status, Some(401));
			assert!(payload.expect("Provider payload should be kept.").contains("invalid_client"));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}

	assert!(cache.is_empty());
	assert_eq!(broker.renewal_metrics.failures(), 1);
}

#[tokio::test]
async fn non_oauth_error_bodies_keep_the_provider_message() {
	let server = MockServer::start_async().await;
	let (broker, cache) =
		build_reqwest_test_broker(test_descriptor(&server.base_url()), test_reqwest_http_client());

	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(500)
				.header("content-type", "application/json")
				.body(r#"{"message":"Servicio no disponible"}"#);
		})
		.await;

	let err = broker
		.ensure_token(cache.as_ref(), TokenRequest::new(session("session-500")))
		.await
		.expect_err("A 500 from the token endpoint must fail.");

	match err {
		Error::Authentication { message, status, payload, .. } => {
			assert_eq!(message, "Servicio no disponible");
			assert_eq!(status, Some(500));
			assert_eq!(payload.as_deref(), Some(r#"{"message":"Servicio no disponible"}"#));
		},
		other => panic!("Unexpected error variant: {other:?}."),
	}
}

#[tokio::test]
async fn missing_expires_in_is_a_malformed_response() {
	let server = MockServer::start_async().await;
	let (broker, cache) =
		build_reqwest_test_broker(test_descriptor(&server.base_url()), test_reqwest_http_client());

	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"no-expiry","token_type":"Bearer"}"#);
		})
		.await;

	let err = broker
		.ensure_token(cache.as_ref(), TokenRequest::new(session("session-no-expiry")))
		.await
		.expect_err("Tokens without expires_in cannot be cached.");

	assert!(matches!(err, Error::Authentication { .. }));
	assert!(cache.is_empty());
}

#[tokio::test]
async fn out_of_range_expires_in_is_rejected_without_panicking() -> Result<()> {
	let server = MockServer::start_async().await;
	let (broker, cache) =
		build_reqwest_test_broker(test_descriptor(&server.base_url()), test_reqwest_http_client());

	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"abc","token_type":"Bearer","expires_in":900000000000000}"#);
		})
		.await;

	let session = session("session-huge-expiry");
	let err = broker
		.ensure_token(cache.as_ref(), TokenRequest::new(session.clone()))
		.await
		.expect_err("An expiry past the representable range cannot be cached.");

	assert!(matches!(err, Error::Authentication { ref message, .. } if message.contains("expires_in")));
	assert!(cache.fetch(&session).await?.is_none());
	assert_eq!(broker.renewal_metrics.failures(), 1);

	Ok(())
}

#[tokio::test]
async fn refresh_grant_is_used_and_keeps_the_previous_refresh_token() {
	let server = MockServer::start_async().await;
	let (broker, cache) =
		build_reqwest_test_broker(test_descriptor(&server.base_url()), test_reqwest_http_client());
	let session = session("session-refresh");

	seed(&cache, &session, token_expiring_in("old-access", Some("refresh-1"), Duration::seconds(10)))
		.await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST)
				.path(TOKEN_PATH)
				.form_urlencoded_tuple("grant_type", "refresh_token")
				.form_urlencoded_tuple("refresh_token", "refresh-1");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"refreshed-access","expires_in":3600}"#);
		})
		.await;
	let token = broker
		.ensure_token(cache.as_ref(), TokenRequest::new(session))
		.await
		.expect("Refresh exchange should succeed.");

	refresh.assert_calls_async(1).await;

	assert_eq!(token.value.expose(), "refreshed-access");
	assert_eq!(token.refresh_token.as_ref().map(|secret| secret.expose()), Some("refresh-1"));
}

#[tokio::test]
async fn rejected_refresh_token_falls_back_to_password_grant() {
	let server = MockServer::start_async().await;
	let (broker, cache) =
		build_reqwest_test_broker(test_descriptor(&server.base_url()), test_reqwest_http_client());
	let session = session("session-refresh-expired");

	seed(&cache, &session, token_expiring_in("old-access", Some("expired"), Duration::ZERO)).await;

	let refresh = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH).form_urlencoded_tuple("grant_type", "refresh_token");
			then.status(401)
				.header("content-type", "application/json")
				.body(r#"{"error":"invalid_request","error_description":"The refresh token is invalid."}"#);
		})
		.await;
	let password = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH).form_urlencoded_tuple("grant_type", "password");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"password-access","refresh_token":"refresh-2","expires_in":3600}"#);
		})
		.await;
	let token = broker
		.ensure_token(cache.as_ref(), TokenRequest::new(session))
		.await
		.expect("Password fallback should succeed.");

	refresh.assert_calls_async(1).await;
	password.assert_calls_async(1).await;

	assert_eq!(token.value.expose(), "password-access");
	assert_eq!(token.refresh_token.as_ref().map(|secret| secret.expose()), Some("refresh-2"));
}

#[tokio::test]
async fn concurrent_callers_share_one_renewal() {
	let server = MockServer::start_async().await;
	let (broker, cache) =
		build_reqwest_test_broker(test_descriptor(&server.base_url()), test_reqwest_http_client());
	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.delay(std::time::Duration::from_millis(100))
				.body(r#"{"access_token":"singleflight","expires_in":3600}"#);
		})
		.await;
	let request = TokenRequest::new(session("session-singleflight"));
	let (first, second) = tokio::join!(
		broker.ensure_token(cache.as_ref(), request.clone()),
		broker.ensure_token(cache.as_ref(), request),
	);
	let first = first.expect("First caller should succeed.");
	let second = second.expect("Second caller should succeed.");

	assert_eq!(first.value.expose(), "singleflight");
	assert_eq!(second, first);
	assert_eq!(broker.renewal_metrics.renewals(), 1);
	assert_eq!(broker.renewal_metrics.reuses(), 1);

	mock.assert_calls_async(1).await;
}

#[tokio::test]
async fn forced_requests_renew_fresh_tokens() {
	let server = MockServer::start_async().await;
	let (broker, cache) =
		build_reqwest_test_broker(test_descriptor(&server.base_url()), test_reqwest_http_client());
	let session = session("session-forced");

	seed(&cache, &session, token_expiring_in("fresh", None, Duration::hours(1))).await;

	let mock = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"access_token":"forced","expires_in":3600}"#);
		})
		.await;
	let token = broker
		.ensure_token(cache.as_ref(), TokenRequest::new(session).force_renewal())
		.await
		.expect("Forced renewal should succeed.");

	mock.assert_calls_async(1).await;

	assert_eq!(token.value.expose(), "forced");
}

#[tokio::test]
async fn invalidate_token_clears_the_session() {
	let server = MockServer::start_async().await;
	let (broker, cache) =
		build_reqwest_test_broker(test_descriptor(&server.base_url()), test_reqwest_http_client());
	let session = session("session-logout");

	seed(&cache, &session, token_expiring_in("to-drop", None, Duration::hours(1))).await;

	assert!(broker.invalidate_token(cache.as_ref(), &session).await.expect("Clear should succeed."));
	assert!(!broker.invalidate_token(cache.as_ref(), &session).await.expect("Clear should succeed."));
	assert!(cache.is_empty());
}
