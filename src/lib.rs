//! Token broker and invoice gateway for the Factus electronic-invoicing API: cached OAuth
//! tokens renewed ahead of expiry, preview-then-confirm invoice submission, and one
//! transport seam shared by every provider call.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod flows;
pub mod http;
pub mod oauth;
pub mod obs;
pub mod provider;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::{ProviderId, ResourceOwner},
		cache::MemoryCache,
		flows::Broker,
		http::ReqwestHttpClient,
		oauth::ReqwestTransportErrorMapper,
		provider::{DefaultProviderStrategy, ProviderDescriptor, ProviderStrategy},
	};

	/// Broker type alias used by reqwest-backed integration tests.
	pub type ReqwestTestBroker = Broker<ReqwestHttpClient, ReqwestTransportErrorMapper>;

	/// Client identifier shared by the integration fixtures.
	pub const TEST_CLIENT_ID: &str = "client-factus";
	/// Client secret shared by the integration fixtures.
	pub const TEST_CLIENT_SECRET: &str = "secret-factus";
	/// Resource-owner username shared by the integration fixtures.
	pub const TEST_USERNAME: &str = "billing@example.com";
	/// Resource-owner password shared by the integration fixtures.
	pub const TEST_PASSWORD: &str = "hunter2";

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		test_reqwest_http_client_with_timeout(std::time::Duration::from_secs(5))
	}

	/// Same as [`test_reqwest_http_client`] with a caller-chosen request timeout.
	pub fn test_reqwest_http_client_with_timeout(
		timeout: std::time::Duration,
	) -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.redirect(reqwest::redirect::Policy::none())
			.timeout(timeout)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Builds a descriptor whose token and API endpoints live under `base_url`.
	pub fn test_descriptor(base_url: &str) -> ProviderDescriptor {
		let base = Url::parse(base_url).expect("Failed to parse mock provider base URL.");

		ProviderDescriptor::builder(
			ProviderId::new("mock-factus").expect("Failed to build mock provider identifier."),
		)
		.base_url(base)
		.build()
		.expect("Failed to build mock provider descriptor.")
	}

	/// Constructs a [`Broker`] with the default provider strategy and the reqwest transport
	/// used across integration tests, plus a fresh shared [`MemoryCache`].
	pub fn build_reqwest_test_broker(
		descriptor: ProviderDescriptor,
		http_client: ReqwestHttpClient,
	) -> (ReqwestTestBroker, Arc<MemoryCache>) {
		let strategy: Arc<dyn ProviderStrategy> = Arc::new(DefaultProviderStrategy);
		let mapper = Arc::new(ReqwestTransportErrorMapper);
		let broker = Broker::with_http_client(
			descriptor,
			strategy,
			TEST_CLIENT_ID,
			ResourceOwner::new(TEST_USERNAME, TEST_PASSWORD),
			http_client,
			mapper,
		)
		.with_client_secret(TEST_CLIENT_SECRET);

		(broker, Arc::new(MemoryCache::default()))
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
