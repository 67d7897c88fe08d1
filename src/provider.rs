//! Provider-facing descriptors (data) and strategies (behavior).
//!
//! `descriptor` exposes the validated endpoint set (`ProviderDescriptor`): the OAuth token
//! endpoint plus the invoice endpoints, all HTTPS except loopback test servers, together
//! with the grants the broker may use. `strategy` defines [`ProviderStrategy`], the hook
//! that classifies failed business calls and extracts the provider's message from error
//! bodies.

pub mod descriptor;
pub mod strategy;

pub use descriptor::*;
pub use strategy::*;
