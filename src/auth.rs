//! Auth-domain identifiers, provider credentials, and access-token models.

pub mod id;
pub mod owner;
pub mod token;

pub use id::*;
pub use owner::*;
pub use token::{record::*, secret::*};
