//! `servicegate-core`: shared identifiers and error model.
//!
//! This crate contains no IO and no policy; it only names things.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{OrganizationId, ServiceCode, UserId};
