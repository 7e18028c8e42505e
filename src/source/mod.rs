//! Content source collaborator and its implementations.
//!
//! - [`traits::ContentSource`]: the seam every upstream call goes through.
//! - [`wiki::WikiClient`]: MediaWiki action API over HTTP.
//! - [`retry::RetryingContentSource`]: decorator retrying transient
//!   failures with exponential backoff.

pub mod retry;
pub mod traits;
pub mod wiki;

pub use retry::{RetryConfig, RetryingContentSource};
pub use traits::ContentSource;
pub use wiki::{WikiClient, WikiConfig};
