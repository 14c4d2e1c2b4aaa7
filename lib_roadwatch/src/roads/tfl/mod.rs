//! # TfL Road API Integration Module
//!
//! - **`apicall`**: the authenticated, retrying GET against the road
//!   disruption listing, with the HTTP 429 cooldown handled separately from the
//!   exponential backoff used for every other failure.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// Retrying client for the disruption listing endpoint.
pub mod apicall;

pub use apicall::{DisruptionFetcher, FetchError};
