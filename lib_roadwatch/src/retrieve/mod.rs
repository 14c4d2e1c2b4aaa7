//! # Data Retrieval Module
//!
//! Generic HTTP plumbing used by the disruption fetcher.
//!
//! ## Purpose:
//! Keep request building, timeouts and error classification in one place so
//! that API-specific clients only deal with retry policy and decoding.
//!
//! ## Contained Modules:
//!
//! - **`ky_http`**: the [`HttpTransport`](ky_http::HttpTransport) seam and its
//!   `reqwest`-backed implementation, [`ApiClient`](ky_http::ApiClient). Retry
//!   is deliberately *not* done here; callers own their retry policy.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms, unused_qualifications)]

/// HTTP transport trait and the `reqwest` client behind it.
pub mod ky_http;

pub use ky_http::{ApiClient, ApiResponse, HttpTransport, TransportError};
