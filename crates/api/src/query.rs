//! Query parameter types for the recommendation endpoints.
//!
//! Values are kept as raw strings; parsing and validation happen in
//! [`cinerec_core::recommendation`] so malformed numbers get the documented
//! fallbacks instead of an extractor rejection.

use serde::Deserialize;

pub use cinerec_core::recommendation::PreferenceParams;

/// `?num_rec=` on the similar-movies endpoint.
#[derive(Debug, Deserialize)]
pub struct CountParams {
    pub num_rec: Option<String>,
}

/// `?keywords=&num_rec=` on the search endpoint.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub keywords: Option<String>,
    pub num_rec: Option<String>,
}
