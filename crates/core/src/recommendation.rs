//! Request schema for the recommendation endpoints.
//!
//! Each endpoint's raw query values are validated into one variant of
//! [`RecommendationRequest`], which then becomes the [`JobDescriptor`] for
//! the matching worker script. Nothing here starts a process, so a rejected
//! request never reaches the bridge.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::scripting::executor::JobDescriptor;

/// Worker serving similar-movie and keyword-search requests.
pub const MOVIE_RECOMMENDER: &str = "movie_recommender";

/// Worker serving preference-based requests.
pub const PREFERENCE_RECOMMENDER: &str = "preference_recommender";

/// Result count used when `num_rec` is absent or not a number.
pub const DEFAULT_NUM_RECOMMENDATIONS: u32 = 10;

/// Upper bound on the result count; larger values are clamped.
pub const MAX_NUM_RECOMMENDATIONS: u32 = 100;

/// Parse a `num_rec` query value.
///
/// Absent, blank and non-numeric values fall back to
/// [`DEFAULT_NUM_RECOMMENDATIONS`]. Zero and negative values are rejected.
/// Values above [`MAX_NUM_RECOMMENDATIONS`] are clamped.
pub fn parse_count(raw: Option<&str>) -> Result<u32, CoreError> {
    let Some(text) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(DEFAULT_NUM_RECOMMENDATIONS);
    };

    match text.parse::<i64>() {
        Ok(n) if n <= 0 => Err(CoreError::Validation(format!(
            "num_rec must be a positive integer, got {n}"
        ))),
        Ok(n) => Ok(n.min(i64::from(MAX_NUM_RECOMMENDATIONS)) as u32),
        Err(_) => match overflow_sign(text) {
            Some(Sign::Negative) => Err(CoreError::Validation(format!(
                "num_rec must be a positive integer, got {text}"
            ))),
            Some(Sign::Positive) => Ok(MAX_NUM_RECOMMENDATIONS),
            None => Ok(DEFAULT_NUM_RECOMMENDATIONS),
        },
    }
}

enum Sign {
    Positive,
    Negative,
}

/// Sign of an integer literal too large for `i64`; `None` when `text` is
/// not an integer literal at all.
fn overflow_sign(text: &str) -> Option<Sign> {
    let (sign, digits) = match text.as_bytes().first() {
        Some(b'-') => (Sign::Negative, &text[1..]),
        Some(b'+') => (Sign::Positive, &text[1..]),
        _ => (Sign::Positive, text),
    };
    (!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())).then_some(sign)
}

fn non_blank(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_year(field: &str, raw: Option<&str>) -> Result<Option<i32>, CoreError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(text) => text.parse::<i32>().map(Some).map_err(|_| {
            CoreError::Validation(format!("{field} must be an integer year, got '{text}'"))
        }),
    }
}

/// Payload for "movies similar to this one".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimilarMoviesRequest {
    pub movie_id: String,
    pub num_recommendations: u32,
}

/// Payload for free-text keyword search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordSearchRequest {
    pub search_keywords: String,
    pub num_recommendations: u32,
}

/// Payload for preference-based recommendations.
///
/// Text filters are the raw comma-separated lists the worker splits itself.
/// Absent filters are left out of the payload entirely.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PreferenceRequest {
    pub num_recommendations: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genres: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cast: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directors: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub writers: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub languages: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub countries: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_year: Option<i32>,
}

impl PreferenceRequest {
    fn has_criteria(&self) -> bool {
        [
            &self.genres,
            &self.cast,
            &self.directors,
            &self.writers,
            &self.languages,
            &self.countries,
        ]
        .iter()
        .any(|f| f.is_some())
            || self.min_year.is_some()
            || self.max_year.is_some()
    }
}

/// Raw query values of the preference endpoint (`?genres=&cast=...`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreferenceParams {
    pub num_rec: Option<String>,
    pub genres: Option<String>,
    pub cast: Option<String>,
    pub directors: Option<String>,
    pub writers: Option<String>,
    pub languages: Option<String>,
    pub countries: Option<String>,
    pub min_year: Option<String>,
    pub max_year: Option<String>,
}

/// A validated recommendation request.
///
/// Serializes to the bare payload object of its variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RecommendationRequest {
    Similar(SimilarMoviesRequest),
    Keywords(KeywordSearchRequest),
    Preference(PreferenceRequest),
}

impl RecommendationRequest {
    /// Movies similar to `movie_id`.
    pub fn similar(movie_id: &str, num_rec: Option<&str>) -> Result<Self, CoreError> {
        let movie_id = non_blank(Some(movie_id))
            .ok_or_else(|| CoreError::Validation("A movie id is required".to_string()))?;
        Ok(Self::Similar(SimilarMoviesRequest {
            movie_id,
            num_recommendations: parse_count(num_rec)?,
        }))
    }

    /// Movies matching free-text `keywords`.
    pub fn keywords(keywords: Option<&str>, num_rec: Option<&str>) -> Result<Self, CoreError> {
        let search_keywords = non_blank(keywords)
            .ok_or_else(|| CoreError::Validation("Search keywords are required".to_string()))?;
        Ok(Self::Keywords(KeywordSearchRequest {
            search_keywords,
            num_recommendations: parse_count(num_rec)?,
        }))
    }

    /// Movies matching viewer preferences. At least one filter or year bound
    /// must be supplied.
    pub fn preference(params: &PreferenceParams) -> Result<Self, CoreError> {
        let request = PreferenceRequest {
            num_recommendations: parse_count(params.num_rec.as_deref())?,
            genres: non_blank(params.genres.as_deref()),
            cast: non_blank(params.cast.as_deref()),
            directors: non_blank(params.directors.as_deref()),
            writers: non_blank(params.writers.as_deref()),
            languages: non_blank(params.languages.as_deref()),
            countries: non_blank(params.countries.as_deref()),
            min_year: parse_year("min_year", params.min_year.as_deref())?,
            max_year: parse_year("max_year", params.max_year.as_deref())?,
        };

        if !request.has_criteria() {
            return Err(CoreError::Validation(
                "At least one preference criterion is required".to_string(),
            ));
        }
        if let (Some(min), Some(max)) = (request.min_year, request.max_year) {
            if min > max {
                return Err(CoreError::Validation(format!(
                    "min_year ({min}) must not be greater than max_year ({max})"
                )));
            }
        }
        Ok(Self::Preference(request))
    }

    pub fn script_name(&self) -> &'static str {
        match self {
            Self::Similar(_) | Self::Keywords(_) => MOVIE_RECOMMENDER,
            Self::Preference(_) => PREFERENCE_RECOMMENDER,
        }
    }

    pub fn num_recommendations(&self) -> u32 {
        match self {
            Self::Similar(r) => r.num_recommendations,
            Self::Keywords(r) => r.num_recommendations,
            Self::Preference(r) => r.num_recommendations,
        }
    }

    /// Build the job descriptor for the worker serving this request.
    pub fn into_descriptor(self) -> Result<JobDescriptor, CoreError> {
        JobDescriptor::from_serializable(self.script_name(), &self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
