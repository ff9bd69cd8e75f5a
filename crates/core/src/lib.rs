//! Domain logic for the movie recommendation service.
//!
//! Holds the request schema for the recommendation endpoints and the
//! script bridge that runs the external recommender workers. Nothing in
//! this crate knows about HTTP, so the API crate and the tests can share it.

pub mod error;
pub mod recommendation;
pub mod scripting;
