//! Network client for the offline caching engine.
//!
//! Provides the `Fetcher` seam the strategy executors fetch through, its
//! reqwest implementation, and request-URL normalization.

pub mod fetch;

pub use fetch::{FetchConfig, FetchedResponse, Fetcher, HttpFetcher, UrlError, normalize};
