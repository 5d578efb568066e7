//! Research
//!
//! Web search backends, article fetching, and the gatherer that combines
//! them for one analysis run.

pub mod gatherer;
pub mod url_validation;
pub mod web_fetch;
pub mod web_search;

pub use gatherer::{build_search_query, ResearchGatherer, RESEARCH_JOB};
pub use web_fetch::{ArticleFetcher, WebFetchService};
pub use web_search::{SearchProvider, SearchResult, WebSearchService};
