// Search gateway core
// Query construction for a ranked full-text backend plus popular/recent query statistics

// Include the configuration and error modules
mod config;
mod error;
pub use config::*;
pub use error::*;

// Include the search module (query builder, backend, suggestions)
mod search;
pub use search::*;

// Include the statistics module (recency ring, frequency table, facade)
mod stats;
pub use stats::*;

// Include the search-log pipeline
mod pipeline;
pub use pipeline::*;

// Include the API-facing gateway
mod gateway;
pub use gateway::*;
