//! Core business logic abstractions

pub mod clock;
pub mod config;
pub mod error;
pub mod log;
pub mod pipeline;
pub mod price;
pub mod rates;
pub mod table;
pub mod transform;

// Re-export main types for cleaner imports
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::EtlError;
pub use pipeline::{LoadOutcome, Pipeline, PipelineRun, PipelineSettings};
pub use price::QuoteFetcher;
pub use rates::{RateEntry, RateTable};
pub use table::{AssetQuote, Cell, Table};
pub use transform::{ConvertedTable, TransformOutcome};
