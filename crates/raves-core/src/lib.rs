//! raves-core library.
//!
//! The reconciliation engine behind the raves review browser: an owned,
//! deduplicated review list accumulated across paginated fetches, guarded
//! against out-of-order asynchronous responses by monotonic epochs, and
//! grouped into display buckets ("Today", "Yesterday", "Mar 2024", …).
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums inside the engine; `anyhow::Result`
//!   with context on the config boundary.
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`, `trace!`).

pub mod bucket;
pub mod config;
pub mod error;
pub mod feed;
pub mod filter;
pub mod model;
pub mod request;
pub mod session;

pub use bucket::{DateBucket, ReviewGroup, classify, group_by_date};
pub use error::{FetchError, RequestError};
pub use feed::{FetchOutcome, MergeEffect, ReviewFeed};
pub use filter::{Filter, SortOrder, format_rating_filter, parse_rating_filter};
pub use model::{Review, ReviewPage, Stars};
pub use request::{PageRequest, RequestBuilder};
pub use session::{FeedHealth, FeedSession, FeedView, ReviewSource};
