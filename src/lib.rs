//! # batchproxy - Entity Retrieval for Batch Explorers
//!
//! batchproxy is the data access layer behind a Batch account explorer.
//! It turns raw JSON from the Batch, Storage and ARM APIs into immutable,
//! schema-normalized entities and walks paginated listings without the
//! caller ever touching a continuation token.
//!
//! ## Features
//!
//! - **Request Options**: `select`/`filter` split out of free-form attributes
//! - **List Proxy**: stateful page cursor over a `list`/`list_next` pair
//! - **Entity Getter**: single fetch with normalization, errors passed through
//! - **Records**: immutable values with declared fields, coercions and defaults
//! - **OData Filters**: build, parse and evaluate `$filter` clauses locally
//! - **Commands**: explicit registry with normalized keybinding dispatch
//!
//! ## Quick Start
//!
//! ```
//! use batchproxy::fixture::FixtureSource;
//! use batchproxy::models::Pool;
//! use batchproxy::proxy::{ListProxy, ListSource, ProxyOptions};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let items = vec![json!({"id": "a"}), json!({"id": "b"}), json!({"id": "c"})];
//! let source: Arc<dyn ListSource<()>> = Arc::new(FixtureSource::from_items(items, 2));
//!
//! let mut pools: ListProxy<Pool, ()> = ListProxy::new(source, (), ProxyOptions::default());
//! let first = pools.fetch_next().await.unwrap();
//! assert_eq!(first.len(), 2);
//! assert!(pools.has_more());
//!
//! let rest = pools.fetch_all().await.unwrap();
//! assert_eq!(rest[0].id(), Some("c"));
//! assert!(!pools.has_more());
//! # });
//! ```
//!
//! ## Filters
//!
//! ```
//! use batchproxy::filter::{Filter, FilterBuilder, FilterMatcher};
//! use serde_json::json;
//!
//! let filter = FilterBuilder::and(vec![
//!     FilterBuilder::prop("state").eq("active"),
//!     FilterBuilder::prop("priority").gt(2),
//! ]);
//! assert_eq!(filter.to_odata(), "state eq 'active' and priority gt 2");
//! assert_eq!(Filter::parse(&filter.to_odata()).unwrap(), filter);
//! assert!(FilterMatcher::new().test(&filter, &json!({"state": "active", "priority": 5})));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod command;
pub mod config;
pub mod error;
pub mod filter;
pub mod fixture;
pub mod models;
pub mod proxy;
pub mod record;

// Re-export commonly used types
pub use error::{ProxyError, Result, ServerError};
pub use proxy::{BasicEntityGetter, EntityGetter, ListProxy, ProxyOptions};
pub use record::{Model, Record};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    //! Convenient re-exports for common usage
    //!
    //! ```no_run
    //! use batchproxy::prelude::*;
    //! ```

    pub use crate::command::{Command, CommandRegistry, KeyBinding};
    pub use crate::error::{ProxyError, Result, ServerError};
    pub use crate::filter::{Filter, FilterBuilder, FilterMatcher};
    pub use crate::models::{Job, Pool, StorageAccount, Task};
    pub use crate::proxy::{
        BasicEntityGetter, ContinuationToken, EntityGetter, GetSource, ListProxy, ListResponse, ListSource,
        ProxyOptions, RawPage,
    };
    pub use crate::record::{FieldKind, FieldValue, Model, Record, Schema};
}
