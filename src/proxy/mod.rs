//! Entity retrieval proxies
//!
//! A [`ListProxy`] walks a paginated listing page by page; an
//! [`EntityGetter`] fetches a single entity. Both are parameterized by
//! the entity model and by the params type of their data source, and
//! both normalize raw payloads through [`Model::from_json`](crate::record::Model::from_json).

mod getter;
mod list;
mod options;
mod source;

pub use getter::{BasicEntityGetter, EntityGetter};
pub use list::{ListProxy, ListResponse};
pub use options::ProxyOptions;
pub use source::{ContinuationToken, FnGetSource, FnListSource, GetSource, ListSource, RawPage};
