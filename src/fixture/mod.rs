//! Local fixture data source

mod source;

pub use source::{FixtureSource, DEFAULT_PAGE_SIZE};
