// nosqlunit - test lifecycle rules for NoSQL stores
//
// Store-agnostic pieces live in `nosqlunit-core`; each store binding is an
// optional crate re-exported behind a feature.

pub use nosqlunit_core::*;

#[cfg(feature = "elasticsearch")]
pub use nosqlunit_elasticsearch as elasticsearch;
