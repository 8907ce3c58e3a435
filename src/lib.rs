//! Compiles untrusted `filter` / `filter_any` request parameters into predicate trees.
//!
//! A request is normalized into a [`FilterSpec`], compiled against an entity's
//! [`AllowList`] into a [`FilterTree`], and then either replayed into a
//! [`QueryBuilder`] or evaluated directly against YAML/JSON records.
//! Keys, operators and operands that are not allowed or not understood are
//! dropped silently; compilation itself never fails.

pub mod config;
pub mod error;
pub mod filter;
pub mod records;
pub mod request;

pub use config::EntityConfig;
pub use error::{Error, Result};
pub use filter::{AllowList, Compiler, FilterTree, Predicate, QueryBuilder};
pub use request::{FilterKeys, FilterSpec, FilterValue};
