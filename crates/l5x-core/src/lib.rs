//! Core types for L5X controller projects.
//!
//! This crate holds the pieces every other L5X crate shares: the generic
//! element tree, the schema tables (container ordering, built-in types and
//! the instruction catalog), the data type model, logical values, and the
//! entity naming rules. It performs no parsing or I/O.

pub mod element;
pub mod naming;
pub mod schema;
pub mod types;
pub mod value;

pub use element::{Content, ElementNode};
pub use schema::SchemaTable;
pub use types::{BaseKind, Dimensions, Member, Radix, TypeDefinition};
pub use value::Value;
