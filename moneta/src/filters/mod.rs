//! Attribute-lookup filtering and ordering
//!
//! - [`FilterSchema`] / [`FilterSpec`]: validation of untrusted `field__lookup` input
//! - [`OrderSpec`]: `-field` / `+field` / `field` ordering terms
//! - [`FilterManager`]: binds validated input to an entity and applies it to a query

mod manager;
mod schema;

pub use manager::FilterManager;
pub use schema::{
    FilterEntry, FilterSchema, FilterSpec, Filterable, OrderSpec, OrderTerm, LOOKUP_SEPARATOR,
};
