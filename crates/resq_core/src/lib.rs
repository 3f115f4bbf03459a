//! # resq core
//!
//! Request evaluation pipeline for the resq resource abstraction
//! layer: arbitrary backing stores are exposed through a uniform CRUD
//! contract driven by untyped, string-based query input.
//!
//! This crate provides:
//! - Term resolution: dot-path member references bound statically or
//!   dynamically, cached per declaring type
//! - Condition parsing: operator-validated predicates from URI text
//! - The filter chain: distinct, search, order-by, offset and limit
//!   over lazily evaluated sequences
//! - The entity operation orchestrator, including the two-phase safe
//!   post upsert
//! - The provider contract a storage backend implements to plug in

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod condition;
pub mod error;
pub mod filter;
pub mod operations;
pub mod process;
pub mod provider;
pub mod request;
pub mod schema;
pub mod serialize;
pub mod term;

pub use condition::{parse_conditions, Condition, Operator};
pub use error::{Error, Result};
pub use filter::{
    Distinct, FilterContext, Limit, MetaConditions, Offset, OrderBy, Search, SequenceFilter,
    ValueStream,
};
pub use operations::{Change, Operations, Outcome};
pub use process::Processor;
pub use provider::ResourceProvider;
pub use request::{Method, Request};
pub use schema::{Member, Resource, TypeCache, ValueKind};
pub use serialize::{CanonicalSerializer, JsonCanonicalizer};
pub use term::{BindingRule, Property, Term, TermResolver};
