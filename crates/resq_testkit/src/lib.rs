//! # resq testkit
//!
//! Test utilities for resq.
//!
//! This crate provides:
//! - An in-memory [`MemoryProvider`] implementing the resource
//!   provider contract, with configurable condition handling
//! - Shared resource fixtures ([`Person`], [`Document`])
//! - Property-based test generators using proptest

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod memory;

pub use fixtures::{people, Document, Person};
pub use memory::{row_value, MemoryProvider};
