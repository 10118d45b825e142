//! # slc-base
//!
//! Pure structural atoms for the `slc` workspace.
//!
//! This crate provides the foundational types used by both cores:
//!
//! - [`Span`] — source location tracking
//! - [`SpannedError`]/[`Result`] — errors with source positions
//! - [`uleb128`] — the variable-length integer codec the export trie's
//!   binary format is built on
//!
//! # Design Principles
//!
//! This crate has **no knowledge of grammar or graph structure**. It
//! provides only generic, reusable infrastructure that higher-level crates
//! build upon.

pub mod error;
pub mod span;
pub mod uleb128;

pub use error::{Result, SpannedError};
pub use span::Span;
