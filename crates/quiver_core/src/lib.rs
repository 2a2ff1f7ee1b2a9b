//! Columnar in-memory arrays with dictionary encoding.
//!
//! A dictionary array stores a column of repeated values as a small ordered
//! table of unique values, a sequence of integer indices referencing that
//! table, and a validity bitmap marking null rows. This crate provides the
//! deduplicating builders that produce such arrays, the typed read views
//! over them, and the type-directed dispatch that recovers a typed view
//! from an untyped descriptor.
//!
//! Memory for finalized buffers comes from a pluggable [`BufferManager`];
//! callers that don't care use the shared default.
//!
//! [`BufferManager`]: buffer::buffer_manager::BufferManager

pub mod arrays;
pub mod buffer;
