//! schemachat - Natural-language database schema editor
//!
//! Describe tables in plain language or with short edit commands and get an
//! entity-relationship diagram back. The core keeps the schema as a graph,
//! merges schemas proposed by an AI assistant and lays new tables out on a
//! circle; the `ssr` feature adds the HTTP API in front of it.

#[cfg(feature = "ssr")]
pub mod app;
pub mod core;
