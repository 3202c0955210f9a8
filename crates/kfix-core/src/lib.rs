//! Core data types for kfix.
//!
//! Everything here is plain data plus parsing: the `.properties` format the
//! build tool reads, harness configuration (`kfix.toml`), the well-known
//! layout of a Kotlin-DSL project, the script model returned by a model query,
//! and the result of one build invocation.

pub mod config;
pub mod layout;
pub mod model;
pub mod outcome;
pub mod properties;
