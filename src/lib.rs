//! cmdform: the command-invocation form model of a plugin orchestration console.
//!
//! Backend-described command signatures become a typed schema, an editable
//! model, a validator and, on submit, request or job payloads.

include!(concat!(env!("OUT_DIR"), "/translations.rs"));

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Shared flag telling in-flight work whether the form session that started it is still alive.
pub type LivenessToken = Arc<AtomicBool>;

pub mod cli;
pub mod constants;
pub mod core;
pub mod models;
pub mod system;
