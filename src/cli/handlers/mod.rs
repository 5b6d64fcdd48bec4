// src/cli/handlers/mod.rs

// One module per CLI action.

pub mod commons;

pub mod commands;
pub mod fill;
pub mod job;
pub mod model;
pub mod replay;
pub mod schema;
pub mod submit;
pub mod validate;
