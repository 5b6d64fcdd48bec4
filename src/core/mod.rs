// src/core/mod.rs

pub mod catalog;
pub mod coerce;
pub mod commons;
pub mod config_loader;
pub mod descriptor;
pub mod field_path;
pub mod model_builder;
pub mod paths;
pub mod replay;
pub mod schema_builder;
pub mod session;
pub mod submission;
pub mod validator;
