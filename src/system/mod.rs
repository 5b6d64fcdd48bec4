//! # System Interaction Layer
//!
//! Concrete collaborators of the form model that touch the machine it runs on.
//!
//! ## Modules
//!
//! - **`outbox`**: a [`Transport`](crate::core::submission::Transport) that writes every
//!   payload as a uuid-named JSON file, for offline use and for piping into other tools.
//! - **`permissions`**: a permission oracle driven by the `allowed_actions` config key.

pub mod outbox;
pub mod permissions;
