// src/core/commons.rs

use crate::LivenessToken;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// A fresh, live token.
pub fn new_liveness_token() -> LivenessToken {
    Arc::new(AtomicBool::new(true))
}

/// Marks every holder of `token` as stale.
pub fn revoke(token: &LivenessToken) {
    token.store(false, Ordering::SeqCst);
}

pub fn is_alive(token: &LivenessToken) -> bool {
    token.load(Ordering::SeqCst)
}

/// True when `held` is the same, still live token as `current`.
pub fn same_live_token(held: &LivenessToken, current: &LivenessToken) -> bool {
    Arc::ptr_eq(held, current) && is_alive(held)
}
