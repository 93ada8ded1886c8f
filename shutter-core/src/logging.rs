//! Process-wide diagnostic switch
//!
//! Log statements about rejected captures and provider failures are only
//! emitted while diagnostics are enabled. The switch is read at the moment
//! each statement would fire, so toggling it never affects a capture's
//! control flow.

use std::sync::atomic::{AtomicBool, Ordering};

static DIAGNOSTICS: AtomicBool = AtomicBool::new(true);

/// Enable or disable diagnostic logging
pub fn set_enabled(enabled: bool) {
    DIAGNOSTICS.store(enabled, Ordering::Relaxed);
}

/// Whether diagnostic logging is currently enabled
pub fn enabled() -> bool {
    DIAGNOSTICS.load(Ordering::Relaxed)
}
