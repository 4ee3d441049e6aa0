//! Telemetry helpers for applications embedding `plotframe`.
//!
//! Tracing setup stays explicit and opt-in: consumers either call
//! `init_default_tracing` or wire their own `tracing` subscriber and filters.
//!
//! Soft warnings (for example a render registration that arrives while a flush
//! is in progress) go through one process-wide toggle so embedding
//! applications can silence library chatter without touching their filters.

use std::sync::atomic::{AtomicBool, Ordering};

static WARNINGS_ENABLED: AtomicBool = AtomicBool::new(true);

/// Enables or disables soft library warnings.
pub fn set_warnings_enabled(enabled: bool) {
    WARNINGS_ENABLED.store(enabled, Ordering::Relaxed);
}

/// Returns whether soft library warnings are currently emitted.
#[must_use]
pub fn warnings_enabled() -> bool {
    WARNINGS_ENABLED.load(Ordering::Relaxed)
}

/// Emits a soft warning unless warnings were silenced.
pub(crate) fn soft_warn(message: &str) {
    if warnings_enabled() {
        tracing::warn!("{message}");
    }
}

/// Initializes a default `tracing` subscriber when the `telemetry` feature is enabled.
///
/// Returns `true` when initialization succeeds.
/// Returns `false` when no initialization is performed (feature disabled) or if a
/// global subscriber was already set by the host application.
#[must_use]
pub fn init_default_tracing() -> bool {
    #[cfg(feature = "telemetry")]
    {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_target(false)
            .compact();

        return builder.try_init().is_ok();
    }

    #[cfg(not(feature = "telemetry"))]
    {
        false
    }
}
