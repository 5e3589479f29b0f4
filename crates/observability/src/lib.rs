//! snakkaz-observability – Structured Logging
//!
//! Stellt die tracing-subscriber-Initialisierung fuer alle
//! Snakkaz-Binaries bereit.

pub mod logging;

// Bequeme Re-Exporte
pub use logging::{
    log_format_aus_env, log_format_gueltig, log_level_aus_env, log_level_gueltig,
    logging_initialisieren,
};
