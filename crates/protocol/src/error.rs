//! Fehlertypen fuer das Protokoll-Crate

use thiserror::Error;

/// Protokoll-Fehlertypen
#[derive(Debug, Error)]
pub enum ProtokollError {
    #[error("Ungueltiges JSON-Dokument: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base64-Dekodierung fehlgeschlagen: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Ungueltige Nachricht: {0}")]
    UngueltigeNachricht(String),
}

pub type ProtokollResult<T> = Result<T, ProtokollError>;
