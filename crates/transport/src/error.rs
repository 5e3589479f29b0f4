//! Fehlertypen fuer das Transport-Crate

use thiserror::Error;

/// Transport-Fehlertypen
#[derive(Debug, Error)]
pub enum TransportError {
    /// Kein Transportweg konnte die Nachricht annehmen. Der Grund nennt
    /// den letzten Fehlschlag; die Nachricht darf aus Nutzersicht nicht
    /// stillschweigend verschwinden.
    #[error("Nachricht unzustellbar: {grund}")]
    Unzustellbar { grund: String },

    #[error("Peer-Versand fehlgeschlagen: {0}")]
    Peer(String),

    #[error("Relay-Fehler: {0}")]
    Relay(String),
}

pub type TransportResult<T> = Result<T, TransportError>;
