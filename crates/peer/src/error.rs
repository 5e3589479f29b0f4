//! Fehlertypen fuer das Peer-Crate

use thiserror::Error;

use snakkaz_core::UserId;

use crate::channel::DataChannelZustand;

/// Peer-Fehlertypen
#[derive(Debug, Error)]
pub enum PeerError {
    #[error("Verbindungsaufbau zu {peer_id} nach {versuche} Versuchen fehlgeschlagen")]
    VerbindungFehlgeschlagen { peer_id: UserId, versuche: u32 },

    #[error("Keine Session fuer Peer {0}")]
    KeineSession(UserId),

    #[error("Datenkanal nicht offen (Zustand: {0})")]
    KanalNichtOffen(DataChannelZustand),

    #[error("Sendepuffer des Datenkanals voll")]
    PufferVoll,

    #[error("Signal-Versand fehlgeschlagen: {0}")]
    Signal(String),

    #[error("Ungueltige Nachricht: {0}")]
    UngueltigeNachricht(String),
}

pub type PeerResult<T> = Result<T, PeerError>;
