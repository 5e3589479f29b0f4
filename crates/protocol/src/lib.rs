//! snakkaz-protocol – Envelope- und Signaling-Formate
//!
//! Beide Transportwege (Server-Relay und Peer-Datenkanal) tragen dieselben
//! selbstbeschreibenden JSON-Dokumente:
//! - `envelope` - verschluesselte Nachrichten-Envelopes
//! - `signaling` - Offer/Answer/Candidate-Nachrichten fuer den
//!   Peer-Verbindungsaufbau (ueber das Relay vermittelt, es gibt keinen
//!   eigenstaendigen Signaling-Server)

pub mod envelope;
pub mod error;
pub mod signaling;

// Bequeme Re-Exporte
pub use envelope::{Empfaenger, EncryptedEnvelope};
pub use error::{ProtokollError, ProtokollResult};
pub use signaling::{SignalInhalt, SignalNachricht};
