//! snakkaz-peer – Peer-Verbindungsverwaltung
//!
//! Verwaltet pro Gegenpart genau eine Peer-Session und stellt darueber einen
//! Duplex-Datenkanal fuer Ciphertext-Austausch bereit:
//! - `session` - Session-Zustandsmaschine pro Gegenpart
//! - `channel` - Datenkanal-Abstraktion mit In-Memory-Paar
//! - `signaling` - SignalTransport-Trait + Relay-gestuetzte Implementierung
//! - `manager` - Verbindungsaufbau, Reconnect-Politik, Versand
//! - `vermittler` - In-Memory-Vermittler fuer Tests und Demo-Betrieb
//!
//! Das Signaling (Offer/Answer/Kandidaten) laeuft ueber den
//! Server-Relay-Weg, da kein eigenstaendiger Signaling-Server existiert.

pub mod channel;
pub mod error;
pub mod manager;
pub mod session;
pub mod signaling;
pub mod vermittler;

// Bequeme Re-Exporte
pub use channel::{datachannel_paar, DataChannelHandle, DataChannelZustand};
pub use error::{PeerError, PeerResult};
pub use manager::{EingehendeNachricht, PeerConnectionManager, PeerKonfiguration};
pub use session::{PeerSession, PeerZustand};
pub use signaling::{signal_aus_envelope, RelaySignaling, SignalTransport};
pub use vermittler::{PeerVermittler, VermittlerAnschluss};
