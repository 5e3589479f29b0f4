//! snakkaz-transport – Transport-Auswahl und Server-Relay
//!
//! Dieses Crate entscheidet fuer jede ausgehende Nachricht ob sie ueber den
//! Server-Relay-Weg oder den Peer-Datenkanal laeuft:
//! - `config` - Kommunikations-Konfiguration mit Laufzeit-Updates
//! - `relay` - ServerRelay-Trait + In-Memory-Implementierung
//! - `selector` - Routing-Entscheidung inkl. Fallback-Politik
//! - `error` - Fehlertypen

pub mod config;
pub mod error;
pub mod relay;
pub mod selector;

// Bequeme Re-Exporte
pub use config::{CommunicationConfig, CommunicationConfigUpdate, KonfigHandle, PrimaerMethode};
pub use error::{TransportError, TransportResult};
pub use relay::{MemoryRelay, ServerRelay};
pub use selector::{KeinPeerNetz, PeerNetz, TransportSelector};
