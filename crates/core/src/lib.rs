//! snakkaz-core – Gemeinsame Typen, Events und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Snakkaz-Crates gemeinsam genutzt werden.

pub mod error;
pub mod event;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{Result, SnakkazError};
pub use event::SnakkazEvent;
pub use types::{GroupId, KeyId, UserId, Zustellweg};
