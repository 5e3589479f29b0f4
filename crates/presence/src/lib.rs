//! snakkaz-presence – Online-Status-Verwaltung
//!
//! Rein beobachtender Dienst: wer ist online, abwesend, beschaeftigt?
//! Keine Korrektheits-Abhaengigkeit fuer den Nachrichtenfluss.

pub mod presence;

// Bequeme Re-Exporte
pub use presence::{BenutzerPresence, BenutzerStatus, PresenceEvent, PresenceManager};
