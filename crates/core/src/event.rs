//! Systemweite Ereignisse
//!
//! Die Orchestrierungs-Schicht versendet diese Ereignisse ueber einen
//! tokio-Broadcast-Kanal an die UI-Anbindung. Zustellung ist best-effort –
//! ein Ereignis ohne Abonnenten geht verloren und das ist in Ordnung.

use crate::types::{UserId, Zustellweg};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ereignisse die der Messenger an seine Abonnenten meldet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SnakkazEvent {
    /// Eine Nachricht wurde erfolgreich versendet
    NachrichtGesendet {
        envelope_id: Uuid,
        weg: Zustellweg,
    },
    /// Eine Nachricht wurde empfangen und entschluesselt
    NachrichtEmpfangen { envelope_id: Uuid, von: UserId },
    /// Eine Nachricht konnte ueber keinen Transportweg zugestellt werden.
    /// Die Nachricht bleibt aus Nutzersicht sichtbar fehlgeschlagen,
    /// damit sie manuell erneut gesendet werden kann.
    NachrichtUnzustellbar { envelope_id: Uuid, grund: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_ist_serde_kompatibel() {
        let event = SnakkazEvent::NachrichtGesendet {
            envelope_id: Uuid::new_v4(),
            weg: Zustellweg::Server,
        };
        let json = serde_json::to_string(&event).unwrap();
        let _: SnakkazEvent = serde_json::from_str(&json).unwrap();
    }

    #[test]
    fn unzustellbar_traegt_grund() {
        let event = SnakkazEvent::NachrichtUnzustellbar {
            envelope_id: Uuid::new_v4(),
            grund: "kein Transport aktiviert".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("kein Transport aktiviert"));
    }
}
