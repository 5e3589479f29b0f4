//! Signaling-Nachrichten fuer den Peer-Verbindungsaufbau
//!
//! SDP-Offers/-Answers und ICE-Kandidaten werden als getaggte
//! JSON-Dokumente ueber den Server-Relay-Weg vermittelt, da kein
//! eigenstaendiger Signaling-Server existiert.

use serde::{Deserialize, Serialize};

use snakkaz_core::UserId;

use crate::error::ProtokollResult;

/// Inhalt einer Signaling-Nachricht
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "typ", rename_all = "snake_case")]
pub enum SignalInhalt {
    /// Verbindungs-Angebot des Initiators
    Offer { sdp: String },
    /// Antwort des Gegenparts auf ein Offer
    Answer { sdp: String },
    /// Ein ICE-Kandidat (Netzwerkpfad-Vorschlag)
    IceCandidate { kandidat: String },
    /// Abbruch einer laufenden Verhandlung
    Abbruch { grund: String },
}

/// Eine adressierte Signaling-Nachricht
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalNachricht {
    pub von: UserId,
    pub an: UserId,
    pub inhalt: SignalInhalt,
}

impl SignalNachricht {
    pub fn neu(von: UserId, an: UserId, inhalt: SignalInhalt) -> Self {
        Self { von, an, inhalt }
    }

    /// Serialisiert die Nachricht als JSON-Dokument
    pub fn als_json(&self) -> ProtokollResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Liest eine Nachricht aus einem JSON-Dokument
    pub fn aus_json(json: &str) -> ProtokollResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_json_roundtrip() {
        let nachricht = SignalNachricht::neu(
            UserId::new(),
            UserId::new(),
            SignalInhalt::Offer {
                sdp: "v=0 o=- ...".into(),
            },
        );

        let json = nachricht.als_json().unwrap();
        let wieder = SignalNachricht::aus_json(&json).unwrap();
        assert_eq!(wieder, nachricht);
    }

    #[test]
    fn inhalt_ist_getaggt() {
        let nachricht = SignalNachricht::neu(
            UserId::new(),
            UserId::new(),
            SignalInhalt::IceCandidate {
                kandidat: "candidate:1 1 udp ...".into(),
            },
        );

        let json = nachricht.als_json().unwrap();
        assert!(json.contains("\"typ\":\"ice_candidate\""));
    }

    #[test]
    fn alle_varianten_serde_kompatibel() {
        let varianten = [
            SignalInhalt::Offer { sdp: "o".into() },
            SignalInhalt::Answer { sdp: "a".into() },
            SignalInhalt::IceCandidate {
                kandidat: "k".into(),
            },
            SignalInhalt::Abbruch {
                grund: "timeout".into(),
            },
        ];

        for inhalt in varianten {
            let json = serde_json::to_string(&inhalt).unwrap();
            let wieder: SignalInhalt = serde_json::from_str(&json).unwrap();
            assert_eq!(wieder, inhalt);
        }
    }
}
