//! Verschluesselte Nachrichten-Envelopes
//!
//! Das Envelope ist die Wire- und Speicher-Form einer Nachricht:
//! Ciphertext, IV und Routing-Metadaten. Einmal gebaut ist es unveraenderlich;
//! entschluesselt wird beim Lesen, nie in-place.
//!
//! Eine IV darf mit derselben Key-ID niemals wiederverwendet werden – die
//! IV kommt deshalb immer frisch aus der Verschluesselungs-Operation und
//! wird hier nur noch transportiert.

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use snakkaz_core::{GroupId, KeyId, UserId};

use crate::error::{ProtokollError, ProtokollResult};

/// Empfaenger eines Envelopes: ein Benutzer oder eine Gruppe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "typ", content = "id", rename_all = "lowercase")]
pub enum Empfaenger {
    Benutzer(UserId),
    Gruppe(GroupId),
}

impl std::fmt::Display for Empfaenger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Empfaenger::Benutzer(id) => write!(f, "{id}"),
            Empfaenger::Gruppe(id) => write!(f, "{id}"),
        }
    }
}

/// Wire-/Speicher-Form einer Nachricht
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptedEnvelope {
    pub id: Uuid,
    pub sender_id: UserId,
    pub empfaenger: Empfaenger,
    /// Bezeichner des Schluessels mit dem der Inhalt verschluesselt wurde;
    /// `None` bei unverschluesselten System-Payloads
    pub key_id: Option<KeyId>,
    /// Base64-kodierte IV (96 Bit); leer bei unverschluesselten Payloads
    pub iv: String,
    /// Base64-kodierter Inhalt (Ciphertext inkl. Auth-Tag, oder Klartext
    /// wenn `ist_verschluesselt` false ist)
    pub verschluesselter_inhalt: String,
    pub ist_verschluesselt: bool,
    pub erstellt_am: DateTime<Utc>,
}

impl EncryptedEnvelope {
    /// Baut ein Envelope aus dem Ergebnis einer Verschluesselungs-Operation
    pub fn neu(
        sender_id: UserId,
        empfaenger: Empfaenger,
        key_id: KeyId,
        ciphertext: &[u8],
        iv: &[u8],
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender_id,
            empfaenger,
            key_id: Some(key_id),
            iv: general_purpose::STANDARD.encode(iv),
            verschluesselter_inhalt: general_purpose::STANDARD.encode(ciphertext),
            ist_verschluesselt: true,
            erstellt_am: Utc::now(),
        }
    }

    /// Baut ein unverschluesseltes System-Envelope (z.B. Signaling-Traeger)
    pub fn unverschluesselt(sender_id: UserId, empfaenger: Empfaenger, inhalt: &[u8]) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender_id,
            empfaenger,
            key_id: None,
            iv: String::new(),
            verschluesselter_inhalt: general_purpose::STANDARD.encode(inhalt),
            ist_verschluesselt: false,
            erstellt_am: Utc::now(),
        }
    }

    /// Dekodiert den Inhalt (Ciphertext oder Klartext-Bytes)
    pub fn inhalt_bytes(&self) -> ProtokollResult<Vec<u8>> {
        Ok(general_purpose::STANDARD.decode(&self.verschluesselter_inhalt)?)
    }

    /// Dekodiert die IV-Bytes
    pub fn iv_bytes(&self) -> ProtokollResult<Vec<u8>> {
        if self.iv.is_empty() {
            return Err(ProtokollError::UngueltigeNachricht(
                "Envelope traegt keine IV".into(),
            ));
        }
        Ok(general_purpose::STANDARD.decode(&self.iv)?)
    }

    /// Serialisiert das Envelope als JSON-Dokument fuer den Transport
    pub fn als_json(&self) -> ProtokollResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Liest ein Envelope aus einem JSON-Dokument
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
    fn envelope_json_roundtrip() {
        let env = EncryptedEnvelope::neu(
            UserId::new(),
            Empfaenger::Benutzer(UserId::new()),
            KeyId::neu("konv_1"),
            b"ciphertext-bytes",
            &[7u8; 12],
        );

        let json = env.als_json().unwrap();
        let wieder = EncryptedEnvelope::aus_json(&json).unwrap();
        assert_eq!(wieder, env);
    }

    #[test]
    fn inhalt_und_iv_dekodierbar() {
        let env = EncryptedEnvelope::neu(
            UserId::new(),
            Empfaenger::Benutzer(UserId::new()),
            KeyId::neu("konv_1"),
            b"abc",
            &[9u8; 12],
        );

        assert_eq!(env.inhalt_bytes().unwrap(), b"abc");
        assert_eq!(env.iv_bytes().unwrap(), vec![9u8; 12]);
        assert!(env.ist_verschluesselt);
    }

    #[test]
    fn gruppen_empfaenger_serde() {
        let gruppe = GroupId::new();
        let env = EncryptedEnvelope::neu(
            UserId::new(),
            Empfaenger::Gruppe(gruppe),
            KeyId::neu("gruppe_1"),
            b"x",
            &[0u8; 12],
        );

        let json = env.als_json().unwrap();
        assert!(json.contains("\"typ\":\"gruppe\""));
        let wieder = EncryptedEnvelope::aus_json(&json).unwrap();
        assert_eq!(wieder.empfaenger, Empfaenger::Gruppe(gruppe));
    }

    #[test]
    fn unverschluesseltes_envelope() {
        let env = EncryptedEnvelope::unverschluesselt(
            UserId::new(),
            Empfaenger::Benutzer(UserId::new()),
            b"systemnachricht",
        );

        assert!(!env.ist_verschluesselt);
        assert!(env.key_id.is_none());
        assert_eq!(env.inhalt_bytes().unwrap(), b"systemnachricht");
        assert!(matches!(
            env.iv_bytes(),
            Err(ProtokollError::UngueltigeNachricht(_))
        ));
    }

    #[test]
    fn kaputtes_json_schlaegt_fehl() {
        assert!(EncryptedEnvelope::aus_json("{nicht json").is_err());
    }

    #[test]
    fn envelope_ids_eindeutig() {
        let sender = UserId::new();
        let empfaenger = Empfaenger::Benutzer(UserId::new());
        let a = EncryptedEnvelope::unverschluesselt(sender, empfaenger, b"a");
        let b = EncryptedEnvelope::unverschluesselt(sender, empfaenger, b"b");
        assert_ne!(a.id, b.id);
    }
}
