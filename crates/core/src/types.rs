//! Gemeinsame Identifikationstypen fuer Snakkaz
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige Benutzer-ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Erstellt eine neue zufaellige UserId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "user:{}", self.0)
    }
}

/// Eindeutige Gruppen-ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(pub Uuid);

impl GroupId {
    /// Erstellt eine neue zufaellige GroupId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "group:{}", self.0)
    }
}

/// Schluessel-Bezeichner
///
/// Schluessel werden ueber wohlbekannte String-Bezeichner angesprochen
/// (z.B. der Geraete-Schluessel oder ein Konversations-Schluessel), nicht
/// ueber UUIDs. Ein Bezeichner loest fuer seine gesamte Lebensdauer auf
/// genau eine Algorithmus/Verwendungs-Kombination auf.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyId(pub String);

impl KeyId {
    /// Erstellt eine KeyId aus einem beliebigen String-Bezeichner
    pub fn neu(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Erstellt eine neue zufaellige KeyId
    pub fn zufaellig() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for KeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "key:{}", self.0)
    }
}

/// Weg ueber den eine Nachricht zugestellt wurde
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zustellweg {
    /// Direkt ueber den Peer-Datenkanal
    P2p,
    /// Ueber das Server-Relay
    Server,
}

impl std::fmt::Display for Zustellweg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Zustellweg::P2p => write!(f, "p2p"),
            Zustellweg::Server => write!(f, "server"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_eindeutig() {
        let a = UserId::new();
        let b = UserId::new();
        assert_ne!(a, b, "Zwei neue UserIds muessen verschieden sein");
    }

    #[test]
    fn group_id_display() {
        let id = GroupId(Uuid::nil());
        assert!(id.to_string().starts_with("group:"));
    }

    #[test]
    fn key_id_aus_string() {
        let id = KeyId::neu("geraet");
        assert_eq!(id.as_str(), "geraet");
        assert_eq!(id.to_string(), "key:geraet");
    }

    #[test]
    fn zufaellige_key_ids_verschieden() {
        assert_ne!(KeyId::zufaellig(), KeyId::zufaellig());
    }

    #[test]
    fn ids_sind_serde_kompatibel() {
        let uid = UserId::new();
        let json = serde_json::to_string(&uid).unwrap();
        let uid2: UserId = serde_json::from_str(&json).unwrap();
        assert_eq!(uid, uid2);
    }

    #[test]
    fn zustellweg_serde_kleingeschrieben() {
        assert_eq!(serde_json::to_string(&Zustellweg::P2p).unwrap(), "\"p2p\"");
        assert_eq!(
            serde_json::to_string(&Zustellweg::Server).unwrap(),
            "\"server\""
        );
    }
}
