//! Kommunikations-Konfiguration
//!
//! Legt fest ueber welchen Weg Nachrichten laufen (Server-Relay, P2P oder
//! hybrid) und wie die Fallback-Politik aussieht. Die Konfiguration lebt
//! hinter einem explizit konstruierten, injizierten Handle statt in
//! modulglobalem Zustand, damit Tests isolierte Instanzen bauen koennen.
//!
//! Die Konfiguration wird nicht ueber Prozess-Neustarts persistiert – beim
//! Start gelten die Standardwerte bzw. die Werte aus der Konfigurationsdatei.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Primaerer Kommunikationsweg
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PrimaerMethode {
    P2p,
    #[default]
    Server,
    Hybrid,
}

/// Vollstaendige Kommunikations-Konfiguration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunicationConfig {
    /// Primaerer Weg fuer ausgehende Nachrichten
    pub primaer_methode: PrimaerMethode,
    /// Darf der P2P-Weg ueberhaupt verwendet werden
    pub p2p_aktiviert: bool,
    /// Darf der Server-Relay-Weg verwendet werden
    pub server_aktiviert: bool,
    /// Maximale Verbindungsversuche pro Peer bevor dauerhaft aufgegeben wird
    pub max_p2p_reconnect_versuche: u32,
    /// Bei P2P-Fehlschlag auf den Server-Weg ausweichen
    pub server_fallback: bool,
    /// Nachrichten auch auf dem Server-Weg Ende-zu-Ende verschluesseln
    pub server_nachrichten_verschluesseln: bool,
}

impl Default for CommunicationConfig {
    fn default() -> Self {
        // P2P ist im ausgelieferten Build bewusst abgeschaltet; der
        // verschluesselte Server-Weg ist der primaer unterstuetzte Pfad.
        Self {
            primaer_methode: PrimaerMethode::Server,
            p2p_aktiviert: false,
            server_aktiviert: true,
            max_p2p_reconnect_versuche: 3,
            server_fallback: true,
            server_nachrichten_verschluesseln: true,
        }
    }
}

/// Partielles Update der Kommunikations-Konfiguration
///
/// Nur gesetzte Felder werden uebernommen.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommunicationConfigUpdate {
    pub primaer_methode: Option<PrimaerMethode>,
    pub p2p_aktiviert: Option<bool>,
    pub server_aktiviert: Option<bool>,
    pub max_p2p_reconnect_versuche: Option<u32>,
    pub server_fallback: Option<bool>,
    pub server_nachrichten_verschluesseln: Option<bool>,
}

impl CommunicationConfig {
    /// Uebernimmt alle gesetzten Felder des Updates
    pub fn anwenden(&mut self, update: CommunicationConfigUpdate) {
        if let Some(m) = update.primaer_methode {
            self.primaer_methode = m;
        }
        if let Some(v) = update.p2p_aktiviert {
            self.p2p_aktiviert = v;
        }
        if let Some(v) = update.server_aktiviert {
            self.server_aktiviert = v;
        }
        if let Some(v) = update.max_p2p_reconnect_versuche {
            self.max_p2p_reconnect_versuche = v;
        }
        if let Some(v) = update.server_fallback {
            self.server_fallback = v;
        }
        if let Some(v) = update.server_nachrichten_verschluesseln {
            self.server_nachrichten_verschluesseln = v;
        }
    }
}

/// Geteiltes Handle auf die aktive Konfiguration
///
/// Clone teilt den inneren Zustand. Alle Mutation laeuft ueber
/// `aktualisieren`; Leser ziehen sich per `schnappschuss` einen konsistenten
/// Stand und arbeiten damit weiter – bereits laufende Sende-Vorgaenge werden
/// durch ein Update nicht umgeroutet.
#[derive(Clone)]
pub struct KonfigHandle {
    inner: Arc<RwLock<CommunicationConfig>>,
}

impl KonfigHandle {
    /// Erstellt ein Handle ueber der gegebenen Konfiguration
    pub fn neu(config: CommunicationConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Erstellt ein Handle mit Standardwerten
    pub fn standard() -> Self {
        Self::neu(CommunicationConfig::default())
    }

    /// Gibt eine Kopie des aktuellen Stands zurueck
    pub fn schnappschuss(&self) -> CommunicationConfig {
        self.inner.read().clone()
    }

    /// Wendet ein partielles Update sofort an
    pub fn aktualisieren(&self, update: CommunicationConfigUpdate) {
        let mut config = self.inner.write();
        config.anwenden(update);
        tracing::debug!(?config, "Kommunikations-Konfiguration aktualisiert");
    }
}

impl Default for KonfigHandle {
    fn default() -> Self {
        Self::standard()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standardwerte_entsprechen_auslieferung() {
        let config = CommunicationConfig::default();
        assert_eq!(config.primaer_methode, PrimaerMethode::Server);
        assert!(!config.p2p_aktiviert);
        assert!(config.server_aktiviert);
        assert_eq!(config.max_p2p_reconnect_versuche, 3);
        assert!(config.server_fallback);
        assert!(config.server_nachrichten_verschluesseln);
    }

    #[test]
    fn partielles_update_laesst_rest_unberuehrt() {
        let mut config = CommunicationConfig::default();
        config.anwenden(CommunicationConfigUpdate {
            primaer_methode: Some(PrimaerMethode::Hybrid),
            p2p_aktiviert: Some(true),
            ..Default::default()
        });

        assert_eq!(config.primaer_methode, PrimaerMethode::Hybrid);
        assert!(config.p2p_aktiviert);
        // Unveraendert
        assert!(config.server_aktiviert);
        assert_eq!(config.max_p2p_reconnect_versuche, 3);
    }

    #[test]
    fn handle_teilt_zustand() {
        let handle1 = KonfigHandle::standard();
        let handle2 = handle1.clone();

        handle1.aktualisieren(CommunicationConfigUpdate {
            p2p_aktiviert: Some(true),
            ..Default::default()
        });

        assert!(handle2.schnappschuss().p2p_aktiviert);
    }

    #[test]
    fn schnappschuss_ist_vom_update_entkoppelt() {
        let handle = KonfigHandle::standard();
        let schnappschuss = handle.schnappschuss();

        handle.aktualisieren(CommunicationConfigUpdate {
            server_aktiviert: Some(false),
            ..Default::default()
        });

        // Der gezogene Stand bleibt wie er war
        assert!(schnappschuss.server_aktiviert);
        assert!(!handle.schnappschuss().server_aktiviert);
    }

    #[test]
    fn config_aus_toml_mit_teilangaben() {
        let toml = r#"
            primaer_methode = "hybrid"
            p2p_aktiviert = true
        "#;
        let config: CommunicationConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.primaer_methode, PrimaerMethode::Hybrid);
        assert!(config.p2p_aktiviert);
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(config.max_p2p_reconnect_versuche, 3);
    }
}
