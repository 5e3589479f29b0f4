//! Client-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Client ohne Konfigurationsdatei
//! lauffaehig ist. Die Kommunikations-Sektion liefert nur die
//! Startwerte – zur Laufzeit wird sie ueber das Konfigurations-Handle
//! aktualisiert und nicht zurueckgeschrieben.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use snakkaz_peer::PeerKonfiguration;
use snakkaz_transport::CommunicationConfig;

/// Vollstaendige Client-Konfiguration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Kommunikationswege und Fallback-Politik
    pub kommunikation: CommunicationConfig,
    /// Geraete-Speicher fuer Schluessel
    pub speicher: SpeicherEinstellungen,
    /// Peer-Verbindungsaufbau
    pub peer: PeerEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Geraete-Speicher-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeicherEinstellungen {
    /// Verzeichnis fuer persistierte Schluessel (JWK-Dateien)
    pub schluessel_verzeichnis: String,
}

impl Default for SpeicherEinstellungen {
    fn default() -> Self {
        Self {
            schluessel_verzeichnis: "daten/schluessel".into(),
        }
    }
}

/// Einstellungen fuer den Peer-Verbindungsaufbau
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerEinstellungen {
    /// Zeitfenster pro Verbindungsversuch in Sekunden
    pub verbindungs_timeout_sek: u64,
}

impl Default for PeerEinstellungen {
    fn default() -> Self {
        Self {
            verbindungs_timeout_sek: 8,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ClientConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Baut die Peer-Konfiguration aus Kommunikations- und Peer-Sektion
    pub fn peer_konfiguration(&self) -> PeerKonfiguration {
        PeerKonfiguration {
            max_reconnect_versuche: self.kommunikation.max_p2p_reconnect_versuche,
            verbindungs_timeout: Duration::from_secs(self.peer.verbindungs_timeout_sek),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snakkaz_transport::PrimaerMethode;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.kommunikation.primaer_methode, PrimaerMethode::Server);
        assert!(!cfg.kommunikation.p2p_aktiviert);
        assert_eq!(cfg.speicher.schluessel_verzeichnis, "daten/schluessel");
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.peer.verbindungs_timeout_sek, 8);
    }

    #[test]
    fn peer_konfiguration_uebernimmt_werte() {
        let cfg = ClientConfig::default();
        let peer = cfg.peer_konfiguration();
        assert_eq!(peer.max_reconnect_versuche, 3);
        assert_eq!(peer.verbindungs_timeout, Duration::from_secs(8));
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [kommunikation]
            primaer_methode = "hybrid"
            p2p_aktiviert = true

            [speicher]
            schluessel_verzeichnis = "/tmp/snakkaz"
        "#;
        let cfg: ClientConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.kommunikation.primaer_methode, PrimaerMethode::Hybrid);
        assert!(cfg.kommunikation.p2p_aktiviert);
        assert_eq!(cfg.speicher.schluessel_verzeichnis, "/tmp/snakkaz");
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.logging.format, "text");
        assert!(cfg.kommunikation.server_fallback);
    }
}
