//! snakkaz-client – Bibliotheks-Root
//!
//! Deklariert die Client-Module und stellt den oeffentlichen
//! Einstiegspunkt fuer Integrationstests bereit.

pub mod config;
pub mod messenger;


pub use config::ClientConfig;
pub use messenger::Messenger;

use std::sync::Arc;

use anyhow::Result;

use snakkaz_core::UserId;
use snakkaz_crypto::{DiskKeyStorage, KeyStore};
use snakkaz_peer::PeerVermittler;
use snakkaz_presence::PresenceManager;
use snakkaz_transport::{KonfigHandle, MemoryRelay, ServerRelay, TransportSelector};

/// Haelt den laufenden Client-Zustand zusammen
pub struct Client {
    pub config: ClientConfig,
}

impl Client {
    /// Erstellt einen neuen Client aus der gegebenen Konfiguration
    pub fn neu(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Startet alle Client-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Schluessel-Speicher oeffnen und Geraete-Schluessel sicherstellen
    /// 2. Relay-Abo und Peer-Stack aufbauen
    /// 3. Messenger zusammensetzen und Empfangsschleife starten
    /// 4. Auf Ctrl-C warten
    pub async fn starten(self) -> Result<()> {
        let benutzer_id = UserId::new();
        tracing::info!(
            benutzer_id = %benutzer_id,
            schluessel_verzeichnis = %self.config.speicher.schluessel_verzeichnis,
            "Client startet"
        );

        // Schluessel-Speicher und Geraete-Schluessel
        let schluessel = KeyStore::neu(DiskKeyStorage::new(
            self.config.speicher.schluessel_verzeichnis.clone(),
        ));
        let geraete_schluessel = schluessel.geraete_schluessel().await?;
        tracing::info!(key_id = %geraete_schluessel.key_id, "Geraete-Schluessel bereit");

        // Transport: In-Memory-Relay als Stand-in fuer das Server-Backend
        let relay = MemoryRelay::neu();
        let mut eingang = relay.abonnieren(benutzer_id);

        let konfig_handle = KonfigHandle::neu(self.config.kommunikation.clone());
        let vermittler = PeerVermittler::neu();
        let peer_manager =
            vermittler.manager_erstellen(benutzer_id, self.config.peer_konfiguration());
        tracing::info!(
            p2p_aktiviert = self.config.kommunikation.p2p_aktiviert,
            primaer_methode = ?self.config.kommunikation.primaer_methode,
            "Transport-Selector bereit"
        );

        let selector = TransportSelector::neu(konfig_handle, peer_manager, relay.clone());
        let messenger = Arc::new(Messenger::neu(benutzer_id, schluessel, selector));

        // Presence: sich selbst als online melden
        let presence = PresenceManager::neu();
        presence.benutzer_verbunden(benutzer_id);

        // Empfangsschleife: eingehende Envelopes entschluesseln und loggen
        let empfaenger_messenger = Arc::clone(&messenger);
        tokio::spawn(async move {
            while let Some(envelope) = eingang.recv().await {
                match empfaenger_messenger.envelope_entschluesseln(&envelope).await {
                    Ok(text) => {
                        tracing::info!(
                            von = %envelope.sender_id,
                            zeichen = text.len(),
                            "Nachricht empfangen"
                        );
                    }
                    Err(e) => {
                        tracing::warn!(
                            envelope_id = %envelope.id,
                            fehler = %e,
                            "Nachricht konnte nicht entschluesselt werden"
                        );
                    }
                }
            }
        });

        tracing::info!("Client laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        tokio::signal::ctrl_c().await?;

        presence.benutzer_getrennt(&benutzer_id);
        tracing::info!("Client beendet");
        Ok(())
    }
}
