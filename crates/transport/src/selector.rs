//! Transport-Auswahl
//!
//! Entscheidet pro ausgehendem Envelope ob es ueber den Peer-Datenkanal
//! oder das Server-Relay laeuft. Die Entscheidung basiert auf einem
//! Schnappschuss der aktiven Konfiguration – ein Konfigurations-Update
//! routet bereits laufende Sende-Vorgaenge nicht um.
//!
//! ## Routing
//! - `server`: jede Nachricht geht ueber das Relay, P2P wird nie versucht
//! - `p2p`: Peer-Weg zuerst; ohne `server_fallback` ist ein Fehlschlag
//!   unzustellbar
//! - `hybrid`: Peer-Weg zuerst, bei Fehlschlag Relay sofern
//!   `server_fallback` gesetzt ist
//!
//! Gruppen-Envelopes laufen immer ueber das Relay.

use snakkaz_core::{UserId, Zustellweg};
use snakkaz_protocol::{Empfaenger, EncryptedEnvelope};

use crate::config::{CommunicationConfig, KonfigHandle, PrimaerMethode};
use crate::error::{TransportError, TransportResult};
use crate::relay::ServerRelay;

/// Schnittstelle zum Peer-Netz aus Sicht des Selectors
#[allow(async_fn_in_trait)]
pub trait PeerNetz: Send + Sync {
    /// Prueft ob zu diesem Peer eine sendebereite Session existiert
    fn ist_bereit(&self, peer_id: &UserId) -> bool;

    /// Sendet ein Envelope ueber den offenen Datenkanal
    async fn envelope_senden(
        &self,
        peer_id: &UserId,
        envelope: &EncryptedEnvelope,
    ) -> TransportResult<()>;
}

// Ein geteiltes Peer-Netz hinter Arc ist selbst ein Peer-Netz
impl<P: PeerNetz> PeerNetz for std::sync::Arc<P> {
    fn ist_bereit(&self, peer_id: &UserId) -> bool {
        (**self).ist_bereit(peer_id)
    }

    async fn envelope_senden(
        &self,
        peer_id: &UserId,
        envelope: &EncryptedEnvelope,
    ) -> TransportResult<()> {
        (**self).envelope_senden(peer_id, envelope).await
    }
}

/// Platzhalter fuer Clients ohne Peer-Stack
pub struct KeinPeerNetz;

impl PeerNetz for KeinPeerNetz {
    fn ist_bereit(&self, _peer_id: &UserId) -> bool {
        false
    }

    async fn envelope_senden(
        &self,
        _peer_id: &UserId,
        _envelope: &EncryptedEnvelope,
    ) -> TransportResult<()> {
        Err(TransportError::Peer("kein Peer-Netz konfiguriert".into()))
    }
}

/// Routet ausgehende Envelopes auf einen Transportweg
pub struct TransportSelector<P: PeerNetz, R: ServerRelay> {
    konfig: KonfigHandle,
    peer: Option<P>,
    relay: R,
}

impl<R: ServerRelay> TransportSelector<KeinPeerNetz, R> {
    /// Erstellt einen Selector ohne Peer-Stack (reiner Server-Betrieb)
    pub fn ohne_peer(konfig: KonfigHandle, relay: R) -> Self {
        Self {
            konfig,
            peer: None,
            relay,
        }
    }
}

impl<P: PeerNetz, R: ServerRelay> TransportSelector<P, R> {
    /// Erstellt einen Selector mit Peer-Stack und Relay
    pub fn neu(konfig: KonfigHandle, peer: P, relay: R) -> Self {
        Self {
            konfig,
            peer: Some(peer),
            relay,
        }
    }

    /// Gibt das aktive Konfigurations-Handle zurueck
    pub fn konfig(&self) -> &KonfigHandle {
        &self.konfig
    }

    /// Routet ein Envelope und gibt den verwendeten Weg zurueck
    ///
    /// `TransportError::Unzustellbar` bedeutet: kein erlaubter Weg hat die
    /// Nachricht angenommen. Der Aufrufer muss den Fehlschlag sichtbar
    /// machen, die Nachricht darf nicht stillschweigend verschwinden.
    pub async fn senden(&self, envelope: &EncryptedEnvelope) -> TransportResult<Zustellweg> {
        // Entscheidungs-Grundlage fuer diesen Sende-Vorgang einfrieren
        let konfig = self.konfig.schnappschuss();

        // Gruppen-Traffic laeuft immer ueber das Relay
        let ziel = match envelope.empfaenger {
            Empfaenger::Benutzer(user_id) => user_id,
            Empfaenger::Gruppe(_) => {
                self.server_senden(&konfig, envelope).await?;
                return Ok(Zustellweg::Server);
            }
        };

        match konfig.primaer_methode {
            PrimaerMethode::Server => {
                self.server_senden(&konfig, envelope).await?;
                Ok(Zustellweg::Server)
            }
            PrimaerMethode::P2p | PrimaerMethode::Hybrid => {
                match self.p2p_senden(&konfig, &ziel, envelope).await {
                    Ok(()) => Ok(Zustellweg::P2p),
                    Err(grund) => {
                        if !konfig.server_fallback {
                            return Err(TransportError::Unzustellbar { grund });
                        }
                        tracing::debug!(
                            envelope_id = %envelope.id,
                            peer = %ziel,
                            grund = %grund,
                            "P2P-Versand fehlgeschlagen – Fallback auf Server"
                        );
                        self.server_senden(&konfig, envelope).await?;
                        Ok(Zustellweg::Server)
                    }
                }
            }
        }
    }

    /// Versucht den Peer-Weg; gibt den Fehlschlags-Grund zurueck
    async fn p2p_senden(
        &self,
        konfig: &CommunicationConfig,
        ziel: &UserId,
        envelope: &EncryptedEnvelope,
    ) -> Result<(), String> {
        if !konfig.p2p_aktiviert {
            return Err("P2P ist deaktiviert".into());
        }

        let Some(peer) = &self.peer else {
            return Err("kein Peer-Netz konfiguriert".into());
        };

        if !peer.ist_bereit(ziel) {
            return Err(format!("keine aktive Peer-Session fuer {ziel}"));
        }

        peer.envelope_senden(ziel, envelope)
            .await
            .map_err(|e| e.to_string())
    }

    /// Versucht den Server-Weg
    async fn server_senden(
        &self,
        konfig: &CommunicationConfig,
        envelope: &EncryptedEnvelope,
    ) -> TransportResult<()> {
        if !konfig.server_aktiviert {
            return Err(TransportError::Unzustellbar {
                grund: "Server-Weg ist deaktiviert".into(),
            });
        }

        self.relay.einliefern(envelope).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CommunicationConfigUpdate;
    use crate::relay::MemoryRelay;
    use snakkaz_core::KeyId;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Peer-Netz-Attrappe mit steuerbarer Bereitschaft
    struct TestPeerNetz {
        bereit: bool,
        senden_schlaegt_fehl: bool,
        gesendet: AtomicUsize,
    }

    impl TestPeerNetz {
        fn neu(bereit: bool, senden_schlaegt_fehl: bool) -> Arc<Self> {
            Arc::new(Self {
                bereit,
                senden_schlaegt_fehl,
                gesendet: AtomicUsize::new(0),
            })
        }
    }

    impl PeerNetz for TestPeerNetz {
        fn ist_bereit(&self, _peer_id: &UserId) -> bool {
            self.bereit
        }

        async fn envelope_senden(
            &self,
            _peer_id: &UserId,
            _envelope: &EncryptedEnvelope,
        ) -> TransportResult<()> {
            if self.senden_schlaegt_fehl {
                return Err(TransportError::Peer("Datenkanal nicht offen".into()));
            }
            self.gesendet.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn konfig(methode: PrimaerMethode, p2p: bool, fallback: bool) -> KonfigHandle {
        KonfigHandle::neu(CommunicationConfig {
            primaer_methode: methode,
            p2p_aktiviert: p2p,
            server_fallback: fallback,
            ..Default::default()
        })
    }

    fn test_envelope(empfaenger: Empfaenger) -> EncryptedEnvelope {
        EncryptedEnvelope::neu(UserId::new(), empfaenger, KeyId::neu("k"), b"ct", &[1u8; 12])
    }

    #[tokio::test]
    async fn server_modus_nutzt_relay() {
        let relay = MemoryRelay::neu();
        let ziel = UserId::new();
        let mut rx = relay.abonnieren(ziel);

        let selector = TransportSelector::ohne_peer(
            konfig(PrimaerMethode::Server, false, true),
            relay.clone(),
        );

        let weg = selector
            .senden(&test_envelope(Empfaenger::Benutzer(ziel)))
            .await
            .unwrap();
        assert_eq!(weg, Zustellweg::Server);
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn hybrid_mit_bereitem_peer_nutzt_p2p() {
        let relay = MemoryRelay::neu();
        let ziel = UserId::new();
        let mut rx = relay.abonnieren(ziel);

        let peer = TestPeerNetz::neu(true, false);
        let selector = TransportSelector::neu(
            konfig(PrimaerMethode::Hybrid, true, true),
            Arc::clone(&peer),
            relay.clone(),
        );

        let weg = selector
            .senden(&test_envelope(Empfaenger::Benutzer(ziel)))
            .await
            .unwrap();
        assert_eq!(weg, Zustellweg::P2p);
        assert_eq!(peer.gesendet.load(Ordering::SeqCst), 1);
        assert!(rx.try_recv().is_err(), "Relay darf nicht benutzt worden sein");
    }

    #[tokio::test]
    async fn hybrid_ohne_session_faellt_auf_server_zurueck() {
        let relay = MemoryRelay::neu();
        let ziel = UserId::new();
        let mut rx = relay.abonnieren(ziel);

        let peer = TestPeerNetz::neu(false, false);
        let selector = TransportSelector::neu(
            konfig(PrimaerMethode::Hybrid, true, true),
            peer,
            relay.clone(),
        );

        let weg = selector
            .senden(&test_envelope(Empfaenger::Benutzer(ziel)))
            .await
            .unwrap();
        assert_eq!(weg, Zustellweg::Server);
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn hybrid_mit_sendefehler_faellt_auf_server_zurueck() {
        let relay = MemoryRelay::neu();
        let ziel = UserId::new();
        let mut rx = relay.abonnieren(ziel);

        let peer = TestPeerNetz::neu(true, true);
        let selector = TransportSelector::neu(
            konfig(PrimaerMethode::Hybrid, true, true),
            peer,
            relay.clone(),
        );

        let weg = selector
            .senden(&test_envelope(Empfaenger::Benutzer(ziel)))
            .await
            .unwrap();
        assert_eq!(weg, Zustellweg::Server);
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn p2p_ohne_fallback_ist_unzustellbar() {
        let relay = MemoryRelay::neu();
        let ziel = UserId::new();
        let mut rx = relay.abonnieren(ziel);

        let peer = TestPeerNetz::neu(false, false);
        let selector = TransportSelector::neu(
            konfig(PrimaerMethode::P2p, true, false),
            peer,
            relay.clone(),
        );

        let result = selector
            .senden(&test_envelope(Empfaenger::Benutzer(ziel)))
            .await;
        assert!(matches!(
            result,
            Err(TransportError::Unzustellbar { .. })
        ));
        assert!(
            rx.try_recv().is_err(),
            "Bei Unzustellbarkeit darf nichts stillschweigend ueber den Server gehen"
        );
    }

    #[tokio::test]
    async fn deaktivierter_server_macht_server_modus_unzustellbar() {
        let relay = MemoryRelay::neu();
        let handle = KonfigHandle::neu(CommunicationConfig {
            server_aktiviert: false,
            ..Default::default()
        });
        let selector = TransportSelector::ohne_peer(handle, relay);

        let result = selector
            .senden(&test_envelope(Empfaenger::Benutzer(UserId::new())))
            .await;
        assert!(matches!(result, Err(TransportError::Unzustellbar { .. })));
    }

    #[tokio::test]
    async fn gruppen_envelopes_gehen_immer_ueber_den_server() {
        let relay = MemoryRelay::neu();
        let gruppe = snakkaz_core::GroupId::new();
        let mitglied = UserId::new();
        let mut rx = relay.abonnieren(mitglied);
        relay.gruppe_beitreten(mitglied, gruppe);

        // Peer waere bereit, wird fuer Gruppen aber nie gefragt
        let peer = TestPeerNetz::neu(true, false);
        let selector = TransportSelector::neu(
            konfig(PrimaerMethode::P2p, true, true),
            Arc::clone(&peer),
            relay.clone(),
        );

        let weg = selector
            .senden(&test_envelope(Empfaenger::Gruppe(gruppe)))
            .await
            .unwrap();
        assert_eq!(weg, Zustellweg::Server);
        assert_eq!(peer.gesendet.load(Ordering::SeqCst), 0);
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn konfig_update_wirkt_auf_folgende_sendungen() {
        let relay = MemoryRelay::neu();
        let ziel = UserId::new();
        let mut rx = relay.abonnieren(ziel);

        let peer = TestPeerNetz::neu(true, false);
        let handle = konfig(PrimaerMethode::Server, false, true);
        let selector =
            TransportSelector::neu(handle.clone(), Arc::clone(&peer), relay.clone());

        // Erst Server-Modus
        let weg = selector
            .senden(&test_envelope(Empfaenger::Benutzer(ziel)))
            .await
            .unwrap();
        assert_eq!(weg, Zustellweg::Server);
        assert!(rx.try_recv().is_ok());

        // Umschalten auf Hybrid mit P2P
        handle.aktualisieren(CommunicationConfigUpdate {
            primaer_methode: Some(PrimaerMethode::Hybrid),
            p2p_aktiviert: Some(true),
            ..Default::default()
        });

        let weg = selector
            .senden(&test_envelope(Empfaenger::Benutzer(ziel)))
            .await
            .unwrap();
        assert_eq!(weg, Zustellweg::P2p);
        assert_eq!(peer.gesendet.load(Ordering::SeqCst), 1);
    }
}
