//! Peer-Connection-Manager
//!
//! Haelt pro Gegenpart genau eine `PeerSession` und fuehrt den
//! Verbindungsaufbau per Offer/Answer/Kandidaten-Austausch durch.
//!
//! ## Reconnect-Politik
//! - Jeder Verbindungsaufbau hat ein begrenztes Zeitfenster
//!   (`verbindungs_timeout`)
//! - Nach einem Fehlschlag wird bis zu `max_reconnect_versuche` mal
//!   insgesamt versucht
//! - Danach gilt die Session als dauerhaft fehlgeschlagen bis zum
//!   naechsten expliziten `verbinden`-Aufruf; der Transport-Selector
//!   routet solange ueber das Server-Relay
//!
//! Der Versand auf dem Datenkanal puffert nichts: ist der Kanal nicht
//! offen, wird sofort abgewiesen und der Aufrufer entscheidet ueber den
//! Fallback.

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc, watch};

use snakkaz_core::UserId;
use snakkaz_protocol::{EncryptedEnvelope, SignalInhalt};
use snakkaz_transport::{PeerNetz, TransportError, TransportResult};

use crate::channel::DataChannelHandle;
use crate::error::{PeerError, PeerResult};
use crate::session::{PeerSession, PeerZustand};
use crate::signaling::SignalTransport;

/// Groesse des Broadcast-Kanals fuer eingehende Nachrichten
const EINGANG_KANAL_GROESSE: usize = 256;

/// Konfiguration des Verbindungsaufbaus
#[derive(Debug, Clone)]
pub struct PeerKonfiguration {
    /// Verbindungsversuche insgesamt bevor dauerhaft aufgegeben wird
    pub max_reconnect_versuche: u32,
    /// Zeitfenster pro Verbindungsversuch
    pub verbindungs_timeout: Duration,
}

impl Default for PeerKonfiguration {
    fn default() -> Self {
        Self {
            max_reconnect_versuche: 3,
            verbindungs_timeout: Duration::from_secs(8),
        }
    }
}

/// Eine ueber den Datenkanal eingegangene Nachricht
#[derive(Debug, Clone)]
pub struct EingehendeNachricht {
    pub von: UserId,
    pub envelope: EncryptedEnvelope,
}

/// Verwaltet alle Peer-Sessions eines Clients
///
/// Thread-safe via Arc + DashMap. Clone des Managers teilt den inneren
/// Zustand.
pub struct PeerConnectionManager<S: SignalTransport> {
    inner: Arc<ManagerInner<S>>,
}

impl<S: SignalTransport> Clone for PeerConnectionManager<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ManagerInner<S> {
    eigene_id: UserId,
    konfig: PeerKonfiguration,
    signaling: S,
    /// Genau eine Session pro Gegenpart
    sessions: DashMap<UserId, PeerSession>,
    /// Eingehende Nachrichten aller Datenkanaele
    eingang_tx: broadcast::Sender<EingehendeNachricht>,
}

impl<S: SignalTransport + Send + Sync + 'static> PeerConnectionManager<S> {
    /// Erstellt einen neuen Manager
    pub fn neu(eigene_id: UserId, konfig: PeerKonfiguration, signaling: S) -> Self {
        let (eingang_tx, _) = broadcast::channel(EINGANG_KANAL_GROESSE);
        Self {
            inner: Arc::new(ManagerInner {
                eigene_id,
                konfig,
                signaling,
                sessions: DashMap::new(),
                eingang_tx,
            }),
        }
    }

    pub fn eigene_id(&self) -> UserId {
        self.inner.eigene_id
    }

    /// Abonniert eingehende Nachrichten aller Datenkanaele
    pub fn abonnieren(&self) -> broadcast::Receiver<EingehendeNachricht> {
        self.inner.eingang_tx.subscribe()
    }

    /// Baut eine Verbindung zum Gegenpart auf
    ///
    /// Laeuft bereits ein Aufbau zu diesem Peer, wartet der Aufruf auf
    /// dessen Ausgang statt einen zweiten zu starten. Eine fehlgeschlagene
    /// oder geschlossene Session wird abgeloest.
    pub async fn verbinden(&self, peer_id: UserId) -> PeerResult<()> {
        if peer_id == self.inner.eigene_id {
            return Err(PeerError::UngueltigeNachricht(
                "Verbindung zu sich selbst".into(),
            ));
        }

        // Genau eine Session pro Gegenpart: der Map-Eintrag ist der
        // Single-Flight-Wachposten.
        let laufender_versuch = match self.inner.sessions.entry(peer_id) {
            Entry::Occupied(mut eintrag) => match eintrag.get().zustand() {
                PeerZustand::Verbunden => return Ok(()),
                PeerZustand::Verbindet => Some(eintrag.get().zustand_abonnieren()),
                // Fehlgeschlagene/geschlossene Session abloesen
                _ => {
                    let session = PeerSession::neu(peer_id);
                    session.zustand_setzen(PeerZustand::Verbindet);
                    eintrag.insert(session);
                    None
                }
            },
            Entry::Vacant(eintrag) => {
                let session = PeerSession::neu(peer_id);
                session.zustand_setzen(PeerZustand::Verbindet);
                eintrag.insert(session);
                None
            }
        };

        match laufender_versuch {
            Some(rx) => self.auf_laufenden_versuch_warten(peer_id, rx).await,
            None => self.verbindung_aushandeln(peer_id).await,
        }
    }

    /// Wartet auf den Ausgang eines bereits laufenden Aufbaus
    async fn auf_laufenden_versuch_warten(
        &self,
        peer_id: UserId,
        mut rx: watch::Receiver<PeerZustand>,
    ) -> PeerResult<()> {
        let limit = self.inner.konfig.verbindungs_timeout
            * self.inner.konfig.max_reconnect_versuche.max(1);

        let ausgang = tokio::time::timeout(
            limit,
            rx.wait_for(|z| {
                matches!(
                    z,
                    PeerZustand::Verbunden | PeerZustand::Fehlgeschlagen | PeerZustand::Geschlossen
                )
            }),
        )
        .await;

        match ausgang {
            Ok(Ok(zustand)) if *zustand == PeerZustand::Verbunden => Ok(()),
            _ => Err(PeerError::VerbindungFehlgeschlagen {
                peer_id,
                versuche: 0,
            }),
        }
    }

    /// Fuehrt den eigentlichen Aufbau mit Wiederholungen durch
    async fn verbindung_aushandeln(&self, peer_id: UserId) -> PeerResult<()> {
        let max = self.inner.konfig.max_reconnect_versuche.max(1);

        for versuch in 1..=max {
            if versuch > 1 {
                tracing::info!(peer = %peer_id, versuch, "Erneuter Verbindungsversuch");
                if let Some(mut session) = self.inner.sessions.get_mut(&peer_id) {
                    session.reconnect_versuche = versuch - 1;
                }
            }

            // Zustands-Abo vor dem Offer ziehen, damit kein Uebergang
            // zwischen Senden und Warten verloren geht
            let mut rx = match self.inner.sessions.get(&peer_id) {
                Some(session) => session.zustand_abonnieren(),
                None => return Err(PeerError::KeineSession(peer_id)),
            };

            let offer = SignalInhalt::Offer {
                sdp: format!("sdp {} -> {}", self.inner.eigene_id, peer_id),
            };
            if let Err(e) = self.inner.signaling.signal_senden(peer_id, offer).await {
                tracing::warn!(peer = %peer_id, versuch, fehler = %e, "Offer-Versand fehlgeschlagen");
                continue;
            }

            let ausgang = tokio::time::timeout(
                self.inner.konfig.verbindungs_timeout,
                rx.wait_for(|z| {
                    matches!(z, PeerZustand::Verbunden | PeerZustand::Fehlgeschlagen)
                }),
            )
            .await;

            match ausgang {
                Ok(Ok(zustand)) if *zustand == PeerZustand::Verbunden => {
                    tracing::info!(peer = %peer_id, versuch, "Peer-Verbindung hergestellt");
                    return Ok(());
                }
                Ok(Ok(_)) => {
                    tracing::warn!(peer = %peer_id, versuch, "Verhandlung abgebrochen");
                }
                Ok(Err(_)) => {
                    // Session wurde waehrend des Wartens entfernt
                    return Err(PeerError::KeineSession(peer_id));
                }
                Err(_) => {
                    tracing::warn!(peer = %peer_id, versuch, "Verbindungsaufbau-Timeout");
                }
            }
        }

        // Dauerhaft fehlgeschlagen bis zum naechsten expliziten Versuch
        if let Some(session) = self.inner.sessions.get(&peer_id) {
            session.zustand_setzen(PeerZustand::Fehlgeschlagen);
        }
        let _ = self
            .inner
            .signaling
            .signal_senden(
                peer_id,
                SignalInhalt::Abbruch {
                    grund: "Verbindungsversuche erschoepft".into(),
                },
            )
            .await;

        tracing::warn!(peer = %peer_id, versuche = max, "Peer dauerhaft nicht erreichbar");
        Err(PeerError::VerbindungFehlgeschlagen {
            peer_id,
            versuche: max,
        })
    }

    /// Verarbeitet eine eingehende Signaling-Nachricht
    pub async fn signal_verarbeiten(&self, von: UserId, inhalt: SignalInhalt) -> PeerResult<()> {
        match inhalt {
            SignalInhalt::Offer { sdp: _ } => {
                tracing::debug!(von = %von, "Offer empfangen");

                match self.inner.sessions.entry(von) {
                    Entry::Occupied(mut eintrag) => {
                        // Eine neue Verhandlung loest alles ausser einem
                        // bereits laufenden Aufbau ab
                        if eintrag.get().zustand() != PeerZustand::Verbindet {
                            if let Some(kanal) = &eintrag.get().kanal {
                                kanal.schliessen();
                            }
                            let session = PeerSession::neu(von);
                            session.zustand_setzen(PeerZustand::Verbindet);
                            eintrag.insert(session);
                        }
                    }
                    Entry::Vacant(eintrag) => {
                        let session = PeerSession::neu(von);
                        session.zustand_setzen(PeerZustand::Verbindet);
                        eintrag.insert(session);
                    }
                }

                let antwort = SignalInhalt::Answer {
                    sdp: format!("sdp {} -> {}", self.inner.eigene_id, von),
                };
                self.inner.signaling.signal_senden(von, antwort).await
            }
            SignalInhalt::Answer { sdp: _ } => {
                // Verbunden markiert erst die Kanal-Anbringung; ein Answer
                // ohne Kanal laesst die Verhandlung weiterlaufen
                tracing::debug!(von = %von, "Answer empfangen");
                Ok(())
            }
            SignalInhalt::IceCandidate { kandidat } => {
                if let Some(mut session) = self.inner.sessions.get_mut(&von) {
                    session.kandidaten.push(kandidat);
                }
                Ok(())
            }
            SignalInhalt::Abbruch { grund } => {
                if let Some(session) = self.inner.sessions.get(&von) {
                    tracing::info!(von = %von, grund = %grund, "Verhandlung von Gegenseite abgebrochen");
                    if let Some(kanal) = &session.kanal {
                        kanal.schliessen();
                    }
                    session.zustand_setzen(PeerZustand::Fehlgeschlagen);
                }
                Ok(())
            }
        }
    }

    /// Bringt einen ausgehandelten Datenkanal an der Session an
    ///
    /// Markiert die Session als verbunden und startet den Lese-Task der
    /// eingehende Envelopes an die Abonnenten verteilt.
    pub fn kanal_einsetzen(
        &self,
        peer_id: UserId,
        kanal: DataChannelHandle,
        mut eingang: mpsc::Receiver<Vec<u8>>,
    ) {
        match self.inner.sessions.entry(peer_id) {
            Entry::Occupied(mut eintrag) => {
                let session = eintrag.get_mut();
                session.kanal = Some(kanal);
                session.zustand_setzen(PeerZustand::Verbunden);
            }
            Entry::Vacant(eintrag) => {
                // Eingehender Aufbau ohne vorheriges eigenes Offer
                let mut session = PeerSession::neu(peer_id);
                session.kanal = Some(kanal);
                session.zustand_setzen(PeerZustand::Verbunden);
                eintrag.insert(session);
            }
        }
        tracing::info!(peer = %peer_id, "Datenkanal angebracht");

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            while let Some(bytes) = eingang.recv().await {
                let envelope = std::str::from_utf8(&bytes)
                    .ok()
                    .and_then(|text| EncryptedEnvelope::aus_json(text).ok());

                match envelope {
                    Some(envelope) => {
                        let _ = inner.eingang_tx.send(EingehendeNachricht {
                            von: peer_id,
                            envelope,
                        });
                    }
                    None => {
                        tracing::warn!(peer = %peer_id, "Nicht dekodierbare Daten auf dem Kanal");
                    }
                }
            }

            if let Some(session) = inner.sessions.get(&peer_id) {
                if session.zustand() == PeerZustand::Verbunden {
                    session.zustand_setzen(PeerZustand::Geschlossen);
                }
            }
            tracing::debug!(peer = %peer_id, "Datenkanal geschlossen");
        });
    }

    /// Sendet ein Envelope ueber den offenen Datenkanal
    ///
    /// Ist der Kanal nicht offen, wird sofort abgewiesen – der Fallback
    /// auf den Server-Weg ist Sache des Transport-Selectors.
    pub fn envelope_ueber_kanal_senden(
        &self,
        peer_id: &UserId,
        envelope: &EncryptedEnvelope,
    ) -> PeerResult<()> {
        let kanal = {
            let session = self
                .inner
                .sessions
                .get(peer_id)
                .ok_or(PeerError::KeineSession(*peer_id))?;
            session
                .kanal
                .clone()
                .ok_or(PeerError::KeineSession(*peer_id))?
        };

        let json = envelope
            .als_json()
            .map_err(|e| PeerError::UngueltigeNachricht(e.to_string()))?;
        kanal.senden(json.into_bytes())
    }

    /// Prueft ob zu diesem Peer eine sendebereite Session existiert
    pub fn session_bereit(&self, peer_id: &UserId) -> bool {
        self.inner
            .sessions
            .get(peer_id)
            .map(|session| session.ist_bereit())
            .unwrap_or(false)
    }

    /// Gibt den Zustand der Session zu diesem Peer zurueck
    pub fn session_zustand(&self, peer_id: &UserId) -> Option<PeerZustand> {
        self.inner.sessions.get(peer_id).map(|s| s.zustand())
    }

    /// Gibt die verbrauchten Wiederholungsversuche zurueck
    pub fn reconnect_versuche(&self, peer_id: &UserId) -> Option<u32> {
        self.inner
            .sessions
            .get(peer_id)
            .map(|s| s.reconnect_versuche)
    }

    /// Trennt die Session zu einem Peer und meldet den Abbruch
    pub async fn trennen(&self, peer_id: &UserId) {
        if let Some((_, session)) = self.inner.sessions.remove(peer_id) {
            if let Some(kanal) = &session.kanal {
                kanal.schliessen();
            }
            let _ = self
                .inner
                .signaling
                .signal_senden(
                    *peer_id,
                    SignalInhalt::Abbruch {
                        grund: "Verbindung getrennt".into(),
                    },
                )
                .await;
            tracing::info!(peer = %peer_id, "Peer-Session getrennt");
        }
    }

    /// Trennt alle Sessions
    pub async fn alle_trennen(&self) {
        let peer_ids: Vec<UserId> = self.inner.sessions.iter().map(|e| *e.key()).collect();
        for peer_id in peer_ids {
            self.trennen(&peer_id).await;
        }
    }
}

// Der Manager ist das Peer-Netz aus Sicht des Transport-Selectors
impl<S: SignalTransport + Send + Sync + 'static> PeerNetz for PeerConnectionManager<S> {
    fn ist_bereit(&self, peer_id: &UserId) -> bool {
        self.session_bereit(peer_id)
    }

    async fn envelope_senden(
        &self,
        peer_id: &UserId,
        envelope: &EncryptedEnvelope,
    ) -> TransportResult<()> {
        self.envelope_ueber_kanal_senden(peer_id, envelope)
            .map_err(|e| TransportError::Peer(e.to_string()))
    }
}
