//! In-Memory-Vermittler fuer Peer-Verbindungen
//!
//! Der Vermittler ist der prozesslokale Stand-in fuer die
//! Browser-Netzwerkschicht: er routet Signaling-Nachrichten zwischen
//! registrierten Managern und bringt bei erfolgreicher Verhandlung das
//! Datenkanal-Paar an beiden Seiten an. Einzelne Peers lassen sich
//! blockieren um Netzstoerungen (Timeout, Reconnect, Fallback) zu
//! erzwingen.

use std::sync::Arc;

use dashmap::DashMap;

use snakkaz_core::UserId;
use snakkaz_protocol::SignalInhalt;

use crate::channel::datachannel_paar;
use crate::error::PeerResult;
use crate::manager::{PeerConnectionManager, PeerKonfiguration};
use crate::signaling::SignalTransport;

/// Vermittelt Signale und Datenkanaele zwischen Managern im Prozess
#[derive(Clone, Default)]
pub struct PeerVermittler {
    inner: Arc<VermittlerInner>,
}

#[derive(Default)]
struct VermittlerInner {
    manager: DashMap<UserId, PeerConnectionManager<VermittlerAnschluss>>,
    /// Peers die keine Signale erhalten (simulierte Netzstoerung)
    blockiert: DashMap<UserId, ()>,
}

impl PeerVermittler {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Erstellt und registriert einen Manager fuer diesen Benutzer
    pub fn manager_erstellen(
        &self,
        eigene_id: UserId,
        konfig: PeerKonfiguration,
    ) -> PeerConnectionManager<VermittlerAnschluss> {
        let anschluss = VermittlerAnschluss {
            vermittler: self.clone(),
            eigene_id,
        };
        let manager = PeerConnectionManager::neu(eigene_id, konfig, anschluss);
        self.inner.manager.insert(eigene_id, manager.clone());
        tracing::debug!(user_id = %eigene_id, "Manager beim Vermittler registriert");
        manager
    }

    /// Blockiert alle Signale von und zu diesem Peer
    pub fn blockieren(&self, user_id: UserId) {
        self.inner.blockiert.insert(user_id, ());
    }

    /// Hebt eine Blockade wieder auf
    pub fn freigeben(&self, user_id: &UserId) {
        self.inner.blockiert.remove(user_id);
    }

    /// Routet ein Signal zum Ziel-Manager
    ///
    /// Bei einem Answer wird vor der Zustellung das Datenkanal-Paar an
    /// beiden Seiten angebracht – das Gegenstueck zum erfolgreichen
    /// ICE-Abschluss.
    fn zustellen(&self, von: UserId, an: UserId, inhalt: SignalInhalt) {
        if self.inner.blockiert.contains_key(&an) || self.inner.blockiert.contains_key(&von) {
            tracing::trace!(von = %von, an = %an, "Signal verworfen (blockiert)");
            return;
        }

        let Some(ziel) = self.inner.manager.get(&an).map(|m| m.clone()) else {
            tracing::debug!(an = %an, "Signal an unbekannten Manager");
            return;
        };

        if matches!(inhalt, SignalInhalt::Answer { .. }) {
            let initiator = self.inner.manager.get(&an).map(|m| m.clone());
            let antwortender = self.inner.manager.get(&von).map(|m| m.clone());

            if let (Some(initiator), Some(antwortender)) = (initiator, antwortender) {
                if !initiator.session_bereit(&von) || !antwortender.session_bereit(&an) {
                    let ((kanal_a, eingang_a), (kanal_b, eingang_b)) = datachannel_paar();
                    antwortender.kanal_einsetzen(an, kanal_b, eingang_b);
                    initiator.kanal_einsetzen(von, kanal_a, eingang_a);
                }
            }
        }

        // Zustellung asynchron, wie ueber ein echtes Netz
        tokio::spawn(async move {
            if let Err(e) = ziel.signal_verarbeiten(von, inhalt).await {
                tracing::warn!(von = %von, an = %an, fehler = %e, "Signal-Verarbeitung fehlgeschlagen");
            }
        });
    }
}

/// Anschluss eines Managers an den Vermittler
pub struct VermittlerAnschluss {
    vermittler: PeerVermittler,
    eigene_id: UserId,
}

impl SignalTransport for VermittlerAnschluss {
    async fn signal_senden(&self, an: UserId, inhalt: SignalInhalt) -> PeerResult<()> {
        self.vermittler.zustellen(self.eigene_id, an, inhalt);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
