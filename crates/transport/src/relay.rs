//! Server-Relay – Einliefern und Zustellen von Envelopes
//!
//! Das `ServerRelay`-Trait ist die Schnittstelle zum autoritativen
//! Nachrichten-Backend: Einliefern entspricht dem Zeilen-Insert in die
//! Nachrichten-Tabelle, Abonnieren dem Realtime-Change-Feed darauf.
//!
//! `MemoryRelay` ist die prozesslokale Implementierung fuer Tests und den
//! Demo-Betrieb. Sie verwaltet pro Abonnent eine begrenzte Zustell-Queue
//! und eine Gruppen-Mitgliedschafts-Tabelle fuer den Faecher-Versand.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use snakkaz_core::{GroupId, UserId};
use snakkaz_protocol::{Empfaenger, EncryptedEnvelope};

use crate::error::TransportResult;

/// Groesse der Zustell-Queue pro Abonnent
const ZUSTELL_QUEUE_GROESSE: usize = 64;

/// Abstraktes Server-Relay
#[allow(async_fn_in_trait)]
pub trait ServerRelay: Send + Sync {
    /// Liefert ein Envelope beim Relay ein (Zeilen-Insert-Analogon)
    ///
    /// Einliefern gelingt auch wenn der Empfaenger gerade nicht abonniert
    /// ist – Zustellung an Offline-Empfaenger ist Sache des Backends.
    async fn einliefern(&self, envelope: &EncryptedEnvelope) -> TransportResult<()>;

    /// Abonniert alle kuenftigen Envelopes fuer einen Benutzer
    fn abonnieren(&self, user_id: UserId) -> mpsc::Receiver<EncryptedEnvelope>;

    /// Traegt einen Benutzer in eine Gruppe ein (fuer den Faecher-Versand)
    fn gruppe_beitreten(&self, user_id: UserId, gruppe: GroupId);

    /// Traegt einen Benutzer aus einer Gruppe aus
    fn gruppe_verlassen(&self, user_id: &UserId, gruppe: &GroupId);
}

// Ein geteiltes Relay hinter Arc ist selbst ein Relay
impl<R: ServerRelay> ServerRelay for Arc<R> {
    async fn einliefern(&self, envelope: &EncryptedEnvelope) -> TransportResult<()> {
        (**self).einliefern(envelope).await
    }

    fn abonnieren(&self, user_id: UserId) -> mpsc::Receiver<EncryptedEnvelope> {
        (**self).abonnieren(user_id)
    }

    fn gruppe_beitreten(&self, user_id: UserId, gruppe: GroupId) {
        (**self).gruppe_beitreten(user_id, gruppe)
    }

    fn gruppe_verlassen(&self, user_id: &UserId, gruppe: &GroupId) {
        (**self).gruppe_verlassen(user_id, gruppe)
    }
}

/// Prozesslokales Relay
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone, Default)]
pub struct MemoryRelay {
    inner: Arc<MemoryRelayInner>,
}

#[derive(Default)]
struct MemoryRelayInner {
    /// Zustell-Queues, indiziert nach UserId
    abonnenten: DashMap<UserId, mpsc::Sender<EncryptedEnvelope>>,
    /// Gruppen-Mitgliedschaft: gruppe -> Vec<UserId>
    gruppen: DashMap<GroupId, Vec<UserId>>,
}

impl MemoryRelay {
    /// Erstellt ein neues leeres Relay
    pub fn neu() -> Self {
        Self::default()
    }

    /// Gibt die Anzahl der aktiven Abonnenten zurueck
    pub fn abonnenten_anzahl(&self) -> usize {
        self.inner.abonnenten.len()
    }

    fn zustellen(&self, user_id: &UserId, envelope: EncryptedEnvelope) {
        match self.inner.abonnenten.get(user_id) {
            Some(tx) => match tx.try_send(envelope) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(user_id = %user_id, "Zustell-Queue voll – Envelope verworfen");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!(user_id = %user_id, "Zustell-Queue geschlossen (Abonnent weg)");
                    self.inner.abonnenten.remove(user_id);
                }
            },
            None => {
                tracing::debug!(user_id = %user_id, "Empfaenger nicht abonniert – Envelope bleibt liegen");
            }
        }
    }
}

impl ServerRelay for MemoryRelay {
    async fn einliefern(&self, envelope: &EncryptedEnvelope) -> TransportResult<()> {
        match envelope.empfaenger {
            Empfaenger::Benutzer(user_id) => {
                self.zustellen(&user_id, envelope.clone());
            }
            Empfaenger::Gruppe(gruppe) => {
                let mitglieder = self
                    .inner
                    .gruppen
                    .get(&gruppe)
                    .map(|m| m.clone())
                    .unwrap_or_default();

                // Der Absender hat den Klartext bereits lokal
                for mitglied in mitglieder {
                    if mitglied != envelope.sender_id {
                        self.zustellen(&mitglied, envelope.clone());
                    }
                }
            }
        }

        tracing::trace!(
            envelope_id = %envelope.id,
            empfaenger = %envelope.empfaenger,
            "Envelope eingeliefert"
        );
        Ok(())
    }

    fn abonnieren(&self, user_id: UserId) -> mpsc::Receiver<EncryptedEnvelope> {
        let (tx, rx) = mpsc::channel(ZUSTELL_QUEUE_GROESSE);
        self.inner.abonnenten.insert(user_id, tx);
        tracing::debug!(user_id = %user_id, "Abonnent registriert");
        rx
    }

    fn gruppe_beitreten(&self, user_id: UserId, gruppe: GroupId) {
        let mut mitglieder = self.inner.gruppen.entry(gruppe).or_default();
        if !mitglieder.contains(&user_id) {
            mitglieder.push(user_id);
        }
    }

    fn gruppe_verlassen(&self, user_id: &UserId, gruppe: &GroupId) {
        if let Some(mut mitglieder) = self.inner.gruppen.get_mut(gruppe) {
            mitglieder.retain(|uid| uid != user_id);
            let ist_leer = mitglieder.is_empty();
            drop(mitglieder);
            if ist_leer {
                self.inner.gruppen.remove(gruppe);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
