//! Presence-Manager – Verwaltet Online-Status pro Benutzer
//!
//! Haelt den ephemeren Status aller bekannten Benutzer und benachrichtigt
//! Subscriber bei Aenderungen. Der Zustand ist rein beobachtend – er wird
//! nicht persistiert und beeinflusst die Nachrichten-Zustellung nicht.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use snakkaz_core::UserId;
use std::sync::Arc;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Status und Events
// ---------------------------------------------------------------------------

/// Online-Status eines Benutzers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BenutzerStatus {
    #[default]
    Online,
    Abwesend,
    Beschaeftigt,
    Offline,
}

impl std::fmt::Display for BenutzerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BenutzerStatus::Online => write!(f, "online"),
            BenutzerStatus::Abwesend => write!(f, "abwesend"),
            BenutzerStatus::Beschaeftigt => write!(f, "beschaeftigt"),
            BenutzerStatus::Offline => write!(f, "offline"),
        }
    }
}

/// Events die der PresenceManager versendet
#[derive(Debug, Clone)]
pub enum PresenceEvent {
    /// Benutzer hat sich verbunden
    BenutzerVerbunden { user_id: UserId },
    /// Benutzer hat sich getrennt
    BenutzerGetrennt { user_id: UserId },
    /// Status-Aenderung eines verbundenen Benutzers
    StatusGeaendert {
        user_id: UserId,
        status: BenutzerStatus,
    },
}

/// Presence-Info eines bekannten Benutzers
#[derive(Debug, Clone)]
pub struct BenutzerPresence {
    pub user_id: UserId,
    pub status: BenutzerStatus,
}

// ---------------------------------------------------------------------------
// PresenceManager
// ---------------------------------------------------------------------------

/// Groesse des Broadcast-Kanals fuer Presence-Events
const EVENT_KANAL_GROESSE: usize = 256;

/// Verwaltet den Online-Status aller bekannten Benutzer
///
/// Thread-safe via Arc + DashMap. Clone des Managers teilt den inneren
/// Zustand.
#[derive(Clone)]
pub struct PresenceManager {
    inner: Arc<PresenceManagerInner>,
}

struct PresenceManagerInner {
    /// Verbundene Benutzer, indiziert nach UserId
    benutzer: DashMap<UserId, BenutzerPresence>,
    /// Broadcast-Sender fuer Presence-Events
    event_tx: broadcast::Sender<PresenceEvent>,
}

impl PresenceManager {
    /// Erstellt einen neuen PresenceManager
    pub fn neu() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_KANAL_GROESSE);
        Self {
            inner: Arc::new(PresenceManagerInner {
                benutzer: DashMap::new(),
                event_tx,
            }),
        }
    }

    /// Registriert einen Benutzer als online
    pub fn benutzer_verbunden(&self, user_id: UserId) {
        self.inner.benutzer.insert(
            user_id,
            BenutzerPresence {
                user_id,
                status: BenutzerStatus::Online,
            },
        );

        tracing::info!(user_id = %user_id, "Benutzer online");
        let _ = self
            .inner
            .event_tx
            .send(PresenceEvent::BenutzerVerbunden { user_id });
    }

    /// Entfernt einen Benutzer (Verbindung getrennt)
    pub fn benutzer_getrennt(&self, user_id: &UserId) {
        if self.inner.benutzer.remove(user_id).is_some() {
            tracing::info!(user_id = %user_id, "Benutzer offline");
            let _ = self
                .inner
                .event_tx
                .send(PresenceEvent::BenutzerGetrennt { user_id: *user_id });
        }
    }

    /// Setzt den Status eines verbundenen Benutzers
    ///
    /// `Offline` entfernt den Benutzer wie eine Trennung. Status-Updates
    /// fuer unbekannte Benutzer werden ignoriert.
    pub fn status_setzen(&self, user_id: UserId, status: BenutzerStatus) {
        if status == BenutzerStatus::Offline {
            self.benutzer_getrennt(&user_id);
            return;
        }

        match self.inner.benutzer.get_mut(&user_id) {
            Some(mut eintrag) => {
                eintrag.status = status;
            }
            None => {
                tracing::warn!(user_id = %user_id, "Status-Update fuer unbekannten Benutzer");
                return;
            }
        }

        let _ = self
            .inner
            .event_tx
            .send(PresenceEvent::StatusGeaendert { user_id, status });
    }

    /// Gibt den Status eines Benutzers zurueck (`Offline` wenn unbekannt)
    pub fn status_von(&self, user_id: &UserId) -> BenutzerStatus {
        self.inner
            .benutzer
            .get(user_id)
            .map(|e| e.status)
            .unwrap_or(BenutzerStatus::Offline)
    }

    /// Prueft ob ein Benutzer online ist (Status ungleich Offline)
    pub fn ist_online(&self, user_id: &UserId) -> bool {
        self.inner.benutzer.contains_key(user_id)
    }

    /// Gibt alle verbundenen Benutzer zurueck
    pub fn alle_online(&self) -> Vec<BenutzerPresence> {
        self.inner
            .benutzer
            .iter()
            .map(|e| e.value().clone())
            .collect()
    }

    /// Gibt die Anzahl der verbundenen Benutzer zurueck
    pub fn online_anzahl(&self) -> usize {
        self.inner.benutzer.len()
    }

    /// Abonniert Presence-Events
    pub fn events_abonnieren(&self) -> broadcast::Receiver<PresenceEvent> {
        self.inner.event_tx.subscribe()
    }
}

impl Default for PresenceManager {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
