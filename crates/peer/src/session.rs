//! Peer-Session – Zustand einer Verbindung zu einem Gegenpart
//!
//! Pro Gegenpart existiert hoechstens eine Session. Ein neuer
//! Verbindungsversuch zum selben Gegenpart loest eine bestehende Session
//! ab, er dupliziert sie nie.
//!
//! ## Zustandsmaschine
//! ```text
//! Neu -> Verbindet -> Verbunden          (Erfolg)
//!           |             |
//!           v             v
//!     Fehlgeschlagen  Geschlossen
//! ```
//! `Fehlgeschlagen` gilt dauerhaft bis zum naechsten expliziten
//! Verbindungsversuch.

use tokio::sync::watch;

use snakkaz_core::UserId;

use crate::channel::DataChannelHandle;

/// Zustand einer Peer-Session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerZustand {
    /// Session angelegt, noch kein Versuch gestartet
    Neu,
    /// Verhandlung laeuft (Offer/Answer/Kandidaten)
    Verbindet,
    /// Datenkanal angebracht, sendebereit
    Verbunden,
    /// Versuche erschoepft oder Abbruch durch die Gegenseite
    Fehlgeschlagen,
    /// Datenkanal geschlossen
    Geschlossen,
}

impl std::fmt::Display for PeerZustand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeerZustand::Neu => write!(f, "neu"),
            PeerZustand::Verbindet => write!(f, "verbindet"),
            PeerZustand::Verbunden => write!(f, "verbunden"),
            PeerZustand::Fehlgeschlagen => write!(f, "fehlgeschlagen"),
            PeerZustand::Geschlossen => write!(f, "geschlossen"),
        }
    }
}

/// Eine aktive oder versuchte Verbindung zu einem Gegenpart
pub struct PeerSession {
    pub peer_id: UserId,
    /// Zustand als watch-Kanal, damit Wartende auf Uebergaenge reagieren
    zustand_tx: watch::Sender<PeerZustand>,
    /// Anzahl der bereits verbrauchten Wiederholungsversuche
    pub reconnect_versuche: u32,
    /// Angebrachter Datenkanal (nur im Zustand Verbunden gesetzt)
    pub kanal: Option<DataChannelHandle>,
    /// Gesammelte ICE-Kandidaten der Gegenseite
    pub kandidaten: Vec<String>,
}

impl PeerSession {
    /// Erstellt eine frische Session im Zustand `Neu`
    pub fn neu(peer_id: UserId) -> Self {
        let (zustand_tx, _) = watch::channel(PeerZustand::Neu);
        Self {
            peer_id,
            zustand_tx,
            reconnect_versuche: 0,
            kanal: None,
            kandidaten: Vec::new(),
        }
    }

    /// Gibt den aktuellen Zustand zurueck
    pub fn zustand(&self) -> PeerZustand {
        *self.zustand_tx.borrow()
    }

    /// Setzt den Zustand und weckt alle Wartenden
    pub fn zustand_setzen(&self, zustand: PeerZustand) {
        self.zustand_tx.send_replace(zustand);
    }

    /// Abonniert Zustands-Uebergaenge dieser Session
    pub fn zustand_abonnieren(&self) -> watch::Receiver<PeerZustand> {
        self.zustand_tx.subscribe()
    }

    /// Prueft ob die Session sendebereit ist
    pub fn ist_bereit(&self) -> bool {
        self.zustand() == PeerZustand::Verbunden
            && self.kanal.as_ref().map(|k| k.ist_offen()).unwrap_or(false)
    }
}

impl std::fmt::Debug for PeerSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerSession")
            .field("peer_id", &self.peer_id)
            .field("zustand", &self.zustand())
            .field("reconnect_versuche", &self.reconnect_versuche)
            .field("kanal", &self.kanal)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::datachannel_paar;

    #[test]
    fn frische_session_ist_neu() {
        let session = PeerSession::neu(UserId::new());
        assert_eq!(session.zustand(), PeerZustand::Neu);
        assert_eq!(session.reconnect_versuche, 0);
        assert!(!session.ist_bereit());
    }

    #[test]
    fn zustand_uebergang_sichtbar() {
        let session = PeerSession::neu(UserId::new());
        session.zustand_setzen(PeerZustand::Verbindet);
        assert_eq!(session.zustand(), PeerZustand::Verbindet);
    }

    #[tokio::test]
    async fn abonnenten_sehen_uebergaenge() {
        let session = PeerSession::neu(UserId::new());
        let mut rx = session.zustand_abonnieren();

        session.zustand_setzen(PeerZustand::Verbunden);
        let zustand = rx
            .wait_for(|z| *z == PeerZustand::Verbunden)
            .await
            .unwrap();
        assert_eq!(*zustand, PeerZustand::Verbunden);
    }

    #[test]
    fn bereit_nur_mit_offenem_kanal() {
        let mut session = PeerSession::neu(UserId::new());
        session.zustand_setzen(PeerZustand::Verbunden);
        assert!(!session.ist_bereit(), "ohne Kanal nicht bereit");

        let ((kanal, _rx), _gegenseite) = datachannel_paar();
        session.kanal = Some(kanal.clone());
        assert!(session.ist_bereit());

        kanal.schliessen();
        assert!(!session.ist_bereit(), "geschlossener Kanal ist nicht bereit");
    }
}
