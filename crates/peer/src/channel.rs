//! Datenkanal-Abstraktion
//!
//! Ein Datenkanal ist die Duplex-Leitung zu einem verbundenen Peer.
//! Senden auf einem nicht-offenen Kanal wird sofort abgewiesen – der Kanal
//! puffert nichts intern, der Fallback auf andere Wege ist Sache des
//! Transport-Selectors.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::error::{PeerError, PeerResult};

/// Sendepuffer-Groesse pro Richtung
const KANAL_PUFFER_GROESSE: usize = 64;

/// Zustand eines Datenkanals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataChannelZustand {
    Verbindend,
    Offen,
    Schliessend,
    Geschlossen,
}

impl std::fmt::Display for DataChannelZustand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataChannelZustand::Verbindend => write!(f, "verbindend"),
            DataChannelZustand::Offen => write!(f, "offen"),
            DataChannelZustand::Schliessend => write!(f, "schliessend"),
            DataChannelZustand::Geschlossen => write!(f, "geschlossen"),
        }
    }
}

/// Sende-Seite eines Datenkanals
///
/// Beide Enden eines Kanal-Paars teilen sich den Zustand: schliesst eine
/// Seite, ist der Kanal fuer beide zu.
#[derive(Clone)]
pub struct DataChannelHandle {
    zustand: Arc<RwLock<DataChannelZustand>>,
    tx: mpsc::Sender<Vec<u8>>,
}

impl DataChannelHandle {
    /// Gibt den aktuellen Kanal-Zustand zurueck
    pub fn zustand(&self) -> DataChannelZustand {
        *self.zustand.read()
    }

    pub fn ist_offen(&self) -> bool {
        self.zustand() == DataChannelZustand::Offen
    }

    /// Sendet rohe Bytes ueber den Kanal
    ///
    /// Wird sofort abgewiesen wenn der Kanal nicht offen ist; es gibt
    /// keine interne Warteschlange ueber den Sendepuffer hinaus.
    pub fn senden(&self, daten: Vec<u8>) -> PeerResult<()> {
        let zustand = self.zustand();
        if zustand != DataChannelZustand::Offen {
            return Err(PeerError::KanalNichtOffen(zustand));
        }

        match self.tx.try_send(daten) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(PeerError::PufferVoll),
            Err(mpsc::error::TrySendError::Closed(_)) => {
                *self.zustand.write() = DataChannelZustand::Geschlossen;
                Err(PeerError::KanalNichtOffen(DataChannelZustand::Geschlossen))
            }
        }
    }

    /// Schliesst den Kanal fuer beide Seiten
    pub fn schliessen(&self) {
        let mut zustand = self.zustand.write();
        if *zustand != DataChannelZustand::Geschlossen {
            *zustand = DataChannelZustand::Geschlossen;
        }
    }
}

impl std::fmt::Debug for DataChannelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DataChannelHandle({})", self.zustand())
    }
}

/// Baut ein verbundenes Datenkanal-Paar
///
/// Gibt pro Seite das Sende-Handle und den Empfangs-Strom der Gegenrichtung
/// zurueck. Beide Richtungen sind geordnet und zuverlaessig (mpsc), wie ein
/// reliable-ordered konfigurierter Datenkanal.
pub fn datachannel_paar() -> (
    (DataChannelHandle, mpsc::Receiver<Vec<u8>>),
    (DataChannelHandle, mpsc::Receiver<Vec<u8>>),
) {
    let zustand = Arc::new(RwLock::new(DataChannelZustand::Offen));
    let (tx_ab, rx_ab) = mpsc::channel(KANAL_PUFFER_GROESSE);
    let (tx_ba, rx_ba) = mpsc::channel(KANAL_PUFFER_GROESSE);

    let seite_a = DataChannelHandle {
        zustand: Arc::clone(&zustand),
        tx: tx_ab,
    };
    let seite_b = DataChannelHandle {
        zustand,
        tx: tx_ba,
    };

    ((seite_a, rx_ba), (seite_b, rx_ab))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn paar_ist_offen_und_duplex() {
        let ((a, mut rx_a), (b, mut rx_b)) = datachannel_paar();
        assert!(a.ist_offen());
        assert!(b.ist_offen());

        a.senden(b"von a".to_vec()).unwrap();
        b.senden(b"von b".to_vec()).unwrap();

        assert_eq!(rx_b.recv().await.unwrap(), b"von a");
        assert_eq!(rx_a.recv().await.unwrap(), b"von b");
    }

    #[tokio::test]
    async fn geschlossener_kanal_weist_senden_ab() {
        let ((a, _rx_a), (b, _rx_b)) = datachannel_paar();
        a.schliessen();

        assert!(matches!(
            a.senden(b"x".to_vec()),
            Err(PeerError::KanalNichtOffen(DataChannelZustand::Geschlossen))
        ));
        // Die Gegenseite sieht die Schliessung ebenfalls
        assert!(matches!(
            b.senden(b"x".to_vec()),
            Err(PeerError::KanalNichtOffen(_))
        ));
    }

    #[tokio::test]
    async fn reihenfolge_bleibt_erhalten() {
        let ((a, _rx_a), (_b, mut rx_b)) = datachannel_paar();

        for i in 0u8..10 {
            a.senden(vec![i]).unwrap();
        }
        for i in 0u8..10 {
            assert_eq!(rx_b.recv().await.unwrap(), vec![i]);
        }
    }

    #[tokio::test]
    async fn voller_puffer_weist_ab() {
        let ((a, _rx_a), (_b, _rx_b)) = datachannel_paar();

        for _ in 0..64 {
            a.senden(b"fuellung".to_vec()).unwrap();
        }
        assert!(matches!(a.senden(b"x".to_vec()), Err(PeerError::PufferVoll)));
    }

    #[tokio::test]
    async fn weggeworfener_empfaenger_schliesst_kanal() {
        let ((a, _rx_a), (_b, rx_b)) = datachannel_paar();
        drop(rx_b);

        assert!(matches!(
            a.senden(b"x".to_vec()),
            Err(PeerError::KanalNichtOffen(_))
        ));
        assert_eq!(a.zustand(), DataChannelZustand::Geschlossen);
    }
}
