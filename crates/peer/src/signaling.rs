//! Signal-Transport fuer den Peer-Verbindungsaufbau
//!
//! Das `SignalTransport`-Trait abstrahiert den Weg ueber den
//! Offer/Answer/Kandidaten-Nachrichten den Gegenpart erreichen. In
//! Produktion laufen Signale als unverschluesselte System-Envelopes ueber
//! das Server-Relay; einen eigenstaendigen Signaling-Server gibt es nicht.

use snakkaz_core::UserId;
use snakkaz_protocol::{Empfaenger, EncryptedEnvelope, SignalInhalt, SignalNachricht};
use snakkaz_transport::ServerRelay;

use crate::error::{PeerError, PeerResult};

/// Abstrakter Transport fuer Signaling-Nachrichten
#[allow(async_fn_in_trait)]
pub trait SignalTransport: Send + Sync {
    /// Stellt einen Signal-Inhalt an den Gegenpart zu
    async fn signal_senden(&self, an: UserId, inhalt: SignalInhalt) -> PeerResult<()>;
}

/// Signal-Transport ueber das Server-Relay
pub struct RelaySignaling<R: ServerRelay> {
    eigene_id: UserId,
    relay: R,
}

impl<R: ServerRelay> RelaySignaling<R> {
    /// Erstellt einen Relay-gestuetzten Signal-Transport
    pub fn neu(eigene_id: UserId, relay: R) -> Self {
        Self { eigene_id, relay }
    }
}

impl<R: ServerRelay> SignalTransport for RelaySignaling<R> {
    async fn signal_senden(&self, an: UserId, inhalt: SignalInhalt) -> PeerResult<()> {
        let nachricht = SignalNachricht::neu(self.eigene_id, an, inhalt);
        let json = nachricht
            .als_json()
            .map_err(|e| PeerError::Signal(e.to_string()))?;

        let envelope =
            EncryptedEnvelope::unverschluesselt(self.eigene_id, Empfaenger::Benutzer(an), json.as_bytes());

        self.relay
            .einliefern(&envelope)
            .await
            .map_err(|e| PeerError::Signal(e.to_string()))
    }
}

/// Liest eine Signaling-Nachricht aus einem Relay-Envelope
///
/// Gibt `None` zurueck wenn das Envelope keine Signaling-Nachricht traegt
/// (verschluesselte Nachrichten-Envelopes laufen ueber dasselbe Relay).
pub fn signal_aus_envelope(envelope: &EncryptedEnvelope) -> Option<SignalNachricht> {
    if envelope.ist_verschluesselt {
        return None;
    }
    let bytes = envelope.inhalt_bytes().ok()?;
    let text = String::from_utf8(bytes).ok()?;
    SignalNachricht::aus_json(&text).ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
