//! Messenger – Orchestrierung von Schluessel, Cipher und Transport
//!
//! Der Sendepfad: Konversations-Schluessel aufloesen (oder erzeugen) ->
//! verschluesseln -> Envelope bauen -> Transport-Selector routet. Der
//! Empfangspfad laeuft invers: Schluessel zum Envelope aufloesen ->
//! entschluesseln -> Klartext.
//!
//! Alle Bausteine werden injiziert; der Messenger haelt keinen globalen
//! Zustand.

use std::sync::Arc;

use tokio::sync::broadcast;

use snakkaz_core::{GroupId, KeyId, Result, SnakkazError, SnakkazEvent, UserId, Zustellweg};
use snakkaz_crypto::{
    entschluesseln, schluessel_auspacken, schluessel_einpacken, verschluesseln, EncryptionKey,
    Iv, KeyAlgorithmus, KeyStorageBackend, KeyStore,
};
use snakkaz_protocol::{Empfaenger, EncryptedEnvelope};
use snakkaz_transport::{PeerNetz, ServerRelay, TransportError, TransportSelector};

/// Groesse des Broadcast-Kanals fuer Messenger-Events
const EVENT_KANAL_GROESSE: usize = 256;

/// Orchestriert Verschluesselung und Transport fuer einen Benutzer
pub struct Messenger<B: KeyStorageBackend, P: PeerNetz, R: ServerRelay> {
    benutzer_id: UserId,
    schluessel: Arc<KeyStore<B>>,
    selector: TransportSelector<P, R>,
    event_tx: broadcast::Sender<SnakkazEvent>,
}

impl<B: KeyStorageBackend, P: PeerNetz, R: ServerRelay> Messenger<B, P, R> {
    /// Erstellt einen neuen Messenger aus injizierten Bausteinen
    pub fn neu(
        benutzer_id: UserId,
        schluessel: Arc<KeyStore<B>>,
        selector: TransportSelector<P, R>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_KANAL_GROESSE);
        Self {
            benutzer_id,
            schluessel,
            selector,
            event_tx,
        }
    }

    pub fn benutzer_id(&self) -> UserId {
        self.benutzer_id
    }

    /// Abonniert Messenger-Events (gesendet/empfangen/unzustellbar)
    pub fn events_abonnieren(&self) -> broadcast::Receiver<SnakkazEvent> {
        self.event_tx.subscribe()
    }

    /// Deterministischer Schluessel-Bezeichner einer Direkt-Konversation
    ///
    /// Beide Seiten leiten denselben Bezeichner ab, unabhaengig davon wer
    /// zuerst schreibt.
    pub fn konversations_key_id(a: &UserId, b: &UserId) -> KeyId {
        let (kleiner, groesser) = if a.inner() <= b.inner() {
            (a, b)
        } else {
            (b, a)
        };
        KeyId::neu(format!("konv_{}_{}", kleiner.inner(), groesser.inner()))
    }

    /// Schluessel-Bezeichner einer Gruppe
    pub fn gruppen_key_id(gruppe: &GroupId) -> KeyId {
        KeyId::neu(format!("gruppe_{}", gruppe.inner()))
    }

    /// Sendet eine Direkt-Nachricht
    ///
    /// Gibt das versendete Envelope und den verwendeten Weg zurueck.
    pub async fn direkt_senden(
        &self,
        an: UserId,
        text: &str,
    ) -> Result<(EncryptedEnvelope, Zustellweg)> {
        let key_id = Self::konversations_key_id(&self.benutzer_id, &an);
        self.senden(Empfaenger::Benutzer(an), key_id, text).await
    }

    /// Sendet eine Gruppen-Nachricht
    pub async fn gruppe_senden(
        &self,
        gruppe: GroupId,
        text: &str,
    ) -> Result<(EncryptedEnvelope, Zustellweg)> {
        let key_id = Self::gruppen_key_id(&gruppe);
        self.senden(Empfaenger::Gruppe(gruppe), key_id, text).await
    }

    async fn senden(
        &self,
        empfaenger: Empfaenger,
        key_id: KeyId,
        text: &str,
    ) -> Result<(EncryptedEnvelope, Zustellweg)> {
        let konfig = self.selector.konfig().schnappschuss();

        let envelope = if konfig.server_nachrichten_verschluesseln {
            let key = self.schluessel_aufloesen_oder_erzeugen(key_id).await?;
            let (ciphertext, iv) = verschluesseln(text.as_bytes(), &key)
                .map_err(|e| SnakkazError::Verschluesselung(e.to_string()))?;
            EncryptedEnvelope::neu(
                self.benutzer_id,
                empfaenger,
                key.key_id.clone(),
                &ciphertext,
                iv.as_bytes(),
            )
        } else {
            EncryptedEnvelope::unverschluesselt(self.benutzer_id, empfaenger, text.as_bytes())
        };

        match self.selector.senden(&envelope).await {
            Ok(weg) => {
                tracing::debug!(envelope_id = %envelope.id, weg = %weg, "Nachricht versendet");
                let _ = self.event_tx.send(SnakkazEvent::NachrichtGesendet {
                    envelope_id: envelope.id,
                    weg,
                });
                Ok((envelope, weg))
            }
            Err(e) => {
                let grund = e.to_string();
                tracing::warn!(envelope_id = %envelope.id, grund = %grund, "Nachricht nicht zustellbar");
                let _ = self.event_tx.send(SnakkazEvent::NachrichtUnzustellbar {
                    envelope_id: envelope.id,
                    grund: grund.clone(),
                });
                Err(match e {
                    TransportError::Unzustellbar { grund } => SnakkazError::Unzustellbar(grund),
                    sonst => SnakkazError::Verbindung(sonst.to_string()),
                })
            }
        }
    }

    /// Entschluesselt ein eingegangenes Envelope zum Klartext
    ///
    /// Ein fehlender Schluessel und ein fehlschlagender Auth-Tag sind
    /// unterscheidbare Fehler, damit die UI "Nachricht konnte nicht
    /// entschluesselt werden" anzeigen kann statt abzustuerzen.
    pub async fn envelope_entschluesseln(&self, envelope: &EncryptedEnvelope) -> Result<String> {
        if !envelope.ist_verschluesselt {
            let bytes = envelope
                .inhalt_bytes()
                .map_err(|e| SnakkazError::UngueltigeNachricht(e.to_string()))?;
            let text = String::from_utf8(bytes)
                .map_err(|e| SnakkazError::UngueltigeNachricht(e.to_string()))?;
            let _ = self.event_tx.send(SnakkazEvent::NachrichtEmpfangen {
                envelope_id: envelope.id,
                von: envelope.sender_id,
            });
            return Ok(text);
        }

        let key_id = envelope.key_id.as_ref().ok_or_else(|| {
            SnakkazError::UngueltigeNachricht("Verschluesseltes Envelope ohne key_id".into())
        })?;

        let key = self
            .schluessel
            .schluessel_abrufen(key_id)
            .await
            .ok_or_else(|| SnakkazError::SchluesselNichtGefunden(key_id.as_str().to_string()))?;

        let iv_bytes = envelope
            .iv_bytes()
            .map_err(|e| SnakkazError::UngueltigeNachricht(e.to_string()))?;
        let iv = Iv::aus_bytes(&iv_bytes)
            .map_err(|e| SnakkazError::UngueltigeNachricht(e.to_string()))?;
        let ciphertext = envelope
            .inhalt_bytes()
            .map_err(|e| SnakkazError::UngueltigeNachricht(e.to_string()))?;

        let klartext = entschluesseln(&ciphertext, &iv, &key)
            .map_err(|e| SnakkazError::Entschluesselung(e.to_string()))?;

        let text = String::from_utf8(klartext)
            .map_err(|e| SnakkazError::UngueltigeNachricht(e.to_string()))?;

        let _ = self.event_tx.send(SnakkazEvent::NachrichtEmpfangen {
            envelope_id: envelope.id,
            von: envelope.sender_id,
        });
        Ok(text)
    }

    /// Packt den Konversations-Schluessel fuer einen Partner ein
    ///
    /// Das Ergebnis kann ueber einen beliebigen Weg zum Partner, der es mit
    /// `geteilten_schluessel_uebernehmen` importiert.
    pub async fn schluessel_teilen(
        &self,
        partner: &UserId,
        partner_public_key: &[u8; 32],
    ) -> Result<Vec<u8>> {
        let key_id = Self::konversations_key_id(&self.benutzer_id, partner);
        let key = self.schluessel_aufloesen_oder_erzeugen(key_id).await?;
        schluessel_einpacken(&key, partner_public_key)
            .map_err(|e| SnakkazError::Verschluesselung(e.to_string()))
    }

    /// Uebernimmt einen vom Partner geteilten Konversations-Schluessel
    pub async fn geteilten_schluessel_uebernehmen(
        &self,
        partner: &UserId,
        eingepackt: &[u8],
        eigener_private_key: &[u8; 32],
    ) -> Result<()> {
        let key_id = Self::konversations_key_id(&self.benutzer_id, partner);
        let key = schluessel_auspacken(
            eingepackt,
            eigener_private_key,
            key_id,
            KeyAlgorithmus::default(),
        )
        .map_err(|e| SnakkazError::Entschluesselung(e.to_string()))?;

        self.schluessel
            .schluessel_speichern(&key)
            .await
            .map_err(|e| SnakkazError::Intern(e.to_string()))
    }

    /// Loest einen Schluessel auf, erzeugt ihn bei Bedarf
    ///
    /// Ein fehlender Schluessel ist kein Fehler sondern der Ausloeser fuer
    /// die Erzeugung.
    async fn schluessel_aufloesen_oder_erzeugen(&self, key_id: KeyId) -> Result<EncryptionKey> {
        if let Some(key) = self.schluessel.schluessel_abrufen(&key_id).await {
            return Ok(key);
        }

        tracing::debug!(key_id = %key_id, "Konversations-Schluessel wird erzeugt");
        let key = EncryptionKey::zufaellig(key_id, KeyAlgorithmus::default());
        self.schluessel
            .schluessel_speichern(&key)
            .await
            .map_err(|e| SnakkazError::Intern(e.to_string()))?;
        Ok(key)
    }
}
