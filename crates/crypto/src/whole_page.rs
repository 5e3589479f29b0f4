//! Verschluesselung ganzer Seiten-Payloads
//!
//! Fuer Szenarien die einen einzelnen verschluesselten Blob statt
//! einzelner Nachrichten-Envelopes brauchen (z.B. Offline-Snapshot einer
//! kompletten Seite). Der Payload wird als JSON serialisiert, als Ganzes
//! verschluesselt und in einen selbstbeschreibenden Container verpackt.
//!
//! ## Container-Format
//! ```json
//! { "verschluesselter_inhalt": "...", "iv": "...", "salt": "...", "zeitstempel": "..." }
//! ```
//! Alle Binaerfelder sind Base64-kodiert, der Zeitstempel ist RFC 3339.

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::cipher::{entschluesseln, verschluesseln};
use crate::error::CryptoResult;
use crate::types::{EncryptionKey, Iv};

/// Selbstbeschreibender Container fuer einen verschluesselten Seiten-Payload
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SeitenContainer {
    /// Base64-kodierter Ciphertext inkl. Auth-Tag
    verschluesselter_inhalt: String,
    /// Base64-kodierte IV
    iv: String,
    /// Salt fuer abgeleitete Schluessel, wird im Container mitgefuehrt
    salt: String,
    /// Zeitpunkt der Verschluesselung
    zeitstempel: DateTime<Utc>,
}

/// Verschluesselt einen kompletten Seiten-Payload zu einem JSON-Container
pub fn seite_verschluesseln(
    daten: &serde_json::Value,
    key: &EncryptionKey,
) -> CryptoResult<String> {
    let json = serde_json::to_vec(daten)?;
    let (ciphertext, iv) = verschluesseln(&json, key)?;

    let mut salt = [0u8; 16];
    OsRng.fill_bytes(&mut salt);

    let container = SeitenContainer {
        verschluesselter_inhalt: general_purpose::STANDARD.encode(&ciphertext),
        iv: iv.als_base64(),
        salt: general_purpose::STANDARD.encode(salt),
        zeitstempel: Utc::now(),
    };

    Ok(serde_json::to_string(&container)?)
}

/// Entschluesselt einen Seiten-Container zurueck in den Ziel-Typ
pub fn seite_entschluesseln<T: DeserializeOwned>(
    container_json: &str,
    key: &EncryptionKey,
) -> CryptoResult<T> {
    let container: SeitenContainer = serde_json::from_str(container_json)?;

    let ciphertext = general_purpose::STANDARD.decode(&container.verschluesselter_inhalt)?;
    let iv = Iv::aus_base64(&container.iv)?;

    let plaintext = entschluesseln(&ciphertext, &iv, key)?;
    Ok(serde_json::from_slice(&plaintext)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CryptoError;
    use crate::types::KeyAlgorithmus;
    use serde_json::json;
    use snakkaz_core::KeyId;

    fn test_key() -> EncryptionKey {
        EncryptionKey::zufaellig(KeyId::neu("seite"), KeyAlgorithmus::Aes256Gcm)
    }

    #[test]
    fn seiten_roundtrip() {
        let key = test_key();
        let daten = json!({
            "titel": "Innboks",
            "nachrichten": [{"von": "kari", "text": "hei"}, {"von": "ola", "text": "hallo"}],
            "anzahl": 2,
        });

        let container = seite_verschluesseln(&daten, &key).unwrap();
        let wieder: serde_json::Value = seite_entschluesseln(&container, &key).unwrap();

        assert_eq!(wieder, daten);
    }

    #[test]
    fn container_enthaelt_metadaten() {
        let key = test_key();
        let container = seite_verschluesseln(&json!({"a": 1}), &key).unwrap();

        let geparst: serde_json::Value = serde_json::from_str(&container).unwrap();
        assert!(geparst.get("verschluesselter_inhalt").is_some());
        assert!(geparst.get("iv").is_some());
        assert!(geparst.get("salt").is_some());
        assert!(geparst.get("zeitstempel").is_some());
    }

    #[test]
    fn klartext_taucht_nicht_im_container_auf() {
        let key = test_key();
        let container = seite_verschluesseln(&json!({"geheim": "passord123"}), &key).unwrap();
        assert!(!container.contains("passord123"));
    }

    #[test]
    fn falscher_schluessel_schlaegt_fehl() {
        let key1 = test_key();
        let key2 = EncryptionKey::zufaellig(KeyId::neu("anders"), KeyAlgorithmus::Aes256Gcm);

        let container = seite_verschluesseln(&json!({"a": 1}), &key1).unwrap();
        let result: CryptoResult<serde_json::Value> = seite_entschluesseln(&container, &key2);

        assert!(matches!(result, Err(CryptoError::Entschluesselung(_))));
    }

    #[test]
    fn kaputter_container_schlaegt_fehl() {
        let key = test_key();
        let result: CryptoResult<serde_json::Value> =
            seite_entschluesseln("kein json", &key);
        assert!(result.is_err());
    }

    #[test]
    fn typisierte_entschluesselung() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Snapshot {
            titel: String,
            anzahl: u32,
        }

        let key = test_key();
        let original = Snapshot {
            titel: "Chat".into(),
            anzahl: 7,
        };

        let container =
            seite_verschluesseln(&serde_json::to_value(&original).unwrap(), &key).unwrap();
        let wieder: Snapshot = seite_entschluesseln(&container, &key).unwrap();

        assert_eq!(wieder, original);
    }
}
