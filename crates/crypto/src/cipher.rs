//! Nachrichten-Verschluesselung
//!
//! Verschluesselt einzelne Nachrichten-Payloads mit dem Konversations-
//! Schluessel. Pro Aufruf wird eine frische zufaellige 96-Bit-IV erzeugt;
//! der Auth-Tag (16 Bytes) wird vom AEAD an den Ciphertext angehaengt.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce as AesNonce,
};
use chacha20poly1305::{ChaCha20Poly1305, Key as ChaChaKey, Nonce as ChaChaNonce};

use crate::error::{CryptoError, CryptoResult};
use crate::types::{EncryptionKey, Iv, KeyAlgorithmus};

/// Verschluesselt einen Nachrichten-Payload
///
/// Gibt Ciphertext (inkl. Auth-Tag) und die frisch erzeugte IV zurueck.
/// Die IV darf vom Aufrufer weder gecacht noch vorhergesagt werden.
pub fn verschluesseln(plaintext: &[u8], key: &EncryptionKey) -> CryptoResult<(Vec<u8>, Iv)> {
    if !key.verwendung.darf_verschluesseln() {
        return Err(CryptoError::VerwendungNichtErlaubt {
            key_id: key.key_id.as_str().to_string(),
            operation: "verschluesseln".into(),
        });
    }

    let iv = Iv::zufaellig();

    let ciphertext = match key.algorithmus {
        KeyAlgorithmus::Aes256Gcm => {
            verschluesseln_aes256gcm(plaintext, key.key_bytes.as_bytes(), iv.as_bytes())?
        }
        KeyAlgorithmus::ChaCha20Poly1305 => {
            verschluesseln_chacha20(plaintext, key.key_bytes.as_bytes(), iv.as_bytes())?
        }
    };

    Ok((ciphertext, iv))
}

/// Entschluesselt einen Nachrichten-Payload
///
/// Schlaegt mit `CryptoError::Entschluesselung` fehl wenn der Auth-Tag
/// nicht verifiziert (falscher Schluessel, beschaedigter Ciphertext oder
/// Manipulation). Der Fehler ist fuer Aufrufer unterscheidbar, damit die UI
/// "Nachricht konnte nicht entschluesselt werden" anzeigen kann.
pub fn entschluesseln(ciphertext: &[u8], iv: &Iv, key: &EncryptionKey) -> CryptoResult<Vec<u8>> {
    if !key.verwendung.darf_entschluesseln() {
        return Err(CryptoError::VerwendungNichtErlaubt {
            key_id: key.key_id.as_str().to_string(),
            operation: "entschluesseln".into(),
        });
    }

    match key.algorithmus {
        KeyAlgorithmus::Aes256Gcm => {
            entschluesseln_aes256gcm(ciphertext, key.key_bytes.as_bytes(), iv.as_bytes())
        }
        KeyAlgorithmus::ChaCha20Poly1305 => {
            entschluesseln_chacha20(ciphertext, key.key_bytes.as_bytes(), iv.as_bytes())
        }
    }
}

fn verschluesseln_aes256gcm(
    plaintext: &[u8],
    key_bytes: &[u8],
    nonce_bytes: &[u8; 12],
) -> CryptoResult<Vec<u8>> {
    if key_bytes.len() != 32 {
        return Err(CryptoError::UngueltigeSchluesselLaenge {
            erwartet: 32,
            erhalten: key_bytes.len(),
        });
    }

    let key = Key::<Aes256Gcm>::from_slice(key_bytes);
    let cipher = Aes256Gcm::new(key);
    let nonce = AesNonce::from_slice(nonce_bytes);

    cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::Verschluesselung(e.to_string()))
}

fn entschluesseln_aes256gcm(
    ciphertext: &[u8],
    key_bytes: &[u8],
    nonce_bytes: &[u8; 12],
) -> CryptoResult<Vec<u8>> {
    if key_bytes.len() != 32 {
        return Err(CryptoError::UngueltigeSchluesselLaenge {
            erwartet: 32,
            erhalten: key_bytes.len(),
        });
    }

    let key = Key::<Aes256Gcm>::from_slice(key_bytes);
    let cipher = Aes256Gcm::new(key);
    let nonce = AesNonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| CryptoError::Entschluesselung(e.to_string()))
}

fn verschluesseln_chacha20(
    plaintext: &[u8],
    key_bytes: &[u8],
    nonce_bytes: &[u8; 12],
) -> CryptoResult<Vec<u8>> {
    if key_bytes.len() != 32 {
        return Err(CryptoError::UngueltigeSchluesselLaenge {
            erwartet: 32,
            erhalten: key_bytes.len(),
        });
    }

    let key = ChaChaKey::from_slice(key_bytes);
    let cipher = ChaCha20Poly1305::new(key);
    let nonce = ChaChaNonce::from_slice(nonce_bytes);

    cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::Verschluesselung(e.to_string()))
}

fn entschluesseln_chacha20(
    ciphertext: &[u8],
    key_bytes: &[u8],
    nonce_bytes: &[u8; 12],
) -> CryptoResult<Vec<u8>> {
    if key_bytes.len() != 32 {
        return Err(CryptoError::UngueltigeSchluesselLaenge {
            erwartet: 32,
            erhalten: key_bytes.len(),
        });
    }

    let key = ChaChaKey::from_slice(key_bytes);
    let cipher = ChaCha20Poly1305::new(key);
    let nonce = ChaChaNonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| CryptoError::Entschluesselung(e.to_string()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
