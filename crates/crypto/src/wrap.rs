//! Einpacken von Konversations-Schluesseln fuer Empfaenger
//!
//! Damit ein Konversations-Schluessel einen Empfaenger erreicht ohne je im
//! Klartext uebertragen zu werden, wird er per ECIES-aehnlichem Schema mit
//! dessen oeffentlichem X25519-Schluessel eingepackt:
//! 1. Ephemeres X25519-Schluessel-Paar generieren
//! 2. DH mit Empfaenger-Public-Key
//! 3. HKDF-SHA256 -> Wrapping Key
//! 4. AES-256-GCM verschluesseln
//!
//! ## Format
//! ```text
//! [ephemeral_public(32)] [iv(12)] [ciphertext + auth_tag(16)]
//! ```

use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use x25519_dalek::{EphemeralSecret, PublicKey as X25519PublicKey, StaticSecret};

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};

use snakkaz_core::KeyId;

use crate::error::{CryptoError, CryptoResult};
use crate::types::{EncryptionKey, KeyAlgorithmus, KeyVerwendung, SecretBytes};

const WRAP_INFO: &[u8] = b"snakkaz-key-wrap-v1";

/// Packt einen Konversations-Schluessel fuer einen Empfaenger ein
pub fn schluessel_einpacken(
    key: &EncryptionKey,
    empfaenger_public_key: &[u8; 32],
) -> CryptoResult<Vec<u8>> {
    // Ephemeres Schluessel-Paar
    let ephemeral_secret = EphemeralSecret::random_from_rng(OsRng);
    let ephemeral_public = X25519PublicKey::from(&ephemeral_secret);

    // DH-Austausch
    let empfaenger_pk = X25519PublicKey::from(*empfaenger_public_key);
    let dh_output = ephemeral_secret.diffie_hellman(&empfaenger_pk);

    // HKDF -> Wrapping Key (32 Bytes)
    let wrapping_key = hkdf_derive(dh_output.as_bytes(), empfaenger_public_key, WRAP_INFO, 32)?;

    // AES-256-GCM verschluesseln
    let cipher_key = Key::<Aes256Gcm>::from_slice(&wrapping_key);
    let cipher = Aes256Gcm::new(cipher_key);

    let mut iv_bytes = [0u8; 12];
    OsRng.fill_bytes(&mut iv_bytes);
    let nonce = Nonce::from_slice(&iv_bytes);

    let ciphertext = cipher
        .encrypt(nonce, key.key_bytes.as_bytes())
        .map_err(|e| CryptoError::Verschluesselung(e.to_string()))?;

    let mut out = Vec::with_capacity(32 + 12 + ciphertext.len());
    out.extend_from_slice(ephemeral_public.as_bytes());
    out.extend_from_slice(&iv_bytes);
    out.extend_from_slice(&ciphertext);

    Ok(out)
}

/// Packt einen eingepackten Schluessel mit dem eigenen privaten
/// X25519-Schluessel wieder aus
pub fn schluessel_auspacken(
    eingepackt: &[u8],
    eigener_private_key: &[u8; 32],
    key_id: KeyId,
    algorithmus: KeyAlgorithmus,
) -> CryptoResult<EncryptionKey> {
    if eingepackt.len() < 32 + 12 + 16 {
        return Err(CryptoError::UngueltigeDaten(
            "Zu kurzer eingepackter Schluessel".to_string(),
        ));
    }

    let ephemeral_pub_bytes: [u8; 32] = eingepackt[0..32]
        .try_into()
        .map_err(|_| CryptoError::UngueltigeDaten("Ephemeral-Public fehlt".to_string()))?;
    let iv_bytes: [u8; 12] = eingepackt[32..44]
        .try_into()
        .map_err(|_| CryptoError::UngueltigeDaten("IV fehlt".to_string()))?;
    let ciphertext = &eingepackt[44..];

    // DH mit dem eigenen privaten Schluessel
    let private_key = StaticSecret::from(*eigener_private_key);
    let ephemeral_pub = X25519PublicKey::from(ephemeral_pub_bytes);
    let dh_output = private_key.diffie_hellman(&ephemeral_pub);

    // HKDF -> Wrapping Key
    let eigener_pub = X25519PublicKey::from(&private_key);
    let wrapping_key = hkdf_derive(dh_output.as_bytes(), eigener_pub.as_bytes(), WRAP_INFO, 32)?;

    // AES-256-GCM entschluesseln
    let cipher_key = Key::<Aes256Gcm>::from_slice(&wrapping_key);
    let cipher = Aes256Gcm::new(cipher_key);
    let nonce = Nonce::from_slice(&iv_bytes);

    let key_bytes = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|e| CryptoError::Entschluesselung(e.to_string()))?;

    if key_bytes.len() != 32 {
        return Err(CryptoError::UngueltigeSchluesselLaenge {
            erwartet: 32,
            erhalten: key_bytes.len(),
        });
    }

    Ok(EncryptionKey {
        key_id,
        algorithmus,
        verwendung: KeyVerwendung::VerschluesselnEntschluesseln,
        key_bytes: SecretBytes::new(key_bytes),
    })
}

/// HKDF-basierte Key Derivation (allgemein verwendbar)
pub fn hkdf_derive(ikm: &[u8], salt: &[u8], info: &[u8], len: usize) -> CryptoResult<Vec<u8>> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = vec![0u8; len];
    hk.expand(info, &mut okm)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(okm)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
