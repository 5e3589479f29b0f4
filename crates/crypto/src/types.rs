//! Gemeinsame Typen fuer das Kryptografie-Subsystem

use base64::{engine::general_purpose, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use snakkaz_core::KeyId;

use crate::error::{CryptoError, CryptoResult};

/// Sicherer Schluessel-Container (wird beim Drop genullt)
#[derive(Clone)]
pub struct SecretBytes(pub Vec<u8>);

impl Drop for SecretBytes {
    fn drop(&mut self) {
        self.0.iter_mut().for_each(|b| *b = 0);
    }
}

impl std::fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretBytes([REDACTED] {} bytes)", self.0.len())
    }
}

impl SecretBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Initialisierungs-Vektor fuer AEAD-Verschluesselung (96 Bit)
///
/// Wird fuer jede Verschluesselungs-Operation frisch zufaellig erzeugt.
/// Eine IV darf mit demselben Schluessel niemals wiederverwendet werden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Iv {
    pub bytes: [u8; 12],
}

impl Iv {
    /// Erzeugt eine frische zufaellige IV
    pub fn zufaellig() -> Self {
        let mut bytes = [0u8; 12];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Erstellt eine IV aus rohen Bytes (Laengen-geprueft)
    pub fn aus_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != 12 {
            return Err(CryptoError::UngueltigeIv {
                erwartet: 12,
                erhalten: bytes.len(),
            });
        }
        let mut fixed = [0u8; 12];
        fixed.copy_from_slice(bytes);
        Ok(Self { bytes: fixed })
    }

    /// Dekodiert eine IV aus Base64
    pub fn aus_base64(encoded: &str) -> CryptoResult<Self> {
        let bytes = general_purpose::STANDARD.decode(encoded)?;
        Self::aus_bytes(&bytes)
    }

    pub fn als_base64(&self) -> String {
        general_purpose::STANDARD.encode(self.bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.bytes
    }
}

/// Algorithmus fuer symmetrische Schluessel (beide 256 Bit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum KeyAlgorithmus {
    #[default]
    Aes256Gcm,
    ChaCha20Poly1305,
}

impl KeyAlgorithmus {
    /// JWK-`alg`-Bezeichner
    pub fn jwk_alg(&self) -> &'static str {
        match self {
            KeyAlgorithmus::Aes256Gcm => "A256GCM",
            KeyAlgorithmus::ChaCha20Poly1305 => "C20P",
        }
    }

    /// Liest den Algorithmus aus einem JWK-`alg`-Bezeichner
    pub fn aus_jwk_alg(alg: &str) -> CryptoResult<Self> {
        match alg {
            "A256GCM" => Ok(KeyAlgorithmus::Aes256Gcm),
            "C20P" => Ok(KeyAlgorithmus::ChaCha20Poly1305),
            sonst => Err(CryptoError::UngueltigeDaten(format!(
                "Unbekannter JWK-Algorithmus: {sonst}"
            ))),
        }
    }
}

/// Erlaubte Verwendung eines Schluessels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum KeyVerwendung {
    #[default]
    VerschluesselnEntschluesseln,
    NurVerschluesseln,
    NurEntschluesseln,
}

impl KeyVerwendung {
    pub fn darf_verschluesseln(&self) -> bool {
        matches!(
            self,
            KeyVerwendung::VerschluesselnEntschluesseln | KeyVerwendung::NurVerschluesseln
        )
    }

    pub fn darf_entschluesseln(&self) -> bool {
        matches!(
            self,
            KeyVerwendung::VerschluesselnEntschluesseln | KeyVerwendung::NurEntschluesseln
        )
    }

    /// JWK-`key_ops`-Liste
    pub fn jwk_key_ops(&self) -> Vec<String> {
        match self {
            KeyVerwendung::VerschluesselnEntschluesseln => {
                vec!["encrypt".into(), "decrypt".into()]
            }
            KeyVerwendung::NurVerschluesseln => vec!["encrypt".into()],
            KeyVerwendung::NurEntschluesseln => vec!["decrypt".into()],
        }
    }

    /// Liest die Verwendung aus einer JWK-`key_ops`-Liste
    pub fn aus_jwk_key_ops(ops: &[String]) -> CryptoResult<Self> {
        let encrypt = ops.iter().any(|o| o == "encrypt");
        let decrypt = ops.iter().any(|o| o == "decrypt");
        match (encrypt, decrypt) {
            (true, true) => Ok(KeyVerwendung::VerschluesselnEntschluesseln),
            (true, false) => Ok(KeyVerwendung::NurVerschluesseln),
            (false, true) => Ok(KeyVerwendung::NurEntschluesseln),
            (false, false) => Err(CryptoError::UngueltigeDaten(
                "JWK ohne encrypt/decrypt key_ops".into(),
            )),
        }
    }
}

/// JSON Web Key – die persistierte Form eines symmetrischen Schluessels
///
/// Nur `kty = "oct"` wird unterstuetzt. Das Schluesselmaterial `k` ist
/// Base64url-kodiert ohne Padding, wie im JWK-Format ueblich.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub k: String,
    pub alg: String,
    pub key_ops: Vec<String>,
}

/// Ein symmetrischer Schluessel mit Bezeichner, Algorithmus und Verwendung
#[derive(Debug, Clone)]
pub struct EncryptionKey {
    /// Eindeutiger Bezeichner
    pub key_id: KeyId,
    /// Algorithmus (bestimmt auch die JWK-Form)
    pub algorithmus: KeyAlgorithmus,
    /// Erlaubte Operationen
    pub verwendung: KeyVerwendung,
    /// Das eigentliche Schluesselmaterial (32 Bytes)
    pub key_bytes: SecretBytes,
}

impl EncryptionKey {
    /// Erzeugt einen frischen zufaelligen Schluessel
    pub fn zufaellig(key_id: KeyId, algorithmus: KeyAlgorithmus) -> Self {
        let mut bytes = vec![0u8; 32];
        OsRng.fill_bytes(&mut bytes);
        Self {
            key_id,
            algorithmus,
            verwendung: KeyVerwendung::default(),
            key_bytes: SecretBytes::new(bytes),
        }
    }

    /// Exportiert den Schluessel in die JWK-Form
    pub fn als_jwk(&self) -> Jwk {
        Jwk {
            kty: "oct".into(),
            k: general_purpose::URL_SAFE_NO_PAD.encode(self.key_bytes.as_bytes()),
            alg: self.algorithmus.jwk_alg().into(),
            key_ops: self.verwendung.jwk_key_ops(),
        }
    }

    /// Importiert einen Schluessel aus der JWK-Form
    pub fn aus_jwk(key_id: KeyId, jwk: &Jwk) -> CryptoResult<Self> {
        if jwk.kty != "oct" {
            return Err(CryptoError::UngueltigeDaten(format!(
                "Nicht unterstuetzter JWK-Typ: {}",
                jwk.kty
            )));
        }

        let bytes = general_purpose::URL_SAFE_NO_PAD.decode(&jwk.k)?;
        if bytes.len() != 32 {
            return Err(CryptoError::UngueltigeSchluesselLaenge {
                erwartet: 32,
                erhalten: bytes.len(),
            });
        }

        Ok(Self {
            key_id,
            algorithmus: KeyAlgorithmus::aus_jwk_alg(&jwk.alg)?,
            verwendung: KeyVerwendung::aus_jwk_key_ops(&jwk.key_ops)?,
            key_bytes: SecretBytes::new(bytes),
        })
    }

    /// Prueft ob zwei Schluessel dieselbe Algorithmus/Verwendungs-Kombination
    /// tragen. Ein Bezeichner darf nur mit einer Kombination belegt sein.
    pub fn kombination_passt(&self, anderer: &EncryptionKey) -> bool {
        self.algorithmus == anderer.algorithmus && self.verwendung == anderer.verwendung
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
