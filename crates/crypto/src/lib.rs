//! # snakkaz-crypto
//!
//! E2E-Verschluesselung und Schluesselverwaltung fuer Snakkaz.
//!
//! ## Module
//! - `cipher` - Nachrichten-Verschluesselung (AES-256-GCM / ChaCha20-Poly1305)
//! - `whole_page` - Verschluesselung ganzer Seiten-Payloads als ein Blob
//! - `wrap` - Einpacken von Konversations-Schluesseln fuer Empfaenger (ECIES)
//! - `store` - Schluessel-Verwaltung mit Cache und Geraete-Schluessel
//! - `storage` - Persistenz-Backends fuer exportierte Schluessel (JWK)
//! - `types` - Gemeinsame Typen (EncryptionKey, Jwk, Iv, SecretBytes)
//! - `error` - Fehlertypen

pub mod cipher;
pub mod error;
pub mod storage;
pub mod store;
pub mod types;
pub mod whole_page;
pub mod wrap;

// Bequeme Re-Exports
pub use cipher::{entschluesseln, verschluesseln};
pub use error::{CryptoError, CryptoResult};
pub use storage::{DiskKeyStorage, KeyStorageBackend, MemoryKeyStorage, SPEICHER_PREFIX};
pub use store::{KeyStore, GERAETE_KEY_ID};
pub use types::{EncryptionKey, Iv, Jwk, KeyAlgorithmus, KeyVerwendung, SecretBytes};
pub use whole_page::{seite_entschluesseln, seite_verschluesseln};
pub use wrap::{hkdf_derive, schluessel_auspacken, schluessel_einpacken};
