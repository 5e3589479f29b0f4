//! Persistenz-Backends fuer exportierte Schluessel
//!
//! Das `KeyStorageBackend`-Trait abstrahiert den konkreten Geraete-Speicher.
//! Ein Eintrag pro Schluessel, Wert = JSON-serialisiertes JWK, Namensraum
//! per Praefix (`snakkaz_<key_id>`).

use std::path::PathBuf;

use dashmap::DashMap;

use snakkaz_core::KeyId;

use crate::error::CryptoResult;
use crate::types::Jwk;

/// Namensraum-Praefix fuer alle persistierten Schluessel-Eintraege
pub const SPEICHER_PREFIX: &str = "snakkaz_";

/// Abstraktes Speicher-Backend fuer exportierte Schluessel
#[allow(async_fn_in_trait)]
pub trait KeyStorageBackend: Send + Sync {
    /// JWK unter dem Bezeichner ablegen (ueberschreibt)
    async fn speichern(&self, key_id: &KeyId, jwk: &Jwk) -> CryptoResult<()>;

    /// JWK laden; `None` wenn der Bezeichner nicht existiert
    async fn laden(&self, key_id: &KeyId) -> CryptoResult<Option<Jwk>>;

    /// Eintrag loeschen; idempotent
    async fn loeschen(&self, key_id: &KeyId) -> CryptoResult<()>;
}

// Ein geteiltes Backend hinter Arc ist selbst ein Backend
impl<B: KeyStorageBackend> KeyStorageBackend for std::sync::Arc<B> {
    async fn speichern(&self, key_id: &KeyId, jwk: &Jwk) -> CryptoResult<()> {
        (**self).speichern(key_id, jwk).await
    }

    async fn laden(&self, key_id: &KeyId) -> CryptoResult<Option<Jwk>> {
        (**self).laden(key_id).await
    }

    async fn loeschen(&self, key_id: &KeyId) -> CryptoResult<()> {
        (**self).loeschen(key_id).await
    }
}

/// Disk-basiertes Backend
///
/// Eine Datei pro Schluessel unter `basis_verzeichnis/snakkaz_<key_id>.json`.
#[derive(Debug, Clone)]
pub struct DiskKeyStorage {
    basis_verzeichnis: PathBuf,
}

impl DiskKeyStorage {
    /// Neues DiskKeyStorage mit dem angegebenen Basisverzeichnis erstellen
    pub fn new(basis_verzeichnis: impl Into<PathBuf>) -> Self {
        Self {
            basis_verzeichnis: basis_verzeichnis.into(),
        }
    }

    fn pfad(&self, key_id: &KeyId) -> PathBuf {
        self.basis_verzeichnis
            .join(format!("{}{}.json", SPEICHER_PREFIX, key_id.as_str()))
    }
}

impl KeyStorageBackend for DiskKeyStorage {
    async fn speichern(&self, key_id: &KeyId, jwk: &Jwk) -> CryptoResult<()> {
        let pfad = self.pfad(key_id);

        if let Some(parent) = pfad.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_vec(jwk)?;
        tokio::fs::write(&pfad, json).await?;
        tracing::debug!(pfad = %pfad.display(), "Schluessel persistiert");
        Ok(())
    }

    async fn laden(&self, key_id: &KeyId) -> CryptoResult<Option<Jwk>> {
        let pfad = self.pfad(key_id);
        match tokio::fs::read(&pfad).await {
            Ok(daten) => {
                let jwk: Jwk = serde_json::from_slice(&daten)?;
                Ok(Some(jwk))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn loeschen(&self, key_id: &KeyId) -> CryptoResult<()> {
        let pfad = self.pfad(key_id);
        match tokio::fs::remove_file(&pfad).await {
            Ok(()) => {
                tracing::debug!(pfad = %pfad.display(), "Schluessel geloescht");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Bereits geloescht – kein Fehler
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// In-Memory-Backend fuer Tests und fluechtige Sessions
#[derive(Debug, Default)]
pub struct MemoryKeyStorage {
    eintraege: DashMap<String, Jwk>,
}

impl MemoryKeyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gibt die Anzahl der persistierten Eintraege zurueck
    pub fn anzahl(&self) -> usize {
        self.eintraege.len()
    }
}

impl KeyStorageBackend for MemoryKeyStorage {
    async fn speichern(&self, key_id: &KeyId, jwk: &Jwk) -> CryptoResult<()> {
        self.eintraege
            .insert(format!("{}{}", SPEICHER_PREFIX, key_id.as_str()), jwk.clone());
        Ok(())
    }

    async fn laden(&self, key_id: &KeyId) -> CryptoResult<Option<Jwk>> {
        Ok(self
            .eintraege
            .get(&format!("{}{}", SPEICHER_PREFIX, key_id.as_str()))
            .map(|e| e.clone()))
    }

    async fn loeschen(&self, key_id: &KeyId) -> CryptoResult<()> {
        self.eintraege
            .remove(&format!("{}{}", SPEICHER_PREFIX, key_id.as_str()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
