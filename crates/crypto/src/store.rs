//! Schluessel-Verwaltung (Key Store)
//!
//! Verwaltet alle Schluessel eines Geraets:
//! - In-Memory-Cache, dahinter ein Persistenz-Backend (JWK-Form)
//! - Persistenz ist best-effort: ein nicht verfuegbares Backend degradiert
//!   zu rein fluechtigen Schluesseln und ist kein harter Fehler
//! - Geraete-Schluessel unter wohlbekanntem Bezeichner, Erzeugung
//!   single-flight-serialisiert
//!
//! Der Store wird explizit konstruiert und per Arc injiziert – es gibt
//! keinen modulglobalen Zustand.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

use snakkaz_core::KeyId;

use crate::error::{CryptoError, CryptoResult};
use crate::storage::KeyStorageBackend;
use crate::types::{EncryptionKey, KeyAlgorithmus};

/// Wohlbekannter Bezeichner des geraeteweiten Schluessels
pub const GERAETE_KEY_ID: &str = "geraet";

/// Verwaltet Schluessel mit Cache und Persistenz-Backend
pub struct KeyStore<B: KeyStorageBackend> {
    /// In-Memory-Cache, indiziert nach Bezeichner
    cache: DashMap<KeyId, EncryptionKey>,
    backend: B,
    /// Serialisiert die Erzeugung des Geraete-Schluessels. Zwei gleichzeitige
    /// erste Aufrufe duerfen nicht zwei verschiedene Schluessel erzeugen.
    geraete_sperre: Mutex<()>,
}

impl<B: KeyStorageBackend> KeyStore<B> {
    /// Erstellt einen neuen KeyStore ueber dem gegebenen Backend
    pub fn neu(backend: B) -> Arc<Self> {
        Arc::new(Self {
            cache: DashMap::new(),
            backend,
            geraete_sperre: Mutex::new(()),
        })
    }

    /// Erzeugt einen frischen Schluessel mit neuem zufaelligem Bezeichner
    ///
    /// Kein Seiteneffekt – der Schluessel existiert erst im Store wenn er
    /// explizit gespeichert wird.
    pub fn schluessel_generieren(&self, algorithmus: KeyAlgorithmus) -> EncryptionKey {
        EncryptionKey::zufaellig(KeyId::zufaellig(), algorithmus)
    }

    /// Legt einen Schluessel im Cache ab und persistiert ihn best-effort
    ///
    /// Ein fehlschlagendes Backend wird geloggt, der Schluessel bleibt rein
    /// im Speicher nutzbar. Ein Bezeichner der bereits mit einer anderen
    /// Algorithmus/Verwendungs-Kombination belegt ist wird abgewiesen.
    pub async fn schluessel_speichern(&self, key: &EncryptionKey) -> CryptoResult<()> {
        if let Some(vorhanden) = self.cache.get(&key.key_id) {
            if !vorhanden.kombination_passt(key) {
                return Err(CryptoError::SchluesselKonflikt {
                    key_id: key.key_id.as_str().to_string(),
                });
            }
        }

        self.cache.insert(key.key_id.clone(), key.clone());

        if let Err(e) = self.backend.speichern(&key.key_id, &key.als_jwk()).await {
            tracing::warn!(
                key_id = %key.key_id,
                fehler = %e,
                "Schluessel-Persistenz nicht verfuegbar, Schluessel bleibt nur im Speicher"
            );
        }

        Ok(())
    }

    /// Ruft einen Schluessel ab
    ///
    /// Prueft zuerst den Cache, dann das Backend (JWK-Reimport fuellt den
    /// Cache wieder auf). `None` wenn der Bezeichner nirgends existiert –
    /// ein fehlender Schluessel ist kein Fehler.
    pub async fn schluessel_abrufen(&self, key_id: &KeyId) -> Option<EncryptionKey> {
        if let Some(key) = self.cache.get(key_id) {
            return Some(key.clone());
        }

        let jwk = match self.backend.laden(key_id).await {
            Ok(Some(jwk)) => jwk,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key_id = %key_id, fehler = %e, "Schluessel-Speicher nicht lesbar");
                return None;
            }
        };

        match EncryptionKey::aus_jwk(key_id.clone(), &jwk) {
            Ok(key) => {
                self.cache.insert(key_id.clone(), key.clone());
                Some(key)
            }
            Err(e) => {
                tracing::warn!(key_id = %key_id, fehler = %e, "Persistierter Schluessel nicht importierbar");
                None
            }
        }
    }

    /// Entfernt einen Schluessel aus Cache und Backend; idempotent
    pub async fn schluessel_loeschen(&self, key_id: &KeyId) {
        self.cache.remove(key_id);
        if let Err(e) = self.backend.loeschen(key_id).await {
            tracing::warn!(key_id = %key_id, fehler = %e, "Schluessel-Loeschung im Backend fehlgeschlagen");
        }
    }

    /// Gibt den geraeteweiten Schluessel zurueck, erzeugt ihn beim ersten
    /// Aufruf
    ///
    /// Die Erzeugung laeuft unter einer Sperre: gleichzeitige erste Aufrufe
    /// warten auf dieselbe Erzeugung statt doppelte Geraete-Schluessel zu
    /// produzieren. Jeder weitere Aufruf liefert deterministisch denselben
    /// Schluessel.
    pub async fn geraete_schluessel(&self) -> CryptoResult<EncryptionKey> {
        let geraete_id = KeyId::neu(GERAETE_KEY_ID);

        if let Some(key) = self.cache.get(&geraete_id) {
            return Ok(key.clone());
        }

        let _sperre = self.geraete_sperre.lock().await;

        // Ein nebenlaeufiger Aufrufer kann die Erzeugung inzwischen
        // abgeschlossen haben
        if let Some(key) = self.cache.get(&geraete_id) {
            return Ok(key.clone());
        }

        if let Some(key) = self.schluessel_abrufen(&geraete_id).await {
            return Ok(key);
        }

        tracing::info!("Geraete-Schluessel wird erstmalig erzeugt");
        let key = EncryptionKey::zufaellig(geraete_id, KeyAlgorithmus::Aes256Gcm);
        self.schluessel_speichern(&key).await?;
        Ok(key)
    }

    /// Gibt die Anzahl der Schluessel im Cache zurueck
    pub fn cache_anzahl(&self) -> usize {
        self.cache.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKeyStorage;
    use crate::types::Jwk;

    #[tokio::test]
    async fn generieren_hat_keinen_seiteneffekt() {
        let store = KeyStore::neu(MemoryKeyStorage::new());
        let key = store.schluessel_generieren(KeyAlgorithmus::Aes256Gcm);

        assert_eq!(store.cache_anzahl(), 0);
        assert!(store.schluessel_abrufen(&key.key_id).await.is_none());
    }

    #[tokio::test]
    async fn speichern_und_abrufen() {
        let store = KeyStore::neu(MemoryKeyStorage::new());
        let key = store.schluessel_generieren(KeyAlgorithmus::Aes256Gcm);

        store.schluessel_speichern(&key).await.unwrap();
        let abgerufen = store.schluessel_abrufen(&key.key_id).await.unwrap();
        assert_eq!(abgerufen.key_bytes.as_bytes(), key.key_bytes.as_bytes());
    }

    #[tokio::test]
    async fn abrufen_fuellt_cache_aus_backend() {
        let backend = MemoryKeyStorage::new();
        let key = EncryptionKey::zufaellig(KeyId::neu("konv_x"), KeyAlgorithmus::Aes256Gcm);
        backend
            .speichern(&key.key_id, &key.als_jwk())
            .await
            .unwrap();

        let store = KeyStore::neu(backend);
        assert_eq!(store.cache_anzahl(), 0);

        let abgerufen = store.schluessel_abrufen(&KeyId::neu("konv_x")).await.unwrap();
        assert_eq!(abgerufen.key_bytes.as_bytes(), key.key_bytes.as_bytes());
        assert_eq!(store.cache_anzahl(), 1);
    }

    #[tokio::test]
    async fn fehlender_schluessel_ist_none() {
        let store = KeyStore::neu(MemoryKeyStorage::new());
        assert!(store.schluessel_abrufen(&KeyId::neu("fehlt")).await.is_none());
    }

    #[tokio::test]
    async fn loeschen_idempotent() {
        let store = KeyStore::neu(MemoryKeyStorage::new());
        let key = store.schluessel_generieren(KeyAlgorithmus::Aes256Gcm);
        store.schluessel_speichern(&key).await.unwrap();

        store.schluessel_loeschen(&key.key_id).await;
        store.schluessel_loeschen(&key.key_id).await;
        assert!(store.schluessel_abrufen(&key.key_id).await.is_none());
    }

    #[tokio::test]
    async fn bezeichner_konflikt_wird_abgewiesen() {
        let store = KeyStore::neu(MemoryKeyStorage::new());
        let key = EncryptionKey::zufaellig(KeyId::neu("konv_1"), KeyAlgorithmus::Aes256Gcm);
        store.schluessel_speichern(&key).await.unwrap();

        let anderer = EncryptionKey::zufaellig(KeyId::neu("konv_1"), KeyAlgorithmus::ChaCha20Poly1305);
        let result = store.schluessel_speichern(&anderer).await;
        assert!(matches!(result, Err(CryptoError::SchluesselKonflikt { .. })));
    }

    #[tokio::test]
    async fn gleiche_kombination_darf_ueberschreiben() {
        let store = KeyStore::neu(MemoryKeyStorage::new());
        let key = EncryptionKey::zufaellig(KeyId::neu("konv_1"), KeyAlgorithmus::Aes256Gcm);
        store.schluessel_speichern(&key).await.unwrap();

        let rotiert = EncryptionKey::zufaellig(KeyId::neu("konv_1"), KeyAlgorithmus::Aes256Gcm);
        store.schluessel_speichern(&rotiert).await.unwrap();

        let abgerufen = store.schluessel_abrufen(&KeyId::neu("konv_1")).await.unwrap();
        assert_eq!(abgerufen.key_bytes.as_bytes(), rotiert.key_bytes.as_bytes());
    }

    #[tokio::test]
    async fn geraete_schluessel_idempotent() {
        let store = KeyStore::neu(MemoryKeyStorage::new());

        let erster = store.geraete_schluessel().await.unwrap();
        let zweiter = store.geraete_schluessel().await.unwrap();

        assert_eq!(erster.key_id, zweiter.key_id);
        assert_eq!(erster.key_bytes.as_bytes(), zweiter.key_bytes.as_bytes());
    }

    #[tokio::test]
    async fn geraete_schluessel_single_flight() {
        let store = KeyStore::neu(MemoryKeyStorage::new());

        // Beide Aufrufe starten bevor einer fertig ist – es darf trotzdem
        // nur ein Geraete-Schluessel entstehen.
        let (a, b) = tokio::join!(store.geraete_schluessel(), store.geraete_schluessel());
        let a = a.unwrap();
        let b = b.unwrap();

        assert_eq!(a.key_bytes.as_bytes(), b.key_bytes.as_bytes());
        assert_eq!(store.cache_anzahl(), 1);
    }

    #[tokio::test]
    async fn geraete_schluessel_ueberlebt_neustart() {
        let backend = Arc::new(MemoryKeyStorage::new());
        let erster = {
            let store = KeyStore::neu(Arc::clone(&backend));
            store.geraete_schluessel().await.unwrap()
        };

        // Neuer Store ueber demselben Backend = Prozess-Neustart
        let store = KeyStore::neu(Arc::clone(&backend));
        let zweiter = store.geraete_schluessel().await.unwrap();
        assert_eq!(erster.key_bytes.as_bytes(), zweiter.key_bytes.as_bytes());
    }

    // Backend das jede Operation verweigert (Privat-Modus / Quota erschoepft)
    struct KaputtesBackend;

    impl KeyStorageBackend for KaputtesBackend {
        async fn speichern(&self, _: &KeyId, _: &Jwk) -> CryptoResult<()> {
            Err(CryptoError::SpeicherNichtVerfuegbar("quota".into()))
        }
        async fn laden(&self, _: &KeyId) -> CryptoResult<Option<Jwk>> {
            Err(CryptoError::SpeicherNichtVerfuegbar("quota".into()))
        }
        async fn loeschen(&self, _: &KeyId) -> CryptoResult<()> {
            Err(CryptoError::SpeicherNichtVerfuegbar("quota".into()))
        }
    }

    #[tokio::test]
    async fn kaputtes_backend_degradiert_zu_memory() {
        let store = KeyStore::neu(KaputtesBackend);
        let key = store.schluessel_generieren(KeyAlgorithmus::Aes256Gcm);

        // Speichern meldet Erfolg, der Schluessel lebt nur im Cache
        store.schluessel_speichern(&key).await.unwrap();
        assert!(store.schluessel_abrufen(&key.key_id).await.is_some());

        // Auch der Geraete-Schluessel funktioniert rein fluechtig
        let geraet = store.geraete_schluessel().await.unwrap();
        assert_eq!(
            store.geraete_schluessel().await.unwrap().key_bytes.as_bytes(),
            geraet.key_bytes.as_bytes()
        );
    }
}
