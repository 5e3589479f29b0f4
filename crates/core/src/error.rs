//! Fehlertypen fuer Snakkaz
//!
//! Zentraler Fehler-Enum fuer die oberste Orchestrierungs-Schicht.
//! Untermodule definieren eigene Fehler und werden an der Schicht-Grenze
//! in diese Varianten ueberfuehrt.

use thiserror::Error;

/// Globaler Result-Alias fuer Snakkaz
pub type Result<T> = std::result::Result<T, SnakkazError>;

/// Alle moeglichen Fehler an der Snakkaz-Oberflaeche
#[derive(Debug, Error)]
pub enum SnakkazError {
    // --- Verbindung & Netzwerk ---
    #[error("Verbindung fehlgeschlagen: {0}")]
    Verbindung(String),

    #[error("Zeitlimit ueberschritten: {0}")]
    Zeitlimit(String),

    // --- Kryptografie ---
    #[error("Verschluesselung fehlgeschlagen: {0}")]
    Verschluesselung(String),

    /// Auth-Tag-Verifikation fehlgeschlagen – die Nachricht ist mit dem
    /// vorhandenen Schluessel nicht lesbar. Wird nie automatisch wiederholt.
    #[error("Entschluesselung fehlgeschlagen: {0}")]
    Entschluesselung(String),

    #[error("Kein Schluessel fuer Bezeichner {0}")]
    SchluesselNichtGefunden(String),

    // --- Transport ---
    #[error("Nachricht unzustellbar: {0}")]
    Unzustellbar(String),

    // --- Protokoll ---
    #[error("Ungueltige Nachricht: {0}")]
    UngueltigeNachricht(String),

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl SnakkazError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler wiederholbar sein koennte
    ///
    /// Entschluesselungsfehler sind bewusst nicht wiederholbar: ohne den
    /// richtigen Schluessel aendert ein zweiter Versuch nichts.
    pub fn ist_wiederholbar(&self) -> bool {
        matches!(
            self,
            Self::Zeitlimit(_) | Self::Verbindung(_) | Self::Unzustellbar(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = SnakkazError::SchluesselNichtGefunden("konv_a_b".into());
        assert_eq!(e.to_string(), "Kein Schluessel fuer Bezeichner konv_a_b");
    }

    #[test]
    fn wiederholbar_erkennung() {
        assert!(SnakkazError::Zeitlimit("test".into()).ist_wiederholbar());
        assert!(SnakkazError::Unzustellbar("test".into()).ist_wiederholbar());
        assert!(!SnakkazError::Entschluesselung("test".into()).ist_wiederholbar());
    }
}
