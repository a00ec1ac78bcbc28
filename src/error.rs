//! Central error types for the EXI grammar engine.
//!
//! Jede Variante verweist auf den relevanten Abschnitt von W3C EXI 1.0
//! Second Edition. Verletzungen von Aufruf-Invarianten (Treiber und Automat
//! sind nicht synchron) sind keine Fehler dieses Typs, sondern Panics.

use core::fmt;
use std::borrow::Cow;

/// All error types raised while building or certifying grammars.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Two different particles produce the same terminal from one grammar
    /// state (Unique Particle Attribution, EXI 8.5.4.2).
    Ambiguity {
        /// Der Particle, dessen Terminal mit einem Geschwister kollidiert.
        particle: Cow<'static, str>,
        /// Das kollidierende Terminal (z.B. `SE({urn:x}a)`).
        substance: Cow<'static, str>,
    },
    /// A particle has invalid occurs constraints: max < min (EXI 8.5.4.1.5).
    InvalidParticleOccurs { min: u32, max: u32 },
    /// A namespace-list wildcard has no entries (EXI 8.5.4.1.7).
    EmptyNamespaceList,
    /// An invalid combination of EXI options was specified (EXI 5.4).
    InvalidOptionCombination,
    /// A content model cannot be turned into a grammar.
    ///
    /// Tritt bei verschachtelten `all`-Gruppen und bei `all`-Gruppen mit mehr
    /// als [`crate::grammar::group::ALL_GROUP_LIMIT`] Particles auf.
    UnsupportedContentModel(Cow<'static, str>),
    /// A type name could not be resolved in the schema (EXI 8.5.4.4).
    UnknownType(String),
    /// An element name could not be resolved in the schema.
    UnknownElement(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ambiguity { particle, substance } => write!(
                f,
                "ambiguous content model: particle {particle} competes for {substance} (EXI 8.5.4.2)"
            ),
            Self::InvalidParticleOccurs { min, max } => {
                write!(f, "invalid particle occurs: max {max} < min {min} (EXI 8.5.4.1.5)")
            }
            Self::EmptyNamespaceList => {
                write!(f, "empty namespace list in wildcard (EXI 8.5.4.1.7)")
            }
            Self::InvalidOptionCombination => write!(f, "invalid EXI option combination (EXI 5.4)"),
            Self::UnsupportedContentModel(msg) => write!(f, "unsupported content model: {msg}"),
            Self::UnknownType(name) => write!(f, "type '{name}' not found in schema (EXI 8.5.4.4)"),
            Self::UnknownElement(name) => write!(f, "element '{name}' not found in schema"),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Erstellt einen `Ambiguity` Fehler mit Kontext.
    pub fn ambiguity(
        particle: impl Into<Cow<'static, str>>,
        substance: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::Ambiguity {
            particle: particle.into(),
            substance: substance.into(),
        }
    }

    /// Erstellt einen `UnsupportedContentModel` Fehler mit Nachricht.
    pub fn unsupported(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::UnsupportedContentModel(msg.into())
    }

    /// Ob der Fehler eine UPA-Verletzung meldet.
    pub fn is_ambiguity(&self) -> bool {
        matches!(self, Self::Ambiguity { .. })
    }
}

/// A convenience `Result` type alias using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;
