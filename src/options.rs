//! Grammar-relevante EXI Options (EXI 5.4, Table 5-1).
//!
//! Von allen EXI Options beeinflussen nur `strict`, `fragment`,
//! `selfContained` und die Preserve-Flags die Grammatiken. Sie werden zu einer
//! Bitmaske [`GrammarOptions`] verdichtet, die bestimmt welche Productions
//! in den Event-Code-Tupeln auftauchen.
//!
//! # Beispiel
//!
//! ```
//! use erxi_grammar::options::{GrammarOptions, Preserve};
//!
//! let opts = GrammarOptions::from_exi(
//!     false,
//!     Preserve { comments: true, ..Preserve::default() },
//!     false,
//! ).unwrap();
//!
//! assert!(opts.contains(GrammarOptions::COMMENTS));
//! assert!(opts.contains(GrammarOptions::UNDECLARED));
//! assert!(!opts.contains(GrammarOptions::PROCESSING_INSTRUCTIONS));
//! ```

use core::fmt;
use core::ops::{BitOr, BitOrAssign};

use crate::{Error, Result};

/// Fidelity options controlling preservation of information items (EXI 5.4, 6.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Preserve {
    /// CM events can be preserved.
    pub comments: bool,
    /// PI events can be preserved.
    pub pis: bool,
    /// DT and ER events can be preserved.
    pub dtd: bool,
    /// NS events and namespace prefixes can be preserved.
    pub prefixes: bool,
}

/// Bitmaske der Grammar-Optionen.
///
/// Jedes Flag schaltet eine Gruppe von Productions frei:
/// - `NAMESPACES`: NS in StartTagContent bzw. Zustand 0
/// - `SELF_CONTAINED`: SC in StartTagContent bzw. Zustand 0
/// - `DTD`: DT im Dokument, ER im Element-Inhalt
/// - `COMMENTS`/`PROCESSING_INSTRUCTIONS`: CM/PI auf der dritten Ebene
/// - `UNDECLARED`: nicht-strikte Erweiterung schema-informierter Grammatiken
///   (EXI 8.5.4.4.1)
/// - `FRAGMENT`: Fragment- statt Dokument-Grammatik
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GrammarOptions(u8);

impl GrammarOptions {
    pub const NONE: Self = Self(0);
    pub const NAMESPACES: Self = Self(1);
    pub const SELF_CONTAINED: Self = Self(1 << 1);
    pub const DTD: Self = Self(1 << 2);
    pub const COMMENTS: Self = Self(1 << 3);
    pub const PROCESSING_INSTRUCTIONS: Self = Self(1 << 4);
    pub const UNDECLARED: Self = Self(1 << 5);
    pub const FRAGMENT: Self = Self(1 << 6);

    /// Default der EXI Options: nicht-strikt, nichts preserved, Dokument.
    pub const DEFAULT: Self = Self::UNDECLARED;

    /// Leitet die Bitmaske aus den EXI Options ab.
    ///
    /// Returns `Error::InvalidOptionCombination` wenn `strict` zusammen mit
    /// einem Preserve-Flag oder `selfContained` gesetzt ist (EXI 5.4).
    pub fn from_exi(strict: bool, preserve: Preserve, self_contained: bool) -> Result<Self> {
        let incompatible_with_strict =
            preserve.comments || preserve.pis || preserve.dtd || preserve.prefixes || self_contained;
        if strict && incompatible_with_strict {
            return Err(Error::InvalidOptionCombination);
        }

        let mut opts = Self::NONE;
        if !strict {
            opts |= Self::UNDECLARED;
        }
        if preserve.prefixes {
            opts |= Self::NAMESPACES;
        }
        if self_contained {
            opts |= Self::SELF_CONTAINED;
        }
        if preserve.dtd {
            opts |= Self::DTD;
        }
        if preserve.comments {
            opts |= Self::COMMENTS;
        }
        if preserve.pis {
            opts |= Self::PROCESSING_INSTRUCTIONS;
        }
        Ok(opts)
    }

    /// Rohwert der Maske.
    #[inline]
    pub fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Ob mindestens ein Flag aus `other` gesetzt ist.
    #[inline]
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Loescht die Flags in `other`.
    #[inline]
    pub fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Setzt das Flag `FRAGMENT`.
    pub fn with_fragment(self) -> Self {
        self | Self::FRAGMENT
    }

    /// Ob Strict-Mode gilt (keine nicht-deklarierten Productions).
    #[inline]
    pub fn is_strict(self) -> bool {
        !self.contains(Self::UNDECLARED)
    }

    /// Ob CM oder PI erhalten bleiben und damit eine dritte Event-Code-Ebene
    /// entsteht (auch wenn nur einer der beiden aktiv ist).
    #[inline]
    pub fn has_third_level(self) -> bool {
        self.intersects(Self::COMMENTS | Self::PROCESSING_INSTRUCTIONS)
    }
}

impl BitOr for GrammarOptions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for GrammarOptions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for GrammarOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(GrammarOptions, &str); 7] = [
            (GrammarOptions::NAMESPACES, "NS"),
            (GrammarOptions::SELF_CONTAINED, "SC"),
            (GrammarOptions::DTD, "DTD"),
            (GrammarOptions::COMMENTS, "CM"),
            (GrammarOptions::PROCESSING_INSTRUCTIONS, "PI"),
            (GrammarOptions::UNDECLARED, "UNDECLARED"),
            (GrammarOptions::FRAGMENT, "FRAGMENT"),
        ];
        let mut first = true;
        write!(f, "GrammarOptions(")?;
        for (flag, name) in NAMES {
            if self.contains(flag) {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{name}")?;
                first = false;
            }
        }
        write!(f, ")")
    }
}

/// Konfiguration des Grammar-Caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Schema-informierte Grammatiken memoisieren (Default: true).
    ///
    /// `false` baut jede Grammatik bei jedem Zugriff neu auf
    /// (Diagnose- und Testmodus).
    pub caching: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { caching: true }
    }
}

impl CacheConfig {
    /// Deaktiviert die Memoisierung.
    pub fn without_caching(mut self) -> Self {
        self.caching = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_non_strict_document() {
        let opts = GrammarOptions::default();
        assert_eq!(opts, GrammarOptions::NONE);
        assert!(GrammarOptions::DEFAULT.contains(GrammarOptions::UNDECLARED));
        assert!(!GrammarOptions::DEFAULT.is_strict());
        assert!(!GrammarOptions::DEFAULT.contains(GrammarOptions::FRAGMENT));
    }

    #[test]
    fn from_exi_maps_preserve_flags() {
        let preserve = Preserve { comments: true, pis: true, dtd: true, prefixes: true };
        let opts = GrammarOptions::from_exi(false, preserve, true).unwrap();
        for flag in [
            GrammarOptions::NAMESPACES,
            GrammarOptions::SELF_CONTAINED,
            GrammarOptions::DTD,
            GrammarOptions::COMMENTS,
            GrammarOptions::PROCESSING_INSTRUCTIONS,
            GrammarOptions::UNDECLARED,
        ] {
            assert!(opts.contains(flag), "{flag:?} fehlt in {opts:?}");
        }
        assert!(opts.has_third_level());
    }

    #[test]
    fn strict_rejects_preserve_flags() {
        let preserve = Preserve { comments: true, ..Preserve::default() };
        assert_eq!(
            GrammarOptions::from_exi(true, preserve, false),
            Err(Error::InvalidOptionCombination)
        );
        assert_eq!(
            GrammarOptions::from_exi(true, Preserve::default(), true),
            Err(Error::InvalidOptionCombination)
        );
    }

    #[test]
    fn strict_without_preserve_is_valid() {
        let opts = GrammarOptions::from_exi(true, Preserve::default(), false).unwrap();
        assert!(opts.is_strict());
        assert!(!opts.has_third_level());
        assert_eq!(opts.bits(), 0);
    }

    #[test]
    fn third_level_with_comments_or_pis() {
        assert!(GrammarOptions::COMMENTS.has_third_level());
        assert!(GrammarOptions::PROCESSING_INSTRUCTIONS.has_third_level());
        assert!(!(GrammarOptions::DEFAULT | GrammarOptions::DTD).has_third_level());
        assert!((GrammarOptions::COMMENTS | GrammarOptions::PROCESSING_INSTRUCTIONS).has_third_level());
        let opts = GrammarOptions::DEFAULT | GrammarOptions::DTD;
        assert_eq!(opts.without(GrammarOptions::DTD), GrammarOptions::DEFAULT);
    }

    #[test]
    fn fragment_flag() {
        let opts = GrammarOptions::DEFAULT.with_fragment();
        assert!(opts.contains(GrammarOptions::FRAGMENT));
        assert!(opts.contains(GrammarOptions::UNDECLARED));
    }

    #[test]
    fn debug_lists_flags() {
        let opts = GrammarOptions::COMMENTS | GrammarOptions::UNDECLARED;
        assert_eq!(format!("{opts:?}"), "GrammarOptions(CM|UNDECLARED)");
    }

    #[test]
    fn cache_config_default_caches() {
        assert!(CacheConfig::default().caching);
        assert!(!CacheConfig::default().without_caching().caching);
    }
}
