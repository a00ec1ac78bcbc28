//! EXI Grammatiken (EXI 8.4, 8.5)
//!
//! Jede Grammatik ist ein endlicher Automat, dessen Zustaende je eine
//! [`EventTypeList`](crate::event_type_list::EventTypeList) anbieten. Die
//! Event Codes ergeben sich aus der Position der Productions im
//! Event-Code-Tupel des Zustands.
//!
//! # Architektur
//!
//! - [`group`]: Automaten ueber Sequence/Choice- und All-Gruppen
//! - [`content`]: Content-Grammatiken (leer, einfach, komplex)
//! - [`element`]: Start-Tag-Grammatik je `(Typ, nillable)`, Element-Bindung,
//!   Element-Fragment-Grammatik
//! - [`document`]: schema-informierte Document- und Fragment-Grammatik
//! - [`builtin`]: lernende eingebaute Grammatiken (EXI 8.4)
//!
//! Schema-informierte Grammatiken sind unveraenderlich und werden ueber
//! `Arc` geteilt. Eingebaute Element- und Fragment-Grammatiken lernen und
//! leben deshalb pro Session im
//! [`GrammarStateStack`](crate::state::GrammarStateStack); [`Grammar`]
//! verweist auf sie nur ueber ihren Platz in der Session.

use std::fmt;
use std::sync::Arc;

pub mod builtin;
pub mod content;
pub mod document;
pub mod element;
pub mod group;
pub(crate) mod undeclared;

pub use builtin::{BuiltinDocumentGrammar, BuiltinElementGrammar, BuiltinFragmentGrammar};
pub use content::{ComplexContentGrammar, ContentGrammar, ContentTarget, EmptyContentGrammar, SimpleContentGrammar};
pub use document::{DocumentGrammar, DocumentTarget, FragmentGrammar};
pub use element::{ElementFragmentGrammar, ElementGrammar, ElementTagGrammar, TagTarget};
pub use group::{AllGroupGrammar, GroupGrammar, GroupMove, GroupState, MoveKey, SequenceChoiceGroupGrammar};

// ============================================================================
// GrammarKind
// ============================================================================

/// Art einer Grammatik; jeder Event Type merkt sich, welche Art ihn erzeugt hat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrammarKind {
    /// Schema-informierte Document-Grammatik (EXI 8.5.1).
    Document,
    /// Schema-informierte Fragment-Grammatik (EXI 8.5.2).
    Fragment,
    /// Element Declaration mit ihrer Start-Tag-Grammatik.
    Element,
    /// Start-Tag-Zustaende eines Typs (Attribute + Inhaltsbeginn).
    ElementTag,
    /// Inhalts-Zustaende eines Typs.
    ElementContent,
    /// Automat ueber einer Model Group.
    Group,
    /// Element-Fragment-Grammatik (EXI 8.5.3).
    ElementFragment,
    /// Eingebaute Element-Grammatik (EXI 8.4.3).
    BuiltinElement,
    /// Eingebaute Fragment-Grammatik (EXI 8.4.2).
    BuiltinFragment,
    /// Eingebaute Document-Grammatik (EXI 8.4.1).
    BuiltinDocument,
}

impl GrammarKind {
    /// Ob die Grammatik lernt (eingebaute Element- und Fragment-Grammatik).
    pub fn is_learning(self) -> bool {
        matches!(self, Self::BuiltinElement | Self::BuiltinFragment)
    }

    /// Ob die Grammatik aus einem Schema abgeleitet ist.
    pub fn is_schema_informed(self) -> bool {
        !matches!(
            self,
            Self::BuiltinElement | Self::BuiltinFragment | Self::BuiltinDocument
        )
    }
}

impl fmt::Display for GrammarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Document => "Document",
            Self::Fragment => "Fragment",
            Self::Element => "Element",
            Self::ElementTag => "ElementTag",
            Self::ElementContent => "ElementContent",
            Self::Group => "Group",
            Self::ElementFragment => "ElementFragment",
            Self::BuiltinElement => "BuiltinElement",
            Self::BuiltinFragment => "BuiltinFragment",
            Self::BuiltinDocument => "BuiltinDocument",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Grammar
// ============================================================================

/// Verweis auf eine Grammatik.
///
/// Schema-informierte Varianten teilen die Grammatik aus dem
/// [`GrammarCache`](crate::cache::GrammarCache). `BuiltinElement` traegt den
/// Platz der Grammatik in der Session (eine Instanz pro Element-QName),
/// `BuiltinFragment` verweist auf die einzige Fragment-Instanz der Session.
///
/// Gruppen-Automaten sind nie eigene Frames: sie stecken gefaltet in
/// `ElementContent` ([`GrammarKind::Group`] bezeichnet nur die Listen ihrer
/// Zustaende).
#[derive(Debug, Clone)]
pub enum Grammar {
    Document(Arc<DocumentGrammar>),
    Fragment(Arc<FragmentGrammar>),
    Element(Arc<ElementGrammar>),
    ElementTag(Arc<ElementTagGrammar>),
    ElementContent(Arc<ContentGrammar>),
    ElementFragment(Arc<ElementFragmentGrammar>),
    BuiltinElement(usize),
    BuiltinFragment,
    BuiltinDocument(Arc<BuiltinDocumentGrammar>),
}

impl Grammar {
    pub fn kind(&self) -> GrammarKind {
        match self {
            Self::Document(_) => GrammarKind::Document,
            Self::Fragment(_) => GrammarKind::Fragment,
            Self::Element(_) => GrammarKind::Element,
            Self::ElementTag(_) => GrammarKind::ElementTag,
            Self::ElementContent(_) => GrammarKind::ElementContent,
            Self::ElementFragment(_) => GrammarKind::ElementFragment,
            Self::BuiltinElement(_) => GrammarKind::BuiltinElement,
            Self::BuiltinFragment => GrammarKind::BuiltinFragment,
            Self::BuiltinDocument(_) => GrammarKind::BuiltinDocument,
        }
    }

    /// Start-Tag-Grammatik bei `Element` und `ElementTag`.
    pub fn tag(&self) -> Option<&ElementTagGrammar> {
        match self {
            Self::Element(e) => Some(e.tag()),
            Self::ElementTag(t) => Some(t),
            _ => None,
        }
    }

    /// Ob zwei Verweise dieselbe Grammatik-Instanz meinen.
    pub fn same_instance(&self, other: &Grammar) -> bool {
        match (self, other) {
            (Self::Document(a), Self::Document(b)) => Arc::ptr_eq(a, b),
            (Self::Fragment(a), Self::Fragment(b)) => Arc::ptr_eq(a, b),
            (Self::Element(a), Self::Element(b)) => Arc::ptr_eq(a, b),
            (Self::ElementTag(a), Self::ElementTag(b)) => Arc::ptr_eq(a, b),
            (Self::ElementContent(a), Self::ElementContent(b)) => Arc::ptr_eq(a, b),
            (Self::ElementFragment(a), Self::ElementFragment(b)) => Arc::ptr_eq(a, b),
            (Self::BuiltinElement(a), Self::BuiltinElement(b)) => a == b,
            (Self::BuiltinFragment, Self::BuiltinFragment) => true,
            (Self::BuiltinDocument(a), Self::BuiltinDocument(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

macro_rules! grammar_from {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<Arc<$ty>> for Grammar {
                fn from(g: Arc<$ty>) -> Self {
                    Self::$variant(g)
                }
            }
        )*
    };
}

grammar_from!(
    Document(DocumentGrammar),
    Fragment(FragmentGrammar),
    Element(ElementGrammar),
    ElementTag(ElementTagGrammar),
    ElementContent(ContentGrammar),
    ElementFragment(ElementFragmentGrammar),
    BuiltinDocument(BuiltinDocumentGrammar),
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::GrammarOptions;

    #[test]
    fn kind_der_varianten() {
        let doc = Arc::new(BuiltinDocumentGrammar::new(GrammarOptions::DEFAULT));
        let g = Grammar::from(Arc::clone(&doc));
        assert_eq!(g.kind(), GrammarKind::BuiltinDocument);
        assert!(!g.kind().is_schema_informed());
        assert!(g.same_instance(&Grammar::BuiltinDocument(doc)));
        assert!(Grammar::BuiltinElement(3).kind().is_learning());
        assert!(!Grammar::BuiltinElement(3).same_instance(&Grammar::BuiltinElement(4)));
        assert!(g.tag().is_none());
    }

    #[test]
    fn display() {
        assert_eq!(GrammarKind::ElementTag.to_string(), "ElementTag");
        assert_eq!(GrammarKind::BuiltinFragment.to_string(), "BuiltinFragment");
    }
}
