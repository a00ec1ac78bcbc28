//! Event Types: die Blaetter der Production-Grammatik (EXI 4, 8).
//!
//! Ein [`EventType`] ist ein Terminal einer Production, z.B. `SE(a)`,
//! `AT(*)` oder `CH`. Er kennt seine Tiefe im Event-Code-Tupel (1-3), die
//! Grammatik-Art die ihn erzeugt hat, seine Position unter den Geschwistern
//! (`index`, der Event-Code-Teil auf seiner Ebene) und seine Seriennummer in
//! der Aufbaureihenfolge der Liste (`serial`).

use std::fmt;
use std::sync::Arc;

use crate::grammar::GrammarKind;
use crate::qname::QName;
use crate::schema::{AttrUseId, ElemId, Substance, WildcardId};

/// Art eines Event Types mit den jeweils relevanten Daten.
///
/// Schema-informierte Varianten tragen einen Verweis auf den Schema-Knoten
/// (`decl`, `wildcard`, `attribute`); bei eingebauten Grammatiken ist er `None`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    StartDocument,
    EndDocument,
    /// `SE(qname)`
    StartElement { name: QName, decl: Option<ElemId> },
    /// `SE(uri:*)`
    StartElementNs { uri: Arc<str>, wildcard: Option<WildcardId> },
    /// `SE(*)`
    StartElementAny { wildcard: Option<WildcardId> },
    /// `AT(qname)`
    Attribute { name: QName, attribute: Option<AttrUseId> },
    /// `AT(uri:*)`
    AttributeNs { uri: Arc<str>, wildcard: Option<WildcardId> },
    /// `AT(*)`
    AttributeAny { wildcard: Option<WildcardId> },
    /// `AT(*) [untyped value]`: deklariertes Attribut mit ungueltigem Wert
    AttributeUntyped,
    /// `AT(xsi:type)` als nicht-deklarierte Production
    XsiType,
    /// `AT(xsi:nil)` als nicht-deklarierte Production
    XsiNil,
    /// `CH`; `typed = false` fuer `CH [untyped value]`
    Characters { typed: bool },
    EndElement,
    NamespaceDeclaration,
    SelfContained,
    Comment,
    ProcessingInstruction,
    DocType,
    EntityReference,
}

impl EventKind {
    /// Schema-Substanz (Element Declaration oder Wildcard) des Terminals.
    pub fn substance(&self) -> Option<Substance> {
        match self {
            Self::StartElement { decl: Some(e), .. } => Some(Substance::Element(*e)),
            Self::StartElementNs { wildcard: Some(w), .. }
            | Self::StartElementAny { wildcard: Some(w) }
            | Self::AttributeNs { wildcard: Some(w), .. }
            | Self::AttributeAny { wildcard: Some(w) } => Some(Substance::Wildcard(*w)),
            _ => None,
        }
    }

    /// QName bei `SE(qname)` und `AT(qname)`.
    pub fn name(&self) -> Option<&QName> {
        match self {
            Self::StartElement { name, .. } | Self::Attribute { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Ob das Terminal ein Start-Element ist (qname, uri:* oder *).
    pub fn is_start_element(&self) -> bool {
        matches!(
            self,
            Self::StartElement { .. } | Self::StartElementNs { .. } | Self::StartElementAny { .. }
        )
    }

    /// Ob das Terminal ein Attribut ist (inklusive xsi:type/xsi:nil).
    pub fn is_attribute(&self) -> bool {
        matches!(
            self,
            Self::Attribute { .. }
                | Self::AttributeNs { .. }
                | Self::AttributeAny { .. }
                | Self::AttributeUntyped
                | Self::XsiType
                | Self::XsiNil
        )
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StartDocument => write!(f, "SD"),
            Self::EndDocument => write!(f, "ED"),
            Self::StartElement { name, .. } => write!(f, "SE({name})"),
            Self::StartElementNs { uri, .. } => write!(f, "SE({uri}:*)"),
            Self::StartElementAny { .. } => write!(f, "SE(*)"),
            Self::Attribute { name, .. } => write!(f, "AT({name})"),
            Self::AttributeNs { uri, .. } => write!(f, "AT({uri}:*)"),
            Self::AttributeAny { .. } => write!(f, "AT(*)"),
            Self::AttributeUntyped => write!(f, "AT(*)[untyped]"),
            Self::XsiType => write!(f, "AT(xsi:type)"),
            Self::XsiNil => write!(f, "AT(xsi:nil)"),
            Self::Characters { typed: true } => write!(f, "CH"),
            Self::Characters { typed: false } => write!(f, "CH[untyped]"),
            Self::EndElement => write!(f, "EE"),
            Self::NamespaceDeclaration => write!(f, "NS"),
            Self::SelfContained => write!(f, "SC"),
            Self::Comment => write!(f, "CM"),
            Self::ProcessingInstruction => write!(f, "PI"),
            Self::DocType => write!(f, "DT"),
            Self::EntityReference => write!(f, "ER"),
        }
    }
}

/// Ein Terminal innerhalb einer [`crate::event_type_list::EventTypeList`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventType {
    kind: EventKind,
    depth: u8,
    index: u32,
    serial: u32,
    owner: GrammarKind,
}

impl EventType {
    pub(crate) fn new(kind: EventKind, depth: u8, index: u32, serial: u32, owner: GrammarKind) -> Self {
        debug_assert!((1..=3).contains(&depth), "depth {depth}");
        Self {
            kind,
            depth,
            index,
            serial,
            owner,
        }
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// Anzahl Event-Code-Teile die das Terminal identifizieren (1-3).
    pub fn depth(&self) -> u8 {
        self.depth
    }

    /// Position unter den Geschwistern, d.h. der Event-Code-Teil auf Ebene
    /// [`depth`](Self::depth).
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Aufbaureihenfolge innerhalb der Liste; aendert sich nie.
    pub fn serial(&self) -> u32 {
        self.serial
    }

    /// Grammatik-Art, die das Terminal erzeugt hat.
    pub fn owner(&self) -> GrammarKind {
        self.owner
    }

    pub fn name(&self) -> Option<&QName> {
        self.kind.name()
    }

    pub fn substance(&self) -> Option<Substance> {
        self.kind.substance()
    }

    /// Element Declaration bei schema-informiertem `SE(qname)`.
    pub fn element_decl(&self) -> Option<ElemId> {
        match self.kind {
            EventKind::StartElement { decl, .. } => decl,
            _ => None,
        }
    }

    /// Attribute Use bei schema-informiertem `AT(qname)`.
    pub fn attribute_use(&self) -> Option<AttrUseId> {
        match self.kind {
            EventKind::Attribute { attribute, .. } => attribute,
            _ => None,
        }
    }

    pub(crate) fn set_index(&mut self, index: u32) {
        self.index = index;
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.kind, f)
    }
}
