//! Grammatik-Zustandsstapel einer Session
//!
//! Ein [`GrammarStateStack`] haelt pro offenem Knoten einen Frame
//! ([`GrammarState`]): ganz unten die Document- bzw. Fragment-Grammatik,
//! darueber je ein Frame pro offenem Element. Der Treiber (Encoder oder
//! Decoder) meldet jedes Event; der Stapel liefert den Event Code der
//! genommenen Production, fuehrt den Uebergang aus und oeffnet/schliesst
//! Frames.
//!
//! Aufrufe, die nicht zum aktuellen Zustand passen (z.B. `EE` im Document
//! oder ein Attribut im Inhalt), sind Fehler des Treibers und fuehren zu
//! einem Panic. Nur der Aufbau schema-informierter Grammatiken kann mit
//! einem [`Error`](crate::Error) fehlschlagen.
//!
//! Eingebaute Element-Grammatiken gehoeren der Session (eine pro QName) und
//! lernen waehrend des Durchlaufs.

use std::fmt;
use std::sync::Arc;

use log::trace;

use crate::cache::GrammarCache;
use crate::event_code::EventCode;
use crate::event_type::{EventKind, EventType};
use crate::event_type_list::EventTypeList;
use crate::grammar::builtin::ELEMENT_CONTENT;
use crate::grammar::document::{CONTENT, END, START};
use crate::grammar::{
    BuiltinElementGrammar, BuiltinFragmentGrammar, ContentTarget, DocumentTarget, Grammar, GrammarKind, TagTarget,
};
use crate::qname::QName;
use crate::schema::{ProcessContents, TypeId};
use crate::{FastIndexMap, Result};

/// Abschnitt, in dem sich ein Frame befindet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Vor `SD`.
    Start,
    /// Start-Tag eines Elements (Attribute, NS, SC).
    Tag,
    /// `DocContent`, `FragmentContent` oder Element-Inhalt.
    Content,
    /// `DocEnd`
    End,
    /// Nach `ED`.
    Done,
}

/// Sonstige Inhalte ohne Zustandswechsel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiscKind {
    Comment,
    ProcessingInstruction,
    EntityReference,
    DocType,
}

impl fmt::Display for MiscKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Comment => "CM",
            Self::ProcessingInstruction => "PI",
            Self::EntityReference => "ER",
            Self::DocType => "DT",
        })
    }
}

/// Ein Frame: Grammatik plus Position darin.
#[derive(Debug, Clone)]
pub struct GrammarState {
    grammar: Grammar,
    phase: Phase,
    /// Zustand innerhalb der Grammatik (Document-Zustand, Start-Tag-Zustand,
    /// Content-Cursor oder eingebauter Zustand).
    cursor: u32,
    /// Abgeschlossene Vorkommen des Top-Level-Particles (nur Inhalt).
    occurs: u32,
    nilled: bool,
}

impl GrammarState {
    fn new(grammar: Grammar) -> Self {
        let phase = match grammar.kind() {
            GrammarKind::Document
            | GrammarKind::Fragment
            | GrammarKind::BuiltinDocument
            | GrammarKind::BuiltinFragment => Phase::Start,
            _ => Phase::Tag,
        };
        Self {
            grammar,
            phase,
            cursor: 0,
            occurs: 0,
            nilled: false,
        }
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn occurs(&self) -> u32 {
        self.occurs
    }

    pub fn is_nilled(&self) -> bool {
        self.nilled
    }

    fn is_document_level(&self) -> bool {
        matches!(
            self.grammar,
            Grammar::Document(_) | Grammar::Fragment(_) | Grammar::BuiltinDocument(_) | Grammar::BuiltinFragment
        )
    }

    fn goto_document(&mut self, target: DocumentTarget) {
        match target {
            DocumentTarget::Goto(state) => {
                self.cursor = state;
                self.phase = match state {
                    START => Phase::Start,
                    CONTENT => Phase::Content,
                    END => Phase::End,
                    _ => panic!("document state {state}"),
                };
            }
            DocumentTarget::Done => self.phase = Phase::Done,
        }
    }

    /// Wechsel vom Start-Tag in den Inhalt (Cursor `cursor` der Content-Grammatik).
    fn enter_content(&mut self, cursor: u32) {
        let content = match &self.grammar {
            Grammar::Element(e) => Some(Arc::clone(e.tag().content())),
            Grammar::ElementTag(t) => Some(Arc::clone(t.content())),
            Grammar::ElementFragment(_) => None,
            g => panic!("{} has no element content", g.kind()),
        };
        match content {
            Some(content) => {
                self.grammar = Grammar::ElementContent(content);
                self.cursor = cursor;
            }
            // Zustand 1 ist der Inhalt der Element-Fragment-Grammatik.
            None => self.cursor = 1,
        }
        self.phase = Phase::Content;
        self.occurs = 0;
    }
}

/// Die genommene Production vor dem Uebergang.
#[derive(Debug, Clone)]
struct Taken {
    serial: u32,
    code: EventCode,
    kind: EventKind,
    depth: u8,
    owner: GrammarKind,
}

impl Taken {
    fn of(list: &EventTypeList, event: &EventType) -> Self {
        Self {
            serial: event.serial(),
            code: list.code(event.serial()),
            kind: event.kind().clone(),
            depth: event.depth(),
            owner: event.owner(),
        }
    }
}

// ============================================================================
// GrammarStateStack
// ============================================================================

/// Zustand einer Encoder- oder Decoder-Session.
#[derive(Debug)]
pub struct GrammarStateStack {
    cache: Arc<GrammarCache>,
    frames: Vec<GrammarState>,
    builtin_elements: FastIndexMap<QName, BuiltinElementGrammar>,
    builtin_fragment: BuiltinFragmentGrammar,
}

impl GrammarStateStack {
    /// Session fuer ein Dokument.
    pub fn new(cache: Arc<GrammarCache>) -> Self {
        let root = cache.document();
        Self::with_root(cache, root)
    }

    /// Session fuer ein Fragment.
    pub fn new_fragment(cache: Arc<GrammarCache>) -> Self {
        let root = cache.fragment();
        Self::with_root(cache, root)
    }

    fn with_root(cache: Arc<GrammarCache>, root: Grammar) -> Self {
        let builtin_fragment = cache.builtin_fragment();
        Self {
            cache,
            frames: vec![GrammarState::new(root)],
            builtin_elements: FastIndexMap::default(),
            builtin_fragment,
        }
    }

    pub fn cache(&self) -> &Arc<GrammarCache> {
        &self.cache
    }

    /// Anzahl der Frames (1 = nur Document/Fragment).
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Oberster Frame.
    pub fn current(&self) -> &GrammarState {
        match self.frames.last() {
            Some(frame) => frame,
            None => panic!("grammar state stack is empty"),
        }
    }

    fn current_mut(&mut self) -> &mut GrammarState {
        match self.frames.last_mut() {
            Some(frame) => frame,
            None => panic!("grammar state stack is empty"),
        }
    }

    /// Eingebaute Grammatik der Session fuer `name`.
    pub fn builtin_element(&self, name: &QName) -> Option<&BuiltinElementGrammar> {
        self.builtin_elements.get(name)
    }

    fn list_of<'a>(&'a self, frame: &'a GrammarState) -> &'a EventTypeList {
        match &frame.grammar {
            Grammar::Document(g) => g.event_types(frame.cursor),
            Grammar::Fragment(g) => g.event_types(frame.cursor),
            Grammar::BuiltinDocument(g) => g.event_types(frame.cursor),
            Grammar::BuiltinFragment => self.builtin_fragment.event_types(frame.cursor),
            Grammar::Element(e) => e.tag().event_types(frame.cursor, frame.nilled),
            Grammar::ElementTag(t) => t.event_types(frame.cursor, frame.nilled),
            Grammar::ElementContent(c) => c.event_types(frame.cursor, frame.occurs),
            Grammar::ElementFragment(f) => f.event_types(frame.cursor, frame.nilled),
            Grammar::BuiltinElement(index) => self.builtin_elements[*index].event_types(frame.cursor),
        }
    }

    /// Productions des aktuellen Zustands.
    pub fn next_event_types(&self) -> &EventTypeList {
        self.list_of(self.current())
    }

    /// Event Codes des aktuellen Zustands, indiziert nach Seriennummer.
    pub fn next_event_codes(&self) -> &[EventCode] {
        self.next_event_types().codes()
    }

    fn take(&self, what: &str, find: impl FnOnce(&EventTypeList) -> Option<&EventType>) -> Taken {
        let list = self.next_event_types();
        match find(list) {
            Some(event) => Taken::of(list, event),
            None => {
                let frame = self.current();
                panic!(
                    "{what} not allowed in {} state {} ({:?}): {:?}",
                    frame.grammar.kind(),
                    frame.cursor,
                    frame.phase,
                    list.describe()
                )
            }
        }
    }

    // ------------------------------------------------------------------
    // Uebergaenge
    // ------------------------------------------------------------------

    /// Fuehrt den Uebergang des obersten Frames fuer die genommene Production aus.
    fn advance(&mut self, taken: &Taken) {
        let frame = self.current();
        let mut next = frame.clone();
        let undeclared_content = taken.depth > 1
            && (taken.kind.is_start_element() || matches!(taken.kind, EventKind::Characters { .. }));
        match &frame.grammar {
            Grammar::Document(g) => {
                if let Some(t) = g.target(frame.cursor, taken.serial) {
                    next.goto_document(t);
                }
            }
            Grammar::Fragment(g) => {
                if let Some(t) = g.target(frame.cursor, taken.serial) {
                    next.goto_document(t);
                }
            }
            Grammar::BuiltinDocument(g) => {
                if let Some(t) = g.target(frame.cursor, taken.serial) {
                    next.goto_document(t);
                }
            }
            Grammar::BuiltinFragment => {
                if let Some(t) = self.builtin_fragment.target(frame.cursor, taken.serial) {
                    next.goto_document(t);
                }
            }
            Grammar::Element(_) | Grammar::ElementTag(_) | Grammar::ElementFragment(_) => {
                let target = match &frame.grammar {
                    Grammar::Element(e) => e.tag().target(frame.cursor, frame.nilled, taken.serial),
                    Grammar::ElementTag(t) => t.target(frame.cursor, frame.nilled, taken.serial),
                    Grammar::ElementFragment(f) => f.target(frame.cursor, frame.nilled, taken.serial),
                    _ => None,
                };
                if taken.depth == 1 {
                    match target {
                        Some(TagTarget::Tag(k)) => {
                            if matches!(frame.grammar, Grammar::ElementFragment(_)) && k == 1 {
                                next.enter_content(0);
                            } else {
                                next.cursor = k;
                            }
                        }
                        Some(TagTarget::Content(cursor)) => next.enter_content(cursor),
                        Some(TagTarget::End) | None => {}
                    }
                } else if undeclared_content {
                    next.enter_content(0);
                }
            }
            Grammar::ElementContent(c) => {
                if taken.depth == 1 {
                    if let Some(ContentTarget::Goto { state, restart }) = c.target(frame.cursor, frame.occurs, taken.serial)
                    {
                        next.cursor = state;
                        if restart {
                            next.occurs = next.occurs.saturating_add(1);
                        }
                    }
                }
            }
            Grammar::BuiltinElement(_) => {
                if let Some(state) = BuiltinElementGrammar::next_state(frame.cursor, &taken.kind) {
                    next.cursor = state;
                    next.phase = if state == ELEMENT_CONTENT { Phase::Content } else { Phase::Tag };
                }
            }
        }
        *self.current_mut() = next;
    }

    fn push(&mut self, grammar: Grammar) {
        trace!("push {} at depth {}", grammar.kind(), self.frames.len());
        self.frames.push(GrammarState::new(grammar));
    }

    /// Platz der eingebauten Grammatik fuer `name`; legt sie bei Bedarf an.
    fn builtin_index(&mut self, name: &QName) -> usize {
        let entry = self.builtin_elements.entry(name.clone());
        let index = entry.index();
        entry.or_insert_with(|| self.cache.builtin_element());
        index
    }

    fn builtin_mut(&mut self) -> Option<&mut BuiltinElementGrammar> {
        let index = match self.current().grammar {
            Grammar::BuiltinElement(index) => index,
            _ => return None,
        };
        Some(&mut self.builtin_elements[index])
    }

    /// Globales Element `name`, sonst die eingebaute Grammatik.
    fn global_or_builtin(&mut self, name: &QName) -> Result<Grammar> {
        let global = self.cache.schema().and_then(|schema| schema.global_element(name));
        match global {
            Some(element) => Ok(Grammar::Element(self.cache.element(element)?)),
            None => Ok(Grammar::BuiltinElement(self.builtin_index(name))),
        }
    }

    /// Grammatik des Kindelements fuer die genommene `SE`-Production.
    fn child_grammar(&mut self, taken: &Taken, name: &QName) -> Result<Grammar> {
        match &taken.kind {
            EventKind::StartElement { decl: Some(element), .. } => Ok(Grammar::Element(self.cache.element(*element)?)),
            EventKind::StartElement { decl: None, .. }
                if matches!(taken.owner, GrammarKind::Fragment | GrammarKind::ElementFragment) =>
            {
                let decl = match self.cache.fragment() {
                    Grammar::Fragment(f) => f.event_types(CONTENT).element(name).map(EventType::element_decl),
                    _ => None,
                };
                match decl {
                    Some(Some(element)) => Ok(Grammar::Element(self.cache.element(element)?)),
                    Some(None) => Ok(Grammar::ElementFragment(self.cache.element_fragment())),
                    None => self.global_or_builtin(name),
                }
            }
            EventKind::StartElementNs { wildcard: Some(w), .. } | EventKind::StartElementAny { wildcard: Some(w) } => {
                let skip = self
                    .cache
                    .schema()
                    .is_some_and(|schema| schema.wildcard(*w).process_contents == ProcessContents::Skip);
                if skip {
                    Ok(Grammar::BuiltinElement(self.builtin_index(name)))
                } else {
                    self.global_or_builtin(name)
                }
            }
            _ => self.global_or_builtin(name),
        }
    }

    // ------------------------------------------------------------------
    // Document
    // ------------------------------------------------------------------

    /// `SD`
    pub fn start_document(&mut self) -> EventCode {
        assert!(
            self.current().is_document_level() && self.current().phase == Phase::Start,
            "SD outside of a document start"
        );
        let taken = self.take("SD", EventTypeList::start_document);
        self.advance(&taken);
        taken.code
    }

    /// `ED`. Beendet ein self-contained Fragment, schliesst es auch das
    /// umgebende Element.
    pub fn end_document(&mut self) -> EventCode {
        assert!(self.current().is_document_level(), "ED inside an element");
        let taken = self.take("ED", EventTypeList::end_document);
        if self.frames.len() > 1 {
            self.frames.pop();
            self.frames.pop();
            trace!("self-contained fragment closed at depth {}", self.frames.len());
        } else {
            self.advance(&taken);
        }
        taken.code
    }

    // ------------------------------------------------------------------
    // Elemente
    // ------------------------------------------------------------------

    /// Deklariertes `SE` mit der Production `serial` des aktuellen Zustands.
    pub fn element(&mut self, serial: u32, name: &QName) -> Result<EventCode> {
        let taken = self.take("SE", |list| list.get(serial).filter(|e| e.kind().is_start_element()));
        let child = self.child_grammar(&taken, name)?;
        self.advance(&taken);
        self.push(child);
        Ok(taken.code)
    }

    /// Nicht-deklariertes `SE(*)`; eingebaute Grammatiken lernen `SE(name)`.
    pub fn undeclared_element(&mut self, name: &QName) -> Result<EventCode> {
        let taken = self.take("SE(*)", |list| list.undeclared_element().or_else(|| list.element_wildcard()));
        let child = self.child_grammar(&taken, name)?;
        let state = self.current().cursor;
        let fragment = matches!(self.current().grammar, Grammar::BuiltinFragment);
        if let Some(g) = self.builtin_mut() {
            g.learn_element(state, name);
        } else if fragment {
            self.builtin_fragment.learn_element(name);
        }
        self.advance(&taken);
        self.push(child);
        Ok(taken.code)
    }

    /// `EE`; schliesst den obersten Frame.
    pub fn end(&mut self) -> EventCode {
        assert!(!self.current().is_document_level(), "EE outside of an element");
        let taken = self.take("EE", EventTypeList::any_end_element);
        if taken.depth > 1 {
            let state = self.current().cursor;
            if let Some(g) = self.builtin_mut() {
                g.learn_end_element(state);
            }
        }
        self.frames.pop();
        taken.code
    }

    // ------------------------------------------------------------------
    // Attribute
    // ------------------------------------------------------------------

    /// Deklariertes `AT` mit der Production `serial`.
    pub fn schema_attribute(&mut self, serial: u32, name: &QName) -> EventCode {
        let taken = self.take("AT", |list| {
            list.get(serial).filter(|e| {
                matches!(
                    e.kind(),
                    EventKind::Attribute { .. } | EventKind::AttributeNs { .. } | EventKind::AttributeAny { .. }
                )
            })
        });
        trace!("AT({name}) {}", taken.code);
        self.advance(&taken);
        taken.code
    }

    /// Nicht-deklariertes `AT(*)`; eingebaute Grammatiken lernen `AT(name)`.
    pub fn undeclared_attribute(&mut self, name: &QName) -> EventCode {
        let taken = self.take("AT(*)", EventTypeList::undeclared_attribute);
        if let Some(g) = self.builtin_mut() {
            g.learn_attribute(name);
        }
        self.advance(&taken);
        taken.code
    }

    /// In eingebauten Grammatiken sind xsi:type und xsi:nil gewoehnliche
    /// Attribute: gelernt oder ueber `AT(*)`.
    fn builtin_attribute(&mut self, name: &QName) -> EventCode {
        let taken = self.take("AT", |list| list.attribute(name).or_else(|| list.undeclared_attribute()));
        if taken.depth > 1 {
            if let Some(g) = self.builtin_mut() {
                g.learn_attribute(name);
            }
        }
        taken.code
    }

    /// `AT(xsi:type)`: der Frame wechselt in die Start-Tag-Grammatik von `type_id`.
    pub fn xsitp(&mut self, type_id: TypeId) -> Result<EventCode> {
        assert_eq!(self.current().phase, Phase::Tag, "xsi:type outside of a start tag");
        let builtin = matches!(self.current().grammar, Grammar::BuiltinElement(_));
        let (code, nillable) = if builtin {
            (self.builtin_attribute(&QName::xsi_type()), false)
        } else {
            let nillable = match &self.current().grammar {
                Grammar::ElementFragment(_) => true,
                g => g.tag().is_some_and(|t| t.nillable()),
            };
            (self.take("AT(xsi:type)", EventTypeList::xsi_type).code, nillable)
        };
        let tag = self.cache.tag(type_id, nillable)?;
        let frame = self.current_mut();
        frame.grammar = Grammar::ElementTag(tag);
        frame.cursor = 0;
        Ok(code)
    }

    /// `AT(xsi:type)` mit dem Typnamen aus dem Attributwert. Ohne Schema
    /// bleibt es ein gewoehnliches Attribut der eingebauten Grammatik.
    pub fn xsitp_named(&mut self, type_name: &QName) -> Result<EventCode> {
        if !self.cache.is_schema_informed() {
            assert_eq!(self.current().phase, Phase::Tag, "xsi:type outside of a start tag");
            return Ok(self.builtin_attribute(&QName::xsi_type()));
        }
        let type_id = self.cache.type_named(type_name)?;
        self.xsitp(type_id)
    }

    /// `AT(xsi:nil)`; bei `nil` gelten ab jetzt die genillten Zustaende.
    pub fn nillify(&mut self, nil: bool) -> EventCode {
        assert_eq!(self.current().phase, Phase::Tag, "xsi:nil outside of a start tag");
        if matches!(self.current().grammar, Grammar::BuiltinElement(_)) {
            return self.builtin_attribute(&QName::xsi_nil());
        }
        let taken = self.take("AT(xsi:nil)", EventTypeList::xsi_nil);
        if nil {
            self.current_mut().nilled = true;
        }
        taken.code
    }

    /// `NS`
    pub fn namespace_declaration(&mut self) -> EventCode {
        let taken = self.take("NS", EventTypeList::namespace_declaration);
        self.advance(&taken);
        taken.code
    }

    /// `SC`: oeffnet ein Fragment innerhalb des aktuellen Elements.
    pub fn self_contained(&mut self) -> EventCode {
        let taken = self.take("SC", EventTypeList::self_contained);
        self.advance(&taken);
        let fragment = self.cache.fragment();
        self.push(fragment);
        taken.code
    }

    // ------------------------------------------------------------------
    // Zeichen und Sonstiges
    // ------------------------------------------------------------------

    /// Deklariertes `CH` auf Tiefe 1.
    pub fn chars(&mut self) -> EventCode {
        let taken = self.take("CH", EventTypeList::characters);
        self.advance(&taken);
        taken.code
    }

    /// `CH [untyped value]`; eingebaute Grammatiken lernen `CH`.
    pub fn undeclared_chars(&mut self) -> EventCode {
        let taken = self.take("CH[untyped]", EventTypeList::undeclared_characters);
        let state = self.current().cursor;
        if let Some(g) = self.builtin_mut() {
            g.learn_characters(state);
        }
        self.advance(&taken);
        taken.code
    }

    /// `CM`, `PI`, `ER` oder `DT`; der Zustand bleibt.
    pub fn misc_content(&mut self, kind: MiscKind) -> EventCode {
        let label = kind.to_string();
        let taken = match kind {
            MiscKind::Comment => self.take(&label, EventTypeList::comment),
            MiscKind::ProcessingInstruction => self.take(&label, EventTypeList::processing_instruction),
            MiscKind::EntityReference => self.take(&label, EventTypeList::entity_reference),
            MiscKind::DocType => self.take(&label, EventTypeList::doc_type),
        };
        taken.code
    }
}
