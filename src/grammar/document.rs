//! Schema-informierte Document- und Fragment-Grammatik (EXI 8.5.1, 8.5.2)
//!
//! ```text
//! Document        : SD DocContent
//! DocContent      : SE(G_0) DocEnd | ... | SE(*) DocEnd | DT | CM | PI
//! DocEnd          : ED | CM | PI
//!
//! Fragment        : SD FragmentContent
//! FragmentContent : SE(F_0) FragmentContent | ... | SE(*) FragmentContent | ED | CM | PI
//! ```
//!
//! `G_i` sind die globalen Elemente, `F_i` die Namen aller Element
//! Declarations, jeweils nach QName sortiert. Die eingebaute
//! Document-Grammatik (EXI 8.4.1) ist dieselbe ohne globale Elemente.

use log::debug;

use crate::event_type::EventKind;
use crate::event_type_list::{EventTypeList, EventTypeListBuilder};
use crate::grammar::GrammarKind;
use crate::grammar::undeclared::push_comments_and_pis;
use crate::options::GrammarOptions;
use crate::qname::QName;
use crate::schema::{ElemId, Schema};
use crate::FastIndexMap;

/// `Document` bzw. `Fragment`: nur `SD`.
pub const START: u32 = 0;
/// `DocContent` bzw. `FragmentContent`.
pub const CONTENT: u32 = 1;
/// `DocEnd` (nur Document).
pub const END: u32 = 2;

/// Ziel einer Production der Document-Ebene. Productions ohne Ziel
/// (`DT`, `CM`, `PI`) bleiben im Zustand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentTarget {
    Goto(u32),
    /// `ED`
    Done,
}

#[derive(Debug, Clone)]
pub(crate) struct DocumentState {
    list: EventTypeList,
    /// Indiziert nach Seriennummer.
    targets: Vec<Option<DocumentTarget>>,
}

impl DocumentState {
    fn new(builder: EventTypeListBuilder, targets: Vec<DocumentTarget>, owner: GrammarKind, reversed: bool) -> Self {
        let list = if reversed {
            builder.build_reversed(owner)
        } else {
            builder.build(owner)
        };
        Self {
            list,
            targets: targets.into_iter().map(Some).collect(),
        }
    }

    pub(crate) fn list(&self) -> &EventTypeList {
        &self.list
    }

    pub(crate) fn target(&self, serial: u32) -> Option<DocumentTarget> {
        self.targets.get(serial as usize).copied().flatten()
    }

    /// Lernt eine Production auf Tiefe 1 (nur rueckwaerts wachsende Listen).
    pub(crate) fn learn(&mut self, kind: EventKind, target: DocumentTarget) -> u32 {
        let serial = self.list.learn(kind);
        if self.targets.len() <= serial as usize {
            self.targets.resize(serial as usize + 1, None);
        }
        self.targets[serial as usize] = Some(target);
        serial
    }
}

/// Zustaende der Document-Grammatik fuer die gegebenen globalen Elemente.
pub(crate) fn document_states(
    globals: &[(QName, ElemId)],
    options: GrammarOptions,
    owner: GrammarKind,
) -> Vec<DocumentState> {
    let mut start = EventTypeListBuilder::new();
    start.push(1, EventKind::StartDocument);

    let mut content = EventTypeListBuilder::new();
    let mut targets = Vec::with_capacity(globals.len() + 1);
    for (name, decl) in globals {
        content.push(1, EventKind::StartElement { name: name.clone(), decl: Some(*decl) });
        targets.push(DocumentTarget::Goto(END));
    }
    content.push(1, EventKind::StartElementAny { wildcard: None });
    targets.push(DocumentTarget::Goto(END));
    if options.contains(GrammarOptions::DTD) {
        content.push(2, EventKind::DocType);
    }
    push_comments_and_pis(&mut content, options, 2);

    // DocEnd: ED 0, CM 1.x, PI 1.x
    let mut end = EventTypeListBuilder::new();
    end.push(1, EventKind::EndDocument);
    push_misc_second_level(&mut end, options);

    vec![
        DocumentState::new(start, vec![DocumentTarget::Goto(CONTENT)], owner, false),
        DocumentState::new(content, targets, owner, false),
        DocumentState::new(end, vec![DocumentTarget::Done], owner, false),
    ]
}

/// CM/PI direkt auf Ebene 2 (DocEnd, FragmentContent).
fn push_misc_second_level(builder: &mut EventTypeListBuilder, options: GrammarOptions) {
    if options.contains(GrammarOptions::COMMENTS) {
        builder.push(2, EventKind::Comment);
    }
    if options.contains(GrammarOptions::PROCESSING_INSTRUCTIONS) {
        builder.push(2, EventKind::ProcessingInstruction);
    }
}

/// Zustaende einer Fragment-Grammatik; `elements` in Code-Reihenfolge.
pub(crate) fn fragment_states(
    elements: Vec<EventKind>,
    options: GrammarOptions,
    owner: GrammarKind,
    reversed: bool,
) -> Vec<DocumentState> {
    let mut start = EventTypeListBuilder::new();
    start.push(1, EventKind::StartDocument);

    let mut content = EventTypeListBuilder::new();
    let mut targets = Vec::with_capacity(elements.len() + 2);
    for kind in elements {
        content.push(1, kind);
        targets.push(DocumentTarget::Goto(CONTENT));
    }
    content.push(1, EventKind::StartElementAny { wildcard: None });
    targets.push(DocumentTarget::Goto(CONTENT));
    content.push(1, EventKind::EndDocument);
    targets.push(DocumentTarget::Done);
    push_misc_second_level(&mut content, options);

    vec![
        DocumentState::new(start, vec![DocumentTarget::Goto(CONTENT)], owner, false),
        DocumentState::new(content, targets, owner, reversed),
    ]
}

// ============================================================================
// DocumentGrammar
// ============================================================================

/// Schema-informierte Document-Grammatik (EXI 8.5.1).
#[derive(Debug, Clone)]
pub struct DocumentGrammar {
    states: Vec<DocumentState>,
}

impl DocumentGrammar {
    pub fn build(schema: &Schema, options: GrammarOptions) -> Self {
        let mut globals: Vec<(QName, ElemId)> = schema
            .global_elements()
            .map(|(name, id)| (name.clone(), id))
            .collect();
        globals.sort_by(|a, b| a.0.cmp(&b.0));
        debug!("document grammar with {} global elements", globals.len());
        Self {
            states: document_states(&globals, options, GrammarKind::Document),
        }
    }

    pub fn event_types(&self, state: u32) -> &EventTypeList {
        self.states[state as usize].list()
    }

    pub fn target(&self, state: u32, serial: u32) -> Option<DocumentTarget> {
        self.states[state as usize].target(serial)
    }
}

// ============================================================================
// FragmentGrammar
// ============================================================================

/// Schema-informierte Fragment-Grammatik (EXI 8.5.2).
///
/// `SE(F_i)` traegt die Declaration, wenn alle Declarations mit diesem Namen
/// denselben Typ und dieselbe Nillable-Eigenschaft haben. Sonst ist `decl`
/// leer und das Element bekommt die
/// [`ElementFragmentGrammar`](crate::grammar::ElementFragmentGrammar).
#[derive(Debug, Clone)]
pub struct FragmentGrammar {
    states: Vec<DocumentState>,
}

impl FragmentGrammar {
    pub fn build(schema: &Schema, options: GrammarOptions) -> Self {
        let mut by_name: FastIndexMap<QName, Option<ElemId>> = FastIndexMap::default();
        for (id, decl) in schema.elements() {
            by_name
                .entry(decl.name.clone())
                .and_modify(|known| {
                    if let Some(first) = *known {
                        let first = schema.element(first);
                        if first.type_id != decl.type_id || first.nillable != decl.nillable {
                            *known = None;
                        }
                    }
                })
                .or_insert(Some(id));
        }
        by_name.sort_keys();
        debug!("fragment grammar with {} element names", by_name.len());
        let elements = by_name
            .into_iter()
            .map(|(name, decl)| EventKind::StartElement { name, decl })
            .collect();
        Self {
            states: fragment_states(elements, options, GrammarKind::Fragment, false),
        }
    }

    pub fn event_types(&self, state: u32) -> &EventTypeList {
        self.states[state as usize].list()
    }

    pub fn target(&self, state: u32, serial: u32) -> Option<DocumentTarget> {
        self.states[state as usize].target(serial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBuilder;

    fn schema() -> Schema {
        let mut sb = SchemaBuilder::new();
        let string = sb.simple_type(None);
        let int = sb.simple_type(None);
        sb.global_element(QName::local("z"), string);
        sb.global_element(QName::local("b"), string);
        sb.local_element(QName::local("a"), string);
        sb.local_element(QName::local("a"), string);
        sb.local_element(QName::local("c"), string);
        sb.local_element(QName::local("c"), int);
        sb.build().unwrap()
    }

    #[test]
    fn document_ohne_optionen() {
        let g = DocumentGrammar::build(&schema(), GrammarOptions::NONE);
        assert_eq!(g.event_types(START).describe(), vec!["SD 0"]);
        assert_eq!(g.event_types(CONTENT).describe(), vec!["SE(b) 0", "SE(z) 1", "SE(*) 2"]);
        assert_eq!(g.target(CONTENT, 1), Some(DocumentTarget::Goto(END)));
        assert_eq!(g.event_types(END).describe(), vec!["ED 0"]);
        assert_eq!(g.target(END, 0), Some(DocumentTarget::Done));
    }

    #[test]
    fn document_mit_dt_cm_pi() {
        let opts = GrammarOptions::DTD | GrammarOptions::COMMENTS | GrammarOptions::PROCESSING_INSTRUCTIONS;
        let g = DocumentGrammar::build(&schema(), opts);
        assert_eq!(
            g.event_types(CONTENT).describe(),
            vec!["SE(b) 0", "SE(z) 1", "SE(*) 2", "DT 3.0", "CM 3.1.0", "PI 3.1.1"]
        );
        assert_eq!(g.target(CONTENT, 4), None);
        assert_eq!(g.event_types(END).describe(), vec!["ED 0", "CM 1.0", "PI 1.1"]);
    }

    #[test]
    fn document_nur_kommentare() {
        let g = DocumentGrammar::build(&schema(), GrammarOptions::COMMENTS);
        assert_eq!(g.event_types(CONTENT).describe(), vec!["SE(b) 0", "SE(z) 1", "SE(*) 2", "CM 3.0.0"]);
        assert_eq!(g.event_types(END).describe(), vec!["ED 0", "CM 1.0"]);
    }

    #[test]
    fn fragment_namen_und_konflikte() {
        let s = schema();
        let opts = GrammarOptions::COMMENTS | GrammarOptions::PROCESSING_INSTRUCTIONS;
        let g = FragmentGrammar::build(&s, opts);
        let content = g.event_types(CONTENT);
        assert_eq!(
            content.describe(),
            vec!["SE(a) 0", "SE(b) 1", "SE(c) 2", "SE(z) 3", "SE(*) 4", "ED 5", "CM 6.0", "PI 6.1"]
        );
        assert!(content.element(&QName::local("a")).unwrap().element_decl().is_some());
        assert!(content.element(&QName::local("c")).unwrap().element_decl().is_none());
        assert_eq!(g.target(CONTENT, 0), Some(DocumentTarget::Goto(CONTENT)));
        assert_eq!(g.target(CONTENT, 5), Some(DocumentTarget::Done));
    }
}
