//! Eingebaute Grammatiken (EXI 8.4)
//!
//! Ohne Schema (oder fuer nicht-deklarierte Elemente) lernen die eingebauten
//! Element- und Fragment-Grammatiken aus dem Dokument: jede ueber eine
//! Tiefe-2-Production gematchte Art wird als Tiefe-1-Production angehaengt
//! und bekommt Code 0.
//!
//! ```text
//! StartTagContent : EE 0.0 | AT(*) 0.1 | NS 0.2 | SC 0.3 | SE(*) 0.4 | CH 0.5 | ER 0.6 | CM 0.7.0 | PI 0.7.1
//! ElementContent  : EE 0 | SE(*) 1.0 | CH 1.1 | ER 1.2 | CM 1.3.0 | PI 1.3.1
//! ```
//!
//! Die Codes gelernter Productions aendern sich mit jedem weiteren Lernschritt,
//! ihre Seriennummer (Anhaenge-Position) bleibt.
//!
//! Prototypen liegen im [`GrammarCache`](crate::cache::GrammarCache); jede
//! Session arbeitet auf eigenen Kopien ([`BuiltinElementGrammar::clone_for_session`]).

use log::trace;

use crate::event_type::EventKind;
use crate::event_type_list::{EventTypeList, EventTypeListBuilder};
use crate::grammar::document::{self, DocumentState, DocumentTarget};
use crate::grammar::undeclared::push_comments_and_pis;
use crate::grammar::GrammarKind;
use crate::options::GrammarOptions;
use crate::qname::QName;

/// `StartTagContent`
pub const START_TAG: u32 = 0;
/// `ElementContent`
pub const ELEMENT_CONTENT: u32 = 1;

// ============================================================================
// BuiltinDocumentGrammar
// ============================================================================

/// Eingebaute Document-Grammatik (EXI 8.4.1); lernt nicht.
#[derive(Debug, Clone)]
pub struct BuiltinDocumentGrammar {
    states: Vec<DocumentState>,
}

impl BuiltinDocumentGrammar {
    pub fn new(options: GrammarOptions) -> Self {
        Self {
            states: document::document_states(&[], options, GrammarKind::BuiltinDocument),
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
// BuiltinFragmentGrammar
// ============================================================================

/// Eingebaute Fragment-Grammatik (EXI 8.4.2); lernt `SE(qname)`.
#[derive(Debug, Clone)]
pub struct BuiltinFragmentGrammar {
    states: Vec<DocumentState>,
}

impl BuiltinFragmentGrammar {
    pub fn new(options: GrammarOptions) -> Self {
        Self {
            states: document::fragment_states(Vec::new(), options, GrammarKind::BuiltinFragment, true),
        }
    }

    /// Unabhaengige Kopie fuer eine Session.
    pub fn clone_for_session(&self) -> Self {
        self.clone()
    }

    pub fn event_types(&self, state: u32) -> &EventTypeList {
        self.states[state as usize].list()
    }

    pub fn target(&self, state: u32, serial: u32) -> Option<DocumentTarget> {
        self.states[state as usize].target(serial)
    }

    /// `SE(qname)` in FragmentContent; liefert die vorhandene Production,
    /// falls schon gelernt.
    pub fn learn_element(&mut self, name: &QName) -> u32 {
        let content = &mut self.states[document::CONTENT as usize];
        if let Some(known) = content.list().element(name) {
            return known.serial();
        }
        trace!("builtin fragment learns SE({name})");
        content.learn(
            EventKind::StartElement { name: name.clone(), decl: None },
            DocumentTarget::Goto(document::CONTENT),
        )
    }
}

// ============================================================================
// BuiltinElementGrammar
// ============================================================================

/// Eingebaute Element-Grammatik (EXI 8.4.3); eine Instanz pro Element-QName
/// und Session.
#[derive(Debug, Clone)]
pub struct BuiltinElementGrammar {
    states: [EventTypeList; 2],
}

impl BuiltinElementGrammar {
    pub fn new(options: GrammarOptions) -> Self {
        let mut start_tag = EventTypeListBuilder::new();
        start_tag
            .push(2, EventKind::EndElement)
            .push(2, EventKind::AttributeAny { wildcard: None });
        if options.contains(GrammarOptions::NAMESPACES) {
            start_tag.push(2, EventKind::NamespaceDeclaration);
        }
        if options.contains(GrammarOptions::SELF_CONTAINED) {
            start_tag.push(2, EventKind::SelfContained);
        }
        push_content(&mut start_tag, options);

        let mut content = EventTypeListBuilder::new();
        content.push(1, EventKind::EndElement);
        push_content(&mut content, options);

        Self {
            states: [
                start_tag.build_reversed(GrammarKind::BuiltinElement),
                content.build_reversed(GrammarKind::BuiltinElement),
            ],
        }
    }

    /// Unabhaengige Kopie fuer eine Session.
    pub fn clone_for_session(&self) -> Self {
        self.clone()
    }

    pub fn event_types(&self, state: u32) -> &EventTypeList {
        &self.states[state as usize]
    }

    /// Folgezustand nach einer Production der Art `kind`; `None` bei `EE`.
    pub fn next_state(state: u32, kind: &EventKind) -> Option<u32> {
        match kind {
            EventKind::EndElement => None,
            k if k.is_start_element() => Some(ELEMENT_CONTENT),
            EventKind::Characters { .. } => Some(ELEMENT_CONTENT),
            _ => Some(state),
        }
    }

    /// `SE(qname)` im Zustand `state`.
    pub fn learn_element(&mut self, state: u32, name: &QName) -> u32 {
        let list = &mut self.states[state as usize];
        if let Some(known) = list.element(name) {
            return known.serial();
        }
        trace!("builtin element learns SE({name}) in state {state}");
        list.learn(EventKind::StartElement { name: name.clone(), decl: None })
    }

    /// `AT(qname)` in StartTagContent.
    pub fn learn_attribute(&mut self, name: &QName) -> u32 {
        let list = &mut self.states[START_TAG as usize];
        if let Some(known) = list.attribute(name) {
            return known.serial();
        }
        trace!("builtin element learns AT({name})");
        list.learn(EventKind::Attribute { name: name.clone(), attribute: None })
    }

    /// `CH` auf Tiefe 1 im Zustand `state`.
    pub fn learn_characters(&mut self, state: u32) -> u32 {
        let list = &mut self.states[state as usize];
        if let Some(known) = list.characters() {
            return known.serial();
        }
        trace!("builtin element learns CH in state {state}");
        list.learn(EventKind::Characters { typed: false })
    }

    /// `EE` auf Tiefe 1 im Zustand `state`.
    pub fn learn_end_element(&mut self, state: u32) -> u32 {
        let list = &mut self.states[state as usize];
        if let Some(known) = list.end_element() {
            return known.serial();
        }
        trace!("builtin element learns EE in state {state}");
        list.learn(EventKind::EndElement)
    }
}

/// SE(*), CH, ER, CM, PI auf Ebene 2 (bzw. 3).
fn push_content(builder: &mut EventTypeListBuilder, options: GrammarOptions) {
    builder
        .push(2, EventKind::StartElementAny { wildcard: None })
        .push(2, EventKind::Characters { typed: false });
    if options.contains(GrammarOptions::DTD) {
        builder.push(2, EventKind::EntityReference);
    }
    push_comments_and_pis(builder, options, 2);
}
