//! Start-Tag- und Element-Grammatiken (EXI 8.5.4.1.3.2, 8.5.3)
//!
//! Die [`ElementTagGrammar`] eines `(Typ, nillable)`-Paars modelliert die
//! Attribute Uses: Zustand `k` heisst "Uses `0..k` sind erledigt". Von dort
//! aus ist jedes Attribut `m ≥ k` erlaubt, dessen Vorgaenger `k..m` alle
//! optional sind (Ziel `m+1`). Die Attribut-Wildcard ist eine Schleife in
//! jedem Attribut-Zustand; mit Wildcard gibt es einen Zustand mehr.
//!
//! Sobald alle verbleibenden Uses optional sind, werden die deklarierten
//! Productions des ersten Inhalts-Zustands in den Zustand uebernommen: ein
//! `SE` fuehrt dann direkt in den Inhalt. Der letzte Zustand
//! ([`content_state`](ElementTagGrammar::content_state)) entspricht dem
//! Inhaltsbeginn; mixed `CH` aus einem Start-Tag-Zustand fuehrt dorthin.
//!
//! Die genillte Variante (`xsi:nil="true"`) ersetzt den Inhalt durch `EE`.

use std::sync::Arc;

use log::debug;

use crate::event_type::EventKind;
use crate::event_type_list::{EventTypeList, EventTypeListBuilder};
use crate::grammar::content::{ContentGrammar, ContentTarget};
use crate::grammar::undeclared::{self, TagContext};
use crate::grammar::GrammarKind;
use crate::options::GrammarOptions;
use crate::qname::QName;
use crate::schema::{ElemId, Schema, TypeId, WildcardId};

/// Ziel einer deklarierten Start-Tag-Production.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagTarget {
    /// Start-Tag-Zustand.
    Tag(u32),
    /// Inhalts-Zustand (Cursor der Content-Grammatik).
    Content(u32),
    /// `EE`
    End,
}

#[derive(Debug, Clone)]
struct TagState {
    list: EventTypeList,
    targets: Vec<TagTarget>,
}

impl TagState {
    fn build(owner: GrammarKind, entries: Vec<(EventKind, TagTarget)>, options: GrammarOptions, ctx: TagContext) -> Self {
        let mut builder = EventTypeListBuilder::new();
        let mut targets = Vec::with_capacity(entries.len());
        for (kind, target) in entries {
            builder.push(1, kind);
            targets.push(target);
        }
        undeclared::augment_tag(&mut builder, options, ctx);
        Self {
            list: builder.build(owner),
            targets,
        }
    }
}

/// Wildcard-Productions `AT(uri:*)` (nach URI sortiert) bzw. `AT(*)`.
fn attribute_wildcard_kinds(schema: &Schema, wildcard: WildcardId) -> Vec<EventKind> {
    match schema.wildcard(wildcard).namespaces() {
        Some(uris) => {
            let mut uris: Vec<Arc<str>> = uris.to_vec();
            uris.sort();
            uris.dedup();
            uris.into_iter()
                .map(|uri| EventKind::AttributeNs { uri, wildcard: Some(wildcard) })
                .collect()
        }
        None => vec![EventKind::AttributeAny { wildcard: Some(wildcard) }],
    }
}

// ============================================================================
// ElementTagGrammar
// ============================================================================

/// Start-Tag-Zustaende eines Typs mit Uebergang in den Inhalt.
#[derive(Debug, Clone)]
pub struct ElementTagGrammar {
    type_id: TypeId,
    nillable: bool,
    content: Arc<ContentGrammar>,
    states: Vec<TagState>,
    nilled: Vec<TagState>,
}

impl ElementTagGrammar {
    pub fn build(
        schema: &Schema,
        type_id: TypeId,
        nillable: bool,
        content: Arc<ContentGrammar>,
        options: GrammarOptions,
    ) -> Self {
        let def = schema.type_def(type_id);
        let uses = def.attributes();
        let n = uses.len() as u32;
        let wildcard = def.attribute_wildcard();
        let content_state = if wildcard.is_some() { n + 1 } else { n };
        let typable = schema.has_named_sub_types(type_id) || def.is_union();
        let wildcard_kinds = wildcard.map(|w| attribute_wildcard_kinds(schema, w)).unwrap_or_default();

        let start: Vec<(EventKind, TagTarget)> = content
            .start_entries()
            .into_iter()
            .map(|(kind, target)| {
                let target = match target {
                    ContentTarget::End => TagTarget::End,
                    ContentTarget::Stay => TagTarget::Tag(content_state),
                    ContentTarget::Goto { state, .. } => TagTarget::Content(state),
                };
                (kind, target)
            })
            .collect();

        let mut states = Vec::with_capacity(content_state as usize + 1);
        let mut nilled = Vec::with_capacity(content_state as usize + 1);
        for k in 0..=content_state {
            let mut attributes: Vec<(EventKind, TagTarget)> = Vec::new();
            for m in k..n {
                let id = uses[m as usize];
                let attribute = schema.attribute_use(id);
                attributes.push((
                    EventKind::Attribute { name: attribute.name.clone(), attribute: Some(id) },
                    TagTarget::Tag(m + 1),
                ));
                if attribute.required {
                    break;
                }
            }
            if k <= n {
                for kind in &wildcard_kinds {
                    attributes.push((kind.clone(), TagTarget::Tag(k)));
                }
            }
            let rest_optional = (k..n).all(|m| !schema.attribute_use(uses[m as usize]).required);
            let ctx = TagContext { first: k == 0, typable, nillable };

            let mut entries = attributes.clone();
            if rest_optional {
                entries.extend(start.iter().cloned());
            }
            states.push(TagState::build(GrammarKind::ElementTag, entries, options, ctx));

            let mut entries = attributes;
            if rest_optional {
                entries.push((EventKind::EndElement, TagTarget::End));
            }
            nilled.push(TagState::build(GrammarKind::ElementTag, entries, options, ctx));
        }

        debug!(
            "{type_id}: tag grammar with {} states (nillable {nillable})",
            states.len()
        );
        Self {
            type_id,
            nillable,
            content,
            states,
            nilled,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn nillable(&self) -> bool {
        self.nillable
    }

    pub fn content(&self) -> &Arc<ContentGrammar> {
        &self.content
    }

    /// Index des Zustands, der dem Inhaltsbeginn entspricht.
    pub fn content_state(&self) -> u32 {
        self.states.len() as u32 - 1
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    fn state(&self, state: u32, nilled: bool) -> &TagState {
        let table = if nilled { &self.nilled } else { &self.states };
        &table[state as usize]
    }

    /// Productions im Start-Tag-Zustand `state`.
    pub fn event_types(&self, state: u32, nilled: bool) -> &EventTypeList {
        &self.state(state, nilled).list
    }

    /// Ziel der deklarierten Production `serial`.
    pub fn target(&self, state: u32, nilled: bool, serial: u32) -> Option<TagTarget> {
        self.state(state, nilled).targets.get(serial as usize).copied()
    }
}

// ============================================================================
// ElementGrammar
// ============================================================================

/// Element Declaration mit der Start-Tag-Grammatik ihres Typs.
#[derive(Debug, Clone)]
pub struct ElementGrammar {
    element: ElemId,
    name: QName,
    tag: Arc<ElementTagGrammar>,
}

impl ElementGrammar {
    pub fn new(schema: &Schema, element: ElemId, tag: Arc<ElementTagGrammar>) -> Self {
        Self {
            element,
            name: schema.element(element).name.clone(),
            tag,
        }
    }

    pub fn element(&self) -> ElemId {
        self.element
    }

    pub fn name(&self) -> &QName {
        &self.name
    }

    pub fn tag(&self) -> &ElementTagGrammar {
        &self.tag
    }

    pub fn shared_tag(&self) -> &Arc<ElementTagGrammar> {
        &self.tag
    }
}

// ============================================================================
// ElementFragmentGrammar
// ============================================================================

/// Element-Fragment-Grammatik (EXI 8.5.3) fuer Element-Namen mit
/// widerspruechlichen Deklarationen im Fragment-Modus.
///
/// Zustand 0 bietet alle Attribut-Namen des Schemas, Zustand 1 ist der
/// Inhalt. `SE(qname)` traegt hier keine Declaration; die Grammatik des
/// Kindes wird ueber den Namen aufgeloest.
#[derive(Debug, Clone)]
pub struct ElementFragmentGrammar {
    states: [TagState; 2],
    nilled: TagState,
}

impl ElementFragmentGrammar {
    pub fn build(schema: &Schema, options: GrammarOptions) -> Self {
        // ER gibt es in der Element-Fragment-Grammatik nicht.
        let options = options.without(GrammarOptions::DTD);

        let mut attribute_names: Vec<QName> = schema.attribute_uses().map(|a| a.name.clone()).collect();
        attribute_names.sort();
        attribute_names.dedup();
        let mut element_names: Vec<QName> = schema.elements().map(|(_, e)| e.name.clone()).collect();
        element_names.sort();
        element_names.dedup();

        let attributes: Vec<(EventKind, TagTarget)> = attribute_names
            .into_iter()
            .map(|name| (EventKind::Attribute { name, attribute: None }, TagTarget::Tag(0)))
            .chain(std::iter::once((EventKind::AttributeAny { wildcard: None }, TagTarget::Tag(0))))
            .collect();
        let content: Vec<(EventKind, TagTarget)> = element_names
            .into_iter()
            .map(|name| (EventKind::StartElement { name, decl: None }, TagTarget::Tag(1)))
            .chain([
                (EventKind::StartElementAny { wildcard: None }, TagTarget::Tag(1)),
                (EventKind::EndElement, TagTarget::End),
                (EventKind::Characters { typed: false }, TagTarget::Tag(1)),
            ])
            .collect();

        let first = TagContext { first: true, typable: true, nillable: true };
        let mut entries = attributes.clone();
        entries.extend(content.iter().cloned());
        let state0 = TagState::build(GrammarKind::ElementFragment, entries, options, first);

        let mut builder = EventTypeListBuilder::new();
        let mut targets = Vec::with_capacity(content.len());
        for (kind, target) in content {
            builder.push(1, kind);
            targets.push(target);
        }
        undeclared::augment_content(&mut builder, options);
        let state1 = TagState {
            list: builder.build(GrammarKind::ElementFragment),
            targets,
        };

        let mut entries = attributes;
        entries.push((EventKind::EndElement, TagTarget::End));
        let nilled = TagState::build(GrammarKind::ElementFragment, entries, options, first);

        debug!("element fragment grammar built");
        Self {
            states: [state0, state1],
            nilled,
        }
    }

    pub fn event_types(&self, state: u32, nilled: bool) -> &EventTypeList {
        if nilled {
            &self.nilled.list
        } else {
            &self.states[state.min(1) as usize].list
        }
    }

    pub fn target(&self, state: u32, nilled: bool, serial: u32) -> Option<TagTarget> {
        let state = if nilled { &self.nilled } else { &self.states[state.min(1) as usize] };
        state.targets.get(serial as usize).copied()
    }
}
