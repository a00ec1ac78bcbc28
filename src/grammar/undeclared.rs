//! Nicht-deklarierte Productions fuer schema-informierte Grammatiken
//! (EXI 8.5.4.4).
//!
//! Bei `strict=false` bekommt jeder Zustand eine zweite (und evtl. dritte)
//! Event-Code-Ebene mit Productions fuer schema-abweichende Inhalte:
//! - Zustaende `j ≤ content` (Start-Tag): EE, xsi:type, xsi:nil, AT(*),
//!   AT(*)[untyped], NS, SC, SE(*), CH[untyped], ER, CM, PI
//! - Zustaende `j > content` (Inhalt): EE, SE(*), CH[untyped], ER, CM, PI
//!
//! Bei `strict=true` nur xsi:type (benannte Subtypen oder Union) und xsi:nil
//! (nillable) im ersten Zustand (EXI 8.5.4.4.2).
//!
//! CM und PI liegen immer auf der dritten Ebene, sobald eines von beiden
//! erhalten bleibt; das Tupel der dritten Ebene hat dann ein oder zwei Kinder.

use crate::event_type::EventKind;
use crate::event_type_list::EventTypeListBuilder;
use crate::options::GrammarOptions;

/// Wo ein Zustand im Element-Grammar liegt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TagContext {
    /// Erster Zustand des Elements (`j = 0`).
    pub first: bool,
    /// Strict: xsi:type anbieten.
    pub typable: bool,
    /// Strict: xsi:nil anbieten.
    pub nillable: bool,
}

/// Ergaenzt einen Start-Tag-Zustand (`j ≤ content`).
pub(crate) fn augment_tag(builder: &mut EventTypeListBuilder, options: GrammarOptions, ctx: TagContext) {
    if options.is_strict() {
        if ctx.first && ctx.typable {
            builder.push(2, EventKind::XsiType);
        }
        if ctx.first && ctx.nillable {
            builder.push(2, EventKind::XsiNil);
        }
        return;
    }

    if !builder.has_depth1(|k| matches!(k, EventKind::EndElement)) {
        builder.push(2, EventKind::EndElement);
    }
    if ctx.first {
        builder.push(2, EventKind::XsiType).push(2, EventKind::XsiNil);
    }
    builder
        .push(2, EventKind::AttributeAny { wildcard: None })
        .push(2, EventKind::AttributeUntyped);
    if ctx.first && options.contains(GrammarOptions::NAMESPACES) {
        builder.push(2, EventKind::NamespaceDeclaration);
    }
    if ctx.first && options.contains(GrammarOptions::SELF_CONTAINED) {
        builder.push(2, EventKind::SelfContained);
    }
    push_content_items(builder, options);
}

/// Ergaenzt einen Inhalts-Zustand (`j > content`, inklusive content2).
pub(crate) fn augment_content(builder: &mut EventTypeListBuilder, options: GrammarOptions) {
    if options.is_strict() {
        return;
    }
    if !builder.has_depth1(|k| matches!(k, EventKind::EndElement)) {
        builder.push(2, EventKind::EndElement);
    }
    push_content_items(builder, options);
}

/// SE(*), CH[untyped], ER, CM, PI
fn push_content_items(builder: &mut EventTypeListBuilder, options: GrammarOptions) {
    builder
        .push(2, EventKind::StartElementAny { wildcard: None })
        .push(2, EventKind::Characters { typed: false });
    if options.contains(GrammarOptions::DTD) {
        builder.push(2, EventKind::EntityReference);
    }
    push_comments_and_pis(builder, options, 2);
}

/// CM/PI auf Ebene `level+1`.
pub(crate) fn push_comments_and_pis(builder: &mut EventTypeListBuilder, options: GrammarOptions, level: u8) {
    if !options.has_third_level() {
        return;
    }
    let depth = level + 1;
    if options.contains(GrammarOptions::COMMENTS) {
        builder.push(depth, EventKind::Comment);
    }
    if options.contains(GrammarOptions::PROCESSING_INSTRUCTIONS) {
        builder.push(depth, EventKind::ProcessingInstruction);
    }
}
