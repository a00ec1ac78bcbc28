//! Content-Grammatiken (EXI 8.5.4.1.3)
//!
//! Die Inhalts-Zustaende eines Typs, d.h. alles nach dem Start-Tag:
//!
//! - [`EmptyContentGrammar`]: nur `EE`
//! - [`SimpleContentGrammar`]: `CH` (typisiert), dann `EE`
//! - [`ComplexContentGrammar`]: Gruppen-Automat des Top-Level-Particles plus
//!   Vorkommenszaehler
//!
//! Jeder Zustand traegt bei `strict=false` die nicht-deklarierten
//! Productions fuer Inhalts-Zustaende. Der erste Zustand (Cursor 0) ist
//! zugleich die Kopie `content2` (EXI 8.5.4.4.1), in die nicht-deklarierte
//! `SE(*)`/`CH` aus dem Start-Tag fuehren.
//!
//! # Positionen
//!
//! Das Top-Level-Particle `(min, max)` umschliesst den Gruppen-Automaten.
//! Pro Gruppen-Zustand gibt es drei Listen, je nachdem wie das aktuelle
//! Vorkommen zu `min`/`max` steht:
//!
//! | Position | Bedeutung | EE | Neustart |
//! |----------|-----------|----|----------|
//! | `POS_0`  | `min` noch nicht erreicht | nein | ja |
//! | `POS_1`  | zwischen `min` und `max` | ja | ja |
//! | `POS_2`  | `max` erreicht | ja | nein |
//!
//! Ein Neustart beginnt ein weiteres Vorkommen der Gruppe und ist nur in
//! Zustaenden erlaubt, in denen die Gruppe enden darf.

use std::sync::Arc;

use log::{debug, warn};

use crate::event_type::EventKind;
use crate::event_type_list::{EventTypeList, EventTypeListBuilder};
use crate::grammar::group::{GroupGrammar, GroupMove, canonical_order};
use crate::grammar::{GrammarKind, undeclared};
use crate::options::GrammarOptions;
use crate::schema::{MaxOccurs, ParticleId, Schema, TypeId};
use crate::{Error, Result};

const POS_0: usize = 0;
const POS_1: usize = 1;
const POS_2: usize = 2;

/// Ziel einer deklarierten Inhalts-Production.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentTarget {
    /// `EE`: Element ist fertig.
    End,
    /// Bleibt im aktuellen Zustand (`CH` bei mixed content).
    Stay,
    /// Wechselt in den Zustand `state`; `restart` beginnt ein weiteres
    /// Vorkommen des Top-Level-Particles.
    Goto { state: u32, restart: bool },
}

/// Liste eines Zustands plus Ziele ihrer Tiefe-1-Productions.
#[derive(Debug, Clone)]
struct ContentState {
    list: EventTypeList,
    /// Indiziert nach Seriennummer; nur Tiefe 1.
    targets: Vec<ContentTarget>,
}

impl ContentState {
    fn build(entries: Vec<(EventKind, ContentTarget)>, options: GrammarOptions) -> Self {
        let mut builder = EventTypeListBuilder::new();
        let mut targets = Vec::with_capacity(entries.len());
        for (kind, target) in entries {
            builder.push(1, kind);
            targets.push(target);
        }
        undeclared::augment_content(&mut builder, options);
        Self {
            list: builder.build(GrammarKind::ElementContent),
            targets,
        }
    }

    fn entries(&self) -> Vec<(EventKind, ContentTarget)> {
        self.targets
            .iter()
            .enumerate()
            .filter_map(|(serial, t)| self.list.get(serial as u32).map(|e| (e.kind().clone(), *t)))
            .collect()
    }
}

// ============================================================================
// Empty / Simple
// ============================================================================

/// `EE` als einzige deklarierte Production; pro Cache ein Exemplar.
#[derive(Debug, Clone)]
pub struct EmptyContentGrammar {
    state: ContentState,
}

impl EmptyContentGrammar {
    pub fn new(options: GrammarOptions) -> Self {
        Self {
            state: ContentState::build(vec![(EventKind::EndElement, ContentTarget::End)], options),
        }
    }

    /// Mixed content ohne Particle: nur `EE` und `CH`.
    pub fn mixed(options: GrammarOptions) -> Self {
        Self {
            state: ContentState::build(
                vec![
                    (EventKind::EndElement, ContentTarget::End),
                    (EventKind::Characters { typed: true }, ContentTarget::Stay),
                ],
                options,
            ),
        }
    }
}

/// Simple Type oder Complex Type mit simple content: `CH`, dann `EE`.
#[derive(Debug, Clone)]
pub struct SimpleContentGrammar {
    type_id: TypeId,
    states: [ContentState; 2],
}

impl SimpleContentGrammar {
    pub fn new(type_id: TypeId, options: GrammarOptions) -> Self {
        let chars = ContentState::build(
            vec![(
                EventKind::Characters { typed: true },
                ContentTarget::Goto { state: 1, restart: false },
            )],
            options,
        );
        let end = ContentState::build(vec![(EventKind::EndElement, ContentTarget::End)], options);
        Self {
            type_id,
            states: [chars, end],
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }
}

// ============================================================================
// Complex
// ============================================================================

/// Element-only oder mixed content ueber einem Gruppen-Automaten.
#[derive(Debug, Clone)]
pub struct ComplexContentGrammar {
    type_id: TypeId,
    group: Arc<GroupGrammar>,
    min: u32,
    max: MaxOccurs,
    mixed: bool,
    /// Indiziert mit `cursor * 3 + position`.
    states: Vec<ContentState>,
}

impl ComplexContentGrammar {
    /// Baut die Inhalts-Zustaende fuer das Top-Level-Particle `top`.
    ///
    /// `check` prueft Neustarts auf Mehrdeutigkeit (ein Neustart und eine
    /// Fortsetzung verschiedener Particles mit gleicher Production).
    pub fn build(
        schema: &Schema,
        type_id: TypeId,
        top: ParticleId,
        group: Arc<GroupGrammar>,
        mixed: bool,
        options: GrammarOptions,
        check: bool,
    ) -> Result<Self> {
        let min = schema.effective_min(top);
        let max = schema.particle(top).max_occurs;
        let mut states = Vec::with_capacity(group.state_count() * 3);
        for s in 0..group.state_count() as u32 {
            for pos in [POS_0, POS_1, POS_2] {
                let entries = Self::entries(&group, s, pos, max, mixed, check)
                    .map_err(|e| {
                        warn!("{type_id}: {e}");
                        e
                    })?;
                states.push(ContentState::build(entries, options));
            }
        }
        debug!(
            "{type_id}: complex content with {} group states (min {min}, max {max:?})",
            group.state_count()
        );
        Ok(Self {
            type_id,
            group,
            min,
            max,
            mixed,
            states,
        })
    }

    fn entries(
        group: &GroupGrammar,
        s: u32,
        pos: usize,
        max: MaxOccurs,
        mixed: bool,
        check: bool,
    ) -> Result<Vec<(EventKind, ContentTarget)>> {
        let state = group.state(s);
        let mut moves: Vec<(&GroupMove, bool)> = Vec::new();
        if s != 0 || max.allows_more(0) {
            moves.extend(state.moves().iter().map(|m| (m, false)));
        }
        // Bei max = 1 ist ein Neustart nie erreichbar (Position 2).
        if s != 0 && state.can_end() && pos != POS_2 && max.allows_more(1) {
            for r in group.moves(0) {
                match state.find(r.key()) {
                    Some(existing) if existing.path() == r.path() => {}
                    Some(existing) => {
                        if check {
                            return Err(Error::ambiguity(
                                format!("{} in {}", existing.particle(), group.group()),
                                format!("{} (restart of {})", r.kind(), r.particle()),
                            ));
                        }
                    }
                    None => moves.push((r, true)),
                }
            }
        }
        moves.sort_by(|a, b| canonical_order(a.0, b.0));

        let mut entries: Vec<(EventKind, ContentTarget)> = moves
            .into_iter()
            .map(|(m, restart)| {
                (
                    m.kind().clone(),
                    ContentTarget::Goto { state: m.target(), restart },
                )
            })
            .collect();
        if pos != POS_0 && (s == 0 || state.can_end()) {
            entries.push((EventKind::EndElement, ContentTarget::End));
        }
        if mixed {
            entries.push((EventKind::Characters { typed: true }, ContentTarget::Stay));
        }
        Ok(entries)
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn group(&self) -> &Arc<GroupGrammar> {
        &self.group
    }

    /// Effektives `min` des Top-Level-Particles.
    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> MaxOccurs {
        self.max
    }

    pub fn is_mixed(&self) -> bool {
        self.mixed
    }

    /// Position fuer Gruppen-Zustand `cursor` nach `occurs` abgeschlossenen
    /// Vorkommen.
    pub fn position(&self, cursor: u32, occurs: u32) -> usize {
        if cursor == 0 {
            return if occurs < self.min { POS_0 } else { POS_1 };
        }
        let current = occurs.saturating_add(1);
        if current < self.min {
            POS_0
        } else if self.max.allows_more(current) {
            POS_1
        } else {
            POS_2
        }
    }

    fn state(&self, cursor: u32, occurs: u32) -> &ContentState {
        &self.states[cursor as usize * 3 + self.position(cursor, occurs)]
    }
}

// ============================================================================
// ContentGrammar
// ============================================================================

/// Inhalts-Grammatik eines Typs.
///
/// Der Cursor ist der Zustand (bei komplexem Inhalt der Gruppen-Zustand),
/// `occurs` die Zahl der abgeschlossenen Vorkommen des Top-Level-Particles.
#[derive(Debug, Clone)]
pub enum ContentGrammar {
    Empty(EmptyContentGrammar),
    Simple(SimpleContentGrammar),
    Complex(ComplexContentGrammar),
}

impl ContentGrammar {
    fn state(&self, cursor: u32, occurs: u32) -> &ContentState {
        match self {
            Self::Empty(g) => &g.state,
            Self::Simple(g) => &g.states[cursor.min(1) as usize],
            Self::Complex(g) => g.state(cursor, occurs),
        }
    }

    /// Productions im Zustand `cursor`.
    pub fn event_types(&self, cursor: u32, occurs: u32) -> &EventTypeList {
        &self.state(cursor, occurs).list
    }

    /// Ziel der deklarierten Production `serial`; `None` fuer
    /// nicht-deklarierte Productions (Tiefe 2/3).
    pub fn target(&self, cursor: u32, occurs: u32, serial: u32) -> Option<ContentTarget> {
        self.state(cursor, occurs).targets.get(serial as usize).copied()
    }

    /// Deklarierte Productions des ersten Zustands; die Start-Tag-Grammatik
    /// uebernimmt sie in alle Zustaende, ab denen der Inhalt beginnen darf.
    pub fn start_entries(&self) -> Vec<(EventKind, ContentTarget)> {
        self.state(0, 0).entries()
    }

    pub fn is_mixed(&self) -> bool {
        matches!(self, Self::Complex(g) if g.mixed)
    }

    /// Anzahl der Cursor-Werte.
    pub fn cursor_count(&self) -> usize {
        match self {
            Self::Empty(_) => 1,
            Self::Simple(_) => 2,
            Self::Complex(g) => g.group.state_count(),
        }
    }
}
