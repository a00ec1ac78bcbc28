//! Gruppen-Grammatiken: Automaten ueber den Particles einer Model Group
//! (EXI 8.5.4.1.8, 8.5.4.2).
//!
//! # Sequence und Choice
//!
//! [`SequenceChoiceGroupGrammar`] baut per Teilmengenkonstruktion einen
//! deterministischen Automaten. Eine *Konfiguration* ist ein Stack von Frames
//! `(slot, occurs)`, einer pro Verschachtelungsebene: `slot` ist die Position
//! des aktuellen Particles in seiner Gruppe (bei einer noch unentschiedenen
//! Choice `UNDECIDED`), `occurs` die Zahl der begonnenen Vorkommen. Ein
//! Automatenzustand ist eine sortierte Menge von Konfigurationen; Zustand 0
//! ist die frische Gruppe.
//!
//! Zaehler saettigen bei `max` bzw. bei `max(min, 1)` wenn `max` unbegrenzt
//! ist, damit der Automat endlich bleibt. Leerbare Terme erzeugen nie ein
//! leeres Vorkommen: ihr effektives `min` ist 0.
//!
//! # All
//!
//! [`AllGroupGrammar`] merkt sich nur, welche Particles schon gesehen wurden
//! (Bitmaske, hoechstens [`ALL_GROUP_LIMIT`] Particles).
//!
//! # Mehrdeutigkeit
//!
//! Erreichen zwei verschiedene Particles aus einem Zustand dieselbe
//! Production (`SE(qname)`, `SE(uri:*)`, `SE(*)`), ist das Content Model
//! nicht eindeutig (UPA). Das meldet [`Error::Ambiguity`], sofern das Schema
//! nicht bereits zertifiziert ist.

use std::cmp::Ordering;
use std::sync::Arc;

use log::{debug, warn};

use crate::event_type::EventKind;
use crate::event_type_list::{EventTypeList, EventTypeListBuilder};
use crate::grammar::GrammarKind;
use crate::qname::QName;
use crate::schema::{Compositor, GroupId, MaxOccurs, ParticleId, Schema, Substance, Term};
use crate::{Error, FastHashMap, FastIndexMap, Result};

/// Maximale Particle-Anzahl einer All-Gruppe (2^n Zustaende).
pub const ALL_GROUP_LIMIT: usize = 12;

/// Maximale Zustandszahl eines Sequence/Choice-Automaten.
pub const STATE_LIMIT: usize = 4096;

const UNDECIDED: u32 = u32::MAX;

// ============================================================================
// Moves
// ============================================================================

/// Production-Schluessel eines Moves; gleiche Schluessel aus einem Zustand
/// muessen vom selben Particle stammen.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MoveKey {
    /// `SE(qname)`
    Element(QName),
    /// `SE(uri:*)`
    Namespace(Arc<str>),
    /// `SE(*)`
    Any,
}

impl MoveKey {
    /// Rang in der kanonischen Reihenfolge (EXI 8.5.4.3).
    fn rank(&self) -> u8 {
        match self {
            Self::Element(_) => 0,
            Self::Namespace(_) => 1,
            Self::Any => 2,
        }
    }

    fn cmp_within(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Element(a), Self::Element(b)) => a.cmp(b),
            (Self::Namespace(a), Self::Namespace(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

/// Uebergang eines Gruppen-Zustands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMove {
    key: MoveKey,
    kind: EventKind,
    particle: ParticleId,
    path: Arc<[u32]>,
    substance: Substance,
    target: u32,
    ordinal: u32,
}

impl GroupMove {
    pub fn key(&self) -> &MoveKey {
        &self.key
    }

    /// Das Terminal (`SE(qname)`, `SE(uri:*)` oder `SE(*)`).
    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// Der Blatt-Particle, dem das Element zugeordnet wird.
    pub fn particle(&self) -> ParticleId {
        self.particle
    }

    /// Slots vom Gruppen-Particle bis zum Blatt.
    pub fn path(&self) -> &[u32] {
        &self.path
    }

    pub fn substance(&self) -> Substance {
        self.substance
    }

    /// Zielzustand.
    pub fn target(&self) -> u32 {
        self.target
    }

    /// Position des Blatt-Particles in Schema-Reihenfolge (Tiefensuche).
    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }
}

pub(crate) fn canonical_order(a: &GroupMove, b: &GroupMove) -> Ordering {
    a.key
        .rank()
        .cmp(&b.key.rank())
        .then(a.ordinal.cmp(&b.ordinal))
        .then_with(|| a.key.cmp_within(&b.key))
}

/// Production-Schluessel und Terminals einer Head Substance.
fn keys_of(schema: &Schema, substance: Substance) -> Vec<(MoveKey, EventKind)> {
    match substance {
        Substance::Element(e) => {
            let name = schema.element(e).name.clone();
            vec![(
                MoveKey::Element(name.clone()),
                EventKind::StartElement { name, decl: Some(e) },
            )]
        }
        Substance::Wildcard(w) => match schema.wildcard(w).namespaces() {
            Some(uris) => uris
                .iter()
                .map(|uri| {
                    (
                        MoveKey::Namespace(Arc::clone(uri)),
                        EventKind::StartElementNs { uri: Arc::clone(uri), wildcard: Some(w) },
                    )
                })
                .collect(),
            None => vec![(MoveKey::Any, EventKind::StartElementAny { wildcard: Some(w) })],
        },
    }
}

// ============================================================================
// GroupState
// ============================================================================

/// Ein Zustand eines Gruppen-Automaten.
#[derive(Debug, Clone)]
pub struct GroupState {
    moves: Vec<GroupMove>,
    end: bool,
    list: EventTypeList,
}

impl GroupState {
    fn new(moves: Vec<GroupMove>, end: bool) -> Self {
        let mut builder = EventTypeListBuilder::new();
        for m in &moves {
            builder.push(1, m.kind.clone());
        }
        if end {
            builder.push(1, EventKind::EndElement);
        }
        Self {
            list: builder.build(GrammarKind::Group),
            moves,
            end,
        }
    }

    /// Moves in kanonischer Reihenfolge.
    pub fn moves(&self) -> &[GroupMove] {
        &self.moves
    }

    /// Ob die Gruppe in diesem Zustand enden darf.
    pub fn can_end(&self) -> bool {
        self.end
    }

    /// SE-Productions der Moves plus EE wenn die Gruppe enden darf.
    pub fn event_types(&self) -> &EventTypeList {
        &self.list
    }

    /// Move fuer einen Production-Schluessel.
    pub fn find(&self, key: &MoveKey) -> Option<&GroupMove> {
        self.moves.iter().find(|m| &m.key == key)
    }

    /// Substanzen, mit denen es von hier aus weitergehen kann.
    pub fn head_substances(&self) -> Vec<Substance> {
        let mut out: Vec<Substance> = Vec::with_capacity(self.moves.len());
        for m in &self.moves {
            if !out.contains(&m.substance) {
                out.push(m.substance);
            }
        }
        out
    }
}

// ============================================================================
// Sequence / Choice
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct Frame {
    slot: u32,
    occurs: u32,
}

type Config = Vec<Frame>;

/// Ein Blatt-Uebergang einer einzelnen Konfiguration.
struct RawMove {
    substance: Substance,
    particle: ParticleId,
    path: Vec<u32>,
    config: Config,
}

impl RawMove {
    fn prefixed(mut self, frame: Frame, slot: u32) -> Self {
        self.config.insert(0, frame);
        self.path.insert(0, slot);
        self
    }
}

struct Explorer<'a> {
    schema: &'a Schema,
}

impl Explorer<'_> {
    fn fresh(&self, group: GroupId) -> Frame {
        match self.schema.group(group).compositor {
            Compositor::Choice => Frame { slot: UNDECIDED, occurs: 0 },
            Compositor::Sequence | Compositor::All => Frame { slot: 0, occurs: 0 },
        }
    }

    fn bump(&self, p: ParticleId, occurs: u32) -> u32 {
        let cap = match self.schema.particle(p).max_occurs {
            MaxOccurs::Bounded(max) => max,
            MaxOccurs::Unbounded => self.schema.effective_min(p).max(1),
        };
        occurs.saturating_add(1).min(cap)
    }

    /// Moves einer Konfiguration; liefert ob die Gruppe hier enden darf.
    fn advance(&self, group: GroupId, frames: &[Frame], out: &mut Vec<RawMove>) -> Result<bool> {
        let Some((head, tail)) = frames.split_first() else {
            return Ok(true);
        };
        if tail.is_empty() {
            return self.rest(group, *head, out);
        }
        let p = self.schema.group(group).particles[head.slot as usize];
        let Term::Group(child) = self.schema.particle(p).term else {
            return self.rest(group, *head, out);
        };
        let mut inner = Vec::new();
        let child_end = self.advance(child, tail, &mut inner)?;
        out.extend(inner.into_iter().map(|m| m.prefixed(*head, head.slot)));
        if child_end {
            self.rest(group, *head, out)
        } else {
            Ok(false)
        }
    }

    /// Moves nach Abschluss des aktuellen Vorkommens von `frame`.
    fn rest(&self, group: GroupId, frame: Frame, out: &mut Vec<RawMove>) -> Result<bool> {
        let g = self.schema.group(group);
        let n = g.particles.len() as u32;
        match g.compositor {
            Compositor::Sequence => {
                let (mut slot, mut occurs) = (frame.slot, frame.occurs);
                loop {
                    if slot >= n {
                        return Ok(true);
                    }
                    let p = g.particles[slot as usize];
                    if self.schema.particle(p).max_occurs.allows_more(occurs) {
                        self.start(group, slot, occurs, out)?;
                    }
                    if occurs < self.schema.effective_min(p) {
                        return Ok(false);
                    }
                    slot += 1;
                    occurs = 0;
                }
            }
            Compositor::Choice if frame.slot == UNDECIDED => {
                let mut end = n == 0;
                for (i, p) in g.particles.iter().enumerate() {
                    if self.schema.particle(*p).max_occurs.allows_more(0) {
                        self.start(group, i as u32, 0, out)?;
                    }
                    end |= self.schema.effective_min(*p) == 0;
                }
                Ok(end)
            }
            Compositor::Choice => {
                let p = g.particles[frame.slot as usize];
                if self.schema.particle(p).max_occurs.allows_more(frame.occurs) {
                    self.start(group, frame.slot, frame.occurs, out)?;
                }
                Ok(frame.occurs >= self.schema.effective_min(p))
            }
            Compositor::All => Err(Error::unsupported(format!("all {group} nested in another group"))),
        }
    }

    /// Beginnt ein weiteres Vorkommen des Particles an `slot`.
    fn start(&self, group: GroupId, slot: u32, occurs: u32, out: &mut Vec<RawMove>) -> Result<()> {
        let p = self.schema.group(group).particles[slot as usize];
        let frame = Frame { slot, occurs: self.bump(p, occurs) };
        match self.schema.particle(p).term {
            Term::Element(_) | Term::Wildcard(_) => {
                for s in self.schema.head_substances(p) {
                    out.push(RawMove {
                        substance: *s,
                        particle: p,
                        path: vec![slot],
                        config: vec![frame],
                    });
                }
            }
            Term::Group(child) => {
                let mut inner = Vec::new();
                self.rest(child, self.fresh(child), &mut inner)?;
                out.extend(inner.into_iter().map(|m| m.prefixed(frame, slot)));
            }
        }
        Ok(())
    }
}

/// Tiefensuche-Nummerierung aller Blatt-Pfade einer Gruppe.
fn leaf_ordinals(schema: &Schema, group: GroupId) -> FastHashMap<Vec<u32>, u32> {
    fn walk(schema: &Schema, group: GroupId, path: &mut Vec<u32>, out: &mut FastHashMap<Vec<u32>, u32>) {
        for (i, p) in schema.group(group).particles.iter().enumerate() {
            path.push(i as u32);
            match schema.particle(*p).term {
                Term::Group(child) => walk(schema, child, path, out),
                Term::Element(_) | Term::Wildcard(_) => {
                    let next = out.len() as u32;
                    out.insert(path.clone(), next);
                }
            }
            path.pop();
        }
    }

    let mut out = FastHashMap::default();
    walk(schema, group, &mut Vec::new(), &mut out);
    out
}

/// Gesammelte Kandidaten eines Production-Schluessels.
struct Candidate {
    kind: EventKind,
    particle: ParticleId,
    path: Vec<u32>,
    substance: Substance,
    configs: Vec<Config>,
}

/// Automat ueber einer Sequence- oder Choice-Gruppe.
#[derive(Debug, Clone)]
pub struct SequenceChoiceGroupGrammar {
    group: GroupId,
    states: Vec<GroupState>,
}

impl SequenceChoiceGroupGrammar {
    /// Baut den Automaten; `check` aktiviert die Mehrdeutigkeitspruefung.
    pub fn build(schema: &Schema, group: GroupId, check: bool) -> Result<Self> {
        if schema.group(group).compositor == Compositor::All {
            return Err(Error::unsupported(format!("{group} is an all group")));
        }
        let explorer = Explorer { schema };
        let ordinals = leaf_ordinals(schema, group);

        let initial: Vec<Config> = vec![vec![explorer.fresh(group)]];
        let mut index: FastHashMap<Vec<Config>, u32> = FastHashMap::default();
        index.insert(initial.clone(), 0);
        let mut queue: Vec<Vec<Config>> = vec![initial];
        let mut states: Vec<GroupState> = Vec::new();

        let mut next = 0;
        while next < queue.len() {
            let configs = std::mem::take(&mut queue[next]);
            next += 1;

            let mut raw = Vec::new();
            let mut end = false;
            for config in &configs {
                end |= explorer.advance(group, config, &mut raw)?;
            }

            let mut candidates: FastIndexMap<MoveKey, Candidate> = FastIndexMap::default();
            for m in raw {
                for (key, kind) in keys_of(schema, m.substance) {
                    match candidates.get_mut(&key) {
                        Some(c) if c.path == m.path => c.configs.push(m.config.clone()),
                        Some(c) => {
                            if check {
                                warn!(
                                    "{group}: {} and {} compete for {}",
                                    c.particle,
                                    m.particle,
                                    schema.describe(m.substance)
                                );
                                return Err(Error::ambiguity(
                                    format!("{} in {group}", m.particle),
                                    schema.describe(m.substance),
                                ));
                            }
                        }
                        None => {
                            candidates.insert(
                                key,
                                Candidate {
                                    kind,
                                    particle: m.particle,
                                    path: m.path.clone(),
                                    substance: m.substance,
                                    configs: vec![m.config.clone()],
                                },
                            );
                        }
                    }
                }
            }

            let mut moves = Vec::with_capacity(candidates.len());
            for (key, mut c) in candidates {
                c.configs.sort();
                c.configs.dedup();
                let target = match index.get(&c.configs) {
                    Some(t) => *t,
                    None => {
                        if queue.len() >= STATE_LIMIT {
                            return Err(Error::unsupported(format!(
                                "{group} needs more than {STATE_LIMIT} grammar states"
                            )));
                        }
                        let t = queue.len() as u32;
                        index.insert(c.configs.clone(), t);
                        queue.push(c.configs);
                        t
                    }
                };
                let ordinal = ordinals.get(&c.path).copied().unwrap_or(u32::MAX);
                moves.push(GroupMove {
                    key,
                    kind: c.kind,
                    particle: c.particle,
                    path: Arc::from(c.path),
                    substance: c.substance,
                    target,
                    ordinal,
                });
            }
            moves.sort_by(canonical_order);
            states.push(GroupState::new(moves, end));
        }

        debug!("{group}: sequence/choice grammar with {} states", states.len());
        Ok(Self { group, states })
    }
}

// ============================================================================
// All
// ============================================================================

/// Automat ueber einer All-Gruppe; Zustand = Bitmaske der gesehenen Particles.
#[derive(Debug, Clone)]
pub struct AllGroupGrammar {
    group: GroupId,
    required: u32,
    states: Vec<GroupState>,
}

impl AllGroupGrammar {
    pub fn build(schema: &Schema, group: GroupId, check: bool) -> Result<Self> {
        let particles = &schema.group(group).particles;
        if particles.len() > ALL_GROUP_LIMIT {
            return Err(Error::unsupported(format!(
                "all {group} has {} particles (limit {ALL_GROUP_LIMIT})",
                particles.len()
            )));
        }
        let mut required = 0u32;
        let mut entries: Vec<Vec<(MoveKey, EventKind, Substance)>> = Vec::with_capacity(particles.len());
        for (i, p) in particles.iter().enumerate() {
            if let Term::Group(_) = schema.particle(*p).term {
                return Err(Error::unsupported(format!("all {group} contains a nested group")));
            }
            if schema.effective_min(*p) > 0 {
                required |= 1 << i;
            }
            let mut keys = Vec::new();
            for s in schema.head_substances(*p) {
                for (key, kind) in keys_of(schema, *s) {
                    keys.push((key, kind, *s));
                }
            }
            entries.push(keys);
        }

        if check {
            let mut owner: FastHashMap<&MoveKey, usize> = FastHashMap::default();
            for (i, keys) in entries.iter().enumerate() {
                for (key, _, substance) in keys {
                    if let Some(other) = owner.insert(key, i) {
                        if other != i {
                            warn!(
                                "{group}: {} and {} compete for {}",
                                particles[other],
                                particles[i],
                                schema.describe(*substance)
                            );
                            return Err(Error::ambiguity(
                                format!("{} in {group}", particles[i]),
                                schema.describe(*substance),
                            ));
                        }
                    }
                }
            }
        }

        let count = 1usize << particles.len();
        let mut states = Vec::with_capacity(count);
        for mask in 0..count as u32 {
            let mut moves: Vec<GroupMove> = Vec::new();
            for (i, keys) in entries.iter().enumerate() {
                if mask & (1 << i) != 0 {
                    continue;
                }
                for (key, kind, substance) in keys {
                    if moves.iter().any(|m| &m.key == key) {
                        continue;
                    }
                    moves.push(GroupMove {
                        key: key.clone(),
                        kind: kind.clone(),
                        particle: particles[i],
                        path: Arc::from([i as u32]),
                        substance: *substance,
                        target: mask | (1 << i),
                        ordinal: i as u32,
                    });
                }
            }
            moves.sort_by(canonical_order);
            states.push(GroupState::new(moves, mask & required == required));
        }

        debug!("{group}: all grammar with {} particles", particles.len());
        Ok(Self { group, required, states })
    }

    /// Bitmaske der Particles mit effektivem `min > 0`.
    pub fn required(&self) -> u32 {
        self.required
    }
}

// ============================================================================
// GroupGrammar
// ============================================================================

/// Gruppen-Grammatik; Zustand 0 ist die frische Gruppe.
#[derive(Debug, Clone)]
pub enum GroupGrammar {
    SequenceChoice(SequenceChoiceGroupGrammar),
    All(AllGroupGrammar),
}

impl GroupGrammar {
    /// Waehlt den Automaten nach dem Compositor der Gruppe.
    pub fn build(schema: &Schema, group: GroupId, check: bool) -> Result<Self> {
        match schema.group(group).compositor {
            Compositor::All => AllGroupGrammar::build(schema, group, check).map(Self::All),
            Compositor::Sequence | Compositor::Choice => {
                SequenceChoiceGroupGrammar::build(schema, group, check).map(Self::SequenceChoice)
            }
        }
    }

    pub fn group(&self) -> GroupId {
        match self {
            Self::SequenceChoice(g) => g.group,
            Self::All(g) => g.group,
        }
    }

    fn states(&self) -> &[GroupState] {
        match self {
            Self::SequenceChoice(g) => &g.states,
            Self::All(g) => &g.states,
        }
    }

    pub fn state_count(&self) -> usize {
        self.states().len()
    }

    /// # Panics
    ///
    /// Bei einem unbekannten Zustand.
    pub fn state(&self, state: u32) -> &GroupState {
        &self.states()[state as usize]
    }

    pub fn moves(&self, state: u32) -> &[GroupMove] {
        self.state(state).moves()
    }

    pub fn can_end(&self, state: u32) -> bool {
        self.state(state).can_end()
    }

    pub fn event_types(&self, state: u32) -> &EventTypeList {
        self.state(state).event_types()
    }

    pub fn head_substances(&self, state: u32) -> Vec<Substance> {
        self.state(state).head_substances()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ElemId, ProcessContents, SchemaBuilder, WildcardConstraint};

    fn qn(local: &str) -> QName {
        QName::local(local)
    }

    struct Fixture {
        b: SchemaBuilder,
        string: crate::schema::TypeId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut b = SchemaBuilder::new();
            let string = b.simple_type(None);
            Self { b, string }
        }

        fn elem(&mut self, name: &str, min: u32, max: MaxOccurs) -> (ElemId, ParticleId) {
            let e = self.b.local_element(qn(name), self.string);
            let p = self.b.particle(min, max, Term::Element(e)).unwrap();
            (e, p)
        }
    }

    fn names(state: &GroupState) -> Vec<String> {
        state.moves().iter().map(|m| m.kind().to_string()).collect()
    }

    #[test]
    fn sequence_a_stern_b() {
        let mut f = Fixture::new();
        let (_, pa) = f.elem("a", 0, MaxOccurs::Unbounded);
        let (_, pb) = f.elem("b", 1, MaxOccurs::Bounded(1));
        let seq = f.b.sequence(vec![pa, pb]);
        let schema = f.b.build().unwrap();
        let g = GroupGrammar::build(&schema, seq, true).unwrap();

        assert_eq!(names(g.state(0)), vec!["SE(a)", "SE(b)"]);
        assert!(!g.can_end(0));
        let after_a = g.state(0).find(&MoveKey::Element(qn("a"))).unwrap().target();
        assert_eq!(names(g.state(after_a)), vec!["SE(a)", "SE(b)"]);
        assert!(!g.can_end(after_a));
        let after_b = g.state(after_a).find(&MoveKey::Element(qn("b"))).unwrap().target();
        assert!(g.moves(after_b).is_empty());
        assert!(g.can_end(after_b));
        assert_eq!(g.event_types(after_b).describe(), vec!["EE 0"]);
        assert_eq!(g.state_count(), 3);
    }

    #[test]
    fn optional_vor_pflicht_mit_gleichem_namen_ist_mehrdeutig() {
        let mut f = Fixture::new();
        let (_, p1) = f.elem("a", 0, MaxOccurs::Bounded(1));
        let (_, p2) = f.elem("a", 1, MaxOccurs::Bounded(1));
        let seq = f.b.sequence(vec![p1, p2]);
        let schema = f.b.build().unwrap();
        let err = GroupGrammar::build(&schema, seq, true).unwrap_err();
        assert!(err.is_ambiguity());
        assert!(err.to_string().contains("SE(a)"), "{err}");
        // zertifizierte Schemas werden nicht geprueft
        assert!(GroupGrammar::build(&schema, seq, false).is_ok());
    }

    #[test]
    fn pflicht_vor_optional_ist_eindeutig() {
        let mut f = Fixture::new();
        let (_, p1) = f.elem("a", 1, MaxOccurs::Bounded(1));
        let (_, p2) = f.elem("a", 0, MaxOccurs::Bounded(1));
        let seq = f.b.sequence(vec![p1, p2]);
        let schema = f.b.build().unwrap();
        let g = GroupGrammar::build(&schema, seq, true).unwrap();
        let s1 = g.moves(0)[0].target();
        assert_eq!(g.moves(s1)[0].particle(), p2);
        assert!(g.can_end(s1));
    }

    #[test]
    fn verschachtelte_wiederholung_desselben_pfads_ist_eindeutig() {
        // ((a*)*)
        let mut f = Fixture::new();
        let (_, pa) = f.elem("a", 0, MaxOccurs::Unbounded);
        let inner = f.b.sequence(vec![pa]);
        let pi = f.b.particle(0, MaxOccurs::Unbounded, Term::Group(inner)).unwrap();
        let outer = f.b.sequence(vec![pi]);
        let schema = f.b.build().unwrap();
        let g = GroupGrammar::build(&schema, outer, true).unwrap();
        let s1 = g.moves(0)[0].target();
        assert_eq!(names(g.state(s1)), vec!["SE(a)"]);
        assert_eq!(g.moves(s1)[0].path(), &[0, 0]);
    }

    #[test]
    fn leerbare_innere_gruppe_vor_gleichem_element_ist_mehrdeutig() {
        // (a, (b?)?, b)
        let mut f = Fixture::new();
        let (_, pa) = f.elem("a", 1, MaxOccurs::Bounded(1));
        let (_, pb_inner) = f.elem("b", 0, MaxOccurs::Bounded(1));
        let inner = f.b.sequence(vec![pb_inner]);
        let pinner = f.b.particle(0, MaxOccurs::Bounded(1), Term::Group(inner)).unwrap();
        let (_, pb) = f.elem("b", 1, MaxOccurs::Bounded(1));
        let seq = f.b.sequence(vec![pa, pinner, pb]);
        let schema = f.b.build().unwrap();
        let err = GroupGrammar::build(&schema, seq, true).unwrap_err();
        assert!(err.is_ambiguity());
    }

    #[test]
    fn choice_endet_nach_einer_wahl() {
        let mut f = Fixture::new();
        let (_, pa) = f.elem("a", 1, MaxOccurs::Bounded(1));
        let (_, pb) = f.elem("b", 1, MaxOccurs::Bounded(2));
        let choice = f.b.choice(vec![pa, pb]);
        let schema = f.b.build().unwrap();
        let g = GroupGrammar::build(&schema, choice, true).unwrap();
        assert_eq!(names(g.state(0)), vec!["SE(a)", "SE(b)"]);
        let after_a = g.moves(0)[0].target();
        assert!(g.can_end(after_a));
        assert!(g.moves(after_a).is_empty());
        let after_b = g.moves(0)[1].target();
        assert_eq!(names(g.state(after_b)), vec!["SE(b)"]);
        let after_bb = g.moves(after_b)[0].target();
        assert!(g.moves(after_bb).is_empty());
    }

    #[test]
    fn kanonische_reihenfolge_qname_uri_wildcard() {
        let mut f = Fixture::new();
        let any = f.b.wildcard(WildcardConstraint::Any, ProcessContents::Lax).unwrap();
        let pany = f.b.particle(0, MaxOccurs::Bounded(1), Term::Wildcard(any)).unwrap();
        let ns = f
            .b
            .wildcard(
                WildcardConstraint::Namespaces(vec![Arc::from("urn:z"), Arc::from("urn:b")]),
                ProcessContents::Strict,
            )
            .unwrap();
        let pns = f.b.particle(0, MaxOccurs::Bounded(1), Term::Wildcard(ns)).unwrap();
        let (_, px) = f.elem("x", 0, MaxOccurs::Bounded(1));
        let choice = f.b.choice(vec![pany, pns, px]);
        let schema = f.b.build().unwrap();
        let g = GroupGrammar::build(&schema, choice, true).unwrap();
        assert_eq!(names(g.state(0)), vec!["SE(x)", "SE(urn:b:*)", "SE(urn:z:*)", "SE(*)"]);
        assert!(g.can_end(0));
    }

    #[test]
    fn substitution_group_liefert_mitglieder() {
        let mut f = Fixture::new();
        let head = f.b.global_element(qn("shape"), f.string);
        let square = f.b.global_element(qn("square"), f.string);
        let circle = f.b.global_element(qn("circle"), f.string);
        f.b.set_abstract(head);
        f.b.set_substitution_group(square, head);
        f.b.set_substitution_group(circle, head);
        let p = f.b.particle(1, MaxOccurs::Bounded(1), Term::Element(head)).unwrap();
        let seq = f.b.sequence(vec![p]);
        let schema = f.b.build().unwrap();
        let g = GroupGrammar::build(&schema, seq, true).unwrap();
        assert_eq!(names(g.state(0)), vec!["SE(circle)", "SE(square)"]);
        assert_eq!(
            g.head_substances(0),
            vec![Substance::Element(circle), Substance::Element(square)]
        );
        assert_eq!(g.moves(0)[0].target(), g.moves(0)[1].target());
    }

    #[test]
    fn all_gruppe_seen_unseen() {
        let mut f = Fixture::new();
        let (_, pa) = f.elem("a", 1, MaxOccurs::Bounded(1));
        let (_, pb) = f.elem("b", 0, MaxOccurs::Bounded(1));
        let all = f.b.all(vec![pa, pb]);
        let schema = f.b.build().unwrap();
        let g = GroupGrammar::build(&schema, all, true).unwrap();
        assert_eq!(g.state_count(), 4);
        assert_eq!(names(g.state(0)), vec!["SE(a)", "SE(b)"]);
        assert!(!g.can_end(0));
        assert_eq!(names(g.state(1)), vec!["SE(b)"]);
        assert!(g.can_end(1));
        assert_eq!(names(g.state(2)), vec!["SE(a)"]);
        assert!(!g.can_end(2));
        match &g {
            GroupGrammar::All(a) => assert_eq!(a.required(), 0b01),
            GroupGrammar::SequenceChoice(_) => panic!("expected all grammar"),
        }
    }

    #[test]
    fn all_gruppe_mehrdeutig_und_limit() {
        let mut f = Fixture::new();
        let (_, pa) = f.elem("a", 1, MaxOccurs::Bounded(1));
        let (_, pa2) = f.elem("a", 0, MaxOccurs::Bounded(1));
        let all = f.b.all(vec![pa, pa2]);
        let mut many = Vec::new();
        for i in 0..=ALL_GROUP_LIMIT {
            many.push(f.elem(&format!("e{i}"), 0, MaxOccurs::Bounded(1)).1);
        }
        let big = f.b.all(many);
        let schema = f.b.build().unwrap();
        assert!(GroupGrammar::build(&schema, all, true).unwrap_err().is_ambiguity());
        assert!(matches!(
            GroupGrammar::build(&schema, big, true),
            Err(Error::UnsupportedContentModel(_))
        ));
    }

    #[test]
    fn verschachtelte_all_gruppe_wird_abgelehnt() {
        let mut f = Fixture::new();
        let (_, pa) = f.elem("a", 1, MaxOccurs::Bounded(1));
        let all = f.b.all(vec![pa]);
        let pall = f.b.particle(1, MaxOccurs::Bounded(1), Term::Group(all)).unwrap();
        let seq = f.b.sequence(vec![pall]);
        let schema = f.b.build().unwrap();
        assert!(matches!(
            GroupGrammar::build(&schema, seq, true),
            Err(Error::UnsupportedContentModel(_))
        ));
    }

    #[test]
    fn begrenztes_max_zaehlt_vorkommen() {
        let mut f = Fixture::new();
        let (_, pa) = f.elem("a", 2, MaxOccurs::Bounded(3));
        let seq = f.b.sequence(vec![pa]);
        let schema = f.b.build().unwrap();
        let g = GroupGrammar::build(&schema, seq, true).unwrap();
        let s1 = g.moves(0)[0].target();
        assert!(!g.can_end(s1));
        let s2 = g.moves(s1)[0].target();
        assert!(g.can_end(s2));
        let s3 = g.moves(s2)[0].target();
        assert!(g.can_end(s3));
        assert!(g.moves(s3).is_empty());
    }
}
