//! Schema-Zwischendarstellung fuer die Grammar-Generierung (EXI 8.5).
//!
//! Das Schema ist eine flache Arena: Elemente, Typen, Attribute Uses,
//! Particles, Model Groups und Wildcards liegen in je einem `Vec` und werden
//! ueber Newtype-Indizes ([`ElemId`], [`TypeId`], ...) referenziert. Der Index
//! ist zugleich die Seriennummer unter der der Grammar-Cache memoisiert.
//!
//! Das Parsen von XSD-Dokumenten gehoert nicht hierher; Aufrufer fuellen die
//! Arena ueber [`SchemaBuilder`]. Beim `build()` werden abgeleitete Daten
//! berechnet: Head Substances je Particle, Leerbarkeit, transitive
//! Substitution Groups, sortierte Attribute Uses und benannte Subtypen.
//!
//! # Beispiel
//!
//! ```
//! use erxi_grammar::schema::{ContentClass, MaxOccurs, SchemaBuilder, Term};
//! use erxi_grammar::QName;
//!
//! let mut b = SchemaBuilder::new();
//! let string = b.simple_type(None);
//! let list = b.complex_type(None, ContentClass::ElementOnly);
//! let item = b.local_element(QName::local("item"), string);
//! let p = b.particle(0, MaxOccurs::Unbounded, Term::Element(item)).unwrap();
//! let seq = b.sequence(vec![p]);
//! let top = b.particle(1, MaxOccurs::Bounded(1), Term::Group(seq)).unwrap();
//! b.set_particle(list, top);
//! b.global_element(QName::local("list"), list);
//!
//! let schema = b.build().unwrap();
//! assert_eq!(schema.global_elements().count(), 1);
//! assert!(schema.is_emptiable(top));
//! ```

use std::fmt;
use std::sync::Arc;

use crate::qname::{QName, XSD_NS};
use crate::{Error, FastHashMap, FastIndexMap, Result};

// ============================================================================
// Handles
// ============================================================================

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $tag:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub(crate) u32);

        impl $name {
            /// Seriennummer (Index in der Arena).
            #[inline]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($tag, "#{}"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($tag, "#{}"), self.0)
            }
        }
    };
}

handle!(
    /// Element Declaration.
    ElemId, "element"
);
handle!(
    /// Type Definition.
    TypeId, "type"
);
handle!(
    /// Attribute Use.
    AttrUseId, "attribute"
);
handle!(
    /// Particle.
    ParticleId, "particle"
);
handle!(
    /// Model Group.
    GroupId, "group"
);
handle!(
    /// Wildcard.
    WildcardId, "wildcard"
);

fn next_id(len: usize) -> u32 {
    // Arenen mit mehr als u32::MAX Knoten sind kein realistisches Schema.
    u32::try_from(len).unwrap_or(u32::MAX)
}

// ============================================================================
// Occurs, Wildcards
// ============================================================================

/// MaxOccurs Constraint fuer Particles (EXI 8.5.4.1.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxOccurs {
    /// Endliche Obergrenze.
    Bounded(u32),
    /// `maxOccurs="unbounded"`.
    Unbounded,
}

impl MaxOccurs {
    /// Ob `count` Vorkommen die Obergrenze noch nicht erreicht haben.
    #[inline]
    pub fn allows_more(self, count: u32) -> bool {
        match self {
            Self::Bounded(max) => count < max,
            Self::Unbounded => true,
        }
    }

    /// Ob mehr als ein Vorkommen moeglich ist.
    #[inline]
    pub fn is_repeatable(self) -> bool {
        match self {
            Self::Bounded(max) => max > 1,
            Self::Unbounded => true,
        }
    }
}

/// processContents Attribut fuer Wildcards (XSD 1.0 Part 1 §3.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessContents {
    #[default]
    Strict,
    Lax,
    Skip,
}

/// Namespace Constraint fuer Wildcards (EXI 8.5.4.1.7).
///
/// - `Any` und `Not` erzeugen `SE(*)` bzw. `AT(*)`
/// - `Namespaces` erzeugt `SE(uri:*)` bzw. `AT(uri:*)` fuer jede URI;
///   der leere String steht fuer "absent"
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WildcardConstraint {
    Any,
    Not(Option<Arc<str>>),
    Namespaces(Vec<Arc<str>>),
}

/// Wildcard mit Namespace-Constraint und processContents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wildcard {
    pub constraint: WildcardConstraint,
    pub process_contents: ProcessContents,
}

impl Wildcard {
    /// Ob ein Name mit dieser URI von der Wildcard erfasst wird.
    pub fn matches_uri(&self, uri: &str) -> bool {
        match &self.constraint {
            WildcardConstraint::Any => true,
            WildcardConstraint::Not(None) => !uri.is_empty(),
            WildcardConstraint::Not(Some(ns)) => !uri.is_empty() && &**ns != uri,
            WildcardConstraint::Namespaces(list) => list.iter().any(|ns| &**ns == uri),
        }
    }

    /// URIs fuer `SE(uri:*)`/`AT(uri:*)`, oder `None` fuer `SE(*)`/`AT(*)`.
    pub fn namespaces(&self) -> Option<&[Arc<str>]> {
        match &self.constraint {
            WildcardConstraint::Namespaces(list) => Some(list),
            _ => None,
        }
    }
}

// ============================================================================
// Declarations
// ============================================================================

/// Element Declaration (EXI 8.5.4.1.6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementDecl {
    pub name: QName,
    pub type_id: TypeId,
    pub nillable: bool,
    pub is_abstract: bool,
    pub substitution_head: Option<ElemId>,
    pub global: bool,
}

/// Content Class eines Complex Types (EXI 8.5.4.1.3.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentClass {
    Empty,
    Simple,
    ElementOnly,
    Mixed,
}

/// Art einer Type Definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Simple {
        union: bool,
    },
    Complex {
        content: ContentClass,
        particle: Option<ParticleId>,
        attributes: Vec<AttrUseId>,
        attribute_wildcard: Option<WildcardId>,
    },
}

/// Type Definition (EXI 8.5.4.1.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDef {
    pub name: Option<QName>,
    pub kind: TypeKind,
    pub base: Option<TypeId>,
}

impl TypeDef {
    pub fn is_simple(&self) -> bool {
        matches!(self.kind, TypeKind::Simple { .. })
    }

    pub fn is_union(&self) -> bool {
        matches!(self.kind, TypeKind::Simple { union: true })
    }

    /// Content Class; Simple Types haben `Simple` Content.
    pub fn content(&self) -> ContentClass {
        match &self.kind {
            TypeKind::Simple { .. } => ContentClass::Simple,
            TypeKind::Complex { content, .. } => *content,
        }
    }

    /// Top-Level Particle des Content Models.
    pub fn particle(&self) -> Option<ParticleId> {
        match &self.kind {
            TypeKind::Complex { particle, .. } => *particle,
            TypeKind::Simple { .. } => None,
        }
    }

    /// Attribute Uses, sortiert nach local-name, dann URI.
    pub fn attributes(&self) -> &[AttrUseId] {
        match &self.kind {
            TypeKind::Complex { attributes, .. } => attributes,
            TypeKind::Simple { .. } => &[],
        }
    }

    pub fn attribute_wildcard(&self) -> Option<WildcardId> {
        match &self.kind {
            TypeKind::Complex { attribute_wildcard, .. } => *attribute_wildcard,
            TypeKind::Simple { .. } => None,
        }
    }
}

/// Attribute Use (EXI 8.5.4.1.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeUse {
    pub name: QName,
    pub required: bool,
    pub type_id: Option<TypeId>,
}

/// Term eines Particles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Term {
    Element(ElemId),
    Wildcard(WildcardId),
    Group(GroupId),
}

/// Particle (EXI 8.5.4.1.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Particle {
    pub min_occurs: u32,
    pub max_occurs: MaxOccurs,
    pub term: Term,
}

/// Compositor einer Model Group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compositor {
    Sequence,
    Choice,
    All,
}

/// Model Group (EXI 8.5.4.1.8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelGroup {
    pub compositor: Compositor,
    pub particles: Vec<ParticleId>,
}

/// Schema-Knoten den eine Production referenziert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Substance {
    Element(ElemId),
    Wildcard(WildcardId),
}

impl fmt::Display for Substance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Element(e) => write!(f, "{e}"),
            Self::Wildcard(w) => write!(f, "{w}"),
        }
    }
}

// ============================================================================
// Schema
// ============================================================================

/// Unveraenderliche Schema-Arena.
#[derive(Debug, Clone)]
pub struct Schema {
    elements: Vec<ElementDecl>,
    types: Vec<TypeDef>,
    attribute_uses: Vec<AttributeUse>,
    particles: Vec<Particle>,
    groups: Vec<ModelGroup>,
    wildcards: Vec<Wildcard>,
    // abgeleitet
    emptiable: Vec<bool>,
    term_emptiable: Vec<bool>,
    heads: Vec<Vec<Substance>>,
    substitutables: Vec<Vec<ElemId>>,
    named_sub_types: Vec<bool>,
    global_elements: FastIndexMap<QName, ElemId>,
    named_types: FastHashMap<QName, TypeId>,
    any_type: TypeId,
    ambiguity_free: bool,
}

impl Schema {
    pub fn element(&self, id: ElemId) -> &ElementDecl {
        &self.elements[id.index()]
    }

    pub fn type_def(&self, id: TypeId) -> &TypeDef {
        &self.types[id.index()]
    }

    pub fn attribute_use(&self, id: AttrUseId) -> &AttributeUse {
        &self.attribute_uses[id.index()]
    }

    pub fn particle(&self, id: ParticleId) -> &Particle {
        &self.particles[id.index()]
    }

    pub fn group(&self, id: GroupId) -> &ModelGroup {
        &self.groups[id.index()]
    }

    pub fn wildcard(&self, id: WildcardId) -> &Wildcard {
        &self.wildcards[id.index()]
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Alle Element Declarations in Seriennummer-Reihenfolge.
    pub fn elements(&self) -> impl Iterator<Item = (ElemId, &ElementDecl)> {
        self.elements
            .iter()
            .enumerate()
            .map(|(i, e)| (ElemId(next_id(i)), e))
    }

    /// Alle Type Definitions in Seriennummer-Reihenfolge.
    pub fn types(&self) -> impl Iterator<Item = (TypeId, &TypeDef)> {
        self.types
            .iter()
            .enumerate()
            .map(|(i, t)| (TypeId(next_id(i)), t))
    }

    /// Attribute Uses aller Typen (fuer die Element Fragment Grammar).
    pub fn attribute_uses(&self) -> impl Iterator<Item = &AttributeUse> {
        self.attribute_uses.iter()
    }

    /// Globale Elemente in Deklarationsreihenfolge.
    pub fn global_elements(&self) -> impl Iterator<Item = (&QName, ElemId)> {
        self.global_elements.iter().map(|(q, e)| (q, *e))
    }

    pub fn global_element(&self, name: &QName) -> Option<ElemId> {
        self.global_elements.get(name).copied()
    }

    pub fn type_by_name(&self, name: &QName) -> Option<TypeId> {
        self.named_types.get(name).copied()
    }

    /// Der eingebaute Typ `xs:anyType`.
    pub fn any_type(&self) -> TypeId {
        self.any_type
    }

    /// Ob ein Particle null Vorkommen matchen kann.
    pub fn is_emptiable(&self, id: ParticleId) -> bool {
        self.emptiable[id.index()]
    }

    /// Kleinste Vorkommenszahl die der Particle erzwingt: `min_occurs`, oder 0
    /// wenn schon sein Term leer sein darf (dann kann jedes geforderte
    /// Vorkommen leer bleiben).
    pub fn effective_min(&self, id: ParticleId) -> u32 {
        if self.term_emptiable[id.index()] {
            0
        } else {
            self.particles[id.index()].min_occurs
        }
    }

    /// Head Substances eines Particles: die Substanzen, mit denen ein
    /// Vorkommen beginnen kann.
    ///
    /// Element-Particles liefern das Element (falls nicht abstrakt) und alle
    /// transitiven Mitglieder seiner Substitution Group.
    pub fn head_substances(&self, id: ParticleId) -> &[Substance] {
        &self.heads[id.index()]
    }

    /// Nicht-abstrakte Elemente, die an Stelle von `id` stehen koennen
    /// (inklusive `id` selbst), sortiert nach local-name, dann URI.
    pub fn substitutables(&self, id: ElemId) -> &[ElemId] {
        &self.substitutables[id.index()]
    }

    /// Ob benannte Typen von `id` abgeleitet sind (EXI 8.5.4.4.2).
    pub fn has_named_sub_types(&self, id: TypeId) -> bool {
        self.named_sub_types[id.index()]
    }

    /// Ob das Schema von [`crate::cache::check_grammars`] zertifiziert wurde.
    pub fn is_ambiguity_free(&self) -> bool {
        self.ambiguity_free
    }

    pub(crate) fn set_ambiguity_free(&mut self) {
        self.ambiguity_free = true;
    }

    /// Kurzbeschreibung einer Substanz fuer Fehlermeldungen.
    pub fn describe(&self, substance: Substance) -> String {
        match substance {
            Substance::Element(e) => format!("SE({})", self.element(e).name),
            Substance::Wildcard(w) => match self.wildcard(w).namespaces() {
                Some(list) => {
                    let uris: Vec<&str> = list.iter().map(|u| &**u).collect();
                    format!("SE({{{}}}:*)", uris.join(" "))
                }
                None => "SE(*)".to_string(),
            },
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Fuellt die Schema-Arena. Handles werden sofort vergeben, damit rekursive
/// Content Models (Element → Typ → Particle → Element) aufgebaut werden koennen.
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    elements: Vec<ElementDecl>,
    types: Vec<TypeDef>,
    attribute_uses: Vec<AttributeUse>,
    particles: Vec<Particle>,
    groups: Vec<ModelGroup>,
    wildcards: Vec<Wildcard>,
    any_type: TypeId,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaBuilder {
    /// Neuer Builder mit vordefiniertem `xs:anyType`.
    pub fn new() -> Self {
        let mut b = Self {
            elements: Vec::new(),
            types: Vec::new(),
            attribute_uses: Vec::new(),
            particles: Vec::new(),
            groups: Vec::new(),
            wildcards: Vec::new(),
            any_type: TypeId(0),
        };
        // xs:anyType: mixed, beliebige Attribute, (any lax)*
        let any_type = b.complex_type(Some(QName::new(XSD_NS, "anyType")), ContentClass::Mixed);
        let wc = b.push_wildcard(WildcardConstraint::Any, ProcessContents::Lax);
        let attr_wc = b.push_wildcard(WildcardConstraint::Any, ProcessContents::Lax);
        let p = b.push_particle(0, MaxOccurs::Unbounded, Term::Wildcard(wc));
        let seq = b.sequence(vec![p]);
        let top = b.push_particle(1, MaxOccurs::Bounded(1), Term::Group(seq));
        b.set_particle(any_type, top);
        b.set_attribute_wildcard(any_type, attr_wc);
        b.any_type = any_type;
        b
    }

    pub fn any_type(&self) -> TypeId {
        self.any_type
    }

    /// Simple Type (optional benannt).
    pub fn simple_type(&mut self, name: Option<QName>) -> TypeId {
        self.push_type(name, TypeKind::Simple { union: false })
    }

    /// Union Simple Type (xsi:type auch im Strict-Mode erlaubt).
    pub fn union_type(&mut self, name: Option<QName>) -> TypeId {
        self.push_type(name, TypeKind::Simple { union: true })
    }

    /// Complex Type ohne Particle und Attribute.
    pub fn complex_type(&mut self, name: Option<QName>, content: ContentClass) -> TypeId {
        self.push_type(
            name,
            TypeKind::Complex {
                content,
                particle: None,
                attributes: Vec::new(),
                attribute_wildcard: None,
            },
        )
    }

    pub fn set_base_type(&mut self, ty: TypeId, base: TypeId) {
        self.types[ty.index()].base = Some(base);
    }

    /// Setzt das Top-Level Particle eines Complex Types.
    ///
    /// # Panics
    ///
    /// Wenn `ty` ein Simple Type ist.
    pub fn set_particle(&mut self, ty: TypeId, top: ParticleId) {
        match &mut self.types[ty.index()].kind {
            TypeKind::Complex { particle, .. } => *particle = Some(top),
            TypeKind::Simple { .. } => panic!("set_particle on simple {ty}"),
        }
    }

    /// Fuegt einem Complex Type einen Attribute Use hinzu.
    ///
    /// # Panics
    ///
    /// Wenn `ty` ein Simple Type ist.
    pub fn add_attribute(&mut self, ty: TypeId, name: QName, required: bool) -> AttrUseId {
        let id = AttrUseId(next_id(self.attribute_uses.len()));
        self.attribute_uses.push(AttributeUse {
            name,
            required,
            type_id: None,
        });
        match &mut self.types[ty.index()].kind {
            TypeKind::Complex { attributes, .. } => attributes.push(id),
            TypeKind::Simple { .. } => panic!("add_attribute on simple {ty}"),
        }
        id
    }

    /// Setzt die Attribute Wildcard eines Complex Types.
    ///
    /// # Panics
    ///
    /// Wenn `ty` ein Simple Type ist.
    pub fn set_attribute_wildcard(&mut self, ty: TypeId, wildcard: WildcardId) {
        match &mut self.types[ty.index()].kind {
            TypeKind::Complex { attribute_wildcard, .. } => *attribute_wildcard = Some(wildcard),
            TypeKind::Simple { .. } => panic!("set_attribute_wildcard on simple {ty}"),
        }
    }

    /// Globale Element Declaration.
    pub fn global_element(&mut self, name: QName, type_id: TypeId) -> ElemId {
        self.push_element(name, type_id, true)
    }

    /// Lokale Element Declaration.
    pub fn local_element(&mut self, name: QName, type_id: TypeId) -> ElemId {
        self.push_element(name, type_id, false)
    }

    pub fn set_nillable(&mut self, e: ElemId) {
        self.elements[e.index()].nillable = true;
    }

    pub fn set_abstract(&mut self, e: ElemId) {
        self.elements[e.index()].is_abstract = true;
    }

    pub fn set_substitution_group(&mut self, member: ElemId, head: ElemId) {
        self.elements[member.index()].substitution_head = Some(head);
    }

    /// Wildcard; eine leere Namespace-Liste ist ungueltig.
    pub fn wildcard(
        &mut self,
        constraint: WildcardConstraint,
        process_contents: ProcessContents,
    ) -> Result<WildcardId> {
        if let WildcardConstraint::Namespaces(list) = &constraint {
            if list.is_empty() {
                return Err(Error::EmptyNamespaceList);
            }
        }
        Ok(self.push_wildcard(constraint, process_contents))
    }

    /// Particle; `max < min` ist ungueltig.
    pub fn particle(&mut self, min_occurs: u32, max_occurs: MaxOccurs, term: Term) -> Result<ParticleId> {
        if let MaxOccurs::Bounded(max) = max_occurs {
            if max < min_occurs {
                return Err(Error::InvalidParticleOccurs { min: min_occurs, max });
            }
        }
        Ok(self.push_particle(min_occurs, max_occurs, term))
    }

    pub fn sequence(&mut self, particles: Vec<ParticleId>) -> GroupId {
        self.push_group(Compositor::Sequence, particles)
    }

    pub fn choice(&mut self, particles: Vec<ParticleId>) -> GroupId {
        self.push_group(Compositor::Choice, particles)
    }

    pub fn all(&mut self, particles: Vec<ParticleId>) -> GroupId {
        self.push_group(Compositor::All, particles)
    }

    /// Schliesst die Arena ab und berechnet die abgeleiteten Daten.
    pub fn build(mut self) -> Result<Schema> {
        for ty in &mut self.types {
            if let TypeKind::Complex { attributes, .. } = &mut ty.kind {
                let uses = &self.attribute_uses;
                attributes.sort_by(|a, b| uses[a.index()].name.cmp(&uses[b.index()].name));
            }
        }

        let mut global_elements = FastIndexMap::default();
        for (i, e) in self.elements.iter().enumerate() {
            if e.global {
                global_elements.entry(e.name.clone()).or_insert(ElemId(next_id(i)));
            }
        }
        let mut named_types = FastHashMap::default();
        for (i, t) in self.types.iter().enumerate() {
            if let Some(name) = &t.name {
                named_types.entry(name.clone()).or_insert(TypeId(next_id(i)));
            }
        }

        let substitutables = self.compute_substitutables();
        let named_sub_types = self.compute_named_sub_types();

        // Particles verweisen nur auf Gruppen, deren Particles frueher angelegt
        // wurden: ein Durchlauf in Index-Reihenfolge genuegt.
        let mut emptiable = Vec::with_capacity(self.particles.len());
        let mut term_emptiable_of = Vec::with_capacity(self.particles.len());
        let mut heads: Vec<Vec<Substance>> = Vec::with_capacity(self.particles.len());
        for p in &self.particles {
            let (term_emptiable, term_heads) = match p.term {
                Term::Element(e) => (
                    false,
                    substitutables[e.index()]
                        .iter()
                        .map(|m| Substance::Element(*m))
                        .collect(),
                ),
                Term::Wildcard(w) => (false, vec![Substance::Wildcard(w)]),
                Term::Group(g) => group_first(&self.groups[g.index()], &emptiable, &heads),
            };
            emptiable.push(p.min_occurs == 0 || term_emptiable);
            term_emptiable_of.push(term_emptiable);
            heads.push(term_heads);
        }

        Ok(Schema {
            elements: self.elements,
            types: self.types,
            attribute_uses: self.attribute_uses,
            particles: self.particles,
            groups: self.groups,
            wildcards: self.wildcards,
            emptiable,
            term_emptiable: term_emptiable_of,
            heads,
            substitutables,
            named_sub_types,
            global_elements,
            named_types,
            any_type: self.any_type,
            ambiguity_free: false,
        })
    }

    fn compute_substitutables(&self) -> Vec<Vec<ElemId>> {
        let mut members: Vec<Vec<ElemId>> = vec![Vec::new(); self.elements.len()];
        for (i, e) in self.elements.iter().enumerate() {
            if let Some(head) = e.substitution_head {
                members[head.index()].push(ElemId(next_id(i)));
            }
        }
        (0..self.elements.len())
            .map(|i| {
                let mut out = Vec::new();
                let mut stack = vec![ElemId(next_id(i))];
                let mut seen = vec![false; self.elements.len()];
                while let Some(e) = stack.pop() {
                    if std::mem::replace(&mut seen[e.index()], true) {
                        continue;
                    }
                    if !self.elements[e.index()].is_abstract {
                        out.push(e);
                    }
                    stack.extend(members[e.index()].iter().copied());
                }
                out.sort_by(|a, b| {
                    self.elements[a.index()]
                        .name
                        .cmp(&self.elements[b.index()].name)
                });
                out
            })
            .collect()
    }

    fn compute_named_sub_types(&self) -> Vec<bool> {
        let mut flags = vec![false; self.types.len()];
        for t in &self.types {
            if t.name.is_none() {
                continue;
            }
            let mut base = t.base;
            let mut steps = 0;
            while let Some(b) = base {
                flags[b.index()] = true;
                base = self.types[b.index()].base;
                steps += 1;
                if steps > self.types.len() {
                    break;
                }
            }
        }
        flags
    }

    fn push_type(&mut self, name: Option<QName>, kind: TypeKind) -> TypeId {
        let id = TypeId(next_id(self.types.len()));
        self.types.push(TypeDef { name, kind, base: None });
        id
    }

    fn push_element(&mut self, name: QName, type_id: TypeId, global: bool) -> ElemId {
        let id = ElemId(next_id(self.elements.len()));
        self.elements.push(ElementDecl {
            name,
            type_id,
            nillable: false,
            is_abstract: false,
            substitution_head: None,
            global,
        });
        id
    }

    fn push_wildcard(&mut self, constraint: WildcardConstraint, process_contents: ProcessContents) -> WildcardId {
        let id = WildcardId(next_id(self.wildcards.len()));
        self.wildcards.push(Wildcard {
            constraint,
            process_contents,
        });
        id
    }

    fn push_particle(&mut self, min_occurs: u32, max_occurs: MaxOccurs, term: Term) -> ParticleId {
        let id = ParticleId(next_id(self.particles.len()));
        self.particles.push(Particle {
            min_occurs,
            max_occurs,
            term,
        });
        id
    }

    fn push_group(&mut self, compositor: Compositor, particles: Vec<ParticleId>) -> GroupId {
        let id = GroupId(next_id(self.groups.len()));
        self.groups.push(ModelGroup { compositor, particles });
        id
    }
}

/// Leerbarkeit und First-Menge einer Gruppe aus den bereits berechneten
/// Werten ihrer Particles.
fn group_first(group: &ModelGroup, emptiable: &[bool], heads: &[Vec<Substance>]) -> (bool, Vec<Substance>) {
    fn push_all(hs: &[Substance], first: &mut Vec<Substance>) {
        for h in hs {
            if !first.contains(h) {
                first.push(*h);
            }
        }
    }

    let mut first: Vec<Substance> = Vec::new();
    match group.compositor {
        Compositor::Sequence => {
            for p in &group.particles {
                push_all(&heads[p.index()], &mut first);
                if !emptiable[p.index()] {
                    return (false, first);
                }
            }
            (true, first)
        }
        Compositor::Choice => {
            let mut any_emptiable = group.particles.is_empty();
            for p in &group.particles {
                push_all(&heads[p.index()], &mut first);
                any_emptiable |= emptiable[p.index()];
            }
            (any_emptiable, first)
        }
        Compositor::All => {
            for p in &group.particles {
                push_all(&heads[p.index()], &mut first);
            }
            (group.particles.iter().all(|p| emptiable[p.index()]), first)
        }
    }
}
