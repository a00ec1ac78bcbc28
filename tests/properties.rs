//! Eigenschaften der Event-Code-Vergabe und der Grammatik-Konstruktion,
//! geprueft ueber zufaellige Eingaben.

use std::collections::BTreeSet;
use std::sync::Arc;

use erxi_grammar::event_type_list::EventTypeListBuilder;
use erxi_grammar::grammar::BuiltinFragmentGrammar;
use erxi_grammar::grammar::GroupGrammar;
use erxi_grammar::grammar::document::CONTENT;
use erxi_grammar::schema::{ContentClass, GroupId, MaxOccurs, ParticleId, Substance, Term};
use erxi_grammar::{
    EventCode, EventKind, GrammarCache, GrammarKind, GrammarOptions, GrammarStateStack, QName, Schema, SchemaBuilder,
};
use proptest::prelude::*;

fn qn(local: &str) -> QName {
    QName::local(local)
}

fn se(name: String) -> EventKind {
    EventKind::StartElement {
        name: QName::local(name),
        decl: None,
    }
}

/// Kleinstes `b` mit `2^b >= n`.
fn ceil_log2(n: usize) -> u8 {
    (0u8..).find(|b| (1usize << b) >= n).unwrap_or(0)
}

/// Blatt-Particle: (min, max) mit max >= 1; `None` = unbounded.
fn occurs() -> impl Strategy<Value = (u32, Option<u32>)> {
    (0u32..3).prop_flat_map(|min| {
        prop_oneof![
            Just(None),
            (min.max(1)..min + 3).prop_map(Some),
        ]
        .prop_map(move |max| (min, max))
    })
}

fn max_occurs(max: Option<u32>) -> MaxOccurs {
    match max {
        Some(m) => MaxOccurs::Bounded(m),
        None => MaxOccurs::Unbounded,
    }
}

/// Gruppe ueber Elementen mit paarweise verschiedenen Namen `e0, e1, ...`.
fn group_schema(choice: bool, leaves: &[(u32, Option<u32>)]) -> (Schema, GroupId, ParticleId) {
    let mut sb = SchemaBuilder::new();
    let string = sb.simple_type(None);
    let particles: Vec<ParticleId> = leaves
        .iter()
        .enumerate()
        .map(|(i, &(min, max))| {
            let e = sb.local_element(qn(&format!("e{i}")), string);
            sb.particle(min, max_occurs(max), Term::Element(e)).unwrap()
        })
        .collect();
    let group = if choice { sb.choice(particles) } else { sb.sequence(particles) };
    let top = sb.particle(1, MaxOccurs::Bounded(1), Term::Group(group)).unwrap();
    let ty = sb.complex_type(None, ContentClass::ElementOnly);
    sb.set_particle(ty, top);
    (sb.build().unwrap(), group, top)
}

/// root: (a*, b), nicht strikt.
fn a_star_b() -> Schema {
    let mut sb = SchemaBuilder::new();
    let string = sb.simple_type(None);
    let a = sb.local_element(qn("a"), string);
    let b = sb.local_element(qn("b"), string);
    let pa = sb.particle(0, MaxOccurs::Unbounded, Term::Element(a)).unwrap();
    let pb = sb.particle(1, MaxOccurs::Bounded(1), Term::Element(b)).unwrap();
    let seq = sb.sequence(vec![pa, pb]);
    let top = sb.particle(1, MaxOccurs::Bounded(1), Term::Group(seq)).unwrap();
    let ty = sb.complex_type(None, ContentClass::ElementOnly);
    sb.set_particle(ty, top);
    sb.global_element(qn("root"), ty);
    sb.build().unwrap()
}

/// Ein Dokument `<root>` mit Textkindern `children`; liefert alle Event Codes.
fn replay(stack: &mut GrammarStateStack, children: &[&str]) -> Vec<EventCode> {
    fn open(stack: &mut GrammarStateStack, name: &str) -> EventCode {
        let declared = stack.next_event_types().element(&qn(name)).map(|e| e.serial());
        match declared {
            Some(serial) => stack.element(serial, &qn(name)).unwrap(),
            None => stack.undeclared_element(&qn(name)).unwrap(),
        }
    }
    let mut codes = vec![stack.start_document(), open(stack, "root")];
    for child in children {
        codes.push(open(stack, child));
        codes.push(if stack.next_event_types().characters().is_some() {
            stack.chars()
        } else {
            stack.undeclared_chars()
        });
        codes.push(stack.end());
    }
    codes.push(stack.end());
    codes.push(stack.end_document());
    codes
}

/// Index `i` des Blatts `e{i}` aus [`group_schema`].
fn leaf_index(kind: &EventKind) -> usize {
    kind.name()
        .and_then(|n| n.local_name().strip_prefix('e'))
        .and_then(|i| i.parse().ok())
        .unwrap_or_else(|| panic!("unexpected move {kind}"))
}

const NAMES: [&str; 4] = ["a", "b", "u", "v"];

proptest! {
    /// Die Breite jeder Ebene ist ⌈log₂ k⌉ fuer k direkte Kinder.
    #[test]
    fn prop_tupelbreite(d1 in 0usize..20, d2 in 0usize..6, d3 in 0usize..6) {
        prop_assume!(d1 + d2 + d3 > 0);
        let mut builder = EventTypeListBuilder::new();
        for i in 0..d1 {
            builder.push(1, se(format!("a{i}")));
        }
        for i in 0..d2 {
            builder.push(2, se(format!("b{i}")));
        }
        for i in 0..d3 {
            builder.push(3, se(format!("c{i}")));
        }
        let list = builder.build(GrammarKind::ElementContent);

        let outer = d1 + usize::from(d2 + d3 > 0);
        prop_assert_eq!(list.tuple().width(), ceil_log2(outer));
        let inner = d2 + usize::from(d3 > 0);
        if let Some(nested) = list.tuple().nested() {
            prop_assert_eq!(nested.width(), ceil_log2(inner));
            match nested.nested() {
                Some(third) => prop_assert_eq!(third.width(), ceil_log2(d3)),
                None => prop_assert_eq!(d3, 0),
            }
        } else {
            prop_assert_eq!(d2 + d3, 0);
        }

        // Codes sind eindeutig und erste Teile liegen unter k.
        let codes: BTreeSet<EventCode> = list.codes().iter().copied().collect();
        prop_assert_eq!(codes.len(), d1 + d2 + d3);
        prop_assert!(list.codes().iter().all(|c| (c.part1() as usize) < outer));
        // Tiefe 3 hat immer dreiteilige Codes.
        prop_assert!(list.iter().filter(|e| e.depth() == 3).all(|e| list.code(e.serial()).length() == 3));
    }

    /// Gelernte Productions behalten ihre Seriennummer; die juengste hat Code 0.
    #[test]
    fn prop_lernen_ist_stabil(picks in prop::collection::vec(0usize..6, 0..30)) {
        let mut g = BuiltinFragmentGrammar::new(GrammarOptions::NONE);
        let mut learned: Vec<(QName, u32)> = Vec::new();
        for pick in picks {
            let name = qn(&format!("n{pick}"));
            let serial = g.learn_element(&name);
            match learned.iter().find(|(n, _)| *n == name) {
                Some((_, known)) => prop_assert_eq!(*known, serial),
                None => learned.push((name, serial)),
            }
        }
        let list = g.event_types(CONTENT);
        let count = learned.len() as u32;
        for (age, (name, serial)) in learned.iter().enumerate() {
            prop_assert_eq!(list.element(name).map(|e| e.serial()), Some(*serial));
            prop_assert_eq!(list.code(*serial), EventCode::one(count - 1 - age as u32));
        }
        let any = list.element_wildcard().map(|e| list.code(e.serial()));
        prop_assert_eq!(any, Some(EventCode::one(count)));
    }

    /// Zustand 0 einer Gruppe bietet genau die Head Substances des Particles an.
    #[test]
    fn prop_kopf_substanzen(choice in any::<bool>(), leaves in prop::collection::vec(occurs(), 1..6)) {
        let (schema, group, top) = group_schema(choice, &leaves);
        let grammar = GroupGrammar::build(&schema, group, true).unwrap();
        let offered: BTreeSet<Substance> = grammar.head_substances(0).into_iter().collect();
        let expected: BTreeSet<Substance> = schema.head_substances(top).iter().copied().collect();
        prop_assert_eq!(offered, expected);
    }

    /// Nach einem Schritt ueber Particle i einer Sequence werden nur Particles
    /// ab i angeboten, i selbst nur wenn es sich wiederholen darf. Bei (1, 1)
    /// sind es genau die Particles bis zum naechsten Pflicht-Particle.
    #[test]
    fn prop_kopf_substanzen_nach_schritt(leaves in prop::collection::vec(occurs(), 1..6)) {
        let (schema, group, _) = group_schema(false, &leaves);
        let grammar = GroupGrammar::build(&schema, group, true).unwrap();
        for s in 0..grammar.state_count() as u32 {
            for m in grammar.moves(s) {
                let i = leaf_index(m.kind());
                let offered: BTreeSet<usize> = grammar.moves(m.target()).iter().map(|n| leaf_index(n.kind())).collect();
                let first = if leaves[i].1 == Some(1) { i + 1 } else { i };
                prop_assert!(offered.iter().all(|&j| j >= first), "state {s}, e{i}: {offered:?}");
                if leaves[i] == (1, Some(1)) {
                    let last = (i + 1..leaves.len()).find(|&j| leaves[j].0 > 0).unwrap_or(leaves.len() - 1);
                    let expected: BTreeSet<usize> = (i + 1..=last).collect();
                    prop_assert_eq!(&offered, &expected);
                    prop_assert_eq!(grammar.can_end(m.target()), leaves[i + 1..].iter().all(|l| l.0 == 0));
                }
            }
        }
    }

    /// Ein optionales erstes Particle einer Sequence nimmt keine Heads weg.
    #[test]
    fn prop_optionaler_kopf_erweitert(leaves in prop::collection::vec(occurs(), 1..6)) {
        let mut required = leaves.clone();
        let mut optional = leaves;
        required[0].0 = required[0].0.max(1);
        optional[0].0 = 0;
        let (strict_schema, _, strict_top) = group_schema(false, &required);
        let (loose_schema, _, loose_top) = group_schema(false, &optional);
        let strict: BTreeSet<Substance> = strict_schema.head_substances(strict_top).iter().copied().collect();
        let loose: BTreeSet<Substance> = loose_schema.head_substances(loose_top).iter().copied().collect();
        prop_assert!(strict.is_subset(&loose));
    }

    /// Gleiche Events ergeben gleiche Codes, unabhaengig von anderen Sessions
    /// auf demselben Cache.
    #[test]
    fn prop_sessions_deterministisch(
        picks in prop::collection::vec(0usize..4, 0..12),
        noise in prop::collection::vec(0usize..4, 0..12),
    ) {
        let children: Vec<&str> = picks.iter().map(|&i| NAMES[i]).collect();
        let other: Vec<&str> = noise.iter().map(|&i| NAMES[i]).collect();

        let fresh = Arc::new(GrammarCache::new(Arc::new(a_star_b()), GrammarOptions::DEFAULT));
        let expected = replay(&mut GrammarStateStack::new(fresh), &children);

        let shared = Arc::new(GrammarCache::new(Arc::new(a_star_b()), GrammarOptions::DEFAULT));
        replay(&mut GrammarStateStack::new(Arc::clone(&shared)), &other);
        let first = replay(&mut GrammarStateStack::new(Arc::clone(&shared)), &children);
        let second = replay(&mut GrammarStateStack::new(shared), &children);
        prop_assert_eq!(&first, &expected);
        prop_assert_eq!(&second, &expected);
    }
}
