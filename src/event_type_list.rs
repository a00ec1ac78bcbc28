//! Materialisierte Sicht auf die Productions eines Grammatik-Zustands.
//!
//! Eine [`EventTypeList`] besitzt die Event Types eines Zustands, ihr
//! Event-Code-Tupel und die daraus abgeleiteten Event Codes. Der Treiber
//! sucht darin per QName/URI oder ueber direkte Accessoren (CH, EE, SE(*), ...)
//! die passende Production und reicht deren Seriennummer an die
//! Transition weiter.

use std::sync::Arc;

use crate::event_code::EventCode;
use crate::event_code_tuple::{self, EventCodeTuple, TupleChild};
use crate::event_type::{EventKind, EventType};
use crate::grammar::GrammarKind;
use crate::qname::QName;
use crate::FastHashMap;

/// Direkt adressierbare Terminals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    StartDocument,
    EndDocument,
    ElementAny,
    AttributeAny,
    AttributeUntyped,
    XsiType,
    XsiNil,
    Characters,
    EndElement,
    Namespace,
    SelfContained,
    Comment,
    ProcessingInstruction,
    DocType,
    EntityReference,
}

const SLOT_COUNT: usize = 15;

fn slot_of(kind: &EventKind) -> Option<Slot> {
    Some(match kind {
        EventKind::StartDocument => Slot::StartDocument,
        EventKind::EndDocument => Slot::EndDocument,
        EventKind::StartElementAny { .. } => Slot::ElementAny,
        EventKind::AttributeAny { .. } => Slot::AttributeAny,
        EventKind::AttributeUntyped => Slot::AttributeUntyped,
        EventKind::XsiType => Slot::XsiType,
        EventKind::XsiNil => Slot::XsiNil,
        EventKind::Characters { .. } => Slot::Characters,
        EventKind::EndElement => Slot::EndElement,
        EventKind::NamespaceDeclaration => Slot::Namespace,
        EventKind::SelfContained => Slot::SelfContained,
        EventKind::Comment => Slot::Comment,
        EventKind::ProcessingInstruction => Slot::ProcessingInstruction,
        EventKind::DocType => Slot::DocType,
        EventKind::EntityReference => Slot::EntityReference,
        EventKind::StartElement { .. }
        | EventKind::StartElementNs { .. }
        | EventKind::Attribute { .. }
        | EventKind::AttributeNs { .. } => return None,
    })
}

/// Kandidaten eines Zustands, nach Tiefe sortiert, in kanonischer Reihenfolge.
#[derive(Debug, Clone, Default)]
pub struct EventTypeListBuilder {
    depth1: Vec<EventKind>,
    depth2: Vec<EventKind>,
    depth3: Vec<EventKind>,
}

impl EventTypeListBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, depth: u8, kind: EventKind) -> &mut Self {
        match depth {
            1 => self.depth1.push(kind),
            2 => self.depth2.push(kind),
            3 => self.depth3.push(kind),
            _ => panic!("event type depth {depth}"),
        }
        self
    }

    /// Ob schon ein Terminal dieser Art auf Tiefe 1 liegt.
    pub fn has_depth1(&self, pred: impl Fn(&EventKind) -> bool) -> bool {
        self.depth1.iter().any(pred)
    }

    /// Vorwaerts-Liste (schema-informiert, fest).
    pub fn build(self, owner: GrammarKind) -> EventTypeList {
        self.build_with(owner, false)
    }

    /// Liste mit rueckwaerts wachsendem aeusseren Tupel (eingebaute Grammatiken).
    pub fn build_reversed(self, owner: GrammarKind) -> EventTypeList {
        self.build_with(owner, true)
    }

    fn build_with(self, owner: GrammarKind, reversed: bool) -> EventTypeList {
        let mut events = Vec::with_capacity(self.depth1.len() + self.depth2.len() + self.depth3.len());
        let mut serials: [Vec<u32>; 3] = Default::default();
        for (d, kinds) in [self.depth1, self.depth2, self.depth3].into_iter().enumerate() {
            for kind in kinds {
                let serial = events.len() as u32;
                events.push(EventType::new(kind, d as u8 + 1, 0, serial, owner));
                serials[d].push(serial);
            }
        }
        let root = if reversed {
            event_code_tuple::layer_reversed(&serials[0], &serials[1], &serials[2])
        } else {
            event_code_tuple::layer(&serials[0], &serials[1], &serials[2])
        };
        let mut list = EventTypeList {
            owner,
            events,
            root,
            codes: Vec::new(),
            elements: FastHashMap::default(),
            attributes: FastHashMap::default(),
            element_ns: FastHashMap::default(),
            attribute_ns: FastHashMap::default(),
            shallow: [None; SLOT_COUNT],
            deep: [None; SLOT_COUNT],
        };
        list.reindex();
        list
    }
}

/// Erreichbare Productions eines Zustands mit Event Codes und Lookups.
#[derive(Debug, Clone)]
pub struct EventTypeList {
    owner: GrammarKind,
    events: Vec<EventType>,
    root: EventCodeTuple,
    codes: Vec<EventCode>,
    elements: FastHashMap<QName, u32>,
    attributes: FastHashMap<QName, u32>,
    element_ns: FastHashMap<Arc<str>, u32>,
    attribute_ns: FastHashMap<Arc<str>, u32>,
    /// Terminal auf Tiefe 1 je Slot.
    shallow: [Option<u32>; SLOT_COUNT],
    /// Terminal auf Tiefe 2/3 je Slot (nicht-deklariert bzw. eingebaut).
    deep: [Option<u32>; SLOT_COUNT],
}

impl EventTypeList {
    pub fn owner(&self) -> GrammarKind {
        self.owner
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Event Type mit Seriennummer `serial`.
    pub fn get(&self, serial: u32) -> Option<&EventType> {
        self.events.get(serial as usize)
    }

    /// Alle Event Types in Seriennummer-Reihenfolge.
    pub fn iter(&self) -> impl Iterator<Item = &EventType> {
        self.events.iter()
    }

    /// Das aeussere Event-Code-Tupel.
    pub fn tuple(&self) -> &EventCodeTuple {
        &self.root
    }

    /// Event Code des Terminals `serial`.
    pub fn code(&self, serial: u32) -> EventCode {
        self.codes[serial as usize]
    }

    /// Alle Event Codes, indiziert nach Seriennummer.
    pub fn codes(&self) -> &[EventCode] {
        &self.codes
    }

    /// Terminal zu einem Event Code (Decoder-Richtung).
    pub fn by_code(&self, code: EventCode) -> Option<&EventType> {
        let mut tuple = &self.root;
        let mut parts = [Some(code.part1()), code.part2(), code.part3()].into_iter().flatten();
        loop {
            let part = parts.next()?;
            match tuple.child(part)? {
                TupleChild::Event(serial) => {
                    return if parts.next().is_none() { self.get(*serial) } else { None };
                }
                TupleChild::Tuple(t) => tuple = t,
            }
        }
    }

    /// Kanonische Terminals in Code-Reihenfolge als Kuerzel (Diagnose/Tests).
    pub fn describe(&self) -> Vec<String> {
        let mut out: Vec<(EventCode, String)> = self
            .events
            .iter()
            .map(|e| (self.codes[e.serial() as usize], e.to_string()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out.into_iter().map(|(c, s)| format!("{s} {c}")).collect()
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    /// `SE(qname)`
    pub fn element(&self, name: &QName) -> Option<&EventType> {
        self.elements.get(name).and_then(|s| self.get(*s))
    }

    /// `SE(uri:*)`
    pub fn element_ns(&self, uri: &str) -> Option<&EventType> {
        self.element_ns.get(uri).and_then(|s| self.get(*s))
    }

    /// `SE(*)` auf Tiefe 1.
    pub fn element_wildcard(&self) -> Option<&EventType> {
        self.slot(Slot::ElementAny, false)
    }

    /// Bestes deklariertes Start-Element fuer `name`: `SE(qname)`, dann
    /// `SE(uri:*)`, dann `SE(*)` auf Tiefe 1.
    pub fn match_element(&self, name: &QName) -> Option<&EventType> {
        self.element(name)
            .or_else(|| self.element_ns(name.uri()))
            .or_else(|| self.element_wildcard())
    }

    /// `AT(qname)`
    pub fn attribute(&self, name: &QName) -> Option<&EventType> {
        self.attributes.get(name).and_then(|s| self.get(*s))
    }

    /// `AT(uri:*)`
    pub fn attribute_ns(&self, uri: &str) -> Option<&EventType> {
        self.attribute_ns.get(uri).and_then(|s| self.get(*s))
    }

    /// `AT(*)` auf Tiefe 1.
    pub fn attribute_wildcard(&self) -> Option<&EventType> {
        self.slot(Slot::AttributeAny, false)
    }

    /// Bestes deklariertes Attribut fuer `name`.
    pub fn match_attribute(&self, name: &QName) -> Option<&EventType> {
        self.attribute(name)
            .or_else(|| self.attribute_ns(name.uri()))
            .or_else(|| self.attribute_wildcard())
    }

    /// `CH` auf Tiefe 1.
    pub fn characters(&self) -> Option<&EventType> {
        self.slot(Slot::Characters, false)
    }

    /// `EE` auf Tiefe 1.
    pub fn end_element(&self) -> Option<&EventType> {
        self.slot(Slot::EndElement, false)
    }

    /// `SE(*)` auf Tiefe 2.
    pub fn undeclared_element(&self) -> Option<&EventType> {
        self.slot(Slot::ElementAny, true)
    }

    /// `AT(*)` auf Tiefe 2.
    pub fn undeclared_attribute(&self) -> Option<&EventType> {
        self.slot(Slot::AttributeAny, true)
    }

    /// `AT(*) [untyped value]`
    pub fn untyped_attribute(&self) -> Option<&EventType> {
        self.slot(Slot::AttributeUntyped, true)
    }

    /// `CH` auf Tiefe 2 (`CH [untyped value]` bzw. eingebautes CH).
    pub fn undeclared_characters(&self) -> Option<&EventType> {
        self.slot(Slot::Characters, true)
    }

    /// `EE` auf Tiefe 2.
    pub fn undeclared_end_element(&self) -> Option<&EventType> {
        self.slot(Slot::EndElement, true)
    }

    /// EE auf beliebiger Tiefe, bevorzugt Tiefe 1.
    pub fn any_end_element(&self) -> Option<&EventType> {
        self.end_element().or_else(|| self.undeclared_end_element())
    }

    pub fn xsi_type(&self) -> Option<&EventType> {
        self.any_slot(Slot::XsiType)
    }

    pub fn xsi_nil(&self) -> Option<&EventType> {
        self.any_slot(Slot::XsiNil)
    }

    pub fn namespace_declaration(&self) -> Option<&EventType> {
        self.any_slot(Slot::Namespace)
    }

    pub fn self_contained(&self) -> Option<&EventType> {
        self.any_slot(Slot::SelfContained)
    }

    pub fn comment(&self) -> Option<&EventType> {
        self.any_slot(Slot::Comment)
    }

    pub fn processing_instruction(&self) -> Option<&EventType> {
        self.any_slot(Slot::ProcessingInstruction)
    }

    pub fn doc_type(&self) -> Option<&EventType> {
        self.any_slot(Slot::DocType)
    }

    pub fn entity_reference(&self) -> Option<&EventType> {
        self.any_slot(Slot::EntityReference)
    }

    pub fn start_document(&self) -> Option<&EventType> {
        self.any_slot(Slot::StartDocument)
    }

    pub fn end_document(&self) -> Option<&EventType> {
        self.any_slot(Slot::EndDocument)
    }

    fn slot(&self, slot: Slot, deep: bool) -> Option<&EventType> {
        let table = if deep { &self.deep } else { &self.shallow };
        table[slot as usize].and_then(|s| self.get(s))
    }

    fn any_slot(&self, slot: Slot) -> Option<&EventType> {
        self.slot(slot, false).or_else(|| self.slot(slot, true))
    }

    // ------------------------------------------------------------------
    // Lernen (nur eingebaute Grammatiken)
    // ------------------------------------------------------------------

    /// Haengt eine gelernte Production auf Tiefe 1 an; sie bekommt Code 0,
    /// alle Geschwister auf Tiefe 1 rutschen um eins nach oben.
    ///
    /// Gibt die Seriennummer der neuen Production zurueck.
    ///
    /// # Panics
    ///
    /// Wenn die Liste nicht rueckwaerts waechst.
    pub(crate) fn learn(&mut self, kind: EventKind) -> u32 {
        let serial = self.events.len() as u32;
        self.events.push(EventType::new(kind, 1, 0, serial, self.owner));
        self.root.append(TupleChild::Event(serial));
        self.reindex();
        serial
    }

    /// Berechnet Codes, Indizes und Lookups aus dem Tupel neu.
    fn reindex(&mut self) {
        let mut codes = vec![EventCode::one(0); self.events.len()];
        let mut indices = vec![0u32; self.events.len()];
        self.root.walk(|serial, path| {
            codes[serial as usize] = EventCode::from_path(path);
            indices[serial as usize] = path[path.len() - 1];
        });
        for (event, index) in self.events.iter_mut().zip(indices) {
            event.set_index(index);
        }
        self.codes = codes;

        self.elements.clear();
        self.attributes.clear();
        self.element_ns.clear();
        self.attribute_ns.clear();
        self.shallow = [None; SLOT_COUNT];
        self.deep = [None; SLOT_COUNT];
        for event in &self.events {
            let serial = event.serial();
            match event.kind() {
                EventKind::StartElement { name, .. } => {
                    self.elements.entry(name.clone()).or_insert(serial);
                }
                EventKind::Attribute { name, .. } => {
                    self.attributes.entry(name.clone()).or_insert(serial);
                }
                EventKind::StartElementNs { uri, .. } => {
                    self.element_ns.entry(Arc::clone(uri)).or_insert(serial);
                }
                EventKind::AttributeNs { uri, .. } => {
                    self.attribute_ns.entry(Arc::clone(uri)).or_insert(serial);
                }
                kind => {
                    if let Some(slot) = slot_of(kind) {
                        let table = if event.depth() == 1 { &mut self.shallow } else { &mut self.deep };
                        table[slot as usize].get_or_insert(serial);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builtin_element_content() -> EventTypeList {
        let mut b = EventTypeListBuilder::new();
        b.push(1, EventKind::EndElement)
            .push(2, EventKind::StartElementAny { wildcard: None })
            .push(2, EventKind::Characters { typed: false })
            .push(3, EventKind::Comment)
            .push(3, EventKind::ProcessingInstruction);
        b.build_reversed(GrammarKind::BuiltinElement)
    }

    #[test]
    fn codes_nach_ebenen() {
        let list = builtin_element_content();
        assert_eq!(
            list.describe(),
            vec!["EE 0", "SE(*) 1.0", "CH[untyped] 1.1", "CM 1.2.0", "PI 1.2.1"]
        );
        assert_eq!(list.end_element().map(EventType::serial), Some(0));
        assert_eq!(list.undeclared_element().map(EventType::depth), Some(2));
        assert!(list.element_wildcard().is_none());
        assert_eq!(list.comment().map(EventType::index), Some(0));
    }

    #[test]
    fn lernen_verschiebt_codes() {
        let mut list = builtin_element_content();
        let a = list.learn(EventKind::StartElement { name: QName::local("a"), decl: None });
        assert_eq!(list.code(a), EventCode::one(0));
        assert_eq!(list.end_element().map(|e| list.code(e.serial())), Some(EventCode::one(1)));
        assert_eq!(list.element(&QName::local("a")).map(EventType::serial), Some(a));
        let b = list.learn(EventKind::StartElement { name: QName::local("b"), decl: None });
        assert_eq!(list.code(b), EventCode::one(0));
        assert_eq!(list.code(a), EventCode::one(1));
        assert_eq!(list.tuple().width(), 2);
        assert!(a < b);
    }

    #[test]
    fn by_code_findet_terminal() {
        let list = builtin_element_content();
        assert_eq!(list.by_code(EventCode::three(1, 2, 1)).map(|e| e.to_string()), Some("PI".into()));
        assert!(list.by_code(EventCode::one(1)).is_none());
        assert!(list.by_code(EventCode::three(0, 0, 0)).is_none());
    }

    #[test]
    fn dritte_ebene_ohne_zweite_bleibt_dreiteilig() {
        let mut b = EventTypeListBuilder::new();
        b.push(1, EventKind::StartElementAny { wildcard: None }).push(3, EventKind::Comment);
        let list = b.build(GrammarKind::BuiltinDocument);
        assert_eq!(list.describe(), vec!["SE(*) 0", "CM 1.0.0"]);
        assert_eq!(list.comment().map(EventType::depth), Some(3));
        assert_eq!(list.by_code(EventCode::three(1, 0, 0)).map(EventType::serial), Some(1));
    }

    #[test]
    fn match_element_bevorzugt_qname() {
        let mut b = EventTypeListBuilder::new();
        b.push(1, EventKind::StartElement { name: QName::new("urn:x", "a"), decl: None })
            .push(1, EventKind::StartElementNs { uri: Arc::from("urn:x"), wildcard: None })
            .push(1, EventKind::StartElementAny { wildcard: None });
        let list = b.build(GrammarKind::ElementContent);
        assert_eq!(list.match_element(&QName::new("urn:x", "a")).map(EventType::serial), Some(0));
        assert_eq!(list.match_element(&QName::new("urn:x", "b")).map(EventType::serial), Some(1));
        assert_eq!(list.match_element(&QName::new("urn:y", "b")).map(EventType::serial), Some(2));
    }
}
