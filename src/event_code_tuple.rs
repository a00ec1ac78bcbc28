//! Event-Code-Tupel: die inneren Knoten der Production-Grammatik (EXI 6.2).
//!
//! Ein Tupel ist eine geordnete Folge von Kindern (Event Types oder
//! verschachtelte Tupel). Der Event-Code-Teil auf seiner Ebene waehlt ein Kind
//! aus und braucht `⌈log₂(Kinder)⌉` Bits.
//!
//! Zwei Varianten:
//! - **vorwaerts** (schema-informiert): Kind `i` hat Code `i`, fest ab Aufbau
//! - **rueckwaerts** (eingebaute Grammatiken): Kinder werden am Ende
//!   angehaengt, der Code eines Kindes an Speicherposition `p` ist
//!   `len-1-p`. Ein neues Kind bekommt Code 0, alle aelteren rutschen um eins
//!   nach oben (EXI 8.4.2, 8.4.3), ihre Speicherposition bleibt aber gleich.

use crate::bit_width;

/// Kind eines Tupels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TupleChild {
    /// Seriennummer eines Event Types in der besitzenden Liste.
    Event(u32),
    Tuple(Box<EventCodeTuple>),
}

/// Geordnete Kinder plus Wachstumsrichtung.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventCodeTuple {
    children: Vec<TupleChild>,
    reversed: bool,
}

impl EventCodeTuple {
    /// Vorwaerts-Tupel; `children` stehen in Code-Reihenfolge.
    pub fn forward(children: Vec<TupleChild>) -> Self {
        Self {
            children,
            reversed: false,
        }
    }

    /// Rueckwaerts-Tupel; `children` stehen in Speicher- (Anhaenge-)Reihenfolge.
    pub fn reversed(children: Vec<TupleChild>) -> Self {
        Self {
            children,
            reversed: true,
        }
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Bits um zwischen den direkten Kindern zu waehlen: `⌈log₂(len)⌉`.
    pub fn width(&self) -> u8 {
        bit_width::for_count(self.children.len())
    }

    /// Code des Kindes an Speicherposition `position`.
    #[inline]
    pub fn code_at(&self, position: usize) -> u32 {
        let code = if self.reversed {
            self.children.len() - 1 - position
        } else {
            position
        };
        code as u32
    }

    /// Kind mit dem Code `code`.
    pub fn child(&self, code: u32) -> Option<&TupleChild> {
        let code = code as usize;
        if code >= self.children.len() {
            return None;
        }
        let position = if self.reversed {
            self.children.len() - 1 - code
        } else {
            code
        };
        self.children.get(position)
    }

    /// Kinder in Speicherreihenfolge, jeweils mit ihrem Code.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &TupleChild)> {
        self.children
            .iter()
            .enumerate()
            .map(|(p, c)| (self.code_at(p), c))
    }

    /// Haengt ein Kind an; bei einem Rueckwaerts-Tupel bekommt es Code 0.
    ///
    /// # Panics
    ///
    /// Bei einem Vorwaerts-Tupel: dessen Codes sind ab Aufbau fest.
    pub fn append(&mut self, child: TupleChild) {
        assert!(self.reversed, "append on a forward event code tuple");
        self.children.push(child);
    }

    /// Letztes verschachteltes Tupel (die naechste Ebene), falls vorhanden.
    pub fn nested(&self) -> Option<&EventCodeTuple> {
        self.children.iter().find_map(|c| match c {
            TupleChild::Tuple(t) => Some(&**t),
            TupleChild::Event(_) => None,
        })
    }

    /// Besucht alle Event-Blaetter mit ihrem Code-Pfad.
    pub fn walk(&self, mut visit: impl FnMut(u32, &[u32])) {
        let mut path = Vec::with_capacity(3);
        self.walk_inner(&mut path, &mut visit);
    }

    fn walk_inner(&self, path: &mut Vec<u32>, visit: &mut impl FnMut(u32, &[u32])) {
        for (code, child) in self.iter() {
            path.push(code);
            match child {
                TupleChild::Event(serial) => visit(*serial, path),
                TupleChild::Tuple(t) => t.walk_inner(path, visit),
            }
            path.pop();
        }
    }
}

/// Legt Event-Seriennummern nach Tiefe in bis zu drei verschachtelte Tupel.
///
/// Tiefe-1-Eintraege bilden das aeussere Tupel; Tiefe-2-Eintraege ein
/// verschachteltes Tupel als letztes Kind (nur wenn nicht leer); Tiefe-3-
/// Eintraege ein Tupel als letztes Kind des Tiefe-2-Tupels. Ohne Tiefe-2-
/// Eintraege besteht das zweite Tupel nur aus dem dritten (Codes `n.0.k`).
pub fn layer(depth1: &[u32], depth2: &[u32], depth3: &[u32]) -> EventCodeTuple {
    let mut second: Vec<TupleChild> = depth2.iter().map(|s| TupleChild::Event(*s)).collect();
    if !depth3.is_empty() {
        let third = depth3.iter().map(|s| TupleChild::Event(*s)).collect();
        second.push(TupleChild::Tuple(Box::new(EventCodeTuple::forward(third))));
    }
    let mut first: Vec<TupleChild> = depth1.iter().map(|s| TupleChild::Event(*s)).collect();
    if !second.is_empty() {
        first.push(TupleChild::Tuple(Box::new(EventCodeTuple::forward(second))));
    }
    EventCodeTuple::forward(first)
}

/// Wie [`layer`], aber mit rueckwaerts wachsendem aeusseren Tupel fuer
/// eingebaute Grammatiken. `depth1` steht in Code-Reihenfolge; das
/// verschachtelte Tupel bekommt den hoechsten Code.
pub fn layer_reversed(depth1: &[u32], depth2: &[u32], depth3: &[u32]) -> EventCodeTuple {
    let forward = layer(depth1, depth2, depth3);
    let mut children = forward.children;
    children.reverse();
    EventCodeTuple::reversed(children)
}
