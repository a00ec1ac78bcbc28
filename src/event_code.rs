//! Event Codes (EXI 6.1, 6.2).
//!
//! Event Codes identifizieren Productions und bestehen aus 1-3 Teilen. Jeder
//! Teil waehlt ein Kind eines Event-Code-Tupels aus; seine Bitbreite haengt
//! von der Anzahl der Geschwister ab (siehe [`crate::event_code_tuple`]).

use std::fmt;

/// Ein Event Code mit 1-3 Teilen.
///
/// Die Teile werden hierarchisch interpretiert (z.B. "1.3.0" = Teil1=1,
/// Teil2=3, Teil3=0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventCode {
    part1: u32,
    part2: Option<u32>,
    part3: Option<u32>,
}

impl EventCode {
    /// Erstellt einen Event Code mit einem Teil.
    pub fn one(part1: u32) -> Self {
        Self {
            part1,
            part2: None,
            part3: None,
        }
    }

    /// Erstellt einen Event Code mit zwei Teilen.
    pub fn two(part1: u32, part2: u32) -> Self {
        Self {
            part1,
            part2: Some(part2),
            part3: None,
        }
    }

    /// Erstellt einen Event Code mit drei Teilen.
    pub fn three(part1: u32, part2: u32, part3: u32) -> Self {
        Self {
            part1,
            part2: Some(part2),
            part3: Some(part3),
        }
    }

    /// Baut einen Event Code aus dem Pfad durch die Tupel-Hierarchie.
    ///
    /// # Panics
    ///
    /// Wenn `path` leer ist oder mehr als drei Teile hat.
    pub fn from_path(path: &[u32]) -> Self {
        match *path {
            [a] => Self::one(a),
            [a, b] => Self::two(a, b),
            [a, b, c] => Self::three(a, b, c),
            _ => panic!("event code path of length {}", path.len()),
        }
    }

    /// Gibt die Laenge des Event Codes zurueck (Anzahl der Teile).
    ///
    /// EXI 8.4.3 spricht von "event code of length N".
    #[inline]
    pub fn length(&self) -> usize {
        1 + self.part2.is_some() as usize + self.part3.is_some() as usize
    }

    pub fn part1(&self) -> u32 {
        self.part1
    }

    pub fn part2(&self) -> Option<u32> {
        self.part2
    }

    pub fn part3(&self) -> Option<u32> {
        self.part3
    }
}

impl fmt::Display for EventCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.part1)?;
        if let Some(p2) = self.part2 {
            write!(f, ".{p2}")?;
        }
        if let Some(p3) = self.part3 {
            write!(f, ".{p3}")?;
        }
        Ok(())
    }
}
