//! Qualified names (EXI 7.1.7).
//!
//! Die Grammatiken vergleichen Namen nur ueber URI und local-name; Prefixe
//! spielen fuer Productions keine Rolle. URI und local-name liegen als
//! `Arc<str>` vor, damit Grammatiken Threads-uebergreifend geteilt werden
//! koennen und Klone nur Refcounts erhoehen.
//!
//! Die Ordnung ist die kanonische EXI-Ordnung (EXI 8.5.4.3): zuerst
//! local-name, dann URI.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Namespace der XML Schema Instance Attribute.
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Namespace der XML Schema Datentypen.
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// Expanded name: URI + local-name.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct QName {
    uri: Arc<str>,
    local_name: Arc<str>,
}

impl QName {
    /// Erstellt einen QName aus URI und local-name.
    pub fn new(uri: impl Into<Arc<str>>, local_name: impl Into<Arc<str>>) -> Self {
        Self {
            uri: uri.into(),
            local_name: local_name.into(),
        }
    }

    /// QName ohne Namespace.
    pub fn local(local_name: impl Into<Arc<str>>) -> Self {
        Self::new("", local_name)
    }

    /// `xsi:type`
    pub fn xsi_type() -> Self {
        Self::new(XSI_NS, "type")
    }

    /// `xsi:nil`
    pub fn xsi_nil() -> Self {
        Self::new(XSI_NS, "nil")
    }

    #[inline]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[inline]
    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn is_xsi_type(&self) -> bool {
        &*self.uri == XSI_NS && &*self.local_name == "type"
    }

    pub fn is_xsi_nil(&self) -> bool {
        &*self.uri == XSI_NS && &*self.local_name == "nil"
    }
}

impl Ord for QName {
    fn cmp(&self, other: &Self) -> Ordering {
        self.local_name
            .cmp(&other.local_name)
            .then_with(|| self.uri.cmp(&other.uri))
    }
}

impl PartialOrd for QName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.uri.is_empty() {
            write!(f, "{}", self.local_name)
        } else {
            write!(f, "{{{}}}{}", self.uri, self.local_name)
        }
    }
}

impl fmt::Debug for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QName({self})")
    }
}
