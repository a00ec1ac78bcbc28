//! erxi-grammar – EXI 1.0 (W3C Second Edition) Grammatik-Engine
//!
//! Leitet aus einem Schema (oder ohne Schema) die Event-Code-Grammatiken
//! von EXI ab und fuehrt pro Session einen Zustandsstapel, der fuer jedes
//! XML-Event die Event Codes des aktuellen Zustands liefert.
//!
//! - [`schema`]: Schema-Modell (Arena mit typisierten Indizes)
//! - [`grammar`]: Document-, Element-, Content- und Gruppen-Grammatiken
//! - [`cache`]: geteilter, lazy befuellter Grammar-Cache
//! - [`state`]: Zustandsstapel einer Encoder-/Decoder-Session
//!
//! # Beispiel
//!
//! ```
//! use std::sync::Arc;
//! use erxi_grammar::{GrammarCache, GrammarOptions, GrammarStateStack, QName};
//!
//! let cache = Arc::new(GrammarCache::builtin(GrammarOptions::NONE));
//! let mut stack = GrammarStateStack::new(cache);
//! stack.start_document();
//! stack.undeclared_element(&QName::local("greeting")).unwrap();
//! stack.undeclared_chars();
//! stack.end();
//! assert_eq!(stack.end_document().to_string(), "0");
//!
//! // Die eingebaute Grammatik von <greeting> hat CH gelernt.
//! let greeting = stack.builtin_element(&QName::local("greeting")).unwrap();
//! assert!(greeting.event_types(0).characters().is_some());
//! ```

pub mod bit_width;
pub mod cache;
pub mod error;
pub mod event_code;
pub mod event_code_tuple;
pub mod event_type;
pub mod event_type_list;
pub mod grammar;
pub mod options;
pub mod qname;
pub mod schema;
pub mod state;

pub use error::{Error, Result};

/// HashMap mit ahash (schneller, nicht DoS-resistent; für interne Datenstrukturen).
pub(crate) type FastHashMap<K, V> = hashbrown::HashMap<K, V, ahash::RandomState>;

/// IndexMap mit ahash (deterministische Iteration + schnelles Hashing).
pub(crate) type FastIndexMap<K, V> = indexmap::IndexMap<K, V, ahash::RandomState>;

// Public API: Schema
pub use qname::QName;
pub use schema::{Schema, SchemaBuilder};

// Public API: Options
pub use options::{CacheConfig, GrammarOptions, Preserve};

// Public API: Grammatiken
pub use cache::{GrammarCache, certify, check_grammars};
pub use event_code::EventCode;
pub use event_type::{EventKind, EventType};
pub use event_type_list::EventTypeList;
pub use grammar::{Grammar, GrammarKind};
pub use state::{GrammarState, GrammarStateStack, MiscKind, Phase};
