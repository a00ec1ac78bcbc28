//! Grammar-Cache
//!
//! Schema-informierte Grammatiken werden beim ersten Zugriff gebaut und in
//! `OnceLock`-Slots abgelegt (ein Slot pro Element Declaration, pro Typ und
//! pro `(Typ, nillable)`). Lesende Zugriffe sind danach lock-frei; der Cache
//! ist `Send + Sync` und wird ueber `Arc` zwischen Sessions geteilt.
//!
//! Eingebaute Element- und Fragment-Grammatiken lernen und gehoeren deshalb
//! nicht in den Cache: hier liegen nur ihre Prototypen, jede Session
//! arbeitet auf Kopien.
//!
//! Solange ein Schema nicht mit [`certify`] zertifiziert ist, prueft jeder
//! Aufbau auf mehrdeutige Content Models.

use std::sync::{Arc, OnceLock};

use log::debug;

use crate::grammar::{
    BuiltinDocumentGrammar, BuiltinElementGrammar, BuiltinFragmentGrammar, ComplexContentGrammar, ContentGrammar,
    DocumentGrammar, ElementFragmentGrammar, ElementGrammar, ElementTagGrammar, FragmentGrammar, Grammar,
    GroupGrammar, EmptyContentGrammar, SimpleContentGrammar,
};
use crate::options::{CacheConfig, GrammarOptions};
use crate::qname::QName;
use crate::schema::{ContentClass, ElemId, Schema, Term, TypeId, TypeKind};
use crate::{Error, Result};

// ============================================================================
// Aufbau
// ============================================================================

/// Content-Grammatik eines Typs.
fn build_content(
    schema: &Schema,
    type_id: TypeId,
    options: GrammarOptions,
    check: bool,
    empty: impl FnOnce() -> Arc<ContentGrammar>,
) -> Result<Arc<ContentGrammar>> {
    let def = schema.type_def(type_id);
    let (content, particle) = match &def.kind {
        TypeKind::Simple { .. } => {
            return Ok(Arc::new(ContentGrammar::Simple(SimpleContentGrammar::new(type_id, options))));
        }
        TypeKind::Complex { content, particle, .. } => (*content, *particle),
    };
    let grammar = match (content, particle) {
        (ContentClass::Empty, _) | (ContentClass::ElementOnly, None) => return Ok(empty()),
        (ContentClass::Simple, _) => ContentGrammar::Simple(SimpleContentGrammar::new(type_id, options)),
        (ContentClass::Mixed, None) => ContentGrammar::Empty(EmptyContentGrammar::mixed(options)),
        (ContentClass::ElementOnly | ContentClass::Mixed, Some(top)) => {
            let Term::Group(group) = schema.particle(top).term else {
                return Err(Error::unsupported(format!(
                    "{type_id}: top-level particle {top} is not a model group"
                )));
            };
            let group = Arc::new(GroupGrammar::build(schema, group, check)?);
            ContentGrammar::Complex(ComplexContentGrammar::build(
                schema,
                type_id,
                top,
                group,
                content == ContentClass::Mixed,
                options,
                check,
            )?)
        }
    };
    Ok(Arc::new(grammar))
}

/// Baut alle Content-Grammatiken des Schemas mit Mehrdeutigkeitspruefung.
///
/// # Errors
///
/// [`Error::Ambiguity`] beim ersten mehrdeutigen Content Model,
/// [`Error::UnsupportedContentModel`] fuer nicht abbildbare Modelle.
pub fn check_grammars(schema: &Schema, options: GrammarOptions) -> Result<()> {
    let empty = Arc::new(ContentGrammar::Empty(EmptyContentGrammar::new(options)));
    for (type_id, _) in schema.types() {
        build_content(schema, type_id, options, true, || Arc::clone(&empty))?;
    }
    debug!("{} types checked", schema.type_count());
    Ok(())
}

/// Prueft das Schema und markiert es als mehrdeutigkeitsfrei; Caches
/// ueberspringen danach die Pruefung.
pub fn certify(mut schema: Schema, options: GrammarOptions) -> Result<Schema> {
    check_grammars(&schema, options)?;
    schema.set_ambiguity_free();
    Ok(schema)
}

// ============================================================================
// GrammarCache
// ============================================================================

/// Gemeinsamer Speicher aller unveraenderlichen Grammatiken eines Schemas
/// (oder der eingebauten Grammatiken ohne Schema).
#[derive(Debug)]
pub struct GrammarCache {
    schema: Option<Arc<Schema>>,
    options: GrammarOptions,
    config: CacheConfig,
    check: bool,
    elements: Vec<OnceLock<Arc<ElementGrammar>>>,
    contents: Vec<OnceLock<Arc<ContentGrammar>>>,
    /// Indiziert mit `type * 2 + nillable`.
    tags: Vec<OnceLock<Arc<ElementTagGrammar>>>,
    empty: OnceLock<Arc<ContentGrammar>>,
    element_fragment: OnceLock<Arc<ElementFragmentGrammar>>,
    document: OnceLock<Arc<DocumentGrammar>>,
    fragment: OnceLock<Arc<FragmentGrammar>>,
    builtin_document: Arc<BuiltinDocumentGrammar>,
    builtin_element: BuiltinElementGrammar,
    builtin_fragment: BuiltinFragmentGrammar,
}

fn slots<T>(n: usize) -> Vec<OnceLock<T>> {
    (0..n).map(|_| OnceLock::new()).collect()
}

impl GrammarCache {
    pub fn new(schema: Arc<Schema>, options: GrammarOptions) -> Self {
        Self::with_config(schema, options, CacheConfig::default())
    }

    pub fn with_config(schema: Arc<Schema>, options: GrammarOptions, config: CacheConfig) -> Self {
        let check = !schema.is_ambiguity_free();
        debug!(
            "grammar cache for {} elements, {} types (options {options:?}, check {check})",
            schema.element_count(),
            schema.type_count()
        );
        Self {
            elements: slots(schema.element_count()),
            contents: slots(schema.type_count()),
            tags: slots(schema.type_count() * 2),
            check,
            ..Self::bare(Some(schema), options, config)
        }
    }

    /// Cache ohne Schema: nur eingebaute Grammatiken.
    pub fn builtin(options: GrammarOptions) -> Self {
        Self::bare(None, options, CacheConfig::default())
    }

    fn bare(schema: Option<Arc<Schema>>, options: GrammarOptions, config: CacheConfig) -> Self {
        Self {
            schema,
            options,
            config,
            check: false,
            elements: Vec::new(),
            contents: Vec::new(),
            tags: Vec::new(),
            empty: OnceLock::new(),
            element_fragment: OnceLock::new(),
            document: OnceLock::new(),
            fragment: OnceLock::new(),
            builtin_document: Arc::new(BuiltinDocumentGrammar::new(options)),
            builtin_element: BuiltinElementGrammar::new(options),
            builtin_fragment: BuiltinFragmentGrammar::new(options),
        }
    }

    pub fn options(&self) -> GrammarOptions {
        self.options
    }

    pub fn schema(&self) -> Option<&Arc<Schema>> {
        self.schema.as_ref()
    }

    pub fn is_schema_informed(&self) -> bool {
        self.schema.is_some()
    }

    /// # Panics
    ///
    /// Bei einem Cache ohne Schema; schema-informierte Zugriffe setzen eine
    /// Declaration oder einen Typ aus dem Schema voraus.
    fn require_schema(&self) -> &Schema {
        match &self.schema {
            Some(schema) => schema,
            None => panic!("schema-informed grammar requested from a schema-less cache"),
        }
    }

    fn memo<T>(&self, slot: &OnceLock<Arc<T>>, build: impl FnOnce() -> Result<Arc<T>>) -> Result<Arc<T>> {
        if !self.config.caching {
            return build();
        }
        if let Some(g) = slot.get() {
            return Ok(Arc::clone(g));
        }
        let built = build()?;
        // Bei gleichzeitigem Aufbau gewinnt der erste Eintrag.
        Ok(Arc::clone(slot.get_or_init(|| built)))
    }

    // ------------------------------------------------------------------
    // Schema-informiert
    // ------------------------------------------------------------------

    fn empty_content(&self) -> Arc<ContentGrammar> {
        let build = || Arc::new(ContentGrammar::Empty(EmptyContentGrammar::new(self.options)));
        if !self.config.caching {
            return build();
        }
        Arc::clone(self.empty.get_or_init(build))
    }

    /// Content-Grammatik des Typs.
    pub fn content(&self, type_id: TypeId) -> Result<Arc<ContentGrammar>> {
        let schema = self.require_schema();
        self.memo(&self.contents[type_id.index()], || {
            build_content(schema, type_id, self.options, self.check, || self.empty_content())
        })
    }

    /// Start-Tag-Grammatik von `(type, nillable)`.
    pub fn tag(&self, type_id: TypeId, nillable: bool) -> Result<Arc<ElementTagGrammar>> {
        let schema = self.require_schema();
        let slot = &self.tags[type_id.index() * 2 + nillable as usize];
        self.memo(slot, || {
            let content = self.content(type_id)?;
            Ok(Arc::new(ElementTagGrammar::build(schema, type_id, nillable, content, self.options)))
        })
    }

    /// Grammatik einer Element Declaration.
    pub fn element(&self, element: ElemId) -> Result<Arc<ElementGrammar>> {
        let schema = self.require_schema();
        self.memo(&self.elements[element.index()], || {
            let decl = schema.element(element);
            let tag = self.tag(decl.type_id, decl.nillable)?;
            debug!("{element}: element grammar for {}", decl.name);
            Ok(Arc::new(ElementGrammar::new(schema, element, tag)))
        })
    }

    /// Grammatik des globalen Elements `name`.
    pub fn global_element(&self, name: &QName) -> Result<Arc<ElementGrammar>> {
        match self.require_schema().global_element(name) {
            Some(element) => self.element(element),
            None => Err(Error::UnknownElement(name.to_string())),
        }
    }

    /// Typ zum Wert eines `xsi:type`-Attributs (EXI 8.5.4.4).
    pub fn type_named(&self, name: &QName) -> Result<TypeId> {
        self.require_schema()
            .type_by_name(name)
            .ok_or_else(|| Error::UnknownType(name.to_string()))
    }

    pub fn element_fragment(&self) -> Arc<ElementFragmentGrammar> {
        let schema = self.require_schema();
        let build = || Arc::new(ElementFragmentGrammar::build(schema, self.options));
        if !self.config.caching {
            return build();
        }
        Arc::clone(self.element_fragment.get_or_init(build))
    }

    // ------------------------------------------------------------------
    // Wurzeln
    // ------------------------------------------------------------------

    /// Document-Grammatik: schema-informiert oder eingebaut.
    pub fn document(&self) -> Grammar {
        let Some(schema) = &self.schema else {
            return Grammar::BuiltinDocument(Arc::clone(&self.builtin_document));
        };
        let build = || Arc::new(DocumentGrammar::build(schema, self.options));
        if !self.config.caching {
            return Grammar::Document(build());
        }
        Grammar::Document(Arc::clone(self.document.get_or_init(build)))
    }

    /// Fragment-Grammatik: schema-informiert oder eingebaut.
    pub fn fragment(&self) -> Grammar {
        let Some(schema) = &self.schema else {
            return Grammar::BuiltinFragment;
        };
        let build = || Arc::new(FragmentGrammar::build(schema, self.options));
        if !self.config.caching {
            return Grammar::Fragment(build());
        }
        Grammar::Fragment(Arc::clone(self.fragment.get_or_init(build)))
    }

    // ------------------------------------------------------------------
    // Prototypen
    // ------------------------------------------------------------------

    pub fn builtin_element(&self) -> BuiltinElementGrammar {
        self.builtin_element.clone_for_session()
    }

    pub fn builtin_fragment(&self) -> BuiltinFragmentGrammar {
        self.builtin_fragment.clone_for_session()
    }
}
