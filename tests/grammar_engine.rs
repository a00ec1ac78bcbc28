//! Durchlaeufe durch den Zustandsstapel: schema-informiert, eingebaut,
//! Fragmente und Mehrdeutigkeitspruefung.

use std::sync::Arc;

use erxi_grammar::grammar::builtin::ELEMENT_CONTENT;
use erxi_grammar::schema::{ContentClass, MaxOccurs, Term, TypeId};
use erxi_grammar::{
    Error, EventCode, EventKind, GrammarCache, GrammarKind, GrammarOptions, GrammarStateStack, MiscKind, Phase, QName, Schema,
    SchemaBuilder, check_grammars,
};

fn qn(local: &str) -> QName {
    QName::local(local)
}

/// root: (a*, b); a und b sind Strings.
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

fn session(schema: Schema, options: GrammarOptions) -> GrammarStateStack {
    GrammarStateStack::new(Arc::new(GrammarCache::new(Arc::new(schema), options)))
}

/// SE ueber die deklarierte Production, sonst ueber SE(*).
fn start(stack: &mut GrammarStateStack, name: &str) -> EventCode {
    let declared = stack.next_event_types().element(&qn(name)).map(|e| e.serial());
    match declared {
        Some(serial) => stack.element(serial, &qn(name)).unwrap(),
        None => stack.undeclared_element(&qn(name)).unwrap(),
    }
}

/// CH ueber die Production auf Tiefe 1, sonst `CH [untyped value]`.
fn text(stack: &mut GrammarStateStack) -> EventCode {
    if stack.next_event_types().characters().is_some() {
        stack.chars()
    } else {
        stack.undeclared_chars()
    }
}

fn text_leaf(stack: &mut GrammarStateStack, name: &str) {
    start(stack, name);
    text(stack);
    stack.end();
}

/// Prueft, ob `children` als Inhalt von root akzeptiert wird (strict).
fn accepts(children: &[&str]) -> bool {
    let mut stack = session(a_star_b(), GrammarOptions::NONE);
    stack.start_document();
    start(&mut stack, "root");
    for child in children {
        if stack.next_event_types().element(&qn(child)).is_none() {
            return false;
        }
        text_leaf(&mut stack, child);
    }
    stack.next_event_types().end_element().is_some()
}

#[test]
fn a_stern_b() {
    assert!(accepts(&["b"]));
    assert!(accepts(&["a", "b"]));
    assert!(accepts(&["a", "a", "b"]));
    assert!(!accepts(&["b", "a"]));
    assert!(!accepts(&["a"]));
    assert!(!accepts(&[]));
}

#[test]
fn a_stern_b_codes() {
    let mut stack = session(a_star_b(), GrammarOptions::NONE);
    assert_eq!(stack.start_document(), EventCode::one(0));
    assert_eq!(start(&mut stack, "root"), EventCode::one(0));
    // Start-Tag: SE(a) 0, SE(b) 1
    assert_eq!(stack.next_event_types().describe(), vec!["SE(a) 0", "SE(b) 1"]);
    text_leaf(&mut stack, "a");
    assert_eq!(stack.current().grammar().kind(), GrammarKind::ElementContent);
    assert_eq!(stack.next_event_types().describe(), vec!["SE(a) 0", "SE(b) 1"]);
    text_leaf(&mut stack, "b");
    assert_eq!(stack.next_event_types().describe(), vec!["EE 0"]);
    assert_eq!(stack.end(), EventCode::one(0));
    assert_eq!(stack.end_document(), EventCode::one(0));
    assert_eq!(stack.current().phase(), Phase::Done);
}

#[test]
fn eingebaut_x_y_x() {
    let mut stack = GrammarStateStack::new(Arc::new(GrammarCache::builtin(GrammarOptions::NONE)));
    stack.start_document();
    start(&mut stack, "r");
    stack.undeclared_chars();
    assert_eq!(stack.current().cursor(), ELEMENT_CONTENT);

    text_leaf(&mut stack, "x");
    text_leaf(&mut stack, "y");
    let list = stack.next_event_types();
    let x = list.element(&qn("x")).unwrap().serial();
    let y = list.element(&qn("y")).unwrap().serial();
    assert!(x < y);
    assert_eq!(list.code(y), EventCode::one(0));
    assert_eq!(list.code(x), EventCode::one(1));

    // Das zweite x nimmt die gelernte Production.
    assert_eq!(start(&mut stack, "x"), EventCode::one(1));
    // auch <x> selbst hat CH auf Tiefe 1 gelernt
    assert_eq!(text(&mut stack), EventCode::one(0));
    stack.end();
    let list = stack.next_event_types();
    assert_eq!(list.element(&qn("x")).unwrap().serial(), x);
    assert_eq!(list.iter().filter(|e| e.name() == Some(&qn("x"))).count(), 1);
    stack.end();
    stack.end_document();
}

/// Ein Code meint beim Dekodieren dieselbe Production, die der Kodierer bei
/// gleicher Vorgeschichte genommen hat, auch wenn spaetere Lernschritte die
/// Codes aelterer Productions verschieben.
#[test]
fn kodierer_und_dekodierer_einig() {
    let children = ["x", "y", "x", "z", "y", "x"];
    let cache = Arc::new(GrammarCache::builtin(GrammarOptions::NONE));

    let mut encoder = GrammarStateStack::new(Arc::clone(&cache));
    encoder.start_document();
    start(&mut encoder, "r");
    text(&mut encoder);
    let mut sent = Vec::new();
    for child in children {
        sent.push(start(&mut encoder, child));
        text(&mut encoder);
        encoder.end();
    }

    let mut decoder = GrammarStateStack::new(cache);
    decoder.start_document();
    start(&mut decoder, "r");
    text(&mut decoder);
    let mut seen: Vec<&str> = Vec::new();
    for (child, code) in children.into_iter().zip(sent) {
        let event = decoder.next_event_types().by_code(code).unwrap();
        if seen.contains(&child) {
            assert_eq!(event.name(), Some(&qn(child)), "{code}");
        } else {
            // neue Namen kommen ueber SE(*) und werden erst dann gelernt
            assert!(matches!(event.kind(), EventKind::StartElementAny { .. }), "{code}");
            seen.push(child);
        }
        assert_eq!(start(&mut decoder, child), code);
        text(&mut decoder);
        decoder.end();
    }

    // gelernte Codes zaehlen die spaeter gelernten Geschwister
    let list = decoder.next_event_types();
    let code_of = |name: &str| list.element(&qn(name)).map(|e| list.code(e.serial()));
    assert_eq!(code_of("z"), Some(EventCode::one(0)));
    assert_eq!(code_of("y"), Some(EventCode::one(1)));
    assert_eq!(code_of("x"), Some(EventCode::one(2)));
}

#[test]
fn mehrdeutigkeit_nur_bei_mehrdeutigem_schema() {
    fn schema(first_min: u32, second_min: u32) -> Schema {
        let mut sb = SchemaBuilder::new();
        let string = sb.simple_type(None);
        let a = sb.local_element(qn("a"), string);
        let p1 = sb.particle(first_min, MaxOccurs::Bounded(1), Term::Element(a)).unwrap();
        let p2 = sb.particle(second_min, MaxOccurs::Bounded(1), Term::Element(a)).unwrap();
        let seq = sb.sequence(vec![p1, p2]);
        let top = sb.particle(1, MaxOccurs::Bounded(1), Term::Group(seq)).unwrap();
        let ty = sb.complex_type(None, ContentClass::ElementOnly);
        sb.set_particle(ty, top);
        sb.build().unwrap()
    }
    // (a?, a): SE(a) kann beide Particles meinen
    let err = check_grammars(&schema(0, 1), GrammarOptions::DEFAULT).unwrap_err();
    assert!(err.is_ambiguity(), "{err}");
    // (a, a?)
    check_grammars(&schema(1, 0), GrammarOptions::DEFAULT).unwrap();
}

/// (a?, b, a?) ist eindeutig, solange die Gruppe nicht wiederholt wird.
#[test]
fn optionales_echo_ist_eindeutig() {
    let mut sb = SchemaBuilder::new();
    let string = sb.simple_type(None);
    let a1 = sb.local_element(qn("a"), string);
    let b = sb.local_element(qn("b"), string);
    let a2 = sb.local_element(qn("a"), string);
    let p1 = sb.particle(0, MaxOccurs::Bounded(1), Term::Element(a1)).unwrap();
    let p2 = sb.particle(1, MaxOccurs::Bounded(1), Term::Element(b)).unwrap();
    let p3 = sb.particle(0, MaxOccurs::Bounded(1), Term::Element(a2)).unwrap();
    let seq = sb.sequence(vec![p1, p2, p3]);
    let top = sb.particle(1, MaxOccurs::Bounded(1), Term::Group(seq)).unwrap();
    let ty = sb.complex_type(None, ContentClass::ElementOnly);
    sb.set_particle(ty, top);
    sb.global_element(qn("root"), ty);
    check_grammars(&sb.build().unwrap(), GrammarOptions::DEFAULT).unwrap();
}

#[test]
fn nicht_strikt_mit_kommentaren() {
    let options = GrammarOptions::DEFAULT | GrammarOptions::COMMENTS | GrammarOptions::PROCESSING_INSTRUCTIONS;
    let mut stack = session(a_star_b(), options);
    stack.start_document();
    // ohne DT besteht die zweite Ebene nur aus dem CM/PI-Tupel
    assert_eq!(stack.misc_content(MiscKind::Comment), EventCode::three(2, 0, 0));
    start(&mut stack, "root");
    // unbekanntes Kind im Start-Tag: SE(*) auf Ebene 2, dann content2
    let code = stack.undeclared_element(&qn("zz")).unwrap();
    assert_eq!(code.length(), 2);
    assert_eq!(stack.current().grammar().kind(), GrammarKind::BuiltinElement);
    stack.end();
    assert_eq!(stack.current().phase(), Phase::Content);
    assert_eq!(stack.current().cursor(), 0);
    text_leaf(&mut stack, "b");
    stack.misc_content(MiscKind::ProcessingInstruction);
    stack.end();
    stack.misc_content(MiscKind::Comment);
    assert_eq!(stack.end_document(), EventCode::one(0));
}

#[test]
fn xsi_type_wechselt_die_grammatik() {
    let mut sb = SchemaBuilder::new();
    let base: TypeId = sb.complex_type(Some(qn("Base")), ContentClass::Empty);
    let sub = sb.complex_type(Some(qn("Sub")), ContentClass::Empty);
    sb.set_base_type(sub, base);
    sb.add_attribute(sub, qn("extra"), true);
    sb.global_element(qn("e"), base);
    let mut stack = session(sb.build().unwrap(), GrammarOptions::NONE);
    stack.start_document();
    start(&mut stack, "e");
    assert_eq!(stack.next_event_types().describe(), vec!["EE 0", "AT(xsi:type) 1.0"]);
    let unknown = stack.xsitp_named(&QName::new("urn:t", "Missing")).unwrap_err();
    assert_eq!(unknown, Error::UnknownType("{urn:t}Missing".to_string()));
    assert_eq!(stack.xsitp_named(&qn("Sub")).unwrap(), EventCode::two(1, 0));
    assert_eq!(stack.current().grammar().kind(), GrammarKind::ElementTag);
    let extra = stack.next_event_types().attribute(&qn("extra")).unwrap().serial();
    assert_eq!(stack.schema_attribute(extra, &qn("extra")), EventCode::one(0));
    assert_eq!(stack.end(), EventCode::one(0));
}

#[test]
fn fragment_mit_widerspruechlichen_declarations() {
    let mut sb = SchemaBuilder::new();
    let string = sb.simple_type(None);
    let int = sb.simple_type(None);
    sb.local_element(qn("c"), string);
    sb.local_element(qn("c"), int);
    sb.local_element(qn("d"), string);
    let schema = Arc::new(sb.build().unwrap());

    let cache = Arc::new(GrammarCache::new(schema, GrammarOptions::NONE));
    let mut stack = GrammarStateStack::new_fragment(Arc::clone(&cache));
    stack.start_document();
    assert_eq!(
        stack.next_event_types().describe(),
        vec!["SE(c) 0", "SE(d) 1", "SE(*) 2", "ED 3"]
    );
    start(&mut stack, "c");
    assert_eq!(stack.current().grammar().kind(), GrammarKind::ElementFragment);
    // CH [untyped value] auf Ebene 1 fuehrt in den Inhalt
    stack.chars();
    assert_eq!(stack.current().phase(), Phase::Content);
    stack.end();
    text_leaf(&mut stack, "d");
    assert_eq!(stack.end_document(), EventCode::one(3));
    assert_eq!(stack.current().phase(), Phase::Done);
}

#[test]
fn sessions_teilen_den_cache() {
    let cache = Arc::new(GrammarCache::new(Arc::new(a_star_b()), GrammarOptions::DEFAULT));
    let run = |cache: &Arc<GrammarCache>| {
        let mut stack = GrammarStateStack::new(Arc::clone(cache));
        let mut codes = vec![stack.start_document(), start(&mut stack, "root")];
        codes.push(start(&mut stack, "u"));
        codes.push(stack.undeclared_chars());
        codes.push(stack.end());
        codes.push(start(&mut stack, "b"));
        codes.push(stack.chars());
        codes.push(stack.end());
        codes.push(stack.end());
        codes.push(stack.end_document());
        codes
    };
    let first = run(&cache);
    let second = run(&cache);
    assert_eq!(first, second);
}
