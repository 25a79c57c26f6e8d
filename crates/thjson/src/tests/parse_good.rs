use super::utils::{events, int, multiline, prop, string, val, Ev, Recorder, Val};
use crate::{parse_str, CommentKind, IntegerKind, Listener, Result, Scalar, StringKind};

#[test]
fn single_property() {
    assert_eq!(
        events("x: 1"),
        vec![Ev::Begin, prop("x", int(1)), Ev::End]
    );
}

#[test]
fn empty_documents() {
    assert_eq!(events(""), vec![Ev::Begin, Ev::End]);
    assert_eq!(events("   \n\t\n"), vec![Ev::Begin, Ev::End]);
    assert_eq!(events("{}"), vec![Ev::Begin, Ev::End]);
    assert_eq!(events("{\n}\n"), vec![Ev::Begin, Ev::End]);
}

#[test]
fn comment_only_document() {
    assert_eq!(
        events("// nothing here\n"),
        vec![
            Ev::Begin,
            Ev::Comment {
                text: " nothing here".to_string(),
                kind: CommentKind::SlashSlash,
            },
            Ev::End,
        ]
    );
}

#[test]
fn root_braces_wrap_members() {
    assert_eq!(
        events("{\n    a: 1\n    b: two\n}\n"),
        vec![
            Ev::Begin,
            prop("a", int(1)),
            prop("b", string("two")),
            Ev::End,
        ]
    );
}

#[test]
fn class_tagged_object_paren_form() {
    assert_eq!(
        events("left_hand: (sword) { damage: 3, weight: 1kg }"),
        vec![
            Ev::Begin,
            Ev::BeginObject {
                key: "left_hand".to_string(),
                class: "sword".to_string(),
            },
            prop("damage", int(3)),
            prop("weight", string("1kg")),
            Ev::EndObject,
            Ev::End,
        ]
    );
}

#[test]
fn class_tagged_object_bareword_form() {
    assert_eq!(
        events("left_hand: sword { damage: 3 }"),
        vec![
            Ev::Begin,
            Ev::BeginObject {
                key: "left_hand".to_string(),
                class: "sword".to_string(),
            },
            prop("damage", int(3)),
            Ev::EndObject,
            Ev::End,
        ]
    );
}

#[test]
fn class_tagged_list() {
    assert_eq!(
        events("inventory: (item) [sword, axe, \"no tea\"]"),
        vec![
            Ev::Begin,
            Ev::BeginList {
                key: "inventory".to_string(),
                class: "item".to_string(),
            },
            val(string("sword")),
            val(string("axe")),
            val(string("no tea")),
            Ev::EndList,
            Ev::End,
        ]
    );
}

#[test]
fn integer_sub_kinds() {
    assert_eq!(
        events("n1: 0xFF\nn2: %1010\nn3: +5\nn4: 1.5e2\n"),
        vec![
            Ev::Begin,
            prop("n1", Val::Int(255, IntegerKind::Hex)),
            prop("n2", Val::Int(10, IntegerKind::Binary)),
            prop("n3", Val::Int(5, IntegerKind::Signed)),
            prop("n4", Val::Float(150.0)),
            Ev::End,
        ]
    );
}

#[test]
fn hex_covers_the_full_word() {
    assert_eq!(
        events("all_bits: 0xFFFFFFFF"),
        vec![
            Ev::Begin,
            prop("all_bits", Val::Int(-1, IntegerKind::Hex)),
            Ev::End,
        ]
    );
}

#[test]
fn numeric_demotion_to_string() {
    // Looks numeric but does not fit 32 bits, or has no digits at all.
    assert_eq!(
        events("big: 2147483648\nempty_hex: 0x\nempty_bin: %\n"),
        vec![
            Ev::Begin,
            prop("big", string("2147483648")),
            prop("empty_hex", string("0x")),
            prop("empty_bin", string("%")),
            Ev::End,
        ]
    );
}

#[test]
fn float_overflow_saturates() {
    let evs = events("f: 1e99");
    match &evs[1] {
        Ev::Property {
            key,
            value: Val::Float(f),
        } => {
            assert_eq!(key, "f");
            assert!(f.is_infinite());
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn booleans_and_null() {
    assert_eq!(
        events("yes: true\nno: false\nnothing: null\n"),
        vec![
            Ev::Begin,
            prop("yes", Val::Bool(true)),
            prop("no", Val::Bool(false)),
            Ev::NullProperty {
                key: "nothing".to_string(),
            },
            Ev::End,
        ]
    );
}

#[test]
fn quoteless_string_keeps_interior_spaces() {
    assert_eq!(
        events("title: no tea today"),
        vec![Ev::Begin, prop("title", string("no tea today")), Ev::End]
    );
}

#[test]
fn quoteless_member_value_glues_comma_after_text() {
    assert_eq!(
        events("k: a, b c"),
        vec![Ev::Begin, prop("k", string("a, b c")), Ev::End]
    );
}

#[test]
fn quoteless_member_value_after_literal_splits_at_comma() {
    assert_eq!(
        events("a: 1, b: 2"),
        vec![Ev::Begin, prop("a", int(1)), prop("b", int(2)), Ev::End]
    );
}

#[test]
fn literal_commas_split_array_elements() {
    assert_eq!(
        events("n: [1, 2]"),
        vec![
            Ev::Begin,
            Ev::BeginArray {
                key: "n".to_string(),
            },
            val(int(1)),
            val(int(2)),
            Ev::EndArray,
            Ev::End,
        ]
    );
}

#[test]
fn quoteless_trailing_comma_is_stripped() {
    assert_eq!(
        events("k: foo,\nj: 2\n"),
        vec![Ev::Begin, prop("k", string("foo")), prop("j", int(2)), Ev::End]
    );
}

#[test]
fn quoted_string_escapes() {
    assert_eq!(
        events(r#"s: "a\nb\tcA\\""#),
        vec![Ev::Begin, prop("s", string("a\nb\tcA\\")), Ev::End]
    );
}

#[test]
fn unicode_escape_reencodes_as_utf8() {
    assert_eq!(
        events(r#"s: "\u0041\u00E9\u4E2D""#),
        vec![Ev::Begin, prop("s", string("Aé中")), Ev::End]
    );
}

#[test]
fn empty_quoted_string_is_a_string() {
    assert_eq!(
        events(r#"s: """#),
        vec![Ev::Begin, prop("s", string("")), Ev::End]
    );
}

#[test]
fn quoted_keys() {
    assert_eq!(
        events("\"my key\": 1\n\"a:b\": 2\n"),
        vec![
            Ev::Begin,
            prop("my key", int(1)),
            prop("a:b", int(2)),
            Ev::End,
        ]
    );
}

#[test]
fn triple_quoted_string_alignment() {
    assert_eq!(
        events("s: '''\n    hello\n    world\n    '''"),
        vec![Ev::Begin, prop("s", multiline("hello\nworld")), Ev::End]
    );
}

#[test]
fn quoted_bytes() {
    assert_eq!(
        events("data: `SGVsbG8=`"),
        vec![
            Ev::Begin,
            prop(
                "data",
                Val::Bytes(b"Hello".to_vec(), StringKind::SingleLine)
            ),
            Ev::End,
        ]
    );
}

#[test]
fn nested_maps_and_arrays() {
    assert_eq!(
        events("a: { b: { c: [1, [2]] } }"),
        vec![
            Ev::Begin,
            Ev::BeginMap {
                key: "a".to_string(),
            },
            Ev::BeginMap {
                key: "b".to_string(),
            },
            Ev::BeginArray {
                key: "c".to_string(),
            },
            val(int(1)),
            Ev::BeginArrayValue,
            val(int(2)),
            Ev::EndArray,
            Ev::EndArray,
            Ev::EndMap,
            Ev::EndMap,
            Ev::End,
        ]
    );
}

#[test]
fn anonymous_values_in_arrays() {
    assert_eq!(
        events("squad: [(goblin) { hp: 7 }, { loot: none }]"),
        vec![
            Ev::Begin,
            Ev::BeginArray {
                key: "squad".to_string(),
            },
            Ev::BeginObjectValue {
                class: "goblin".to_string(),
            },
            prop("hp", int(7)),
            Ev::EndObject,
            Ev::BeginMapValue,
            prop("loot", string("none")),
            Ev::EndMap,
            Ev::EndArray,
            Ev::End,
        ]
    );
}

#[test]
fn tagged_element_bareword_form() {
    assert_eq!(
        events("a: [goblin { hp: 7 }]"),
        vec![
            Ev::Begin,
            Ev::BeginArray {
                key: "a".to_string(),
            },
            Ev::BeginObjectValue {
                class: "goblin".to_string(),
            },
            prop("hp", int(7)),
            Ev::EndObject,
            Ev::EndArray,
            Ev::End,
        ]
    );
}

#[test]
fn end_of_line_blocks_class_tag() {
    // The brace opens an anonymous map element; "foo" stays a plain string.
    assert_eq!(
        events("a: [foo\n{ x: 1 }]"),
        vec![
            Ev::Begin,
            Ev::BeginArray {
                key: "a".to_string(),
            },
            val(string("foo")),
            Ev::BeginMapValue,
            prop("x", int(1)),
            Ev::EndMap,
            Ev::EndArray,
            Ev::End,
        ]
    );
}

#[test]
fn anonymous_values_at_root() {
    assert_eq!(
        events("(position) { x: 1 }\n"),
        vec![
            Ev::Begin,
            Ev::BeginObjectValue {
                class: "position".to_string(),
            },
            prop("x", int(1)),
            Ev::EndObject,
            Ev::End,
        ]
    );
    assert_eq!(
        events("item [a, b]\n"),
        vec![
            Ev::Begin,
            Ev::BeginListValue {
                class: "item".to_string(),
            },
            val(string("a")),
            val(string("b")),
            Ev::EndList,
            Ev::End,
        ]
    );
}

#[test]
fn directives_at_root() {
    assert_eq!(
        events("#thjson\n#include common.thjson\nx: 1\n@version 2\n"),
        vec![
            Ev::Begin,
            Ev::Directive {
                text: "thjson".to_string(),
            },
            Ev::Directive {
                text: "include common.thjson".to_string(),
            },
            prop("x", int(1)),
            Ev::Directive {
                text: "version 2".to_string(),
            },
            Ev::End,
        ]
    );
}

#[test]
fn quoted_directive_body() {
    assert_eq!(
        events("#\"keep // these\"\n"),
        vec![
            Ev::Begin,
            Ev::Directive {
                text: "keep // these".to_string(),
            },
            Ev::End,
        ]
    );
}

#[test]
fn hash_is_a_comment_inside_containers() {
    assert_eq!(
        events("m: {\n# note\nx: 1\n}\n"),
        vec![
            Ev::Begin,
            Ev::BeginMap {
                key: "m".to_string(),
            },
            Ev::Comment {
                text: " note".to_string(),
                kind: CommentKind::Hash,
            },
            prop("x", int(1)),
            Ev::EndMap,
            Ev::End,
        ]
    );
}

#[test]
fn comment_kinds() {
    assert_eq!(
        events("// line\n/* block */\nx: 1 // trailing\n"),
        vec![
            Ev::Begin,
            Ev::Comment {
                text: " line".to_string(),
                kind: CommentKind::SlashSlash,
            },
            Ev::Comment {
                text: " block ".to_string(),
                kind: CommentKind::Block,
            },
            prop("x", int(1)),
            Ev::Comment {
                text: " trailing".to_string(),
                kind: CommentKind::SlashSlash,
            },
            Ev::End,
        ]
    );
}

#[test]
fn block_comment_with_crlf_is_normalized() {
    assert_eq!(
        events("/* a\r\nb */\n"),
        vec![
            Ev::Begin,
            Ev::Comment {
                text: " a\nb ".to_string(),
                kind: CommentKind::Block,
            },
            Ev::End,
        ]
    );
}

#[test]
fn crlf_line_endings() {
    assert_eq!(
        events("a: 1\r\nb: 2\r\n"),
        vec![Ev::Begin, prop("a", int(1)), prop("b", int(2)), Ev::End]
    );
}

#[test]
fn comments_between_key_and_value() {
    assert_eq!(
        events("k /* here */: /* there */ 1"),
        vec![
            Ev::Begin,
            Ev::Comment {
                text: " here ".to_string(),
                kind: CommentKind::Block,
            },
            Ev::Comment {
                text: " there ".to_string(),
                kind: CommentKind::Block,
            },
            prop("k", int(1)),
            Ev::End,
        ]
    );
}

#[test]
fn default_function_round_trips_as_opaque_string() {
    assert_eq!(
        events("color: @rgb 1 2 3"),
        vec![
            Ev::Begin,
            prop("color", string("@rgb 1 2 3")),
            Ev::End,
        ]
    );
}

/// Delegates recording but expands two known functions.
#[derive(Debug, Default)]
struct Expander {
    inner: Recorder,
}

impl Listener for Expander {
    fn property(&mut self, key: &str, value: Scalar<'_>) -> Result<()> {
        self.inner.property(key, value)
    }

    fn null_property(&mut self, key: &str) -> Result<()> {
        self.inner.null_property(key)
    }

    fn value(&mut self, value: Scalar<'_>) -> Result<()> {
        self.inner.value(value)
    }

    fn begin_map(&mut self, key: &str) -> Result<()> {
        self.inner.begin_map(key)
    }

    fn end_map(&mut self) -> Result<()> {
        self.inner.end_map()
    }

    fn function(&mut self, text: &str) -> Result<String> {
        match text {
            "answer" => Ok("42".to_string()),
            "config" => Ok("{ debug: true }".to_string()),
            "nothing" => Ok(String::new()),
            other => panic!("unexpected function {other:?}"),
        }
    }
}

#[test]
fn function_expansion_to_scalar() {
    let mut l = Expander::default();
    parse_str("k: @answer", &mut l).unwrap();
    assert_eq!(l.inner.events, vec![prop("k", int(42))]);
}

#[test]
fn function_expansion_to_container() {
    let mut l = Expander::default();
    parse_str("k: @config", &mut l).unwrap();
    assert_eq!(
        l.inner.events,
        vec![
            Ev::BeginMap {
                key: "k".to_string(),
            },
            prop("debug", Val::Bool(true)),
            Ev::EndMap,
        ]
    );
}

#[test]
fn function_expansion_in_arrays() {
    let mut l = Expander::default();
    parse_str("a: [@answer, 7]", &mut l).unwrap();
    assert_eq!(l.inner.events, vec![val(int(42)), val(int(7))]);
}

#[test]
fn empty_function_expansion_is_null() {
    let mut l = Expander::default();
    parse_str("k: @nothing", &mut l).unwrap();
    assert_eq!(
        l.inner.events,
        vec![Ev::NullProperty {
            key: "k".to_string(),
        }]
    );
}

#[test]
fn deep_nesting_does_not_recurse() {
    let mut doc = String::from("a: ");
    for _ in 0..512 {
        doc.push('[');
    }
    for _ in 0..512 {
        doc.push(']');
    }
    let evs = events(&doc);
    // begin + begin_array(key) + 511 anonymous opens + 512 closes + end
    assert_eq!(evs.len(), 2 + 512 * 2);
}

#[test]
fn positions_are_monotonic() {
    let doc = "a: 1\nb: { c: [x, y]\n      d: '''\n  text\n  ''' }\ne: `QQ==`\n";
    let mut recorder = Recorder::default();
    parse_str(doc, &mut recorder).unwrap();
    assert!(!recorder.positions.is_empty());
    for pair in recorder.positions.windows(2) {
        assert!(pair[0] <= pair[1], "positions went backwards: {pair:?}");
    }
}

#[test]
fn listener_sees_events_before_error() {
    let mut recorder = Recorder::default();
    let err = parse_str("a: 1\nb: \"unterminated", &mut recorder).unwrap_err();
    assert_eq!(recorder.events, vec![Ev::Begin, prop("a", int(1))]);
    assert_eq!(err.line(), 2);
}
