//! End-to-end behaviour of the parse and generate engines through
//! [`Grammar`].

use serde_json::json;
use stompconf_schema::{
    diff, diff_raw, Atom, Case, Dict, Enum, ErrorKind, Grammar, Key, List, Model, ModelType,
    Primitive, Raw, SwitchDict, Target, Value,
};

static ROOT: ModelType = ModelType::new("Root", &["label", "items"]);
static ITEM: ModelType = ModelType::new("Item", &["n", "flag"]);
static MSG: ModelType = ModelType::new("Msg", &["kind", "data"]);
static PC: ModelType = ModelType::new("Pc", &["program"]);

fn abc() -> Dict {
    Dict::new(
        "abc",
        vec![
            Key::new("a", Atom::int(1)),
            Key::new("b", Atom::int(1)),
            Key::new("c", Atom::int(1)),
        ],
    )
    .unwrap()
}

fn switch_ab() -> SwitchDict {
    let a2 = Atom::with_default(Primitive::Int, Target::computed(|p| json!(p.sibling_int("a1", 1)))).unwrap();
    SwitchDict::new(
        "ab",
        "x",
        Enum::new("x", &["a", "b"], Some("a")).unwrap(),
        vec![
            Case::new("a", vec![Key::new("a1", Atom::int(1)), Key::new("a2", a2)]),
            Case::new("b", vec![Key::new("b1", Atom::int(0)), Key::new("b2", Atom::int(0))]),
        ],
        vec![Key::new("shared", Atom::boolean(false))],
        None,
    )
    .unwrap()
}

fn root_schema() -> Dict {
    let item = Dict::new(
        "item",
        vec![
            Key::new("n", Atom::int(0).var("n")),
            Key::new("flag", Atom::boolean(false).var("flag")),
        ],
    )
    .unwrap()
    .model(&ITEM);
    Dict::new(
        "root",
        vec![
            Key::new("version", Atom::fixed_int(1)),
            Key::new("label", Atom::string("").var("label")),
            Key::new("items", List::new("items", 3, item).var("items")),
        ],
    )
    .unwrap()
    .model(&ROOT)
}

fn message(bound_kind: bool) -> SwitchDict {
    let selector = Enum::new("type", &["none", "pc"], Some("none")).unwrap();
    let selector = if bound_kind { selector.var("kind") } else { selector };
    SwitchDict::new(
        "message",
        "type",
        selector,
        vec![
            Case::new("none", vec![]),
            Case::with_model("pc", &PC, vec![Key::new("program", Atom::int(0).var("program"))]),
        ],
        vec![],
        Some("data"),
    )
    .unwrap()
    .model(&MSG)
}

// ── Scenarios ────────────────────────────────────────────────────────

#[test]
fn default_atom_is_insignificant_only_at_its_default() {
    let grammar = Grammar::minimal(Atom::int(1)).unwrap();
    assert_eq!(grammar.parse_config(&json!(1)).unwrap(), None);
    assert_eq!(grammar.parse_config(&json!(2)).unwrap(), Some(Value::Int(2)));
}

#[test]
fn minimal_list_prunes_trailing_defaults() {
    let grammar = Grammar::minimal(List::new("l", 10, Atom::int(1))).unwrap();
    let parsed = grammar
        .parse_config(&json!([2, 3, 4, 5, 6, 7, 8, 9, 1, 1]))
        .unwrap();
    let expected: Vec<Option<Value>> = (2..=9).map(|n| Some(Value::Int(n))).collect();
    assert_eq!(parsed, Some(Value::List(expected)));
}

#[test]
fn computed_default_follows_sibling() {
    let grammar = Grammar::minimal(switch_ab()).unwrap();
    let parsed = grammar
        .parse_config(&json!({"x": "a", "a1": 2, "a2": 2}))
        .unwrap()
        .unwrap();
    let map = parsed.as_map().unwrap();
    assert_eq!(map.len(), 1);
    assert_eq!(map.get("a1"), Some(&Value::Int(2)));

    assert_eq!(grammar.gen_config(Some(&parsed)).unwrap(), json!({"x": "a", "a1": 2}));
}

#[test]
fn all_default_dict_generates_fully_or_not_at_all() {
    let complete = Grammar::complete(abc()).unwrap();
    assert_eq!(complete.gen_config(None).unwrap(), json!({"a": 1, "b": 1, "c": 1}));
    let minimal = Grammar::minimal(abc()).unwrap();
    assert_eq!(minimal.gen_config(None).unwrap(), Raw::Null);
}

// ── Properties ───────────────────────────────────────────────────────

#[test]
fn value_atom_mismatch_is_fatal_in_both_modes() {
    let schema = || Dict::new("d", vec![Key::new("type", Atom::fixed_int(1))]).unwrap();
    for grammar in [Grammar::complete(schema()).unwrap(), Grammar::minimal(schema()).unwrap()] {
        let err = grammar.parse_config(&json!({"type": 99})).unwrap_err();
        assert_eq!(
            err.kind,
            ErrorKind::ValueMismatch {
                expected: "1".into(),
                found: "99".into()
            }
        );
        assert_eq!(err.path.to_string(), "type");
    }
}

#[test]
fn switch_accepts_exactly_the_selected_case_keys() {
    let grammar = Grammar::complete(switch_ab()).unwrap();
    let ok = json!({"x": "b", "shared": false, "b1": 0, "b2": 5});
    let parsed = grammar.parse_config(&ok).unwrap().unwrap();
    assert_eq!(parsed.as_map().unwrap().get("x"), Some(&Value::Str("b".into())));
    assert_eq!(grammar.gen_config(Some(&parsed)).unwrap(), ok);

    let stray = json!({"x": "b", "shared": false, "b1": 0, "b2": 0, "a1": 1});
    let err = grammar.parse_config(&stray).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnknownKey("a1".into()));

    let missing = json!({"x": "b", "shared": false, "b1": 0});
    let err = grammar.parse_config(&missing).unwrap_err();
    assert_eq!(err.kind, ErrorKind::MissingKey("b2".into()));
}

#[test]
fn switch_key_must_be_present_and_valid() {
    let grammar = Grammar::minimal(switch_ab()).unwrap();
    let err = grammar.parse_config(&json!({"a1": 2})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::MissingSwitchKey("x".into()));

    let err = grammar.parse_config(&json!({"x": "z"})).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::InvalidSwitchValue { ref key, .. } if key == "x"));
}

#[test]
fn complete_round_trip_preserves_bytes_and_key_order() {
    let grammar = Grammar::complete(root_schema()).unwrap();
    let raw = json!({
        "version": 1,
        "label": "live",
        "items": [
            {"n": 0, "flag": false},
            {"n": 5, "flag": true},
            {"n": 0, "flag": false}
        ]
    });
    let model = grammar.parse_config(&raw).unwrap();
    let regenerated = grammar.gen_config(model.as_ref()).unwrap();
    assert_eq!(diff_raw(&raw, &regenerated), None);
    assert_eq!(
        serde_json::to_string(&regenerated).unwrap(),
        serde_json::to_string(&raw).unwrap()
    );
}

#[test]
fn complete_list_emits_exactly_declared_length() {
    let grammar = Grammar::complete(root_schema()).unwrap();
    let raw = grammar.gen_config(None).unwrap();
    assert_eq!(raw["items"].as_array().unwrap().len(), 3);
    assert_eq!(raw["items"][2], json!({"n": 0, "flag": false}));
}

#[test]
fn minimal_round_trip_restores_models() {
    let item = Model::new(&ITEM).with("n", 5i64).unwrap();
    let root = Model::new(&ROOT)
        .with("items", Value::List(vec![None, Some(Value::Model(item))]))
        .unwrap();
    let model = Value::Model(root);

    let grammar = Grammar::minimal(root_schema()).unwrap();
    let raw = grammar.gen_config(Some(&model)).unwrap();
    assert_eq!(raw, json!({"version": 1, "items": [{}, {"n": 5}]}));

    let reparsed = grammar.parse_config(&raw).unwrap();
    assert_eq!(diff(Some(&model), reparsed.as_ref()), None);
    assert_eq!(reparsed, Some(model));
}

#[test]
fn minimal_list_never_exceeds_declared_length() {
    let grammar = Grammar::minimal(root_schema()).unwrap();
    let too_long = json!({"items": [{}, {}, {}, {}]});
    let err = grammar.parse_config(&too_long).unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::ListLengthMismatch {
            node: "items".into(),
            expected: 3,
            found: 4
        }
    );

    let four = Value::List(vec![None, None, None, Some(Value::Model(Model::new(&ITEM)))]);
    let model = Value::Model(Model::new(&ROOT).with("items", four).unwrap());
    let err = grammar.gen_config(Some(&model)).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ListLengthMismatch { found: 4, .. }));
    assert_eq!(err.path.to_string(), "items");
}

#[test]
fn complete_list_requires_declared_length() {
    let grammar = Grammar::complete(root_schema()).unwrap();
    let raw = json!({"version": 1, "label": "", "items": [{"n": 0, "flag": false}]});
    let err = grammar.parse_config(&raw).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ListLengthMismatch { expected: 3, found: 1, .. }));
}

#[test]
fn errors_name_the_offending_path() {
    let grammar = Grammar::minimal(root_schema()).unwrap();
    let err = grammar
        .parse_config(&json!({"items": [{}, {}, {"n": "five"}]}))
        .unwrap_err();
    assert_eq!(err.path.to_string(), "items[2].n");
    assert!(matches!(err.kind, ErrorKind::TypeMismatch { expected: "integer", .. }));
    assert_eq!(err.to_string(), "items[2].n: expected integer, found \"five\"");
}

#[test]
fn computed_default_sees_list_position() {
    let name = Atom::with_default(
        Primitive::Str,
        Target::computed(|p| json!(format!("Item {}", p.index() + 1))),
    )
    .unwrap();
    let grammar = Grammar::minimal(List::new("names", 3, name)).unwrap();
    let parsed = grammar
        .parse_config(&json!(["Item 1", "Renamed", "Item 3"]))
        .unwrap();
    assert_eq!(parsed, Some(Value::List(vec![None, Some(Value::from("Renamed"))])));
    assert_eq!(grammar.gen_config(parsed.as_ref()).unwrap(), json!(["Item 1", "Renamed"]));
}

/// `a1` defaults to whatever `a2` holds, although `a2` comes later.
fn forward_dependent() -> Dict {
    let a1 = Atom::with_default(Primitive::Int, Target::computed(|p| json!(p.sibling_int("a2", 0)))).unwrap();
    Dict::new("fwd", vec![Key::new("a1", a1), Key::new("a2", Atom::int(0))]).unwrap()
}

#[test]
fn computed_default_sees_later_sibling_in_both_directions() {
    let complete = Grammar::complete(forward_dependent()).unwrap();
    for raw in [json!({"a1": 5, "a2": 5}), json!({"a1": 7, "a2": 5}), json!({"a1": 0, "a2": 0})] {
        let parsed = complete.parse_config(&raw).unwrap();
        let regenerated = complete.gen_config(parsed.as_ref()).unwrap();
        assert_eq!(diff_raw(&raw, &regenerated), None, "{} changed", raw);
    }

    let parsed = complete.parse_config(&json!({"a1": 5, "a2": 5})).unwrap().unwrap();
    assert_eq!(parsed.as_map().unwrap().get("a1"), None);
    let minimal = Grammar::minimal(forward_dependent()).unwrap();
    assert_eq!(minimal.gen_config(Some(&parsed)).unwrap(), json!({"a2": 5}));
}

#[test]
fn list_element_defaults_follow_the_next_slot() {
    let element = Atom::with_default(
        Primitive::Int,
        Target::computed(|p| {
            let next = p.context.and_then(|c| c.get(p.index() + 1));
            json!(next.and_then(Raw::as_i64).unwrap_or(0))
        }),
    )
    .unwrap();
    let list = || List::new("chain", 3, element.clone());

    let complete = Grammar::complete(list()).unwrap();
    let raw = json!([3, 3, 0]);
    let parsed = complete.parse_config(&raw).unwrap();
    assert_eq!(parsed, Some(Value::List(vec![None, Some(Value::Int(3)), None])));
    assert_eq!(complete.gen_config(parsed.as_ref()).unwrap(), raw);

    let minimal = Grammar::minimal(list()).unwrap();
    assert_eq!(minimal.gen_config(parsed.as_ref()).unwrap(), json!([3, 3]));
    assert_eq!(minimal.parse_config(&json!([3, 3])).unwrap(), parsed);
}

#[test]
fn computed_defaults_inside_list_elements_round_trip() {
    let element = Dict::new(
        "range",
        vec![
            Key::new(
                "lo",
                Atom::with_default(Primitive::Int, Target::computed(|p| json!(p.sibling_int("hi", 0)))).unwrap(),
            ),
            Key::new("hi", Atom::int(0)),
        ],
    )
    .unwrap();
    let grammar = Grammar::complete(List::new("ranges", 2, element)).unwrap();
    let raw = json!([{"lo": 4, "hi": 4}, {"lo": 1, "hi": 2}]);
    let parsed = grammar.parse_config(&raw).unwrap();
    let regenerated = grammar.gen_config(parsed.as_ref()).unwrap();
    assert_eq!(diff_raw(&raw, &regenerated), None);
    assert_eq!(regenerated, raw);
}

#[test]
fn minimal_document_must_still_be_a_mapping_with_required_keys() {
    let grammar = Grammar::minimal(
        Dict::new("d", vec![Key::required("id", Atom::int(0)), Key::new("x", Atom::int(0))]).unwrap(),
    )
    .unwrap();
    let err = grammar.parse_config(&Raw::Null).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::TypeMismatch { expected: "mapping", .. }));
    let err = grammar.parse_config(&json!({})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::MissingKey("id".into()));
}

#[test]
fn bound_discriminant_and_variant_model_round_trip() {
    let grammar = Grammar::minimal(message(true)).unwrap();
    let raw = json!({"type": "pc", "program": 4});
    let parsed = grammar.parse_config(&raw).unwrap().unwrap();
    let msg = parsed.as_model().unwrap();
    assert_eq!(msg.field("kind"), Some(&Value::from("pc")));
    let data = msg.field("data").and_then(Value::as_model).unwrap();
    assert_eq!(data.field("program"), Some(&Value::Int(4)));
    assert_eq!(grammar.gen_config(Some(&parsed)).unwrap(), raw);

    let bare = json!({"type": "pc"});
    let parsed = grammar.parse_config(&bare).unwrap().unwrap();
    assert_eq!(parsed.as_model().unwrap().field("data"), None);
    assert_eq!(grammar.gen_config(Some(&parsed)).unwrap(), bare);
}

#[test]
fn unbound_discriminant_is_recovered_from_variant_type() {
    let grammar = Grammar::minimal(message(false)).unwrap();
    let bare = json!({"type": "pc"});
    let parsed = grammar.parse_config(&bare).unwrap().unwrap();
    let msg = parsed.as_model().unwrap();
    assert!(msg.field("data").and_then(Value::as_model).is_some_and(|d| d.is(&PC)));
    assert_eq!(grammar.gen_config(Some(&parsed)).unwrap(), bare);

    assert_eq!(grammar.gen_config(None).unwrap(), json!({"type": "none"}));
}

#[test]
fn foreign_variant_model_does_not_fit() {
    let grammar = Grammar::minimal(message(false)).unwrap();
    let wrong = Model::new(&MSG).with("data", Model::new(&ITEM)).unwrap();
    let err = grammar.gen_config(Some(&Value::Model(wrong))).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ModelSchemaMismatch(_)));
}

#[test]
fn model_must_consume_significant_children() {
    let schema = Dict::new("item", vec![Key::new("n", Atom::int(0))]).unwrap().model(&ITEM);
    let grammar = Grammar::minimal(schema).unwrap();
    let err = grammar.parse_config(&json!({"n": 3})).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::UnconsumedModelResult { model: "Item", .. }));
    assert_eq!(grammar.parse_config(&json!({"n": 0})).unwrap(), None);
}

#[test]
fn field_fed_by_two_nodes_is_rejected() {
    let schema = Dict::new(
        "item",
        vec![Key::new("a", Atom::int(0).var("n")), Key::new("b", Atom::int(0).var("n"))],
    )
    .unwrap()
    .model(&ITEM);
    let grammar = Grammar::minimal(schema).unwrap();
    let err = grammar.parse_config(&json!({"a": 1, "b": 2})).unwrap_err();
    assert_eq!(
        err.kind,
        ErrorKind::MultiplyAssignedField {
            model: "Item",
            field: "n".into()
        }
    );
    assert_eq!(err.path.to_string(), "b");
}

#[test]
fn enum_membership_and_missing_default() {
    let grammar = Grammar::minimal(Enum::new("mode", &["on", "off"], None).unwrap()).unwrap();
    let err = grammar.parse_config(&json!("dim")).unwrap_err();
    assert_eq!(err.to_string(), "'dim' is not one of [on, off]");
    let err = grammar.gen_config(None).unwrap_err();
    assert_eq!(err.kind, ErrorKind::NoDefaultForEnum("mode".into()));
    assert_eq!(grammar.gen_config(Some(&Value::from("off"))).unwrap(), json!("off"));
}

#[test]
fn fixed_value_in_model_must_match() {
    let grammar = Grammar::minimal(Atom::fixed_int(1)).unwrap();
    let err = grammar.gen_config(Some(&Value::Int(2))).unwrap_err();
    assert!(matches!(err.kind, ErrorKind::ModelSchemaMismatch(_)));
    assert_eq!(grammar.gen_config(Some(&Value::Int(1))).unwrap(), json!(1));
}

#[test]
fn minimal_mode_omits_optional_but_not_required_keys() {
    let schema = || {
        Dict::new(
            "d",
            vec![Key::required("id", Atom::int(0)), Key::new("x", Atom::int(0))],
        )
        .unwrap()
    };
    let grammar = Grammar::minimal(schema()).unwrap();
    let err = grammar.parse_config(&json!({"x": 1})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::MissingKey("id".into()));
    assert_eq!(grammar.parse_config(&json!({"id": 0})).unwrap(), None);

    let model = grammar.parse_config(&json!({"id": 0, "x": 4})).unwrap();
    assert_eq!(grammar.gen_config(model.as_ref()).unwrap(), json!({"id": 0, "x": 4}));

    let complete = Grammar::complete(schema()).unwrap();
    let err = complete.parse_config(&json!({"id": 0})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::MissingKey("x".into()));
}

#[test]
fn cleanup_can_erase_a_result() {
    let schema = Dict::new("d", vec![Key::new("noise", Atom::int(0))])
        .unwrap()
        .cleanup(|_| None);
    let grammar = Grammar::minimal(schema).unwrap();
    assert_eq!(grammar.parse_config(&json!({"noise": 7})).unwrap(), None);
}

#[test]
fn cleanup_receives_the_built_model() {
    let schema = Dict::new("root", vec![Key::new("label", Atom::string("").var("label"))])
        .unwrap()
        .model(&ROOT)
        .cleanup(|result| {
            let discard = matches!(
                &result,
                Some(Value::Model(m)) if m.field("label") == Some(&Value::from("scratch"))
            );
            if discard {
                None
            } else {
                result
            }
        });
    let grammar = Grammar::minimal(schema).unwrap();
    assert_eq!(grammar.parse_config(&json!({"label": "scratch"})).unwrap(), None);
    assert!(matches!(
        grammar.parse_config(&json!({"label": "keep"})).unwrap(),
        Some(Value::Model(_))
    ));
}

#[test]
fn unbounded_list_takes_model_length() {
    let grammar = Grammar::minimal(List::new("free", 0, Atom::int(0))).unwrap();
    let parsed = grammar.parse_config(&json!([0, 0, 3, 0, 0, 0])).unwrap();
    assert_eq!(parsed, Some(Value::List(vec![None, None, Some(Value::Int(3))])));
    assert_eq!(grammar.gen_config(parsed.as_ref()).unwrap(), json!([0, 0, 3]));
}
