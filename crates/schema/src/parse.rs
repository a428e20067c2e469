//! Raw tree → significant values and models.
//!
//! Every node returns `Some(value)` when its content differs from what the
//! schema would produce on its own, and `None` otherwise. A significant
//! result is either handed to the parent or absorbed into a model field by a
//! variable binding, never both.

use std::collections::BTreeMap;

use serde_json::Map;

use crate::error::{EngineError, ErrorKind};
use crate::grammar::Mode;
use crate::list::prune;
use crate::model::{Model, Value};
use crate::node::{Atom, Constraint, Dict, Enum, Key, List, Node, Probe, Raw, SwitchDict};

pub(crate) struct Parser {
    mode: Mode,
}

impl Parser {
    pub(crate) fn new(mode: Mode) -> Self {
        Parser { mode }
    }

    fn minimal(&self) -> bool {
        self.mode == Mode::Minimal
    }

    pub(crate) fn parse(
        &self,
        raw: &Raw,
        node: &Node,
        context: Option<&Raw>,
        list_pos: &[usize],
        mut active: Option<&mut Model>,
    ) -> Result<Option<Value>, EngineError> {
        let mut own = node.model().map(Model::new);

        let mut result = {
            let scope = match own.as_mut() {
                Some(model) => Some(model),
                None => active.as_deref_mut(),
            };
            match node {
                Node::Dict(dict) => self.parse_dict(raw, dict, list_pos, scope)?,
                Node::Switch(switch) => self.parse_switch(raw, switch, list_pos, scope)?,
                Node::List(list) => self.parse_list(raw, list, list_pos, scope)?,
                Node::Enum(e) => parse_enum(raw, e)?,
                Node::Atom(atom) => parse_atom(raw, atom, context, list_pos)?,
            }
        };

        if let Some(model) = own {
            if let Some(leftover) = result {
                return Err(EngineError::new(ErrorKind::UnconsumedModelResult {
                    model: model.model_type().name,
                    leftover: leftover.to_string(),
                }));
            }
            result = (!model.is_empty()).then(|| Value::Model(model));
        }

        if let Some(cleanup) = node.cleanup() {
            result = cleanup(result);
        }

        bind(node.var(), result, active)
    }

    fn parse_dict(
        &self,
        raw: &Raw,
        dict: &Dict,
        list_pos: &[usize],
        mut scope: Option<&mut Model>,
    ) -> Result<Option<Value>, EngineError> {
        let obj = expect_object(raw)?;
        let mut out = BTreeMap::new();
        self.parse_keys(obj, raw, &dict.keys, list_pos, scope.as_deref_mut(), &mut out)?;
        reject_unknown(obj, |key| dict.keys.iter().any(|k| k.name == key))?;
        Ok(non_empty(out))
    }

    fn parse_switch(
        &self,
        raw: &Raw,
        switch: &SwitchDict,
        list_pos: &[usize],
        mut scope: Option<&mut Model>,
    ) -> Result<Option<Value>, EngineError> {
        let obj = expect_object(raw)?;
        let key = switch.switch_key();
        let token_raw = obj
            .get(key)
            .ok_or_else(|| EngineError::new(ErrorKind::MissingSwitchKey(key.to_string())))?;
        let case = token_raw
            .as_str()
            .and_then(|token| switch.case(token))
            .ok_or_else(|| {
                EngineError::new(ErrorKind::InvalidSwitchValue {
                    key: key.to_string(),
                    found: token_raw.to_string(),
                })
            })?;

        let selector = switch.selector();
        let mut discriminant = parse_enum(token_raw, selector)
            .and_then(|token| bind(selector.var.as_deref(), token, scope.as_deref_mut()))
            .map_err(|e| e.in_key(key))?;

        let mut out = BTreeMap::new();
        self.parse_keys(obj, raw, &switch.common, list_pos, scope.as_deref_mut(), &mut out)?;

        let mut variant = case.model.map(Model::new);
        match variant.as_mut() {
            Some(model) => self.parse_keys(obj, raw, &case.keys, list_pos, Some(model), &mut out)?,
            None => self.parse_keys(obj, raw, &case.keys, list_pos, scope.as_deref_mut(), &mut out)?,
        }
        reject_unknown(obj, |k| switch.accepts(case, k))?;

        if let (Some(model), Some(field)) = (variant, switch.model_var()) {
            // The variant's type identifies the case, so a stored variant
            // also carries a non-default discriminant.
            if discriminant.is_some() || !model.is_empty() {
                discriminant = None;
                bind(Some(field), Some(Value::Model(model)), scope)?;
            }
        }
        if let Some(token) = discriminant {
            out.insert(key.to_string(), token);
        }
        Ok(non_empty(out))
    }

    fn parse_keys(
        &self,
        obj: &Map<String, Raw>,
        raw: &Raw,
        keys: &[Key],
        list_pos: &[usize],
        mut scope: Option<&mut Model>,
        out: &mut BTreeMap<String, Value>,
    ) -> Result<(), EngineError> {
        for key in keys {
            let Some(child) = obj.get(&key.name) else {
                if self.minimal() && !key.required {
                    continue;
                }
                return Err(EngineError::new(ErrorKind::MissingKey(key.name.clone())));
            };
            let parsed = self
                .parse(child, &key.schema, Some(raw), list_pos, scope.as_deref_mut())
                .map_err(|e| e.in_key(&key.name))?;
            if let Some(value) = parsed {
                out.insert(key.name.clone(), value);
            }
        }
        Ok(())
    }

    fn parse_list(
        &self,
        raw: &Raw,
        list: &List,
        list_pos: &[usize],
        mut scope: Option<&mut Model>,
    ) -> Result<Option<Value>, EngineError> {
        let items = raw.as_array().ok_or_else(|| type_mismatch("list", raw))?;
        check_length(list, items.len(), self.mode)?;

        let mut position = list_pos.to_vec();
        position.push(0);
        let mut slots = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            if let Some(last) = position.last_mut() {
                *last = i;
            }
            let parsed = self
                .parse(item, &list.element, Some(raw), &position, scope.as_deref_mut())
                .map_err(|e| e.in_index(i))?;
            slots.push(parsed);
        }

        if self.minimal() {
            prune(&mut slots);
        }
        if slots.iter().all(Option::is_none) {
            return Ok(None);
        }
        Ok(Some(Value::List(slots)))
    }
}

/// Verifies an observed list length against the declared one.
pub(crate) fn check_length(list: &List, found: usize, mode: Mode) -> Result<(), EngineError> {
    if list.is_unbounded() {
        if mode == Mode::Complete {
            return Err(EngineError::new(ErrorKind::UnlimitedListInCompleteGrammar(
                list.name.clone(),
            )));
        }
        return Ok(());
    }
    let fits = match mode {
        Mode::Complete => found == list.length,
        Mode::Minimal => found <= list.length,
    };
    if fits {
        Ok(())
    } else {
        Err(EngineError::new(ErrorKind::ListLengthMismatch {
            node: list.name.clone(),
            expected: list.length,
            found,
        }))
    }
}

fn parse_enum(raw: &Raw, e: &Enum) -> Result<Option<Value>, EngineError> {
    let token = raw.as_str().ok_or_else(|| type_mismatch("string", raw))?;
    if !e.contains(token) {
        return Err(EngineError::new(ErrorKind::InvalidEnumValue {
            found: token.to_string(),
            allowed: e.tokens.clone(),
        }));
    }
    if e.is_default(token) {
        Ok(None)
    } else {
        Ok(Some(Value::Str(token.to_string())))
    }
}

fn parse_atom(
    raw: &Raw,
    atom: &Atom,
    context: Option<&Raw>,
    list_pos: &[usize],
) -> Result<Option<Value>, EngineError> {
    let literal = match Value::from_literal(raw) {
        Some(value) if atom.primitive.admits(raw) => value,
        _ => return Err(type_mismatch(atom.primitive.name(), raw)),
    };
    let target = atom.constraint.target().resolve(&Probe {
        current: raw,
        context,
        list_pos,
    });
    if *raw == target {
        return Ok(None);
    }
    match atom.constraint {
        Constraint::Value(_) => Err(EngineError::new(ErrorKind::ValueMismatch {
            expected: target.to_string(),
            found: raw.to_string(),
        })),
        Constraint::Default(_) => Ok(Some(literal)),
    }
}

/// Delivers a node's result: into the active model when the node has a
/// variable binding, otherwise back to the parent.
fn bind(
    var: Option<&str>,
    result: Option<Value>,
    active: Option<&mut Model>,
) -> Result<Option<Value>, EngineError> {
    match (var, result) {
        (Some(var), Some(value)) => {
            let model = active
                .ok_or_else(|| EngineError::new(ErrorKind::VariableWithoutModel(var.to_string())))?;
            model.assign(var, value)?;
            Ok(None)
        }
        (_, result) => Ok(result),
    }
}

fn expect_object(raw: &Raw) -> Result<&Map<String, Raw>, EngineError> {
    raw.as_object().ok_or_else(|| type_mismatch("mapping", raw))
}

fn reject_unknown(obj: &Map<String, Raw>, declared: impl Fn(&str) -> bool) -> Result<(), EngineError> {
    match obj.keys().find(|k| !declared(k.as_str())) {
        Some(key) => Err(EngineError::new(ErrorKind::UnknownKey(key.clone()))),
        None => Ok(()),
    }
}

fn non_empty(out: BTreeMap<String, Value>) -> Option<Value> {
    (!out.is_empty()).then_some(Value::Map(out))
}

pub(crate) fn type_mismatch(expected: &'static str, raw: &Raw) -> EngineError {
    EngineError::new(ErrorKind::TypeMismatch {
        expected,
        found: describe_raw(raw),
    })
}

pub(crate) fn describe_raw(raw: &Raw) -> String {
    match raw {
        Raw::Null => "null".to_string(),
        Raw::Bool(_) | Raw::Number(_) | Raw::String(_) => raw.to_string(),
        Raw::Array(_) => "a list".to_string(),
        Raw::Object(_) => "a mapping".to_string(),
    }
}
