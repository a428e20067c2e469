//! Models → raw tree.
//!
//! Each node produces two renderings at once: the full one, with every key
//! and list slot present, and the sparse one, holding only what differs from
//! the schema. Computed atoms are resolved last, against the finished full
//! rendering of their parent, so they see every sibling the way parsing
//! does, including siblings the sparse rendering suppresses.

use std::collections::BTreeMap;

use serde_json::Map;

use crate::error::{EngineError, ErrorKind};
use crate::grammar::Mode;
use crate::list::prune;
use crate::model::{Model, Value};
use crate::node::{Atom, Constraint, Dict, Enum, Key, List, Node, Primitive, Probe, Raw, SwitchDict};
use crate::parse::check_length;

/// Both renderings of one node.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Emitted {
    pub(crate) full: Raw,
    pub(crate) sparse: Raw,
    /// The sparse rendering differs from what the schema alone produces.
    pub(crate) significant: bool,
    /// Must appear whenever the parent appears (fixed-value atoms).
    pub(crate) pinned: bool,
}

impl Emitted {
    fn leaf(raw: Raw, significant: bool, pinned: bool) -> Self {
        Emitted {
            full: raw.clone(),
            sparse: raw,
            significant,
            pinned,
        }
    }

    /// Nothing to write at all: insignificant and no pinned content.
    pub(crate) fn is_vacant(&self) -> bool {
        if self.significant || self.pinned {
            return false;
        }
        match &self.sparse {
            Raw::Object(map) => map.is_empty(),
            Raw::Array(items) => items.is_empty(),
            _ => true,
        }
    }
}

pub(crate) struct Generator {
    mode: Mode,
}

impl Generator {
    pub(crate) fn new(mode: Mode) -> Self {
        Generator { mode }
    }

    pub(crate) fn generate<'a>(
        &self,
        sub: Option<&'a Value>,
        node: &'a Node,
        context: Option<&Raw>,
        list_pos: &[usize],
        active: Option<&'a Model>,
    ) -> Result<Emitted, EngineError> {
        let mut sub = sub;
        if let Some(var) = node.var() {
            sub = match active {
                Some(model) => model.get(var)?,
                None => None,
            };
        }

        let mut scope = active;
        if let Some(ty) = node.model() {
            scope = match sub {
                Some(Value::Model(model)) if model.is(ty) => Some(model),
                _ => None,
            };
            sub = None;
        }

        match node {
            Node::Dict(dict) => self.generate_dict(sub, dict, list_pos, scope),
            Node::Switch(switch) => self.generate_switch(sub, switch, list_pos, scope),
            Node::List(list) => self.generate_list(sub, list, list_pos, scope),
            Node::Enum(e) => generate_enum(sub, e),
            Node::Atom(atom) => generate_atom(sub, atom, context, list_pos),
        }
    }

    fn generate_dict<'a>(
        &self,
        sub: Option<&'a Value>,
        dict: &'a Dict,
        list_pos: &[usize],
        scope: Option<&'a Model>,
    ) -> Result<Emitted, EngineError> {
        let entries = entries_of(sub)?;
        let mut out = Accumulator::new(Shape::Map);
        self.generate_keys(&dict.keys, entries, list_pos, scope, &mut out)?;
        self.settle(&mut out)?;
        Ok(out.finish_map())
    }

    fn generate_switch<'a>(
        &self,
        sub: Option<&'a Value>,
        switch: &'a SwitchDict,
        list_pos: &[usize],
        scope: Option<&'a Model>,
    ) -> Result<Emitted, EngineError> {
        let entries = entries_of(sub)?;
        let key = switch.switch_key();
        let token = discriminant(switch, entries, scope).map_err(|e| e.in_key(key))?;
        let case = switch.case(&token).ok_or_else(|| {
            EngineError::new(ErrorKind::InvalidSwitchValue {
                key: key.to_string(),
                found: Raw::String(token.clone()).to_string(),
            })
        })?;

        let mut out = Accumulator::new(Shape::Map);
        let selector_significant = !switch.selector().is_default(&token);
        out.push(
            Label::Key(key),
            Emitted::leaf(Raw::String(token.clone()), selector_significant, true),
            true,
        );

        self.generate_keys(&switch.common, entries, list_pos, scope, &mut out)?;

        match (case.model, switch.model_var()) {
            (Some(ty), Some(field)) => {
                let variant = match scope {
                    Some(model) => match model.get(field)? {
                        Some(Value::Model(v)) if v.is(ty) => Some(v),
                        _ => None,
                    },
                    None => None,
                };
                self.generate_keys(&case.keys, entries, list_pos, variant, &mut out)?;
            }
            _ => self.generate_keys(&case.keys, entries, list_pos, scope, &mut out)?,
        }
        self.settle(&mut out)?;
        Ok(out.finish_map())
    }

    fn generate_keys<'a>(
        &self,
        keys: &'a [Key],
        entries: Option<&'a BTreeMap<String, Value>>,
        list_pos: &[usize],
        scope: Option<&'a Model>,
        out: &mut Accumulator<'a>,
    ) -> Result<(), EngineError> {
        for key in keys {
            let child = entries.and_then(|map| map.get(&key.name));
            let label = Label::Key(&key.name);
            if is_computed_atom(&key.schema) {
                out.defer(label, Deferred::new(child, &key.schema, scope, list_pos), key.required);
                continue;
            }
            let emitted = self
                .generate(child, &key.schema, None, list_pos, scope)
                .map_err(|e| label.locate(e))?;
            out.push(label, emitted, key.required);
        }
        Ok(())
    }

    fn generate_list<'a>(
        &self,
        sub: Option<&'a Value>,
        list: &'a List,
        list_pos: &[usize],
        scope: Option<&'a Model>,
    ) -> Result<Emitted, EngineError> {
        let slots: &[Option<Value>] = match sub {
            None | Some(Value::Model(_)) => &[],
            Some(Value::List(items)) => items,
            Some(other) => {
                return Err(mismatch(format!("expected a list for '{}', found {}", list.name, other)))
            }
        };
        // Shorter lists stand for trailing default slots; only overflow is
        // an error.
        if list.is_unbounded() {
            check_length(list, slots.len(), self.mode)?;
        } else {
            check_length(list, slots.len(), Mode::Minimal)?;
        }
        let length = if list.is_unbounded() { slots.len() } else { list.length };

        let mut out = Accumulator::new(Shape::Seq);
        let mut position = list_pos.to_vec();
        position.push(0);
        for i in 0..length {
            if let Some(last) = position.last_mut() {
                *last = i;
            }
            let child = slots.get(i).and_then(Option::as_ref);
            if is_computed_atom(&list.element) {
                out.defer(Label::Index(i), Deferred::new(child, &list.element, scope, &position), false);
                continue;
            }
            let emitted = self
                .generate(child, &list.element, None, &position, scope)
                .map_err(|e| e.in_index(i))?;
            out.push(Label::Index(i), emitted, false);
        }
        self.settle(&mut out)?;
        Ok(out.finish_seq())
    }

    /// Resolves the deferred computed atoms of `out` against the full
    /// rendering of their parent. One may depend on another, so rounds
    /// repeat until no rendering changes; errors of the last round stand.
    fn settle(&self, out: &mut Accumulator<'_>) -> Result<(), EngineError> {
        let deferred = out.slots.iter().filter(|s| s.deferred.is_some()).count();
        if deferred == 0 {
            return Ok(());
        }
        let mut failure = None;
        for _ in 0..=deferred {
            let context = out.full();
            let mut changed = false;
            failure = None;
            for slot in out.slots.iter_mut() {
                let Some(d) = &slot.deferred else { continue };
                match self.generate(d.child, d.schema, Some(&context), &d.list_pos, d.scope) {
                    Ok(emitted) => {
                        changed |= slot.emitted.as_ref() != Some(&emitted);
                        slot.emitted = Some(emitted);
                    }
                    Err(e) => {
                        changed |= slot.emitted.take().is_some();
                        failure.get_or_insert(slot.label.locate(e));
                    }
                }
            }
            if !changed {
                break;
            }
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

fn is_computed_atom(node: &Node) -> bool {
    matches!(node, Node::Atom(atom) if atom.is_computed())
}

#[derive(Debug, Clone, Copy)]
enum Label<'a> {
    Key(&'a str),
    Index(usize),
}

impl Label<'_> {
    fn locate(self, e: EngineError) -> EngineError {
        match self {
            Label::Key(name) => e.in_key(name),
            Label::Index(i) => e.in_index(i),
        }
    }
}

/// A computed atom waiting for its siblings.
struct Deferred<'a> {
    child: Option<&'a Value>,
    schema: &'a Node,
    scope: Option<&'a Model>,
    list_pos: Vec<usize>,
}

impl<'a> Deferred<'a> {
    fn new(child: Option<&'a Value>, schema: &'a Node, scope: Option<&'a Model>, list_pos: &[usize]) -> Self {
        Deferred {
            child,
            schema,
            scope,
            list_pos: list_pos.to_vec(),
        }
    }
}

struct Slot<'a> {
    label: Label<'a>,
    required: bool,
    deferred: Option<Deferred<'a>>,
    emitted: Option<Emitted>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Map,
    Seq,
}

/// Collects the children of a container in output order and builds both
/// renderings once every child is resolved.
struct Accumulator<'a> {
    shape: Shape,
    slots: Vec<Slot<'a>>,
}

impl<'a> Accumulator<'a> {
    fn new(shape: Shape) -> Self {
        Accumulator {
            shape,
            slots: Vec::new(),
        }
    }

    fn push(&mut self, label: Label<'a>, emitted: Emitted, required: bool) {
        self.slots.push(Slot {
            label,
            required,
            deferred: None,
            emitted: Some(emitted),
        });
    }

    fn defer(&mut self, label: Label<'a>, deferred: Deferred<'a>, required: bool) {
        self.slots.push(Slot {
            label,
            required,
            deferred: Some(deferred),
            emitted: None,
        });
    }

    /// Full rendering of the children resolved so far. Unresolved list
    /// slots stay `null` so indices keep their meaning.
    fn full(&self) -> Raw {
        match self.shape {
            Shape::Map => Raw::Object(
                self.slots
                    .iter()
                    .filter_map(|slot| match (slot.label, &slot.emitted) {
                        (Label::Key(name), Some(e)) => Some((name.to_string(), e.full.clone())),
                        _ => None,
                    })
                    .collect(),
            ),
            Shape::Seq => Raw::Array(
                self.slots
                    .iter()
                    .map(|slot| slot.emitted.as_ref().map_or(Raw::Null, |e| e.full.clone()))
                    .collect(),
            ),
        }
    }

    fn finish_map(self) -> Emitted {
        let mut full = Map::new();
        let mut sparse = Map::new();
        let mut significant = false;
        for slot in self.slots {
            let (Label::Key(name), Some(emitted)) = (slot.label, slot.emitted) else {
                continue;
            };
            if emitted.significant || emitted.pinned || slot.required {
                sparse.insert(name.to_string(), emitted.sparse);
            }
            significant |= emitted.significant;
            full.insert(name.to_string(), emitted.full);
        }
        Emitted {
            full: Raw::Object(full),
            sparse: Raw::Object(sparse),
            significant,
            pinned: false,
        }
    }

    fn finish_seq(self) -> Emitted {
        let mut full = Vec::with_capacity(self.slots.len());
        let mut shapes = Vec::with_capacity(self.slots.len());
        let mut marks: Vec<Option<()>> = Vec::with_capacity(self.slots.len());
        for emitted in self.slots.into_iter().filter_map(|slot| slot.emitted) {
            marks.push(emitted.significant.then_some(()));
            shapes.push(emitted.sparse);
            full.push(emitted.full);
        }
        prune(&mut marks);
        shapes.truncate(marks.len());
        Emitted {
            full: Raw::Array(full),
            significant: !marks.is_empty(),
            sparse: Raw::Array(shapes),
            pinned: false,
        }
    }
}

fn entries_of(sub: Option<&Value>) -> Result<Option<&BTreeMap<String, Value>>, EngineError> {
    match sub {
        None | Some(Value::Model(_)) => Ok(None),
        Some(Value::Map(map)) => Ok(Some(map)),
        Some(other) => Err(mismatch(format!("expected a mapping, found {}", other))),
    }
}

/// Resolves the token selecting a SwitchDict case: from the bound field,
/// from an unbound map entry, from the stored variant's model type, and
/// finally from the selector's default.
fn discriminant(
    switch: &SwitchDict,
    entries: Option<&BTreeMap<String, Value>>,
    scope: Option<&Model>,
) -> Result<String, EngineError> {
    let selector = switch.selector();
    let explicit = match selector.var.as_deref() {
        Some(var) => match scope {
            Some(model) => model.get(var)?,
            None => None,
        },
        None => entries.and_then(|map| map.get(switch.switch_key())),
    };
    if let Some(value) = explicit {
        return match value.as_str() {
            Some(token) if selector.contains(token) => Ok(token.to_string()),
            _ => Err(EngineError::new(ErrorKind::InvalidSwitchValue {
                key: switch.switch_key().to_string(),
                found: value.to_string(),
            })),
        };
    }

    if selector.var.is_none() {
        if let (Some(field), Some(model)) = (switch.model_var(), scope) {
            if let Some(Value::Model(variant)) = model.get(field)? {
                let case = switch
                    .cases()
                    .iter()
                    .find(|c| c.model.is_some_and(|ty| variant.is(ty)))
                    .ok_or_else(|| {
                        mismatch(format!(
                            "'{}' is not a variant of switch '{}'",
                            variant.model_type().name,
                            switch.name()
                        ))
                    })?;
                return Ok(case.token.clone());
            }
        }
    }

    selector
        .default_token()
        .map(str::to_string)
        .ok_or_else(|| EngineError::new(ErrorKind::NoDefaultForEnum(selector.name.clone())))
}

fn generate_enum(sub: Option<&Value>, e: &Enum) -> Result<Emitted, EngineError> {
    match sub {
        None | Some(Value::Model(_)) => {
            let token = e
                .default_token()
                .ok_or_else(|| EngineError::new(ErrorKind::NoDefaultForEnum(e.name.clone())))?;
            Ok(Emitted::leaf(Raw::String(token.to_string()), false, false))
        }
        Some(Value::Str(token)) => {
            if !e.contains(token) {
                return Err(EngineError::new(ErrorKind::InvalidEnumValue {
                    found: token.clone(),
                    allowed: e.tokens.clone(),
                }));
            }
            Ok(Emitted::leaf(Raw::String(token.clone()), !e.is_default(token), false))
        }
        Some(other) => Err(mismatch(format!(
            "expected a token of enum '{}', found {}",
            e.name, other
        ))),
    }
}

fn generate_atom(
    sub: Option<&Value>,
    atom: &Atom,
    context: Option<&Raw>,
    list_pos: &[usize],
) -> Result<Emitted, EngineError> {
    let literal = match sub {
        None | Some(Value::Model(_)) => None,
        Some(value) => match value.to_literal() {
            Some(raw) if atom.primitive.admits(&raw) => Some(raw),
            _ => {
                return Err(mismatch(format!(
                    "expected {}, found {}",
                    primitive_article(atom.primitive),
                    value
                )))
            }
        },
    };

    let current = literal.clone().unwrap_or(Raw::Null);
    let target = atom.constraint.target().resolve(&Probe {
        current: &current,
        context,
        list_pos,
    });

    match (literal, &atom.constraint) {
        (None, Constraint::Value(_)) => Ok(Emitted::leaf(target, false, true)),
        (None, Constraint::Default(_)) => Ok(Emitted::leaf(target, false, false)),
        (Some(raw), Constraint::Value(_)) => {
            if raw != target {
                return Err(mismatch(format!("fixed value is {}, model holds {}", target, raw)));
            }
            Ok(Emitted::leaf(raw, false, true))
        }
        (Some(raw), Constraint::Default(_)) => {
            let significant = raw != target;
            Ok(Emitted::leaf(raw, significant, false))
        }
    }
}

fn primitive_article(primitive: Primitive) -> &'static str {
    match primitive {
        Primitive::Int => "an integer",
        Primitive::Str => "a string",
        Primitive::Bool => "a boolean",
    }
}

fn mismatch(reason: String) -> EngineError {
    EngineError::new(ErrorKind::ModelSchemaMismatch(reason))
}
