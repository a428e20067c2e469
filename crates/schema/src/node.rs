//! The schema node hierarchy.
//!
//! A schema is a tree of [`Node`]s built once by a domain crate and never
//! mutated afterwards. Every constructor that can be misused returns a
//! [`SchemaError`], so an inconsistent tree never reaches the engine.
//!
//! - [`Dict`]: fixed set of keys.
//! - [`SwitchDict`]: tagged union selected by an [`Enum`]-typed switch key.
//! - [`List`]: fixed length (or unbounded, minimal grammars only) list.
//! - [`Enum`]: closed set of string tokens.
//! - [`Atom`]: integer, string, or boolean leaf.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::error::SchemaError;
use crate::model::{ModelType, Value};

/// The raw serialized tree the engine reads and writes.
pub type Raw = serde_json::Value;

/// Post-processing applied to a node's parse result.
pub type Cleanup = Arc<dyn Fn(Option<Value>) -> Option<Value> + Send + Sync>;

type TargetFn = dyn Fn(&Probe<'_>) -> Raw + Send + Sync;

/// What a computed default or value sees when it is resolved.
#[derive(Debug, Clone, Copy)]
pub struct Probe<'a> {
    /// The raw value being parsed, or the literal being generated (`null`
    /// when the model leaves it unset).
    pub current: &'a Raw,
    /// The immediately enclosing raw Dict or List, with every sibling in
    /// place in both directions.
    pub context: Option<&'a Raw>,
    /// Indices of every enclosing List, outermost first.
    pub list_pos: &'a [usize],
}

impl<'a> Probe<'a> {
    /// Position inside the innermost enclosing List.
    pub fn index(&self) -> usize {
        self.list_pos.last().copied().unwrap_or(0)
    }

    pub fn sibling(&self, key: &str) -> Option<&'a Raw> {
        self.context.and_then(|ctx| ctx.get(key))
    }

    /// Integer sibling, or `fallback` when it is absent (minimal input omits
    /// siblings that hold their default).
    pub fn sibling_int(&self, key: &str, fallback: i64) -> i64 {
        self.sibling(key).and_then(Raw::as_i64).unwrap_or(fallback)
    }
}

/// A default or fixed value: either a literal or a function of the probe.
#[derive(Clone)]
pub enum Target {
    Literal(Raw),
    Computed(Arc<TargetFn>),
}

impl Target {
    pub fn computed(f: impl Fn(&Probe<'_>) -> Raw + Send + Sync + 'static) -> Self {
        Target::Computed(Arc::new(f))
    }

    pub fn resolve(&self, probe: &Probe<'_>) -> Raw {
        match self {
            Target::Literal(raw) => raw.clone(),
            Target::Computed(f) => f(probe),
        }
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Literal(raw) => write!(f, "Literal({})", raw),
            Target::Computed(_) => write!(f, "Computed(..)"),
        }
    }
}

impl From<i64> for Target {
    fn from(n: i64) -> Self {
        Target::Literal(Raw::from(n))
    }
}

impl From<bool> for Target {
    fn from(b: bool) -> Self {
        Target::Literal(Raw::Bool(b))
    }
}

impl From<&str> for Target {
    fn from(s: &str) -> Self {
        Target::Literal(Raw::String(s.to_string()))
    }
}

impl From<String> for Target {
    fn from(s: String) -> Self {
        Target::Literal(Raw::String(s))
    }
}

/// Primitive type of an [`Atom`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Int,
    Str,
    Bool,
}

impl Primitive {
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Int => "integer",
            Primitive::Str => "string",
            Primitive::Bool => "boolean",
        }
    }

    pub fn admits(self, raw: &Raw) -> bool {
        match self {
            Primitive::Int => raw.as_i64().is_some(),
            Primitive::Str => raw.is_string(),
            Primitive::Bool => raw.is_boolean(),
        }
    }
}

/// How an atom compares against its target.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// Values equal to the target are insignificant; others are user data.
    Default(Target),
    /// The only admissible value. Anything else means the input uses a
    /// feature the schema does not model.
    Value(Target),
}

impl Constraint {
    pub fn target(&self) -> &Target {
        match self {
            Constraint::Default(t) | Constraint::Value(t) => t,
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, Constraint::Value(_))
    }
}

/// Bindings shared by the container nodes.
#[derive(Clone, Default)]
pub(crate) struct Binding {
    pub(crate) var: Option<String>,
    pub(crate) model: Option<&'static ModelType>,
    /// Receives the built model when the node declares one.
    pub(crate) cleanup: Option<Cleanup>,
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("var", &self.var)
            .field("model", &self.model.map(|m| m.name))
            .field("cleanup", &self.cleanup.is_some())
            .finish()
    }
}

macro_rules! binding_setters {
    () => {
        /// Instantiates a model of type `ty` when entering this node.
        pub fn model(mut self, ty: &'static ModelType) -> Self {
            self.binding.model = Some(ty);
            self
        }

        /// Stores this node's result in field `var` of the enclosing model.
        pub fn var(mut self, var: &str) -> Self {
            self.binding.var = Some(var.to_string());
            self
        }

        /// Post-processes the parse result; returning `None` erases it.
        /// A node with a model hands the finished model to `f`, before the
        /// result is bound to the enclosing model.
        pub fn cleanup(
            mut self,
            f: impl Fn(Option<Value>) -> Option<Value> + Send + Sync + 'static,
        ) -> Self {
            self.binding.cleanup = Some(Arc::new(f));
            self
        }
    };
}

/// One entry of a [`Dict`] or [`SwitchDict`].
#[derive(Debug, Clone)]
pub struct Key {
    pub name: String,
    pub schema: Node,
    /// Must be present even in minimal input.
    pub required: bool,
}

impl Key {
    pub fn new(name: &str, schema: impl Into<Node>) -> Self {
        Key {
            name: name.to_string(),
            schema: schema.into(),
            required: false,
        }
    }

    pub fn required(name: &str, schema: impl Into<Node>) -> Self {
        Key {
            required: true,
            ..Key::new(name, schema)
        }
    }
}

fn check_unique<'a>(node: &str, names: impl IntoIterator<Item = &'a str>) -> Result<(), SchemaError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(SchemaError::DuplicateKeyInSchema {
                node: node.to_string(),
                key: name.to_string(),
            });
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct Dict {
    pub(crate) name: String,
    pub(crate) keys: Vec<Key>,
    pub(crate) binding: Binding,
}

impl Dict {
    pub fn new(name: &str, keys: Vec<Key>) -> Result<Self, SchemaError> {
        check_unique(name, keys.iter().map(|k| k.name.as_str()))?;
        Ok(Dict {
            name: name.to_string(),
            keys,
            binding: Binding::default(),
        })
    }

    binding_setters!();

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }
}

/// One variant of a [`SwitchDict`].
#[derive(Debug, Clone)]
pub struct Case {
    pub(crate) token: String,
    pub(crate) model: Option<&'static ModelType>,
    pub(crate) keys: Vec<Key>,
}

impl Case {
    pub fn new(token: &str, keys: Vec<Key>) -> Self {
        Case {
            token: token.to_string(),
            model: None,
            keys,
        }
    }

    /// A variant whose keys feed a model of type `ty`, stored in the
    /// switch's `model_var` field.
    pub fn with_model(token: &str, ty: &'static ModelType, keys: Vec<Key>) -> Self {
        Case {
            token: token.to_string(),
            model: Some(ty),
            keys,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }
}

/// A tagged-union record. The switch key's token selects which case's keys
/// apply in addition to the common keys.
#[derive(Debug, Clone)]
pub struct SwitchDict {
    pub(crate) name: String,
    pub(crate) switch_key: String,
    pub(crate) selector: Enum,
    pub(crate) common: Vec<Key>,
    pub(crate) cases: Vec<Case>,
    pub(crate) model_var: Option<String>,
    pub(crate) binding: Binding,
}

impl SwitchDict {
    /// Cases must cover the selector's tokens exactly, in any order.
    pub fn new(
        name: &str,
        switch_key: &str,
        selector: Enum,
        cases: Vec<Case>,
        common: Vec<Key>,
        model_var: Option<&str>,
    ) -> Result<Self, SchemaError> {
        let node = || name.to_string();

        let mut covered = HashSet::new();
        for case in &cases {
            if !selector.contains(&case.token) {
                return Err(SchemaError::UnknownCase {
                    node: node(),
                    token: case.token.clone(),
                });
            }
            if !covered.insert(case.token.as_str()) {
                return Err(SchemaError::DuplicateCase {
                    node: node(),
                    token: case.token.clone(),
                });
            }
            if let Some(key) = case.keys.iter().find(|k| k.name == switch_key) {
                return Err(SchemaError::SwitchKeyRedeclared {
                    node: node(),
                    token: case.token.clone(),
                    key: key.name.clone(),
                });
            }
            check_unique(
                name,
                std::iter::once(switch_key)
                    .chain(common.iter().map(|k| k.name.as_str()))
                    .chain(case.keys.iter().map(|k| k.name.as_str())),
            )?;
        }
        if let Some(token) = selector.tokens.iter().find(|t| !covered.contains(t.as_str())) {
            return Err(SchemaError::MissingCase {
                node: node(),
                token: token.clone(),
            });
        }
        if common.iter().any(|k| k.name == switch_key) {
            return Err(SchemaError::DuplicateKeyInSchema {
                node: node(),
                key: switch_key.to_string(),
            });
        }

        let has_variant_model = cases.iter().any(|c| c.model.is_some());
        match (has_variant_model, model_var) {
            (true, None) => return Err(SchemaError::VariantModelWithoutVar { node: node() }),
            (false, Some(var)) => {
                return Err(SchemaError::ModelVarWithoutVariantModel {
                    node: node(),
                    var: var.to_string(),
                })
            }
            _ => {}
        }

        if selector.var.is_none() {
            for (i, first) in cases.iter().enumerate() {
                let Some(ty) = first.model else { continue };
                if let Some(second) = cases[i + 1..].iter().find(|c| c.model == Some(ty)) {
                    return Err(SchemaError::AmbiguousVariantModel {
                        node: node(),
                        first: first.token.clone(),
                        second: second.token.clone(),
                        model: ty.name,
                    });
                }
            }
        }

        Ok(SwitchDict {
            name: name.to_string(),
            switch_key: switch_key.to_string(),
            selector,
            common,
            cases,
            model_var: model_var.map(str::to_string),
            binding: Binding::default(),
        })
    }

    binding_setters!();

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn switch_key(&self) -> &str {
        &self.switch_key
    }

    pub fn selector(&self) -> &Enum {
        &self.selector
    }

    pub fn case(&self, token: &str) -> Option<&Case> {
        self.cases.iter().find(|c| c.token == token)
    }

    pub fn cases(&self) -> &[Case] {
        &self.cases
    }

    pub fn common(&self) -> &[Key] {
        &self.common
    }

    pub fn model_var(&self) -> Option<&str> {
        self.model_var.as_deref()
    }

    /// Every key name this switch accepts when the discriminant is `case`.
    pub(crate) fn accepts(&self, case: &Case, key: &str) -> bool {
        key == self.switch_key
            || self.common.iter().any(|k| k.name == key)
            || case.keys.iter().any(|k| k.name == key)
    }
}

/// Length marker for lists without a fixed size.
pub const UNBOUNDED: usize = 0;

#[derive(Debug, Clone)]
pub struct List {
    pub(crate) name: String,
    pub(crate) length: usize,
    pub(crate) element: Box<Node>,
    pub(crate) binding: Binding,
}

impl List {
    /// `length` of [`UNBOUNDED`] is only accepted by minimal grammars.
    pub fn new(name: &str, length: usize, element: impl Into<Node>) -> Self {
        List {
            name: name.to_string(),
            length,
            element: Box::new(element.into()),
            binding: Binding::default(),
        }
    }

    binding_setters!();

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn is_unbounded(&self) -> bool {
        self.length == UNBOUNDED
    }

    pub fn element(&self) -> &Node {
        &self.element
    }
}

#[derive(Debug, Clone)]
pub struct Enum {
    pub(crate) name: String,
    pub(crate) tokens: Vec<String>,
    pub(crate) default: Option<String>,
    pub(crate) var: Option<String>,
}

impl Enum {
    pub fn new(name: &str, tokens: &[&str], default: Option<&str>) -> Result<Self, SchemaError> {
        if tokens.is_empty() {
            return Err(SchemaError::EmptyEnum {
                node: name.to_string(),
            });
        }
        let mut seen = HashSet::new();
        for token in tokens {
            if !seen.insert(*token) {
                return Err(SchemaError::DuplicateEnumToken {
                    node: name.to_string(),
                    token: token.to_string(),
                });
            }
        }
        if let Some(default) = default {
            if !seen.contains(default) {
                return Err(SchemaError::DefaultNotInEnum {
                    node: name.to_string(),
                    default: default.to_string(),
                });
            }
        }
        Ok(Enum {
            name: name.to_string(),
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
            default: default.map(str::to_string),
            var: None,
        })
    }

    pub fn var(mut self, var: &str) -> Self {
        self.var = Some(var.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn default_token(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t == token)
    }

    pub(crate) fn is_default(&self, token: &str) -> bool {
        self.default.as_deref() == Some(token)
    }
}

#[derive(Debug, Clone)]
pub struct Atom {
    pub(crate) primitive: Primitive,
    pub(crate) constraint: Constraint,
    pub(crate) var: Option<String>,
}

impl Atom {
    /// General form: exactly one of `default` and `value` must be given.
    pub fn new(
        primitive: Primitive,
        default: Option<Target>,
        value: Option<Target>,
    ) -> Result<Self, SchemaError> {
        let constraint = match (default, value) {
            (Some(_), Some(_)) => return Err(SchemaError::DefaultAndValue),
            (None, None) => return Err(SchemaError::MissingConstraint),
            (Some(t), None) => Constraint::Default(t),
            (None, Some(t)) => Constraint::Value(t),
        };
        if let Target::Literal(raw) = constraint.target() {
            if !primitive.admits(raw) {
                return Err(SchemaError::LiteralTypeMismatch {
                    expected: primitive.name(),
                    literal: raw.to_string(),
                });
            }
        }
        Ok(Atom {
            primitive,
            constraint,
            var: None,
        })
    }

    /// Atom with a computed or literal default.
    pub fn with_default(primitive: Primitive, default: impl Into<Target>) -> Result<Self, SchemaError> {
        Self::new(primitive, Some(default.into()), None)
    }

    /// Atom whose only admissible value is `value`.
    pub fn with_value(primitive: Primitive, value: impl Into<Target>) -> Result<Self, SchemaError> {
        Self::new(primitive, None, Some(value.into()))
    }

    pub fn int(default: i64) -> Self {
        Self::typed(Primitive::Int, Constraint::Default(default.into()))
    }

    pub fn string(default: &str) -> Self {
        Self::typed(Primitive::Str, Constraint::Default(default.into()))
    }

    pub fn boolean(default: bool) -> Self {
        Self::typed(Primitive::Bool, Constraint::Default(default.into()))
    }

    pub fn fixed_int(value: i64) -> Self {
        Self::typed(Primitive::Int, Constraint::Value(value.into()))
    }

    pub fn fixed_string(value: &str) -> Self {
        Self::typed(Primitive::Str, Constraint::Value(value.into()))
    }

    // Callers pass a literal whose Rust type already matches `primitive`.
    fn typed(primitive: Primitive, constraint: Constraint) -> Self {
        Atom {
            primitive,
            constraint,
            var: None,
        }
    }

    pub fn var(mut self, var: &str) -> Self {
        self.var = Some(var.to_string());
        self
    }

    pub fn primitive(&self) -> Primitive {
        self.primitive
    }

    pub fn constraint(&self) -> &Constraint {
        &self.constraint
    }

    pub(crate) fn is_computed(&self) -> bool {
        matches!(self.constraint.target(), Target::Computed(_))
    }
}

/// A schema node. The variant set is closed; the engine matches on it
/// exhaustively.
#[derive(Debug, Clone)]
pub enum Node {
    Dict(Dict),
    Switch(SwitchDict),
    List(List),
    Enum(Enum),
    Atom(Atom),
}

impl Node {
    pub fn var(&self) -> Option<&str> {
        match self {
            Node::Dict(d) => d.binding.var.as_deref(),
            Node::Switch(s) => s.binding.var.as_deref(),
            Node::List(l) => l.binding.var.as_deref(),
            Node::Enum(e) => e.var.as_deref(),
            Node::Atom(a) => a.var.as_deref(),
        }
    }

    pub fn model(&self) -> Option<&'static ModelType> {
        match self {
            Node::Dict(d) => d.binding.model,
            Node::Switch(s) => s.binding.model,
            Node::List(l) => l.binding.model,
            Node::Enum(_) | Node::Atom(_) => None,
        }
    }

    pub(crate) fn cleanup(&self) -> Option<&Cleanup> {
        match self {
            Node::Dict(d) => d.binding.cleanup.as_ref(),
            Node::Switch(s) => s.binding.cleanup.as_ref(),
            Node::List(l) => l.binding.cleanup.as_ref(),
            Node::Enum(_) | Node::Atom(_) => None,
        }
    }

    /// Short description used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Node::Dict(d) => format!("dict '{}'", d.name),
            Node::Switch(s) => format!("switch '{}'", s.name),
            Node::List(l) => format!("list '{}'", l.name),
            Node::Enum(e) => format!("enum '{}'", e.name),
            Node::Atom(a) => format!("{} atom", a.primitive.name()),
        }
    }
}

impl From<Dict> for Node {
    fn from(d: Dict) -> Self {
        Node::Dict(d)
    }
}

impl From<SwitchDict> for Node {
    fn from(s: SwitchDict) -> Self {
        Node::Switch(s)
    }
}

impl From<List> for Node {
    fn from(l: List) -> Self {
        Node::List(l)
    }
}

impl From<Enum> for Node {
    fn from(e: Enum) -> Self {
        Node::Enum(e)
    }
}

impl From<Atom> for Node {
    fn from(a: Atom) -> Self {
        Node::Atom(a)
    }
}
