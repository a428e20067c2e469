//! A root schema paired with its interpretation mode.

use std::fmt;

use tracing::{debug, trace};

use crate::error::{EngineError, ErrorKind, Path};
use crate::generate::Generator;
use crate::model::{ModelType, Value};
use crate::node::{Key, Node, Raw};
use crate::parse::Parser;

/// How a grammar treats keys and list slots holding their default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Every key and every list slot is present, as the device exports it.
    Complete,
    /// Defaults are omitted, as a person would write it.
    Minimal,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Complete => write!(f, "complete"),
            Mode::Minimal => write!(f, "minimal"),
        }
    }
}

/// Immutable once built; safe to share between threads.
#[derive(Debug, Clone)]
pub struct Grammar {
    schema: Node,
    mode: Mode,
}

impl Grammar {
    /// Wraps `schema`, rejecting variable bindings with no model field to
    /// land in and unbounded lists under [`Mode::Complete`].
    pub fn new(schema: impl Into<Node>, mode: Mode) -> Result<Self, EngineError> {
        let schema = schema.into();
        validate(&schema, None, mode, &Path::root())?;
        debug!(mode = %mode, root = %schema.describe(), "grammar built");
        Ok(Grammar { schema, mode })
    }

    pub fn complete(schema: impl Into<Node>) -> Result<Self, EngineError> {
        Self::new(schema, Mode::Complete)
    }

    pub fn minimal(schema: impl Into<Node>) -> Result<Self, EngineError> {
        Self::new(schema, Mode::Minimal)
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn schema(&self) -> &Node {
        &self.schema
    }

    /// Parses a raw tree. `None` means the tree holds nothing but defaults.
    ///
    /// The root is checked like any other node, so a `null` document is a
    /// type mismatch in both modes.
    pub fn parse_config(&self, raw: &Raw) -> Result<Option<Value>, EngineError> {
        trace!(mode = %self.mode, "parse start");
        let parsed = Parser::new(self.mode).parse(raw, &self.schema, None, &[], None)?;
        debug!(mode = %self.mode, significant = parsed.is_some(), "parse finished");
        Ok(parsed)
    }

    /// Generates the raw tree for `model` (`None` for all defaults).
    ///
    /// A complete grammar always produces every key and slot. A minimal one
    /// produces only significant content and returns `null` when nothing
    /// is.
    pub fn gen_config(&self, model: Option<&Value>) -> Result<Raw, EngineError> {
        trace!(mode = %self.mode, "generate start");
        let emitted = Generator::new(self.mode).generate(model, &self.schema, None, &[], None)?;
        debug!(mode = %self.mode, significant = emitted.significant, "generate finished");
        Ok(match self.mode {
            Mode::Complete => emitted.full,
            Mode::Minimal if emitted.is_vacant() => Raw::Null,
            Mode::Minimal => emitted.sparse,
        })
    }
}

/// Walks the schema once, checking each binding against the model type in
/// scope where the node sits.
fn validate(
    node: &Node,
    enclosing: Option<&'static ModelType>,
    mode: Mode,
    path: &Path,
) -> Result<(), EngineError> {
    if let Some(var) = node.var() {
        check_field(var, enclosing, path)?;
    }
    let scope = node.model().or(enclosing);

    match node {
        Node::Dict(dict) => validate_keys(&dict.keys, scope, mode, path),
        Node::Switch(switch) => {
            if let Some(var) = switch.selector().var.as_deref() {
                check_field(var, scope, &path.key(switch.switch_key()))?;
            }
            validate_keys(&switch.common, scope, mode, path)?;
            if let Some(field) = switch.model_var() {
                check_field(field, scope, path)?;
            }
            for case in &switch.cases {
                validate_keys(&case.keys, case.model.or(scope), mode, path)?;
            }
            Ok(())
        }
        Node::List(list) => {
            if list.is_unbounded() && mode == Mode::Complete {
                return Err(EngineError::at(
                    ErrorKind::UnlimitedListInCompleteGrammar(list.name.clone()),
                    path.clone(),
                ));
            }
            validate(&list.element, scope, mode, &path.element())
        }
        Node::Enum(_) | Node::Atom(_) => Ok(()),
    }
}

fn validate_keys(
    keys: &[Key],
    scope: Option<&'static ModelType>,
    mode: Mode,
    path: &Path,
) -> Result<(), EngineError> {
    keys.iter()
        .try_for_each(|key| validate(&key.schema, scope, mode, &path.key(&key.name)))
}

fn check_field(field: &str, scope: Option<&'static ModelType>, path: &Path) -> Result<(), EngineError> {
    let kind = match scope {
        None => ErrorKind::VariableWithoutModel(field.to_string()),
        Some(ty) if ty.slot(field).is_none() => ErrorKind::UnknownModelField {
            model: ty.name,
            field: field.to_string(),
        },
        Some(_) => return Ok(()),
    };
    Err(EngineError::at(kind, path.clone()))
}
