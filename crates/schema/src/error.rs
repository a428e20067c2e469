//! Error types for schema construction and for parse/generate runs.
//!
//! [`SchemaError`] reports a defect in a schema tree while it is being built.
//! [`EngineError`] reports why a conversion was aborted: an [`ErrorKind`] plus
//! the [`Path`] of the node that raised it.

use std::fmt;

/// A defect in a schema tree, raised by the node constructors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// The same key name appears twice in one Dict or one SwitchDict variant.
    #[error("key '{key}' declared more than once in '{node}'")]
    DuplicateKeyInSchema { node: String, key: String },

    /// An atom declared both a default and a fixed value.
    #[error("atom declares both a default and a value")]
    DefaultAndValue,

    /// An atom declared neither a default nor a fixed value.
    #[error("atom declares neither a default nor a value")]
    MissingConstraint,

    /// A literal default/value does not have the atom's primitive type.
    #[error("literal {literal} is not a valid {expected}")]
    LiteralTypeMismatch {
        expected: &'static str,
        literal: String,
    },

    /// An enum declared no tokens.
    #[error("enum '{node}' has an empty domain")]
    EmptyEnum { node: String },

    /// An enum declared the same token twice.
    #[error("enum '{node}' declares token '{token}' more than once")]
    DuplicateEnumToken { node: String, token: String },

    /// An enum default is not one of its tokens.
    #[error("default '{default}' of enum '{node}' is not one of its tokens")]
    DefaultNotInEnum { node: String, default: String },

    /// A SwitchDict case re-declares the switch key among its own keys.
    #[error("switch '{node}': case '{token}' re-declares the switch key '{key}'")]
    SwitchKeyRedeclared {
        node: String,
        token: String,
        key: String,
    },

    /// A SwitchDict case names a token the switch enum does not declare.
    #[error("switch '{node}': case '{token}' is not a token of the switch enum")]
    UnknownCase { node: String, token: String },

    /// A switch enum token has no case.
    #[error("switch '{node}': no case for token '{token}'")]
    MissingCase { node: String, token: String },

    /// Two cases were declared for the same token.
    #[error("switch '{node}': case '{token}' declared more than once")]
    DuplicateCase { node: String, token: String },

    /// A variant declares a model type but the switch has no `model_var`.
    #[error("switch '{node}': variant models require a model_var")]
    VariantModelWithoutVar { node: String },

    /// A `model_var` was declared but no variant declares a model type.
    #[error("switch '{node}': model_var '{var}' declared but no variant has a model")]
    ModelVarWithoutVariantModel { node: String, var: String },

    /// Two variants share a model type while the discriminant is not bound to
    /// a field, so generation could not tell them apart.
    #[error("switch '{node}': cases '{first}' and '{second}' share model type '{model}'")]
    AmbiguousVariantModel {
        node: String,
        first: String,
        second: String,
        model: &'static str,
    },
}

/// Why a parse, generate, or grammar validation was aborted.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ErrorKind {
    #[error("missing key '{0}'")]
    MissingKey(String),

    #[error("unknown key '{0}'")]
    UnknownKey(String),

    #[error("missing switch key '{0}'")]
    MissingSwitchKey(String),

    #[error("invalid value {found} for switch key '{key}'")]
    InvalidSwitchValue { key: String, found: String },

    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },

    /// A fixed-value atom saw something else: the input uses a feature that
    /// is not modeled yet.
    #[error("expected fixed value {expected}, found {found} (feature not yet modeled)")]
    ValueMismatch { expected: String, found: String },

    #[error("'{}' is not one of [{}]", .found, .allowed.join(", "))]
    InvalidEnumValue { found: String, allowed: Vec<String> },

    #[error("enum '{0}' has no default and no value was supplied")]
    NoDefaultForEnum(String),

    #[error("list '{node}' allows {expected} elements, found {found}")]
    ListLengthMismatch {
        node: String,
        expected: usize,
        found: usize,
    },

    #[error("unbounded list '{0}' is not allowed in a complete grammar")]
    UnlimitedListInCompleteGrammar(String),

    #[error("model '{model}' left significant data unconsumed: {leftover}")]
    UnconsumedModelResult {
        model: &'static str,
        leftover: String,
    },

    #[error("field '{field}' of model '{model}' assigned more than once")]
    MultiplyAssignedField { model: &'static str, field: String },

    #[error("model '{model}' has no field '{field}'")]
    UnknownModelField { model: &'static str, field: String },

    #[error("variable '{0}' is bound outside of any model")]
    VariableWithoutModel(String),

    #[error("model does not fit the schema: {0}")]
    ModelSchemaMismatch(String),
}

/// One step of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
    /// Any element of a list, used when validating a schema rather than data.
    Element,
}

/// Location of a node inside a raw tree or a model graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path(Vec<Segment>);

impl Path {
    pub fn root() -> Self {
        Path::default()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a copy of this path extended by one key.
    pub fn key(&self, name: &str) -> Self {
        let mut next = self.clone();
        next.0.push(Segment::Key(name.to_string()));
        next
    }

    /// Returns a copy of this path extended by one list index.
    pub fn index(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.0.push(Segment::Index(index));
        next
    }

    pub(crate) fn element(&self) -> Self {
        let mut next = self.clone();
        next.0.push(Segment::Element);
        next
    }

    fn prepend(&mut self, segment: Segment) {
        self.0.insert(0, segment);
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Key(name) if i == 0 => write!(f, "{}", name)?,
                Segment::Key(name) => write!(f, ".{}", name)?,
                Segment::Index(index) => write!(f, "[{}]", index)?,
                Segment::Element => write!(f, "[*]")?,
            }
        }
        Ok(())
    }
}

/// A terminal conversion failure. The first error raised anywhere in the
/// tree is propagated unchanged; each enclosing level only adds its segment
/// to `path`.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{}{}", location(.path), .kind)]
pub struct EngineError {
    pub kind: ErrorKind,
    pub path: Path,
}

fn location(path: &Path) -> String {
    if path.is_root() {
        String::new()
    } else {
        format!("{}: ", path)
    }
}

impl EngineError {
    pub fn new(kind: ErrorKind) -> Self {
        EngineError {
            kind,
            path: Path::root(),
        }
    }

    pub(crate) fn at(kind: ErrorKind, path: Path) -> Self {
        EngineError { kind, path }
    }

    /// Records that the error happened below key `name`.
    pub fn in_key(mut self, name: &str) -> Self {
        self.path.prepend(Segment::Key(name.to_string()));
        self
    }

    /// Records that the error happened below list index `index`.
    pub fn in_index(mut self, index: usize) -> Self {
        self.path.prepend(Segment::Index(index));
        self
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl From<ErrorKind> for EngineError {
    fn from(kind: ErrorKind) -> Self {
        EngineError::new(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_renders_keys_and_indices() {
        let path = Path::root().key("banks").index(3).key("presets").index(0).key("name");
        assert_eq!(path.to_string(), "banks[3].presets[0].name");
        assert_eq!(Path::root().to_string(), "<root>");
    }

    #[test]
    fn error_collects_location_while_unwinding() {
        let err = EngineError::new(ErrorKind::MissingKey("channel".into()))
            .in_key("data")
            .in_index(2)
            .in_key("messages");
        assert_eq!(err.path.to_string(), "messages[2].data");
        assert_eq!(err.to_string(), "messages[2].data: missing key 'channel'");
    }

    #[test]
    fn root_error_has_no_location_prefix() {
        let err = EngineError::new(ErrorKind::UnknownKey("extra".into()));
        assert_eq!(err.to_string(), "unknown key 'extra'");
    }

    #[test]
    fn enum_error_lists_allowed_tokens() {
        let kind = ErrorKind::InvalidEnumValue {
            found: "zz".into(),
            allowed: vec!["pc".into(), "cc".into()],
        };
        assert_eq!(kind.to_string(), "'zz' is not one of [pc, cc]");
    }
}
