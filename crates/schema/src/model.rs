//! Models and the values they hold.
//!
//! A model type is declared once as a static [`ModelType`]: a name plus the
//! ordered list of fields it exposes. The engine resolves variable bindings
//! against that table, so a binding to a field the type does not declare is
//! caught when the grammar is built instead of halfway through a parse.
//!
//! ```ignore
//! pub static PROGRAM_CHANGE: ModelType = ModelType::new("ProgramChange", &["channel", "program"]);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use crate::error::ErrorKind;
use crate::node::Raw;

/// Static field registry of one model type.
#[derive(Debug, PartialEq, Eq)]
pub struct ModelType {
    pub name: &'static str,
    pub fields: &'static [&'static str],
}

impl ModelType {
    pub const fn new(name: &'static str, fields: &'static [&'static str]) -> Self {
        ModelType { name, fields }
    }

    /// Slot index of `field`, if this type declares it.
    pub fn slot(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| *f == field)
    }

    fn unknown(&self, field: &str) -> ErrorKind {
        ErrorKind::UnknownModelField {
            model: self.name,
            field: field.to_string(),
        }
    }
}

/// A significant value: anything a parse can return or store in a field.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Str(String),
    Bool(bool),
    /// One slot per list index; `None` marks a default element.
    List(Vec<Option<Value>>),
    /// Significant keys of a Dict that is not bound to a model.
    Map(BTreeMap<String, Value>),
    Model(Model),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Option<Value>]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_model(&self) -> Option<&Model> {
        match self {
            Value::Model(model) => Some(model),
            _ => None,
        }
    }

    /// Converts a primitive raw value. Containers and null have no literal
    /// form and yield `None`.
    pub fn from_literal(raw: &Raw) -> Option<Value> {
        match raw {
            Raw::Bool(b) => Some(Value::Bool(*b)),
            Raw::String(s) => Some(Value::Str(s.clone())),
            Raw::Number(n) => n.as_i64().map(Value::Int),
            _ => None,
        }
    }

    /// The raw form of a primitive value; `None` for containers and models.
    pub fn to_literal(&self) -> Option<Raw> {
        match self {
            Value::Int(n) => Some(Raw::from(*n)),
            Value::Str(s) => Some(Raw::String(s.clone())),
            Value::Bool(b) => Some(Raw::Bool(*b)),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Model> for Value {
    fn from(model: Model) -> Self {
        Value::Model(model)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match item {
                        Some(v) => write!(f, "{}", v)?,
                        None => write!(f, "_")?,
                    }
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Model(model) => write!(f, "{}", model),
        }
    }
}

/// An instance of a [`ModelType`]. Unset fields stand for schema defaults.
///
/// Equality is purely structural; see [`crate::diff`] for locating where two
/// models diverge.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    ty: &'static ModelType,
    slots: Vec<Option<Value>>,
}

impl Model {
    pub fn new(ty: &'static ModelType) -> Self {
        Model {
            ty,
            slots: vec![None; ty.fields.len()],
        }
    }

    pub fn model_type(&self) -> &'static ModelType {
        self.ty
    }

    pub fn is(&self, ty: &ModelType) -> bool {
        self.ty == ty
    }

    /// True when no field has been written.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Reads a field. Fails only when the type does not declare it.
    pub fn get(&self, field: &str) -> Result<Option<&Value>, ErrorKind> {
        let slot = self.ty.slot(field).ok_or_else(|| self.ty.unknown(field))?;
        Ok(self.slots[slot].as_ref())
    }

    /// Reads a field, treating undeclared fields as unset.
    pub fn field(&self, field: &str) -> Option<&Value> {
        self.get(field).ok().flatten()
    }

    /// Writes a field once. Used by the parse engine, where a second write
    /// means two schema nodes feed the same field.
    pub fn assign(&mut self, field: &str, value: Value) -> Result<(), ErrorKind> {
        let slot = self.ty.slot(field).ok_or_else(|| self.ty.unknown(field))?;
        if self.slots[slot].is_some() {
            return Err(ErrorKind::MultiplyAssignedField {
                model: self.ty.name,
                field: field.to_string(),
            });
        }
        self.slots[slot] = Some(value);
        Ok(())
    }

    /// Overwrites or clears a field. Used by domain code editing a model.
    pub fn set(&mut self, field: &str, value: Option<Value>) -> Result<(), ErrorKind> {
        let slot = self.ty.slot(field).ok_or_else(|| self.ty.unknown(field))?;
        self.slots[slot] = value;
        Ok(())
    }

    /// Builder form of [`Model::set`].
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Result<Self, ErrorKind> {
        self.set(field, Some(value.into()))?;
        Ok(self)
    }

    pub fn take(&mut self, field: &str) -> Option<Value> {
        let slot = self.ty.slot(field)?;
        self.slots[slot].take()
    }

    /// Declared fields in registry order, with their current values.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, Option<&Value>)> + '_ {
        self.ty
            .fields
            .iter()
            .copied()
            .zip(self.slots.iter().map(Option::as_ref))
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.ty.name)?;
        let mut first = true;
        for (name, value) in self.fields() {
            if let Some(value) = value {
                if !first {
                    write!(f, ",")?;
                }
                write!(f, " {}: {}", name, value)?;
                first = false;
            }
        }
        write!(f, " }}")
    }
}
