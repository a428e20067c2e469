//! stompconf-schema: bidirectional schema engine for device configurations.
//!
//! A schema is a tree of [`Node`]s describing a serialized configuration:
//! its keys, list lengths, enumerated tokens, and the default of every leaf.
//! A [`Grammar`] pairs the tree with a [`Mode`] and converts in both
//! directions:
//!
//! - [`Grammar::parse_config`] turns a raw tree into the values that differ
//!   from the schema, collected into typed [`Model`]s where nodes bind them.
//! - [`Grammar::gen_config`] turns those values back into a raw tree, either
//!   exhaustive ([`Mode::Complete`]) or default-free ([`Mode::Minimal`]).
//!
//! Parsing with one grammar and generating with another converts between
//! the device's export format and a hand-editable one. Anything the schema
//! does not model is an error rather than silently dropped.

pub mod diff;
pub mod error;
pub mod grammar;
pub mod list;
pub mod model;
pub mod node;

mod generate;
mod parse;

// ── Convenience re-exports ───────────────────────────────────────────

pub use diff::{diff, diff_raw, DivergencePath};
pub use error::{EngineError, ErrorKind, Path, SchemaError, Segment};
pub use grammar::{Grammar, Mode};
pub use list::{compact, prune};
pub use model::{Model, ModelType, Value};
pub use node::{
    Atom, Case, Cleanup, Constraint, Dict, Enum, Key, List, Node, Primitive, Probe, Raw,
    SwitchDict, Target, UNBOUNDED,
};
