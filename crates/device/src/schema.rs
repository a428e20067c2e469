//! The foot-controller configuration schema.
//!
//! One tree describes both file formats. The backup format is what the
//! device exports: every bank, preset, and message slot spelled out. The
//! simple format is the same tree read in minimal mode, plus a cleanup that
//! drops message slots holding nothing but a stray action.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;

use stompconf_schema::{
    Atom, Case, Dict, Enum, Key, List, Mode, ModelType, Primitive, SchemaError, SwitchDict, Target,
    Value,
};

use crate::profile::DeviceProfile;

pub const SCHEMA_VERSION: i64 = 1;
pub const DEFAULT_CHANNEL: i64 = 1;
pub const DEFAULT_PROGRAM: i64 = 0;
pub const DEFAULT_CONTROLLER: i64 = 0;
pub const DEFAULT_CC_VALUE: i64 = 127;
/// Sustain pedal; its messages default to value 0 (pedal up).
pub const SUSTAIN_CONTROLLER: i64 = 64;

pub const MESSAGE_KINDS: &[&str] = &["empty", "pc", "cc"];
pub const ACTIONS: &[&str] = &["press", "release", "long_press"];
pub const DEFAULT_ACTION: &str = "press";

// ── Model types ──────────────────────────────────────────────────────

pub static DEVICE: ModelType = ModelType::new("Device", &["banks"]);
pub static BANK: ModelType = ModelType::new("Bank", &["name", "presets"]);
pub static PRESET: ModelType = ModelType::new("Preset", &["name", "toggle", "messages"]);
pub static MESSAGE: ModelType = ModelType::new("Message", &["kind", "action", "data"]);
pub static PROGRAM_CHANGE: ModelType = ModelType::new("ProgramChange", &["channel", "program"]);
pub static CONTROL_CHANGE: ModelType =
    ModelType::new("ControlChange", &["channel", "controller", "value"]);

/// Which of the two file formats a document is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// The device's exhaustive export.
    Backup,
    /// Hand-editable: only what differs from factory state.
    Simple,
}

impl Format {
    pub fn mode(self) -> Mode {
        match self {
            Format::Backup => Mode::Complete,
            Format::Simple => Mode::Minimal,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Backup => write!(f, "backup"),
            Format::Simple => write!(f, "simple"),
        }
    }
}

/// Factory name of the bank at `index`: "Bank 1", "Bank 2", ...
pub fn bank_name_default(index: usize) -> String {
    format!("Bank {}", index + 1)
}

/// Factory name of the preset at `index`: "Preset A" through "Preset Z",
/// then "Preset AA" and onwards.
pub fn preset_name_default(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.reverse();
    format!("Preset {}", letters.into_iter().collect::<String>())
}

/// Factory value of a control change on `controller`.
pub fn cc_value_default(controller: i64) -> i64 {
    if controller == SUSTAIN_CONTROLLER {
        0
    } else {
        DEFAULT_CC_VALUE
    }
}

/// Root of the configuration tree for `profile` in `format`.
pub fn device_schema(profile: &DeviceProfile, format: Format) -> Result<Dict, SchemaError> {
    let banks = List::new("banks", profile.banks, bank_schema(profile, format)?).var("banks");
    Ok(Dict::new(
        "device",
        vec![
            Key::new("schema_version", Atom::fixed_int(SCHEMA_VERSION)),
            Key::required("device_model", Atom::fixed_string(&profile.name)),
            Key::new("banks", banks),
        ],
    )?
    .model(&DEVICE))
}

fn bank_schema(profile: &DeviceProfile, format: Format) -> Result<Dict, SchemaError> {
    let name = Atom::with_default(
        Primitive::Str,
        Target::computed(|p| json!(bank_name_default(p.index()))),
    )?
    .var("name");
    let presets = List::new("presets", profile.presets, preset_schema(profile, format)?).var("presets");
    Ok(Dict::new("bank", vec![Key::new("name", name), Key::new("presets", presets)])?.model(&BANK))
}

fn preset_schema(profile: &DeviceProfile, format: Format) -> Result<Dict, SchemaError> {
    let name = Atom::with_default(
        Primitive::Str,
        Target::computed(|p| json!(preset_name_default(p.index()))),
    )?
    .var("name");
    let messages = List::new("messages", profile.messages, message_schema(format)?).var("messages");
    Ok(Dict::new(
        "preset",
        vec![
            Key::new("name", name),
            Key::new("toggle", Atom::boolean(false).var("toggle")),
            Key::new("messages", messages),
        ],
    )?
    .model(&PRESET))
}

fn message_schema(format: Format) -> Result<SwitchDict, SchemaError> {
    let kind = Enum::new("type", MESSAGE_KINDS, Some("empty"))?.var("kind");
    let action = Enum::new("action", ACTIONS, Some(DEFAULT_ACTION))?.var("action");

    let value = Atom::with_default(
        Primitive::Int,
        Target::computed(|p| json!(cc_value_default(p.sibling_int("controller", DEFAULT_CONTROLLER)))),
    )?
    .var("value");
    let cases = vec![
        Case::new("empty", vec![]),
        Case::with_model(
            "pc",
            &PROGRAM_CHANGE,
            vec![
                Key::new("channel", Atom::int(DEFAULT_CHANNEL).var("channel")),
                Key::new("program", Atom::int(DEFAULT_PROGRAM).var("program")),
            ],
        ),
        Case::with_model(
            "cc",
            &CONTROL_CHANGE,
            vec![
                Key::new("channel", Atom::int(DEFAULT_CHANNEL).var("channel")),
                Key::new("controller", Atom::int(DEFAULT_CONTROLLER).var("controller")),
                Key::new("value", value),
            ],
        ),
    ];

    let message = SwitchDict::new(
        "message",
        "type",
        kind,
        cases,
        vec![Key::new("action", action)],
        Some("data"),
    )?
    .model(&MESSAGE);

    Ok(match format {
        Format::Backup => message,
        Format::Simple => message.cleanup(drop_empty_message),
    })
}

// An empty slot does nothing when triggered, so its action is noise.
fn drop_empty_message(result: Option<Value>) -> Option<Value> {
    match result {
        Some(Value::Model(message)) if message.field("kind").is_none() => None,
        other => other,
    }
}
