//! Typed read access over parsed device models.
//!
//! A parse keeps only what differs from factory state, so every accessor
//! here falls back to the factory value when a field is unset.

use stompconf_schema::{ErrorKind, Model, ModelType, Value};

use crate::schema::{
    bank_name_default, cc_value_default, preset_name_default, BANK, CONTROL_CHANGE, DEFAULT_ACTION,
    DEFAULT_CHANNEL, DEFAULT_CONTROLLER, DEFAULT_PROGRAM, DEVICE, MESSAGE, PRESET, PROGRAM_CHANGE,
};

fn model_of<'a>(value: Option<&'a Value>, ty: &ModelType) -> Option<&'a Model> {
    value.and_then(Value::as_model).filter(|m| m.is(ty))
}

fn slots<'a>(model: Option<&'a Model>, field: &str) -> &'a [Option<Value>] {
    model
        .and_then(|m| m.field(field))
        .and_then(Value::as_list)
        .unwrap_or_default()
}

// Slots up to the last customized one; trailing factory slots are not
// reported, whichever format was parsed.
fn stored_len(model: Option<&Model>, field: &str) -> usize {
    slots(model, field)
        .iter()
        .rposition(Option::is_some)
        .map_or(0, |i| i + 1)
}

fn slot<'a>(model: Option<&'a Model>, field: &str, index: usize) -> Option<&'a Value> {
    slots(model, field).get(index).and_then(Option::as_ref)
}

fn int_field(model: Option<&Model>, field: &str, default: i64) -> i64 {
    model
        .and_then(|m| m.field(field))
        .and_then(Value::as_int)
        .unwrap_or(default)
}

/// The whole configuration. `None` stands for factory state.
#[derive(Debug, Clone, Copy)]
pub struct Device<'a> {
    model: Option<&'a Model>,
}

impl<'a> Device<'a> {
    pub fn new(parsed: Option<&'a Value>) -> Self {
        Device {
            model: model_of(parsed, &DEVICE),
        }
    }

    pub fn is_factory(&self) -> bool {
        self.model.is_none()
    }

    pub fn bank(&self, index: usize) -> Bank<'a> {
        Bank {
            index,
            model: model_of(slot(self.model, "banks", index), &BANK),
        }
    }

    /// Banks up to the last customized one.
    pub fn banks(&self) -> impl Iterator<Item = Bank<'a>> + '_ {
        (0..stored_len(self.model, "banks")).map(move |i| self.bank(i))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Bank<'a> {
    index: usize,
    model: Option<&'a Model>,
}

impl<'a> Bank<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> String {
        self.model
            .and_then(|m| m.field("name"))
            .and_then(Value::as_str)
            .map_or_else(|| bank_name_default(self.index), str::to_string)
    }

    pub fn preset(&self, index: usize) -> Preset<'a> {
        Preset {
            index,
            model: model_of(slot(self.model, "presets", index), &PRESET),
        }
    }

    pub fn presets(&self) -> impl Iterator<Item = Preset<'a>> + '_ {
        (0..stored_len(self.model, "presets")).map(move |i| self.preset(i))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Preset<'a> {
    index: usize,
    model: Option<&'a Model>,
}

impl<'a> Preset<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> String {
        self.model
            .and_then(|m| m.field("name"))
            .and_then(Value::as_str)
            .map_or_else(|| preset_name_default(self.index), str::to_string)
    }

    pub fn toggle(&self) -> bool {
        self.model
            .and_then(|m| m.field("toggle"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn message(&self, index: usize) -> Message<'a> {
        Message {
            model: model_of(slot(self.model, "messages", index), &MESSAGE),
        }
    }

    pub fn messages(&self) -> impl Iterator<Item = Message<'a>> + '_ {
        (0..stored_len(self.model, "messages")).map(move |i| self.message(i))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Message<'a> {
    model: Option<&'a Model>,
}

impl<'a> Message<'a> {
    pub fn action(&self) -> &'a str {
        self.model
            .and_then(|m| m.field("action"))
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_ACTION)
    }

    pub fn kind(&self) -> MessageKind {
        let data = self.model.and_then(|m| m.field("data")).and_then(Value::as_model);
        let kind = self.model.and_then(|m| m.field("kind")).and_then(Value::as_str);
        match kind {
            Some("pc") => {
                let data = data.filter(|d| d.is(&PROGRAM_CHANGE));
                MessageKind::ProgramChange {
                    channel: int_field(data, "channel", DEFAULT_CHANNEL),
                    program: int_field(data, "program", DEFAULT_PROGRAM),
                }
            }
            Some("cc") => {
                let data = data.filter(|d| d.is(&CONTROL_CHANGE));
                let controller = int_field(data, "controller", DEFAULT_CONTROLLER);
                MessageKind::ControlChange {
                    channel: int_field(data, "channel", DEFAULT_CHANNEL),
                    controller,
                    value: int_field(data, "value", cc_value_default(controller)),
                }
            }
            _ => MessageKind::Empty,
        }
    }
}

/// A decoded message slot with factory values filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind {
    Empty,
    ProgramChange { channel: i64, program: i64 },
    ControlChange { channel: i64, controller: i64, value: i64 },
}

impl MessageKind {
    /// Builds the message model a parse of this slot would produce: only
    /// non-factory fields are set, and an all-factory slot yields `None`.
    pub fn to_model(&self, action: &str) -> Result<Option<Value>, ErrorKind> {
        let mut message = Model::new(&MESSAGE);
        if action != DEFAULT_ACTION {
            message.set("action", Some(Value::from(action)))?;
        }
        let data = match *self {
            MessageKind::Empty => None,
            MessageKind::ProgramChange { channel, program } => {
                message.set("kind", Some(Value::from("pc")))?;
                let mut data = Model::new(&PROGRAM_CHANGE);
                set_unless(&mut data, "channel", channel, DEFAULT_CHANNEL)?;
                set_unless(&mut data, "program", program, DEFAULT_PROGRAM)?;
                Some(data)
            }
            MessageKind::ControlChange {
                channel,
                controller,
                value,
            } => {
                message.set("kind", Some(Value::from("cc")))?;
                let mut data = Model::new(&CONTROL_CHANGE);
                set_unless(&mut data, "channel", channel, DEFAULT_CHANNEL)?;
                set_unless(&mut data, "controller", controller, DEFAULT_CONTROLLER)?;
                set_unless(&mut data, "value", value, cc_value_default(controller))?;
                Some(data)
            }
        };
        if let Some(data) = data.filter(|d| !d.is_empty()) {
            message.set("data", Some(Value::Model(data)))?;
        }
        Ok((!message.is_empty()).then_some(Value::Model(message)))
    }
}

fn set_unless(model: &mut Model, field: &str, value: i64, default: i64) -> Result<(), ErrorKind> {
    if value != default {
        model.set(field, Some(Value::Int(value)))?;
    }
    Ok(())
}
