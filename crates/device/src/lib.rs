//! stompconf-device: configuration schema for MIDI foot controllers.
//!
//! Describes a controller's banks, presets, and per-switch messages as a
//! [`stompconf_schema`] tree and converts between the two file formats:
//!
//! - [`Format::Backup`] -- the device's exhaustive export
//! - [`Format::Simple`] -- only what differs from factory state
//!
//! [`Converter`] holds both grammars for one [`DeviceProfile`]. The
//! [`view`] module reads parsed models with factory values filled in.

pub mod convert;
pub mod error;
pub mod profile;
pub mod schema;
pub mod view;

// ── Convenience re-exports ───────────────────────────────────────────

pub use convert::{backup_grammar, simple_grammar, Converter, RoundTrip};
pub use error::DeviceError;
pub use profile::{DeviceProfile, BUILTIN_PROFILES};
pub use schema::{device_schema, Format};
pub use view::{Bank, Device, Message, MessageKind, Preset};
