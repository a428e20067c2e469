//! Conversion between the backup and simple formats.

use tracing::{debug, info};

use stompconf_schema::{diff, diff_raw, DivergencePath, Grammar, Raw, Value};

use crate::error::DeviceError;
use crate::profile::DeviceProfile;
use crate::schema::{device_schema, Format};

/// Complete-mode grammar reading and writing the device's own export.
pub fn backup_grammar(profile: &DeviceProfile) -> Result<Grammar, DeviceError> {
    profile.validate()?;
    Ok(Grammar::new(device_schema(profile, Format::Backup)?, Format::Backup.mode())?)
}

/// Minimal-mode grammar for hand-edited files.
pub fn simple_grammar(profile: &DeviceProfile) -> Result<Grammar, DeviceError> {
    profile.validate()?;
    Ok(Grammar::new(device_schema(profile, Format::Simple)?, Format::Simple.mode())?)
}

/// Outcome of a round-trip check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundTrip {
    Exact,
    /// The regenerated document first differs from the input here.
    Diverged(DivergencePath),
}

/// Both grammars of one profile.
#[derive(Debug, Clone)]
pub struct Converter {
    profile: DeviceProfile,
    backup: Grammar,
    simple: Grammar,
}

impl Converter {
    pub fn new(profile: DeviceProfile) -> Result<Self, DeviceError> {
        let backup = backup_grammar(&profile)?;
        let simple = simple_grammar(&profile)?;
        debug!(profile = %profile.name, "converter ready");
        Ok(Converter {
            profile,
            backup,
            simple,
        })
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    pub fn grammar(&self, format: Format) -> &Grammar {
        match format {
            Format::Backup => &self.backup,
            Format::Simple => &self.simple,
        }
    }

    /// Parses `raw` as a `format` document. `None` means factory state.
    pub fn parse(&self, raw: &Raw, format: Format) -> Result<Option<Value>, DeviceError> {
        self.check_device_model(raw)?;
        Ok(self.grammar(format).parse_config(raw)?)
    }

    pub fn generate(&self, model: Option<&Value>, format: Format) -> Result<Raw, DeviceError> {
        Ok(self.grammar(format).gen_config(model)?)
    }

    pub fn to_simple(&self, backup: &Raw) -> Result<Raw, DeviceError> {
        info!(profile = %self.profile.name, "converting backup to simple");
        let model = self.parse(backup, Format::Backup)?;
        self.generate(model.as_ref(), Format::Simple)
    }

    pub fn to_backup(&self, simple: &Raw) -> Result<Raw, DeviceError> {
        info!(profile = %self.profile.name, "converting simple to backup");
        let model = self.parse(simple, Format::Simple)?;
        self.generate(model.as_ref(), Format::Backup)
    }

    /// Verifies that `raw` survives a parse/generate cycle.
    ///
    /// A backup must regenerate byte for byte, key order included. A simple
    /// document is checked at the model level: whatever it spells out, the
    /// regenerated file must parse to the same configuration.
    pub fn check(&self, raw: &Raw, format: Format) -> Result<RoundTrip, DeviceError> {
        let model = self.parse(raw, format)?;
        let regenerated = self.generate(model.as_ref(), format)?;
        let divergence = match format {
            Format::Backup => diff_raw(raw, &regenerated),
            Format::Simple => {
                let reparsed = self.parse(&regenerated, format)?;
                diff(model.as_ref(), reparsed.as_ref())
            }
        };
        debug!(%format, exact = divergence.is_none(), "round trip checked");
        Ok(divergence.map_or(RoundTrip::Exact, RoundTrip::Diverged))
    }

    // Reported up front: the engine would only see a fixed-value mismatch.
    fn check_device_model(&self, raw: &Raw) -> Result<(), DeviceError> {
        match raw.get("device_model").and_then(Raw::as_str) {
            Some(found) if found != self.profile.name => Err(DeviceError::ProfileMismatch {
                expected: self.profile.name.clone(),
                found: found.to_string(),
            }),
            _ => Ok(()),
        }
    }
}
