//! Device profiles: the dimensions of one controller model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::DeviceError;

/// Bank, preset, and message counts of one device model. The name is also
/// the `device_model` value the device writes into its exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceProfile {
    /// Filled from the table key when loaded from a configuration file.
    #[serde(default)]
    pub name: String,
    pub banks: usize,
    pub presets: usize,
    pub messages: usize,
}

/// Names accepted by [`DeviceProfile::builtin`].
pub const BUILTIN_PROFILES: &[&str] = &["mini", "standard"];

impl DeviceProfile {
    pub fn new(name: &str, banks: usize, presets: usize, messages: usize) -> Self {
        DeviceProfile {
            name: name.to_string(),
            banks,
            presets,
            messages,
        }
    }

    /// Four-switch unit: 4 banks × 4 presets × 4 messages.
    pub fn mini() -> Self {
        Self::new("mini", 4, 4, 4)
    }

    pub fn standard() -> Self {
        Self::new("standard", 16, 8, 8)
    }

    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "mini" => Some(Self::mini()),
            "standard" => Some(Self::standard()),
            _ => None,
        }
    }

    /// Looks `name` up among `custom` profiles first, then the built-ins.
    pub fn resolve(name: &str, custom: &BTreeMap<String, DeviceProfile>) -> Result<Self, DeviceError> {
        let profile = match custom.get(name) {
            Some(profile) => DeviceProfile {
                name: name.to_string(),
                ..profile.clone()
            },
            None => Self::builtin(name).ok_or_else(|| DeviceError::UnknownProfile(name.to_string()))?,
        };
        profile.validate()?;
        Ok(profile)
    }

    /// Every dimension must be at least one: a device export always lists
    /// its slots explicitly.
    pub fn validate(&self) -> Result<(), DeviceError> {
        let invalid = |reason: &str| DeviceError::InvalidProfile {
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.name.is_empty() {
            return Err(invalid("name is empty"));
        }
        for (dimension, count) in [
            ("banks", self.banks),
            ("presets", self.presets),
            ("messages", self.messages),
        ] {
            if count == 0 {
                return Err(invalid(&format!("{} must be at least 1", dimension)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_resolve_by_name() {
        let none = BTreeMap::new();
        assert_eq!(DeviceProfile::resolve("mini", &none).unwrap(), DeviceProfile::mini());
        assert_eq!(DeviceProfile::resolve("standard", &none).unwrap().banks, 16);
        for name in BUILTIN_PROFILES {
            assert!(DeviceProfile::builtin(name).is_some());
        }
    }

    #[test]
    fn custom_profile_takes_its_key_as_name() {
        let mut custom = BTreeMap::new();
        custom.insert("duo".to_string(), DeviceProfile::new("", 2, 2, 1));
        let profile = DeviceProfile::resolve("duo", &custom).unwrap();
        assert_eq!(profile, DeviceProfile::new("duo", 2, 2, 1));
    }

    #[test]
    fn custom_profile_shadows_builtin() {
        let mut custom = BTreeMap::new();
        custom.insert("mini".to_string(), DeviceProfile::new("", 1, 1, 1));
        assert_eq!(DeviceProfile::resolve("mini", &custom).unwrap().banks, 1);
    }

    #[test]
    fn unknown_and_empty_profiles_are_rejected() {
        let none = BTreeMap::new();
        assert!(matches!(
            DeviceProfile::resolve("mega", &none),
            Err(DeviceError::UnknownProfile(name)) if name == "mega"
        ));
        let err = DeviceProfile::new("flat", 2, 0, 2).validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "device profile 'flat' is invalid: presets must be at least 1"
        );
    }

    #[test]
    fn profile_deserializes_without_name() {
        let profile: DeviceProfile =
            serde_json::from_value(serde_json::json!({"banks": 3, "presets": 2, "messages": 1})).unwrap();
        assert_eq!(profile.name, "");
        assert_eq!(profile.messages, 1);
    }

    #[test]
    fn stray_profile_field_is_rejected() {
        let result: Result<DeviceProfile, _> = serde_json::from_value(serde_json::json!(
            {"banks": 3, "presets": 2, "messages": 1, "colour": "red"}
        ));
        assert!(result.is_err());
    }
}
