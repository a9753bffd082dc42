//! Slicer settings: defaults, validation, TOML files and flat overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SlicerError};

/// Keys accepted by [`SlicerSettings::set`].
pub const SETTING_KEYS: [&str; 6] = [
    "tolerance",
    "layer_height",
    "scale",
    "plate_width",
    "plate_length",
    "center_on_plate",
];

/// Slicing parameters. All lengths are in model units (mm).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlicerSettings {
    /// Vertex merge radius.
    pub tolerance: f64,
    /// Distance between slicing planes.
    pub layer_height: f64,
    /// Uniform scale applied to the imported model.
    pub scale: f64,
    /// Build plate size along X.
    pub plate_width: f64,
    /// Build plate size along Y.
    pub plate_length: f64,
    /// Move the model to the plate center and onto z = 0.
    pub center_on_plate: bool,
}

impl Default for SlicerSettings {
    fn default() -> Self {
        Self {
            tolerance: 0.02,
            layer_height: 0.30,
            scale: 1.0,
            plate_width: 200.0,
            plate_length: 200.0,
            center_on_plate: true,
        }
    }
}

impl SlicerSettings {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if !(self.layer_height > 0.0 && self.layer_height.is_finite()) {
            return Err(SlicerError::InvalidSettings(
                "layer_height must be positive".into(),
            ));
        }
        if !(self.tolerance > 0.0 && self.tolerance.is_finite()) {
            return Err(SlicerError::InvalidSettings(
                "tolerance must be positive".into(),
            ));
        }
        if !(self.scale > 0.0 && self.scale.is_finite()) {
            return Err(SlicerError::InvalidSettings("scale must be positive".into()));
        }
        if self.plate_width < 0.0 || self.plate_length < 0.0 {
            return Err(SlicerError::InvalidSettings(
                "plate dimensions must not be negative".into(),
            ));
        }
        Ok(())
    }

    /// Parse settings from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Self = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    /// Write the settings to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Override one setting from its textual value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "tolerance" => self.tolerance = parse_f64(key, value)?,
            "layer_height" => self.layer_height = parse_f64(key, value)?,
            "scale" => self.scale = parse_f64(key, value)?,
            "plate_width" => self.plate_width = parse_f64(key, value)?,
            "plate_length" => self.plate_length = parse_f64(key, value)?,
            "center_on_plate" => self.center_on_plate = parse_bool(value),
            _ => return Err(SlicerError::UnknownSetting(key.to_string())),
        }
        Ok(())
    }

    /// Apply `key=value` overrides in order.
    pub fn apply_overrides<'a>(
        &mut self,
        overrides: impl IntoIterator<Item = &'a str>,
    ) -> Result<()> {
        for item in overrides {
            let (key, value) = item.split_once('=').ok_or_else(|| {
                SlicerError::InvalidSettings(format!("expected key=value, got {item:?}"))
            })?;
            self.set(key.trim(), value.trim())?;
        }
        Ok(())
    }
}

fn parse_f64(key: &str, value: &str) -> Result<f64> {
    value
        .trim()
        .parse()
        .map_err(|_| SlicerError::InvalidSettings(format!("{key}: not a number: {value:?}")))
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_uppercase().as_str(),
        "TRUE" | "1" | "T" | "Y" | "YES"
    )
}
