//! Playback tuning shared by every session a scheduler runs.

use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{DialogueError, DialogueResult};
use crate::speaker::{Rgb, DEFAULT_CHATTER_INTERVAL};

/// Timing and default presentation settings for dialogue playback.
///
/// Every field has a default, so a TOML file only needs the values it changes:
///
/// ```toml
/// characters_per_second = 60.0
/// min_time_before_skip = 0.1
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Type text out character by character; when false lines appear at once.
    pub type_out_text: bool,
    /// Reveal rate while typing. `<= 0` reveals lines instantly.
    pub characters_per_second: f32,
    /// Seconds from the start of a line before advance or skip input is accepted.
    pub min_time_before_skip: f32,
    /// Chatter interval for speakers that do not set their own.
    pub default_chatter_interval: f32,
    /// Name colour for speakers without custom colours.
    pub name_color: Rgb,
    /// Text colour for speakers without custom colours.
    pub text_color: Rgb,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            type_out_text: true,
            characters_per_second: 40.0,
            min_time_before_skip: 0.25,
            default_chatter_interval: DEFAULT_CHATTER_INTERVAL,
            name_color: Rgb::BLACK,
            text_color: Rgb::WHITE,
        }
    }
}

impl PlaybackConfig {
    pub fn from_toml_str(input: &str) -> DialogueResult<Self> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> DialogueResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|err| DialogueError::io(path, err))?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> DialogueResult<()> {
        if !self.characters_per_second.is_finite() {
            return Err(DialogueError::InvalidConfig(
                "characters_per_second must be finite".to_string(),
            ));
        }
        if !self.min_time_before_skip.is_finite() || self.min_time_before_skip < 0.0 {
            return Err(DialogueError::InvalidConfig(format!(
                "min_time_before_skip must be a non-negative number, got {}",
                self.min_time_before_skip
            )));
        }
        if !self.default_chatter_interval.is_finite() || self.default_chatter_interval < 0.0 {
            return Err(DialogueError::InvalidConfig(format!(
                "default_chatter_interval must be a non-negative number, got {}",
                self.default_chatter_interval
            )));
        }
        Ok(())
    }

    /// True when lines should be shown in full as soon as they start.
    pub fn reveals_instantly(&self) -> bool {
        !self.type_out_text || self.characters_per_second <= 0.0
    }
}

/// JSON Schema for playback config files.
pub fn playback_config_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(PlaybackConfig)
}
