//! Speaker metadata and the directory the scheduler resolves it from.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{DialogueError, DialogueResult};

/// Default minimum time between chatter cues, in seconds.
pub const DEFAULT_CHATTER_INTERVAL: f32 = 0.05;

/// Compares speaker or sprite ids without regard to case, folding non-ASCII
/// letters as well (`Émile` matches `émile`).
pub fn ids_match(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// RGB colour, written as `"#RRGGBB"` in data files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn from_hex(input: &str) -> Option<Self> {
        let hex = input.trim().strip_prefix('#').unwrap_or(input.trim());
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        Some(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl TryFrom<String> for Rgb {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Rgb::from_hex(&value).ok_or_else(|| format!("invalid colour '{value}', expected #RRGGBB"))
    }
}

impl JsonSchema for Rgb {
    fn schema_name() -> String {
        "Rgb".to_string()
    }

    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        String::json_schema(gen)
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

/// Opaque reference to a portrait image owned by the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct PortraitHandle(pub String);

impl PortraitHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PortraitHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An alternate portrait selected with `[SPEAKERSPRITE=...]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SpriteEntry {
    pub sprite_id: String,
    #[serde(default)]
    pub sprite: Option<PortraitHandle>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AdvancedSpeakerOptions {
    pub extra_sprites: Vec<SpriteEntry>,
    pub use_custom_colors: bool,
    pub name_color: Rgb,
    pub text_color: Rgb,
    /// Sound handles the presentation layer may pick from while this speaker talks.
    pub chatter_clips: Vec<String>,
    /// Minimum seconds between chatter cues; `<= 0` means the playback default.
    pub chatter_interval: f32,
}

impl Default for AdvancedSpeakerOptions {
    fn default() -> Self {
        Self {
            extra_sprites: Vec::new(),
            use_custom_colors: false,
            name_color: Rgb::BLACK,
            text_color: Rgb::WHITE,
            chatter_clips: Vec::new(),
            chatter_interval: DEFAULT_CHATTER_INTERVAL,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SpeakerInfo {
    /// Id used in `[NAME=...]` tags.
    pub id: String,
    /// Name shown in the UI; the id is used when blank.
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub default_sprite: Option<PortraitHandle>,
    #[serde(default)]
    pub advanced: AdvancedSpeakerOptions,
}

impl SpeakerInfo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            default_sprite: None,
            advanced: AdvancedSpeakerOptions::default(),
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_default_sprite(mut self, sprite: impl Into<String>) -> Self {
        self.default_sprite = Some(PortraitHandle::new(sprite));
        self
    }

    pub fn with_sprite(mut self, sprite_id: impl Into<String>, sprite: impl Into<String>) -> Self {
        self.advanced.extra_sprites.push(SpriteEntry {
            sprite_id: sprite_id.into(),
            sprite: Some(PortraitHandle::new(sprite)),
        });
        self
    }

    pub fn with_colors(mut self, name_color: Rgb, text_color: Rgb) -> Self {
        self.advanced.use_custom_colors = true;
        self.advanced.name_color = name_color;
        self.advanced.text_color = text_color;
        self
    }

    pub fn with_chatter<I, S>(mut self, clips: I, interval: f32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.advanced.chatter_clips = clips.into_iter().map(Into::into).collect();
        self.advanced.chatter_interval = interval;
        self
    }

    /// The display name, falling back to the id when none is set.
    pub fn resolved_name(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.id,
        }
    }

    /// Resolves the portrait for an optional sprite id.
    ///
    /// A missing or blank sprite id selects the default sprite, and so does an
    /// id that matches none of the extra sprites (with a warning).
    pub fn portrait(&self, sprite_id: Option<&str>) -> Option<&PortraitHandle> {
        let sprite_id = match sprite_id {
            Some(id) if !id.trim().is_empty() => id,
            _ => return self.default_sprite.as_ref(),
        };

        if let Some(entry) = self
            .advanced
            .extra_sprites
            .iter()
            .find(|entry| ids_match(&entry.sprite_id, sprite_id))
        {
            return entry.sprite.as_ref();
        }

        warn!(
            speaker = %self.id,
            sprite = sprite_id,
            "speaker has no sprite with this id, using default sprite"
        );
        self.default_sprite.as_ref()
    }
}

/// Lookup of speaker metadata by id.
///
/// Implementations compare ids case-insensitively and report misses through
/// logging rather than errors.
pub trait SpeakerDirectory {
    fn speaker(&self, id: &str) -> Option<&SpeakerInfo>;

    /// Resolves the portrait for a line, see [`SpeakerInfo::portrait`].
    fn portrait(&self, speaker_id: &str, sprite_id: Option<&str>) -> Option<PortraitHandle> {
        self.speaker(speaker_id)?.portrait(sprite_id).cloned()
    }
}

impl<T: SpeakerDirectory + ?Sized> SpeakerDirectory for &T {
    fn speaker(&self, id: &str) -> Option<&SpeakerInfo> {
        (**self).speaker(id)
    }
}

impl<T: SpeakerDirectory + ?Sized> SpeakerDirectory for Arc<T> {
    fn speaker(&self, id: &str) -> Option<&SpeakerInfo> {
        (**self).speaker(id)
    }
}

/// Data-driven speaker directory, loadable from TOML or JSON.
///
/// ```toml
/// [[speakers]]
/// id = "Amy"
/// display_name = "Amy the Brave"
/// default_sprite = "amy/neutral.png"
///
/// [[speakers.advanced.extra_sprites]]
/// sprite_id = "happy"
/// sprite = "amy/happy.png"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SpeakerLibrary {
    #[serde(default)]
    speakers: Vec<SpeakerInfo>,
}

impl SpeakerLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a library, rejecting ids that collide case-insensitively.
    pub fn from_speakers(speakers: Vec<SpeakerInfo>) -> DialogueResult<Self> {
        let library = Self { speakers };
        library.ensure_unique_ids()?;
        Ok(library)
    }

    pub fn from_json(input: &str) -> DialogueResult<Self> {
        let library: Self =
            serde_json::from_str(input).map_err(|err| DialogueError::json(input, &err))?;
        library.ensure_unique_ids()?;
        Ok(library)
    }

    pub fn from_toml_str(input: &str) -> DialogueResult<Self> {
        let library: Self = toml::from_str(input)?;
        library.ensure_unique_ids()?;
        Ok(library)
    }

    /// Loads a library file; `.json` files are read as JSON, anything else as TOML.
    pub fn load(path: &Path) -> DialogueResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|err| DialogueError::io(path, err))?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    pub fn to_json(&self) -> DialogueResult<String> {
        serde_json::to_string_pretty(self).map_err(|err| DialogueError::json("", &err))
    }

    /// Adds a speaker, replacing any existing one with the same id.
    pub fn insert(&mut self, speaker: SpeakerInfo) {
        match self
            .speakers
            .iter_mut()
            .find(|existing| ids_match(&existing.id, &speaker.id))
        {
            Some(existing) => *existing = speaker,
            None => self.speakers.push(speaker),
        }
    }

    pub fn speakers(&self) -> &[SpeakerInfo] {
        &self.speakers
    }

    pub fn len(&self) -> usize {
        self.speakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.speakers.is_empty()
    }

    fn ensure_unique_ids(&self) -> DialogueResult<()> {
        for (idx, speaker) in self.speakers.iter().enumerate() {
            if self.speakers[..idx]
                .iter()
                .any(|earlier| ids_match(&earlier.id, &speaker.id))
            {
                return Err(DialogueError::DuplicateSpeaker(speaker.id.clone()));
            }
        }
        Ok(())
    }
}

impl SpeakerDirectory for SpeakerLibrary {
    fn speaker(&self, id: &str) -> Option<&SpeakerInfo> {
        if id.trim().is_empty() {
            return None;
        }
        let found = self
            .speakers
            .iter()
            .find(|speaker| ids_match(&speaker.id, id));
        if found.is_none() {
            warn!(
                speaker = id,
                "no speaker found with this id, check the speaker library or the [NAME=...] tag"
            );
        }
        found
    }
}

/// JSON Schema for speaker library files.
pub fn speaker_library_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(SpeakerLibrary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> SpeakerLibrary {
        SpeakerLibrary::from_speakers(vec![
            SpeakerInfo::new("Amy")
                .with_display_name("Amy the Brave")
                .with_default_sprite("amy/neutral")
                .with_sprite("happy", "amy/happy"),
            SpeakerInfo::new("Bob").with_display_name("  "),
        ])
        .expect("unique ids")
    }

    #[test]
    fn lookup_ignores_case() {
        let library = library();
        assert_eq!(library.speaker("amy").map(|s| s.id.as_str()), Some("Amy"));
        assert!(library.speaker("Carol").is_none());
        assert!(library.speaker("   ").is_none());
    }

    #[test]
    fn portrait_falls_back_to_default() {
        let library = library();
        assert_eq!(
            library.portrait("Amy", Some("HAPPY")),
            Some(PortraitHandle::new("amy/happy"))
        );
        assert_eq!(
            library.portrait("Amy", None),
            Some(PortraitHandle::new("amy/neutral"))
        );
        assert_eq!(
            library.portrait("Amy", Some("furious")),
            Some(PortraitHandle::new("amy/neutral"))
        );
        assert_eq!(library.portrait("Bob", Some("happy")), None);
        assert_eq!(library.portrait("Nobody", None), None);
    }

    #[test]
    fn blank_display_name_uses_id() {
        let library = library();
        assert_eq!(library.speaker("Amy").unwrap().resolved_name(), "Amy the Brave");
        assert_eq!(library.speaker("Bob").unwrap().resolved_name(), "Bob");
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = SpeakerLibrary::from_speakers(vec![SpeakerInfo::new("Amy"), SpeakerInfo::new("AMY")])
            .expect_err("duplicate must fail");
        assert!(matches!(err, DialogueError::DuplicateSpeaker(id) if id == "AMY"));
    }

    #[test]
    fn insert_replaces_existing_speaker() {
        let mut library = library();
        library.insert(SpeakerInfo::new("bob").with_display_name("Robert"));
        assert_eq!(library.len(), 2);
        assert_eq!(library.speaker("Bob").unwrap().resolved_name(), "Robert");
    }

    #[test]
    fn rgb_hex_round_trip() {
        let colour = Rgb::from_hex("#1a2B3c").expect("valid hex");
        assert_eq!(colour, Rgb::new(0x1a, 0x2b, 0x3c));
        assert_eq!(colour.to_string(), "#1A2B3C");
        assert!(Rgb::from_hex("#12345").is_none());
        assert!(Rgb::from_hex("zzzzzz").is_none());
    }

    #[test]
    fn library_loads_from_toml() {
        let toml = r##"
            [[speakers]]
            id = "Amy"
            default_sprite = "amy/neutral"

            [speakers.advanced]
            use_custom_colors = true
            name_color = "#FF0000"
            chatter_clips = ["blip1", "blip2"]

            [[speakers.advanced.extra_sprites]]
            sprite_id = "happy"
            sprite = "amy/happy"
        "##;
        let library = SpeakerLibrary::from_toml_str(toml).expect("valid toml");
        let amy = library.speaker("Amy").expect("amy");
        assert!(amy.advanced.use_custom_colors);
        assert_eq!(amy.advanced.name_color, Rgb::new(255, 0, 0));
        assert_eq!(amy.advanced.text_color, Rgb::WHITE);
        assert_eq!(amy.advanced.chatter_clips.len(), 2);
        assert_eq!(amy.advanced.chatter_interval, DEFAULT_CHATTER_INTERVAL);
        assert_eq!(amy.portrait(Some("happy")), Some(&PortraitHandle::new("amy/happy")));
    }

    #[test]
    fn non_ascii_ids_match_without_case() {
        assert!(ids_match("Émile", "émile"));
        assert!(ids_match("ÉCLAT", "éclat"));
        assert!(!ids_match("Émile", "Emile"));

        let library = SpeakerLibrary::from_speakers(vec![SpeakerInfo::new("Émile")
            .with_default_sprite("e/default")
            .with_sprite("Éclat", "e/eclat")])
        .expect("unique ids");
        assert_eq!(library.speaker("émile").map(|s| s.id.as_str()), Some("Émile"));
        assert_eq!(
            library.portrait("Émile", Some("éclat")),
            Some(PortraitHandle::new("e/eclat"))
        );

        let err = SpeakerLibrary::from_speakers(vec![SpeakerInfo::new("Émile"), SpeakerInfo::new("ÉMILE")])
            .expect_err("folded duplicate");
        assert!(matches!(err, DialogueError::DuplicateSpeaker(_)));
    }

    #[test]
    fn json_errors_carry_a_span() {
        let err = SpeakerLibrary::from_json("{\"speakers\": [ { \"id\": 3 } ]}")
            .expect_err("id must be a string");
        assert!(matches!(err, DialogueError::SpeakerLibraryParse { .. }));
    }
}
