use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Speaker id assigned to lines that carry no `[NAME=...]` tag.
pub const UNKNOWN_SPEAKER: &str = "UnknownSpeaker";

/// A single parsed line of dialogue.
///
/// Lines are immutable once parsed: the text is already stripped of tag
/// markup and is never empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct DialogueLine {
    pub speaker_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sprite_id: Option<String>,
    pub text: String,
    /// Tags with keys other than `NAME`/`SPEAKERSPRITE`, keyed in upper case.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_tags: BTreeMap<String, String>,
}

impl DialogueLine {
    pub fn new(speaker_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker_id: speaker_id.into(),
            sprite_id: None,
            text: text.into(),
            extra_tags: BTreeMap::new(),
        }
    }

    pub fn with_sprite(mut self, sprite_id: impl Into<String>) -> Self {
        self.sprite_id = Some(sprite_id.into());
        self
    }

    /// Number of display characters in the text.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// The first `count` display characters of the text.
    pub fn visible_prefix(&self, count: usize) -> &str {
        match self.text.char_indices().nth(count) {
            Some((byte, _)) => &self.text[..byte],
            None => &self.text,
        }
    }

    pub fn has_unknown_speaker(&self) -> bool {
        self.speaker_id == UNKNOWN_SPEAKER
    }
}
