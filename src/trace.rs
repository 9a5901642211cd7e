//! Recording presenter for headless playback and deterministic testing.
//!
//! A [`PlaybackTrace`] stores every notification the scheduler sends, in
//! order, as plain serializable data.

use serde::{Deserialize, Serialize};

use crate::presenter::{ChatterCue, DialoguePresenter, RevealProgress, SpeakerVisuals};
use crate::scheduler::{EndReason, PlaybackSession};

/// One recorded notification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEvent {
    SessionBegan,
    SessionEnded,
    SpeakerChanged(SpeakerVisuals),
    Reveal {
        line: usize,
        revealed: usize,
        total: usize,
        visible: String,
    },
    Chatter {
        char_index: usize,
        character: char,
        clip_count: usize,
        interval: f32,
    },
    AdvancePrompt {
        visible: bool,
    },
    TriggerBegan {
        trigger: String,
    },
    TriggerEnded {
        trigger: String,
        reason: EndReason,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaybackTrace {
    events: Vec<TraceEvent>,
    #[serde(skip)]
    skip_reveals: bool,
}

impl PlaybackTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// A trace that leaves out per-character reveal events.
    pub fn without_reveals() -> Self {
        Self {
            events: Vec::new(),
            skip_reveals: true,
        }
    }

    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn count(&self, predicate: impl Fn(&TraceEvent) -> bool) -> usize {
        self.events.iter().filter(|event| predicate(event)).count()
    }

    pub fn prompts_shown(&self) -> usize {
        self.count(|event| matches!(event, TraceEvent::AdvancePrompt { visible: true }))
    }

    pub fn sessions_ended(&self) -> usize {
        self.count(|event| matches!(event, TraceEvent::SessionEnded))
    }

    pub fn speakers(&self) -> Vec<&SpeakerVisuals> {
        self.events
            .iter()
            .filter_map(|event| match event {
                TraceEvent::SpeakerChanged(visuals) => Some(visuals),
                _ => None,
            })
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.events)
    }

    fn push(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}

impl DialoguePresenter for PlaybackTrace {
    fn session_began(&mut self) {
        self.push(TraceEvent::SessionBegan);
    }

    fn session_ended(&mut self, _ended: &PlaybackSession, _reason: EndReason) {
        self.push(TraceEvent::SessionEnded);
    }

    fn trigger_began(&mut self, trigger: &str) {
        self.push(TraceEvent::TriggerBegan {
            trigger: trigger.to_string(),
        });
    }

    fn trigger_ended(&mut self, trigger: &str, reason: EndReason) {
        self.push(TraceEvent::TriggerEnded {
            trigger: trigger.to_string(),
            reason,
        });
    }

    fn speaker_changed(&mut self, visuals: &SpeakerVisuals) {
        self.push(TraceEvent::SpeakerChanged(visuals.clone()));
    }

    fn reveal_progress(&mut self, progress: RevealProgress<'_>) {
        if self.skip_reveals {
            return;
        }
        self.push(TraceEvent::Reveal {
            line: progress.line_index,
            revealed: progress.revealed,
            total: progress.total,
            visible: progress.visible_text().to_string(),
        });
    }

    fn chatter(&mut self, cue: ChatterCue<'_>) {
        self.push(TraceEvent::Chatter {
            char_index: cue.char_index,
            character: cue.character,
            clip_count: cue.clips.len(),
            interval: cue.interval,
        });
    }

    fn advance_prompt(&mut self, visible: bool) {
        self.push(TraceEvent::AdvancePrompt { visible });
    }
}
