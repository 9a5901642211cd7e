//! Notifications the scheduler sends to whatever displays the dialogue.

use serde::{Deserialize, Serialize};

use crate::scheduler::{EndReason, PlaybackSession};
use crate::speaker::{PortraitHandle, Rgb};

/// Resolved look of the current speaker, sent once per line.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakerVisuals {
    pub speaker_id: String,
    pub display_name: String,
    pub name_color: Rgb,
    pub text_color: Rgb,
    pub portrait: Option<PortraitHandle>,
}

/// How much of the current line is visible.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RevealProgress<'a> {
    pub line_index: usize,
    pub revealed: usize,
    pub total: usize,
    pub text: &'a str,
}

impl<'a> RevealProgress<'a> {
    pub fn visible_text(&self) -> &'a str {
        match self.text.char_indices().nth(self.revealed) {
            Some((byte, _)) => &self.text[..byte],
            None => self.text,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.revealed >= self.total
    }
}

/// A chance to play a chatter sound for a freshly revealed character.
///
/// `clips` is empty when the speaker is unknown or has no chatter sounds; the
/// presentation layer decides what, if anything, to play.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChatterCue<'a> {
    pub char_index: usize,
    pub character: char,
    pub clips: &'a [String],
    pub interval: f32,
}

/// Receiver of scheduler notifications. Every method defaults to doing nothing.
pub trait DialoguePresenter {
    fn session_began(&mut self) {}

    /// Sent while the session is in [`Phase::Ending`](crate::Phase::Ending),
    /// just before it is released.
    fn session_ended(&mut self, _ended: &PlaybackSession, _reason: EndReason) {}

    /// Follows [`session_began`](Self::session_began) when a trigger started
    /// the session.
    fn trigger_began(&mut self, _trigger: &str) {}

    /// Follows [`session_ended`](Self::session_ended) for a session a trigger
    /// started.
    fn trigger_ended(&mut self, _trigger: &str, _reason: EndReason) {}

    fn speaker_changed(&mut self, _visuals: &SpeakerVisuals) {}

    fn reveal_progress(&mut self, _progress: RevealProgress<'_>) {}

    fn chatter(&mut self, _cue: ChatterCue<'_>) {}

    fn advance_prompt(&mut self, _visible: bool) {}
}

impl<P: DialoguePresenter + ?Sized> DialoguePresenter for &mut P {
    fn session_began(&mut self) {
        (**self).session_began();
    }

    fn session_ended(&mut self, ended: &PlaybackSession, reason: EndReason) {
        (**self).session_ended(ended, reason);
    }

    fn trigger_began(&mut self, trigger: &str) {
        (**self).trigger_began(trigger);
    }

    fn trigger_ended(&mut self, trigger: &str, reason: EndReason) {
        (**self).trigger_ended(trigger, reason);
    }

    fn speaker_changed(&mut self, visuals: &SpeakerVisuals) {
        (**self).speaker_changed(visuals);
    }

    fn reveal_progress(&mut self, progress: RevealProgress<'_>) {
        (**self).reveal_progress(progress);
    }

    fn chatter(&mut self, cue: ChatterCue<'_>) {
        (**self).chatter(cue);
    }

    fn advance_prompt(&mut self, visible: bool) {
        (**self).advance_prompt(visible);
    }
}

/// Presenter that ignores everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullPresenter;

impl DialoguePresenter for NullPresenter {}
