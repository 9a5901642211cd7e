//! Engine-agnostic gating for when a piece of dialogue may start.
//!
//! A trigger holds one script and decides, from enter/exit/interact events
//! reported by the host, whether to hand it to a [`DialogueScheduler`].
//! Sessions it starts carry its id, so the presenter's
//! [`trigger_began`](DialoguePresenter::trigger_began) and
//! [`trigger_ended`](DialoguePresenter::trigger_ended) can be scoped to it.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::presenter::DialoguePresenter;
use crate::scheduler::{DialogueScheduler, PlaybackSession};
use crate::speaker::SpeakerDirectory;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Starts as soon as a matching actor enters.
    #[default]
    Collision,
    /// Starts when a matching actor is inside and interacts.
    KeyPress,
    /// Starts only through [`DialogueTrigger::start`].
    EventOnly,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueTrigger {
    /// Reported to the presenter when this trigger's dialogue begins and ends.
    pub id: String,
    pub script: Option<String>,
    #[serde(default)]
    pub kind: TriggerKind,
    /// Actor tag that counts as entering or leaving.
    #[serde(default = "default_tag")]
    pub tag: String,
    /// Allow the dialogue to start only once.
    #[serde(default)]
    pub single_use: bool,
    /// End the dialogue when the actor leaves.
    #[serde(default)]
    pub end_on_exit: bool,
    #[serde(skip)]
    actor_inside: bool,
    #[serde(skip)]
    used: bool,
}

fn default_tag() -> String {
    "Player".to_string()
}

impl DialogueTrigger {
    pub fn new(id: impl Into<String>, script: impl Into<String>, kind: TriggerKind) -> Self {
        Self {
            id: id.into(),
            script: Some(script.into()),
            kind,
            tag: default_tag(),
            single_use: false,
            end_on_exit: false,
            actor_inside: false,
            used: false,
        }
    }

    pub fn single_use(mut self, single_use: bool) -> Self {
        self.single_use = single_use;
        self
    }

    pub fn end_on_exit(mut self, end_on_exit: bool) -> Self {
        self.end_on_exit = end_on_exit;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn is_actor_inside(&self) -> bool {
        self.actor_inside
    }

    pub fn has_been_used(&self) -> bool {
        self.used
    }

    /// Whether the scheduler is currently playing a session this trigger started.
    pub fn owns_session<D, P>(&self, scheduler: &DialogueScheduler<D, P>) -> bool
    where
        D: SpeakerDirectory,
        P: DialoguePresenter,
    {
        scheduler
            .session()
            .and_then(PlaybackSession::trigger)
            .is_some_and(|trigger| trigger == self.id)
    }

    /// An actor entered the trigger area. Returns whether a session began.
    pub fn on_enter<D, P>(&mut self, tag: &str, scheduler: &mut DialogueScheduler<D, P>) -> bool
    where
        D: SpeakerDirectory,
        P: DialoguePresenter,
    {
        if tag != self.tag {
            return false;
        }
        self.actor_inside = true;
        match self.kind {
            TriggerKind::Collision => self.try_start(scheduler),
            TriggerKind::KeyPress | TriggerKind::EventOnly => false,
        }
    }

    /// An actor left the trigger area.
    pub fn on_exit<D, P>(&mut self, tag: &str, scheduler: &mut DialogueScheduler<D, P>)
    where
        D: SpeakerDirectory,
        P: DialoguePresenter,
    {
        if tag != self.tag {
            return;
        }
        self.actor_inside = false;
        if self.end_on_exit && scheduler.end_now() {
            debug!("actor left the trigger, dialogue ended");
        }
    }

    /// The interact input was pressed. Only key-press triggers react, and only
    /// while the actor is inside.
    pub fn on_interact<D, P>(&mut self, scheduler: &mut DialogueScheduler<D, P>) -> bool
    where
        D: SpeakerDirectory,
        P: DialoguePresenter,
    {
        if self.kind != TriggerKind::KeyPress || !self.actor_inside {
            return false;
        }
        self.try_start(scheduler)
    }

    /// Starts the dialogue directly, whatever the trigger kind.
    pub fn start<D, P>(&mut self, scheduler: &mut DialogueScheduler<D, P>) -> bool
    where
        D: SpeakerDirectory,
        P: DialoguePresenter,
    {
        self.try_start(scheduler)
    }

    fn try_start<D, P>(&mut self, scheduler: &mut DialogueScheduler<D, P>) -> bool
    where
        D: SpeakerDirectory,
        P: DialoguePresenter,
    {
        let Some(script) = self.script.as_deref() else {
            warn!(trigger = %self.id, "dialogue trigger has no script assigned");
            return false;
        };
        if self.single_use && self.used {
            return false;
        }
        if scheduler.is_running() {
            return false;
        }
        self.used = true;
        scheduler.start_session_from(&self.id, Some(script))
    }
}
