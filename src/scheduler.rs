//! Tick-driven playback of parsed dialogue.
//!
//! The scheduler owns at most one [`PlaybackSession`]. Each line goes through
//! a reveal phase (typewriter) and then waits for an advance signal. The host
//! calls [`DialogueScheduler::tick`] once per frame with the unscaled frame
//! time; every transition happens synchronously inside that call.
//!
//! # Contracts
//! - **Invariant**: `current_index <= lines.len()` and
//!   `revealed <= current line char count`.
//! - **Invariant**: `revealed` never decreases while a line is revealing.
//! - Advance and skip-all signals are sampled once per tick. Signals that
//!   arrive before `min_time_before_skip` has elapsed since the line began are
//!   dropped. Skip-all wins over advance within the same tick.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, trace, warn};

use crate::config::PlaybackConfig;
use crate::presenter::{ChatterCue, DialoguePresenter, RevealProgress, SpeakerVisuals};
use crate::script::{parse, DialogueLine};
use crate::speaker::SpeakerDirectory;

/// Name shown for lines whose speaker id is blank and unknown.
const BLANK_SPEAKER_NAME: &str = "???";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Revealing,
    AwaitingAdvance,
    Ending,
}

/// Why the most recent session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Every line was shown and advanced past.
    Completed,
    /// A skip-all signal abandoned the remaining lines.
    SkippedAll,
    /// [`DialogueScheduler::end_now`] was called.
    EndedNow,
    /// A new session replaced it.
    Replaced,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Signals {
    advance: bool,
    skip_all: bool,
}

#[derive(Clone, Debug, Default)]
struct ChatterProfile {
    clips: Vec<String>,
    interval: f32,
}

/// State of the running dialogue.
#[derive(Clone, Debug)]
pub struct PlaybackSession {
    lines: Vec<DialogueLine>,
    current_index: usize,
    revealed: usize,
    total: usize,
    reveal_byte: usize,
    phase: Phase,
    skip_all_requested: bool,
    line_elapsed: f64,
    next_reveal_at: f64,
    prompt_visible: bool,
    chatter: ChatterProfile,
    trigger: Option<String>,
}

impl PlaybackSession {
    fn new(lines: Vec<DialogueLine>) -> Self {
        Self {
            lines,
            current_index: 0,
            revealed: 0,
            total: 0,
            reveal_byte: 0,
            phase: Phase::Idle,
            skip_all_requested: false,
            line_elapsed: 0.0,
            next_reveal_at: 0.0,
            prompt_visible: false,
            chatter: ChatterProfile::default(),
            trigger: None,
        }
    }

    pub fn lines(&self) -> &[DialogueLine] {
        &self.lines
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_line(&self) -> Option<&DialogueLine> {
        self.lines.get(self.current_index)
    }

    /// Display characters of the current line that are visible.
    pub fn revealed_character_count(&self) -> usize {
        self.revealed
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn skip_all_requested(&self) -> bool {
        self.skip_all_requested
    }

    /// Seconds since the current line began.
    pub fn line_elapsed(&self) -> f64 {
        self.line_elapsed
    }

    pub fn is_prompt_visible(&self) -> bool {
        self.prompt_visible
    }

    /// Id of the trigger that started this session, if any.
    pub fn trigger(&self) -> Option<&str> {
        self.trigger.as_deref()
    }

    fn progress(&self) -> RevealProgress<'_> {
        RevealProgress {
            line_index: self.current_index,
            revealed: self.revealed,
            total: self.total,
            text: self
                .current_line()
                .map(|line| line.text.as_str())
                .unwrap_or_default(),
        }
    }
}

/// Drives dialogue sessions and reports progress to a presenter.
#[derive(Debug)]
pub struct DialogueScheduler<D, P> {
    config: PlaybackConfig,
    directory: D,
    presenter: P,
    session: Option<PlaybackSession>,
    pending: Signals,
    clock: f64,
    next_chatter_at: f64,
    last_end: Option<EndReason>,
}

impl<D: SpeakerDirectory, P: DialoguePresenter> DialogueScheduler<D, P> {
    pub fn new(config: PlaybackConfig, directory: D, presenter: P) -> Self {
        Self {
            config,
            directory,
            presenter,
            session: None,
            pending: Signals::default(),
            clock: 0.0,
            next_chatter_at: 0.0,
            last_end: None,
        }
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn set_characters_per_second(&mut self, characters_per_second: f32) {
        self.config.characters_per_second = characters_per_second;
    }

    pub fn set_type_out_text(&mut self, type_out_text: bool) {
        self.config.type_out_text = type_out_text;
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    pub fn into_parts(self) -> (PlaybackConfig, D, P) {
        (self.config, self.directory, self.presenter)
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    pub fn phase(&self) -> Phase {
        self.session
            .as_ref()
            .map_or(Phase::Idle, PlaybackSession::phase)
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    pub fn last_end_reason(&self) -> Option<EndReason> {
        self.last_end
    }

    /// Parses `script` and starts playing it.
    ///
    /// Returns false, leaving any running session untouched, when the script
    /// is missing, blank, or yields no usable lines. Otherwise a running
    /// session is ended first and the new one begins.
    pub fn start_session(&mut self, script: Option<&str>) -> bool {
        self.start_script(script, None)
    }

    /// Like [`start_session`](Self::start_session), but tags the session with
    /// the id of the trigger that started it. The presenter then also gets
    /// [`trigger_began`](DialoguePresenter::trigger_began) and
    /// [`trigger_ended`](DialoguePresenter::trigger_ended) for it.
    pub fn start_session_from(&mut self, trigger: &str, script: Option<&str>) -> bool {
        self.start_script(script, Some(trigger))
    }

    /// Starts playing already parsed lines. Lines with empty text are skipped.
    pub fn start_lines(&mut self, lines: Vec<DialogueLine>) -> bool {
        self.begin(lines, None)
    }

    #[instrument(skip_all, fields(trigger = trigger.unwrap_or_default()))]
    fn start_script(&mut self, script: Option<&str>, trigger: Option<&str>) -> bool {
        let Some(source) = script else {
            error!("tried to start dialogue without a script");
            return false;
        };
        if source.trim().is_empty() {
            error!("tried to start dialogue with an empty script");
            return false;
        }
        self.begin(parse(source), trigger)
    }

    #[instrument(skip_all, fields(lines = lines.len()))]
    fn begin(&mut self, mut lines: Vec<DialogueLine>, trigger: Option<&str>) -> bool {
        let before = lines.len();
        lines.retain(|line| !line.text.is_empty());
        if lines.len() != before {
            warn!(dropped = before - lines.len(), "skipping lines with empty text");
        }
        if lines.is_empty() {
            warn!("dialogue did not produce any valid lines");
            return false;
        }

        if self.session.is_some() {
            debug!("replacing running dialogue session");
            self.finish(EndReason::Replaced);
        }

        self.pending = Signals::default();
        let mut session = PlaybackSession::new(lines);
        session.trigger = trigger.map(str::to_string);
        self.session = Some(session);
        self.presenter.session_began();
        if let Some(trigger) = trigger {
            self.presenter.trigger_began(trigger);
        }
        self.load_line(0);
        true
    }

    /// Requests a fast-forward of the current line, or the next line once the
    /// current one is fully shown. Ignored when no session runs.
    pub fn request_advance(&mut self) {
        if self.session.is_some() {
            self.pending.advance = true;
        }
    }

    /// Requests abandoning the rest of the session. Ignored when no session runs.
    pub fn request_skip_all(&mut self) {
        if self.session.is_some() {
            self.pending.skip_all = true;
        }
    }

    /// Ends the running session immediately, regardless of phase or guard.
    ///
    /// Returns false when there was nothing to end.
    #[instrument(skip_all)]
    pub fn end_now(&mut self) -> bool {
        self.finish(EndReason::EndedNow)
    }

    /// Advances playback by `elapsed` seconds of unscaled time.
    pub fn tick(&mut self, elapsed: f32) {
        let elapsed = if elapsed.is_finite() && elapsed > 0.0 {
            f64::from(elapsed)
        } else {
            0.0
        };
        self.clock += elapsed;
        let signals = std::mem::take(&mut self.pending);

        let guard = f64::from(self.config.min_time_before_skip);
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.line_elapsed += elapsed;
        let phase = session.phase;
        let can_skip = session.line_elapsed >= guard;

        if !can_skip && (signals.advance || signals.skip_all) {
            trace!(
                line_elapsed = session.line_elapsed,
                "input arrived before the skip guard, dropping it"
            );
        }
        let skip_all = can_skip && signals.skip_all;
        let advance = can_skip && signals.advance;

        match phase {
            Phase::Revealing => {
                if skip_all {
                    self.skip_all();
                } else if advance || self.config.reveals_instantly() {
                    self.fast_forward();
                } else {
                    self.reveal_due_characters();
                }
            }
            Phase::AwaitingAdvance => {
                if skip_all {
                    self.skip_all();
                } else if advance {
                    self.next_line();
                }
            }
            Phase::Idle | Phase::Ending => {}
        }
    }

    fn load_line(&mut self, index: usize) {
        let Some(line) = self
            .session
            .as_ref()
            .and_then(|session| session.lines.get(index))
        else {
            return;
        };
        let (visuals, chatter) = self.resolve_speaker(line);
        let total = line.char_count();
        debug!(
            line = index,
            speaker = %visuals.speaker_id,
            characters = total,
            "showing dialogue line"
        );

        let instant = self.config.reveals_instantly();
        let Self {
            session, presenter, ..
        } = &mut *self;
        let Some(session) = session.as_mut() else {
            return;
        };
        session.current_index = index;
        session.total = total;
        session.revealed = 0;
        session.reveal_byte = 0;
        session.line_elapsed = 0.0;
        session.next_reveal_at = 0.0;
        session.chatter = chatter;
        presenter.speaker_changed(&visuals);

        if instant {
            session.revealed = total;
            session.reveal_byte = session.current_line().map_or(0, |line| line.text.len());
            presenter.reveal_progress(session.progress());
            self.await_advance();
        } else {
            session.phase = Phase::Revealing;
            presenter.reveal_progress(session.progress());
        }
    }

    fn resolve_speaker(&self, line: &DialogueLine) -> (SpeakerVisuals, ChatterProfile) {
        let default_interval = self.config.default_chatter_interval;
        match self.directory.speaker(&line.speaker_id) {
            Some(info) => {
                let options = &info.advanced;
                let (name_color, text_color) = if options.use_custom_colors {
                    (options.name_color, options.text_color)
                } else {
                    (self.config.name_color, self.config.text_color)
                };
                let interval = if options.chatter_interval > 0.0 {
                    options.chatter_interval
                } else {
                    default_interval
                };
                let visuals = SpeakerVisuals {
                    speaker_id: line.speaker_id.clone(),
                    display_name: info.resolved_name().to_string(),
                    name_color,
                    text_color,
                    portrait: info.portrait(line.sprite_id.as_deref()).cloned(),
                };
                let chatter = ChatterProfile {
                    clips: options.chatter_clips.clone(),
                    interval,
                };
                (visuals, chatter)
            }
            None => {
                let display_name = if line.speaker_id.trim().is_empty() {
                    BLANK_SPEAKER_NAME.to_string()
                } else {
                    line.speaker_id.clone()
                };
                let visuals = SpeakerVisuals {
                    speaker_id: line.speaker_id.clone(),
                    display_name,
                    name_color: self.config.name_color,
                    text_color: self.config.text_color,
                    portrait: None,
                };
                let chatter = ChatterProfile {
                    clips: Vec::new(),
                    interval: default_interval,
                };
                (visuals, chatter)
            }
        }
    }

    fn reveal_due_characters(&mut self) {
        let delay = 1.0 / f64::from(self.config.characters_per_second);
        let Self {
            session,
            presenter,
            clock,
            next_chatter_at,
            ..
        } = &mut *self;
        let Some(session) = session.as_mut() else {
            return;
        };

        while session.revealed < session.total && session.line_elapsed >= session.next_reveal_at {
            let Some(character) = session
                .current_line()
                .and_then(|line| line.text[session.reveal_byte..].chars().next())
            else {
                break;
            };
            let char_index = session.revealed;
            session.revealed += 1;
            session.reveal_byte += character.len_utf8();
            session.next_reveal_at += delay;
            trace!(char_index, "revealed character");
            presenter.reveal_progress(session.progress());

            if !character.is_whitespace() && *clock >= *next_chatter_at {
                presenter.chatter(ChatterCue {
                    char_index,
                    character,
                    clips: &session.chatter.clips,
                    interval: session.chatter.interval,
                });
                *next_chatter_at = *clock + f64::from(session.chatter.interval);
            }
        }

        if session.revealed >= session.total {
            self.await_advance();
        }
    }

    fn fast_forward(&mut self) {
        let Self {
            session, presenter, ..
        } = &mut *self;
        let Some(session) = session.as_mut() else {
            return;
        };
        debug!(line = session.current_index, "fast-forwarding line reveal");
        session.revealed = session.total;
        session.reveal_byte = session.current_line().map_or(0, |line| line.text.len());
        presenter.reveal_progress(session.progress());
        self.await_advance();
    }

    fn await_advance(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.phase = Phase::AwaitingAdvance;
        if !session.prompt_visible {
            session.prompt_visible = true;
            self.presenter.advance_prompt(true);
        }
    }

    fn next_line(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.prompt_visible {
            session.prompt_visible = false;
            self.presenter.advance_prompt(false);
        }
        let next = session.current_index + 1;
        if next < session.lines.len() {
            self.load_line(next);
        } else {
            session.current_index = next;
            self.finish(EndReason::Completed);
        }
    }

    fn skip_all(&mut self) {
        if let Some(session) = self.session.as_mut() {
            debug!(line = session.current_index, "skipping remaining dialogue");
            session.skip_all_requested = true;
        }
        self.finish(EndReason::SkippedAll);
    }

    fn finish(&mut self, reason: EndReason) -> bool {
        let Some(mut session) = self.session.take() else {
            return false;
        };
        session.phase = Phase::Ending;
        debug!(
            ?reason,
            line = session.current_index,
            lines = session.lines.len(),
            "ending dialogue session"
        );
        if session.prompt_visible {
            session.prompt_visible = false;
            self.presenter.advance_prompt(false);
        }
        self.presenter.session_ended(&session, reason);
        if let Some(trigger) = session.trigger.as_deref() {
            self.presenter.trigger_ended(trigger, reason);
        }
        self.pending = Signals::default();
        self.last_end = Some(reason);
        true
    }
}

#[cfg(test)]
#[path = "tests/scheduler_tests.rs"]
mod tests;
