//! Tagged dialogue scripts and their typewriter-style playback.
//!
//! [`parse`] turns a plain-text script into [`DialogueLine`]s and a
//! [`DialogueScheduler`] plays them back one tick at a time, reporting to a
//! [`DialoguePresenter`] and resolving speakers through a [`SpeakerDirectory`].

mod config;
mod error;
mod presenter;
mod scheduler;
mod script;
mod speaker;
mod trace;
mod trigger;

pub use config::{playback_config_schema, PlaybackConfig};
pub use error::{DialogueError, DialogueResult};
pub use presenter::{ChatterCue, DialoguePresenter, NullPresenter, RevealProgress, SpeakerVisuals};
pub use scheduler::{DialogueScheduler, EndReason, Phase, PlaybackSession};
pub use script::{
    parse, parse_with_diagnostics, DialogueLine, ParseDiagnostic, ParseDiagnosticKind,
    ParsedScript, Severity, TagMap, UNKNOWN_SPEAKER,
};
pub use speaker::{
    ids_match, speaker_library_schema, AdvancedSpeakerOptions, PortraitHandle, Rgb, SpeakerDirectory,
    SpeakerInfo, SpeakerLibrary, SpriteEntry, DEFAULT_CHATTER_INTERVAL,
};
pub use trace::{PlaybackTrace, TraceEvent};
pub use trigger::{DialogueTrigger, TriggerKind};
