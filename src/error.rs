use std::path::PathBuf;

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

pub type DialogueResult<T> = Result<T, DialogueError>;

/// Errors raised while loading dialogue configuration and speaker data.
///
/// Parsing scripts and running sessions never produce these; they degrade
/// and log instead.
#[derive(Debug, Error, Diagnostic)]
pub enum DialogueError {
    #[error("failed to read {path}: {source}")]
    #[diagnostic(code("dialogue.io"))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse TOML: {0}")]
    #[diagnostic(code("dialogue.toml"))]
    ConfigParse(#[from] toml::de::Error),
    #[error("speaker library parse error: {message}")]
    #[diagnostic(
        code("dialogue.speaker_library"),
        help("each entry under `speakers` needs at least an `id` field")
    )]
    SpeakerLibraryParse {
        message: String,
        #[source_code]
        src: String,
        #[label("here")]
        span: SourceSpan,
    },
    #[error("speaker id '{0}' is defined more than once")]
    #[diagnostic(
        code("dialogue.duplicate_speaker"),
        help("speaker ids are compared case-insensitively")
    )]
    DuplicateSpeaker(String),
    #[error("invalid playback config: {0}")]
    #[diagnostic(code("dialogue.invalid_config"))]
    InvalidConfig(String),
}

impl DialogueError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(input: &str, err: &serde_json::Error) -> Self {
        let offset = json_offset(input, err.line(), err.column());
        Self::SpeakerLibraryParse {
            message: err.to_string(),
            src: input.to_string(),
            span: (offset, 0).into(),
        }
    }
}

fn json_offset(input: &str, line: usize, column: usize) -> usize {
    if line == 0 {
        return 0;
    }
    let mut offset = 0usize;
    for (idx, text) in input.split_inclusive('\n').enumerate() {
        if idx + 1 == line {
            return offset + column.saturating_sub(1).min(text.len());
        }
        offset += text.len();
    }
    input.len()
}
