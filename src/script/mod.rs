mod line;
mod parser;

pub use line::{DialogueLine, UNKNOWN_SPEAKER};
pub use parser::{
    parse, parse_with_diagnostics, ParseDiagnostic, ParseDiagnosticKind, ParsedScript, Severity,
    TagMap,
};
