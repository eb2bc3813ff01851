use std::cmp::Ordering;
use std::fmt;

/// Source range an IR entity was lowered from.
///
/// `Unknown` marks code with no recorded origin, `Builtin` marks code the
/// lowering synthesized. Only `Span` locations are ordered by position; the
/// two markers sort before every real span.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceLocation {
    Unknown,
    Builtin,
    Span {
        file: String,
        start_line: u32,
        start_column: u32,
        end_line: u32,
        end_column: u32,
    },
}

impl SourceLocation {
    pub fn new(
        file: impl Into<String>,
        start_line: u32,
        start_column: u32,
        end_line: u32,
        end_column: u32,
    ) -> Self {
        SourceLocation::Span {
            file: file.into(),
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    /// False for the `Unknown` and `Builtin` markers.
    pub fn is_real(&self) -> bool {
        matches!(self, SourceLocation::Span { .. })
    }

    pub fn start_line(&self) -> Option<u32> {
        match self {
            SourceLocation::Span { start_line, .. } => Some(*start_line),
            _ => None,
        }
    }

    /// Annotation form used by the IR printer: `!file,l:c,l:c`.
    pub fn annotation(&self) -> String {
        match self {
            SourceLocation::Span {
                file,
                start_line,
                start_column,
                end_line,
                end_column,
            } => format!("!{file},{start_line}:{start_column},{end_line}:{end_column}"),
            other => format!("!{other}"),
        }
    }

    fn sort_key(&self) -> (u8, &str, u32, u32, u32, u32) {
        match self {
            SourceLocation::Unknown => (0, "", 0, 0, 0, 0),
            SourceLocation::Builtin => (1, "", 0, 0, 0, 0),
            SourceLocation::Span {
                file,
                start_line,
                start_column,
                end_line,
                end_column,
            } => (2, file, *start_line, *start_column, *end_line, *end_column),
        }
    }
}

impl PartialOrd for SourceLocation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SourceLocation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocation::Unknown => f.write_str("UNKNOWN"),
            SourceLocation::Builtin => f.write_str("BUILTIN"),
            SourceLocation::Span {
                file,
                start_line,
                start_column,
                end_line,
                end_column,
            } => write!(
                f,
                "{file}[{start_line}:{start_column}-{end_line}:{end_column}]"
            ),
        }
    }
}
