use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CMD_OK: &str = "OK";
pub const READY_PREFIX: &str = "READY: ";
pub const ERROR_PREFIX: &str = "ERROR: ";
pub const WARNING_PREFIX: &str = "WARNING: ";
pub const INFO_PREFIX: &str = "INFO: ";

/// Error taxonomy of the control interface. The `Display` text of each
/// variant is exactly what goes out on the wire, before any context suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
pub enum ErrorKind {
    #[error("ERROR: invalid number of arguments")]
    InvalidNumberOfArgs,
    #[error("ERROR: invalid argument")]
    InvalidArgument,
    #[error("ERROR: arg out of range")]
    OutOfRange,
    #[error("ERROR: invalid beam name")]
    InvalidBeam,
    #[error("ERROR: invalid tuning name")]
    InvalidTuningName,
    #[error("ERROR: invalid coord system")]
    InvalidCoordSys,
    #[error("ERROR: invalid ant list")]
    InvalidAntList,
    #[error("ERROR: invalid antgroup")]
    InvalidAntGroup,
    #[error("ERROR: antgroup unassigned")]
    AntGroupUnassigned,
    #[error("WARNING: subarray not assigned to any beams")]
    SubarrayNotAssignedToAnyBeams,
    #[error("WARNING: can't point beams, no coordinates assigned")]
    NoCoordsAssignedToBeams,
    #[error("ERROR: unrecognized command")]
    UnrecognizedCommand,
    #[error("ERROR: unimplemented command")]
    UnimplementedCommand,
    #[error("ERROR: general system error")]
    SystemError,
    #[error("ERROR: don't know how to")]
    UnknownSubcommand,
    #[error("ERROR: unknown beamformer command")]
    UnknownBeamformerCommand,
}

/// A failed command: the error kind plus the context suffix the handler
/// appends (`": point"`, `": bf set coords"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}{context}")]
pub struct CommandError {
    pub kind: ErrorKind,
    pub context: String,
}

impl CommandError {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: String::new(),
        }
    }

    pub fn with_context(kind: ErrorKind, context: impl Into<String>) -> Self {
        Self {
            kind,
            context: context.into(),
        }
    }

    /// Append more context to an error raised further down.
    #[must_use]
    pub fn context(mut self, more: &str) -> Self {
        self.context.push_str(more);
        self
    }
}

impl From<ErrorKind> for CommandError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

/// Successful command outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ok,
    Ready(&'static str),
    Data(String),
}

impl core::fmt::Display for Reply {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Reply::Ok => f.write_str(CMD_OK),
            Reply::Ready(token) => write!(f, "{READY_PREFIX}{token}"),
            Reply::Data(data) => f.write_str(data),
        }
    }
}

pub type CommandResult = Result<Reply, CommandError>;

/// Numeric types a command argument can be parsed into.
pub trait ArgValue: core::str::FromStr {
    /// False for text that parses but is not a usable number.
    fn is_usable(&self) -> bool {
        true
    }
}

impl ArgValue for i32 {}

// `NAN`, `INF` and `INFINITY` parse as floats but are not arguments.
impl ArgValue for f64 {
    fn is_usable(&self) -> bool {
        self.is_finite()
    }
}

/// Parse a numeric command argument; anything unparseable is
/// `invalid argument`.
pub fn parse_value<T: ArgValue>(word: &str) -> Result<T, CommandError> {
    word.trim()
        .parse()
        .ok()
        .filter(T::is_usable)
        .ok_or_else(|| CommandError::new(ErrorKind::InvalidArgument))
}

/// `arg out of range` unless `range` contains `value`. NaN is never in range.
pub fn check_range<T, R>(value: T, range: R) -> Result<T, CommandError>
where
    T: PartialOrd,
    R: core::ops::RangeBounds<T>,
{
    if range.contains(&value) {
        Ok(value)
    } else {
        Err(CommandError::new(ErrorKind::OutOfRange))
    }
}

/// Render a handler result as the response line sent back to the client.
pub fn render_result(result: &CommandResult) -> String {
    match result {
        Ok(reply) => reply.to_string(),
        Err(e) => e.to_string(),
    }
}

/// One tokenized command line. The whole line is upper-cased, then split
/// on runs of spaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    original: String,
    words: Vec<String>,
}

impl CommandLine {
    pub fn parse(line: &str) -> Self {
        let words = line
            .to_uppercase()
            .split(' ')
            .filter(|w| !w.is_empty())
            .map(str::to_owned)
            .collect();

        Self {
            original: line.to_owned(),
            words,
        }
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Word at `index`, or the empty string past the end.
    pub fn word(&self, index: usize) -> &str {
        self.words.get(index).map_or("", String::as_str)
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn primary(&self) -> Option<CommandKind> {
        CommandKind::from_keyword(self.word(0))
    }

    /// Fail with `invalid number of arguments<context>` unless the line has
    /// exactly `expected` words.
    pub fn expect_len(&self, expected: usize, context: &str) -> Result<(), CommandError> {
        if self.len() == expected {
            Ok(())
        } else {
            Err(CommandError::with_context(ErrorKind::InvalidNumberOfArgs, context))
        }
    }

    /// Fail with `invalid number of arguments<context>` if the line has
    /// fewer than `min` words.
    pub fn expect_min_len(&self, min: usize, context: &str) -> Result<(), CommandError> {
        if self.len() >= min {
            Ok(())
        } else {
            Err(CommandError::with_context(ErrorKind::InvalidNumberOfArgs, context))
        }
    }
}

/// Top-level command keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Allocate,
    Deallocate,
    Stop,
    Stow,
    Point,
    Tune,
    Attn,
    Zfocus,
    Wrap,
    Monitor,
    AntGroup,
    LnaOn,
    PamSet,
    Beamformer,
}

const COMMAND_KEYWORDS: &[(&str, CommandKind)] = &[
    ("ALLOCATE", CommandKind::Allocate),
    ("DEALLOCATE", CommandKind::Deallocate),
    ("STOP", CommandKind::Stop),
    ("STOW", CommandKind::Stow),
    ("POINT", CommandKind::Point),
    ("TUNE", CommandKind::Tune),
    ("ATTN", CommandKind::Attn),
    ("ZFOCUS", CommandKind::Zfocus),
    ("WRAP", CommandKind::Wrap),
    ("MONITOR", CommandKind::Monitor),
    ("ANTGROUP", CommandKind::AntGroup),
    ("LNAON", CommandKind::LnaOn),
    ("PAMSET", CommandKind::PamSet),
    ("BF", CommandKind::Beamformer),
];

impl CommandKind {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        COMMAND_KEYWORDS
            .iter()
            .find(|(k, _)| *k == keyword)
            .map(|(_, kind)| *kind)
    }

    pub fn keyword(self) -> &'static str {
        COMMAND_KEYWORDS
            .iter()
            .find(|(_, kind)| *kind == self)
            .map_or("", |(k, _)| k)
    }
}

/// Second-level keywords of the `BF` sub-protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BeamformerKind {
    Set,
    List,
    Clear,
    Add,
    Cal,
    Point,
    Reset,
    Stop,
    ObsLen,
    Init,
    AutoAtten,
}

const BEAMFORMER_KEYWORDS: &[(&str, BeamformerKind)] = &[
    ("SET", BeamformerKind::Set),
    ("LIST", BeamformerKind::List),
    ("CLEAR", BeamformerKind::Clear),
    ("ADD", BeamformerKind::Add),
    ("CAL", BeamformerKind::Cal),
    ("POINT", BeamformerKind::Point),
    ("RESET", BeamformerKind::Reset),
    ("STOP", BeamformerKind::Stop),
    ("OBSLEN", BeamformerKind::ObsLen),
    ("INIT", BeamformerKind::Init),
    ("AUTOATTEN", BeamformerKind::AutoAtten),
];

impl BeamformerKind {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        BEAMFORMER_KEYWORDS
            .iter()
            .find(|(k, _)| *k == keyword)
            .map(|(_, kind)| *kind)
    }
}

/// Response category, recovered from the leading token of a response line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseKind {
    Ok,
    Error,
    Warning,
    Ready,
    Info,
    Data,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub kind: ResponseKind,
    pub message: String,
}

impl Response {
    pub fn classify(line: &str) -> Self {
        let prefixed = [
            (ERROR_PREFIX, ResponseKind::Error),
            (WARNING_PREFIX, ResponseKind::Warning),
            (READY_PREFIX, ResponseKind::Ready),
            (INFO_PREFIX, ResponseKind::Info),
        ];

        for (prefix, kind) in prefixed {
            if let Some(rest) = line.strip_prefix(prefix) {
                return Self {
                    kind,
                    message: rest.to_owned(),
                };
            }
        }

        if line == CMD_OK {
            return Self {
                kind: ResponseKind::Ok,
                message: String::new(),
            };
        }

        Self {
            kind: ResponseKind::Data,
            message: line.to_owned(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.kind, ResponseKind::Error | ResponseKind::Warning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenizer_uppercases_and_collapses_spaces() {
        let line = CommandLine::parse("zfocus   ant1z   1222  ");
        assert_eq!(line.words(), &["ZFOCUS", "ANT1Z", "1222"]);
        assert_eq!(line.original(), "zfocus   ant1z   1222  ");
        assert_eq!(line.primary(), Some(CommandKind::Zfocus));
        assert_eq!(line.word(7), "");
    }

    #[test]
    fn test_leading_spaces_are_not_a_word() {
        let line = CommandLine::parse("   stop 1a");
        assert_eq!(line.words(), &["STOP", "1A"]);
        assert_eq!(line.primary(), Some(CommandKind::Stop));
    }

    #[test]
    fn test_parse_value_rejects_non_finite_floats() {
        for word in ["NAN", "INF", "-INF", "INFINITY", "1E400"] {
            let err = parse_value::<f64>(word).unwrap_err();
            assert_eq!(err.kind, ErrorKind::InvalidArgument, "{word}");
        }
        assert_eq!(parse_value::<f64>("1E3").unwrap(), 1000.0);
        assert_eq!(parse_value::<i32>("-7").unwrap(), -7);
    }

    #[test]
    fn test_error_display_carries_context() {
        let err = CommandError::with_context(ErrorKind::InvalidNumberOfArgs, ": point");
        assert_eq!(err.to_string(), "ERROR: invalid number of arguments: point");

        let err = CommandError::new(ErrorKind::OutOfRange).context(": tune");
        assert_eq!(err.to_string(), "ERROR: arg out of range: tune");
    }

    #[test]
    fn test_keyword_tables_round_trip() {
        for (keyword, kind) in COMMAND_KEYWORDS {
            assert_eq!(CommandKind::from_keyword(keyword), Some(*kind));
            assert_eq!(kind.keyword(), *keyword);
        }
        assert_eq!(CommandKind::from_keyword("BADCOMMAND"), None);
        assert_eq!(BeamformerKind::from_keyword("AUTOATTEN"), Some(BeamformerKind::AutoAtten));
    }

    #[test]
    fn test_response_classification() {
        assert_eq!(Response::classify("OK").kind, ResponseKind::Ok);
        assert_eq!(Response::classify("READY: CAL").message, "CAL");
        assert!(Response::classify("WARNING: subarray not assigned to any beams").is_failure());
        assert_eq!(Response::classify("220").kind, ResponseKind::Data);
    }
}
