//! Error types for history encoding, decoding and persistence.

use std::fmt;
use std::path::PathBuf;

/// Typed actual-vs-limit context attached to limit failures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorLimitContext {
    /// Name of the limit that was hit (e.g. `max_span_depth`).
    pub kind: &'static str,
    /// Observed value.
    pub actual: usize,
    /// Configured ceiling.
    pub limit: usize,
}

impl ErrorLimitContext {
    /// Create a limit context.
    pub fn new(kind: &'static str, actual: usize, limit: usize) -> Self {
        Self {
            kind,
            actual,
            limit,
        }
    }
}

/// Reason a history document was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DecodeErrorKind {
    /// Format meta present with an unsupported `content`.
    UnrecognizedFormatVersion,
    /// `<body>` reached without a valid format meta.
    NotARecognizedDocument,
    /// A `<span>` start tag without a `class` attribute.
    SpanMissingClass,
    /// A `</span>` with no matching open span.
    UnbalancedClosingSpan,
    /// A numeric character reference (`&#65;`), never produced by the encoder.
    UnexpectedCharacterReference,
    /// Input ended (or the body closed) with the document incomplete.
    TruncatedDocument,
    /// A span class that is not in the host's tag table.
    UnknownTag,
    /// A named entity reference with no known expansion.
    UnknownEntity,
    /// Tokenizer or text-encoding failure.
    Malformed,
    /// A configured [`crate::DecodeLimits`] ceiling was exceeded.
    LimitExceeded,
}

impl DecodeErrorKind {
    /// Stable machine-readable code.
    pub fn code(self) -> &'static str {
        match self {
            Self::UnrecognizedFormatVersion => "DECODE_UNRECOGNIZED_FORMAT_VERSION",
            Self::NotARecognizedDocument => "DECODE_NOT_A_HISTORY_DOCUMENT",
            Self::SpanMissingClass => "DECODE_SPAN_MISSING_CLASS",
            Self::UnbalancedClosingSpan => "DECODE_UNBALANCED_CLOSING_SPAN",
            Self::UnexpectedCharacterReference => "DECODE_UNEXPECTED_CHAR_REF",
            Self::TruncatedDocument => "DECODE_TRUNCATED_DOCUMENT",
            Self::UnknownTag => "DECODE_UNKNOWN_TAG",
            Self::UnknownEntity => "DECODE_UNKNOWN_ENTITY",
            Self::Malformed => "DECODE_MALFORMED",
            Self::LimitExceeded => "DECODE_LIMIT_EXCEEDED",
        }
    }
}

/// Structured decode failure.
///
/// Decoding is all-or-nothing: whenever this is returned the partially
/// built document has already been dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeError {
    /// Failure category.
    pub kind: DecodeErrorKind,
    /// Human-readable reason.
    pub message: Box<str>,
    /// Byte offset of the tokenizer when the failure was detected.
    pub token_offset: Option<usize>,
    /// Optional typed actual-vs-limit context.
    pub limit: Option<Box<ErrorLimitContext>>,
}

impl DecodeError {
    pub(crate) fn new(kind: DecodeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into().into_boxed_str(),
            token_offset: None,
            limit: None,
        }
    }

    pub(crate) fn with_token_offset(mut self, token_offset: usize) -> Self {
        self.token_offset = Some(token_offset);
        self
    }

    pub(crate) fn with_limit(mut self, kind: &'static str, actual: usize, limit: usize) -> Self {
        self.limit = Some(Box::new(ErrorLimitContext::new(kind, actual, limit)));
        self
    }

    /// Stable machine-readable code for this failure.
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "decode:{}: {}", self.code(), self.message)?;
        if let Some(token_offset) = self.token_offset {
            write!(f, " [token_offset={}]", token_offset)?;
        }
        if let Some(limit) = self.limit.as_deref() {
            write!(
                f,
                " [limit_kind={} actual={} limit={}]",
                limit.kind, limit.actual, limit.limit
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for DecodeError {}

/// Reason a style configuration was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StyleErrorKind {
    /// Two tags share a name.
    DuplicateTag,
    /// Tag name is empty or cannot be used as a class token.
    InvalidTagName,
    /// Font family would break out of the embedded stylesheet.
    InvalidFontFamily,
    /// Color text is not `#rrggbb`.
    InvalidColor,
}

impl StyleErrorKind {
    /// Stable machine-readable code.
    pub fn code(self) -> &'static str {
        match self {
            Self::DuplicateTag => "STYLE_DUPLICATE_TAG",
            Self::InvalidTagName => "STYLE_INVALID_TAG_NAME",
            Self::InvalidFontFamily => "STYLE_INVALID_FONT_FAMILY",
            Self::InvalidColor => "STYLE_INVALID_COLOR",
        }
    }
}

/// Style configuration error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleError {
    /// Failure category.
    pub kind: StyleErrorKind,
    /// Human-readable reason.
    pub message: Box<str>,
}

impl StyleError {
    pub(crate) fn new(kind: StyleErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into().into_boxed_str(),
        }
    }
}

impl fmt::Display for StyleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "style:{}: {}", self.kind.code(), self.message)
    }
}

impl std::error::Error for StyleError {}

/// Top-level error for history persistence.
#[derive(Debug)]
pub enum HistoryError {
    /// The file was read but is not an acceptable history document.
    Decode(DecodeError),
    /// The style configuration is invalid.
    Style(StyleError),
    /// Filesystem failure.
    Io {
        /// What was being attempted (`"reading"`, `"writing"`, ...).
        operation: &'static str,
        /// Target path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Target exists and the save mode forbids replacing it.
    AlreadyExists(PathBuf),
    /// `save` was called before any path was chosen.
    NoPath,
}

impl HistoryError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decode(err) => write!(f, "Error when loading file: {}", err),
            Self::Style(err) => write!(f, "invalid style configuration: {}", err),
            Self::Io {
                operation,
                path,
                source,
            } => write!(
                f,
                "I/O error while {} {}: {}",
                operation,
                path.display(),
                source
            ),
            Self::AlreadyExists(path) => {
                write!(f, "A file named \"{}\" already exists", path.display())
            }
            Self::NoPath => write!(f, "no history file chosen yet"),
        }
    }
}

impl std::error::Error for HistoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decode(err) => Some(err),
            Self::Style(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::AlreadyExists(_) | Self::NoPath => None,
        }
    }
}

impl From<DecodeError> for HistoryError {
    fn from(err: DecodeError) -> Self {
        Self::Decode(err)
    }
}

impl From<StyleError> for HistoryError {
    fn from(err: StyleError) -> Self {
        Self::Style(err)
    }
}
