use thiserror::Error;

/// Source location for error reporting (1-based line and column)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// A byte range in the template source, with its starting location.
///
/// The byte range is what makes verbatim substitution possible in graceful
/// mode: the original text of an expression is a plain slice of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
    pub len: usize,
}

impl Span {
    pub fn new(line: usize, column: usize, offset: usize, len: usize) -> Self {
        Self {
            line,
            column,
            offset,
            len,
        }
    }

    pub fn location(&self) -> Location {
        Location::new(self.line, self.column)
    }

    /// End of the span as a byte offset
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    /// Slice the spanned bytes out of the original source
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.offset..self.end()]
    }
}

/// All errors that can occur in Akizora
#[derive(Error, Debug)]
pub enum AkizoraError {
    #[error("Parser error at {location}: {message}")]
    ParserError { message: String, location: Location },

    #[error("Render error at {location}: {message}")]
    RenderError { message: String, location: Location },

    #[error("File error: {message}")]
    FileError { message: String },

    #[error("JSON error: {message}")]
    JsonError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for Akizora operations
pub type Result<T> = std::result::Result<T, AkizoraError>;

/// A runtime failure that graceful mode recovered from.
///
/// `original_text` holds the exact source bytes of the expression that was
/// substituted into the output, delimiters included.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderError {
    pub message: String,
    pub original_text: String,
    pub location: Location,
}
