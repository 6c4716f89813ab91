use crate::error::Span;

/// Token kinds in the Akizora template language
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Raw text outside of any delimiter pair
    Text(String),

    /// Opening expression delimiter, `{{` by default
    ExpressionOpen,
    /// Closing expression delimiter, `}}` by default
    ExpressionClose,
    /// Opening statement delimiter, `{%` by default (also starts a line statement)
    StatementOpen,
    /// Closing statement delimiter, `%}` by default (end of line for line statements)
    StatementClose,

    /// Identifier, including `@`- and `$`-prefixed names
    Ident(String),
    /// Integer literal
    Int(i64),
    /// Floating point literal
    Float(f64),
    /// Double-quoted string literal, unescaped
    Str(String),

    // Operators
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Pipe,
    Assign,

    // Punctuation
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Colon,

    // Keywords
    KwIf,
    KwElif,
    KwElse,
    KwEndif,
    KwFor,
    KwEndfor,
    KwIn,
    KwSet,
    KwInclude,
    KwRaw,
    KwEndraw,
    KwAnd,
    KwOr,
    KwNot,
    KwTrue,
    KwFalse,
    KwNull,

    /// End of file
    Eof,
}

impl TokenKind {
    /// Human-readable form used in "expected X, got Y" parser messages
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Text(_) => "<text>".to_string(),
            TokenKind::ExpressionOpen => "<expression open>".to_string(),
            TokenKind::ExpressionClose => "<expression close>".to_string(),
            TokenKind::StatementOpen => "<statement open>".to_string(),
            TokenKind::StatementClose => "<statement close>".to_string(),
            TokenKind::Ident(name) => name.clone(),
            TokenKind::Int(n) => n.to_string(),
            TokenKind::Float(n) => n.to_string(),
            TokenKind::Str(s) => s.clone(),
            TokenKind::Equal => "==".to_string(),
            TokenKind::NotEqual => "!=".to_string(),
            TokenKind::Less => "<".to_string(),
            TokenKind::LessEqual => "<=".to_string(),
            TokenKind::Greater => ">".to_string(),
            TokenKind::GreaterEqual => ">=".to_string(),
            TokenKind::Plus => "+".to_string(),
            TokenKind::Minus => "-".to_string(),
            TokenKind::Star => "*".to_string(),
            TokenKind::Slash => "/".to_string(),
            TokenKind::Percent => "%".to_string(),
            TokenKind::Caret => "^".to_string(),
            TokenKind::Pipe => "|".to_string(),
            TokenKind::Assign => "=".to_string(),
            TokenKind::LeftParen => "(".to_string(),
            TokenKind::RightParen => ")".to_string(),
            TokenKind::LeftBracket => "[".to_string(),
            TokenKind::RightBracket => "]".to_string(),
            TokenKind::LeftBrace => "{".to_string(),
            TokenKind::RightBrace => "}".to_string(),
            TokenKind::Comma => ",".to_string(),
            TokenKind::Dot => ".".to_string(),
            TokenKind::Colon => ":".to_string(),
            TokenKind::KwIf => "if".to_string(),
            TokenKind::KwElif => "elif".to_string(),
            TokenKind::KwElse => "else".to_string(),
            TokenKind::KwEndif => "endif".to_string(),
            TokenKind::KwFor => "for".to_string(),
            TokenKind::KwEndfor => "endfor".to_string(),
            TokenKind::KwIn => "in".to_string(),
            TokenKind::KwSet => "set".to_string(),
            TokenKind::KwInclude => "include".to_string(),
            TokenKind::KwRaw => "raw".to_string(),
            TokenKind::KwEndraw => "endraw".to_string(),
            TokenKind::KwAnd => "and".to_string(),
            TokenKind::KwOr => "or".to_string(),
            TokenKind::KwNot => "not".to_string(),
            TokenKind::KwTrue => "true".to_string(),
            TokenKind::KwFalse => "false".to_string(),
            TokenKind::KwNull => "null".to_string(),
            TokenKind::Eof => "<eof>".to_string(),
        }
    }
}

/// A token with its kind and source span
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// Try to convert an identifier to a keyword token kind
pub fn to_keyword(s: &str) -> Option<TokenKind> {
    match s {
        "if" => Some(TokenKind::KwIf),
        "elif" => Some(TokenKind::KwElif),
        "else" => Some(TokenKind::KwElse),
        "endif" => Some(TokenKind::KwEndif),
        "for" => Some(TokenKind::KwFor),
        "endfor" => Some(TokenKind::KwEndfor),
        "in" => Some(TokenKind::KwIn),
        "set" => Some(TokenKind::KwSet),
        "include" => Some(TokenKind::KwInclude),
        "raw" => Some(TokenKind::KwRaw),
        "endraw" => Some(TokenKind::KwEndraw),
        "and" => Some(TokenKind::KwAnd),
        "or" => Some(TokenKind::KwOr),
        "not" => Some(TokenKind::KwNot),
        "true" => Some(TokenKind::KwTrue),
        "false" => Some(TokenKind::KwFalse),
        "null" => Some(TokenKind::KwNull),
        _ => None,
    }
}
