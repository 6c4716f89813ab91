use crate::error::{AkizoraError, Result, Span};
use crate::token::{to_keyword, Token, TokenKind};

/// Delimiter pairs and whitespace rules read by the lexer at parse time.
///
/// The environment owns one of these; a parsed template never captures it,
/// so reconfiguring delimiters affects only subsequent parses.
#[derive(Debug, Clone)]
pub struct SyntaxConfig {
    pub expression_open: String,
    pub expression_close: String,
    pub statement_open: String,
    pub statement_close: String,
    pub comment_open: String,
    pub comment_close: String,
    pub line_statement: String,
    pub trim_blocks: bool,
    pub lstrip_blocks: bool,
}

impl Default for SyntaxConfig {
    fn default() -> Self {
        Self {
            expression_open: "{{".to_string(),
            expression_close: "}}".to_string(),
            statement_open: "{%".to_string(),
            statement_close: "%}".to_string(),
            comment_open: "{#".to_string(),
            comment_close: "#}".to_string(),
            line_statement: "##".to_string(),
            trim_blocks: false,
            lstrip_blocks: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Expression,
    Statement,
    LineStatement,
}

/// Whitespace handling carried over from a closing delimiter to the
/// following text run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingStrip {
    None,
    /// `-` on the close side: eat all following whitespace
    All,
    /// `trim_blocks`: eat trailing spaces/tabs plus the single newline
    SpacesAndNewline,
}

/// Lexer for tokenizing Akizora template source
pub struct Lexer<'a> {
    source: &'a str,
    config: &'a SyntaxConfig,
    pos: usize,
    line: usize,
    column: usize,
    pending_strip: PendingStrip,
    raw_mode: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source and syntax configuration
    pub fn new(source: &'a str, config: &'a SyntaxConfig) -> Self {
        Self {
            source,
            config,
            pos: 0,
            line: 1,
            column: 1,
            pending_strip: PendingStrip::None,
            raw_mode: false,
        }
    }

    /// Tokenize the source and return a vector of tokens
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        while !self.eof() {
            if self.raw_mode {
                self.scan_raw(&mut tokens);
            } else {
                self.scan_text(&mut tokens)?;
            }
        }

        tokens.push(Token::new(TokenKind::Eof, self.here(0)));
        Ok(tokens)
    }

    fn scan_text(&mut self, tokens: &mut Vec<Token>) -> Result<()> {
        self.apply_pending_strip();

        let start_span = self.here(0);
        let text_start = self.pos;

        while !self.eof() {
            if self.at_line_start() {
                if let Some(indent) = self.line_statement_indent() {
                    self.emit_text(tokens, text_start, start_span);
                    return self.scan_line_statement(tokens, indent);
                }
            }
            if self.match_str(&self.config.expression_open) {
                self.emit_text(tokens, text_start, start_span);
                return self.scan_tag(tokens, TagKind::Expression);
            }
            if self.match_str(&self.config.statement_open) {
                self.emit_text(tokens, text_start, start_span);
                return self.scan_tag(tokens, TagKind::Statement);
            }
            if self.match_str(&self.config.comment_open) {
                self.emit_text(tokens, text_start, start_span);
                return self.scan_comment(tokens);
            }
            self.advance();
        }

        self.emit_text(tokens, text_start, start_span);
        Ok(())
    }

    /// Inside a raw block: everything up to the endraw statement is one
    /// verbatim text token. The endraw statement itself is lexed normally
    /// afterwards.
    fn scan_raw(&mut self, tokens: &mut Vec<Token>) {
        self.apply_pending_strip();

        let start_span = self.here(0);
        let text_start = self.pos;

        while !self.eof() {
            if self.match_str(&self.config.statement_open) && self.statement_is_endraw() {
                break;
            }
            self.advance();
        }

        self.emit_text(tokens, text_start, start_span);
        self.raw_mode = false;
    }

    fn statement_is_endraw(&self) -> bool {
        let mut rest = &self.source[self.pos + self.config.statement_open.len()..];
        if let Some(stripped) = rest.strip_prefix('-').or_else(|| rest.strip_prefix('+')) {
            rest = stripped;
        }
        let rest = rest.trim_start_matches([' ', '\t', '\r', '\n']);
        match rest.strip_prefix("endraw") {
            Some(after) => !after.starts_with(|c: char| c.is_ascii_alphanumeric() || c == '_'),
            None => false,
        }
    }

    fn scan_tag(&mut self, tokens: &mut Vec<Token>, kind: TagKind) -> Result<()> {
        let open_len = match kind {
            TagKind::Expression => self.config.expression_open.len(),
            _ => self.config.statement_open.len(),
        };
        let start = self.here(0);
        self.advance_bytes(open_len);

        match self.current_char() {
            Some('-') => {
                self.advance();
                strip_preceding_text(tokens);
            }
            Some('+') => {
                self.advance();
            }
            _ => {
                if kind != TagKind::Expression && self.config.lstrip_blocks {
                    strip_preceding_text(tokens);
                }
            }
        }

        let open_kind = match kind {
            TagKind::Expression => TokenKind::ExpressionOpen,
            _ => TokenKind::StatementOpen,
        };
        let open_span = Span::new(start.line, start.column, start.offset, self.pos - start.offset);
        tokens.push(Token::new(open_kind, open_span));

        self.scan_inside(tokens, kind)
    }

    fn scan_line_statement(&mut self, tokens: &mut Vec<Token>, indent: usize) -> Result<()> {
        self.advance_bytes(indent);
        let span = self.here(self.config.line_statement.len());
        self.advance_bytes(self.config.line_statement.len());
        tokens.push(Token::new(TokenKind::StatementOpen, span));
        self.scan_inside(tokens, TagKind::LineStatement)
    }

    fn scan_comment(&mut self, tokens: &mut Vec<Token>) -> Result<()> {
        let start = self.here(0);
        self.advance_bytes(self.config.comment_open.len());

        match self.current_char() {
            Some('-') => {
                self.advance();
                strip_preceding_text(tokens);
            }
            Some('+') => {
                self.advance();
            }
            _ => {
                if self.config.lstrip_blocks {
                    strip_preceding_text(tokens);
                }
            }
        }

        // comments emit no tokens; just find the close
        loop {
            let Some(c) = self.current_char() else {
                return Err(AkizoraError::ParserError {
                    message: "expected comment close, got '<eof>'".to_string(),
                    location: start.location(),
                });
            };
            if (c == '-' || c == '+')
                && self.source[self.pos + c.len_utf8()..].starts_with(&self.config.comment_close)
            {
                self.advance();
                self.advance_bytes(self.config.comment_close.len());
                self.pending_strip = if c == '-' {
                    PendingStrip::All
                } else {
                    PendingStrip::None
                };
                return Ok(());
            }
            if self.match_str(&self.config.comment_close) {
                self.advance_bytes(self.config.comment_close.len());
                self.pending_strip = if self.config.trim_blocks {
                    PendingStrip::SpacesAndNewline
                } else {
                    PendingStrip::None
                };
                return Ok(());
            }
            self.advance();
        }
    }

    fn scan_inside(&mut self, tokens: &mut Vec<Token>, kind: TagKind) -> Result<()> {
        let close: String = match kind {
            TagKind::Expression => self.config.expression_close.clone(),
            TagKind::Statement => self.config.statement_close.clone(),
            TagKind::LineStatement => String::new(),
        };

        loop {
            if kind == TagKind::LineStatement {
                match self.current_char() {
                    None => {
                        tokens.push(Token::new(TokenKind::StatementClose, self.here(0)));
                        self.check_raw_open(tokens);
                        return Ok(());
                    }
                    Some('\n') => {
                        let span = self.here(1);
                        self.advance();
                        tokens.push(Token::new(TokenKind::StatementClose, span));
                        self.check_raw_open(tokens);
                        return Ok(());
                    }
                    _ => {}
                }
            }

            let Some(c) = self.current_char() else {
                // unclosed delimiter; the parser reports it against Eof
                return Ok(());
            };

            if c == ' ' || c == '\t' || c == '\r' || (c == '\n' && kind != TagKind::LineStatement) {
                self.advance();
                continue;
            }

            if kind != TagKind::LineStatement {
                if (c == '-' || c == '+')
                    && self.source[self.pos + c.len_utf8()..].starts_with(&close)
                {
                    let span = self.here(c.len_utf8() + close.len());
                    self.advance();
                    self.advance_bytes(close.len());
                    tokens.push(Token::new(close_kind(kind), span));
                    self.pending_strip = if c == '-' {
                        PendingStrip::All
                    } else {
                        PendingStrip::None
                    };
                    if kind == TagKind::Statement {
                        self.check_raw_open(tokens);
                    }
                    return Ok(());
                }
                if self.match_str(&close) {
                    let span = self.here(close.len());
                    self.advance_bytes(close.len());
                    tokens.push(Token::new(close_kind(kind), span));
                    self.pending_strip = if kind == TagKind::Statement && self.config.trim_blocks {
                        PendingStrip::SpacesAndNewline
                    } else {
                        PendingStrip::None
                    };
                    if kind == TagKind::Statement {
                        self.check_raw_open(tokens);
                    }
                    return Ok(());
                }
            }

            self.scan_token(tokens, c)?;
        }
    }

    /// A statement consisting of the single keyword `raw` flips the lexer
    /// into raw mode for the following text
    fn check_raw_open(&mut self, tokens: &[Token]) {
        let n = tokens.len();
        if n >= 3
            && matches!(tokens[n - 1].kind, TokenKind::StatementClose)
            && matches!(tokens[n - 2].kind, TokenKind::KwRaw)
            && matches!(tokens[n - 3].kind, TokenKind::StatementOpen)
        {
            self.raw_mode = true;
        }
    }

    fn scan_token(&mut self, tokens: &mut Vec<Token>, c: char) -> Result<()> {
        if c == '"' {
            self.scan_string(tokens)
        } else if c.is_ascii_digit() {
            self.scan_number(tokens)
        } else if is_ident_start(c) {
            self.scan_identifier(tokens)
        } else {
            self.scan_operator(tokens, c)
        }
    }

    fn scan_identifier(&mut self, tokens: &mut Vec<Token>) -> Result<()> {
        let start = self.here(0);
        let from = self.pos;

        // @ and $ are valid only as the leading character
        self.advance();
        while let Some(c) = self.current_char() {
            if is_ident_cont(c) {
                self.advance();
            } else {
                break;
            }
        }

        let value = &self.source[from..self.pos];
        let kind = to_keyword(value).unwrap_or_else(|| TokenKind::Ident(value.to_string()));
        let span = Span::new(start.line, start.column, from, self.pos - from);
        tokens.push(Token::new(kind, span));
        Ok(())
    }

    fn scan_number(&mut self, tokens: &mut Vec<Token>) -> Result<()> {
        let start = self.here(0);
        let from = self.pos;
        let mut is_float = false;

        while self.current_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.current_char() == Some('.')
            && self.peek_char().map_or(false, |c| c.is_ascii_digit())
        {
            is_float = true;
            self.advance();
            while self.current_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        if matches!(self.current_char(), Some('e') | Some('E')) {
            let mut lookahead = self.pos + 1;
            let bytes = self.source.as_bytes();
            if lookahead < bytes.len() && (bytes[lookahead] == b'+' || bytes[lookahead] == b'-') {
                lookahead += 1;
            }
            if lookahead < bytes.len() && bytes[lookahead].is_ascii_digit() {
                is_float = true;
                while self.pos < lookahead {
                    self.advance();
                }
                while self.current_char().map_or(false, |c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        let text = &self.source[from..self.pos];
        let span = Span::new(start.line, start.column, from, self.pos - from);
        let kind = if is_float {
            TokenKind::Float(text.parse().unwrap_or(0.0))
        } else {
            match text.parse::<i64>() {
                Ok(n) => TokenKind::Int(n),
                Err(_) => TokenKind::Float(text.parse().unwrap_or(0.0)),
            }
        };
        tokens.push(Token::new(kind, span));
        Ok(())
    }

    fn scan_string(&mut self, tokens: &mut Vec<Token>) -> Result<()> {
        let start = self.here(0);
        let from = self.pos;
        self.advance(); // opening quote
        let mut value = String::new();

        loop {
            match self.current_char() {
                None | Some('\n') => {
                    return Err(AkizoraError::ParserError {
                        message: "unterminated string".to_string(),
                        location: start.location(),
                    });
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') => {
                    self.advance();
                    let escape = self.current_char().ok_or_else(|| AkizoraError::ParserError {
                        message: "unterminated string".to_string(),
                        location: start.location(),
                    })?;
                    match escape {
                        '"' => value.push('"'),
                        '\\' => value.push('\\'),
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        other => {
                            return Err(AkizoraError::ParserError {
                                message: format!("invalid escape sequence '\\{}'", other),
                                location: self.here(0).location(),
                            });
                        }
                    }
                    self.advance();
                }
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        let span = Span::new(start.line, start.column, from, self.pos - from);
        tokens.push(Token::new(TokenKind::Str(value), span));
        Ok(())
    }

    fn scan_operator(&mut self, tokens: &mut Vec<Token>, c: char) -> Result<()> {
        let two = |kind| (kind, 2usize);
        let one = |kind| (kind, 1usize);

        let (kind, len) = match c {
            '=' if self.peek_char() == Some('=') => two(TokenKind::Equal),
            '=' => one(TokenKind::Assign),
            '!' if self.peek_char() == Some('=') => two(TokenKind::NotEqual),
            '<' if self.peek_char() == Some('=') => two(TokenKind::LessEqual),
            '<' => one(TokenKind::Less),
            '>' if self.peek_char() == Some('=') => two(TokenKind::GreaterEqual),
            '>' => one(TokenKind::Greater),
            '+' => one(TokenKind::Plus),
            '-' => one(TokenKind::Minus),
            '*' => one(TokenKind::Star),
            '/' => one(TokenKind::Slash),
            '%' => one(TokenKind::Percent),
            '^' => one(TokenKind::Caret),
            '|' => one(TokenKind::Pipe),
            '(' => one(TokenKind::LeftParen),
            ')' => one(TokenKind::RightParen),
            '[' => one(TokenKind::LeftBracket),
            ']' => one(TokenKind::RightBracket),
            '{' => one(TokenKind::LeftBrace),
            '}' => one(TokenKind::RightBrace),
            ',' => one(TokenKind::Comma),
            '.' => one(TokenKind::Dot),
            ':' => one(TokenKind::Colon),
            other => {
                return Err(AkizoraError::ParserError {
                    message: format!("unexpected character '{}'", other),
                    location: self.here(0).location(),
                });
            }
        };

        let span = self.here(len);
        self.advance_bytes(len);
        tokens.push(Token::new(kind, span));
        Ok(())
    }

    fn apply_pending_strip(&mut self) {
        match self.pending_strip {
            PendingStrip::None => {}
            PendingStrip::All => {
                while matches!(self.current_char(), Some(' ' | '\t' | '\r' | '\n')) {
                    self.advance();
                }
            }
            PendingStrip::SpacesAndNewline => {
                let bytes = self.source.as_bytes();
                let mut lookahead = self.pos;
                while lookahead < bytes.len() && (bytes[lookahead] == b' ' || bytes[lookahead] == b'\t')
                {
                    lookahead += 1;
                }
                if lookahead < bytes.len() && (bytes[lookahead] == b'\n' || bytes[lookahead] == b'\r')
                {
                    while self.pos < lookahead {
                        self.advance();
                    }
                    if self.current_char() == Some('\r') {
                        self.advance();
                    }
                    if self.current_char() == Some('\n') {
                        self.advance();
                    }
                }
            }
        }
        self.pending_strip = PendingStrip::None;
    }

    fn line_statement_indent(&self) -> Option<usize> {
        if self.config.line_statement.is_empty() {
            return None;
        }
        let bytes = self.source.as_bytes();
        let mut lookahead = self.pos;
        while lookahead < bytes.len() && (bytes[lookahead] == b' ' || bytes[lookahead] == b'\t') {
            lookahead += 1;
        }
        if self.source[lookahead..].starts_with(&self.config.line_statement) {
            Some(lookahead - self.pos)
        } else {
            None
        }
    }

    fn emit_text(&self, tokens: &mut Vec<Token>, from: usize, start_span: Span) {
        if from == self.pos {
            return;
        }
        let content = self.source[from..self.pos].to_string();
        let span = Span::new(start_span.line, start_span.column, from, self.pos - from);
        tokens.push(Token::new(TokenKind::Text(content), span));
    }

    fn here(&self, len: usize) -> Span {
        Span::new(self.line, self.column, self.pos, len)
    }

    fn eof(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn at_line_start(&self) -> bool {
        self.pos == 0 || self.source.as_bytes()[self.pos - 1] == b'\n'
    }

    fn current_char(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_char(&self) -> Option<char> {
        let mut chars = self.source[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.pos..].chars().next().unwrap();
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    fn advance_bytes(&mut self, n: usize) {
        let target = self.pos + n;
        while self.pos < target {
            self.advance();
        }
    }

    fn match_str(&self, s: &str) -> bool {
        self.source[self.pos..].starts_with(s)
    }
}

fn close_kind(kind: TagKind) -> TokenKind {
    match kind {
        TagKind::Expression => TokenKind::ExpressionClose,
        _ => TokenKind::StatementClose,
    }
}

/// Left-side whitespace control: when the run directly before the delimiter
/// ends in an all-whitespace line, drop that line's spaces and tabs but keep
/// the newline. A run that is all whitespace with no newline is dropped
/// entirely. Any other character on the final line disables the strip.
fn strip_preceding_text(tokens: &mut Vec<Token>) {
    let Some(last) = tokens.last_mut() else {
        return;
    };
    let TokenKind::Text(ref value) = last.kind else {
        return;
    };

    if let Some(newline_pos) = value.rfind('\n') {
        let suffix = &value[newline_pos + 1..];
        if !suffix.chars().all(|c| c == ' ' || c == '\t') {
            return;
        }
        let new_value = value[..=newline_pos].to_string();
        last.span.len = new_value.len();
        last.kind = TokenKind::Text(new_value);
    } else {
        if !value.chars().all(|c| c == ' ' || c == '\t') {
            return;
        }
        tokens.pop();
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '@' || c == '$'
}

fn is_ident_cont(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
