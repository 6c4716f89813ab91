use crate::ast::{
    ArrayExpr, BinaryExpr, BinaryOp, CallExpr, Expr, ExpressionNode, ForNode, IfNode, IncludeNode,
    IndexExpr, LiteralExpr, MemberExpr, Node, ObjectExpr, PathSegment, SetNode, Template,
    TextNode, UnaryExpr, UnaryOp, VariableExpr,
};
use crate::error::{AkizoraError, Result, Span};
use crate::lexer::{Lexer, SyntaxConfig};
use crate::token::{Token, TokenKind};
use crate::value::Value;

/// Parse a template source into an AST using the given syntax configuration
pub fn parse(source: &str, config: &SyntaxConfig) -> Result<Template> {
    let tokens = Lexer::new(source, config).tokenize()?;
    let mut parser = Parser::new(tokens);
    let nodes = parser.parse_top_level()?;
    Ok(Template {
        nodes,
        source: source.to_string(),
    })
}

const IF_TERMINATORS: [TokenKind; 3] = [TokenKind::KwElif, TokenKind::KwElse, TokenKind::KwEndif];

/// Recursive descent parser for Akizora templates
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn parse_top_level(&mut self) -> Result<Vec<Node>> {
        self.parse_nodes_until(&[])
    }

    fn parse_nodes_until(&mut self, terminators: &[TokenKind]) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();
        while !self.is_eof() {
            if matches!(self.current().kind, TokenKind::StatementOpen)
                && terminators.contains(&self.peek().kind)
            {
                break;
            }
            nodes.push(self.parse_node()?);
        }
        Ok(nodes)
    }

    fn parse_node(&mut self) -> Result<Node> {
        match &self.current().kind {
            TokenKind::Text(_) => {
                let token = self.advance_token();
                let TokenKind::Text(content) = token.kind else {
                    unreachable!()
                };
                Ok(Node::Text(TextNode {
                    content,
                    span: token.span,
                }))
            }
            TokenKind::ExpressionOpen => {
                let open = self.advance_token();
                self.parse_expression_node(open)
            }
            TokenKind::StatementOpen => {
                let open = self.advance_token();
                self.parse_statement(open)
            }
            _ => Err(self.error_at_current(format!(
                "unexpected token '{}'",
                self.current().kind.describe()
            ))),
        }
    }

    fn parse_expression_node(&mut self, open: Token) -> Result<Node> {
        if matches!(self.current().kind, TokenKind::ExpressionClose) {
            let close = self.advance_token();
            return Ok(Node::Expression(ExpressionNode {
                root: None,
                span: join_spans(open.span, close.span),
            }));
        }
        if self.is_eof() {
            return Err(self.error_at_current("expected expression close, got '<eof>'"));
        }

        let root = self.parse_expression()?;

        if !matches!(self.current().kind, TokenKind::ExpressionClose) {
            return Err(self.error_at_current(format!(
                "expected expression close, got '{}'",
                self.current().kind.describe()
            )));
        }
        let close = self.advance_token();
        Ok(Node::Expression(ExpressionNode {
            root: Some(root),
            span: join_spans(open.span, close.span),
        }))
    }

    fn parse_statement(&mut self, open: Token) -> Result<Node> {
        match self.current().kind {
            TokenKind::KwIf => self.parse_if(open),
            TokenKind::KwFor => self.parse_for(open),
            TokenKind::KwSet => self.parse_set(open),
            TokenKind::KwInclude => self.parse_include(open),
            TokenKind::KwRaw => self.parse_raw(open),
            TokenKind::KwElif => Err(self.error_at_current("elif without matching if")),
            TokenKind::KwElse => Err(self.error_at_current("else without matching if")),
            TokenKind::KwEndif => Err(self.error_at_current("endif without matching if")),
            TokenKind::KwEndfor => Err(self.error_at_current("endfor without matching for")),
            TokenKind::KwEndraw => Err(self.error_at_current("endraw without matching raw")),
            _ => Err(self.error_at_current(format!(
                "expected statement, got '{}'",
                self.current().kind.describe()
            ))),
        }
    }

    fn parse_if(&mut self, open: Token) -> Result<Node> {
        self.advance(); // if
        let mut branches = Vec::new();
        let mut else_body = None;

        let condition = self.parse_expression()?;
        self.expect_statement_close()?;
        branches.push((condition, self.parse_nodes_until(&IF_TERMINATORS)?));

        loop {
            if self.is_eof() {
                return Err(self.error_at_current("unmatched if"));
            }
            self.advance(); // statement open
            match self.current().kind {
                // "elif" and "else if" are synonymous
                TokenKind::KwElif => {
                    self.advance();
                    let condition = self.parse_expression()?;
                    self.expect_statement_close()?;
                    branches.push((condition, self.parse_nodes_until(&IF_TERMINATORS)?));
                }
                TokenKind::KwElse if matches!(self.peek().kind, TokenKind::KwIf) => {
                    self.advance();
                    self.advance();
                    let condition = self.parse_expression()?;
                    self.expect_statement_close()?;
                    branches.push((condition, self.parse_nodes_until(&IF_TERMINATORS)?));
                }
                TokenKind::KwElse => {
                    self.advance();
                    self.expect_statement_close()?;
                    let body = self.parse_nodes_until(&[TokenKind::KwEndif])?;
                    if self.is_eof() {
                        return Err(self.error_at_current("unmatched if"));
                    }
                    else_body = Some(body);
                }
                TokenKind::KwEndif => {
                    self.advance();
                    self.expect_statement_close()?;
                    break;
                }
                _ => {
                    return Err(self.error_at_current(format!(
                        "expected statement, got '{}'",
                        self.current().kind.describe()
                    )));
                }
            }
        }

        Ok(Node::If(IfNode {
            branches,
            else_body,
            span: open.span,
        }))
    }

    fn parse_for(&mut self, open: Token) -> Result<Node> {
        self.advance(); // for
        let first = self.expect_identifier()?;
        let (key_name, value_name) = if matches!(self.current().kind, TokenKind::Comma) {
            self.advance();
            (Some(first), self.expect_identifier()?)
        } else {
            (None, first)
        };

        if !matches!(self.current().kind, TokenKind::KwIn) {
            return Err(self.error_at_current(format!(
                "expected 'in', got '{}'",
                self.current().kind.describe()
            )));
        }
        self.advance();

        let source = self.parse_expression()?;
        self.expect_statement_close()?;
        let body = self.parse_nodes_until(&[TokenKind::KwEndfor])?;
        if self.is_eof() {
            return Err(self.error_at_current("unmatched for"));
        }
        self.advance(); // statement open
        self.consume_keyword(TokenKind::KwEndfor, "endfor")?;
        self.expect_statement_close()?;

        Ok(Node::For(ForNode {
            value_name,
            key_name,
            source,
            body,
            span: open.span,
        }))
    }

    fn parse_set(&mut self, open: Token) -> Result<Node> {
        self.advance(); // set
        let mut path = vec![self.expect_identifier()?];
        while matches!(self.current().kind, TokenKind::Dot) {
            self.advance();
            path.push(self.expect_identifier()?);
        }

        if !matches!(self.current().kind, TokenKind::Assign) {
            return Err(self.error_at_current(format!(
                "expected '=', got '{}'",
                self.current().kind.describe()
            )));
        }
        self.advance();

        let value = self.parse_expression()?;
        self.expect_statement_close()?;

        Ok(Node::Set(SetNode {
            path,
            value,
            span: open.span,
        }))
    }

    fn parse_include(&mut self, open: Token) -> Result<Node> {
        self.advance(); // include
        let name = match &self.current().kind {
            TokenKind::Str(name) => name.clone(),
            other => {
                return Err(self.error_at_current(format!(
                    "expected string, got '{}'",
                    other.describe()
                )));
            }
        };
        self.advance();
        self.expect_statement_close()?;

        Ok(Node::Include(IncludeNode {
            name,
            span: open.span,
        }))
    }

    fn parse_raw(&mut self, _open: Token) -> Result<Node> {
        self.advance(); // raw
        let close = self.expect_statement_close()?;

        let (content, span) = match &self.current().kind {
            TokenKind::Text(_) => {
                let token = self.advance_token();
                let TokenKind::Text(content) = token.kind else {
                    unreachable!()
                };
                (content, token.span)
            }
            _ => (String::new(), close.span),
        };

        if self.is_eof() {
            return Err(AkizoraError::ParserError {
                message: "unmatched raw".to_string(),
                location: close.span.location(),
            });
        }
        self.advance(); // statement open
        self.consume_keyword(TokenKind::KwEndraw, "endraw")?;
        self.expect_statement_close()?;

        Ok(Node::Raw(TextNode { content, span }))
    }

    // Expression grammar, lowest precedence first

    fn parse_expression(&mut self) -> Result<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while matches!(self.current().kind, TokenKind::KwOr) {
            self.advance();
            let right = self.parse_and()?;
            left = binary(BinaryOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_not()?;
        while matches!(self.current().kind, TokenKind::KwAnd) {
            self.advance();
            let right = self.parse_not()?;
            left = binary(BinaryOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr> {
        if matches!(self.current().kind, TokenKind::KwNot) {
            let token = self.advance_token();
            let operand = self.parse_not()?;
            let span = join_spans(token.span, operand.span());
            return Ok(Expr::Unary(UnaryExpr {
                op: UnaryOp::Not,
                operand: Box::new(operand),
                span,
            }));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Equal => BinaryOp::Equal,
                TokenKind::NotEqual => BinaryOp::NotEqual,
                TokenKind::Less => BinaryOp::Less,
                TokenKind::LessEqual => BinaryOp::LessEqual,
                TokenKind::Greater => BinaryOp::Greater,
                TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
                TokenKind::KwIn => BinaryOp::In,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.parse_power()?;
        loop {
            let op = match self.current().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_power()?;
            left = binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_power(&mut self) -> Result<Expr> {
        let left = self.parse_unary()?;
        if matches!(self.current().kind, TokenKind::Caret) {
            self.advance();
            // right-associative
            let right = self.parse_power()?;
            return Ok(binary(BinaryOp::Pow, left, right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let op = match self.current().kind {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Pos,
            _ => return self.parse_pipe(),
        };
        let token = self.advance_token();
        let operand = self.parse_unary()?;
        let span = join_spans(token.span, operand.span());
        Ok(Expr::Unary(UnaryExpr {
            op,
            operand: Box::new(operand),
            span,
        }))
    }

    fn parse_pipe(&mut self) -> Result<Expr> {
        let mut left = self.parse_postfix()?;
        while matches!(self.current().kind, TokenKind::Pipe) {
            self.advance();
            let name_token = self.current().clone();
            let name = self.expect_identifier()?;
            let mut args = vec![left];
            if matches!(self.current().kind, TokenKind::LeftParen) {
                args.extend(self.parse_call_args()?);
            }
            left = Expr::Call(CallExpr {
                name,
                args,
                span: name_token.span,
            });
        }
        Ok(left)
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_atom()?;
        loop {
            match self.current().kind {
                TokenKind::Dot => {
                    self.advance();
                    expr = self.parse_member(expr)?;
                }
                TokenKind::LeftBracket => {
                    self.advance();
                    let index = self.parse_expression()?;
                    if !matches!(self.current().kind, TokenKind::RightBracket) {
                        return Err(self.error_at_current(format!(
                            "expected ']', got '{}'",
                            self.current().kind.describe()
                        )));
                    }
                    let close = self.advance_token();
                    expr = attach_index(expr, index, close.span);
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_member(&mut self, object: Expr) -> Result<Expr> {
        match self.current().kind.clone() {
            TokenKind::Ident(name) => {
                let token = self.advance_token();
                // member-style call: x.f(args) is f(x, args)
                if matches!(self.current().kind, TokenKind::LeftParen) {
                    let mut args = vec![object];
                    args.extend(self.parse_call_args()?);
                    return Ok(Expr::Call(CallExpr {
                        name,
                        args,
                        span: token.span,
                    }));
                }
                Ok(extend_path(object, PathSegment::Key(name), token.span))
            }
            TokenKind::Int(index) => {
                let token = self.advance_token();
                Ok(extend_path(object, PathSegment::Index(index), token.span))
            }
            other => Err(self.error_at_current(format!(
                "expected identifier, got '{}'",
                other.describe()
            ))),
        }
    }

    fn parse_atom(&mut self) -> Result<Expr> {
        match self.current().kind.clone() {
            TokenKind::Int(n) => Ok(self.literal(Value::Int(n))),
            TokenKind::Float(f) => Ok(self.literal(Value::Float(f))),
            TokenKind::Str(s) => Ok(self.literal(Value::String(s))),
            TokenKind::KwTrue => Ok(self.literal(Value::Bool(true))),
            TokenKind::KwFalse => Ok(self.literal(Value::Bool(false))),
            TokenKind::KwNull => Ok(self.literal(Value::Null)),
            TokenKind::Ident(name) => {
                let token = self.advance_token();
                if matches!(self.current().kind, TokenKind::LeftParen) {
                    let args = self.parse_call_args()?;
                    return Ok(Expr::Call(CallExpr {
                        name,
                        args,
                        span: token.span,
                    }));
                }
                Ok(Expr::Variable(VariableExpr {
                    path: vec![PathSegment::Key(name.clone())],
                    name,
                    span: token.span,
                }))
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                if !matches!(self.current().kind, TokenKind::RightParen) {
                    return Err(self.error_at_current(format!(
                        "expected ')', got '{}'",
                        self.current().kind.describe()
                    )));
                }
                self.advance();
                Ok(expr)
            }
            TokenKind::LeftBracket => self.parse_array_literal(),
            TokenKind::LeftBrace => self.parse_object_literal(),
            other => Err(self.error_at_current(format!(
                "unexpected token '{}'",
                other.describe()
            ))),
        }
    }

    fn parse_array_literal(&mut self) -> Result<Expr> {
        let open = self.advance_token();
        let mut items = Vec::new();
        if matches!(self.current().kind, TokenKind::RightBracket) {
            let close = self.advance_token();
            return Ok(Expr::Array(ArrayExpr {
                items,
                span: join_spans(open.span, close.span),
            }));
        }
        loop {
            items.push(self.parse_expression()?);
            match self.current().kind {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RightBracket => {
                    let close = self.advance_token();
                    return Ok(Expr::Array(ArrayExpr {
                        items,
                        span: join_spans(open.span, close.span),
                    }));
                }
                _ => {
                    return Err(self.error_at_current(format!(
                        "expected ',' or ']', got '{}'",
                        self.current().kind.describe()
                    )));
                }
            }
        }
    }

    fn parse_object_literal(&mut self) -> Result<Expr> {
        let open = self.advance_token();
        let mut entries = Vec::new();
        if matches!(self.current().kind, TokenKind::RightBrace) {
            let close = self.advance_token();
            return Ok(Expr::Object(ObjectExpr {
                entries,
                span: join_spans(open.span, close.span),
            }));
        }
        loop {
            let key = match self.current().kind.clone() {
                TokenKind::Str(s) => s,
                TokenKind::Ident(s) => s,
                other => {
                    return Err(self.error_at_current(format!(
                        "expected object key, got '{}'",
                        other.describe()
                    )));
                }
            };
            self.advance();
            if !matches!(self.current().kind, TokenKind::Colon) {
                return Err(self.error_at_current(format!(
                    "expected ':', got '{}'",
                    self.current().kind.describe()
                )));
            }
            self.advance();
            entries.push((key, self.parse_expression()?));
            match self.current().kind {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RightBrace => {
                    let close = self.advance_token();
                    return Ok(Expr::Object(ObjectExpr {
                        entries,
                        span: join_spans(open.span, close.span),
                    }));
                }
                _ => {
                    return Err(self.error_at_current(format!(
                        "expected ',' or '}}', got '{}'",
                        self.current().kind.describe()
                    )));
                }
            }
        }
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expr>> {
        self.advance(); // (
        let mut args = Vec::new();
        if matches!(self.current().kind, TokenKind::RightParen) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            match self.current().kind {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RightParen => {
                    self.advance();
                    return Ok(args);
                }
                _ => {
                    return Err(self.error_at_current(format!(
                        "expected ',' or ')', got '{}'",
                        self.current().kind.describe()
                    )));
                }
            }
        }
    }

    // Token stream helpers

    fn literal(&mut self, value: Value) -> Expr {
        let token = self.advance_token();
        Expr::Literal(LiteralExpr {
            value,
            span: token.span,
        })
    }

    fn expect_identifier(&mut self) -> Result<String> {
        match self.current().kind.clone() {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(self.error_at_current(format!(
                "expected identifier, got '{}'",
                other.describe()
            ))),
        }
    }

    fn expect_statement_close(&mut self) -> Result<Token> {
        if !matches!(self.current().kind, TokenKind::StatementClose) {
            return Err(self.error_at_current(format!(
                "expected statement close, got '{}'",
                self.current().kind.describe()
            )));
        }
        Ok(self.advance_token())
    }

    fn consume_keyword(&mut self, expected: TokenKind, word: &str) -> Result<()> {
        if self.current().kind != expected {
            return Err(self.error_at_current(format!(
                "expected '{}', got '{}'",
                word,
                self.current().kind.describe()
            )));
        }
        self.advance();
        Ok(())
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek(&self) -> &Token {
        self.tokens
            .get(self.pos + 1)
            .unwrap_or_else(|| &self.tokens[self.tokens.len() - 1])
    }

    fn is_eof(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn advance_token(&mut self) -> Token {
        let token = self.current().clone();
        self.advance();
        token
    }

    fn error_at_current(&self, message: impl Into<String>) -> AkizoraError {
        AkizoraError::ParserError {
            message: message.into(),
            location: self.current().span.location(),
        }
    }
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    let span = join_spans(left.span(), right.span());
    Expr::Binary(BinaryExpr {
        op,
        left: Box::new(left),
        right: Box::new(right),
        span,
    })
}

fn join_spans(start: Span, end: Span) -> Span {
    Span::new(
        start.line,
        start.column,
        start.offset,
        end.end().saturating_sub(start.offset),
    )
}

/// Grow a variable path with another plain segment, or fall back to a
/// `Member`/`Index` node when the base is a general expression
fn extend_path(object: Expr, segment: PathSegment, segment_span: Span) -> Expr {
    match object {
        Expr::Variable(mut var) => {
            match &segment {
                PathSegment::Key(key) => {
                    var.name.push('.');
                    var.name.push_str(key);
                }
                PathSegment::Index(index) => {
                    var.name.push('.');
                    var.name.push_str(&index.to_string());
                }
            }
            var.path.push(segment);
            var.span = join_spans(var.span, segment_span);
            Expr::Variable(var)
        }
        other => {
            let span = join_spans(other.span(), segment_span);
            match segment {
                PathSegment::Key(key) => Expr::Member(MemberExpr {
                    object: Box::new(other),
                    key,
                    span,
                }),
                PathSegment::Index(index) => Expr::Index(IndexExpr {
                    object: Box::new(other),
                    index: Box::new(Expr::Literal(LiteralExpr {
                        value: Value::Int(index),
                        span: segment_span,
                    })),
                    span,
                }),
            }
        }
    }
}

/// `a[0]` and `a["key"]` over a plain path keep building the path;
/// computed indices become `Index` nodes
fn attach_index(object: Expr, index: Expr, close_span: Span) -> Expr {
    if let Expr::Variable(_) = &object {
        match &index {
            Expr::Literal(LiteralExpr {
                value: Value::Int(n),
                ..
            }) => return extend_path(object, PathSegment::Index(*n), close_span),
            Expr::Literal(LiteralExpr {
                value: Value::String(key),
                ..
            }) => return extend_path(object, PathSegment::Key(key.clone()), close_span),
            _ => {}
        }
    }
    let span = join_spans(object.span(), close_span);
    Expr::Index(IndexExpr {
        object: Box::new(object),
        index: Box::new(index),
        span,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_default(source: &str) -> Result<Template> {
        parse(source, &SyntaxConfig::default())
    }

    fn parse_error(source: &str) -> String {
        match parse_default(source) {
            Err(AkizoraError::ParserError { message, .. }) => message,
            other => panic!("expected parser error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_text() {
        let template = parse_default("Hello, world!").unwrap();
        assert_eq!(template.nodes.len(), 1);
        assert!(matches!(&template.nodes[0], Node::Text(n) if n.content == "Hello, world!"));
    }

    #[test]
    fn test_parse_variable_path() {
        let template = parse_default("{{ user.profile.name }}").unwrap();
        let Node::Expression(node) = &template.nodes[0] else {
            panic!("expected expression node");
        };
        let Some(Expr::Variable(var)) = &node.root else {
            panic!("expected variable root");
        };
        assert_eq!(var.name, "user.profile.name");
        assert_eq!(var.path.len(), 3);
    }

    #[test]
    fn test_parse_numeric_path_segment() {
        let template = parse_default("{{ names.1 }}").unwrap();
        let Node::Expression(node) = &template.nodes[0] else {
            panic!("expected expression node");
        };
        let Some(Expr::Variable(var)) = &node.root else {
            panic!("expected variable root");
        };
        assert_eq!(var.path[1], PathSegment::Index(1));
    }

    #[test]
    fn test_expression_span_includes_delimiters() {
        let source = "Hello {{ name }}!";
        let template = parse_default(source).unwrap();
        let Node::Expression(node) = &template.nodes[1] else {
            panic!("expected expression node");
        };
        assert_eq!(node.span.text(source), "{{ name }}");
    }

    #[test]
    fn test_empty_expression_parses() {
        let template = parse_default("{{ }}").unwrap();
        let Node::Expression(node) = &template.nodes[0] else {
            panic!("expected expression node");
        };
        assert!(node.root.is_none());
    }

    #[test]
    fn test_unclosed_expression() {
        assert_eq!(parse_error("{{"), "expected expression close, got '<eof>'");
    }

    #[test]
    fn test_parse_if_elif_else() {
        let template =
            parse_default("{% if a %}1{% elif b %}2{% else %}3{% endif %}").unwrap();
        let Node::If(node) = &template.nodes[0] else {
            panic!("expected if node");
        };
        assert_eq!(node.branches.len(), 2);
        assert!(node.else_body.is_some());
    }

    #[test]
    fn test_else_if_is_elif() {
        let template =
            parse_default("{% if a %}1{% else if b %}2{% else %}3{% endif %}").unwrap();
        let Node::If(node) = &template.nodes[0] else {
            panic!("expected if node");
        };
        assert_eq!(node.branches.len(), 2);
        assert!(node.else_body.is_some());
    }

    #[test]
    fn test_dangling_elif() {
        assert_eq!(
            parse_error("{% elif age == 29 %}29{% endif %}"),
            "elif without matching if"
        );
    }

    #[test]
    fn test_unmatched_if() {
        assert_eq!(
            parse_error("{% if is_happy %}{% if is_happy %}{% endif %}"),
            "unmatched if"
        );
    }

    #[test]
    fn test_bad_statement_keyword() {
        assert_eq!(
            parse_error("{% if is_happy %}{% else if is_happy %}{% end if %}"),
            "expected statement, got 'end'"
        );
    }

    #[test]
    fn test_parse_for() {
        let template = parse_default("{% for n in names %}{{ n }}{% endfor %}").unwrap();
        let Node::For(node) = &template.nodes[0] else {
            panic!("expected for node");
        };
        assert_eq!(node.value_name, "n");
        assert!(node.key_name.is_none());
        assert_eq!(node.body.len(), 1);
    }

    #[test]
    fn test_parse_for_key_value() {
        let template = parse_default("{% for k, v in obj %}{% endfor %}").unwrap();
        let Node::For(node) = &template.nodes[0] else {
            panic!("expected for node");
        };
        assert_eq!(node.key_name.as_deref(), Some("k"));
        assert_eq!(node.value_name, "v");
    }

    #[test]
    fn test_for_in_typo() {
        assert_eq!(
            parse_error("{% for name ins names %}a{% endfor %}"),
            "expected 'in', got 'ins'"
        );
    }

    #[test]
    fn test_parse_set_dotted_path() {
        let template = parse_default("{% set a.b.c = 1 %}").unwrap();
        let Node::Set(node) = &template.nodes[0] else {
            panic!("expected set node");
        };
        assert_eq!(node.path, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_include_requires_string() {
        assert_eq!(
            parse_error("{% include greeting %}"),
            "expected string, got 'greeting'"
        );
    }

    #[test]
    fn test_parse_raw() {
        let template = parse_default("{% raw %}{{ name }}{% endraw %}").unwrap();
        let Node::Raw(node) = &template.nodes[0] else {
            panic!("expected raw node");
        };
        assert_eq!(node.content, "{{ name }}");
    }

    #[test]
    fn test_unmatched_raw() {
        assert_eq!(parse_error("{% raw %}{{ name }}"), "unmatched raw");
    }

    #[test]
    fn test_dangling_endraw() {
        assert_eq!(parse_error("{% endraw %}"), "endraw without matching raw");
    }

    #[test]
    fn test_pipe_desugars_to_call() {
        let template = parse_default("{{ name | upper }}").unwrap();
        let Node::Expression(node) = &template.nodes[0] else {
            panic!("expected expression node");
        };
        let Some(Expr::Call(call)) = &node.root else {
            panic!("expected call root");
        };
        assert_eq!(call.name, "upper");
        assert_eq!(call.args.len(), 1);
    }

    #[test]
    fn test_pipe_with_args() {
        let template = parse_default(r#"{{ items | join(",") }}"#).unwrap();
        let Node::Expression(node) = &template.nodes[0] else {
            panic!("expected expression node");
        };
        let Some(Expr::Call(call)) = &node.root else {
            panic!("expected call root");
        };
        assert_eq!(call.name, "join");
        assert_eq!(call.args.len(), 2);
    }

    #[test]
    fn test_member_call_desugars_to_call() {
        let template = parse_default("{{ items.length() }}").unwrap();
        let Node::Expression(node) = &template.nodes[0] else {
            panic!("expected expression node");
        };
        let Some(Expr::Call(call)) = &node.root else {
            panic!("expected call root");
        };
        assert_eq!(call.name, "length");
        assert_eq!(call.args.len(), 1);
        assert!(matches!(&call.args[0], Expr::Variable(v) if v.name == "items"));
    }

    #[test]
    fn test_power_is_right_associative() {
        let template = parse_default("{{ 2 ^ 3 ^ 2 }}").unwrap();
        let Node::Expression(node) = &template.nodes[0] else {
            panic!("expected expression node");
        };
        let Some(Expr::Binary(outer)) = &node.root else {
            panic!("expected binary root");
        };
        assert_eq!(outer.op, BinaryOp::Pow);
        assert!(matches!(&*outer.left, Expr::Literal(_)));
        assert!(matches!(&*outer.right, Expr::Binary(b) if b.op == BinaryOp::Pow));
    }

    #[test]
    fn test_precedence_or_lowest() {
        let template = parse_default("{{ a and b or c }}").unwrap();
        let Node::Expression(node) = &template.nodes[0] else {
            panic!("expected expression node");
        };
        let Some(Expr::Binary(outer)) = &node.root else {
            panic!("expected binary root");
        };
        assert_eq!(outer.op, BinaryOp::Or);
    }

    #[test]
    fn test_array_and_object_literals() {
        let template = parse_default(r#"{{ [1, 2, x] }}{{ {"a": 1, "b": y} }}"#).unwrap();
        let Node::Expression(first) = &template.nodes[0] else {
            panic!("expected expression node");
        };
        assert!(matches!(&first.root, Some(Expr::Array(a)) if a.items.len() == 3));
        let Node::Expression(second) = &template.nodes[1] else {
            panic!("expected expression node");
        };
        assert!(matches!(&second.root, Some(Expr::Object(o)) if o.entries.len() == 2));
    }

    #[test]
    fn test_computed_index_is_index_node() {
        let template = parse_default("{{ a[i] }}").unwrap();
        let Node::Expression(node) = &template.nodes[0] else {
            panic!("expected expression node");
        };
        assert!(matches!(&node.root, Some(Expr::Index(_))));
    }

    #[test]
    fn test_literal_index_extends_path() {
        let template = parse_default(r#"{{ a["k"][0] }}"#).unwrap();
        let Node::Expression(node) = &template.nodes[0] else {
            panic!("expected expression node");
        };
        let Some(Expr::Variable(var)) = &node.root else {
            panic!("expected variable root");
        };
        assert_eq!(
            var.path,
            vec![
                PathSegment::Key("a".to_string()),
                PathSegment::Key("k".to_string()),
                PathSegment::Index(0),
            ]
        );
    }
}
