use crate::error::Span;
use crate::value::Value;

/// Root node representing a parsed template.
///
/// Keeps the original source so graceful mode can substitute the verbatim
/// bytes of a failed expression back into the output.
#[derive(Debug, Clone)]
pub struct Template {
    pub nodes: Vec<Node>,
    pub source: String,
}

impl Template {
    /// Number of variable references in the template, counting occurrences
    /// in output expressions, statement conditions, loop sources, set
    /// right-hand sides and call arguments alike
    pub fn count_variables(&self) -> usize {
        count_in_nodes(&self.nodes)
    }
}

/// All statement-level AST node types
#[derive(Debug, Clone)]
pub enum Node {
    Text(TextNode),
    Expression(ExpressionNode),
    Set(SetNode),
    If(IfNode),
    For(ForNode),
    Include(IncludeNode),
    Raw(TextNode),
}

/// Raw text content, emitted as-is
#[derive(Debug, Clone)]
pub struct TextNode {
    pub content: String,
    pub span: Span,
}

/// An output expression. `span` covers the whole `{{ … }}` run including
/// delimiters; `root` is `None` for an empty expression.
#[derive(Debug, Clone)]
pub struct ExpressionNode {
    pub root: Option<Expr>,
    pub span: Span,
}

/// Assignment: `{% set a.b.c = expr %}`
#[derive(Debug, Clone)]
pub struct SetNode {
    pub path: Vec<String>,
    pub value: Expr,
    pub span: Span,
}

/// Conditional with its ordered branches; the first truthy condition wins
#[derive(Debug, Clone)]
pub struct IfNode {
    pub branches: Vec<(Expr, Vec<Node>)>,
    pub else_body: Option<Vec<Node>>,
    pub span: Span,
}

/// Loop over an array (`for x in expr`) or an object
/// (`for key, value in expr`)
#[derive(Debug, Clone)]
pub struct ForNode {
    pub value_name: String,
    pub key_name: Option<String>,
    pub source: Expr,
    pub body: Vec<Node>,
    pub span: Span,
}

/// Include of a named template; the name is always a string literal
#[derive(Debug, Clone)]
pub struct IncludeNode {
    pub name: String,
    pub span: Span,
}

/// Expression tree nodes
#[derive(Debug, Clone)]
pub enum Expr {
    Literal(LiteralExpr),
    Variable(VariableExpr),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Call(CallExpr),
    Member(MemberExpr),
    Index(IndexExpr),
    Array(ArrayExpr),
    Object(ObjectExpr),
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Literal(e) => e.span,
            Expr::Variable(e) => e.span,
            Expr::Unary(e) => e.span,
            Expr::Binary(e) => e.span,
            Expr::Call(e) => e.span,
            Expr::Member(e) => e.span,
            Expr::Index(e) => e.span,
            Expr::Array(e) => e.span,
            Expr::Object(e) => e.span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LiteralExpr {
    pub value: Value,
    pub span: Span,
}

/// One step of a variable path: `brother.daughter0.name`, `names.1`
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    Key(String),
    Index(i64),
}

/// A data lookup along a path of plain identifier/string/integer segments.
/// `name` is the dotted form used in "variable '…' not found" messages.
#[derive(Debug, Clone)]
pub struct VariableExpr {
    pub path: Vec<PathSegment>,
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Pos,
}

#[derive(Debug, Clone)]
pub struct UnaryExpr {
    pub op: UnaryOp,
    pub operand: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    In,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl BinaryOp {
    /// Operator symbol for error messages
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Or => "or",
            BinaryOp::And => "and",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::In => "in",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "^",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub span: Span,
}

/// A callback invocation. Pipe syntax and member-style calls are desugared
/// into this form by the parser: `x | f(a)` and `x.f(a)` both become
/// `f(x, a)`.
#[derive(Debug, Clone)]
pub struct CallExpr {
    pub name: String,
    pub args: Vec<Expr>,
    pub span: Span,
}

/// Key access on an arbitrary expression (paths use `Variable` instead)
#[derive(Debug, Clone)]
pub struct MemberExpr {
    pub object: Box<Expr>,
    pub key: String,
    pub span: Span,
}

/// `object[index]` with a computed index
#[derive(Debug, Clone)]
pub struct IndexExpr {
    pub object: Box<Expr>,
    pub index: Box<Expr>,
    pub span: Span,
}

/// List literal `[a, b, c]`
#[derive(Debug, Clone)]
pub struct ArrayExpr {
    pub items: Vec<Expr>,
    pub span: Span,
}

/// Object literal `{"k": v, …}`
#[derive(Debug, Clone)]
pub struct ObjectExpr {
    pub entries: Vec<(String, Expr)>,
    pub span: Span,
}

fn count_in_nodes(nodes: &[Node]) -> usize {
    nodes.iter().map(count_in_node).sum()
}

fn count_in_node(node: &Node) -> usize {
    match node {
        Node::Text(_) | Node::Raw(_) | Node::Include(_) => 0,
        Node::Expression(n) => n.root.as_ref().map_or(0, count_in_expr),
        Node::Set(n) => count_in_expr(&n.value),
        Node::If(n) => {
            n.branches
                .iter()
                .map(|(condition, body)| count_in_expr(condition) + count_in_nodes(body))
                .sum::<usize>()
                + n.else_body.as_deref().map_or(0, count_in_nodes)
        }
        Node::For(n) => count_in_expr(&n.source) + count_in_nodes(&n.body),
    }
}

fn count_in_expr(expr: &Expr) -> usize {
    match expr {
        Expr::Literal(_) => 0,
        Expr::Variable(_) => 1,
        Expr::Unary(e) => count_in_expr(&e.operand),
        Expr::Binary(e) => count_in_expr(&e.left) + count_in_expr(&e.right),
        Expr::Call(e) => e.args.iter().map(count_in_expr).sum(),
        Expr::Member(e) => count_in_expr(&e.object),
        Expr::Index(e) => count_in_expr(&e.object) + count_in_expr(&e.index),
        Expr::Array(e) => e.items.iter().map(count_in_expr).sum(),
        Expr::Object(e) => e.entries.iter().map(|(_, value)| count_in_expr(value)).sum(),
    }
}
