use crate::ast::{
    BinaryExpr, BinaryOp, CallExpr, Expr, ExpressionNode, ForNode, IfNode, IncludeNode, Node,
    SetNode, Template, UnaryExpr, UnaryOp,
};
use crate::callbacks::CallbackTable;
use crate::context::RenderContext;
use crate::error::{AkizoraError, Location, RenderError, Result, Span};
use crate::value::Value;
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Nested statements plus includes may not recurse deeper than this;
/// exceeding it is a render error, not a stack overflow
const MAX_DEPTH: usize = 200;

/// An evaluation failure, split by how graceful mode treats it
enum EvalError {
    /// A lookup that found nothing: unknown variable, unknown callback,
    /// bad member/index access. Graceful mode recovers these locally.
    Unresolved { message: String, location: Location },
    /// Everything else aborts the render in both modes
    Fatal(AkizoraError),
}

type EvalResult<T> = std::result::Result<T, EvalError>;

/// Tree-walking evaluator for a parsed template
pub struct Renderer<'a> {
    template: &'a Template,
    callbacks: &'a CallbackTable,
    templates: &'a HashMap<String, Template>,
    graceful: bool,
    depth: usize,
}

impl<'a> Renderer<'a> {
    pub fn new(
        template: &'a Template,
        callbacks: &'a CallbackTable,
        templates: &'a HashMap<String, Template>,
        graceful: bool,
    ) -> Self {
        Self {
            template,
            callbacks,
            templates,
            graceful,
            depth: 0,
        }
    }

    /// Render the template into the given context's output buffer
    pub fn render(&mut self, ctx: &mut RenderContext) -> Result<()> {
        let template = self.template;
        self.render_nodes(&template.nodes, ctx)
    }

    fn render_nodes(&mut self, nodes: &'a [Node], ctx: &mut RenderContext) -> Result<()> {
        for node in nodes {
            self.render_node(node, ctx)?;
        }
        Ok(())
    }

    fn render_node(&mut self, node: &'a Node, ctx: &mut RenderContext) -> Result<()> {
        self.depth += 1;
        let result = if self.depth > MAX_DEPTH {
            Err(AkizoraError::RenderError {
                message: "maximum recursion depth reached".to_string(),
                location: node_span(node).location(),
            })
        } else {
            self.render_node_inner(node, ctx)
        };
        self.depth -= 1;
        result
    }

    fn render_node_inner(&mut self, node: &'a Node, ctx: &mut RenderContext) -> Result<()> {
        match node {
            Node::Text(n) | Node::Raw(n) => {
                ctx.output.push_str(&n.content);
                Ok(())
            }
            Node::Expression(n) => self.render_expression(n, ctx),
            Node::Set(n) => self.render_set(n, ctx),
            Node::If(n) => self.render_if(n, ctx),
            Node::For(n) => self.render_for(n, ctx),
            Node::Include(n) => self.render_include(n, ctx),
        }
    }

    fn render_expression(&mut self, node: &'a ExpressionNode, ctx: &mut RenderContext) -> Result<()> {
        let root = match &node.root {
            Some(root) => root,
            None => {
                return Err(AkizoraError::RenderError {
                    message: "empty expression".to_string(),
                    location: node.span.location(),
                });
            }
        };

        match self.eval(root, ctx) {
            Ok(value) => {
                ctx.output.push_str(&value.render_string());
                Ok(())
            }
            Err(EvalError::Unresolved { message, location }) if self.graceful => {
                // substitute the verbatim source bytes and record the failure
                let original = node.span.text(&self.template.source).to_string();
                ctx.output.push_str(&original);
                ctx.errors.push(RenderError {
                    message,
                    original_text: original,
                    location,
                });
                Ok(())
            }
            Err(err) => Err(fatal(err)),
        }
    }

    fn render_set(&mut self, node: &'a SetNode, ctx: &mut RenderContext) -> Result<()> {
        match self.eval(&node.value, ctx) {
            Ok(value) => {
                ctx.set_path(&node.path, value);
                Ok(())
            }
            // a failing right-hand side binds nothing
            Err(EvalError::Unresolved { message, location }) if self.graceful => {
                self.record(ctx, message, node.value.span(), location);
                Ok(())
            }
            Err(err) => Err(fatal(err)),
        }
    }

    fn render_if(&mut self, node: &'a IfNode, ctx: &mut RenderContext) -> Result<()> {
        for (condition, body) in &node.branches {
            match self.eval(condition, ctx) {
                Ok(value) => {
                    if value.is_truthy() {
                        return self.render_nodes(body, ctx);
                    }
                }
                // a failing condition counts as false
                Err(EvalError::Unresolved { message, location }) if self.graceful => {
                    self.record(ctx, message, condition.span(), location);
                }
                Err(err) => return Err(fatal(err)),
            }
        }
        if let Some(body) = &node.else_body {
            return self.render_nodes(body, ctx);
        }
        Ok(())
    }

    fn render_for(&mut self, node: &'a ForNode, ctx: &mut RenderContext) -> Result<()> {
        let source = match self.eval(&node.source, ctx) {
            Ok(value) => value,
            // a failing iterable produces no iterations
            Err(EvalError::Unresolved { message, location }) if self.graceful => {
                self.record(ctx, message, node.source.span(), location);
                return Ok(());
            }
            Err(err) => return Err(fatal(err)),
        };

        match source {
            Value::Array(items) => {
                if node.key_name.is_some() {
                    return Err(AkizoraError::RenderError {
                        message: "expected object, got array".to_string(),
                        location: node.source.span().location(),
                    });
                }
                ctx.push_loop(items.len());
                for (index, item) in items.into_iter().enumerate() {
                    ctx.set_loop_index(index);
                    let mut bindings = HashMap::new();
                    bindings.insert(node.value_name.clone(), item);
                    ctx.push_scope(bindings);
                    let result = self.render_nodes(&node.body, ctx);
                    ctx.pop_scope();
                    if result.is_err() {
                        ctx.pop_loop();
                        return result;
                    }
                }
                ctx.pop_loop();
                Ok(())
            }
            Value::Object(map) => {
                let key_name = match &node.key_name {
                    Some(key_name) => key_name,
                    None => {
                        return Err(AkizoraError::RenderError {
                            message: "expected array, got object".to_string(),
                            location: node.source.span().location(),
                        });
                    }
                };
                ctx.push_loop(map.len());
                for (index, (key, value)) in map.into_iter().enumerate() {
                    ctx.set_loop_index(index);
                    let mut bindings = HashMap::new();
                    bindings.insert(key_name.clone(), Value::String(key));
                    bindings.insert(node.value_name.clone(), value);
                    ctx.push_scope(bindings);
                    let result = self.render_nodes(&node.body, ctx);
                    ctx.pop_scope();
                    if result.is_err() {
                        ctx.pop_loop();
                        return result;
                    }
                }
                ctx.pop_loop();
                Ok(())
            }
            other => Err(AkizoraError::RenderError {
                message: format!("expected array or object, got {}", other.type_name()),
                location: node.source.span().location(),
            }),
        }
    }

    /// Includes render into the same context, so locals and loop frames of
    /// the including template stay visible
    fn render_include(&mut self, node: &'a IncludeNode, ctx: &mut RenderContext) -> Result<()> {
        let templates = self.templates;
        let Some(template) = templates.get(&node.name) else {
            return Err(AkizoraError::RenderError {
                message: format!("include template '{}' not found", node.name),
                location: node.span.location(),
            });
        };
        let mut sub = Renderer {
            template,
            callbacks: self.callbacks,
            templates: self.templates,
            graceful: self.graceful,
            depth: self.depth,
        };
        sub.render_nodes(&template.nodes, ctx)
    }

    fn record(&self, ctx: &mut RenderContext, message: String, span: Span, location: Location) {
        let original_text = span.text(&self.template.source).to_string();
        ctx.errors.push(RenderError {
            message,
            original_text,
            location,
        });
    }

    // Expression evaluation

    fn eval(&mut self, expr: &'a Expr, ctx: &mut RenderContext) -> EvalResult<Value> {
        match expr {
            Expr::Literal(e) => Ok(e.value.clone()),
            Expr::Variable(e) => ctx.resolve(&e.path).ok_or_else(|| EvalError::Unresolved {
                message: format!("variable '{}' not found", e.name),
                location: e.span.location(),
            }),
            Expr::Unary(e) => self.eval_unary(e, ctx),
            Expr::Binary(e) => self.eval_binary(e, ctx),
            Expr::Call(e) => self.eval_call(e, ctx),
            Expr::Member(e) => {
                let object = self.eval(&e.object, ctx)?;
                match object {
                    Value::Object(map) => {
                        map.get(&e.key).cloned().ok_or_else(|| EvalError::Unresolved {
                            message: format!("key '{}' not found", e.key),
                            location: e.span.location(),
                        })
                    }
                    other => Err(EvalError::Unresolved {
                        message: format!(
                            "cannot access key '{}' in {}",
                            e.key,
                            other.type_name()
                        ),
                        location: e.span.location(),
                    }),
                }
            }
            Expr::Index(e) => {
                let object = self.eval(&e.object, ctx)?;
                let index = self.eval(&e.index, ctx)?;
                match (object, index) {
                    (Value::Array(items), index) => {
                        let i = index.as_int().ok_or_else(|| EvalError::Unresolved {
                            message: format!("cannot index array with {}", index.type_name()),
                            location: e.span.location(),
                        })?;
                        usize::try_from(i)
                            .ok()
                            .and_then(|i| items.get(i))
                            .cloned()
                            .ok_or_else(|| EvalError::Unresolved {
                                message: format!("array index {} out of range", i),
                                location: e.span.location(),
                            })
                    }
                    (Value::Object(map), Value::String(key)) => {
                        map.get(&key).cloned().ok_or_else(|| EvalError::Unresolved {
                            message: format!("key '{}' not found", key),
                            location: e.span.location(),
                        })
                    }
                    (other, _) => Err(EvalError::Unresolved {
                        message: format!("cannot index {}", other.type_name()),
                        location: e.span.location(),
                    }),
                }
            }
            Expr::Array(e) => {
                let mut items = Vec::with_capacity(e.items.len());
                for item in &e.items {
                    items.push(self.eval(item, ctx)?);
                }
                Ok(Value::Array(items))
            }
            Expr::Object(e) => {
                let mut map = IndexMap::new();
                for (key, value) in &e.entries {
                    map.insert(key.clone(), self.eval(value, ctx)?);
                }
                Ok(Value::Object(map))
            }
        }
    }

    fn eval_unary(&mut self, e: &'a UnaryExpr, ctx: &mut RenderContext) -> EvalResult<Value> {
        match e.op {
            UnaryOp::Not => {
                let value = self.eval(&e.operand, ctx)?;
                Ok(Value::Bool(!value.is_truthy()))
            }
            UnaryOp::Neg => {
                let value = self.eval(&e.operand, ctx)?;
                match value {
                    Value::Int(i) => Ok(i
                        .checked_neg()
                        .map(Value::Int)
                        .unwrap_or(Value::Float(-(i as f64)))),
                    Value::UInt(u) => Ok(match i64::try_from(u) {
                        Ok(i) => Value::Int(-i),
                        Err(_) => Value::Float(-(u as f64)),
                    }),
                    Value::Float(f) => Ok(Value::Float(-f)),
                    other => Err(self.type_error(
                        format!("unsupported operand type for '-': {}", other.type_name()),
                        e.span,
                    )),
                }
            }
            UnaryOp::Pos => {
                let value = self.eval(&e.operand, ctx)?;
                if value.is_number() {
                    Ok(value)
                } else {
                    Err(self.type_error(
                        format!("unsupported operand type for '+': {}", value.type_name()),
                        e.span,
                    ))
                }
            }
        }
    }

    fn eval_binary(&mut self, e: &'a BinaryExpr, ctx: &mut RenderContext) -> EvalResult<Value> {
        // short-circuit: the right operand of a decided and/or is neither
        // evaluated nor observed
        match e.op {
            BinaryOp::And => {
                let left = self.eval(&e.left, ctx)?;
                if !left.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                let right = self.eval(&e.right, ctx)?;
                return Ok(Value::Bool(right.is_truthy()));
            }
            BinaryOp::Or => {
                let left = self.eval(&e.left, ctx)?;
                if left.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                let right = self.eval(&e.right, ctx)?;
                return Ok(Value::Bool(right.is_truthy()));
            }
            _ => {}
        }

        let left = self.eval(&e.left, ctx)?;
        let right = self.eval(&e.right, ctx)?;

        match e.op {
            BinaryOp::Equal => Ok(Value::Bool(left == right)),
            BinaryOp::NotEqual => Ok(Value::Bool(left != right)),
            BinaryOp::Less => self.compare(e, &left, &right).map(|o| Value::Bool(o == Ordering::Less)),
            BinaryOp::LessEqual => self
                .compare(e, &left, &right)
                .map(|o| Value::Bool(o != Ordering::Greater)),
            BinaryOp::Greater => self
                .compare(e, &left, &right)
                .map(|o| Value::Bool(o == Ordering::Greater)),
            BinaryOp::GreaterEqual => self
                .compare(e, &left, &right)
                .map(|o| Value::Bool(o != Ordering::Less)),
            BinaryOp::In => match &right {
                Value::Array(items) => Ok(Value::Bool(items.contains(&left))),
                Value::Object(map) => Ok(Value::Bool(
                    left.as_str().map(|key| map.contains_key(key)).unwrap_or(false),
                )),
                other => Err(self.binary_type_error(e, &left, other)),
            },
            BinaryOp::Add => match (&left, &right) {
                (Value::String(a), Value::String(b)) => {
                    let mut result = a.clone();
                    result.push_str(b);
                    Ok(Value::String(result))
                }
                _ => self.arith(e, &left, &right, i64::checked_add, |a, b| a + b),
            },
            BinaryOp::Sub => self.arith(e, &left, &right, i64::checked_sub, |a, b| a - b),
            BinaryOp::Mul => self.arith(e, &left, &right, i64::checked_mul, |a, b| a * b),
            BinaryOp::Div => {
                let (a, b) = self.number_pair(e, &left, &right)?;
                if b == 0.0 {
                    return Err(self.type_error("division by zero", e.span));
                }
                Ok(Value::Float(a / b))
            }
            BinaryOp::Mod => match (int_value(&left), int_value(&right)) {
                (Some(a), Some(b)) => {
                    if b == 0 {
                        return Err(self.type_error("division by zero", e.span));
                    }
                    Ok(Value::Int(a % b))
                }
                _ => Err(self.binary_type_error(e, &left, &right)),
            },
            BinaryOp::Pow => match (int_value(&left), int_value(&right)) {
                // integer base with a non-negative integer exponent stays
                // integer; anything else is computed as double
                (Some(a), Some(b)) if b >= 0 => {
                    let result = u32::try_from(b).ok().and_then(|b| a.checked_pow(b));
                    Ok(result
                        .map(Value::Int)
                        .unwrap_or(Value::Float((a as f64).powf(b as f64))))
                }
                _ => {
                    let (a, b) = self.number_pair(e, &left, &right)?;
                    Ok(Value::Float(a.powf(b)))
                }
            },
            BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        }
    }

    /// Integer arithmetic when both operands are integers (overflow promotes
    /// to double), double arithmetic for any mixed pair
    fn arith(
        &self,
        e: &BinaryExpr,
        left: &Value,
        right: &Value,
        int_op: fn(i64, i64) -> Option<i64>,
        float_op: fn(f64, f64) -> f64,
    ) -> EvalResult<Value> {
        if let (Some(a), Some(b)) = (int_value(left), int_value(right)) {
            return Ok(int_op(a, b)
                .map(Value::Int)
                .unwrap_or(Value::Float(float_op(a as f64, b as f64))));
        }
        let (a, b) = self.number_pair(e, left, right)?;
        Ok(Value::Float(float_op(a, b)))
    }

    fn number_pair(&self, e: &BinaryExpr, left: &Value, right: &Value) -> EvalResult<(f64, f64)> {
        match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(self.binary_type_error(e, left, right)),
        }
    }

    fn compare(&self, e: &BinaryExpr, left: &Value, right: &Value) -> EvalResult<Ordering> {
        if left.is_number() && right.is_number() {
            return Ok(left.total_cmp(right));
        }
        if let (Value::String(a), Value::String(b)) = (left, right) {
            return Ok(a.cmp(b));
        }
        Err(self.binary_type_error(e, left, right))
    }

    fn eval_call(&mut self, call: &'a CallExpr, ctx: &mut RenderContext) -> EvalResult<Value> {
        // default(x, d) evaluates its first argument leniently: an
        // unresolved variable selects the default
        if call.name == "default" && call.args.len() == 2 {
            return match self.eval(&call.args[0], ctx) {
                Ok(value) => Ok(value),
                Err(EvalError::Unresolved { .. }) => self.eval(&call.args[1], ctx),
                Err(err) => Err(err),
            };
        }

        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            args.push(self.eval(arg, ctx)?);
        }

        let Some(callback) = self.callbacks.get(&call.name, args.len()).cloned() else {
            return Err(EvalError::Unresolved {
                message: format!("variable '{}' not found", call.name),
                location: call.span.location(),
            });
        };

        callback(&args).map_err(|err| {
            EvalError::Fatal(AkizoraError::RenderError {
                message: err.message,
                location: call.span.location(),
            })
        })
    }

    fn type_error(&self, message: impl Into<String>, span: Span) -> EvalError {
        EvalError::Fatal(AkizoraError::RenderError {
            message: message.into(),
            location: span.location(),
        })
    }

    fn binary_type_error(&self, e: &BinaryExpr, left: &Value, right: &Value) -> EvalError {
        self.type_error(
            format!(
                "unsupported operand types for '{}': {} and {}",
                e.op.symbol(),
                left.type_name(),
                right.type_name()
            ),
            e.span,
        )
    }
}

fn fatal(err: EvalError) -> AkizoraError {
    match err {
        EvalError::Unresolved { message, location } => {
            AkizoraError::RenderError { message, location }
        }
        EvalError::Fatal(err) => err,
    }
}

fn int_value(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::UInt(u) => i64::try_from(*u).ok(),
        _ => None,
    }
}

fn node_span(node: &Node) -> Span {
    match node {
        Node::Text(n) | Node::Raw(n) => n.span,
        Node::Expression(n) => n.span,
        Node::Set(n) => n.span,
        Node::If(n) => n.span,
        Node::For(n) => n.span,
        Node::Include(n) => n.span,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::SyntaxConfig;
    use crate::parser;
    use serde_json::json;

    fn render(source: &str, data: serde_json::Value) -> Result<String> {
        render_mode(source, data, false).map(|(output, _)| output)
    }

    fn render_graceful(source: &str, data: serde_json::Value) -> (String, Vec<RenderError>) {
        render_mode(source, data, true).unwrap()
    }

    fn render_mode(
        source: &str,
        data: serde_json::Value,
        graceful: bool,
    ) -> Result<(String, Vec<RenderError>)> {
        let config = SyntaxConfig::default();
        let template = parser::parse(source, &config)?;
        let callbacks = CallbackTable::with_builtins();
        let templates = HashMap::new();
        let mut ctx = RenderContext::new(Value::from_json(data));
        Renderer::new(&template, &callbacks, &templates, graceful).render(&mut ctx)?;
        Ok((ctx.output, ctx.errors))
    }

    #[test]
    fn test_render_text() {
        assert_eq!(render("Hello World!", json!({})).unwrap(), "Hello World!");
    }

    #[test]
    fn test_render_variable() {
        assert_eq!(
            render("Hello {{ name }}!", json!({"name": "Peter"})).unwrap(),
            "Hello Peter!"
        );
    }

    #[test]
    fn test_unknown_variable_strict() {
        let err = render("{{unknown}}", json!({})).unwrap_err();
        let AkizoraError::RenderError { message, location } = err else {
            panic!("expected render error");
        };
        assert_eq!(message, "variable 'unknown' not found");
        assert_eq!(location, Location::new(1, 3));
    }

    #[test]
    fn test_empty_expression() {
        let err = render("{{ }}", json!({})).unwrap_err();
        let AkizoraError::RenderError { message, location } = err else {
            panic!("expected render error");
        };
        assert_eq!(message, "empty expression");
        assert_eq!(location, Location::new(1, 1));
    }

    #[test]
    fn test_if_else_branches() {
        let data = json!({"age": 29});
        assert_eq!(
            render("{% if age == 28 %}28{% elif age == 29 %}29{% else %}other{% endif %}", data.clone()).unwrap(),
            "29"
        );
        assert_eq!(
            render("{% if age == 28 %}28{% elif age == 30 %}30{% else %}other{% endif %}", data).unwrap(),
            "other"
        );
    }

    #[test]
    fn test_loop_variables() {
        let result = render(
            "{% for n in names %}{{ loop.index }}:{{ n }} {% endfor %}",
            json!({"names": ["Jeff", "Seb"]}),
        )
        .unwrap();
        assert_eq!(result, "0:Jeff 1:Seb ");
    }

    #[test]
    fn test_loop_variable_unbound_after_loop() {
        let err = render("{% for x in [1] %}{% endfor %}{{ x }}", json!({})).unwrap_err();
        let AkizoraError::RenderError { message, .. } = err else {
            panic!("expected render error");
        };
        assert_eq!(message, "variable 'x' not found");
    }

    #[test]
    fn test_object_iteration_insertion_order() {
        let result = render(
            "{% for k, v in relatives %}{{ loop.index1 }}:{{ k }}={{ v }} {% endfor %}",
            json!({"relatives": {"mother": "Maria", "brother": "Chris"}}),
        )
        .unwrap();
        assert_eq!(result, "1:mother=Maria 2:brother=Chris ");
    }

    #[test]
    fn test_short_circuit_and() {
        assert_eq!(
            render("{% if 0 and undefined %}do{% else %}nothing{% endif %}", json!({})).unwrap(),
            "nothing"
        );
        let err = render("{% if 1 and undefined %}do{% else %}nothing{% endif %}", json!({}))
            .unwrap_err();
        let AkizoraError::RenderError { message, .. } = err else {
            panic!("expected render error");
        };
        assert_eq!(message, "variable 'undefined' not found");
    }

    #[test]
    fn test_set_binds_locally() {
        assert_eq!(render("{% set age=2+3 %}{{age}}", json!({"age": 29})).unwrap(), "5");
    }

    #[test]
    fn test_division_by_zero() {
        let err = render("{{ 1 / 0 }}", json!({})).unwrap_err();
        let AkizoraError::RenderError { message, .. } = err else {
            panic!("expected render error");
        };
        assert_eq!(message, "division by zero");
    }

    #[test]
    fn test_power_stays_integer() {
        assert_eq!(render("{{ 2 ^ 10 }}", json!({})).unwrap(), "1024");
    }

    #[test]
    fn test_mixed_arithmetic_promotes() {
        assert_eq!(render("{{ 1 + 2 }}", json!({})).unwrap(), "3");
        assert_eq!(render("{{ 1 + 0.5 }}", json!({})).unwrap(), "1.5");
    }

    #[test]
    fn test_graceful_substitution() {
        let (output, errors) =
            render_graceful("{{ name }} lives in {{ unknown_city }}", json!({"name": "Peter"}));
        assert_eq!(output, "Peter lives in {{ unknown_city }}");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "variable 'unknown_city' not found");
        assert_eq!(errors[0].original_text, "{{ unknown_city }}");
    }

    #[test]
    fn test_graceful_preserves_interior_whitespace() {
        let (output, _) = render_graceful("{{  unknown  }}", json!({}));
        assert_eq!(output, "{{  unknown  }}");
        let (output, _) = render_graceful("{{unknown }}", json!({}));
        assert_eq!(output, "{{unknown }}");
    }

    #[test]
    fn test_graceful_if_treats_failure_as_false() {
        let (output, errors) =
            render_graceful("{% if missing %}a{% else %}b{% endif %}", json!({}));
        assert_eq!(output, "b");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_graceful_for_produces_no_iterations() {
        let (output, errors) = render_graceful("{% for x in missing %}a{% endfor %}", json!({}));
        assert_eq!(output, "");
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_graceful_set_binds_nothing() {
        let (output, errors) = render_graceful(
            "{% set a = missing %}{% if existsIn(a, \"x\") %}y{% endif %}ok",
            json!({}),
        );
        assert_eq!(output, "ok");
        // the set failure and the failing `a` lookup in the condition
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_graceful_division_by_zero_still_fatal() {
        let result = render_mode("{{ 1 / 0 }}", json!({}), true);
        assert!(result.is_err());
    }
}
