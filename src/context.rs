use crate::ast::PathSegment;
use crate::error::RenderError;
use crate::value::Value;
use indexmap::IndexMap;
use std::collections::HashMap;

/// One active loop, innermost last on the stack.
///
/// `index` is updated per iteration; `len` never changes. The `parent`
/// chain exposed to templates is simply the previous stack entry.
#[derive(Debug, Clone, Copy)]
pub struct LoopFrame {
    pub index: usize,
    pub len: usize,
}

impl LoopFrame {
    pub fn is_first(&self) -> bool {
        self.index == 0
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 == self.len
    }
}

/// Per-render mutable state: the data root, local bindings, loop frames,
/// the output buffer and the graceful-mode diagnostics list
pub struct RenderContext {
    root: Value,
    locals: Vec<HashMap<String, Value>>,
    loop_stack: Vec<LoopFrame>,
    pub output: String,
    pub errors: Vec<RenderError>,
}

impl RenderContext {
    pub fn new(root: Value) -> Self {
        Self {
            root,
            // base scope holds top-level `set` bindings
            locals: vec![HashMap::new()],
            loop_stack: Vec::new(),
            output: String::new(),
            errors: Vec::new(),
        }
    }

    /// Push a scope for a loop body iteration
    pub fn push_scope(&mut self, bindings: HashMap<String, Value>) {
        self.locals.push(bindings);
    }

    pub fn pop_scope(&mut self) {
        self.locals.pop();
    }

    pub fn push_loop(&mut self, len: usize) {
        self.loop_stack.push(LoopFrame { index: 0, len });
    }

    pub fn set_loop_index(&mut self, index: usize) {
        if let Some(frame) = self.loop_stack.last_mut() {
            frame.index = index;
        }
    }

    pub fn pop_loop(&mut self) {
        self.loop_stack.pop();
    }

    /// Resolve a variable path. Local scopes are searched innermost-first
    /// with the full path, falling back to the data root. A key that is
    /// absent under a matching container falls through outward, so a
    /// `set brother.name = …` shadows that path without hiding
    /// `brother.daughters`. A wrong-typed intermediate stops resolution
    /// instead: a binding that replaced an object hides the whole path.
    /// Returns `None` for any miss along the way.
    pub fn resolve(&self, path: &[PathSegment]) -> Option<Value> {
        if let Some(PathSegment::Key(head)) = path.first() {
            if head == "loop" && !self.loop_stack.is_empty() {
                return self.resolve_loop(&path[1..]);
            }
        }

        for scope in self.locals.iter().rev() {
            if let Some(PathSegment::Key(head)) = path.first() {
                if let Some(value) = scope.get(head) {
                    match walk(value, &path[1..]) {
                        WalkResult::Found(found) => return Some(found),
                        WalkResult::Missing => {}
                        WalkResult::Mismatch => return None,
                    }
                }
            }
        }

        match walk(&self.root, path) {
            WalkResult::Found(found) => Some(found),
            WalkResult::Missing | WalkResult::Mismatch => None,
        }
    }

    /// Resolve `loop`, `loop.index`, `loop.parent.is_last`, …
    fn resolve_loop(&self, rest: &[PathSegment]) -> Option<Value> {
        // depth counts from the innermost frame; `parent` steps outwards
        let mut depth = self.loop_stack.len().checked_sub(1)?;
        let mut rest = rest;

        while let Some(PathSegment::Key(key)) = rest.first() {
            if key != "parent" {
                break;
            }
            rest = &rest[1..];
            match depth.checked_sub(1) {
                Some(d) => depth = d,
                // loop.parent at the outermost loop is null
                None => return if rest.is_empty() { Some(Value::Null) } else { None },
            }
        }

        let frame = &self.loop_stack[depth];
        match rest {
            [] => Some(self.loop_object(depth)),
            [PathSegment::Key(attr)] => match attr.as_str() {
                "index" => Some(Value::Int(frame.index as i64)),
                "index1" => Some(Value::Int(frame.index as i64 + 1)),
                "is_first" => Some(Value::Bool(frame.is_first())),
                "is_last" => Some(Value::Bool(frame.is_last())),
                _ => None,
            },
            _ => None,
        }
    }

    /// Materialize a loop frame as an object, for `{{ loop }}` itself
    fn loop_object(&self, depth: usize) -> Value {
        let frame = &self.loop_stack[depth];
        let mut map = IndexMap::new();
        map.insert("index".to_string(), Value::Int(frame.index as i64));
        map.insert("index1".to_string(), Value::Int(frame.index as i64 + 1));
        map.insert("is_first".to_string(), Value::Bool(frame.is_first()));
        map.insert("is_last".to_string(), Value::Bool(frame.is_last()));
        let parent = match depth.checked_sub(1) {
            Some(d) => self.loop_object(d),
            None => Value::Null,
        };
        map.insert("parent".to_string(), parent);
        Value::Object(map)
    }

    /// Bind a dotted path in the innermost scope, creating intermediate
    /// objects as needed. Never touches the data root.
    pub fn set_path(&mut self, path: &[String], value: Value) {
        let scope = self.locals.last_mut().expect("base scope always present");
        let (first, rest) = match path.split_first() {
            Some(split) => split,
            None => return,
        };

        if rest.is_empty() {
            scope.insert(first.clone(), value);
            return;
        }

        let slot = scope
            .entry(first.clone())
            .or_insert_with(|| Value::Object(IndexMap::new()));
        if !matches!(slot, Value::Object(_)) {
            *slot = Value::Object(IndexMap::new());
        }

        let mut current = slot;
        for key in &rest[..rest.len() - 1] {
            current = match current {
                Value::Object(map) => {
                    let next = map
                        .entry(key.clone())
                        .or_insert_with(|| Value::Object(IndexMap::new()));
                    if !matches!(next, Value::Object(_)) {
                        *next = Value::Object(IndexMap::new());
                    }
                    next
                }
                _ => unreachable!("intermediate slots are normalized to objects"),
            };
        }
        match current {
            Value::Object(map) => {
                map.insert(rest[rest.len() - 1].clone(), value);
            }
            _ => unreachable!("intermediate slots are normalized to objects"),
        }
    }
}

/// Outcome of walking a value along path segments
enum WalkResult {
    Found(Value),
    /// the containers matched but a key or index is absent
    Missing,
    /// a wrong-typed intermediate; the value cannot contain the path
    Mismatch,
}

fn walk(value: &Value, path: &[PathSegment]) -> WalkResult {
    let mut current = value;
    for segment in path {
        current = match (current, segment) {
            (Value::Object(map), PathSegment::Key(key)) => match map.get(key) {
                Some(next) => next,
                None => return WalkResult::Missing,
            },
            (Value::Array(items), PathSegment::Index(index)) => {
                match usize::try_from(*index).ok().and_then(|i| items.get(i)) {
                    Some(next) => next,
                    None => return WalkResult::Missing,
                }
            }
            _ => return WalkResult::Mismatch,
        };
    }
    WalkResult::Found(current.clone())
}
