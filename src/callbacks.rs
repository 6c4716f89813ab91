use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Arity accepting any number of arguments
pub const VARIADIC: i32 = -1;

/// A failure inside a host callback. The renderer attaches the call site's
/// location when it surfaces this as a render error.
#[derive(Debug, Clone)]
pub struct CallbackError {
    pub message: String,
}

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type CallbackResult = std::result::Result<Value, CallbackError>;

/// Host function invoked with evaluated arguments; returns a fresh value
pub type Callback = Arc<dyn Fn(&[Value]) -> CallbackResult + Send + Sync>;

/// Registry mapping `(name, arity)` to a host function. An exact arity
/// match wins; a `VARIADIC` entry under the same name is the fallback.
#[derive(Clone, Default)]
pub struct CallbackTable {
    entries: HashMap<(String, i32), Callback>,
}

impl CallbackTable {
    /// An empty table, without the built-in functions
    pub fn new() -> Self {
        Self::default()
    }

    /// A table seeded with all built-in functions
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        crate::builtins::register(&mut table);
        table
    }

    pub fn add<F>(&mut self, name: &str, arity: i32, callback: F)
    where
        F: Fn(&[Value]) -> CallbackResult + Send + Sync + 'static,
    {
        self.entries
            .insert((name.to_string(), arity), Arc::new(callback));
    }

    /// Register a callback invoked for its side effect; the call expression
    /// evaluates to null
    pub fn add_void<F>(&mut self, name: &str, arity: i32, callback: F)
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.add(name, arity, move |args| {
            callback(args);
            Ok(Value::Null)
        });
    }

    pub fn get(&self, name: &str, arg_count: usize) -> Option<&Callback> {
        self.entries
            .get(&(name.to_string(), arg_count as i32))
            .or_else(|| self.entries.get(&(name.to_string(), VARIADIC)))
    }
}

impl std::fmt::Debug for CallbackTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.entries.keys().collect();
        keys.sort();
        f.debug_struct("CallbackTable").field("entries", &keys).finish()
    }
}
