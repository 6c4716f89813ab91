//! Built-in callbacks seeded into every environment.
//!
//! The array/object manipulation family operates on copies and never
//! mutates the render context. Given a wrong-typed first argument these
//! functions return it unchanged (or the documented neutral) instead of
//! failing; surrounding templates rely on that contract.

use crate::callbacks::{CallbackError, CallbackResult, CallbackTable};
use crate::value::Value;

pub fn register(table: &mut CallbackTable) {
    register_core(table);
    register_collections(table);
}

fn register_core(table: &mut CallbackTable) {
    // at(container, index_or_key)
    table.add("at", 2, |args| match (&args[0], &args[1]) {
        (Value::Array(items), index) => {
            let i = index
                .as_int()
                .ok_or_else(|| CallbackError::new("at expects an integer index"))?;
            usize::try_from(i)
                .ok()
                .and_then(|i| items.get(i))
                .cloned()
                .ok_or_else(|| CallbackError::new(format!("array index {} out of range", i)))
        }
        (Value::Object(map), Value::String(key)) => map
            .get(key)
            .cloned()
            .ok_or_else(|| CallbackError::new(format!("key '{}' not found", key))),
        (other, _) => Err(CallbackError::new(format!(
            "at expects an array or object, got {}",
            other.type_name()
        ))),
    });

    table.add("existsIn", 2, |args| {
        let exists = match (&args[0], &args[1]) {
            (Value::Object(map), Value::String(key)) => map.contains_key(key),
            _ => false,
        };
        Ok(Value::Bool(exists))
    });

    table.add("length", 1, |args| match &args[0] {
        Value::Array(items) => Ok(Value::Int(items.len() as i64)),
        Value::Object(map) => Ok(Value::Int(map.len() as i64)),
        Value::String(s) => Ok(Value::Int(s.chars().count() as i64)),
        other => Err(CallbackError::new(format!(
            "length expects an array, object or string, got {}",
            other.type_name()
        ))),
    });

    table.add("first", 1, |args| {
        let items = expect_array("first", &args[0])?;
        items
            .first()
            .cloned()
            .ok_or_else(|| CallbackError::new("first of an empty array"))
    });

    table.add("last", 1, |args| {
        let items = expect_array("last", &args[0])?;
        items
            .last()
            .cloned()
            .ok_or_else(|| CallbackError::new("last of an empty array"))
    });

    table.add("range", 1, |args| {
        let n = args[0]
            .as_int()
            .ok_or_else(|| CallbackError::new("range expects an integer"))?;
        Ok(Value::Array((0..n.max(0)).map(Value::Int).collect()))
    });

    table.add("sort", 1, |args| {
        let mut items = expect_array("sort", &args[0])?.clone();
        items.sort_by(|a, b| a.total_cmp(b));
        Ok(Value::Array(items))
    });

    table.add("join", 2, |args| {
        let items = expect_array("join", &args[0])?;
        let separator = expect_string("join", &args[1])?;
        let parts: Vec<String> = items.iter().map(Value::render_string).collect();
        Ok(Value::String(parts.join(separator)))
    });

    table.add("upper", 1, |args| {
        Ok(Value::String(expect_string("upper", &args[0])?.to_uppercase()))
    });

    table.add("lower", 1, |args| {
        Ok(Value::String(expect_string("lower", &args[0])?.to_lowercase()))
    });

    table.add("replace", 3, |args| {
        let s = expect_string("replace", &args[0])?;
        let from = expect_string("replace", &args[1])?;
        let to = expect_string("replace", &args[2])?;
        Ok(Value::String(s.replace(from, to)))
    });

    table.add("min", 1, |args| {
        let items = expect_array("min", &args[0])?;
        items
            .iter()
            .min_by(|a, b| a.total_cmp(b))
            .cloned()
            .ok_or_else(|| CallbackError::new("min of an empty array"))
    });

    table.add("max", 1, |args| {
        let items = expect_array("max", &args[0])?;
        items
            .iter()
            .max_by(|a, b| a.total_cmp(b))
            .cloned()
            .ok_or_else(|| CallbackError::new("max of an empty array"))
    });

    table.add("round", 1, |args| {
        let x = expect_number("round", &args[0])?;
        Ok(Value::Float(x.round()))
    });

    table.add("round", 2, |args| {
        let x = expect_number("round", &args[0])?;
        let precision = args[1]
            .as_int()
            .ok_or_else(|| CallbackError::new("round expects an integer precision"))?;
        let factor = 10f64.powi(precision as i32);
        Ok(Value::Float((x * factor).round() / factor))
    });

    table.add("int", 1, |args| match &args[0] {
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::UInt(u) => i64::try_from(*u)
            .map(Value::Int)
            .map_err(|_| CallbackError::new("integer out of range")),
        Value::Float(f) => Ok(Value::Int(*f as i64)),
        Value::Bool(b) => Ok(Value::Int(*b as i64)),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| CallbackError::new(format!("cannot convert '{}' to integer", s))),
        other => Err(CallbackError::new(format!(
            "cannot convert {} to integer",
            other.type_name()
        ))),
    });

    table.add("float", 1, |args| match &args[0] {
        Value::Float(f) => Ok(Value::Float(*f)),
        Value::Int(i) => Ok(Value::Float(*i as f64)),
        Value::UInt(u) => Ok(Value::Float(*u as f64)),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| CallbackError::new(format!("cannot convert '{}' to float", s))),
        other => Err(CallbackError::new(format!(
            "cannot convert {} to float",
            other.type_name()
        ))),
    });
}

/// The array/object family: fresh-copy semantics, wrong-typed first
/// arguments pass through unchanged
fn register_collections(table: &mut CallbackTable) {
    table.add("append", 2, append);
    table.add("push", 2, append);

    table.add("extend", 2, |args| {
        let Value::Array(items) = &args[0] else {
            return Ok(args[0].clone());
        };
        let Value::Array(tail) = &args[1] else {
            return Ok(args[0].clone());
        };
        let mut result = items.clone();
        result.extend(tail.iter().cloned());
        Ok(Value::Array(result))
    });

    table.add("insert", 3, |args| {
        let Value::Array(items) = &args[0] else {
            return Ok(args[0].clone());
        };
        let mut result = items.clone();
        if let Some(index) = args[1].as_int() {
            let index = if index < 0 {
                index + result.len() as i64
            } else {
                index
            };
            if index >= 0 && index as usize <= result.len() {
                result.insert(index as usize, args[2].clone());
            }
        }
        Ok(Value::Array(result))
    });

    table.add("pop", 1, |args| {
        let Value::Array(items) = &args[0] else {
            return Ok(args[0].clone());
        };
        let mut result = items.clone();
        result.pop();
        Ok(Value::Array(result))
    });

    table.add("pop", 2, |args| {
        let Value::Array(items) = &args[0] else {
            return Ok(args[0].clone());
        };
        let mut result = items.clone();
        if let Some(index) = args[1].as_int() {
            let index = if index < 0 {
                index + result.len() as i64
            } else {
                index
            };
            if index >= 0 && (index as usize) < result.len() {
                result.remove(index as usize);
            }
        }
        Ok(Value::Array(result))
    });

    table.add("remove", 2, |args| {
        let Value::Array(items) = &args[0] else {
            return Ok(args[0].clone());
        };
        let mut result = items.clone();
        if let Some(found) = result.iter().position(|item| item == &args[1]) {
            result.remove(found);
        }
        Ok(Value::Array(result))
    });

    table.add("clear", 1, |args| {
        if !matches!(args[0], Value::Array(_)) {
            return Ok(args[0].clone());
        }
        Ok(Value::Array(Vec::new()))
    });

    table.add("reverse", 1, |args| {
        let Value::Array(items) = &args[0] else {
            return Ok(args[0].clone());
        };
        let mut result = items.clone();
        result.reverse();
        Ok(Value::Array(result))
    });

    table.add("index", 2, |args| {
        let Value::Array(items) = &args[0] else {
            return Ok(Value::Int(-1));
        };
        let found = items
            .iter()
            .position(|item| item == &args[1])
            .map(|i| i as i64)
            .unwrap_or(-1);
        Ok(Value::Int(found))
    });

    table.add("count", 2, |args| {
        let Value::Array(items) = &args[0] else {
            return Ok(Value::Int(0));
        };
        let count = items.iter().filter(|item| *item == &args[1]).count();
        Ok(Value::Int(count as i64))
    });

    table.add("unique", 1, |args| {
        let Value::Array(items) = &args[0] else {
            return Ok(args[0].clone());
        };
        let mut result: Vec<Value> = Vec::new();
        for item in items {
            if !result.contains(item) {
                result.push(item.clone());
            }
        }
        Ok(Value::Array(result))
    });

    table.add("flatten", 1, |args| flatten(&args[0], 1));

    table.add("flatten", 2, |args| {
        let depth = args[1]
            .as_int()
            .ok_or_else(|| CallbackError::new("flatten expects an integer depth"))?;
        flatten(&args[0], depth)
    });

    table.add("update", 2, |args| {
        let Value::Object(map) = &args[0] else {
            return Ok(args[0].clone());
        };
        let mut result = map.clone();
        if let Value::Object(other) = &args[1] {
            for (key, value) in other {
                result.insert(key.clone(), value.clone());
            }
        }
        Ok(Value::Object(result))
    });

    table.add("keys", 1, |args| {
        let Value::Object(map) = &args[0] else {
            return Ok(Value::Array(Vec::new()));
        };
        Ok(Value::Array(
            map.keys().map(|k| Value::String(k.clone())).collect(),
        ))
    });

    table.add("values", 1, |args| {
        let Value::Object(map) = &args[0] else {
            return Ok(Value::Array(Vec::new()));
        };
        Ok(Value::Array(map.values().cloned().collect()))
    });

    table.add("items", 1, |args| {
        let Value::Object(map) = &args[0] else {
            return Ok(Value::Array(Vec::new()));
        };
        Ok(Value::Array(
            map.iter()
                .map(|(k, v)| Value::Array(vec![Value::String(k.clone()), v.clone()]))
                .collect(),
        ))
    });

    table.add("get", 2, |args| Ok(object_get(&args[0], &args[1], &Value::Null)));

    table.add("get", 3, |args| Ok(object_get(&args[0], &args[1], &args[2])));

    table.add("has_key", 2, |args| {
        let has = match (&args[0], &args[1]) {
            (Value::Object(map), Value::String(key)) => map.contains_key(key),
            _ => false,
        };
        Ok(Value::Bool(has))
    });
}

fn append(args: &[Value]) -> CallbackResult {
    let Value::Array(items) = &args[0] else {
        return Ok(args[0].clone());
    };
    let mut result = items.clone();
    result.push(args[1].clone());
    Ok(Value::Array(result))
}

fn flatten(value: &Value, depth: i64) -> CallbackResult {
    let Value::Array(items) = value else {
        return Ok(value.clone());
    };
    let mut result = Vec::new();
    flatten_into(items, depth, &mut result);
    Ok(Value::Array(result))
}

fn flatten_into(items: &[Value], depth: i64, result: &mut Vec<Value>) {
    for item in items {
        match item {
            Value::Array(inner) if depth > 0 => flatten_into(inner, depth - 1, result),
            other => result.push(other.clone()),
        }
    }
}

fn object_get(object: &Value, key: &Value, default: &Value) -> Value {
    if let (Value::Object(map), Value::String(key)) = (object, key) {
        if let Some(found) = map.get(key) {
            return found.clone();
        }
    }
    default.clone()
}

fn expect_array<'a>(name: &str, value: &'a Value) -> Result<&'a Vec<Value>, CallbackError> {
    value.as_array().ok_or_else(|| {
        CallbackError::new(format!("{} expects an array, got {}", name, value.type_name()))
    })
}

fn expect_string<'a>(name: &str, value: &'a Value) -> Result<&'a str, CallbackError> {
    value.as_str().ok_or_else(|| {
        CallbackError::new(format!("{} expects a string, got {}", name, value.type_name()))
    })
}

fn expect_number(name: &str, value: &Value) -> Result<f64, CallbackError> {
    value.as_f64().ok_or_else(|| {
        CallbackError::new(format!("{} expects a number, got {}", name, value.type_name()))
    })
}
