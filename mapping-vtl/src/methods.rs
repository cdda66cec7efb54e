//! Built-in properties and Java-style methods on template values.
//!
//! A `None` result means "no such property/method for these arguments" and
//! makes the surrounding reference unresolved.

use crate::error::EvalError;
use crate::value::{Map, Value};

pub(crate) fn property(value: &Value, name: &str) -> Option<Value> {
    match value {
        Value::Map(map) => map.get(name).cloned(),
        Value::Object(obj) => obj.property(name),
        Value::String(s) => match name {
            "length" | "size" => Some(Value::from(s.chars().count())),
            "empty" => Some(Value::Bool(s.is_empty())),
            _ => None,
        },
        Value::List(items) => match name {
            "length" | "size" => Some(Value::from(items.len())),
            "empty" => Some(Value::Bool(items.is_empty())),
            _ => None,
        },
        _ => None,
    }
}

pub(crate) fn index(value: &Value, index: &Value) -> Option<Value> {
    match value {
        Value::List(items) => items.get(position(index)?).cloned(),
        Value::Map(map) => map.get(index.to_string().as_str()).cloned(),
        Value::Object(obj) => obj.property(index.as_str()?),
        _ => None,
    }
}

/// Methods that modify a list or map in place.
pub(crate) fn is_mutator(method: &str) -> bool {
    matches!(method, "add" | "addAll" | "remove" | "clear" | "put" | "putAll")
}

pub(crate) fn call(receiver: &Value, method: &str, args: &[Value]) -> Result<Option<Value>, EvalError> {
    if let Value::Object(obj) = receiver {
        return obj.call(method, args);
    }
    let result = match (method, args) {
        ("toString", []) => Some(Value::String(receiver.to_string())),
        ("equals", [other]) => Some(Value::Bool(receiver == other)),
        _ => match receiver {
            Value::String(s) => string_method(s, method, args),
            Value::List(items) => list_method(items, method, args),
            Value::Map(map) => map_method(map, method, args),
            _ => None,
        },
    };
    Ok(result)
}

pub(crate) fn mutate(target: &mut Value, method: &str, args: &[Value]) -> Option<Value> {
    match target {
        Value::List(items) => match (method, args) {
            ("add", [item]) => {
                items.push(item.clone());
                Some(Value::Bool(true))
            }
            ("add", [at, item]) => {
                let at = position(at).filter(|i| *i <= items.len())?;
                items.insert(at, item.clone());
                Some(Value::Null)
            }
            ("addAll", [Value::List(more)]) => {
                items.extend(more.iter().cloned());
                Some(Value::Bool(!more.is_empty()))
            }
            ("remove", [at]) if at.is_number() => {
                let at = position(at).filter(|i| *i < items.len())?;
                Some(items.remove(at))
            }
            ("remove", [item]) => {
                let found = items.iter().position(|v| v == item);
                if let Some(at) = found {
                    items.remove(at);
                }
                Some(Value::Bool(found.is_some()))
            }
            ("clear", []) => {
                items.clear();
                Some(Value::Null)
            }
            _ => None,
        },
        Value::Map(map) => match (method, args) {
            ("put", [key, value]) => Some(map.insert(key.to_string(), value.clone()).unwrap_or_default()),
            ("putAll", [Value::Map(more)]) => {
                map.extend(more.iter().map(|(k, v)| (k.clone(), v.clone())));
                Some(Value::Null)
            }
            ("remove", [key]) => Some(map.shift_remove(key.to_string().as_str()).unwrap_or_default()),
            ("clear", []) => {
                map.clear();
                Some(Value::Null)
            }
            _ => None,
        },
        _ => None,
    }
}

fn position(index: &Value) -> Option<usize> {
    usize::try_from(index.as_index()?).ok()
}

fn string_method(s: &str, method: &str, args: &[Value]) -> Option<Value> {
    let value = match (method, args) {
        ("length" | "size", []) => Value::from(s.chars().count()),
        ("isEmpty", []) => Value::Bool(s.is_empty()),
        ("toUpperCase", []) => Value::from(s.to_uppercase()),
        ("toLowerCase", []) => Value::from(s.to_lowercase()),
        ("trim", []) => Value::from(s.trim()),
        ("contains", [needle]) => Value::Bool(s.contains(needle.to_string().as_str())),
        ("startsWith", [prefix]) => Value::Bool(s.starts_with(prefix.to_string().as_str())),
        ("endsWith", [suffix]) => Value::Bool(s.ends_with(suffix.to_string().as_str())),
        ("indexOf", [needle]) => char_index(s, s.find(needle.to_string().as_str())),
        ("lastIndexOf", [needle]) => char_index(s, s.rfind(needle.to_string().as_str())),
        ("substring", [from]) => substring(s, position(from)?, None)?,
        ("substring", [from, to]) => substring(s, position(from)?, Some(position(to)?))?,
        ("replace", [from, to]) => Value::from(s.replace(from.to_string().as_str(), &to.to_string())),
        ("split", [sep]) => split(s, &sep.to_string()),
        ("charAt", [at]) => Value::from(s.chars().nth(position(at)?)?.to_string()),
        ("concat", [other]) => Value::from(format!("{s}{other}")),
        ("equalsIgnoreCase", [other]) => {
            Value::Bool(s.to_lowercase() == other.to_string().to_lowercase())
        }
        _ => return None,
    };
    Some(value)
}

fn char_index(s: &str, byte: Option<usize>) -> Value {
    match byte {
        Some(byte) => Value::from(s[..byte].chars().count()),
        None => Value::Int(-1),
    }
}

fn substring(s: &str, from: usize, to: Option<usize>) -> Option<Value> {
    let len = s.chars().count();
    let to = to.unwrap_or(len);
    if from > to || to > len {
        return None;
    }
    Some(Value::from(s.chars().skip(from).take(to - from).collect::<String>()))
}

/// Literal split; trailing empty pieces are dropped like Java's `String.split`.
fn split(s: &str, sep: &str) -> Value {
    if s.is_empty() {
        return Value::List(vec![Value::from("")]);
    }
    let mut parts: Vec<Value> = if sep.is_empty() {
        s.chars().map(|c| Value::from(c.to_string())).collect()
    } else {
        s.split(sep).map(Value::from).collect()
    };
    while parts.last().is_some_and(|p| p.as_str() == Some("")) {
        parts.pop();
    }
    Value::List(parts)
}

fn list_method(items: &[Value], method: &str, args: &[Value]) -> Option<Value> {
    let value = match (method, args) {
        ("size", []) => Value::from(items.len()),
        ("isEmpty", []) => Value::Bool(items.is_empty()),
        ("get", [at]) => items.get(position(at)?)?.clone(),
        ("contains", [item]) => Value::Bool(items.contains(item)),
        ("indexOf", [item]) => items
            .iter()
            .position(|v| v == item)
            .map_or(Value::Int(-1), Value::from),
        _ => return None,
    };
    Some(value)
}

fn map_method(map: &Map, method: &str, args: &[Value]) -> Option<Value> {
    let value = match (method, args) {
        ("size", []) => Value::from(map.len()),
        ("isEmpty", []) => Value::Bool(map.is_empty()),
        ("get", [key]) => map.get(key.to_string().as_str())?.clone(),
        ("containsKey", [key]) => Value::Bool(map.contains_key(key.to_string().as_str())),
        ("containsValue", [item]) => Value::Bool(map.values().any(|v| v == item)),
        ("keySet", []) => Value::List(map.keys().map(|k| Value::from(k.as_str())).collect()),
        ("values", []) => Value::List(map.values().cloned().collect()),
        ("entrySet", []) => Value::List(
            map.iter()
                .map(|(k, v)| {
                    let mut entry = Map::new();
                    entry.insert("key".to_string(), Value::from(k.as_str()));
                    entry.insert("value".to_string(), v.clone());
                    Value::Map(entry)
                })
                .collect(),
        ),
        _ => return None,
    };
    Some(value)
}
