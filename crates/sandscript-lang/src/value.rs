//! Runtime value model shared by the evaluator and the agent runtime.

use std::sync::Arc;

use crate::ast::Expr;

/// A script runtime value.
///
/// Maps use an association list rather than a hash map so that any value may
/// serve as a key without requiring `Hash`/`Ord` over floats and funs.
#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Symbol(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Range(i64, i64),
    /// A bare module reference used as data.
    Module(String),
    Fun(FunValue),
}

/// A first-class function value.
#[derive(Debug, Clone)]
pub enum FunValue {
    /// `&Mod.fun/arity` (local captures are resolved to the core library
    /// before this value is built).
    Capture {
        module: String,
        function: String,
        arity: u8,
    },
    /// `fn a, b -> … end` with a by-value snapshot of the enclosing scope.
    Closure {
        params: Vec<String>,
        body: Arc<Vec<Expr>>,
        captured: Vec<(String, Value)>,
    },
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(k, v)| {
                        b.iter().any(|(bk, bv)| bk == k && bv == v)
                    })
            }
            (Value::Range(a1, a2), Value::Range(b1, b2)) => a1 == b1 && a2 == b2,
            (Value::Module(a), Value::Module(b)) => a == b,
            (Value::Fun(a), Value::Fun(b)) => match (a, b) {
                (
                    FunValue::Capture { module: m1, function: f1, arity: a1 },
                    FunValue::Capture { module: m2, function: f2, arity: a2 },
                ) => m1 == m2 && f1 == f2 && a1 == a2,
                // Closures have no useful identity.
                _ => false,
            },
            _ => false,
        }
    }
}

impl Value {
    /// Only `nil` and `false` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Map(_) => "map",
            Value::Range(_, _) => "range",
            Value::Module(_) => "module",
            Value::Fun(_) => "function",
        }
    }

    /// Loose equality: integers and floats compare numerically (`1 == 1.0`).
    /// Strict equality (`===`) is plain [`PartialEq`].
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                (*a as f64) == *b
            }
            (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            _ => self == other,
        }
    }

    /// Convert to a JSON value for transport back to clients.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::{json, Value as Json};
        match self {
            Value::Nil => Json::Null,
            Value::Bool(b) => json!(b),
            Value::Int(n) => json!(n),
            Value::Float(f) => json!(f),
            Value::Str(s) => json!(s),
            Value::Symbol(s) => json!(s),
            Value::List(items) | Value::Tuple(items) => {
                Json::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(entries) => {
                let mut obj = serde_json::Map::new();
                for (k, v) in entries {
                    let key = match k {
                        Value::Str(s) => s.clone(),
                        Value::Symbol(s) => s.clone(),
                        Value::Int(n) => n.to_string(),
                        Value::Bool(b) => b.to_string(),
                        other => other.type_name().to_string(),
                    };
                    obj.insert(key, v.to_json());
                }
                Json::Object(obj)
            }
            Value::Range(a, b) => json!(format!("{a}..{b}")),
            Value::Module(name) => json!(name),
            Value::Fun(_) => json!("#Function"),
        }
    }

    /// Build a value from a JSON payload (tool options, human-input replies).
    pub fn from_json(json: &serde_json::Value) -> Value {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Nil,
            Json::Bool(b) => Value::Bool(*b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Json::String(s) => Value::Str(s.clone()),
            Json::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            Json::Object(obj) => Value::Map(
                obj.iter()
                    .map(|(k, v)| (Value::Str(k.clone()), Value::from_json(v)))
                    .collect(),
            ),
        }
    }
}
