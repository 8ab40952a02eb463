//! Core library: the native modules backing the default allowlist.
//!
//! Everything callable from sandboxed code without tool contributions lives
//! here. No function in this catalog converts arbitrary input into a symbol,
//! which closes the symbol-table-exhaustion class of attacks by
//! construction.

pub mod collections;
pub mod datetime;
pub mod encoding;
pub mod kernel;
pub mod numeric;
pub mod strings;

use std::cmp::Ordering;

use sandscript_lang::value::{FunValue, Value};

use crate::allowlist::{Allowlist, ModulePermission};
use crate::evaluator::EvalError;
use crate::registry::ModuleRegistry;

/// Upper bound on materialized range size; protects `Range.to_list` and the
/// `Enum` family from multi-gigabyte allocations the timeout would otherwise
/// have to catch mid-flight.
pub(crate) const MAX_RANGE_MATERIALIZE: i64 = 1_000_000;

/// Registry containing the full core library.
pub fn core_registry() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    registry.insert(kernel::module());
    registry.insert(collections::list_module());
    registry.insert(collections::enum_module());
    registry.insert(collections::map_module());
    registry.insert(collections::map_set_module());
    registry.insert(collections::tuple_module());
    registry.insert(collections::range_module());
    registry.insert(strings::string_module());
    registry.insert(strings::binary_module());
    registry.insert(strings::regex_module());
    registry.insert(numeric::integer_module());
    registry.insert(numeric::float_module());
    registry.insert(numeric::math_module());
    registry.insert(numeric::bitwise_module());
    registry.insert(numeric::random_module());
    registry.insert(datetime::date_module());
    registry.insert(datetime::time_module());
    registry.insert(datetime::datetime_module());
    registry.insert(datetime::clock_module());
    registry.insert(encoding::base_module());
    registry.insert(encoding::uri_module());
    registry
}

/// The default allowlist: every core-library module at `All` permission.
/// The registry's curated exports are the actual safety boundary; `All`
/// never reaches past them.
pub fn default_allowlist() -> Allowlist {
    let mut builder = Allowlist::builder();
    for module in [
        "Kernel", "List", "Enum", "Map", "MapSet", "Tuple", "Range", "String", "Binary", "Regex",
        "Integer", "Float", "Math", "Bitwise", "Random", "Date", "Time", "DateTime", "Clock",
        "Base", "URI",
    ] {
        builder = builder.allow(module, ModulePermission::All);
    }
    builder.build()
}

// ---------------------------------------------------------------------------
// Argument helpers shared by the native modules
// ---------------------------------------------------------------------------

pub(crate) fn exception(message: impl Into<String>) -> EvalError {
    EvalError::Exception(message.into())
}

pub(crate) fn expect_args(fun: &str, args: &[Value], n: usize) -> Result<(), EvalError> {
    if args.len() == n {
        Ok(())
    } else {
        Err(exception(format!(
            "{fun} expects {n} argument(s), got {}",
            args.len()
        )))
    }
}

pub(crate) fn arg<'a>(fun: &str, args: &'a [Value], i: usize) -> Result<&'a Value, EvalError> {
    args.get(i)
        .ok_or_else(|| exception(format!("{fun}: missing argument {}", i + 1)))
}

pub(crate) fn int_arg(fun: &str, args: &[Value], i: usize) -> Result<i64, EvalError> {
    match arg(fun, args, i)? {
        Value::Int(n) => Ok(*n),
        other => Err(exception(format!(
            "{fun}: expected integer, got {}",
            other.type_name()
        ))),
    }
}

pub(crate) fn num_arg(fun: &str, args: &[Value], i: usize) -> Result<f64, EvalError> {
    match arg(fun, args, i)? {
        Value::Int(n) => Ok(*n as f64),
        Value::Float(f) => Ok(*f),
        other => Err(exception(format!(
            "{fun}: expected number, got {}",
            other.type_name()
        ))),
    }
}

pub(crate) fn str_arg<'a>(fun: &str, args: &'a [Value], i: usize) -> Result<&'a str, EvalError> {
    match arg(fun, args, i)? {
        Value::Str(s) => Ok(s),
        other => Err(exception(format!(
            "{fun}: expected string, got {}",
            other.type_name()
        ))),
    }
}

pub(crate) fn list_arg<'a>(fun: &str, args: &'a [Value], i: usize) -> Result<&'a [Value], EvalError> {
    match arg(fun, args, i)? {
        Value::List(items) => Ok(items),
        other => Err(exception(format!(
            "{fun}: expected list, got {}",
            other.type_name()
        ))),
    }
}

pub(crate) fn tuple_arg<'a>(fun: &str, args: &'a [Value], i: usize) -> Result<&'a [Value], EvalError> {
    match arg(fun, args, i)? {
        Value::Tuple(items) => Ok(items),
        other => Err(exception(format!(
            "{fun}: expected tuple, got {}",
            other.type_name()
        ))),
    }
}

pub(crate) fn map_arg<'a>(
    fun: &str,
    args: &'a [Value],
    i: usize,
) -> Result<&'a [(Value, Value)], EvalError> {
    match arg(fun, args, i)? {
        Value::Map(entries) => Ok(entries),
        other => Err(exception(format!(
            "{fun}: expected map, got {}",
            other.type_name()
        ))),
    }
}

pub(crate) fn fun_arg(fun: &str, args: &[Value], i: usize) -> Result<FunValue, EvalError> {
    match arg(fun, args, i)? {
        Value::Fun(f) => Ok(f.clone()),
        other => Err(exception(format!(
            "{fun}: expected function, got {}",
            other.type_name()
        ))),
    }
}

/// Accept a list or a range as the enumerable argument, materializing ranges
/// with a size cap.
pub(crate) fn enumerable(fun: &str, args: &[Value], i: usize) -> Result<Vec<Value>, EvalError> {
    match arg(fun, args, i)? {
        Value::List(items) => Ok(items.clone()),
        Value::Range(a, b) => materialize_range(fun, *a, *b),
        other => Err(exception(format!(
            "{fun}: expected list or range, got {}",
            other.type_name()
        ))),
    }
}

pub(crate) fn materialize_range(fun: &str, a: i64, b: i64) -> Result<Vec<Value>, EvalError> {
    let span = (b - a).abs();
    if span >= MAX_RANGE_MATERIALIZE {
        return Err(exception(format!("{fun}: range {a}..{b} is too large")));
    }
    let items: Vec<Value> = if a <= b {
        (a..=b).map(Value::Int).collect()
    } else {
        (b..=a).rev().map(Value::Int).collect()
    };
    Ok(items)
}

/// Term comparison for operators and sorting: numbers compare numerically
/// across int/float; strings, booleans, and symbols compare within type.
pub(crate) fn compare(fun: &str, a: &Value, b: &Value) -> Result<Ordering, EvalError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(x.cmp(y)),
        (Value::Int(x), Value::Float(y)) => float_cmp(fun, *x as f64, *y),
        (Value::Float(x), Value::Int(y)) => float_cmp(fun, *x, *y as f64),
        (Value::Float(x), Value::Float(y)) => float_cmp(fun, *x, *y),
        (Value::Str(x), Value::Str(y)) => Ok(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Ok(x.cmp(y)),
        (Value::Symbol(x), Value::Symbol(y)) => Ok(x.cmp(y)),
        _ => Err(exception(format!(
            "{fun}: cannot compare {} with {}",
            a.type_name(),
            b.type_name()
        ))),
    }
}

fn float_cmp(fun: &str, a: f64, b: f64) -> Result<Ordering, EvalError> {
    a.partial_cmp(&b)
        .ok_or_else(|| exception(format!("{fun}: cannot compare NaN")))
}
