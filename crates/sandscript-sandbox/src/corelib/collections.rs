//! Container modules: `List`, `Enum`, `Map`, `MapSet`, `Tuple`, `Range`.
//!
//! Sets are represented as lists with unique elements in insertion order;
//! maps are association lists, so any value can be a key.

use sandscript_lang::value::Value;

use crate::evaluator::{EvalCtx, EvalError};
use crate::registry::ModuleDef;

use super::{
    arg, compare, enumerable, exception, expect_args, fun_arg, int_arg, list_arg, map_arg,
    materialize_range, str_arg, tuple_arg,
};

pub fn list_module() -> ModuleDef {
    let mut m = ModuleDef::new("List");

    m.register("first", |_ctx, args| {
        expect_args("List.first", args, 1)?;
        Ok(list_arg("List.first", args, 0)?.first().cloned().unwrap_or(Value::Nil))
    });
    m.register("last", |_ctx, args| {
        expect_args("List.last", args, 1)?;
        Ok(list_arg("List.last", args, 0)?.last().cloned().unwrap_or(Value::Nil))
    });
    m.register("flatten", |_ctx, args| {
        expect_args("List.flatten", args, 1)?;
        let items = list_arg("List.flatten", args, 0)?;
        let mut out = Vec::new();
        flatten_into(items, &mut out);
        Ok(Value::List(out))
    });
    m.register("duplicate", |_ctx, args| {
        expect_args("List.duplicate", args, 2)?;
        let item = arg("List.duplicate", args, 0)?;
        let n = int_arg("List.duplicate", args, 1)?.max(0) as usize;
        if n > super::MAX_RANGE_MATERIALIZE as usize {
            return Err(exception("List.duplicate: count is too large"));
        }
        Ok(Value::List(vec![item.clone(); n]))
    });
    m.register("delete", |_ctx, args| {
        expect_args("List.delete", args, 2)?;
        let mut out = list_arg("List.delete", args, 0)?.to_vec();
        if let Some(pos) = out.iter().position(|v| v == &args[1]) {
            out.remove(pos);
        }
        Ok(Value::List(out))
    });
    m.register("insert_at", |_ctx, args| {
        expect_args("List.insert_at", args, 3)?;
        let mut out = list_arg("List.insert_at", args, 0)?.to_vec();
        let idx = clamp_index(int_arg("List.insert_at", args, 1)?, out.len());
        out.insert(idx, args[2].clone());
        Ok(Value::List(out))
    });
    m.register("replace_at", |_ctx, args| {
        expect_args("List.replace_at", args, 3)?;
        let mut out = list_arg("List.replace_at", args, 0)?.to_vec();
        let idx = int_arg("List.replace_at", args, 1)?;
        if let Ok(i) = usize::try_from(idx) {
            if i < out.len() {
                out[i] = args[2].clone();
            }
        }
        Ok(Value::List(out))
    });
    m.register("wrap", |_ctx, args| {
        expect_args("List.wrap", args, 1)?;
        Ok(match &args[0] {
            Value::List(_) => args[0].clone(),
            Value::Nil => Value::List(Vec::new()),
            other => Value::List(vec![other.clone()]),
        })
    });
    m.register("to_tuple", |_ctx, args| {
        expect_args("List.to_tuple", args, 1)?;
        Ok(Value::Tuple(list_arg("List.to_tuple", args, 0)?.to_vec()))
    });

    m
}

pub fn enum_module() -> ModuleDef {
    let mut m = ModuleDef::new("Enum");

    m.register("count", |_ctx, args| {
        expect_args("Enum.count", args, 1)?;
        Ok(Value::Int(enumerable("Enum.count", args, 0)?.len() as i64))
    });
    m.register("empty?", |_ctx, args| {
        expect_args("Enum.empty?", args, 1)?;
        Ok(Value::Bool(enumerable("Enum.empty?", args, 0)?.is_empty()))
    });
    m.register("sum", |ctx, args| {
        expect_args("Enum.sum", args, 1)?;
        let items = enumerable("Enum.sum", args, 0)?;
        let mut acc = Value::Int(0);
        for item in items {
            ctx.check_interrupt()?;
            acc = ctx.call_module("Kernel", "+", &[acc, item])?;
        }
        Ok(acc)
    });
    m.register("member?", |_ctx, args| {
        expect_args("Enum.member?", args, 2)?;
        let items = enumerable("Enum.member?", args, 0)?;
        Ok(Value::Bool(items.iter().any(|v| v == &args[1])))
    });
    m.register("at", |_ctx, args| {
        expect_args("Enum.at", args, 2)?;
        let items = enumerable("Enum.at", args, 0)?;
        let idx = int_arg("Enum.at", args, 1)?;
        let resolved = if idx < 0 {
            items.len().checked_sub(idx.unsigned_abs() as usize)
        } else {
            Some(idx as usize)
        };
        Ok(resolved
            .and_then(|i| items.get(i))
            .cloned()
            .unwrap_or(Value::Nil))
    });
    m.register("take", |_ctx, args| {
        expect_args("Enum.take", args, 2)?;
        let items = enumerable("Enum.take", args, 0)?;
        let n = int_arg("Enum.take", args, 1)?.max(0) as usize;
        Ok(Value::List(items.into_iter().take(n).collect()))
    });
    m.register("drop", |_ctx, args| {
        expect_args("Enum.drop", args, 2)?;
        let items = enumerable("Enum.drop", args, 0)?;
        let n = int_arg("Enum.drop", args, 1)?.max(0) as usize;
        Ok(Value::List(items.into_iter().skip(n).collect()))
    });
    m.register("reverse", |_ctx, args| {
        expect_args("Enum.reverse", args, 1)?;
        let mut items = enumerable("Enum.reverse", args, 0)?;
        items.reverse();
        Ok(Value::List(items))
    });
    m.register("uniq", |_ctx, args| {
        expect_args("Enum.uniq", args, 1)?;
        let items = enumerable("Enum.uniq", args, 0)?;
        let mut out: Vec<Value> = Vec::new();
        for item in items {
            if !out.contains(&item) {
                out.push(item);
            }
        }
        Ok(Value::List(out))
    });
    m.register("sort", |_ctx, args| {
        expect_args("Enum.sort", args, 1)?;
        let mut items = enumerable("Enum.sort", args, 0)?;
        sort_values("Enum.sort", &mut items)?;
        Ok(Value::List(items))
    });
    m.register("min", |_ctx, args| {
        expect_args("Enum.min", args, 1)?;
        extreme("Enum.min", args, true)
    });
    m.register("max", |_ctx, args| {
        expect_args("Enum.max", args, 1)?;
        extreme("Enum.max", args, false)
    });
    m.register("join", |_ctx, args| {
        let joiner = match args.len() {
            1 => "",
            2 => str_arg("Enum.join", args, 1)?,
            n => return Err(exception(format!("Enum.join expects 1 or 2 arguments, got {n}"))),
        };
        let items = enumerable("Enum.join", args, 0)?;
        let mut parts = Vec::with_capacity(items.len());
        for item in &items {
            parts.push(match item {
                Value::Str(s) => s.clone(),
                Value::Int(n) => n.to_string(),
                Value::Float(f) => format!("{f:?}"),
                other => {
                    return Err(exception(format!(
                        "Enum.join: cannot join a {}",
                        other.type_name()
                    )))
                }
            });
        }
        Ok(Value::Str(parts.join(joiner)))
    });

    m.register("map", |ctx, args| {
        expect_args("Enum.map", args, 2)?;
        let items = enumerable("Enum.map", args, 0)?;
        let f = fun_arg("Enum.map", args, 1)?;
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            ctx.check_interrupt()?;
            out.push(ctx.call_fun(&f, &[item])?);
        }
        Ok(Value::List(out))
    });
    m.register("filter", |ctx, args| {
        expect_args("Enum.filter", args, 2)?;
        filter_impl(ctx, args, true)
    });
    m.register("reject", |ctx, args| {
        expect_args("Enum.reject", args, 2)?;
        filter_impl(ctx, args, false)
    });
    m.register("reduce", |ctx, args| {
        expect_args("Enum.reduce", args, 3)?;
        let items = enumerable("Enum.reduce", args, 0)?;
        let f = fun_arg("Enum.reduce", args, 2)?;
        let mut acc = args[1].clone();
        for item in items {
            ctx.check_interrupt()?;
            acc = ctx.call_fun(&f, &[item, acc])?;
        }
        Ok(acc)
    });
    m.register("all?", |ctx, args| {
        expect_args("Enum.all?", args, 2)?;
        let items = enumerable("Enum.all?", args, 0)?;
        let f = fun_arg("Enum.all?", args, 1)?;
        for item in items {
            ctx.check_interrupt()?;
            if !ctx.call_fun(&f, &[item])?.is_truthy() {
                return Ok(Value::Bool(false));
            }
        }
        Ok(Value::Bool(true))
    });
    m.register("any?", |ctx, args| {
        expect_args("Enum.any?", args, 2)?;
        let items = enumerable("Enum.any?", args, 0)?;
        let f = fun_arg("Enum.any?", args, 1)?;
        for item in items {
            ctx.check_interrupt()?;
            if ctx.call_fun(&f, &[item])?.is_truthy() {
                return Ok(Value::Bool(true));
            }
        }
        Ok(Value::Bool(false))
    });
    m.register("find", |ctx, args| {
        expect_args("Enum.find", args, 2)?;
        let items = enumerable("Enum.find", args, 0)?;
        let f = fun_arg("Enum.find", args, 1)?;
        for item in items {
            ctx.check_interrupt()?;
            if ctx.call_fun(&f, &[item.clone()])?.is_truthy() {
                return Ok(item);
            }
        }
        Ok(Value::Nil)
    });
    m.register("sort_by", |ctx, args| {
        expect_args("Enum.sort_by", args, 2)?;
        let items = enumerable("Enum.sort_by", args, 0)?;
        let f = fun_arg("Enum.sort_by", args, 1)?;
        let mut keyed = Vec::with_capacity(items.len());
        for item in items {
            ctx.check_interrupt()?;
            let key = ctx.call_fun(&f, &[item.clone()])?;
            keyed.push((key, item));
        }
        let mut failure = None;
        keyed.sort_by(|a, b| match compare("Enum.sort_by", &a.0, &b.0) {
            Ok(ordering) => ordering,
            Err(e) => {
                failure.get_or_insert(e);
                std::cmp::Ordering::Equal
            }
        });
        if let Some(e) = failure {
            return Err(e);
        }
        Ok(Value::List(keyed.into_iter().map(|(_, v)| v).collect()))
    });

    m
}

pub fn map_module() -> ModuleDef {
    let mut m = ModuleDef::new("Map");

    m.register("new", |_ctx, args| {
        expect_args("Map.new", args, 0)?;
        Ok(Value::Map(Vec::new()))
    });
    m.register("get", |_ctx, args| {
        let default = match args.len() {
            2 => Value::Nil,
            3 => args[2].clone(),
            n => return Err(exception(format!("Map.get expects 2 or 3 arguments, got {n}"))),
        };
        let entries = map_arg("Map.get", args, 0)?;
        Ok(entries
            .iter()
            .find(|(k, _)| k == &args[1])
            .map(|(_, v)| v.clone())
            .unwrap_or(default))
    });
    m.register("fetch", |_ctx, args| {
        expect_args("Map.fetch", args, 2)?;
        let entries = map_arg("Map.fetch", args, 0)?;
        Ok(match entries.iter().find(|(k, _)| k == &args[1]) {
            Some((_, v)) => Value::Tuple(vec![Value::Symbol("ok".into()), v.clone()]),
            None => Value::Symbol("error".into()),
        })
    });
    m.register("put", |_ctx, args| {
        expect_args("Map.put", args, 3)?;
        let mut entries = map_arg("Map.put", args, 0)?.to_vec();
        entries.retain(|(k, _)| k != &args[1]);
        entries.push((args[1].clone(), args[2].clone()));
        Ok(Value::Map(entries))
    });
    m.register("delete", |_ctx, args| {
        expect_args("Map.delete", args, 2)?;
        let mut entries = map_arg("Map.delete", args, 0)?.to_vec();
        entries.retain(|(k, _)| k != &args[1]);
        Ok(Value::Map(entries))
    });
    m.register("has_key?", |_ctx, args| {
        expect_args("Map.has_key?", args, 2)?;
        let entries = map_arg("Map.has_key?", args, 0)?;
        Ok(Value::Bool(entries.iter().any(|(k, _)| k == &args[1])))
    });
    m.register("keys", |_ctx, args| {
        expect_args("Map.keys", args, 1)?;
        let entries = map_arg("Map.keys", args, 0)?;
        Ok(Value::List(entries.iter().map(|(k, _)| k.clone()).collect()))
    });
    m.register("values", |_ctx, args| {
        expect_args("Map.values", args, 1)?;
        let entries = map_arg("Map.values", args, 0)?;
        Ok(Value::List(entries.iter().map(|(_, v)| v.clone()).collect()))
    });
    m.register("merge", |_ctx, args| {
        expect_args("Map.merge", args, 2)?;
        let mut entries = map_arg("Map.merge", args, 0)?.to_vec();
        for (k, v) in map_arg("Map.merge", args, 1)? {
            entries.retain(|(existing, _)| existing != k);
            entries.push((k.clone(), v.clone()));
        }
        Ok(Value::Map(entries))
    });
    m.register("to_list", |_ctx, args| {
        expect_args("Map.to_list", args, 1)?;
        let entries = map_arg("Map.to_list", args, 0)?;
        Ok(Value::List(
            entries
                .iter()
                .map(|(k, v)| Value::Tuple(vec![k.clone(), v.clone()]))
                .collect(),
        ))
    });

    m
}

pub fn map_set_module() -> ModuleDef {
    let mut m = ModuleDef::new("MapSet");

    m.register("new", |_ctx, args| match args.len() {
        0 => Ok(Value::List(Vec::new())),
        1 => {
            let items = enumerable("MapSet.new", args, 0)?;
            Ok(Value::List(dedup(items)))
        }
        n => Err(exception(format!("MapSet.new expects 0 or 1 arguments, got {n}"))),
    });
    m.register("put", |_ctx, args| {
        expect_args("MapSet.put", args, 2)?;
        let mut items = list_arg("MapSet.put", args, 0)?.to_vec();
        if !items.contains(&args[1]) {
            items.push(args[1].clone());
        }
        Ok(Value::List(items))
    });
    m.register("delete", |_ctx, args| {
        expect_args("MapSet.delete", args, 2)?;
        let mut items = list_arg("MapSet.delete", args, 0)?.to_vec();
        items.retain(|v| v != &args[1]);
        Ok(Value::List(items))
    });
    m.register("member?", |_ctx, args| {
        expect_args("MapSet.member?", args, 2)?;
        Ok(Value::Bool(
            list_arg("MapSet.member?", args, 0)?.contains(&args[1]),
        ))
    });
    m.register("size", |_ctx, args| {
        expect_args("MapSet.size", args, 1)?;
        Ok(Value::Int(list_arg("MapSet.size", args, 0)?.len() as i64))
    });
    m.register("to_list", |_ctx, args| {
        expect_args("MapSet.to_list", args, 1)?;
        Ok(Value::List(list_arg("MapSet.to_list", args, 0)?.to_vec()))
    });
    m.register("union", |_ctx, args| {
        expect_args("MapSet.union", args, 2)?;
        let mut items = list_arg("MapSet.union", args, 0)?.to_vec();
        for v in list_arg("MapSet.union", args, 1)? {
            if !items.contains(v) {
                items.push(v.clone());
            }
        }
        Ok(Value::List(items))
    });
    m.register("intersection", |_ctx, args| {
        expect_args("MapSet.intersection", args, 2)?;
        let b = list_arg("MapSet.intersection", args, 1)?;
        let items: Vec<Value> = list_arg("MapSet.intersection", args, 0)?
            .iter()
            .filter(|v| b.contains(v))
            .cloned()
            .collect();
        Ok(Value::List(items))
    });
    m.register("difference", |_ctx, args| {
        expect_args("MapSet.difference", args, 2)?;
        let b = list_arg("MapSet.difference", args, 1)?;
        let items: Vec<Value> = list_arg("MapSet.difference", args, 0)?
            .iter()
            .filter(|v| !b.contains(v))
            .cloned()
            .collect();
        Ok(Value::List(items))
    });

    m
}

pub fn tuple_module() -> ModuleDef {
    let mut m = ModuleDef::new("Tuple");

    m.register("to_list", |_ctx, args| {
        expect_args("Tuple.to_list", args, 1)?;
        Ok(Value::List(tuple_arg("Tuple.to_list", args, 0)?.to_vec()))
    });
    m.register("duplicate", |_ctx, args| {
        expect_args("Tuple.duplicate", args, 2)?;
        let n = int_arg("Tuple.duplicate", args, 1)?.max(0) as usize;
        if n > 1024 {
            return Err(exception("Tuple.duplicate: count is too large"));
        }
        Ok(Value::Tuple(vec![args[0].clone(); n]))
    });
    m.register("insert_at", |_ctx, args| {
        expect_args("Tuple.insert_at", args, 3)?;
        let mut items = tuple_arg("Tuple.insert_at", args, 0)?.to_vec();
        let idx = clamp_index(int_arg("Tuple.insert_at", args, 1)?, items.len());
        items.insert(idx, args[2].clone());
        Ok(Value::Tuple(items))
    });

    m
}

pub fn range_module() -> ModuleDef {
    let mut m = ModuleDef::new("Range");

    m.register("new", |_ctx, args| {
        expect_args("Range.new", args, 2)?;
        Ok(Value::Range(
            int_arg("Range.new", args, 0)?,
            int_arg("Range.new", args, 1)?,
        ))
    });
    m.register("to_list", |_ctx, args| {
        expect_args("Range.to_list", args, 1)?;
        match arg("Range.to_list", args, 0)? {
            Value::Range(a, b) => Ok(Value::List(materialize_range("Range.to_list", *a, *b)?)),
            other => Err(exception(format!(
                "Range.to_list: expected range, got {}",
                other.type_name()
            ))),
        }
    });

    m
}

fn flatten_into(items: &[Value], out: &mut Vec<Value>) {
    for item in items {
        match item {
            Value::List(inner) => flatten_into(inner, out),
            other => out.push(other.clone()),
        }
    }
}

fn clamp_index(idx: i64, len: usize) -> usize {
    if idx < 0 {
        0
    } else {
        (idx as usize).min(len)
    }
}

fn dedup(items: Vec<Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

fn sort_values(fun: &str, items: &mut [Value]) -> Result<(), EvalError> {
    let mut failure = None;
    items.sort_by(|a, b| match compare(fun, a, b) {
        Ok(ordering) => ordering,
        Err(e) => {
            failure.get_or_insert(e);
            std::cmp::Ordering::Equal
        }
    });
    match failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn extreme(fun: &str, args: &[Value], want_min: bool) -> Result<Value, EvalError> {
    let items = enumerable(fun, args, 0)?;
    let Some(mut best) = items.first().cloned() else {
        return Err(exception(format!("{fun}: empty enumerable")));
    };
    for item in &items[1..] {
        let ordering = compare(fun, item, &best)?;
        if (want_min && ordering.is_lt()) || (!want_min && ordering.is_gt()) {
            best = item.clone();
        }
    }
    Ok(best)
}

fn filter_impl(ctx: &mut EvalCtx, args: &[Value], keep: bool) -> Result<Value, EvalError> {
    let fun_name = if keep { "Enum.filter" } else { "Enum.reject" };
    let items = enumerable(fun_name, args, 0)?;
    let f = fun_arg(fun_name, args, 1)?;
    let mut out = Vec::new();
    for item in items {
        ctx.check_interrupt()?;
        if ctx.call_fun(&f, &[item.clone()])?.is_truthy() == keep {
            out.push(item);
        }
    }
    Ok(Value::List(out))
}

#[cfg(test)]
mod tests {
    use super::super::core_registry;
    use crate::evaluator::EvalCtx;
    use crate::vault::ToolVault;
    use sandscript_lang::{DefaultParser, ScriptParser, Value};
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn eval(source: &str) -> Value {
        let program = DefaultParser.parse(source).expect("parse");
        let mut ctx = EvalCtx::new(
            Arc::new(core_registry()),
            Instant::now() + Duration::from_secs(2),
            Arc::new(AtomicBool::new(false)),
            ToolVault::new(),
            None,
        );
        ctx.eval_program(&program).expect("eval")
    }

    #[test]
    fn test_enum_map_over_range() {
        assert_eq!(
            eval("Enum.map(1..3, fn x -> x * 2 end)"),
            Value::List(vec![Value::Int(2), Value::Int(4), Value::Int(6)])
        );
    }

    #[test]
    fn test_enum_reduce() {
        assert_eq!(
            eval("Enum.reduce([1, 2, 3], 0, fn x, acc -> acc + x end)"),
            Value::Int(6)
        );
    }

    #[test]
    fn test_enum_sum_and_sort() {
        assert_eq!(eval("Enum.sum(1..10)"), Value::Int(55));
        assert_eq!(
            eval("Enum.sort([3, 1, 2])"),
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
    }

    #[test]
    fn test_enum_filter_pipeline() {
        assert_eq!(
            eval("1..10 |> Enum.filter(fn x -> rem(x, 2) == 0 end) |> Enum.count()"),
            Value::Int(5)
        );
    }

    #[test]
    fn test_map_put_get() {
        assert_eq!(
            eval("m = Map.put(Map.new(), \"k\", 41); Map.get(m, \"k\") + 1"),
            Value::Int(42)
        );
        assert_eq!(eval("Map.get(%{a: 1}, :b, 0)"), Value::Int(0));
    }

    #[test]
    fn test_map_fetch_tagged() {
        assert_eq!(
            eval("Map.fetch(%{a: 1}, :a)"),
            Value::Tuple(vec![Value::Symbol("ok".into()), Value::Int(1)])
        );
        assert_eq!(eval("Map.fetch(%{a: 1}, :b)"), Value::Symbol("error".into()));
    }

    #[test]
    fn test_map_set_operations() {
        assert_eq!(
            eval("MapSet.to_list(MapSet.union(MapSet.new([1, 2]), MapSet.new([2, 3])))"),
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
        assert_eq!(eval("MapSet.member?(MapSet.new([1]), 1)"), Value::Bool(true));
    }

    #[test]
    fn test_list_helpers() {
        assert_eq!(
            eval("List.flatten([[1, [2]], [3]])"),
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
        assert_eq!(eval("List.first([])"), Value::Nil);
    }

    #[test]
    fn test_range_to_list() {
        assert_eq!(
            eval("Range.to_list(1..3)"),
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
    }

    #[test]
    fn test_tuple_round_trip() {
        assert_eq!(
            eval("Tuple.to_list(List.to_tuple([1, 2]))"),
            Value::List(vec![Value::Int(1), Value::Int(2)])
        );
    }
}
