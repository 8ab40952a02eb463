//! The `Kernel` module: operators as named functions, introspection helpers,
//! and `sleep` — the single process-related operation the sandbox exposes.

use std::time::{Duration, Instant};

use sandscript_lang::render::{render_value, RenderLimits};
use sandscript_lang::value::Value;

use crate::evaluator::EvalError;
use crate::registry::ModuleDef;

use super::{arg, compare, exception, expect_args, int_arg, list_arg, num_arg, str_arg, tuple_arg};

pub fn module() -> ModuleDef {
    let mut m = ModuleDef::new("Kernel");

    m.register("+", |_ctx, args| {
        expect_args("Kernel.+", args, 2)?;
        arith("Kernel.+", args, |a, b| a.checked_add(b), |a, b| a + b)
    });
    m.register("-", |_ctx, args| match args.len() {
        1 => match &args[0] {
            Value::Int(n) => Ok(Value::Int(-n)),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(exception(format!(
                "Kernel.-: expected number, got {}",
                other.type_name()
            ))),
        },
        2 => arith("Kernel.-", args, |a, b| a.checked_sub(b), |a, b| a - b),
        n => Err(exception(format!("Kernel.- expects 1 or 2 arguments, got {n}"))),
    });
    m.register("*", |_ctx, args| {
        expect_args("Kernel.*", args, 2)?;
        arith("Kernel.*", args, |a, b| a.checked_mul(b), |a, b| a * b)
    });
    m.register("/", |_ctx, args| {
        expect_args("Kernel./", args, 2)?;
        let a = num_arg("Kernel./", args, 0)?;
        let b = num_arg("Kernel./", args, 1)?;
        if b == 0.0 {
            return Err(exception("division by zero"));
        }
        Ok(Value::Float(a / b))
    });
    m.register("div", |_ctx, args| {
        expect_args("Kernel.div", args, 2)?;
        let a = int_arg("Kernel.div", args, 0)?;
        let b = int_arg("Kernel.div", args, 1)?;
        if b == 0 {
            return Err(exception("division by zero"));
        }
        Ok(Value::Int(a.div_euclid(b)))
    });
    m.register("rem", |_ctx, args| {
        expect_args("Kernel.rem", args, 2)?;
        let a = int_arg("Kernel.rem", args, 0)?;
        let b = int_arg("Kernel.rem", args, 1)?;
        if b == 0 {
            return Err(exception("division by zero"));
        }
        Ok(Value::Int(a % b))
    });

    m.register("==", |_ctx, args| {
        expect_args("Kernel.==", args, 2)?;
        Ok(Value::Bool(args[0].loose_eq(&args[1])))
    });
    m.register("!=", |_ctx, args| {
        expect_args("Kernel.!=", args, 2)?;
        Ok(Value::Bool(!args[0].loose_eq(&args[1])))
    });
    m.register("===", |_ctx, args| {
        expect_args("Kernel.===", args, 2)?;
        Ok(Value::Bool(args[0] == args[1]))
    });
    m.register("!==", |_ctx, args| {
        expect_args("Kernel.!==", args, 2)?;
        Ok(Value::Bool(args[0] != args[1]))
    });
    m.register("<", |_ctx, args| {
        expect_args("Kernel.<", args, 2)?;
        Ok(Value::Bool(compare("Kernel.<", &args[0], &args[1])?.is_lt()))
    });
    m.register(">", |_ctx, args| {
        expect_args("Kernel.>", args, 2)?;
        Ok(Value::Bool(compare("Kernel.>", &args[0], &args[1])?.is_gt()))
    });
    m.register("<=", |_ctx, args| {
        expect_args("Kernel.<=", args, 2)?;
        Ok(Value::Bool(compare("Kernel.<=", &args[0], &args[1])?.is_le()))
    });
    m.register(">=", |_ctx, args| {
        expect_args("Kernel.>=", args, 2)?;
        Ok(Value::Bool(compare("Kernel.>=", &args[0], &args[1])?.is_ge()))
    });

    // Eager variants; the evaluator short-circuits the operator spelling.
    m.register("and", |_ctx, args| {
        expect_args("Kernel.and", args, 2)?;
        Ok(if args[0].is_truthy() {
            args[1].clone()
        } else {
            args[0].clone()
        })
    });
    m.register("or", |_ctx, args| {
        expect_args("Kernel.or", args, 2)?;
        Ok(if args[0].is_truthy() {
            args[0].clone()
        } else {
            args[1].clone()
        })
    });
    m.register("not", |_ctx, args| {
        expect_args("Kernel.not", args, 1)?;
        Ok(Value::Bool(!args[0].is_truthy()))
    });

    m.register("++", |_ctx, args| {
        expect_args("Kernel.++", args, 2)?;
        let a = list_arg("Kernel.++", args, 0)?;
        let b = list_arg("Kernel.++", args, 1)?;
        let mut out = a.to_vec();
        out.extend(b.iter().cloned());
        Ok(Value::List(out))
    });
    m.register("--", |_ctx, args| {
        expect_args("Kernel.--", args, 2)?;
        let a = list_arg("Kernel.--", args, 0)?;
        let b = list_arg("Kernel.--", args, 1)?;
        let mut out = a.to_vec();
        for needle in b {
            if let Some(pos) = out.iter().position(|v| v == needle) {
                out.remove(pos);
            }
        }
        Ok(Value::List(out))
    });
    m.register("<>", |_ctx, args| {
        expect_args("Kernel.<>", args, 2)?;
        let a = str_arg("Kernel.<>", args, 0)?;
        let b = str_arg("Kernel.<>", args, 1)?;
        Ok(Value::Str(format!("{a}{b}")))
    });

    m.register("inspect", |_ctx, args| {
        expect_args("Kernel.inspect", args, 1)?;
        Ok(Value::Str(render_value(&args[0], &RenderLimits::default())))
    });
    m.register("to_string", |_ctx, args| {
        expect_args("Kernel.to_string", args, 1)?;
        Ok(Value::Str(match &args[0] {
            Value::Str(s) => s.clone(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => format!("{f:?}"),
            Value::Bool(b) => b.to_string(),
            Value::Nil => String::new(),
            Value::Symbol(s) => s.clone(),
            other => render_value(other, &RenderLimits::default()),
        }))
    });

    m.register("byte_size", |_ctx, args| {
        expect_args("Kernel.byte_size", args, 1)?;
        Ok(Value::Int(str_arg("Kernel.byte_size", args, 0)?.len() as i64))
    });
    m.register("bit_size", |_ctx, args| {
        expect_args("Kernel.bit_size", args, 1)?;
        Ok(Value::Int(
            (str_arg("Kernel.bit_size", args, 0)?.len() * 8) as i64,
        ))
    });
    m.register("length", |_ctx, args| {
        expect_args("Kernel.length", args, 1)?;
        Ok(Value::Int(list_arg("Kernel.length", args, 0)?.len() as i64))
    });
    m.register("tuple_size", |_ctx, args| {
        expect_args("Kernel.tuple_size", args, 1)?;
        Ok(Value::Int(
            tuple_arg("Kernel.tuple_size", args, 0)?.len() as i64
        ))
    });
    m.register("map_size", |_ctx, args| {
        expect_args("Kernel.map_size", args, 1)?;
        match arg("Kernel.map_size", args, 0)? {
            Value::Map(entries) => Ok(Value::Int(entries.len() as i64)),
            other => Err(exception(format!(
                "Kernel.map_size: expected map, got {}",
                other.type_name()
            ))),
        }
    });

    m.register("hd", |_ctx, args| {
        expect_args("Kernel.hd", args, 1)?;
        list_arg("Kernel.hd", args, 0)?
            .first()
            .cloned()
            .ok_or_else(|| exception("Kernel.hd: empty list"))
    });
    m.register("tl", |_ctx, args| {
        expect_args("Kernel.tl", args, 1)?;
        let items = list_arg("Kernel.tl", args, 0)?;
        if items.is_empty() {
            return Err(exception("Kernel.tl: empty list"));
        }
        Ok(Value::List(items[1..].to_vec()))
    });
    m.register("elem", |_ctx, args| {
        expect_args("Kernel.elem", args, 2)?;
        let items = tuple_arg("Kernel.elem", args, 0)?;
        let idx = int_arg("Kernel.elem", args, 1)?;
        items
            .get(usize::try_from(idx).map_err(|_| exception("Kernel.elem: negative index"))?)
            .cloned()
            .ok_or_else(|| exception(format!("Kernel.elem: index {idx} out of range")))
    });

    m.register("abs", |_ctx, args| {
        expect_args("Kernel.abs", args, 1)?;
        match arg("Kernel.abs", args, 0)? {
            Value::Int(n) => Ok(Value::Int(n.abs())),
            Value::Float(f) => Ok(Value::Float(f.abs())),
            other => Err(exception(format!(
                "Kernel.abs: expected number, got {}",
                other.type_name()
            ))),
        }
    });
    m.register("min", |_ctx, args| {
        expect_args("Kernel.min", args, 2)?;
        Ok(if compare("Kernel.min", &args[0], &args[1])?.is_le() {
            args[0].clone()
        } else {
            args[1].clone()
        })
    });
    m.register("max", |_ctx, args| {
        expect_args("Kernel.max", args, 2)?;
        Ok(if compare("Kernel.max", &args[0], &args[1])?.is_ge() {
            args[0].clone()
        } else {
            args[1].clone()
        })
    });
    m.register("trunc", |_ctx, args| {
        expect_args("Kernel.trunc", args, 1)?;
        Ok(Value::Int(num_arg("Kernel.trunc", args, 0)?.trunc() as i64))
    });
    m.register("round", |_ctx, args| {
        expect_args("Kernel.round", args, 1)?;
        Ok(Value::Int(num_arg("Kernel.round", args, 0)?.round() as i64))
    });
    m.register("floor", |_ctx, args| {
        expect_args("Kernel.floor", args, 1)?;
        Ok(Value::Int(num_arg("Kernel.floor", args, 0)?.floor() as i64))
    });
    m.register("ceil", |_ctx, args| {
        expect_args("Kernel.ceil", args, 1)?;
        Ok(Value::Int(num_arg("Kernel.ceil", args, 0)?.ceil() as i64))
    });

    for (name, pred) in PREDICATES {
        m.register(name, move |_ctx, args| {
            expect_args(name, args, 1)?;
            Ok(Value::Bool(pred(&args[0])))
        });
    }

    // The one process-related operation. Sleeps in short slices so
    // cancellation and the deadline stay responsive.
    m.register("sleep", |ctx, args| {
        expect_args("Kernel.sleep", args, 1)?;
        let ms = int_arg("Kernel.sleep", args, 0)?.max(0) as u64;
        let target = Instant::now() + Duration::from_millis(ms);
        loop {
            ctx.check_interrupt()?;
            let now = Instant::now();
            if now >= target {
                break;
            }
            let slice = (target - now).min(Duration::from_millis(10));
            std::thread::sleep(slice);
        }
        Ok(Value::Nil)
    });

    m.register("throw", |_ctx, args| {
        expect_args("Kernel.throw", args, 1)?;
        Err(EvalError::Throw(args[0].clone()))
    });
    m.register("raise", |_ctx, args| {
        expect_args("Kernel.raise", args, 1)?;
        Err(match &args[0] {
            Value::Str(message) => exception(message.clone()),
            other => exception(render_value(other, &RenderLimits::default())),
        })
    });

    m
}

type Predicate = fn(&Value) -> bool;

const PREDICATES: &[(&str, Predicate)] = &[
    ("is_nil", |v| matches!(v, Value::Nil)),
    ("is_boolean", |v| matches!(v, Value::Bool(_))),
    ("is_integer", |v| matches!(v, Value::Int(_))),
    ("is_float", |v| matches!(v, Value::Float(_))),
    ("is_number", |v| matches!(v, Value::Int(_) | Value::Float(_))),
    ("is_binary", |v| matches!(v, Value::Str(_))),
    ("is_list", |v| matches!(v, Value::List(_))),
    ("is_map", |v| matches!(v, Value::Map(_))),
    ("is_tuple", |v| matches!(v, Value::Tuple(_))),
    ("is_function", |v| matches!(v, Value::Fun(_))),
];

fn arith(
    fun: &str,
    args: &[Value],
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, EvalError> {
    match (&args[0], &args[1]) {
        (Value::Int(a), Value::Int(b)) => int_op(*a, *b)
            .map(Value::Int)
            .ok_or_else(|| exception(format!("{fun}: integer overflow"))),
        (Value::Int(a), Value::Float(b)) => Ok(Value::Float(float_op(*a as f64, *b))),
        (Value::Float(a), Value::Int(b)) => Ok(Value::Float(float_op(*a, *b as f64))),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(float_op(*a, *b))),
        (a, b) => Err(exception(format!(
            "{fun}: expected numbers, got {} and {}",
            a.type_name(),
            b.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::EvalCtx;
    use crate::vault::ToolVault;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    fn ctx() -> EvalCtx {
        EvalCtx::new(
            Arc::new(super::super::core_registry()),
            Instant::now() + Duration::from_secs(1),
            Arc::new(AtomicBool::new(false)),
            ToolVault::new(),
            None,
        )
    }

    fn call(function: &str, args: &[Value]) -> Result<Value, EvalError> {
        ctx().call_module("Kernel", function, args)
    }

    #[test]
    fn test_mixed_arithmetic() {
        assert_eq!(
            call("+", &[Value::Int(1), Value::Float(0.5)]).unwrap(),
            Value::Float(1.5)
        );
        assert_eq!(
            call("div", &[Value::Int(7), Value::Int(2)]).unwrap(),
            Value::Int(3)
        );
    }

    #[test]
    fn test_division_by_zero_raises() {
        assert!(call("/", &[Value::Int(1), Value::Int(0)]).is_err());
        assert!(call("div", &[Value::Int(1), Value::Int(0)]).is_err());
    }

    #[test]
    fn test_loose_vs_strict_equality() {
        assert_eq!(
            call("==", &[Value::Int(1), Value::Float(1.0)]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            call("===", &[Value::Int(1), Value::Float(1.0)]).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_list_operators() {
        let a = Value::List(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::List(vec![Value::Int(2)]);
        assert_eq!(
            call("++", &[a.clone(), b.clone()]).unwrap(),
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(2)])
        );
        assert_eq!(
            call("--", &[a, b]).unwrap(),
            Value::List(vec![Value::Int(1)])
        );
    }

    #[test]
    fn test_inspect_and_to_string() {
        assert_eq!(
            call("inspect", &[Value::Str("a".into())]).unwrap(),
            Value::Str("\"a\"".into())
        );
        assert_eq!(
            call("to_string", &[Value::Int(42)]).unwrap(),
            Value::Str("42".into())
        );
    }

    #[test]
    fn test_predicates() {
        assert_eq!(call("is_nil", &[Value::Nil]).unwrap(), Value::Bool(true));
        assert_eq!(
            call("is_binary", &[Value::Str("x".into())]).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(call("is_list", &[Value::Int(1)]).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_throw_surfaces_value() {
        let err = call("throw", &[Value::Symbol("halted".into())]).unwrap_err();
        assert!(matches!(err, EvalError::Throw(Value::Symbol(s)) if s == "halted"));
    }

    #[test]
    fn test_integer_overflow_raises() {
        let err = call("+", &[Value::Int(i64::MAX), Value::Int(1)]).unwrap_err();
        assert!(matches!(err, EvalError::Exception(m) if m.contains("overflow")));
    }
}
