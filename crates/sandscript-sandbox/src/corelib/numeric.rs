//! Numeric modules: `Integer`, `Float`, `Math`, `Bitwise`, and `Random`.

use rand::Rng;
use sandscript_lang::value::Value;

use crate::registry::ModuleDef;

use super::{exception, expect_args, int_arg, num_arg, str_arg};

pub fn integer_module() -> ModuleDef {
    let mut m = ModuleDef::new("Integer");

    m.register("parse", |_ctx, args| {
        expect_args("Integer.parse", args, 1)?;
        let s = str_arg("Integer.parse", args, 0)?;
        let trimmed = s.trim_start();
        let mut end = 0;
        for (i, c) in trimmed.char_indices() {
            if c.is_ascii_digit() || (i == 0 && (c == '-' || c == '+')) {
                end = i + c.len_utf8();
            } else {
                break;
            }
        }
        match trimmed[..end].parse::<i64>() {
            Ok(n) => Ok(Value::Tuple(vec![
                Value::Int(n),
                Value::Str(trimmed[end..].to_string()),
            ])),
            Err(_) => Ok(Value::Symbol("error".into())),
        }
    });
    m.register("to_string", |_ctx, args| {
        let n = int_arg("Integer.to_string", args, 0)?;
        match args.len() {
            1 => Ok(Value::Str(n.to_string())),
            2 => {
                let base = int_arg("Integer.to_string", args, 1)?;
                if !(2..=36).contains(&base) {
                    return Err(exception("Integer.to_string: base must be in 2..36"));
                }
                Ok(Value::Str(to_base(n, base as u32)))
            }
            n => Err(exception(format!(
                "Integer.to_string expects 1 or 2 arguments, got {n}"
            ))),
        }
    });
    m.register("digits", |_ctx, args| {
        expect_args("Integer.digits", args, 1)?;
        let n = int_arg("Integer.digits", args, 0)?;
        if n < 0 {
            return Err(exception("Integer.digits: negative integer"));
        }
        let digits: Vec<Value> = n
            .to_string()
            .bytes()
            .map(|b| Value::Int((b - b'0') as i64))
            .collect();
        Ok(Value::List(digits))
    });
    m.register("undigits", |_ctx, args| {
        expect_args("Integer.undigits", args, 1)?;
        let items = match &args[0] {
            Value::List(items) => items,
            other => {
                return Err(exception(format!(
                    "Integer.undigits: expected list, got {}",
                    other.type_name()
                )))
            }
        };
        let mut acc: i64 = 0;
        for item in items {
            let Value::Int(d) = item else {
                return Err(exception("Integer.undigits: digits must be integers"));
            };
            acc = acc
                .checked_mul(10)
                .and_then(|a| a.checked_add(*d))
                .ok_or_else(|| exception("Integer.undigits: overflow"))?;
        }
        Ok(Value::Int(acc))
    });
    m.register("mod", |_ctx, args| {
        expect_args("Integer.mod", args, 2)?;
        let a = int_arg("Integer.mod", args, 0)?;
        let b = int_arg("Integer.mod", args, 1)?;
        if b == 0 {
            return Err(exception("division by zero"));
        }
        Ok(Value::Int(a.rem_euclid(b)))
    });
    m.register("floor_div", |_ctx, args| {
        expect_args("Integer.floor_div", args, 2)?;
        let a = int_arg("Integer.floor_div", args, 0)?;
        let b = int_arg("Integer.floor_div", args, 1)?;
        if b == 0 {
            return Err(exception("division by zero"));
        }
        Ok(Value::Int(a.div_euclid(b)))
    });
    m.register("pow", |_ctx, args| {
        expect_args("Integer.pow", args, 2)?;
        let base = int_arg("Integer.pow", args, 0)?;
        let exp = int_arg("Integer.pow", args, 1)?;
        let exp = u32::try_from(exp).map_err(|_| exception("Integer.pow: negative exponent"))?;
        base.checked_pow(exp)
            .map(Value::Int)
            .ok_or_else(|| exception("Integer.pow: overflow"))
    });
    m.register("gcd", |_ctx, args| {
        expect_args("Integer.gcd", args, 2)?;
        let mut a = int_arg("Integer.gcd", args, 0)?.unsigned_abs();
        let mut b = int_arg("Integer.gcd", args, 1)?.unsigned_abs();
        while b != 0 {
            let t = b;
            b = a % b;
            a = t;
        }
        Ok(Value::Int(a as i64))
    });
    m.register("is_even", |_ctx, args| {
        expect_args("Integer.is_even", args, 1)?;
        Ok(Value::Bool(int_arg("Integer.is_even", args, 0)? % 2 == 0))
    });
    m.register("is_odd", |_ctx, args| {
        expect_args("Integer.is_odd", args, 1)?;
        Ok(Value::Bool(int_arg("Integer.is_odd", args, 0)? % 2 != 0))
    });

    m
}

pub fn float_module() -> ModuleDef {
    let mut m = ModuleDef::new("Float");

    m.register("parse", |_ctx, args| {
        expect_args("Float.parse", args, 1)?;
        let s = str_arg("Float.parse", args, 0)?;
        match s.trim().parse::<f64>() {
            Ok(f) => Ok(Value::Tuple(vec![Value::Float(f), Value::Str(String::new())])),
            Err(_) => Ok(Value::Symbol("error".into())),
        }
    });
    m.register("round", |_ctx, args| {
        expect_args("Float.round", args, 2)?;
        let f = num_arg("Float.round", args, 0)?;
        let places = int_arg("Float.round", args, 1)?;
        if !(0..=15).contains(&places) {
            return Err(exception("Float.round: precision must be in 0..15"));
        }
        let factor = 10f64.powi(places as i32);
        Ok(Value::Float((f * factor).round() / factor))
    });
    m.register("ceil", |_ctx, args| {
        expect_args("Float.ceil", args, 1)?;
        Ok(Value::Float(num_arg("Float.ceil", args, 0)?.ceil()))
    });
    m.register("floor", |_ctx, args| {
        expect_args("Float.floor", args, 1)?;
        Ok(Value::Float(num_arg("Float.floor", args, 0)?.floor()))
    });
    m.register("to_string", |_ctx, args| {
        expect_args("Float.to_string", args, 1)?;
        Ok(Value::Str(format!("{:?}", num_arg("Float.to_string", args, 0)?)))
    });

    m
}

pub fn math_module() -> ModuleDef {
    let mut m = ModuleDef::new("Math");

    m.register("pow", |_ctx, args| {
        expect_args("Math.pow", args, 2)?;
        Ok(Value::Float(
            num_arg("Math.pow", args, 0)?.powf(num_arg("Math.pow", args, 1)?),
        ))
    });
    m.register("sqrt", |_ctx, args| {
        expect_args("Math.sqrt", args, 1)?;
        let x = num_arg("Math.sqrt", args, 0)?;
        if x < 0.0 {
            return Err(exception("Math.sqrt: negative argument"));
        }
        Ok(Value::Float(x.sqrt()))
    });
    m.register("log", |_ctx, args| {
        expect_args("Math.log", args, 1)?;
        positive_only("Math.log", num_arg("Math.log", args, 0)?, f64::ln)
    });
    m.register("log2", |_ctx, args| {
        expect_args("Math.log2", args, 1)?;
        positive_only("Math.log2", num_arg("Math.log2", args, 0)?, f64::log2)
    });
    m.register("log10", |_ctx, args| {
        expect_args("Math.log10", args, 1)?;
        positive_only("Math.log10", num_arg("Math.log10", args, 0)?, f64::log10)
    });
    m.register("exp", |_ctx, args| {
        expect_args("Math.exp", args, 1)?;
        Ok(Value::Float(num_arg("Math.exp", args, 0)?.exp()))
    });
    m.register("sin", |_ctx, args| {
        expect_args("Math.sin", args, 1)?;
        Ok(Value::Float(num_arg("Math.sin", args, 0)?.sin()))
    });
    m.register("cos", |_ctx, args| {
        expect_args("Math.cos", args, 1)?;
        Ok(Value::Float(num_arg("Math.cos", args, 0)?.cos()))
    });
    m.register("tan", |_ctx, args| {
        expect_args("Math.tan", args, 1)?;
        Ok(Value::Float(num_arg("Math.tan", args, 0)?.tan()))
    });
    m.register("pi", |_ctx, args| {
        expect_args("Math.pi", args, 0)?;
        Ok(Value::Float(std::f64::consts::PI))
    });

    m
}

pub fn bitwise_module() -> ModuleDef {
    let mut m = ModuleDef::new("Bitwise");

    m.register("band", |_ctx, args| {
        expect_args("Bitwise.band", args, 2)?;
        Ok(Value::Int(
            int_arg("Bitwise.band", args, 0)? & int_arg("Bitwise.band", args, 1)?,
        ))
    });
    m.register("bor", |_ctx, args| {
        expect_args("Bitwise.bor", args, 2)?;
        Ok(Value::Int(
            int_arg("Bitwise.bor", args, 0)? | int_arg("Bitwise.bor", args, 1)?,
        ))
    });
    m.register("bxor", |_ctx, args| {
        expect_args("Bitwise.bxor", args, 2)?;
        Ok(Value::Int(
            int_arg("Bitwise.bxor", args, 0)? ^ int_arg("Bitwise.bxor", args, 1)?,
        ))
    });
    m.register("bnot", |_ctx, args| {
        expect_args("Bitwise.bnot", args, 1)?;
        Ok(Value::Int(!int_arg("Bitwise.bnot", args, 0)?))
    });
    m.register("bsl", |_ctx, args| {
        expect_args("Bitwise.bsl", args, 2)?;
        let n = int_arg("Bitwise.bsl", args, 0)?;
        let shift = int_arg("Bitwise.bsl", args, 1)?;
        let shift = u32::try_from(shift).map_err(|_| exception("Bitwise.bsl: negative shift"))?;
        n.checked_shl(shift)
            .map(Value::Int)
            .ok_or_else(|| exception("Bitwise.bsl: shift out of range"))
    });
    m.register("bsr", |_ctx, args| {
        expect_args("Bitwise.bsr", args, 2)?;
        let n = int_arg("Bitwise.bsr", args, 0)?;
        let shift = int_arg("Bitwise.bsr", args, 1)?;
        let shift = u32::try_from(shift).map_err(|_| exception("Bitwise.bsr: negative shift"))?;
        n.checked_shr(shift)
            .map(Value::Int)
            .ok_or_else(|| exception("Bitwise.bsr: shift out of range"))
    });

    m
}

pub fn random_module() -> ModuleDef {
    let mut m = ModuleDef::new("Random");

    m.register("uniform", |_ctx, args| match args.len() {
        0 => Ok(Value::Float(rand::thread_rng().gen_range(0.0..1.0))),
        1 => {
            let n = int_arg("Random.uniform", args, 0)?;
            if n < 1 {
                return Err(exception("Random.uniform: bound must be >= 1"));
            }
            Ok(Value::Int(rand::thread_rng().gen_range(1..=n)))
        }
        n => Err(exception(format!("Random.uniform expects 0 or 1 arguments, got {n}"))),
    });

    m
}

fn positive_only(
    fun: &str,
    x: f64,
    op: fn(f64) -> f64,
) -> Result<Value, crate::evaluator::EvalError> {
    if x <= 0.0 {
        return Err(exception(format!("{fun}: argument must be positive")));
    }
    Ok(Value::Float(op(x)))
}

fn to_base(n: i64, base: u32) -> String {
    if n == 0 {
        return "0".to_string();
    }
    const DIGITS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    let negative = n < 0;
    let mut n = n.unsigned_abs();
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % base as u64) as usize]);
        n /= base as u64;
    }
    if negative {
        out.push(b'-');
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
