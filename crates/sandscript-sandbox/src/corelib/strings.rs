//! Text modules: `String`, `Binary`, and `Regex`.
//!
//! `String` works in characters, `Binary` in bytes. Neither exposes any
//! conversion into symbols. Regex patterns are compiled per call from
//! pattern strings; compilation failures surface as script exceptions.

use regex::Regex;
use sandscript_lang::value::Value;

use crate::registry::ModuleDef;

use super::{exception, expect_args, int_arg, str_arg};

pub fn string_module() -> ModuleDef {
    let mut m = ModuleDef::new("String");

    m.register("length", |_ctx, args| {
        expect_args("String.length", args, 1)?;
        Ok(Value::Int(
            str_arg("String.length", args, 0)?.chars().count() as i64
        ))
    });
    m.register("upcase", |_ctx, args| {
        expect_args("String.upcase", args, 1)?;
        Ok(Value::Str(str_arg("String.upcase", args, 0)?.to_uppercase()))
    });
    m.register("downcase", |_ctx, args| {
        expect_args("String.downcase", args, 1)?;
        Ok(Value::Str(str_arg("String.downcase", args, 0)?.to_lowercase()))
    });
    m.register("capitalize", |_ctx, args| {
        expect_args("String.capitalize", args, 1)?;
        let s = str_arg("String.capitalize", args, 0)?;
        let mut chars = s.chars();
        Ok(Value::Str(match chars.next() {
            Some(first) => {
                first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
            }
            None => String::new(),
        }))
    });
    m.register("trim", |_ctx, args| {
        expect_args("String.trim", args, 1)?;
        Ok(Value::Str(str_arg("String.trim", args, 0)?.trim().to_string()))
    });
    m.register("split", |_ctx, args| {
        let s = str_arg("String.split", args, 0)?;
        let parts: Vec<Value> = match args.len() {
            1 => s.split_whitespace().map(|p| Value::Str(p.to_string())).collect(),
            2 => {
                let sep = str_arg("String.split", args, 1)?;
                if sep.is_empty() {
                    return Err(exception("String.split: separator cannot be empty"));
                }
                s.split(sep).map(|p| Value::Str(p.to_string())).collect()
            }
            n => return Err(exception(format!("String.split expects 1 or 2 arguments, got {n}"))),
        };
        Ok(Value::List(parts))
    });
    m.register("contains?", |_ctx, args| {
        expect_args("String.contains?", args, 2)?;
        Ok(Value::Bool(
            str_arg("String.contains?", args, 0)?.contains(str_arg("String.contains?", args, 1)?),
        ))
    });
    m.register("starts_with?", |_ctx, args| {
        expect_args("String.starts_with?", args, 2)?;
        Ok(Value::Bool(
            str_arg("String.starts_with?", args, 0)?
                .starts_with(str_arg("String.starts_with?", args, 1)?),
        ))
    });
    m.register("ends_with?", |_ctx, args| {
        expect_args("String.ends_with?", args, 2)?;
        Ok(Value::Bool(
            str_arg("String.ends_with?", args, 0)?
                .ends_with(str_arg("String.ends_with?", args, 1)?),
        ))
    });
    m.register("replace", |_ctx, args| {
        expect_args("String.replace", args, 3)?;
        let s = str_arg("String.replace", args, 0)?;
        let from = str_arg("String.replace", args, 1)?;
        let to = str_arg("String.replace", args, 2)?;
        if from.is_empty() {
            return Err(exception("String.replace: pattern cannot be empty"));
        }
        Ok(Value::Str(s.replace(from, to)))
    });
    m.register("slice", |_ctx, args| {
        expect_args("String.slice", args, 3)?;
        let chars: Vec<char> = str_arg("String.slice", args, 0)?.chars().collect();
        let start = int_arg("String.slice", args, 1)?;
        let len = int_arg("String.slice", args, 2)?.max(0) as usize;
        let start = resolve_index(start, chars.len());
        let Some(start) = start else {
            return Ok(Value::Str(String::new()));
        };
        Ok(Value::Str(
            chars.iter().skip(start).take(len).collect::<String>(),
        ))
    });
    m.register("at", |_ctx, args| {
        expect_args("String.at", args, 2)?;
        let chars: Vec<char> = str_arg("String.at", args, 0)?.chars().collect();
        let idx = resolve_index(int_arg("String.at", args, 1)?, chars.len());
        Ok(match idx.and_then(|i| chars.get(i)) {
            Some(c) => Value::Str(c.to_string()),
            None => Value::Nil,
        })
    });
    m.register("reverse", |_ctx, args| {
        expect_args("String.reverse", args, 1)?;
        Ok(Value::Str(
            str_arg("String.reverse", args, 0)?.chars().rev().collect(),
        ))
    });
    m.register("duplicate", |_ctx, args| {
        expect_args("String.duplicate", args, 2)?;
        let s = str_arg("String.duplicate", args, 0)?;
        let n = int_arg("String.duplicate", args, 1)?.max(0) as usize;
        if s.len().saturating_mul(n) > 10_000_000 {
            return Err(exception("String.duplicate: result is too large"));
        }
        Ok(Value::Str(s.repeat(n)))
    });
    m.register("graphemes", |_ctx, args| {
        expect_args("String.graphemes", args, 1)?;
        Ok(Value::List(
            str_arg("String.graphemes", args, 0)?
                .chars()
                .map(|c| Value::Str(c.to_string()))
                .collect(),
        ))
    });
    m.register("to_integer", |_ctx, args| {
        expect_args("String.to_integer", args, 1)?;
        let s = str_arg("String.to_integer", args, 0)?;
        s.trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| exception(format!("String.to_integer: invalid integer \"{s}\"")))
    });
    m.register("to_float", |_ctx, args| {
        expect_args("String.to_float", args, 1)?;
        let s = str_arg("String.to_float", args, 0)?;
        s.trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| exception(format!("String.to_float: invalid float \"{s}\"")))
    });

    m
}

pub fn binary_module() -> ModuleDef {
    let mut m = ModuleDef::new("Binary");

    m.register("first", |_ctx, args| {
        expect_args("Binary.first", args, 1)?;
        str_arg("Binary.first", args, 0)?
            .bytes()
            .next()
            .map(|b| Value::Int(b as i64))
            .ok_or_else(|| exception("Binary.first: empty binary"))
    });
    m.register("last", |_ctx, args| {
        expect_args("Binary.last", args, 1)?;
        str_arg("Binary.last", args, 0)?
            .bytes()
            .last()
            .map(|b| Value::Int(b as i64))
            .ok_or_else(|| exception("Binary.last: empty binary"))
    });
    m.register("at", |_ctx, args| {
        expect_args("Binary.at", args, 2)?;
        let bytes = str_arg("Binary.at", args, 0)?.as_bytes();
        let idx = int_arg("Binary.at", args, 1)?;
        Ok(usize::try_from(idx)
            .ok()
            .and_then(|i| bytes.get(i))
            .map(|b| Value::Int(*b as i64))
            .unwrap_or(Value::Nil))
    });
    m.register("part", |_ctx, args| {
        expect_args("Binary.part", args, 3)?;
        let s = str_arg("Binary.part", args, 0)?;
        let start = int_arg("Binary.part", args, 1)?;
        let len = int_arg("Binary.part", args, 2)?.max(0) as usize;
        let start = usize::try_from(start)
            .map_err(|_| exception("Binary.part: negative offset"))?;
        let end = start.saturating_add(len).min(s.len());
        if start > s.len() {
            return Err(exception("Binary.part: offset out of range"));
        }
        match s.get(start..end) {
            Some(part) => Ok(Value::Str(part.to_string())),
            None => Err(exception("Binary.part: slice is not on a character boundary")),
        }
    });

    m
}

pub fn regex_module() -> ModuleDef {
    let mut m = ModuleDef::new("Regex");

    m.register("match?", |_ctx, args| {
        expect_args("Regex.match?", args, 2)?;
        let re = compile(str_arg("Regex.match?", args, 0)?)?;
        Ok(Value::Bool(re.is_match(str_arg("Regex.match?", args, 1)?)))
    });
    m.register("run", |_ctx, args| {
        expect_args("Regex.run", args, 2)?;
        let re = compile(str_arg("Regex.run", args, 0)?)?;
        let haystack = str_arg("Regex.run", args, 1)?;
        Ok(match re.captures(haystack) {
            Some(caps) => Value::List(
                caps.iter()
                    .map(|c| match c {
                        Some(mat) => Value::Str(mat.as_str().to_string()),
                        None => Value::Nil,
                    })
                    .collect(),
            ),
            None => Value::Nil,
        })
    });
    m.register("scan", |_ctx, args| {
        expect_args("Regex.scan", args, 2)?;
        let re = compile(str_arg("Regex.scan", args, 0)?)?;
        let haystack = str_arg("Regex.scan", args, 1)?;
        Ok(Value::List(
            re.find_iter(haystack)
                .take(10_000)
                .map(|mat| Value::Str(mat.as_str().to_string()))
                .collect(),
        ))
    });
    m.register("replace", |_ctx, args| {
        expect_args("Regex.replace", args, 3)?;
        let re = compile(str_arg("Regex.replace", args, 0)?)?;
        let haystack = str_arg("Regex.replace", args, 1)?;
        let replacement = str_arg("Regex.replace", args, 2)?;
        Ok(Value::Str(re.replace_all(haystack, replacement).into_owned()))
    });
    m.register("split", |_ctx, args| {
        expect_args("Regex.split", args, 2)?;
        let re = compile(str_arg("Regex.split", args, 0)?)?;
        let haystack = str_arg("Regex.split", args, 1)?;
        Ok(Value::List(
            re.split(haystack)
                .map(|p| Value::Str(p.to_string()))
                .collect(),
        ))
    });

    m
}

fn compile(pattern: &str) -> Result<Regex, crate::evaluator::EvalError> {
    if pattern.len() > 1000 {
        return Err(exception("Regex: pattern is too long"));
    }
    Regex::new(pattern).map_err(|e| exception(format!("Regex: invalid pattern: {e}")))
}

fn resolve_index(idx: i64, len: usize) -> Option<usize> {
    if idx < 0 {
        len.checked_sub(idx.unsigned_abs() as usize)
    } else {
        Some(idx as usize)
    }
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
    fn test_string_basics() {
        assert_eq!(eval("String.upcase(\"abc\")"), Value::Str("ABC".into()));
        assert_eq!(eval("String.length(\"héllo\")"), Value::Int(5));
        assert_eq!(
            eval("String.split(\"a,b,c\", \",\")"),
            Value::List(vec![
                Value::Str("a".into()),
                Value::Str("b".into()),
                Value::Str("c".into()),
            ])
        );
    }

    #[test]
    fn test_string_slice_negative_start() {
        assert_eq!(eval("String.slice(\"hello\", -3, 2)"), Value::Str("ll".into()));
        assert_eq!(eval("String.at(\"abc\", -1)"), Value::Str("c".into()));
    }

    #[test]
    fn test_binary_part_respects_boundaries() {
        assert_eq!(eval("Binary.part(\"hello\", 1, 3)"), Value::Str("ell".into()));
        assert_eq!(eval("Binary.first(\"A\")"), Value::Int(65));
    }

    #[test]
    fn test_regex_match_and_run() {
        assert_eq!(eval("Regex.match?(\"a+b\", \"aab\")"), Value::Bool(true));
        assert_eq!(
            eval("Regex.run(\"(a+)(b)\", \"xaab\")"),
            Value::List(vec![
                Value::Str("aab".into()),
                Value::Str("aa".into()),
                Value::Str("b".into()),
            ])
        );
        assert_eq!(eval("Regex.run(\"z\", \"abc\")"), Value::Nil);
    }

    #[test]
    fn test_regex_invalid_pattern_raises() {
        let program = DefaultParser.parse("Regex.match?(\"(\", \"x\")").expect("parse");
        let mut ctx = EvalCtx::new(
            Arc::new(core_registry()),
            Instant::now() + Duration::from_secs(1),
            Arc::new(AtomicBool::new(false)),
            ToolVault::new(),
            None,
        );
        assert!(ctx.eval_program(&program).is_err());
    }
}
