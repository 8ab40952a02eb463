//! Date/time reading: `Date`, `Time`, `DateTime`, and `Clock`.
//!
//! Read-only by design — sandboxed code can observe time but never set it.

use std::sync::OnceLock;
use std::time::Instant;

use chrono::Utc;
use sandscript_lang::value::Value;

use crate::registry::ModuleDef;

use super::expect_args;

fn process_epoch() -> Instant {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    *EPOCH.get_or_init(Instant::now)
}

pub fn date_module() -> ModuleDef {
    let mut m = ModuleDef::new("Date");
    m.register("utc_today", |_ctx, args| {
        expect_args("Date.utc_today", args, 0)?;
        Ok(Value::Str(Utc::now().format("%Y-%m-%d").to_string()))
    });
    m
}

pub fn time_module() -> ModuleDef {
    let mut m = ModuleDef::new("Time");
    m.register("utc_now", |_ctx, args| {
        expect_args("Time.utc_now", args, 0)?;
        Ok(Value::Str(Utc::now().format("%H:%M:%S").to_string()))
    });
    m
}

pub fn datetime_module() -> ModuleDef {
    let mut m = ModuleDef::new("DateTime");
    m.register("utc_now", |_ctx, args| {
        expect_args("DateTime.utc_now", args, 0)?;
        Ok(Value::Str(Utc::now().to_rfc3339()))
    });
    m.register("to_unix", |_ctx, args| {
        expect_args("DateTime.to_unix", args, 0)?;
        Ok(Value::Int(Utc::now().timestamp()))
    });
    m
}

pub fn clock_module() -> ModuleDef {
    let mut m = ModuleDef::new("Clock");
    m.register("monotonic_time", |_ctx, args| {
        expect_args("Clock.monotonic_time", args, 0)?;
        Ok(Value::Int(process_epoch().elapsed().as_millis() as i64))
    });
    m.register("system_time", |_ctx, args| {
        expect_args("Clock.system_time", args, 0)?;
        Ok(Value::Int(Utc::now().timestamp_millis()))
    });
    m
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
    fn test_date_shape() {
        let Value::Str(s) = eval("Date.utc_today()") else {
            panic!("expected string");
        };
        assert_eq!(s.len(), 10);
        assert_eq!(&s[4..5], "-");
    }

    #[test]
    fn test_monotonic_time_is_nondecreasing() {
        let Value::Int(a) = eval("Clock.monotonic_time()") else {
            panic!("expected int");
        };
        let Value::Int(b) = eval("Clock.monotonic_time()") else {
            panic!("expected int");
        };
        assert!(b >= a);
    }

    #[test]
    fn test_system_time_is_plausible() {
        let Value::Int(ms) = eval("Clock.system_time()") else {
            panic!("expected int");
        };
        // After 2020-01-01 in milliseconds.
        assert!(ms > 1_577_836_800_000);
    }
}
