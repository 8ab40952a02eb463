//! Encoding modules: `Base` (base64) and `URI` (percent encoding).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use sandscript_lang::value::Value;

use crate::registry::ModuleDef;

use super::{exception, expect_args, str_arg};

/// Characters escaped by `URI.encode`: controls plus the characters that are
/// unsafe inside a URI component while keeping `/:?#&=` usable in full URIs.
const URI_UNSAFE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'|')
    .add(b'\\')
    .add(b'^');

pub fn base_module() -> ModuleDef {
    let mut m = ModuleDef::new("Base");

    m.register("encode64", |_ctx, args| {
        expect_args("Base.encode64", args, 1)?;
        Ok(Value::Str(STANDARD.encode(str_arg("Base.encode64", args, 0)?)))
    });
    m.register("decode64", |_ctx, args| {
        expect_args("Base.decode64", args, 1)?;
        Ok(match decode64(str_arg("Base.decode64", args, 0)?) {
            Some(decoded) => Value::Tuple(vec![Value::Symbol("ok".into()), Value::Str(decoded)]),
            None => Value::Symbol("error".into()),
        })
    });
    m.register("decode64!", |_ctx, args| {
        expect_args("Base.decode64!", args, 1)?;
        decode64(str_arg("Base.decode64!", args, 0)?)
            .map(Value::Str)
            .ok_or_else(|| exception("Base.decode64!: invalid base64"))
    });

    m
}

pub fn uri_module() -> ModuleDef {
    let mut m = ModuleDef::new("URI");

    m.register("encode", |_ctx, args| {
        expect_args("URI.encode", args, 1)?;
        Ok(Value::Str(
            utf8_percent_encode(str_arg("URI.encode", args, 0)?, URI_UNSAFE).to_string(),
        ))
    });
    m.register("decode", |_ctx, args| {
        expect_args("URI.decode", args, 1)?;
        percent_decode_str(str_arg("URI.decode", args, 0)?)
            .decode_utf8()
            .map(|s| Value::Str(s.into_owned()))
            .map_err(|_| exception("URI.decode: invalid percent-encoding"))
    });

    m
}

fn decode64(input: &str) -> Option<String> {
    let bytes = STANDARD.decode(input).ok()?;
    String::from_utf8(bytes).ok()
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
    fn test_base64_round_trip() {
        assert_eq!(eval("Base.encode64(\"abc\")"), Value::Str("YWJj".into()));
        assert_eq!(
            eval("Base.decode64(\"YWJj\")"),
            Value::Tuple(vec![Value::Symbol("ok".into()), Value::Str("abc".into())])
        );
        assert_eq!(eval("Base.decode64(\"!!\")"), Value::Symbol("error".into()));
    }

    #[test]
    fn test_uri_encode_decode() {
        assert_eq!(
            eval("URI.encode(\"a b\")"),
            Value::Str("a%20b".into())
        );
        assert_eq!(eval("URI.decode(\"a%20b\")"), Value::Str("a b".into()));
    }
}
