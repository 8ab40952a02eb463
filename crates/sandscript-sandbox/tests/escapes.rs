//! Escape-attempt coverage: every blocked path must fail closed under the
//! default allowlist, and allowlist composition must hold its contract.

use std::time::Duration;

use sandscript_lang::Value;
use sandscript_sandbox::{
    core_registry, default_allowlist, Allowlist, EvalOptions, ModulePermission, Sandbox,
    SandboxError,
};

fn sandbox() -> Sandbox {
    Sandbox::new(core_registry())
}

async fn eval(source: &str) -> Result<Value, SandboxError> {
    sandbox()
        .eval(source, &default_allowlist(), EvalOptions::default())
        .await
}

async fn eval_with(source: &str, allowlist: &Allowlist) -> Result<Value, SandboxError> {
    sandbox().eval(source, allowlist, EvalOptions::default()).await
}

// -------------------------------------------------------------------------
// Blocked primitives and modules
// -------------------------------------------------------------------------

#[tokio::test]
async fn test_filesystem_network_and_os_modules_rejected() {
    for source in [
        "File.read!(\"/etc/passwd\")",
        "File.write!(\"/tmp/x\", \"data\")",
        "System.cmd(\"rm\", [\"-rf\", \"/\"])",
        "Path.join(\"/etc\", \"passwd\")",
        "Os.getenv(\"HOME\")",
        "HttpClient.get(\"http://evil.example\")",
        "Ssh.connect(\"host\", 22)",
    ] {
        let err = eval(source).await.unwrap_err();
        assert_eq!(err.kind(), "restricted", "{source} must be restricted");
        assert!(err.to_string().contains("is restricted"), "{source}");
    }
}

#[tokio::test]
async fn test_process_and_actor_primitives_rejected() {
    for source in [
        "spawn(fn -> 1 end)",
        "spawn_link(fn -> 1 end)",
        "send(1, :msg)",
        "exit(1)",
        "Process.list()",
        "GenServer.call(1, :msg)",
        "Task.async(fn -> 1 end)",
        "Agent.start(fn -> 1 end)",
        "Supervisor.start_link([], [])",
    ] {
        let err = eval(source).await.unwrap_err();
        assert_eq!(err.kind(), "restricted", "{source} must be restricted");
    }
}

#[tokio::test]
async fn test_code_evaluation_rejected() {
    for source in [
        "Code.eval_string(\"1 + 1\")",
        "Code.compile_string(\"x\")",
        "apply(1, 2)",
        "apply(1, 2, 3)",
    ] {
        let err = eval(source).await.unwrap_err();
        assert_eq!(err.kind(), "restricted", "{source} must be restricted");
    }
}

#[tokio::test]
async fn test_capture_bypass_blocked_without_evaluation() {
    // The classic laundering pattern: bind a capture of apply, invoke later.
    let err = eval("f = &apply/3; f.(File, :read!, [\"/etc/passwd\"])")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        SandboxError::Restricted {
            message: "function Kernel.apply/3 is restricted".into()
        }
    );
}

#[tokio::test]
async fn test_blocked_syntactic_forms() {
    for (source, form) in [
        ("import File", "import"),
        ("require File", "require"),
        ("alias File, as: F", "alias"),
        ("receive do\nx -> x\nend", "receive"),
        ("defmodule M do\nend", "defmodule"),
        ("def f do\n1\nend", "def"),
    ] {
        let err = eval(source).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("{form} is not allowed in sandbox"),
            "{source}"
        );
    }
}

#[tokio::test]
async fn test_sleep_is_the_only_process_operation() {
    // Allowed, and it returns nil.
    assert_eq!(eval("sleep(1)").await.unwrap(), Value::Nil);
}

// -------------------------------------------------------------------------
// Default allowlist surface
// -------------------------------------------------------------------------

#[tokio::test]
async fn test_default_allowlist_core_surface_works() {
    assert_eq!(eval("1 + 2").await.unwrap(), Value::Int(3));
    assert_eq!(
        eval("String.upcase(\"ok\")").await.unwrap(),
        Value::Str("OK".into())
    );
    assert_eq!(eval("Enum.sum(Range.to_list(1..4))").await.unwrap(), Value::Int(10));
    assert_eq!(
        eval("Base.encode64(\"hi\")").await.unwrap(),
        Value::Str("aGk=".into())
    );
    assert_eq!(
        eval("inspect({:ok, [1, 2]})").await.unwrap(),
        Value::Str("{:ok, [1, 2]}".into())
    );
}

#[tokio::test]
async fn test_unknown_module_restricted_by_default() {
    let err = eval("Widget.make(1)").await.unwrap_err();
    assert_eq!(err.kind(), "restricted");
}

// -------------------------------------------------------------------------
// Allowlist composition semantics
// -------------------------------------------------------------------------

#[tokio::test]
async fn test_only_grants_exactly_the_named_functions() {
    let allowlist = Allowlist::builder()
        .allow("Kernel", ModulePermission::All)
        .allow("String", ModulePermission::only(["upcase"]))
        .build();

    assert_eq!(
        eval_with("String.upcase(\"a\")", &allowlist).await.unwrap(),
        Value::Str("A".into())
    );
    let err = eval_with("String.downcase(\"A\")", &allowlist).await.unwrap_err();
    assert_eq!(
        err,
        SandboxError::Restricted {
            message: "function String.downcase/1 is restricted".into()
        }
    );
}

#[tokio::test]
async fn test_only_with_nonexistent_function_never_allows() {
    let allowlist = Allowlist::builder()
        .allow("String", ModulePermission::only(["no_such_fn"]))
        .build();
    let err = eval_with("String.no_such_fn(\"a\")", &allowlist).await.unwrap_err();
    assert_eq!(err.kind(), "restricted");
}

#[tokio::test]
async fn test_except_excludes_named_functions() {
    let allowlist = Allowlist::builder()
        .allow("Kernel", ModulePermission::All)
        .allow("String", ModulePermission::except(["upcase"]))
        .build();

    assert!(eval_with("String.upcase(\"a\")", &allowlist).await.is_err());
    assert_eq!(
        eval_with("String.downcase(\"A\")", &allowlist).await.unwrap(),
        Value::Str("a".into())
    );
}

#[tokio::test]
async fn test_child_extension_overrides_per_module() {
    let base = default_allowlist();
    // Tighten String to a single function; everything else inherited.
    let child = Allowlist::builder()
        .extend(base)
        .allow("String", ModulePermission::only(["length"]))
        .build();

    assert_eq!(
        eval_with("String.length(\"abc\")", &child).await.unwrap(),
        Value::Int(3)
    );
    assert!(eval_with("String.upcase(\"a\")", &child).await.is_err());
    // Inherited module untouched.
    assert_eq!(eval_with("1 + 1", &child).await.unwrap(), Value::Int(2));
}

// -------------------------------------------------------------------------
// Timeout behavior
// -------------------------------------------------------------------------

#[tokio::test]
async fn test_runaway_loop_times_out_within_budget() {
    let started = std::time::Instant::now();
    let err = sandbox()
        .eval(
            "loop = fn f -> f.(f) end; loop.(loop)",
            &default_allowlist(),
            EvalOptions {
                timeout: Duration::from_millis(100),
                ..EvalOptions::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err, SandboxError::Timeout { timeout_ms: 100 });
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_long_sleep_times_out() {
    let err = sandbox()
        .eval(
            "sleep(60000)",
            &default_allowlist(),
            EvalOptions {
                timeout: Duration::from_millis(100),
                ..EvalOptions::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "timeout");
}
