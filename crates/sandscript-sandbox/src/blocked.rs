//! Closed catalogs of primitives the analyzer rejects regardless of any
//! allowlist.
//!
//! These lists are compile-time constants on purpose: there is no API for
//! extending them at runtime. Widening what the sandbox can reach happens
//! only through the allowlist; narrowing below this floor is impossible.

/// Modules denied wholesale: OS/filesystem/network facades, actor and
/// supervision primitives, and evaluator/compiler internals.
pub const BLOCKED_MODULES: &[&str] = &[
    "System",
    "File",
    "Path",
    "Port",
    "Node",
    "Process",
    "Agent",
    "GenServer",
    "Supervisor",
    "Task",
    "Registry",
    "DynamicSupervisor",
    "Code",
    "Eval",
    "Compiler",
    "Net",
    "Tcp",
    "Udp",
    "Sctp",
    "Ssl",
    "Ssh",
    "HttpClient",
    "HttpServer",
    "Os",
];

/// Specific `(module, function)` pairs denied at every arity: process
/// spawning, message passing, code evaluation/compilation, and termination.
pub const BLOCKED_CALLS: &[(&str, &str)] = &[
    ("Kernel", "apply"),
    ("Kernel", "spawn"),
    ("Kernel", "spawn_link"),
    ("Kernel", "spawn_monitor"),
    ("Kernel", "spawn_opt"),
    ("Kernel", "send"),
    ("Kernel", "send_nosuspend"),
    ("Kernel", "exit"),
    ("Kernel", "halt"),
    ("Code", "eval_string"),
    ("Code", "eval_quoted"),
    ("Code", "compile_string"),
    ("Code", "compile_quoted"),
    ("Code", "string_to_quoted"),
    ("System", "halt"),
];

/// Local (implicit core-library) call names denied outright. Captures of
/// these names are denied identically — `&apply/3` is the classic bypass.
pub const BLOCKED_LOCALS: &[&str] = &[
    "spawn",
    "spawn_link",
    "spawn_monitor",
    "send",
    "apply",
    "exit",
];

pub fn is_blocked_module(module: &str) -> bool {
    BLOCKED_MODULES.contains(&module)
}

pub fn is_blocked_call(module: &str, function: &str) -> bool {
    BLOCKED_CALLS
        .iter()
        .any(|(m, f)| *m == module && *f == function)
}

pub fn is_blocked_local(name: &str) -> bool {
    BLOCKED_LOCALS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_and_system_are_blocked_modules() {
        assert!(is_blocked_module("File"));
        assert!(is_blocked_module("System"));
        assert!(is_blocked_module("GenServer"));
        assert!(!is_blocked_module("String"));
    }

    #[test]
    fn test_apply_blocked_at_any_shape() {
        assert!(is_blocked_call("Kernel", "apply"));
        assert!(is_blocked_local("apply"));
        assert!(is_blocked_local("spawn"));
        assert!(!is_blocked_local("length"));
    }

    #[test]
    fn test_eval_and_compile_blocked() {
        for f in [
            "eval_string",
            "eval_quoted",
            "compile_string",
            "compile_quoted",
            "string_to_quoted",
        ] {
            assert!(is_blocked_call("Code", f), "Code.{f} must be blocked");
        }
    }
}
