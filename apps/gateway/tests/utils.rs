//! Environment expansion tests.

use promptgate_gateway::utils::expand_env_vars;

#[test]
fn expands_set_variables() {
    // SAFETY: test-local variable name, not read concurrently elsewhere.
    unsafe { std::env::set_var("PROMPTGATE_UTILS_TEST_VAR", "value") };
    assert_eq!(
        expand_env_vars("key = \"${PROMPTGATE_UTILS_TEST_VAR}\""),
        "key = \"value\""
    );
}

#[test]
fn unset_variable_uses_fallback_or_empty() {
    assert_eq!(expand_env_vars("${PROMPTGATE_UTILS_UNSET:-dflt}"), "dflt");
    assert_eq!(expand_env_vars("a${PROMPTGATE_UTILS_UNSET}b"), "ab");
}

#[test]
fn plain_dollars_pass_through() {
    assert_eq!(expand_env_vars("cost $5 ${unterminated"), "cost $5 ${unterminated");
}
