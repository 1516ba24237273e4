//! Policy checks over whole lab scripts.

use tuning_lab::safety::{split_statements, PolicyEngine};

const EXPLAIN_EXERCISE: &str = "\
-- Generate the execution plan (does NOT execute the query, only estimates)
EXPLAIN PLAN FOR
SELECT * FROM clientes WHERE estado = 'SP';

-- View the plan
SELECT * FROM TABLE(DBMS_XPLAN.DISPLAY);";

const STATISTICS_EXERCISE: &str = "\
-- Enable real statistics collection
ALTER SESSION SET STATISTICS_LEVEL = ALL;

-- Execute the query (must actually run it)
SELECT * FROM clientes WHERE estado = 'SP' AND ROWNUM <= 10;

-- View REAL statistics of the last executed query
SELECT * FROM TABLE(DBMS_XPLAN.DISPLAY_CURSOR(NULL, NULL, 'ALLSTATS LAST'));";

const COMPOSITE_EXERCISE: &str = "\
-- Query with two filters
EXPLAIN PLAN FOR
SELECT COUNT(*) FROM clientes WHERE estado = 'SP' AND status = 'ATIVO';
SELECT * FROM TABLE(DBMS_XPLAN.DISPLAY);

-- Test: does the index work when the FIRST column is missing?
EXPLAIN PLAN FOR
SELECT COUNT(*) FROM clientes WHERE status = 'ATIVO';
SELECT * FROM TABLE(DBMS_XPLAN.DISPLAY);";

#[test]
fn test_exercise_scripts_are_allowed() {
    let policy = PolicyEngine::default();
    for script in [EXPLAIN_EXERCISE, STATISTICS_EXERCISE, COMPOSITE_EXERCISE] {
        let verdict = policy.evaluate(script);
        assert!(verdict.safe, "{script}\n=> {}", verdict.reason());
    }
}

#[test]
fn test_exercise_splits_into_statements() {
    let statements = split_statements(COMPOSITE_EXERCISE);
    let non_blank = statements.iter().filter(|s| !s.trim().is_empty()).count();
    assert_eq!(non_blank, 4);
}

#[test]
fn test_mutation_appended_to_exercise_is_blocked() {
    let policy = PolicyEngine::default();
    let script = format!("{EXPLAIN_EXERCISE}\nDELETE FROM clientes WHERE estado = 'SP';");

    let verdict = policy.evaluate(&script);

    assert!(!verdict.safe);
    assert_eq!(
        verdict.reason(),
        "Blocked command detected (data mutation): DELETE"
    );
}

#[test]
fn test_index_creation_is_blocked() {
    let verdict = PolicyEngine::default()
        .evaluate("CREATE INDEX idx_clientes_estado ON clientes(estado);");
    assert!(!verdict.safe);
    assert!(verdict.reason().contains("schema change"));
}

#[test]
fn test_unsafe_session_setting_is_blocked() {
    let verdict = PolicyEngine::default()
        .evaluate("ALTER SESSION SET STATISTICS_LEVEL = ALL;\nALTER SESSION SET EVENTS '10046 trace name context forever';");
    assert!(!verdict.safe);
    assert!(verdict.reason().contains("system control"));
}

#[test]
fn test_host_escape_in_later_statement_is_blocked() {
    let verdict = PolicyEngine::default().evaluate("SELECT 1 FROM dual;\n!cat /etc/passwd");
    assert!(!verdict.safe);
    assert!(verdict.reason().contains("host command"));
}

#[test]
fn test_commands_after_terminator_line_are_blocked() {
    let policy = PolicyEngine::default();
    for script in [
        "SELECT 1 FROM dual\n/\nGET /etc/passwd",
        "SELECT 1 FROM dual\n/\nCOPY FROM a/b@x TO a/b@x REPLACE clientes USING SELECT * FROM dual",
        "SELECT 1 FROM dual\n.\nSTART other.sql",
    ] {
        let verdict = policy.evaluate(script);
        assert!(!verdict.safe, "{script}");
        assert!(verdict.reason().contains("system control"), "{}", verdict.reason());
    }
}

#[test]
fn test_command_hidden_in_block_comment_is_blocked() {
    let verdict = PolicyEngine::default().evaluate("SELECT 1 FROM dual /* x;\nHOST id\n*/");
    assert!(!verdict.safe);
    assert_eq!(
        verdict.reason(),
        "Blocked command detected (system control): /* x;"
    );
}

#[test]
fn test_custom_length_limit() {
    let policy = PolicyEngine::new(20);
    assert!(policy.evaluate("SELECT 1 FROM dual;").safe);

    let verdict = policy.evaluate("SELECT nome FROM clientes WHERE id = 1;");
    assert!(!verdict.safe);
    assert_eq!(verdict.reason(), "SQL too long (max 20 chars)");
}
