//! Ordered deny and allow rule tables.
//!
//! Rules are evaluated top to bottom against the comment-free text of one
//! statement. Multi-line block comments are rejected by the engine before
//! comments are stripped. The tables are plain data so they can be audited and tested on
//! their own; the engine only walks them.
//!
//! Blank and pure-comment statements never reach these tables: the engine
//! skips them before the deny phase.

use std::sync::LazyLock;

use regex::Regex;

use super::RuleCategory;

/// A pattern that rejects a statement when it matches.
#[derive(Debug)]
pub struct DenyRule {
    pub id: &'static str,
    pub category: RuleCategory,
    pattern: Regex,
    /// A match that this regex accepts in full is not a violation.
    exemption: Option<Regex>,
}

impl DenyRule {
    fn new(id: &'static str, category: RuleCategory, pattern: &str) -> Self {
        Self {
            id,
            category,
            pattern: compile(id, pattern),
            exemption: None,
        }
    }

    fn with_exemption(mut self, exemption: &str) -> Self {
        self.exemption = Some(compile(self.id, exemption));
        self
    }

    /// Returns the first matched text that is not exempted.
    pub fn violation<'a>(&self, text: &'a str) -> Option<&'a str> {
        self.pattern
            .find_iter(text)
            .map(|m| m.as_str())
            .find(|matched| match &self.exemption {
                Some(exemption) => !exemption.is_match(matched.trim()),
                None => true,
            })
    }
}

/// A pattern that admits a statement when it matches.
#[derive(Debug)]
pub struct AllowRule {
    pub id: &'static str,
    pattern: Regex,
}

impl AllowRule {
    fn new(id: &'static str, pattern: &str) -> Self {
        Self {
            id,
            pattern: compile(id, pattern),
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

fn compile(id: &str, pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("rule {id} has an invalid pattern: {e}"))
}

/// Session parameters a learner may change: formatting and plan statistics only.
const SAFE_SESSION_PARAMETERS: &str = r"NLS_\w+|STATISTICS_LEVEL|OPTIMIZER_USE_INVISIBLE_INDEXES";

/// Packages that reach outside the session (files, network, jobs, raw cursors).
const DANGEROUS_PACKAGES: &str = r"DBMS_SCHEDULER|DBMS_JOB|DBMS_SQL|DBMS_PIPE|DBMS_LOCK|DBMS_AQ|DBMS_LDAP|DBMS_JAVA|DBMS_BACKUP_RESTORE|UTL_FILE|UTL_HTTP|UTL_TCP|UTL_SMTP|UTL_MAIL|UTL_INADDR";

/// Deny rules, in evaluation order.
pub static DENY_RULES: LazyLock<Vec<DenyRule>> = LazyLock::new(|| {
    use RuleCategory::*;

    vec![
        // Schema and privileges
        DenyRule::new("drop", SchemaChange, r"(?i)\bDROP\b"),
        DenyRule::new("truncate", SchemaChange, r"(?i)\bTRUNCATE\b"),
        DenyRule::new(
            "alter-object",
            SchemaChange,
            r"(?i)\bALTER\s+(TABLE|INDEX|VIEW|SEQUENCE|TRIGGER|PROCEDURE|FUNCTION|PACKAGE|SYNONYM|MATERIALIZED|TYPE)\b",
        ),
        DenyRule::new("create", SchemaChange, r"(?i)\bCREATE\b"),
        DenyRule::new("grant", SchemaChange, r"(?i)\bGRANT\b"),
        DenyRule::new("revoke", SchemaChange, r"(?i)\bREVOKE\b"),
        DenyRule::new("rename", SchemaChange, r"(?i)\bRENAME\b"),
        DenyRule::new("comment-on", SchemaChange, r"(?i)\bCOMMENT\s+ON\b"),
        DenyRule::new("purge", SchemaChange, r"(?i)\b(PURGE|FLASHBACK)\b"),
        // Data changes
        DenyRule::new(
            "dml",
            DataMutation,
            r"(?i)\b(INSERT|UPDATE|DELETE|MERGE|UPSERT)\b",
        ),
        DenyRule::new("lock-table", DataMutation, r"(?i)\bLOCK\s+TABLE\b"),
        // Leaving the database for the host shell
        DenyRule::new("host", HostEscape, r"(?i)\bHOST\b"),
        DenyRule::new("shell-prefix", HostEscape, r"(?m)^\s*[!$]"),
        // Dynamic and background execution
        DenyRule::new(
            "execute-immediate",
            DynamicExecution,
            r"(?i)\bEXECUTE\s+IMMEDIATE\b",
        ),
        DenyRule::new("exec-command", DynamicExecution, r"(?im)^\s*(EXEC|EXECUTE|CALL)\b"),
        DenyRule::new(
            "plsql-block",
            DynamicExecution,
            r"(?im)^\s*(BEGIN|DECLARE)\b",
        ),
        DenyRule::new(
            "dangerous-package",
            DynamicExecution,
            &format!(r"(?i)\b({DANGEROUS_PACKAGES})\b"),
        ),
        // Instance and session control
        DenyRule::new("shutdown", SystemControl, r"(?i)\b(SHUTDOWN|STARTUP)\b"),
        DenyRule::new(
            "alter-system",
            SystemControl,
            r"(?i)\bALTER\s+(SYSTEM|DATABASE|USER|PROFILE|ROLE|TABLESPACE|PLUGGABLE)\b",
        ),
        // A lone `/` or `.` line ends the statement; whatever follows runs on its own
        DenyRule::new("buffer-terminator", SystemControl, r"(?m)^[^\S\n]*[/.][^\S\n]*$"),
        DenyRule::new(
            "client-command",
            SystemControl,
            r"(?im)^\s*(@@|(CONNECT|CONN|DISCONNECT|DISC|SPOOL|PASSWORD|ARCHIVE\s+LOG|RECOVER|STORE|SAVE|GET|START|STA|EDIT|ED|COPY|RUN)\b)",
        ),
        // Every ALTER SESSION is denied unless it only assigns safe parameters
        DenyRule::new("alter-session", SystemControl, r"(?i)\bALTER\s+SESSION\b[\s\S]*")
            .with_exemption(&format!(
                r"(?i)^ALTER\s+SESSION\s+SET(\s+({SAFE_SESSION_PARAMETERS})\s*=\s*('[^']*'|[\w.]+))+$"
            )),
    ]
});

/// Allow rules, in evaluation order. Anchored at the start of the statement.
pub static ALLOW_RULES: LazyLock<Vec<AllowRule>> = LazyLock::new(|| {
    vec![
        AllowRule::new("select", r"(?i)^SELECT\b"),
        AllowRule::new("explain-plan", r"(?i)^EXPLAIN\s+PLAN\b"),
        AllowRule::new(
            "display-settings",
            r"(?i)^SET\s+(AUTOTRACE|TIMING|LINESIZE|PAGESIZE|SERVEROUTPUT)\b",
        ),
        AllowRule::new(
            "xplan-display",
            r"(?i)^SELECT\s+\*\s+FROM\s+(TABLE\s*\()?DBMS_XPLAN",
        ),
        AllowRule::new("with", r"(?i)^WITH\b"),
        AllowRule::new(
            "session-settings",
            &format!(r"(?i)^ALTER\s+SESSION\s+SET\s+({SAFE_SESSION_PARAMETERS})"),
        ),
        AllowRule::new("describe", r#"(?i)^DESC(RIBE)?\s+[\w$#."]+$"#),
        AllowRule::new("command-file", r"^@"),
    ]
});
