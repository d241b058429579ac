//! Redaction of credentials and stack traces from log output.
//!
//! Production builds must never print API keys, tokens, passwords or stack
//! frames. [`LogSanitizer`] applies the redaction rules only when running in
//! production so development logs stay readable.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::Environment;

/// Marker substituted for redacted secrets.
pub const REDACTED: &str = "[REDACTED]";

struct Rule {
    regex: Regex,
    replacement: &'static str,
}

impl Rule {
    fn new(pattern: &str, replacement: &'static str) -> Self {
        Self {
            regex: Regex::new(pattern).expect("Invalid redaction regex"),
            replacement,
        }
    }
}

/// Names whose values are always secret, as keys or field names.
const SECRET_NAMES: &str = "api[_-]?key|access[_-]?token|auth[_-]?token|refresh[_-]?token|id[_-]?token|token|client[_-]?secret|secret|password|passwd|pwd|credentials?";

static SECRET_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("(?i)^(?:{})$", SECRET_NAMES)).expect("Invalid secret field regex")
});

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        // api_key=..., "apiKey": "...", password: ..., token=...
        Rule::new(
            &format!(
                r#"(?i)\b({})(["']?\s*[=:]\s*["']?)([^\s"'&,;}}]+)"#,
                SECRET_NAMES
            ),
            "${1}${2}[REDACTED]",
        ),
        Rule::new(r"(?i)\bbearer\s+[A-Za-z0-9\-._~+/]+=*", "Bearer [REDACTED]"),
        // Google-style browser API keys.
        Rule::new(r"AIza[0-9A-Za-z\-_]{35}", "[REDACTED_API_KEY]"),
        Rule::new(r"\bsk-[A-Za-z0-9_\-]{16,}", "[REDACTED_API_KEY]"),
        Rule::new(
            r"\beyJ[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+\.[A-Za-z0-9_-]+",
            "[REDACTED_JWT]",
        ),
        // Consecutive "    at fn (file:line:col)" frames collapse into one marker.
        Rule::new(r"(?m)(?:^[ \t]+at [^\n]*(?:\n|$))+", "[stack trace redacted]\n"),
        Rule::new(
            r"[\w./\\-]+\.(?:rs|js|mjs|ts|tsx|jsx):\d+(?::\d+)?",
            "[location redacted]",
        ),
    ]
});

/// Apply every redaction rule to `input`.
///
/// Returns the input unchanged (borrowed) when nothing matched.
pub fn redact(input: &str) -> Cow<'_, str> {
    let mut out = Cow::Borrowed(input);
    for rule in RULES.iter() {
        if rule.regex.is_match(&out) {
            let replaced = rule.regex.replace_all(&out, rule.replacement).into_owned();
            out = Cow::Owned(replaced);
        }
    }
    out
}

/// Environment-aware log sanitizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSanitizer {
    production: bool,
}

impl LogSanitizer {
    pub fn new(production: bool) -> Self {
        Self { production }
    }

    pub fn for_environment(environment: Environment) -> Self {
        Self::new(environment.is_production())
    }

    pub fn is_active(&self) -> bool {
        self.production
    }

    /// Whether a structured field called `name` must have its whole value
    /// masked. Always false outside production.
    pub fn is_secret_field(&self, name: &str) -> bool {
        self.production && SECRET_FIELD.is_match(name)
    }

    /// Redact `message` in production; pass it through untouched otherwise.
    pub fn sanitize<'a>(&self, message: &'a str) -> Cow<'a, str> {
        if self.production {
            redact(message)
        } else {
            Cow::Borrowed(message)
        }
    }
}
