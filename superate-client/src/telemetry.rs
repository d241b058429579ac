//! Logging initialization.
//!
//! Development builds log human-readable lines. Production builds log JSON
//! through [`RedactingMakeWriter`], so credentials and stack traces never
//! reach the output.
//!
//! The JSON formatter escapes field values (newlines become `\n`, quotes
//! become `\"`), so each JSON record is parsed back and its string values are
//! sanitized unescaped. Values of secret-named fields are masked whole.

use std::borrow::Cow;
use std::io::{self, Write};

use serde_json::Value;
use superate_core::{Environment, LogSanitizer, REDACTED};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ClientError, ClientResult};

/// Filter used when `RUST_LOG` is not set.
pub const DEFAULT_LOG_FILTER: &str = "superate=info,warn";

/// `MakeWriter` that sanitizes each formatted event before writing it.
#[derive(Debug, Clone)]
pub struct RedactingMakeWriter<M> {
    inner: M,
    sanitizer: LogSanitizer,
}

impl<M> RedactingMakeWriter<M> {
    pub fn new(inner: M, sanitizer: LogSanitizer) -> Self {
        Self { inner, sanitizer }
    }
}

impl<'a, M> MakeWriter<'a> for RedactingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = RedactingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter {
            inner: self.inner.make_writer(),
            sanitizer: self.sanitizer,
            buf: Vec::new(),
        }
    }
}

/// Buffers one event and writes it sanitized on flush or drop.
pub struct RedactingWriter<W: Write> {
    inner: W,
    sanitizer: LogSanitizer,
    buf: Vec<u8>,
}

impl<W: Write> RedactingWriter<W> {
    fn emit(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let buf = std::mem::take(&mut self.buf);
        let text = String::from_utf8_lossy(&buf);
        let clean = sanitize_output(&self.sanitizer, &text);
        self.inner.write_all(clean.as_bytes())
    }
}

/// Sanitize formatted output line by line. JSON records are sanitized per
/// value; anything else as plain text.
fn sanitize_output<'a>(sanitizer: &LogSanitizer, text: &'a str) -> Cow<'a, str> {
    if !sanitizer.is_active() {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let (body, newline) = match line.strip_suffix('\n') {
            Some(body) => (body, "\n"),
            None => (line, ""),
        };
        match serde_json::from_str::<Value>(body) {
            Ok(mut record) if record.is_object() => {
                sanitize_value(sanitizer, &mut record);
                out.push_str(&record.to_string());
            }
            _ => out.push_str(&sanitizer.sanitize(body)),
        }
        out.push_str(newline);
    }
    Cow::Owned(out)
}

fn sanitize_value(sanitizer: &LogSanitizer, value: &mut Value) {
    match value {
        Value::String(text) => {
            let clean = match sanitizer.sanitize(text) {
                Cow::Owned(clean) => Some(clean),
                Cow::Borrowed(_) => None,
            };
            if let Some(clean) = clean {
                *text = clean;
            }
        }
        Value::Array(items) => {
            for item in items {
                sanitize_value(sanitizer, item);
            }
        }
        Value::Object(fields) => {
            for (name, field) in fields.iter_mut() {
                if sanitizer.is_secret_field(name) && !field.is_object() && !field.is_array() {
                    *field = Value::String(REDACTED.to_string());
                } else {
                    sanitize_value(sanitizer, field);
                }
            }
        }
        _ => {}
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.emit()?;
        self.inner.flush()
    }
}

impl<W: Write> Drop for RedactingWriter<W> {
    fn drop(&mut self) {
        let _ = self.emit();
    }
}

/// Install the global subscriber for `environment`.
///
/// `RUST_LOG` overrides [`DEFAULT_LOG_FILTER`]. Fails if a global subscriber
/// is already installed.
pub fn init_logging(environment: Environment) -> ClientResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let sanitizer = LogSanitizer::for_environment(environment);

    let result = if environment.is_production() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(RedactingMakeWriter::new(io::stdout, sanitizer)),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    };
    result.map_err(|e| ClientError::Telemetry {
        reason: e.to_string(),
    })?;

    tracing::info!(
        environment = ?environment,
        redacting = sanitizer.is_active(),
        "Logging initialized"
    );
    Ok(())
}
