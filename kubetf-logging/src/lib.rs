//! Tracing subscriber setup
//!
//! Settings come from `KUBETF_LOG_*` environment variables:
//!
//! | Variable | Values | Default |
//! |----------|--------|---------|
//! | `KUBETF_LOG_LEVEL` | any `EnvFilter` directive | `info` |
//! | `KUBETF_LOG_OUTPUT` | `console`, `file`, `both`, `none` | `console` |
//! | `KUBETF_LOG_FORMAT` | `human`, `json` | `human` |
//! | `KUBETF_LOG_TAGS` | `key:value,...`, value `*` matches anything | empty |
//! | `KUBETF_LOG_FILE` | path of the daily-rotated log file | `/tmp/kubetf.log` |
//!
//! Tags keep only events raised inside spans whose fields match, e.g.
//! `KUBETF_LOG_TAGS=workspace:dev/network` follows a single workspace's
//! reconciles.

use std::collections::HashMap;
use std::env;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{field::Visit, span, Metadata, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::MakeWriter,
    layer::{Context, Layer},
    prelude::*,
    registry,
    registry::LookupSpan,
    EnvFilter,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Console,
    File,
    Both,
    None,
}

impl LogOutput {
    fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => LogOutput::File,
            "both" => LogOutput::Both,
            "none" | "off" => LogOutput::None,
            _ => LogOutput::Console,
        }
    }

    fn console(self) -> bool {
        matches!(self, LogOutput::Console | LogOutput::Both)
    }

    fn file(self) -> bool {
        matches!(self, LogOutput::File | LogOutput::Both)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
    pub output: LogOutput,
    pub json: bool,
    pub tags: Vec<Tag>,
    pub file: PathBuf,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            output: LogOutput::Console,
            json: false,
            tags: Vec::new(),
            file: PathBuf::from("/tmp/kubetf.log"),
        }
    }
}

impl LogSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            level: lookup("KUBETF_LOG_LEVEL").unwrap_or(defaults.level),
            output: lookup("KUBETF_LOG_OUTPUT")
                .map(|s| LogOutput::parse(&s))
                .unwrap_or(defaults.output),
            json: lookup("KUBETF_LOG_FORMAT").is_some_and(|s| s.trim() == "json"),
            tags: lookup("KUBETF_LOG_TAGS")
                .map(|s| parse_tags(&s))
                .unwrap_or_default(),
            file: lookup("KUBETF_LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.file),
        }
    }
}

/// Parse `key:value` pairs separated by commas, skipping malformed entries
pub fn parse_tags(spec: &str) -> Vec<Tag> {
    spec.split(',')
        .filter_map(|entry| {
            let (key, value) = entry.split_once(':')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some(Tag {
                key: key.to_string(),
                value: value.trim().to_string(),
            })
        })
        .collect()
}

// Writes every line to two writers
struct Tee<A, B> {
    a: A,
    b: B,
}

impl<A: Write, B: Write> Write for Tee<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let a = self.a.write(buf);
        let b = self.b.write(buf);
        a.or(b)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.a.flush()?;
        self.b.flush()
    }
}

#[derive(Clone)]
struct MakeTee<A, B> {
    make_a: A,
    make_b: B,
}

impl<'a, A, B> MakeWriter<'a> for MakeTee<A, B>
where
    A: MakeWriter<'a>,
    B: MakeWriter<'a>,
{
    type Writer = Tee<A::Writer, B::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        Tee {
            a: self.make_a.make_writer(),
            b: self.make_b.make_writer(),
        }
    }
}

type SpanFields = HashMap<String, String>;

struct TagFilterLayer {
    tags: Vec<Tag>,
}

impl TagFilterLayer {
    fn matches(&self, fields: &SpanFields) -> bool {
        self.tags.iter().all(|tag| {
            fields
                .get(&tag.key)
                .is_some_and(|value| tag.value == "*" || value.contains(&tag.value))
        })
    }
}

impl<S> Layer<S> for TagFilterLayer
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    fn on_new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut fields = SpanFields::new();
        attrs.record(&mut FieldVisitor(&mut fields));
        span.extensions_mut().insert(fields);
    }

    fn on_record(&self, id: &span::Id, values: &span::Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        if let Some(fields) = extensions.get_mut::<SpanFields>() {
            values.record(&mut FieldVisitor(fields));
        }
    }

    fn enabled(&self, _meta: &Metadata<'_>, ctx: Context<'_, S>) -> bool {
        if self.tags.is_empty() {
            return true;
        }

        // with tags set, events outside any span are dropped
        let Some(scope) = ctx.current_span().id().and_then(|id| ctx.span_scope(id)) else {
            return false;
        };

        let mut fields = SpanFields::new();
        for span in scope {
            if let Some(span_fields) = span.extensions().get::<SpanFields>() {
                for (k, v) in span_fields {
                    fields.entry(k.clone()).or_insert_with(|| v.clone());
                }
            }
        }
        self.matches(&fields)
    }
}

struct FieldVisitor<'a>(&'a mut SpanFields);

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
}

fn env_filter(level: &str) -> EnvFilter {
    let mut filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
    for directive in ["hyper=warn", "reqwest=warn", "h2=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

/// Install the global subscriber. Keep the returned guard alive for as long
/// as file logging should be flushed.
pub fn init_subscriber(settings: &LogSettings) -> Option<WorkerGuard> {
    let subscriber = registry()
        .with(env_filter(&settings.level))
        .with(TagFilterLayer {
            tags: settings.tags.clone(),
        });

    let log_dir = settings
        .file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("/tmp"));
    let log_name = settings
        .file
        .file_name()
        .unwrap_or_else(|| "kubetf.log".as_ref());

    let output = settings.output;
    let json = settings.json;

    macro_rules! finish {
        ($writer:expr) => {{
            let layer = tracing_subscriber::fmt::layer().with_writer($writer);
            if json {
                subscriber.with(layer.json()).init();
            } else {
                subscriber.with(layer.pretty()).init();
            }
        }};
    }

    if output.file() {
        let appender = tracing_appender::rolling::daily(log_dir, log_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        if output.console() {
            finish!(MakeTee {
                make_a: io::stdout,
                make_b: writer,
            });
        } else {
            finish!(writer);
        }
        Some(guard)
    } else if output.console() {
        finish!(io::stdout);
        None
    } else {
        subscriber.init();
        None
    }
}
