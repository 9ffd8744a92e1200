//! Logging bootstrap for the dynsys viewer.
//!
//! Engine crates log through the `log` facade. [`init_logging`] routes those
//! records into a `tracing` registry filtered by `RUST_LOG` / `DYNSYS_LOG`,
//! optionally prints them to stderr, and hands a structured [`LogRecord`] to
//! the hook installed with [`set_log_hook`] (the browser host forwards these
//! to the JS console).

use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::subscriber::DefaultGuard;
use tracing::Subscriber;
use tracing_log::LogTracer;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;

/// Environment variable consulted after `RUST_LOG`.
pub const LOG_ENV_VAR: &str = "DYNSYS_LOG";

#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub ts: String,
    pub level: String,
    pub target: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<JsonValue>,
}

type LogHook = Arc<dyn Fn(&LogRecord) + Send + Sync>;

static LOG_HOOK: OnceCell<LogHook> = OnceCell::new();

/// Keeps a scoped subscriber alive when a global one was already installed.
pub struct LoggingGuard {
    _guard: Option<DefaultGuard>,
}

impl LoggingGuard {
    /// True when this call installed the process-wide subscriber.
    pub fn is_global(&self) -> bool {
        self._guard.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct LoggingOptions {
    /// Filter directive used when neither `RUST_LOG` nor `DYNSYS_LOG` is set.
    pub default_level: String,
    /// Also format records to stderr (CLI use; leave off in the browser).
    pub stderr: bool,
    pub ansi: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            stderr: false,
            ansi: false,
        }
    }
}

/// Install the record hook. Only the first call wins; returns whether this
/// call installed it.
pub fn set_log_hook<F>(hook: F) -> bool
where
    F: Fn(&LogRecord) + Send + Sync + 'static,
{
    LOG_HOOK.set(Arc::new(hook)).is_ok()
}

pub fn init_logging(opts: LoggingOptions) -> LoggingGuard {
    // log:: macros from the engine flow into tracing from here on
    let _ = LogTracer::init();

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_from_env(LOG_ENV_VAR))
        .or_else(|_| EnvFilter::try_new(&opts.default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let build_subscriber = || {
        let stderr_layer = opts.stderr.then(|| {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_ansi(opts.ansi)
        });
        tracing_subscriber::registry()
            .with(env_filter.clone())
            .with(LogBridgeLayer)
            .with(stderr_layer)
    };

    let guard = match tracing::subscriber::set_global_default(build_subscriber()) {
        Ok(()) => None,
        Err(_) => Some(tracing::subscriber::set_default(build_subscriber())),
    };

    LoggingGuard { _guard: guard }
}

struct LogBridgeLayer;

#[cfg(target_arch = "wasm32")]
fn now_rfc3339() -> String {
    js_sys::Date::new_0()
        .to_iso_string()
        .as_string()
        .unwrap_or_else(|| "1970-01-01T00:00:00.000Z".to_string())
}

#[cfg(not(target_arch = "wasm32"))]
fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

impl<S> Layer<S> for LogBridgeLayer
where
    S: Subscriber,
{
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let Some(hook) = LOG_HOOK.get() else {
            return;
        };

        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);

        // records bridged from `log` carry their real target in `log.target`
        let target = visitor
            .log_target
            .take()
            .unwrap_or_else(|| event.metadata().target().to_string());

        let record = LogRecord {
            ts: now_rfc3339(),
            level: event.metadata().level().to_string(),
            target,
            message: visitor
                .message
                .unwrap_or_else(|| event.metadata().name().to_string()),
            fields: visitor
                .fields
                .filter(|obj| obj.as_object().map(|m| !m.is_empty()).unwrap_or(false)),
        };

        hook(&record);
    }
}

#[derive(Default)]
struct JsonVisitor {
    message: Option<String>,
    log_target: Option<String>,
    fields: Option<JsonValue>,
}

impl JsonVisitor {
    fn insert(&mut self, name: &str, value: JsonValue) {
        if name.starts_with("log.") {
            return;
        }
        let obj = self
            .fields
            .get_or_insert_with(|| JsonValue::Object(Default::default()));
        if let JsonValue::Object(map) = obj {
            map.insert(name.to_string(), value);
        }
    }
}

impl tracing::field::Visit for JsonVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        let rendered = format!("{value:?}");
        match field.name() {
            "message" => self.message = Some(rendered),
            "log.target" => self.log_target = Some(rendered),
            name => self.insert(name, JsonValue::String(rendered)),
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        match field.name() {
            "message" => self.message = Some(value.to_string()),
            "log.target" => self.log_target = Some(value.to_string()),
            name => self.insert(name, JsonValue::String(value.to_string())),
        }
    }

    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.insert(field.name(), serde_json::json!(value));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.insert(field.name(), serde_json::json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.insert(field.name(), serde_json::json!(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.insert(field.name(), JsonValue::Bool(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tracing::info;

    #[test]
    fn log_hook_receives_fields() {
        let captured: Arc<Mutex<Vec<LogRecord>>> = Arc::new(Mutex::new(Vec::new()));
        let hook = {
            let c = captured.clone();
            move |rec: &LogRecord| {
                c.lock().unwrap().push(rec.clone());
            }
        };
        assert!(set_log_hook(hook));
        let _guard = init_logging(LoggingOptions::default());

        info!(rebuilds = 3u64, "viewer rebuilt");

        let items = captured.lock().unwrap();
        let record = items
            .iter()
            .find(|r| r.message.contains("viewer rebuilt"))
            .expect("record captured");
        assert_eq!(record.level, "INFO");
        let fields = record.fields.as_ref().expect("fields present");
        assert_eq!(fields["rebuilds"], serde_json::json!(3));
    }

    #[test]
    fn options_default_to_info_without_stderr() {
        let opts = LoggingOptions::default();
        assert_eq!(opts.default_level, "info");
        assert!(!opts.stderr);
    }
}
