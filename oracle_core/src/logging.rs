//! # NDOC
//! component: `logging`
//! purpose: Structured JSON-line logger, adapted from the teacher's
//!   `utils::logger` (campaign-id thread-local -> analysis-id
//!   thread-local; `JsonLogRecord` shape unchanged).

use log::kv::{self, Key, Value, Visitor};
use log::{Log, Metadata, Record, SetLoggerError};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;

thread_local! {
    static CURRENT_ANALYSIS_ID: RefCell<Option<String>> = RefCell::new(None);
}

/// Sets the current analysis id for the calling thread/task.
pub fn set_current_analysis_id(analysis_id: String) {
    CURRENT_ANALYSIS_ID.with(|cell| *cell.borrow_mut() = Some(analysis_id));
}

/// Clears the current analysis id for the calling thread/task.
pub fn clear_current_analysis_id() {
    CURRENT_ANALYSIS_ID.with(|cell| *cell.borrow_mut() = None);
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonLogRecord {
    pub timestamp: String,
    pub level: String,
    pub message: String,
    pub analysis_id: Option<String>,
    pub name: String,
    pub module_path: Option<String>,
    pub file: Option<String>,
    pub line: Option<u32>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

struct JsonLogger;

struct KeyValueCollector<'a>(&'a mut HashMap<String, serde_json::Value>);

impl<'a> Visitor<'a> for KeyValueCollector<'a> {
    fn visit_pair(&mut self, key: Key<'a>, value: Value<'a>) -> Result<(), kv::Error> {
        self.0
            .insert(key.as_str().to_string(), serde_json::json!(value.to_string()));
        Ok(())
    }
}

impl Log for JsonLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let analysis_id = CURRENT_ANALYSIS_ID.with(|cell| cell.borrow().clone());

        let mut extra_fields = HashMap::new();
        let mut collector = KeyValueCollector(&mut extra_fields);
        if let Err(e) = record.key_values().visit(&mut collector) {
            eprintln!("error visiting log key-values: {:?}", e);
        }

        let log_record = JsonLogRecord {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level: record.level().to_string(),
            message: format!("{}", record.args()),
            analysis_id,
            name: record.target().to_string(),
            module_path: record.module_path().map(|s| s.to_string()),
            file: record.file().map(|s| s.to_string()),
            line: record.line(),
            extra: extra_fields,
        };

        println!(
            "{}",
            serde_json::to_string(&log_record).expect("log record must serialize")
        );
    }

    fn flush(&self) {}
}

static LOGGER: JsonLogger = JsonLogger;
static INIT_LOGGER_ONCE: OnceCell<()> = OnceCell::new();

/// Initializes the JSON logger; idempotent.
pub fn init_logger() -> Result<(), SetLoggerError> {
    INIT_LOGGER_ONCE
        .get_or_try_init(|| {
            log::set_logger(&LOGGER)?;
            log::set_max_level(log::LevelFilter::Info);
            Ok(())
        })
        .map(|_| ())
}

/// Logs one gating stage's verdict for an event, keyed by stage name.
pub fn log_stage_decision(stage: &str, event_name: &str, classification: &str, reason: &str) {
    log::info!(
        target: "gating",
        stage = stage,
        event_name = event_name,
        classification = classification;
        "{}",
        reason
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logger_initializes_idempotently() {
        assert!(init_logger().is_ok());
        assert!(init_logger().is_ok());
        set_current_analysis_id("a1".to_string());
        log_stage_decision("stage1_gtm", "view_item", "CAN_FIRE", "[GTM] allowed on MAIN");
        clear_current_analysis_id();
    }
}
