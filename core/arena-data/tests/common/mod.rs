//! Shared test helpers for the data hooks.

#![allow(dead_code)]

use arena_data::ReportSink;
use arena_store::MemoryStore;
use arena_types::{Fields, Record};
use std::sync::Mutex;

pub fn fields(value: serde_json::Value) -> Fields {
    value.as_object().cloned().unwrap()
}

pub fn record(id: &str, value: serde_json::Value) -> Record {
    Record::new(id, fields(value))
}

/// Three assets: two avatars and an accessory.
pub fn asset_store() -> MemoryStore {
    MemoryStore::new().with_records(
        "assets",
        vec![
            record(
                "a1",
                serde_json::json!({"title": "Canine Base", "description": "Quest ready", "category": "avatar"}),
            ),
            record(
                "a2",
                serde_json::json!({"title": "Fox Tail", "description": "PC only", "category": "accessory"}),
            ),
            record(
                "a3",
                serde_json::json!({"title": "Arctic Fox", "description": "Quest compatible", "category": "avatar"}),
            ),
        ],
    )
}

/// Report sink that remembers every forwarded message.
#[derive(Default)]
pub struct CapturingSink {
    messages: Mutex<Vec<String>>,
}

impl CapturingSink {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl ReportSink for CapturingSink {
    fn capture(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}
