//! Entity lists and provider response bodies

use serde_json::{Value, json};
use std::path::{Path, PathBuf};

/// Three Texas cities; the second has no explicit slug
pub const TEXAS_CITIES: &str = r#"{
  "cities": [
    {"name": "Austin", "state": "Texas", "slug": "austin"},
    {"name": "Dallas", "state": "Texas"},
    {"name": "El Paso", "state": "Texas", "slug": "el-paso"}
  ]
}"#;

/// Text returned by the mock provider for every successful call
pub const APPRAISER_TEXT: &str = "1. Overview\nSeveral certified appraisers operate downtown.";

/// Chat completions body with a single choice carrying `content`
pub fn chat_response(content: &str) -> Value {
    json!({
        "id": "cmpl-test",
        "model": "sonar-reasoning-pro",
        "choices": [
            {
                "index": 0,
                "finish_reason": "stop",
                "message": {"role": "assistant", "content": content}
            }
        ]
    })
}

/// Write `json` as an entity list document inside `dir`
pub fn write_entity_list(dir: &Path, json: &str) -> PathBuf {
    let path = dir.join("cities.json");
    std::fs::write(&path, json).unwrap();
    path
}
