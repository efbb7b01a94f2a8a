#![allow(dead_code)]

use serde_json::{json, Value};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use ecooptima::config::Config;

/// Chat completion body carrying plain assistant content
pub fn completion(content: &str) -> Value {
    json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }],
        "usage": { "prompt_tokens": 10, "completion_tokens": 5 }
    })
}

/// Chat completion body carrying a single tool call
pub fn tool_call_completion(name: &str, arguments: Value) -> Value {
    json!({
        "choices": [{
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": format!("call_{}", name),
                    "type": "function",
                    "function": { "name": name, "arguments": arguments.to_string() }
                }]
            }
        }]
    })
}

/// Guardrail verdict completion
pub fn verdict(is_eco_optima: bool, reasoning: &str) -> Value {
    completion(&json!({ "is_eco_optima": is_eco_optima, "reasoning": reasoning }).to_string())
}

/// Replays chat completion bodies in order and records request bodies
///
/// Once the script runs out every request gets a 500.
#[derive(Clone, Default)]
pub struct ChatScript {
    replies: Arc<Mutex<VecDeque<Value>>>,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl ChatScript {
    pub fn new(replies: Vec<Value>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Request bodies received so far
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }

    /// Mount on `/chat/completions` of `server`
    pub async fn mount(&self, server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(self.clone())
            .mount(server)
            .await;
    }
}

impl Respond for ChatScript {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        self.requests.lock().unwrap().push(body);
        match self.replies.lock().unwrap().pop_front() {
            Some(reply) => ResponseTemplate::new(200).set_body_json(reply),
            None => ResponseTemplate::new(500).set_body_string("script exhausted"),
        }
    }
}

/// Configuration pointing the OpenAI provider at `server` and run output at `log_root`
pub fn config_for(server: &MockServer, log_root: &Path) -> Config {
    let mut config = Config::default();
    config.provider.provider_type = "openai".to_string();
    config.provider.openai.api_base = server.uri();
    config.provider.openai.api_key_env = "ECOOPTIMA_TEST_API_KEY_UNSET".to_string();
    config.agent.max_retries = 0;
    config.agent.retry_backoff_ms = 1;
    config.output.log_root = log_root.to_path_buf();
    config
}

/// The six replies of an accepted community analysis that draws one bar chart
pub fn community_script() -> Vec<Value> {
    vec![
        verdict(true, "The request is about urban tree planting."),
        completion(
            r#"{"user_location":"Cincinnati, Ohio","project_type":"street trees","scale":"12 blocks","time_horizon_years":"3","budget":"$40,000"}"#,
        ),
        completion(
            r#"{"rankings":[{"species":"Swamp White Oak"},{"species":"Eastern Redbud"}]}"#,
        ),
        completion(
            "Planting Benefits Advisor: Swamp White Oak stores 110 kg of CO2 and intercepts 1,800 gallons of stormwater a year.",
        ),
        tool_call_completion(
            "plot_bar_chart",
            json!({
                "series": [
                    {"tree": "Swamp White Oak", "value": "110 kg"},
                    {"tree": "Eastern Redbud", "value": "35 kg"}
                ],
                "metric_name": "Annual CO2 sequestration",
                "title": "Carbon by species"
            }),
        ),
        completion("Local ROI Advisor: Swamp White Oak gives the best ten-year return."),
    ]
}

pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
