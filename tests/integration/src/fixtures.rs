//! Request bodies shared by the integration tests

use serde_json::{json, Value};

/// Model name used throughout the tests
pub const TEST_MODEL: &str = "test-model";

/// Credential used throughout the tests
pub const TEST_API_KEY: &str = "sk-test";

/// Benchmark job over an explicit prompt list
pub fn job_with_prompts(api_url: &str, prompts: &[&str], concurrency: Value) -> Value {
    json!({
        "prompts": prompts,
        "apiUrl": api_url,
        "apiKey": TEST_API_KEY,
        "model": TEST_MODEL,
        "maxTokens": 32,
        "concurrency": concurrency,
        "stream": true
    })
}

/// Benchmark job repeating one prompt
pub fn job_with_repeated_prompt(api_url: &str, prompt: &str, num_requests: usize) -> Value {
    json!({
        "prompt": prompt,
        "numRequests": num_requests,
        "apiUrl": api_url,
        "apiKey": TEST_API_KEY,
        "model": TEST_MODEL
    })
}

/// Prompt generation request
pub fn generate_request(api_url: &str, count: usize, mode: &str) -> Value {
    json!({
        "apiUrl": api_url,
        "apiKey": TEST_API_KEY,
        "model": TEST_MODEL,
        "instructions": "Questions about the solar system",
        "count": count,
        "mode": mode
    })
}

/// Structured-output content holding `prompts`
pub fn prompts_content(prompts: &[&str]) -> String {
    json!({ "prompts": prompts }).to_string()
}
