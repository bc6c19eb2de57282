//! Request and response types for the chat backend.

use serde::{Deserialize, Serialize};

use crate::core::config::Config;

pub const CHAT_ENDPOINT: &str = "api/chat";
pub const SEARCH_CHAT_ENDPOINT: &str = "api/chat_with_search";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub snippet: String,
}

/// One request body, built once per send from an explicit [`Config`] snapshot
/// and never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub query: String,
    pub model_id: String,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub searxng_engines: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub searxng_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub searxng_safesearch: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub searxng_time_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freshness: Option<String>,
}

impl ChatRequest {
    /// Build a request for a plain chat turn (no web search).
    pub fn chat(query: &str, config: &Config, stream: bool) -> Self {
        Self {
            query: query.to_string(),
            model_id: config.default_model.clone(),
            stream,
            engine: None,
            count: None,
            searxng_engines: None,
            searxng_language: None,
            searxng_safesearch: None,
            searxng_time_range: None,
            time_range: None,
            freshness: None,
        }
    }

    /// Build a request for a search-augmented turn. Engine-specific fields are
    /// populated only for the engine actually selected.
    pub fn chat_with_search(query: &str, config: &Config, stream: bool) -> Self {
        let mut request = Self::chat(query, config, stream);
        let engine = config.default_search_engine.clone();
        request.count = Some(config.result_count);

        match engine.as_str() {
            "searxng" => {
                if !config.searxng.engines.is_empty() {
                    request.searxng_engines = Some(config.searxng.engines.clone());
                }
                request.searxng_language = Some(config.searxng.language.clone());
                request.searxng_safesearch = Some(config.searxng.safesearch);
                request.searxng_time_range = Some(
                    config
                        .searxng
                        .time_range
                        .clone()
                        .unwrap_or_else(|| config.time_range.clone()),
                );
            }
            "bochaai" => {
                request.freshness = Some(
                    config
                        .bochaai
                        .time_range
                        .clone()
                        .unwrap_or_else(|| bochaai_freshness(&config.time_range).to_string()),
                );
            }
            _ => {
                if !config.time_range.is_empty() {
                    request.time_range = Some(config.time_range.clone());
                }
            }
        }

        request.engine = Some(engine);
        request
    }

    pub fn endpoint(&self) -> &'static str {
        if self.engine.is_some() {
            SEARCH_CHAT_ENDPOINT
        } else {
            CHAT_ENDPOINT
        }
    }
}

/// Translate a generic time range into Bocha AI's freshness vocabulary.
pub fn bochaai_freshness(time_range: &str) -> &'static str {
    match time_range {
        "day" => "oneDay",
        "week" => "oneWeek",
        "month" => "oneMonth",
        "year" => "oneYear",
        "" => "noLimit",
        _ => "oneMonth",
    }
}

/// Non-streaming response body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponseBody {
    pub error: Option<String>,
    pub response: Option<String>,
    pub reasoning_content: Option<String>,
    pub search_results: Option<Vec<SearchResult>>,
    pub question_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;

    #[test]
    fn plain_chat_request_omits_search_fields() {
        let config = Config::default();
        let request = ChatRequest::chat("hello", &config, true);
        assert_eq!(request.endpoint(), CHAT_ENDPOINT);

        let json = serde_json::to_value(&request).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.get("query").unwrap(), "hello");
        assert!(!object.contains_key("engine"));
        assert!(!object.contains_key("count"));
        assert!(!object.contains_key("time_range"));
    }

    #[test]
    fn searxng_request_carries_engine_specific_fields() {
        let mut config = Config::default();
        config.default_search_engine = "searxng".to_string();
        config.searxng.engines = "duckduckgo,wikipedia".to_string();

        let request = ChatRequest::chat_with_search("q", &config, false);
        assert_eq!(request.endpoint(), SEARCH_CHAT_ENDPOINT);
        assert_eq!(request.engine.as_deref(), Some("searxng"));
        assert_eq!(request.searxng_engines.as_deref(), Some("duckduckgo,wikipedia"));
        assert_eq!(request.searxng_language.as_deref(), Some("auto"));
        assert_eq!(request.searxng_safesearch, Some(1));
        assert_eq!(request.searxng_time_range.as_deref(), Some("month"));
        assert!(request.freshness.is_none());
        assert!(request.time_range.is_none());
    }

    #[test]
    fn searxng_engine_allow_list_is_omitted_when_empty() {
        let mut config = Config::default();
        config.default_search_engine = "searxng".to_string();

        let request = ChatRequest::chat_with_search("q", &config, false);
        assert!(request.searxng_engines.is_none());
    }

    #[test]
    fn bochaai_request_maps_time_range_to_freshness() {
        let mut config = Config::default();
        config.default_search_engine = "bochaai".to_string();
        config.time_range = "week".to_string();

        let request = ChatRequest::chat_with_search("q", &config, false);
        assert_eq!(request.freshness.as_deref(), Some("oneWeek"));
        assert!(request.searxng_language.is_none());
    }

    #[test]
    fn generic_engine_uses_plain_time_range() {
        let config = Config::default();
        let request = ChatRequest::chat_with_search("q", &config, false);
        assert_eq!(request.engine.as_deref(), Some("search_std"));
        assert_eq!(request.time_range.as_deref(), Some("month"));
    }

    #[test]
    fn bochaai_freshness_covers_documented_ranges() {
        assert_eq!(bochaai_freshness("day"), "oneDay");
        assert_eq!(bochaai_freshness("week"), "oneWeek");
        assert_eq!(bochaai_freshness("month"), "oneMonth");
        assert_eq!(bochaai_freshness("year"), "oneYear");
        assert_eq!(bochaai_freshness(""), "noLimit");
        assert_eq!(bochaai_freshness("fortnight"), "oneMonth");
    }
}
