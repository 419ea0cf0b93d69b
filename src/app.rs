use anyhow::{Result, bail};

use crate::chat::{ChatBackend, ChatRequest, ChatResponse, build_messages};
use crate::settings::Settings;

/// One prompt/reply round trip against the chat backend.
///
/// Rejects empty or all-whitespace input before any remote call is made.
/// On any failure nothing observable has happened yet: the clipboard is
/// untouched and no log entry exists.
pub fn run_exchange(
    settings: &Settings,
    input: &str,
    backend: &dyn ChatBackend,
) -> Result<(String, ChatResponse)> {
    if input.trim().is_empty() {
        bail!("Clipboard is empty or whitespace");
    }

    let request = ChatRequest {
        model: settings.model.clone(),
        messages: build_messages(&settings.system_prompt, input),
        temperature: settings.temperature,
    };

    let response = backend.complete(&request)?;
    let reply = response.reply_text()?.to_string();

    Ok((reply, response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{InteractionLogger, InteractionRecord};
    use crate::settings::LogFormat;
    use anyhow::anyhow;
    use std::cell::{Cell, RefCell};
    use std::fs;
    use tempfile::TempDir;

    struct StubBackend {
        calls: Cell<usize>,
        last_request: RefCell<Option<ChatRequest>>,
        response_json: Option<&'static str>,
    }

    impl StubBackend {
        fn replying(json: &'static str) -> Self {
            Self {
                calls: Cell::new(0),
                last_request: RefCell::new(None),
                response_json: Some(json),
            }
        }

        fn failing() -> Self {
            Self {
                calls: Cell::new(0),
                last_request: RefCell::new(None),
                response_json: None,
            }
        }
    }

    impl ChatBackend for StubBackend {
        fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
            self.calls.set(self.calls.get() + 1);
            *self.last_request.borrow_mut() = Some(request.clone());
            match self.response_json {
                Some(json) => Ok(serde_json::from_str(json).unwrap()),
                None => Err(anyhow!("connection refused")),
            }
        }
    }

    const REPLY_JSON: &str = r#"{
        "id": "chatcmpl-abc",
        "choices": [{"message": {"content": "Hi there"}}],
        "usage": {"prompt_tokens": 9, "completion_tokens": 3, "total_tokens": 12}
    }"#;

    #[test]
    fn test_exchange_returns_reply_and_logs_it() {
        let settings = Settings::default();
        let backend = StubBackend::replying(REPLY_JSON);

        let (reply, response) = run_exchange(&settings, "Hello", &backend).unwrap();
        assert_eq!(reply, "Hi there");
        assert_eq!(backend.calls.get(), 1);

        let request = backend.last_request.borrow().clone().unwrap();
        assert_eq!(request.model, settings.model);
        assert_eq!(request.messages.last().unwrap().content, "Hello");

        // Full scenario: log the completed exchange.
        let temp_dir = TempDir::new().unwrap();
        let logger = InteractionLogger::new(temp_dir.path().to_path_buf(), LogFormat::Markdown, 30);
        let record = InteractionRecord::new(&settings, "Hello", &reply, &response);
        let path = logger.append(&record).unwrap();

        let content = fs::read_to_string(path).unwrap();
        assert!(content.contains("Hello"));
        assert!(content.contains("Hi there"));
        assert!(content.contains("chatcmpl-abc"));
    }

    #[test]
    fn test_whitespace_input_never_reaches_backend() {
        let settings = Settings::default();
        let backend = StubBackend::replying(REPLY_JSON);

        let result = run_exchange(&settings, "   \n\t ", &backend);
        assert!(result.is_err());
        assert_eq!(backend.calls.get(), 0);
    }

    #[test]
    fn test_backend_failure_propagates_and_nothing_is_logged() {
        let settings = Settings::default();
        let backend = StubBackend::failing();

        let result = run_exchange(&settings, "Hello", &backend);
        assert!(result.is_err());
        assert_eq!(backend.calls.get(), 1);

        // No record is ever built from a failed exchange, so a log dir for
        // this run stays empty.
        let temp_dir = TempDir::new().unwrap();
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_system_prompt_omitted_when_empty() {
        let mut settings = Settings::default();
        settings.system_prompt = String::new();
        let backend = StubBackend::replying(REPLY_JSON);

        run_exchange(&settings, "Hello", &backend).unwrap();

        let request = backend.last_request.borrow().clone().unwrap();
        assert_eq!(request.messages.len(), 1);
        assert_eq!(request.messages[0].role, "user");
    }

    #[test]
    fn test_malformed_response_is_error() {
        let settings = Settings::default();
        let backend = StubBackend::replying(r#"{"id": "x", "choices": []}"#);

        let result = run_exchange(&settings, "Hello", &backend);
        assert!(result.is_err());
    }
}
