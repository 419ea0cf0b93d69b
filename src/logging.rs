use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDateTime};
use serde_json::json;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::chat::{ChatResponse, Usage};
use crate::settings::{LogFormat, Settings};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const FILE_PREFIX: &str = "gpt-clip-";

/// Everything captured about one completed prompt/reply exchange.
///
/// Built only after a reply was successfully obtained; failed runs never
/// produce a record.
#[derive(Debug, Clone)]
pub struct InteractionRecord {
    pub timestamp: NaiveDateTime,
    pub system_prompt: String,
    pub user_input: String,
    pub reply: String,
    pub model: String,
    pub temperature: f64,
    pub usage: Option<Usage>,
    pub response_id: Option<String>,
}

impl InteractionRecord {
    pub fn new(settings: &Settings, user_input: &str, reply: &str, response: &ChatResponse) -> Self {
        Self {
            timestamp: Local::now().naive_local(),
            system_prompt: settings.system_prompt.clone(),
            user_input: user_input.to_string(),
            reply: reply.to_string(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            usage: response.usage.clone(),
            response_id: response.id.clone(),
        }
    }
}

/// Appends interaction records to a daily log file and enforces retention.
///
/// Constructed by the orchestrator only when logging is enabled; a disabled
/// run must perform zero log-directory writes.
pub struct InteractionLogger {
    dir: PathBuf,
    format: LogFormat,
    retention_days: u32,
}

impl InteractionLogger {
    pub fn new(dir: PathBuf, format: LogFormat, retention_days: u32) -> Self {
        Self {
            dir,
            format,
            retention_days,
        }
    }

    /// Render `record` and append it to today's log file, creating the log
    /// directory as needed. Returns the file written to.
    pub fn append(&self, record: &InteractionRecord) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create log directory: {}", self.dir.display()))?;

        let filename = format!(
            "{FILE_PREFIX}{}.{}",
            record.timestamp.format("%Y-%m-%d"),
            self.format.extension()
        );
        let path = self.dir.join(filename);

        let rendered = match self.format {
            LogFormat::Markdown => render_markdown(record),
            LogFormat::Json => render_json(record),
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        file.write_all(rendered.as_bytes())
            .with_context(|| format!("Failed to append to log file: {}", path.display()))?;

        Ok(path)
    }

    /// Delete log files strictly older than the retention window.
    ///
    /// Age comes from the file's embedded timestamp (first markdown heading,
    /// or the `timestamp` field of the first jsonl line). A file whose
    /// timestamp cannot be parsed is retained.
    pub fn cleanup_old_logs(&self) -> Result<usize> {
        if !self.dir.is_dir() {
            return Ok(0);
        }

        let cutoff = Local::now().naive_local() - Duration::days(i64::from(self.retention_days));
        let mut removed = 0;

        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read log directory: {}", self.dir.display()))?
        {
            let path = entry?.path();
            if !is_log_file(&path) {
                continue;
            }

            let Some(stamp) = read_embedded_timestamp(&path) else {
                debug!(path = %path.display(), "No parseable timestamp, retaining log file");
                continue;
            };

            if stamp < cutoff {
                fs::remove_file(&path)
                    .with_context(|| format!("Failed to delete old log: {}", path.display()))?;
                removed += 1;
            }
        }

        Ok(removed)
    }
}

fn is_log_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.starts_with(FILE_PREFIX) && (name.ends_with(".md") || name.ends_with(".jsonl"))
}

fn read_embedded_timestamp(path: &Path) -> Option<NaiveDateTime> {
    let content = fs::read_to_string(path).ok()?;
    let first = content.lines().find(|line| !line.trim().is_empty())?;

    if let Some(heading) = first.strip_prefix("## ") {
        return NaiveDateTime::parse_from_str(heading.trim(), TIMESTAMP_FORMAT).ok();
    }

    let value: serde_json::Value = serde_json::from_str(first).ok()?;
    NaiveDateTime::parse_from_str(value.get("timestamp")?.as_str()?, TIMESTAMP_FORMAT).ok()
}

fn fmt_count(count: Option<u64>) -> String {
    count.map(|n| n.to_string()).unwrap_or_default()
}

fn render_markdown(record: &InteractionRecord) -> String {
    let usage = record.usage.clone().unwrap_or_default();

    format!(
        "## {timestamp}\n\n\
         **System Prompt:**\n{system_prompt}\n\n\
         **User Input:**\n```\n{user_input}\n```\n\n\
         **Reply:**\n```\n{reply}\n```\n\n\
         - **Model:** {model}\n\
         - **Temperature:** {temperature}\n\
         - **Usage:** prompt_tokens: {prompt}, completion_tokens: {completion}, total_tokens: {total}\n\
         - **Response ID:** {response_id}\n\
         \n---\n",
        timestamp = record.timestamp.format(TIMESTAMP_FORMAT),
        system_prompt = record.system_prompt,
        user_input = record.user_input,
        reply = record.reply,
        model = record.model,
        temperature = record.temperature,
        prompt = fmt_count(usage.prompt_tokens),
        completion = fmt_count(usage.completion_tokens),
        total = fmt_count(usage.total_tokens),
        response_id = record.response_id.as_deref().unwrap_or(""),
    )
}

/// One JSON object per line.
fn render_json(record: &InteractionRecord) -> String {
    let usage = record.usage.clone().unwrap_or_default();

    let entry = json!({
        "timestamp": record.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        "system_prompt": record.system_prompt,
        "user_input": record.user_input,
        "reply": record.reply,
        "model": record.model,
        "temperature": record.temperature,
        "usage": {
            "prompt_tokens": usage.prompt_tokens,
            "completion_tokens": usage.completion_tokens,
            "total_tokens": usage.total_tokens,
        },
        "response_id": record.response_id.as_deref().unwrap_or(""),
    });

    format!("{entry}\n")
}
