use anyhow::{Result, bail};
use clap::Parser;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{EnvFilter, fmt};

use gpt_clip::app::run_exchange;
use gpt_clip::chat::HttpChatClient;
use gpt_clip::cli::Cli;
use gpt_clip::clipboard::{copy_to_clipboard, read_clipboard};
use gpt_clip::logging::{InteractionLogger, InteractionRecord};
use gpt_clip::paths::{get_default_config_path, get_log_dir};
use gpt_clip::settings::{Settings, env_snapshot};

fn main() -> ExitCode {
    let cli = Cli::parse();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config.clone() {
        Some(path) => path,
        None => get_default_config_path()?,
    };

    if cli.init_config {
        Settings::create_default(&config_path)?;
        println!("Config file ready at {}", config_path.display());
        return Ok(());
    }

    let settings = Settings::resolve(&config_path, &env_snapshot(), &cli.overrides())?;

    let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
    if api_key.is_empty() {
        bail!("OPENAI_API_KEY environment variable not set");
    }

    let backend = match std::env::var("OPENAI_BASE_URL") {
        Ok(url) if !url.is_empty() => HttpChatClient::with_base_url(api_key, url),
        _ => HttpChatClient::new(api_key),
    };

    let input = read_clipboard()?;
    let (reply, response) = run_exchange(&settings, &input, &backend)?;

    copy_to_clipboard(&reply)?;
    println!("{reply}");
    println!("Reply copied to clipboard.");

    // Logging failures must not undo the completed clipboard write.
    if settings.log_enabled {
        let logger = InteractionLogger::new(
            get_log_dir(&config_path),
            settings.log_format,
            settings.log_retention_days,
        );
        let record = InteractionRecord::new(&settings, &input, &reply, &response);
        if let Err(err) = logger.append(&record) {
            error!("Failed to append log entry: {err:#}");
        }
        if let Err(err) = logger.cleanup_old_logs() {
            error!("Failed to clean up old logs: {err:#}");
        }
    }

    Ok(())
}
