use clap::Parser;
use std::path::PathBuf;

use crate::settings::Overrides;

#[derive(Parser, Debug)]
#[command(name = "gpt-clip")]
#[command(version)]
#[command(
    about = "Send clipboard content to a chat model and copy the reply back to the clipboard",
    long_about = None
)]
pub struct Cli {
    /// Path to the config JSON file (default: per-user config directory)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the model specified in the config file
    #[arg(long)]
    pub model: Option<String>,

    /// Override the system prompt specified in the config file
    #[arg(long)]
    pub prompt: Option<String>,

    /// Override the sampling temperature (0.0-2.0)
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Disable logging for this run
    #[arg(long)]
    pub no_log: bool,

    /// Write a default config file if none exists, then exit
    #[arg(long)]
    pub init_config: bool,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            model: self.model.clone(),
            system_prompt: self.prompt.clone(),
            temperature: self.temperature,
            no_log: self.no_log,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_from_flags() {
        let cli = Cli::parse_from([
            "gpt-clip",
            "--model",
            "gpt-4",
            "--temperature",
            "0.2",
            "--no-log",
        ]);

        let overrides = cli.overrides();
        assert_eq!(overrides.model.as_deref(), Some("gpt-4"));
        assert_eq!(overrides.system_prompt, None);
        assert_eq!(overrides.temperature, Some(0.2));
        assert!(overrides.no_log);
    }

    #[test]
    fn test_no_flags_means_no_overrides() {
        let cli = Cli::parse_from(["gpt-clip"]);

        let overrides = cli.overrides();
        assert_eq!(overrides.model, None);
        assert_eq!(overrides.temperature, None);
        assert!(!overrides.no_log);
        assert!(!cli.init_config);
    }
}
