use anyhow::{Context, Result};
use clap::Subcommand;

use crate::cli::output::{Formatter, OutputFormat, get_formatter};
use crate::models::Config;

const REDACTED: &str = "********";

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Write a config file with every default filled in")]
    Init {
        #[arg(long, help = "Force overwrite existing config")]
        force: bool,
    },
    #[command(about = "Show the effective configuration (secrets masked)")]
    Show,
    #[command(about = "Show the configuration file path")]
    Path,
}

pub fn handle_config(cmd: ConfigCommand, config: &Config, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);

    match cmd {
        ConfigCommand::Init { force } => handle_init(force, formatter.as_ref()),
        ConfigCommand::Show => handle_show(config, format),
        ConfigCommand::Path => handle_path(formatter.as_ref()),
    }
}

fn handle_init(force: bool, formatter: &dyn Formatter) -> Result<()> {
    let config_path = Config::config_path()
        .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    let path = Config::default()
        .save()
        .context("failed to create config")?;
    print!(
        "{}",
        formatter.format_message(&format!("Created config at: {}", path.display()))
    );
    Ok(())
}

/// Copy of `config` that is safe to print.
pub fn redacted(config: &Config) -> Config {
    let mut shown = config.clone();
    for key in [
        &mut shown.llm.groq.api_key,
        &mut shown.llm.gemini.api_key,
        &mut shown.vector_store.api_key,
    ] {
        if key.is_some() {
            *key = Some(REDACTED.to_string());
        }
    }
    shown
}

fn handle_show(config: &Config, format: OutputFormat) -> Result<()> {
    let shown = redacted(config);

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&shown)?);
        return Ok(());
    }

    if let Some(path) = Config::config_path() {
        let state = if path.exists() { "active" } else { "not created" };
        println!("# Config file ({state}): {}", path.display());
        println!();
    }
    print!("{}", toml::to_string_pretty(&shown)?);
    Ok(())
}

fn handle_path(formatter: &dyn Formatter) -> Result<()> {
    let path = Config::config_path()
        .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;
    print!("{}", formatter.format_message(&path.display().to_string()));

    if let Ok(cwd) = std::env::current_dir() {
        let env_path = cwd.join(".env");
        if env_path.exists() {
            eprintln!(".env file (active): {}", env_path.display());
        }
    }
    Ok(())
}
