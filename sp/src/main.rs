use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader};
use std::sync::Arc;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};

use studyplan::cli::{Cli, Command, get_log_dir, get_log_path};
use studyplan::config::Config;
use studyplan::gateway::{GatewayLimits, LlmGateway, ModelGateway};
use studyplan::llm::create_client;
use studyplan::planning::RefinementConfig;
use studyplan::prompts::PromptLoader;
use studyplan::session::Session;
use studyplan::terminal::{TerminalIo, render};
use studyplan::CurriculumError;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = get_log_dir();
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(get_log_path())
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(provider = %config.llm.provider, model = %config.llm.model, "studyplan loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Plan {
            topic,
            experience,
            days,
            save_dir,
            json,
        }) => {
            let save_dir = save_dir.or_else(|| config.output.save_dir.clone());
            cmd_plan(&config, topic, experience, days, save_dir, json).await
        }
        Some(Command::Config) => cmd_config(&config),
        Some(Command::Logs { lines }) => cmd_logs(lines),
        None => {
            debug!("main: no command specified, starting a plan");
            cmd_plan(&config, None, None, None, config.output.save_dir.clone(), false).await
        }
    }
}

/// Run an interactive planning session
async fn cmd_plan(
    config: &Config,
    topic: Option<String>,
    experience: Option<String>,
    days: Option<u32>,
    save_dir: Option<std::path::PathBuf>,
    json: bool,
) -> Result<()> {
    debug!(?topic, ?experience, ?days, ?save_dir, json, "cmd_plan: called");
    config.validate()?;

    let llm = create_client(&config.llm).context("Failed to create LLM client")?;
    let prompts = PromptLoader::new(config.prompts_dir.as_deref());
    let gateway = Arc::new(LlmGateway::new(llm, prompts, GatewayLimits::from(&config.session)));

    let mut io = TerminalIo::new(json, save_dir)?;
    let request = match io.prompt_request(topic, experience, days, config.session.max_days) {
        Ok(request) => request,
        Err(e) if matches!(e.downcast_ref::<CurriculumError>(), Some(CurriculumError::Cancelled)) => {
            println!("Session cancelled.");
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let dyn_gateway: Arc<dyn ModelGateway> = gateway.clone();
    let mut session = Session::new(request, dyn_gateway, RefinementConfig::from(&config.session));

    match session.run(&mut io).await {
        Ok(summary) => {
            let usage = gateway.usage();
            println!("{} {}", "✓".green(), render::render_summary(&summary));
            println!(
                "{}",
                format!(
                    "Tokens used: {} in / {} out ({} total)",
                    usage.input_tokens,
                    usage.output_tokens,
                    usage.total()
                )
                .dimmed()
            );
            Ok(())
        }
        Err(CurriculumError::Cancelled) => {
            info!("cmd_plan: session cancelled");
            println!("Session cancelled.");
            Ok(())
        }
        Err(e) => Err(e).context("Planning session failed"),
    }
}

/// Print the effective configuration
fn cmd_config(config: &Config) -> Result<()> {
    debug!("cmd_config: called");
    print!("{}", config.to_yaml()?);
    Ok(())
}

/// Print the last `lines` lines of the log file
fn cmd_logs(lines: usize) -> Result<()> {
    debug!(lines, "cmd_logs: called");
    let log_path = get_log_path();

    if !log_path.exists() {
        println!("No log file found at: {}", log_path.display());
        return Ok(());
    }

    let file = fs::File::open(&log_path).context("Failed to open log file")?;
    let all_lines: Vec<String> = BufReader::new(file).lines().map_while(|line| line.ok()).collect();
    let start = all_lines.len().saturating_sub(lines);

    for line in &all_lines[start..] {
        println!("{}", line);
    }
    Ok(())
}
