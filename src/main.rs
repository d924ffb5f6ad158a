mod action;
mod bitbucket;
mod config;
mod menu;

use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::{error, info, info_span, warn};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use crate::action::Dispatcher;
use crate::bitbucket::{Bitbucket, HttpBitbucket};
use crate::config::{Config, ConfigError, Credentials};
use crate::menu::{pipelines, pulls, Menu, MenuItem, RenderContext, StateColor};

/// Menu-bar plugin for Bitbucket Cloud.
///
/// `pipelines` and `pulls` print menus for the host to render on a timer;
/// `action` runs the mutation bound to a clicked menu entry.
#[derive(Parser, Debug)]
#[command(name = "bucketbar", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Write diagnostics to this file instead of stderr
    #[arg(long, env = "VAR_LOG_FILE", global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Status of pipelines started in the last hour
    Pipelines,

    /// Branches and open pull requests, with actions
    Pulls,

    /// Run an action: `<TOKEN>` or `<REPO> <ACTION> [SOURCE_BRANCH]`
    Action {
        #[arg(required = true, num_args = 1..=3)]
        args: Vec<String>,
    },
}

impl Command {
    fn default_log_level(&self) -> &'static str {
        match self {
            Command::Action { .. } => "info",
            _ => "warn",
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.command.default_log_level(), cli.log_file.as_deref());

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            error!(%err, "bucketbar failed");
            eprintln!("{} {}", "✘".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let is_menu = !matches!(cli.command, Command::Action { .. });
    let loaded = Config::load().and_then(|config| {
        let creds = config.credentials()?;
        Ok((config, creds))
    });
    let (config, creds) = match loaded {
        Ok(loaded) => loaded,
        Err(ConfigError::Missing(var)) => {
            // Exit cleanly so the host keeps showing the plugin.
            warn!(var, "configuration incomplete");
            setup_prompt(&cli.command, None).print();
            return Ok(ExitCode::SUCCESS);
        }
        Err(err) if is_menu => {
            error!(%err, "configuration unusable");
            setup_prompt(&cli.command, Some(&err)).print();
            return Ok(ExitCode::SUCCESS);
        }
        Err(err) => return Err(err.into()),
    };
    let api = HttpBitbucket::new(&creds)?;

    match &cli.command {
        Command::Pipelines => {
            let _span = info_span!("pipelines", workspace = %creds.workspace).entered();
            let ctx = match render_context(&creds, &config) {
                Ok(ctx) => ctx,
                Err(err) => {
                    setup_prompt(&cli.command, Some(&err)).print();
                    return Ok(ExitCode::SUCCESS);
                }
            };
            let menu = match pipelines::collect(&api, ctx.now).await {
                Ok(repos) => pipelines::render(&ctx, &repos),
                Err(err) => {
                    error!(%err, "listing repositories failed");
                    pipelines::render_unavailable(&err)
                }
            };
            menu.print();
        }
        Command::Pulls => {
            let _span = info_span!("pulls", workspace = %creds.workspace).entered();
            let ctx = match render_context(&creds, &config) {
                Ok(ctx) => ctx,
                Err(err) => {
                    setup_prompt(&cli.command, Some(&err)).print();
                    return Ok(ExitCode::SUCCESS);
                }
            };
            let menu = match pulls::collect(&api, ctx.now).await {
                Ok(repos) => pulls::render(&ctx, &repos),
                Err(err) => {
                    error!(%err, "listing repositories failed");
                    pulls::render_unavailable(&err)
                }
            };
            menu.print();
        }
        Command::Action { args } => {
            if let Err(err) = run_action(&api, &config.review.reviewers, args).await {
                return Ok(report_failure(&err));
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn run_action(
    api: &dyn Bitbucket,
    reviewers: &[String],
    args: &[String],
) -> Result<(), action::ActionError> {
    info!(?args, "action invoked");
    let request = action::parse_invocation(args)?;
    let outcome = Dispatcher::new(api, reviewers, Local::now().date_naive())
        .dispatch(&request)
        .await?;
    println!("{} {}", "✔".green().bold(), outcome.summary);
    if let Some(link) = outcome.link {
        println!("  {}", link.underline());
    }
    Ok(())
}

/// Falls back to stderr when the log file cannot be opened, so a bad path
/// never keeps a menu from rendering.
fn init_tracing(default_level: &str, log_file: Option<&Path>) {
    let (writer, problem) = log_writer(log_file);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(true)
        .with_ansi(log_file.is_none() || problem.is_some())
        .with_writer(writer)
        .init();
    if let Some(err) = problem {
        warn!(path = ?log_file, %err, "cannot open log file, logging to stderr");
    }
}

fn log_writer(log_file: Option<&Path>) -> (BoxMakeWriter, Option<std::io::Error>) {
    let Some(path) = log_file else {
        return (BoxMakeWriter::new(std::io::stderr), None);
    };
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => (BoxMakeWriter::new(Mutex::new(file)), None),
        Err(err) => (BoxMakeWriter::new(std::io::stderr), Some(err)),
    }
}

fn render_context(creds: &Credentials, config: &Config) -> Result<RenderContext, ConfigError> {
    let program = std::env::current_exe()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "bucketbar".to_string());
    Ok(RenderContext {
        workspace: creds.workspace.clone(),
        web_url: creds.web_url.clone(),
        nickname: config.display.nickname.clone(),
        offset: config.utc_offset()?,
        program,
        now: Utc::now(),
    })
}

fn setup_prompt(command: &Command, problem: Option<&ConfigError>) -> Menu {
    let mut menu = match command {
        Command::Pipelines => menu::setup(pipelines::title()),
        Command::Pulls => menu::setup(pulls::title()),
        Command::Action { .. } => Menu::new(),
    };
    menu.push(MenuItem::new("Setup VAR"));
    if let Some(problem) = problem {
        menu.push(MenuItem::nested(1, problem.to_string()).color(StateColor::Failed.hex()));
    }
    menu
}

/// Action failures are reported once, here, and become a non-zero exit.
fn report_failure(err: &action::ActionError) -> ExitCode {
    error!(%err, "action failed");
    eprintln!("{} {}", "✘".red().bold(), err);
    ExitCode::FAILURE
}
