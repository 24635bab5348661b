mod client;
mod config;
mod error;
mod provider;
mod server;

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{error, info};

use crate::client::MentorClient;
use crate::client::models::{SkillLevel, TaskSummary};
use crate::config::Config;
use crate::server::ProxyState;

const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8000/ai-mentor";

#[tokio::main]
async fn main() {
    // Load .env file (if present) before anything reads env vars
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }

    if args.iter().any(|a| a == "--default-config") {
        print!("{}", Config::default_config_contents());
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // One-shot client modes talk to a running proxy and exit.
    if let Some(code) = run_client_mode(&args).await {
        std::process::exit(code);
    }

    let config_path = flag_value(&args, "--config").map(PathBuf::from);

    let config = match Config::load(config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            error!("failed to load config: {e}");
            std::process::exit(1);
        }
    };

    if args.iter().any(|a| a == "--check") {
        let ok = run_checks(&config);
        std::process::exit(if ok { 0 } else { 1 });
    }

    info!(
        bind = %config.bind,
        model = %config.provider.model,
        "mentor-proxy starting"
    );

    let state = ProxyState::from_config(&config);

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let server_handle = {
        let shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            if let Err(e) = server::serve(&config, state, shutdown_rx).await {
                error!("server error: {e}");
                std::process::exit(1);
            }
        })
    };

    info!("mentor-proxy is running — press Ctrl+C to stop");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for ctrl+c: {e}");
    }
    info!("shutdown signal received, stopping...");
    let _ = shutdown_tx.send(());

    let _ = server_handle.await;
    info!("mentor-proxy stopped");
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

/// Returns the process exit code when a client mode was requested.
async fn run_client_mode(args: &[String]) -> Option<i32> {
    let ask = flag_value(args, "--ask");
    let roadmap = flag_value(args, "--roadmap");
    let quote = args.iter().any(|a| a == "--quote");
    let progress = args.iter().any(|a| a == "--progress");
    let next_steps = flag_value(args, "--next-steps");

    if ask.is_none() && roadmap.is_none() && !quote && !progress && next_steps.is_none() {
        return None;
    }

    let tasks = match parse_tasks(flag_value(args, "--tasks")) {
        Ok(t) => t,
        Err(e) => {
            error!("{e}");
            return Some(2);
        }
    };

    let endpoint = flag_value(args, "--url")
        .map(str::to_string)
        .or_else(|| std::env::var("MENTOR_URL").ok())
        .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

    let client = match MentorClient::new(endpoint, Duration::from_secs(120)) {
        Ok(c) => c,
        Err(e) => {
            error!("failed to build client: {e}");
            return Some(1);
        }
    };

    let result = if let Some(message) = ask {
        client.chat_reply(message, &[]).await
    } else if let Some(skill) = roadmap {
        let level = match flag_value(args, "--level").unwrap_or("beginner").parse::<SkillLevel>() {
            Ok(l) => l,
            Err(e) => {
                error!("{e}");
                return Some(2);
            }
        };
        client.generate_roadmap(skill, level).await.and_then(|r| {
            serde_json::to_string_pretty(&r).map_err(error::MentorError::from)
        })
    } else if progress {
        let streak = match flag_value(args, "--streak").unwrap_or("0").parse::<u32>() {
            Ok(n) => n,
            Err(e) => {
                error!("invalid --streak: {e}");
                return Some(2);
            }
        };
        client.analyze_progress(&tasks, streak).await
    } else if let Some(roadmaps) = next_steps {
        let roadmaps: Vec<String> = roadmaps
            .split(',')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect();
        client
            .suggest_next_steps(&roadmaps, &tasks)
            .await
            .map(|steps| {
                steps
                    .iter()
                    .enumerate()
                    .map(|(i, step)| format!("{}. {step}", i + 1))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
    } else {
        client.motivational_quote().await
    };

    match result {
        Ok(text) => {
            println!("{text}");
            Some(0)
        }
        Err(e) => {
            error!(kind = e.kind(), "request failed: {e}");
            Some(1)
        }
    }
}

/// `--tasks "completed:Install rustup,pending:Traits"` into task summaries.
fn parse_tasks(raw: Option<&str>) -> Result<Vec<TaskSummary>, String> {
    raw.unwrap_or_default()
        .split(',')
        .filter(|t| !t.trim().is_empty())
        .map(str::parse)
        .collect()
}

/// Validate configuration without serving.  Returns false when the proxy
/// would start in the unconfigured state.
fn run_checks(config: &Config) -> bool {
    info!("running pre-flight checks...");
    info!("config: OK");
    info!("  bind: {}", config.bind);
    info!("  base_url: {}", config.provider.base_url);
    info!("  model: {}", config.provider.model);
    info!("  timeout_secs: {}", config.provider.timeout_secs);

    match config.provider_credential() {
        Ok(_) => {
            info!("GOOGLE_AI_API_KEY: set");
            true
        }
        Err(e) => {
            error!("GOOGLE_AI_API_KEY: {e}");
            false
        }
    }
}

fn print_usage() {
    println!(
        "mentor-proxy — AI mentor proxy for a generative-language API

USAGE:
    mentor-proxy [OPTIONS]

OPTIONS:
    --config <PATH>     Path to config file (default: ~/.config/mentor-proxy/config.toml)
    --default-config    Print default config to stdout and exit
    --check             Validate config and credential, then exit
    -h, --help          Print this help message

CLIENT MODE (talks to a running proxy):
    --ask <MESSAGE>     Ask the mentor a question
    --quote             Fetch a motivational quote
    --roadmap <SKILL>   Generate a learning roadmap (JSON)
    --level <LEVEL>     Roadmap level: beginner (default), intermediate, advanced
    --progress          Analyze progress over --tasks and --streak
    --next-steps <LIST> Suggest next steps for comma-separated roadmap titles
    --tasks <LIST>      Comma-separated status:title entries
                        (status: pending, in-progress, completed)
    --streak <DAYS>     Current learning streak in days (default: 0)
    --url <URL>         Proxy endpoint (default: {DEFAULT_ENDPOINT}, or MENTOR_URL)

ENVIRONMENT:
    GOOGLE_AI_API_KEY     Provider credential (required to serve invocations)
    GEMINI_MODEL          Model name (default: gemini-1.5-flash-latest)
    GEMINI_BASE_URL       Provider base URL
    MENTOR_BIND           Listen address (default: 0.0.0.0:8000)
    RUST_LOG              Log filter (default: info)"
    );
}
