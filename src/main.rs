mod chat_transport;
mod cli_adapter;
mod config;
mod coordinator;
mod dispatcher;
mod engine;
mod intent;
mod order_service;
mod slack_adapter;
mod transcript;
mod types;

use anyhow::{Context, Result};
use chat_transport::HttpChatTransport;
use cli_adapter::ReplInput;
use config::Config;
use coordinator::Coordinator;
use dispatcher::OrderActionDispatcher;
use engine::{Engine, EngineSettings};
use intent::{Catalog, IntentRecognizer};
use order_service::HttpOrderService;
use slack_adapter::SlackAdapter;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use types::ActionArgs;

const DEFAULT_CONFIG_PATH: &str = "ordertalk.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let mut args: Vec<String> = env::args().collect();
    let _bin = args.remove(0);
    if args.is_empty() {
        print_usage();
        return Ok(());
    }

    match args[0].as_str() {
        "serve" => run_serve(&args[1..]).await,
        "chat" => run_chat(&args[1..]).await,
        "dispatch" => run_dispatch(&args[1..]).await,
        "help" | "-h" | "--help" => {
            print_usage();
            Ok(())
        }
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn init_logging(cfg: &Config) {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.logging.filter)),
        )
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    let loaded = Config::load_optional(&path)?;
    let from_file = loaded.is_some();
    let cfg = loaded.unwrap_or_default();
    init_logging(&cfg);
    if !from_file {
        tracing::info!(path = %path.display(), "config file not found, using defaults");
    }
    Ok(cfg)
}

fn order_dispatcher(cfg: &Config) -> Result<OrderActionDispatcher<HttpOrderService>> {
    let service = HttpOrderService::new(
        &cfg.order_service.base_url,
        Duration::from_secs(cfg.order_service.timeout_secs),
    )
    .context("failed to build order service client")?;
    Ok(OrderActionDispatcher::new(service))
}

async fn run_serve(args: &[String]) -> Result<()> {
    let mut config_path: Option<PathBuf> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                let value = args.get(i + 1).context("--config requires a value")?;
                config_path = Some(PathBuf::from(value));
                i += 2;
            }
            "--help" | "-h" => {
                print_serve_usage();
                return Ok(());
            }
            other => {
                return Err(anyhow::anyhow!("unknown serve argument: {other}"));
            }
        }
    }

    let cfg = load_config(config_path)?;
    let slack_cfg = cfg.require_slack()?;
    let dispatcher = order_dispatcher(&cfg)?;
    let slack = SlackAdapter::connect(slack_cfg).await?;
    tracing::info!(order_service = %cfg.order_service.base_url, "order dispatcher ready");

    Coordinator::new(slack, dispatcher).run().await
}

async fn run_dispatch(args: &[String]) -> Result<()> {
    let mut config_path: Option<PathBuf> = None;
    let mut user_id: Option<String> = None;
    let mut action_args = ActionArgs::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                let value = args.get(i + 1).context("--config requires a value")?;
                config_path = Some(PathBuf::from(value));
                i += 2;
            }
            "--user" => {
                let value = args.get(i + 1).context("--user requires a value")?;
                user_id = Some(value.to_string());
                i += 2;
            }
            "--action" => {
                let value = args.get(i + 1).context("--action requires a value")?;
                action_args.action = value.to_string();
                i += 2;
            }
            "--product" => {
                let value = args.get(i + 1).context("--product requires a value")?;
                action_args.product = Some(value.to_string());
                i += 2;
            }
            "--quantity" => {
                let value = args.get(i + 1).context("--quantity requires a value")?;
                action_args.quantity = Some(dispatcher::parse_scalar(value));
                i += 2;
            }
            "--order-id" => {
                let value = args.get(i + 1).context("--order-id requires a value")?;
                action_args.order_id = Some(dispatcher::parse_scalar(value));
                i += 2;
            }
            "--help" | "-h" => {
                print_dispatch_usage();
                return Ok(());
            }
            other => {
                return Err(anyhow::anyhow!("unknown dispatch argument: {other}"));
            }
        }
    }

    let user_id = user_id.context("--user is required")?;
    let cfg = load_config(config_path)?;
    let dispatcher = order_dispatcher(&cfg)?;
    let reply = dispatcher.dispatch(&action_args, &user_id).await;
    println!("{reply}");
    Ok(())
}

async fn run_chat(args: &[String]) -> Result<()> {
    let mut config_path: Option<PathBuf> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                let value = args.get(i + 1).context("--config requires a value")?;
                config_path = Some(PathBuf::from(value));
                i += 2;
            }
            "--help" | "-h" => {
                print_chat_usage();
                return Ok(());
            }
            other => {
                return Err(anyhow::anyhow!("unknown chat argument: {other}"));
            }
        }
    }

    let cfg = load_config(config_path)?;
    let transport = HttpChatTransport::new(
        &cfg.chat.base_url,
        Duration::from_secs(cfg.chat.timeout_secs),
    )
    .context("failed to build chat client")?;
    let recognizer = IntentRecognizer::new(Catalog::new(cfg.catalog.products.clone()));
    let navigator = Arc::new(cli_adapter::TerminalNavigator::new(&cfg.chat.base_url));
    let mut engine = Engine::open(
        transport,
        recognizer,
        navigator,
        EngineSettings::from(&cfg.chat),
    );

    let mut seen = print_updates(&engine, 0);
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = LinesStream::new(stdin.lines());

    while let Some(line) = lines.next().await {
        let line = line.context("failed to read stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        let input = match cli_adapter::parse_input(&line) {
            Ok(input) => input,
            Err(err) => {
                eprintln!("{err:#}");
                continue;
            }
        };

        match input {
            ReplInput::Quit => break,
            ReplInput::Message(text) => engine.submit(&text).await?,
            ReplInput::Select(index) => {
                let action = engine.state().quick_actions.get(index).cloned();
                match action {
                    Some(action) => {
                        engine.select_quick_action(&action).await?;
                    }
                    None => eprintln!("no quick action /{}", index + 1),
                }
            }
        }
        seen = print_updates(&engine, seen);
    }

    engine.close();
    Ok(())
}

fn print_updates<T>(engine: &Engine<T>, seen: usize) -> usize
where
    T: chat_transport::ChatTransport,
{
    let state = engine.state();
    if let Some(text) = transcript::format_messages(state.transcript.since(seen)) {
        print!("{text}");
    }
    if let Some(buttons) = cli_adapter::render_quick_actions(&state.quick_actions) {
        println!("{buttons}");
    }
    state.transcript.len()
}

fn print_usage() {
    eprintln!(
        "ordertalk usage:\n  ordertalk serve [--config <path>]\n  ordertalk chat [--config <path>]\n  ordertalk dispatch --user <id> --action <action> [options]"
    );
}

fn print_serve_usage() {
    eprintln!("ordertalk serve options:\n  --config <path>");
}

fn print_chat_usage() {
    eprintln!(
        "ordertalk chat options:\n  --config <path>\n\nType a message, /<n> to pick a quick action, /quit to leave."
    );
}

fn print_dispatch_usage() {
    eprintln!(
        "ordertalk dispatch options:\n  --user <id>\n  --action <place_order|cancel_order|view_orders>\n  --product <name>\n  --quantity <n>\n  --order-id <id>\n  --config <path>"
    );
}
