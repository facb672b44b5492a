use anyhow::Context;
use chat_widget::config::AppConfig;
use chat_widget::server::{self, AppState};
use chat_widget::session::{FileStore, KeyValueStore, MemoryStore};
use chat_widget::snippet::{EmbedOptions, embed_snippet};
use chat_widget::transport::{HttpTransport, Transport};
use chat_widget::{BootOutcome, HostPage, Widget, boot};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser)]
#[command(name = "chat-widget", version, about = "Chat widget runtime harness and preview server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve widget previews over HTTP (default).
    Serve,
    /// Boot the widget against a host page and print its rendered subtree.
    Render {
        #[command(flatten)]
        host: HostArgs,
        /// Open the panel before rendering.
        #[arg(long)]
        open: bool,
        /// Switch to the chat screen (loads the welcome message).
        #[arg(long)]
        chat: bool,
    },
    /// Boot the widget and chat with it over stdin.
    Chat {
        #[command(flatten)]
        host: HostArgs,
    },
    /// Print the embed tag for a chatbot/widget pair.
    Snippet {
        #[arg(long)]
        chatbot_id: String,
        #[arg(long)]
        widget_id: String,
        #[arg(long)]
        company_id: Option<String>,
        #[arg(long)]
        api_base: Option<String>,
        #[arg(long)]
        debug: bool,
        /// Script URL; defaults to WIDGET_SCRIPT_URL or the public CDN.
        #[arg(long)]
        script_url: Option<String>,
    },
}

#[derive(Args)]
struct HostArgs {
    /// Host page HTML file; defaults to HOST_PAGE_PATH.
    #[arg(long)]
    page: Option<PathBuf>,
    /// URL the host page is served from; defaults to HOST_PAGE_URL.
    #[arg(long)]
    url: Option<Url>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    let storage = open_storage(&config)?;
    let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new()?);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let host_html = match &config.host_page_path {
                Some(path) => Some(
                    tokio::fs::read_to_string(path)
                        .await
                        .with_context(|| format!("reading host page {path:?}"))?,
                ),
                None => None,
            };
            let addr = config.bind_addr;
            let state = AppState::new(config, transport, storage, host_html);
            tracing::info!(%addr, "starting chat widget preview server");
            server::run(addr, state).await?;
        }
        Command::Render { host, open, chat } => {
            let widget = boot_from_args(&config, &host, storage, transport).await?;
            if open {
                widget.toggle();
            }
            if chat {
                widget.open_chat().await;
            }
            println!("{}", widget.to_html());
        }
        Command::Chat { host } => {
            let widget = boot_from_args(&config, &host, storage, transport).await?;
            run_chat(&widget).await?;
        }
        Command::Snippet {
            chatbot_id,
            widget_id,
            company_id,
            api_base,
            debug,
            script_url,
        } => {
            let opts = EmbedOptions {
                chatbot_id,
                widget_id,
                company_id,
                api_base,
                debug,
            };
            let script_url = script_url.unwrap_or_else(|| config.script_url.clone());
            println!("{}", embed_snippet(&script_url, &opts));
        }
    }
    Ok(())
}

fn open_storage(config: &AppConfig) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    Ok(match &config.storage_path {
        Some(path) => Arc::new(
            FileStore::open(path).with_context(|| format!("opening widget storage {path:?}"))?,
        ),
        None => Arc::new(MemoryStore::new()),
    })
}

async fn boot_from_args(
    config: &AppConfig,
    host: &HostArgs,
    storage: Arc<dyn KeyValueStore>,
    transport: Arc<dyn Transport>,
) -> anyhow::Result<Arc<Widget>> {
    let path = host
        .page
        .as_ref()
        .or(config.host_page_path.as_ref())
        .context("no host page given; pass --page or set HOST_PAGE_PATH")?;
    let html = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading host page {path:?}"))?;
    let url = host.url.clone().unwrap_or_else(|| config.host_page_url.clone());
    let page = HostPage::from_html(url, &html, storage);
    match boot(&page, transport, &config.policy).await? {
        BootOutcome::Mounted(widget) => Ok(widget),
        BootOutcome::AlreadyLoaded => anyhow::bail!("widget already loaded on this page"),
    }
}

async fn run_chat(widget: &Widget) -> anyhow::Result<()> {
    widget.open_chat().await;
    let mut printed = print_new_bubbles(widget, 0);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        widget.type_input(&line);
        widget.send_message(None).await;
        printed = print_new_bubbles(widget, printed);
    }
    Ok(())
}

fn print_new_bubbles(widget: &Widget, already: usize) -> usize {
    let bubbles = widget.bubbles();
    for (role, text) in bubbles.iter().skip(already) {
        let who = if role == "user" { "you" } else { "bot" };
        println!("{who}> {text}");
    }
    bubbles.len()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}
