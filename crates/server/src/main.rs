use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use parley_core::Config;
use parley_llm::{create_provider, LlmProvider};
use parley_mcp::{McpServer, StdioTransport};
use parley_runtime::adapters::PgQuoteStore;
use parley_runtime::{register_builtin, Adapters, CapabilityRegistry, Dispatcher};
use parley_server::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum TransportKind {
    /// HTTP with server-sent events.
    Sse,
    /// Newline-delimited JSON on stdin/stdout.
    Stdio,
}

#[derive(Parser, Debug)]
#[command(name = "parley-server", about = "MCP demo server: tools, a quote resource and an LLM prompt")]
struct Args {
    /// Bind host (overrides HOST).
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides PORT).
    #[arg(long)]
    port: Option<u16>,

    #[arg(long, value_enum, default_value_t = TransportKind::Sse)]
    transport: TransportKind,

    /// Apply database migrations before serving.
    #[arg(long)]
    migrate: bool,
}

fn init_tracing(transport: TransportKind) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    // stdout carries protocol frames in stdio mode
    match transport {
        TransportKind::Stdio => builder.with_writer(std::io::stderr).init(),
        TransportKind::Sse => builder.init(),
    }
}

fn llm_provider(config: &Config) -> Option<Arc<dyn LlmProvider>> {
    match create_provider(&config.llm) {
        Ok(provider) => Some(Arc::from(provider)),
        Err(e) => {
            warn!(error = %e, "LLM provider unavailable, ask_llm will report it");
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    parley_core::config::load_dotenv();
    let args = Args::parse();
    init_tracing(args.transport);

    let mut config = Config::from_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.log_summary();

    if args.migrate {
        PgQuoteStore::new(&config.postgres).migrate().await?;
    }

    let adapters = Adapters::from_config(&config, llm_provider(&config))?;
    let mut registry = CapabilityRegistry::new();
    register_builtin(&mut registry, &adapters)?;
    let dispatcher = Dispatcher::new(registry);

    match args.transport {
        TransportKind::Sse => {
            let state = Arc::new(AppState::new(dispatcher));
            parley_server::serve(state, &config.server.bind_addr()).await?;
        }
        TransportKind::Stdio => {
            info!("Serving MCP on stdio");
            let mut transport = StdioTransport::new();
            McpServer::new(dispatcher).run(&mut transport).await?;
        }
    }

    Ok(())
}
