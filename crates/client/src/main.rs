use clap::Parser;
use tracing_subscriber::EnvFilter;

use parley_core::Config;
use parley_mcp::{McpClient, SseClientTransport};

#[derive(Parser, Debug)]
#[command(name = "parley-client", about = "Run the demo session against a parley server")]
struct Args {
    /// Server base URL (overrides LOCALHOST_URL).
    #[arg(long)]
    url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    parley_core::config::load_dotenv();
    let args = Args::parse();

    // stdout is reserved for scenario output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env();
    let url = args.url.unwrap_or(config.client.localhost_url);

    let transport = SseClientTransport::connect(&url).await?;
    let mut client = McpClient::connect(transport).await?;
    parley_client::run_scenario(&mut client, &mut std::io::stdout()).await?;

    Ok(())
}
