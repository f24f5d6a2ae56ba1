use library_api::config::Config;
use library_api::interface::{self, shared_library};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdoutはMCPのプロトコル用に空けておく
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mode = std::env::args().nth(1).unwrap_or_else(|| "serve".to_string());
    let library = shared_library();

    match mode.as_str() {
        "serve" => {
            let config = Config::from_env();
            tracing::info!(?config, "Configuration loaded");
            interface::http::run(config, library).await
        }
        "mcp" => interface::mcp::run(library).await,
        other => anyhow::bail!("unknown command: '{other}'. Use: serve, mcp"),
    }
}
