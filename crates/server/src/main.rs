use server::{start_server, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present, then layered config (file + env overrides)
    dotenvy::dotenv().ok();

    let config = ServerConfig::load()?;
    start_server(config).await
}
