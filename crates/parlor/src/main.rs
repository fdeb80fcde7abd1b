use parlor::{ParlorError, ParlorServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), ParlorError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let server = ParlorServer::builder().config(config).build().await?;
    server.run().await
}
