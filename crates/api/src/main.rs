use jobrelay_api::config::ApiConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    jobrelay_observability::init();

    let config = ApiConfig::from_env();

    // Keep the handle alive for the lifetime of the server; dropping it
    // would not stop the workers, but shutdown stays explicit this way.
    let (app, _workers) = jobrelay_api::app::build_app(&config);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
