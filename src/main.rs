// Set up an OAuth client in Google Cloud console:
// - Authorized redirect URI: http://localhost:3000/login/google
// Then provide the credentials, either exported or in a .env file:
// ```.env
// OIDC_GOOGLE_CLIENT="your_client_id"
// OIDC_GOOGLE_SECRET="your_client_secret"
// ```
// finally ```cargo run``` and open http://localhost:3000/
use std::net::{Ipv4Addr, SocketAddrV4};

use anyhow::Context;
use cookie_google_oidc::{
    AppState,
    config::{IssuerConfig, Providers},
    routes::router,
};
use tracing::info;

static PORT: u16 = 3000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Log settings
    tracing_subscriber::fmt::init();

    let google = IssuerConfig::google_from_env().context("Failed to read Google credentials")?;
    let app = router(AppState::new(Providers::new(google)));

    let addr = SocketAddrV4::new(Ipv4Addr::new(0, 0, 0, 0), PORT);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind tcp listener")?;
    info!("Listening on {:?}", addr);

    axum::serve(listener, app).await?;
    anyhow::Ok(())
}
