mod auth;
mod bot;
mod config;
mod dispatch;
mod message;
mod provider;
mod router;
mod slack;


use std::{net::SocketAddr, sync::Arc};

use anyhow::Context as _;
use axum::{
    body::{Body, BoxBody},
    Router,
};
use log::{error, info};
use tower_http::auth::AsyncRequireAuthorizationLayer;

use crate::{auth::SlackAuthorization, bot::RelayBot, config::Config};

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl-c - {}", e);
        return;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env()?;
    info!("{:?}", config);

    let bot = Arc::new(RelayBot::from_config(&config).await?);

    if let Some(channel) = &config.join_channel {
        match bot.join_channel(channel).await {
            Ok(id) => info!("Joined #{} ({})", channel, id),
            Err(e) => error!("Failed to join #{} - {:?}", channel, e),
        }
    }

    let app: Router<(), Body> = slack::router(bot).layer(AsyncRequireAuthorizationLayer::new(
        SlackAuthorization::<BoxBody>::new(
            config.signing_secret.as_bytes().to_vec(),
            config.request_max_age,
        ),
    ));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);

    #[cfg(not(feature = "use-ssl"))]
    {
        axum::Server::bind(&addr)
            .serve(app.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("HTTP server failed")?;
    }

    #[cfg(feature = "use-ssl")]
    {
        let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(
            &config.tls_cert_path,
            &config.tls_key_path,
        )
        .await
        .context("Failed to load TLS certificate")?;

        let handle = axum_server::Handle::new();
        tokio::spawn({
            let handle = handle.clone();
            async move {
                shutdown_signal().await;
                handle.graceful_shutdown(Some(std::time::Duration::from_secs(10)));
            }
        });

        axum_server::bind_rustls(addr, tls)
            .handle(handle)
            .serve(app.into_make_service())
            .await
            .context("HTTPS server failed")?;
    }

    Ok(())
}
