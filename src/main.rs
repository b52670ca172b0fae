use homevideo::api;
use homevideo::logger::*;
use homevideo::server::*;
use homevideo::settings::*;
use std::fs;
use std::sync::Arc;
use tokio::signal;
use warp::Filter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let mut project_settings = parse_settings(cli.settings.as_deref())?;
    if let Some(address) = cli.address {
        project_settings.http.address = address;
    }
    info!(?project_settings);
    logger.reload_from_config(&LogConfig::from(&project_settings.log))?;

    let address: std::net::SocketAddr = project_settings.http.address.parse()?;
    let server = Arc::new(Server::try_new(&project_settings).await?);

    let routes = api::routes(server.clone())
        .recover(api::recover_error)
        .with(api::cors(&project_settings.http.cors_origins))
        .with(warp::trace::request());

    let shutdown_signal = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("could not listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    match (&project_settings.http.cert_path, &project_settings.http.key_path) {
        (Some(cert_path), Some(key_path)) => {
            for (what, path) in [("cert", cert_path), ("key", key_path)] {
                if !fs::metadata(path)?.is_file() {
                    return Err(anyhow::anyhow!("TLS {} is not a regular file: {:?}", what, path));
                }
            }
            let (bound, serving) = warp::serve(routes)
                .tls()
                .cert_path(cert_path)
                .key_path(key_path)
                .bind_with_graceful_shutdown(address, shutdown_signal);
            info!(%bound, "listening with TLS");
            serving.await;
        }
        _ => {
            let (bound, serving) =
                warp::serve(routes).try_bind_with_graceful_shutdown(address, shutdown_signal)?;
            info!(%bound, "listening");
            serving.await;
        }
    }

    let shutdown_timeout = std::time::Duration::from_secs(10);
    match tokio::time::timeout(shutdown_timeout, server.shutdown()).await {
        Ok(_) => info!("server shutdown successfully"),
        Err(_) => error!("server shutdown timed out"),
    }

    Ok(())
}
