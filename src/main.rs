use sessionward::api;
use sessionward::logger::*;
use sessionward::server::*;
use sessionward::settings::*;
use tokio::signal;
use warp::Filter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    info!(?project_settings);
    let logger_config = LogConfig {
        filter: project_settings.log.filter.clone(),
    };
    logger.reload_from_config(&logger_config)?;

    let address: std::net::SocketAddr = project_settings.http.address.parse()?;

    let server = Server::try_new(&project_settings).await?;

    let api_v1 = warp::path("api")
        .and(warp::path("v1"))
        .and(api::v1::routes(server.session_manager.clone()))
        .recover(api::v1::recover_error)
        .with(warp::trace::request());

    let (bound, serving) =
        warp::serve(api_v1).try_bind_with_graceful_shutdown(address, async {
            if let Err(e) = signal::ctrl_c().await {
                error!("could not listen for SIGINT: {}", e);
            }
        })?;
    info!(%bound, "listening");
    serving.await;

    info!("server shutdown successfully");
    Ok(())
}
