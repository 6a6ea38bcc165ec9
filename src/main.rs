use std::{future::IntoFuture, num::NonZeroUsize, process, sync::Arc};

use tokio::sync::Notify;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use vitrine::{
    application::{
        auth::TokenVerifier,
        banners::{AdminBannerService, ListingSettings},
        cache::BannerCache,
        error::AppError,
        repos::BannersRepo,
        resolution::{ResolutionService, ResolutionSettings},
    },
    config,
    infra::{
        cache::{MemoryBannerCache, RedisBannerCache},
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState},
        telemetry,
    },
};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    match command {
        config::Command::Serve(_) => {
            telemetry::init(&settings.logging).map_err(AppError::from)?;
            run_serve(settings).await
        }
        config::Command::Token(args) => run_token(&settings, &args),
    }
}

fn run_token(settings: &config::Settings, args: &config::TokenArgs) -> Result<(), AppError> {
    let verifier = token_verifier(&settings.auth);
    let token = verifier
        .issue(&args.username, args.admin)
        .map_err(|err| AppError::unexpected(err.to_string()))?;
    println!("{token}");
    Ok(())
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let cache = init_cache(&settings.cache).await?;
    let state = build_api_state(repositories, cache, &settings);

    serve_http(&settings, state).await
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(
        database_url,
        settings.database.max_connections.get(),
        settings.database.statement_timeout,
    )
    .await
    .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn init_cache(settings: &config::CacheSettings) -> Result<Arc<dyn BannerCache>, AppError> {
    match settings.url.as_deref() {
        Some(url) => {
            let cache = RedisBannerCache::connect(url).await?;
            info!(target = "vitrine::cache", backend = "redis", "banner cache ready");
            Ok(Arc::new(cache))
        }
        None => {
            let capacity = NonZeroUsize::new(settings.memory_capacity.get() as usize)
                .ok_or_else(|| InfraError::configuration("cache capacity must be non-zero"))?;
            info!(
                target = "vitrine::cache",
                backend = "memory",
                capacity = capacity.get(),
                "banner cache ready"
            );
            Ok(Arc::new(MemoryBannerCache::new(capacity)))
        }
    }
}

fn token_verifier(auth: &config::AuthSettings) -> TokenVerifier {
    TokenVerifier::new(&auth.user_secret, &auth.admin_secret, auth.token_ttl)
}

fn build_api_state(
    repositories: Arc<PostgresRepositories>,
    cache: Arc<dyn BannerCache>,
    settings: &config::Settings,
) -> ApiState {
    let banners_repo: Arc<dyn BannersRepo> = repositories;
    let store_timeout = settings.database.statement_timeout;

    let resolution = ResolutionService::new(
        banners_repo.clone(),
        cache,
        ResolutionSettings {
            cache_ttl: settings.cache.ttl,
            cache_timeout: settings.cache.operation_timeout,
            store_timeout,
        },
    );
    let banners = AdminBannerService::new(
        banners_repo,
        ListingSettings {
            default_limit: settings.listing.default_limit,
            max_limit: settings.listing.max_limit,
        },
        store_timeout,
    );

    ApiState {
        resolution: Arc::new(resolution),
        banners: Arc::new(banners),
        tokens: Arc::new(token_verifier(&settings.auth)),
        request_timeout: settings.server.request_timeout,
    }
}

async fn serve_http(settings: &config::Settings, state: ApiState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(target = "vitrine::http", addr = %settings.server.addr, "listening");

    let shutdown = Arc::new(Notify::new());
    let trigger = shutdown.clone();
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move { trigger.notified().await });
    let mut handle = tokio::spawn(server.into_future());

    tokio::select! {
        joined = &mut handle => return flatten_server_result(joined),
        () = shutdown_signal() => {}
    }

    let grace = settings.server.graceful_shutdown;
    info!(
        target = "vitrine::http",
        grace_seconds = grace.as_secs(),
        "shutdown requested; draining in-flight requests"
    );
    shutdown.notify_one();

    match tokio::time::timeout(grace, &mut handle).await {
        Ok(joined) => flatten_server_result(joined),
        Err(_) => {
            warn!(
                target = "vitrine::http",
                "grace period elapsed; aborting remaining connections"
            );
            handle.abort();
            Ok(())
        }
    }
}

fn flatten_server_result(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(AppError::unexpected(format!("server error: {err}"))),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(target = "vitrine::http", error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(target = "vitrine::http", error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
