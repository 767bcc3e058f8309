use std::{process, sync::Arc};

use lenta::{
    application::{
        error::AppError,
        feed::FeedService,
        follows::FollowService,
        posts::PostComposer,
        repos::{
            CommentsRepo, FollowsRepo, GroupsRepo, PostsRepo, PostsWriteRepo, SessionsRepo,
            UsersRepo,
        },
    },
    config,
    infra::{
        cache::ResponseCache,
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState},
        media::MediaStorage,
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

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
    let (_cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let repositories = init_repositories(&settings).await?;
    let state = build_http_state(repositories, &settings)?;

    let router = http::build_router(state);
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "lenta::startup",
        addr = %settings.server.addr,
        "listening"
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    let grace = settings.server.graceful_shutdown;
    match tokio::time::timeout(grace, &mut server).await {
        Ok(joined) => joined
            .map_err(|err| AppError::unexpected(format!("server task failed: {err}")))?
            .map_err(|err| AppError::unexpected(format!("server error: {err}")))?,
        Err(_) => {
            warn!(
                target = "lenta::startup",
                timeout_secs = grace.as_secs(),
                "graceful shutdown timed out, aborting in-flight requests"
            );
            server.abort();
        }
    }

    Ok(())
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

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::connect(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::migration(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn build_http_state(
    repositories: Arc<PostgresRepositories>,
    settings: &config::Settings,
) -> Result<HttpState, AppError> {
    let posts_repo: Arc<dyn PostsRepo> = repositories.clone();
    let posts_write_repo: Arc<dyn PostsWriteRepo> = repositories.clone();
    let comments_repo: Arc<dyn CommentsRepo> = repositories.clone();
    let groups_repo: Arc<dyn GroupsRepo> = repositories.clone();
    let users_repo: Arc<dyn UsersRepo> = repositories.clone();
    let follows_repo: Arc<dyn FollowsRepo> = repositories.clone();
    let sessions_repo: Arc<dyn SessionsRepo> = repositories.clone();

    let media = Arc::new(
        MediaStorage::new(settings.media.directory.clone()).map_err(InfraError::from)?,
    );

    let feed = Arc::new(FeedService::new(
        posts_repo.clone(),
        comments_repo.clone(),
        groups_repo.clone(),
        users_repo.clone(),
        follows_repo.clone(),
    ));
    let follows = Arc::new(FollowService::new(follows_repo, users_repo));
    let composer = Arc::new(PostComposer::new(
        posts_repo,
        posts_write_repo,
        comments_repo,
        groups_repo,
        media.clone(),
    ));

    Ok(HttpState {
        feed,
        follows,
        composer,
        sessions: sessions_repo,
        db: repositories,
        media,
        cache: ResponseCache::new(settings.cache.ttl),
        media_max_request_bytes: settings.media.max_request_bytes as usize,
    })
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(target = "lenta::startup", error = %err, "failed to install shutdown handler");
    }
}
