use std::{process, sync::Arc};

use pero::{
    application::{
        auth::AuthService,
        error::AppError,
        feed::FeedService,
        posts::{CommentService, PostService},
        repos::{
            CommentsRepo, FollowsRepo, GroupsRepo, PostsRepo, PostsWriteRepo, SessionsRepo,
            UsersRepo,
        },
    },
    config,
    infra::{
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

    let database_url = settings.database.url.clone().ok_or_else(|| {
        AppError::from(InfraError::configuration(
            "database.url is required; set it in the config file or PERO__DATABASE__URL",
        ))
    })?;

    let pool = PostgresRepositories::connect(&database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
    let repositories = Arc::new(PostgresRepositories::new(pool));

    let media = Arc::new(
        MediaStorage::new(settings.media.directory.clone())
            .map_err(|err| AppError::from(InfraError::from(err)))?,
    );

    let state = build_http_state(repositories, media, &settings);
    let router = http::build_router(state).layer(axum::extract::DefaultBodyLimit::max(
        settings.media.max_upload_bytes.get() as usize,
    ));

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "pero::server",
        addr = %settings.server.addr,
        "listening"
    );

    // Bound the drain phase: if connections refuse to finish within the
    // configured window after the signal, exit anyway.
    let grace = settings.server.graceful_shutdown;
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tokio::time::sleep(grace).await;
            warn!(
                target = "pero::server",
                "graceful shutdown window elapsed, exiting"
            );
            process::exit(1);
        }
    });

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!(target = "pero::server", "shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(target = "pero::server", error = %err, "failed to listen for shutdown signal");
    }
}

fn build_http_state(
    repositories: Arc<PostgresRepositories>,
    media: Arc<MediaStorage>,
    settings: &config::Settings,
) -> HttpState {
    let users: Arc<dyn UsersRepo> = repositories.clone();
    let groups: Arc<dyn GroupsRepo> = repositories.clone();
    let posts_read: Arc<dyn PostsRepo> = repositories.clone();
    let posts_write: Arc<dyn PostsWriteRepo> = repositories.clone();
    let comments: Arc<dyn CommentsRepo> = repositories.clone();
    let follows: Arc<dyn FollowsRepo> = repositories.clone();
    let sessions: Arc<dyn SessionsRepo> = repositories.clone();

    let feed = Arc::new(FeedService::new(
        posts_read,
        groups.clone(),
        users.clone(),
        follows.clone(),
        comments.clone(),
        settings.feed.page_size.get(),
    ));
    let posts = Arc::new(PostService::new(
        posts_write,
        groups.clone(),
        users.clone(),
        follows,
        media.clone(),
    ));
    let comment_service = Arc::new(CommentService::new(comments));
    let auth = Arc::new(AuthService::new(
        users,
        sessions,
        time::Duration::try_from(settings.sessions.ttl)
            .unwrap_or(time::Duration::hours(24 * 14)),
    ));

    HttpState {
        feed,
        posts,
        comments: comment_service,
        auth,
        groups,
        media,
        db: Some(repositories),
    }
}
