//! HiveCache server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use apalis::layers::retry::RetryPolicy;
use apalis::prelude::*;
use axum::{Router, routing::get};
use hivecache_common::Config;
use hivecache_core::{AccountService, DeliveryService};
use hivecache_db::repositories::{
    AccountRepository, BookmarkRepository, FollowerRepository, FollowingRepository,
};
use hivecache_federation::{
    AccountFetcher, ActorState, ApClient, CollectionState, HttpSigner, InboxState, UrlConfig,
    WebfingerState, actor_handler, followers_handler, following_handler, outbox_handler,
    shared_inbox_collection_handler, shared_inbox_handler, user_inbox_collection_handler,
    user_inbox_handler, webfinger_handler,
};
use hivecache_queue::{
    DeliverContext, DeliverJob, InboxJob, InboxWorkerContext, RedisDeliveryService,
    RedisInboxQueue, RetryConfig, deliver_worker, inbox_worker,
};
use tokio::signal;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Largest accepted inbound activity payload.
const MAX_ACTIVITY_BYTES: usize = 1024 * 1024;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

async fn health_handler() -> &'static str {
    "OK"
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .init();

    info!("Starting hivecache server...");

    // Load configuration
    let config = Config::load()?;
    let base_url = config.server.base_url()?;

    // Connect to database
    let db = hivecache_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    hivecache_db::migrate(&db).await?;
    info!("Migrations completed");

    // Connect to Redis and initialize the job queues
    info!("Connecting to Redis...");
    let redis_client = redis::Client::open(config.redis.url.as_str())?;
    let redis_conn = redis::aio::ConnectionManager::new(redis_client).await?;
    let deliver_storage = apalis_redis::RedisStorage::<DeliverJob>::new(redis_conn.clone());
    let inbox_storage = apalis_redis::RedisStorage::<InboxJob>::new(redis_conn);
    info!("Connected to Redis job queue");

    // Initialize repositories
    let db = Arc::new(db);
    let account_repo = AccountRepository::new(Arc::clone(&db));
    let bookmark_repo = BookmarkRepository::new(Arc::clone(&db));
    let follower_repo = FollowerRepository::new(Arc::clone(&db));
    let following_repo = FollowingRepository::new(Arc::clone(&db));

    // The instance service actor signs fetches not tied to any user
    let account_service = AccountService::new(account_repo.clone(), &config);
    let instance_actor = account_service
        .ensure_local(&config.federation.instance_actor)
        .await?;

    let url_config = UrlConfig::new(base_url.clone());
    let mut ap_client = ApClient::new(config.federation.user_agent.clone())?;
    if config.federation.signed_fetch {
        let private_key = instance_actor
            .private_key_pem
            .as_deref()
            .ok_or("instance actor has no private key")?;
        let signer = HttpSigner::new(
            private_key,
            url_config.public_key_url(&instance_actor.username),
        )?;
        ap_client = ap_client.with_signer(signer);
        info!(actor = %instance_actor.uri, "Outbound fetches are signed");
    }

    let fetcher = AccountFetcher::new(account_repo.clone(), ap_client.clone(), url_config.clone());

    // Create ActivityPub delivery service
    let delivery: DeliveryService = Arc::new(RedisDeliveryService::new(
        deliver_storage.clone(),
        account_repo.clone(),
        follower_repo.clone(),
        url_config.clone(),
    ));

    // Create federation states
    let webfinger_state = WebfingerState::new(account_repo.clone(), base_url.clone());
    let actor_state = ActorState::new(account_repo.clone(), base_url.clone());
    let collection_state = CollectionState::new(
        account_repo.clone(),
        bookmark_repo,
        follower_repo,
        following_repo,
        base_url.clone(),
    );
    let inbox_state = InboxState::new(
        account_repo.clone(),
        fetcher,
        Arc::new(RedisInboxQueue::new(inbox_storage.clone())),
        base_url,
    );

    // Build router
    let app = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/.well-known/webfinger",
            get(webfinger_handler).with_state(webfinger_state),
        )
        .route(
            "/ap/u/{username}",
            get(actor_handler).with_state(actor_state),
        )
        .route(
            "/ap/u/{username}/outbox",
            get(outbox_handler).with_state(collection_state.clone()),
        )
        .route(
            "/ap/u/{username}/followers",
            get(followers_handler).with_state(collection_state.clone()),
        )
        .route(
            "/ap/u/{username}/following",
            get(following_handler).with_state(collection_state),
        )
        .route(
            "/ap/u/{username}/inbox",
            get(user_inbox_collection_handler)
                .post(user_inbox_handler)
                .with_state(inbox_state.clone()),
        )
        .route(
            "/ap/inbox",
            get(shared_inbox_collection_handler)
                .post(shared_inbox_handler)
                .with_state(inbox_state),
        )
        .layer(RequestBodyLimitLayer::new(MAX_ACTIVITY_BYTES))
        .layer(TraceLayer::new_for_http());

    // Start federation workers if federation is enabled
    if config.federation.enabled {
        info!("Starting federation workers...");
        let retry = RetryConfig::default();
        let deliver_ctx =
            DeliverContext::new(account_repo.clone(), ap_client.clone(), url_config.clone())
                .with_retry(retry.clone());
        let inbox_ctx = InboxWorkerContext::new(Arc::clone(&db), ap_client, url_config)
            .with_delivery(delivery)
            .with_retry(retry.clone());
        let attempts = usize::try_from(retry.max_attempts).unwrap_or(5);

        // Spawn the workers in the background
        tokio::spawn(async move {
            let monitor = Monitor::new()
                .register(
                    WorkerBuilder::new("deliver")
                        .retry(RetryPolicy::retries(attempts))
                        .data(deliver_ctx)
                        .backend(deliver_storage)
                        .build_fn(deliver_worker),
                )
                .register(
                    WorkerBuilder::new("inbox")
                        .retry(RetryPolicy::retries(attempts))
                        .data(inbox_ctx)
                        .backend(inbox_storage)
                        .build_fn(inbox_worker),
                );

            if let Err(e) = monitor.run().await {
                tracing::error!(error = %e, "Federation workers failed");
            }
        });
        info!("Federation workers started");
    }

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
