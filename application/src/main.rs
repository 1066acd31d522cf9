use std::{
    io,
    sync::{Arc, OnceLock},
    time,
};

use application::{api, config, graphql, Args, Config, USER_ID_HEADER};
use axum::{
    extract::MatchedPath,
    routing::{on, MethodFilter},
    Extension, Router,
};
use axum_client_ip::InsecureClientIp;
use juniper::EmptySubscription;
use service::{
    infra::{postgres, Postgres},
    Service,
};
use tokio::{net::TcpListener, signal};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing as log;
use tracing_subscriber::{
    filter::filter_fn,
    layer::{Layer as _, SubscriberExt as _},
    util::SubscriberInitExt as _,
};

/// Levels written to `stderr` rather than `stdout`.
const STDERR_LEVELS: &[log::Level] = &[log::Level::WARN, log::Level::ERROR];

/// Maximum level to log, set once the [`Config`] is loaded.
static LOG_LEVEL: OnceLock<log::Level> = OnceLock::new();

postgres::embed_migrations!("../migrations");

#[tokio::main]
async fn main() {
    init_tracing();

    _ = run().await;
}

/// Writes warnings and errors to `stderr`, and everything else to `stdout`.
fn init_tracing() {
    fn enabled(meta: &log::Metadata<'_>, to_stderr: bool) -> bool {
        meta.is_span()
            || STDERR_LEVELS.contains(meta.level()) == to_stderr
                && LOG_LEVEL.get().copied().unwrap_or(log::Level::INFO)
                    >= *meta.level()
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(true)
                .with_thread_names(true)
                .with_writer(io::stdout)
                .with_filter(filter_fn(|meta| enabled(meta, false))),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_ansi(true)
                .with_thread_names(true)
                .with_writer(io::stderr)
                .with_filter(filter_fn(|meta| enabled(meta, true))),
        )
        .init();
}

/// Migrates the database and serves the GraphQL API until a shutdown
/// signal arrives.
async fn run() -> Result<(), ()> {
    let Args { config } = Args::parse().map_err(|e| {
        log::error!("failed to parse command line arguments: {e}");
    })?;

    let Config {
        postgres,
        server,
        log,
    } = Config::new(config).map_err(|e| {
        log::error!("failed to load `Config`: {e}");
    })?;

    LOG_LEVEL
        .set(log.level.into())
        .unwrap_or_else(|_| unreachable!("first initialization"));

    let mut postgres = Postgres::new(&postgres.into()).map_err(|e| {
        log::error!("failed to initialize `Postgres` client: {e}");
    })?;

    let report = migrations::runner()
        .run_async(&mut postgres)
        .await
        .map_err(|e| {
            log::error!("failed to run database migrations: {e}");
        })?;
    for m in report.applied_migrations() {
        log::info!("applied migration `{m}`");
    }

    let app = router(Service::new(postgres), &server)?;

    let listener = TcpListener::bind((server.host.clone(), server.port))
        .await
        .map_err(|e| {
            log::error!(
                "failed to listen on `{}:{}`: {e}",
                server.host,
                server.port,
            );
        })?;

    log::info!("listening on `{}:{}`", server.host, server.port);

    // In-flight purchases are let to commit or roll back before exiting.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| log::error!("webserver failed: {e}"))?;

    log::info!("shut down");
    Ok(())
}

/// Builds the [`Router`] serving the GraphQL API over the provided
/// [`Service`].
fn router(
    service: Service<Postgres>,
    server: &config::Server,
) -> Result<Router, ()> {
    let schema =
        api::Schema::new(api::Query, api::Mutation, EmptySubscription::new());

    let mut cors = CorsLayer::new()
        .allow_methods([
            http::Method::GET,
            http::Method::OPTIONS,
            http::Method::POST,
        ])
        .allow_headers([
            http::header::CONTENT_TYPE,
            http::HeaderName::from_static(USER_ID_HEADER),
        ]);
    for origin in &server.cors.origins {
        cors = cors.allow_origin(
            origin.parse::<http::header::HeaderValue>().map_err(|e| {
                log::error!("`{origin}` is not correct CORS origin: {e}");
            })?,
        );
    }

    Ok(Router::new()
        .route(
            "/graphql",
            on(MethodFilter::GET.or(MethodFilter::POST), graphql),
        )
        .layer(Extension(Arc::new(schema)))
        .layer(Extension(service))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|r: &http::Request<_>| {
                    log::info_span!(
                        "HTTP request",
                        http.client_ip = InsecureClientIp::from(
                            r.headers(),
                            r.extensions()
                        )
                            .map(|ip| ip.0.to_string())
                            .ok(),
                        http.flavor = ?r.version(),
                        http.method = r.method().as_str(),
                        http.route = r
                            .extensions()
                            .get::<MatchedPath>()
                            .map(MatchedPath::as_str),
                        http.user_id = r
                            .headers()
                            .get(USER_ID_HEADER)
                            .and_then(|h| h.to_str().ok()),
                        http.user_agent = r
                            .headers()
                            .get("User-Agent")
                            .and_then(|h| h.to_str().ok()),
                        http.status_code = log::field::Empty,
                    )
                })
                .on_response(
                    |r: &http::Response<_>,
                     dur: time::Duration,
                     span: &log::Span| {
                        _ = span.record(
                            "http.status_code",
                            log::field::display(r.status().as_u16()),
                        );

                        let duration = format!("{}ms", dur.as_millis());
                        if r.status().is_server_error() {
                            log::error!(duration = %duration);
                        } else if r.status().is_client_error() {
                            // Sold out and repeated purchases are expected.
                            log::warn!(duration = %duration);
                        } else {
                            log::info!(duration = %duration);
                        }
                    },
                ),
        ))
}

/// Resolves once `Ctrl+C` or `SIGTERM` is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("failed to listen for `Ctrl+C`: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => _ = s.recv().await,
            Err(e) => {
                log::error!("failed to listen for `SIGTERM`: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => log::info!("received `Ctrl+C`, shutting down"),
        () = terminate => log::info!("received `SIGTERM`, shutting down"),
    }
}
