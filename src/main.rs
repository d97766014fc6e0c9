use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cafeteria_api::{
    clock::BogotaClock,
    config::Config,
    db,
    middleware::auth::JwtSecret,
    models::catalog::CatalogKind,
    routes,
    routes::catalog::catalog_routes,
    services::day_close,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let config = Arc::new(config);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    let state = AppState {
        db: pool.clone(),
        config: config.clone(),
        clock: Arc::new(BogotaClock),
    };

    day_close::start(pool, state.clock.clone(), config.day_close_time.clone());

    // CORS: the configured base origin, plus localhost for development.
    let base_url = config.app_base_url.clone();
    let cors_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        let o = match origin.to_str() {
            Ok(s) => s,
            Err(_) => return false,
        };
        o.starts_with("http://localhost") || o.starts_with("http://127.0.0.1") || o == base_url
    });

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_origin(cors_origin);

    let jwt_secret = JwtSecret(config.jwt_secret.clone());

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        // Menus
        .route("/menus", get(routes::menus::list).post(routes::menus::create))
        .route("/menus/by-date/{date}", get(routes::menus::find_by_date))
        .route(
            "/menus/{id}",
            get(routes::menus::get)
                .patch(routes::menus::update)
                .delete(routes::menus::delete),
        )
        .route("/menus/{id}/clone", post(routes::menus::clone_menu))
        .route("/menus/{id}/status", patch(routes::menus::update_status))
        // Reservations
        .route(
            "/reservations",
            get(routes::reservations::list).post(routes::reservations::create),
        )
        .route("/reservations/by-cc/{cc}", get(routes::reservations::find_by_cc))
        .route(
            "/reservations/by-menu/{menu_id}",
            get(routes::reservations::find_by_menu),
        )
        .route(
            "/reservations/summary/{date}",
            get(routes::reservations::summary_by_date),
        )
        .route(
            "/reservations/bulk-served/{date}",
            patch(routes::reservations::bulk_mark_served),
        )
        .route(
            "/reservations/bulk-cancelled/{date}",
            patch(routes::reservations::bulk_mark_cancelled),
        )
        .route(
            "/reservations/{id}",
            patch(routes::reservations::update).delete(routes::reservations::delete),
        )
        .route("/reservations/{id}/cancel", patch(routes::reservations::cancel))
        // Whitelist
        .route(
            "/whitelist",
            get(routes::whitelist::list).post(routes::whitelist::create),
        )
        .route("/whitelist/login", post(routes::whitelist::login))
        .route("/whitelist/bulk", post(routes::whitelist::bulk_import))
        .route(
            "/whitelist/{id}",
            get(routes::whitelist::get)
                .patch(routes::whitelist::update)
                .delete(routes::whitelist::delete),
        )
        .route(
            "/whitelist/{id}/toggle",
            patch(routes::whitelist::toggle_enabled),
        )
        // Reference catalogs
        .nest("/proteins", catalog_routes(CatalogKind::Protein))
        .nest("/side-dishes", catalog_routes(CatalogKind::SideDish))
        .nest("/soups", catalog_routes(CatalogKind::Soup))
        .nest("/drinks", catalog_routes(CatalogKind::Drink))
        .layer(axum::Extension(jwt_secret))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Body size limit of 10 MB (covers whitelist spreadsheet uploads)
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("cafeteria API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
