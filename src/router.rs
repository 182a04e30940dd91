use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, get_service, post, put},
};
use axum_login::{
    AuthManagerLayerBuilder,
    tower_sessions::{
        Expiry, SessionManagerLayer,
        cookie::{SameSite, time},
    },
};
use minijinja::Environment;
use sea_orm::DatabaseConnection;
use tokio::{signal, task::AbortHandle};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::{
    auth::{
        router::{self as auth_router, index},
        user::Backend,
    },
    config::Config,
    mail::MailClient,
    menus::image::MAX_IMAGE_BYTES,
    orders::live::LiveOrderHub,
    routes::{api, contact, dashboard, feedback, floor, live, menus, orders, reports, staff},
    util::{asset_loader::AssetLoader, format},
};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub templates: Arc<Environment<'static>>,
    pub mail: MailClient,
    pub live: LiveOrderHub,
    pub config: Arc<Config>,
}

/// Room for one image plus the other item fields.
const ITEM_FORM_LIMIT: usize = MAX_IMAGE_BYTES + 64 * 1024;

pub fn create_router(db: DatabaseConnection, config: Config, session_store: PostgresStore) -> Router {
    let db = Arc::new(db);
    let state = AppState {
        db: db.clone(),
        templates: Arc::new(setup_templates()),
        mail: MailClient::new(config.mail.clone()),
        live: LiveOrderHub::new(),
        config: Arc::new(config),
    };
    if !state.mail.is_enabled() {
        tracing::warn!("mail settings incomplete, outbound email disabled");
    }

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(state.config.secure_cookies)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::days(1)));

    // Auth service.
    //
    // This combines the session layer with our backend to establish the auth
    // service which will provide the auth session as a request extension.
    let backend = Backend::new(db);
    let auth_layer = AuthManagerLayerBuilder::new(backend, session_layer).build();

    Router::new()
        .route("/", get(index))
        .nest("/restaurants/{restaurant_id}", restaurant_routes())
        .nest("/api/restaurants/{restaurant_id}", api_routes())
        .merge(auth_router::router())
        .with_state(state)
        .nest_service("/static", get_service(ServeDir::new("static")))
        .layer(auth_layer)
        .layer(TraceLayer::new_for_http())
}

fn restaurant_routes() -> Router<AppState> {
    let item_uploads = Router::new()
        .route(
            "/menus/{menu_id}/categories/{category_id}/items",
            post(menus::add_item),
        )
        .route("/menus/{menu_id}/items/{item_id}", post(menus::update_item))
        .layer(DefaultBodyLimit::max(ITEM_FORM_LIMIT));

    Router::new()
        .route("/dashboard", get(dashboard::dashboard))
        .route("/menus", get(menus::menus_page).post(menus::create_menu))
        .route("/menus/{menu_id}/enable", post(menus::enable_menu))
        .route("/menus/{menu_id}/delete", post(menus::delete_menu))
        .route("/menus/{menu_id}/categories", post(menus::add_category))
        .route(
            "/menus/{menu_id}/categories/{category_id}",
            post(menus::rename_category),
        )
        .route(
            "/menus/{menu_id}/categories/{category_id}/delete",
            post(menus::delete_category),
        )
        .route("/menus/{menu_id}/items/{item_id}/delete", post(menus::delete_item))
        .merge(item_uploads)
        .route("/floor", get(floor::floor_page))
        .route("/floor/tables", post(floor::create_table))
        .route("/floor/tables/{table_id}", post(floor::update_table))
        .route("/floor/tables/{table_id}/toggle", post(floor::toggle_table))
        .route("/floor/tables/{table_id}/delete", post(floor::delete_table))
        .route("/floor/tables/{table_id}/qr.svg", get(floor::table_qr_svg))
        .route("/floor/tables/{table_id}/qr.png", get(floor::table_qr_png))
        .route("/floor/tables/{table_id}/print", get(floor::table_print))
        .route("/orders", get(orders::orders_page))
        .route("/orders/list", get(orders::orders_fragment))
        .route("/orders/{order_id}/status", post(orders::set_status))
        .route("/reports", get(reports::reports_index))
        .route("/reports/sales", get(reports::sales_report))
        .route("/reports/turnover", get(reports::turnover_report))
        .route("/staff", get(staff::staff_page).post(staff::add_staff))
        .route("/staff/{staff_id}/assign", post(staff::assign_table))
        .route("/staff/{staff_id}/delete", post(staff::delete_staff))
        .route("/feedbacks", get(feedback::feedbacks_page))
        .route("/promotions", get(feedback::promotions_page))
        .route("/contact", get(contact::contact_page).post(contact::send_contact))
        .route("/live", get(live::live_socket))
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(api::api_orders).post(api::api_create_order))
        .route("/reports/sales", get(api::api_sales))
        .route("/reports/turnover", get(api::api_turnover))
        .route("/tables/{table_id}/position", put(api::api_move_table))
}

fn setup_templates() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_loader(minijinja::path_loader("templates"));
    AssetLoader::new("static").register(&mut env);
    format::register(&mut env);
    env
}

pub async fn shutdown_signal(deletion_task_abort_handle: AbortHandle) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutting down");
    deletion_task_abort_handle.abort();
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// State for calling handlers directly; mail is off and templates are empty.
    pub(crate) fn app_state(db: DatabaseConnection) -> AppState {
        AppState {
            db: Arc::new(db),
            templates: Arc::new(Environment::new()),
            mail: MailClient::new(None),
            live: LiveOrderHub::new(),
            config: Arc::new(Config {
                database_url: String::new(),
                rust_log: "info".into(),
                bind_addr: "127.0.0.1:0".into(),
                app_base_url: "http://localhost:3000".into(),
                public_menu_base_url: "http://localhost:3001".into(),
                secure_cookies: false,
                mail: None,
            }),
        }
    }
}
