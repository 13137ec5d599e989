//! Application startup and lifecycle management.

use axum::{
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::PayrollConfig;
use crate::error::AppError;
use crate::handlers;
use crate::services::{
    Database, DocumentRenderer, InvoiceWorkflow, Mailer, MockMailer, PayrollStore, SmtpMailer,
};

/// Shared application state. The store and mailer are trait objects so the
/// workflow is testable without Postgres or an SMTP relay.
#[derive(Clone)]
pub struct AppState {
    pub config: PayrollConfig,
    pub store: Arc<dyn PayrollStore>,
    pub workflow: Arc<InvoiceWorkflow>,
}

impl AppState {
    pub fn new(
        config: PayrollConfig,
        store: Arc<dyn PayrollStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let workflow = Arc::new(InvoiceWorkflow::new(
            store.clone(),
            DocumentRenderer::new(),
            mailer,
        ));
        Self {
            config,
            store,
            workflow,
        }
    }
}

/// Build the HTTP router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route("/metrics", get(handlers::health::metrics_endpoint))
        .route("/api/employees", get(handlers::employees::list_employees))
        .route("/api/dashboard", get(handlers::dashboard::dashboard_stats))
        .route(
            "/api/salaries",
            get(handlers::salaries::list_salaries).post(handlers::salaries::save_salary),
        )
        .route(
            "/api/salaries/:id",
            delete(handlers::salaries::delete_salary),
        )
        .route(
            "/api/salaries/:id/pay",
            post(handlers::salaries::mark_salary_paid),
        )
        .route(
            "/api/invoices",
            get(handlers::invoices::list_invoices).post(handlers::invoices::generate_invoice),
        )
        .route("/api/invoices/:id", get(handlers::invoices::get_invoice))
        .route(
            "/api/invoices/:id/document",
            get(handlers::invoices::download_invoice),
        )
        .route(
            "/api/invoices/:id/send",
            post(handlers::invoices::send_invoice),
        )
        .route(
            "/api/invoices/:id/pay",
            post(handlers::invoices::mark_invoice_paid),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration: connect to the
    /// database, run migrations, and pick the mailer.
    pub async fn build(config: PayrollConfig) -> Result<Self, AppError> {
        let db = Database::new(&config.database).await.map_err(|e| {
            tracing::error!("Failed to connect to PostgreSQL: {}", e);
            e
        })?;

        db.run_migrations().await.map_err(|e| {
            tracing::error!("Failed to run migrations: {}", e);
            e
        })?;

        let mailer: Arc<dyn Mailer> = if config.smtp.enabled {
            match SmtpMailer::new(config.smtp.clone()) {
                Ok(mailer) => {
                    tracing::info!("SMTP mailer initialized");
                    Arc::new(mailer)
                }
                Err(e) => {
                    tracing::warn!("Failed to initialize SMTP mailer: {}. Using mock.", e);
                    Arc::new(MockMailer::new())
                }
            }
        } else {
            tracing::info!("SMTP disabled, using mock mailer");
            Arc::new(MockMailer::new())
        };

        let state = AppState::new(config.clone(), Arc::new(db), mailer);

        // Port 0 binds a random port for testing.
        let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("payroll-service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);
        axum::serve(self.listener, router).await
    }
}
