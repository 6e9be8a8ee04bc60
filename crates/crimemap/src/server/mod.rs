//! Dashboard web server.
//!
//! Serves the dashboard page and the JSON endpoints it calls whenever a
//! dropdown changes. The snapshot is shared read-only across workers.

pub mod handlers;
mod page;

use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use tracing::info;

use crate::config::{Config, MapConfig};
use crate::error::Result;
use crate::incident::MonthYear;
use crate::snapshot::Snapshot;
use crate::views::Selection;

pub use page::render_page;

/// Everything a request handler can read.
#[derive(Debug)]
pub struct Dashboard {
    snapshot: Snapshot,
    map: MapConfig,
    title: String,
}

impl Dashboard {
    /// Wrap a loaded snapshot with its presentation settings.
    #[must_use]
    pub fn new(snapshot: Snapshot, config: &Config) -> Self {
        Self {
            snapshot,
            map: config.map.clone(),
            title: config.dashboard.title.clone(),
        }
    }

    /// The dataset being served.
    #[must_use]
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Resolve request parameters into a selection, filling gaps with the
    /// initial selection.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidMonth`] if `month` is not `YYYY-MM`.
    pub fn selection(&self, category: Option<&str>, month: Option<&str>) -> Result<Selection> {
        let initial = Selection::initial(self.snapshot.options());
        let category = category
            .filter(|c| !c.is_empty())
            .map_or(initial.category, str::to_string);
        let month = match month.filter(|m| !m.is_empty()) {
            Some(m) => m.parse::<MonthYear>()?,
            None => initial.month,
        };
        Ok(Selection { category, month })
    }
}

/// Register the dashboard routes.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::index))
        .route("/health", web::get().to(handlers::health))
        .service(
            web::scope("/api")
                .route("/options", web::get().to(handlers::options))
                .route("/map", web::get().to(handlers::map))
                .route("/trend/monthly", web::get().to(handlers::monthly))
                .route("/trend/hourly", web::get().to(handlers::hourly)),
        );
}

/// Serve the dashboard until the process is stopped.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve(config: &Config, snapshot: Snapshot) -> Result<()> {
    let addr = config.bind_addr();
    let dashboard = web::Data::new(Dashboard::new(snapshot, config));

    info!("Dashboard listening on http://{addr}");
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::new("%r %s %Ts"))
            .app_data(dashboard.clone())
            .configure(routes)
    })
    .bind(addr)?
    .run()
    .await?;

    info!("Dashboard stopped");
    Ok(())
}
