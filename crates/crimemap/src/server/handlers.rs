//! Request handlers for the dashboard routes.

use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use tracing::{debug, error};

use super::{render_page, Dashboard};
use crate::error::Error;
use crate::figure;
use crate::views;

/// Query parameters carried by every chart request.
#[derive(Debug, Default, Deserialize)]
pub struct SelectionQuery {
    /// Selected category.
    pub category: Option<String>,
    /// Selected month, `YYYY-MM`.
    pub month: Option<String>,
}

fn error_response(err: &Error) -> HttpResponse {
    if err.is_client_error() {
        HttpResponse::BadRequest().body(err.to_string())
    } else {
        error!(error = %err, "Request failed");
        HttpResponse::InternalServerError().body(err.to_string())
    }
}

/// The dashboard page.
pub async fn index(dashboard: web::Data<Dashboard>) -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(render_page(&dashboard.title))
}

/// Liveness probe.
pub async fn health() -> impl Responder {
    HttpResponse::Ok().body("ok")
}

/// Dropdown contents and the initial selection.
pub async fn options(dashboard: web::Data<Dashboard>) -> impl Responder {
    HttpResponse::Ok().json(dashboard.snapshot.options())
}

/// Choropleth of incident counts per ZIP for one category and month.
pub async fn map(
    dashboard: web::Data<Dashboard>,
    query: web::Query<SelectionQuery>,
) -> impl Responder {
    match dashboard.selection(query.category.as_deref(), query.month.as_deref()) {
        Err(e) => error_response(&e),
        Ok(selection) => {
            debug!(category = %selection.category, month = %selection.month, "Map view");
            let counts = views::map_view(&dashboard.snapshot, &selection.category, selection.month);
            HttpResponse::Ok().json(figure::choropleth(
                &counts,
                dashboard.snapshot.geojson(),
                &dashboard.map,
            ))
        }
    }
}

/// Monthly counts for one category.
pub async fn monthly(
    dashboard: web::Data<Dashboard>,
    query: web::Query<SelectionQuery>,
) -> impl Responder {
    match dashboard.selection(query.category.as_deref(), None) {
        Err(e) => error_response(&e),
        Ok(selection) => {
            let trend = views::monthly_trend(&dashboard.snapshot, &selection.category);
            HttpResponse::Ok().json(figure::monthly_line(&selection.category, &trend))
        }
    }
}

/// Hour-of-day counts for one category.
pub async fn hourly(
    dashboard: web::Data<Dashboard>,
    query: web::Query<SelectionQuery>,
) -> impl Responder {
    match dashboard.selection(query.category.as_deref(), None) {
        Err(e) => error_response(&e),
        Ok(selection) => {
            let trend = views::hourly_trend(&dashboard.snapshot, &selection.category);
            HttpResponse::Ok().json(figure::hourly_line(&selection.category, &trend))
        }
    }
}
