// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The HTTP surface.
//!
//! Middleware order on the API routes: request tracking (outermost) →
//! authentication → tenant resolution → handler. The system endpoints
//! (`/health`, `/ready`, `/metrics`) sit outside the auth chain so probes
//! and scrapers need no credentials.

pub mod error;
pub mod middleware;

mod jobs;
mod nodes;
mod results;
mod system;
mod tenants;

use crate::state::AppState;
use axum::middleware as axum_middleware;
use axum::routing::{get, post};
use axum::Router;
use recode_core::clock::Clock;
use tower_http::trace::TraceLayer;

pub fn router<C: Clock>(state: AppState<C>) -> Router {
    let api = Router::new()
        .route("/nodes/register", post(nodes::register))
        .route("/nodes", get(nodes::list))
        .route("/nodes/:id", axum::routing::delete(nodes::deregister))
        .route("/nodes/:id/heartbeat", post(nodes::heartbeat))
        .route("/jobs", post(jobs::submit).get(jobs::list))
        .route("/jobs/next", get(jobs::next))
        .route("/jobs/:id", get(jobs::get_job).delete(jobs::cancel))
        .route("/jobs/:id/heartbeat", post(jobs::heartbeat))
        .route("/results", post(results::submit))
        .route("/tenants", post(tenants::create).get(tenants::list))
        .route(
            "/tenants/:id",
            get(tenants::get_tenant).put(tenants::update).delete(tenants::remove),
        )
        .route("/tenants/:id/stats", get(tenants::stats))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::resolve_tenant::<C>,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::authenticate::<C>,
        ));

    Router::new()
        .route("/health", get(system::health))
        .route("/ready", get(system::ready))
        .route("/metrics", get(system::metrics))
        .merge(api)
        // route_layer so the matched route pattern is available as the
        // endpoint label; requests that match no route are not counted.
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::track_requests::<C>,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
