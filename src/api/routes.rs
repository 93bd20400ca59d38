use axum::{routing::get, Router};

use crate::api::handlers::{self, AppState};
use crate::logic::Resource;
use crate::model::{MarketService, MarketUser, Organization, ServiceProvider};
use crate::store::traits::Store;

pub const API_BASE_PATH: &str = "/api/v0";

/// Collection and item routes shared by every resource.
fn resource_routes<S: Store + 'static, E: Resource>(router: Router<AppState<S>>) -> Router<AppState<S>> {
    let collection = format!("{}/{}", API_BASE_PATH, E::COLLECTION);
    let item = format!("{}/:id", collection);

    router
        .route(
            &collection,
            get(handlers::list_resources::<S, E>).post(handlers::create_resource::<S, E>),
        )
        .route(
            &item,
            get(handlers::get_resource::<S, E>)
                .put(handlers::replace_resource::<S, E>)
                .patch(handlers::patch_resource::<S, E>)
                .delete(handlers::delete_resource::<S, E>),
        )
}

pub fn create_router<S: Store + 'static>() -> Router<AppState<S>> {
    let router = Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .route(
            &format!("{}/users/whoami", API_BASE_PATH),
            get(handlers::whoami::<S>),
        );

    let router = resource_routes::<S, Organization>(router);
    let router = resource_routes::<S, ServiceProvider>(router);
    let router = resource_routes::<S, MarketService>(router);
    let router = resource_routes::<S, MarketUser>(router);

    router.fallback(handlers::no_handler)
}
