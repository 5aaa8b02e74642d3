//! `/api` (bearer token) and `/api/public` (anonymous, read-only) route tables.
//! Resource routes are registered per catalog entry with the kind attached as an extension.

use crate::extractors::require_caller;
use crate::handlers::{auth, identity, reports, resource};
use crate::resource::{Catalog, ResourceKind};
use crate::state::AppState;
use axum::{
    middleware::from_fn_with_state,
    routing::{get, patch, post, MethodRouter},
    Extension, Router,
};

fn for_kind(methods: MethodRouter<AppState>, kind: ResourceKind) -> MethodRouter<AppState> {
    methods.layer(Extension(kind))
}

fn resource_routes(catalog: &Catalog) -> Router<AppState> {
    let mut router = Router::new();
    for def in catalog.iter() {
        let (collection, member) = match def.kind {
            ResourceKind::Identity => (
                get(identity::index)
                    .post(identity::store)
                    .put(identity::update)
                    .patch(identity::update),
                get(resource::show)
                    .put(identity::update)
                    .patch(identity::update)
                    .delete(resource::destroy),
            ),
            ResourceKind::ItemCategory => (
                get(resource::list).post(resource::store),
                get(resource::show_item_category)
                    .put(resource::update)
                    .patch(resource::update)
                    .delete(resource::destroy),
            ),
            _ => (
                get(resource::list).post(resource::store),
                get(resource::show)
                    .put(resource::update)
                    .patch(resource::update)
                    .delete(resource::destroy),
            ),
        };
        router = router
            .route(&format!("/{}", def.path_segment), for_kind(collection, def.kind))
            .route(&format!("/{}/:id", def.path_segment), for_kind(member, def.kind));
    }
    router
}

/// Routes behind `require_caller`, plus the public `/register` and `/login`.
pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected = resource_routes(&state.catalog)
        .route("/kategori-barang-options", get(reports::item_category_options))
        .route("/kategori-barang-statistics", get(reports::item_category_statistics))
        .route("/inventaris/kategori/list", get(reports::inventory_categories))
        .route("/konten/:id/publish", patch(resource::publish_content))
        .route("/konten/:id/unpublish", patch(resource::unpublish_content))
        .route("/agenda/calendar/:year", get(reports::calendar))
        .route("/agenda/calendar/:year/:month", get(reports::calendar))
        .route("/transaksi/kategori/list", get(reports::finance_categories))
        .route("/keuangan/rekapitulasi", get(reports::recap))
        .route("/dashboard/summary", get(reports::dashboard))
        .route("/logout", post(auth::logout))
        .route("/user", get(auth::user))
        .route_layer(from_fn_with_state(state, require_caller));

    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(protected)
}

/// Anonymous read-only surface. Content is limited to published rows by the read policy.
pub fn public_routes(catalog: &Catalog) -> Router<AppState> {
    let mut router = Router::new().route("/identitas", get(identity::index));
    for def in catalog.iter().filter(|d| d.public_read && d.kind != ResourceKind::Identity) {
        router = router.route(
            &format!("/{}", def.path_segment),
            for_kind(get(resource::list), def.kind),
        );
    }
    if let Some(content) = catalog.get(ResourceKind::Content) {
        router = router.route(
            &format!("/{}/:id", content.path_segment),
            for_kind(get(resource::show), content.kind),
        );
    }
    router
        .route("/agenda/calendar/:year", get(reports::calendar))
        .route("/agenda/calendar/:year/:month", get(reports::calendar))
        .route("/keuangan/rekapitulasi", get(reports::recap))
}
