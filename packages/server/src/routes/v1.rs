use utoipa_axum::{router::OpenApiRouter, routes};

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/vms", vm_routes())
        .nest("/payouts", payout_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::register))
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::me))
}

fn vm_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::virtual_machine::list_vms,
            handlers::virtual_machine::create_vm
        ))
        .routes(routes!(
            handlers::virtual_machine::get_vm,
            handlers::virtual_machine::update_vm,
            handlers::virtual_machine::delete_vm
        ))
        .routes(routes!(handlers::virtual_machine::record_metrics))
}

fn payout_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::payout::list_payouts,
            handlers::payout::create_payout
        ))
        .routes(routes!(
            handlers::payout::get_payout,
            handlers::payout::delete_payout
        ))
        .routes(routes!(handlers::payout::update_payout_status))
}
