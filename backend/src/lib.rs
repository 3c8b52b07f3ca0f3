pub mod processor;
pub mod routes;
pub mod store;
pub mod memory;
pub mod postgres;
pub mod config;
pub mod cors;
pub mod error;
pub mod utils;
pub mod catchers;
pub use shared::{models::*, identity::*, ErrorCode, ErrorResponse, VoteError};

use std::sync::Arc;
use rocket::{catchers, routes, Build, Rocket};
use crate::{
    catchers::{bad_request, forbidden, internal_error, not_found, unauthorized, unprocessable},
    config::Config,
    cors::CORS,
    processor::VoteProcessor,
    routes::*,
    store::VoteStore,
};

/// Assembles the server over any store; `main` passes Postgres, tests pass memory.
pub fn build_rocket(config: &Config, store: Arc<dyn VoteStore>) -> Rocket<Build> {
    let processor = VoteProcessor::new(store, config.allow_anonymous_share);

    rocket::build()
        .attach(CORS::new(config.cors_origin_prefix.clone(), &config.identity_header))
        .manage(AppState::new(processor))
        .manage(IdentityHeader(config.identity_header.clone()))
        .mount(
            "/api",
            routes![
                create_vote,
                browse_votes,
                get_vote,
                edit_vote,
                delete_vote,
                publish_vote,
                close_vote,
                set_permission,
                participate,
                participate_by_share,
                get_vote_by_share_token,
                get_results,
                all_options
            ],
        )
        .register(
            "/",
            catchers![
                bad_request,
                unauthorized,
                forbidden,
                not_found,
                unprocessable,
                internal_error
            ],
        )
}
