//! HTTP front-end for the mediachain workflow engine.

pub mod error;
pub mod routes;
pub mod state;

use rocket::data::{Limits, ToByteUnit};
use rocket::{Build, Rocket};

pub use error::{ApiError, ApiResult};
pub use state::AppState;

/// Assembles the server around an already built engine.
pub fn build_rocket(state: AppState) -> Rocket<Build> {
    let limits = Limits::default()
        .limit("file", 8.gibibytes())
        .limit("data-form", 8.gibibytes())
        .limit("json", 1.mebibytes());
    let figment = rocket::Config::figment().merge(("limits", limits));

    rocket::custom(figment)
        .manage(state)
        .mount("/", routes::generate_workflow_routes())
        .mount("/", routes::generate_upload_routes())
        .mount("/", routes::generate_system_routes())
        .register("/", routes::generate_catchers())
}
