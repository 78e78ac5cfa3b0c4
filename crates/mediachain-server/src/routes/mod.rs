use rocket::{catchers, routes, Catcher, Route};

pub mod system;
pub mod uploads;
pub mod workflows;

pub fn generate_workflow_routes() -> Vec<Route> {
    routes![
        workflows::run_workflow,
        workflows::get_workflow,
        workflows::list_workflows,
        workflows::refresh_workflow,
    ]
}

pub fn generate_upload_routes() -> Vec<Route> {
    routes![uploads::upload]
}

pub fn generate_system_routes() -> Vec<Route> {
    routes![system::list_blueprints, system::health]
}

pub fn generate_catchers() -> Vec<Catcher> {
    catchers![system::not_found, system::unprocessable, system::default_catcher]
}
