use rocket::{serde::json::Json, Catcher, Request, Route};

use crate::error::Error;
use crate::model::api::ServiceInfo;

pub(crate) mod poll;

pub fn routes() -> Vec<Route> {
    let mut routes = routes![index];
    routes.extend(poll::routes());
    routes
}

/// Turn Rocket's own failures (unknown routes, unparsable query strings or
/// bodies) into the same JSON error bodies the handlers produce.
pub fn catchers() -> Vec<Catcher> {
    catchers![bad_request, not_found, unprocessable]
}

#[catch(400)]
fn bad_request(req: &Request<'_>) -> Error {
    Error::BadRequest(format!("malformed request to {}", req.uri()))
}

#[catch(404)]
fn not_found(req: &Request<'_>) -> Error {
    Error::NotFound(format!("no route for {} {}", req.method(), req.uri()))
}

#[catch(422)]
fn unprocessable(req: &Request<'_>) -> Error {
    Error::BadRequest(format!(
        "missing or malformed parameter or body in {} {}",
        req.method(),
        req.uri()
    ))
}

#[get("/")]
fn index() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
