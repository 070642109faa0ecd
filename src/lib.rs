#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod model;

pub use config::Config;

/// Assemble the server: configuration, the poll engine, request logging,
/// and the API routes.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .attach(config::ConfigFairing)
        .attach(config::EngineFairing)
        .attach(logging::LoggerFairing)
        .mount("/", api::routes())
        .register("/", api::catchers())
}

/// Assemble a server around an existing engine, so tests can inspect the
/// engine directly while driving it over HTTP.
#[cfg(test)]
pub(crate) fn rocket_for_engine(engine: engine::PollEngine) -> Rocket<Build> {
    rocket::build()
        .attach(config::ConfigFairing)
        .attach(logging::LoggerFairing)
        .manage(engine)
        .mount("/", api::routes())
        .register("/", api::catchers())
}
