use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::engine::PollEngine;
use crate::model::poll::PollBounds;

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "defaults::max_options")]
    max_options: usize,
    #[serde(default = "defaults::max_vote_limit")]
    max_vote_limit: u64,
    #[serde(default = "defaults::max_name_length")]
    max_name_length: usize,
}

impl Config {
    /// Maximum number of options per poll.
    pub fn max_options(&self) -> usize {
        self.max_options
    }

    /// Maximum vote limit a poll can be created with.
    pub fn max_vote_limit(&self) -> u64 {
        self.max_vote_limit
    }

    /// Maximum length of a poll name or option label, in characters.
    pub fn max_name_length(&self) -> usize {
        self.max_name_length
    }

    /// The limits new polls are validated against.
    pub fn poll_bounds(&self) -> PollBounds {
        PollBounds {
            max_options: self.max_options,
            max_vote_limit: self.max_vote_limit,
            max_name_length: self.max_name_length,
        }
    }
}

mod defaults {
    use crate::model::poll::PollBounds;

    pub fn max_options() -> usize {
        PollBounds::default().max_options
    }

    pub fn max_vote_limit() -> u64 {
        PollBounds::default().max_vote_limit
    }

    pub fn max_name_length() -> usize {
        PollBounds::default().max_name_length
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the engine fairing and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// A fairing that creates the poll engine from the loaded config and places
/// it into managed state. Must be attached after [`ConfigFairing`].
pub struct EngineFairing;

#[rocket::async_trait]
impl Fairing for EngineFairing {
    fn info(&self) -> Info {
        Info {
            name: "Poll engine",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let bounds = match rocket.state::<Config>() {
            Some(config) => config.poll_bounds(),
            None => {
                error!("Application config must be loaded before the poll engine");
                return Err(rocket);
            }
        };
        info!(
            "Starting poll engine (max {} options, max limit {}, max name length {})",
            bounds.max_options, bounds.max_vote_limit, bounds.max_name_length
        );

        rocket = rocket.manage(PollEngine::new(bounds));
        Ok(rocket)
    }
}
