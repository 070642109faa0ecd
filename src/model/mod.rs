pub mod api;
pub mod errors;
pub mod ledger;
pub mod poll;
pub mod results;
pub mod tally;
