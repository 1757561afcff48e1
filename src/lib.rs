//! Purchase planning against the Skyblock auction house.
//!
//! A user keeps a list of items to buy. Prices can be estimated from a
//! downloaded snapshot of the auction feed: the soonest-ending bid
//! auctions and the cheapest buy-it-now listings.

pub mod config;
pub mod error;
pub mod estimate;
pub mod fetch;
pub mod history;
pub mod loader;
pub mod model;
pub mod planner;
pub mod shell;
pub mod store;

pub use error::{PlannerError, PlannerResult};
