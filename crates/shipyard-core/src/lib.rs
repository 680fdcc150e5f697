pub mod command;
pub mod config;
pub mod error;
pub mod io;
pub mod paths;
pub mod project;
pub mod types;

pub use error::{Result, ShipyardError};
