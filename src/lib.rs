pub mod coerce;
pub mod config;
pub mod json;
pub mod table;
