pub mod config;
pub mod tags;
