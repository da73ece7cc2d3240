pub mod client;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod progression;
pub mod roadmaps;
pub mod routes;
pub mod state;
pub mod store;
pub mod sync;

#[cfg(test)]
pub(crate) mod fixtures;
