pub mod backend;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod items;
pub mod models;
pub mod poll;
pub mod routes;
pub mod session;
pub mod state;
pub mod validation;
