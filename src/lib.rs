pub mod app;
pub mod auth;
pub mod capsules;
pub mod config;
pub mod dates;
pub mod db;
pub mod error;
pub mod extract;
pub mod friends;
pub mod profile;
pub mod state;
pub mod storage;
pub mod uploads;
