pub mod alerter;
pub mod balance;
pub mod commands;
pub mod config;
pub mod engine;
pub mod models;
pub mod probe;
pub mod scheduler;
pub mod service;
pub mod status_client;
pub mod telegram;
