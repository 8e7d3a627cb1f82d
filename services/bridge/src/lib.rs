pub mod adapters;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod sensors;
pub mod web;
