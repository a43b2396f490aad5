//! Volunteer Avenue - backend for a volunteering platform
//!
//! Volunteer posts and applications are kept in a document store; mutations
//! and "mine" listings sit behind a cookie-borne session token.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
