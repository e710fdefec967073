//! Lead Scoring API Library
//!
//! This library provides the core functionality for the lead-management API:
//! lead and user storage, the Groq-backed lead scoring pipeline, dashboard
//! analytics and the HTTP handlers.
//!
//! # Modules
//!
//! - `api`: HTTP-facing components.
//! - `core`: Core business logic.
//! - `integrations`: External service integrations.
//! - `analytics`: Chart series and kanban grouping derived from leads.
//! - `config`: Configuration management.
//! - `db`: Database connection and pool management.
//! - `db_storage`: Storage traits and their Postgres implementation.
//! - `errors`: Error handling types.
//! - `groq_client`: Groq chat-completions client.
//! - `handlers`: HTTP request handlers.
//! - `lead_analysis`: Prompt building and response parsing for lead scoring.
//! - `memory_storage`: In-memory storage implementation.
//! - `models`: Core data models.
//! - `routes`: Router assembly.
//! - `services`: Lead and user services.

pub mod api;
pub mod core;
pub mod integrations;

pub mod analytics;
pub mod config;
pub mod db;
pub mod db_storage;
pub mod errors;
pub mod groq_client;
pub mod handlers;
pub mod lead_analysis;
pub mod memory_storage;
pub mod models;
pub mod routes;
pub mod services;
