//! # open2do
//!
//! Local task manager with an optional AI assistant.
//!
//! This library provides:
//! - A JSON-backed task store where every task owns a private folder
//! - A user profile store with avatar images
//! - An AI scheduler that delegates to an external CLI assistant and falls
//!   back to deterministic rules when it is unavailable
//! - An HTTP API over all of the above
//!
//! ## Architecture
//!
//! ```text
//!        ┌──────────────────────────────────┐
//!        │            HTTP API              │
//!        └───────┬───────────────┬──────────┘
//!                │               │
//!                ▼               ▼
//!        ┌──────────────┐  ┌───────────────┐     ┌───────────────┐
//!        │ TaskStore /  │  │  AiScheduler  │ ──► │ `<cmd> -p ..` │
//!        │ ProfileStore │  │  + fallbacks  │     │  (assistant)  │
//!        └──────┬───────┘  └───────────────┘     └───────────────┘
//!               ▼
//!         {data_dir}/*.json, task_folders/, avatars/
//! ```
//!
//! ## Modules
//! - `task`: Task model, enums and partial updates
//! - `store`: Task and profile persistence
//! - `scheduler`: Assistant runner, prompts and fallback policies
//! - `config`: Environment configuration
//! - `api`: HTTP routes

pub mod api;
pub mod config;
pub mod scheduler;
pub mod store;
pub mod task;

pub use config::Config;
