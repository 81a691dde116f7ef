//! HTTP API for open2do.
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Health check
//! - `GET /api/tasks?category=&status=` - List tasks
//! - `POST /api/tasks` - Create a task
//! - `GET|PUT|DELETE /api/tasks/:id` - Read, update or delete a task
//! - `GET /api/tasks/search/:query` - Search titles and descriptions
//! - `POST /api/tasks/reorder` - Rewrite the stored task order
//! - `POST /api/tasks/:id/execute` - Execute unless permission is needed
//! - `POST /api/tasks/:id/execute/confirm` - Execute after approval
//! - `GET /api/categories` - List categories
//! - `GET /api/statistics` - Aggregate counts
//! - `POST /api/schedule` - Suggest times for pending tasks
//! - `GET|PUT /api/user-profile` - Read or update the profile
//! - `GET /api/user-profile/avatar/:filename` - Serve an avatar image

mod profile;
mod routes;
mod tasks;
pub mod types;

pub use routes::{app, serve, AppState};
pub use types::*;
