/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Authentication endpoints (register, login, refresh, Google sign-in)
/// - `clients`: Client management and per-client analytics
/// - `tasks`: Task CRUD, status rollups, and dependency edges
/// - `planner`: Daily planner slot assignment
/// - `settings`: Per-user settings and availability windows
/// - `dashboard`: Aggregated analytics
/// - `events`: Server-sent change feed
/// - `users`: Admin-only account listing

pub mod health;
pub mod auth;
pub mod clients;
pub mod tasks;
pub mod planner;
pub mod settings;
pub mod dashboard;
pub mod events;
pub mod users;
