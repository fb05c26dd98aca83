//! # Shopfront Server
//!
//! The HTTP API over the Shopfront services, plus the wiring that picks
//! storage and cache backends from the environment.
//!
//! ## Layout
//!
//! - [`config`]: [`Config::from_env`] with nested sections
//! - [`state`]: [`AppState`], [`Repositories`] and [`bootstrap`]
//! - [`auth`]: bearer-token and role extractors
//! - [`api`]: handlers under `/api/v1`
//! - [`routes`]: [`build_router`]
//!
//! ## Example
//!
//! ```no_run
//! use shopfront_server::{Config, bootstrap, build_router};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::from_env();
//! let app = build_router(bootstrap(&config).await?);
//! let listener = tokio::net::TcpListener::bind(config.server.address()).await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod auth;
pub mod config;
pub mod health;
pub mod routes;
pub mod state;

pub use config::Config;
pub use routes::build_router;
pub use state::{AppState, Repositories, bootstrap};
