//! Thin client for the Google Photos Library API.
//!
//! Covers only what the sync loop needs: token refresh, album lookup and
//! creation, paginated media item enumeration, and raw byte download.

pub mod auth;
pub mod client;
pub mod error;
pub mod types;

pub use client::GPhotosClient;
pub use error::GPhotosError;
pub use types::{Album, MediaItem};
