//! photonav: a photo-metadata catalog with an HTTP API.
//!
//! The store keeps photo records (path, capture date, location, camera
//! model, geolocation) and a normalized tag association in SQLite; the
//! server exposes filtered listing, tag mutation, tag deletion, tracked
//! cloud-sync stubs and an optional processing hook.

pub mod config;
pub mod db;
pub mod logging;
pub mod processing;
pub mod server;
pub mod sync;
