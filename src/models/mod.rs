//! Data models representing database entities and API request/response types.
//!
//! This module contains all data structures that map to database tables,
//! plus the JSON shapes exchanged with clients.

/// Generated character model and the character-pack request/response types
pub mod character;
/// Credit balance model
pub mod credits;
/// Single-image generation job model
pub mod generation;
/// UGC prompt-builder request/response types
pub mod prompt;
/// BYOK provider key types
pub mod user_api_key;
