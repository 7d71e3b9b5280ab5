//! HTTP route handlers.
//!
//! Handlers stay thin: extract the request, run the entry guards
//! (rate limit, field validation, ownership lookups), delegate to a
//! service, and wrap the result in JSON. Anything long-running lives in
//! `services`.

/// BYOK key management endpoints
pub mod byok;
/// Character-pack generation endpoint
pub mod characters;
/// Credit balance endpoint
pub mod credits;
/// Single-image generation and status endpoints
pub mod generations;
/// Service health endpoint
pub mod health;
/// UGC prompt-builder endpoint
pub mod prompt;
