//! API Module
//!
//! HTTP handlers and routing for the cache administration REST API.
//!
//! # Endpoints
//! - `PUT /set` - Store a value with optional TTL and tags
//! - `GET /get/:key` - Retrieve a value by key
//! - `DELETE /del/:key` - Delete a key
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint
//! - `POST /invalidate/tags` - Remove entries carrying any of the tags
//! - `POST /invalidate/pattern` - Remove keys matching a regular expression
//! - `POST /warmup` - Write a batch of entries
//! - `POST /clear` - Remove everything and reset statistics

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
