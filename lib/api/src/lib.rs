//! # countrysim API
//!
//! actix-web REST surface of the similarity service.
//!
//! | route                               | purpose                              |
//! |-------------------------------------|--------------------------------------|
//! | `GET /health`                       | liveness                             |
//! | `/api/countries[/{code}]`           | list, dropdown, stats, CRUD          |
//! | `POST /api/similarity/search`       | similar countries by reference/text  |
//! | `/api/admin/*`                      | import, embedding refresh, index info |
//!
//! Success bodies are `{"success": true, "data": ...}`; failures are
//! `{"success": false, "error": ..., "message": ...}` with the status chosen
//! by [`ApiError`].

pub mod error;
pub mod rest;

pub use error::ApiError;
pub use rest::{AppState, RestApi, MAX_JSON_PAYLOAD};
