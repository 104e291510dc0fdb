// ClinicalRisk-api lib.rs
//
// HTTP surface for the risk prediction pipeline: routes, handlers,
// public request/response bodies and the OpenAPI document.

// Public modules
pub mod api;
pub mod entities;
pub mod openapi;

pub use api::{create_app, create_application};
