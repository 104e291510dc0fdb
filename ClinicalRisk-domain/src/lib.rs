// ClinicalRisk Domain
// This crate contains the risk prediction pipeline and its business rules

// Services that implement business logic
pub mod services;

// Authentication and authorization
pub mod auth;

// Environment-driven configuration
pub mod config;

// Domain entities
pub mod entities;

// Health checks and system status
pub mod health;

// Re-export the database module from the data crate for convenience
pub use clinical_risk_data::database;

// Testing utilities - only available with mock feature
#[cfg(feature = "mock")]
pub mod testing;
