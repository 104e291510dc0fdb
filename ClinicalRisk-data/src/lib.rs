// ClinicalRisk Data
// This crate handles persistence for patients, health metrics and risk predictions

// Database connection management
pub mod database;

// Repository implementations for data access
pub mod repository;

// Data storage models
pub mod models;
