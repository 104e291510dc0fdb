// Public entities for the ClinicalRisk API
// This module contains data structures that are shared across the application boundary

// Error responses
pub mod common;

// Prediction request and response bodies
pub mod prediction;
