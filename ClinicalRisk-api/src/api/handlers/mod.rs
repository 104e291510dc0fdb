pub mod health;
pub mod predictions;

// Re-export handlers for easier imports
pub use health::health_check;
pub use predictions::{
    generate_prediction, get_prediction, list_patient_predictions, list_predictions, review_prediction,
    update_prediction,
};
