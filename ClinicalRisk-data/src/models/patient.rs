use serde::{Deserialize, Serialize};

/// Storage model for a patient's demographic record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientRecord {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    /// Calendar date, `YYYY-MM-DD`
    pub date_of_birth: String,
    pub gender: String,
    pub created_at: String,
}

/// Input data for registering a patient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePatientRequest {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub gender: String,
}
