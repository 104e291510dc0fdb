use rusqlite::Connection;
use tracing::info;

use crate::database::DatabaseError;

/// Run SQLite migrations
pub fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    info!("Running SQLite migrations");

    create_patients_table(conn)?;
    create_health_metrics_table(conn)?;
    create_ai_predictions_table(conn)?;
    create_indexes(conn)?;

    info!("SQLite migrations completed successfully");
    Ok(())
}

fn migration_error(table: &str, e: rusqlite::Error) -> DatabaseError {
    DatabaseError::MigrationError(format!("Failed to create {}: {}", table, e))
}

/// Create the patients table
fn create_patients_table(conn: &Connection) -> Result<(), DatabaseError> {
    info!("Creating patients table if not exists");

    conn.execute(
        "CREATE TABLE IF NOT EXISTS patients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            date_of_birth TEXT NOT NULL,
            gender TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    ).map_err(|e| migration_error("patients", e))?;

    Ok(())
}

/// Create the health metrics table
fn create_health_metrics_table(conn: &Connection) -> Result<(), DatabaseError> {
    info!("Creating health_metrics table if not exists");

    conn.execute(
        "CREATE TABLE IF NOT EXISTS health_metrics (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            patient_id INTEGER NOT NULL REFERENCES patients (id),
            metric_type TEXT NOT NULL,
            systolic_pressure REAL,
            diastolic_pressure REAL,
            blood_sugar_fasting REAL,
            blood_sugar_random REAL,
            hba1c REAL,
            total_cholesterol REAL,
            hdl_cholesterol REAL,
            ldl_cholesterol REAL,
            triglycerides REAL,
            bmi REAL,
            weight_kg REAL,
            height_cm REAL,
            temperature_celsius REAL,
            heart_rate INTEGER,
            oxygen_saturation REAL,
            alt_enzyme REAL,
            ast_enzyme REAL,
            creatinine REAL,
            egfr REAL,
            notes TEXT,
            recorded_by INTEGER,
            created_at TEXT NOT NULL
        )",
        [],
    ).map_err(|e| migration_error("health_metrics", e))?;

    Ok(())
}

/// Create the AI predictions table
fn create_ai_predictions_table(conn: &Connection) -> Result<(), DatabaseError> {
    info!("Creating ai_predictions table if not exists");

    conn.execute(
        "CREATE TABLE IF NOT EXISTS ai_predictions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            patient_id INTEGER NOT NULL REFERENCES patients (id),
            prediction_type TEXT NOT NULL,
            risk_level TEXT NOT NULL CHECK (risk_level IN ('low', 'moderate', 'high')),
            risk_percentage REAL NOT NULL CHECK (risk_percentage BETWEEN 0 AND 100),
            confidence_score REAL NOT NULL CHECK (confidence_score BETWEEN 0 AND 1),
            factors TEXT NOT NULL DEFAULT '[]',
            explanation TEXT NOT NULL DEFAULT '',
            recommendations TEXT NOT NULL DEFAULT '[]',
            is_alert INTEGER NOT NULL DEFAULT 0,
            is_reviewed INTEGER NOT NULL DEFAULT 0,
            reviewed_by INTEGER,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    ).map_err(|e| migration_error("ai_predictions", e))?;

    Ok(())
}

/// Create indexes for the newest-first lookups by patient
fn create_indexes(conn: &Connection) -> Result<(), DatabaseError> {
    info!("Creating patient/time indexes");

    conn.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_health_metrics_patient_created
            ON health_metrics (patient_id, created_at DESC);
         CREATE INDEX IF NOT EXISTS idx_ai_predictions_patient_created
            ON ai_predictions (patient_id, created_at DESC);",
    ).map_err(|e| DatabaseError::MigrationError(format!("Failed to create index: {}", e)))?;

    Ok(())
}
