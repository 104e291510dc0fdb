use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;

use crate::database::DatabasePool;
use crate::models::format_timestamp;
use crate::models::health_metric::{CreateHealthMetricRequest, HealthMetricRecord, MetricValues};
use crate::models::patient::{CreatePatientRequest, PatientRecord};
use crate::models::prediction::{
    patient_display_name, NewPredictionRecord, PredictionChanges, PredictionFilter, PredictionRecord,
    PredictionSummaryRecord,
};
use super::errors::RepositoryError;

const PATIENT_COLUMNS: &str =
    "id, first_name, last_name, date_of_birth, gender, created_at";

const METRIC_COLUMNS: &str =
    "id, patient_id, metric_type, systolic_pressure, diastolic_pressure, blood_sugar_fasting,
     blood_sugar_random, hba1c, total_cholesterol, hdl_cholesterol, ldl_cholesterol, triglycerides,
     bmi, weight_kg, height_cm, temperature_celsius, heart_rate, oxygen_saturation, alt_enzyme,
     ast_enzyme, creatinine, egfr, notes, recorded_by, created_at";

const PREDICTION_COLUMNS: &str =
    "id, patient_id, prediction_type, risk_level, risk_percentage, confidence_score, factors,
     explanation, recommendations, is_alert, is_reviewed, reviewed_by, created_at, updated_at";

/// Prediction columns qualified for joins, followed by the patient's names
const PREDICTION_SUMMARY_COLUMNS: &str =
    "p.id, p.patient_id, p.prediction_type, p.risk_level, p.risk_percentage, p.confidence_score,
     p.factors, p.explanation, p.recommendations, p.is_alert, p.is_reviewed, p.reviewed_by,
     p.created_at, p.updated_at, pt.first_name, pt.last_name";

/// Escape LIKE wildcards so the search text matches literally
fn like_pattern(text: &str) -> String {
    let escaped = text
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn patient_from_row(row: &Row<'_>) -> rusqlite::Result<PatientRecord> {
    Ok(PatientRecord {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        date_of_birth: row.get(3)?,
        gender: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn metric_from_row(row: &Row<'_>) -> rusqlite::Result<HealthMetricRecord> {
    Ok(HealthMetricRecord {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        metric_type: row.get(2)?,
        values: MetricValues {
            systolic_pressure: row.get(3)?,
            diastolic_pressure: row.get(4)?,
            blood_sugar_fasting: row.get(5)?,
            blood_sugar_random: row.get(6)?,
            hba1c: row.get(7)?,
            total_cholesterol: row.get(8)?,
            hdl_cholesterol: row.get(9)?,
            ldl_cholesterol: row.get(10)?,
            triglycerides: row.get(11)?,
            bmi: row.get(12)?,
            weight_kg: row.get(13)?,
            height_cm: row.get(14)?,
            temperature_celsius: row.get(15)?,
            heart_rate: row.get(16)?,
            oxygen_saturation: row.get(17)?,
            alt_enzyme: row.get(18)?,
            ast_enzyme: row.get(19)?,
            creatinine: row.get(20)?,
            egfr: row.get(21)?,
        },
        notes: row.get(22)?,
        recorded_by: row.get(23)?,
        created_at: row.get(24)?,
    })
}

/// Decode a JSON string-array column
fn string_list(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn prediction_from_row(row: &Row<'_>) -> rusqlite::Result<PredictionRecord> {
    Ok(PredictionRecord {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        prediction_type: row.get(2)?,
        risk_level: row.get(3)?,
        risk_percentage: row.get(4)?,
        confidence_score: row.get(5)?,
        factors: string_list(row, 6)?,
        explanation: row.get(7)?,
        recommendations: string_list(row, 8)?,
        is_alert: row.get(9)?,
        is_reviewed: row.get(10)?,
        reviewed_by: row.get(11)?,
        created_at: row.get(12)?,
        updated_at: row.get(13)?,
    })
}

/// Database storage operations for patients, metrics and predictions
pub struct DatabaseStorage;

impl DatabaseStorage {
    /// Store a patient in the database
    pub async fn insert_patient(pool: &DatabasePool, request: CreatePatientRequest) -> Result<PatientRecord, RepositoryError> {
        debug!("Storing patient in database");

        let conn = pool.get()?;
        let created_at = format_timestamp(&Utc::now());

        conn.execute(
            "INSERT INTO patients (first_name, last_name, date_of_birth, gender, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                &request.first_name,
                &request.last_name,
                &request.date_of_birth,
                &request.gender,
                &created_at,
            ],
        )?;

        Ok(PatientRecord {
            id: conn.last_insert_rowid(),
            first_name: request.first_name,
            last_name: request.last_name,
            date_of_birth: request.date_of_birth,
            gender: request.gender,
            created_at,
        })
    }

    /// Get a patient by ID from the database
    pub async fn get_patient(pool: &DatabasePool, id: i64) -> Result<Option<PatientRecord>, RepositoryError> {
        debug!("Getting patient by ID from database: id={}", id);

        let conn = pool.get()?;
        let sql = format!("SELECT {} FROM patients WHERE id = ?1", PATIENT_COLUMNS);

        let patient = conn.query_row(&sql, [id], patient_from_row).optional()?;
        Ok(patient)
    }

    /// Store a health metric sample in the database
    pub async fn insert_metric(pool: &DatabasePool, request: CreateHealthMetricRequest) -> Result<HealthMetricRecord, RepositoryError> {
        debug!("Storing {} metric for patient {}", request.metric_type, request.patient_id);

        let conn = pool.get()?;
        let created_at = request.created_at.unwrap_or_else(|| format_timestamp(&Utc::now()));
        let v = &request.values;

        conn.execute(
            "INSERT INTO health_metrics
             (patient_id, metric_type, systolic_pressure, diastolic_pressure, blood_sugar_fasting,
              blood_sugar_random, hba1c, total_cholesterol, hdl_cholesterol, ldl_cholesterol,
              triglycerides, bmi, weight_kg, height_cm, temperature_celsius, heart_rate,
              oxygen_saturation, alt_enzyme, ast_enzyme, creatinine, egfr, notes, recorded_by, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
                     ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24)",
            params![
                request.patient_id,
                &request.metric_type,
                v.systolic_pressure,
                v.diastolic_pressure,
                v.blood_sugar_fasting,
                v.blood_sugar_random,
                v.hba1c,
                v.total_cholesterol,
                v.hdl_cholesterol,
                v.ldl_cholesterol,
                v.triglycerides,
                v.bmi,
                v.weight_kg,
                v.height_cm,
                v.temperature_celsius,
                v.heart_rate,
                v.oxygen_saturation,
                v.alt_enzyme,
                v.ast_enzyme,
                v.creatinine,
                v.egfr,
                &request.notes,
                request.recorded_by,
                &created_at,
            ],
        )?;

        Ok(HealthMetricRecord {
            id: conn.last_insert_rowid(),
            patient_id: request.patient_id,
            metric_type: request.metric_type,
            values: request.values,
            notes: request.notes,
            recorded_by: request.recorded_by,
            created_at,
        })
    }

    /// Samples for a patient taken at or after `since`, newest first
    pub async fn recent_metrics(
        pool: &DatabasePool,
        patient_id: i64,
        since: &str,
        limit: usize,
    ) -> Result<Vec<HealthMetricRecord>, RepositoryError> {
        debug!("Getting metrics for patient {} since {} (limit {})", patient_id, since, limit);

        let conn = pool.get()?;
        let sql = format!(
            "SELECT {} FROM health_metrics
             WHERE patient_id = ?1 AND created_at >= ?2
             ORDER BY created_at DESC, id DESC
             LIMIT ?3",
            METRIC_COLUMNS
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![patient_id, since, limit as i64], metric_from_row)?;

        let mut result = Vec::new();
        for metric in rows {
            result.push(metric?);
        }

        Ok(result)
    }

    /// Store a new prediction in the database
    pub async fn insert_prediction(
        pool: &DatabasePool,
        prediction: NewPredictionRecord,
        now: DateTime<Utc>,
    ) -> Result<PredictionRecord, RepositoryError> {
        debug!("Storing prediction for patient {}", prediction.patient_id);

        let conn = pool.get()?;
        let stamp = format_timestamp(&now);

        conn.execute(
            "INSERT INTO ai_predictions
             (patient_id, prediction_type, risk_level, risk_percentage, confidence_score, factors,
              explanation, recommendations, is_alert, is_reviewed, reviewed_by, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, NULL, ?10, ?10)",
            params![
                prediction.patient_id,
                &prediction.prediction_type,
                &prediction.risk_level,
                prediction.risk_percentage,
                prediction.confidence_score,
                serde_json::to_string(&prediction.factors)?,
                &prediction.explanation,
                serde_json::to_string(&prediction.recommendations)?,
                prediction.is_alert,
                &stamp,
            ],
        )?;

        Ok(PredictionRecord {
            id: conn.last_insert_rowid(),
            patient_id: prediction.patient_id,
            prediction_type: prediction.prediction_type,
            risk_level: prediction.risk_level,
            risk_percentage: prediction.risk_percentage,
            confidence_score: prediction.confidence_score,
            factors: prediction.factors,
            explanation: prediction.explanation,
            recommendations: prediction.recommendations,
            is_alert: prediction.is_alert,
            is_reviewed: false,
            reviewed_by: None,
            created_at: stamp.clone(),
            updated_at: stamp,
        })
    }

    /// All predictions for a patient, newest first
    pub async fn predictions_for_patient(pool: &DatabasePool, patient_id: i64) -> Result<Vec<PredictionRecord>, RepositoryError> {
        debug!("Getting predictions for patient {}", patient_id);

        let conn = pool.get()?;
        let sql = format!(
            "SELECT {} FROM ai_predictions WHERE patient_id = ?1 ORDER BY created_at DESC, id DESC",
            PREDICTION_COLUMNS
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([patient_id], prediction_from_row)?;

        let mut result = Vec::new();
        for prediction in rows {
            result.push(prediction?);
        }

        Ok(result)
    }

    /// Predictions across all patients matching `filter`, most recently updated first
    pub async fn list_predictions(
        pool: &DatabasePool,
        filter: PredictionFilter,
    ) -> Result<Vec<PredictionSummaryRecord>, RepositoryError> {
        debug!("Listing predictions with filter {:?}", filter);

        let conn = pool.get()?;
        let sql = format!(
            "SELECT {} FROM ai_predictions p
             JOIN patients pt ON pt.id = p.patient_id
             WHERE (?1 IS NULL OR p.risk_level = ?1)
               AND (?2 IS NULL OR p.prediction_type = ?2)
               AND (?3 IS NULL
                    OR pt.first_name LIKE ?3 ESCAPE '\\'
                    OR pt.last_name LIKE ?3 ESCAPE '\\'
                    OR p.prediction_type LIKE ?3 ESCAPE '\\')
             ORDER BY p.updated_at DESC, p.id DESC",
            PREDICTION_SUMMARY_COLUMNS
        );

        let search = filter.search.as_deref().map(like_pattern);

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![filter.risk_level, filter.prediction_type, search],
            |row| {
                let prediction = prediction_from_row(row)?;
                let first_name: String = row.get(14)?;
                let last_name: String = row.get(15)?;
                Ok(PredictionSummaryRecord {
                    prediction,
                    patient_name: patient_display_name(&first_name, &last_name),
                })
            },
        )?;

        let mut result = Vec::new();
        for summary in rows {
            result.push(summary?);
        }

        Ok(result)
    }

    /// Get a prediction by ID from the database
    pub async fn get_prediction(pool: &DatabasePool, id: i64) -> Result<Option<PredictionRecord>, RepositoryError> {
        debug!("Getting prediction by ID from database: id={}", id);

        let conn = pool.get()?;
        let sql = format!("SELECT {} FROM ai_predictions WHERE id = ?1", PREDICTION_COLUMNS);

        let prediction = conn.query_row(&sql, [id], prediction_from_row).optional()?;
        Ok(prediction)
    }

    /// Read-merge-write a prediction inside one transaction
    pub async fn update_prediction(
        pool: &DatabasePool,
        id: i64,
        changes: PredictionChanges,
        now: DateTime<Utc>,
    ) -> Result<Option<PredictionRecord>, RepositoryError> {
        debug!("Updating prediction in database: id={}", id);

        let mut conn = pool.get()?;
        let tx = conn.transaction()?;

        let sql = format!("SELECT {} FROM ai_predictions WHERE id = ?1", PREDICTION_COLUMNS);
        let mut record = match tx.query_row(&sql, [id], prediction_from_row).optional()? {
            Some(record) => record,
            None => return Ok(None),
        };

        if !changes.permits(&record) {
            return Err(RepositoryError::Conflict(format!("prediction {} is already reviewed", id)));
        }

        changes.apply_to(&mut record, now);

        tx.execute(
            "UPDATE ai_predictions SET
                prediction_type = ?1, risk_level = ?2, risk_percentage = ?3, confidence_score = ?4,
                factors = ?5, explanation = ?6, recommendations = ?7, is_alert = ?8,
                is_reviewed = ?9, reviewed_by = ?10, updated_at = ?11
             WHERE id = ?12",
            params![
                &record.prediction_type,
                &record.risk_level,
                record.risk_percentage,
                record.confidence_score,
                serde_json::to_string(&record.factors)?,
                &record.explanation,
                serde_json::to_string(&record.recommendations)?,
                record.is_alert,
                record.is_reviewed,
                record.reviewed_by,
                &record.updated_at,
                record.id,
            ],
        )?;

        tx.commit()?;
        Ok(Some(record))
    }
}
