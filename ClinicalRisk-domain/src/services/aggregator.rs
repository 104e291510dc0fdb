use std::fmt::Display;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use tracing::{debug, instrument, warn};

use clinical_risk_data::repository::{HealthMetricRepositoryTrait, PatientRepositoryTrait};

use crate::config::{AggregationConfig, SymptomTrigger};
use crate::entities::conversions;
use crate::entities::{HealthMetric, MetricCategory, Patient, PatientFeatureRecord, RecentMetricSample};
use crate::services::errors::PredictionError;

/// Builds the per-request feature snapshot fed to the risk model
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeatureAggregator: Send + Sync {
    /// Fails with `NotFound` when the patient does not exist
    async fn build_feature_record(&self, patient_id: i64) -> Result<PatientFeatureRecord, PredictionError>;
}

/// Aggregates demographics and recent metric history into a `PatientFeatureRecord`
pub struct MetricAggregator {
    patients: Arc<dyn PatientRepositoryTrait>,
    metrics: Arc<dyn HealthMetricRepositoryTrait>,
    config: AggregationConfig,
}

impl MetricAggregator {
    pub fn new(
        patients: Arc<dyn PatientRepositoryTrait>,
        metrics: Arc<dyn HealthMetricRepositoryTrait>,
        config: AggregationConfig,
    ) -> Self {
        Self { patients, metrics, config }
    }

    /// Aggregate as of `now`
    pub async fn build_feature_record_at(
        &self,
        patient_id: i64,
        now: DateTime<Utc>,
    ) -> Result<PatientFeatureRecord, PredictionError> {
        let patient = self
            .patients
            .get_by_id(patient_id)
            .await?
            .map(conversions::convert_to_domain_patient)
            .ok_or_else(|| PredictionError::NotFound(format!("Patient {}", patient_id)))?;

        let since = now - Duration::days(self.config.window_days);
        let metrics = self
            .metrics
            .get_recent_for_patient(patient_id, since, self.config.sample_limit)
            .await?
            .into_iter()
            .map(conversions::convert_to_domain_metric)
            .collect::<Result<Vec<_>, _>>()
            .map_err(PredictionError::Storage)?;

        debug!("Aggregating {} metric samples for patient {}", metrics.len(), patient_id);

        Ok(build_from(&patient, &metrics, now.date_naive(), &self.config))
    }
}

#[async_trait]
impl FeatureAggregator for MetricAggregator {
    #[instrument(skip(self))]
    async fn build_feature_record(&self, patient_id: i64) -> Result<PatientFeatureRecord, PredictionError> {
        self.build_feature_record_at(patient_id, Utc::now()).await
    }
}

/// Build a feature record from already-loaded, newest-first metric samples
pub fn build_from(
    patient: &Patient,
    metrics: &[HealthMetric],
    today: NaiveDate,
    config: &AggregationConfig,
) -> PatientFeatureRecord {
    let mut record = PatientFeatureRecord {
        age: calculate_age(&patient.date_of_birth, today),
        gender: patient.gender.clone(),
        ..Default::default()
    };

    let mut seen: Vec<&MetricCategory> = Vec::new();
    for metric in metrics {
        if matches!(metric.category, MetricCategory::Other(_)) || seen.contains(&&metric.category) {
            continue;
        }
        seen.push(&metric.category);

        let v = &metric.values;
        match metric.category {
            MetricCategory::BloodPressure => {
                record.blood_pressure_systolic = v.systolic_pressure;
                record.blood_pressure_diastolic = v.diastolic_pressure;
            }
            MetricCategory::BloodSugar => {
                record.blood_sugar_fasting = v.blood_sugar_fasting;
                record.blood_sugar_random = v.blood_sugar_random;
                record.hba1c = v.hba1c;
            }
            MetricCategory::Cholesterol => {
                record.total_cholesterol = v.total_cholesterol;
                record.hdl_cholesterol = v.hdl_cholesterol;
                record.ldl_cholesterol = v.ldl_cholesterol;
                record.triglycerides = v.triglycerides;
            }
            MetricCategory::Anthropometric => {
                record.bmi = v.bmi;
                record.weight_kg = v.weight_kg;
                record.height_cm = v.height_cm;
            }
            MetricCategory::VitalSigns => {
                record.temperature_celsius = v.temperature_celsius;
                record.heart_rate = v.heart_rate;
                record.oxygen_saturation = v.oxygen_saturation;
            }
            MetricCategory::LiverFunction => {
                record.alt_enzyme = v.alt_enzyme;
                record.ast_enzyme = v.ast_enzyme;
            }
            MetricCategory::KidneyFunction => {
                record.creatinine = v.creatinine;
                record.egfr = v.egfr;
            }
            MetricCategory::Other(_) => {}
        }
    }

    record.recent_metrics = metrics
        .iter()
        .take(config.recent_sample_count)
        .map(|m| RecentMetricSample {
            metric_type: m.category.as_tag().to_string(),
            value: format_metric_value(m),
            date: m.recorded_at.format("%Y-%m-%d").to_string(),
        })
        .collect();

    record.symptoms = extract_symptoms(metrics, &config.symptom_triggers);
    record
}

/// Whole years between `birth_date` and `today`.
///
/// Accepts `YYYY-MM-DD` or RFC 3339. Unparsable dates yield 0 with a warning;
/// birth dates in the future are clamped to 0.
pub fn calculate_age(birth_date: &str, today: NaiveDate) -> u32 {
    let raw = birth_date.trim();
    let parsed = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()));

    let Some(birth) = parsed else {
        warn!("Unparsable birth date '{}', using age 0", raw);
        return 0;
    };

    let mut years = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }

    if years < 0 {
        warn!("Birth date {} is in the future, using age 0", birth);
        return 0;
    }
    years as u32
}

fn show<T: Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "N/A".to_string())
}

/// Human-readable value summary for a raw sample
pub fn format_metric_value(metric: &HealthMetric) -> String {
    let v = &metric.values;
    match metric.category {
        MetricCategory::BloodPressure => {
            format!("{}/{} mmHg", show(v.systolic_pressure), show(v.diastolic_pressure))
        }
        MetricCategory::BloodSugar => {
            format!("{} mg/dL", show(v.blood_sugar_fasting.or(v.blood_sugar_random)))
        }
        MetricCategory::Cholesterol => {
            format!("Total: {}, HDL: {}", show(v.total_cholesterol), show(v.hdl_cholesterol))
        }
        MetricCategory::VitalSigns => {
            format!("Temp: {}°C, HR: {} bpm", show(v.temperature_celsius), show(v.heart_rate))
        }
        MetricCategory::LiverFunction => {
            format!("ALT: {}, AST: {}", show(v.alt_enzyme), show(v.ast_enzyme))
        }
        MetricCategory::KidneyFunction => {
            format!("Creatinine: {}, eGFR: {}", show(v.creatinine), show(v.egfr))
        }
        MetricCategory::Anthropometric => {
            format!("Weight: {}kg, BMI: {}", show(v.weight_kg), show(v.bmi))
        }
        MetricCategory::Other(_) => "N/A".to_string(),
    }
}

/// Symptom tags whose keywords appear in any note, first occurrence order
pub fn extract_symptoms(metrics: &[HealthMetric], triggers: &[SymptomTrigger]) -> Vec<String> {
    let mut symptoms: Vec<String> = Vec::new();

    for notes in metrics.iter().filter_map(|m| m.notes.as_deref()) {
        let notes = notes.to_lowercase();
        for trigger in triggers {
            if symptoms.contains(&trigger.tag) {
                continue;
            }
            if trigger.keywords.iter().any(|k| notes.contains(k.as_str())) {
                symptoms.push(trigger.tag.clone());
            }
        }
    }

    symptoms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::MetricValues;
    use clinical_risk_data::models::health_metric::CreateHealthMetricRequest;
    use clinical_risk_data::models::patient::CreatePatientRequest;
    use clinical_risk_data::repository::{HealthMetricRepository, PatientRepository, StorageBackend};

    fn date(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").unwrap()
    }

    fn metric(id: i64, category: MetricCategory, values: MetricValues, days_ago: i64, notes: Option<&str>) -> HealthMetric {
        HealthMetric {
            id,
            patient_id: 1,
            category,
            values,
            notes: notes.map(str::to_string),
            recorded_at: Utc::now() - Duration::days(days_ago),
        }
    }

    fn patient() -> Patient {
        Patient {
            id: 1,
            first_name: "Ada".to_string(),
            last_name: "Okafor".to_string(),
            date_of_birth: "1970-03-02".to_string(),
            gender: "female".to_string(),
        }
    }

    #[test]
    fn test_age_month_day_boundary() {
        assert_eq!(calculate_age("2000-06-15", date("2024-06-14")), 23);
        assert_eq!(calculate_age("2000-06-15", date("2024-06-15")), 24);
        assert_eq!(calculate_age("2000-06-15", date("2024-06-16")), 24);
    }

    #[test]
    fn test_age_fails_soft() {
        assert_eq!(calculate_age("not a date", date("2024-06-15")), 0);
        assert_eq!(calculate_age("2030-01-01", date("2024-06-15")), 0);
        assert_eq!(calculate_age("2000-06-15T08:00:00Z", date("2024-06-15")), 24);
    }

    #[test]
    fn test_latest_sample_per_category_wins() {
        let metrics = vec![
            metric(3, MetricCategory::BloodPressure,
                MetricValues { systolic_pressure: Some(142.0), diastolic_pressure: Some(91.0), ..Default::default() }, 1, None),
            metric(2, MetricCategory::BloodSugar,
                MetricValues { hba1c: Some(7.2), blood_sugar_fasting: Some(130.0), ..Default::default() }, 2, None),
            metric(1, MetricCategory::BloodPressure,
                MetricValues { systolic_pressure: Some(118.0), diastolic_pressure: Some(76.0), ..Default::default() }, 5, None),
        ];

        let record = build_from(&patient(), &metrics, date("2024-06-15"), &AggregationConfig::default());

        assert_eq!(record.blood_pressure_systolic, Some(142.0));
        assert_eq!(record.blood_pressure_diastolic, Some(91.0));
        assert_eq!(record.hba1c, Some(7.2));
        assert_eq!(record.bmi, None);
        assert_eq!(record.age, 54);
        assert_eq!(record.recent_metrics.len(), 3);
        assert_eq!(record.recent_metrics[0].value, "142/91 mmHg");
        assert_eq!(record.recent_metrics[1].value, "130 mg/dL");
    }

    /// Values for one category only, offset by `shift` so two samples never agree
    fn category_values(category: &MetricCategory, shift: f64) -> MetricValues {
        match category {
            MetricCategory::BloodPressure => MetricValues {
                systolic_pressure: Some(120.0 + shift),
                diastolic_pressure: Some(80.0 + shift),
                ..Default::default()
            },
            MetricCategory::BloodSugar => MetricValues {
                blood_sugar_fasting: Some(95.0 + shift),
                blood_sugar_random: Some(140.0 + shift),
                hba1c: Some(5.5 + shift),
                ..Default::default()
            },
            MetricCategory::Cholesterol => MetricValues {
                total_cholesterol: Some(190.0 + shift),
                hdl_cholesterol: Some(45.0 + shift),
                ldl_cholesterol: Some(110.0 + shift),
                triglycerides: Some(150.0 + shift),
                ..Default::default()
            },
            MetricCategory::Anthropometric => MetricValues {
                bmi: Some(27.0 + shift),
                weight_kg: Some(82.0 + shift),
                height_cm: Some(174.0 + shift),
                ..Default::default()
            },
            MetricCategory::VitalSigns => MetricValues {
                temperature_celsius: Some(36.6 + shift),
                heart_rate: Some(70 + shift as i64),
                oxygen_saturation: Some(97.0 + shift),
                ..Default::default()
            },
            MetricCategory::LiverFunction => MetricValues {
                alt_enzyme: Some(30.0 + shift),
                ast_enzyme: Some(28.0 + shift),
                ..Default::default()
            },
            MetricCategory::KidneyFunction => MetricValues {
                creatinine: Some(1.0 + shift),
                egfr: Some(90.0 + shift),
                ..Default::default()
            },
            MetricCategory::Other(_) => MetricValues::default(),
        }
    }

    #[test]
    fn test_every_category_takes_its_newest_sample() {
        let categories = [
            MetricCategory::BloodPressure,
            MetricCategory::BloodSugar,
            MetricCategory::Cholesterol,
            MetricCategory::Anthropometric,
            MetricCategory::VitalSigns,
            MetricCategory::LiverFunction,
            MetricCategory::KidneyFunction,
        ];

        // Newest first, the way the repository returns them
        let mut metrics = Vec::new();
        for (i, category) in categories.iter().enumerate() {
            metrics.push(metric(100 + i as i64, category.clone(), category_values(category, 0.0), 1 + i as i64, None));
        }
        for (i, category) in categories.iter().enumerate() {
            metrics.push(metric(i as i64 + 1, category.clone(), category_values(category, 100.0), 20 + i as i64, None));
        }

        let record = build_from(&patient(), &metrics, date("2024-06-15"), &AggregationConfig::default());

        assert_eq!(record.blood_pressure_systolic, Some(120.0));
        assert_eq!(record.blood_pressure_diastolic, Some(80.0));
        assert_eq!(record.blood_sugar_fasting, Some(95.0));
        assert_eq!(record.blood_sugar_random, Some(140.0));
        assert_eq!(record.hba1c, Some(5.5));
        assert_eq!(record.total_cholesterol, Some(190.0));
        assert_eq!(record.hdl_cholesterol, Some(45.0));
        assert_eq!(record.ldl_cholesterol, Some(110.0));
        assert_eq!(record.triglycerides, Some(150.0));
        assert_eq!(record.bmi, Some(27.0));
        assert_eq!(record.weight_kg, Some(82.0));
        assert_eq!(record.height_cm, Some(174.0));
        assert_eq!(record.temperature_celsius, Some(36.6));
        assert_eq!(record.heart_rate, Some(70));
        assert_eq!(record.oxygen_saturation, Some(97.0));
        assert_eq!(record.alt_enzyme, Some(30.0));
        assert_eq!(record.ast_enzyme, Some(28.0));
        assert_eq!(record.creatinine, Some(1.0));
        assert_eq!(record.egfr, Some(90.0));

        assert_eq!(record.recent_metrics.len(), 10);
        assert_eq!(record.recent_metrics[0].metric_type, "blood_pressure");
    }

    #[test]
    fn test_no_metrics_leaves_every_category_absent() {
        let record = build_from(&patient(), &[], date("2024-06-15"), &AggregationConfig::default());

        assert_eq!(record.blood_pressure_systolic, None);
        assert_eq!(record.heart_rate, None);
        assert_eq!(record.egfr, None);
        assert!(record.recent_metrics.is_empty());
        assert!(record.symptoms.is_empty());

        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("hba1c").is_none());
    }

    #[test]
    fn test_recent_samples_capped() {
        let metrics: Vec<HealthMetric> = (0..15)
            .map(|i| metric(i, MetricCategory::Other("sleep".to_string()), MetricValues::default(), i, None))
            .collect();

        let record = build_from(&patient(), &metrics, date("2024-06-15"), &AggregationConfig::default());
        assert_eq!(record.recent_metrics.len(), 10);
        assert_eq!(record.recent_metrics[0].value, "N/A");
    }

    #[test]
    fn test_symptoms_deduplicated_in_order() {
        let metrics = vec![
            metric(1, MetricCategory::VitalSigns, MetricValues::default(), 0, Some("Very TIRED, some chest pain")),
            metric(2, MetricCategory::VitalSigns, MetricValues::default(), 1, Some("fatigue and polydipsia")),
            metric(3, MetricCategory::VitalSigns, MetricValues::default(), 2, None),
        ];

        let symptoms = extract_symptoms(&metrics, &AggregationConfig::default().symptom_triggers);
        assert_eq!(symptoms, vec!["fatigue", "chest pain", "excessive thirst"]);
    }

    #[tokio::test]
    async fn test_unknown_patient_is_not_found() {
        let backend = StorageBackend::in_memory();
        let aggregator = MetricAggregator::new(
            Arc::new(PatientRepository::new(backend.clone())),
            Arc::new(HealthMetricRepository::new(backend)),
            AggregationConfig::default(),
        );

        let result = aggregator.build_feature_record(404).await;
        assert!(matches!(result, Err(PredictionError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_aggregates_from_repositories_within_window() {
        let backend = StorageBackend::in_memory();
        let patients = PatientRepository::new(backend.clone());
        let metrics = HealthMetricRepository::new(backend);

        let patient = patients
            .create(CreatePatientRequest {
                first_name: "Ada".to_string(),
                last_name: "Okafor".to_string(),
                date_of_birth: "1970-03-02".to_string(),
                gender: "female".to_string(),
            })
            .await
            .unwrap();

        for (days_ago, bmi) in [(40, 25.0), (3, 31.4)] {
            metrics
                .create(CreateHealthMetricRequest {
                    patient_id: patient.id,
                    metric_type: "anthropometric".to_string(),
                    values: MetricValues { bmi: Some(bmi), weight_kg: Some(88.0), ..Default::default() },
                    notes: None,
                    recorded_by: None,
                    created_at: Some(clinical_risk_data::models::format_timestamp(&(Utc::now() - Duration::days(days_ago)))),
                })
                .await
                .unwrap();
        }

        let aggregator = MetricAggregator::new(Arc::new(patients), Arc::new(metrics), AggregationConfig::default());
        let record = aggregator.build_feature_record(patient.id).await.unwrap();

        assert_eq!(record.bmi, Some(31.4));
        assert_eq!(record.recent_metrics.len(), 1);
        assert_eq!(record.recent_metrics[0].value, "Weight: 88kg, BMI: 31.4");
    }
}
