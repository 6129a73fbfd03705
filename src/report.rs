//! Structured responses from the text-generation service and the report
//! text assembled from them.
//!
//! The service is an external collaborator. Anything that goes wrong talking
//! to it is reported to the reader as report content (see [`OFFLINE_NOTICE`]),
//! never as an error dialog.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{self, RecordStore};

/// Shown in place of a report when the generation service fails.
pub const OFFLINE_NOTICE: &str = "# ⚠️ Error\nAnalysis engine offline.";

/// Shown when the generation service answers with nothing.
pub const NO_RESULTS: &str = "No relevant data found.";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Malformed generation response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Generation response is empty")]
    Empty,
}

/// Structured radiology read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RadiologyAnalysis {
    #[serde(default)]
    pub indication: String,
    pub findings: String,
    pub impression: String,
    #[serde(default, rename = "followUp")]
    pub follow_up: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub layman_summary: String,
}

impl RadiologyAnalysis {
    pub fn from_json(json: &str) -> Result<Self, ReportError> {
        if json.trim().is_empty() {
            return Err(ReportError::Empty);
        }
        Ok(serde_json::from_str(json)?)
    }

    /// Report text with findings and impression under their own headings.
    pub fn report_text(&self) -> String {
        format!(
            "# 🔬 Findings\n\n{}\n\n# 🩺 Impression\n\n{}",
            self.findings, self.impression
        )
    }
}

/// Structured dermatology triage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DermAnalysis {
    pub assessment: String,
    #[serde(default)]
    pub risk_tier: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub next_steps: String,
    pub soap_note: String,
}

impl DermAnalysis {
    pub fn from_json(json: &str) -> Result<Self, ReportError> {
        if json.trim().is_empty() {
            return Err(ReportError::Empty);
        }
        Ok(serde_json::from_str(json)?)
    }

    /// The SOAP note is the rendered part of a triage result.
    pub fn report_text(&self) -> String {
        self.soap_note.clone()
    }

    pub fn risk(&self) -> RiskTier {
        RiskTier::from_label(&self.risk_tier)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskTier {
    Low,
    Moderate,
    Concerning,
}

impl RiskTier {
    /// Map a free-form tier label. Anything not recognisably low or moderate is concerning.
    pub fn from_label(label: &str) -> Self {
        let label = label.to_lowercase();
        if label.contains("low") {
            RiskTier::Low
        } else if label.contains("mod") {
            RiskTier::Moderate
        } else {
            RiskTier::Concerning
        }
    }
}

/// Report text for a generation call, substituting the offline notice on failure.
pub fn report_or_notice<E: std::fmt::Display>(result: Result<String, E>) -> String {
    match result {
        Ok(text) if text.trim().is_empty() => NO_RESULTS.to_string(),
        Ok(text) => text,
        Err(e) => {
            log::warn!("generation service failed: {e}");
            OFFLINE_NOTICE.to_string()
        }
    }
}

/// Decode a radiology response, record the study and return the report text.
///
/// A store failure still yields the report; an undecodable response yields
/// the offline notice and records nothing.
pub fn radiology_report<S: RecordStore + ?Sized>(
    json: &str,
    records: &mut S,
    patient_id: &str,
) -> String {
    report_or_notice(RadiologyAnalysis::from_json(json).map(|analysis| {
        let record = store::save_or_placeholder(
            records,
            "radiology",
            store::radiology_study(patient_id, &analysis),
        );
        log::info!("radiology study saved as {}", record.id);
        analysis.report_text()
    }))
}

/// Decode a dermatology triage, record the case and return its SOAP note.
pub fn derm_report<S: RecordStore + ?Sized>(
    json: &str,
    records: &mut S,
    patient_id: &str,
    symptoms: &[String],
    duration: &str,
) -> String {
    report_or_notice(DermAnalysis::from_json(json).map(|analysis| {
        let record = store::save_or_placeholder(
            records,
            "dermatology",
            store::derm_case(patient_id, symptoms, duration, &analysis),
        );
        log::info!("dermatology case saved as {}", record.id);
        analysis.report_text()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Record, StoreError};
    use rstest::rstest;
    use serde_json::{Map, Value, json};

    const RADIOLOGY_JSON: &str = r#"{
        "indication": "Cough",
        "findings": "No focal consolidation.",
        "impression": "**Normal** chest.",
        "followUp": "None",
        "tags": ["XR", "Chest"],
        "layman_summary": "Your lungs look healthy."
    }"#;

    #[test]
    fn radiology_report_text() {
        let analysis = RadiologyAnalysis::from_json(RADIOLOGY_JSON).unwrap();
        assert_eq!(analysis.follow_up, "None");
        assert_eq!(analysis.tags, vec!["XR", "Chest"]);
        assert_eq!(
            analysis.report_text(),
            "# 🔬 Findings\n\nNo focal consolidation.\n\n# 🩺 Impression\n\n**Normal** chest."
        );
    }

    #[test]
    fn derm_uses_soap_note() {
        let analysis = DermAnalysis::from_json(
            r###"{"assessment":"Seborrheic keratosis","riskTier":"Low","explanation":"",
                "nextSteps":"Routine","soapNote":"## S\nItchy lesion"}"###,
        )
        .unwrap();
        assert_eq!(analysis.report_text(), "## S\nItchy lesion");
        assert_eq!(analysis.risk(), RiskTier::Low);
    }

    #[test]
    fn malformed_and_empty_responses() {
        assert!(matches!(
            RadiologyAnalysis::from_json("{\"findings\": 3}"),
            Err(ReportError::Malformed(_))
        ));
        assert!(matches!(
            DermAnalysis::from_json("  "),
            Err(ReportError::Empty)
        ));
    }

    #[rstest]
    #[case("Low", RiskTier::Low)]
    #[case("very LOW risk", RiskTier::Low)]
    #[case("Moderate", RiskTier::Moderate)]
    #[case("Concerning", RiskTier::Concerning)]
    #[case("", RiskTier::Concerning)]
    fn risk_tiers(#[case] label: &str, #[case] tier: RiskTier) {
        assert_eq!(RiskTier::from_label(label), tier);
    }

    #[test]
    fn failures_become_content() {
        let failed: Result<String, &str> = Err("timeout");
        assert_eq!(report_or_notice(failed), OFFLINE_NOTICE);
        assert_eq!(report_or_notice::<&str>(Ok(String::new())), NO_RESULTS);
        assert_eq!(report_or_notice::<&str>(Ok("# Ok".to_string())), "# Ok");
    }

    struct DownStore;

    impl RecordStore for DownStore {
        fn create(&mut self, _: &str, _: Map<String, Value>) -> Result<Record, StoreError> {
            Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "down").into())
        }

        fn select(&mut self, _: &str, _: &str, _: &Value) -> Result<Vec<Record>, StoreError> {
            Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "down").into())
        }
    }

    #[test]
    fn radiology_report_is_recorded() {
        let mut records = MemoryStore::new();
        let text = radiology_report(RADIOLOGY_JSON, &mut records, "P123");
        assert!(text.starts_with("# 🔬 Findings"));

        let saved = records.select("radiology", "patient", &json!("P123")).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].fields["report"], text);
    }

    #[test]
    fn undecodable_response_is_the_offline_notice() {
        let mut records = MemoryStore::new();
        assert_eq!(radiology_report("{\"findings\":", &mut records, "P123"), OFFLINE_NOTICE);
        assert_eq!(derm_report("", &mut records, "P123", &[], ""), OFFLINE_NOTICE);
        assert!(records.select("radiology", "patient", &json!("P123")).unwrap().is_empty());
        assert!(records.select("dermatology", "patient", &json!("P123")).unwrap().is_empty());
    }

    #[test]
    fn store_outage_still_reports() {
        assert_eq!(
            radiology_report(RADIOLOGY_JSON, &mut DownStore, "P123"),
            RadiologyAnalysis::from_json(RADIOLOGY_JSON).unwrap().report_text()
        );
        let derm = r###"{"assessment":"Eczema","riskTier":"Moderate","soapNote":"## A\nEczema"}"###;
        let symptoms = vec!["itch".to_string()];
        assert_eq!(derm_report(derm, &mut DownStore, "P123", &symptoms, "2 weeks"), "## A\nEczema");
    }

    #[test]
    fn derm_case_records_the_visit() {
        let mut records = MemoryStore::new();
        let derm = r###"{"assessment":"Eczema","riskTier":"Moderate","soapNote":"## A\nEczema"}"###;
        let symptoms = vec!["itch".to_string()];
        derm_report(derm, &mut records, "P9", &symptoms, "2 weeks");

        let saved = records.select("dermatology", "patient", &json!("P9")).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].fields["risk_tier"], "Moderate");
        assert_eq!(saved[0].fields["symptoms"], json!(["itch"]));
    }
}
