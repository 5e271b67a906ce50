//! Integration tests for envelope extraction and report parsing.

use guardian_neuro_analysis_contract::{
    AnalysisError, AnalysisReport, PotentialDiagnosis, ResponseEnvelope, parse_report,
    report_to_pretty_json,
};

fn sample_report() -> AnalysisReport {
    AnalysisReport {
        observations: vec![
            "Hyperdense crescentic collection along the left convexity.".to_string(),
            "Mild midline shift to the right.".to_string(),
        ],
        potential_diagnoses: vec![
            PotentialDiagnosis {
                diagnosis: "Acute subdural hematoma".to_string(),
                confidence: "High".to_string(),
            },
            PotentialDiagnosis {
                diagnosis: "Contusion".to_string(),
                confidence: "Low".to_string(),
            },
        ],
        recommendations: vec!["Urgent neurosurgical consultation.".to_string()],
        disclaimer: "AI-generated; verify with a radiologist.".to_string(),
    }
}

fn envelope_for(report: &AnalysisReport) -> String {
    let text = serde_json::to_string(report).expect("report serializes");
    serde_json::to_string(&ResponseEnvelope::with_text(text)).expect("envelope serializes")
}

#[test]
fn report_parsing_tests_round_trip_through_envelope() {
    let report = sample_report();
    let parsed = parse_report(&envelope_for(&report)).expect("valid envelope parses");
    assert_eq!(parsed, report);
}

#[test]
fn report_parsing_tests_use_camel_case_wire_names() {
    let raw = r#"{"candidates":[{"content":{"parts":[{"text":"{\"observations\":[\"a\"],\"potentialDiagnoses\":[{\"diagnosis\":\"d\",\"confidence\":\"Medium\"}],\"recommendations\":[],\"disclaimer\":\"x\"}"}]}}]}"#;
    let report = parse_report(raw).expect("wire report parses");
    assert_eq!(report.potential_diagnoses[0].diagnosis, "d");
    assert_eq!(report.potential_diagnoses[0].confidence, "Medium");
}

#[test]
fn report_parsing_tests_flag_invalid_report_text() {
    let raw = serde_json::to_string(&ResponseEnvelope::with_text("Sorry, I cannot help."))
        .expect("envelope serializes");
    assert!(matches!(parse_report(&raw), Err(AnalysisError::MalformedJson(_))));
}

#[test]
fn report_parsing_tests_flag_invalid_envelope() {
    assert!(matches!(
        parse_report("not json at all"),
        Err(AnalysisError::MalformedJson(_))
    ));
}

#[test]
fn report_parsing_tests_distinguish_safety_stop() {
    let raw = r#"{"candidates":[{"finishReason":"SAFETY","safetyRatings":[]}]}"#;
    assert!(matches!(parse_report(raw), Err(AnalysisError::SafetyBlocked)));

    let blocked_prompt = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
    assert!(matches!(
        parse_report(blocked_prompt),
        Err(AnalysisError::SafetyBlocked)
    ));
}

#[test]
fn report_parsing_tests_report_missing_candidates_as_empty() {
    for raw in [
        r#"{}"#,
        r#"{"candidates":[]}"#,
        r#"{"candidates":[{"finishReason":"MAX_TOKENS"}]}"#,
        r#"{"candidates":[{"content":{"parts":[]}}]}"#,
    ] {
        assert!(
            matches!(parse_report(raw), Err(AnalysisError::EmptyResponse)),
            "expected empty response for {raw}"
        );
    }
}

#[test]
fn report_parsing_tests_export_two_space_pretty_json() {
    let exported = report_to_pretty_json(&sample_report()).expect("export");
    assert!(exported.starts_with("{\n  \"observations\": [\n    \"Hyperdense"));
    assert!(exported.contains("\"potentialDiagnoses\""));

    let reparsed: AnalysisReport = serde_json::from_str(&exported).expect("export is valid json");
    assert_eq!(reparsed, sample_report());
}

#[test]
fn report_parsing_tests_read_null_fields_as_empty() {
    let text = r#"{
        "observations": null,
        "potentialDiagnoses": [{"diagnosis": "Contusion", "confidence": null}],
        "recommendations": null,
        "disclaimer": null
    }"#;
    let raw = serde_json::to_string(&ResponseEnvelope::with_text(text)).expect("envelope");

    let report = parse_report(&raw).expect("null fields are not an error");
    assert!(report.observations.is_empty());
    assert!(report.recommendations.is_empty());
    assert_eq!(report.disclaimer, "");
    assert_eq!(
        report.potential_diagnoses,
        vec![PotentialDiagnosis {
            diagnosis: "Contusion".to_string(),
            confidence: String::new(),
        }]
    );

    let null_diagnoses = serde_json::to_string(&ResponseEnvelope::with_text(
        r#"{"potentialDiagnoses": null, "disclaimer": "Draft only."}"#,
    ))
    .expect("envelope");
    let report = parse_report(&null_diagnoses).expect("null list is empty");
    assert!(report.potential_diagnoses.is_empty());
    assert_eq!(report.disclaimer, "Draft only.");
}
