#![warn(missing_docs)]
//! # guardian-neuro-ui
//!
//! ## Purpose
//! Defines the view-facing case state and text rendering for
//! `guardian-neuro`.
//!
//! ## Responsibilities
//! - Hold transient case state: images, patient fields, report, error and
//!   loading flag.
//! - Project the login panel (remaining quota, warnings, submit label).
//! - Render the structured report and the dedicated print region.
//!
//! ## Data flow
//! Shell events mutate [`CaseState`]; [`render_report`] and
//! [`render_print_region`] turn the current report into terminal text.
//!
//! ## Ownership and lifetimes
//! `CaseState` owns all values so reducers never borrow from transport
//! buffers or intake sources.
//!
//! ## Error model
//! This crate favors explicit state over recoverable errors. Errors from other
//! layers arrive as display strings via [`CaseState::finish_with_error`].
//!
//! ## Security and privacy notes
//! Case state lives in memory only and is dropped on clear or logout.

use std::fmt::Write as _;

use guardian_neuro_analysis_contract::{AnalysisReport, ConfidenceTier};
use guardian_neuro_core::{PatientContext, ScanImage};

/// Transient in-memory case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseState {
    /// Accepted images in display order.
    pub images: Vec<ScanImage>,
    /// Optional patient fields.
    pub patient: PatientContext,
    /// Most recent successful report.
    pub report: Option<AnalysisReport>,
    /// Most recent user-visible error.
    pub error: Option<String>,
    /// `true` while an analysis is in flight.
    pub loading: bool,
    /// Result of the last export (`Copied!` / `Failed`).
    pub copy_status: Option<String>,
}

impl CaseState {
    /// Creates an empty case.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a fully decoded batch in one step.
    ///
    /// Any previous error and report are cleared, as a new selection starts a
    /// fresh reading.
    pub fn commit_images(&mut self, images: Vec<ScanImage>) {
        self.images.extend(images);
        self.error = None;
        self.report = None;
    }

    /// Removes the image at `index`; returns the removed image if present.
    pub fn remove_image(&mut self, index: usize) -> Option<ScanImage> {
        if index < self.images.len() {
            Some(self.images.remove(index))
        } else {
            None
        }
    }

    /// Resets images, patient fields, report, error and export status.
    pub fn clear_case(&mut self) {
        *self = Self::default();
    }

    /// Returns `true` when the analyze action is enabled.
    pub fn can_submit(&self) -> bool {
        !self.images.is_empty() && !self.loading
    }

    /// Marks an analysis as started; clears the previous outcome.
    pub fn begin_analysis(&mut self) {
        self.loading = true;
        self.error = None;
        self.report = None;
        self.copy_status = None;
    }

    /// Stores a successful report.
    pub fn finish_with_report(&mut self, report: AnalysisReport) {
        self.loading = false;
        self.error = None;
        self.report = Some(report);
    }

    /// Stores a user-visible error.
    pub fn finish_with_error(&mut self, message: impl Into<String>) {
        self.loading = false;
        self.error = Some(message.into());
    }

    /// Sets an error without touching images or report (validation paths).
    pub fn show_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    /// One-line status for the report pane.
    pub fn status_line(&self) -> String {
        if let Some(error) = &self.error {
            return format!("Error: {error}");
        }
        if self.loading {
            return "The AI is analyzing the scan. Please wait...".to_string();
        }
        if self.report.is_some() {
            return "Report ready.".to_string();
        }
        "Analysis will appear here.".to_string()
    }
}

/// Login panel projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginPanel {
    /// Remaining successful analyses.
    pub remaining: u32,
    /// Quota ceiling.
    pub max: u32,
    /// Low-quota warning threshold.
    pub warn_at: u32,
}

impl LoginPanel {
    /// Creates the projection.
    pub fn new(remaining: u32, max: u32, warn_at: u32) -> Self {
        Self {
            remaining,
            max,
            warn_at,
        }
    }

    /// Whether the submit action is enabled.
    pub fn submit_enabled(&self) -> bool {
        self.remaining > 0
    }

    /// Whether the low-quota warning is shown.
    pub fn low_quota(&self) -> bool {
        self.remaining <= self.warn_at
    }

    /// Submit button label.
    pub fn submit_label(&self) -> &'static str {
        if self.submit_enabled() {
            "Sign In"
        } else {
            "No Requests Remaining"
        }
    }

    /// Renders the panel text.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Remaining Requests: {}/{}", self.remaining, self.max);
        if self.low_quota() {
            let _ = writeln!(out, "! Limited requests remaining");
        }
        let _ = writeln!(out, "[{}]", self.submit_label());
        if !self.submit_enabled() {
            let _ = writeln!(
                out,
                "The demo has reached its request limit. \
                 Please contact the administrator for more access."
            );
        }
        out
    }
}

/// Badge text for a confidence tier.
pub fn confidence_badge(tier: &ConfidenceTier) -> String {
    match tier {
        ConfidenceTier::High => "[HIGH]".to_string(),
        ConfidenceTier::Medium => "[MEDIUM]".to_string(),
        ConfidenceTier::Low => "[LOW]".to_string(),
        ConfidenceTier::Other(label) => format!("({label})"),
    }
}

/// Renders the report sections as terminal text.
///
/// Empty sections render their heading only; the disclaimer is omitted when
/// blank.
pub fn render_report(report: &AnalysisReport) -> String {
    let mut out = String::new();

    section(&mut out, "Observations");
    for item in &report.observations {
        let _ = writeln!(out, "  - {item}");
    }

    section(&mut out, "Potential Diagnoses");
    if !report.potential_diagnoses.is_empty() {
        let width = report
            .potential_diagnoses
            .iter()
            .map(|entry| entry.diagnosis.chars().count())
            .max()
            .unwrap_or(0)
            .max("Diagnosis".len());
        let _ = writeln!(out, "  {:<width$}  Confidence", "Diagnosis");
        for entry in &report.potential_diagnoses {
            let _ = writeln!(
                out,
                "  {:<width$}  {}",
                entry.diagnosis,
                confidence_badge(&entry.tier())
            );
        }
    }

    section(&mut out, "Recommendations");
    for item in &report.recommendations {
        let _ = writeln!(out, "  - {item}");
    }

    if !report.disclaimer.trim().is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "! {}", report.disclaimer.trim());
    }

    out
}

/// Renders the print region: a header plus the report, nothing else.
pub fn render_print_region(report: &AnalysisReport) -> String {
    let mut out = String::from("GuardianNeuro Diagnostic Report\n");
    out.push_str(&"=".repeat(31));
    out.push('\n');
    out.push_str(&render_report(report));
    out
}

/// Renders the image preview list.
pub fn render_image_list(images: &[ScanImage]) -> String {
    let mut out = format!("Image Previews ({})\n", images.len());
    for (index, image) in images.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {:>2}. {} ({}, {} base64 chars)",
            index + 1,
            image.file_name,
            image.mime_type.as_str(),
            image.base64_payload.len()
        );
    }
    out
}

fn section(out: &mut String, title: &str) {
    if !out.is_empty() {
        out.push('\n');
    }
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", "-".repeat(title.len()));
}

#[cfg(test)]
mod tests {
    //! Unit tests for case reducers and the login panel.

    use super::*;
    use guardian_neuro_core::ImageMime;

    #[test]
    fn submit_requires_images_and_idle_state() {
        let mut state = CaseState::new();
        assert!(!state.can_submit());

        state.commit_images(vec![ScanImage::from_bytes("a.png", ImageMime::Png, b"a")]);
        assert!(state.can_submit());

        state.begin_analysis();
        assert!(!state.can_submit());
    }

    #[test]
    fn login_panel_disables_submit_at_zero() {
        let panel = LoginPanel::new(0, 50, 10);
        assert!(!panel.submit_enabled());
        assert_eq!(panel.submit_label(), "No Requests Remaining");
        assert!(panel.render().contains("Remaining Requests: 0/50"));

        let healthy = LoginPanel::new(42, 50, 10);
        assert!(!healthy.low_quota());
        assert_eq!(healthy.submit_label(), "Sign In");
    }
}
