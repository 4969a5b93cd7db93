use chrono::{DateTime, Utc};
use log::{error, warn};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::bundle::ArchiveBundle;
use super::PackagingError;

pub const README_FILE: &str = "LEGGIMI.txt";
pub const METADATA_FILE: &str = "metadata.json";

/// A category left out of the archive and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SkippedCategory {
    pub category: String,
    pub reason: String,
}

/// One document that failed to generate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DocumentFailure {
    pub category: String,
    /// Session date, participant name or template id.
    pub key: String,
    pub error: String,
}

/// Outcome of a packaging run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PackageReport {
    pub course_id: String,
    pub course_title: String,
    pub engine: String,
    pub generated_at: DateTime<Utc>,
    pub generated: Vec<String>,
    pub skipped: Vec<SkippedCategory>,
    pub failures: Vec<DocumentFailure>,
    pub warnings: Vec<String>,
}

impl PackageReport {
    pub fn new(course_id: &str, course_title: &str, engine: &str) -> Self {
        Self {
            course_id: course_id.to_string(),
            course_title: course_title.to_string(),
            engine: engine.to_string(),
            generated_at: Utc::now(),
            generated: Vec::new(),
            skipped: Vec::new(),
            failures: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn generated(&mut self, path: String) {
        self.generated.push(path);
    }

    pub fn skip(&mut self, category: &str, reason: impl Into<String>) {
        let reason = reason.into();
        warn!("Skipping {}: {}", category, reason);
        self.skipped.push(SkippedCategory {
            category: category.to_string(),
            reason,
        });
    }

    pub fn fail(&mut self, category: &str, key: &str, error: impl ToString) {
        let error = error.to_string();
        error!("Failed to generate {} [{}]: {}", category, key, error);
        self.failures.push(DocumentFailure {
            category: category.to_string(),
            key: key.to_string(),
            error,
        });
    }

    /// Record a data warning unless a recorded one already says the same.
    /// `scope` is the module folder it refers to, empty for the whole course.
    pub fn warn(&mut self, scope: &str, warning: &str) {
        if self.warnings.iter().any(|w| w.contains(warning)) {
            return;
        }
        if scope.is_empty() {
            self.warnings.push(warning.to_string());
        } else {
            self.warnings.push(format!("{}: {}", scope, warning));
        }
    }

    pub fn is_skipped(&self, category: &str) -> bool {
        self.skipped.iter().any(|s| s.category == category)
    }

    /// Fold a nested run in, prefixing its paths with `folder`.
    pub fn merge(&mut self, folder: &str, other: PackageReport) {
        self.generated.extend(
            other
                .generated
                .into_iter()
                .map(|path| super::bundle::join(folder, &path)),
        );
        self.skipped.extend(other.skipped.into_iter().map(|s| SkippedCategory {
            category: format!("{}/{}", folder, s.category),
            reason: s.reason,
        }));
        self.failures.extend(other.failures.into_iter().map(|f| DocumentFailure {
            category: format!("{}/{}", folder, f.category),
            ..f
        }));
        self.warnings.extend(other.warnings);
    }

    /// Plain-text summary written as `LEGGIMI.txt`.
    pub fn readme(&self) -> String {
        let mut text = format!(
            "Corso {} - {}\nGenerato il {} (motore: {})\n\nDocumenti generati: {}\n",
            self.course_id,
            self.course_title,
            self.generated_at.format("%d/%m/%Y %H:%M UTC"),
            self.engine,
            self.generated.len()
        );
        for path in &self.generated {
            text.push_str(&format!("  - {}\n", path));
        }
        if !self.skipped.is_empty() {
            text.push_str("\nCategorie non generate:\n");
            for s in &self.skipped {
                text.push_str(&format!("  - {}: {}\n", s.category, s.reason));
            }
        }
        if !self.failures.is_empty() {
            text.push_str("\nDocumenti non generati per errore:\n");
            for f in &self.failures {
                text.push_str(&format!("  - {} [{}]: {}\n", f.category, f.key, f.error));
            }
        }
        if !self.warnings.is_empty() {
            text.push_str("\nAvvisi sui dati del corso:\n");
            for w in &self.warnings {
                text.push_str(&format!("  - {}\n", w));
            }
        }
        text
    }

    /// Add `LEGGIMI.txt` and `metadata.json` to the archive root.
    pub fn write_into(&self, bundle: &mut ArchiveBundle) -> Result<(), PackagingError> {
        let metadata = serde_json::to_vec_pretty(self)?;
        bundle.add(README_FILE, self.readme().into_bytes());
        bundle.add(METADATA_FILE, metadata);
        Ok(())
    }

    /// Counts, skipped categories and failures, without the file list.
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            course_id: self.course_id.clone(),
            course_title: self.course_title.clone(),
            engine: self.engine.clone(),
            generated: self.generated.len(),
            warnings: self.warnings.len(),
            skipped: self.skipped.clone(),
            failures: self.failures.clone(),
            truncated: false,
        }
    }

    /// Value of the `X-Package-Report` header: the run summary as compact
    /// ASCII JSON, shortened until it fits [`REPORT_HEADER_LIMIT`].
    pub fn header_value(&self) -> Result<String, PackagingError> {
        let mut summary = self.summary();
        loop {
            let value = ascii_json(&summary)?;
            if value.len() <= REPORT_HEADER_LIMIT || !summary.shrink() {
                return Ok(value);
            }
        }
    }
}

/// Upper bound in bytes for the `X-Package-Report` header value.
pub const REPORT_HEADER_LIMIT: usize = 4 * 1024;

/// Header-sized view of a [`PackageReport`]. The full report is always
/// stored as `metadata.json` when the run writes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReportSummary {
    pub course_id: String,
    pub course_title: String,
    pub engine: String,
    pub generated: usize,
    pub warnings: usize,
    pub skipped: Vec<SkippedCategory>,
    pub failures: Vec<DocumentFailure>,
    /// Some skipped or failure entries were dropped to fit the header.
    pub truncated: bool,
}

impl ReportSummary {
    pub fn is_skipped(&self, category: &str) -> bool {
        self.skipped.iter().any(|s| s.category == category)
    }

    /// Drop half of the failures, then half of the skipped entries, then
    /// the title. False once nothing is left to drop.
    fn shrink(&mut self) -> bool {
        if !self.failures.is_empty() {
            self.failures.truncate(self.failures.len() / 2);
        } else if !self.skipped.is_empty() {
            self.skipped.truncate(self.skipped.len() / 2);
        } else if !self.course_title.is_empty() {
            self.course_title.clear();
        } else {
            return false;
        }
        self.truncated = true;
        true
    }
}

/// Compact JSON with non-ASCII escaped as `\uXXXX`, valid as a header value.
fn ascii_json<T: Serialize>(value: &T) -> Result<String, PackagingError> {
    let json = serde_json::to_string(value)?;
    let mut out = String::with_capacity(json.len());
    for ch in json.chars() {
        if ch.is_ascii() {
            out.push(ch);
        } else {
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_prefixes_nested_paths() {
        let mut outer = PackageReport::new("C1", "Corso", "template");
        let mut inner = PackageReport::new("C1", "Corso", "template");
        inner.generated("Excel/Lista.xlsx".to_string());
        inner.skip("Certificati", "nessun partecipante");
        inner.fail("Registri_FAD", "03/03/2025", "boom");
        outer.merge("01_M1", inner);

        assert_eq!(outer.generated, vec!["01_M1/Excel/Lista.xlsx"]);
        assert!(outer.is_skipped("01_M1/Certificati"));
        assert_eq!(outer.failures[0].key, "03/03/2025");
        assert_eq!(outer.failures[0].category, "01_M1/Registri_FAD");
    }

    #[test]
    fn test_readme_lists_everything() {
        let mut report = PackageReport::new("C1", "Corso", "programmatic");
        report.generated("Verbale_Finale_C1.docx".to_string());
        report.skip("modulo 5", "nessun beneficiario");
        report.warnings.push("codice fiscale non valido".to_string());

        let mut bundle = ArchiveBundle::new();
        report.write_into(&mut bundle).unwrap();
        let readme = String::from_utf8(bundle.get(README_FILE).unwrap().to_vec()).unwrap();
        assert!(readme.contains("Verbale_Finale_C1.docx"));
        assert!(readme.contains("modulo 5: nessun beneficiario"));
        assert!(readme.contains("codice fiscale non valido"));

        let metadata: serde_json::Value =
            serde_json::from_slice(bundle.get(METADATA_FILE).unwrap()).unwrap();
        assert_eq!(metadata["engine"], "programmatic");
    }

    #[test]
    fn test_header_value_is_ascii_json() {
        let mut report = PackageReport::new("C1", "Attività è più", "template");
        report.skip("Modulo 5", "nessun beneficiario");
        let header = report.header_value().unwrap();
        assert!(header.is_ascii());
        let parsed: ReportSummary = serde_json::from_str(&header).unwrap();
        assert_eq!(parsed.course_title, "Attività è più");
        assert!(parsed.is_skipped("Modulo 5"));
        assert!(!parsed.truncated);
    }

    #[test]
    fn test_header_value_stays_under_limit() {
        let mut report = PackageReport::new("C1", "Corso", "template");
        for module in 1..=12 {
            let mut inner = PackageReport::new("C1", "Corso", "template");
            for day in 1..=28 {
                inner.generated(format!("Registri_FAD/Registro_FAD_C1_{:02}-03-2025.docx", day));
                inner.fail("Registri FAD", &format!("{:02}/03/2025", day), "logo.png non è un'immagine");
                inner.warnings.push(format!("[moduli[{}].sessioni[{}].ora_fine] Orario non valido", module, day));
            }
            report.merge(&format!("{:02}_M{}", module, module), inner);
        }

        let header = report.header_value().unwrap();
        assert!(header.len() <= REPORT_HEADER_LIMIT);
        let parsed: ReportSummary = serde_json::from_str(&header).unwrap();
        assert!(parsed.truncated);
        assert_eq!(parsed.generated, 12 * 28);
        assert_eq!(parsed.warnings, 12 * 28);
        assert!(parsed.failures.len() < report.failures.len());

        let mut bundle = ArchiveBundle::new();
        report.write_into(&mut bundle).unwrap();
        let metadata: PackageReport = serde_json::from_slice(bundle.get(METADATA_FILE).unwrap()).unwrap();
        assert_eq!(metadata.failures.len(), 12 * 28);
    }
}
