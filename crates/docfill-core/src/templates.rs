//! Template registry

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::DocfillError;
use crate::substitute::SubstitutionMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TemplateKind {
    #[serde(rename = "VAT")]
    Vat,
    #[serde(rename = "Service Agreement")]
    ServiceAgreement,
}

impl TemplateKind {
    pub const ALL: [TemplateKind; 2] = [TemplateKind::Vat, TemplateKind::ServiceAgreement];

    /// Resolve the `template_type` label sent by clients (exact match)
    pub fn from_label(label: &str) -> Result<Self, DocfillError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.label() == label)
            .ok_or_else(|| DocfillError::InvalidTemplateType(label.to_string()))
    }

    pub fn label(&self) -> &'static str {
        match self {
            TemplateKind::Vat => "VAT",
            TemplateKind::ServiceAgreement => "Service Agreement",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            TemplateKind::Vat => "SAMPLE VAT registration and VAT filling -SME package.docx",
            TemplateKind::ServiceAgreement => {
                "SAMPLE Service Agreement -Company formation -Bahrain - Filled.docx"
            }
        }
    }

    /// VAT forms keep their run formatting; agreements tolerate split markers
    pub fn substitution_mode(&self) -> SubstitutionMode {
        match self {
            TemplateKind::Vat => SubstitutionMode::FormatPreserving,
            TemplateKind::ServiceAgreement => SubstitutionMode::Structural,
        }
    }

    /// Base name (without extension) of the generated files
    pub fn output_stem(&self, reference_number: &str) -> String {
        format!("{} {}", self.label(), reference_number)
    }
}

/// Directory holding the template files
#[derive(Debug, Clone)]
pub struct TemplateSet {
    dir: PathBuf,
}

impl TemplateSet {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, kind: TemplateKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    /// Templates whose file is absent
    pub fn missing(&self) -> Vec<TemplateKind> {
        TemplateKind::ALL
            .into_iter()
            .filter(|kind| !self.path(*kind).exists())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_resolve_exactly() {
        assert_eq!(TemplateKind::from_label("VAT").unwrap(), TemplateKind::Vat);
        assert_eq!(
            TemplateKind::from_label("Service Agreement").unwrap(),
            TemplateKind::ServiceAgreement
        );
        assert!(TemplateKind::from_label("vat").is_err());
        assert!(TemplateKind::from_label("Unknown").is_err());
        assert!(TemplateKind::from_label("").is_err());
    }

    #[test]
    fn test_unknown_label_is_client_error() {
        let err = TemplateKind::from_label("Unknown").unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "Invalid template type!");
    }

    #[test]
    fn test_modes_per_template() {
        assert_eq!(
            TemplateKind::Vat.substitution_mode(),
            SubstitutionMode::FormatPreserving
        );
        assert_eq!(
            TemplateKind::ServiceAgreement.substitution_mode(),
            SubstitutionMode::Structural
        );
    }

    #[test]
    fn test_output_stem_uses_label() {
        assert_eq!(
            TemplateKind::ServiceAgreement.output_stem("BKR01-2025-CR701"),
            "Service Agreement BKR01-2025-CR701"
        );
    }

    #[test]
    fn test_missing_templates_are_listed() {
        let dir = tempfile::tempdir().unwrap();
        let set = TemplateSet::new(dir.path());
        std::fs::write(set.path(TemplateKind::Vat), b"").unwrap();

        assert_eq!(set.missing(), vec![TemplateKind::ServiceAgreement]);
    }
}
