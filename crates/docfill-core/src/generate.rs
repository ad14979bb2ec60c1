//! Request pipeline
//!
//! One generation request moves through a fixed sequence of stages:
//!
//! ```text
//! RECEIVED → TEMPLATE_SELECTED → REFERENCE_ASSIGNED → SUBSTITUTED
//!          → IMAGE_APPLIED (optional) → SAVED → CONVERTED → RESPONDED
//! ```
//!
//! Any failure ends the request; artifacts written by earlier stages stay
//! on disk.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::convert::{Converter, TargetFormat};
use crate::docx::DocxTemplate;
use crate::error::DocfillError;
use crate::placeholders::{PlaceholderMap, REFERENCE_NUMBER_KEY, SIGNATURE_IMAGE_KEY};
use crate::reference::{generate_reference, DEFAULT_COMPANY_CODE};
use crate::serial::SerialCounter;
use crate::signature::insert_image;
use crate::substitute::substitute;
use crate::templates::{TemplateKind, TemplateSet};

/// Fixed name of the decoded signature image in the output directory
pub const SIGNATURE_FILE_NAME: &str = "signature_image.png";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GenerationRequest {
    #[serde(default)]
    pub template_type: Option<String>,
    #[serde(default)]
    pub placeholders: PlaceholderMap,
    /// Base64 image, optionally as a `data:` URL
    #[serde(default)]
    pub signature_image: Option<String>,
}

impl GenerationRequest {
    pub fn new(template_type: impl Into<String>, placeholders: PlaceholderMap) -> Self {
        Self {
            template_type: Some(template_type.into()),
            placeholders,
            signature_image: None,
        }
    }

    pub fn with_signature(mut self, signature_image: impl Into<String>) -> Self {
        self.signature_image = Some(signature_image.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedDocument {
    pub reference_number: String,
    /// File name of the filled `.docx`, relative to the output directory
    pub word_document: String,
    /// File name of the converted PDF, relative to the output directory
    pub pdf_document: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStage {
    TemplateSelected,
    ReferenceAssigned,
    Substituted,
    ImageApplied,
    Saved,
    Converted,
    Responded,
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GenerationStage::TemplateSelected => "TEMPLATE_SELECTED",
            GenerationStage::ReferenceAssigned => "REFERENCE_ASSIGNED",
            GenerationStage::Substituted => "SUBSTITUTED",
            GenerationStage::ImageApplied => "IMAGE_APPLIED",
            GenerationStage::Saved => "SAVED",
            GenerationStage::Converted => "CONVERTED",
            GenerationStage::Responded => "RESPONDED",
        };
        f.write_str(name)
    }
}

/// Fills templates, stores the results and converts them to PDF
pub struct DocumentGenerator {
    templates: TemplateSet,
    counter: Arc<dyn SerialCounter>,
    converter: Arc<dyn Converter>,
    output_dir: PathBuf,
    company_code: String,
}

impl DocumentGenerator {
    pub fn new(
        templates: TemplateSet,
        counter: Arc<dyn SerialCounter>,
        converter: Arc<dyn Converter>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            templates,
            counter,
            converter,
            output_dir: output_dir.into(),
            company_code: DEFAULT_COMPANY_CODE.to_string(),
        }
    }

    pub fn with_company_code(mut self, company_code: impl Into<String>) -> Self {
        self.company_code = company_code.into();
        self
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn converter_name(&self) -> &'static str {
        self.converter.name()
    }

    /// Run a request end to end. Blocking.
    pub fn generate(&self, request: GenerationRequest) -> Result<GeneratedDocument, DocfillError> {
        self.run(request).inspect_err(|e| {
            debug!(stage = "FAILED", "Generation failed: {}", e);
        })
    }

    fn run(&self, request: GenerationRequest) -> Result<GeneratedDocument, DocfillError> {
        let GenerationRequest {
            template_type,
            mut placeholders,
            signature_image,
        } = request;

        let kind = TemplateKind::from_label(template_type.as_deref().unwrap_or_default())?;
        stage(GenerationStage::TemplateSelected);

        let reference_number = generate_reference(self.counter.as_ref(), &self.company_code)?;
        placeholders.insert(REFERENCE_NUMBER_KEY, reference_number.as_str());
        stage(GenerationStage::ReferenceAssigned);

        let template = DocxTemplate::open(&self.templates.path(kind))?;
        let mut document = substitute(
            template.document(),
            &placeholders,
            kind.substitution_mode(),
        );
        stage(GenerationStage::Substituted);

        fs::create_dir_all(&self.output_dir)?;

        if let Some(payload) = signature_image.as_deref().filter(|p| !p.trim().is_empty()) {
            let bytes = decode_signature(payload)?;
            let image_path = self.output_dir.join(SIGNATURE_FILE_NAME);
            fs::write(&image_path, bytes)?;
            document = insert_image(document, SIGNATURE_IMAGE_KEY, &image_path)?;
            stage(GenerationStage::ImageApplied);
        }

        let word_document = format!("{}.docx", kind.output_stem(&reference_number));
        let word_path = self.output_dir.join(&word_document);
        template.with_document(document).save(&word_path)?;
        stage(GenerationStage::Saved);

        let pdf_path = self.converter.convert(&word_path, TargetFormat::Pdf)?;
        let pdf_document = file_name(&pdf_path)?;
        stage(GenerationStage::Converted);

        info!(
            "Generated {} for {} ({}, {})",
            reference_number,
            kind.label(),
            word_document,
            pdf_document
        );
        stage(GenerationStage::Responded);

        Ok(GeneratedDocument {
            reference_number,
            word_document,
            pdf_document,
        })
    }
}

fn stage(stage: GenerationStage) {
    debug!(%stage, "Generation stage reached");
}

/// Decode a base64 image, accepting a `data:<mime>;base64,` prefix
pub fn decode_signature(payload: &str) -> Result<Vec<u8>, DocfillError> {
    let payload = payload.trim();
    let data = match payload.split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => payload,
    };

    STANDARD
        .decode(data)
        .map_err(|e| DocfillError::ImageDecode(e.to_string()))
}

fn file_name(path: &Path) -> Result<String, DocfillError> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            DocfillError::Conversion(format!("converter returned {}", path.display()))
        })
}
