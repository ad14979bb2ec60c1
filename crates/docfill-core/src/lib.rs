//! Contract document generation
//!
//! Fills `.docx` templates from a placeholder map, stamps each result with a
//! reference number drawn from a persistent serial counter, optionally places
//! a signature image, and converts the filled document to PDF.
//!
//! [`generate::DocumentGenerator`] runs the whole pipeline; the other modules
//! are usable on their own.

pub mod convert;
pub mod document;
pub mod docx;
pub mod error;
pub mod generate;
pub mod placeholders;
pub mod reference;
pub mod serial;
pub mod signature;
pub mod substitute;
pub mod templates;

pub use convert::{platform_converter, Converter, LibreOfficeConverter, TargetFormat};
pub use document::{Document, FontRule, Paragraph, Segment, Table, TextRun};
pub use docx::DocxTemplate;
pub use error::DocfillError;
pub use generate::{DocumentGenerator, GeneratedDocument, GenerationRequest};
pub use placeholders::{PlaceholderMap, REFERENCE_NUMBER_KEY, SIGNATURE_IMAGE_KEY};
pub use reference::{generate_reference, DEFAULT_COMPANY_CODE};
pub use serial::{FileSerialCounter, MemorySerialCounter, SerialCounter, DEFAULT_SERIAL_BASE};
pub use signature::insert_image;
pub use substitute::{substitute, SubstitutionMode};
pub use templates::{TemplateKind, TemplateSet};
