//! Application state for the document generation API

use std::path::Path;

use docfill_core::DocumentGenerator;

pub struct AppState {
    pub generator: DocumentGenerator,
}

impl AppState {
    pub fn new(generator: DocumentGenerator) -> Self {
        Self { generator }
    }

    /// Directory that generated files are written to and served from
    pub fn output_dir(&self) -> &Path {
        self.generator.output_dir()
    }
}
