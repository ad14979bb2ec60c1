//! Document → PDF conversion
//!
//! Conversion is delegated to an office suite running out of process. The
//! strategy is picked once at startup by [`platform_converter`]: Word through
//! COM automation on Windows, a headless LibreOffice everywhere else.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::DocfillError;

/// Word's `wdFormatPDF` save format
const WORD_PDF_FORMAT: u32 = 17;

/// Stderr bytes kept in conversion error messages
const STDERR_TAIL: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    Pdf,
}

impl TargetFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            TargetFormat::Pdf => "pdf",
        }
    }
}

/// Turns a saved document into a sibling file of another format
pub trait Converter: Send + Sync {
    /// Convert `source`, returning the path of the produced file
    fn convert(&self, source: &Path, format: TargetFormat) -> Result<PathBuf, DocfillError>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Default converter for the host platform
pub fn platform_converter(office_binary: impl Into<PathBuf>) -> Arc<dyn Converter> {
    #[cfg(target_os = "windows")]
    {
        let _ = office_binary;
        info!("Using Word automation for PDF conversion");
        Arc::new(WordAutomationConverter::new())
    }

    #[cfg(not(target_os = "windows"))]
    {
        let converter = LibreOfficeConverter::new(office_binary);
        info!(
            "Using {} for PDF conversion",
            converter.binary().display()
        );
        Arc::new(converter)
    }
}

/// Path of `source` with its extension swapped for the target format's
pub fn sibling_path(source: &Path, format: TargetFormat) -> PathBuf {
    source.with_extension(format.extension())
}

fn existing_source(source: &Path) -> Result<PathBuf, DocfillError> {
    if !source.exists() {
        return Err(DocfillError::SourceMissing(source.to_path_buf()));
    }
    Ok(source.canonicalize()?)
}

fn check_output(tool: &str, output: &Output) -> Result<(), DocfillError> {
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    let tail = match stderr.char_indices().rev().nth(STDERR_TAIL) {
        Some((at, _)) => &stderr[at..],
        None => stderr,
    };

    Err(DocfillError::Conversion(format!(
        "{} exited with {}: {}",
        tool, output.status, tail
    )))
}

fn expect_produced(path: PathBuf) -> Result<PathBuf, DocfillError> {
    if !path.exists() {
        return Err(DocfillError::Conversion(format!(
            "expected output {} was not produced",
            path.display()
        )));
    }
    Ok(path)
}

// ============================================================
// LibreOffice
// ============================================================

/// Runs `<binary> --headless --convert-to <fmt> --outdir <dir> <source>`
#[derive(Debug, Clone)]
pub struct LibreOfficeConverter {
    binary: PathBuf,
}

impl LibreOfficeConverter {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }
}

impl Default for LibreOfficeConverter {
    fn default() -> Self {
        Self::new("libreoffice")
    }
}

impl Converter for LibreOfficeConverter {
    fn convert(&self, source: &Path, format: TargetFormat) -> Result<PathBuf, DocfillError> {
        let source = existing_source(source)?;
        let outdir = source
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        debug!(
            "Running {} on {}",
            self.binary.display(),
            source.display()
        );

        let output = Command::new(&self.binary)
            .arg("--headless")
            .arg("--convert-to")
            .arg(format.extension())
            .arg("--outdir")
            .arg(&outdir)
            .arg(&source)
            .output()
            .map_err(|e| {
                DocfillError::Conversion(format!(
                    "failed to run {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        check_output("LibreOffice", &output)?;
        expect_produced(sibling_path(&source, format))
    }

    fn name(&self) -> &'static str {
        "libreoffice"
    }
}

// ============================================================
// Word automation
// ============================================================

/// Drives Word's COM automation through PowerShell
#[derive(Debug, Clone)]
pub struct WordAutomationConverter {
    shell: PathBuf,
}

impl WordAutomationConverter {
    pub fn new() -> Self {
        Self {
            shell: PathBuf::from("powershell"),
        }
    }

    /// Open, save as PDF, close and quit
    pub fn script(source: &Path, destination: &Path) -> String {
        format!(
            "$ErrorActionPreference = 'Stop'; \
             $word = New-Object -ComObject Word.Application; \
             $word.Visible = $false; \
             try {{ \
             $doc = $word.Documents.Open({}); \
             $doc.SaveAs({}, {}); \
             $doc.Close() \
             }} finally {{ $word.Quit() }}",
            ps_quote(source),
            ps_quote(destination),
            WORD_PDF_FORMAT
        )
    }
}

impl Default for WordAutomationConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter for WordAutomationConverter {
    fn convert(&self, source: &Path, format: TargetFormat) -> Result<PathBuf, DocfillError> {
        let source = existing_source(source)?;
        let destination = sibling_path(&source, format);

        let output = Command::new(&self.shell)
            .args(["-NoProfile", "-NonInteractive", "-Command"])
            .arg(Self::script(&source, &destination))
            .output()
            .map_err(|e| {
                DocfillError::Conversion(format!("Error using COM on Windows: {}", e))
            })?;

        check_output("Word automation", &output)?;
        expect_produced(destination)
    }

    fn name(&self) -> &'static str {
        "word"
    }
}

/// Single-quoted PowerShell literal, without the `\\?\` verbatim prefix
fn ps_quote(path: &Path) -> String {
    let path = path.display().to_string();
    let path = path.strip_prefix(r"\\?\").unwrap_or(&path);
    format!("'{}'", path.replace('\'', "''"))
}
