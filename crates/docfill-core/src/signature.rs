//! Signature image insertion
//!
//! Replaces the first paragraph containing a marker token with a fixed-size
//! picture. Table cells are searched before top-level paragraphs.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::document::{Document, ImageRun, Paragraph, Segment, EMU_PER_INCH};
use crate::error::DocfillError;

/// Inserted image width (1.5 in)
pub const IMAGE_WIDTH_EMU: u32 = EMU_PER_INCH * 3 / 2;
/// Inserted image height (0.75 in)
pub const IMAGE_HEIGHT_EMU: u32 = EMU_PER_INCH * 3 / 4;

/// Replace the paragraph holding `marker` with the image at `image_path`
///
/// At most one paragraph is replaced per call. Fails with
/// [`DocfillError::MarkerNotFound`] when no paragraph contains the marker;
/// read or decode failures are wrapped in [`DocfillError::ImageInsertion`].
pub fn insert_image(
    mut document: Document,
    marker: &str,
    image_path: &Path,
) -> Result<Document, DocfillError> {
    let bytes = fs::read(image_path).map_err(|e| DocfillError::ImageInsertion(e.to_string()))?;
    validate_image(&bytes)?;

    let image = ImageRun::new(bytes, IMAGE_WIDTH_EMU, IMAGE_HEIGHT_EMU);

    let target = document
        .table_paragraphs_mut()
        .find(|p| p.text().contains(marker));
    if let Some(paragraph) = target {
        *paragraph = image_paragraph(image);
        debug!("Placed image for '{}' in a table cell", marker);
        return Ok(document);
    }

    let target = document
        .paragraphs
        .iter_mut()
        .find(|p| p.text().contains(marker));
    if let Some(paragraph) = target {
        *paragraph = image_paragraph(image);
        debug!("Placed image for '{}' in body text", marker);
        return Ok(document);
    }

    Err(DocfillError::MarkerNotFound(marker.to_string()))
}

/// Check that the bytes decode as a supported raster image
pub fn validate_image(bytes: &[u8]) -> Result<(), DocfillError> {
    image::load_from_memory(bytes)
        .map(|_| ())
        .map_err(|e| DocfillError::ImageInsertion(e.to_string()))
}

fn image_paragraph(image: ImageRun) -> Paragraph {
    Paragraph::new(vec![Segment::Image(image)])
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::document::Table;
    use std::io::Cursor;

    /// Small valid PNG for fixtures
    pub(crate) fn png_bytes() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(4, 2, image::Rgba([20, 20, 160, 255]));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, image::ImageOutputFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    fn write_png(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("signature_image.png");
        fs::write(&path, png_bytes()).unwrap();
        path
    }

    fn signature_document() -> Document {
        Document::new(
            vec![
                Paragraph::from_runs(["Signed by the parties"]),
                Paragraph::from_runs(["<<Signature Image>>"]),
            ],
            vec![Table::from_text([
                ["Name", "Signature"],
                ["Jane Doe", "<<Signature Image>>"],
            ])],
        )
    }

    #[test]
    fn test_table_cell_is_preferred() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(&dir);

        let document = insert_image(signature_document(), "<<Signature Image>>", &path).unwrap();

        assert_eq!(document.image_count(), 1);
        let cell = &document.tables[0].rows[1].cells[1].paragraphs[0];
        let image = cell.images().next().unwrap();
        assert_eq!(image.size_emu(), (1_371_600, 685_800));
        assert_eq!(cell.text(), "");

        // Only one insertion per call: the body marker is untouched
        assert_eq!(document.paragraphs[1].text(), "<<Signature Image>>");
    }

    #[test]
    fn test_falls_back_to_body_paragraphs() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(&dir);
        let document = Document::new(
            vec![
                Paragraph::from_runs(["Intro"]),
                Paragraph::from_runs(["Sign: ", "<<Signature Image>>"]),
            ],
            vec![Table::from_text([["no marker"]])],
        );

        let document = insert_image(document, "<<Signature Image>>", &path).unwrap();

        assert_eq!(document.image_count(), 1);
        assert_eq!(document.paragraphs[1].images().count(), 1);
        assert!(!document.plain_text().contains("<<Signature Image>>"));
    }

    #[test]
    fn test_missing_marker_names_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(&dir);
        let document = Document::new(vec![Paragraph::from_runs(["nothing"])], vec![]);

        let err = insert_image(document, "<<Signature Image>>", &path).unwrap_err();

        assert!(matches!(err, DocfillError::MarkerNotFound(_)));
        assert_eq!(
            err.to_string(),
            "Placeholder '<<Signature Image>>' not found in the document."
        );
    }

    #[test]
    fn test_unreadable_image_is_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.png");

        let err = insert_image(signature_document(), "<<Signature Image>>", &path).unwrap_err();
        assert!(matches!(err, DocfillError::ImageInsertion(_)));
        assert!(err.to_string().starts_with("Error inserting image: "));
    }

    #[test]
    fn test_corrupt_image_is_wrapped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signature_image.png");
        fs::write(&path, b"definitely not a png").unwrap();

        let err = insert_image(signature_document(), "<<Signature Image>>", &path).unwrap_err();
        assert!(matches!(err, DocfillError::ImageInsertion(_)));
    }
}
