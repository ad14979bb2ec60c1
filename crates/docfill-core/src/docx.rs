//! `.docx` codec
//!
//! Reading produces a [`Document`] tree whose text runs remember the index of
//! the run they came from. Writing lowers an edited tree back onto the parsed
//! package: unchanged paragraphs are left alone, matched source runs are
//! rewritten in place, runs without a counterpart in the tree are dropped and
//! new runs (including pictures) are appended.
//!
//! Run text is held unescaped everywhere in memory, matching what the reader
//! produces. Tabs and text-wrapping breaks read as `\t` and `\n` and are
//! written back as `w:tab` and `w:br`. Every `w:t` in the package is escaped
//! once, right before serialization.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use docx_rs::{
    read_docx, Break, BreakType, Comment, CommentChild, Delete, DeleteChild, DeleteText,
    DocumentChild, Docx, FooterChild, HeaderChild, InsertChild, MoveFromChild, MoveToChild,
    Paragraph as DocxParagraph, ParagraphChild, Pic, Run, RunChild, StructuredDataTag,
    StructuredDataTagChild, Tab, Table as DocxTable, TableCell as DocxCell, TableCellContent,
    TableChild, TableRow as DocxRow, TableRowChild, Text,
};
use tracing::debug;

use crate::document::{
    Cell, Document, FontRule, ImageRun, Paragraph, Row, Segment, Table, TextRun,
};
use crate::error::DocfillError;

/// A parsed `.docx` package together with its editable tree
pub struct DocxTemplate {
    docx: Docx,
    document: Document,
}

impl DocxTemplate {
    /// Load a template file from disk
    pub fn open(path: &Path) -> Result<Self, DocfillError> {
        let bytes = fs::read(path)?;
        let template = Self::from_bytes(&bytes).map_err(|e| match e {
            DocfillError::DocumentFormat(msg) => {
                DocfillError::DocumentFormat(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;
        debug!(
            "Loaded {} ({} paragraphs, {} tables)",
            path.display(),
            template.document.paragraphs.len(),
            template.document.tables.len()
        );
        Ok(template)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocfillError> {
        let docx = read_docx(bytes)
            .map_err(|e| DocfillError::DocumentFormat(format!("failed to read docx: {}", e)))?;
        let document = read_document(&docx);
        Ok(Self { docx, document })
    }

    /// Write a tree into a fresh package (paragraphs first, then tables)
    pub fn build(document: &Document) -> Self {
        let mut docx = Docx::new();
        for paragraph in &document.paragraphs {
            docx = docx.add_paragraph(build_paragraph(paragraph));
        }
        for table in &document.tables {
            docx = docx.add_table(build_table(table));
        }

        let document = read_document(&docx);
        Self { docx, document }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Replace the editable tree; it must have been derived from this template
    pub fn with_document(self, document: Document) -> Self {
        Self {
            docx: self.docx,
            document,
        }
    }

    /// Lower the tree and serialize the package
    pub fn to_bytes(self) -> Result<Vec<u8>, DocfillError> {
        let mut docx = self.docx;
        lower_document(&mut docx, &self.document);
        escape_package(&mut docx);

        let mut cursor = Cursor::new(Vec::new());
        docx.build()
            .pack(&mut cursor)
            .map_err(|e| DocfillError::DocumentFormat(format!("failed to write docx: {}", e)))?;
        Ok(cursor.into_inner())
    }

    pub fn save(self, path: &Path) -> Result<(), DocfillError> {
        let bytes = self.to_bytes()?;
        fs::write(path, bytes)?;
        debug!("Saved {}", path.display());
        Ok(())
    }
}

// ============================================================
// Reading
// ============================================================

fn read_document(docx: &Docx) -> Document {
    let mut document = Document::default();
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(paragraph) => {
                document.paragraphs.push(read_paragraph(paragraph))
            }
            DocumentChild::Table(table) => document.tables.push(read_table(table)),
            _ => {}
        }
    }
    document
}

fn read_paragraph(paragraph: &DocxParagraph) -> Paragraph {
    let segments = runs(paragraph)
        .enumerate()
        .map(|(index, run)| Segment::Text(TextRun::from_source(run_text(run), index)))
        .collect();
    Paragraph::new(segments)
}

fn read_table(table: &DocxTable) -> Table {
    Table {
        rows: rows(table)
            .map(|row| Row {
                cells: cells(row)
                    .map(|cell| Cell {
                        paragraphs: cell_paragraphs(cell)
                            .map(|p| read_paragraph(p))
                            .collect(),
                    })
                    .collect(),
            })
            .collect(),
    }
}

fn runs(paragraph: &DocxParagraph) -> impl Iterator<Item = &Run> {
    paragraph.children.iter().filter_map(|child| match child {
        ParagraphChild::Run(run) => Some::<&Run>(run),
        _ => None,
    })
}

/// Text of a run with tabs as `\t` and line breaks as `\n`
fn run_text(run: &Run) -> String {
    run.children.iter().filter_map(child_text).collect()
}

fn child_text(child: &RunChild) -> Option<&str> {
    match child {
        RunChild::Text(text) => Some(text.text.as_str()),
        RunChild::Tab(_) => Some("\t"),
        RunChild::Break(br) if *br == Break::new(BreakType::TextWrapping) => Some("\n"),
        RunChild::CarriageReturn(_) => Some("\n"),
        _ => None,
    }
}

fn rows(table: &DocxTable) -> impl Iterator<Item = &DocxRow> {
    table.rows.iter().filter_map(|child| match child {
        TableChild::TableRow(row) => Some(row),
        #[allow(unreachable_patterns)]
        _ => None,
    })
}

fn cells(row: &DocxRow) -> impl Iterator<Item = &DocxCell> {
    row.cells.iter().filter_map(|child| match child {
        TableRowChild::TableCell(cell) => Some(cell),
        #[allow(unreachable_patterns)]
        _ => None,
    })
}

fn cell_paragraphs(cell: &DocxCell) -> impl Iterator<Item = &DocxParagraph> {
    cell.children.iter().filter_map(|child| match child {
        TableCellContent::Paragraph(paragraph) => Some::<&DocxParagraph>(paragraph),
        _ => None,
    })
}

// ============================================================
// Lowering
// ============================================================

fn lower_document(docx: &mut Docx, document: &Document) {
    let mut paragraphs = document.paragraphs.iter();
    let mut tables = document.tables.iter();

    for child in docx.document.children.iter_mut() {
        match child {
            DocumentChild::Paragraph(paragraph) => {
                if let Some(model) = paragraphs.next() {
                    lower_paragraph(paragraph, model);
                }
            }
            DocumentChild::Table(table) => {
                if let Some(model) = tables.next() {
                    lower_table(table, model);
                }
            }
            _ => {}
        }
    }
}

fn lower_table(table: &mut DocxTable, model: &Table) {
    let rows = table.rows.iter_mut().filter_map(|child| match child {
        TableChild::TableRow(row) => Some(row),
        #[allow(unreachable_patterns)]
        _ => None,
    });

    for (row, row_model) in rows.zip(&model.rows) {
        let cells = row.cells.iter_mut().filter_map(|child| match child {
            TableRowChild::TableCell(cell) => Some(cell),
            #[allow(unreachable_patterns)]
            _ => None,
        });

        for (cell, cell_model) in cells.zip(&row_model.cells) {
            let paragraphs = cell.children.iter_mut().filter_map(|child| match child {
                TableCellContent::Paragraph(paragraph) => Some(paragraph),
                _ => None,
            });

            for (paragraph, model) in paragraphs.zip(&cell_model.paragraphs) {
                lower_paragraph(paragraph, model);
            }
        }
    }
}

fn lower_paragraph(paragraph: &mut DocxParagraph, model: &Paragraph) {
    if read_paragraph(paragraph) == *model {
        return;
    }

    let original = std::mem::take(&mut paragraph.children);
    let mut children = Vec::with_capacity(original.len() + 1);
    let mut run_index = 0;

    for child in original {
        match child {
            ParagraphChild::Run(mut run) => {
                let index = run_index;
                run_index += 1;
                if let Some(run_model) = model.text_runs().find(|r| r.source() == Some(index)) {
                    apply_text_run(&mut run, run_model);
                    children.push(ParagraphChild::Run(run));
                }
            }
            other => children.push(other),
        }
    }

    for segment in model.segments() {
        match segment {
            Segment::Text(run) if run.source().is_none() => {
                children.push(ParagraphChild::Run(Box::new(text_run(run.text()))));
            }
            Segment::Image(image) => {
                children.push(ParagraphChild::Run(Box::new(image_run(image))));
            }
            Segment::Text(_) => {}
        }
    }

    paragraph.children = children;
}

fn apply_text_run(run: &mut Run, model: &TextRun) {
    if run_text(run) != model.text() {
        set_run_text(run, model.text());
    }

    if model.font() == FontRule::InheritParagraphStyle {
        run.run_property.fonts = None;
        run.run_property.sz = None;
        run.run_property.sz_cs = None;
    }
}

/// Replace the text-bearing children, at the position of the first one
fn set_run_text(run: &mut Run, text: &str) {
    let first_text = run
        .children
        .iter()
        .position(|child| child_text(child).is_some());
    run.children.retain(|child| child_text(child).is_none());

    let at = first_text.unwrap_or(run.children.len());
    run.children.splice(at..at, text_children(text));
}

/// Split text into `w:t`, `w:tab` and `w:br` children, in order
fn text_children(text: &str) -> Vec<RunChild> {
    let mut children = Vec::new();
    let mut piece = String::new();

    for ch in text.chars() {
        let control = match ch {
            '\t' => RunChild::Tab(Tab::new()),
            '\n' => RunChild::Break(Break::new(BreakType::TextWrapping)),
            _ => {
                piece.push(ch);
                continue;
            }
        };
        if !piece.is_empty() {
            children.push(raw_text(std::mem::take(&mut piece)));
        }
        children.push(control);
    }

    if !piece.is_empty() {
        children.push(raw_text(piece));
    }
    children
}

// Unescaped; `escape_package` escapes it on save
fn raw_text(text: String) -> RunChild {
    RunChild::Text(Text {
        text,
        preserve_space: true,
    })
}

fn text_run(text: &str) -> Run {
    let mut run = Run::new();
    run.children = text_children(text);
    run
}

fn image_run(image: &ImageRun) -> Run {
    let (width, height) = image.size_emu();
    Run::new().add_image(Pic::new(image.bytes()).size(width, height))
}

// ============================================================
// Building
// ============================================================

fn build_paragraph(paragraph: &Paragraph) -> DocxParagraph {
    paragraph
        .segments()
        .iter()
        .fold(DocxParagraph::new(), |p, segment| match segment {
            Segment::Text(run) => p.add_run(text_run(run.text())),
            Segment::Image(image) => p.add_run(image_run(image)),
        })
}

fn build_table(table: &Table) -> DocxTable {
    let rows = table
        .rows
        .iter()
        .map(|row| {
            DocxRow::new(
                row.cells
                    .iter()
                    .map(|cell| {
                        cell.paragraphs
                            .iter()
                            .fold(DocxCell::new(), |c, p| c.add_paragraph(build_paragraph(p)))
                    })
                    .collect(),
            )
        })
        .collect();
    DocxTable::new(rows)
}

// ============================================================
// Escaping
// ============================================================

/// Escape every `w:t` and `w:delText` the writer will emit
fn escape_package(docx: &mut Docx) {
    for child in docx.document.children.iter_mut() {
        match child {
            DocumentChild::Paragraph(paragraph) => escape_paragraph(paragraph),
            DocumentChild::Table(table) => escape_table(table),
            DocumentChild::StructuredDataTag(tag) => escape_tag(tag),
            DocumentChild::CommentStart(start) => escape_comment(&mut start.comment),
            _ => {}
        }
    }

    let section = &mut docx.document.section_property;
    let headers = [
        &mut section.header,
        &mut section.first_header,
        &mut section.even_header,
    ];
    for (_, header) in headers.into_iter().flatten() {
        for child in header.children.iter_mut() {
            match child {
                HeaderChild::Paragraph(paragraph) => escape_paragraph(paragraph),
                HeaderChild::Table(table) => escape_table(table),
                HeaderChild::StructuredDataTag(tag) => escape_tag(tag),
            }
        }
    }

    let footers = [
        &mut section.footer,
        &mut section.first_footer,
        &mut section.even_footer,
    ];
    for (_, footer) in footers.into_iter().flatten() {
        for child in footer.children.iter_mut() {
            match child {
                FooterChild::Paragraph(paragraph) => escape_paragraph(paragraph),
                FooterChild::Table(table) => escape_table(table),
                FooterChild::StructuredDataTag(tag) => escape_tag(tag),
            }
        }
    }
}

fn escape_paragraph(paragraph: &mut DocxParagraph) {
    paragraph
        .children
        .iter_mut()
        .for_each(escape_paragraph_child);
}

fn escape_paragraph_child(child: &mut ParagraphChild) {
    match child {
        ParagraphChild::Run(run) => escape_run(run),
        ParagraphChild::Insert(insert) => {
            for child in insert.children.iter_mut() {
                match child {
                    InsertChild::Run(run) => escape_run(run),
                    InsertChild::Delete(delete) => escape_delete(delete),
                    InsertChild::CommentStart(start) => escape_comment(&mut start.comment),
                    InsertChild::CommentEnd(_) => {}
                }
            }
        }
        ParagraphChild::Delete(delete) => escape_delete(delete),
        ParagraphChild::MoveFrom(moved) => {
            for child in moved.children.iter_mut() {
                match child {
                    MoveFromChild::Run(run) => escape_run(run),
                    MoveFromChild::CommentStart(start) => escape_comment(&mut start.comment),
                    MoveFromChild::CommentEnd(_) => {}
                }
            }
        }
        ParagraphChild::MoveTo(moved) => {
            for child in moved.children.iter_mut() {
                match child {
                    MoveToChild::Run(run) => escape_run(run),
                    MoveToChild::Delete(delete) => escape_delete(delete),
                    MoveToChild::CommentStart(start) => escape_comment(&mut start.comment),
                    MoveToChild::CommentEnd(_) => {}
                }
            }
        }
        ParagraphChild::Hyperlink(link) => {
            link.children.iter_mut().for_each(escape_paragraph_child)
        }
        ParagraphChild::CommentStart(start) => escape_comment(&mut start.comment),
        ParagraphChild::StructuredDataTag(tag) => escape_tag(tag),
        _ => {}
    }
}

fn escape_delete(delete: &mut Delete) {
    for child in delete.children.iter_mut() {
        match child {
            DeleteChild::Run(run) => escape_run(run),
            DeleteChild::CommentStart(start) => escape_comment(&mut start.comment),
            DeleteChild::CommentEnd(_) => {}
        }
    }
}

fn escape_table(table: &mut DocxTable) {
    for row in table.rows.iter_mut() {
        let TableChild::TableRow(row) = row;
        for cell in row.cells.iter_mut() {
            let TableRowChild::TableCell(cell) = cell;
            for content in cell.children.iter_mut() {
                match content {
                    TableCellContent::Paragraph(paragraph) => escape_paragraph(paragraph),
                    TableCellContent::Table(table) => escape_table(table),
                    TableCellContent::StructuredDataTag(tag) => escape_tag(tag),
                    TableCellContent::TableOfContents(_) => {}
                }
            }
        }
    }
}

fn escape_tag(tag: &mut StructuredDataTag) {
    for child in tag.children.iter_mut() {
        match child {
            StructuredDataTagChild::Run(run) => escape_run(run),
            StructuredDataTagChild::Paragraph(paragraph) => escape_paragraph(paragraph),
            StructuredDataTagChild::Table(table) => escape_table(table),
            StructuredDataTagChild::CommentStart(start) => escape_comment(&mut start.comment),
            StructuredDataTagChild::StructuredDataTag(tag) => escape_tag(tag),
            _ => {}
        }
    }
}

fn escape_comment(comment: &mut Comment) {
    for child in comment.children.iter_mut() {
        match child {
            CommentChild::Paragraph(paragraph) => escape_paragraph(paragraph),
            CommentChild::Table(table) => escape_table(table),
        }
    }
}

fn escape_run(run: &mut Run) {
    for child in run.children.iter_mut() {
        match child {
            RunChild::Text(text) => {
                text.text = Text::new(std::mem::take(&mut text.text)).text;
            }
            RunChild::DeleteText(deleted) => {
                if let Some(escaped) = escaped_delete_text(deleted) {
                    *deleted = escaped;
                }
            }
            RunChild::CommentStart(start) => escape_comment(&mut start.comment),
            _ => {}
        }
    }
}

// `DeleteText` keeps its text private; its serde form exposes it
fn escaped_delete_text(deleted: &DeleteText) -> Option<DeleteText> {
    let value = serde_json::to_value(deleted).ok()?;
    value.get("text")?.as_str().map(|text| DeleteText::new(text))
}
