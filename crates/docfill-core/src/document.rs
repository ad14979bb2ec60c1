//! Document tree
//!
//! A template is modelled as ordered top-level paragraphs followed by ordered
//! tables (rows of cells, each cell holding its own paragraphs). Paragraphs
//! are lists of immutable segments; edits build new segment lists instead of
//! mutating runs in place. The [`crate::docx`] codec lowers the tree back
//! onto the original file.

/// EMUs per inch (OOXML drawing unit)
pub const EMU_PER_INCH: u32 = 914_400;

/// How a text run's font is resolved when the tree is written back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FontRule {
    /// Keep whatever font and size the source run declared
    #[default]
    Keep,
    /// Drop run-level overrides so the paragraph style's family and size apply
    InheritParagraphStyle,
}

/// A run of uniformly formatted text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    text: String,
    /// Index of the run this segment was read from, `None` for new runs
    source: Option<usize>,
    font: FontRule,
}

impl TextRun {
    /// A run that does not correspond to any run of a source file
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: None,
            font: FontRule::Keep,
        }
    }

    pub(crate) fn from_source(text: impl Into<String>, index: usize) -> Self {
        Self {
            text: text.into(),
            source: Some(index),
            font: FontRule::Keep,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source(&self) -> Option<usize> {
        self.source
    }

    pub fn font(&self) -> FontRule {
        self.font
    }

    /// Same run (same source and font rule) with different text
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: self.source,
            font: self.font,
        }
    }

    pub fn with_font(&self, font: FontRule) -> Self {
        Self {
            font,
            ..self.clone()
        }
    }
}

/// An embedded picture
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRun {
    bytes: Vec<u8>,
    width_emu: u32,
    height_emu: u32,
}

impl ImageRun {
    pub fn new(bytes: Vec<u8>, width_emu: u32, height_emu: u32) -> Self {
        Self {
            bytes,
            width_emu,
            height_emu,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// (width, height) in EMU
    pub fn size_emu(&self) -> (u32, u32) {
        (self.width_emu, self.height_emu)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(TextRun),
    Image(ImageRun),
}

impl Segment {
    pub fn as_text(&self) -> Option<&TextRun> {
        match self {
            Segment::Text(run) => Some(run),
            Segment::Image(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Paragraph {
    segments: Vec<Segment>,
}

impl Paragraph {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Paragraph built from plain text runs
    pub fn from_runs<I, S>(runs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            runs.into_iter()
                .map(|text| Segment::Text(TextRun::new(text)))
                .collect(),
        )
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn text_runs(&self) -> impl Iterator<Item = &TextRun> {
        self.segments.iter().filter_map(Segment::as_text)
    }

    pub fn images(&self) -> impl Iterator<Item = &ImageRun> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Image(image) => Some(image),
            Segment::Text(_) => None,
        })
    }

    /// Concatenated text of all runs
    pub fn text(&self) -> String {
        self.text_runs().map(TextRun::text).collect()
    }

    pub fn run_count(&self) -> usize {
        self.segments.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cell {
    pub paragraphs: Vec<Paragraph>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    pub rows: Vec<Row>,
}

impl Table {
    /// Table of single-paragraph cells, one run per cell
    pub fn from_text<R, C, S>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|cells| Row {
                    cells: cells
                        .into_iter()
                        .map(|text| Cell {
                            paragraphs: vec![Paragraph::from_runs([text])],
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.rows
            .iter()
            .flat_map(|row| row.cells.iter())
            .flat_map(|cell| cell.paragraphs.iter())
    }

    fn paragraphs_mut(&mut self) -> impl Iterator<Item = &mut Paragraph> {
        self.rows
            .iter_mut()
            .flat_map(|row| row.cells.iter_mut())
            .flat_map(|cell| cell.paragraphs.iter_mut())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub paragraphs: Vec<Paragraph>,
    pub tables: Vec<Table>,
}

impl Document {
    pub fn new(paragraphs: Vec<Paragraph>, tables: Vec<Table>) -> Self {
        Self { paragraphs, tables }
    }

    /// Every text-bearing paragraph: top-level first, then table cells.
    /// Tables nested inside cells are not part of the tree.
    pub fn all_paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.paragraphs
            .iter()
            .chain(self.tables.iter().flat_map(|table| table.paragraphs()))
    }

    /// Paragraphs inside table cells, in row/cell order
    pub fn table_paragraphs_mut(&mut self) -> impl Iterator<Item = &mut Paragraph> {
        self.tables.iter_mut().flat_map(|table| table.paragraphs_mut())
    }

    /// Build a new document by transforming every paragraph in traversal order
    pub fn map_paragraphs(&self, mut f: impl FnMut(&Paragraph) -> Paragraph) -> Document {
        Document {
            paragraphs: self.paragraphs.iter().map(&mut f).collect(),
            tables: self
                .tables
                .iter()
                .map(|table| Table {
                    rows: table
                        .rows
                        .iter()
                        .map(|row| Row {
                            cells: row
                                .cells
                                .iter()
                                .map(|cell| Cell {
                                    paragraphs: cell.paragraphs.iter().map(&mut f).collect(),
                                })
                                .collect(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    /// Concatenated text of every paragraph, one line each
    pub fn plain_text(&self) -> String {
        self.all_paragraphs()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn image_count(&self) -> usize {
        self.all_paragraphs().map(|p| p.images().count()).sum()
    }
}
