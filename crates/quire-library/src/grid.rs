//! The tabular document model.
//!
//! This module only describes a grid: its columns, cells, sections and
//! column groups, plus the metric data a grid look hands to the layouter.
//! The sizing and pagination algorithms live in the layout crate.

use std::num::NonZeroUsize;
use std::sync::Arc;

use quire_utils::NonZeroExt;

use crate::diag::{bail, LayoutResult};
use crate::geom::{Abs, Axes, CellAlign, Fr, Sides, Smart};
use crate::protocol::Element;

/// How a column's width is determined.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub enum ColumnSize {
    /// A fixed width in points, resolved against the horizontal resolution.
    Explicit(Abs),
    /// The column is as wide as its widest cell prefers to be.
    Preferred,
    /// The column shares whatever space the grid's width resolution grants
    /// it, shrinking first when space is tight.
    #[default]
    Default,
}

/// A column of a grid.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct GridColumn {
    /// How the column's width is determined.
    pub size: ColumnSize,
    /// The default horizontal alignment for cells in this column.
    pub align: CellAlign,
    /// The column's share when extra width is distributed.
    pub weight: Fr,
}

impl GridColumn {
    /// Create a column with the given sizing behavior.
    pub fn new(size: ColumnSize) -> Self {
        Self { size, align: CellAlign::Start, weight: Fr::zero() }
    }

    /// Create a column with a fixed width in points.
    pub fn explicit(pt: f64) -> Self {
        Self::new(ColumnSize::Explicit(Abs::pt(pt)))
    }

    /// Builder-style setter for the default alignment.
    pub fn with_align(mut self, align: CellAlign) -> Self {
        self.align = align;
        self
    }

    /// Builder-style setter for the expansion weight.
    pub fn with_weight(mut self, weight: Fr) -> Self {
        self.weight = weight;
        self
    }
}

/// How many columns a cell covers.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Span {
    /// A fixed number of columns.
    Columns(NonZeroUsize),
    /// All columns that remain in the row.
    Remainder,
}

/// A cell of a grid.
#[derive(Clone)]
pub struct Cell {
    /// The content of the cell.
    pub element: Arc<dyn Element>,
    /// Horizontal alignment; `Auto` inherits the column's alignment.
    pub halign: Smart<CellAlign>,
    /// Vertical alignment; `Auto` aligns at the top.
    pub valign: Smart<CellAlign>,
    /// How many columns the cell covers.
    pub span: Span,
}

impl Cell {
    /// Create a single-column cell with inherited alignment.
    pub fn new(element: Arc<dyn Element>) -> Self {
        Self {
            element,
            halign: Smart::Auto,
            valign: Smart::Auto,
            span: Span::Columns(NonZeroUsize::ONE),
        }
    }

    /// Builder-style setter for the column span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Builder-style setter for the horizontal alignment.
    pub fn with_halign(mut self, halign: CellAlign) -> Self {
        self.halign = Smart::Custom(halign);
        self
    }

    /// Builder-style setter for the vertical alignment.
    pub fn with_valign(mut self, valign: CellAlign) -> Self {
        self.valign = Smart::Custom(valign);
        self
    }
}

/// A cell whose position within its row has been resolved.
#[derive(Clone)]
pub struct PlacedCell {
    /// The cell itself.
    pub cell: Cell,
    /// The index of the leftmost column the cell covers.
    pub col: usize,
    /// How many columns the cell covers. At least one, and never past the
    /// end of the row.
    pub span: usize,
}

impl PlacedCell {
    /// The horizontal alignment, with the column default applied.
    pub fn halign(&self, columns: &[GridColumn]) -> CellAlign {
        self.cell.halign.unwrap_or(columns[self.col].align)
    }

    /// The vertical alignment. `Auto` is top-aligned.
    pub fn valign(&self) -> CellAlign {
        self.cell.valign.unwrap_or(CellAlign::Start)
    }
}

/// One complete row of placed cells.
#[derive(Clone, Default)]
pub struct Row {
    /// The cells, in ascending column order.
    pub cells: Vec<PlacedCell>,
}

/// The sections a grid row can belong to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum GridSection {
    /// Repeated at the top of every page the grid occupies.
    Header,
    /// Paginated across pages.
    Body,
    /// Repeated at the bottom of every page the grid occupies.
    Footer,
}

/// A complete, validated grid.
///
/// Constructed through a [`GridBuilder`]; all structural invariants (spans
/// within bounds, only complete rows, valid groups) hold by construction.
#[derive(Clone)]
pub struct Grid {
    columns: Vec<GridColumn>,
    groups: Vec<Vec<usize>>,
    header: Vec<Row>,
    body: Vec<Row>,
    footer: Vec<Row>,
}

impl Grid {
    /// Start building a grid with the given columns.
    pub fn builder(columns: Vec<GridColumn>) -> GridBuilder {
        GridBuilder::new(columns)
    }

    /// The grid's columns.
    pub fn columns(&self) -> &[GridColumn] {
        &self.columns
    }

    /// The number of columns.
    pub fn col_count(&self) -> usize {
        self.columns.len()
    }

    /// The column groups. Disjoint sets of column indices that are
    /// constrained to share one width.
    pub fn groups(&self) -> &[Vec<usize>] {
        &self.groups
    }

    /// The header rows, repeated on every page.
    pub fn header(&self) -> &[Row] {
        &self.header
    }

    /// The body rows.
    pub fn body(&self) -> &[Row] {
        &self.body
    }

    /// The footer rows, repeated on every page.
    pub fn footer(&self) -> &[Row] {
        &self.footer
    }

    /// All rows of all sections, header first.
    pub fn all_rows(&self) -> impl Iterator<Item = &Row> {
        self.header.iter().chain(&self.body).chain(&self.footer)
    }
}

/// Assembles a [`Grid`] cell by cell.
///
/// Cells fill the current row of their section left to right; the row
/// closes implicitly once its spans cover all columns.
pub struct GridBuilder {
    columns: Vec<GridColumn>,
    groups: Vec<Vec<usize>>,
    header: Vec<Row>,
    body: Vec<Row>,
    footer: Vec<Row>,
    open_header: Row,
    open_body: Row,
    open_footer: Row,
}

impl GridBuilder {
    /// Start building a grid with the given columns.
    pub fn new(columns: Vec<GridColumn>) -> Self {
        Self {
            columns,
            groups: vec![],
            header: vec![],
            body: vec![],
            footer: vec![],
            open_header: Row::default(),
            open_body: Row::default(),
            open_footer: Row::default(),
        }
    }

    /// Constrain the given columns to share one width.
    ///
    /// A column may belong to at most one group.
    pub fn group(&mut self, columns: &[usize]) -> LayoutResult<()> {
        for &index in columns {
            if index >= self.columns.len() {
                bail!("group references column {index}, but the grid has only {} columns", self.columns.len());
            }
            if self.groups.iter().flatten().any(|&taken| taken == index) {
                bail!("column {index} is already part of a group");
            }
        }
        self.groups.push(columns.to_vec());
        Ok(())
    }

    /// Add a cell to the header section.
    pub fn push_header(&mut self, cell: Cell) -> LayoutResult<()> {
        self.place(GridSection::Header, cell)
    }

    /// Add a cell to the body section.
    pub fn push(&mut self, cell: Cell) -> LayoutResult<()> {
        self.place(GridSection::Body, cell)
    }

    /// Add a cell to the footer section.
    pub fn push_footer(&mut self, cell: Cell) -> LayoutResult<()> {
        self.place(GridSection::Footer, cell)
    }

    fn place(&mut self, section: GridSection, cell: Cell) -> LayoutResult<()> {
        let cols = self.columns.len();
        let (open, closed) = match section {
            GridSection::Header => (&mut self.open_header, &mut self.header),
            GridSection::Body => (&mut self.open_body, &mut self.body),
            GridSection::Footer => (&mut self.open_footer, &mut self.footer),
        };

        let start = open.cells.last().map_or(0, |placed| placed.col + placed.span);
        let remaining = cols - start;
        let span = match cell.span {
            Span::Columns(n) => {
                if n.get() > remaining {
                    bail!("cell spans {} columns, but only {remaining} remain in the row", n.get());
                }
                n.get()
            }
            Span::Remainder => remaining,
        };

        open.cells.push(PlacedCell { cell, col: start, span });
        if start + span == cols {
            closed.push(std::mem::take(open));
        }
        Ok(())
    }

    /// Finish building.
    ///
    /// Fails if any section has a partially filled row.
    pub fn build(self) -> LayoutResult<Grid> {
        for (open, name) in [
            (&self.open_header, "header"),
            (&self.open_body, "body"),
            (&self.open_footer, "footer"),
        ] {
            if !open.cells.is_empty() {
                bail!("the last {name} row is incomplete");
            }
        }

        Ok(Grid {
            columns: self.columns,
            groups: self.groups,
            header: self.header,
            body: self.body,
            footer: self.footer,
        })
    }
}

/// Spacing and border metrics a grid look hands to the layouter.
///
/// All lengths are in device pixels.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct GridMetrics {
    /// Space between the grid's outer border and the cells.
    pub insets: Sides<Abs>,
    /// Space between adjacent columns (`x`) and adjacent rows (`y`).
    pub spacing: Axes<Abs>,
    /// Space between the header and the first body row.
    pub header_gap: Gap,
    /// Space between the last body row and the footer.
    pub footer_gap: Gap,
}

/// A vertical gap whose extent depends on whether the adjacent grid edge is
/// open (the bordered content continues on another page) or closed.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Gap {
    /// The gap at a closed edge.
    pub closed: Abs,
    /// The gap at an open edge.
    pub open: Abs,
}

impl Gap {
    /// Create a gap from its two extents.
    pub const fn new(closed: Abs, open: Abs) -> Self {
        Self { closed, open }
    }

    /// Select the extent for the given edge state.
    pub fn select(self, open: bool) -> Abs {
        if open { self.open } else { self.closed }
    }
}
