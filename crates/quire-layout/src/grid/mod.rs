//! The grid layouter.
//!
//! Paginates a [`Grid`] model: column widths are negotiated once per
//! cursor, then each `next` call lays out the repeated header, as many
//! body rows as fit, and the repeated footer, decorated by the grid's
//! [`GridLook`].

mod look;
mod sizing;

pub use self::look::{ColumnBand, GridLook, GridPage, LineLook, PlainLook, RowBand};

use std::sync::Arc;

use once_cell::unsync::OnceCell;
use smallvec::SmallVec;
use tracing::{debug, trace};

use quire_library::diag::{bail, LayoutResult};
use quire_library::fragment::CompositeFragment;
use quire_library::geom::{Abs, Point, Size};
use quire_library::grid::{Grid, GridColumn, GridMetrics, GridSection, Row};
use quire_library::protocol::{Cursor, Element, Fragment, LayoutContext, Layouted};

use crate::compose::advance;
use self::sizing::{Strategy, WidthTables};

/// The cursors of one row's cells, in cell order.
type RowCursors = SmallVec<[Box<dyn Cursor>; 4]>;

/// A grid as a document element.
pub struct GridElement {
    grid: Arc<Grid>,
    look: Arc<dyn GridLook>,
}

impl GridElement {
    /// Create a grid element with the given look.
    pub fn new(grid: Arc<Grid>, look: Arc<dyn GridLook>) -> Self {
        Self { grid, look }
    }

    /// Create a grid element without decoration.
    pub fn plain(grid: Arc<Grid>) -> Self {
        Self::new(grid, Arc::new(PlainLook))
    }
}

impl Element for GridElement {
    fn cursor(&self, ctx: &LayoutContext) -> Box<dyn Cursor> {
        Box::new(GridCursor::new(self.grid.clone(), self.look.clone(), *ctx))
    }
}

/// One pagination run over a grid.
///
/// The position is the index of the next body row plus, for a row split
/// across pages, the live cursors of its cells. Header and footer rows are
/// re-rendered from fresh cursors on every page.
struct GridCursor {
    grid: Arc<Grid>,
    look: Arc<dyn GridLook>,
    ctx: LayoutContext,
    metrics: GridMetrics,
    tables: OnceCell<WidthTables>,
    min_size: OnceCell<Size>,
    pref_size: OnceCell<Size>,
    /// The next body row to lay out.
    row: usize,
    /// The live cell cursors of a row that was split across a page break.
    active: Option<RowCursors>,
    done: bool,
}

impl GridCursor {
    fn new(grid: Arc<Grid>, look: Arc<dyn GridLook>, ctx: LayoutContext) -> Self {
        let metrics = look.metrics(&ctx);
        let done = grid.body().is_empty();
        Self {
            grid,
            look,
            ctx,
            metrics,
            tables: OnceCell::new(),
            min_size: OnceCell::new(),
            pref_size: OnceCell::new(),
            row: 0,
            active: None,
            done,
        }
    }

    fn tables(&self) -> &WidthTables {
        self.tables.get_or_init(|| {
            WidthTables::compute(&self.grid, &self.ctx, self.metrics.spacing.x)
        })
    }

    fn row_cursors(&self, row: &Row) -> RowCursors {
        row.cells
            .iter()
            .map(|placed| placed.cell.element.cursor(&self.ctx))
            .collect()
    }

    /// The fixed horizontal chrome: insets plus inter-column spacing.
    fn chrome_width(&self) -> Abs {
        self.metrics.insets.sum_by_axis().x
            + self.metrics.spacing.x * self.grid.col_count().saturating_sub(1) as f64
    }

    /// The natural height of one row: the tallest of its cells.
    fn row_height(&self, row: &Row, strategy: Strategy) -> Abs {
        row.cells
            .iter()
            .map(|placed| {
                let cursor = placed.cell.element.cursor(&self.ctx);
                match strategy {
                    Strategy::Minimum => cursor.minimum().y,
                    Strategy::Preferred => cursor.preferred().y,
                }
            })
            .max()
            .unwrap_or_default()
    }

    fn section_extent(&self, rows: &[Row], strategy: Strategy) -> Abs {
        let heights: Abs = rows.iter().map(|row| self.row_height(row, strategy)).sum();
        heights + self.metrics.spacing.y * rows.len().saturating_sub(1) as f64
    }

    /// Insets, repeated sections and gaps stacked around a body extent.
    fn chrome_height(&self, body: Abs, strategy: Strategy) -> Abs {
        let mut height = self.metrics.insets.sum_by_axis().y + body;
        if !self.grid.header().is_empty() {
            height += self.section_extent(self.grid.header(), strategy)
                + self.metrics.header_gap.closed;
        }
        if !self.grid.footer().is_empty() {
            height += self.section_extent(self.grid.footer(), strategy)
                + self.metrics.footer_gap.closed;
        }
        height
    }
}

impl Cursor for GridCursor {
    fn minimum(&self) -> Size {
        *self.min_size.get_or_init(|| {
            let width = self.chrome_width() + self.tables().minimum.iter().sum::<Abs>();

            // Granted as many pages as it needs, the tallest single body
            // row bounds the height one page must offer.
            let tallest = self
                .grid
                .body()
                .iter()
                .map(|row| self.row_height(row, Strategy::Minimum))
                .max()
                .unwrap_or_default();
            Size::new(width, self.chrome_height(tallest, Strategy::Minimum))
        })
    }

    fn preferred(&self) -> Size {
        *self.pref_size.get_or_init(|| {
            let width = self.chrome_width() + self.tables().preferred.iter().sum::<Abs>();
            let body = self.section_extent(self.grid.body(), Strategy::Preferred);
            Size::new(width, self.chrome_height(body, Strategy::Preferred))
        })
    }

    fn has_next(&self) -> bool {
        !self.done
    }

    fn next(&mut self, area: Size) -> LayoutResult<Layouted> {
        if self.done {
            bail!("the cursor is exhausted");
        }

        let metrics = self.metrics;
        let insets = metrics.insets;
        let columns = self.grid.columns();

        let content_width = (area.x - self.chrome_width()).max(Abs::zero());
        let tables = self.tables();
        let widths =
            sizing::resolve_widths(columns, &tables.minimum, &tables.preferred, content_width);

        let mut offsets = Vec::with_capacity(widths.len());
        let mut x = insets.left;
        for &width in &widths {
            offsets.push(x);
            x += width + metrics.spacing.x;
        }
        let content_end = offsets
            .last()
            .zip(widths.last())
            .map(|(&offset, &width)| offset + width)
            .unwrap_or(insets.left);
        let frame = RowFrame {
            columns,
            widths: &widths,
            offsets: &offsets,
            spacing: metrics.spacing.x,
            width: content_end,
        };

        let top_open = self.active.is_some();
        let content_height = (area.y - insets.sum_by_axis().y).max(Abs::zero());

        // The header must fit whole, from fresh cursors, on every page.
        let mut header = Vec::new();
        let mut header_used = Abs::zero();
        for row in self.grid.header() {
            if !header.is_empty() {
                header_used += metrics.spacing.y;
            }
            let remaining = (content_height - header_used).max(Abs::zero());
            let mut cursors = self.row_cursors(row);
            let Some(layout) = layout_row(row, &mut cursors, &frame, remaining, true)? else {
                trace!("header does not fit, giving up on this area");
                return Ok(Layouted::DoesNotFit);
            };
            header_used += layout.height;
            header.push(layout);
        }

        let mut after_header = content_height - header_used;
        if !self.grid.header().is_empty() {
            after_header -= metrics.header_gap.select(top_open);
        }

        // Same for the footer.
        let mut footer = Vec::new();
        let mut footer_used = Abs::zero();
        for row in self.grid.footer() {
            if !footer.is_empty() {
                footer_used += metrics.spacing.y;
            }
            let remaining = (after_header - footer_used).max(Abs::zero());
            let mut cursors = self.row_cursors(row);
            let Some(layout) = layout_row(row, &mut cursors, &frame, remaining, true)? else {
                trace!("footer does not fit, giving up on this area");
                return Ok(Layouted::DoesNotFit);
            };
            footer_used += layout.height;
            footer.push(layout);
        }

        // The bottom gap's extent is only known once we know whether the
        // page ends in a split row, so reserve for the worse case.
        let mut body_budget = after_header - footer_used;
        if !self.grid.footer().is_empty() {
            body_budget -= metrics.footer_gap.closed.max(metrics.footer_gap.open);
        }

        // Fill the page with body rows: each row gets a closed attempt
        // first and an open retry on failure. An open row ends the page.
        let mut body = Vec::new();
        let mut body_used = Abs::zero();
        let mut row = self.row;
        let mut active_out: Option<RowCursors> = None;

        while row < self.grid.body().len() {
            let grid_row = &self.grid.body()[row];
            let spacing_before =
                if body.is_empty() { Abs::zero() } else { metrics.spacing.y };
            let remaining = (body_budget - body_used - spacing_before).max(Abs::zero());

            let base: RowCursors = match &self.active {
                Some(active) if row == self.row => {
                    active.iter().map(|cursor| cursor.snapshot()).collect()
                }
                _ => self.row_cursors(grid_row),
            };

            let mut attempt: RowCursors =
                base.iter().map(|cursor| cursor.snapshot()).collect();
            if let Some(layout) = layout_row(grid_row, &mut attempt, &frame, remaining, true)? {
                body_used += spacing_before + layout.height;
                body.push(layout);
                row += 1;
                continue;
            }

            trace!(row, "row does not fit closed, retrying open");
            let mut attempt = base;
            if let Some(layout) = layout_row(grid_row, &mut attempt, &frame, remaining, false)? {
                body_used += spacing_before + layout.height;
                body.push(layout);
                if attempt.iter().any(|cursor| cursor.has_next()) {
                    active_out = Some(attempt);
                } else {
                    row += 1;
                }
            }
            break;
        }

        if body.is_empty() {
            return Ok(Layouted::DoesNotFit);
        }

        // Stack the sections and record the bands for the look.
        let bottom_open = active_out.is_some();
        let mut bands = Vec::new();
        let mut placed = Vec::new();
        let mut y = insets.top;

        stack_rows(header, GridSection::Header, metrics.spacing.y, &mut y, &mut bands, &mut placed);
        if !self.grid.header().is_empty() {
            y += metrics.header_gap.select(top_open);
        }
        stack_rows(body, GridSection::Body, metrics.spacing.y, &mut y, &mut bands, &mut placed);
        if !self.grid.footer().is_empty() {
            y += metrics.footer_gap.select(bottom_open);
        }
        stack_rows(footer, GridSection::Footer, metrics.spacing.y, &mut y, &mut bands, &mut placed);

        let size = Size::new(content_end + insets.right, y + insets.bottom);
        if !area.fits(size) {
            return Ok(Layouted::DoesNotFit);
        }

        let page = GridPage {
            size,
            columns: widths
                .iter()
                .zip(&offsets)
                .map(|(&width, &x)| ColumnBand { x, width })
                .collect(),
            rows: bands,
            top_open,
            bottom_open,
        };

        let mut composite = CompositeFragment::with_size(size);
        composite.push(Point::zero(), self.look.decorate(&self.ctx, &page));
        for (y, fragment) in placed {
            composite.push(Point::with_y(y), Box::new(fragment));
        }

        self.row = row;
        self.active = active_out;
        self.done = self.row == self.grid.body().len() && self.active.is_none();
        debug!(next_row = self.row, open = bottom_open, "grid page laid out");
        Ok(Layouted::Fits(Box::new(composite)))
    }

    fn snapshot(&self) -> Box<dyn Cursor> {
        Box::new(Self {
            grid: self.grid.clone(),
            look: self.look.clone(),
            ctx: self.ctx,
            metrics: self.metrics,
            tables: self.tables.clone(),
            min_size: self.min_size.clone(),
            pref_size: self.pref_size.clone(),
            row: self.row,
            active: self
                .active
                .as_ref()
                .map(|cursors| cursors.iter().map(|cursor| cursor.snapshot()).collect()),
            done: self.done,
        })
    }
}

/// The resolved horizontal geometry of one page attempt.
struct RowFrame<'a> {
    columns: &'a [GridColumn],
    widths: &'a [Abs],
    offsets: &'a [Abs],
    spacing: Abs,
    /// The x coordinate where the last column's content ends.
    width: Abs,
}

impl RowFrame<'_> {
    fn cell_width(&self, col: usize, span: usize) -> Abs {
        self.widths[col..col + span].iter().sum::<Abs>()
            + self.spacing * (span - 1) as f64
    }
}

/// One successfully laid-out row.
struct RowLayout {
    fragment: CompositeFragment,
    height: Abs,
}

/// Lay out one row's cells in two passes.
///
/// Pass one lays out the non-fill cells at the open height and fixes the
/// row height from their fragments and the fill cells' minimums; pass two
/// lays out the fill cells at exactly that height, requiring full
/// consumption. With a closed bottom edge, pass one also requires full
/// consumption. `Ok(None)` means the row cannot be laid out in this area;
/// the caller owns the cursors and discards them on failure.
fn layout_row(
    row: &Row,
    cursors: &mut RowCursors,
    frame: &RowFrame,
    max_height: Abs,
    closed: bool,
) -> LayoutResult<Option<RowLayout>> {
    let mut fragments: SmallVec<[Option<Box<dyn Fragment>>; 4]> = SmallVec::new();
    let mut height = Abs::zero();

    for (placed, cursor) in row.cells.iter().zip(cursors.iter_mut()) {
        if placed.valign().is_fill() {
            if cursor.has_next() {
                height.set_max(cursor.minimum().y);
            }
            fragments.push(None);
            continue;
        }
        if !cursor.has_next() {
            fragments.push(None);
            continue;
        }

        let width = frame.cell_width(placed.col, placed.span);
        match advance(cursor.as_mut(), Size::new(width, max_height))? {
            Layouted::Fits(fragment) => {
                if closed && cursor.has_next() {
                    return Ok(None);
                }
                height.set_max(fragment.size().y);
                fragments.push(Some(fragment));
            }
            Layouted::DoesNotFit => return Ok(None),
        }
    }

    if !max_height.fits(height) {
        return Ok(None);
    }

    for ((placed, cursor), slot) in
        row.cells.iter().zip(cursors.iter_mut()).zip(fragments.iter_mut())
    {
        if !placed.valign().is_fill() || !cursor.has_next() {
            continue;
        }
        let width = frame.cell_width(placed.col, placed.span);
        match advance(cursor.as_mut(), Size::new(width, height))? {
            Layouted::Fits(fragment) if !cursor.has_next() => *slot = Some(fragment),
            _ => return Ok(None),
        }
    }

    let mut composite = CompositeFragment::with_size(Size::new(frame.width, height));
    for (placed, fragment) in row.cells.iter().zip(fragments) {
        let Some(fragment) = fragment else { continue };
        let width = frame.cell_width(placed.col, placed.span);
        let size = fragment.size();
        let x = frame.offsets[placed.col]
            + placed.halign(frame.columns).position(width - size.x);
        let y = placed.valign().position(height - size.y);
        composite.push(Point::new(x, y), fragment);
    }

    Ok(Some(RowLayout { fragment: composite, height }))
}

fn stack_rows(
    rows: Vec<RowLayout>,
    section: GridSection,
    spacing: Abs,
    y: &mut Abs,
    bands: &mut Vec<RowBand>,
    placed: &mut Vec<(Abs, CompositeFragment)>,
) {
    for (pos, layout) in rows.into_iter().enumerate() {
        if pos > 0 {
            *y += spacing;
        }
        let RowLayout { fragment, height } = layout;
        bands.push(RowBand { y: *y, height, section });
        placed.push((*y, fragment));
        *y += height;
    }
}
