//! Pluggable grid decoration.
//!
//! A look owns everything about a grid's appearance that is not cell
//! content: margins, spacing, and the border decoration painted behind each
//! page. The layouter treats the metrics as opaque additive constants.

use quire_library::canvas::{Canvas, PaintItem};
use quire_library::fragment::CompositeFragment;
use quire_library::geom::{Abs, Axes, Point, Sides, Size};
use quire_library::grid::{Gap, GridMetrics, GridSection};
use quire_library::protocol::{Fragment, LayoutContext};

/// The horizontal extent of one laid-out column on a grid page.
#[derive(Debug, Copy, Clone)]
pub struct ColumnBand {
    /// The offset of the column's content from the fragment's left edge.
    pub x: Abs,
    /// The content width.
    pub width: Abs,
}

/// The vertical extent of one laid-out row on a grid page.
#[derive(Debug, Copy, Clone)]
pub struct RowBand {
    /// The offset of the row's content from the fragment's top edge.
    pub y: Abs,
    /// The content height.
    pub height: Abs,
    /// The section the row belongs to.
    pub section: GridSection,
}

/// Everything a look needs to know to decorate one page of a grid.
#[derive(Debug, Clone)]
pub struct GridPage {
    /// The overall size of the page's grid fragment.
    pub size: Size,
    /// The column bands, left to right.
    pub columns: Vec<ColumnBand>,
    /// The row bands on this page, top to bottom across all sections.
    pub rows: Vec<RowBand>,
    /// Whether the top edge continues a row split on the previous page.
    pub top_open: bool,
    /// Whether the bottom edge is continued on the next page.
    pub bottom_open: bool,
}

/// The pluggable appearance of a grid.
pub trait GridLook {
    /// The margin and spacing metrics, in device pixels.
    fn metrics(&self, ctx: &LayoutContext) -> GridMetrics;

    /// The decoration painted behind one page of the grid.
    fn decorate(&self, ctx: &LayoutContext, page: &GridPage) -> Box<dyn Fragment>;
}

/// A look with no decoration and no spacing.
#[derive(Debug, Default, Copy, Clone)]
pub struct PlainLook;

impl GridLook for PlainLook {
    fn metrics(&self, _: &LayoutContext) -> GridMetrics {
        GridMetrics::default()
    }

    fn decorate(&self, _: &LayoutContext, page: &GridPage) -> Box<dyn Fragment> {
        Box::new(CompositeFragment::with_size(page.size))
    }
}

/// A look that draws solid rules around and between the cells.
///
/// Both the rule thickness and the padding between a rule and the adjacent
/// cell content are given in points. An open edge gets padding but no rule,
/// which is what marks the continuation visually.
#[derive(Debug, Copy, Clone)]
pub struct LineLook {
    line: Abs,
    padding: Abs,
}

impl LineLook {
    /// Create a look from a rule thickness and a padding, in points.
    pub fn new(line: Abs, padding: Abs) -> Self {
        Self { line, padding }
    }
}

impl GridLook for LineLook {
    fn metrics(&self, ctx: &LayoutContext) -> GridMetrics {
        let edge = self.line + self.padding;
        let between = self.line + 2.0 * self.padding;
        GridMetrics {
            insets: Sides::new(
                ctx.resolve_x(edge),
                ctx.resolve_y(edge),
                ctx.resolve_x(edge),
                ctx.resolve_y(edge),
            ),
            spacing: Axes::new(ctx.resolve_x(between), ctx.resolve_y(between)),
            header_gap: Gap::new(
                ctx.resolve_y(between),
                ctx.resolve_y(2.0 * self.padding),
            ),
            footer_gap: Gap::new(
                ctx.resolve_y(between),
                ctx.resolve_y(2.0 * self.padding),
            ),
        }
    }

    fn decorate(&self, ctx: &LayoutContext, page: &GridPage) -> Box<dyn Fragment> {
        let line_w = ctx.resolve_x(self.line);
        let line_h = ctx.resolve_y(self.line);
        let pad_y = ctx.resolve_y(self.padding);
        let vertical = Size::new(line_w, page.size.y);
        let horizontal = Size::new(page.size.x, line_h);

        let mut deco = CompositeFragment::with_size(page.size);
        deco.push(Point::zero(), Box::new(RuleFragment(vertical)));
        deco.push(
            Point::with_x(page.size.x - line_w),
            Box::new(RuleFragment(vertical)),
        );

        // A separator sits centered in each inter-column gap.
        for pair in page.columns.windows(2) {
            let x = (pair[0].x + pair[0].width + pair[1].x - line_w) / 2.0;
            deco.push(Point::with_x(x), Box::new(RuleFragment(vertical)));
        }

        // An open horizontal edge continues on another page and gets no rule.
        if !page.top_open {
            deco.push(Point::zero(), Box::new(RuleFragment(horizontal)));
        }
        if !page.bottom_open {
            deco.push(
                Point::with_y(page.size.y - line_h),
                Box::new(RuleFragment(horizontal)),
            );
        }

        // Separators between rows. A gap narrower than the closed extent
        // marks a section transition at an open edge, which gets no rule.
        let closed = line_h + 2.0 * pad_y;
        for pair in page.rows.windows(2) {
            let start = pair[0].y + pair[0].height;
            let gap = pair[1].y - start;
            if gap.fits(closed) {
                deco.push(Point::with_y(start + pad_y), Box::new(RuleFragment(horizontal)));
            }
        }

        Box::new(deco)
    }
}

/// Paints a solid rectangle.
struct RuleFragment(Size);

impl Fragment for RuleFragment {
    fn size(&self) -> Size {
        self.0
    }

    fn paint(&self, canvas: &mut dyn Canvas, origin: Point) {
        canvas.push(origin, PaintItem::Rule(self.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(top_open: bool, bottom_open: bool) -> GridPage {
        GridPage {
            size: Size::new(Abs::raw(100.0), Abs::raw(60.0)),
            columns: vec![
                ColumnBand { x: Abs::raw(3.0), width: Abs::raw(44.0) },
                ColumnBand { x: Abs::raw(53.0), width: Abs::raw(44.0) },
            ],
            rows: vec![
                RowBand {
                    y: Abs::raw(3.0),
                    height: Abs::raw(24.0),
                    section: GridSection::Body,
                },
                RowBand {
                    y: Abs::raw(33.0),
                    height: Abs::raw(24.0),
                    section: GridSection::Body,
                },
            ],
            top_open,
            bottom_open,
        }
    }

    fn count(page: &GridPage) -> usize {
        let look = LineLook::new(Abs::pt(2.0), Abs::pt(2.0));
        let ctx = LayoutContext::uniform(72.0);
        let deco = look.decorate(&ctx, page);
        let mut list = quire_library::canvas::DisplayList::new(page.size);
        deco.paint(&mut list, Point::zero());
        let count = list.items().len();
        count
    }

    #[test]
    fn test_closed_page_draws_full_frame() {
        // Two outer verticals, one column separator, two outer
        // horizontals, one row separator.
        assert_eq!(count(&page(false, false)), 6);
    }

    #[test]
    fn test_open_edges_drop_their_rules() {
        assert_eq!(count(&page(true, true)), 4);
    }

    #[test]
    fn test_metrics_resolve_against_the_device() {
        let look = LineLook::new(Abs::pt(1.0), Abs::pt(2.0));
        let metrics = look.metrics(&LayoutContext::uniform(144.0));
        assert_eq!(metrics.insets.left, Abs::raw(6.0));
        assert_eq!(metrics.spacing.y, Abs::raw(10.0));
        assert_eq!(metrics.header_gap.closed, Abs::raw(10.0));
        assert_eq!(metrics.header_gap.open, Abs::raw(8.0));
    }
}
