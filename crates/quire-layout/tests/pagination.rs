//! End-to-end pagination scenarios.

use std::sync::Arc;

use quire_library::canvas::{DisplayList, PaintItem};
use quire_library::diag::ErrorKind;
use quire_library::geom::{Abs, CellAlign, Fr, Point, Size};
use quire_library::grid::{Cell, Grid, GridColumn, Span};
use quire_library::protocol::{Cursor, Element, Fragment, LayoutContext};

use quire_layout::driver::{paginate, Page};
use quire_layout::elements::{Blank, NoBreak, Sequence};
use quire_layout::grid::{GridElement, LineLook};

fn ctx() -> LayoutContext {
    LayoutContext::uniform(72.0)
}

fn blank(width: f64, height: f64) -> Cell {
    Cell::new(Arc::new(Blank::pt(width, height)))
}

fn breakable(width: f64, pieces: usize, piece_height: f64) -> Cell {
    let sequence: Sequence = (0..pieces)
        .map(|_| Arc::new(Blank::pt(width, piece_height)) as _)
        .collect();
    Cell::new(Arc::new(sequence))
}

fn rules(page: &Page, size: Size) -> usize {
    let mut list = DisplayList::new(size);
    page.paint(&mut list, Point::zero());
    list.items()
        .filter(|(_, item)| matches!(item, PaintItem::Rule(_)))
        .count()
}

#[test]
fn test_split_row_drops_rules_at_open_edges() {
    let mut builder = Grid::builder(vec![GridColumn::default()]);
    builder.push(breakable(20.0, 3, 10.0)).unwrap();
    let grid = Arc::new(builder.build().unwrap());
    let element =
        GridElement::new(grid, Arc::new(LineLook::new(Abs::pt(2.0), Abs::pt(1.0))));

    let area = Size::new(Abs::pt(26.0), Abs::pt(17.0));
    let pages = paginate(&element, &ctx(), area).unwrap();
    assert_eq!(pages.len(), 3);

    for page in &pages {
        assert_eq!(page.content().size(), Size::new(Abs::pt(26.0), Abs::pt(16.0)));
    }

    // The first page keeps its top rule, the last its bottom rule, and the
    // middle page is open on both edges. Each page also has its two
    // verticals.
    assert_eq!(rules(&pages[0], area), 3);
    assert_eq!(rules(&pages[1], area), 2);
    assert_eq!(rules(&pages[2], area), 3);

    assert_eq!(pages[0].number().label(), "Page 1 of 3");
    assert_eq!(pages[2].number().label(), "Page 3 of 3");
}

#[test]
fn test_header_and_footer_frame_every_page() {
    let mut builder = Grid::builder(vec![GridColumn::default()]);
    builder.push_header(blank(30.0, 5.0)).unwrap();
    builder.push(blank(30.0, 10.0)).unwrap();
    builder.push(blank(30.0, 10.0)).unwrap();
    builder.push_footer(blank(30.0, 5.0)).unwrap();
    let element = GridElement::plain(Arc::new(builder.build().unwrap()));

    let pages =
        paginate(&element, &ctx(), Size::new(Abs::pt(30.0), Abs::pt(22.0))).unwrap();

    // Only one body row fits between the repeated sections.
    assert_eq!(pages.len(), 2);
    for page in &pages {
        assert_eq!(page.content().size(), Size::new(Abs::pt(30.0), Abs::pt(20.0)));
    }
}

#[test]
fn test_fill_cell_stretches_to_the_tallest_cell() {
    let mut builder = Grid::builder(vec![GridColumn::default(); 2]);
    builder.push(blank(10.0, 30.0)).unwrap();
    builder.push(blank(10.0, 20.0).with_valign(CellAlign::Fill)).unwrap();
    let element = GridElement::plain(Arc::new(builder.build().unwrap()));

    let mut cursor = element.cursor(&ctx());
    let fragment = cursor
        .next(Size::new(Abs::pt(20.0), Abs::pt(40.0)))
        .unwrap()
        .into_fragment()
        .unwrap();
    assert_eq!(fragment.size(), Size::new(Abs::pt(20.0), Abs::pt(30.0)));
}

#[test]
fn test_fill_cell_stuck_at_an_intermediate_height_fails_the_row() {
    // The fill cell's pieces can render at 10 or 20, but the neighbor fixes
    // the row height at 15 and the fill cell cannot be fully consumed
    // there, so the row is unlayoutable at any page size.
    let mut builder = Grid::builder(vec![GridColumn::default(); 2]);
    builder.push(blank(10.0, 15.0)).unwrap();
    builder.push(breakable(10.0, 2, 10.0).with_valign(CellAlign::Fill)).unwrap();
    let element = GridElement::plain(Arc::new(builder.build().unwrap()));

    let error = paginate(&element, &ctx(), Size::splat(Abs::pt(100.0))).unwrap_err();
    assert_eq!(error.kind, ErrorKind::DoesNotFit);
}

#[test]
fn test_remainder_span_widens_the_flexible_columns() {
    let columns = vec![
        GridColumn::default(),
        GridColumn::default(),
        GridColumn::explicit(50.0),
    ];
    let mut builder = Grid::builder(columns);
    for _ in 0..3 {
        builder.push(blank(50.0, 10.0)).unwrap();
    }
    builder.push(blank(300.0, 10.0).with_span(Span::Remainder)).unwrap();
    let element = GridElement::plain(Arc::new(builder.build().unwrap()));

    // The span cell's deficit goes to the two flexible columns, which end
    // up at 125 each while the explicit column stays at 50.
    let mut cursor = element.cursor(&ctx());
    assert_eq!(cursor.minimum().x, Abs::pt(300.0));

    let fragment = cursor
        .next(Size::new(Abs::pt(300.0), Abs::pt(100.0)))
        .unwrap()
        .into_fragment()
        .unwrap();
    assert_eq!(fragment.size(), Size::new(Abs::pt(300.0), Abs::pt(20.0)));
    assert!(!cursor.has_next());
}

#[test]
fn test_weighted_columns_absorb_extra_page_width() {
    let columns = vec![
        GridColumn::default().with_weight(Fr::one()),
        GridColumn::default().with_weight(Fr::one()),
    ];
    let mut builder = Grid::builder(columns);
    builder.push(blank(100.0, 10.0)).unwrap();
    builder.push(blank(100.0, 10.0)).unwrap();
    let element = GridElement::plain(Arc::new(builder.build().unwrap()));

    let mut cursor = element.cursor(&ctx());
    let fragment = cursor
        .next(Size::new(Abs::pt(300.0), Abs::pt(50.0)))
        .unwrap()
        .into_fragment()
        .unwrap();
    assert_eq!(fragment.size(), Size::new(Abs::pt(300.0), Abs::pt(10.0)));
}

#[test]
fn test_nobreak_defers_a_grid_to_the_next_page() {
    let mut builder = Grid::builder(vec![GridColumn::default()]);
    builder.push(blank(10.0, 10.0)).unwrap();
    builder.push(blank(10.0, 10.0)).unwrap();
    let grid = GridElement::plain(Arc::new(builder.build().unwrap()));

    let mut doc = Sequence::new();
    doc.push(Arc::new(Blank::pt(10.0, 8.0)));
    doc.push(Arc::new(NoBreak::new(Arc::new(grid))));

    let pages =
        paginate(&doc, &ctx(), Size::new(Abs::pt(10.0), Abs::pt(20.0))).unwrap();

    // The grid would split after the leading blank, so it moves whole to
    // the second page.
    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].content().size().y, Abs::pt(8.0));
    assert_eq!(pages[1].content().size().y, Abs::pt(20.0));
}
