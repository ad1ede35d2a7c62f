//! The top-level pagination loop.

use ecow::{eco_format, EcoString};
use tracing::debug;

use quire_library::canvas::{Canvas, PaintItem};
use quire_library::diag::{LayoutError, LayoutResult};
use quire_library::geom::{Point, Size};
use quire_library::protocol::{Cursor, Element, Fragment, LayoutContext, Layouted};

use crate::compose::advance;

/// The position of a page within a finished run.
///
/// The total is only known once the run completes, so numbers are attached
/// to the pages afterwards rather than while they are laid out.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PageNumber {
    /// The zero-based page index.
    pub index: usize,
    /// How many pages the run produced.
    pub total: usize,
}

impl PageNumber {
    /// The human-readable label, e.g. "Page 3 of 7".
    pub fn label(&self) -> EcoString {
        eco_format!("Page {} of {}", self.index + 1, self.total)
    }
}

/// One finished page of a paginated document.
#[derive(Debug)]
pub struct Page {
    content: Box<dyn Fragment>,
    number: PageNumber,
}

impl Page {
    /// The laid-out content of the page.
    pub fn content(&self) -> &dyn Fragment {
        self.content.as_ref()
    }

    /// The page's position within the run.
    pub fn number(&self) -> PageNumber {
        self.number
    }

    /// Paint the page content and its number label onto `canvas`.
    ///
    /// The label is recorded at the origin; where it ends up visually is the
    /// consumer's concern, like all other rasterization.
    pub fn paint(&self, canvas: &mut dyn Canvas, origin: Point) {
        self.content.paint(canvas, origin);
        canvas.push(origin, PaintItem::Label(self.number.label()));
    }
}

/// Lay out `element` into a run of pages of the given size.
///
/// The cursor is driven until it is exhausted. Every page must make
/// progress; an element that refuses a whole empty page cannot be paginated
/// at this size and the job fails with a `DoesNotFit` error.
pub fn paginate(
    element: &dyn Element,
    ctx: &LayoutContext,
    page: Size,
) -> LayoutResult<Vec<Page>> {
    let page = ctx.resolve_size(page);
    let mut cursor = element.cursor(ctx);
    let mut fragments = vec![];

    while cursor.has_next() {
        match advance(cursor.as_mut(), page)? {
            Layouted::Fits(fragment) => {
                debug!(
                    index = fragments.len(),
                    width = fragment.size().x.to_raw(),
                    height = fragment.size().y.to_raw(),
                    "page laid out"
                );
                fragments.push(fragment);
            }
            Layouted::DoesNotFit => {
                return Err(LayoutError::does_not_fit(eco_format!(
                    "page {} of size {:?} was refused",
                    fragments.len() + 1,
                    page,
                )));
            }
        }
    }

    let total = fragments.len();
    Ok(fragments
        .into_iter()
        .enumerate()
        .map(|(index, content)| Page {
            content,
            number: PageNumber { index, total },
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use quire_library::canvas::DisplayList;
    use quire_library::geom::Abs;

    use crate::elements::{Blank, Sequence};

    fn ctx() -> LayoutContext {
        LayoutContext::uniform(72.0)
    }

    #[test]
    fn test_run_is_numbered_after_the_fact() {
        let doc: Sequence =
            (0..3).map(|_| Arc::new(Blank::pt(10.0, 10.0)) as _).collect();
        let pages =
            paginate(&doc, &ctx(), Size::new(Abs::pt(10.0), Abs::pt(10.0))).unwrap();

        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].number(), PageNumber { index: 0, total: 3 });
        assert_eq!(pages[1].number().label(), "Page 2 of 3");
    }

    #[test]
    fn test_refused_page_fails_the_job() {
        let doc = Blank::pt(10.0, 50.0);
        let error =
            paginate(&doc, &ctx(), Size::new(Abs::pt(10.0), Abs::pt(10.0))).unwrap_err();
        assert_eq!(error.kind, quire_library::diag::ErrorKind::DoesNotFit);
    }

    #[test]
    fn test_page_paints_content_and_label() {
        let doc = Blank::pt(10.0, 10.0);
        let size = Size::splat(Abs::pt(20.0));
        let pages = paginate(&doc, &ctx(), size).unwrap();

        let mut list = DisplayList::new(size);
        pages[0].paint(&mut list, Point::zero());
        let labels = list
            .items()
            .filter(|(_, item)| matches!(item, PaintItem::Label(_)))
            .count();
        assert_eq!(labels, 1);
    }
}
