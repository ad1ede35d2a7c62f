//! The basic composition elements.
//!
//! These are the leaf and glue pieces a document is assembled from besides
//! grids: fixed-size blank space, vertical sequences that break across
//! pages, and the keep-together wrapper.

use std::sync::Arc;

use once_cell::unsync::OnceCell;

use quire_library::canvas::Canvas;
use quire_library::diag::{bail, LayoutResult};
use quire_library::fragment::CompositeFragment;
use quire_library::geom::{Abs, Point, Size};
use quire_library::protocol::{Cursor, Element, Fragment, LayoutContext, Layouted};

use crate::compose::advance;

/// A fixed-size piece of empty space.
///
/// The size is given in points and resolved against the context's
/// resolution when a cursor is created. Blanks are atomic: they are emitted
/// whole or not at all.
#[derive(Debug, Copy, Clone)]
pub struct Blank {
    size: Size,
}

impl Blank {
    /// Create a blank of the given size in points.
    pub fn new(size: Size) -> Self {
        Self { size }
    }

    /// Create a blank from a width and height in points.
    pub fn pt(width: f64, height: f64) -> Self {
        Self::new(Size::new(Abs::pt(width), Abs::pt(height)))
    }
}

impl Element for Blank {
    fn cursor(&self, ctx: &LayoutContext) -> Box<dyn Cursor> {
        Box::new(BlankCursor { size: ctx.resolve_size(self.size), done: false })
    }
}

#[derive(Debug, Clone)]
struct BlankCursor {
    size: Size,
    done: bool,
}

impl Cursor for BlankCursor {
    fn minimum(&self) -> Size {
        self.size
    }

    fn preferred(&self) -> Size {
        self.size
    }

    fn has_next(&self) -> bool {
        !self.done
    }

    fn next(&mut self, area: Size) -> LayoutResult<Layouted> {
        if self.done {
            bail!("the cursor is exhausted");
        }
        if !area.fits(self.size) {
            return Ok(Layouted::DoesNotFit);
        }
        self.done = true;
        Ok(Layouted::Fits(Box::new(BlankFragment(self.size))))
    }

    fn snapshot(&self) -> Box<dyn Cursor> {
        Box::new(self.clone())
    }
}

/// Occupies space, paints nothing.
#[derive(Debug)]
struct BlankFragment(Size);

impl Fragment for BlankFragment {
    fn size(&self) -> Size {
        self.0
    }

    fn paint(&self, _: &mut dyn Canvas, _: Point) {}
}

/// Children laid out one below the other, breaking across pages.
#[derive(Default)]
pub struct Sequence {
    children: Vec<Arc<dyn Element>>,
}

impl Sequence {
    /// Create an empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a child element.
    pub fn push(&mut self, child: Arc<dyn Element>) {
        self.children.push(child);
    }
}

impl FromIterator<Arc<dyn Element>> for Sequence {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Element>>>(iter: I) -> Self {
        Self { children: iter.into_iter().collect() }
    }
}

impl Element for Sequence {
    fn cursor(&self, ctx: &LayoutContext) -> Box<dyn Cursor> {
        Box::new(SequenceCursor {
            cursors: self.children.iter().map(|child| child.cursor(ctx)).collect(),
            index: 0,
            minimum: OnceCell::new(),
            preferred: OnceCell::new(),
        })
    }
}

struct SequenceCursor {
    cursors: Vec<Box<dyn Cursor>>,
    index: usize,
    minimum: OnceCell<Size>,
    preferred: OnceCell<Size>,
}

impl Cursor for SequenceCursor {
    /// Wide enough for the widest child, tall enough for the tallest,
    /// since every child may take as many pages as it needs.
    fn minimum(&self) -> Size {
        *self.minimum.get_or_init(|| {
            let mut size = Size::zero();
            for cursor in &self.cursors {
                let min = cursor.minimum();
                size.x.set_max(min.x);
                size.y.set_max(min.y);
            }
            size
        })
    }

    fn preferred(&self) -> Size {
        *self.preferred.get_or_init(|| {
            let mut size = Size::zero();
            for cursor in &self.cursors {
                let pref = cursor.preferred();
                size.x.set_max(pref.x);
                size.y += pref.y;
            }
            size
        })
    }

    fn has_next(&self) -> bool {
        self.cursors[self.index..].iter().any(|cursor| cursor.has_next())
    }

    fn next(&mut self, area: Size) -> LayoutResult<Layouted> {
        if !self.has_next() {
            bail!("the cursor is exhausted");
        }

        let mut composite = CompositeFragment::new();
        let mut y = Abs::zero();
        let mut index = self.index;

        while index < self.cursors.len() {
            let cursor = &mut self.cursors[index];
            if !cursor.has_next() {
                index += 1;
                continue;
            }

            let remaining = Size::new(area.x, (area.y - y).max(Abs::zero()));
            match advance(cursor.as_mut(), remaining)? {
                Layouted::Fits(fragment) => {
                    let height = fragment.size().y;
                    composite.push(Point::with_y(y), fragment);
                    y += height;
                    if cursor.has_next() {
                        // The child filled what it could; the rest of it
                        // continues in the next area.
                        break;
                    }
                    index += 1;
                }
                Layouted::DoesNotFit => break,
            }
        }

        if composite.is_empty() {
            return Ok(Layouted::DoesNotFit);
        }

        self.index = index;
        Ok(Layouted::Fits(Box::new(composite)))
    }

    fn snapshot(&self) -> Box<dyn Cursor> {
        Box::new(SequenceCursor {
            cursors: self.cursors.iter().map(|cursor| cursor.snapshot()).collect(),
            index: self.index,
            minimum: self.minimum.clone(),
            preferred: self.preferred.clone(),
        })
    }
}

/// Emits its wrapped element only in one piece.
///
/// Layout is attempted on a snapshot; the snapshot replaces the live cursor
/// only if it is fully consumed, so a partial rendition is never committed.
pub struct NoBreak {
    inner: Arc<dyn Element>,
}

impl NoBreak {
    /// Wrap an element.
    pub fn new(inner: Arc<dyn Element>) -> Self {
        Self { inner }
    }
}

impl Element for NoBreak {
    fn cursor(&self, ctx: &LayoutContext) -> Box<dyn Cursor> {
        Box::new(NoBreakCursor { inner: self.inner.cursor(ctx) })
    }
}

struct NoBreakCursor {
    inner: Box<dyn Cursor>,
}

impl Cursor for NoBreakCursor {
    fn minimum(&self) -> Size {
        self.inner.minimum()
    }

    fn preferred(&self) -> Size {
        self.inner.preferred()
    }

    fn has_next(&self) -> bool {
        self.inner.has_next()
    }

    fn next(&mut self, area: Size) -> LayoutResult<Layouted> {
        let mut trial = self.inner.snapshot();
        match advance(trial.as_mut(), area)? {
            Layouted::Fits(fragment) if !trial.has_next() => {
                self.inner = trial;
                Ok(Layouted::Fits(fragment))
            }
            _ => Ok(Layouted::DoesNotFit),
        }
    }

    fn snapshot(&self) -> Box<dyn Cursor> {
        Box::new(NoBreakCursor { inner: self.inner.snapshot() })
    }
}
