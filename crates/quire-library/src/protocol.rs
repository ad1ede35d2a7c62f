//! The pagination protocol.
//!
//! Every element implements the same three-part contract: an [`Element`] is
//! the immutable description, a [`Cursor`] is one pagination run over it,
//! and [`Fragment`]s are the page-sized pieces the run emits.

use std::fmt::{self, Debug, Formatter};

use crate::canvas::Canvas;
use crate::diag::LayoutResult;
use crate::geom::{Abs, Axes, Point, Size};

/// Conversion from point space into device space.
///
/// Document lengths are in points; everything the engine computes with is in
/// device pixels. The context performs the conversion once, at cursor
/// creation, so that all later math happens in a single space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LayoutContext {
    /// The device resolution in pixels per inch, per axis.
    pub dpi: Axes<f64>,
}

impl LayoutContext {
    /// Create a context with the given per-axis resolution.
    pub const fn new(dpi: Axes<f64>) -> Self {
        Self { dpi }
    }

    /// Create a context with the same resolution on both axes.
    pub fn uniform(dpi: f64) -> Self {
        Self { dpi: Axes::splat(dpi) }
    }

    /// Resolve a horizontal point-space length to device pixels.
    pub fn resolve_x(&self, len: Abs) -> Abs {
        Abs::raw(len.to_inches() * self.dpi.x)
    }

    /// Resolve a vertical point-space length to device pixels.
    pub fn resolve_y(&self, len: Abs) -> Abs {
        Abs::raw(len.to_inches() * self.dpi.y)
    }

    /// Resolve a point-space size to device pixels.
    pub fn resolve_size(&self, size: Size) -> Size {
        Size::new(self.resolve_x(size.x), self.resolve_y(size.y))
    }
}

/// A piece of a document.
///
/// Elements are immutable and reusable: the same element may appear in
/// several places and be paginated several times, even concurrently within
/// one run (a grid cell in a repeating header is laid out once per page).
pub trait Element {
    /// Start a new pagination run over this element.
    fn cursor(&self, ctx: &LayoutContext) -> Box<dyn Cursor>;
}

/// One pagination run over an element.
///
/// A cursor only ever moves forward: each emitted fragment consumes a
/// prefix of the remaining content. Backtracking is done by laying out a
/// [`snapshot`](Self::snapshot) and discarding it.
pub trait Cursor {
    /// The smallest area in which this cursor's element can be laid out
    /// without loss, if granted as many pages as it needs.
    ///
    /// Stable across the cursor's lifetime.
    fn minimum(&self) -> Size;

    /// The area the element would like for its most natural rendition.
    ///
    /// Stable across the cursor's lifetime.
    fn preferred(&self) -> Size;

    /// Whether any content remains to be emitted.
    fn has_next(&self) -> bool;

    /// Lay out the next piece of content into `area`.
    ///
    /// On [`Layouted::DoesNotFit`] the cursor's observable state is
    /// unchanged and the caller may retry with a different area.
    fn next(&mut self, area: Size) -> LayoutResult<Layouted>;

    /// An independent copy of this cursor's position.
    ///
    /// Advancing the copy never affects `self` and vice versa. Shared
    /// read-only resources may be shared between the two.
    fn snapshot(&self) -> Box<dyn Cursor>;
}

/// The outcome of a single [`Cursor::next`] call.
#[derive(Debug)]
pub enum Layouted {
    /// A fragment no larger than the requested area.
    Fits(Box<dyn Fragment>),
    /// No progress is possible in the requested area. This is ordinary
    /// control flow, not an error.
    DoesNotFit,
}

impl Layouted {
    /// Whether this is a fitting fragment.
    pub fn fits(&self) -> bool {
        matches!(self, Self::Fits(_))
    }

    /// The fragment, if one was produced.
    pub fn into_fragment(self) -> Option<Box<dyn Fragment>> {
        match self {
            Self::Fits(fragment) => Some(fragment),
            Self::DoesNotFit => None,
        }
    }
}

/// A laid-out piece of content with a fixed size.
///
/// A fragment owns its resources and releases them when dropped. Composite
/// fragments own their children, so dropping a page drops everything on it.
pub trait Fragment {
    /// The fragment's extent.
    fn size(&self) -> Size;

    /// Paint the fragment with its top-left corner at `origin`.
    ///
    /// Painting is idempotent; a fragment may be painted multiple times.
    fn paint(&self, canvas: &mut dyn Canvas, origin: Point);
}

impl Debug for dyn Fragment {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "Fragment({:?})", self.size())
    }
}
