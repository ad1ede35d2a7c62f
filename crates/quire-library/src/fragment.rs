//! Assembling fragments out of other fragments.

use crate::canvas::Canvas;
use crate::geom::{Point, Rect, Size};
use crate::protocol::Fragment;

/// A fragment composed of child fragments at fixed offsets.
///
/// Owns its children; dropping the composite drops them all. Children are
/// painted in insertion order, so backgrounds go in first.
#[derive(Debug, Default)]
pub struct CompositeFragment {
    size: Size,
    fixed: bool,
    children: Vec<(Point, Box<dyn Fragment>)>,
}

impl CompositeFragment {
    /// Create an empty composite whose size grows to bound its children.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty composite with a fixed overall size.
    pub fn with_size(size: Size) -> Self {
        Self { size, fixed: true, children: vec![] }
    }

    /// Add a child with its top-left corner at `pos`.
    pub fn push(&mut self, pos: Point, fragment: Box<dyn Fragment>) {
        if !self.fixed {
            let end = pos + fragment.size().to_point();
            self.size.x.set_max(end.x);
            self.size.y.set_max(end.y);
        }
        self.children.push((pos, fragment));
    }

    /// Whether the composite has no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// The number of direct children.
    pub fn len(&self) -> usize {
        self.children.len()
    }
}

impl Fragment for CompositeFragment {
    fn size(&self) -> Size {
        self.size
    }

    fn paint(&self, canvas: &mut dyn Canvas, origin: Point) {
        for (pos, child) in &self.children {
            // A child outside the visible region cannot contribute items.
            let bounds = Rect::new(origin + *pos, child.size());
            if !bounds.intersects(canvas.visible()) {
                continue;
            }
            child.paint(canvas, origin + *pos);
        }
    }
}
