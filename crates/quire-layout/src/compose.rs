//! Checked advancement of cursors.

use quire_library::diag::{bail, LayoutResult};
use quire_library::geom::Size;
use quire_library::protocol::{Cursor, Layouted};

/// Advance `cursor` into `area`, enforcing the pagination contract.
///
/// The area must be non-negative on both axes, and a fitting fragment must
/// actually fit. Every caller in this crate goes through here, so a cursor
/// that emits an oversized fragment is caught at the seam where it happens
/// rather than pages later as overlapping paint.
pub fn advance(cursor: &mut dyn Cursor, area: Size) -> LayoutResult<Layouted> {
    if !area.is_sane() {
        bail!("cannot lay out into a negative area {:?}", area);
    }

    let layouted = cursor.next(area)?;
    if let Layouted::Fits(fragment) = &layouted {
        if !area.fits(fragment.size()) {
            bail!(
                "fragment of size {:?} exceeds the granted area {:?}",
                fragment.size(),
                area,
            );
        }
    }

    Ok(layouted)
}
