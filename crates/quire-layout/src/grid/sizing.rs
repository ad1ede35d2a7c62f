//! Column width negotiation.
//!
//! Widths are computed in two stages. First, the grid's natural column
//! widths are measured under both strategies (the smallest workable and the
//! most comfortable rendition). Then, for a concrete available width, the
//! final widths are resolved from the two tables.

use quire_library::geom::{Abs, Fr};
use quire_library::grid::{ColumnSize, Grid, GridColumn};
use quire_library::protocol::LayoutContext;
use quire_utils::Numeric;

/// Which natural size a measurement refers to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Strategy {
    Minimum,
    Preferred,
}

/// The measured natural widths of one cell, in device pixels.
#[derive(Debug, Copy, Clone)]
pub struct CellMeasure {
    pub col: usize,
    pub span: usize,
    pub minimum: Abs,
    pub preferred: Abs,
}

impl CellMeasure {
    fn natural(&self, strategy: Strategy) -> Abs {
        match strategy {
            Strategy::Minimum => self.minimum,
            Strategy::Preferred => self.preferred,
        }
    }
}

/// The natural column widths under both strategies.
#[derive(Debug, Clone)]
pub struct WidthTables {
    pub minimum: Vec<Abs>,
    pub preferred: Vec<Abs>,
}

impl WidthTables {
    /// Measure all cells once and compute both width tables.
    pub fn compute(grid: &Grid, ctx: &LayoutContext, spacing: Abs) -> Self {
        let cells = measure_cells(grid, ctx);
        Self {
            minimum: natural_widths(
                grid.columns(),
                grid.groups(),
                ctx,
                &cells,
                Strategy::Minimum,
                spacing,
            ),
            preferred: natural_widths(
                grid.columns(),
                grid.groups(),
                ctx,
                &cells,
                Strategy::Preferred,
                spacing,
            ),
        }
    }
}

/// Measure every cell of the grid by asking a fresh cursor for its sizes.
pub fn measure_cells(grid: &Grid, ctx: &LayoutContext) -> Vec<CellMeasure> {
    grid.all_rows()
        .flat_map(|row| &row.cells)
        .map(|placed| {
            let cursor = placed.cell.element.cursor(ctx);
            CellMeasure {
                col: placed.col,
                span: placed.span,
                minimum: cursor.minimum().x,
                preferred: cursor.preferred().x,
            }
        })
        .collect()
}

/// A selection predicate for one expansion tier. Receives a column and
/// whether it belongs to a group.
type Tier = fn(&GridColumn, bool) -> bool;

/// The priority order in which a spanning cell's width deficit is
/// distributed: weighted before preferred before default columns, and
/// ungrouped before grouped within each class. The first tier that matches
/// any spanned column wins.
const EXPANSION_TIERS: &[Tier] = &[
    |column, grouped| !grouped && !column.weight.is_zero(),
    |column, grouped| grouped && !column.weight.is_zero(),
    |column, grouped| !grouped && matches!(column.size, ColumnSize::Preferred),
    |column, grouped| grouped && matches!(column.size, ColumnSize::Preferred),
    |column, grouped| !grouped && matches!(column.size, ColumnSize::Default),
    |column, grouped| grouped && matches!(column.size, ColumnSize::Default),
];

/// Compute the grid's natural column widths under one strategy.
///
/// Explicit columns are fixed, single-column cells grow their column,
/// grouped columns share the group maximum, and spanning cells distribute
/// their remaining deficit over the first matching expansion tier.
pub fn natural_widths(
    columns: &[GridColumn],
    groups: &[Vec<usize>],
    ctx: &LayoutContext,
    cells: &[CellMeasure],
    strategy: Strategy,
    spacing: Abs,
) -> Vec<Abs> {
    let mut widths: Vec<Abs> = columns
        .iter()
        .map(|column| match column.size {
            ColumnSize::Explicit(pt) => ctx.resolve_x(pt),
            _ => Abs::zero(),
        })
        .collect();

    for cell in cells.iter().filter(|cell| cell.span == 1) {
        if !matches!(columns[cell.col].size, ColumnSize::Explicit(_)) {
            widths[cell.col].set_max(cell.natural(strategy));
        }
    }

    apply_groups(groups, &mut widths);

    for cell in cells.iter().filter(|cell| cell.span > 1) {
        let range = cell.col..cell.col + cell.span;
        let current: Abs = widths[range.clone()].iter().sum();
        let needed = cell.natural(strategy) - spacing * (cell.span - 1) as f64;
        let deficit = needed - current;
        if deficit.approx_empty() {
            continue;
        }

        let grouped = |index: usize| groups.iter().any(|group| group.contains(&index));
        let selected = EXPANSION_TIERS.iter().find_map(|tier| {
            let set: Vec<usize> = range
                .clone()
                .filter(|&index| tier(&columns[index], grouped(index)))
                .collect();
            (!set.is_empty()).then_some(set)
        });

        // A span over only rigid columns keeps its deficit.
        let Some(selected) = selected else { continue };
        distribute(&mut widths, &selected, deficit);
    }

    apply_groups(groups, &mut widths);
    widths
}

/// Distribute `amount` over the selected columns: equally if they are all
/// empty, otherwise proportionally to their current widths. The running
/// pools make the last recipient absorb any rounding remainder.
fn distribute(widths: &mut [Abs], selected: &[usize], amount: Abs) {
    let base: Abs = selected.iter().map(|&index| widths[index]).sum();
    let mut remaining = amount;

    if base.approx_empty() {
        let share = amount / selected.len() as f64;
        for (pos, &index) in selected.iter().enumerate() {
            let add = if pos + 1 == selected.len() { remaining } else { share };
            widths[index] += add;
            remaining -= add;
        }
    } else {
        let mut pool = base;
        for &index in selected {
            if pool.approx_empty() {
                break;
            }
            let share = widths[index];
            let add = remaining * (share / pool);
            widths[index] += add;
            remaining -= add;
            pool -= share;
        }
    }
}

fn apply_groups(groups: &[Vec<usize>], widths: &mut [Abs]) {
    for group in groups {
        let max = group.iter().map(|&index| widths[index]).max().unwrap_or_default();
        for &index in group {
            widths[index] = max;
        }
    }
}

/// The priority order in which columns give up width when space is tight.
/// A tier is selected only if its columns' widths cover the reduction on
/// their own; the final tier is unconditional.
const SHRINK_TIERS: &[fn(&GridColumn) -> bool] = &[
    |column| matches!(column.size, ColumnSize::Default),
    |column| !matches!(column.size, ColumnSize::Explicit(_)),
];

/// Resolve the final column widths for an available content width.
///
/// `available` excludes insets and inter-column spacing. The five-case
/// structure keeps the result monotone and deterministic in the available
/// width, which pagination relies on for stability across retries.
pub fn resolve_widths(
    columns: &[GridColumn],
    minimum: &[Abs],
    preferred: &[Abs],
    available: Abs,
) -> Vec<Abs> {
    let min_sum: Abs = minimum.iter().sum();
    let pref_sum: Abs = preferred.iter().sum();

    if available.approx_eq(min_sum) {
        minimum.to_vec()
    } else if available < min_sum {
        shrink(columns, minimum, min_sum - available)
    } else if available.approx_eq(pref_sum) {
        preferred.to_vec()
    } else if available < pref_sum {
        interpolate(minimum, preferred, available - min_sum, pref_sum - min_sum)
    } else {
        expand(columns, preferred, available - pref_sum)
    }
}

fn shrink(columns: &[GridColumn], minimum: &[Abs], reduction: Abs) -> Vec<Abs> {
    let selected = SHRINK_TIERS
        .iter()
        .map(|&tier| {
            (0..columns.len())
                .filter(|&index| tier(&columns[index]))
                .collect::<Vec<_>>()
        })
        .find(|set| {
            set.iter().map(|&index| minimum[index]).sum::<Abs>().fits(reduction)
        })
        .unwrap_or_else(|| (0..columns.len()).collect());

    let mut widths = minimum.to_vec();
    let mut remaining = reduction;
    let mut pool: Abs = selected.iter().map(|&index| minimum[index]).sum();
    for &index in &selected {
        if pool.approx_empty() {
            break;
        }
        let share = minimum[index];
        let cut = remaining * (share / pool);
        widths[index] = (widths[index] - cut).max(Abs::zero());
        remaining -= cut;
        pool -= share;
    }
    widths
}

fn interpolate(minimum: &[Abs], preferred: &[Abs], extra: Abs, range: Abs) -> Vec<Abs> {
    let mut widths = minimum.to_vec();
    let mut remaining = extra;
    let mut pool = range;
    for (index, width) in widths.iter_mut().enumerate() {
        if pool.approx_empty() {
            break;
        }
        let room = preferred[index] - minimum[index];
        let add = remaining * (room / pool);
        *width += add;
        remaining -= add;
        pool -= room;
    }
    widths
}

fn expand(columns: &[GridColumn], preferred: &[Abs], extra: Abs) -> Vec<Abs> {
    let total: Fr = columns.iter().map(|column| column.weight).sum();
    let mut widths = preferred.to_vec();
    let mut remaining = extra;
    let mut pool = total;
    for (index, width) in widths.iter_mut().enumerate() {
        let weight = columns[index].weight;
        if weight.is_zero() {
            continue;
        }
        let add = weight.share(pool, remaining);
        *width += add;
        remaining -= add;
        pool -= weight;
    }
    widths
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> LayoutContext {
        LayoutContext::uniform(72.0)
    }

    fn pt(values: &[f64]) -> Vec<Abs> {
        values.iter().map(|&v| Abs::pt(v)).collect()
    }

    fn single(col: usize, width: f64) -> CellMeasure {
        CellMeasure {
            col,
            span: 1,
            minimum: Abs::pt(width),
            preferred: Abs::pt(width),
        }
    }

    #[test]
    fn test_weighted_columns_absorb_extra_width() {
        let columns =
            vec![GridColumn::default().with_weight(Fr::one()); 2];
        let cells = [single(0, 100.0), single(1, 100.0)];
        let widths = natural_widths(
            &columns,
            &[],
            &ctx(),
            &cells,
            Strategy::Preferred,
            Abs::zero(),
        );
        assert_eq!(widths, pt(&[100.0, 100.0]));

        let resolved = resolve_widths(&columns, &widths, &widths, Abs::pt(300.0));
        assert_eq!(resolved, pt(&[150.0, 150.0]));
    }

    #[test]
    fn test_shrink_is_proportional() {
        let columns = vec![GridColumn::default(); 2];
        let minimum = pt(&[100.0, 100.0]);
        let resolved = resolve_widths(&columns, &minimum, &minimum, Abs::pt(150.0));
        assert_eq!(resolved, pt(&[75.0, 75.0]));
    }

    #[test]
    fn test_shrink_spares_explicit_columns_while_possible() {
        let columns = vec![
            GridColumn::default(),
            GridColumn::explicit(50.0),
        ];
        let minimum = pt(&[100.0, 50.0]);
        let resolved = resolve_widths(&columns, &minimum, &minimum, Abs::pt(90.0));
        assert_eq!(resolved, pt(&[40.0, 50.0]));
    }

    #[test]
    fn test_span_deficit_skips_explicit_columns() {
        let columns = vec![
            GridColumn::default(),
            GridColumn::default(),
            GridColumn::explicit(50.0),
        ];
        let cells = [
            single(0, 50.0),
            single(1, 50.0),
            CellMeasure {
                col: 0,
                span: 3,
                minimum: Abs::pt(300.0),
                preferred: Abs::pt(300.0),
            },
        ];
        let widths = natural_widths(
            &columns,
            &[],
            &ctx(),
            &cells,
            Strategy::Minimum,
            Abs::zero(),
        );
        assert_eq!(widths, pt(&[125.0, 125.0, 50.0]));
    }

    #[test]
    fn test_span_deficit_prefers_weighted_columns() {
        let columns = vec![
            GridColumn::default().with_weight(Fr::one()),
            GridColumn::default(),
        ];
        let cells = [CellMeasure {
            col: 0,
            span: 2,
            minimum: Abs::pt(90.0),
            preferred: Abs::pt(90.0),
        }];
        let widths = natural_widths(
            &columns,
            &[],
            &ctx(),
            &cells,
            Strategy::Minimum,
            Abs::zero(),
        );
        assert_eq!(widths, pt(&[90.0, 0.0]));
    }

    #[test]
    fn test_span_deficit_accounts_for_spacing() {
        let columns = vec![GridColumn::default(); 2];
        let cells = [CellMeasure {
            col: 0,
            span: 2,
            minimum: Abs::pt(110.0),
            preferred: Abs::pt(110.0),
        }];
        let widths = natural_widths(
            &columns,
            &[],
            &ctx(),
            &cells,
            Strategy::Minimum,
            Abs::pt(10.0),
        );
        assert_eq!(widths, pt(&[50.0, 50.0]));
    }

    #[test]
    fn test_groups_share_the_maximum_width() {
        let columns = vec![GridColumn::default(); 2];
        let cells = [single(0, 80.0), single(1, 30.0)];
        let widths = natural_widths(
            &columns,
            &[vec![0, 1]],
            &ctx(),
            &cells,
            Strategy::Minimum,
            Abs::zero(),
        );
        assert_eq!(widths, pt(&[80.0, 80.0]));
    }

    #[test]
    fn test_grouped_columns_stay_equal_through_resolution() {
        let columns = vec![GridColumn::default(); 3];
        let groups = [vec![0, 2]];
        let cells = [single(0, 80.0), single(1, 40.0), single(2, 30.0)];
        let minimum =
            natural_widths(&columns, &groups, &ctx(), &cells, Strategy::Minimum, Abs::zero());
        assert_eq!(minimum, pt(&[80.0, 40.0, 80.0]));

        for w in [100.0, 200.0, 250.0] {
            let resolved = resolve_widths(&columns, &minimum, &minimum, Abs::pt(w));
            assert!(resolved[0].approx_eq(resolved[2]));
        }
    }

    #[test]
    fn test_interpolation_is_linear() {
        let columns = vec![GridColumn::default(); 2];
        let minimum = pt(&[50.0, 100.0]);
        let preferred = pt(&[100.0, 200.0]);
        let resolved = resolve_widths(&columns, &minimum, &preferred, Abs::pt(225.0));
        assert_eq!(resolved, pt(&[75.0, 150.0]));
    }

    #[test]
    fn test_expansion_ignores_zero_weight_columns() {
        let columns = vec![
            GridColumn::default(),
            GridColumn::default().with_weight(Fr::one()),
        ];
        let preferred = pt(&[100.0, 100.0]);
        let resolved = resolve_widths(&columns, &preferred, &preferred, Abs::pt(250.0));
        assert_eq!(resolved, pt(&[100.0, 150.0]));
    }

    #[test]
    fn test_resolution_is_monotone_per_column() {
        let columns = vec![
            GridColumn::default().with_weight(Fr::one()),
            GridColumn::default(),
            GridColumn::explicit(40.0),
        ];
        let minimum = pt(&[60.0, 20.0, 40.0]);
        let preferred = pt(&[120.0, 80.0, 40.0]);

        // Monotonicity holds from the minimum width upwards.
        let mut previous = vec![Abs::zero(); 3];
        let mut w = 120.0;
        while w <= 400.0 {
            let resolved = resolve_widths(&columns, &minimum, &preferred, Abs::pt(w));
            for (current, last) in resolved.iter().zip(&previous) {
                assert!(current.fits(*last), "widths shrank as available width grew");
            }
            previous = resolved;
            w += 7.0;
        }
    }

    #[test]
    fn test_resolution_sums_to_available_width() {
        let columns = vec![
            GridColumn::default().with_weight(Fr::new(2.0)),
            GridColumn::default().with_weight(Fr::one()),
        ];
        let minimum = pt(&[50.0, 30.0]);
        let preferred = pt(&[90.0, 60.0]);
        for w in [80.0, 100.0, 123.4, 150.0, 321.0] {
            let resolved = resolve_widths(&columns, &minimum, &preferred, Abs::pt(w));
            let sum: Abs = resolved.iter().sum();
            assert!(sum.approx_eq(Abs::pt(w)));
        }
    }
}
