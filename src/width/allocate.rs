use std::cmp;

/// Width inputs of one column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WidthSpec {
    /// Always used verbatim
    pub fixed: Option<u32>,
    /// Set by the user dragging or keyboard resizing
    pub resized: Option<u32>,
    pub initial: Option<u32>,
    pub min: Option<u32>,
    pub max: Option<u32>,
}

impl WidthSpec {
    /// Flexible columns share whatever width the others leave
    pub fn is_flexible(&self) -> bool {
        self.fixed.is_none() && self.resized.is_none() && self.initial.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidthLimits {
    pub min: u32,
    pub max: u32,
}

impl WidthLimits {
    fn bounds(&self, spec: &WidthSpec) -> (u32, u32) {
        let min = spec.min.unwrap_or(self.min);
        let max = spec.max.unwrap_or(self.max).max(min);
        (min, max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AllocationPolicy<'a> {
    /// Equal shares
    Equal,
    /// Shares proportional to one ratio per column
    Ratios(&'a [f64]),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Allocation {
    pub widths: Vec<u32>,
    /// Sum of `widths`, saturating at `u32::MAX`
    pub table_width: u32,
}

/// How close to a bound a column must be to be served first when
/// redistributing
const NEAR_BOUND: u32 = 1;

/// Sum of column widths, saturating at `u32::MAX`
pub fn total_width(widths: impl IntoIterator<Item = u32>) -> u32 {
    widths.into_iter().fold(0, u32::saturating_add)
}

/// Allocate one width per column.
///
/// Fixed widths are used verbatim; resized and initial widths are clamped to
/// the column's bounds; flexible columns split what is left according to the
/// policy and are then rebalanced so that, bounds permitting, the table fills
/// `available` exactly. Returns None when the ratio count does not match the
/// column count, meaning the caller's ratios are stale.
pub fn allocate(
    specs: &[WidthSpec],
    available: u32,
    limits: WidthLimits,
    policy: AllocationPolicy,
) -> Option<Allocation> {
    if let AllocationPolicy::Ratios(ratios) = policy {
        if ratios.len() != specs.len() {
            return None;
        }
    }

    let bounds: Vec<(u32, u32)> = specs.iter().map(|s| limits.bounds(s)).collect();
    let clamp = |i: usize, w: u32| cmp::min(cmp::max(w, bounds[i].0), bounds[i].1);

    let mut widths = vec![0u32; specs.len()];
    let mut flexible = Vec::new();
    for (i, spec) in specs.iter().enumerate() {
        widths[i] = match (spec.fixed, spec.resized, spec.initial) {
            (Some(fixed), _, _) => fixed,
            (None, Some(resized), _) => clamp(i, resized),
            (None, None, Some(initial)) => clamp(i, initial),
            (None, None, None) => {
                flexible.push(i);
                0
            }
        };
    }

    if flexible.is_empty() {
        let table_width = total_width(widths.iter().copied());
        return Some(Allocation { widths, table_width });
    }

    let reserved = total_width(widths.iter().copied());
    let remaining = available.saturating_sub(reserved);

    let weights: Vec<f64> = match policy {
        AllocationPolicy::Ratios(ratios) => {
            let total: f64 = flexible.iter().map(|&i| ratios[i].max(0.0)).sum();
            if total > 0.0 {
                flexible.iter().map(|&i| ratios[i].max(0.0) / total).collect()
            } else {
                vec![1.0 / flexible.len() as f64; flexible.len()]
            }
        }
        AllocationPolicy::Equal => vec![1.0 / flexible.len() as f64; flexible.len()],
    };
    for (&i, weight) in flexible.iter().zip(weights) {
        widths[i] = clamp(i, (remaining as f64 * weight).floor() as u32);
    }

    rebalance(&mut widths, &flexible, &bounds, remaining);

    let table_width = total_width(widths.iter().copied());
    Some(Allocation { widths, table_width })
}

/// Move flexible widths towards `target`. Surplus goes first to columns at
/// or near their minimum, then to every flexible column; a deficit is taken
/// first from columns at or near their maximum, then from every flexible
/// column. Each step respects the bounds.
fn rebalance(widths: &mut [u32], flexible: &[usize], bounds: &[(u32, u32)], target: u32) {
    let total = total_width(flexible.iter().map(|&i| widths[i]));

    if total < target {
        let near_min: Vec<usize> = flexible
            .iter()
            .copied()
            .filter(|&i| widths[i] <= bounds[i].0.saturating_add(NEAR_BOUND))
            .collect();
        let left = spread(widths, &near_min, target - total, bounds, true);
        spread(widths, flexible, left, bounds, true);
    } else if total > target {
        let near_max: Vec<usize> = flexible
            .iter()
            .copied()
            .filter(|&i| widths[i].saturating_add(NEAR_BOUND) >= bounds[i].1)
            .collect();
        let left = spread(widths, &near_max, total - target, bounds, false);
        spread(widths, flexible, left, bounds, false);
    }
}

/// Hand out (or take back) `amount` pixels evenly across `candidates`,
/// one pixel at a time for the remainder. Returns what could not be placed.
fn spread(widths: &mut [u32], candidates: &[usize], mut amount: u32, bounds: &[(u32, u32)], grow: bool) -> u32 {
    let room = |w: u32, (min, max): (u32, u32)| if grow { max.saturating_sub(w) } else { w.saturating_sub(min) };

    while amount > 0 {
        let open: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|&i| room(widths[i], bounds[i]) > 0)
            .collect();
        if open.is_empty() {
            break;
        }
        let share = cmp::max(amount / open.len() as u32, 1);
        for i in open {
            if amount == 0 {
                break;
            }
            let delta = cmp::min(cmp::min(share, room(widths[i], bounds[i])), amount);
            if grow {
                widths[i] += delta;
            } else {
                widths[i] -= delta;
            }
            amount -= delta;
        }
    }
    amount
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LIMITS: WidthLimits = WidthLimits { min: 50, max: 1000 };

    fn flexible() -> WidthSpec {
        WidthSpec::default()
    }

    fn fixed(w: u32) -> WidthSpec {
        WidthSpec { fixed: Some(w), ..Default::default() }
    }

    #[test]
    fn test_single_flexible_takes_the_rest() {
        let a = allocate(&[flexible(), fixed(80)], 300, LIMITS, AllocationPolicy::Equal).unwrap();
        assert_eq!(a.widths, vec![220, 80]);
        assert_eq!(a.table_width, 300);
    }

    #[test]
    fn test_fixed_width_is_never_clamped() {
        let a = allocate(&[fixed(10), fixed(5000), flexible()], 300, LIMITS, AllocationPolicy::Equal).unwrap();
        assert_eq!(a.widths[0], 10);
        assert_eq!(a.widths[1], 5000);
        assert_eq!(a.widths[2], 50);
    }

    #[test]
    fn test_no_flexible_columns_ignores_available_width() {
        let specs = [fixed(100), WidthSpec { resized: Some(120), ..Default::default() }];
        let a = allocate(&specs, 1000, LIMITS, AllocationPolicy::Equal).unwrap();
        assert_eq!(a.widths, vec![100, 120]);
        assert_eq!(a.table_width, 220);
    }

    #[test]
    fn test_equal_split_fills_exactly() {
        let a = allocate(&[flexible(), flexible(), flexible()], 301, LIMITS, AllocationPolicy::Equal).unwrap();
        assert_eq!(a.table_width, 301);
        let spread = a.widths.iter().max().unwrap() - a.widths.iter().min().unwrap();
        assert!(spread <= 1);
    }

    #[test]
    fn test_sum_matches_available_or_minimums() {
        for available in [0u32, 40, 99, 150, 333, 1000, 2999] {
            for n in 1..6 {
                let specs = vec![flexible(); n];
                let a = allocate(&specs, available, LIMITS, AllocationPolicy::Equal).unwrap();
                let expected = available.clamp(50 * n as u32, 1000 * n as u32);
                assert_eq!(a.table_width, expected, "available={} n={}", available, n);
            }
        }
    }

    #[test]
    fn test_max_clamp_leaves_room_unfilled() {
        let limits = WidthLimits { min: 50, max: 100 };
        let a = allocate(&[flexible(), flexible()], 1000, limits, AllocationPolicy::Equal).unwrap();
        assert_eq!(a.widths, vec![100, 100]);
    }

    #[test]
    fn test_ratios_are_proportional() {
        let ratios = [3.0, 1.0, 0.5];
        let specs = [flexible(), flexible(), fixed(100)];
        let a = allocate(&specs, 500, LIMITS, AllocationPolicy::Ratios(&ratios)).unwrap();
        assert_eq!(a.widths, vec![300, 100, 100]);
    }

    #[test]
    fn test_ratio_surplus_goes_to_minimum_columns_first() {
        // 2nd column's share (4px) is clamped up to 50, the rest is taken from the first
        let ratios = [0.99, 0.01];
        let a = allocate(&[flexible(), flexible()], 400, LIMITS, AllocationPolicy::Ratios(&ratios)).unwrap();
        assert_eq!(a.widths, vec![350, 50]);
        assert_eq!(a.table_width, 400);
    }

    #[test]
    fn test_stale_ratios_signal_no_result() {
        let ratios = [1.0];
        assert_eq!(
            allocate(&[flexible(), flexible()], 400, LIMITS, AllocationPolicy::Ratios(&ratios)),
            None
        );
    }

    #[test]
    fn test_column_bounds_override_limits() {
        let spec = WidthSpec { min: Some(200), ..Default::default() };
        let a = allocate(&[spec, flexible()], 300, LIMITS, AllocationPolicy::Equal).unwrap();
        assert_eq!(a.widths, vec![200, 100]);
    }

    #[test]
    fn test_resized_width_is_clamped() {
        let spec = WidthSpec { resized: Some(10), ..Default::default() };
        let a = allocate(&[spec, flexible()], 300, LIMITS, AllocationPolicy::Equal).unwrap();
        assert_eq!(a.widths, vec![50, 250]);
    }

    #[test]
    fn test_huge_widths_saturate_the_table_width() {
        let a = allocate(&[fixed(u32::MAX), fixed(10)], 300, LIMITS, AllocationPolicy::Equal).unwrap();
        assert_eq!(a.table_width, u32::MAX);

        let a = allocate(&[fixed(u32::MAX), flexible()], 300, LIMITS, AllocationPolicy::Equal).unwrap();
        assert_eq!(a.widths, vec![u32::MAX, 50]);
        assert_eq!(a.table_width, u32::MAX);

        let huge = WidthLimits { min: u32::MAX, max: u32::MAX };
        let a = allocate(&[flexible(), flexible()], 300, huge, AllocationPolicy::Equal).unwrap();
        assert_eq!(a.widths, vec![u32::MAX, u32::MAX]);
        assert_eq!(a.table_width, u32::MAX);
        assert_eq!(total_width([u32::MAX, 1, 2]), u32::MAX);
    }
}
