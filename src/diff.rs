use std::collections::BTreeSet;

/// Change in the open-port set of a target between two scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortDiff {
    /// No earlier scan exists; the current one becomes the baseline.
    Baseline,
    Unchanged,
    Changed {
        new: BTreeSet<u16>,
        closed: BTreeSet<u16>,
    },
}

/// Compare the previous open-port set (if any) against the current one.
pub fn compute_diff(previous: Option<&BTreeSet<u16>>, current: &BTreeSet<u16>) -> PortDiff {
    let Some(previous) = previous else {
        return PortDiff::Baseline;
    };
    let new: BTreeSet<u16> = current.difference(previous).copied().collect();
    let closed: BTreeSet<u16> = previous.difference(current).copied().collect();
    if new.is_empty() && closed.is_empty() {
        PortDiff::Unchanged
    } else {
        PortDiff::Changed { new, closed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ports: &[u16]) -> BTreeSet<u16> {
        ports.iter().copied().collect()
    }

    #[test]
    fn new_and_closed_ports() {
        let prev = set(&[80, 443]);
        let diff = compute_diff(Some(&prev), &set(&[443, 8080]));
        assert_eq!(
            diff,
            PortDiff::Changed {
                new: set(&[8080]),
                closed: set(&[80]),
            }
        );
    }

    #[test]
    fn first_scan_is_baseline_not_all_new() {
        assert_eq!(compute_diff(None, &set(&[22, 80])), PortDiff::Baseline);
        assert_eq!(compute_diff(None, &set(&[])), PortDiff::Baseline);
    }

    #[test]
    fn same_set_is_unchanged() {
        let prev = set(&[22, 80]);
        assert_eq!(compute_diff(Some(&prev), &set(&[80, 22])), PortDiff::Unchanged);
    }

    #[test]
    fn everything_closed() {
        let prev = set(&[22]);
        assert_eq!(
            compute_diff(Some(&prev), &set(&[])),
            PortDiff::Changed {
                new: set(&[]),
                closed: set(&[22]),
            }
        );
    }
}
