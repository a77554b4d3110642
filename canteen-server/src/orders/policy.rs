//! Delivery assignment policy
//!
//! Pure selection over candidate lists. Callers read candidates and loads
//! inside the same write transaction that persists the chosen assignment,
//! so two concurrent selections cannot both see the same free slot.

use std::collections::HashMap;

/// A candidate and the number of deliveries they currently carry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffLoad {
    pub staff_id: String,
    pub load: usize,
}

impl StaffLoad {
    pub fn new(staff_id: impl Into<String>, load: usize) -> Self {
        Self {
            staff_id: staff_id.into(),
            load,
        }
    }
}

/// Pair candidate IDs (in directory order) with their loads
pub fn with_loads<I>(candidate_ids: I, loads: &HashMap<String, usize>) -> Vec<StaffLoad>
where
    I: IntoIterator<Item = String>,
{
    candidate_ids
        .into_iter()
        .map(|id| {
            let load = loads.get(&id).copied().unwrap_or(0);
            StaffLoad { staff_id: id, load }
        })
        .collect()
}

/// Index of the least-loaded candidate strictly below `cap`
///
/// Ties go to the earliest candidate in input order.
pub fn pick_least_loaded(candidates: &[StaffLoad], cap: usize) -> Option<usize> {
    candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| c.load < cap)
        .min_by_key(|(_, c)| c.load)
        .map(|(index, _)| index)
}

/// Greedy plan for a batch of orders (already sorted oldest first)
///
/// Each pick bumps that candidate's load before the next order is
/// considered. Stops at the first order nobody can take.
pub fn plan_sweep(
    order_ids: &[String],
    mut candidates: Vec<StaffLoad>,
    cap: usize,
) -> Vec<(String, String)> {
    let mut assignments = Vec::new();
    for order_id in order_ids {
        let Some(index) = pick_least_loaded(&candidates, cap) else {
            break;
        };
        let picked = &mut candidates[index];
        picked.load += 1;
        assignments.push((order_id.clone(), picked.staff_id.clone()));
    }
    assignments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("o{}", i)).collect()
    }

    #[test]
    fn test_pick_least_loaded() {
        let candidates = vec![StaffLoad::new("a", 2), StaffLoad::new("b", 1)];
        assert_eq!(pick_least_loaded(&candidates, 3), Some(1));
    }

    #[test]
    fn test_pick_tie_goes_to_first() {
        let candidates = vec![
            StaffLoad::new("a", 1),
            StaffLoad::new("b", 0),
            StaffLoad::new("c", 0),
        ];
        assert_eq!(pick_least_loaded(&candidates, 3), Some(1));
    }

    #[test]
    fn test_pick_respects_cap() {
        let candidates = vec![StaffLoad::new("a", 3), StaffLoad::new("b", 3)];
        assert_eq!(pick_least_loaded(&candidates, 3), None);
        assert_eq!(pick_least_loaded(&[], 3), None);
    }

    #[test]
    fn test_sweep_updates_loads_between_picks() {
        // loads {0, 2}, cap 3 → all three go to the idle candidate; the
        // third pick is a 2/2 tie that falls to the earlier candidate
        let candidates = vec![StaffLoad::new("idle", 0), StaffLoad::new("busy", 2)];
        let plan = plan_sweep(&ids(3), candidates, 3);
        let picked: Vec<_> = plan.iter().map(|(_, s)| s.as_str()).collect();
        assert_eq!(picked, vec!["idle", "idle", "idle"]);
    }

    #[test]
    fn test_sweep_stops_when_capacity_exhausted() {
        let candidates = vec![StaffLoad::new("a", 2), StaffLoad::new("b", 3)];
        let plan = plan_sweep(&ids(4), candidates, 3);
        assert_eq!(plan, vec![("o1".to_string(), "a".to_string())]);
    }

    #[test]
    fn test_sweep_alternates_when_balanced() {
        let candidates = vec![StaffLoad::new("a", 0), StaffLoad::new("b", 0)];
        let plan = plan_sweep(&ids(4), candidates, 3);
        let picked: Vec<_> = plan.iter().map(|(_, s)| s.as_str()).collect();
        assert_eq!(picked, vec!["a", "b", "a", "b"]);
    }

    #[test]
    fn test_with_loads_defaults_to_zero() {
        let mut loads = HashMap::new();
        loads.insert("b".to_string(), 2);
        let result = with_loads(vec!["a".to_string(), "b".to_string()], &loads);
        assert_eq!(result, vec![StaffLoad::new("a", 0), StaffLoad::new("b", 2)]);
    }
}
