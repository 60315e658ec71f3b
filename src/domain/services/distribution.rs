//! Customer-service agent distribution for completed orders

use rand::Rng;

use crate::domain::settings::{AssignmentMode, CsAssignmentSettings, RoundRobinAgent};

/// Agent that should handle the next order, or `None` when the settings leave
/// nobody to pick. Order completion never fails because of this.
///
/// Single mode returns the configured agent verbatim. Round-robin mode draws
/// with `rng`, see [`weighted_pick`].
pub fn pick_agent<R: Rng + ?Sized>(settings: &CsAssignmentSettings, rng: &mut R) -> Option<String> {
    match settings.mode {
        AssignmentMode::Single => settings.single_agent_id.clone(),
        AssignmentMode::RoundRobin => weighted_pick(&settings.round_robin_agents, rng).map(|a| a.cs_agent_id.clone()),
    }
}

/// Weighted draw over `agents`.
///
/// `r` is uniform over `[0, sum of percentages)` and the first agent whose
/// running total exceeds `r` wins. Percentages are relative weights: a list
/// summing to 50 or 300 is used as-is.
pub fn weighted_pick<'a, R: Rng + ?Sized>(agents: &'a [RoundRobinAgent], rng: &mut R) -> Option<&'a RoundRobinAgent> {
    if agents.is_empty() {
        tracing::warn!("round-robin assignment has no agents, order left unassigned");
        return None;
    }
    let total: u64 = agents.iter().map(|a| u64::from(a.percentage)).sum();
    if total == 0 {
        tracing::warn!(agents = agents.len(), "round-robin weights are all zero, order left unassigned");
        return None;
    }

    let r = rng.gen_range(0..total);
    let mut cumulative = 0u64;
    agents.iter().find(|agent| {
        cumulative += u64::from(agent.percentage);
        cumulative > r
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_single_mode_returns_configured_agent() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(pick_agent(&CsAssignmentSettings::single("cs-7"), &mut rng), Some("cs-7".to_string()));
        assert_eq!(pick_agent(&CsAssignmentSettings::default(), &mut rng), None);
    }

    #[test]
    fn test_empty_rotation_is_unassigned() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(pick_agent(&CsAssignmentSettings::round_robin(vec![]), &mut rng), None);
        let zeros = CsAssignmentSettings::round_robin(vec![RoundRobinAgent::new("a", 0)]);
        assert_eq!(pick_agent(&zeros, &mut rng), None);
    }

    #[test]
    fn test_weighted_distribution_converges() {
        let settings = CsAssignmentSettings::round_robin(vec![RoundRobinAgent::new("A", 70), RoundRobinAgent::new("B", 30)]);
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let trials = 100_000;
        let a = (0..trials).filter(|_| pick_agent(&settings, &mut rng).as_deref() == Some("A")).count();
        let share = a as f64 / trials as f64;
        assert!((share - 0.70).abs() < 0.01, "share of A was {share}");
    }

    #[test]
    fn test_weights_are_not_normalised_to_hundred() {
        let settings = CsAssignmentSettings::round_robin(vec![RoundRobinAgent::new("A", 10), RoundRobinAgent::new("B", 30)]);
        let mut rng = StdRng::seed_from_u64(42);
        let trials = 40_000;
        let a = (0..trials).filter(|_| pick_agent(&settings, &mut rng).as_deref() == Some("A")).count();
        let share = a as f64 / trials as f64;
        assert!((share - 0.25).abs() < 0.01, "share of A was {share}");
    }

    #[test]
    fn test_zero_weight_agent_never_picked() {
        let agents = vec![RoundRobinAgent::new("idle", 0), RoundRobinAgent::new("busy", 5)];
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..1_000 {
            assert_eq!(weighted_pick(&agents, &mut rng).unwrap().cs_agent_id, "busy");
        }
    }
}
