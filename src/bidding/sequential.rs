use super::{BidContext, BiddingPolicy, MarginalCost, Substitution};
use crate::heuristics::construction::{ConstructionHeuristic, LargestVehicleConstruction};
use crate::instance::Task;

/// Every won task is appended to the route of the largest vehicle.
///
/// The marginal cost is the detour from the last delivery (or the vehicle's
/// start) to the pickup plus the pickup-to-delivery distance. No search.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialPolicy;

impl BiddingPolicy for SequentialPolicy {
    fn marginal_cost(&self, ctx: &mut BidContext<'_>, task: &Task) -> Option<MarginalCost> {
        let mut tasks = ctx.committed.to_vec();
        let without = LargestVehicleConstruction.construct(ctx.vehicles, &tasks, ctx.topology)?;
        tasks.push(*task);
        let with = LargestVehicleConstruction.construct(ctx.vehicles, &tasks, ctx.topology)?;

        let cost_with = with.cost(ctx.topology);
        let cost_without = without.cost(ctx.topology);

        Some(MarginalCost {
            value: cost_with - cost_without,
            cost_with,
            cost_without,
            with_solution: with,
            without_solution: without,
            retries: 0,
            substitution: Substitution::default(),
        })
    }

    fn name(&self) -> &str {
        "Sequential"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::VehicleId;
    use crate::test_utils::{generous_budget, line_map, task, vehicle};
    use crate::topology::UniformDistribution;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_append_cost() {
        let map = line_map(10);
        let vehicles = [vehicle(0, 5, 0), vehicle(1, 10, 2)];
        let committed = [task(1, 3, 6, 4)];
        let distribution = UniformDistribution::new(10);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let mut ctx = BidContext {
            topology: &map,
            distribution: &distribution,
            vehicles: &vehicles,
            committed: &committed,
            budget: generous_budget(),
            rng: &mut rng,
        };

        // 6 -> 9 -> 8 after the committed 2 -> 3 -> 6
        let mc = SequentialPolicy.marginal_cost(&mut ctx, &task(2, 9, 8, 7)).unwrap();
        assert!((mc.value - 4.0).abs() < 1e-9);
        assert!((mc.cost_without - 4.0).abs() < 1e-9);
        assert_eq!(mc.with_solution.get(VehicleId(1)).len(), 4);
        assert!(mc.with_solution.get(VehicleId(0)).is_empty());

        assert!(SequentialPolicy.marginal_cost(&mut ctx, &task(3, 1, 2, 11)).is_none());
    }
}
