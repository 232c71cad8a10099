use super::marginal::MarginalCostPolicy;
use super::{BidContext, BiddingPolicy, MarginalCost};
use crate::config::AgentConfig;
use crate::instance::{CityId, Task, TaskId};
use crate::topology::TaskDistribution;
use ordered_float::OrderedFloat;

/// Expected marginal cost over likely future tasks.
///
/// Each city pair sharing an endpoint with the offered task or with a
/// won task is a possible next offer. A weightless hypothetical task on
/// that pair joins the committed set, the marginal-cost protocol runs on
/// top of it, and the results are averaged by the pair's probability.
pub struct BayesianPolicy {
    inner: MarginalCostPolicy,
    samples: usize,
}

impl BayesianPolicy {
    pub fn new(inner: MarginalCostPolicy, samples: usize) -> Self {
        BayesianPolicy { inner, samples }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(MarginalCostPolicy::from_config(config), config.bidding.bayesian_samples)
    }

    /// Most probable linked pairs, at most `samples` of them
    fn linked_pairs(
        &self,
        cities: &[CityId],
        distribution: &dyn TaskDistribution,
        offered: &Task,
        committed: &[Task],
    ) -> Vec<(CityId, CityId, f64)> {
        let mut pairs: Vec<(CityId, CityId, f64)> = cities
            .iter()
            .flat_map(|&from| cities.iter().map(move |&to| (from, to)))
            .filter(|&(from, to)| from != to && is_link(from, to, offered, committed))
            .map(|(from, to)| (from, to, distribution.probability(from, to)))
            .filter(|&(_, _, p)| p > 0.0)
            .collect();

        // stable: equal probabilities keep city order
        pairs.sort_by_key(|&(_, _, p)| std::cmp::Reverse(OrderedFloat(p)));
        pairs.truncate(self.samples);
        pairs
    }
}

/// Whether a task from `from` to `to` would share a city with the offer,
/// or start where a won task starts, or end where a won task ends
fn is_link(from: CityId, to: CityId, offered: &Task, committed: &[Task]) -> bool {
    let touches_offer = from == offered.pickup
        || from == offered.delivery
        || to == offered.pickup
        || to == offered.delivery;

    touches_offer || committed.iter().any(|t| from == t.pickup || to == t.delivery)
}

impl BiddingPolicy for BayesianPolicy {
    fn marginal_cost(&self, ctx: &mut BidContext<'_>, task: &Task) -> Option<MarginalCost> {
        let pairs = self.linked_pairs(&ctx.topology.cities(), ctx.distribution, task, ctx.committed);
        let total_weight: f64 = pairs.iter().map(|&(_, _, p)| p).sum();

        if pairs.is_empty() || total_weight <= 0.0 {
            return self.inner.marginal_cost(ctx, task);
        }

        // the plain evaluation provides the routes to commit
        let share = ctx.budget / (pairs.len() as u32 + 1);
        let mut base = self.inner.evaluate(
            ctx.topology,
            ctx.vehicles,
            ctx.committed,
            task,
            share,
            ctx.rng,
        )?;

        let mut expected = 0.0;
        let mut weights = 0.0;
        for (n, &(from, to, p)) in pairs.iter().enumerate() {
            let probe = Task::new(TaskId::probe(n as u32), from, to, 0, 0);
            let mut with_probe = ctx.committed.to_vec();
            with_probe.push(probe);

            if let Some(mc) = self.inner.evaluate(ctx.topology, ctx.vehicles, &with_probe, task, share, ctx.rng) {
                expected += p * mc.value;
                weights += p;
            }
        }

        if weights > 0.0 {
            log::debug!(
                "{}: expected marginal cost {:.2} over {} pairs (plain {:.2})",
                task.id,
                expected / weights,
                pairs.len(),
                base.value
            );
            base.value = expected / weights;
        }

        Some(base)
    }

    fn name(&self) -> &str {
        "Bayesian"
    }
}
