//! Cycle arbitrage: bounded-depth search for profitable closed loops.
//!
//! Each search root only extends into tokens with a higher address, so every
//! simple cycle is found exactly once, from the rotation that starts at its
//! smallest token. Parallel pools are branched on individually; when several
//! pool choices close the same token loop, the most profitable one is kept.

use std::collections::HashMap;

use rayon::prelude::*;
use rust_decimal::Decimal;
use smallvec::SmallVec;
use tracing::{debug, info, instrument};

use crate::config::{ScanConfig, MAX_CYCLE_LENGTH_CAP, MIN_CYCLE_LENGTH};
use crate::market::Address;
use crate::metrics;
use crate::pricing::{ExchangeRate, RateGraph, PRECISION_FLOOR};

use super::costs::{gas_in_token, CostModel};
use super::opportunity::{
    tickers, LegRole, Opportunity, OpportunityKind, OpportunityLeg, SkipReason, SkippedCandidate,
};

/// Output of a cycle scan.
#[derive(Debug, Clone, Default)]
pub struct CycleScan {
    /// Profitable cycles, best first, one per token loop.
    pub opportunities: Vec<Opportunity>,
    /// Roots and partial paths that could not be evaluated.
    pub skipped: Vec<SkippedCandidate>,
    /// Closed cycles whose profitability was evaluated.
    pub candidates_evaluated: usize,
    /// Roots searched.
    pub roots_searched: usize,
}

impl CycleScan {
    fn merge(mut self, other: Self) -> Self {
        self.opportunities.extend(other.opportunities);
        self.skipped.extend(other.skipped);
        self.candidates_evaluated += other.candidates_evaluated;
        self.roots_searched += other.roots_searched;
        self
    }
}

/// Search every token for profitable cycles of length 3..=`max_cycle_length`.
#[instrument(skip_all, fields(tokens = graph.token_count(), max_length = config.max_cycle_length))]
pub fn scan_cycles(graph: &RateGraph, config: &ScanConfig) -> CycleScan {
    let _timer = metrics::timer_cycle_search();
    let costs = CostModel::from_config(config);
    let roots: Vec<&Address> = graph.tokens().map(|t| &t.address).collect();

    let merged = roots
        .par_iter()
        .map(|root| search_root(graph, config, &costs, root))
        .reduce(CycleScan::default, CycleScan::merge);

    let mut scan = CycleScan {
        opportunities: dedupe(merged.opportunities),
        ..merged
    };
    sort_by_profit(&mut scan.opportunities);

    debug!(
        roots = scan.roots_searched,
        candidates = scan.candidates_evaluated,
        found = scan.opportunities.len(),
        skipped = scan.skipped.len(),
        "Cycle search complete"
    );
    scan
}

/// Best first; ties broken by path so output is deterministic.
pub(crate) fn sort_by_profit(opportunities: &mut [Opportunity]) {
    opportunities.sort_by(|a, b| {
        b.profit_score
            .cmp(&a.profit_score)
            .then_with(|| a.path.cmp(&b.path))
    });
}

/// Canonical key of a cycle: its tokens rotated to start at the smallest.
fn canonical_key(path: &[Address]) -> Vec<Address> {
    let open = match path.split_last() {
        Some((last, rest)) if Some(last) == rest.first() => rest,
        _ => path,
    };
    let start = open
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map_or(0, |(i, _)| i);
    open[start..].iter().chain(&open[..start]).cloned().collect()
}

fn dedupe(opportunities: Vec<Opportunity>) -> Vec<Opportunity> {
    let mut best: HashMap<Vec<Address>, Opportunity> = HashMap::with_capacity(opportunities.len());
    for opportunity in opportunities {
        let key = canonical_key(&opportunity.path);
        match best.get(&key) {
            Some(kept) if kept.profit_score >= opportunity.profit_score => {}
            _ => {
                best.insert(key, opportunity);
            }
        }
    }
    best.into_values().collect()
}

fn search_root(
    graph: &RateGraph,
    config: &ScanConfig,
    costs: &CostModel,
    root: &Address,
) -> CycleScan {
    let mut result = CycleScan {
        roots_searched: 1,
        ..CycleScan::default()
    };

    let costs_in_root = gas_in_token(config, graph, root).and_then(|gas| {
        let threshold = Decimal::ONE
            .checked_add(config.min_profit_margin)
            .ok_or(SkipReason::ArithmeticOverflow)?;
        Ok((gas, threshold))
    });
    let (gas, threshold) = match costs_in_root {
        Ok(costs) => costs,
        Err(reason) => {
            debug!(root = %root, ?reason, "Cycle root skipped");
            result.skipped.push(SkippedCandidate {
                kind: OpportunityKind::Cycle,
                tokens: vec![*root],
                reason,
            });
            return result;
        }
    };

    let mut search = RootSearch {
        graph,
        config,
        costs,
        root,
        gas,
        threshold,
        tokens: SmallVec::new(),
        legs: SmallVec::new(),
        explored: 0,
        exhausted: false,
        result,
    };
    search.tokens.push(root);
    search.extend(root, Decimal::ONE, Decimal::ONE);
    search.result
}

struct RootSearch<'a> {
    graph: &'a RateGraph,
    config: &'a ScanConfig,
    costs: &'a CostModel,
    root: &'a Address,
    gas: Decimal,
    threshold: Decimal,
    tokens: SmallVec<[&'a Address; MAX_CYCLE_LENGTH_CAP]>,
    legs: SmallVec<[(&'a ExchangeRate, Decimal); MAX_CYCLE_LENGTH_CAP]>,
    explored: usize,
    exhausted: bool,
    result: CycleScan,
}

impl<'a> RootSearch<'a> {
    /// Count one path extension against the root's budget.
    fn spend(&mut self) -> bool {
        if self.explored >= self.config.max_paths_per_root {
            if !self.exhausted {
                self.exhausted = true;
                debug!(root = %self.root, explored = self.explored, "Search budget exhausted");
                self.result.skipped.push(SkippedCandidate {
                    kind: OpportunityKind::Cycle,
                    tokens: vec![*self.root],
                    reason: SkipReason::SearchBudgetExhausted {
                        explored: self.explored,
                    },
                });
            }
            return false;
        }
        self.explored += 1;
        true
    }

    fn skip_overflow(&mut self, next: &Address) {
        let mut tokens: Vec<Address> = self.tokens.iter().map(|t| **t).collect();
        tokens.push(*next);
        self.result.skipped.push(SkippedCandidate {
            kind: OpportunityKind::Cycle,
            tokens,
            reason: SkipReason::ArithmeticOverflow,
        });
    }

    fn extend(&mut self, current: &'a Address, gross: Decimal, effective: Decimal) {
        let graph = self.graph;

        for (next, edges) in graph.neighbors(current) {
            if next == self.root {
                if self.tokens.len() < MIN_CYCLE_LENGTH {
                    continue;
                }
                for edge in edges {
                    if !self.spend() {
                        return;
                    }
                    self.close(edge, gross, effective);
                }
                continue;
            }

            if next < self.root
                || self.tokens.len() >= self.config.max_cycle_length
                || self.tokens.contains(&next)
            {
                continue;
            }

            for edge in edges {
                if !self.spend() {
                    return;
                }
                let step = self.costs.effective_sell(edge.rate, edge.fee());
                let products = step.and_then(|step| {
                    Some((
                        gross.checked_mul(edge.rate)?,
                        effective.checked_mul(step)?,
                        step,
                    ))
                });
                let Some((next_gross, next_effective, step)) = products else {
                    self.skip_overflow(next);
                    continue;
                };

                self.tokens.push(next);
                self.legs.push((edge, step));
                self.extend(next, next_gross, next_effective);
                self.legs.pop();
                self.tokens.pop();

                if self.exhausted {
                    return;
                }
            }
        }
    }

    fn close(&mut self, edge: &'a ExchangeRate, gross: Decimal, effective: Decimal) {
        let hops = self.tokens.len();
        let evaluated = self
            .costs
            .effective_sell(edge.rate, edge.fee())
            .and_then(|step| {
                let gross = gross.checked_mul(edge.rate)?;
                let effective = effective.checked_mul(step)?;
                let gas = self.gas.checked_mul(Decimal::from(hops))?;
                Some((gross, effective.checked_sub(gas)?, step))
            });
        let Some((gross_rate, net_rate, step)) = evaluated else {
            self.skip_overflow(self.root);
            return;
        };
        self.result.candidates_evaluated += 1;

        let Some(excess) = net_rate.checked_sub(self.threshold) else {
            self.skip_overflow(self.root);
            return;
        };
        if excess <= PRECISION_FLOOR {
            return;
        }

        let mut path: Vec<Address> = self.tokens.iter().map(|t| **t).collect();
        path.push(*self.root);
        let legs = self
            .legs
            .iter()
            .chain(std::iter::once(&(edge, step)))
            .map(|(e, s)| OpportunityLeg::from_edge(LegRole::Hop, e, *s))
            .collect();

        let opportunity = Opportunity {
            kind: OpportunityKind::Cycle,
            tickers: tickers(self.graph, &path),
            path,
            legs,
            gross_rate: gross_rate.normalize(),
            net_rate: net_rate.normalize(),
            profit_score: (net_rate - Decimal::ONE).normalize(),
        };
        info!(
            cycle = %opportunity.tickers.join("→"),
            net_rate = %opportunity.net_rate,
            "Cycle opportunity detected"
        );
        self.result.opportunities.push(opportunity);
    }
}
