//! Round-based simulation driver.
//!
//! Each round may issue a user intent (filter change, load more, retry),
//! then delivers every in-flight response whose delay has elapsed — in
//! shuffled order, so completions regularly arrive out of issue order. The
//! oracle runs after every single delivery.

use crate::oracle;
use crate::rng::DeterministicRng;
use crate::source::{FaultConfig, SimulatedSource};
use anyhow::{Context, Result};
use raves_core::{FeedSession, Filter, MergeEffect, PageRequest};
use std::collections::HashMap;

/// Simulation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimConfig {
    pub seed: u64,
    pub rounds: u32,
    pub corpus_size: u32,
    pub per_page: u32,
    pub fault: FaultConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            rounds: 200,
            corpus_size: 120,
            per_page: 10,
            fault: FaultConfig::default(),
        }
    }
}

/// Tallies of what one simulation run observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimReport {
    pub intents_issued: u32,
    pub resets: u32,
    pub appends: u32,
    pub stale_drops: u32,
    pub failures: u32,
}

#[derive(Debug, Clone)]
struct Flight {
    request: PageRequest,
    deliver_at_round: u32,
}

/// Drives one [`FeedSession`] against a [`SimulatedSource`].
#[derive(Debug)]
pub struct SimDriver {
    session: FeedSession,
    source: SimulatedSource,
    rng: DeterministicRng,
    in_flight: Vec<Flight>,
    filters_by_epoch: HashMap<u64, Filter>,
    filter_pool: Vec<Filter>,
    report: SimReport,
}

impl SimDriver {
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        let source = SimulatedSource::generate(
            config.seed,
            config.corpus_size,
            config.per_page,
            config.fault,
        );
        let filter_pool = vec![
            Filter::default(),
            Filter::new(Some("login"), []),
            Filter::new(Some("sync"), [4, 5]),
            Filter::new(None, [1]),
            Filter::new(Some("battery"), []),
            Filter::new(None, [2, 3]),
        ];

        Self {
            session: FeedSession::new(),
            source,
            rng: DeterministicRng::new(config.seed.wrapping_add(1)),
            in_flight: Vec::new(),
            filters_by_epoch: HashMap::new(),
            filter_pool,
            report: SimReport::default(),
        }
    }

    /// Run the configured number of rounds, checking invariants after every
    /// delivered response.
    pub fn run(&mut self, config: &SimConfig) -> Result<SimReport> {
        for round in 0..config.rounds {
            self.maybe_issue_intent(round, config.fault.max_delay_rounds);
            self.deliver_ready(round)
                .with_context(|| format!("invariant violated in round {round}"))?;
        }

        // Drain whatever is still outstanding.
        let last = config.rounds;
        for flight in std::mem::take(&mut self.in_flight) {
            self.deliver_one(&flight.request)
                .with_context(|| format!("invariant violated draining after round {last}"))?;
        }

        tracing::debug!(report = ?self.report, "simulation finished");
        Ok(self.report)
    }

    fn maybe_issue_intent(&mut self, round: u32, max_delay: u8) {
        let roll = self.rng.next_bounded(100);
        let request = if roll < 25 {
            let pick = usize::try_from(self.rng.next_bounded(self.filter_pool.len() as u64))
                .unwrap_or(0);
            let filter = self.filter_pool[pick].clone();
            Some(self.session.set_filter(filter))
        } else if roll < 55 {
            self.session.load_more().ok()
        } else if roll < 60 {
            self.session.retry_last()
        } else {
            None
        };

        if let Some(request) = request {
            self.report.intents_issued += 1;
            self.filters_by_epoch
                .insert(request.epoch, request.filter.clone());
            let delay = u32::from(
                u8::try_from(self.rng.next_bounded(u64::from(max_delay) + 1)).unwrap_or(max_delay),
            );
            self.in_flight.push(Flight {
                request,
                deliver_at_round: round.saturating_add(delay),
            });
        }
    }

    fn deliver_ready(&mut self, round: u32) -> Result<()> {
        let mut ready: Vec<Flight> = Vec::new();
        let mut future: Vec<Flight> = Vec::new();
        for flight in self.in_flight.drain(..) {
            if flight.deliver_at_round <= round {
                ready.push(flight);
            } else {
                future.push(flight);
            }
        }
        self.in_flight = future;

        // Arbitrary completion order is the whole point.
        self.rng.shuffle(&mut ready);

        for flight in ready {
            self.deliver_one(&flight.request)?;
        }
        Ok(())
    }

    fn deliver_one(&mut self, request: &PageRequest) -> Result<()> {
        let outcome = self.source.serve(request, &mut self.rng);
        let effect = self
            .session
            .complete(request, outcome, crate::source::sim_now());

        match effect {
            MergeEffect::Reset { .. } => self.report.resets += 1,
            MergeEffect::Appended { .. } => self.report.appends += 1,
            MergeEffect::Stale => self.report.stale_drops += 1,
            MergeEffect::Failed(_) => self.report.failures += 1,
            MergeEffect::NothingNew => {}
        }

        oracle::check(&self.session, &self.source, &self.filters_by_epoch)
    }

    /// The session under test, for end-of-run assertions.
    #[must_use]
    pub const fn session(&self) -> &FeedSession {
        &self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_run_exercises_every_merge_path() {
        let config = SimConfig {
            seed: 1234,
            rounds: 400,
            ..SimConfig::default()
        };
        let mut driver = SimDriver::new(config);
        let report = driver.run(&config).expect("invariants hold");

        assert!(report.intents_issued > 0);
        assert!(report.resets > 0, "no reset ever committed: {report:?}");
        assert!(report.appends > 0, "no append ever committed: {report:?}");
        assert!(report.stale_drops > 0, "no stale drop observed: {report:?}");
    }

    #[test]
    fn same_seed_reproduces_the_same_report() {
        let config = SimConfig::default();
        let first = SimDriver::new(config).run(&config).expect("invariants hold");
        let second = SimDriver::new(config).run(&config).expect("invariants hold");
        assert_eq!(first, second);
    }
}
