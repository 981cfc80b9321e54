//! Pluggable transfer cost policies.
//!
//! A policy returns the *increment* of transfer cost a candidate transfer
//! adds to the chain it extends. The engine stores the running total on each
//! label (`arrival_transfer_cost`), so a policy may re-price earlier transfers
//! of the chain by returning `new_total - existing_transfer_cost`.

use std::fmt;

use crate::domain::Mode;
use crate::network::NetworkIndex;

use super::config::{ModeToModePenalties, RaptorParameters};
use super::path::{PathArena, PathElement, PathId};

/// Everything a policy may consult about a candidate transfer.
#[derive(Debug, Clone, Copy)]
pub struct TransferContext<'a> {
    pub arena: &'a PathArena,
    /// The ride label the transfer starts from.
    pub from: PathId,
    pub from_mode: &'a Mode,
    pub to_mode: &'a Mode,
    /// Time at which the transfer ends.
    pub arrival_time: f64,
    /// Seconds from the query departure time to the end of the transfer.
    pub total_travel_time: f64,
    /// Transfers on the chain including this one.
    pub transfer_count: usize,
    /// Transfer cost already attributed to the chain.
    pub existing_transfer_cost: f64,
    pub params: &'a RaptorParameters,
}

/// Converts a candidate transfer into a cost increment.
pub trait TransferCostPolicy: Send + Sync + fmt::Debug {
    fn transfer_cost(&self, ctx: &TransferContext<'_>, network: &NetworkIndex) -> f64;
}

/// The same cost for every transfer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatTransferCost {
    pub cost_per_transfer: f64,
}

impl FlatTransferCost {
    pub fn new(cost_per_transfer: f64) -> Self {
        Self { cost_per_transfer }
    }
}

impl TransferCostPolicy for FlatTransferCost {
    fn transfer_cost(&self, _ctx: &TransferContext<'_>, _network: &NetworkIndex) -> f64 {
        self.cost_per_transfer
    }
}

/// Transfer cost growing with travel time, per
/// [`TransferPenalty`](super::config::TransferPenalty).
///
/// Without mode-to-mode penalties every transfer of the chain costs
/// `penalty(total travel time)`, re-priced as the trip grows. With them, the
/// chain is split into runs of rides of one mode: transfers inside a run cost
/// `penalty(time since the run started)`, and the transfer changing mode has
/// the mode pair penalty added to its base before clamping.
#[derive(Debug, Clone, Default)]
pub struct TimeProportionalTransferCost {
    mode_to_mode: Option<ModeToModePenalties>,
}

impl TimeProportionalTransferCost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode_to_mode(penalties: ModeToModePenalties) -> Self {
        Self {
            mode_to_mode: Some(penalties),
        }
    }

    pub fn mode_to_mode(&self) -> Option<&ModeToModePenalties> {
        self.mode_to_mode.as_ref()
    }
}

impl TransferCostPolicy for TimeProportionalTransferCost {
    fn transfer_cost(&self, ctx: &TransferContext<'_>, network: &NetworkIndex) -> f64 {
        let penalty = &ctx.params.transfer_penalty;
        let Some(mode_to_mode) = &self.mode_to_mode else {
            return penalty.cost(ctx.total_travel_time) * ctx.transfer_count as f64
                - ctx.existing_transfer_cost;
        };

        // The transfer leaving the run carries the pair penalty inside the clamp
        let start = run_start(ctx.arena, ctx.from, network);
        let earlier_in_run = ctx
            .transfer_count
            .saturating_sub(start.transfer_count)
            .saturating_sub(1);
        let elapsed = ctx.arrival_time - start.arrival_time;
        let pair = mode_to_mode.penalty(ctx.from_mode, ctx.to_mode);
        start.arrival_transfer_cost
            + penalty.cost(elapsed) * earlier_in_run as f64
            + penalty.cost_with_base(pair, elapsed)
            - ctx.existing_transfer_cost
    }
}

/// The label the current same-mode run of rides started from: the transfer
/// onto its first ride, or the access label.
fn run_start<'a>(arena: &'a PathArena, ride: PathId, network: &NetworkIndex) -> &'a PathElement {
    let mut current = arena.get(ride);
    if !current.is_ride() {
        return current;
    }
    let mode = network.mode_of(current.route_stop);
    loop {
        let Some(boarding_id) = current.coming_from else {
            return current;
        };
        let boarding = arena.get(boarding_id);
        let previous_ride = if boarding.is_transfer() {
            boarding.coming_from.map(|id| arena.get(id))
        } else if boarding.is_ride() {
            Some(boarding)
        } else {
            None
        };
        match previous_ride {
            Some(previous) if previous.is_ride() && network.mode_of(previous.route_stop) == mode => {
                current = previous;
            }
            _ => return boarding,
        }
    }
}
