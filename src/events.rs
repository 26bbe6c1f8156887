// ============================================================================
// Market Events - PolyMini
// ============================================================================
//
// Every successful state change emits one event. Events are kept in a
// bounded in-memory log (for `GET /events`) and fanned out to live
// subscribers over a tokio broadcast channel. A lagging or absent
// subscriber never blocks the registry.
//
// ============================================================================

use serde::Serialize;
use std::collections::VecDeque;
use tokio::sync::broadcast;

use crate::ledger::{Address, Amount};
use crate::market_resolve::MarketId;
use crate::shares::Outcome;

/// Maximum number of events kept in memory
pub const MAX_EVENT_HISTORY: usize = 1000;

/// Capacity of the live broadcast channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketEvent {
    MarketCreated {
        market: MarketId,
        creator: Address,
        question: String,
        close_time: u64,
    },
    LiquidityAdded {
        market: MarketId,
        provider: Address,
        amount: Amount,
    },
    Split {
        market: MarketId,
        account: Address,
        amount: Amount,
    },
    Merged {
        market: MarketId,
        account: Address,
        amount: Amount,
    },
    Swapped {
        market: MarketId,
        account: Address,
        outcome_in: Outcome,
        amount_in: Amount,
        amount_out: Amount,
        fee: Amount,
    },
    Bought {
        market: MarketId,
        account: Address,
        outcome: Outcome,
        collateral_in: Amount,
        total_out: Amount,
    },
    Resolved {
        market: MarketId,
        outcome: Outcome,
    },
    Redeemed {
        market: MarketId,
        account: Address,
        payout: Amount,
    },
    PoolRedeemed {
        market: MarketId,
        to: Address,
        payout: Amount,
    },
}

impl MarketEvent {
    pub fn market(&self) -> MarketId {
        match self {
            MarketEvent::MarketCreated { market, .. }
            | MarketEvent::LiquidityAdded { market, .. }
            | MarketEvent::Split { market, .. }
            | MarketEvent::Merged { market, .. }
            | MarketEvent::Swapped { market, .. }
            | MarketEvent::Bought { market, .. }
            | MarketEvent::Resolved { market, .. }
            | MarketEvent::Redeemed { market, .. }
            | MarketEvent::PoolRedeemed { market, .. } => *market,
        }
    }
}

/// An event plus its position in the stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    pub seq: u64,
    pub timestamp: u64,
    #[serde(flatten)]
    pub event: MarketEvent,
}

#[derive(Debug)]
pub struct EventLog {
    records: VecDeque<EventRecord>,
    next_seq: u64,
    sender: broadcast::Sender<EventRecord>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            records: VecDeque::new(),
            next_seq: 1,
            sender,
        }
    }

    pub fn emit(&mut self, event: MarketEvent, timestamp: u64) -> u64 {
        let record = EventRecord {
            seq: self.next_seq,
            timestamp,
            event,
        };
        self.next_seq += 1;

        // No receivers is not an error
        let _ = self.sender.send(record.clone());

        self.records.push_back(record);
        if self.records.len() > MAX_EVENT_HISTORY {
            self.records.pop_front();
        }
        self.next_seq - 1
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.sender.subscribe()
    }

    /// Retained events with `seq > since`, oldest first
    pub fn since(&self, since: u64) -> Vec<EventRecord> {
        self.records
            .iter()
            .filter(|record| record.seq > since)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
