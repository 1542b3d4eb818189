use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

use delta_kit::prelude::*;
use delta_kit::Result;
use tracing::{debug, info};

use crate::{Order, OrderBuilder, OrderDelta, OrderDeltaBuilder};

/// In-memory store of immutable orders, changed only through builders and
/// deltas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderBook {
    orders: BTreeMap<u64, Arc<Order>>,
}

impl OrderBook {
    /// An empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// The order with the given id.
    pub fn get(&self, id: u64) -> Option<&Arc<Order>> {
        self.orders.get(&id)
    }

    /// Number of stored orders.
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Whether the book holds no orders.
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Orders in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Order>> {
        self.orders.values()
    }

    /// A builder over the stored order, or a fresh one if `id` is unknown.
    pub fn edit(&self, id: u64) -> OrderBuilder {
        match self.orders.get(&id) {
            Some(order) => order.to_builder(),
            None => Order::builder(id),
        }
    }

    /// Store the builder's state and return the delta that describes the
    /// change, if anything changed.
    pub fn commit(&mut self, builder: &OrderBuilder) -> Result<Option<OrderDelta>> {
        let Some(delta) = builder.reconcile()? else {
            debug!(order = builder.id(), "commit without changes");
            return Ok(None);
        };
        self.store(*builder.id(), builder.build());
        info!(order = builder.id(), delta_type = %delta.delta_type(), "committed");
        Ok(Some(delta))
    }

    /// Apply a delta produced elsewhere.
    pub fn apply(&mut self, delta: &OrderDelta) -> Result<()> {
        let id = *delta.id();
        let mut builder = self.edit(id);
        builder.apply_delta(delta)?;
        self.store(id, builder.build());
        debug!(order = id, delta_type = %delta.delta_type(), "applied");
        Ok(())
    }

    /// Deltas that turn `base` into `self`, one per differing order.
    pub fn diff(&self, base: &OrderBook) -> Result<Vec<OrderDelta>> {
        let mut deltas = Vec::new();
        for (id, order) in &self.orders {
            let delta = match base.orders.get(id) {
                Some(theirs) => order
                    .to_builder()
                    .reconcile_against(DeltaType::Update, theirs)?,
                None => order.to_delta(DeltaType::Add)?,
            };
            deltas.extend(delta);
        }
        for (id, theirs) in &base.orders {
            if !self.orders.contains_key(id) {
                deltas.extend(theirs.to_delta(DeltaType::Delete)?);
            }
        }
        Ok(deltas)
    }

    fn store(&mut self, id: u64, order: Option<Arc<Order>>) {
        match order {
            Some(order) => {
                self.orders.insert(id, order);
            }
            None => {
                self.orders.remove(&id);
            }
        }
    }
}

/// Accumulates deltas per order so a batch of edits ships as one delta each.
#[derive(Debug, Default)]
pub struct Journal {
    pending: BTreeMap<u64, OrderDeltaBuilder>,
}

impl Journal {
    /// An empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a delta into the order's pending entry.
    pub fn record(&mut self, delta: &OrderDelta) -> Result<()> {
        match self.pending.entry(*delta.id()) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().add_delta(delta)?;
            }
            Entry::Vacant(entry) => {
                entry.insert(delta.to_delta_builder());
            }
        }
        Ok(())
    }

    /// Number of orders with pending changes.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take every pending delta, dropping those that merged into nothing.
    pub fn drain(&mut self) -> Vec<OrderDelta> {
        std::mem::take(&mut self.pending)
            .into_values()
            .filter_map(|pending| pending.build_delta())
            .collect()
    }
}
