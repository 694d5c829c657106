//! Collections kept current by realtime domain events.
//!
//! A [`LiveCollection`] is seeded from the REST API and then folds every
//! matching [`DomainEvent`] from an [`EventHub`] into an ordered list. The
//! folding rules live in a [`Reducer`]; [`BidReducer`] and [`CustomerReducer`]
//! cover the two collections the dashboard keeps live.

use std::marker::PhantomData;
use std::sync::{Arc, RwLock};

use tokio::sync::watch;

use crate::hub::{ConnectionState, EventHub, EventKind, HubEvent, Subscription};
use crate::models::{Bid, Customer, DomainEvent};

/// Records addressable by a stable id.
pub trait Identified {
    fn id(&self) -> &str;
}

impl Identified for Bid {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for Customer {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Ordered records, newest first, at most one per id.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityCollection<T> {
    items: Vec<T>,
}

impl<T> Default for EntityCollection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Identified> EntityCollection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    /// Insert at the front. A record whose id is already present replaces
    /// the existing one where it stands instead.
    pub fn prepend(&mut self, item: T) {
        match self.position(item.id()) {
            Some(pos) => self.items[pos] = item,
            None => self.items.insert(0, item),
        }
    }

    /// Replace the record with the same id, keeping its position. Returns
    /// `false` when no such record exists.
    pub fn replace(&mut self, item: T) -> bool {
        match self.position(item.id()) {
            Some(pos) => {
                self.items[pos] = item;
                true
            },
            None => false,
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<T> {
        self.position(id).map(|pos| self.items.remove(pos))
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        self.items.iter_mut().find(|item| item.id() == id)
    }

    /// Replace the whole contents, dropping later duplicates of an id.
    pub fn seed(&mut self, items: Vec<T>) {
        self.items.clear();
        for item in items {
            if self.position(item.id()).is_none() {
                self.items.push(item);
            }
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T> From<EntityCollection<T>> for Vec<T> {
    fn from(collection: EntityCollection<T>) -> Self {
        collection.items
    }
}

/// Folding rules from domain events to one collection.
pub trait Reducer: Send + Sync + 'static {
    type Item: Identified + Clone + Send + Sync + 'static;

    /// Event kinds the collection subscribes to.
    const KINDS: &'static [EventKind];

    /// Apply `event`. Returns whether the collection changed.
    fn apply(collection: &mut EntityCollection<Self::Item>, event: &DomainEvent) -> bool;
}

/// `bid_*` events onto a bid list.
#[derive(Debug, Clone, Copy, Default)]
pub struct BidReducer;

impl Reducer for BidReducer {
    type Item = Bid;

    const KINDS: &'static [EventKind] = &[
        EventKind::BidCreated,
        EventKind::BidUpdated,
        EventKind::BidDeleted,
        EventKind::BidStatusChanged,
    ];

    fn apply(bids: &mut EntityCollection<Bid>, event: &DomainEvent) -> bool {
        match event {
            DomainEvent::BidCreated(bid) => {
                bids.prepend(bid.clone());
                true
            },
            DomainEvent::BidUpdated(bid) => bids.replace(bid.clone()),
            DomainEvent::BidDeleted(target) => bids.remove(&target.id).is_some(),
            DomainEvent::BidStatusChanged(change) => match bids.get_mut(&change.id) {
                Some(bid) if bid.status != change.status => {
                    bid.status = change.status.clone();
                    true
                },
                _ => false,
            },
            DomainEvent::CustomerCreated(_)
            | DomainEvent::CustomerUpdated(_)
            | DomainEvent::CustomerDeleted(_) => false,
        }
    }
}

/// `customer_*` events onto a customer list.
#[derive(Debug, Clone, Copy, Default)]
pub struct CustomerReducer;

impl Reducer for CustomerReducer {
    type Item = Customer;

    const KINDS: &'static [EventKind] = &[
        EventKind::CustomerCreated,
        EventKind::CustomerUpdated,
        EventKind::CustomerDeleted,
    ];

    fn apply(customers: &mut EntityCollection<Customer>, event: &DomainEvent) -> bool {
        match event {
            DomainEvent::CustomerCreated(customer) => {
                customers.prepend(customer.clone());
                true
            },
            DomainEvent::CustomerUpdated(customer) => customers.replace(customer.clone()),
            DomainEvent::CustomerDeleted(target) => customers.remove(&target.id).is_some(),
            DomainEvent::BidCreated(_)
            | DomainEvent::BidUpdated(_)
            | DomainEvent::BidDeleted(_)
            | DomainEvent::BidStatusChanged(_) => false,
        }
    }
}

struct LiveInner<R: Reducer> {
    items: RwLock<EntityCollection<R::Item>>,
    version: watch::Sender<u64>,
}

impl<R: Reducer> LiveInner<R> {
    fn mutate(&self, f: impl FnOnce(&mut EntityCollection<R::Item>) -> bool) {
        let changed = {
            let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
            f(&mut items)
        };
        if changed {
            self.version.send_modify(|v| *v += 1);
        }
    }
}

/// A collection subscribed to an [`EventHub`] for as long as it lives.
///
/// ```rust,no_run
/// use bid_review_link::{EventHub, LiveBids};
///
/// # async fn run(hub: &EventHub, initial: Vec<bid_review_link::Bid>) {
/// let bids = LiveBids::attach(hub);
/// bids.seed(initial);
/// loop {
///     bids.changed().await;
///     println!("{} bids", bids.len());
/// }
/// # }
/// ```
pub struct LiveCollection<R: Reducer> {
    inner: Arc<LiveInner<R>>,
    state: watch::Receiver<ConnectionState>,
    _subscriptions: Vec<Subscription>,
    _reducer: PhantomData<R>,
}

pub type LiveBids = LiveCollection<BidReducer>;
pub type LiveCustomers = LiveCollection<CustomerReducer>;

impl<R: Reducer> LiveCollection<R> {
    pub fn attach(hub: &EventHub) -> Self {
        let inner = Arc::new(LiveInner::<R> {
            items: RwLock::new(EntityCollection::new()),
            version: watch::channel(0).0,
        });

        let subscriptions = R::KINDS
            .iter()
            .map(|&kind| {
                let inner = inner.clone();
                hub.subscribe(kind, move |event: &HubEvent| {
                    if let Some(domain) = event.as_domain() {
                        inner.mutate(|items| R::apply(items, domain));
                    }
                })
            })
            .collect();

        Self {
            inner,
            state: hub.watch_state(),
            _subscriptions: subscriptions,
            _reducer: PhantomData,
        }
    }

    /// Replace the contents with an initial load.
    pub fn seed(&self, items: Vec<R::Item>) {
        self.inner.mutate(|collection| {
            collection.seed(items);
            true
        });
    }

    pub fn snapshot(&self) -> Vec<R::Item> {
        let items = self.inner.items.read().unwrap_or_else(|e| e.into_inner());
        items.as_slice().to_vec()
    }

    pub fn get(&self, id: &str) -> Option<R::Item> {
        let items = self.inner.items.read().unwrap_or_else(|e| e.into_inner());
        items.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.items.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the hub feeding this collection is currently connected.
    pub fn is_connected(&self) -> bool {
        *self.state.borrow() == ConnectionState::Connected
    }

    /// Bumped on every change.
    pub fn version(&self) -> u64 {
        *self.inner.version.borrow()
    }

    /// Wait for the next change and return the new version.
    pub async fn changed(&self) -> u64 {
        let mut rx = self.inner.version.subscribe();
        // The sender lives in `inner`, so this only returns on a change.
        let _ = rx.changed().await;
        let version = *rx.borrow();
        version
    }
}

impl<R: Reducer> std::fmt::Debug for LiveCollection<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveCollection")
            .field("len", &self.len())
            .field("version", &self.version())
            .field("connected", &self.is_connected())
            .finish()
    }
}
