// This module holds the execution witness: the event collection plus the relation
// collections (program order, read-from, coherence order) the code generator
// populates while emitting a litmus test and while routing runtime feedback. The
// witness is write-only from the code generator's point of view; the axiomatic
// checker that consumes it afterwards is external to this crate, so EventSet and
// EventRel implement only insertion and queries, none of the relation algebra
// (closures, acyclicity) that checker owns. EventSet::insert returns the inserted
// event to mirror insertion-with-identity-return; insert_unique additionally
// asserts freshness, which catches allocator bugs that would mint duplicate
// identifiers.

//! Execution witness: event set and ordering relations.

use hashbrown::{HashMap, HashSet};

use super::event::Event;

/// Set of all events of one candidate execution.
#[derive(Debug, Default, Clone)]
pub struct EventSet {
    events: HashSet<Event>,
}

impl EventSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert with identity return; duplicates are silently deduplicated.
    /// Used for initial-value events, which may be materialized repeatedly.
    pub fn insert(&mut self, event: Event) -> Event {
        self.events.insert(event);
        event
    }

    /// Insert an event that must not already exist.
    ///
    /// Allocator-minted events carry globally unique identifiers; a collision
    /// here means the identifier space was corrupted.
    pub fn insert_unique(&mut self, event: Event) -> Event {
        let fresh = self.events.insert(event);
        assert!(fresh, "duplicate event inserted into witness: {event:?}");
        event
    }

    pub fn contains(&self, event: &Event) -> bool {
        self.events.contains(event)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

/// Binary relation over events, stored as an adjacency map.
#[derive(Debug, Default, Clone)]
pub struct EventRel {
    adjacency: HashMap<Event, HashSet<Event>>,
    len: usize,
}

impl EventRel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, from: Event, to: Event) {
        if self.adjacency.entry(from).or_default().insert(to) {
            self.len += 1;
        }
    }

    pub fn contains(&self, from: &Event, to: &Event) -> bool {
        self.adjacency
            .get(from)
            .is_some_and(|successors| successors.contains(to))
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (Event, Event)> + '_ {
        self.adjacency
            .iter()
            .flat_map(|(from, successors)| successors.iter().map(move |to| (*from, *to)))
    }

    pub fn clear(&mut self) {
        self.adjacency.clear();
        self.len = 0;
    }
}

/// The formal record of one concrete execution.
///
/// The code generator fills `events` and `po` while emitting, and `rf`/`co`
/// when the host reports values the compiled code observed at run time.
#[derive(Debug, Default, Clone)]
pub struct ExecWitness {
    pub events: EventSet,
    /// Program order: per-thread static issue order.
    pub po: EventRel,
    /// Read-from: write observed by a read.
    pub rf: EventRel,
    /// Coherence order: order of writes to one location.
    pub co: EventRel,
}

impl ExecWitness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.po.clear();
        self.rf.clear();
        self.co.clear();
    }
}
