// This module implements AssemblerState, the sole authority for minting the
// globally unique identifiers that make the generated code self-describing. Every
// store is compiled to physically write a one-byte WriteId per memory word; the
// allocator mints those ids from a single program-wide counter, records which write
// event produced each id, and writes the id into the data buffer the store
// instruction will embed as its immediate. Loads draw a sequence number from a
// disjoint numeric range so read and write identities can never collide. After the
// compiled program has run, get_write resolves an id the hardware reported back to
// the producing event, falling back to a per-location initial-value event when the
// id is INIT_WRITE, unknown, minted for a different address, or would make an
// instruction observe itself. The counters are deliberately shared across all
// modeled threads: uniqueness must hold program-wide, not per-thread.

//! Identifier and event allocation.

use hashbrown::HashMap;
use log::warn;

use crate::memmodel::{Event, EventKind, ExecWitness, Iiid};
use crate::types::{Addr, Pid, Poi, WriteId};

/// Mints write/read identifiers and resolves observed write ids back to events.
///
/// Lifecycle is exactly one compilation pass: [`reset`](Self::reset) before
/// emitting, then allocation during emission, then resolution while the host
/// reports runtime observations.
#[derive(Debug)]
pub struct AssemblerState {
    writes: HashMap<WriteId, Event>,
    last_write_id: WriteId,
    last_read_id: Poi,
}

impl AssemblerState {
    /// Largest store the emitter may issue, in bytes.
    pub const MAX_INST_SIZE: usize = 8;
    /// Events (word-sized chunks) a single instruction can produce.
    pub const MAX_INST_EVTS: usize = Self::MAX_INST_SIZE / std::mem::size_of::<WriteId>();
    /// Reserved id meaning "architecturally-defined initial value".
    pub const INIT_WRITE: WriteId = 0x00;
    pub const MIN_WRITE: WriteId = Self::INIT_WRITE + 1;
    /// Capped below the type maximum to leave headroom for multi-word stores.
    pub const MAX_WRITE: WriteId = 0xff - (Self::MAX_INST_EVTS as WriteId - 1);
    /// Read sequence numbers live in the upper half, disjoint from any WriteId.
    pub const MIN_READ: Poi = 0x8000_0000_0000_0000;
    pub const MAX_READ: Poi = u64::MAX - (Self::MAX_INST_EVTS as Poi - 1);

    pub fn new() -> Self {
        let mut state = Self {
            writes: HashMap::new(),
            last_write_id: 0,
            last_read_id: 0,
        };
        state.reset();
        state
    }

    /// Reinitialize both counters and clear the write table. Idempotent; must
    /// run before every compilation pass.
    pub fn reset(&mut self) {
        self.last_write_id = Self::MIN_WRITE - 1;
        self.last_read_id = Self::MIN_READ - 1;
        self.writes.clear();
    }

    /// True once either identifier counter has reached its maximum. Requesting
    /// more identifiers past this point is a caller contract violation.
    pub fn exhausted(&self) -> bool {
        self.last_write_id >= Self::MAX_WRITE || self.last_read_id >= Self::MAX_READ
    }

    /// The write-id table, mapping each minted id to its producing event.
    pub fn writes(&self) -> &HashMap<WriteId, Event> {
        &self.writes
    }

    fn check_size(size: usize) {
        assert!(size >= std::mem::size_of::<WriteId>(), "zero-size operation");
        assert!(size <= Self::MAX_INST_SIZE, "operation exceeds MAX_INST_SIZE");
        assert!(
            size % std::mem::size_of::<WriteId>() == 0,
            "operation size not a multiple of the word size"
        );
    }

    /// Mint one WriteId per word-sized chunk of `data`, create the matching
    /// write events at `addr + offset`, and store each id into `data` — the
    /// bytes the emitted store instruction will place into target memory.
    ///
    /// Returns the created events in address order.
    pub fn make_write(
        &mut self,
        pid: Pid,
        addr: Addr,
        data: &mut [WriteId],
        ew: &mut ExecWitness,
    ) -> Vec<Event> {
        Self::check_size(data.len() * std::mem::size_of::<WriteId>());
        assert!(!self.exhausted(), "write identifier space exhausted");

        let mut events = Vec::with_capacity(data.len());
        for (chunk, slot) in data.iter_mut().enumerate() {
            let write_id = self.last_write_id + 1;
            self.last_write_id = write_id;

            let event = Event::new(
                EventKind::Write,
                addr + chunk as Addr,
                Iiid::new(pid, Poi::from(write_id)),
            );
            ew.events.insert_unique(event);
            self.writes.insert(write_id, event);
            *slot = write_id;
            events.push(event);
        }

        events
    }

    /// Mint one read sequence number per word-sized chunk and create the
    /// matching read events. No value is recorded; the observed value only
    /// exists once the compiled code runs.
    pub fn make_read(
        &mut self,
        pid: Pid,
        addr: Addr,
        size: usize,
        ew: &mut ExecWitness,
    ) -> Vec<Event> {
        Self::check_size(size);
        assert!(!self.exhausted(), "read identifier space exhausted");

        let chunks = size / std::mem::size_of::<WriteId>();
        let mut events = Vec::with_capacity(chunks);
        for chunk in 0..chunks {
            let read_id = self.last_read_id + 1;
            self.last_read_id = read_id;

            let event = Event::new(
                EventKind::Read,
                addr + chunk as Addr,
                Iiid::new(pid, read_id),
            );
            ew.events.insert_unique(event);
            events.push(event);
        }

        events
    }

    /// Resolve identifiers the running program reported having observed at
    /// `addr` back to the producing write events, one per chunk of `from_id`.
    ///
    /// A chunk falls back to the per-location initial-value event when the id
    /// is [`Self::INIT_WRITE`], unknown to the write table, was minted for a
    /// different address, or belongs to `after` itself (a degenerate
    /// same-instruction edge). An unresolved non-zero id additionally logs a
    /// hygiene warning: it usually means target memory was not zeroed between
    /// test runs, which is unlikely to cause a false positive but worth
    /// surfacing.
    pub fn get_write(
        &self,
        after: &Event,
        addr: Addr,
        from_id: &[WriteId],
        ew: &mut ExecWitness,
    ) -> Vec<Event> {
        Self::check_size(from_id.len() * std::mem::size_of::<WriteId>());

        let mut events = Vec::with_capacity(from_id.len());
        let mut addr = addr;
        for &id in from_id {
            let resolved = if id == Self::INIT_WRITE {
                None
            } else {
                self.writes
                    .get(&id)
                    .filter(|write| write.addr == addr && write.iiid != after.iiid)
            };

            match resolved {
                Some(write) => events.push(*write),
                None => {
                    if id != Self::INIT_WRITE {
                        warn!(
                            "observed write id {id:#04x} at {addr:#x} does not resolve; \
                             has target memory been reset between test runs?"
                        );
                    }
                    events.push(ew.events.insert(Event::initial(addr)));
                }
            }

            addr += std::mem::size_of::<WriteId>() as Addr;
        }

        events
    }
}

impl Default for AssemblerState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::INIT_PID;

    #[test]
    fn write_ids_are_unique_and_in_range() {
        let mut asms = AssemblerState::new();
        let mut ew = ExecWitness::new();

        let mut data = [0u8; 2];
        asms.make_write(0, 0x100, &mut data, &mut ew);
        let mut data2 = [0u8; 3];
        asms.make_write(1, 0x200, &mut data2, &mut ew);

        let ids: Vec<_> = asms.writes().keys().copied().collect();
        assert_eq!(ids.len(), 5);
        for id in ids {
            assert!(id >= AssemblerState::MIN_WRITE);
            assert!(id <= AssemblerState::MAX_WRITE);
        }
    }

    #[test]
    fn store_width_consumes_one_id_per_chunk() {
        let mut asms = AssemblerState::new();
        let mut ew = ExecWitness::new();

        let mut data = [0u8; 4];
        let events = asms.make_write(0, 0x100, &mut data, &mut ew);

        assert_eq!(events.len(), 4);
        for (chunk, (id, event)) in data.iter().zip(&events).enumerate() {
            assert_eq!(*id, asms.writes()[id].iiid.poi as WriteId);
            assert_eq!(event.addr, 0x100 + chunk as Addr);
            assert_eq!(event.iiid.poi, Poi::from(*id));
        }
        assert_eq!(ew.events.len(), 4);
    }

    #[test]
    fn read_ids_never_collide_with_write_ids() {
        let mut asms = AssemblerState::new();
        let mut ew = ExecWitness::new();

        let mut data = [0u8; 1];
        let write = asms.make_write(0, 0x100, &mut data, &mut ew)[0];
        let read = asms.make_read(0, 0x100, 1, &mut ew)[0];

        assert!(read.iiid.poi >= AssemblerState::MIN_READ);
        assert_ne!(read.iiid, write.iiid);
    }

    #[test]
    fn init_write_resolves_to_initial_event() {
        let asms = AssemblerState::new();
        let mut ew = ExecWitness::new();

        let reader = Event::new(EventKind::Read, 0x100, Iiid::new(0, AssemblerState::MIN_READ));
        let events = asms.get_write(&reader, 0x100, &[AssemblerState::INIT_WRITE], &mut ew);

        assert_eq!(events[0], Event::initial(0x100));
        assert_eq!(events[0].iiid.pid, INIT_PID);
        assert!(ew.events.contains(&events[0]));
    }

    #[test]
    fn minted_id_resolves_at_its_address_only() {
        let mut asms = AssemblerState::new();
        let mut ew = ExecWitness::new();

        let mut data = [0u8; 1];
        let write = asms.make_write(0, 0x100, &mut data, &mut ew)[0];
        let reader = Event::new(EventKind::Read, 0x100, Iiid::new(1, AssemblerState::MIN_READ));

        let hit = asms.get_write(&reader, 0x100, &data, &mut ew);
        assert_eq!(hit[0], write);

        let miss = asms.get_write(&reader, 0x900, &data, &mut ew);
        assert_eq!(miss[0], Event::initial(0x900));
    }

    #[test]
    fn self_observation_falls_back_to_initial() {
        let mut asms = AssemblerState::new();
        let mut ew = ExecWitness::new();

        let mut data = [0u8; 1];
        let write = asms.make_write(0, 0x100, &mut data, &mut ew)[0];

        let events = asms.get_write(&write, 0x100, &data, &mut ew);
        assert_eq!(events[0], Event::initial(0x100));
    }

    #[test]
    fn stale_id_falls_back_without_corrupting_table() {
        let mut asms = AssemblerState::new();
        let mut ew = ExecWitness::new();

        let mut data = [0u8; 1];
        asms.make_write(0, 0x100, &mut data, &mut ew);
        let table_before = asms.writes().clone();

        let reader = Event::new(EventKind::Read, 0x200, Iiid::new(1, AssemblerState::MIN_READ));
        let events = asms.get_write(&reader, 0x200, &[0xee], &mut ew);

        assert_eq!(events[0], Event::initial(0x200));
        assert_eq!(asms.writes().len(), table_before.len());
    }

    #[test]
    fn reset_is_idempotent() {
        let mut asms = AssemblerState::new();
        let mut ew = ExecWitness::new();

        let mut data = [0u8; 1];
        asms.make_write(0, 0x100, &mut data, &mut ew);
        asms.reset();
        asms.reset();
        assert!(asms.writes().is_empty());

        let mut data2 = [0u8; 1];
        asms.make_write(0, 0x100, &mut data2, &mut ExecWitness::new());
        assert_eq!(data2[0], AssemblerState::MIN_WRITE);
    }

    #[test]
    #[should_panic(expected = "write identifier space exhausted")]
    fn allocation_past_exhaustion_is_fatal() {
        let mut asms = AssemblerState::new();
        let mut ew = ExecWitness::new();

        let mut data = [0u8; 1];
        while !asms.exhausted() {
            asms.make_write(0, 0x100, &mut data, &mut ew);
        }
        asms.make_write(0, 0x100, &mut data, &mut ew);
    }

    #[test]
    #[should_panic(expected = "MAX_INST_SIZE")]
    fn oversized_operations_are_rejected() {
        let mut asms = AssemblerState::new();
        let mut ew = ExecWitness::new();
        let mut data = [0u8; 9];
        asms.make_write(0, 0x100, &mut data, &mut ew);
    }
}
