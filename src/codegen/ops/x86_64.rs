// This module implements the concrete operation set for the x86-64 emission path
// using the iced-x86 code assembler. Store compiles to a mov whose immediate is the
// freshly minted write identifiers, one byte per memory word, which is what makes
// the generated code self-describing: whatever value a later load observes is an
// identifier the allocator can resolve back to the producing write event. Load
// compiles to a movzx/mov from the test address; the host harness reports the value
// the instruction observed and insert_from turns it into read-from edges. Fence
// emits mfence and owns no events of its own; it forwards program order through
// itself and latches the fence ordering into the TSO model. Delay pads with nops to
// vary instruction-pointer layout without touching the witness. Each operation
// assembles its own instructions at its start address and copies them into the
// caller's buffer; width 8 stores are split into two dword moves because
// mov m64, imm64 has no encoding.

//! x86-64 operations: stores, loads, fences and delays.

use std::cell::RefCell;
use std::rc::Rc;

use iced_x86::code_asm::*;

use crate::codegen::assembler::AssemblerState;
use crate::codegen::error::{EmitError, EmitResult};
use crate::codegen::operation::{Operation, OperationPtr};
use crate::memmodel::{ArchTso, Event, ExecWitness};
use crate::types::{Addr, InstPtr, Pid, WriteId};

fn check_width(size: usize) {
    assert!(
        matches!(size, 1 | 2 | 4 | 8),
        "unsupported operation width {size}"
    );
}

/// Copy assembled bytes into the caller's buffer, bounding the step length.
fn copy_code(bytes: &[u8], code: &mut [u8]) -> EmitResult<usize> {
    if bytes.len() > code.len() {
        return Err(EmitError::BufferTooSmall {
            need: bytes.len(),
            have: code.len(),
        });
    }
    code[..bytes.len()].copy_from_slice(bytes);
    Ok(bytes.len())
}

/// Wire `events` into program order: first event after `before`'s last, and
/// chunk events of one instruction in address order.
fn link_po(before: Option<&dyn Operation>, events: &[Event], ew: &mut ExecWitness) {
    if let (Some(before), Some(first)) = (before, events.first()) {
        if let Some(last) = before.last_event(Some(first)) {
            ew.po.insert(last, *first);
        }
    }
    for pair in events.windows(2) {
        ew.po.insert(pair[0], pair[1]);
    }
}

/// A store of `size` bytes whose written value is the minted write ids.
#[derive(Debug, Clone)]
pub struct Store {
    pid: Pid,
    addr: Addr,
    size: usize,
    write_ids: [WriteId; AssemblerState::MAX_INST_EVTS],
    events: Vec<Event>,
}

impl Store {
    pub fn new(pid: Pid, addr: Addr) -> Self {
        Self::with_size(pid, addr, 1)
    }

    pub fn with_size(pid: Pid, addr: Addr, size: usize) -> Self {
        check_width(size);
        Self {
            pid,
            addr,
            size,
            write_ids: [AssemblerState::INIT_WRITE; AssemblerState::MAX_INST_EVTS],
            events: Vec::new(),
        }
    }

    pub fn addr(&self) -> Addr {
        self.addr
    }

    /// Identifiers minted for this store's chunks; meaningful after emission.
    pub fn write_ids(&self) -> &[WriteId] {
        &self.write_ids[..self.size]
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}

impl Operation for Store {
    fn pid(&self) -> Pid {
        self.pid
    }

    fn set_pid(&mut self, pid: Pid) {
        self.pid = pid;
    }

    fn clone_op(&self) -> OperationPtr {
        let mut copy = self.clone();
        copy.reset();
        Rc::new(RefCell::new(copy))
    }

    fn reset(&mut self) {
        self.write_ids = [AssemblerState::INIT_WRITE; AssemblerState::MAX_INST_EVTS];
        self.events.clear();
    }

    fn enable_emit(&mut self, asms: &mut AssemblerState) -> bool {
        !asms.exhausted()
    }

    fn insert_po(
        &mut self,
        before: Option<&dyn Operation>,
        asms: &mut AssemblerState,
        ew: &mut ExecWitness,
    ) {
        self.events = asms.make_write(self.pid, self.addr, &mut self.write_ids[..self.size], ew);
        link_po(before, &self.events, ew);
    }

    fn emit_x86_64(
        &mut self,
        start: InstPtr,
        _asms: &mut AssemblerState,
        arch: &mut ArchTso,
        code: &mut [u8],
    ) -> EmitResult<usize> {
        let ids = &self.write_ids;
        let mut asm = CodeAssembler::new(64)?;
        match self.size {
            1 => asm.mov(byte_ptr(self.addr), u32::from(ids[0]))?,
            2 => asm.mov(
                word_ptr(self.addr),
                u32::from(u16::from_le_bytes([ids[0], ids[1]])),
            )?,
            4 => asm.mov(
                dword_ptr(self.addr),
                u32::from_le_bytes([ids[0], ids[1], ids[2], ids[3]]),
            )?,
            8 => {
                // mov m64, imm64 does not encode; emit two dword halves.
                asm.mov(
                    dword_ptr(self.addr),
                    u32::from_le_bytes([ids[0], ids[1], ids[2], ids[3]]),
                )?;
                asm.mov(
                    dword_ptr(self.addr + 4),
                    u32::from_le_bytes([ids[4], ids[5], ids[6], ids[7]]),
                )?;
            }
            _ => unreachable!("width checked at construction"),
        }

        let bytes = asm.assemble(start)?;
        let len = copy_code(&bytes, code)?;
        arch.apply_fence(self.events[0]);
        Ok(len)
    }

    fn last_event(&self, _next: Option<&Event>) -> Option<Event> {
        self.events.last().copied()
    }

    fn insert_from(
        &mut self,
        _ip: InstPtr,
        addr: Addr,
        from_id: &[WriteId],
        asms: &mut AssemblerState,
        ew: &mut ExecWitness,
    ) -> bool {
        let Some(first) = self.events.first().copied() else {
            return false;
        };
        assert_eq!(addr, self.addr, "observed address does not match store");
        assert_eq!(from_id.len(), self.size, "observed size does not match store");

        // The report carries the value this store overwrote: the overwritten
        // write precedes this one in coherence order.
        let overwritten = asms.get_write(&first, addr, from_id, ew);
        for (from, to) in overwritten.iter().zip(&self.events) {
            ew.co.insert(*from, *to);
        }
        true
    }
}

/// A load of `size` bytes from a test address.
#[derive(Debug, Clone)]
pub struct Load {
    pid: Pid,
    addr: Addr,
    size: usize,
    events: Vec<Event>,
}

impl Load {
    pub fn new(pid: Pid, addr: Addr) -> Self {
        Self::with_size(pid, addr, 1)
    }

    pub fn with_size(pid: Pid, addr: Addr, size: usize) -> Self {
        check_width(size);
        Self {
            pid,
            addr,
            size,
            events: Vec::new(),
        }
    }

    pub fn addr(&self) -> Addr {
        self.addr
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}

impl Operation for Load {
    fn pid(&self) -> Pid {
        self.pid
    }

    fn set_pid(&mut self, pid: Pid) {
        self.pid = pid;
    }

    fn clone_op(&self) -> OperationPtr {
        let mut copy = self.clone();
        copy.reset();
        Rc::new(RefCell::new(copy))
    }

    fn reset(&mut self) {
        self.events.clear();
    }

    fn enable_emit(&mut self, asms: &mut AssemblerState) -> bool {
        !asms.exhausted()
    }

    fn insert_po(
        &mut self,
        before: Option<&dyn Operation>,
        asms: &mut AssemblerState,
        ew: &mut ExecWitness,
    ) {
        self.events = asms.make_read(self.pid, self.addr, self.size, ew);
        link_po(before, &self.events, ew);
    }

    fn emit_x86_64(
        &mut self,
        start: InstPtr,
        _asms: &mut AssemblerState,
        arch: &mut ArchTso,
        code: &mut [u8],
    ) -> EmitResult<usize> {
        let mut asm = CodeAssembler::new(64)?;
        match self.size {
            1 => asm.movzx(eax, byte_ptr(self.addr))?,
            2 => asm.movzx(eax, word_ptr(self.addr))?,
            4 => asm.mov(eax, dword_ptr(self.addr))?,
            8 => asm.mov(rax, qword_ptr(self.addr))?,
            _ => unreachable!("width checked at construction"),
        }

        let bytes = asm.assemble(start)?;
        let len = copy_code(&bytes, code)?;
        arch.apply_fence(self.events[0]);
        Ok(len)
    }

    fn last_event(&self, _next: Option<&Event>) -> Option<Event> {
        self.events.last().copied()
    }

    fn insert_from(
        &mut self,
        _ip: InstPtr,
        addr: Addr,
        from_id: &[WriteId],
        asms: &mut AssemblerState,
        ew: &mut ExecWitness,
    ) -> bool {
        let Some(first) = self.events.first().copied() else {
            return false;
        };
        assert_eq!(addr, self.addr, "observed address does not match load");
        assert_eq!(from_id.len(), self.size, "observed size does not match load");

        let observed = asms.get_write(&first, addr, from_id, ew);
        for (from, to) in observed.iter().zip(&self.events) {
            ew.rf.insert(*from, *to);
        }
        true
    }
}

/// A full memory fence (mfence). Owns no events; orders its neighbours.
#[derive(Debug, Clone)]
pub struct Fence {
    pid: Pid,
    prev_last: Option<Event>,
}

impl Fence {
    pub fn new(pid: Pid) -> Self {
        Self {
            pid,
            prev_last: None,
        }
    }
}

impl Operation for Fence {
    fn pid(&self) -> Pid {
        self.pid
    }

    fn set_pid(&mut self, pid: Pid) {
        self.pid = pid;
    }

    fn clone_op(&self) -> OperationPtr {
        let mut copy = self.clone();
        copy.reset();
        Rc::new(RefCell::new(copy))
    }

    fn reset(&mut self) {
        self.prev_last = None;
    }

    fn enable_emit(&mut self, _asms: &mut AssemblerState) -> bool {
        true
    }

    fn insert_po(
        &mut self,
        before: Option<&dyn Operation>,
        _asms: &mut AssemblerState,
        _ew: &mut ExecWitness,
    ) {
        self.prev_last = before.and_then(|b| b.last_event(None));
    }

    fn emit_x86_64(
        &mut self,
        start: InstPtr,
        _asms: &mut AssemblerState,
        arch: &mut ArchTso,
        code: &mut [u8],
    ) -> EmitResult<usize> {
        let mut asm = CodeAssembler::new(64)?;
        asm.mfence()?;
        let bytes = asm.assemble(start)?;
        let len = copy_code(&bytes, code)?;
        arch.fence_before(self.prev_last);
        Ok(len)
    }

    /// Program order passes through the fence to the surrounding events.
    fn last_event(&self, _next: Option<&Event>) -> Option<Event> {
        self.prev_last
    }

    fn insert_from(
        &mut self,
        _ip: InstPtr,
        _addr: Addr,
        _from_id: &[WriteId],
        _asms: &mut AssemblerState,
        _ew: &mut ExecWitness,
    ) -> bool {
        false
    }
}

/// `length` one-byte nops. Varies code layout without touching the witness.
#[derive(Debug, Clone)]
pub struct Delay {
    pid: Pid,
    length: usize,
    prev_last: Option<Event>,
}

impl Delay {
    pub fn new(pid: Pid, length: usize) -> Self {
        assert!(length >= 1, "a delay must emit at least one instruction");
        Self {
            pid,
            length,
            prev_last: None,
        }
    }
}

impl Operation for Delay {
    fn pid(&self) -> Pid {
        self.pid
    }

    fn set_pid(&mut self, pid: Pid) {
        self.pid = pid;
    }

    fn clone_op(&self) -> OperationPtr {
        let mut copy = self.clone();
        copy.reset();
        Rc::new(RefCell::new(copy))
    }

    fn reset(&mut self) {
        self.prev_last = None;
    }

    fn enable_emit(&mut self, _asms: &mut AssemblerState) -> bool {
        true
    }

    fn insert_po(
        &mut self,
        before: Option<&dyn Operation>,
        _asms: &mut AssemblerState,
        _ew: &mut ExecWitness,
    ) {
        self.prev_last = before.and_then(|b| b.last_event(None));
    }

    fn emit_x86_64(
        &mut self,
        start: InstPtr,
        _asms: &mut AssemblerState,
        _arch: &mut ArchTso,
        code: &mut [u8],
    ) -> EmitResult<usize> {
        let mut asm = CodeAssembler::new(64)?;
        for _ in 0..self.length {
            asm.nop()?;
        }
        let bytes = asm.assemble(start)?;
        copy_code(&bytes, code)
    }

    fn last_event(&self, _next: Option<&Event>) -> Option<Event> {
        self.prev_last
    }

    fn insert_from(
        &mut self,
        _ip: InstPtr,
        _addr: Addr,
        _from_id: &[WriteId],
        _asms: &mut AssemblerState,
        _ew: &mut ExecWitness,
    ) -> bool {
        false
    }
}
