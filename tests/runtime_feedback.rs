// Tests for the compile-now/observe-later split: after emission the host reports
// the identifiers the compiled code observed at run time, and the compiler routes
// each report through the instruction-pointer index back to the owning operation,
// which resolves it into dynamic read-from or coherence-order edges.

use std::cell::RefCell;
use std::rc::Rc;

use litmus_codegen::codegen::ops::{Load, Store};
use litmus_codegen::{
    extract_threads, AssemblerState, BackendX64, Compiler, Event, OperationPtr, Threads,
};

const X: u64 = 0x2000;

fn store(pid: i32, addr: u64) -> OperationPtr {
    Rc::new(RefCell::new(Store::new(pid, addr)))
}

fn load(pid: i32, addr: u64) -> OperationPtr {
    Rc::new(RefCell::new(Load::new(pid, addr)))
}

fn setup() -> (Compiler<BackendX64>, Threads, u64, u64) {
    let threads = extract_threads(vec![store(0, X), load(1, X)]);
    let mut compiler = Compiler::new(BackendX64::new(), Some(threads.clone()));

    let mut code0 = [0u8; 64];
    let mut code1 = [0u8; 64];
    let store_base = 0x1000;
    let load_base = 0x5000;
    compiler.emit_thread(0, store_base, &mut code0).unwrap();
    compiler.emit_thread(1, load_base, &mut code1).unwrap();

    (compiler, threads, store_base, load_base)
}

fn store_event(threads: &Threads) -> Event {
    threads[&0][0].borrow().last_event(None).unwrap()
}

fn load_event(threads: &Threads) -> Event {
    threads[&1][0].borrow().last_event(None).unwrap()
}

#[test]
fn observed_write_id_becomes_a_read_from_edge() {
    let (mut compiler, threads, _, load_base) = setup();

    // The load observed the id thread 0's store wrote.
    let observed = {
        let op = threads[&0][0].borrow();
        let store = &compiler.asms().writes();
        let event = op.last_event(None).unwrap();
        store
            .iter()
            .find(|(_, e)| **e == event)
            .map(|(id, _)| *id)
            .unwrap()
    };

    assert!(compiler.insert_from(load_base, X, &[observed]));

    let ew = compiler.witness();
    assert!(ew.rf.contains(&store_event(&threads), &load_event(&threads)));
    assert_eq!(ew.rf.len(), 1);
}

#[test]
fn observed_zero_means_initial_value() {
    let (mut compiler, threads, _, load_base) = setup();

    assert!(compiler.insert_from(load_base, X, &[AssemblerState::INIT_WRITE]));

    let ew = compiler.witness();
    let initial = Event::initial(X);
    assert!(ew.events.contains(&initial));
    assert!(ew.rf.contains(&initial, &load_event(&threads)));
    assert!(!ew.rf.contains(&store_event(&threads), &load_event(&threads)));
}

#[test]
fn stale_id_degrades_to_initial_value() {
    let (mut compiler, threads, _, load_base) = setup();
    let _ = env_logger::builder().is_test(true).try_init();

    // An id never minted in this compilation, e.g. left over from a previous
    // test whose memory was not zeroed.
    let table_len = compiler.asms().writes().len();
    assert!(compiler.insert_from(load_base, X, &[0xcc]));

    let ew = compiler.witness();
    assert!(ew.rf.contains(&Event::initial(X), &load_event(&threads)));
    assert_eq!(compiler.asms().writes().len(), table_len);
}

#[test]
fn store_feedback_produces_coherence_order() {
    let (mut compiler, threads, store_base, _) = setup();

    // The store trapped and reported the value it overwrote: zero, i.e. the
    // architecturally-initial value of X.
    assert!(compiler.insert_from(store_base, X, &[AssemblerState::INIT_WRITE]));

    let ew = compiler.witness();
    assert!(ew.co.contains(&Event::initial(X), &store_event(&threads)));
    assert!(ew.rf.is_empty());
}

#[test]
fn unmapped_addresses_are_not_ours() {
    let (mut compiler, _, _, load_base) = setup();

    assert!(!compiler.insert_from(0x9999_0000, X, &[0]));
    assert!(!compiler.insert_from(load_base + 0x100, X, &[0]));
}

#[test]
fn feedback_before_any_emission_is_rejected() {
    let mut compiler = Compiler::new(BackendX64::new(), None);
    assert!(!compiler.insert_from(0x1000, X, &[0]));
}

#[test]
fn wide_load_resolves_each_chunk() {
    let wide_store: OperationPtr = Rc::new(RefCell::new(Store::with_size(0, X, 4)));
    let wide_load: OperationPtr = Rc::new(RefCell::new(Load::with_size(1, X, 4)));
    let threads = extract_threads(vec![wide_store, wide_load]);
    let mut compiler = Compiler::new(BackendX64::new(), Some(threads.clone()));

    let mut code0 = [0u8; 64];
    let mut code1 = [0u8; 64];
    compiler.emit_thread(0, 0x1000, &mut code0).unwrap();
    compiler.emit_thread(1, 0x5000, &mut code1).unwrap();

    // The load observed all four of the store's chunk ids.
    let ids: Vec<u8> = (AssemblerState::MIN_WRITE..AssemblerState::MIN_WRITE + 4).collect();
    assert!(compiler.insert_from(0x5000, X, &ids));

    assert_eq!(compiler.witness().rf.len(), 4);
}
