//! Blocking query tests.

#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tessera::context::SourceParser;
use tessera::driver::{LibraryElementQuery, LibraryErrorsQuery, ResolvedUnitQuery};
use tessera::syntax::{Parse, parse};
use tessera::{AnalysisDriver, AnalysisOptions, AnalysisSession, DriverStatus, SourceId};

use crate::helpers::session_helpers::add_file;

/// Holds every parse until released.
#[derive(Default)]
struct Gate {
    entered: AtomicBool,
    released: Mutex<bool>,
    opened: Condvar,
}

impl Gate {
    fn release(&self) {
        *self.released.lock().unwrap() = true;
        self.opened.notify_all();
    }

    fn wait_until_entered(&self) {
        let started = Instant::now();
        while !self.entered.load(Ordering::SeqCst) {
            assert!(started.elapsed() < Duration::from_secs(10), "parser never ran");
            thread::sleep(Duration::from_millis(1));
        }
    }
}

struct GatedParser(Arc<Gate>);

impl SourceParser for GatedParser {
    fn parse(&self, _source: SourceId, text: &str) -> Parse {
        self.0.entered.store(true, Ordering::SeqCst);
        let mut released = self.0.released.lock().unwrap();
        while !*released {
            released = self.0.opened.wait(released).unwrap();
        }
        parse(text)
    }
}

fn options() -> AnalysisOptions {
    AnalysisOptions::default()
        .with_wait_interval(Duration::from_millis(20))
        .with_query_timeout(Some(Duration::from_secs(20)))
}

#[test]
fn test_query_blocked_on_building_driver_unblocks() {
    let gate = Arc::new(Gate::default());
    let session = AnalysisSession::in_memory(options()).with_parser(Arc::new(GatedParser(gate.clone())));
    let lib = add_file(&session, "lib.tsr", "library lib; fn main;");
    let driver = Arc::new(AnalysisDriver::start(Arc::new(session)));

    gate.wait_until_entered();
    assert_eq!(driver.status(), DriverStatus::Building);

    let query = {
        let driver = driver.clone();
        thread::spawn(move || driver.execute(&LibraryElementQuery(lib)))
    };
    thread::sleep(Duration::from_millis(50));
    assert!(!query.is_finished());
    let cycles_before = driver.cycles();

    let released_at = Instant::now();
    gate.release();
    let element = query.join().unwrap().unwrap();

    assert!(element.is_launchable());
    assert!(released_at.elapsed() < Duration::from_secs(5));
    assert!(driver.cycles() - cycles_before <= 3);
}

#[test]
fn test_idle_driver_is_rescheduled_by_waiting_query() {
    let session = Arc::new(AnalysisSession::in_memory(options()));
    let lib = add_file(&session, "lib.tsr", "library lib; var x = y;");
    let driver = AnalysisDriver::start(session.clone());

    let errors = driver.execute(&LibraryErrorsQuery(lib)).unwrap();
    assert_eq!(errors.len(), 1);

    let started = Instant::now();
    while driver.status() != DriverStatus::Idle {
        assert!(started.elapsed() < Duration::from_secs(10));
        thread::sleep(Duration::from_millis(1));
    }

    session.set_contents(lib, Some("library lib; var y; var x = y;")).unwrap();
    let errors = driver.execute(&LibraryErrorsQuery(lib)).unwrap();
    assert!(errors.is_empty(), "{:?}", errors);
}

#[test]
fn test_concurrent_queries_share_one_analysis() {
    let session = Arc::new(AnalysisSession::in_memory(options()));
    let lib = add_file(&session, "lib.tsr", "library lib; part 'p.tsr';");
    let part = add_file(&session, "p.tsr", "part of lib; fn f;");
    let driver = Arc::new(AnalysisDriver::start(session));

    let queries: Vec<_> = (0..4)
        .map(|_| {
            let driver = driver.clone();
            thread::spawn(move || {
                driver
                    .execute(&ResolvedUnitQuery {
                        source: part,
                        library: lib,
                    })
                    .map(|unit| unit.library)
            })
        })
        .collect();
    for query in queries {
        assert_eq!(query.join().unwrap().unwrap(), lib);
    }
}

#[test]
fn test_shutdown_releases_waiting_query() {
    let gate = Arc::new(Gate::default());
    let session = AnalysisSession::in_memory(options()).with_parser(Arc::new(GatedParser(gate.clone())));
    let lib = add_file(&session, "lib.tsr", "library lib;");
    let driver = Arc::new(AnalysisDriver::start(Arc::new(session)));
    gate.wait_until_entered();

    let query = {
        let driver = driver.clone();
        thread::spawn(move || driver.execute(&LibraryElementQuery(lib)))
    };
    thread::sleep(Duration::from_millis(30));

    // The worker is stuck in the parser; cancel first, then let it finish.
    let stopper = {
        let driver = driver.clone();
        thread::spawn(move || driver.shutdown())
    };
    thread::sleep(Duration::from_millis(30));
    gate.release();
    stopper.join().unwrap();

    assert_eq!(
        query.join().unwrap().unwrap_err(),
        tessera::AnalysisError::Shutdown
    );
}
