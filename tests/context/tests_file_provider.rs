//! File-system content tests.

#![allow(clippy::unwrap_used)]

use std::fs;
use std::sync::Arc;

use tessera::cache::{CacheState, PARSED_UNIT};
use tessera::context::FileContentProvider;
use tessera::{AnalysisError, AnalysisOptions, AnalysisSession, ChangeSet};

use crate::helpers::session_helpers::analyze;

fn session_in(dir: &tempfile::TempDir) -> AnalysisSession {
    AnalysisSession::new(
        AnalysisOptions::default(),
        Arc::new(FileContentProvider::new(dir.path())),
    )
}

#[test]
fn test_sources_are_read_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("lib.tsr"), "library lib; fn helper;").unwrap();
    fs::write(dir.path().join("main.tsr"), "library main; import 'lib.tsr'; var x = helper;").unwrap();

    let session = session_in(&dir);
    let lib = session.add_source("lib.tsr");
    let main = session.add_source("main.tsr");
    analyze(&session);

    assert!(session.get_all_errors(main).unwrap().is_empty());
    assert!(session.snapshot(lib).unwrap().modification_stamp().is_some());
}

#[test]
fn test_changed_file_is_reread() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lib.tsr");
    fs::write(&path, "library before;").unwrap();

    let session = session_in(&dir);
    let lib = session.add_source("lib.tsr");
    let unit = session.ensure_parsed(lib).unwrap();
    assert_eq!(unit.library_name().unwrap(), "before");

    fs::write(&path, "library after;").unwrap();
    session.apply_changes(ChangeSet::new().changed(lib));
    let unit = session.ensure_parsed(lib).unwrap();
    assert_eq!(unit.library_name().unwrap(), "after");
}

#[test]
fn test_overlay_takes_precedence_until_cleared() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("lib.tsr"), "library disk;").unwrap();

    let session = session_in(&dir);
    let lib = session.add_source("lib.tsr");
    session.set_contents(lib, Some("library editor;")).unwrap();
    assert_eq!(session.ensure_parsed(lib).unwrap().library_name().unwrap(), "editor");

    session.set_contents(lib, None).unwrap();
    assert_eq!(session.ensure_parsed(lib).unwrap().library_name().unwrap(), "disk");
}

#[test]
fn test_missing_file_is_cached_as_error() {
    let dir = tempfile::tempdir().unwrap();
    let session = session_in(&dir);
    let ghost = session.add_source("ghost.tsr");

    let error = session.ensure_parsed(ghost).unwrap_err();
    assert!(matches!(error, AnalysisError::ComputeFailed { .. }));
    assert_eq!(session.state(ghost, &PARSED_UNIT).unwrap(), CacheState::Error);
    assert_eq!(session.ensure_parsed(ghost).unwrap_err(), error);
}
