//! Session setup helpers.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use tessera::context::ChangeNotice;
use tessera::{AnalysisOptions, AnalysisSession, SourceId};
use tokio_util::sync::CancellationToken;

/// Creates an in-memory session holding `files`, in order.
pub fn session_from_sources(files: &[(&str, &str)]) -> (AnalysisSession, Vec<SourceId>) {
    session_with_options(AnalysisOptions::default(), files)
}

pub fn session_with_options(
    options: AnalysisOptions,
    files: &[(&str, &str)],
) -> (AnalysisSession, Vec<SourceId>) {
    let session = AnalysisSession::in_memory(options);
    let ids = files
        .iter()
        .map(|(uri, text)| add_file(&session, uri, text))
        .collect();
    (session, ids)
}

pub fn shared_session(files: &[(&str, &str)]) -> (Arc<AnalysisSession>, Vec<SourceId>) {
    let (session, ids) = session_from_sources(files);
    (Arc::new(session), ids)
}

pub fn add_file(session: &AnalysisSession, uri: &str, text: &str) -> SourceId {
    let id = session.add_source(uri);
    session.set_contents(id, Some(text)).unwrap();
    id
}

/// Runs analysis until nothing is left to do.
pub fn analyze(session: &AnalysisSession) -> Vec<ChangeNotice> {
    session.analyze_all(&CancellationToken::new()).unwrap()
}
