//! The analysis session: owner of every cache entry.
//!
//! ## Publication
//!
//! Entries are immutable once published. A writer takes a
//! [`writable_copy`](SourceEntry::writable_copy) of the current entry,
//! changes it, and publishes it with [`AnalysisSession::try_publish`], which
//! only succeeds if the stored entry is still the one the copy was taken from.
//!
//! ## Computing a fact
//!
//! ```text
//! snapshot ──► INVALID? ──► claim (publish IN_PROCESS) ──► compute, no lock held
//!                                                              │
//!        discard ◄── generation moved on? ◄── commit ◄─────────┘
//! ```
//!
//! A requester that finds a fact IN_PROCESS gets
//! [`AnalysisError::TemporarilyUnavailable`] and rejoins once the session
//! signals a change (see [`AnalysisSession::wait_for_change`]).

use std::cell::RefCell;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex, RwLock};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use tokio_util::sync::CancellationToken;

use super::change::{ChangeNotice, ChangeSet};
use super::collaborators::{DefaultParser, DefaultResolver, LibraryResolver, SourceParser};
use super::invalidate::Invalidator;
use super::provider::{Content, ContentProvider, MemoryContentProvider};
use crate::base::{SourceId, SourceRegistry};
use crate::cache::{
    CacheState, ComputeFailure, DescriptorKey, ELEMENT, INCLUDED_PARTS, IS_CLIENT, IS_LAUNCHABLE,
    LINE_INFO, PARSE_ERRORS, PARSED_UNIT, PUBLIC_NAMESPACE, REFERENCED_LIBRARIES,
    RESOLUTION_ERRORS, RESOLVED_UNIT, ResolutionDescriptor, SOURCE_KIND, SourceDescriptor,
    SourceEntry,
};
use crate::config::AnalysisOptions;
use crate::error::{AnalysisError, Result};
use crate::hir::{
    Diagnostic, LibraryGraph, LibraryResolution, Namespace, ResolveOptions, UnitSource,
    compute_public_namespace,
};
use crate::syntax::{ParsedUnit, SourceKind};

/// An explicit analysis session. Share it behind an [`Arc`].
pub struct AnalysisSession {
    options: AnalysisOptions,
    resolve_options: ResolveOptions,
    registry: SourceRegistry,
    provider: Arc<dyn ContentProvider>,
    overlay: MemoryContentProvider,
    parser: Arc<dyn SourceParser>,
    resolver: Arc<dyn LibraryResolver>,
    entries: RwLock<FxHashMap<SourceId, Arc<SourceEntry>>>,
    priority: RwLock<Vec<SourceId>>,
    epoch: Mutex<u64>,
    changed: Condvar,
}

impl AnalysisSession {
    pub fn new(options: AnalysisOptions, provider: Arc<dyn ContentProvider>) -> Self {
        let resolve_options = ResolveOptions {
            entry_point_name: options.entry_point_name.clone(),
            implicit_root: options.implicit_root.clone(),
            client_libraries: options
                .client_libraries
                .iter()
                .map(|uri| SmolStr::from(uri.as_str()))
                .collect(),
        };
        Self {
            options,
            resolve_options,
            registry: SourceRegistry::new(),
            provider,
            overlay: MemoryContentProvider::new(),
            parser: Arc::new(DefaultParser),
            resolver: Arc::new(DefaultResolver),
            entries: RwLock::new(FxHashMap::default()),
            priority: RwLock::new(Vec::new()),
            epoch: Mutex::new(0),
            changed: Condvar::new(),
        }
    }

    /// A session whose only content comes from [`set_contents`](Self::set_contents).
    pub fn in_memory(options: AnalysisOptions) -> Self {
        Self::new(options, Arc::new(MemoryContentProvider::new()))
    }

    pub fn with_parser(mut self, parser: Arc<dyn SourceParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn LibraryResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    // ========================================================================
    // SOURCES AND CHANGES
    // ========================================================================

    /// Intern `uri` and add it to the analysis scope.
    pub fn add_source(&self, uri: &str) -> SourceId {
        let source = self.registry.intern(uri);
        if !self.contains(source) {
            self.apply_changes(ChangeSet::new().added(source));
        }
        source
    }

    pub fn source_id(&self, uri: &str) -> Option<SourceId> {
        self.registry.lookup(uri).filter(|id| self.contains(*id))
    }

    pub fn contains(&self, source: SourceId) -> bool {
        self.entries.read().contains_key(&source)
    }

    /// Every source in scope, in id order.
    pub fn sources(&self) -> Vec<SourceId> {
        let mut sources: Vec<SourceId> = self.entries.read().keys().copied().collect();
        sources.sort();
        sources
    }

    pub fn apply_changes(&self, changes: ChangeSet) {
        if changes.is_empty() {
            return;
        }
        {
            let mut entries = self.entries.write();
            let mut invalidator = Invalidator::new(&mut entries);
            for &source in &changes.added {
                invalidator.source_added(source);
            }
            for &source in &changes.changed {
                invalidator.source_changed(source);
            }
            for &source in &changes.removed {
                invalidator.source_removed(source);
            }
        }
        self.priority
            .write()
            .retain(|source| !changes.removed.contains(source));
        tracing::debug!(
            added = changes.added.len(),
            changed = changes.changed.len(),
            removed = changes.removed.len(),
            "applied changes"
        );
        self.notify();
    }

    /// Set (or with `None`, clear) the editor overlay of `source`.
    pub fn set_contents(&self, source: SourceId, text: Option<&str>) -> Result<()> {
        let uri = self
            .registry
            .uri(source)
            .ok_or(AnalysisError::UnknownSource(source))?;
        if !self.overlay.set(&uri, text) {
            return Ok(());
        }
        let changes = if self.contains(source) {
            ChangeSet::new().changed(source)
        } else {
            ChangeSet::new().added(source)
        };
        self.apply_changes(changes);
        Ok(())
    }

    /// Sources analysed before any other.
    pub fn set_analysis_priority_order(&self, sources: &[SourceId]) {
        *self.priority.write() = sources.to_vec();
        self.notify();
    }

    // ========================================================================
    // PUBLICATION
    // ========================================================================

    pub fn snapshot(&self, source: SourceId) -> Option<Arc<SourceEntry>> {
        self.entries.read().get(&source).cloned()
    }

    fn entry(&self, source: SourceId) -> Result<Arc<SourceEntry>> {
        self.snapshot(source)
            .ok_or(AnalysisError::UnknownSource(source))
    }

    /// Replace the entry of `source` with `new` if it is still `expected`.
    /// Hands `new` back otherwise.
    pub fn try_publish(
        &self,
        source: SourceId,
        expected: &Arc<SourceEntry>,
        new: SourceEntry,
    ) -> std::result::Result<(), Box<SourceEntry>> {
        {
            let mut entries = self.entries.write();
            match entries.get_mut(&source) {
                Some(current) if Arc::ptr_eq(current, expected) => *current = Arc::new(new),
                _ => return Err(Box::new(new)),
            }
        }
        self.notify();
        Ok(())
    }

    /// Apply `change` to the current entry, retrying until the swap wins, as
    /// long as `still_current` holds. Returns whether anything was published.
    fn commit(
        &self,
        source: SourceId,
        still_current: impl Fn(&SourceEntry) -> bool,
        change: impl Fn(&mut SourceEntry),
    ) -> bool {
        loop {
            let Some(current) = self.snapshot(source) else {
                return false;
            };
            if !still_current(&current) {
                tracing::trace!(source = %source, "discarding stale result");
                return false;
            }
            let mut copy = current.writable_copy();
            change(&mut copy);
            if self.try_publish(source, &current, copy).is_ok() {
                return true;
            }
        }
    }

    /// Counter bumped by every publication and change set.
    pub fn epoch(&self) -> u64 {
        *self.epoch.lock()
    }

    pub fn notify(&self) {
        *self.epoch.lock() += 1;
        self.changed.notify_all();
    }

    /// Block until the epoch moves past `seen` or `timeout` passes. Returns
    /// whether it moved.
    pub fn wait_for_change(&self, seen: u64, timeout: Duration) -> bool {
        let mut epoch = self.epoch.lock();
        if *epoch == seen {
            self.changed
                .wait_while_for(&mut epoch, |epoch| *epoch == seen, timeout);
        }
        *epoch != seen
    }

    // ========================================================================
    // READING FACTS
    // ========================================================================

    /// A cached fact, without computing it.
    pub fn value<D: SourceDescriptor>(&self, source: SourceId, descriptor: &D) -> Result<D::Value> {
        let entry = self.entry(source)?;
        match entry.state(descriptor) {
            CacheState::Valid => Ok(entry.value(descriptor)),
            CacheState::Error => Err(failure_error(&entry, descriptor.key(), source)),
            state => Err(not_ready(descriptor.key(), source, state)),
        }
    }

    /// A cached library-scoped fact, without computing it.
    pub fn value_in<T: Clone + Default>(
        &self,
        source: SourceId,
        descriptor: &ResolutionDescriptor<T>,
        library: SourceId,
    ) -> Result<T> {
        let entry = self.entry(source)?;
        match entry.state_in(descriptor, library) {
            CacheState::Valid => Ok(entry.value_in(descriptor, library)),
            CacheState::Error => {
                let message = entry
                    .resolution()
                    .get(library)
                    .and_then(|node| node.failure())
                    .map_or_else(|| Arc::from("resolution failed"), |f| f.message.clone());
                Err(AnalysisError::compute_failed(
                    descriptor.key().name(),
                    source,
                    message,
                ))
            }
            state => Err(not_ready(descriptor.key(), source, state)),
        }
    }

    pub fn state<D: SourceDescriptor>(&self, source: SourceId, descriptor: &D) -> Result<CacheState> {
        Ok(self.entry(source)?.state(descriptor))
    }

    pub fn state_in<T: Clone + Default>(
        &self,
        source: SourceId,
        descriptor: &ResolutionDescriptor<T>,
        library: SourceId,
    ) -> Result<CacheState> {
        Ok(self.entry(source)?.state_in(descriptor, library))
    }

    /// A fact, computing it (and whatever it depends on) if needed.
    pub fn compute<D: SourceDescriptor>(&self, source: SourceId, descriptor: &D) -> Result<D::Value> {
        match descriptor.key() {
            key if key.is_content_derived() => {
                self.ensure_parsed(source)?;
            }
            DescriptorKey::PublicNamespace => {
                self.public_namespace(source)?;
            }
            _ => {
                self.resolve(source)?;
            }
        }
        self.value(source, descriptor)
    }

    /// A library-scoped fact, resolving `library` if needed.
    pub fn compute_in<T: Clone + Default>(
        &self,
        source: SourceId,
        descriptor: &ResolutionDescriptor<T>,
        library: SourceId,
    ) -> Result<T> {
        self.resolve(library)?;
        self.value_in(source, descriptor, library)
    }

    /// Parse and resolution errors of `source` known so far.
    pub fn get_all_errors(&self, source: SourceId) -> Result<Vec<Diagnostic>> {
        Ok(self.entry(source)?.get_all_errors())
    }

    // ========================================================================
    // PARSING
    // ========================================================================

    /// Make sure the content facts of `source` are computed.
    pub fn ensure_parsed(&self, source: SourceId) -> Result<Arc<ParsedUnit>> {
        loop {
            let entry = self.entry(source)?;
            match entry.state(&PARSED_UNIT) {
                CacheState::Valid => {
                    return entry
                        .value(&PARSED_UNIT)
                        .ok_or_else(|| AnalysisError::contract("valid PARSED_UNIT without a tree"));
                }
                CacheState::Error => {
                    return Err(failure_error(&entry, DescriptorKey::ParsedUnit, source));
                }
                CacheState::InProcess => {
                    return Err(not_ready(DescriptorKey::ParsedUnit, source, CacheState::InProcess));
                }
                CacheState::Invalid => {}
            }

            let mut claimed = entry.writable_copy();
            for key in DescriptorKey::ALL.into_iter().filter(|k| k.is_content_derived()) {
                claimed.set_state_of(key, None, CacheState::InProcess)?;
            }
            let generation = claimed.content_generation();
            if self.try_publish(source, &entry, claimed).is_err() {
                continue;
            }
            tracing::trace!(source = %source, "claimed parse");

            let outcome = self.load(source).map(|content| {
                let parse = self.parser.parse(source, &content.text);
                (content, parse)
            });
            let same_content = |entry: &SourceEntry| entry.content_generation() == generation;

            return match outcome {
                Ok((content, parse)) => {
                    let unit = Arc::new(parse.unit);
                    let errors: Arc<[Diagnostic]> = parse
                        .errors
                        .iter()
                        .map(|error| Diagnostic::from_syntax(source, error))
                        .collect();
                    let parts = self.intern_all(unit.parts().map(|part| part.uri.as_str()));
                    let referenced = self.intern_all(
                        unit.imports()
                            .chain(unit.exports())
                            .map(|directive| directive.target.uri.as_str()),
                    );
                    let line_info = Arc::new(parse.line_info);
                    let kind = unit.source_kind();
                    let published = self.commit(source, same_content, |entry| {
                        entry.set_modification_stamp(Some(content.modification_stamp));
                        entry.set_value(&LINE_INFO, Some(line_info.clone()));
                        entry.set_value(&SOURCE_KIND, kind);
                        entry.set_value(&PARSED_UNIT, Some(unit.clone()));
                        entry.set_value(&PARSE_ERRORS, errors.clone());
                        entry.set_value(&INCLUDED_PARTS, parts.clone());
                        entry.set_value(&REFERENCED_LIBRARIES, referenced.clone());
                    });
                    if published {
                        tracing::debug!(
                            source = %source,
                            errors = errors.len(),
                            kind = ?kind,
                            "parsed"
                        );
                        Ok(unit)
                    } else {
                        Err(AnalysisError::unavailable(format!(
                            "{} changed while it was parsed",
                            source
                        )))
                    }
                }
                Err(error) => {
                    let failure = ComputeFailure::new(error.to_string());
                    tracing::warn!(source = %source, error = %error, "could not read source");
                    self.commit(source, same_content, |entry| {
                        entry.set_error(&LINE_INFO, failure.clone());
                        entry.set_error(&SOURCE_KIND, failure.clone());
                        entry.set_error(&PARSED_UNIT, failure.clone());
                        entry.set_error(&PARSE_ERRORS, failure.clone());
                        entry.set_error(&INCLUDED_PARTS, failure.clone());
                        entry.set_error(&REFERENCED_LIBRARIES, failure.clone());
                    });
                    Err(AnalysisError::compute_failed(
                        DescriptorKey::ParsedUnit.name(),
                        source,
                        failure.message,
                    ))
                }
            };
        }
    }

    fn load(&self, source: SourceId) -> std::io::Result<Content> {
        let uri = self.registry.uri(source).ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, format!("{} has no URI", source))
        })?;
        match self.overlay.get(&uri) {
            Some(content) => Ok(content),
            None => self.provider.content(&uri),
        }
    }

    fn intern_all<'u>(&self, uris: impl Iterator<Item = &'u str>) -> Arc<[SourceId]> {
        let mut ids: Vec<SourceId> = Vec::new();
        for uri in uris {
            let id = self.registry.intern(uri);
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids.into()
    }

    /// Parse every INVALID source, in parallel when configured. Stops
    /// starting new parses once `cancel` fires.
    pub fn parse_pending(&self, cancel: &CancellationToken) -> Vec<ChangeNotice> {
        let pending: Vec<SourceId> = self
            .analysis_order()
            .into_iter()
            .filter(|source| {
                self.snapshot(*source)
                    .is_some_and(|entry| entry.state(&PARSED_UNIT) == CacheState::Invalid)
            })
            .collect();
        let parse_one = |source: &SourceId| {
            if cancel.is_cancelled() {
                None
            } else {
                self.parse_task(*source).ok()
            }
        };
        if self.options.parallel_parse {
            pending.par_iter().filter_map(parse_one).collect()
        } else {
            pending.iter().filter_map(parse_one).collect()
        }
    }

    fn parse_task(&self, source: SourceId) -> Result<ChangeNotice> {
        let mut notice = ChangeNotice::new(source);
        match self.ensure_parsed(source) {
            Ok(_) => {
                let entry = self.entry(source)?;
                notice.line_info = entry.value(&LINE_INFO);
                notice.parse_errors = Some(entry.value(&PARSE_ERRORS));
                Ok(notice)
            }
            Err(AnalysisError::ComputeFailed { .. }) => Ok(notice),
            Err(error) => Err(error),
        }
    }

    // ========================================================================
    // RESOLUTION
    // ========================================================================

    /// The public namespace of `library`, computed from parse trees.
    ///
    /// Claimed IN_PROCESS like every other fact, so a second requester gets
    /// `TemporarilyUnavailable` instead of computing it again.
    pub fn public_namespace(&self, library: SourceId) -> Result<Namespace> {
        loop {
            let entry = self.entry(library)?;
            match entry.state(&PUBLIC_NAMESPACE) {
                CacheState::Valid => {
                    if let Some(namespace) = entry.value(&PUBLIC_NAMESPACE) {
                        return Ok(namespace);
                    }
                }
                CacheState::InProcess => {
                    return Err(not_ready(
                        DescriptorKey::PublicNamespace,
                        library,
                        CacheState::InProcess,
                    ));
                }
                CacheState::Error => {
                    return Err(failure_error(&entry, DescriptorKey::PublicNamespace, library));
                }
                CacheState::Invalid => {}
            }

            let mut claimed = entry.writable_copy();
            claimed.set_state(&PUBLIC_NAMESPACE, CacheState::InProcess)?;
            let generation = claimed.resolution_generation();
            if self.try_publish(library, &entry, claimed).is_err() {
                continue;
            }
            let unchanged = |entry: &SourceEntry| entry.resolution_generation() == generation;

            let units = SessionUnits::new(self);
            let namespace = compute_public_namespace(&units, library);
            return match units.finish() {
                Ok(()) => {
                    let published = self.commit(library, unchanged, |entry| {
                        entry.set_value(&PUBLIC_NAMESPACE, Some(namespace.clone()))
                    });
                    if published {
                        Ok(namespace)
                    } else {
                        Err(AnalysisError::unavailable(format!(
                            "{} changed while its public namespace was computed",
                            library
                        )))
                    }
                }
                Err(error) => {
                    self.commit(library, unchanged, |entry| {
                        PUBLIC_NAMESPACE.reset(entry, CacheState::Invalid)
                    });
                    Err(error)
                }
            };
        }
    }

    /// Make sure `library` is resolved. Returns the resolution when this call
    /// performed it.
    pub fn resolve(&self, library: SourceId) -> Result<Option<LibraryResolution>> {
        self.ensure_parsed(library)?;
        loop {
            let entry = self.entry(library)?;
            if entry.value(&SOURCE_KIND) == SourceKind::Part {
                return Err(AnalysisError::contract(format!(
                    "{} is a part, not a library",
                    library
                )));
            }
            match entry.state(&ELEMENT) {
                CacheState::Valid => return Ok(None),
                CacheState::Error => return Err(failure_error(&entry, DescriptorKey::Element, library)),
                CacheState::InProcess => {
                    return Err(not_ready(DescriptorKey::Element, library, CacheState::InProcess));
                }
                CacheState::Invalid => {}
            }

            let mut claimed = entry.writable_copy();
            claimed.set_state(&ELEMENT, CacheState::InProcess)?;
            claimed.set_state(&IS_CLIENT, CacheState::InProcess)?;
            claimed.set_state(&IS_LAUNCHABLE, CacheState::InProcess)?;
            let generations = (claimed.content_generation(), claimed.resolution_generation());
            if self.try_publish(library, &entry, claimed).is_err() {
                continue;
            }
            tracing::trace!(library = %library, "claimed resolution");
            let unchanged = |entry: &SourceEntry| {
                (entry.content_generation(), entry.resolution_generation()) == generations
            };

            let units = SessionUnits::new(self);
            let outcome = self
                .resolver
                .resolve(&units, library, &self.resolve_options)
                .and_then(|resolution| units.finish().map(|()| resolution));

            return match outcome {
                Ok(resolution) => {
                    if self.commit_resolution(library, &resolution, unchanged, generations.1) {
                        Ok(Some(resolution))
                    } else {
                        Err(AnalysisError::unavailable(format!(
                            "{} changed while it was resolved",
                            library
                        )))
                    }
                }
                Err(error) if error.is_transient() => {
                    // Release the claim so the next attempt can start over.
                    self.commit(library, unchanged, |entry| {
                        ELEMENT.reset(entry, CacheState::Invalid);
                        IS_CLIENT.reset(entry, CacheState::Invalid);
                        IS_LAUNCHABLE.reset(entry, CacheState::Invalid);
                    });
                    Err(error)
                }
                Err(error) => {
                    let failure = ComputeFailure::new(error.to_string());
                    tracing::warn!(library = %library, error = %error, "resolution failed");
                    self.commit(library, unchanged, |entry| {
                        entry.set_error(&ELEMENT, failure.clone());
                        entry.set_error(&IS_CLIENT, failure.clone());
                        entry.set_error(&IS_LAUNCHABLE, failure.clone());
                        entry.set_resolution_error(library, failure.clone());
                    });
                    Err(AnalysisError::compute_failed(
                        DescriptorKey::Element.name(),
                        library,
                        failure.message,
                    ))
                }
            };
        }
    }

    /// Publish a resolution computed from entries at `generation`, the
    /// library's resolution generation when it was claimed.
    fn commit_resolution(
        &self,
        library: SourceId,
        resolution: &LibraryResolution,
        unchanged: impl Fn(&SourceEntry) -> bool,
        generation: u64,
    ) -> bool {
        if !self.publish_library(library, resolution, unchanged) {
            return false;
        }
        let parts = self.publish_parts(library, resolution, generation);
        tracing::debug!(
            library = %library,
            units = resolution.units.len(),
            parts,
            is_client = resolution.is_client,
            is_launchable = resolution.element.is_launchable(),
            "published resolution"
        );
        true
    }

    /// Publish the facts stored on the library itself.
    fn publish_library(
        &self,
        library: SourceId,
        resolution: &LibraryResolution,
        unchanged: impl Fn(&SourceEntry) -> bool,
    ) -> bool {
        let own = resolution.unit(library);
        self.commit(library, unchanged, |entry| {
            entry.set_value(&ELEMENT, Some(resolution.element.clone()));
            entry.set_value(&IS_CLIENT, resolution.is_client);
            entry.set_value(&IS_LAUNCHABLE, resolution.element.is_launchable());
            if let Some(unit) = own {
                entry.set_value_in(&RESOLVED_UNIT, library, Some(unit.resolved.clone()));
                entry.set_value_in(&RESOLUTION_ERRORS, library, unit.errors.clone());
            }
        })
    }

    /// Publish the node of `library` on each of its parts, as long as the
    /// library is still at resolution `generation`. Returns how many were
    /// published.
    fn publish_parts(&self, library: SourceId, resolution: &LibraryResolution, generation: u64) -> usize {
        let mut published = 0;
        for unit in resolution.units.iter().filter(|unit| unit.source != library) {
            let committed = self.commit_part(unit.source, library, generation, &unit.resolved.unit, |entry| {
                entry.set_value_in(&RESOLVED_UNIT, library, Some(unit.resolved.clone()));
                entry.set_value_in(&RESOLUTION_ERRORS, library, unit.errors.clone());
            });
            if committed {
                published += 1;
            } else if !self
                .snapshot(library)
                .is_some_and(|entry| entry.resolution_generation() == generation)
            {
                tracing::trace!(library = %library, "library invalidated while publishing parts");
                break;
            }
        }
        published
    }

    /// Like [`commit`](Self::commit) for a part, but the swap only happens
    /// while the part still has `tree` and `library` is still at resolution
    /// `generation`. Both are checked under the same write lock as the swap.
    fn commit_part(
        &self,
        part: SourceId,
        library: SourceId,
        generation: u64,
        tree: &Arc<ParsedUnit>,
        change: impl Fn(&mut SourceEntry),
    ) -> bool {
        loop {
            let Some(current) = self.snapshot(part) else {
                return false;
            };
            // A part edited meanwhile has a different tree and keeps its
            // node INVALID.
            if !current
                .value(&PARSED_UNIT)
                .is_some_and(|unit| Arc::ptr_eq(&unit, tree))
            {
                tracing::trace!(source = %part, "discarding stale result");
                return false;
            }
            let mut copy = current.writable_copy();
            change(&mut copy);
            {
                let mut entries = self.entries.write();
                if !entries
                    .get(&library)
                    .is_some_and(|entry| entry.resolution_generation() == generation)
                {
                    tracing::trace!(source = %part, library = %library, "discarding stale result");
                    return false;
                }
                match entries.get_mut(&part) {
                    Some(slot) if Arc::ptr_eq(slot, &current) => *slot = Arc::new(copy),
                    Some(_) => continue,
                    None => return false,
                }
            }
            self.notify();
            return true;
        }
    }

    /// Resolution errors of every unit of `library`, resolving it if needed.
    pub fn resolution_errors(&self, library: SourceId) -> Result<Vec<(SourceId, Arc<[Diagnostic]>)>> {
        self.resolve(library)?;
        let element = self.value(library, &ELEMENT)?.ok_or_else(|| {
            AnalysisError::contract(format!("{} has no library element", library))
        })?;
        element
            .units()
            .map(|unit| Ok((unit, self.value_in(unit, &RESOLUTION_ERRORS, library)?)))
            .collect()
    }

    // ========================================================================
    // ANALYSIS TASKS
    // ========================================================================

    /// Prioritized sources first, then the rest in id order.
    fn analysis_order(&self) -> Vec<SourceId> {
        let priority = self.priority.read().clone();
        let mut seen: FxHashSet<SourceId> = FxHashSet::default();
        let mut order = Vec::new();
        for source in priority.into_iter().chain(self.sources()) {
            if self.contains(source) && seen.insert(source) {
                order.push(source);
            }
        }
        order
    }

    /// Perform one unit of analysis work.
    ///
    /// Parses the first unparsed source, or else resolves the first
    /// unresolved library. `Ok(None)` means there is nothing left to do;
    /// `TemporarilyUnavailable` means the remaining work is being done
    /// elsewhere.
    pub fn perform_analysis_task(&self) -> Result<Option<Vec<ChangeNotice>>> {
        let order = self.analysis_order();
        let mut busy = false;

        for &source in &order {
            let Some(entry) = self.snapshot(source) else {
                continue;
            };
            match entry.state(&PARSED_UNIT) {
                CacheState::Invalid => return self.parse_task(source).map(|notice| Some(vec![notice])),
                CacheState::InProcess => busy = true,
                CacheState::Valid | CacheState::Error => {}
            }
        }

        for &source in &order {
            let Some(entry) = self.snapshot(source) else {
                continue;
            };
            if entry.value(&SOURCE_KIND) != SourceKind::Library {
                continue;
            }
            match entry.state(&ELEMENT) {
                CacheState::Invalid => return self.resolve_task(source).map(Some),
                CacheState::InProcess => busy = true,
                CacheState::Valid | CacheState::Error => {}
            }
        }

        if busy {
            Err(AnalysisError::unavailable("remaining work is in progress elsewhere"))
        } else {
            Ok(None)
        }
    }

    fn resolve_task(&self, library: SourceId) -> Result<Vec<ChangeNotice>> {
        match self.resolve(library) {
            Ok(Some(resolution)) => Ok(resolution
                .units
                .iter()
                .map(|unit| {
                    let mut notice = ChangeNotice::new(unit.source);
                    notice.resolution_errors = Some((library, unit.errors.clone()));
                    notice
                })
                .collect()),
            Ok(None) | Err(AnalysisError::ComputeFailed { .. }) => Ok(Vec::new()),
            Err(error) => Err(error),
        }
    }

    /// Run analysis tasks until idle or cancelled.
    pub fn analyze_all(&self, cancel: &CancellationToken) -> Result<Vec<ChangeNotice>> {
        let mut notices = self.parse_pending(cancel);
        while !cancel.is_cancelled() {
            match self.perform_analysis_task()? {
                Some(more) => notices.extend(more),
                None => break,
            }
        }
        Ok(notices)
    }

    // ========================================================================
    // LIBRARY QUERIES
    // ========================================================================

    /// Libraries `source` belongs to: itself if it is a library, and every
    /// library listing it as a part.
    pub fn libraries_containing(&self, source: SourceId) -> Vec<SourceId> {
        let entries = self.entries.read();
        let mut libraries = Vec::new();
        if let Some(entry) = entries.get(&source)
            && entry.value(&SOURCE_KIND) == SourceKind::Library
        {
            libraries.push(source);
        }
        let mut others: Vec<SourceId> = entries
            .iter()
            .filter(|(id, entry)| **id != source && entry.value(&INCLUDED_PARTS).contains(&source))
            .map(|(id, _)| *id)
            .collect();
        others.sort();
        libraries.extend(others);
        libraries
    }

    /// Parsed sources that are libraries.
    pub fn library_sources(&self) -> Vec<SourceId> {
        self.sources_where(|entry| {
            entry.state(&SOURCE_KIND) == CacheState::Valid
                && entry.value(&SOURCE_KIND) == SourceKind::Library
        })
    }

    pub fn launchable_libraries(&self) -> Vec<SourceId> {
        self.sources_where(|entry| flag(entry, &IS_LAUNCHABLE) == Some(true))
    }

    pub fn client_libraries(&self) -> Vec<SourceId> {
        self.sources_where(|entry| flag(entry, &IS_CLIENT) == Some(true))
    }

    pub fn launchable_client_libraries(&self) -> Vec<SourceId> {
        self.library_sources()
            .into_iter()
            .filter(|library| self.is_client_library(*library))
            .collect()
    }

    pub fn launchable_server_libraries(&self) -> Vec<SourceId> {
        self.library_sources()
            .into_iter()
            .filter(|library| self.is_server_library(*library))
            .collect()
    }

    /// Launchable and client code. False while either flag is unknown.
    pub fn is_client_library(&self, library: SourceId) -> bool {
        self.snapshot(library).is_some_and(|entry| {
            matches!(
                (flag(&entry, &IS_CLIENT), flag(&entry, &IS_LAUNCHABLE)),
                (Some(true), Some(true))
            )
        })
    }

    /// Launchable and not client code. False while either flag is unknown.
    pub fn is_server_library(&self, library: SourceId) -> bool {
        self.snapshot(library).is_some_and(|entry| {
            matches!(
                (flag(&entry, &IS_CLIENT), flag(&entry, &IS_LAUNCHABLE)),
                (Some(false), Some(true))
            )
        })
    }

    /// The class graph of every resolved library.
    pub fn class_graph(&self) -> LibraryGraph {
        self.entries
            .read()
            .values()
            .filter(|entry| entry.state(&ELEMENT) == CacheState::Valid)
            .filter_map(|entry| entry.value(&ELEMENT))
            .collect()
    }

    fn sources_where(&self, predicate: impl Fn(&SourceEntry) -> bool) -> Vec<SourceId> {
        let mut sources: Vec<SourceId> = self
            .entries
            .read()
            .iter()
            .filter(|(_, entry)| predicate(entry))
            .map(|(id, _)| *id)
            .collect();
        sources.sort();
        sources
    }
}

impl std::fmt::Debug for AnalysisSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisSession")
            .field("sources", &self.entries.read().len())
            .field("epoch", &self.epoch())
            .finish_non_exhaustive()
    }
}

/// A flag's value when it is VALID.
fn flag<D: SourceDescriptor<Value = bool>>(entry: &SourceEntry, descriptor: &D) -> Option<bool> {
    (entry.state(descriptor) == CacheState::Valid).then(|| entry.value(descriptor))
}

fn failure_error(entry: &SourceEntry, key: DescriptorKey, source: SourceId) -> AnalysisError {
    let message = entry
        .failure(key)
        .map_or_else(|| Arc::from("computation failed"), |failure| failure.message.clone());
    AnalysisError::compute_failed(key.name(), source, message)
}

fn not_ready(key: DescriptorKey, source: SourceId, state: CacheState) -> AnalysisError {
    AnalysisError::unavailable(format!("{} of {} is {}", key, source, state))
}

// ============================================================================
// UNIT SOURCE
// ============================================================================

/// The session seen by the resolver. Dependencies are parsed on demand; if
/// one is being computed elsewhere the whole resolution is retried later.
struct SessionUnits<'s> {
    session: &'s AnalysisSession,
    blocked: RefCell<Option<AnalysisError>>,
}

impl<'s> SessionUnits<'s> {
    fn new(session: &'s AnalysisSession) -> Self {
        Self {
            session,
            blocked: RefCell::new(None),
        }
    }

    fn note(&self, error: AnalysisError) {
        if error.is_transient() {
            self.blocked.borrow_mut().get_or_insert(error);
        }
    }

    /// `Err` if any dependency was temporarily unavailable.
    fn finish(&self) -> Result<()> {
        match self.blocked.borrow_mut().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl UnitSource for SessionUnits<'_> {
    fn parsed_unit(&self, source: SourceId) -> Option<Arc<ParsedUnit>> {
        self.session
            .ensure_parsed(source)
            .map_err(|error| self.note(error))
            .ok()
    }

    fn resolve_uri(&self, uri: &str) -> Option<SourceId> {
        self.session.source_id(uri)
    }

    fn display_name(&self, source: SourceId) -> String {
        self.session.registry.display_name(source)
    }

    fn public_namespace(&self, library: SourceId) -> Namespace {
        self.session
            .public_namespace(library)
            .map_err(|error| self.note(error))
            .unwrap_or_default()
    }
}
