//! Lifecycle of one cached fact.

use std::fmt;
use std::sync::Arc;

/// State of one cached fact.
///
/// ```text
///            claim              set_value
/// INVALID ─────────► IN_PROCESS ─────────► VALID
///    ▲                   │                   │
///    │      failure      ▼                   │
///    └──────────────── ERROR ◄───────────────┘ (invalidation: back to INVALID)
/// ```
///
/// Any state can be forced back to INVALID. VALID is only reachable by
/// storing a value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CacheState {
    #[default]
    Invalid,
    InProcess,
    Valid,
    /// Computing failed; the failure is cached until the inputs change.
    Error,
}

impl CacheState {
    pub fn is_valid(self) -> bool {
        self == CacheState::Valid
    }

    /// Whether a compute may claim this fact.
    pub fn needs_compute(self) -> bool {
        self == CacheState::Invalid
    }
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CacheState::Invalid => "INVALID",
            CacheState::InProcess => "IN_PROCESS",
            CacheState::Valid => "VALID",
            CacheState::Error => "ERROR",
        })
    }
}

/// Why a fact is in the ERROR state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComputeFailure {
    pub message: Arc<str>,
}

impl ComputeFailure {
    pub fn new(message: impl Into<Arc<str>>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ComputeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A cached value together with its state.
///
/// The value is the descriptor default whenever the state is INVALID or
/// ERROR.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Slot<T> {
    state: CacheState,
    value: T,
}

impl<T: Clone + Default> Slot<T> {
    pub fn state(&self) -> CacheState {
        self.state
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub(crate) fn store(&mut self, value: T) {
        self.value = value;
        self.state = CacheState::Valid;
    }

    /// Change the state, keeping the value.
    pub(crate) fn mark(&mut self, state: CacheState) {
        self.state = state;
    }

    pub(crate) fn reset(&mut self, state: CacheState) {
        self.value = T::default();
        self.state = state;
    }
}
