//! Precondition violations raised by the pure core.

use thiserror::Error;

/// A local precondition was violated.
///
/// These are never retried: the caller handed in a malformed histogram, an
/// empty sample set, or a program/catalog combination that cannot be built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InvalidInput {
    /// Histogram has no outcomes with a positive count.
    #[error("histogram is empty (total count is 0)")]
    EmptyHistogram,

    /// Histogram key is not a non-empty string over `{0,1}`.
    #[error("histogram key {key:?} is not a bitstring")]
    MalformedKey {
        /// Offending key.
        key: String,
    },

    /// Histogram keys have different lengths.
    #[error("histogram key {key:?} has width {found}, expected {expected}")]
    InconsistentWidth {
        /// Offending key.
        key: String,
        /// Width of the first key seen.
        expected: usize,
        /// Width of the offending key.
        found: usize,
    },

    /// Two histograms compared against each other measure a different number of bits.
    #[error("cannot compare histograms of width {left} and {right}")]
    WidthMismatch {
        /// Width of the first histogram.
        left: usize,
        /// Width of the second histogram.
        right: usize,
    },

    /// Histogram total does not match the requested number of shots.
    #[error("histogram holds {found} shots, expected {expected}")]
    ShotMismatch {
        /// Requested shots.
        expected: u64,
        /// Sum of the counts.
        found: u64,
    },

    /// Outlier filtering was asked to filter nothing.
    #[error("sample set is empty")]
    EmptySamples,

    /// A timing sample is NaN or infinite.
    #[error("sample {index} is not finite ({value})")]
    NonFiniteSample {
        /// Position in the input sequence.
        index: usize,
        /// The value.
        value: f64,
    },

    /// An operation kind cannot be placed on the available slots.
    #[error("operation kind {kind:?} has arity {arity} but only {slot_count} slots exist")]
    ArityExceedsSlots {
        /// Kind name.
        kind: String,
        /// Declared arity.
        arity: usize,
        /// Slots in the program.
        slot_count: usize,
    },

    /// An operation references a slot outside `[0, slot_count)`.
    #[error("operation {kind:?} references slot {slot} outside [0, {slot_count})")]
    SlotOutOfRange {
        /// Kind name.
        kind: String,
        /// Offending slot.
        slot: usize,
        /// Slots in the program.
        slot_count: usize,
    },

    /// An operation references the same slot twice.
    #[error("operation {kind:?} references slot {slot} more than once")]
    DuplicateSlot {
        /// Kind name.
        kind: String,
        /// Repeated slot.
        slot: usize,
    },

    /// An operation's slot list does not match its kind's arity.
    #[error("operation {kind:?} takes {arity} slots, got {found}")]
    ArityMismatch {
        /// Kind name.
        kind: String,
        /// Declared arity.
        arity: usize,
        /// Slots supplied.
        found: usize,
    },

    /// Operation kind is not part of the catalog in use.
    #[error("unknown operation kind {0:?}")]
    UnknownKind(String),

    /// No generatable kinds remain after filtering the catalog.
    #[error("operation catalog is empty")]
    EmptyCatalog,

    /// An outlier policy parameter is out of range.
    #[error("invalid outlier policy: {0}")]
    InvalidPolicy(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
