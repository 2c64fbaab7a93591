//! Programs, operation kinds and the generation catalog.
//!
//! A [`Program`] is an immutable sequence of [`Operation`]s over a fixed
//! number of resource slots, optionally followed by a full measurement that
//! turns every slot into one outcome bit. Construction checks that every
//! operation's slots are distinct and in range.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::InvalidInput;

/// One entry of an operation library.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationKind {
    /// Name, e.g. `"cx"`.
    pub name: String,
    /// Number of distinct slots the operation acts on.
    pub arity: usize,
    /// Number of continuous parameters it takes.
    pub parameters: usize,
    /// Number of classical bits it reads or writes.
    pub classical_bits: usize,
}

impl OperationKind {
    /// A parameterless gate acting on `arity` slots.
    pub fn gate(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
            parameters: 0,
            classical_bits: 0,
        }
    }

    /// A gate that takes `parameters` continuous angles.
    pub fn parametrized(name: impl Into<String>, arity: usize, parameters: usize) -> Self {
        Self {
            parameters,
            ..Self::gate(name, arity)
        }
    }

    /// A non-gate instruction such as measurement or reset.
    pub fn instruction(name: impl Into<String>, arity: usize, classical_bits: usize) -> Self {
        Self {
            classical_bits,
            ..Self::gate(name, arity)
        }
    }

    /// True if the kind can be placed by the generator: parameterless,
    /// purely quantum, and acting on at least one slot.
    pub fn is_generatable(&self) -> bool {
        self.parameters == 0 && self.classical_bits == 0 && self.arity > 0
    }
}

/// The fixed set of kinds the generator draws from.
///
/// Built once from an operation library; kinds that need parameters or
/// touch classical bits are dropped at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    kinds: Vec<OperationKind>,
}

impl Catalog {
    /// Filter `library` down to the generatable kinds.
    ///
    /// Later duplicates of a name are ignored. Fails if nothing remains.
    pub fn new(library: impl IntoIterator<Item = OperationKind>) -> Result<Self, InvalidInput> {
        let mut seen = BTreeSet::new();
        let kinds: Vec<OperationKind> = library
            .into_iter()
            .filter(OperationKind::is_generatable)
            .filter(|k| seen.insert(k.name.clone()))
            .collect();

        if kinds.is_empty() {
            return Err(InvalidInput::EmptyCatalog);
        }
        Ok(Self { kinds })
    }

    /// Catalog derived from the standard gate library.
    pub fn standard() -> Self {
        Self {
            kinds: standard_library()
                .into_iter()
                .filter(OperationKind::is_generatable)
                .collect(),
        }
    }

    /// Keep only kinds of arity `<= max_arity`.
    pub fn up_to_arity(&self, max_arity: usize) -> Result<Self, InvalidInput> {
        Self::new(self.kinds.iter().filter(|k| k.arity <= max_arity).cloned())
    }

    /// Kinds in library order.
    pub fn kinds(&self) -> &[OperationKind] {
        &self.kinds
    }

    /// Look up a kind by name.
    pub fn get(&self, name: &str) -> Option<&OperationKind> {
        self.kinds.iter().find(|k| k.name == name)
    }

    /// Number of kinds.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Never true for a constructed catalog.
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Largest arity in the catalog.
    pub fn max_arity(&self) -> usize {
        self.kinds.iter().map(|k| k.arity).max().unwrap_or(0)
    }

    /// Fail if any kind cannot be placed on `slot_count` slots.
    pub fn check_slot_count(&self, slot_count: usize) -> Result<(), InvalidInput> {
        match self.kinds.iter().find(|k| k.arity > slot_count) {
            Some(k) => Err(InvalidInput::ArityExceedsSlots {
                kind: k.name.clone(),
                arity: k.arity,
                slot_count,
            }),
            None => Ok(()),
        }
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

fn standard_library() -> Vec<OperationKind> {
    use OperationKind as K;

    let mut lib = Vec::new();
    for name in ["id", "x", "y", "z", "h", "s", "sdg", "t", "tdg", "sx", "sxdg"] {
        lib.push(K::gate(name, 1));
    }
    for name in ["cx", "cy", "cz", "ch", "cs", "csdg", "csx", "swap", "iswap", "dcx", "ecr"] {
        lib.push(K::gate(name, 2));
    }
    for name in ["ccx", "ccz", "cswap", "rccx"] {
        lib.push(K::gate(name, 3));
    }
    for name in ["c3x", "c3sx", "rcccx"] {
        lib.push(K::gate(name, 4));
    }

    for (name, arity, params) in [
        ("global_phase", 0, 1),
        ("p", 1, 1),
        ("r", 1, 2),
        ("rx", 1, 1),
        ("ry", 1, 1),
        ("rz", 1, 1),
        ("u", 1, 3),
        ("u1", 1, 1),
        ("u2", 1, 2),
        ("u3", 1, 3),
        ("cp", 2, 1),
        ("crx", 2, 1),
        ("cry", 2, 1),
        ("crz", 2, 1),
        ("cu", 2, 4),
        ("cu1", 2, 1),
        ("cu3", 2, 3),
        ("rxx", 2, 1),
        ("ryy", 2, 1),
        ("rzz", 2, 1),
        ("rzx", 2, 1),
        ("xx_minus_yy", 2, 2),
        ("xx_plus_yy", 2, 2),
        ("mcphase", 3, 1),
    ] {
        lib.push(K::parametrized(name, arity, params));
    }

    lib.push(K::instruction("measure", 1, 1));
    lib.push(K::instruction("reset", 1, 0));
    lib
}

/// Identity of a generated program, used as its correlation key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgramId(pub String);

impl ProgramId {
    /// Borrow the id as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProgramId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// One operation applied to an ordered list of slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Kind name.
    pub kind: String,
    /// Slots acted on, in argument order.
    pub slots: Vec<usize>,
}

impl Operation {
    /// Create an operation. Slots are checked when the program is built.
    pub fn new(kind: impl Into<String>, slots: impl Into<Vec<usize>>) -> Self {
        Self {
            kind: kind.into(),
            slots: slots.into(),
        }
    }
}

/// An immutable program over `slot_count` resource slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ProgramRepr")]
pub struct Program {
    id: ProgramId,
    slot_count: usize,
    operations: Vec<Operation>,
    measured: bool,
}

#[derive(Deserialize)]
struct ProgramRepr {
    id: ProgramId,
    slot_count: usize,
    operations: Vec<Operation>,
    measured: bool,
}

impl TryFrom<ProgramRepr> for Program {
    type Error = InvalidInput;

    fn try_from(r: ProgramRepr) -> Result<Self, Self::Error> {
        Program::new(r.id, r.slot_count, r.operations, r.measured)
    }
}

impl Program {
    /// Build a program, checking that every operation's slots are distinct
    /// and inside `[0, slot_count)`.
    pub fn new(
        id: ProgramId,
        slot_count: usize,
        operations: Vec<Operation>,
        measured: bool,
    ) -> Result<Self, InvalidInput> {
        for op in &operations {
            let mut seen = BTreeSet::new();
            for &slot in &op.slots {
                if slot >= slot_count {
                    return Err(InvalidInput::SlotOutOfRange {
                        kind: op.kind.clone(),
                        slot,
                        slot_count,
                    });
                }
                if !seen.insert(slot) {
                    return Err(InvalidInput::DuplicateSlot {
                        kind: op.kind.clone(),
                        slot,
                    });
                }
            }
        }
        Ok(Self {
            id,
            slot_count,
            operations,
            measured,
        })
    }

    /// Check every operation against `catalog`: known kind, matching arity.
    ///
    /// The spread prologue kind must also be in the catalog for this to pass.
    pub fn check_against(&self, catalog: &Catalog) -> Result<(), InvalidInput> {
        for op in &self.operations {
            let kind = catalog
                .get(&op.kind)
                .ok_or_else(|| InvalidInput::UnknownKind(op.kind.clone()))?;
            if kind.arity != op.slots.len() {
                return Err(InvalidInput::ArityMismatch {
                    kind: op.kind.clone(),
                    arity: kind.arity,
                    found: op.slots.len(),
                });
            }
        }
        Ok(())
    }

    /// Correlation key.
    pub fn id(&self) -> &ProgramId {
        &self.id
    }

    /// Number of resource slots.
    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Operations in application order, excluding the trailing measurement.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Whether the program ends with a full measurement.
    pub fn is_measured(&self) -> bool {
        self.measured
    }

    /// Width of the outcome bitstrings this program produces.
    pub fn measured_bits(&self) -> usize {
        if self.measured {
            self.slot_count
        } else {
            0
        }
    }

    /// Occurrences of each operation kind, excluding the measurement.
    pub fn kind_counts(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for op in &self.operations {
            *counts.entry(op.kind.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "slots = {}", self.slot_count)?;
        writeln!(f, "operations = {}", self.operations.len())?;
        for op in &self.operations {
            writeln!(f, "{} : {:?}", op.kind, op.slots)?;
        }
        Ok(())
    }
}
