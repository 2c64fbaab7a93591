//! Constrained random program generation.
//!
//! Each program starts from an optional spread prologue (one single-slot
//! operation per slot), continues with operations drawn uniformly from the
//! catalog on uniformly drawn distinct slots, and ends with a full
//! measurement. Whether every catalog kind fits on the requested slots is
//! checked before any draw.

use chrono::Local;
use rand::seq::{index, IndexedRandom};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

use qfuzz_core::constants::DEFAULT_SPREAD_KIND;
use qfuzz_core::{Catalog, InvalidInput, Operation, Program, ProgramId};

use crate::config::FuzzConfig;

/// Per-batch generation options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzOptions {
    /// Prepend one spread operation on every slot.
    pub random_init: bool,
    /// Single-slot kind used by the prologue.
    pub spread_kind: String,
    /// Append the trailing full measurement.
    pub measure: bool,
}

impl Default for FuzzOptions {
    fn default() -> Self {
        Self {
            random_init: false,
            spread_kind: DEFAULT_SPREAD_KIND.to_string(),
            measure: true,
        }
    }
}

impl From<&FuzzConfig> for FuzzOptions {
    fn from(c: &FuzzConfig) -> Self {
        Self {
            random_init: c.random_init,
            spread_kind: c.spread_kind.clone(),
            measure: true,
        }
    }
}

/// Random program generator over a fixed catalog.
///
/// The random source is injectable; [`Fuzzer::seeded`] gives reproducible
/// batches for tests and reruns.
#[derive(Debug, Clone)]
pub struct Fuzzer<R = Xoshiro256PlusPlus> {
    catalog: Catalog,
    rng: R,
}

impl Fuzzer<Xoshiro256PlusPlus> {
    /// Generator seeded from the thread-local entropy source.
    pub fn new(catalog: Catalog) -> Self {
        Self::with_rng(catalog, Xoshiro256PlusPlus::from_rng(&mut rand::rng()))
    }

    /// Generator with a fixed seed.
    pub fn seeded(catalog: Catalog, seed: u64) -> Self {
        Self::with_rng(catalog, Xoshiro256PlusPlus::seed_from_u64(seed))
    }

    /// Seeded if `seed` is set, entropy-seeded otherwise.
    pub fn from_seed(catalog: Catalog, seed: Option<u64>) -> Self {
        match seed {
            Some(s) => Self::seeded(catalog, s),
            None => Self::new(catalog),
        }
    }
}

impl<R: Rng> Fuzzer<R> {
    /// Generator over an arbitrary random source.
    pub fn with_rng(catalog: Catalog, rng: R) -> Self {
        Self { catalog, rng }
    }

    /// The catalog kinds are drawn from.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Generate `program_count` programs of `operation_count` random
    /// operations over `slot_count` slots.
    ///
    /// Fails before drawing anything if a catalog kind needs more slots than
    /// `slot_count`, or if the spread kind is not a single-slot operation.
    pub fn generate(
        &mut self,
        program_count: usize,
        slot_count: usize,
        operation_count: usize,
        options: &FuzzOptions,
    ) -> Result<Vec<Program>, InvalidInput> {
        self.catalog.check_slot_count(slot_count)?;
        if options.random_init {
            self.check_spread_kind(&options.spread_kind)?;
        }

        let stamp = Local::now().format("%Y-%m-%d_%H-%M-%S%.3f").to_string();
        let mut programs = Vec::with_capacity(program_count);

        for i in 0..program_count {
            let id = ProgramId(format!("{stamp}_{i:04}"));
            programs.push(self.generate_one(id, slot_count, operation_count, options)?);
        }

        tracing::info!(
            programs = program_count,
            slot_count,
            operation_count,
            random_init = options.random_init,
            "generated programs"
        );
        Ok(programs)
    }

    fn generate_one(
        &mut self,
        id: ProgramId,
        slot_count: usize,
        operation_count: usize,
        options: &FuzzOptions,
    ) -> Result<Program, InvalidInput> {
        let prologue = if options.random_init { slot_count } else { 0 };
        let mut operations = Vec::with_capacity(prologue + operation_count);

        if options.random_init {
            for slot in 0..slot_count {
                operations.push(Operation::new(options.spread_kind.clone(), [slot]));
            }
        }

        for _ in 0..operation_count {
            let kind = self
                .catalog
                .kinds()
                .choose(&mut self.rng)
                .ok_or(InvalidInput::EmptyCatalog)?;
            let slots = index::sample(&mut self.rng, slot_count, kind.arity).into_vec();
            operations.push(Operation::new(kind.name.clone(), slots));
        }

        Program::new(id, slot_count, operations, options.measure)
    }

    fn check_spread_kind(&self, name: &str) -> Result<(), InvalidInput> {
        if name.is_empty() {
            return Err(InvalidInput::UnknownKind(String::new()));
        }
        match self.catalog.get(name) {
            Some(kind) if kind.arity != 1 => Err(InvalidInput::ArityMismatch {
                kind: name.to_string(),
                arity: kind.arity,
                found: 1,
            }),
            _ => Ok(()),
        }
    }
}
