use crate::distance::edit_distance_bytes;
use crate::mutation::Mutator;
use crate::payload::{FieldLine, Payload};
use crate::token::{TokenError, TokenGenerator};
use rand::Rng;
use tracing::warn;

/// Default number of payloads per generation.
pub const DEFAULT_POPULATION_SIZE: usize = 20;

/// Number of children each crossover batch produces. With
/// `population_size / 2` batches this keeps generation cardinality stable.
const CHILDREN_PER_BATCH: usize = 2;

/// Fitness extremes of one population: the payloads farthest from and
/// closest to the reference target, with their edit distances.
///
/// When several payloads share an extreme distance, which of them is
/// reported is unspecified; callers must not rely on tie selection.
#[derive(Debug, Clone)]
pub struct FitnessReport {
    pub max_payload: Payload,
    pub max_distance: usize,
    pub min_payload: Payload,
    pub min_distance: usize,
}

/// Owns the evolutionary loop: initialization, fitness evaluation,
/// selection, crossover, and generation advancement.
///
/// All operations are pure, synchronous computations; randomness comes in
/// through the caller-supplied `Rng`.
#[derive(Debug, Clone)]
pub struct PopulationManager {
    population_size: usize,
}

impl PopulationManager {
    pub fn new(population_size: usize) -> Self {
        Self {
            population_size: population_size.max(2),
        }
    }

    pub fn population_size(&self) -> usize {
        self.population_size
    }

    /// Builds the initial population: every payload is the canonical request
    /// template with three header values drawn from a fresh token session.
    /// Deterministic structure, random content.
    pub fn init_population<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<Vec<Payload>, TokenError> {
        let mut tokens = TokenGenerator::new();
        (0..self.population_size)
            .map(|_| {
                let host = tokens.next_token(rng)?;
                let agent = tokens.next_token(rng)?;
                let accept = tokens.next_token(rng)?;
                Ok(Payload::new(vec![
                    FieldLine::new("GET", b"/ HTTP/1.1".to_vec()),
                    FieldLine::new("Host:", host.into_bytes()),
                    FieldLine::new("User-Agent:", agent.into_bytes()),
                    FieldLine::new("Accept:", accept.into_bytes()),
                ]))
            })
            .collect()
    }

    /// Scores every payload against `target` and returns the extremes.
    /// Returns `None` for an empty population.
    pub fn evaluate(&self, population: &[Payload], target: &[u8]) -> Option<FitnessReport> {
        let mut scored = population
            .iter()
            .map(|payload| (payload, edit_distance_bytes(&payload.to_wire(), target)));

        let (first_payload, first_distance) = scored.next()?;
        let mut report = FitnessReport {
            max_payload: first_payload.clone(),
            max_distance: first_distance,
            min_payload: first_payload.clone(),
            min_distance: first_distance,
        };

        for (payload, payload_distance) in scored {
            if payload_distance > report.max_distance {
                report.max_distance = payload_distance;
                report.max_payload = payload.clone();
            }
            if payload_distance < report.min_distance {
                report.min_distance = payload_distance;
                report.min_payload = payload.clone();
            }
        }
        Some(report)
    }

    /// Recombines two parents into `n` children.
    ///
    /// Both parents are truncated to the shorter line count; tail lines of
    /// the longer parent are dropped. For each line position the value comes
    /// from one parent chosen uniformly, and with 50% probability that value
    /// is further randomized by resampling each byte from the union of both
    /// parents' bytes at that position (length preserved). The field name is
    /// always taken from the father.
    ///
    /// A parent pair with zero overlapping lines is malformed: the father is
    /// returned unchanged `n` times and a warning is logged.
    pub fn crossover<R: Rng + ?Sized>(
        &self,
        father: &Payload,
        mother: &Payload,
        n: usize,
        rng: &mut R,
    ) -> Vec<Payload> {
        let overlap = father.line_count().min(mother.line_count());
        if overlap == 0 {
            warn!("crossover on parents with zero parsable lines, returning father unchanged");
            return vec![father.clone(); n];
        }

        (0..n)
            .map(|_| {
                let lines = (0..overlap)
                    .map(|i| {
                        let father_value = &father.lines()[i].value;
                        let mother_value = &mother.lines()[i].value;
                        let mut selected = if rng.random_bool(0.5) {
                            father_value.clone()
                        } else {
                            mother_value.clone()
                        };

                        if rng.random_bool(0.5) {
                            let union: Vec<u8> = father_value
                                .iter()
                                .chain(mother_value.iter())
                                .copied()
                                .collect();
                            if !union.is_empty() {
                                selected = (0..selected.len())
                                    .map(|_| union[rng.random_range(0..union.len())])
                                    .collect();
                            }
                        }

                        FieldLine::new(father.lines()[i].name.clone(), selected)
                    })
                    .collect();
                Payload::new(lines)
            })
            .collect()
    }

    /// The sole generational step: evaluate, breed the two extreme payloads
    /// in `population_size / 2` randomly ordered batches, and mutate every
    /// child. Repeats indefinitely under the orchestrator; there is no
    /// convergence criterion.
    pub fn advance_generation<R, M>(
        &self,
        population: &[Payload],
        target: &[u8],
        mutator: &M,
        rng: &mut R,
    ) -> Vec<Payload>
    where
        R: Rng + ?Sized,
        M: Mutator<R>,
    {
        let Some(report) = self.evaluate(population, target) else {
            warn!("advance_generation on empty population, nothing to breed");
            return Vec::new();
        };

        let mut next_generation = Vec::with_capacity(population.len());
        for _ in 0..population.len() / 2 {
            let (father, mother) = if rng.random_bool(0.5) {
                (&report.max_payload, &report.min_payload)
            } else {
                (&report.min_payload, &report.max_payload)
            };
            next_generation.extend(self.crossover(father, mother, CHILDREN_PER_BATCH, rng));
        }

        next_generation
            .iter()
            .map(|child| mutator.mutate(child, rng))
            .collect()
    }
}

impl Default for PopulationManager {
    fn default() -> Self {
        Self::new(DEFAULT_POPULATION_SIZE)
    }
}
