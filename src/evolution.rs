//! The generational pipeline: survival, breeding, mutation, evaluation and
//! reporting, applied in that order exactly once per generation. The loop
//! itself is single-threaded; only the evaluation stage fans out across the
//! worker pool, and generation N+1 never starts before generation N has
//! fully completed.

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::checkpoint::Checkpointer;
use crate::error::{Error, Result};
use crate::fitness::TargetImage;
use crate::mutate::mutate_painting;
use crate::population::{cmp_fitness, Individual, Population};
use crate::settings::Settings;

/// Elitist survival: the top `ceil(fraction * len)` individuals by fitness
/// carry over unchanged. `fraction = 0` disables elitism. Unevaluated
/// individuals rank after evaluated ones; ties keep encounter order.
pub fn survivors(individuals: &[Individual], fraction: f32) -> Vec<Individual> {
    if fraction <= 0.0 || individuals.is_empty() {
        return Vec::new();
    }
    // stay in f32: widening the fraction to f64 first carries its
    // representation error above the true value (0.1f32 * 10 would ceil
    // to 2), while the f32 product rounds back to exactly 1.0
    let keep = (fraction * individuals.len() as f32).ceil() as usize;
    let keep = keep.min(individuals.len());

    let mut ranked: Vec<&Individual> = individuals.iter().collect();
    ranked.sort_by(|a, b| cmp_fitness(a, b));
    ranked.into_iter().take(keep).cloned().collect()
}

/// Asymmetric parent pick: the first parent is the best already-evaluated
/// individual (first encountered on ties), falling back to a uniform random
/// choice when nothing is evaluated yet; the second parent is always a
/// uniform random individual, evaluated or not. Breeding from the current
/// best every time is strong exploitation; the random partner keeps
/// exploring. That asymmetry is the selection contract, not an accident.
pub fn pick_parents<'a, R: Rng>(
    individuals: &'a [Individual],
    rng: &mut R,
) -> (&'a Individual, &'a Individual) {
    let mom = individuals
        .iter()
        .filter(|i| i.fitness.is_some())
        .min_by(|a, b| cmp_fitness(a, b))
        .unwrap_or_else(|| &individuals[rng.random_range(0..individuals.len())]);
    let dad = &individuals[rng.random_range(0..individuals.len())];
    (mom, dad)
}

/// Wires the configured pipeline to a target image and runs it.
/// The caller owns driving (how many generations, when to cancel);
/// everything per-generation lives here.
pub struct Evolution {
    settings: Settings,
    target: TargetImage,
    pool: rayon::ThreadPool,
    checkpointer: Checkpointer,
    cancel: Arc<AtomicBool>,
    rng: Pcg32,
}

impl Evolution {
    /// validate settings, decode the target and set up the worker pool and
    /// output directory. all configuration errors surface here, before any
    /// generation runs.
    pub fn new(settings: Settings) -> Result<Self> {
        settings.validate()?;
        let path = settings
            .target_path
            .as_deref()
            .ok_or_else(|| Error::Config("no target image configured".into()))?;
        let target = TargetImage::load(path)?;
        Self::with_target(settings, target)
    }

    /// same as `new` but with an already-decoded target (used by callers
    /// that synthesize targets, and by tests)
    pub fn with_target(settings: Settings, target: TargetImage) -> Result<Self> {
        settings.validate_run()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(settings.workers)
            .thread_name(|i| format!("eval-{i}"))
            .build()?;
        let checkpointer = Checkpointer::new(
            &settings.output_dir,
            &settings.image_template,
            settings.checkpoint_interval,
        )?;
        let rng = Pcg32::seed_from_u64(settings.seed);
        let cancel = Arc::new(AtomicBool::new(false));
        Ok(Self {
            settings,
            target,
            pool,
            checkpointer,
            cancel,
            rng,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn target(&self) -> &TargetImage {
        &self.target
    }

    /// handle for cooperative cancellation; checked at the top of each
    /// generation, never mid-generation
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// fresh generation-0 population sized to the target canvas
    pub fn initial_population(&mut self) -> Population {
        let (width, height) = self.target.dimensions();
        Population::random(
            self.settings.population_size,
            self.settings.triangle_count,
            width,
            height,
            self.settings.background,
            &mut self.rng,
        )
    }

    /// run up to `generations` full pipeline passes, stopping early if the
    /// cancel handle is set
    pub fn evolve(&mut self, population: &mut Population, generations: u64) -> Result<()> {
        for _ in 0..generations {
            if self.cancel.load(Ordering::Relaxed) {
                log::info!(
                    "cancelled after generation {}, stopping",
                    population.generation
                );
                break;
            }
            self.step(population)?;
        }
        Ok(())
    }

    /// One full generation: survive -> breed -> mutate -> evaluate ->
    /// report. The population is replaced wholesale (subject to elitism)
    /// and its generation counter incremented; size is invariant.
    pub fn step(&mut self, population: &mut Population) -> Result<()> {
        profiling::scope!("Evolution::step");
        let size = self.settings.population_size;

        // survival: elite carried over unchanged, fitness and all
        let mut next = survivors(&population.individuals, self.settings.survival_fraction);
        next.truncate(size);

        // breeding + mutation: parents come from the full previous
        // generation, children are always the first crossover offspring,
        // mutated, with fitness unset
        while next.len() < size {
            let (mom, dad) = pick_parents(&population.individuals, &mut self.rng);
            let (child_a, _child_b) = mom.chromosome.crossover(&dad.chromosome, &mut self.rng)?;
            let mutated = mutate_painting(&child_a, &self.settings.mutation, &mut self.rng);
            next.push(Individual::new(mutated));
        }
        population.individuals = next;

        // evaluation: non-lazy, re-scores survivors too
        population.evaluate(&self.target, &self.pool)?;
        population.generation += 1;

        self.report(population)
    }

    /// reporting stage: log the generation summary, persist the best
    /// painting, snapshot the population on the configured cadence
    fn report(&self, population: &Population) -> Result<()> {
        profiling::scope!("Evolution::report");
        let best = population
            .best()
            .ok_or_else(|| Error::Config("population has no evaluated individuals".into()))?;
        let avg = population.average_fitness().unwrap_or(f64::NAN);
        log::info!(
            "generation {}: best {:.0}, avg {:.0}",
            population.generation,
            best.fitness.unwrap_or(f64::NAN),
            avg
        );

        self.checkpointer
            .write_best_image(population.generation, &best.chromosome)?;

        if self.checkpointer.snapshot_due(population.generation) {
            // a lost checkpoint compromises resumability but not the run;
            // in-memory state is still intact, so keep evolving
            if let Err(err) = self.checkpointer.write_snapshot(population) {
                log::warn!(
                    "checkpoint write failed at generation {}: {err}",
                    population.generation
                );
            }
        }
        Ok(())
    }
}
