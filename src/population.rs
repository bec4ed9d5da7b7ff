use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::dna::Painting;
use crate::error::Result;
use crate::fitness::{self, TargetImage};

/// a chromosome paired with its cached fitness.
/// `None` means not yet evaluated; breeding and mutation always produce
/// fresh individuals with fitness unset.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Individual {
    pub chromosome: Painting,
    pub fitness: Option<f64>,
}

impl Individual {
    pub fn new(chromosome: Painting) -> Self {
        Self {
            chromosome,
            fitness: None,
        }
    }
}

/// orders individuals best-first; unevaluated individuals sort last.
/// ties keep encounter order (callers rely on stable sorts / first-min).
pub(crate) fn cmp_fitness(a: &Individual, b: &Individual) -> Ordering {
    match (a.fitness, b.fitness) {
        (Some(fa), Some(fb)) => fa.partial_cmp(&fb).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// the fixed-size set of individuals evolved together. size never changes
/// across generations; the counter increments once per completed pipeline
/// pass. the whole struct serializes for checkpointing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Population {
    pub individuals: Vec<Individual>,
    pub generation: u64,
}

impl Population {
    /// seed `size` individuals with random paintings of `triangle_count`
    /// triangles each, fitness unset
    pub fn random<R: Rng>(
        size: usize,
        triangle_count: usize,
        width: u32,
        height: u32,
        background: [f32; 4],
        rng: &mut R,
    ) -> Self {
        profiling::scope!("Population::random");
        let individuals = (0..size)
            .map(|_| Individual::new(Painting::random(triangle_count, width, height, background, rng)))
            .collect();
        Self {
            individuals,
            generation: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    /// best evaluated individual (minimum fitness, first encountered on
    /// ties). `None` when nothing has been evaluated yet.
    pub fn best(&self) -> Option<&Individual> {
        self.individuals
            .iter()
            .filter(|i| i.fitness.is_some())
            .min_by(|a, b| cmp_fitness(a, b))
    }

    /// mean fitness over evaluated individuals; `None` if none are scored
    pub fn average_fitness(&self) -> Option<f64> {
        let scores: Vec<f64> = self.individuals.iter().filter_map(|i| i.fitness).collect();
        if scores.is_empty() {
            return None;
        }
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }

    /// Evaluation stage: re-score every individual against the target,
    /// survivors included, so fitness always reflects the current
    /// chromosome. The fan-out runs on the supplied worker pool; results
    /// land in each individual's own slot, so completion order is
    /// irrelevant. Blocks until all evaluations finish; any worker failure
    /// aborts the generation, since a missing fitness value would break
    /// the selection invariant.
    pub fn evaluate(&mut self, target: &TargetImage, pool: &rayon::ThreadPool) -> Result<()> {
        profiling::scope!("Population::evaluate");
        pool.install(|| {
            self.individuals.par_iter_mut().try_for_each(|individual| {
                let rendered = individual.chromosome.render();
                individual.fitness = Some(fitness::evaluate(target, &rendered)?);
                Ok(())
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn solid_target(w: u32, h: u32) -> TargetImage {
        TargetImage::from_rgba8(&RgbaImage::from_pixel(w, h, Rgba([128, 128, 128, 255])))
    }

    fn small_pool() -> rayon::ThreadPool {
        rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap()
    }

    #[test]
    fn evaluation_scores_every_individual() {
        let mut rng = Pcg32::seed_from_u64(21);
        let mut pop = Population::random(10, 8, 16, 16, [1.0; 4], &mut rng);
        assert!(pop.individuals.iter().all(|i| i.fitness.is_none()));

        pop.evaluate(&solid_target(16, 16), &small_pool()).unwrap();
        assert!(pop.individuals.iter().all(|i| i.fitness.is_some()));
        assert!(pop.individuals.iter().all(|i| i.fitness.unwrap() >= 0.0));
    }

    #[test]
    fn best_is_minimal_and_average_matches() {
        let mut rng = Pcg32::seed_from_u64(22);
        let mut pop = Population::random(10, 8, 16, 16, [1.0; 4], &mut rng);
        pop.evaluate(&solid_target(16, 16), &small_pool()).unwrap();

        let best = pop.best().unwrap().fitness.unwrap();
        for i in &pop.individuals {
            assert!(best <= i.fitness.unwrap());
        }

        let manual: f64 = pop.individuals.iter().map(|i| i.fitness.unwrap()).sum::<f64>()
            / pop.individuals.len() as f64;
        assert_eq!(pop.average_fitness().unwrap(), manual);
    }

    #[test]
    fn best_is_none_before_evaluation() {
        let mut rng = Pcg32::seed_from_u64(23);
        let pop = Population::random(5, 4, 8, 8, [1.0; 4], &mut rng);
        assert!(pop.best().is_none());
        assert!(pop.average_fitness().is_none());
    }

    #[test]
    fn dimension_mismatch_fails_the_whole_stage() {
        let mut rng = Pcg32::seed_from_u64(24);
        let mut pop = Population::random(5, 4, 16, 16, [1.0; 4], &mut rng);
        let wrong_target = solid_target(8, 8);
        assert!(pop.evaluate(&wrong_target, &small_pool()).is_err());
    }
}
