use image::RgbaImage;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crate::dna::Painting;
use crate::error::{Error, Result};
use crate::population::Population;
use crate::render::unpremultiply;

/// Writes per-generation artifacts: the best painting as a lossless PNG
/// every generation, and a full population snapshot (JSON) every
/// `interval` generations. A snapshot reconstructs a `Population` that
/// resumes the pipeline from the next generation.
#[derive(Clone, Debug)]
pub struct Checkpointer {
    dir: PathBuf,
    image_template: String,
    interval: u64,
}

impl Checkpointer {
    /// creates the output directory up front so an unwritable path fails
    /// the run before any work is done. the template must carry a `{gen}`
    /// placeholder, otherwise every generation would overwrite one file.
    pub fn new<P: AsRef<Path>>(dir: P, image_template: &str, interval: u64) -> Result<Self> {
        if !image_template.contains("{gen}") {
            return Err(Error::Config(format!(
                "image template {image_template:?} is missing a {{gen}} placeholder"
            )));
        }
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            image_template: image_template.to_owned(),
            interval,
        })
    }

    /// whether the reporting stage should snapshot at this generation
    pub fn snapshot_due(&self, generation: u64) -> bool {
        self.interval > 0 && generation % self.interval == 0
    }

    pub fn image_path(&self, generation: u64) -> PathBuf {
        let name = self
            .image_template
            .replace("{gen}", &format!("{generation:05}"));
        self.dir.join(name)
    }

    pub fn snapshot_path(&self, generation: u64) -> PathBuf {
        self.dir.join(format!("checkpoint_{generation:05}.json"))
    }

    /// render the painting and persist it keyed by generation number
    pub fn write_best_image(&self, generation: u64, painting: &Painting) -> Result<PathBuf> {
        profiling::scope!("write_best_image");
        let straight = unpremultiply(&painting.render());
        let img = RgbaImage::from_raw(painting.width, painting.height, straight)
            .ok_or_else(|| Error::Config("rendered buffer does not match canvas size".into()))?;
        let path = self.image_path(generation);
        img.save(&path)?;
        Ok(path)
    }

    /// serialize the whole population (individuals + generation counter)
    pub fn write_snapshot(&self, population: &Population) -> Result<PathBuf> {
        profiling::scope!("write_snapshot");
        let path = self.snapshot_path(population.generation);
        let file = File::create(&path)?;
        serde_json::to_writer(BufWriter::new(file), population)?;
        Ok(path)
    }

    /// rebuild a population from a snapshot written by `write_snapshot`
    pub fn restore<P: AsRef<Path>>(path: P) -> Result<Population> {
        let file = File::open(path.as_ref())?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn sample_population() -> Population {
        let mut rng = Pcg32::seed_from_u64(31);
        let mut pop = Population::random(6, 10, 16, 16, [1.0; 4], &mut rng);
        pop.generation = 42;
        for (i, ind) in pop.individuals.iter_mut().enumerate() {
            ind.fitness = Some(1000.0 + i as f64);
        }
        pop
    }

    #[test]
    fn snapshot_round_trip_preserves_everything() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = Checkpointer::new(dir.path(), "drawing_{gen}.png", 50).unwrap();

        let pop = sample_population();
        let path = ckpt.write_snapshot(&pop).unwrap();
        let restored = Checkpointer::restore(&path).unwrap();

        assert_eq!(restored.generation, pop.generation);
        assert_eq!(restored.len(), pop.len());
        for (a, b) in restored.individuals.iter().zip(&pop.individuals) {
            assert_eq!(a.fitness, b.fitness);
            assert_eq!(a.chromosome, b.chromosome);
            // rendered output must match exactly, not just field equality
            assert_eq!(a.chromosome.render(), b.chromosome.render());
        }
    }

    #[test]
    fn best_image_lands_in_the_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = Checkpointer::new(dir.path(), "drawing_{gen}.png", 50).unwrap();

        let pop = sample_population();
        let path = ckpt
            .write_best_image(7, &pop.individuals[0].chromosome)
            .unwrap();
        assert!(path.ends_with("drawing_00007.png"));
        assert!(path.exists());

        // written artifact must decode back to the rendered pixels
        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (16, 16));
    }

    #[test]
    fn template_without_placeholder_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = Checkpointer::new(dir.path(), "drawing.png", 50);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn snapshot_cadence_follows_the_interval() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = Checkpointer::new(dir.path(), "drawing_{gen}.png", 50).unwrap();
        assert!(!ckpt.snapshot_due(49));
        assert!(ckpt.snapshot_due(50));
        assert!(!ckpt.snapshot_due(51));
        assert!(ckpt.snapshot_due(100));

        let disabled = Checkpointer::new(dir.path(), "drawing_{gen}.png", 0).unwrap();
        assert!(!disabled.snapshot_due(50));
    }
}
