//! Evolves a population of translucent-triangle paintings toward a target
//! raster image with an elitist genetic algorithm: survival, asymmetric
//! parent selection (best + random), uniform crossover, Gaussian mutation
//! and a parallel fitness fan-out, with periodic checkpoints for resuming.
//!
//! The crate is the engine only; drivers (CLIs, demos) configure
//! [`settings::Settings`], build an [`evolution::Evolution`] and run it:
//!
//! ```no_run
//! use tripaint::{evolution::Evolution, settings::Settings};
//!
//! let settings = Settings {
//!     target_path: Some("img/starry_night.jpg".into()),
//!     ..Settings::default()
//! };
//! let generations = settings.generations;
//! let mut evo = Evolution::new(settings)?;
//! let mut population = evo.initial_population();
//! evo.evolve(&mut population, generations)?;
//! # Ok::<(), tripaint::Error>(())
//! ```

pub mod checkpoint;
pub mod dna;
pub mod error;
pub mod evolution;
pub mod fitness;
pub mod mutate;
pub mod population;
pub mod render;
pub mod settings;

pub use checkpoint::Checkpointer;
pub use dna::{Painting, Triangle};
pub use error::{Error, Result};
pub use evolution::Evolution;
pub use fitness::TargetImage;
pub use mutate::MutateParams;
pub use population::{Individual, Population};
pub use settings::Settings;
