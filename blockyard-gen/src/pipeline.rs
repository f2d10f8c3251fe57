use std::sync::Arc;

use blockyard_core::{Chunk, ChunkPos, UnknownComponent};

use crate::{GenerationError, GeneratorStage, StageRegistry};

/// The four orthogonal neighbours of a chunk, generated up to (but excluding)
/// the stage that asked for them.
pub struct Neighbors {
    pub north: Chunk,
    pub south: Chunk,
    pub east: Chunk,
    pub west: Chunk,
}

impl Neighbors {
    /// Neighbour at the given chunk offset, if it is one of the four collected.
    pub fn get(&self, dx: i32, dz: i32) -> Option<&Chunk> {
        match (dx, dz) {
            (0, -1) => Some(&self.north),
            (0, 1) => Some(&self.south),
            (1, 0) => Some(&self.east),
            (-1, 0) => Some(&self.west),
            _ => None,
        }
    }
}

pub struct StageContext<'a> {
    pub seed: u64,
    pub pos: ChunkPos,
    pub chunk: &'a mut Chunk,
    /// Present only for stages that declared `needs_neighbors` and run in a
    /// full generation pass; neighbour generation itself never gets them.
    pub neighbors: Option<&'a Neighbors>,
}

/// Strict ordered composition of generator stages.
///
/// The pipeline never touches any cache: neighbour context is produced by
/// re-running the earlier stages for the neighbouring coordinates, one ring
/// deep, so generation can never re-enter the chunk cache or recurse.
pub struct GeneratorPipeline {
    seed: u64,
    stages: Vec<Arc<dyn GeneratorStage>>,
}

impl GeneratorPipeline {
    pub fn new(seed: u64, stages: Vec<Arc<dyn GeneratorStage>>) -> Self {
        Self { seed, stages }
    }

    pub fn from_names<S: AsRef<str>>(
        seed: u64,
        names: &[S],
        registry: &StageRegistry,
    ) -> Result<Self, UnknownComponent> {
        Ok(Self::new(seed, registry.resolve(names)?))
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Generate a complete chunk: every stage once, in order, then lighting.
    pub fn generate(&self, pos: ChunkPos) -> Result<Chunk, GenerationError> {
        let mut chunk = self.run(pos, self.stages.len(), true)?;
        chunk.regenerate();
        chunk.populated = true;
        Ok(chunk)
    }

    /// Run the first `upto` stages without neighbour context.
    pub fn generate_isolated(&self, pos: ChunkPos, upto: usize) -> Result<Chunk, GenerationError> {
        self.run(pos, upto.min(self.stages.len()), false)
    }

    fn run(
        &self,
        pos: ChunkPos,
        upto: usize,
        with_neighbors: bool,
    ) -> Result<Chunk, GenerationError> {
        let mut chunk = Chunk::new(pos);
        for (i, stage) in self.stages[..upto].iter().enumerate() {
            let neighbors = if with_neighbors && stage.needs_neighbors() {
                Some(Neighbors {
                    north: self.generate_isolated(pos.offset(0, -1), i)?,
                    south: self.generate_isolated(pos.offset(0, 1), i)?,
                    east: self.generate_isolated(pos.offset(1, 0), i)?,
                    west: self.generate_isolated(pos.offset(-1, 0), i)?,
                })
            } else {
                None
            };

            let mut ctx = StageContext {
                seed: self.seed,
                pos,
                chunk: &mut chunk,
                neighbors: neighbors.as_ref(),
            };
            if let Err(e) = stage.populate(&mut ctx) {
                log::debug!("Stage {} aborted generation of {}: {}", stage.name(), pos, e);
                return Err(e);
            }
        }
        Ok(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::default_registry;
    use blockyard_core::blocks;
    use std::sync::Mutex;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<(&'static str, ChunkPos, bool)>>>,
        neighbors: bool,
    }

    impl GeneratorStage for Recorder {
        fn name(&self) -> &'static str {
            self.name
        }

        fn needs_neighbors(&self) -> bool {
            self.neighbors
        }

        fn populate(&self, ctx: &mut StageContext<'_>) -> Result<(), GenerationError> {
            self.log.lock().unwrap().push((self.name, ctx.pos, ctx.neighbors.is_some()));
            Ok(())
        }
    }

    #[test]
    fn test_deterministic_generation() {
        let registry = default_registry();
        let names =
            ["simplex", "erosion", "watertable", "beaches", "grass", "snow", "ores", "safety"];
        let a = GeneratorPipeline::from_names(42, &names, &registry).unwrap();
        let b = GeneratorPipeline::from_names(42, &names, &registry).unwrap();

        for pos in [ChunkPos::new(0, 0), ChunkPos::new(-7, 13)] {
            let first = a.generate(pos).unwrap();
            assert_eq!(first, a.generate(pos).unwrap());
            assert_eq!(first, b.generate(pos).unwrap());
        }

        let other = GeneratorPipeline::from_names(43, &names, &registry).unwrap();
        let origin = ChunkPos::new(0, 0);
        assert_ne!(a.generate(origin).unwrap(), other.generate(origin).unwrap());
    }

    #[test]
    fn test_stages_run_in_order_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stage = |name, neighbors| -> Arc<dyn GeneratorStage> {
            Arc::new(Recorder { name, log: log.clone(), neighbors })
        };
        let pipeline = GeneratorPipeline::new(
            1,
            vec![stage("first", false), stage("second", true), stage("third", false)],
        );
        let center = ChunkPos::new(5, 5);
        pipeline.generate(center).unwrap();

        let log = log.lock().unwrap();
        let on_center: Vec<_> = log.iter().filter(|(_, p, _)| *p == center).collect();
        assert_eq!(
            on_center.iter().map(|e| e.0).collect::<Vec<_>>(),
            vec!["first", "second", "third"]
        );
        assert!(on_center[1].2, "neighbour stage got no context");

        // Neighbours only ever ran the stages before the one that asked for them.
        let on_neighbors: Vec<_> = log.iter().filter(|(_, p, _)| *p != center).collect();
        assert_eq!(on_neighbors.len(), 4);
        assert!(on_neighbors.iter().all(|(name, _, ctx)| *name == "first" && !ctx));
    }

    #[test]
    fn test_failed_stage_aborts() {
        let registry = default_registry();
        let pipeline = GeneratorPipeline::from_names(9, &["erosion", "safety"], &registry).unwrap();
        let err = pipeline.generate(ChunkPos::new(0, 0)).unwrap_err();
        assert!(matches!(err, GenerationError::MissingLayer { stage: "erosion", .. }));
    }

    #[test]
    fn test_unknown_stage_name() {
        let registry = default_registry();
        let err =
            GeneratorPipeline::from_names(9, &["simplex", "volcanoes"], &registry).err().unwrap();
        assert_eq!(err.name, "volcanoes");
    }

    #[test]
    fn test_generated_chunk_is_lit() {
        let registry = default_registry();
        let pipeline = GeneratorPipeline::from_names(3, &["base", "safety"], &registry).unwrap();
        let chunk = pipeline.generate(ChunkPos::new(2, 2)).unwrap();
        assert!(chunk.populated);
        assert_eq!(chunk.block_id(0, 0, 0), blocks::BEDROCK);
        assert_eq!(chunk.height_at(4, 4), 61);
        assert_eq!(chunk.skylight_at(4, 61, 4), 15);
    }
}
