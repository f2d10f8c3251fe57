use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use blockyard_benchmark::BenchmarkMetrics;
use blockyard_core::{BlockOffset, BlockState, Chunk, ChunkPos, placeable_block, split_coords};
use blockyard_gen::GeneratorPipeline;
use blockyard_hooks::{Action, HookDispatcher, MutationEvent, SessionId, SideEffect};
use blockyard_storage::{WorldMeta, open_world};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::Notify;
use tokio::task::JoinSet;

use crate::cache::{ChunkLease, FlushReport, GeometryCache};
use crate::{Registries, WorldConfig, WorldError};

/// A player action as it arrives from the session layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationRequest {
    pub session: SessionId,
    pub pos: ChunkPos,
    pub offset: BlockOffset,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionReport {
    pub applied: bool,
    /// The block now at the target.
    pub block: BlockState,
    pub side_effects: Vec<SideEffect>,
    pub vetoed_by: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub flushed: usize,
    pub flush_failed: usize,
    pub evicted: usize,
    pub permanent_loaded: usize,
}

/// Counts an operation that shutdown has to wait for.
struct InFlight<'a>(&'a World);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.0.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.settled.notify_waiters();
        }
    }
}

/// Owns the chunk lifecycle: resolves chunks through the cache, runs hook
/// chains, applies their outcome and keeps the permanent set warm.
pub struct World {
    meta: WorldMeta,
    config: WorldConfig,
    cache: Arc<GeometryCache>,
    hooks: HookDispatcher,
    permanent: Vec<ChunkPos>,
    /// Leases that keep the permanent set resident.
    pinned: Mutex<HashMap<ChunkPos, ChunkLease>>,
    sessions: Mutex<HashMap<SessionId, HashMap<ChunkPos, ChunkLease>>>,
    counters: Mutex<HashMap<&'static str, i64>>,
    save_enabled: AtomicBool,
    shutting_down: AtomicBool,
    in_flight: AtomicUsize,
    settled: Notify,
    metrics: Option<Arc<BenchmarkMetrics>>,
}

impl World {
    /// Open or create the world described by `config`.
    ///
    /// Every configured name is resolved before anything touches the disk, so
    /// a typo fails startup instead of surfacing on the first chunk.
    pub async fn open(
        config: WorldConfig,
        registries: &Registries,
        metrics: Option<Arc<BenchmarkMetrics>>,
    ) -> Result<Arc<Self>, WorldError> {
        config.validate()?;
        let factory = registries.serializers.lookup(&config.serializer)?;
        let stages = registries.stages.resolve(&config.generators)?;
        let hooks =
            HookDispatcher::from_names(&config.dig_hooks, &config.build_hooks, &registries.hooks)?;

        let proposed = WorldMeta {
            seed: config.seed.unwrap_or_else(rand::random),
            spawn: config.spawn.map(|(x, z)| ChunkPos::new(x, z)).unwrap_or(ChunkPos::new(0, 0)),
            format: factory.format(),
            generators: config.generators.clone(),
            dig_hooks: config.dig_hooks.clone(),
            build_hooks: config.build_hooks.clone(),
            cache_level: config.cache_level,
        };
        let meta = open_world(&config.path, proposed).await?;

        let pipeline = Arc::new(GeneratorPipeline::new(meta.seed, stages));
        let serializer = factory.open(&config.path);
        let cache = Arc::new(GeometryCache::new(pipeline, serializer, metrics.clone()));
        let permanent = meta.spawn.nearest(meta.cache_level);

        log::info!(
            "Opened {} world at {} (seed {}, spawn {}, {} permanent chunks)",
            meta.format,
            config.path.display(),
            meta.seed,
            meta.spawn,
            permanent.len()
        );

        let world = Arc::new(Self {
            meta,
            config,
            cache,
            hooks,
            permanent,
            pinned: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
            counters: Mutex::new(HashMap::new()),
            save_enabled: AtomicBool::new(true),
            shutting_down: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
            settled: Notify::new(),
            metrics,
        });
        let loaded = world.refill_permanent().await;
        log::info!("Permanent set ready: {}/{} chunks", loaded, world.permanent.len());
        Ok(world)
    }

    pub fn meta(&self) -> &WorldMeta {
        &self.meta
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn cache(&self) -> &GeometryCache {
        &self.cache
    }

    fn enter(&self) -> Result<InFlight<'_>, WorldError> {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let guard = InFlight(self);
        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(WorldError::ShuttingDown);
        }
        Ok(guard)
    }

    /// A complete snapshot of the chunk, generating it if needed.
    pub async fn request_chunk(&self, pos: ChunkPos) -> Result<Arc<Chunk>, WorldError> {
        let _guard = self.enter()?;
        let lease = self.cache.get_or_generate(pos).await?;
        Ok(lease.snapshot())
    }

    /// Keep `pos` resident on behalf of `session` and return its current state.
    pub async fn watch(&self, session: SessionId, pos: ChunkPos) -> Result<Arc<Chunk>, WorldError> {
        let _guard = self.enter()?;
        let lease = self.cache.get_or_generate(pos).await?;
        let snapshot = lease.snapshot();
        self.sessions.lock().entry(session).or_default().insert(pos, lease);
        Ok(snapshot)
    }

    pub fn unwatch(&self, session: SessionId, pos: ChunkPos) -> bool {
        let mut sessions = self.sessions.lock();
        let Some(watched) = sessions.get_mut(&session) else {
            return false;
        };
        let removed = watched.remove(&pos).is_some();
        if watched.is_empty() {
            sessions.remove(&session);
        }
        removed
    }

    /// Release everything `session` was watching. Returns how many chunks it held.
    pub fn disconnect(&self, session: SessionId) -> usize {
        let released = self.sessions.lock().remove(&session).map(|w| w.len()).unwrap_or(0);
        log::debug!("{} disconnected, released {} chunks", session, released);
        released
    }

    /// Run the hook chain for one action and apply its outcome.
    ///
    /// The coordinate stays gated from before the hooks read the chunk until
    /// the outcome is published, so no other mutation interleaves.
    pub async fn handle_mutation(
        &self,
        request: MutationRequest,
    ) -> Result<ActionReport, WorldError> {
        let _guard = self.enter()?;
        let lease = self.cache.get_or_generate(request.pos).await?;
        let writer = lease.write().await;
        let chunk = writer.current();

        let old = chunk.get_block(request.offset);
        let proposed = match request.action {
            Action::Dig => Some(BlockState::AIR),
            Action::Build { item, metadata, .. } => {
                placeable_block(item).map(|id| BlockState::with_metadata(id, metadata))
            }
        };
        let event = MutationEvent {
            session: request.session,
            pos: request.pos,
            offset: request.offset,
            old,
            proposed,
            action: request.action,
        };

        let outcome = self.hooks.dispatch(&event, &chunk);
        drop(chunk);
        // A build of something that is not a block, with no hook supplying one,
        // has nothing to write.
        let block = outcome.final_block(proposed).filter(|_| outcome.proceed);
        if let Some(m) = &self.metrics {
            m.record_mutation(block.is_some());
        }
        let Some(block) = block else {
            return Ok(ActionReport {
                applied: false,
                block: old,
                side_effects: Vec::new(),
                vetoed_by: outcome.vetoed_by,
            });
        };

        let offset = request.offset;
        writer.commit(|chunk| {
            chunk.set_block(offset, block);
            chunk.regenerate_column(offset.x as usize, offset.z as usize);
        });
        drop(writer);

        {
            let mut counters = self.counters.lock();
            for effect in &outcome.side_effects {
                if let SideEffect::Counter { name, delta } = effect {
                    *counters.entry(*name).or_insert(0) += *delta;
                }
            }
        }

        Ok(ActionReport {
            applied: true,
            block,
            side_effects: outcome.side_effects,
            vetoed_by: None,
        })
    }

    /// Session-facing entry point. The mutation runs on its own task, so a
    /// session that goes away mid-action never leaves it half done.
    pub async fn submit_action(
        self: &Arc<Self>,
        session: SessionId,
        pos: ChunkPos,
        offset: BlockOffset,
        action: Action,
    ) -> Result<bool, WorldError> {
        let world = self.clone();
        let request = MutationRequest { session, pos, offset, action };
        let report = tokio::spawn(async move { world.handle_mutation(request).await })
            .await
            .map_err(|e| WorldError::Task(e.to_string()))??;
        Ok(report.applied)
    }

    fn locate(x: i32, y: i32, z: i32) -> Result<(ChunkPos, BlockOffset), WorldError> {
        split_coords(x, y, z).ok_or(WorldError::OutOfBounds { x, y, z })
    }

    pub async fn get_block(&self, x: i32, y: i32, z: i32) -> Result<BlockState, WorldError> {
        let (pos, offset) = Self::locate(x, y, z)?;
        Ok(self.request_chunk(pos).await?.get_block(offset))
    }

    /// Administrative write: no hooks, but the same gate and dirty tracking.
    pub async fn set_block(
        &self,
        x: i32,
        y: i32,
        z: i32,
        block: BlockState,
    ) -> Result<(), WorldError> {
        let (pos, offset) = Self::locate(x, y, z)?;
        let _guard = self.enter()?;
        let lease = self.cache.get_or_generate(pos).await?;
        let writer = lease.write().await;
        writer.commit(|chunk| {
            chunk.set_block(offset, block);
            chunk.regenerate_column(offset.x as usize, offset.z as usize);
        });
        Ok(())
    }

    /// Stop writing chunks until `save_on`. Dirty chunks stay resident.
    pub fn save_off(&self) {
        self.save_enabled.store(false, Ordering::SeqCst);
        log::info!("Saving disabled");
    }

    pub fn save_on(&self) {
        self.save_enabled.store(true, Ordering::SeqCst);
        log::info!("Saving enabled");
    }

    pub fn is_saving(&self) -> bool {
        self.save_enabled.load(Ordering::SeqCst)
    }

    async fn refill_permanent(&self) -> usize {
        let missing: Vec<ChunkPos> = {
            let pinned = self.pinned.lock();
            self.permanent.iter().filter(|pos| !pinned.contains_key(pos)).copied().collect()
        };

        let mut tasks = JoinSet::new();
        for pos in missing {
            let cache = self.cache.clone();
            tasks.spawn(async move { (pos, cache.get_or_generate(pos).await) });
        }

        let mut loaded = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((pos, Ok(lease))) => {
                    self.pinned.lock().insert(pos, lease);
                    loaded += 1;
                }
                Ok((pos, Err(e))) => {
                    log::warn!("Permanent chunk {} unavailable, retrying next tick: {}", pos, e)
                }
                Err(e) => log::error!("Permanent chunk task failed: {}", e),
            }
        }
        loaded
    }

    /// Periodic maintenance: flush idle dirty chunks, drop clean chunks
    /// nobody holds and top the permanent set back up.
    pub async fn tick(&self) -> TickReport {
        let Ok(_guard) = self.enter() else {
            return TickReport::default();
        };

        let mut report = TickReport::default();
        if self.is_saving() {
            let idle = Duration::from_millis(self.config.flush_idle_ms);
            let flushed = self.cache.flush_idle(self.config.flush_batch, idle).await;
            report.flushed = flushed.saved;
            report.flush_failed = flushed.failed;
        }
        // Dirty chunks wait for their flush; eviction never saves on its own here.
        report.evicted = self.cache.evict_unreferenced(false).await.0;
        report.permanent_loaded = self.refill_permanent().await;

        if report != TickReport::default() {
            log::debug!("Tick: {:?}", report);
        }
        report
    }

    /// Wait for running operations, flush every dirty chunk and release
    /// everything. Later calls into the world fail with `ShuttingDown`.
    pub async fn shutdown(&self) -> FlushReport {
        self.shutting_down.store(true, Ordering::SeqCst);
        loop {
            let settled = self.settled.notified();
            if self.in_flight.load(Ordering::SeqCst) == 0 {
                break;
            }
            settled.await;
        }

        self.sessions.lock().clear();
        self.pinned.lock().clear();

        let report = self.cache.flush_all().await;
        let (evicted, failed) = self.cache.evict_unreferenced(true).await;
        if report.failed > 0 || failed > 0 {
            log::error!("Shutdown left {} chunks unsaved", report.failed.max(failed));
        }
        log::info!("World shut down: {} chunks saved, {} released", report.saved, evicted);
        report
    }

    pub fn summary(&self) -> serde_json::Value {
        let sessions = self.sessions.lock();
        serde_json::json!({
            "seed": self.meta.seed,
            "format": self.meta.format,
            "spawn": [self.meta.spawn.x, self.meta.spawn.z],
            "serializer": self.cache.serializer().name(),
            "generators": self.cache.pipeline().stage_names(),
            "dig_hooks": self.hooks.dig_names(),
            "build_hooks": self.hooks.build_names(),
            "permanent": self.permanent.len(),
            "pinned": self.pinned.lock().len(),
            "sessions": sessions.len(),
            "watched": sessions.values().map(|w| w.len()).sum::<usize>(),
            "cache": self.cache.stats(),
            "saving": self.is_saving(),
            "counters": *self.counters.lock(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::EntryState;
    use blockyard_core::{blocks, items};
    use blockyard_hooks::Face;

    fn config(dir: &std::path::Path) -> WorldConfig {
        WorldConfig {
            path: dir.to_path_buf(),
            seed: Some(7),
            generators: vec!["base".into(), "safety".into()],
            cache_level: 0,
            flush_idle_ms: 0,
            ..WorldConfig::default()
        }
    }

    fn offset(x: u8, y: u8, z: u8) -> BlockOffset {
        BlockOffset::new(x, y, z).unwrap()
    }

    #[tokio::test]
    async fn test_unknown_hook_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.dig_hooks.push("teleport".into());
        let err = World::open(cfg, &Registries::builtin(), None).await.err().unwrap();
        assert!(matches!(err, WorldError::UnknownComponent(ref e) if e.name == "teleport"));
        assert!(!dir.path().join("level.dat").exists());
    }

    #[tokio::test]
    async fn test_build_and_veto_reports() {
        let dir = tempfile::tempdir().unwrap();
        let world = World::open(config(dir.path()), &Registries::builtin(), None).await.unwrap();
        let pos = ChunkPos::new(0, 0);
        let session = SessionId(1);

        let place = |item, at| MutationRequest {
            session,
            pos,
            offset: at,
            action: Action::Build { item, metadata: 0, face: Face::PosY },
        };

        let request = place(blocks::GLASS as u16, offset(3, 61, 3));
        let report = world.handle_mutation(request).await.unwrap();
        assert!(report.applied);
        assert_eq!(report.block.id, blocks::GLASS);
        assert_eq!(world.cache().state(pos), Some(EntryState::Dirty));

        // Grass is solid, so building into it is refused.
        let request = place(blocks::GLASS as u16, offset(3, 60, 3));
        let report = world.handle_mutation(request).await.unwrap();
        assert!(!report.applied);
        assert_eq!(report.vetoed_by, Some("build"));
        assert_eq!(report.block.id, blocks::GRASS);

        // Not a block at all.
        let report = world.handle_mutation(place(items::SNOWBALL, offset(4, 61, 4))).await.unwrap();
        assert!(!report.applied);
    }

    #[tokio::test]
    async fn test_non_block_item_never_writes() {
        let dir = tempfile::tempdir().unwrap();
        for chain in [vec!["ladder".to_string(), "tile".to_string()], vec![]] {
            let mut cfg = config(dir.path());
            cfg.build_hooks = chain;
            let world = World::open(cfg, &Registries::builtin(), None).await.unwrap();
            let pos = ChunkPos::new(0, 0);
            let target = offset(3, 60, 3);

            let report = world
                .handle_mutation(MutationRequest {
                    session: SessionId(2),
                    pos,
                    offset: target,
                    action: Action::Build { item: items::SNOWBALL, metadata: 0, face: Face::PosY },
                })
                .await
                .unwrap();
            assert!(!report.applied);
            assert_eq!(report.vetoed_by, None);
            assert_eq!(report.block.id, blocks::GRASS);
            assert_eq!(world.request_chunk(pos).await.unwrap().get_block(target).id, blocks::GRASS);
            world.shutdown().await;
        }
    }

    #[tokio::test]
    async fn test_world_coordinates() {
        let dir = tempfile::tempdir().unwrap();
        let world = World::open(config(dir.path()), &Registries::builtin(), None).await.unwrap();

        world.set_block(-1, 70, -17, BlockState::new(blocks::PLANKS)).await.unwrap();
        assert_eq!(world.get_block(-1, 70, -17).await.unwrap().id, blocks::PLANKS);
        let chunk = world.request_chunk(ChunkPos::new(-1, -2)).await.unwrap();
        assert_eq!(chunk.block_id(15, 70, 15), blocks::PLANKS);
        assert_eq!(chunk.height_at(15, 15), 71);

        assert!(matches!(
            world.get_block(0, 128, 0).await,
            Err(WorldError::OutOfBounds { y: 128, .. })
        ));
    }

    #[tokio::test]
    async fn test_sessions_hold_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let world = World::open(config(dir.path()), &Registries::builtin(), None).await.unwrap();
        let pos = ChunkPos::new(4, 4);

        world.watch(SessionId(1), pos).await.unwrap();
        world.watch(SessionId(2), pos).await.unwrap();
        assert_eq!(world.cache().lease_count(pos), 2);

        // Saved, but still held.
        assert_eq!(world.tick().await.flushed, 1);
        assert!(world.cache().peek(pos).is_some());

        assert!(world.unwatch(SessionId(1), pos));
        assert!(!world.unwatch(SessionId(1), pos));
        assert_eq!(world.disconnect(SessionId(2)), 1);
        assert_eq!(world.cache().lease_count(pos), 0);

        let report = world.tick().await;
        assert_eq!(report.flushed, 0);
        assert_eq!(report.evicted, 1);
        assert!(world.cache().peek(pos).is_none());
    }

    #[tokio::test]
    async fn test_shutdown_refuses_new_work() {
        let dir = tempfile::tempdir().unwrap();
        let world = World::open(config(dir.path()), &Registries::builtin(), None).await.unwrap();
        world.request_chunk(ChunkPos::new(1, 1)).await.unwrap();

        let report = world.shutdown().await;
        assert_eq!(report, FlushReport { saved: 1, failed: 0 });
        assert!(world.cache().resident().is_empty());
        assert!(matches!(
            world.request_chunk(ChunkPos::new(1, 1)).await,
            Err(WorldError::ShuttingDown)
        ));
    }

    #[tokio::test]
    async fn test_summary() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.cache_level = 5;
        let world = World::open(cfg, &Registries::builtin(), None).await.unwrap();

        let summary = world.summary();
        assert_eq!(summary["seed"], 7);
        assert_eq!(summary["format"], "beta");
        assert_eq!(summary["permanent"], 5);
        assert_eq!(summary["cache"]["resident"], 5);
        assert_eq!(summary["build_hooks"], serde_json::json!(["ladder", "tile", "build"]));
        assert_eq!(summary["serializer"], "beta");
        assert_eq!(summary["generators"], serde_json::json!(["base", "safety"]));
    }
}
