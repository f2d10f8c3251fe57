//! Geometry cache: the single owner of resident chunks.
//!
//! Each coordinate has one entry. The entry's `OnceCell` makes loading or
//! generating single-flight: concurrent callers attach to the same pending
//! result, and a failed attempt leaves the cell empty for the next caller.
//! Callers hold a `ChunkLease` while they need a chunk; entries with no
//! leases are eligible for eviction once their data is on disk.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use blockyard_benchmark::BenchmarkMetrics;
use blockyard_core::{Chunk, ChunkPos};
use blockyard_gen::GeneratorPipeline;
use blockyard_storage::ChunkSerializer;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::OnceCell;

use crate::WorldError;

/// The published chunk. Writers swap the `Arc`, readers clone it.
type ChunkSlot = RwLock<Arc<Chunk>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EntryState {
    Loading,
    Ready,
    Dirty,
}

struct CacheEntry {
    pos: ChunkPos,
    slot: OnceCell<Arc<ChunkSlot>>,
    refs: AtomicUsize,
    /// Bumped on every committed change, under the slot write lock.
    version: AtomicU64,
    /// Highest version known to be on disk.
    saved_version: AtomicU64,
    last_mutation: Mutex<Instant>,
    /// Serializes mutations of this coordinate.
    gate: tokio::sync::Mutex<()>,
    /// Serializes saves of this coordinate, and eviction against saves.
    io: tokio::sync::Mutex<()>,
}

impl CacheEntry {
    fn new(pos: ChunkPos) -> Self {
        Self {
            pos,
            slot: OnceCell::new(),
            refs: AtomicUsize::new(0),
            version: AtomicU64::new(0),
            saved_version: AtomicU64::new(0),
            last_mutation: Mutex::new(Instant::now()),
            gate: tokio::sync::Mutex::new(()),
            io: tokio::sync::Mutex::new(()),
        }
    }

    fn is_dirty(&self) -> bool {
        self.version.load(Ordering::SeqCst) != self.saved_version.load(Ordering::SeqCst)
    }

    fn state(&self) -> EntryState {
        if !self.slot.initialized() {
            EntryState::Loading
        } else if self.is_dirty() {
            EntryState::Dirty
        } else {
            EntryState::Ready
        }
    }

    fn touch(&self) {
        self.version.fetch_add(1, Ordering::SeqCst);
        *self.last_mutation.lock() = Instant::now();
    }
}

/// One counted reference to an entry.
struct EntryRef(Arc<CacheEntry>);

impl Drop for EntryRef {
    fn drop(&mut self) {
        self.0.refs.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Keeps a chunk resident while held.
pub struct ChunkLease {
    entry: EntryRef,
    slot: Arc<ChunkSlot>,
}

impl ChunkLease {
    /// The current complete chunk. Later mutations never show through it.
    pub fn snapshot(&self) -> Arc<Chunk> {
        self.slot.read().clone()
    }

    /// Wait for exclusive mutation rights on this coordinate.
    pub async fn write(&self) -> ChunkWriter<'_> {
        let gate = self.entry.0.gate.lock().await;
        ChunkWriter { lease: self, _gate: gate }
    }
}

impl Clone for ChunkLease {
    fn clone(&self) -> Self {
        self.entry.0.refs.fetch_add(1, Ordering::SeqCst);
        Self { entry: EntryRef(self.entry.0.clone()), slot: self.slot.clone() }
    }
}

/// The only way to change a resident chunk.
pub struct ChunkWriter<'a> {
    lease: &'a ChunkLease,
    _gate: tokio::sync::MutexGuard<'a, ()>,
}

impl ChunkWriter<'_> {
    pub fn current(&self) -> Arc<Chunk> {
        self.lease.snapshot()
    }

    /// Apply `f` and publish the result in one swap. Readers holding an
    /// older snapshot keep it; the chunk is copied only if one exists.
    pub fn commit<R>(&self, f: impl FnOnce(&mut Chunk) -> R) -> R {
        let entry = &self.lease.entry.0;
        let result = {
            let mut slot = self.lease.slot.write();
            let result = f(Arc::make_mut(&mut *slot));
            entry.version.fetch_add(1, Ordering::SeqCst);
            result
        };
        *entry.last_mutation.lock() = Instant::now();
        result
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictOutcome {
    NotResident,
    /// Still leased, or changed while the eviction was in progress.
    Pinned,
    /// Dirty and saving is not allowed right now.
    Dirty,
    Evicted { saved: bool },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlushReport {
    pub saved: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub resident: usize,
    pub loading: usize,
    pub dirty: usize,
    pub leased: usize,
}

pub struct GeometryCache {
    entries: Mutex<HashMap<ChunkPos, Arc<CacheEntry>>>,
    pipeline: Arc<GeneratorPipeline>,
    serializer: Arc<dyn ChunkSerializer>,
    metrics: Option<Arc<BenchmarkMetrics>>,
}

impl GeometryCache {
    pub fn new(
        pipeline: Arc<GeneratorPipeline>,
        serializer: Arc<dyn ChunkSerializer>,
        metrics: Option<Arc<BenchmarkMetrics>>,
    ) -> Self {
        Self { entries: Mutex::new(HashMap::new()), pipeline, serializer, metrics }
    }

    pub fn pipeline(&self) -> &GeneratorPipeline {
        &self.pipeline
    }

    pub fn serializer(&self) -> &dyn ChunkSerializer {
        self.serializer.as_ref()
    }

    fn metrics(&self) -> Option<&BenchmarkMetrics> {
        self.metrics.as_deref()
    }

    fn entry(&self, pos: ChunkPos) -> Option<Arc<CacheEntry>> {
        self.entries.lock().get(&pos).cloned()
    }

    /// Lease the chunk at `pos`, loading it from storage or generating it
    /// on a miss. Storage errors are reported, never treated as absence.
    pub async fn get_or_generate(&self, pos: ChunkPos) -> Result<ChunkLease, WorldError> {
        let entry = {
            let mut entries = self.entries.lock();
            let entry =
                entries.entry(pos).or_insert_with(|| Arc::new(CacheEntry::new(pos))).clone();
            entry.refs.fetch_add(1, Ordering::SeqCst);
            EntryRef(entry)
        };

        if let Some(m) = self.metrics() {
            if entry.0.slot.initialized() {
                m.record_cache_hit();
            } else {
                m.record_cache_miss();
            }
        }

        let slot = entry.0.slot.get_or_try_init(|| self.populate(&entry.0)).await?.clone();
        Ok(ChunkLease { entry, slot })
    }

    async fn populate(&self, entry: &CacheEntry) -> Result<Arc<ChunkSlot>, WorldError> {
        let pos = entry.pos;
        let started = Instant::now();
        match self.serializer.load_chunk(pos).await {
            Ok(Some(chunk)) => {
                if let Some(m) = self.metrics() {
                    m.record_load(started.elapsed());
                }
                log::debug!("Loaded chunk {} from disk", pos);
                return Ok(Arc::new(RwLock::new(Arc::new(chunk))));
            }
            Ok(None) => {}
            Err(e) => {
                if let Some(m) = self.metrics() {
                    m.record_load_failure();
                }
                log::error!("Failed to load chunk {}: {}", pos, e);
                return Err(e.into());
            }
        }

        let pipeline = self.pipeline.clone();
        let started = Instant::now();
        let generated = tokio::task::spawn_blocking(move || pipeline.generate(pos))
            .await
            .map_err(|e| WorldError::Task(e.to_string()))?;

        match generated {
            Ok(chunk) => {
                if let Some(m) = self.metrics() {
                    m.record_generation(started.elapsed());
                }
                log::debug!("Generated chunk {} in {:?}", pos, started.elapsed());
                // Never saved yet.
                entry.touch();
                Ok(Arc::new(RwLock::new(Arc::new(chunk))))
            }
            Err(e) => {
                if let Some(m) = self.metrics() {
                    m.record_generation_failure();
                }
                log::warn!("Generation of chunk {} failed: {}", pos, e);
                Err(e.into())
            }
        }
    }

    /// Snapshot of a resident chunk without leasing it.
    pub fn peek(&self, pos: ChunkPos) -> Option<Arc<Chunk>> {
        let entry = self.entry(pos)?;
        let slot = entry.slot.get()?;
        Some(slot.read().clone())
    }

    pub fn state(&self, pos: ChunkPos) -> Option<EntryState> {
        self.entry(pos).map(|e| e.state())
    }

    pub fn lease_count(&self, pos: ChunkPos) -> usize {
        self.entry(pos).map(|e| e.refs.load(Ordering::SeqCst)).unwrap_or(0)
    }

    /// Flag a resident chunk as needing a save. Returns false if it is not resident.
    pub fn mark_dirty(&self, pos: ChunkPos) -> bool {
        match self.entry(pos) {
            Some(entry) if entry.slot.initialized() => {
                entry.touch();
                true
            }
            _ => false,
        }
    }

    async fn save_entry(&self, entry: &CacheEntry) -> Result<bool, WorldError> {
        let _io = entry.io.lock().await;
        let Some(slot) = entry.slot.get() else {
            return Ok(false);
        };
        // Version and snapshot read together so a save never claims a newer version.
        let (chunk, version) = {
            let current = slot.read();
            (Arc::clone(&current), entry.version.load(Ordering::SeqCst))
        };
        if version == entry.saved_version.load(Ordering::SeqCst) {
            return Ok(false);
        }

        let started = Instant::now();
        match self.serializer.save_chunk(&chunk).await {
            Ok(()) => {
                entry.saved_version.fetch_max(version, Ordering::SeqCst);
                if let Some(m) = self.metrics() {
                    m.record_save(started.elapsed());
                }
                Ok(true)
            }
            Err(e) => {
                if let Some(m) = self.metrics() {
                    m.record_save_failure();
                }
                log::error!("Failed to save chunk {}: {}", entry.pos, e);
                Err(e.into())
            }
        }
    }

    async fn save_all(&self, entries: Vec<Arc<CacheEntry>>) -> FlushReport {
        let mut report = FlushReport::default();
        for entry in entries {
            match self.save_entry(&entry).await {
                Ok(true) => report.saved += 1,
                Ok(false) => {}
                Err(_) => report.failed += 1,
            }
        }
        report
    }

    /// Save up to `batch` dirty chunks that have not changed for `idle`,
    /// oldest first. Failed saves stay dirty and are retried next time.
    pub async fn flush_idle(&self, batch: usize, idle: Duration) -> FlushReport {
        let now = Instant::now();
        let mut candidates: Vec<(Instant, Arc<CacheEntry>)> = self
            .entries
            .lock()
            .values()
            .filter(|e| e.is_dirty())
            .map(|e| (*e.last_mutation.lock(), e.clone()))
            .filter(|(changed, _)| now.duration_since(*changed) >= idle)
            .collect();
        candidates.sort_by_key(|(changed, _)| *changed);
        self.save_all(candidates.into_iter().take(batch).map(|(_, e)| e).collect()).await
    }

    /// Save every dirty chunk.
    pub async fn flush_all(&self) -> FlushReport {
        let dirty: Vec<_> =
            self.entries.lock().values().filter(|e| e.is_dirty()).cloned().collect();
        self.save_all(dirty).await
    }

    /// Drop an unleased entry, saving it first when dirty and `allow_save`.
    /// Waits for any save already running on the entry.
    pub async fn evict(&self, pos: ChunkPos, allow_save: bool) -> Result<EvictOutcome, WorldError> {
        let entry = self.entry(pos);
        let Some(entry) = entry else {
            return Ok(EvictOutcome::NotResident);
        };
        if entry.refs.load(Ordering::SeqCst) > 0 {
            return Ok(EvictOutcome::Pinned);
        }

        let mut saved = false;
        if entry.is_dirty() {
            if !allow_save {
                return Ok(EvictOutcome::Dirty);
            }
            saved = self.save_entry(&entry).await?;
        }

        let _io = entry.io.lock().await;
        let mut entries = self.entries.lock();
        let unchanged = entries.get(&pos).is_some_and(|current| Arc::ptr_eq(current, &entry));
        if !unchanged || entry.refs.load(Ordering::SeqCst) > 0 || entry.is_dirty() {
            return Ok(EvictOutcome::Pinned);
        }
        entries.remove(&pos);
        drop(entries);

        if let Some(m) = self.metrics() {
            m.record_eviction();
        }
        log::debug!("Evicted chunk {} (saved: {})", pos, saved);
        Ok(EvictOutcome::Evicted { saved })
    }

    /// Evict every entry nobody holds a lease on. Returns (evicted, failed).
    pub async fn evict_unreferenced(&self, allow_save: bool) -> (usize, usize) {
        let idle: Vec<ChunkPos> = self
            .entries
            .lock()
            .values()
            .filter(|e| e.refs.load(Ordering::SeqCst) == 0)
            .map(|e| e.pos)
            .collect();

        let (mut evicted, mut failed) = (0, 0);
        for pos in idle {
            match self.evict(pos, allow_save).await {
                Ok(EvictOutcome::Evicted { .. }) => evicted += 1,
                Ok(_) => {}
                Err(_) => failed += 1,
            }
        }
        (evicted, failed)
    }

    pub fn resident(&self) -> Vec<ChunkPos> {
        let mut out: Vec<_> = self.entries.lock().keys().copied().collect();
        out.sort();
        out
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock();
        let mut stats = CacheStats { resident: entries.len(), ..Default::default() };
        for entry in entries.values() {
            match entry.state() {
                EntryState::Loading => stats.loading += 1,
                EntryState::Dirty => stats.dirty += 1,
                EntryState::Ready => {}
            }
            if entry.refs.load(Ordering::SeqCst) > 0 {
                stats.leased += 1;
            }
        }
        stats
    }
}
