use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct BenchmarkMetrics {
    // Generation Stats
    pub total_chunks_generated: AtomicUsize,
    pub total_generation_time_us: AtomicU64,
    pub max_generation_time_us: AtomicU64,
    pub total_generation_failures: AtomicUsize,

    // Storage Stats
    pub total_chunks_loaded: AtomicUsize,
    pub total_load_time_us: AtomicU64,
    pub total_load_failures: AtomicUsize,
    pub total_chunks_saved: AtomicUsize,
    pub total_save_time_us: AtomicU64,
    pub total_save_failures: AtomicUsize,

    // Cache
    pub total_cache_hits: AtomicUsize,
    pub total_cache_misses: AtomicUsize,
    pub total_evictions: AtomicUsize,

    // Hooks
    pub total_mutations_applied: AtomicUsize,
    pub total_mutations_vetoed: AtomicUsize,

    // Session
    pub start_time: Option<Instant>,
}

impl BenchmarkMetrics {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn record_generation(&self, duration: Duration) {
        self.total_chunks_generated.fetch_add(1, Ordering::Relaxed);
        let us = duration.as_micros() as u64;
        self.total_generation_time_us.fetch_add(us, Ordering::Relaxed);
        self.max_generation_time_us.fetch_max(us, Ordering::Relaxed);
    }

    pub fn record_generation_failure(&self) {
        self.total_generation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_load(&self, duration: Duration) {
        self.total_chunks_loaded.fetch_add(1, Ordering::Relaxed);
        self.total_load_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_load_failure(&self) {
        self.total_load_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_save(&self, duration: Duration) {
        self.total_chunks_saved.fetch_add(1, Ordering::Relaxed);
        self.total_save_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn record_save_failure(&self) {
        self.total_save_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.total_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.total_cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.total_evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_mutation(&self, applied: bool) {
        if applied {
            self.total_mutations_applied.fetch_add(1, Ordering::Relaxed);
        } else {
            self.total_mutations_vetoed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn generate_report(&self) -> String {
        let uptime = self.start_time.unwrap_or_else(Instant::now).elapsed();
        let generated = self.total_chunks_generated.load(Ordering::Relaxed);
        // ms
        let gen_time_total = self.total_generation_time_us.load(Ordering::Relaxed) as f64 / 1000.0;
        let gen_max = self.max_generation_time_us.load(Ordering::Relaxed) as f64 / 1000.0; // ms
        let gen_avg = if generated > 0 { gen_time_total / generated as f64 } else { 0.0 };
        let gen_failed = self.total_generation_failures.load(Ordering::Relaxed);

        // Cache stats
        let hits = self.total_cache_hits.load(Ordering::Relaxed);
        let misses = self.total_cache_misses.load(Ordering::Relaxed);
        let total_requests = hits + misses;
        let hit_rate = if total_requests > 0 {
            (hits as f64 / total_requests as f64) * 100.0
        } else {
            0.0
        };
        let evictions = self.total_evictions.load(Ordering::Relaxed);

        let loaded = self.total_chunks_loaded.load(Ordering::Relaxed);
        let load_time = self.total_load_time_us.load(Ordering::Relaxed) as f64 / 1000.0;
        let load_avg = if loaded > 0 { load_time / loaded as f64 } else { 0.0 };
        let load_failed = self.total_load_failures.load(Ordering::Relaxed);

        let saved = self.total_chunks_saved.load(Ordering::Relaxed);
        let save_time = self.total_save_time_us.load(Ordering::Relaxed) as f64 / 1000.0;
        let save_avg = if saved > 0 { save_time / saved as f64 } else { 0.0 };
        let save_failed = self.total_save_failures.load(Ordering::Relaxed);

        let applied = self.total_mutations_applied.load(Ordering::Relaxed);
        let vetoed = self.total_mutations_vetoed.load(Ordering::Relaxed);

        format!(
            "Blockyard Benchmark Report\n\
             ==========================\n\
             Session Duration: {:.2?}\n\n\
             [Generation]\n\
             Chunks Generated: {}\n\
             Failures: {}\n\
             Total Time: {:.2} ms\n\
             Avg Time: {:.2} ms/chunk\n\
             Max Time: {:.2} ms\n\n\
             [Storage Read]\n\
             Chunks Loaded: {}\n\
             Failures: {}\n\
             Avg Time: {:.2} ms/chunk\n\n\
             [Storage Write]\n\
             Chunks Saved: {}\n\
             Failures: {}\n\
             Avg Time: {:.2} ms/chunk\n\n\
             [Cache]\n\
             Hits: {}\n\
             Misses: {}\n\
             Hit Rate: {:.1}%\n\
             Evictions: {}\n\n\
             [Mutations]\n\
             Applied: {}\n\
             Vetoed: {}\n",
            uptime,
            generated, gen_failed, gen_time_total, gen_avg, gen_max,
            loaded, load_failed, load_avg,
            saved, save_failed, save_avg,
            hits, misses, hit_rate, evictions,
            applied, vetoed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_counts() {
        let metrics = BenchmarkMetrics::new();
        metrics.record_generation(Duration::from_millis(4));
        metrics.record_generation(Duration::from_millis(2));
        metrics.record_cache_hit();
        metrics.record_cache_miss();
        metrics.record_mutation(true);
        metrics.record_mutation(false);

        assert_eq!(metrics.max_generation_time_us.load(Ordering::Relaxed), 4000);
        let report = metrics.generate_report();
        assert!(report.contains("Chunks Generated: 2"));
        assert!(report.contains("Hit Rate: 50.0%"));
        assert!(report.contains("Vetoed: 1"));
    }
}
