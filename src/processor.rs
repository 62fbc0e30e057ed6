use crate::config::ProcessorConfig;
use crate::error::{ProcessorError, Result};
use crate::point::Point;
use crate::statistics::{PointStatistics, compute_statistics};
use log::{debug, info, warn};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::convert::Infallible;
use std::fmt::Display;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use tokio::sync::watch;

/// Holds one point set and applies bulk operations to it in bounded chunks.
///
/// Chunked operations run on the calling task and yield to the runtime
/// between large chunks so the host stays responsive. Only one operation may
/// be in flight at a time; a second one started meanwhile (from another task
/// sharing the processor, or from inside a chunk callback) is rejected with
/// [`ProcessorError::Busy`].
///
/// Results are committed in one step: a failed operation leaves the set as it
/// was before the operation started.
pub struct ChunkedPointProcessor {
    config: ProcessorConfig,
    points: RwLock<Arc<Vec<Point>>>,
    busy: AtomicBool,
    last_error: RwLock<Option<ProcessorError>>,
    progress: Arc<ProgressTracker>,
}

struct ProgressTracker {
    sender: watch::Sender<f64>,
    epoch: AtomicU64,
}

/// Clears the busy flag when the operation that set it ends, however it ends.
struct OperationGuard<'a> {
    busy: &'a AtomicBool,
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, AtomicOrdering::Release);
    }
}

impl ChunkedPointProcessor {
    pub fn new(initial: Vec<Point>, config: ProcessorConfig) -> Self {
        let (sender, _) = watch::channel(0.0);
        ChunkedPointProcessor {
            config,
            points: RwLock::new(Arc::new(initial)),
            busy: AtomicBool::new(false),
            last_error: RwLock::new(None),
            progress: Arc::new(ProgressTracker {
                sender,
                epoch: AtomicU64::new(0),
            }),
        }
    }

    /// Like [`new`](Self::new) but refuses a bad config or an oversized initial set.
    pub fn try_new(initial: Vec<Point>, config: ProcessorConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| ProcessorError::InvalidArgument(e.to_string()))?;
        if initial.len() > config.max_points {
            return Err(ProcessorError::LimitExceeded {
                max: config.max_points,
                requested: initial.len(),
            });
        }
        Ok(Self::new(initial, config))
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Snapshot of the current point set.
    pub fn points(&self) -> Arc<Vec<Point>> {
        self.points.read().clone()
    }

    pub fn len(&self) -> usize {
        self.points.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.read().is_empty()
    }

    pub fn is_processing(&self) -> bool {
        self.busy.load(AtomicOrdering::Acquire)
    }

    /// Current progress of the running (or last finished) operation, 0 to 100.
    pub fn progress(&self) -> f64 {
        *self.progress.sender.borrow()
    }

    pub fn subscribe_progress(&self) -> watch::Receiver<f64> {
        self.progress.sender.subscribe()
    }

    pub fn last_error(&self) -> Option<ProcessorError> {
        self.last_error.read().clone()
    }

    pub fn clear_error(&self) {
        *self.last_error.write() = None;
    }

    /// Returns whether a set of `candidate` points would fit under `max_points`.
    ///
    /// On failure the limit error is recorded; the point set is never touched.
    pub fn check_limit(&self, candidate: usize) -> bool {
        self.ensure_limit(candidate).is_ok()
    }

    pub async fn filter_points<F>(&self, mut predicate: F) -> Result<()>
    where
        F: FnMut(&Point) -> bool,
    {
        let _guard = self.begin("point filtering")?;
        let snapshot = self.points();
        let result = self
            .run_chunks(&snapshot, "point filtering", |chunk, _| {
                Ok::<_, Infallible>(chunk.iter().filter(|&p| predicate(p)).copied().collect())
            })
            .await?;
        self.commit(result, "point filtering");
        Ok(())
    }

    /// Sorts the set with `compare`.
    ///
    /// Sets above `sort_threshold` are sorted chunk by chunk and the sorted
    /// runs are then merged, so the result is globally ordered either way.
    /// Both paths are stable.
    pub async fn sort_points<F>(&self, mut compare: F) -> Result<()>
    where
        F: FnMut(&Point, &Point) -> Ordering,
    {
        let _guard = self.begin("point sorting")?;
        let snapshot = self.points();
        self.ensure_limit(snapshot.len())?;

        if snapshot.len() <= self.config.sort_threshold {
            let mut sorted = snapshot.to_vec();
            sorted.sort_by(&mut compare);
            self.commit(sorted, "point sorting");
            return Ok(());
        }

        let runs = self
            .run_chunks(&snapshot, "point sorting", |chunk, _| {
                let mut run = chunk.to_vec();
                run.sort_by(&mut compare);
                Ok::<_, Infallible>(run)
            })
            .await?;
        let sorted = self
            .merge_sorted_runs(runs, self.chunk_size(), &mut compare)
            .await;
        self.commit(sorted, "point sorting");
        Ok(())
    }

    pub fn add_points(&self, new_points: Vec<Point>) -> Result<()> {
        let _guard = self.begin("point addition")?;
        let current = self.points();
        self.ensure_limit(current.len() + new_points.len())?;

        let mut combined = Vec::with_capacity(current.len() + new_points.len());
        combined.extend_from_slice(&current);
        combined.extend(new_points);
        self.commit(combined, "point addition");
        Ok(())
    }

    /// Swaps in a whole new point set.
    pub fn replace_points(&self, new_points: Vec<Point>) -> Result<()> {
        let _guard = self.begin("point replacement")?;
        self.ensure_limit(new_points.len())?;
        self.commit(new_points, "point replacement");
        Ok(())
    }

    /// Drops exact `(x, y)` repeats inside each chunk, keeping the first one.
    ///
    /// A repeat that lands in a different chunk from its first occurrence is
    /// kept. Use [`remove_duplicates_global`](Self::remove_duplicates_global)
    /// when every repeat has to go.
    pub async fn remove_duplicates(&self) -> Result<()> {
        let _guard = self.begin("duplicate removal")?;
        let snapshot = self.points();
        let result = self
            .run_chunks(&snapshot, "duplicate removal", |chunk, _| {
                let mut seen = HashSet::with_capacity(chunk.len());
                Ok::<_, Infallible>(
                    chunk
                        .iter()
                        .filter(|p| seen.insert(p.key()))
                        .copied()
                        .collect(),
                )
            })
            .await?;
        self.commit(result, "duplicate removal");
        Ok(())
    }

    pub async fn remove_duplicates_global(&self) -> Result<()> {
        let _guard = self.begin("global duplicate removal")?;
        let snapshot = self.points();
        let mut seen = HashSet::with_capacity(snapshot.len());
        let result = self
            .run_chunks(&snapshot, "global duplicate removal", |chunk, _| {
                Ok::<_, Infallible>(
                    chunk
                        .iter()
                        .filter(|p| seen.insert(p.key()))
                        .copied()
                        .collect(),
                )
            })
            .await?;
        self.commit(result, "global duplicate removal");
        Ok(())
    }

    /// Fills NaN `y` values by linear interpolation between the point's
    /// neighbours in the set as it was before the operation started.
    ///
    /// Points at either end, or in a set shorter than two, are left alone.
    pub async fn interpolate_missing(&self) -> Result<()> {
        let _guard = self.begin("missing value interpolation")?;
        let snapshot = self.points();
        if snapshot.len() < 2 {
            return Ok(());
        }

        let chunk_size = self.chunk_size();
        let original = snapshot.as_slice();
        let result = self
            .run_chunks(original, "missing value interpolation", |chunk, chunk_index| {
                let filled = chunk
                    .iter()
                    .enumerate()
                    .map(|(offset, point)| {
                        if !point.has_missing_y() {
                            return *point;
                        }
                        let global = chunk_index * chunk_size + offset;
                        let prev = global.checked_sub(1).and_then(|i| original.get(i));
                        match (prev, original.get(global + 1)) {
                            (Some(prev), Some(next)) => {
                                let slope = (next.y - prev.y) / (next.x - prev.x);
                                Point::new(point.x, prev.y + slope * (point.x - prev.x))
                            }
                            _ => *point,
                        }
                    })
                    .collect();
                Ok::<_, Infallible>(filled)
            })
            .await?;
        self.commit(result, "missing value interpolation");
        Ok(())
    }

    /// Reduces the set to exactly `target_count` points.
    ///
    /// The set is cut into `target_count` contiguous segments by index ratio
    /// and each segment is replaced by its mean point. Needs
    /// `2 <= target_count < len`.
    pub fn compress_data(&self, target_count: usize) -> Result<()> {
        let _guard = self.begin("data compression")?;
        let snapshot = self.points();

        if target_count < 2 {
            return Err(self.record(ProcessorError::InvalidArgument(format!(
                "target count must be at least 2, got {}",
                target_count
            ))));
        }
        if target_count >= snapshot.len() {
            return Err(self.record(ProcessorError::InvalidArgument(format!(
                "target count {} must be smaller than the current size {}",
                target_count,
                snapshot.len()
            ))));
        }

        let compressed = compress_segments(&snapshot, target_count);
        self.commit(compressed, "data compression");
        Ok(())
    }

    pub fn statistics(&self) -> Option<PointStatistics> {
        compute_statistics(&self.points())
    }

    /// Display-only view of at most `max_to_show` points.
    pub fn points_for_rendering(&self, max_to_show: usize) -> Vec<Point> {
        decimate(&self.points(), max_to_show)
    }

    /// Runs a caller-supplied, fallible transform over every chunk in order.
    ///
    /// `op` receives each chunk and its index. The concatenated outputs replace
    /// the set once all chunks succeed; the first error aborts the operation
    /// and is reported as `"<description> failed: <cause>"`.
    pub async fn map_chunks<F, E>(&self, description: &str, op: F) -> Result<()>
    where
        F: FnMut(&[Point], usize) -> std::result::Result<Vec<Point>, E>,
        E: Display,
    {
        let _guard = self.begin(description)?;
        let snapshot = self.points();
        let result = self.run_chunks(&snapshot, description, op).await?;
        self.ensure_limit(result.len())?;
        self.commit(result, description);
        Ok(())
    }

    fn chunk_size(&self) -> usize {
        self.config.chunk_size.max(1)
    }

    fn begin(&self, description: &str) -> Result<OperationGuard<'_>> {
        if self
            .busy
            .compare_exchange(false, true, AtomicOrdering::AcqRel, AtomicOrdering::Acquire)
            .is_err()
        {
            warn!("Rejected {}: another operation is in progress", description);
            return Err(ProcessorError::Busy);
        }
        self.progress.epoch.fetch_add(1, AtomicOrdering::AcqRel);
        self.progress.sender.send_replace(0.0);
        self.clear_error();
        debug!("Starting {} on {} points", description, self.len());
        Ok(OperationGuard { busy: &self.busy })
    }

    fn ensure_limit(&self, candidate: usize) -> Result<()> {
        if candidate > self.config.max_points {
            return Err(self.record(ProcessorError::LimitExceeded {
                max: self.config.max_points,
                requested: candidate,
            }));
        }
        Ok(())
    }

    fn record(&self, error: ProcessorError) -> ProcessorError {
        warn!("{}", error);
        *self.last_error.write() = Some(error.clone());
        error
    }

    async fn run_chunks<F, E>(
        &self,
        points: &[Point],
        description: &str,
        mut op: F,
    ) -> Result<Vec<Point>>
    where
        F: FnMut(&[Point], usize) -> std::result::Result<Vec<Point>, E>,
        E: Display,
    {
        let chunk_size = self.chunk_size();
        let total = points.len().div_ceil(chunk_size);
        let mut result = Vec::with_capacity(points.len());

        for (index, chunk) in points.chunks(chunk_size).enumerate() {
            self.progress
                .sender
                .send_replace(index as f64 / total as f64 * 100.0);

            if chunk.len() > self.config.yield_threshold {
                tokio::task::yield_now().await;
            }

            let processed = op(chunk, index).map_err(|e| {
                self.record(ProcessorError::OperationFailed {
                    description: description.to_string(),
                    cause: e.to_string(),
                })
            })?;
            result.extend(processed);
        }

        debug!("{}: processed {} chunks", description, total);
        Ok(result)
    }

    /// Bottom-up merge of consecutive sorted runs of length `run_len`.
    async fn merge_sorted_runs<F>(
        &self,
        runs: Vec<Point>,
        run_len: usize,
        compare: &mut F,
    ) -> Vec<Point>
    where
        F: FnMut(&Point, &Point) -> Ordering,
    {
        let len = runs.len();
        let mut current = runs;
        let mut merged = Vec::with_capacity(len);
        let mut width = run_len;

        while width < len {
            merged.clear();
            let mut start = 0;
            while start < len {
                let mid = (start + width).min(len);
                let end = (start + 2 * width).min(len);
                merge_into(&current[start..mid], &current[mid..end], &mut merged, compare);
                if end - start > self.config.yield_threshold {
                    tokio::task::yield_now().await;
                }
                start = end;
            }
            std::mem::swap(&mut current, &mut merged);
            width *= 2;
        }

        current
    }

    fn commit(&self, points: Vec<Point>, description: &str) {
        let count = points.len();
        *self.points.write() = Arc::new(points);
        info!("{} finished, {} points", description, count);
        self.finish_progress();
    }

    fn finish_progress(&self) {
        self.progress.sender.send_replace(100.0);

        let delay = self.config.progress_reset_delay();
        let epoch = self.progress.epoch.load(AtomicOrdering::Acquire);
        let tracker = Arc::clone(&self.progress);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) if !delay.is_zero() => {
                handle.spawn(async move {
                    tokio::time::sleep(delay).await;
                    tracker.reset_if_current(epoch);
                });
            }
            _ => tracker.reset_if_current(epoch),
        }
    }
}

impl ProgressTracker {
    // Only the operation that finished last gets to clear the progress.
    fn reset_if_current(&self, epoch: u64) {
        if self.epoch.load(AtomicOrdering::Acquire) == epoch {
            self.sender.send_if_modified(|value| {
                if *value >= 100.0 {
                    *value = 0.0;
                    true
                } else {
                    false
                }
            });
        }
    }
}

fn merge_into<F>(left: &[Point], right: &[Point], out: &mut Vec<Point>, compare: &mut F)
where
    F: FnMut(&Point, &Point) -> Ordering,
{
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        if compare(&left[i], &right[j]) == Ordering::Greater {
            out.push(right[j]);
            j += 1;
        } else {
            out.push(left[i]);
            i += 1;
        }
    }
    out.extend_from_slice(&left[i..]);
    out.extend_from_slice(&right[j..]);
}

/// Averages `points` into `target_count` contiguous segments split by index ratio.
///
/// Segment `i` covers `[i * len / target, (i + 1) * len / target)`, so the
/// segments partition the whole set. Needs `0 < target_count <= len`.
pub fn compress_segments(points: &[Point], target_count: usize) -> Vec<Point> {
    let len = points.len();
    let mut compressed = Vec::with_capacity(target_count);

    for i in 0..target_count {
        let start = i * len / target_count;
        let end = (i + 1) * len / target_count;
        let segment = &points[start..end];
        let n = segment.len() as f64;
        let avg_x = segment.iter().map(|p| p.x).sum::<f64>() / n;
        let avg_y = segment.iter().map(|p| p.y).sum::<f64>() / n;
        compressed.push(Point::new(avg_x, avg_y));
    }

    compressed
}

/// Every `ceil(len / max_to_show)`-th point, starting at index 0.
///
/// Sets that already fit are returned unchanged; a cap of 0 yields nothing.
pub fn decimate(points: &[Point], max_to_show: usize) -> Vec<Point> {
    if points.len() <= max_to_show {
        return points.to_vec();
    }
    if max_to_show == 0 {
        return Vec::new();
    }
    let step = points.len().div_ceil(max_to_show);
    points.iter().step_by(step).copied().collect()
}
