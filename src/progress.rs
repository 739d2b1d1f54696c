//! Progress reporting.
//!
//! An extraction run reports a [`ProgressInfo`] snapshot to the configured
//! [`ProgressCallback`] every
//! [`batch_size`](crate::ExtractOptions::with_batch_size) decoded video frames,
//! and once more when the run finishes. Callbacks run synchronously on the
//! extracting thread and cannot stop the run.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use framesift::{ExtractOptions, FrameExtractor, FramesiftError, ProgressCallback, ProgressInfo};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("{pct:.1}% ({} images)", info.frames_emitted);
//!         }
//!     }
//! }
//!
//! let options = ExtractOptions::new().with_progress(Arc::new(PrintProgress));
//! FrameExtractor::new(options).run("input.mp4")?;
//! # Ok::<(), FramesiftError>(())
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A snapshot of a running extraction.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Video frames decoded so far.
    pub frames_decoded: u64,
    /// Frames emitted so far, including ones whose file could not be
    /// written.
    pub frames_emitted: u64,
    /// Estimated total video frames, if the container reports a duration and
    /// frame rate.
    pub total_frames: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total_frames` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time since the run started.
    pub elapsed: Duration,
    /// Most recently written image. Failed writes never show up here.
    pub last_output: Option<PathBuf>,
    /// `true` for the final report of a run.
    pub finished: bool,
}

/// Receives progress updates during extraction.
///
/// Must be [`Send`] and [`Sync`] so options can be shared freely; the
/// extractor itself calls it from one thread only.
pub trait ProgressCallback: Send + Sync {
    /// Called at regular intervals during an extraction run.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all notifications. The default.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Counts frames and fires the callback at the configured cadence.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    total_frames: Option<u64>,
    batch_size: u64,
    start_time: Instant,
    frames_decoded: u64,
    frames_emitted: u64,
    last_output: Option<PathBuf>,
    since_last_report: u64,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        total_frames: Option<u64>,
        batch_size: u64,
    ) -> Self {
        Self {
            callback,
            total_frames: total_frames.filter(|&total| total > 0),
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
            frames_decoded: 0,
            frames_emitted: 0,
            last_output: None,
            since_last_report: 0,
        }
    }

    /// Record one emitted frame, with its path if the file was written.
    pub(crate) fn emitted(&mut self, written: Option<PathBuf>) {
        self.frames_emitted += 1;
        if written.is_some() {
            self.last_output = written;
        }
    }

    /// Record one decoded video frame.
    pub(crate) fn decoded(&mut self) {
        self.frames_decoded += 1;
        self.since_last_report += 1;
        if self.since_last_report >= self.batch_size {
            self.report(false);
            self.since_last_report = 0;
        }
    }

    pub(crate) fn finish(&mut self) {
        self.report(true);
    }

    fn report(&self, finished: bool) {
        let percentage = self.total_frames.map(|total| {
            ((self.frames_decoded as f32 / total as f32) * 100.0).min(100.0)
        });

        self.callback.on_progress(&ProgressInfo {
            frames_decoded: self.frames_decoded,
            frames_emitted: self.frames_emitted,
            total_frames: self.total_frames,
            percentage: if finished { Some(100.0) } else { percentage },
            elapsed: self.start_time.elapsed(),
            last_output: self.last_output.clone(),
            finished,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    use super::{ProgressCallback, ProgressInfo, ProgressTracker};

    #[derive(Default)]
    struct Recorder(Mutex<Vec<ProgressInfo>>);

    impl ProgressCallback for Recorder {
        fn on_progress(&self, info: &ProgressInfo) {
            self.0.lock().unwrap().push(info.clone());
        }
    }

    #[test]
    fn reports_every_batch_and_on_finish() {
        let recorder = Arc::new(Recorder::default());
        let mut tracker = ProgressTracker::new(recorder.clone(), Some(10), 4);

        for index in 0..10 {
            tracker.decoded();
            if index % 5 == 0 {
                tracker.emitted(Some(PathBuf::from(format!("{index:06}.bmp"))));
            }
        }
        tracker.finish();

        let reports = recorder.0.lock().unwrap();
        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].frames_decoded, 4);
        assert_eq!(reports[0].percentage, Some(40.0));
        assert_eq!(reports[1].frames_decoded, 8);
        assert!(reports[2].finished);
        assert_eq!(reports[2].frames_emitted, 2);
        assert_eq!(reports[2].last_output, Some(PathBuf::from("000005.bmp")));
    }

    #[test]
    fn unwritten_frames_do_not_replace_last_output() {
        let recorder = Arc::new(Recorder::default());
        let mut tracker = ProgressTracker::new(recorder.clone(), None, 1);

        tracker.emitted(None);
        tracker.decoded();
        tracker.emitted(Some(PathBuf::from("000001.bmp")));
        tracker.emitted(None);
        tracker.finish();

        let reports = recorder.0.lock().unwrap();
        assert_eq!(reports[0].frames_emitted, 1);
        assert_eq!(reports[0].last_output, None);
        let last = reports.last().unwrap();
        assert_eq!(last.frames_emitted, 3);
        assert_eq!(last.last_output, Some(PathBuf::from("000001.bmp")));
    }

    #[test]
    fn unknown_total_has_no_percentage() {
        let recorder = Arc::new(Recorder::default());
        let mut tracker = ProgressTracker::new(recorder.clone(), Some(0), 1);
        tracker.decoded();

        let reports = recorder.0.lock().unwrap();
        assert_eq!(reports[0].total_frames, None);
        assert_eq!(reports[0].percentage, None);
    }
}
