/// TensorBoard scalar sink
///
/// Writes `events.out.tfevents.*` files into the log directory, readable with
/// `tensorboard --logdir logs`.
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tensorboard_rs::summary_writer::SummaryWriter;

/// One logged scalar
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarRecord {
    pub tag: String,
    pub step: usize,
    pub value: f64,
}

struct Inner {
    writer: SummaryWriter,
    records: Vec<ScalarRecord>,
}

/// Scalar writer shared by the training and validation passes
pub struct ScalarWriter {
    log_dir: PathBuf,
    inner: Mutex<Inner>,
}

impl ScalarWriter {
    /// Open a new event file in `log_dir`, creating the directory if needed
    ///
    /// Every writer gets its own event file, so a resumed run adds a file
    /// next to the earlier ones and TensorBoard merges them by step.
    pub fn new<P: AsRef<Path>>(log_dir: P) -> crate::Result<Self> {
        let log_dir = log_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&log_dir)?;

        let writer = SummaryWriter::new(&log_dir);
        log::debug!("TensorBoard events in '{}'", log_dir.display());

        Ok(Self {
            log_dir,
            inner: Mutex::new(Inner {
                writer,
                records: Vec::new(),
            }),
        })
    }

    /// Record `value` under `tag` at `step`
    pub fn add_scalar(&self, tag: &str, value: f64, step: usize) -> crate::Result<()> {
        let mut inner = self.lock()?;
        inner.writer.add_scalar(tag, value as f32, step);
        inner.records.push(ScalarRecord {
            tag: tag.to_string(),
            step,
            value,
        });
        Ok(())
    }

    /// Push buffered events to disk
    pub fn flush(&self) -> crate::Result<()> {
        self.lock()?.writer.flush();
        Ok(())
    }

    /// Scalars written through this writer, in order
    pub fn records(&self) -> crate::Result<Vec<ScalarRecord>> {
        Ok(self.lock()?.records.clone())
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    fn lock(&self) -> crate::Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|e| crate::SrError::Training(format!("summary writer lock poisoned: {}", e)))
    }
}
