/// Step-decay learning rate scheduler

/// Multi-step scheduler configuration
#[derive(Debug, Clone)]
pub struct MultiStepSchedulerConfig {
    /// Initial learning rate
    pub lr_init: f64,
    /// Epoch counts at which the rate is multiplied by `gamma`
    pub milestones: Vec<usize>,
    /// Decay factor applied at every milestone
    pub gamma: f64,
}

impl Default for MultiStepSchedulerConfig {
    fn default() -> Self {
        Self {
            lr_init: 1e-4,
            milestones: vec![35, 70, 105, 140, 175],
            gamma: 0.5,
        }
    }
}

/// Multi-step learning rate scheduler
///
/// `lr = lr_init * gamma^k` where `k` counts the milestones `<= last_epoch`
/// and `last_epoch` is the number of completed epochs. Stepped once per
/// epoch, after the training pass; training epoch `e` therefore runs with
/// `last_epoch = e - 1`.
pub struct MultiStepScheduler {
    config: MultiStepSchedulerConfig,
    last_epoch: usize,
}

impl MultiStepScheduler {
    /// Create new scheduler positioned before the first epoch
    pub fn new(config: MultiStepSchedulerConfig) -> Self {
        Self {
            config,
            last_epoch: 0,
        }
    }

    /// Get learning rate for the current position
    pub fn get_lr(&self) -> f64 {
        self.get_lr_at(self.last_epoch)
    }

    /// Get learning rate after `last_epoch` completed epochs
    pub fn get_lr_at(&self, last_epoch: usize) -> f64 {
        let crossed = self
            .config
            .milestones
            .iter()
            .filter(|&&m| m <= last_epoch)
            .count();
        self.config.lr_init * self.config.gamma.powi(crossed as i32)
    }

    /// Learning rate used while training epoch `epoch` (1-based)
    pub fn lr_for_epoch(&self, epoch: usize) -> f64 {
        self.get_lr_at(epoch.saturating_sub(1))
    }

    /// Step the scheduler (one completed epoch)
    pub fn step(&mut self) {
        self.last_epoch += 1;
    }

    /// Number of completed epochs
    pub fn last_epoch(&self) -> usize {
        self.last_epoch
    }

    /// Jump to a position, e.g. after restoring a checkpoint
    pub fn set_last_epoch(&mut self, last_epoch: usize) {
        self.last_epoch = last_epoch;
    }
}
