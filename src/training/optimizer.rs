/// Adam optimizer with exportable state
///
/// candle-nn's optimizers keep their moment estimates private, which makes
/// them impossible to checkpoint. This one keys its state by parameter name.
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use candle_core::backprop::GradStore;
use candle_core::{Result, Tensor, Var};

/// Adam optimizer configuration
#[derive(Debug, Clone)]
pub struct AdamConfig {
    /// Learning rate
    pub lr: f64,
    /// Coefficient for computing running averages of gradient (beta1)
    pub beta1: f64,
    /// Coefficient for computing running averages of squared gradient (beta2)
    pub beta2: f64,
    /// Term added to denominator for numerical stability
    pub eps: f64,
    /// L2 penalty added to the gradient
    pub weight_decay: f64,
}

impl Default for AdamConfig {
    fn default() -> Self {
        Self {
            lr: 1e-3,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            weight_decay: 0.0,
        }
    }
}

/// Snapshot of the optimizer, as stored in checkpoints
#[derive(Debug, Clone)]
pub struct OptimizerState {
    /// Number of updates applied so far
    pub step: usize,
    /// Learning rate at snapshot time
    pub lr: f64,
    /// `(exp_avg, exp_avg_sq)` per parameter name
    pub moments: HashMap<String, (Tensor, Tensor)>,
}

/// Per-parameter moment estimates
#[derive(Debug, Clone)]
struct ParamState {
    /// First moment estimate (exponential moving average of gradients)
    exp_avg: Tensor,
    /// Second moment estimate (exponential moving average of squared gradients)
    exp_avg_sq: Tensor,
}

/// Adam optimizer
///
/// Implements "Adam: A Method for Stochastic Optimization"
/// (Kingma & Ba, 2015) with bias correction.
pub struct Adam {
    config: AdamConfig,
    params: Vec<(String, Var)>,
    states: HashMap<String, ParamState>,
    step: usize,
}

impl Adam {
    /// Create new Adam optimizer
    ///
    /// # Arguments
    /// * `params` - Named parameters to optimize
    /// * `config` - Optimizer configuration
    pub fn new(params: Vec<(String, Var)>, config: AdamConfig) -> Result<Self> {
        let params = params
            .into_iter()
            .filter(|(_, var)| var.dtype().is_float())
            .collect();

        Ok(Self {
            config,
            params,
            states: HashMap::new(),
            step: 0,
        })
    }

    /// Perform a single optimization step
    ///
    /// Parameters without a gradient in `grads` are left untouched.
    pub fn step(&mut self, grads: &GradStore) -> Result<()> {
        self.step += 1;
        let t = self.step as i32;
        let AdamConfig {
            lr,
            beta1,
            beta2,
            eps,
            weight_decay,
        } = self.config;

        for (name, var) in &self.params {
            let Some(grad) = grads.get(var.as_tensor()) else {
                continue;
            };
            let mut grad = grad.detach();
            if weight_decay > 0.0 {
                grad = (grad + (var.as_tensor().detach() * weight_decay)?)?;
            }

            let state = match self.states.entry(name.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => entry.insert(ParamState {
                    exp_avg: grad.zeros_like()?,
                    exp_avg_sq: grad.zeros_like()?,
                }),
            };

            // m = beta1 * m + (1 - beta1) * grad
            state.exp_avg = ((&state.exp_avg * beta1)? + (&grad * (1.0 - beta1))?)?;
            // v = beta2 * v + (1 - beta2) * grad^2
            state.exp_avg_sq = ((&state.exp_avg_sq * beta2)? + (grad.sqr()? * (1.0 - beta2))?)?;

            let m_hat = (&state.exp_avg / (1.0 - beta1.powi(t)))?;
            let v_hat = (&state.exp_avg_sq / (1.0 - beta2.powi(t)))?;

            // param = param - lr * m_hat / (sqrt(v_hat) + eps)
            let update = ((m_hat / (v_hat.sqrt()? + eps)?)? * lr)?;
            var.set(&(var.as_tensor().detach() - update)?)?;
        }

        Ok(())
    }

    /// Backpropagate `loss` and apply one update
    ///
    /// Every call builds a fresh `GradStore`, so gradients never accumulate
    /// across batches.
    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        let grads = loss.backward()?;
        self.step(&grads)
    }

    /// Get current learning rate
    pub fn learning_rate(&self) -> f64 {
        self.config.lr
    }

    /// Set learning rate
    pub fn set_learning_rate(&mut self, lr: f64) {
        self.config.lr = lr;
    }

    /// Number of updates applied so far
    pub fn step_count(&self) -> usize {
        self.step
    }

    /// Copy of the optimizer state for checkpointing
    pub fn state(&self) -> Result<OptimizerState> {
        let mut moments = HashMap::with_capacity(self.states.len());
        for (name, state) in &self.states {
            moments.insert(
                name.clone(),
                (state.exp_avg.copy()?, state.exp_avg_sq.copy()?),
            );
        }

        Ok(OptimizerState {
            step: self.step,
            lr: self.config.lr,
            moments,
        })
    }

    /// Restore a snapshot produced by [`Adam::state`]
    ///
    /// Moments must belong to known parameters and match their shapes.
    pub fn load_state(&mut self, state: OptimizerState) -> crate::Result<()> {
        let mut states = HashMap::with_capacity(state.moments.len());
        for (name, (exp_avg, exp_avg_sq)) in state.moments {
            let var = self
                .params
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, v)| v)
                .ok_or_else(|| {
                    crate::SrError::Checkpoint(format!("optimizer state for unknown parameter '{}'", name))
                })?;

            if exp_avg.dims() != var.dims() || exp_avg_sq.dims() != var.dims() {
                return Err(crate::SrError::Checkpoint(format!(
                    "optimizer state shape mismatch for '{}': {:?} vs {:?}",
                    name,
                    exp_avg.dims(),
                    var.dims()
                )));
            }

            let device = var.device();
            let dtype = var.dtype();
            states.insert(
                name,
                ParamState {
                    exp_avg: exp_avg.to_device(device)?.to_dtype(dtype)?,
                    exp_avg_sq: exp_avg_sq.to_device(device)?.to_dtype(dtype)?,
                },
            );
        }

        self.states = states;
        self.step = state.step;
        self.config.lr = state.lr;
        Ok(())
    }
}
