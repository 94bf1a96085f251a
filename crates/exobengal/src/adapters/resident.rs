use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::ExoResult;

enum ModelState<M> {
    Unloaded,
    Loaded(Arc<M>),
}

/// The in-memory model of one adapter.
///
/// Starts `Unloaded` and becomes `Loaded` on the first successful load or
/// train. Once loaded it is never evicted; retraining swaps the model.
pub struct ResidentModel<M> {
    state: Mutex<ModelState<M>>,
}

impl<M> Default for ResidentModel<M> {
    fn default() -> Self {
        ResidentModel {
            state: Mutex::new(ModelState::Unloaded),
        }
    }
}

impl<M> ResidentModel<M> {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ModelState<M>> {
        // the state is replaced whole, so a panic elsewhere cannot leave it torn
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the resident model, running `load` first if there is none.
    ///
    /// The lock is held across `load`, so concurrent callers wait for a
    /// single load instead of racing. A failed load leaves the state
    /// `Unloaded`.
    pub fn get_or_load<F>(&self, load: F) -> ExoResult<Arc<M>>
    where
        F: FnOnce() -> ExoResult<M>,
    {
        let mut state = self.lock();
        if let ModelState::Loaded(model) = &*state {
            return Ok(Arc::clone(model));
        }
        let model = Arc::new(load()?);
        *state = ModelState::Loaded(Arc::clone(&model));
        Ok(model)
    }

    pub fn replace(&self, model: M) -> Arc<M> {
        let model = Arc::new(model);
        *self.lock() = ModelState::Loaded(Arc::clone(&model));
        model
    }

    pub fn is_loaded(&self) -> bool {
        matches!(*self.lock(), ModelState::Loaded(_))
    }
}
