//! In-memory model sources for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use ndarray::Array4;

use super::error::CropDocError;
use super::model::{ImageModel, ModelSource};

pub(crate) struct FixedModel {
    probabilities: Vec<f32>,
    calls: Arc<AtomicUsize>,
}

impl ImageModel for FixedModel {
    fn classify(&self, _input: &Array4<f32>) -> Result<Vec<f32>, CropDocError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.probabilities.clone())
    }
}

/// Always loads a model that returns the same probabilities.
pub(crate) struct FixedModelSource {
    probabilities: Vec<f32>,
    loads: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

impl FixedModelSource {
    pub(crate) fn new(probabilities: Vec<f32>) -> Self {
        Self {
            probabilities,
            loads: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn load_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.loads)
    }

    pub(crate) fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl ModelSource for FixedModelSource {
    fn load(&self, _num_classes: usize) -> Result<Box<dyn ImageModel>, CropDocError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FixedModel {
            probabilities: self.probabilities.clone(),
            calls: Arc::clone(&self.calls),
        }))
    }

    fn describe(&self) -> String {
        "fixed in-memory model".to_string()
    }
}

/// Fails the first `failures` loads, then behaves like [`FixedModelSource`].
pub(crate) struct FlakySource {
    remaining_failures: AtomicUsize,
    inner: FixedModelSource,
}

impl FlakySource {
    pub(crate) fn new(failures: usize, probabilities: Vec<f32>) -> Self {
        Self {
            remaining_failures: AtomicUsize::new(failures),
            inner: FixedModelSource::new(probabilities),
        }
    }
}

impl ModelSource for FlakySource {
    fn load(&self, num_classes: usize) -> Result<Box<dyn ImageModel>, CropDocError> {
        let failing = self
            .remaining_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(CropDocError::ModelLoad("artifact unavailable".into()));
        }
        self.inner.load(num_classes)
    }

    fn describe(&self) -> String {
        "flaky in-memory model".to_string()
    }
}

/// Model whose inference blocks until the test releases it.
pub(crate) struct GatedModel {
    probabilities: Vec<f32>,
    entered: Sender<()>,
    release: Receiver<()>,
}

impl ImageModel for GatedModel {
    fn classify(&self, _input: &Array4<f32>) -> Result<Vec<f32>, CropDocError> {
        let _ = self.entered.send(());
        self.release
            .recv()
            .map_err(|_| CropDocError::Internal("gate dropped".into()))?;
        Ok(self.probabilities.clone())
    }
}

/// Hands out a single [`GatedModel`]; the test keeps the other channel ends.
pub(crate) struct GatedSource {
    model: Mutex<Option<GatedModel>>,
}

impl GatedSource {
    /// Returns the source, a receiver signalled when inference starts and a
    /// sender that lets it finish.
    pub(crate) fn new(probabilities: Vec<f32>) -> (Self, Receiver<()>, Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let model = GatedModel {
            probabilities,
            entered: entered_tx,
            release: release_rx,
        };
        (
            Self {
                model: Mutex::new(Some(model)),
            },
            entered_rx,
            release_tx,
        )
    }
}

impl ModelSource for GatedSource {
    fn load(&self, _num_classes: usize) -> Result<Box<dyn ImageModel>, CropDocError> {
        let model = self
            .model
            .lock()
            .map_err(|_| CropDocError::ModelLoad("gate poisoned".into()))?
            .take()
            .ok_or_else(|| CropDocError::ModelLoad("gated model already taken".into()))?;
        Ok(Box::new(model))
    }

    fn describe(&self) -> String {
        "gated in-memory model".to_string()
    }
}
