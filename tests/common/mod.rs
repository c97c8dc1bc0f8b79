#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use cropdoc::{CropClassifier, CropDocError, ImageModel, ModelSource, Taxonomy};
use env_logger::{Builder, Env};
use image::{ImageBuffer, ImageFormat, Rgb};
use ndarray::Array4;

pub fn init() {
    let _ = Builder::from_env(Env::default().default_filter_or("warn"))
        .is_test(true)
        .try_init();
}

/// Model that answers every input with the same probability vector.
pub struct StubModel {
    probabilities: Vec<f32>,
    calls: Arc<AtomicUsize>,
}

impl ImageModel for StubModel {
    fn classify(&self, _input: &Array4<f32>) -> Result<Vec<f32>, CropDocError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.probabilities.clone())
    }
}

pub struct StubSource {
    probabilities: Vec<f32>,
    fail_loads: bool,
    pub loads: Arc<AtomicUsize>,
    pub calls: Arc<AtomicUsize>,
}

impl StubSource {
    pub fn new(probabilities: Vec<f32>) -> Self {
        Self {
            probabilities,
            fail_loads: false,
            loads: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A source whose artifact never loads
    pub fn broken() -> Self {
        Self {
            fail_loads: true,
            ..Self::new(Vec::new())
        }
    }
}

impl ModelSource for StubSource {
    fn load(&self, _num_classes: usize) -> Result<Box<dyn ImageModel>, CropDocError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_loads {
            return Err(CropDocError::ModelLoad("stub artifact missing".into()));
        }
        Ok(Box::new(StubModel {
            probabilities: self.probabilities.clone(),
            calls: Arc::clone(&self.calls),
        }))
    }

    fn describe(&self) -> String {
        "stub model".to_string()
    }
}

/// Model whose inference blocks until the test releases it.
struct GatedModel {
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

pub struct GatedSource {
    model: Mutex<Option<GatedModel>>,
}

impl GatedSource {
    /// Returns the source, a receiver signalled when inference starts and a
    /// sender that lets it finish.
    pub fn new(probabilities: Vec<f32>) -> (Self, Receiver<()>, Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let model = GatedModel {
            probabilities,
            entered: entered_tx,
            release: release_rx,
        };
        let source = Self {
            model: Mutex::new(Some(model)),
        };
        (source, entered_rx, release_tx)
    }
}

impl ModelSource for GatedSource {
    fn load(&self, _num_classes: usize) -> Result<Box<dyn ImageModel>, CropDocError> {
        let model = self
            .model
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| CropDocError::ModelLoad("gated model already taken".into()))?;
        Ok(Box::new(model))
    }

    fn describe(&self) -> String {
        "gated model".to_string()
    }
}

/// Builtin-sized probabilities peaking at `Apple___Black_rot`, with a stronger
/// peak outside the Apple labels.
pub fn black_rot_probabilities() -> Vec<f32> {
    let mut probs = vec![0.0; Taxonomy::builtin().len()];
    probs[0] = 0.2; // Apple___Apple_scab
    probs[1] = 0.5; // Apple___Black_rot
    probs[3] = 0.05; // Apple___healthy
    probs[49] = 0.25; // Tomato___Tomato_Yellow_Leaf_Curl_Virus
    probs
}

/// Classifier over the builtin taxonomy plus the counters of its stub source.
pub fn stub_classifier(source: StubSource) -> (CropClassifier, Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let loads = Arc::clone(&source.loads);
    let calls = Arc::clone(&source.calls);
    let classifier = CropClassifier::builder()
        .with_source(source)
        .unwrap()
        .build()
        .unwrap();
    (classifier, loads, calls)
}

pub fn leaf_png(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, 170, (y % 256) as u8])
    });
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
    bytes
}

pub const BOUNDARY: &str = "cropdoc-test-boundary";

/// Builds a multipart/form-data body.
#[derive(Default)]
pub struct MultipartBody {
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                concat!(
                    "--{}\r\n",
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                    "Content-Type: image/png\r\n\r\n",
                ),
                BOUNDARY, name, file_name
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        self.body
    }

    pub fn content_type() -> String {
        format!("multipart/form-data; boundary={}", BOUNDARY)
    }
}
