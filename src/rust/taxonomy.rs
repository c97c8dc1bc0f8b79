use std::collections::BTreeMap;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::classifier::CropDocError;

/// Output layer of the bundled crop disease model, in output-vector order.
///
/// Each row is `(label, crop, disease)`. The label strings are the class names the
/// network was trained with and are kept verbatim, including the inconsistent
/// delimiters of the source dataset. Crop membership comes from the explicit crop
/// column, so `Tomato_Bacterial_spot` and `Tomato___Bacterial_spot` both belong to
/// `Tomato` even though they are distinct outputs.
const BUILTIN_LABELS: &[(&str, &str, &str)] = &[
    ("Apple___Apple_scab", "Apple", "Apple_scab"),
    ("Apple___Black_rot", "Apple", "Black_rot"),
    ("Apple___Cedar_apple_rust", "Apple", "Cedar_apple_rust"),
    ("Apple___healthy", "Apple", "healthy"),
    ("Blueberry___healthy", "Blueberry", "healthy"),
    ("Cherry_(including_sour)___healthy", "Cherry_(including_sour)", "healthy"),
    ("Cherry_(including_sour)___Powdery_mildew", "Cherry_(including_sour)", "Powdery_mildew"),
    (
        "Corn_(maize)___Cercospora_leaf_spot Gray_leaf_spot",
        "Corn_(maize)",
        "Cercospora_leaf_spot Gray_leaf_spot",
    ),
    ("Corn_(maize)___Common_rust_", "Corn_(maize)", "Common_rust"),
    ("Corn_(maize)___healthy", "Corn_(maize)", "healthy"),
    ("Corn_(maize)___Northern_Leaf_Blight", "Corn_(maize)", "Northern_Leaf_Blight"),
    ("Grape___Black_rot", "Grape", "Black_rot"),
    ("Grape___Esca_(Black_Measles)", "Grape", "Esca_(Black_Measles)"),
    ("Grape___healthy", "Grape", "healthy"),
    ("Grape___Leaf_blight_(Isariopsis_Leaf_Spot)", "Grape", "Leaf_blight_(Isariopsis_Leaf_Spot)"),
    ("Orange___Haunglongbing_(Citrus_greening)", "Orange", "Haunglongbing_(Citrus_greening)"),
    ("Peach___Bacterial_spot", "Peach", "Bacterial_spot"),
    ("Peach___healthy", "Peach", "healthy"),
    ("Pepper,_bell___Bacterial_spot", "Pepper,_bell", "Bacterial_spot"),
    ("Pepper,_bell___healthy", "Pepper,_bell", "healthy"),
    ("Pepper__bell___Bacterial_spot", "Pepper,_bell", "Bacterial_spot"),
    ("Pepper__bell___healthy", "Pepper,_bell", "healthy"),
    ("Potato___Early_blight", "Potato", "Early_blight"),
    ("Potato___healthy", "Potato", "healthy"),
    ("Potato___Late_blight", "Potato", "Late_blight"),
    ("Raspberry___healthy", "Raspberry", "healthy"),
    ("Soybean___healthy", "Soybean", "healthy"),
    ("Squash___Powdery_mildew", "Squash", "Powdery_mildew"),
    ("Strawberry___healthy", "Strawberry", "healthy"),
    ("Strawberry___Leaf_scorch", "Strawberry", "Leaf_scorch"),
    ("Tomato_Bacterial_spot", "Tomato", "Bacterial_spot"),
    ("Tomato_Early_blight", "Tomato", "Early_blight"),
    ("Tomato_healthy", "Tomato", "healthy"),
    ("Tomato_Late_blight", "Tomato", "Late_blight"),
    ("Tomato_Leaf_Mold", "Tomato", "Leaf_Mold"),
    ("Tomato_Septoria_leaf_spot", "Tomato", "Septoria_leaf_spot"),
    (
        "Tomato_Spider_mites_Two_spotted_spider_mite",
        "Tomato",
        "Spider_mites Two-spotted_spider_mite",
    ),
    ("Tomato__Target_Spot", "Tomato", "Target_Spot"),
    ("Tomato__Tomato_mosaic_virus", "Tomato", "Tomato_mosaic_virus"),
    ("Tomato__Tomato_YellowLeaf__Curl_Virus", "Tomato", "Tomato_Yellow_Leaf_Curl_Virus"),
    ("Tomato___Bacterial_spot", "Tomato", "Bacterial_spot"),
    ("Tomato___Early_blight", "Tomato", "Early_blight"),
    ("Tomato___healthy", "Tomato", "healthy"),
    ("Tomato___Late_blight", "Tomato", "Late_blight"),
    ("Tomato___Leaf_Mold", "Tomato", "Leaf_Mold"),
    ("Tomato___Septoria_leaf_spot", "Tomato", "Septoria_leaf_spot"),
    (
        "Tomato___Spider_mites Two-spotted_spider_mite",
        "Tomato",
        "Spider_mites Two-spotted_spider_mite",
    ),
    ("Tomato___Target_Spot", "Tomato", "Target_Spot"),
    ("Tomato___Tomato_mosaic_virus", "Tomato", "Tomato_mosaic_virus"),
    ("Tomato___Tomato_Yellow_Leaf_Curl_Virus", "Tomato", "Tomato_Yellow_Leaf_Curl_Virus"),
];

lazy_static! {
    static ref BUILTIN_TAXONOMY: Arc<Taxonomy> = Arc::new(Taxonomy::from_parts(
        BUILTIN_LABELS
            .iter()
            .map(|&(label, crop, disease)| ClassLabel {
                label: label.to_string(),
                crop: crop.to_string(),
                disease: disease.to_string(),
            })
            .collect(),
    ));
}

/// One output class of the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassLabel {
    /// Class name exactly as the model's output layer knows it
    pub label: String,
    /// Crop the class belongs to
    pub crop: String,
    /// Disease (or `healthy`) within the crop
    pub disease: String,
}

impl ClassLabel {
    /// Creates a validated class label. All three fields are trimmed and must be non-empty.
    pub fn new(
        label: impl Into<String>,
        crop: impl Into<String>,
        disease: impl Into<String>,
    ) -> Result<Self, CropDocError> {
        let label = label.into().trim().to_string();
        let crop = crop.into().trim().to_string();
        let disease = disease.into().trim().to_string();

        if label.is_empty() {
            return Err(CropDocError::Validation("Class label cannot be empty".into()));
        }
        if crop.is_empty() {
            return Err(CropDocError::Validation(format!("Crop for '{}' cannot be empty", label)));
        }
        if disease.is_empty() {
            return Err(CropDocError::Validation(format!(
                "Disease for '{}' cannot be empty",
                label
            )));
        }
        Ok(Self { label, crop, disease })
    }
}

#[derive(Debug, Deserialize)]
struct LabelEntry {
    label: String,
    crop: String,
    disease: String,
}

/// Mapping from crop name to the taxonomy positions of its labels.
///
/// Positions are kept in taxonomy order and crops iterate sorted by name.
#[derive(Debug, Clone, Default)]
pub struct CropIndex {
    crops: BTreeMap<String, Vec<usize>>,
}

impl CropIndex {
    fn build(labels: &[ClassLabel]) -> Self {
        let mut crops: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (position, class) in labels.iter().enumerate() {
            crops.entry(class.crop.clone()).or_default().push(position);
        }
        Self { crops }
    }

    pub fn contains(&self, crop: &str) -> bool {
        self.crops.contains_key(crop)
    }

    /// Taxonomy positions for `crop`, or `None` for an unknown crop.
    pub fn positions(&self, crop: &str) -> Option<&[usize]> {
        self.crops.get(crop).map(Vec::as_slice)
    }

    /// Crop names in sorted order.
    pub fn crop_names(&self) -> Vec<String> {
        self.crops.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.crops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crops.is_empty()
    }
}

/// Ordered list of classifier output labels.
///
/// Position `i` in the taxonomy names position `i` of the model's probability
/// vector. The order is never changed after construction.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    labels: Vec<ClassLabel>,
    index: CropIndex,
}

impl Taxonomy {
    /// Builds a taxonomy from labels in model output order.
    ///
    /// Fails when the list is empty or when the same label string appears twice.
    /// Labels that differ only in delimiter style are distinct outputs and are kept.
    pub fn new(labels: Vec<ClassLabel>) -> Result<Self, CropDocError> {
        if labels.is_empty() {
            return Err(CropDocError::Validation("Taxonomy must contain at least one label".into()));
        }

        let mut seen = HashSet::new();
        for class in &labels {
            if !seen.insert(class.label.as_str()) {
                return Err(CropDocError::Validation(format!(
                    "Duplicate class label '{}'",
                    class.label
                )));
            }
        }

        Ok(Self::from_parts(labels))
    }

    fn from_parts(labels: Vec<ClassLabel>) -> Self {
        let index = CropIndex::build(&labels);
        Self { labels, index }
    }

    /// The taxonomy of the bundled crop disease model.
    pub fn builtin() -> Arc<Taxonomy> {
        Arc::clone(&BUILTIN_TAXONOMY)
    }

    /// Parses a JSON array of `{"label", "crop", "disease"}` objects.
    pub fn from_json_str(json: &str) -> Result<Self, CropDocError> {
        let entries: Vec<LabelEntry> = serde_json::from_str(json)
            .map_err(|e| CropDocError::Validation(format!("Invalid labels file: {}", e)))?;

        let labels = entries
            .into_iter()
            .map(|entry| ClassLabel::new(entry.label, entry.crop, entry.disease))
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(labels)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CropDocError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            CropDocError::Validation(format!("Failed to read labels file {:?}: {}", path, e))
        })?;
        Self::from_json_str(&json)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&ClassLabel> {
        self.labels.get(position)
    }

    pub fn labels(&self) -> &[ClassLabel] {
        &self.labels
    }

    pub fn crop_index(&self) -> &CropIndex {
        &self.index
    }

    /// Labels under `crop` in taxonomy order, or `None` for an unknown crop.
    pub fn labels_for_crop(&self, crop: &str) -> Option<Vec<&ClassLabel>> {
        self.index
            .positions(crop)
            .map(|positions| positions.iter().map(|&p| &self.labels[p]).collect())
    }
}
