use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::error::CropDocError;
use super::utils::rank_positions;
use crate::taxonomy::Taxonomy;

/// Number of ranked labels reported alongside the top prediction.
pub const DEFAULT_TOP_K: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct RankedLabel {
    pub label: String,
    /// Unit fraction in `[0, 1]` for a well-formed probability vector
    pub confidence: f32,
}

/// Ranked labels that serialize as a JSON object in rank order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RankedLabels(pub Vec<RankedLabel>);

impl Serialize for RankedLabels {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for ranked in &self.0 {
            map.serialize_entry(&ranked.label, &ranked.confidence)?;
        }
        map.end()
    }
}

/// Result of a crop-constrained prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct CropPrediction {
    pub crop: String,
    /// Label of the most probable class within the crop
    pub disease: String,
    pub confidence: f32,
    /// Top-k labels within the crop, best first
    pub ranked: RankedLabels,
}

/// Restricts a full probability vector to one crop's labels and ranks them.
#[derive(Debug, Clone)]
pub struct CropPredictor {
    taxonomy: Arc<Taxonomy>,
    top_k: usize,
}

impl CropPredictor {
    pub fn new(taxonomy: Arc<Taxonomy>, top_k: usize) -> Result<Self, CropDocError> {
        if top_k == 0 {
            return Err(CropDocError::Validation("top_k must be at least 1".into()));
        }
        Ok(Self { taxonomy, top_k })
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn predict(
        &self,
        probabilities: &[f32],
        crop: &str,
    ) -> Result<CropPrediction, CropDocError> {
        if probabilities.len() != self.taxonomy.len() {
            return Err(CropDocError::Internal(format!(
                "Probability vector has {} entries, taxonomy has {}",
                probabilities.len(),
                self.taxonomy.len()
            )));
        }

        let positions = self
            .taxonomy
            .crop_index()
            .positions(crop)
            .ok_or_else(|| CropDocError::UnknownCrop(crop.to_string()))?;

        let ranked = rank_positions(probabilities, positions);
        let &(best, confidence) = ranked
            .first()
            .ok_or_else(|| CropDocError::EmptyCrop(crop.to_string()))?;

        let label_at = |position: usize| -> Result<String, CropDocError> {
            self.taxonomy
                .get(position)
                .map(|class| class.label.clone())
                .ok_or_else(|| CropDocError::Internal(format!("No label at position {}", position)))
        };

        let top = ranked
            .iter()
            .take(self.top_k)
            .map(|&(position, confidence)| {
                Ok(RankedLabel {
                    label: label_at(position)?,
                    confidence,
                })
            })
            .collect::<Result<Vec<_>, CropDocError>>()?;

        Ok(CropPrediction {
            crop: crop.to_string(),
            disease: label_at(best)?,
            confidence,
            ranked: RankedLabels(top),
        })
    }
}
