use std::fmt;

/// Tumor classes recognized by the classification model.
///
/// The discriminant order is a wire contract: index `i` of the model's output
/// tensor corresponds to `TumorClass::ALL[i]`. The model was trained with this
/// label order and reordering the variants silently mislabels every result,
/// so the schema is validated against the model's declared output width at
/// load time (see `OnnxClassificationModel::load`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TumorClass {
    Glioma,
    Meningioma,
    Pituitary,
}

impl TumorClass {
    /// Frozen index-to-class mapping matching the training label order.
    pub const ALL: [Self; 3] = [Self::Glioma, Self::Meningioma, Self::Pituitary];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Glioma => "glioma",
            Self::Meningioma => "meningioma",
            Self::Pituitary => "pituitary",
        }
    }
}

impl fmt::Display for TumorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a single classification pass: the argmax label together with the
/// full softmax distribution, indexed positionally by [`TumorClass::ALL`].
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: TumorClass,
    probabilities: [f32; 3],
}

impl Classification {
    /// Build a classification from raw model logits.
    ///
    /// Applies a max-subtracted softmax for numeric stability and picks the
    /// highest-probability class as the label. Ties resolve to the earliest
    /// class in the frozen order.
    pub fn from_logits(logits: [f32; 3]) -> Self {
        let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let exp: Vec<f32> = logits.iter().map(|&l| (l - max).exp()).collect();
        let sum: f32 = exp.iter().sum();
        let probabilities = [exp[0] / sum, exp[1] / sum, exp[2] / sum];
        Self::from_probabilities(probabilities)
    }

    /// Build a classification from an already-normalized distribution.
    pub fn from_probabilities(probabilities: [f32; 3]) -> Self {
        let label = TumorClass::ALL
            .into_iter()
            .zip(probabilities)
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(class, _)| class)
            .unwrap_or(TumorClass::Glioma);
        Self {
            label,
            probabilities,
        }
    }

    pub fn probability_of(&self, class: TumorClass) -> f32 {
        let idx = TumorClass::ALL.iter().position(|&c| c == class).unwrap_or(0);
        self.probabilities[idx]
    }

    /// Iterate (class, probability) pairs in the frozen label order.
    pub fn probabilities(&self) -> impl Iterator<Item = (TumorClass, f32)> + '_ {
        TumorClass::ALL.into_iter().zip(self.probabilities)
    }
}
