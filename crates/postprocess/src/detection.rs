use ndarray::{Array1, Array2, ArrayView2};

/// One candidate read out of a [`DetectionSet`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    /// `[x, y, w, h]` in original image pixels
    pub bbox: [f32; 4],
    pub score: f32,
    pub class_id: usize,
}

/// Parallel per-candidate arrays, all indexed by the same candidate ordinal.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionSet {
    /// `[N, 4]` boxes as `[x, y, w, h]`
    pub boxes: Array2<f32>,
    /// Highest class probability per candidate
    pub scores: Array1<f32>,
    /// Index of that probability
    pub classes: Array1<usize>,
}

impl DetectionSet {
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Detection> {
        if index >= self.len() {
            return None;
        }

        let row = self.boxes.row(index);
        Some(Detection {
            bbox: [row[0], row[1], row[2], row[3]],
            score: self.scores[index],
            class_id: self.classes[index],
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Detection> + '_ {
        (0..self.len()).filter_map(|i| self.get(i))
    }
}

/// Reduce `[N, K]` class probabilities to the best score and its class index
/// per candidate. Ties resolve to the lowest index. Requires `K >= 1` when
/// `N > 0`.
pub fn best_classes(class_scores: ArrayView2<f32>) -> (Array1<f32>, Array1<usize>) {
    let (scores, classes): (Vec<f32>, Vec<usize>) = class_scores
        .rows()
        .into_iter()
        .map(|row| {
            let mut best = (row[0], 0usize);
            for (class_id, &score) in row.iter().enumerate().skip(1) {
                if score > best.0 {
                    best = (score, class_id);
                }
            }
            best
        })
        .unzip();

    (Array1::from(scores), Array1::from(classes))
}
