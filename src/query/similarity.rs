/// Classic TF-IDF scoring model (spec.md §4.7 Similarity). Every formula
/// here is reader-independent — callers supply the statistics they've
/// already gathered from a segment or a whole index.
pub trait Similarity: Send + Sync {
    fn tf(&self, freq: f32) -> f32;
    fn idf(&self, doc_freq: u32, num_docs: u32) -> f32;
    fn query_norm(&self, sum_of_squared_weights: f32) -> f32;
    fn coord(&self, overlap: u32, max_overlap: u32) -> f32;
    fn sloppy_freq(&self, match_length: u32) -> f32;
    fn length_norm(&self, num_terms: u32) -> f32;

    fn compute_norm(&self, boost: f32, num_terms: u32) -> f32 {
        boost * self.length_norm(num_terms)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSimilarity;

impl Similarity for DefaultSimilarity {
    fn tf(&self, freq: f32) -> f32 {
        freq.sqrt()
    }

    fn idf(&self, doc_freq: u32, num_docs: u32) -> f32 {
        ((num_docs as f32) / (doc_freq as f32 + 1.0)).ln() + 1.0
    }

    fn query_norm(&self, sum_of_squared_weights: f32) -> f32 {
        if sum_of_squared_weights <= 0.0 {
            1.0
        } else {
            1.0 / sum_of_squared_weights.sqrt()
        }
    }

    fn coord(&self, overlap: u32, max_overlap: u32) -> f32 {
        if max_overlap == 0 {
            0.0
        } else {
            overlap as f32 / max_overlap as f32
        }
    }

    fn sloppy_freq(&self, match_length: u32) -> f32 {
        1.0 / (match_length as f32 + 1.0)
    }

    fn length_norm(&self, num_terms: u32) -> f32 {
        if num_terms == 0 {
            1.0
        } else {
            1.0 / (num_terms as f32).sqrt()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idf_decreases_as_doc_freq_rises() {
        let sim = DefaultSimilarity;
        assert!(sim.idf(1, 1000) > sim.idf(500, 1000));
    }

    #[test]
    fn length_norm_shrinks_for_longer_fields() {
        let sim = DefaultSimilarity;
        assert!(sim.length_norm(10) > sim.length_norm(1000));
    }

    #[test]
    fn coord_is_full_overlap_ratio() {
        let sim = DefaultSimilarity;
        assert_eq!(sim.coord(2, 4), 0.5);
        assert_eq!(sim.coord(0, 0), 0.0);
    }
}
