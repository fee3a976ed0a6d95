//! Context tokenizers
//!
//! Context history is sent to the model as space-separated units. Word
//! segmentation uses the jieba dictionary, so Chinese comes out as words
//! and Latin runs stay whole.

use bzx_core::SegmenterKind;
use jieba_rs::Jieba;
use std::sync::Arc;

pub trait Segmenter: Send + Sync {
    fn name(&self) -> &str;

    fn segment(&self, text: &str) -> Vec<String>;
}

/// Segmenter configured by `kind`, `None` when segmentation is off.
pub fn segmenter_for(kind: SegmenterKind) -> Option<Arc<dyn Segmenter>> {
    match kind {
        SegmenterKind::Word => Some(Arc::new(WordSegmenter::new())),
        SegmenterKind::Off => None,
    }
}

/// Dictionary segmentation with HMM for unknown words. Loading the
/// dictionary is slow; build once and share.
pub struct WordSegmenter {
    jieba: Jieba,
}

impl WordSegmenter {
    pub fn new() -> Self {
        Self {
            jieba: Jieba::new(),
        }
    }
}

impl Default for WordSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Segmenter for WordSegmenter {
    fn name(&self) -> &str {
        "word"
    }

    fn segment(&self, text: &str) -> Vec<String> {
        self.jieba
            .cut(text, true)
            .into_iter()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect()
    }
}

/// One unit per non-whitespace character.
pub struct CharSegmenter;

impl Segmenter for CharSegmenter {
    fn name(&self) -> &str {
        "char"
    }

    fn segment(&self, text: &str) -> Vec<String> {
        text.chars()
            .filter(|c| !c.is_whitespace())
            .map(String::from)
            .collect()
    }
}
