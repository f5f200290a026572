//! Contract for mask post-processing stages.
//!
//! Stages (morphology, denoising, border handling) live outside this
//! workspace. The chain runs them in order and checks after each one that
//! the mask kept its shape and stayed binary.

use crate::core::{GrayImage, GrayImageView, BACKGROUND, FOREGROUND};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PostprocessError {
    #[error("stage `{stage}` changed the mask shape from {expected:?} to {got:?}")]
    ShapeChanged {
        stage: String,
        expected: (usize, usize),
        got: (usize, usize),
    },
    #[error("stage `{stage}` produced non-binary value {value}")]
    NonBinary { stage: String, value: u8 },
}

/// One post-processing stage: binary mask in, binary mask of the same shape
/// out.
pub trait MaskPostprocessor {
    fn name(&self) -> &str;

    fn process(&self, mask: &GrayImageView<'_>) -> GrayImage;
}

/// Ordered list of stages with shape and value checks between them.
#[derive(Default)]
pub struct PostprocessChain {
    stages: Vec<Box<dyn MaskPostprocessor>>,
}

impl PostprocessChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stage(mut self, stage: impl MaskPostprocessor + 'static) -> Self {
        self.push(stage);
        self
    }

    pub fn push(&mut self, stage: impl MaskPostprocessor + 'static) {
        self.stages.push(Box::new(stage));
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage over `mask`. The input itself must already be binary.
    pub fn run(&self, mask: GrayImage) -> Result<GrayImage, PostprocessError> {
        check_binary("input", &mask)?;
        let mut current = mask;
        for stage in &self.stages {
            let next = stage.process(&current.view());
            if (next.width, next.height) != (current.width, current.height) {
                return Err(PostprocessError::ShapeChanged {
                    stage: stage.name().to_string(),
                    expected: (current.width, current.height),
                    got: (next.width, next.height),
                });
            }
            check_binary(stage.name(), &next)?;
            current = next;
        }
        Ok(current)
    }
}

impl std::fmt::Debug for PostprocessChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostprocessChain")
            .field("stages", &self.stage_names())
            .finish()
    }
}

fn check_binary(stage: &str, mask: &GrayImage) -> Result<(), PostprocessError> {
    match mask
        .data
        .iter()
        .find(|&&v| v != BACKGROUND && v != FOREGROUND)
    {
        Some(&value) => Err(PostprocessError::NonBinary {
            stage: stage.to_string(),
            value,
        }),
        None => Ok(()),
    }
}
