use histoseg_core::GrayImageView;

use crate::{IterativeController, TriclassError, TriclassParams, TriclassResult};

/// Validated parameters plus a one-call entry point; each call starts a
/// fresh controller and history.
#[derive(Clone, Debug)]
pub struct TriclassRunner {
    params: TriclassParams,
}

impl TriclassRunner {
    pub fn new(params: TriclassParams) -> Result<Self, TriclassError> {
        params.validate()?;
        Ok(Self { params })
    }

    #[inline]
    pub fn params(&self) -> &TriclassParams {
        &self.params
    }

    /// Start a steppable run over `image`.
    pub fn controller<'a>(
        &self,
        image: GrayImageView<'a>,
    ) -> Result<IterativeController<'a>, TriclassError> {
        IterativeController::new(&self.params, image)
    }

    pub fn segment(&self, image: &GrayImageView<'_>) -> Result<TriclassResult, TriclassError> {
        Ok(self.controller(*image)?.run())
    }
}
