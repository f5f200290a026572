//! Default parameter sets per algorithm and JSON overrides on top of them.
//!
//! The registry is a plain value: build it at startup (defaults or a JSON
//! file), then hand it by reference to whatever creates segmenters.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::GrayImageView;
use crate::otsu2d::{Otsu2dParams, Otsu2dResult, Otsu2dSegmenter};
use crate::triclass::{TriclassParams, TriclassResult, TriclassRunner};
use crate::SegmentError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlgorithmKind {
    #[serde(rename = "otsu_2d")]
    Otsu2d,
    #[serde(rename = "iterative_triclass")]
    IterativeTriclass,
}

impl AlgorithmKind {
    pub const ALL: [AlgorithmKind; 2] = [AlgorithmKind::Otsu2d, AlgorithmKind::IterativeTriclass];

    pub fn name(self) -> &'static str {
        match self {
            AlgorithmKind::Otsu2d => "otsu_2d",
            AlgorithmKind::IterativeTriclass => "iterative_triclass",
        }
    }

    /// Whether the algorithm consumes a neighborhood feature grid.
    pub fn needs_feature_grid(self) -> bool {
        matches!(self, AlgorithmKind::Otsu2d)
    }
}

impl fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AlgorithmKind {
    type Err = SegmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "otsu_2d" | "otsu2d" => Ok(AlgorithmKind::Otsu2d),
            "iterative_triclass" | "triclass" => Ok(AlgorithmKind::IterativeTriclass),
            _ => Err(SegmentError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Validated parameters for one algorithm.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "algorithm", content = "params")]
pub enum AlgorithmParams {
    #[serde(rename = "otsu_2d")]
    Otsu2d(Otsu2dParams),
    #[serde(rename = "iterative_triclass")]
    IterativeTriclass(TriclassParams),
}

impl AlgorithmParams {
    pub fn kind(&self) -> AlgorithmKind {
        match self {
            AlgorithmParams::Otsu2d(_) => AlgorithmKind::Otsu2d,
            AlgorithmParams::IterativeTriclass(_) => AlgorithmKind::IterativeTriclass,
        }
    }

    pub fn validate(&self) -> Result<(), SegmentError> {
        match self {
            AlgorithmParams::Otsu2d(p) => p.validate()?,
            AlgorithmParams::IterativeTriclass(p) => p.validate()?,
        }
        Ok(())
    }
}

/// Default parameter set per [`AlgorithmKind`].
///
/// Serialized as `{ "otsu_2d": {...}, "iterative_triclass": {...} }`;
/// missing sections and fields keep their built-in defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlgorithmRegistry {
    pub otsu_2d: Otsu2dParams,
    pub iterative_triclass: TriclassParams,
}

impl AlgorithmRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, SegmentError> {
        let registry: Self = serde_json::from_str(json).map_err(|source| SegmentError::Config {
            context: "registry".to_string(),
            source,
        })?;
        registry.validate()?;
        Ok(registry)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SegmentError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| SegmentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::from_json_str(&raw)?;
        debug!("loaded algorithm registry from {}", path.display());
        Ok(registry)
    }

    /// Every stored default set must be valid.
    pub fn validate(&self) -> Result<(), SegmentError> {
        self.otsu_2d.validate()?;
        self.iterative_triclass.validate()?;
        Ok(())
    }

    pub fn defaults(&self, kind: AlgorithmKind) -> AlgorithmParams {
        match kind {
            AlgorithmKind::Otsu2d => AlgorithmParams::Otsu2d(self.otsu_2d.clone()),
            AlgorithmKind::IterativeTriclass => {
                AlgorithmParams::IterativeTriclass(self.iterative_triclass.clone())
            }
        }
    }

    /// Replace the default set of `params.kind()` after validating it.
    pub fn set_defaults(&mut self, params: AlgorithmParams) -> Result<(), SegmentError> {
        params.validate()?;
        match params {
            AlgorithmParams::Otsu2d(p) => self.otsu_2d = p,
            AlgorithmParams::IterativeTriclass(p) => self.iterative_triclass = p,
        }
        Ok(())
    }

    /// Defaults for `kind` with the keys of `overrides` (a JSON object)
    /// replacing the matching fields. Unknown keys are rejected.
    pub fn params_with_overrides(
        &self,
        kind: AlgorithmKind,
        overrides: &Value,
    ) -> Result<AlgorithmParams, SegmentError> {
        let params = match kind {
            AlgorithmKind::Otsu2d => {
                AlgorithmParams::Otsu2d(merge_overrides(kind, &self.otsu_2d, overrides)?)
            }
            AlgorithmKind::IterativeTriclass => AlgorithmParams::IterativeTriclass(
                merge_overrides(kind, &self.iterative_triclass, overrides)?,
            ),
        };
        params.validate()?;
        Ok(params)
    }

    /// A ready-to-run segmenter for `kind`, optionally with overrides.
    pub fn segmenter(
        &self,
        kind: AlgorithmKind,
        overrides: Option<&Value>,
    ) -> Result<Segmenter, SegmentError> {
        let params = match overrides {
            Some(v) => self.params_with_overrides(kind, v)?,
            None => self.defaults(kind),
        };
        Segmenter::new(params)
    }
}

fn merge_overrides<T>(kind: AlgorithmKind, base: &T, overrides: &Value) -> Result<T, SegmentError>
where
    T: Serialize + for<'de> Deserialize<'de>,
{
    let config_error = |source| SegmentError::Config {
        context: format!("{kind} overrides"),
        source,
    };
    let mut merged = serde_json::to_value(base).map_err(config_error)?;
    match overrides {
        Value::Null => {}
        Value::Object(entries) => {
            if let Value::Object(target) = &mut merged {
                for (key, value) in entries {
                    let Some(slot) = target.get_mut(key) else {
                        return Err(SegmentError::UnknownOption {
                            algorithm: kind.name(),
                            key: key.clone(),
                        });
                    };
                    *slot = value.clone();
                }
            }
        }
        other => {
            // Let serde produce the type error for a non-object value.
            return serde_json::from_value::<T>(other.clone()).map_err(config_error);
        }
    }
    serde_json::from_value(merged).map_err(config_error)
}

/// One configured algorithm instance.
#[derive(Clone, Debug)]
pub enum Segmenter {
    Otsu2d(Otsu2dSegmenter),
    IterativeTriclass(TriclassRunner),
}

/// Result of [`Segmenter::segment`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "algorithm", content = "result")]
pub enum SegmentationOutcome {
    #[serde(rename = "otsu_2d")]
    Otsu2d(Otsu2dResult),
    #[serde(rename = "iterative_triclass")]
    IterativeTriclass(TriclassResult),
}

impl Segmenter {
    pub fn new(params: AlgorithmParams) -> Result<Self, SegmentError> {
        Ok(match params {
            AlgorithmParams::Otsu2d(p) => Segmenter::Otsu2d(Otsu2dSegmenter::new(p)?),
            AlgorithmParams::IterativeTriclass(p) => {
                Segmenter::IterativeTriclass(TriclassRunner::new(p)?)
            }
        })
    }

    pub fn kind(&self) -> AlgorithmKind {
        match self {
            Segmenter::Otsu2d(_) => AlgorithmKind::Otsu2d,
            Segmenter::IterativeTriclass(_) => AlgorithmKind::IterativeTriclass,
        }
    }

    /// Run the configured algorithm. `feature` is required by the 2D path
    /// and ignored by the iterative one.
    pub fn segment(
        &self,
        intensity: &GrayImageView<'_>,
        feature: Option<&GrayImageView<'_>>,
    ) -> Result<SegmentationOutcome, SegmentError> {
        match self {
            Segmenter::Otsu2d(seg) => {
                let feature = feature.ok_or(SegmentError::MissingFeatureGrid)?;
                Ok(SegmentationOutcome::Otsu2d(seg.segment(intensity, feature)?))
            }
            Segmenter::IterativeTriclass(runner) => Ok(SegmentationOutcome::IterativeTriclass(
                runner.segment(intensity)?,
            )),
        }
    }
}

impl SegmentationOutcome {
    pub fn kind(&self) -> AlgorithmKind {
        match self {
            SegmentationOutcome::Otsu2d(_) => AlgorithmKind::Otsu2d,
            SegmentationOutcome::IterativeTriclass(_) => AlgorithmKind::IterativeTriclass,
        }
    }

    pub fn mask(&self) -> &crate::core::GrayImage {
        match self {
            SegmentationOutcome::Otsu2d(r) => &r.mask,
            SegmentationOutcome::IterativeTriclass(r) => &r.mask,
        }
    }

    pub fn into_mask(self) -> crate::core::GrayImage {
        match self {
            SegmentationOutcome::Otsu2d(r) => r.mask,
            SegmentationOutcome::IterativeTriclass(r) => r.mask,
        }
    }

    /// The outcome as JSON without the mask pixels.
    pub fn summary(&self) -> Result<Value, SegmentError> {
        let mut value = serde_json::to_value(self).map_err(|source| SegmentError::Config {
            context: "report".to_string(),
            source,
        })?;
        if let Some(result) = value.get_mut("result").and_then(Value::as_object_mut) {
            result.remove("mask");
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::otsu2d::Quality;
    use crate::triclass::ThresholdMethod;
    use serde_json::json;

    #[test]
    fn kind_names_round_trip() {
        for kind in AlgorithmKind::ALL {
            assert_eq!(kind.name().parse::<AlgorithmKind>().expect("parse"), kind);
            assert_eq!(
                serde_json::to_value(kind).expect("json"),
                Value::String(kind.name().to_string())
            );
        }
        assert_eq!(
            "Triclass".parse::<AlgorithmKind>().expect("alias"),
            AlgorithmKind::IterativeTriclass
        );
        assert!(matches!(
            "kmeans".parse::<AlgorithmKind>(),
            Err(SegmentError::UnknownAlgorithm(_))
        ));
    }

    #[test]
    fn overrides_replace_only_named_fields() {
        let reg = AlgorithmRegistry::new();
        let p = reg
            .params_with_overrides(AlgorithmKind::Otsu2d, &json!({ "quality": "Best", "histogram_bins": 32 }))
            .expect("params");
        let AlgorithmParams::Otsu2d(p) = p else {
            panic!("wrong kind");
        };
        assert_eq!(p.quality, Quality::Best);
        assert_eq!(p.histogram_bins, 32);
        assert_eq!(p.smoothing_sigma, Otsu2dParams::default().smoothing_sigma);
    }

    #[test]
    fn overrides_are_validated() {
        let reg = AlgorithmRegistry::new();
        let err = reg
            .params_with_overrides(
                AlgorithmKind::IterativeTriclass,
                &json!({ "max_iterations": 0 }),
            )
            .unwrap_err();
        assert!(matches!(err, SegmentError::Triclass(_)));

        let err = reg
            .params_with_overrides(AlgorithmKind::Otsu2d, &json!({ "histogram_bin": 32 }))
            .unwrap_err();
        assert!(matches!(err, SegmentError::UnknownOption { .. }));

        let err = reg
            .params_with_overrides(AlgorithmKind::Otsu2d, &json!({ "quality": "Ultra" }))
            .unwrap_err();
        assert!(matches!(err, SegmentError::Config { .. }));
    }

    #[test]
    fn registry_from_partial_json() {
        let reg = AlgorithmRegistry::from_json_str(
            r#"{ "iterative_triclass": { "initial_threshold_method": "mean" } }"#,
        )
        .expect("registry");
        assert_eq!(
            reg.iterative_triclass.initial_threshold_method,
            ThresholdMethod::Mean
        );
        assert_eq!(reg.otsu_2d, Otsu2dParams::default());

        assert!(AlgorithmRegistry::from_json_str(r#"{ "kmeans": {} }"#).is_err());
        assert!(AlgorithmRegistry::from_json_str(
            r#"{ "otsu_2d": { "pixel_weight_factor": 2.0 } }"#
        )
        .is_err());
    }

    #[test]
    fn set_defaults_rejects_invalid_sets() {
        let mut reg = AlgorithmRegistry::new();
        let bad = AlgorithmParams::IterativeTriclass(TriclassParams {
            convergence_epsilon: 0.0,
            ..TriclassParams::default()
        });
        assert!(reg.set_defaults(bad).is_err());
        assert_eq!(reg, AlgorithmRegistry::default());
    }

    #[test]
    fn otsu_requires_feature_grid() {
        let reg = AlgorithmRegistry::new();
        let seg = reg.segmenter(AlgorithmKind::Otsu2d, None).expect("segmenter");
        let img = crate::core::GrayImage::zeros(4, 4);
        assert!(matches!(
            seg.segment(&img.view(), None),
            Err(SegmentError::MissingFeatureGrid)
        ));
    }
}
