// ============================================================
// Layer 5 — Hyperparameter Grid
// ============================================================
// A PipelineConfiguration is an ordered list of stages, each with
// an ordered table of parameter → candidate values. Expanding it
// yields the full cross product as PipelineParams.
//
// Iteration order: stages in pipeline order, parameters in table
// order, the last parameter varying fastest. For the housing grid
// that is
//
//   #0  mean,   (25, 75), C=0.1, gamma=auto
//   #1  mean,   (25, 75), C=0.1, gamma=0.1
//   #2  mean,   (25, 75), C=1,   gamma=auto
//   ...
//   #15 median, (30, 70), C=1,   gamma=0.1
//
// Ties in the search are broken by this order.

use std::fmt;

use crate::data::preprocessor::{ImputeStrategy, QuantileRange};
use crate::ml::model::Gamma;
use crate::ml::pipeline::PipelineParams;

pub const SIMPLE_IMPUTER: &str = "simple_imputer";
pub const ROBUST_SCALER:  &str = "robust_scaler";
pub const SVR:            &str = "svr";

// ─── ParamValue ───────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamValue {
    Strategy(ImputeStrategy),
    Range(QuantileRange),
    Float(f64),
    Gamma(Gamma),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Strategy(s) => write!(f, "{s}"),
            ParamValue::Range(r)    => write!(f, "{r}"),
            ParamValue::Float(v)    => write!(f, "{v}"),
            ParamValue::Gamma(g)    => write!(f, "{g}"),
        }
    }
}

// ─── Stage ────────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub name:   String,
    pub params: Vec<(String, Vec<ParamValue>)>,
}

impl Stage {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), params: Vec::new() }
    }

    pub fn param(mut self, name: &str, values: Vec<ParamValue>) -> Self {
        self.params.push((name.to_string(), values));
        self
    }
}

// ─── PipelineConfiguration ────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfiguration {
    pub name:   String,
    pub stages: Vec<Stage>,
}

impl PipelineConfiguration {
    /// The fixed 16-combination grid searched for the housing model
    pub fn housing() -> Self {
        Self {
            name: "housing-svr".to_string(),
            stages: vec![
                Stage::new(SIMPLE_IMPUTER).param(
                    "strategy",
                    vec![
                        ParamValue::Strategy(ImputeStrategy::Mean),
                        ParamValue::Strategy(ImputeStrategy::Median),
                    ],
                ),
                Stage::new(ROBUST_SCALER).param(
                    "quantile_range",
                    vec![
                        ParamValue::Range(QuantileRange::new(25.0, 75.0)),
                        ParamValue::Range(QuantileRange::new(30.0, 70.0)),
                    ],
                ),
                Stage::new(SVR)
                    .param("C", vec![ParamValue::Float(0.1), ParamValue::Float(1.0)])
                    .param("gamma", vec![ParamValue::Gamma(Gamma::Auto), ParamValue::Gamma(Gamma::Value(0.1))]),
            ],
        }
    }

    /// Product of every table's candidate count
    pub fn n_combinations(&self) -> usize {
        self.axes().iter().map(|(_, _, values)| values.len()).product()
    }

    /// Expand the cross product in iteration order.
    ///
    /// # Errors
    /// An unknown stage/parameter, a value of the wrong kind, an
    /// empty candidate list, or a pipeline parameter left unset.
    pub fn combinations(&self) -> Result<Vec<PipelineParams>, String> {
        let axes = self.axes();
        if let Some((stage, param, _)) = axes.iter().find(|(_, _, values)| values.is_empty()) {
            return Err(format!("{stage}__{param} has no candidate values"));
        }

        let total = self.n_combinations();
        let mut combos = Vec::with_capacity(total);
        // Odometer over the axes, last axis fastest
        let mut cursor = vec![0usize; axes.len()];
        for _ in 0..total {
            let mut draft = Draft::default();
            for ((stage, param, values), &pick) in axes.iter().zip(&cursor) {
                draft.assign(stage, param, values[pick])?;
            }
            combos.push(draft.finish()?);

            for (slot, (_, _, values)) in cursor.iter_mut().zip(&axes).rev() {
                *slot += 1;
                if *slot < values.len() {
                    break;
                }
                *slot = 0;
            }
        }
        Ok(combos)
    }

    fn axes(&self) -> Vec<(&str, &str, &[ParamValue])> {
        self.stages
            .iter()
            .flat_map(|stage| {
                stage
                    .params
                    .iter()
                    .map(move |(param, values)| (stage.name.as_str(), param.as_str(), values.as_slice()))
            })
            .collect()
    }
}

/// PipelineParams under construction
#[derive(Default)]
struct Draft {
    strategy:       Option<ImputeStrategy>,
    quantile_range: Option<QuantileRange>,
    c:              Option<f64>,
    gamma:          Option<Gamma>,
}

impl Draft {
    fn assign(&mut self, stage: &str, param: &str, value: ParamValue) -> Result<(), String> {
        match (stage, param, value) {
            (SIMPLE_IMPUTER, "strategy", ParamValue::Strategy(s))    => self.strategy = Some(s),
            (ROBUST_SCALER, "quantile_range", ParamValue::Range(r))  => self.quantile_range = Some(r),
            (SVR, "C", ParamValue::Float(c))                         => self.c = Some(c),
            (SVR, "gamma", ParamValue::Gamma(g))                     => self.gamma = Some(g),
            (SVR, "gamma", ParamValue::Float(g))                     => self.gamma = Some(Gamma::Value(g)),
            _ => return Err(format!("unsupported grid entry {stage}__{param} = {value}")),
        }
        Ok(())
    }

    fn finish(self) -> Result<PipelineParams, String> {
        Ok(PipelineParams {
            strategy:       self.strategy.ok_or("simple_imputer__strategy is not set")?,
            quantile_range: self.quantile_range.ok_or("robust_scaler__quantile_range is not set")?,
            c:              self.c.ok_or("svr__C is not set")?,
            gamma:          self.gamma.ok_or("svr__gamma is not set")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_housing_grid_has_sixteen_combinations() {
        let grid = PipelineConfiguration::housing();
        assert_eq!(grid.n_combinations(), 16);
        assert_eq!(grid.combinations().unwrap().len(), 16);
    }

    #[test]
    fn test_last_parameter_varies_fastest() {
        let combos = PipelineConfiguration::housing().combinations().unwrap();
        assert_eq!(combos[0].gamma, Gamma::Auto);
        assert_eq!(combos[1].gamma, Gamma::Value(0.1));
        assert_eq!(combos[0].c, 0.1);
        assert_eq!(combos[2].c, 1.0);
        assert_eq!(combos[4].quantile_range, QuantileRange::new(30.0, 70.0));
        assert_eq!(combos[7].strategy, ImputeStrategy::Mean);
        assert_eq!(combos[8].strategy, ImputeStrategy::Median);
        assert_eq!(combos[15].gamma, Gamma::Value(0.1));
    }

    #[test]
    fn test_combinations_are_distinct() {
        let combos = PipelineConfiguration::housing().combinations().unwrap();
        for (i, a) in combos.iter().enumerate() {
            for b in &combos[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_unknown_parameter_is_rejected() {
        let mut grid = PipelineConfiguration::housing();
        grid.stages[2] = Stage::new(SVR).param("kernel", vec![ParamValue::Float(1.0)]);
        assert!(grid.combinations().unwrap_err().contains("svr__kernel"));
    }

    #[test]
    fn test_unset_parameter_is_rejected() {
        let mut grid = PipelineConfiguration::housing();
        grid.stages.pop();
        assert!(grid.combinations().is_err());
    }

    #[test]
    fn test_empty_candidate_list_is_rejected() {
        let mut grid = PipelineConfiguration::housing();
        grid.stages[0].params[0].1.clear();
        assert!(grid.combinations().is_err());
    }
}
