//! Settings threaded through every reduction pass.
use serde::{Deserialize, Serialize};

use crate::tree::owned::OwnedTree;
use crate::tree::owned::shapes::{int, mult, pi, pow};

/// Trade-off between exact symbolic reduction and eager floating-point evaluation.
///
/// Variants are declared from the most exact to the cheapest.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Exact arithmetic, symbolic constants are kept.
    #[default]
    Default,
    /// Every number is turned into a float before reduction.
    NumbersToFloat,
    /// Every subtree that can be evaluated is replaced by its float value.
    ApproximateToFloat,
}

impl Strategy {
    #[inline]
    pub fn is_float(self) -> bool {
        self != Strategy::Default
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleUnit {
    #[default]
    Radian,
    Degree,
    Gradian,
}

impl AngleUnit {
    /// Half a turn in this unit, `None` for radians.
    pub fn half_turn(self) -> Option<i64> {
        match self {
            AngleUnit::Radian => None,
            AngleUnit::Degree => Some(180),
            AngleUnit::Gradian => Some(200),
        }
    }

    /// `π / half_turn`: multiply an angle in this unit by it to get radians.
    pub fn to_radians_factor(self) -> Option<OwnedTree> {
        self.half_turn()
            .map(|h| mult([pi(), pow(int(h), int(-1))]))
    }

    /// `half_turn / π`: multiply an angle in radians by it to get this unit.
    pub fn from_radians_factor(self) -> Option<OwnedTree> {
        self.half_turn()
            .map(|h| mult([int(h), pow(pi(), int(-1))]))
    }

    /// Radians per unit, for float evaluation.
    pub fn radians_per_unit(self) -> f64 {
        match self.half_turn() {
            None => 1.0,
            Some(h) => std::f64::consts::PI / h as f64,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexFormat {
    /// Non-real results are reported as `NonReal`.
    #[default]
    Real,
    Cartesian,
    Polar,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitFormat {
    #[default]
    Metric,
    Imperial,
}

/// What projection does with user symbols and functions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolicComputation {
    /// Symbols and functions with a stored definition are replaced by it.
    #[default]
    ReplaceDefinedSymbols,
    /// Only functions are replaced; symbols stay symbolic.
    ReplaceDefinedFunctions,
    /// Every user symbol, function and sequence becomes `Undefined`.
    ReplaceAllSymbolsWithUndefined,
    KeepAllSymbols,
}

impl SymbolicComputation {
    pub fn replaces_symbols(self) -> bool {
        self == SymbolicComputation::ReplaceDefinedSymbols
    }

    pub fn replaces_functions(self) -> bool {
        matches!(
            self,
            SymbolicComputation::ReplaceDefinedSymbols | SymbolicComputation::ReplaceDefinedFunctions
        )
    }
}

/// Settings read, never owned, by the reduction passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectionContext {
    pub complex_format: ComplexFormat,
    pub angle_unit: AngleUnit,
    pub unit_format: UnitFormat,
    pub strategy: Strategy,
    pub symbolic_computation: SymbolicComputation,
}

impl ProjectionContext {
    pub fn with_strategy(self, strategy: Strategy) -> Self {
        Self { strategy, ..self }
    }

    pub fn with_angle_unit(self, angle_unit: AngleUnit) -> Self {
        Self { angle_unit, ..self }
    }

    pub fn with_symbolic_computation(self, symbolic_computation: SymbolicComputation) -> Self {
        Self {
            symbolic_computation,
            ..self
        }
    }

    #[inline]
    pub fn is_real(&self) -> bool {
        self.complex_format == ComplexFormat::Real
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_file() {
        let ctx: ProjectionContext = toml::from_str(
            r#"
            angle_unit = "degree"
            strategy = "approximate_to_float"
            symbolic_computation = "keep_all_symbols"
            "#,
        )
        .unwrap();
        assert_eq!(ctx.angle_unit, AngleUnit::Degree);
        assert_eq!(ctx.strategy, Strategy::ApproximateToFloat);
        assert_eq!(ctx.complex_format, ComplexFormat::Real);
        assert_eq!(ctx.symbolic_computation, SymbolicComputation::KeepAllSymbols);
    }

    #[test]
    fn strategies_are_ordered_by_cost() {
        assert!(Strategy::Default < Strategy::NumbersToFloat);
        assert!(Strategy::NumbersToFloat < Strategy::ApproximateToFloat);
        assert!(!Strategy::Default.is_float());
    }

    #[test]
    fn angle_factors() {
        assert!(AngleUnit::Radian.to_radians_factor().is_none());
        let factor = AngleUnit::Degree.to_radians_factor().unwrap();
        assert_eq!(factor, mult([pi(), pow(int(180), int(-1))]));
        assert!((AngleUnit::Gradian.radians_per_unit() - std::f64::consts::PI / 200.0).abs() < 1e-15);
    }
}
