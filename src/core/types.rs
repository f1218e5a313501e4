use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of design parameters searched by the optimizer.
pub const NUM_PARAMS: usize = 9;

/// Field names in vector order, as the simulator expects them.
pub const PARAM_NAMES: [&str; NUM_PARAMS] =
    ["R", "R0", "Rg", "Rs", "L", "t_chamber", "t_cone", "alpha", "Mpl"];

// ===== PARAMETER VECTOR =====

/// Rocket design parameters, in the order the optimizer sees them.
///
/// Lengths are in meters, `alpha` in degrees and `mpl` in kilograms.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParameterVector {
    /// Outer chamber radius
    #[serde(rename = "R")]
    pub r: f64,
    /// Throat/inlet (grain port) radius
    #[serde(rename = "R0")]
    pub r0: f64,
    /// Nozzle throat radius
    #[serde(rename = "Rg")]
    pub rg: f64,
    /// Nozzle exit radius
    #[serde(rename = "Rs")]
    pub rs: f64,
    /// Chamber length
    #[serde(rename = "L")]
    pub l: f64,
    pub t_chamber: f64,
    pub t_cone: f64,
    /// Cone half-angle in degrees
    pub alpha: f64,
    /// Payload mass
    #[serde(rename = "Mpl")]
    pub mpl: f64,
}

impl ParameterVector {
    pub fn to_array(&self) -> [f64; NUM_PARAMS] {
        [
            self.r,
            self.r0,
            self.rg,
            self.rs,
            self.l,
            self.t_chamber,
            self.t_cone,
            self.alpha,
            self.mpl,
        ]
    }

    /// Build from an optimizer iterate. Returns `None` if the length is not 9.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        let values: [f64; NUM_PARAMS] = values.try_into().ok()?;
        Some(Self::from(values))
    }

    /// Named view of the fields, in vector order
    pub fn named(&self) -> impl Iterator<Item = (&'static str, f64)> {
        PARAM_NAMES.into_iter().zip(self.to_array())
    }

    pub fn is_within(&self, bounds: &Bounds) -> bool {
        self.to_array()
            .iter()
            .zip(bounds.as_slice())
            .all(|(&v, &(min, max))| v >= min && v <= max)
    }
}

impl From<[f64; NUM_PARAMS]> for ParameterVector {
    fn from(v: [f64; NUM_PARAMS]) -> Self {
        Self {
            r: v[0],
            r0: v[1],
            rg: v[2],
            rs: v[3],
            l: v[4],
            t_chamber: v[5],
            t_cone: v[6],
            alpha: v[7],
            mpl: v[8],
        }
    }
}

impl From<ParameterVector> for Vec<f64> {
    fn from(p: ParameterVector) -> Self {
        p.to_array().to_vec()
    }
}

impl Default for ParameterVector {
    /// The fixed starting design
    fn default() -> Self {
        Self::from(INITIAL_GUESS)
    }
}

impl fmt::Display for ParameterVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.named().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name} = {value:.6e}")?;
        }
        Ok(())
    }
}

/// Starting design: 5 cm chamber, 40 cm long, 110 g payload.
pub const INITIAL_GUESS: [f64; NUM_PARAMS] = [0.05, 0.005, 0.005, 0.006, 0.4, 0.002, 0.002, 20.0, 0.11];

// ===== BOUNDS =====

/// Per-parameter (min, max) search box.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<(f64, f64)>", into = "Vec<(f64, f64)>")]
pub struct Bounds([(f64, f64); NUM_PARAMS]);

impl Bounds {
    pub fn new(bounds: [(f64, f64); NUM_PARAMS]) -> Self {
        Self(bounds)
    }

    pub fn as_slice(&self) -> &[(f64, f64)] {
        &self.0
    }

    pub fn lower(&self, index: usize) -> f64 {
        self.0[index].0
    }

    pub fn upper(&self, index: usize) -> f64 {
        self.0[index].1
    }

    /// Clamp each component into its box
    pub fn clamp(&self, params: &mut [f64]) {
        for (p, &(min, max)) in params.iter_mut().zip(self.0.iter()) {
            *p = p.clamp(min, max);
        }
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self([
            (0.01, 0.1),   // R (m)
            (0.001, 0.05), // R0 (m)
            (0.001, 0.05), // Rg (m)
            (0.001, 0.05), // Rs (m)
            (0.05, 0.5),   // L (m)
            (0.001, 0.01), // t_chamber (m)
            (0.001, 0.01), // t_cone (m)
            (5.0, 30.0),   // alpha (deg)
            (0.1, 5.0),    // Mpl (kg)
        ])
    }
}

impl TryFrom<Vec<(f64, f64)>> for Bounds {
    type Error = String;

    fn try_from(v: Vec<(f64, f64)>) -> Result<Self, Self::Error> {
        let len = v.len();
        let bounds: [(f64, f64); NUM_PARAMS] = v
            .try_into()
            .map_err(|_| format!("expected {NUM_PARAMS} bounds, got {len}"))?;

        for (name, &(min, max)) in PARAM_NAMES.iter().zip(bounds.iter()) {
            if !(min.is_finite() && max.is_finite()) || min > max {
                return Err(format!("invalid bounds for {name}: ({min}, {max})"));
            }
        }

        Ok(Self(bounds))
    }
}

impl From<Bounds> for Vec<(f64, f64)> {
    fn from(b: Bounds) -> Self {
        b.0.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_guess_is_inside_default_bounds() {
        assert!(ParameterVector::default().is_within(&Bounds::default()));
    }

    #[test]
    fn from_slice_rejects_wrong_length() {
        assert!(ParameterVector::from_slice(&[1.0; 8]).is_none());
        assert!(ParameterVector::from_slice(&INITIAL_GUESS).is_some());
    }

    #[test]
    fn serializes_with_simulator_names() {
        let json = serde_json::to_value(ParameterVector::default()).unwrap();
        for name in PARAM_NAMES {
            assert!(json.get(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn bounds_reject_inverted_pairs() {
        let mut pairs: Vec<(f64, f64)> = Bounds::default().into();
        pairs[4] = (0.5, 0.05);
        let err = Bounds::try_from(pairs).unwrap_err();
        assert!(err.contains("L"));
    }

    #[test]
    fn clamp_pulls_values_into_box() {
        let bounds = Bounds::default();
        let mut params = [1.0; NUM_PARAMS];
        bounds.clamp(&mut params);
        assert_eq!(params[0], 0.1);
        assert_eq!(params[7], 5.0);
    }
}
