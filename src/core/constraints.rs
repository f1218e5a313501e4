use super::types::ParameterVector;

/// Smallest admissible value for any design parameter, and the minimum
/// margin by which the nozzle exit radius must exceed the throat radius.
pub const EPSILON: f64 = 1e-6;

/// Clamp a raw design to the physically feasible region
///
/// Every field is floored to `EPSILON`, then the exit radius is floored to
/// `rg + EPSILON`. Nothing else is touched, so applying it twice is the same
/// as applying it once. `f64::max` returns the floor for NaN inputs.
pub fn validate(params: &ParameterVector) -> ParameterVector {
    let rg = params.rg.max(EPSILON);

    ParameterVector {
        r: params.r.max(EPSILON),
        r0: params.r0.max(EPSILON),
        rg,
        rs: params.rs.max(rg + EPSILON),
        l: params.l.max(EPSILON),
        t_chamber: params.t_chamber.max(EPSILON),
        t_cone: params.t_cone.max(EPSILON),
        alpha: params.alpha.max(EPSILON),
        mpl: params.mpl.max(EPSILON),
    }
}
