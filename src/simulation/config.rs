use crate::core::ParameterVector;
use serde::{Deserialize, Serialize};

// ===== ENUMS =====

/// Fixed-step integration scheme for one simulation phase
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Integrator {
    /// Classic 4th-order Runge-Kutta
    #[serde(rename = "RK4")]
    Rk4,
    /// Explicit 1st-order Euler
    Euler,
}

impl Integrator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rk4 => "RK4",
            Self::Euler => "Euler",
        }
    }
}

/// When the simulator stops integrating the trajectory
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopCondition {
    MaxHeight,
}

impl StopCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaxHeight => "max_height",
        }
    }
}

// ===== FIXED TABLES =====

/// Propellant, material and environment constants shared by every run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicalConstants {
    /// Chamber temperature (K)
    #[serde(rename = "Tc")]
    pub tc: f64,
    /// Molar mass of combustion products (kg/mol)
    #[serde(rename = "M_molar")]
    pub m_molar: f64,
    #[serde(rename = "M_molar_air")]
    pub m_molar_air: f64,
    pub gamma: f64,
    pub gamma_air: f64,
    /// Dynamic viscosity of air (Pa s)
    pub viscosity_air: f64,
    /// Propellant density (kg/m^3)
    pub rho_pr: f64,
    pub rho_cone: f64,
    /// Chamber wall density (kg/m^3)
    pub rho_c: f64,
    /// Thrust efficiency factor
    #[serde(rename = "Rend")]
    pub rend: f64,
    /// Burn-rate coefficient in r = a * P^n
    pub a: f64,
    /// Burn-rate pressure exponent
    pub n: f64,
    /// Earth radius (m)
    #[serde(rename = "Re")]
    pub re: f64,
    pub g0: f64,
    /// Specific gas constant of air (J/(kg K))
    #[serde(rename = "Ra")]
    pub ra: f64,
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self {
            tc: 1000.0,
            m_molar: 41.98e-3,
            m_molar_air: 28.97e-3,
            gamma: 1.3,
            gamma_air: 1.4,
            viscosity_air: 1.82e-05,
            rho_pr: 1800.0,
            rho_cone: 2700.0,
            rho_c: 2700.0,
            rend: 1.0 - 0.4237,
            a: 6e-5,
            n: 0.32,
            re: 6.37e6,
            g0: 9.80665,
            ra: 287.0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialConditions {
    pub h0: f64,
    pub v0: f64,
    pub t0: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSelection {
    pub solver_engine: Integrator,
    /// Spelling matches the simulator's configuration key
    pub solver_trayectory: Integrator,
    pub dt_engine: f64,
    pub dt_trayectory: f64,
    pub stop_condition: StopCondition,
}

impl Default for SolverSelection {
    fn default() -> Self {
        Self {
            solver_engine: Integrator::Rk4,
            solver_trayectory: Integrator::Euler,
            dt_engine: 5e-5,
            dt_trayectory: 1e-3,
            stop_condition: StopCondition::MaxHeight,
        }
    }
}

/// Everything except the design parameters that goes into a simulator config
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationDefaults {
    pub constants: PhysicalConstants,
    pub initial: InitialConditions,
    pub solvers: SolverSelection,
}

// ===== ASSEMBLED CONFIG =====

/// Input to one simulator run
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationConfig {
    #[serde(flatten)]
    pub params: ParameterVector,
    #[serde(flatten)]
    pub constants: PhysicalConstants,
    #[serde(flatten)]
    pub initial: InitialConditions,
    #[serde(flatten)]
    pub solvers: SolverSelection,
}

/// Merge a validated design with the default tables
pub fn assemble(params: &ParameterVector) -> SimulationConfig {
    assemble_with(params, &SimulationDefaults::default())
}

/// Merge a validated design with caller-supplied tables
pub fn assemble_with(params: &ParameterVector, defaults: &SimulationDefaults) -> SimulationConfig {
    SimulationConfig {
        params: *params,
        constants: defaults.constants.clone(),
        initial: defaults.initial.clone(),
        solvers: defaults.solvers.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{INITIAL_GUESS, PARAM_NAMES};

    #[test]
    fn assembled_config_carries_design_and_defaults() {
        let params = ParameterVector::from(INITIAL_GUESS);
        let config = assemble(&params);

        assert_eq!(config.params, params);
        assert_eq!(config.constants.tc, 1000.0);
        assert_eq!(config.solvers.solver_engine, Integrator::Rk4);
        assert_eq!(config.solvers.dt_engine, 5e-5);
        assert_eq!(config.solvers.solver_trayectory, Integrator::Euler);
        assert_eq!(config.solvers.dt_trayectory, 1e-3);
        assert_eq!(config.initial, InitialConditions::default());
    }

    #[test]
    fn serialized_config_uses_simulator_keys() {
        let config = assemble(&ParameterVector::from(INITIAL_GUESS));
        let json = serde_json::to_value(&config).unwrap();
        let object = json.as_object().unwrap();

        let fixed = [
            "Tc", "M_molar", "M_molar_air", "gamma", "gamma_air", "viscosity_air", "rho_pr",
            "rho_cone", "rho_c", "Rend", "a", "n", "Re", "g0", "Ra", "h0", "v0", "t0",
            "solver_engine", "solver_trayectory", "dt_engine", "dt_trayectory", "stop_condition",
        ];
        for key in PARAM_NAMES.iter().chain(fixed.iter()) {
            assert!(object.contains_key(*key), "missing {key}");
        }
        assert_eq!(object.len(), PARAM_NAMES.len() + fixed.len());
        assert_eq!(object["alpha"], 20.0);
        assert_eq!(object["solver_engine"], "RK4");
        assert_eq!(object["solver_trayectory"], "Euler");
        assert_eq!(object["stop_condition"], "max_height");
    }

    #[test]
    fn efficiency_factor_matches_fixed_table() {
        let c = PhysicalConstants::default();
        assert!((c.rend - 0.5763).abs() < 1e-12);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let defaults: SimulationDefaults =
            serde_json::from_str(r#"{ "constants": { "Tc": 1500.0 } }"#).unwrap();
        assert_eq!(defaults.constants.tc, 1500.0);
        assert_eq!(defaults.constants.gamma, 1.3);
        assert_eq!(defaults.solvers, SolverSelection::default());
    }
}
