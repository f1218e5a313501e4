//! Reference solid-rocket simulator
//!
//! Internal-burning cylindrical grain, quasi-steady chamber pressure, conical
//! nozzle, vertical flight through a standard atmosphere. The engine phase is
//! integrated with the engine integrator until the web burns out, the coast
//! phase with the trajectory integrator until the vertical speed drops to zero.

use super::config::{Integrator, SimulationConfig};
use super::{SimulationError, SimulationResult, Simulator};
use std::f64::consts::PI;

/// Universal gas constant (J/(mol K))
const R_UNIVERSAL: f64 = 8.314_462_618;

const SEA_LEVEL_TEMPERATURE: f64 = 288.15;
const SEA_LEVEL_PRESSURE: f64 = 101_325.0;
const LAPSE_RATE: f64 = 0.0065;
const TROPOPAUSE: f64 = 11_000.0;

/// Flows below this Reynolds number use the laminar skin-friction law
const TRANSITION_REYNOLDS: f64 = 5e5;

/// Pressure and base drag coefficient below the transonic rise
const SUBSONIC_DRAG: f64 = 0.3;
const PEAK_WAVE_DRAG: f64 = 0.6;

/// Vertical-flight solid rocket motor and vehicle model
#[derive(Clone, Debug)]
pub struct SolidRocket {
    max_time: f64,
}

impl SolidRocket {
    pub fn new() -> Self {
        Self { max_time: 3600.0 }
    }

    /// Simulated-time cap; runs that have not reached apogee by then fail
    pub fn with_max_time(mut self, max_time: f64) -> Self {
        self.max_time = max_time;
        self
    }
}

impl Default for SolidRocket {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulator for SolidRocket {
    fn attempt(&self, config: &SimulationConfig) -> Result<SimulationResult, SimulationError> {
        let vehicle = Vehicle::from_config(config)?;
        let flight = vehicle.fly(config, self.max_time)?;

        let mut result = SimulationResult::with_max_height(flight.h_max);
        result.insert("t_apogee", flight.t_apogee);
        result.insert("t_burn", flight.t_burn);
        result.insert("v_burnout", flight.v_burnout);
        result.insert("h_burnout", flight.h_burnout);
        result.insert("p_max", flight.p_max);
        result.insert("m_initial", vehicle.dry_mass + vehicle.propellant_mass(0.0));
        result.insert("m_propellant", vehicle.propellant_mass(0.0));
        Ok(result)
    }
}

// ===== MODEL =====

/// Derived, per-run quantities
struct Vehicle {
    // Grain
    port_radius: f64,
    inner_radius: f64,
    length: f64,
    rho_propellant: f64,

    // Motor
    throat_area: f64,
    exit_area: f64,
    c_star: f64,
    burn_a: f64,
    burn_n: f64,
    exit_pressure_ratio: f64,
    momentum_cf: f64,
    thrust_factor: f64,

    // Vehicle
    dry_mass: f64,
    ref_area: f64,
    wetted_area: f64,
    body_length: f64,

    // Environment
    g0: f64,
    earth_radius: f64,
    ra: f64,
    air_gas_constant: f64,
    gamma_air: f64,
    viscosity_air: f64,
}

struct Flight {
    h_max: f64,
    t_apogee: f64,
    t_burn: f64,
    v_burnout: f64,
    h_burnout: f64,
    p_max: f64,
}

impl Vehicle {
    fn from_config(config: &SimulationConfig) -> Result<Self, SimulationError> {
        let p = &config.params;
        let c = &config.constants;

        let inner_radius = p.r - p.t_chamber;
        if inner_radius <= p.r0 {
            return Err(SimulationError::InvalidConfiguration(format!(
                "no propellant: port radius {} >= chamber inner radius {}",
                p.r0, inner_radius
            )));
        }
        if p.rg >= inner_radius {
            return Err(SimulationError::InvalidConfiguration(format!(
                "throat radius {} does not fit chamber inner radius {}",
                p.rg, inner_radius
            )));
        }
        if p.rs <= p.rg {
            return Err(SimulationError::InvalidConfiguration(
                "nozzle exit radius must exceed throat radius".into(),
            ));
        }
        if p.alpha >= 90.0 {
            return Err(SimulationError::InvalidConfiguration(format!(
                "cone half-angle {} deg is not below 90 deg",
                p.alpha
            )));
        }
        if c.n >= 1.0 || c.gamma <= 1.0 || c.gamma_air <= 1.0 {
            return Err(SimulationError::InvalidConfiguration(
                "burn exponent must be < 1 and gas gammas > 1".into(),
            ));
        }

        let gamma = c.gamma;
        let gas_constant = R_UNIVERSAL / c.m_molar;
        let vandenkerckhove =
            gamma.sqrt() * (2.0 / (gamma + 1.0)).powf((gamma + 1.0) / (2.0 * (gamma - 1.0)));
        let c_star = (gas_constant * c.tc).sqrt() / vandenkerckhove;

        let throat_area = PI * p.rg * p.rg;
        let exit_area = PI * p.rs * p.rs;
        let exit_mach = supersonic_mach(exit_area / throat_area, gamma);
        let exit_pressure_ratio =
            (1.0 + 0.5 * (gamma - 1.0) * exit_mach * exit_mach).powf(-gamma / (gamma - 1.0));
        let momentum_cf = vandenkerckhove
            * (2.0 * gamma / (gamma - 1.0)
                * (1.0 - exit_pressure_ratio.powf((gamma - 1.0) / gamma)))
            .sqrt();

        let alpha = p.alpha.to_radians();
        let divergence = 0.5 * (1.0 + alpha.cos());

        let chamber_mass = c.rho_c * PI * (p.r * p.r - inner_radius * inner_radius) * p.l
            + c.rho_c * PI * p.r * p.r * p.t_chamber;
        let slant = (p.rs - p.rg) / alpha.sin();
        let cone_mass = c.rho_cone * PI * (p.rg + p.rs) * slant * p.t_cone;
        let body_length = p.l + (p.rs - p.rg) / alpha.tan();

        Ok(Self {
            port_radius: p.r0,
            inner_radius,
            length: p.l,
            rho_propellant: c.rho_pr,
            throat_area,
            exit_area,
            c_star,
            burn_a: c.a,
            burn_n: c.n,
            exit_pressure_ratio,
            momentum_cf,
            thrust_factor: c.rend * divergence,
            dry_mass: chamber_mass + cone_mass + p.mpl,
            ref_area: PI * p.r * p.r,
            wetted_area: 2.0 * PI * p.r * body_length,
            body_length,
            g0: c.g0,
            earth_radius: c.re,
            ra: c.ra,
            air_gas_constant: R_UNIVERSAL / c.m_molar_air,
            gamma_air: c.gamma_air,
            viscosity_air: c.viscosity_air,
        })
    }

    fn web(&self) -> f64 {
        self.inner_radius - self.port_radius
    }

    fn propellant_mass(&self, burned: f64) -> f64 {
        let port = (self.port_radius + burned).min(self.inner_radius);
        self.rho_propellant * PI * (self.inner_radius.powi(2) - port.powi(2)) * self.length
    }

    /// Quasi-steady chamber pressure for the current port radius
    fn chamber_pressure(&self, burned: f64) -> f64 {
        let burning_area = 2.0 * PI * (self.port_radius + burned) * self.length;
        (self.burn_a * self.rho_propellant * burning_area * self.c_star / self.throat_area)
            .powf(1.0 / (1.0 - self.burn_n))
    }

    fn thrust(&self, chamber_pressure: f64, ambient_pressure: f64) -> f64 {
        let pressure_cf =
            (self.exit_pressure_ratio - ambient_pressure / chamber_pressure) * self.exit_area
                / self.throat_area;
        let cf = self.momentum_cf + pressure_cf;
        (self.thrust_factor * cf * chamber_pressure * self.throat_area).max(0.0)
    }

    fn gravity(&self, h: f64) -> f64 {
        let ratio = self.earth_radius / (self.earth_radius + h.max(0.0));
        self.g0 * ratio * ratio
    }

    fn drag(&self, h: f64, v: f64) -> f64 {
        let air = self.atmosphere(h);
        let speed = v.abs();
        let mach = speed / air.speed_of_sound;

        let reynolds = (air.density * speed * self.body_length / self.viscosity_air).max(1.0);
        let skin = if reynolds < TRANSITION_REYNOLDS {
            1.328 / reynolds.sqrt()
        } else {
            0.455 / reynolds.log10().powf(2.58)
        };

        let cd = wave_drag(mach) + skin * self.wetted_area / self.ref_area;
        0.5 * air.density * speed * v * cd * self.ref_area
    }

    fn atmosphere(&self, h: f64) -> Air {
        let h = h.max(0.0);
        let exponent = self.g0 / (self.ra * LAPSE_RATE);
        let (temperature, pressure) = if h < TROPOPAUSE {
            let t = SEA_LEVEL_TEMPERATURE - LAPSE_RATE * h;
            (t, SEA_LEVEL_PRESSURE * (t / SEA_LEVEL_TEMPERATURE).powf(exponent))
        } else {
            let t = SEA_LEVEL_TEMPERATURE - LAPSE_RATE * TROPOPAUSE;
            let p11 = SEA_LEVEL_PRESSURE * (t / SEA_LEVEL_TEMPERATURE).powf(exponent);
            (t, p11 * (-self.g0 * (h - TROPOPAUSE) / (self.ra * t)).exp())
        };

        Air {
            pressure,
            density: pressure / (self.ra * temperature),
            speed_of_sound: (self.gamma_air * self.air_gas_constant * temperature).sqrt(),
        }
    }

    /// Engine-phase derivative of [h, v, burned web]
    fn powered(&self, y: &[f64; 3], pad: bool) -> [f64; 3] {
        let [h, v, burned] = *y;
        let pc = self.chamber_pressure(burned);
        let mass = self.dry_mass + self.propellant_mass(burned);
        let thrust = self.thrust(pc, self.atmosphere(h).pressure);

        let mut accel = (thrust - self.drag(h, v)) / mass - self.gravity(h);
        if pad && accel < 0.0 {
            accel = 0.0;
        }

        [v, accel, self.burn_a * pc.powf(self.burn_n)]
    }

    /// Coast-phase derivative of [h, v]
    fn coasting(&self, y: &[f64; 2], mass: f64) -> [f64; 2] {
        let [h, v] = *y;
        [v, -self.drag(h, v) / mass - self.gravity(h)]
    }

    fn fly(&self, config: &SimulationConfig, max_time: f64) -> Result<Flight, SimulationError> {
        let solvers = &config.solvers;
        let initial = &config.initial;
        if !(solvers.dt_engine > 0.0 && solvers.dt_trayectory > 0.0) {
            return Err(SimulationError::InvalidConfiguration(
                "time steps must be positive".into(),
            ));
        }

        let web = self.web();
        let mut t = initial.t0;
        let mut y = [initial.h0, initial.v0, 0.0];
        let mut p_max = self.chamber_pressure(0.0);

        // Engine phase
        while y[2] < web {
            let pad = y[0] <= initial.h0 && y[1] <= 0.0;
            y = integrate(solvers.solver_engine, solvers.dt_engine, &y, |s| {
                self.powered(s, pad)
            });
            t += solvers.dt_engine;

            if pad && y[0] < initial.h0 {
                y[0] = initial.h0;
                y[1] = 0.0;
            }
            check_finite(&y, t)?;
            p_max = p_max.max(self.chamber_pressure(y[2].min(web)));
            if t - initial.t0 > max_time {
                return Err(SimulationError::Diverged(format!(
                    "motor still burning after {max_time} s"
                )));
            }
        }

        let t_burn = t - initial.t0;
        let (h_burnout, v_burnout) = (y[0], y[1]);
        let burnout_mass = self.dry_mass;

        // Coast phase, stopping at apogee
        let mut state = [y[0], y[1]];
        let mut h_max = state[0];
        while state[1] > 0.0 {
            state = integrate(solvers.solver_trayectory, solvers.dt_trayectory, &state, |s| {
                self.coasting(s, burnout_mass)
            });
            t += solvers.dt_trayectory;

            check_finite(&state, t)?;
            h_max = h_max.max(state[0]);
            if t - initial.t0 > max_time {
                return Err(SimulationError::Diverged(format!(
                    "apogee not reached after {max_time} s"
                )));
            }
        }

        Ok(Flight {
            h_max,
            t_apogee: t - initial.t0,
            t_burn,
            v_burnout,
            h_burnout,
            p_max,
        })
    }
}

struct Air {
    pressure: f64,
    density: f64,
    speed_of_sound: f64,
}

/// Pressure and base drag with a transonic rise between Mach 0.8 and 1.1
fn wave_drag(mach: f64) -> f64 {
    if mach < 0.8 {
        SUBSONIC_DRAG
    } else if mach < 1.1 {
        SUBSONIC_DRAG + (PEAK_WAVE_DRAG - SUBSONIC_DRAG) * (mach - 0.8) / 0.3
    } else {
        (PEAK_WAVE_DRAG / (mach / 1.1).sqrt()).max(SUBSONIC_DRAG)
    }
}

/// Supersonic Mach number for a nozzle area ratio, by bisection
fn supersonic_mach(area_ratio: f64, gamma: f64) -> f64 {
    let ratio_at = |m: f64| {
        let base = 2.0 / (gamma + 1.0) * (1.0 + 0.5 * (gamma - 1.0) * m * m);
        base.powf((gamma + 1.0) / (2.0 * (gamma - 1.0))) / m
    };

    let (mut lo, mut hi) = (1.0, 50.0);
    for _ in 0..100 {
        let mid = 0.5 * (lo + hi);
        if ratio_at(mid) < area_ratio {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// One fixed step of the selected scheme for an autonomous system
fn integrate<const N: usize>(
    integrator: Integrator,
    dt: f64,
    y: &[f64; N],
    f: impl Fn(&[f64; N]) -> [f64; N],
) -> [f64; N] {
    let offset = |base: &[f64; N], k: &[f64; N], scale: f64| {
        let mut out = *base;
        for (o, k) in out.iter_mut().zip(k) {
            *o += scale * k;
        }
        out
    };

    match integrator {
        Integrator::Euler => offset(y, &f(y), dt),
        Integrator::Rk4 => {
            let k1 = f(y);
            let k2 = f(&offset(y, &k1, 0.5 * dt));
            let k3 = f(&offset(y, &k2, 0.5 * dt));
            let k4 = f(&offset(y, &k3, dt));

            let mut out = *y;
            for i in 0..N {
                out[i] += dt / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
            }
            out
        }
    }
}

fn check_finite(state: &[f64], t: f64) -> Result<(), SimulationError> {
    if state.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(SimulationError::Diverged(format!(
            "non-finite state {state:?} at t = {t:.4} s"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{INITIAL_GUESS, ParameterVector, validate};
    use crate::simulation::{MAX_HEIGHT, assemble};
    use approx::assert_relative_eq;

    fn default_config() -> SimulationConfig {
        assemble(&validate(&ParameterVector::from(INITIAL_GUESS)))
    }

    #[test]
    fn mach_solver_inverts_area_ratio() {
        let gamma = 1.4;
        // Tabulated isentropic value: A/A* = 1.6875 at M = 2
        assert_relative_eq!(supersonic_mach(1.6875, gamma), 2.0, epsilon = 1e-3);
        assert_relative_eq!(supersonic_mach(1.0, gamma), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn euler_and_rk4_agree_on_linear_growth() {
        let f = |y: &[f64; 1]| [2.0 * y[0]];
        let euler = integrate(Integrator::Euler, 0.1, &[1.0], f);
        let rk4 = integrate(Integrator::Rk4, 0.1, &[1.0], f);
        assert_relative_eq!(euler[0], 1.2);
        assert_relative_eq!(rk4[0], 0.2_f64.exp(), epsilon = 1e-5);
    }

    #[test]
    fn atmosphere_matches_sea_level() {
        let vehicle = Vehicle::from_config(&default_config()).unwrap();
        let air = vehicle.atmosphere(0.0);
        assert_relative_eq!(air.pressure, SEA_LEVEL_PRESSURE);
        assert_relative_eq!(air.density, 1.225, epsilon = 2e-3);
        assert_relative_eq!(air.speed_of_sound, 340.3, epsilon = 0.5);
        assert!(vehicle.atmosphere(20_000.0).density < 0.1);
    }

    #[test]
    fn default_design_reaches_positive_apogee() {
        let result = SolidRocket::new().attempt(&default_config()).unwrap();
        let h_max = result.get(MAX_HEIGHT).unwrap();

        assert!(h_max > 0.0, "h_max = {h_max}");
        assert!(result.get("t_apogee").unwrap() > result.get("t_burn").unwrap());
        assert!(result.get("m_initial").unwrap() > result.get("m_propellant").unwrap());
        assert!(result.get("p_max").unwrap() > SEA_LEVEL_PRESSURE);
    }

    #[test]
    fn heavier_payload_flies_lower() {
        let light = SolidRocket::new().attempt(&default_config()).unwrap();

        let mut heavy = ParameterVector::from(INITIAL_GUESS);
        heavy.mpl = 2.0;
        let heavy = SolidRocket::new()
            .attempt(&assemble(&validate(&heavy)))
            .unwrap();

        assert!(heavy.max_height().unwrap() < light.max_height().unwrap());
    }

    #[test]
    fn chamber_without_propellant_is_rejected() {
        let mut p = ParameterVector::from(INITIAL_GUESS);
        p.r0 = 0.049;
        let err = SolidRocket::new().attempt(&assemble(&validate(&p))).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidConfiguration(_)));
    }

    #[test]
    fn oversized_throat_is_rejected() {
        let mut p = ParameterVector::from(INITIAL_GUESS);
        p.rg = 0.049;
        p.rs = 0.05;
        let err = SolidRocket::new().attempt(&assemble(&validate(&p))).unwrap_err();
        assert!(matches!(err, SimulationError::InvalidConfiguration(_)));
    }

    #[test]
    fn time_cap_reports_divergence() {
        let err = SolidRocket::new()
            .with_max_time(0.01)
            .attempt(&default_config())
            .unwrap_err();
        assert!(matches!(err, SimulationError::Diverged(_)));
    }
}
