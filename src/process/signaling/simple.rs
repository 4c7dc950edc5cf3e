//! Five-species TGFa/EGFR/PLCg network.

use super::MOLEC_TO_NM;

pub const NUM_COMPONENTS: usize = 5;
pub const G_INT: usize = 0;
pub const T_EXT: usize = 1;
pub const TE_CYTO: usize = 2;
pub const P_INACTIVE: usize = 3;
pub const P_ACTIVE: usize = 4;

pub const NAMES: [&str; NUM_COMPONENTS] =
    ["glucose_internal", "tgfa_extracellular", "tgfa_egfr_cytoplasmic", "plcg_inactive", "plcg_active"];

const PLCG: f64 = 1.0;
const K1: f64 = 0.003;
const K2: f64 = 0.0001;
const K3: f64 = 0.01;
const K4: f64 = 0.1;
const K5: f64 = 0.05;
const K6: f64 = 5.0 / MOLEC_TO_NM / 60.0;
const WG: f64 = 200.0;
const WP: f64 = 5.0;
const WC: f64 = 1.0;

pub fn initial() -> Vec<f64> {
    let mut y = vec![0.0; NUM_COMPONENTS];
    y[P_INACTIVE] = K5 / (K4 + K5) * PLCG;
    y[P_ACTIVE] = K4 / (K4 + K5) * PLCG;
    y
}

pub fn derivatives(_t: f64, y: &[f64]) -> Vec<f64> {
    let w_g = 1.0 + y[G_INT] / (WG + y[G_INT]);
    let w_p = 1.0 + y[TE_CYTO] / (WP + y[TE_CYTO]);
    let w_c = 1.0 - y[P_ACTIVE] / (WC + y[P_ACTIVE]);

    let mut dydt = vec![0.0; NUM_COMPONENTS];
    dydt[T_EXT] = K6 - K1 * y[T_EXT] * w_g * w_c - K3 * y[T_EXT];
    dydt[TE_CYTO] = K1 * y[T_EXT] * w_g * w_c - K2 * y[TE_CYTO];
    dydt[P_INACTIVE] = K5 * y[P_ACTIVE] - K4 * (PLCG - y[P_ACTIVE]) * w_p;
    dydt[P_ACTIVE] = K4 * (PLCG - y[P_ACTIVE]) * w_p - K5 * y[P_ACTIVE];
    dydt
}

/// Fixed point of the network for a clamped internal glucose concentration [nM],
/// including the autocrine extracellular TGFa it settles at.
pub fn steady_state(glucose_nm: f64) -> Vec<f64> {
    let w_g = 1.0 + glucose_nm / (WG + glucose_nm);
    let mut w_p = 1.0;
    let mut y = initial();
    y[G_INT] = glucose_nm;
    for _ in 0..500 {
        let p = K4 * w_p / (K4 * w_p + K5) * PLCG;
        let w_c = 1.0 - p / (WC + p);
        let t = K6 / (K1 * w_g * w_c + K3);
        let te = K1 * t * w_g * w_c / K2;
        let next = 1.0 + te / (WP + te);
        y[T_EXT] = t;
        y[TE_CYTO] = te;
        y[P_ACTIVE] = p;
        y[P_INACTIVE] = PLCG - p;
        if (next - w_p).abs() < 1e-16 {
            break;
        }
        w_p = next;
    }
    y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steady_state_has_vanishing_derivatives() {
        let y = steady_state(0.0);
        let dydt = derivatives(0.0, &y);
        for (i, d) in dydt.iter().enumerate() {
            assert!(d.abs() < 1e-12, "{} drifts at {}", NAMES[i], d);
        }
    }
}
