//! Eight-species network with receptor trafficking and PLCg.

use super::MOLEC_TO_NM;

pub const NUM_COMPONENTS: usize = 8;
pub const G_INT: usize = 0;
pub const T_EXT: usize = 1;
pub const E_MEM: usize = 2;
pub const TE_MEM: usize = 3;
pub const TE_MEM_P: usize = 4;
pub const TE_CYTO: usize = 5;
pub const P_INACTIVE: usize = 6;
pub const P_ACTIVE: usize = 7;

pub const NAMES: [&str; NUM_COMPONENTS] = [
    "glucose_internal",
    "tgfa_extracellular",
    "egfr_membrane",
    "tgfa_egfr_membrane_inactive",
    "tgfa_egfr_membrane_active",
    "tgfa_egfr_cytoplasmic",
    "plcg_inactive",
    "plcg_active",
];

const MEMBRANE: f64 = 25.0;
const PLCG: f64 = 1.0;
const K1: f64 = 0.003;
const K_1: f64 = 0.0038;
const K2: f64 = 0.001;
const K_2: f64 = 0.000001;
const K3: f64 = 0.00005;
const K4: f64 = 0.00005;
const K5: f64 = 0.01;
const K6: f64 = 0.0001;
const K7: f64 = 0.01;
const K8: f64 = 0.1;
const K9: f64 = 0.05;
const K10: f64 = 5.0 / MOLEC_TO_NM / 60.0;
const K11: f64 = 5.0 / MOLEC_TO_NM / 60.0;
const WG: f64 = 200.0;
const WP: f64 = 5.0;
const WC: f64 = 1.0;

pub fn initial() -> Vec<f64> {
    let mut y = vec![0.0; NUM_COMPONENTS];
    y[E_MEM] = MEMBRANE;
    y[P_INACTIVE] = K9 / (K8 + K9) * PLCG;
    y[P_ACTIVE] = K8 / (K8 + K9) * PLCG;
    y
}

pub fn derivatives(_t: f64, y: &[f64]) -> Vec<f64> {
    let w_g = 1.0 + y[G_INT] / (WG + y[G_INT]);
    let w_p = 1.0 + y[TE_MEM_P] / (WP + y[TE_MEM_P]);
    let w_c = 1.0 + y[P_ACTIVE] / (WC + y[P_ACTIVE]);

    let mut dydt = vec![0.0; NUM_COMPONENTS];
    dydt[T_EXT] = K_1 * y[TE_MEM] - K1 * y[T_EXT] * y[E_MEM] - K7 * y[T_EXT] + K11;
    dydt[E_MEM] = K_1 * y[TE_MEM] - K1 * y[T_EXT] * y[E_MEM] - K6 * y[E_MEM] + K10;
    dydt[TE_MEM] = 2.0 * K1 * y[T_EXT] * y[E_MEM] - 2.0 * K_1 * y[TE_MEM] - K2 * y[TE_MEM] * w_g
        + K_2 * y[TE_MEM_P] * w_c
        - K3 * y[TE_MEM];
    dydt[TE_MEM_P] = K2 * y[TE_MEM] * w_g - K_2 * y[TE_MEM_P] * w_c - K4 * y[TE_MEM_P];
    dydt[TE_CYTO] = K3 * y[TE_MEM] + K4 * y[TE_MEM_P] - K5 * y[TE_CYTO];
    dydt[P_INACTIVE] = K9 * y[P_ACTIVE] - K8 * (PLCG - y[P_ACTIVE]) * w_p;
    dydt[P_ACTIVE] = K8 * (PLCG - y[P_ACTIVE]) * w_p - K9 * y[P_ACTIVE];
    dydt
}
