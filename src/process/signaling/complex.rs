//! Thirteen-species EGFR/TGFa cascade with transcription and a nucleotide pool.

use super::MOLEC_TO_NM;

pub const NUM_COMPONENTS: usize = 13;
pub const G_INT: usize = 0;
pub const T_EXT: usize = 1;
pub const E_MEM: usize = 2;
pub const TE_MEM: usize = 3;
pub const TE_MEM_P: usize = 4;
pub const TE_CYTO: usize = 5;
pub const E_CYTO: usize = 6;
pub const T_CYTO: usize = 7;
pub const E_RNA: usize = 8;
pub const T_RNA: usize = 9;
pub const P_INACTIVE: usize = 10;
pub const P_ACTIVE: usize = 11;
pub const POOL: usize = 12;

pub const NAMES: [&str; NUM_COMPONENTS] = [
    "glucose_internal",
    "tgfa_extracellular",
    "egfr_membrane",
    "tgfa_egfr_membrane_inactive",
    "tgfa_egfr_membrane_active",
    "tgfa_egfr_cytoplasmic",
    "egfr_cytoplasmic",
    "tgfa_cytoplasmic",
    "egfr_rna",
    "tgfa_rna",
    "plcg_inactive",
    "plcg_active",
    "nucleotide_pool",
];

const MEMBRANE: f64 = 25.0;
const CYTOPLASM: f64 = 5.0;
const PLCG: f64 = 1.0;
const NUCLEOTIDES: f64 = 5.0;

const K1: f64 = 0.003;
const K_1: f64 = 0.0038;
const K2: f64 = 0.001;
const K_2: f64 = 0.000001;
const K3: f64 = 0.00005;
const K4: f64 = 0.00005;
const K5: f64 = 0.01;
const K_5: f64 = 0.000014;
const K6: f64 = 0.000167;
const K7: f64 = 0.000167;
const K8: f64 = 0.005;
const K_8: f64 = 0.00005;
const K9: f64 = 1.0;
const K10: f64 = 0.0001;
const K11: f64 = 0.01;
const K12: f64 = 0.1;
const K13: f64 = 0.05;
const K14: f64 = 5.0 / MOLEC_TO_NM / 60.0 / NUCLEOTIDES;
const K15: f64 = 5.0 / MOLEC_TO_NM / 60.0 / NUCLEOTIDES;
const K16: f64 = 2.17 / MOLEC_TO_NM / 60.0 / NUCLEOTIDES;
const K17: f64 = 12.0 / MOLEC_TO_NM / 60.0 / NUCLEOTIDES;
const K18: f64 = 0.0012 / MOLEC_TO_NM / 60.0 / NUCLEOTIDES;
const K19: f64 = 0.0012 / MOLEC_TO_NM / 60.0 / NUCLEOTIDES;
const WG: f64 = 200.0;
const WE: f64 = 2.0;
const WT: f64 = 2.0;
const WP: f64 = 5.0;
const WC: f64 = 1.0;

pub fn initial() -> Vec<f64> {
    let mut y = vec![0.0; NUM_COMPONENTS];
    y[E_MEM] = MEMBRANE;
    y[T_CYTO] = CYTOPLASM;
    y[E_CYTO] = CYTOPLASM;
    y[E_RNA] = NUCLEOTIDES / 2.0;
    y[T_RNA] = NUCLEOTIDES / 2.0;
    y[P_INACTIVE] = K13 / (K12 + K13) * PLCG;
    y[P_ACTIVE] = K12 / (K12 + K13) * PLCG;
    y[POOL] = NUCLEOTIDES;
    y
}

pub fn derivatives(_t: f64, y: &[f64]) -> Vec<f64> {
    let w_g = 1.0 + y[G_INT] / (WG + y[G_INT]);
    let w_e = 1.0 - y[TE_MEM_P] / (WE + y[TE_MEM_P]);
    let w_t = 1.0 + y[TE_MEM_P] / (WT + y[TE_MEM_P]);
    let w_p = 1.0 + y[TE_MEM_P] / (WP + y[TE_MEM_P]);
    let w_c = 1.0 + y[P_ACTIVE] / (WC + y[P_ACTIVE]);

    let mut dydt = vec![0.0; NUM_COMPONENTS];
    dydt[T_EXT] = K_1 * y[TE_MEM] - K1 * y[T_EXT] * y[E_MEM] + K9 * y[T_CYTO] - K11 * y[T_EXT];
    dydt[E_MEM] =
        K_1 * y[TE_MEM] - K1 * y[T_EXT] * y[E_MEM] + K8 * y[E_CYTO] - K_8 * y[E_MEM] - K10 * y[E_MEM];
    dydt[TE_MEM] = 2.0 * K1 * y[T_EXT] * y[E_MEM] - 2.0 * K_1 * y[TE_MEM] - K2 * y[TE_MEM] * w_g
        + K_2 * y[TE_MEM_P] * w_c
        - K3 * y[TE_MEM];
    dydt[TE_MEM_P] = K2 * y[TE_MEM] * w_g - K_2 * y[TE_MEM_P] * w_c - K4 * y[TE_MEM_P];
    dydt[TE_CYTO] =
        K3 * y[TE_MEM] + K4 * y[TE_MEM_P] + 2.0 * K_5 * y[E_CYTO] * y[T_CYTO] - 2.0 * K5 * y[TE_CYTO];
    dydt[E_CYTO] = K5 * y[TE_CYTO] - K_5 * y[E_CYTO] * y[T_CYTO] + K14 * y[E_RNA]
        - K6 * y[E_CYTO]
        - K8 * y[E_CYTO]
        + K_8 * y[E_MEM];
    dydt[T_CYTO] =
        K5 * y[TE_CYTO] - K_5 * y[E_CYTO] * y[T_CYTO] + K15 * y[T_RNA] - K7 * y[T_CYTO] - K9 * y[T_CYTO];
    dydt[E_RNA] = K16 * y[POOL] * w_e - K18 * y[E_RNA];
    dydt[T_RNA] = K17 * y[POOL] * w_t - K19 * y[T_RNA];
    dydt[P_INACTIVE] = K13 * y[P_ACTIVE] - K12 * (PLCG - y[P_ACTIVE]) * w_p;
    dydt[P_ACTIVE] = K12 * (PLCG - y[P_ACTIVE]) * w_p - K13 * y[P_ACTIVE];
    dydt[POOL] = -K16 * y[POOL] * w_e - K17 * y[POOL] * w_t + K18 * y[E_RNA] + K19 * y[T_RNA];
    dydt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plcg_starts_at_its_own_equilibrium() {
        let y = initial();
        let dydt = derivatives(0.0, &y);
        assert!(dydt[P_ACTIVE].abs() < 1e-15);
        assert!((y[P_ACTIVE] + y[P_INACTIVE] - PLCG).abs() < 1e-15);
    }
}
