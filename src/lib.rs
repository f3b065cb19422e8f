//! Signal models for dynamic-contrast MRI.
//!
//! - [`kernel`]: convolution of input curves with canonical impulse responses
//! - [`pk`]: one-compartment transit models (trap and pass)
//! - [`signal`]: forward models from relaxation rates to MR signal, including
//!   water exchange between compartments
//! - [`conc`]: inversion of measured signal to concentration
//!
//! Every function is pure: inputs are validated up front, nothing is cached
//! between calls and independent calls can run in parallel.
//!
//! # Examples
//! ```
//! use dcmri::{SteadyState, Tissue, signal_ss};
//!
//! // two compartments with fast water exchange, calibrated on R10 = 1/s
//! let seq = SteadyState::new(5.0, 0.005, 15.0);
//! let tissue = Tissue::compartments([0.3, 0.7])
//!     .exchange(f64::INFINITY)
//!     .reference(1.0);
//! let s = signal_ss(&seq, [1.0, 1.0], &tissue).unwrap();
//! assert!((s.as_scalar().unwrap() - 5.0).abs() < 1e-9);
//! ```

mod error;

// =====================================
// Public API of dcmri
// =====================================

pub mod conc;
pub mod kernel;
pub mod pk;
pub mod signal;
pub mod value;

pub use error::*;
pub use value::{Exchange, Relax, Signal, Tissue};

pub use conc::{
    NO_SOLUTION, conc_lin, conc_lin_checked, conc_src, conc_src_checked, conc_ss,
    conc_ss_checked, conc_t2w, conc_t2w_checked,
};
pub use kernel::{Grid, biexpconv, conv, expconv, nexpconv, stepconv, trapz};
pub use pk::{
    conc_pass, conc_trap, flux_pass, flux_trap, prop_pass, prop_trap, res_pass, res_trap,
};
pub use signal::{
    FreeRecovery, Readout, Spgr, SteadyState, signal, signal_dsc, signal_free, signal_lin,
    signal_spgr, signal_ss, signal_t2w,
};
