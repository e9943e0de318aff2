//! Calibration probes shipped with the CLI.
//!
//! These are not similarity formulas under study. They have known, extreme
//! behavior under noise, which makes them useful for checking that a run
//! is wired correctly:
//!
//! - `exact_match` scores 1 only for bitwise-identical inputs, so any noise
//!   drops it to 0 while the tie-break keeps every query ranked first.
//! - `sign_agreement` is the fraction of coordinates with matching signs;
//!   only sign-flip noise (and large additive noise) moves it.

use robustsim_core::metric::{MetricRegistry, MetricResult};

const PROBE_FILE: &str = "robustsim/probes";

pub fn probe_registry() -> MetricRegistry {
    let mut registry = MetricRegistry::new();
    registry.register("exact_match", PROBE_FILE, exact_match);
    registry.register("sign_agreement", PROBE_FILE, sign_agreement);
    registry
}

fn check_shape(a: &[f64], b: &[f64]) -> Result<(), String> {
    if a.len() != b.len() {
        return Err(format!("length mismatch: {} vs {}", a.len(), b.len()));
    }
    if a.is_empty() {
        return Err("empty vectors".to_string());
    }
    Ok(())
}

fn exact_match(a: &[f64], b: &[f64]) -> MetricResult {
    check_shape(a, b)?;
    Ok(if a == b { 1.0 } else { 0.0 })
}

fn sign_agreement(a: &[f64], b: &[f64]) -> MetricResult {
    check_shape(a, b)?;
    let agree = a
        .iter()
        .zip(b)
        .filter(|(x, y)| x.is_sign_negative() == y.is_sign_negative())
        .count();
    Ok(agree as f64 / a.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_sorted_by_name() {
        let registry = probe_registry();
        let names: Vec<&str> = registry.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["exact_match", "sign_agreement"]);
    }

    #[test]
    fn exact_match_scores() {
        assert_eq!(exact_match(&[1.0, 2.0], &[1.0, 2.0]), Ok(1.0));
        assert_eq!(exact_match(&[1.0, 2.0], &[1.0, 2.5]), Ok(0.0));
        assert!(exact_match(&[1.0], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn sign_agreement_counts_matching_signs() {
        assert_eq!(sign_agreement(&[1.0, -1.0, 0.5, -0.5], &[2.0, -3.0, -0.5, 0.5]), Ok(0.5));
        assert_eq!(sign_agreement(&[], &[]), Err("empty vectors".to_string()));
    }
}
