//! Radiative balance and seeding curve shared by patches and daisies.

/// Luminosity absorbed by a surface of the given albedo.
pub fn absorbed_luminosity(albedo: f64, solar_luminosity: f64) -> f64 {
    (1.0 - albedo) * solar_luminosity
}

/// Temperature a surface relaxes towards for a given absorbed luminosity.
///
/// Non-positive absorption (a perfect reflector or a dark sun) bottoms out
/// at 80 instead of taking the log of zero.
pub fn local_heating(absorbed: f64) -> f64 {
    if absorbed > 0.0 {
        72.0 * absorbed.ln() + 80.0
    } else {
        80.0
    }
}

/// One-step exponential blend between the current temperature and `heating`.
pub fn blend(current: f64, heating: f64) -> f64 {
    (current + heating) / 2.0
}

/// Probability threshold for a daisy to seed a neighbour at temperature `t`.
///
/// Positive only between roughly 5 and 40 degrees, peaking near 22.5.
pub fn seed_threshold(t: f64) -> f64 {
    0.1457 * t - 0.0032 * t * t - 0.6443
}

/// Keep `degree` of `own` and take the rest from the neighbour mean.
pub fn diffuse(own: f64, neighbor_temps: &[f64], degree: f64) -> f64 {
    if neighbor_temps.is_empty() {
        return own;
    }
    let mean = neighbor_temps.iter().sum::<f64>() / neighbor_temps.len() as f64;
    degree * own + (1.0 - degree) * mean
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_absorption_heats_to_eighty() {
        assert!((local_heating(1.0) - 80.0).abs() < 1e-12);
    }

    #[test]
    fn non_positive_absorption_is_handled_piecewise() {
        assert_eq!(local_heating(0.0), 80.0);
        assert_eq!(local_heating(-0.5), 80.0);
        assert_eq!(local_heating(absorbed_luminosity(1.0, 1.4)), 80.0);
    }

    #[test]
    fn white_daisy_absorbs_a_quarter() {
        let absorbed = absorbed_luminosity(0.75, 1.0);
        assert!((absorbed - 0.25).abs() < 1e-12);
        let expected = 72.0 * 0.25f64.ln() + 80.0;
        assert!((local_heating(absorbed) - expected).abs() < 1e-12);
    }

    #[test]
    fn darker_surfaces_run_hotter() {
        let white = local_heating(absorbed_luminosity(0.75, 1.0));
        let bare = local_heating(absorbed_luminosity(0.4, 1.0));
        let black = local_heating(absorbed_luminosity(0.25, 1.0));
        assert!(white < bare && bare < black);
    }

    #[test]
    fn blend_is_the_midpoint() {
        assert_eq!(blend(20.0, 30.0), 25.0);
    }

    #[test]
    fn seed_threshold_peaks_in_the_habitable_band() {
        assert!(seed_threshold(22.5) > 0.99);
        assert!(seed_threshold(0.0) < 0.0);
        assert!(seed_threshold(50.0) < 0.0);
        assert!((seed_threshold(25.0) - (0.1457 * 25.0 - 0.0032 * 625.0 - 0.6443)).abs() < 1e-12);
    }

    #[test]
    fn diffuse_mixes_with_neighbor_mean() {
        let neighbors = [10.0; 8];
        assert!((diffuse(30.0, &neighbors, 0.5) - 20.0).abs() < 1e-12);
        assert_eq!(diffuse(30.0, &neighbors, 1.0), 30.0);
        assert_eq!(diffuse(30.0, &[], 0.5), 30.0);
    }
}
