//! International Standard Atmosphere relations and the ground-speed to
//! calibrated-airspeed conversion used when rendering route legs.

const GAMMA: f64 = 1.4;
const R_AIR: f64 = 287.052_87;
const G0: f64 = 9.806_65;
const T0_K: f64 = 288.15;
const P0_PA: f64 = 101_325.0;
const LAPSE_K_PER_M: f64 = 0.0065;
const T_TROP_K: f64 = 216.65;
const H_TROP_M: f64 = 11_000.0;
const FT2M: f64 = 0.3048;
const MS2KT: f64 = 1.943_844_492;

/// ISA temperature (K) and static pressure (Pa) at a geopotential altitude.
///
/// Linear lapse up to the tropopause, isothermal above. Altitudes below sea
/// level clamp to zero.
pub fn isa_temperature_pressure(altitude_m: f64) -> (f64, f64) {
    let h = altitude_m.max(0.0);
    if h <= H_TROP_M {
        let t = T0_K - LAPSE_K_PER_M * h;
        let p = P0_PA * (t / T0_K).powf(G0 / (R_AIR * LAPSE_K_PER_M));
        (t, p)
    } else {
        let p_trop = P0_PA * (T_TROP_K / T0_K).powf(G0 / (R_AIR * LAPSE_K_PER_M));
        let p = p_trop * (-G0 * (h - H_TROP_M) / (R_AIR * T_TROP_K)).exp();
        (T_TROP_K, p)
    }
}

/// Converts ground speed (kt) at a flight level to calibrated airspeed (kt).
///
/// Wind is assumed zero, so true airspeed equals ground speed. Below Mach 0.1
/// the compressible formula is numerically noisy and the incompressible
/// density-ratio approximation is used instead.
pub fn gs_to_cas_kt(gs_kt: f64, flight_level: f64) -> f64 {
    let tas_ms = (gs_kt / MS2KT).max(0.0);
    let altitude_m = flight_level.max(0.0) * 100.0 * FT2M;
    let (t, p) = isa_temperature_pressure(altitude_m);

    let a = (GAMMA * R_AIR * t).sqrt();
    let a0 = (GAMMA * R_AIR * T0_K).sqrt();
    let mach = tas_ms / a;

    let qc = p * ((1.0 + 0.2 * mach * mach).powf(3.5) - 1.0);
    let qcp = (qc / P0_PA + 1.0).max(1.0);
    let mut cas_ms = a0 * (5.0 * (qcp.powf(2.0 / 7.0) - 1.0)).sqrt();
    if mach < 0.1 {
        let rho = p / (R_AIR * t);
        let rho0 = P0_PA / (R_AIR * T0_K);
        cas_ms = tas_ms * (rho / rho0).sqrt();
    }
    cas_ms * MS2KT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isa_sea_level_matches_reference() {
        let (t, p) = isa_temperature_pressure(0.0);
        assert!((t - 288.15).abs() < 1e-9);
        assert!((p - 101_325.0).abs() < 1e-6);
    }

    #[test]
    fn isa_clamps_below_sea_level() {
        assert_eq!(
            isa_temperature_pressure(-500.0),
            isa_temperature_pressure(0.0)
        );
    }

    #[test]
    fn isa_is_isothermal_above_tropopause() {
        let (t1, p1) = isa_temperature_pressure(12_000.0);
        let (t2, p2) = isa_temperature_pressure(15_000.0);
        assert_eq!(t1, 216.65);
        assert_eq!(t2, 216.65);
        assert!(p2 < p1);
    }

    #[test]
    fn conversion_is_finite_and_non_negative() {
        for fl in [0.0, 50.0, 150.0, 350.0, 450.0] {
            for gs in [0.0, 10.0, 60.0, 250.0, 480.0] {
                let cas = gs_to_cas_kt(gs, fl);
                assert!(cas.is_finite(), "gs={gs} fl={fl}");
                assert!(cas >= 0.0, "gs={gs} fl={fl}");
            }
        }
    }

    #[test]
    fn conversion_is_strictly_increasing_in_ground_speed() {
        for fl in [0.0, 100.0, 350.0] {
            let mut prev = gs_to_cas_kt(0.0, fl);
            for gs in (1..=50).map(|i| i as f64 * 10.0) {
                let cas = gs_to_cas_kt(gs, fl);
                assert!(cas > prev, "not increasing at gs={gs} fl={fl}");
                prev = cas;
            }
        }
    }

    #[test]
    fn sea_level_cas_equals_ground_speed() {
        // At FL0 the density ratio is 1, so the low-Mach branch is identity.
        let cas = gs_to_cas_kt(50.0, 0.0);
        assert!((cas - 50.0).abs() < 1e-9);
    }

    #[test]
    fn cas_is_below_tas_at_altitude() {
        // Thinner air at FL350 means CAS well below the 450 kt ground speed.
        let cas = gs_to_cas_kt(450.0, 350.0);
        assert!(cas < 300.0 && cas > 200.0, "cas={cas}");
    }
}
