//! Great-circle bearing, destination and distance on a spherical Earth.

const EARTH_RADIUS_NM: f64 = 3440.065;

/// Initial great-circle bearing in degrees [0, 360) from point 1 to point 2.
pub fn bearing_deg(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dlam = (lon2 - lon1).to_radians();
    let y = dlam.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlam.cos();
    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Point reached from (lat, lon) travelling `dist_nm` along `bearing`.
///
/// Longitude of the result is normalized to [-180, 180).
pub fn destination(lat: f64, lon: f64, bearing: f64, dist_nm: f64) -> (f64, f64) {
    let delta = dist_nm / EARTH_RADIUS_NM;
    let theta = bearing.to_radians();
    let phi1 = lat.to_radians();
    let lam1 = lon.to_radians();

    let sin_phi2 = phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos();
    let phi2 = sin_phi2.clamp(-1.0, 1.0).asin();

    let y = theta.sin() * delta.sin() * phi1.cos();
    let x = delta.cos() - phi1.sin() * phi2.sin();
    let lam2 = lam1 + y.atan2(x);

    let lat2 = phi2.to_degrees();
    let lon2 = (lam2.to_degrees() + 540.0) % 360.0 - 180.0;
    (lat2, lon2)
}

/// Great-circle distance in nautical miles (haversine).
pub fn distance_nm(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlam = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlam / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_NM * a.sqrt().clamp(-1.0, 1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearing_due_east_at_equator() {
        let brg = bearing_deg(0.0, 0.0, 0.0, 1.0);
        assert!((brg - 90.0).abs() < 1e-9);
    }

    #[test]
    fn bearing_is_always_in_range() {
        let brg = bearing_deg(10.0, 20.0, 5.0, 15.0);
        assert!((0.0..360.0).contains(&brg));
    }

    #[test]
    fn destination_round_trips_bearing_and_distance() {
        let cases = [
            (52.0, 4.0, 51.5, 5.5),
            (-33.9, 151.2, -37.8, 144.9),
            (60.0, -179.5, 60.5, 179.5),
            (0.0, 0.0, 10.0, 10.0),
        ];
        for (lat1, lon1, lat2, lon2) in cases {
            let brg = bearing_deg(lat1, lon1, lat2, lon2);
            let d = distance_nm(lat1, lon1, lat2, lon2);
            assert!(d < 1000.0, "test case exceeds round-trip envelope");
            let (rlat, rlon) = destination(lat1, lon1, brg, d);
            assert!((rlat - lat2).abs() < 1e-4, "lat {rlat} vs {lat2}");
            let mut dlon = (rlon - lon2).abs();
            if dlon > 180.0 {
                dlon = 360.0 - dlon;
            }
            assert!(dlon < 1e-4, "lon {rlon} vs {lon2}");
        }
    }

    #[test]
    fn destination_wraps_longitude() {
        let (_, lon) = destination(0.0, 179.9, 90.0, 60.0);
        assert!((-180.0..180.0).contains(&lon));
        assert!(lon < 0.0, "expected wrap past the antimeridian, got {lon}");
    }

    #[test]
    fn distance_one_degree_of_latitude_is_sixty_nm() {
        let d = distance_nm(10.0, 20.0, 11.0, 20.0);
        assert!((d - 60.04).abs() < 0.1, "d={d}");
    }
}
