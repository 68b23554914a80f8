pub mod sphere;

pub use sphere::{bearing_deg, destination, distance_nm};
