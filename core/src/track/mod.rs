pub mod store;

pub use store::{FlightMeta, TableKind, TrackSet, TrackStore, Waypoint};
