use lampstand_directory::{Coordinate, Region};

/// Axis-aligned latitude/longitude box roughly covering one region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionBounds {
    pub region: Region,
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl RegionBounds {
    const fn new(
        region: Region,
        (min_latitude, max_latitude): (f64, f64),
        (min_longitude, max_longitude): (f64, f64),
    ) -> Self {
        Self {
            region,
            min_latitude,
            max_latitude,
            min_longitude,
            max_longitude,
        }
    }

    pub fn contains(&self, coordinate: Coordinate) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&coordinate.latitude)
            && (self.min_longitude..=self.max_longitude).contains(&coordinate.longitude)
    }
}

/// Coarse boxes, checked in order; the first containing box wins.
///
/// The boxes overlap along shared borders (southern NSW falls inside the VIC box,
/// the NSW/QLD border strip inside both) and leave coastal gaps. Treat the result
/// as an approximation only.
pub const REGION_BOUNDS: [RegionBounds; 8] = [
    RegionBounds::new(Region::Act, (-35.93, -35.12), (148.76, 149.40)),
    RegionBounds::new(Region::Tas, (-43.70, -39.50), (143.80, 148.50)),
    RegionBounds::new(Region::Vic, (-39.20, -33.90), (140.90, 150.00)),
    RegionBounds::new(Region::Nsw, (-37.60, -28.10), (140.90, 153.70)),
    RegionBounds::new(Region::Qld, (-29.20, -10.00), (137.90, 153.60)),
    RegionBounds::new(Region::Sa, (-38.10, -26.00), (129.00, 141.00)),
    RegionBounds::new(Region::Wa, (-35.20, -13.70), (112.90, 129.00)),
    RegionBounds::new(Region::Nt, (-26.00, -10.90), (129.00, 138.00)),
];

/// Guess the region a coordinate lies in, `None` when no box contains it.
pub fn approximate_region(coordinate: Coordinate) -> Option<Region> {
    REGION_BOUNDS
        .iter()
        .find(|bounds| bounds.contains(coordinate))
        .map(|bounds| bounds.region)
}
