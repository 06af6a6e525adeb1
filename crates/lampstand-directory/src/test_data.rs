//! Fixture builders for directory-driven tests.

use crate::{Coordinate, Directory, DirectoryEntry, EntrySource, Region};

/// Sydney CBD, the user position most search scenarios start from.
pub const SYDNEY: Coordinate = Coordinate::new(-33.87, 151.21);
pub const MELBOURNE: Coordinate = Coordinate::new(-37.81, 144.96);
/// About 21 km north-west of [`SYDNEY`].
pub const NORTH_WEST_SYDNEY: Coordinate = Coordinate::new(-33.80, 151.00);
/// About 68 km south of [`SYDNEY`].
pub const WOLLONGONG: Coordinate = Coordinate::new(-34.42, 150.89);
/// About 117 km north of [`SYDNEY`].
pub const NEWCASTLE: Coordinate = Coordinate::new(-32.93, 151.78);

/// A minimal, valid entry. Callers overwrite the fields a test cares about.
pub fn entry(
    id: &str,
    name: &str,
    region: Region,
    coordinate: Option<Coordinate>,
) -> DirectoryEntry {
    DirectoryEntry {
        id: id.to_string(),
        name: name.to_string(),
        street: "1 Church St".to_string(),
        city: format!("{name} Town"),
        region,
        postcode: "2000".to_string(),
        phone: None,
        email: None,
        website: None,
        pastor: "Rev. Test".to_string(),
        denomination: "Non-denominational".to_string(),
        service_times: vec!["Sunday 10:00".to_string()],
        specialties: Vec::new(),
        coordinate,
        verified: false,
        source: EntrySource::Manual,
    }
}

/// Entry with a bespoke street address so geocoding mocks can key on it.
pub fn entry_at(
    id: &str,
    street: &str,
    city: &str,
    region: Region,
    postcode: &str,
) -> DirectoryEntry {
    let mut e = entry(id, id, region, None);
    street.clone_into(&mut e.street);
    city.clone_into(&mut e.city);
    postcode.clone_into(&mut e.postcode);
    e
}

/// Sydney and Melbourne listings, both with bundled coordinates.
pub fn sydney_and_melbourne() -> Directory {
    Directory::new(vec![
        entry("nw-sydney", "Hills Community Church", Region::Nsw, Some(NORTH_WEST_SYDNEY)),
        entry("melbourne", "Yarra Fellowship", Region::Vic, Some(MELBOURNE)),
    ])
    .expect("fixture directory is valid")
}

/// Nothing within 25 km of [`SYDNEY`], two NSW listings further out and one in Victoria.
pub fn regional_nsw() -> Directory {
    Directory::new(vec![
        entry("newcastle", "Harbour City Church", Region::Nsw, Some(NEWCASTLE)),
        entry("melbourne", "Yarra Fellowship", Region::Vic, Some(MELBOURNE)),
        entry("wollongong", "Illawarra Chapel", Region::Nsw, Some(WOLLONGONG)),
    ])
    .expect("fixture directory is valid")
}
