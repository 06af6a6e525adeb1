//! The "find a church near me" search.
//!
//! [`ChurchFinder`] drives one search session through
//! `Idle → Locating → Resolving → Ranking → Done`. When the device cannot
//! provide a position the search ends in `Error` and the full directory is
//! shown instead, with a notice explaining why. Geolocation and geocoding
//! failures never surface as errors from [`ChurchFinder::search`].
//!
//! ```rust
//! use lampstand::{
//!     CachingGeocoder, ChurchFinder, Coordinate, FinderConfig, FixedLocator, SearchRadius,
//! };
//! # use lampstand::{Geocoder, GeocodeError};
//! # struct NoGeocoder;
//! # impl Geocoder for NoGeocoder {
//! #     async fn geocode(&self, _: &str) -> Result<Option<Coordinate>, GeocodeError> { Ok(None) }
//! # }
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let directory = lampstand::Directory::embedded()?;
//! let sydney = FixedLocator(Coordinate::new(-33.87, 151.21));
//! let mut finder = ChurchFinder::new(
//!     directory,
//!     CachingGeocoder::new(NoGeocoder),
//!     sydney,
//!     &FinderConfig::default(),
//! );
//!
//! finder.search().await;
//! finder.set_radius(SearchRadius::Km100);
//! for entry in finder.view().entries() {
//!     println!("{}", entry.name);
//! }
//! # Ok::<(), lampstand::error::LampstandError>(())
//! # }).unwrap();
//! ```

use std::fmt;

use lampstand_directory::{Coordinate, Directory, DirectoryEntry, DirectoryFilter, Region};
use tracing::{debug, info, instrument};

use crate::{
    config::FinderConfig,
    geocode::{CachingGeocoder, Geocoder, ResolvedCoordinates},
    locate::{Geolocation, GeolocationError, Locator},
    rank::{ProximityRanker, RankedEntry, Ranking, SearchRadius},
};

/// Where a search currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchPhase {
    Idle,
    Locating,
    Resolving,
    Ranking,
    Done,
    /// The position could not be determined.
    Error,
}

impl SearchPhase {
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

/// What the listing shows.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectoryView {
    /// Every entry passing the filter, in dataset order.
    Unfiltered(Vec<DirectoryEntry>),
    /// Entries within the radius, nearest first.
    Nearby(Vec<RankedEntry>),
    /// Nothing nearby; every entry in the user's region.
    Region {
        region: Region,
        entries: Vec<RankedEntry>,
    },
    NoResults,
}

impl DirectoryView {
    pub fn entries(&self) -> Vec<&DirectoryEntry> {
        match self {
            Self::Unfiltered(entries) => entries.iter().collect(),
            Self::Nearby(ranked) | Self::Region { entries: ranked, .. } => {
                ranked.iter().map(|r| &r.entry).collect()
            }
            Self::NoResults => Vec::new(),
        }
    }

    /// Ranked entries with distances; empty for the unfiltered listing.
    pub fn ranked(&self) -> &[RankedEntry] {
        match self {
            Self::Nearby(ranked) | Self::Region { entries: ranked, .. } => ranked,
            Self::Unfiltered(_) | Self::NoResults => &[],
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Unfiltered(entries) => entries.len(),
            _ => self.ranked().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Ranking> for DirectoryView {
    fn from(ranking: Ranking) -> Self {
        match ranking {
            Ranking::WithinRadius(entries) => Self::Nearby(entries),
            Ranking::RegionFallback { region, entries } => Self::Region { region, entries },
            Ranking::NoResults => Self::NoResults,
        }
    }
}

/// Message shown above the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    LocationUnavailable(GeolocationError),
    ShowingRegion { region: Region, radius: SearchRadius },
    NoResultsNearby { radius: SearchRadius },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LocationUnavailable(GeolocationError::PermissionDenied) => {
                write!(f, "Location access was denied. Showing all churches.")
            }
            Self::LocationUnavailable(_) => {
                write!(f, "We couldn't find your location. Showing all churches.")
            }
            Self::ShowingRegion { region, radius } => write!(
                f,
                "No churches within {radius}. Showing churches in {}.",
                region.name()
            ),
            Self::NoResultsNearby { radius } => write!(f, "No churches found within {radius}."),
        }
    }
}

/// One user's church search session.
#[derive(Debug)]
pub struct ChurchFinder<G, L> {
    directory: Directory,
    geocoder: CachingGeocoder<G>,
    geolocation: Geolocation<L>,
    ranker: ProximityRanker,
    max_in_flight: usize,
    radius: SearchRadius,
    filter: DirectoryFilter,
    phase: SearchPhase,
    phases: Vec<SearchPhase>,
    origin: Option<Coordinate>,
    coordinates: ResolvedCoordinates,
    view: DirectoryView,
    notice: Option<Notice>,
}

impl<G: Geocoder, L: Locator> ChurchFinder<G, L> {
    pub fn new(
        directory: Directory,
        geocoder: CachingGeocoder<G>,
        locator: L,
        config: &FinderConfig,
    ) -> Self {
        let filter = DirectoryFilter::default();
        let view = unfiltered_view(&directory, &filter);
        Self {
            directory,
            geocoder,
            geolocation: Geolocation::new(locator, config.position),
            ranker: config.ranker(),
            max_in_flight: config.max_in_flight,
            radius: config.default_radius,
            filter,
            phase: SearchPhase::Idle,
            phases: vec![SearchPhase::Idle],
            origin: None,
            coordinates: ResolvedCoordinates::new(),
            view,
            notice: None,
        }
    }

    /// Locate the user, resolve missing coordinates and rank the directory.
    #[instrument(name = "Church search", skip(self), fields(radius = %self.radius), level = "info")]
    pub async fn search(&mut self) -> &DirectoryView {
        let t_search = std::time::Instant::now();
        self.phases.clear();
        self.notice = None;
        self.transition(SearchPhase::Locating);

        let position = match self.geolocation.current_position().await {
            Ok(position) => position,
            Err(error) => {
                self.origin = None;
                self.view = unfiltered_view(&self.directory, &self.filter);
                self.notice = Some(Notice::LocationUnavailable(error));
                self.transition(SearchPhase::Error);
                info!(%error, shown = self.view.len(), "Showing full directory without a position");
                return &self.view;
            }
        };
        self.origin = Some(position.coordinate);

        self.transition(SearchPhase::Resolving);
        self.coordinates = self
            .geocoder
            .resolve_missing(self.directory.iter(), self.max_in_flight)
            .await;

        self.rerank();

        info!(
            elapsed_seconds = ?t_search.elapsed(),
            results = self.view.len(),
            "Church search complete"
        );
        &self.view
    }

    /// Change the radius. A finished search is re-ranked from the remembered
    /// position and coordinates without geocoding again.
    pub fn set_radius(&mut self, radius: SearchRadius) -> &DirectoryView {
        self.radius = radius;
        if self.phase == SearchPhase::Done {
            self.refresh();
        }
        &self.view
    }

    /// Change the attribute filter and re-apply it to the current view.
    pub fn set_filter(&mut self, filter: DirectoryFilter) -> &DirectoryView {
        self.filter = filter;
        match self.phase {
            SearchPhase::Done => self.refresh(),
            SearchPhase::Idle | SearchPhase::Error => {
                self.view = unfiltered_view(&self.directory, &self.filter);
            }
            SearchPhase::Locating | SearchPhase::Resolving | SearchPhase::Ranking => {}
        }
        &self.view
    }

    /// Ask for the user's position without searching.
    ///
    /// Unlike [`ChurchFinder::search`], which turns a failure into a notice,
    /// the geolocation error is returned to the caller.
    #[instrument(name = "Locate user", skip(self), level = "debug")]
    pub async fn locate(&self) -> crate::error::Result<Coordinate> {
        let position = self.geolocation.current_position().await?;
        Ok(position.coordinate)
    }

    /// Back to `Idle` with the unfiltered listing; the next search asks for a
    /// fresh position. Geocoded coordinates stay cached.
    pub fn reset(&mut self) {
        self.geolocation.forget();
        self.origin = None;
        self.coordinates = ResolvedCoordinates::new();
        self.notice = None;
        self.view = unfiltered_view(&self.directory, &self.filter);
        self.phases.clear();
        self.transition(SearchPhase::Idle);
    }

    pub const fn phase(&self) -> SearchPhase {
        self.phase
    }

    /// Phases visited by the latest search or re-rank, in order.
    pub fn phases(&self) -> &[SearchPhase] {
        &self.phases
    }

    pub const fn view(&self) -> &DirectoryView {
        &self.view
    }

    pub const fn notice(&self) -> Option<Notice> {
        self.notice
    }

    /// The user's position from the latest successful search.
    pub const fn origin(&self) -> Option<Coordinate> {
        self.origin
    }

    pub const fn radius(&self) -> SearchRadius {
        self.radius
    }

    pub const fn filter(&self) -> &DirectoryFilter {
        &self.filter
    }

    pub const fn directory(&self) -> &Directory {
        &self.directory
    }

    pub const fn geocoder(&self) -> &CachingGeocoder<G> {
        &self.geocoder
    }

    /// Re-rank a finished search; the phase history restarts here.
    fn refresh(&mut self) {
        self.phases.clear();
        self.rerank();
    }

    fn rerank(&mut self) {
        let Some(origin) = self.origin else {
            return;
        };
        self.transition(SearchPhase::Ranking);

        let entries: Vec<&DirectoryEntry> = self.directory.filtered(&self.filter).collect();
        let ranking = self
            .ranker
            .rank(&entries, &self.coordinates, origin, self.radius);
        self.notice = match &ranking {
            Ranking::WithinRadius(_) => None,
            Ranking::RegionFallback { region, .. } => Some(Notice::ShowingRegion {
                region: *region,
                radius: self.radius,
            }),
            Ranking::NoResults => Some(Notice::NoResultsNearby {
                radius: self.radius,
            }),
        };
        self.view = ranking.into();
        self.transition(SearchPhase::Done);
    }

    fn transition(&mut self, next: SearchPhase) {
        debug!(from = ?self.phase, to = ?next, "Search phase change");
        self.phase = next;
        self.phases.push(next);
    }
}

fn unfiltered_view(directory: &Directory, filter: &DirectoryFilter) -> DirectoryView {
    DirectoryView::Unfiltered(directory.filtered(filter).cloned().collect())
}
