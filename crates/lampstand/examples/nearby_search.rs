//! Nearby church search
//!
//! This example demonstrates a full search session:
//! - Loading configuration from `LAMPSTAND_*` environment variables
//! - Locating the user (a fixed coordinate here, or `LAMPSTAND_LAT`/`LAMPSTAND_LON`)
//! - Geocoding listings without coordinates through Nominatim
//! - Changing the radius without geocoding again

use lampstand::{AppContext, Coordinate, DirectoryView, FinderConfig, FixedLocator, SearchRadius};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    lampstand::init_logging(tracing::Level::INFO)?;

    let origin = origin_from_env().unwrap_or(Coordinate::new(-33.87, 151.21));
    let config = FinderConfig::from_env()?;
    let mut ctx = AppContext::from_config(config, FixedLocator(origin))?;

    println!("Searching around {origin}:");
    let finder = ctx.finder_mut();
    finder.search().await;
    print_view(finder.view(), finder.notice());

    for radius in [SearchRadius::Km100, SearchRadius::Km250] {
        println!("\nWidening to {radius}:");
        finder.set_radius(radius);
        print_view(finder.view(), finder.notice());
    }

    ctx.end_session();
    Ok(())
}

fn origin_from_env() -> Option<Coordinate> {
    let latitude = std::env::var("LAMPSTAND_LAT").ok()?.parse().ok()?;
    let longitude = std::env::var("LAMPSTAND_LON").ok()?.parse().ok()?;
    Some(Coordinate::new(latitude, longitude)).filter(Coordinate::is_valid)
}

fn print_view(view: &DirectoryView, notice: Option<lampstand::Notice>) {
    if let Some(notice) = notice {
        println!("  {notice}");
    }
    match view {
        DirectoryView::Unfiltered(entries) => {
            for entry in entries {
                println!("  - {entry}");
            }
        }
        DirectoryView::NoResults => println!("  (nothing to show)"),
        _ => {
            for (i, ranked) in view.ranked().iter().enumerate() {
                let distance = ranked
                    .distance_km
                    .map_or_else(|| "    ?".to_string(), |d| format!("{d:5.1}"));
                println!("  {}. {distance} km  {}", i + 1, ranked.entry);
            }
        }
    }
}
