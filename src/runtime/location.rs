use core::fmt::Write as _;

use heapless::String;

use crate::detector::{types::MAP_LINK_CAPACITY, Coordinates, Location};

pub fn google_maps_link(coords: &Coordinates) -> String<MAP_LINK_CAPACITY> {
    let mut link = String::new();
    let _ = write!(
        link,
        "https://www.google.com/maps?q={:.6},{:.6}",
        coords.latitude, coords.longitude
    );
    link
}

/// Optional location collaborator. `None` covers both an unavailable fix and
/// a refused permission; detection and confirmation do not depend on it.
#[allow(async_fn_in_trait)]
pub trait LocationProvider {
    async fn current_location(&mut self) -> Option<Coordinates>;

    fn map_link(&self, coords: &Coordinates) -> String<MAP_LINK_CAPACITY> {
        google_maps_link(coords)
    }
}

pub struct NoLocation;

impl LocationProvider for NoLocation {
    async fn current_location(&mut self) -> Option<Coordinates> {
        None
    }
}

pub struct FixedLocation(pub Coordinates);

impl LocationProvider for FixedLocation {
    async fn current_location(&mut self) -> Option<Coordinates> {
        Some(self.0)
    }
}

pub(super) async fn locate<L: LocationProvider>(provider: &mut L) -> Option<Location> {
    let coords = provider.current_location().await?;
    Some(Location {
        coords,
        map_link: provider.map_link(&coords),
    })
}
