//! Adapter layer: convert catalog DTOs to `source` types.
//!
//! The only place DTO types cross into the rest of the engine; if the
//! index API changes shape, only this file and dto.rs change.

use super::dto;
use crate::source::{CatalogEntry, CatalogPage};

/// Convert one items page.
pub fn to_page(response: dto::ItemsResponse) -> CatalogPage {
    CatalogPage {
        total_matches: response.total,
        items: response.items.into_iter().map(to_entry).collect(),
    }
}

fn to_entry(item: dto::ItemDto) -> CatalogEntry {
    // Coordinates are only usable as a pair.
    let coordinates = match (item.latitude, item.longitude) {
        (Some(lat), Some(lon)) => Some((lat, lon)),
        _ => None,
    };
    CatalogEntry {
        path: item.path,
        filename: item.filename,
        taken: item.taken,
        coordinates,
        place: item.place,
        rating: item.rating,
        favorite: item.favorite,
        geocoded: item.geocoded,
    }
}
