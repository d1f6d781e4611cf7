//! Reverse-geocoding HTTP client.
//!
//! Turns the coordinate pairs the catalog stores into human place
//! names for the slideshow overlay. Implements
//! [`crate::source::Geocoder`] against a Nominatim-compatible API.

pub mod dto;
mod client;

pub use client::GeocodeClient;
