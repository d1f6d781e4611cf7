//! Reverse-geocoding API data transfer objects.
//!
//! Match the Nominatim `/reverse` response shape. Do not use outside
//! the geocode module.

use serde::{Deserialize, Serialize};

/// Response of `GET /reverse`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReverseResponse {
    /// Full formatted address line.
    pub display_name: String,
    #[serde(default)]
    pub address: Address,
}

/// Address components; which ones are present depends on the location.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Address {
    pub city: Option<String>,
    pub town: Option<String>,
    pub village: Option<String>,
    pub country: Option<String>,
}

impl Address {
    /// The most city-like component available.
    pub fn locality(&self) -> Option<&String> {
        self.city
            .as_ref()
            .or(self.town.as_ref())
            .or(self.village.as_ref())
    }
}
