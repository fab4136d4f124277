use std::fmt;

use serde::{Deserialize, Serialize};

/// A coordinate reference system, identified by its EPSG (or ESRI) code.
/// Web Mercator aliases compare equal to each other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Crs(u32);

impl Crs {
    /// WGS84 longitude/latitude.
    pub const WGS84: Crs = Crs(4326);
    /// NAD83 longitude/latitude.
    pub const NAD83: Crs = Crs(4269);
    /// Spherical (Web) Mercator.
    pub const WEB_MERCATOR: Crs = Crs(3857);

    #[inline] pub const fn new(code: u32) -> Self { Self(code) }

    /// Get the raw code this CRS was tagged with.
    #[inline] pub const fn code(&self) -> u32 { self.0 }

    /// Canonical code, folding the ESRI / legacy aliases of Web Mercator into 3857.
    #[inline]
    pub const fn canonical(&self) -> u32 {
        match self.0 {
            102100 | 102113 | 900913 | 3785 => 3857,
            code => code,
        }
    }

    /// True for longitude/latitude systems (coordinates in degrees).
    #[inline]
    pub const fn is_geographic(&self) -> bool {
        matches!(self.canonical(), 4326 | 4269 | 4937 | 4979)
    }

    /// PROJ.4 definition for this CRS, if one is known.
    pub fn proj4(&self) -> Option<String> {
        let code = self.canonical();
        let def = match code {
            4326 | 4979 => "+proj=longlat +datum=WGS84 +no_defs +type=crs".to_string(),
            4269 | 4937 => "+proj=longlat +datum=NAD83 +no_defs +type=crs".to_string(),
            3857 => "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +no_defs +type=crs".to_string(),
            32601..=32660 => format!("+proj=utm +zone={} +datum=WGS84 +units=m +no_defs +type=crs", code - 32600),
            32701..=32760 => format!("+proj=utm +zone={} +south +datum=WGS84 +units=m +no_defs +type=crs", code - 32700),
            26901..=26923 => format!("+proj=utm +zone={} +datum=NAD83 +units=m +no_defs +type=crs", code - 26900),
            _ => return None,
        };
        Some(def)
    }

    /// Parse the CRS notations found in GeoJSON files and feature services:
    /// `EPSG:3857`, `urn:ogc:def:crs:EPSG::3857`, `urn:ogc:def:crs:OGC:1.3:CRS84`, or a bare code.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.ends_with("CRS84") { return Some(Self::WGS84) }
        let code = text.rsplit(':').next()?.trim();
        code.parse::<u32>().ok().filter(|&c| c > 0).map(Self)
    }
}

impl Default for Crs {
    fn default() -> Self { Self::WEB_MERCATOR }
}

impl PartialEq for Crs {
    fn eq(&self, other: &Self) -> bool { self.canonical() == other.canonical() }
}

impl Eq for Crs {}

impl std::hash::Hash for Crs {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) { self.canonical().hash(state) }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}
