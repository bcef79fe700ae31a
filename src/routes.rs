//! Static catalog of the ferry routes this service knows about.
//!
//! The catalog is a closed set: route and direction keys are enums, and every
//! direction lives in a `const` table that is never mutated at runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A ferry crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RouteKey {
    ArsvagenMortavika,
    HalhjemSandvikvag,
}

/// One traversal direction of a crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DirectionKey {
    ArsvagenToMortavika,
    MortavikaToArsvagen,
    HalhjemToSandvikvag,
    SandvikvagToHalhjem,
}

impl RouteKey {
    pub const ALL: [RouteKey; 2] = [RouteKey::ArsvagenMortavika, RouteKey::HalhjemSandvikvag];

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteKey::ArsvagenMortavika => "arsvagen_mortavika",
            RouteKey::HalhjemSandvikvag => "halhjem_sandvikvag",
        }
    }

    /// Returns `None` for anything that is not a configured route key
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == value)
    }
}

impl DirectionKey {
    pub const ALL: [DirectionKey; 4] = [
        DirectionKey::ArsvagenToMortavika,
        DirectionKey::MortavikaToArsvagen,
        DirectionKey::HalhjemToSandvikvag,
        DirectionKey::SandvikvagToHalhjem,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DirectionKey::ArsvagenToMortavika => "arsvagen_to_mortavika",
            DirectionKey::MortavikaToArsvagen => "mortavika_to_arsvagen",
            DirectionKey::HalhjemToSandvikvag => "halhjem_to_sandvikvag",
            DirectionKey::SandvikvagToHalhjem => "sandvikvag_to_halhjem",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == value)
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for DirectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One direction of one route, with the stop place used to query upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDirection {
    pub route: RouteKey,
    pub key: DirectionKey,
    pub label: &'static str,
    pub from_label: &'static str,
    pub to_label: &'static str,
    /// Stop place the estimated calls are fetched for
    pub from_stop_place_id: &'static str,
    pub to_stop_place_id: &'static str,
    /// Accepted spellings of the destination, matched against upstream front text
    pub destination_aliases: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteConfig {
    pub key: RouteKey,
    pub label: &'static str,
    pub directions: &'static [RouteDirection],
}

pub const ROUTES: [RouteConfig; 2] = [
    RouteConfig {
        key: RouteKey::ArsvagenMortavika,
        label: "Arsvågen-Mortavika",
        directions: &[
            RouteDirection {
                route: RouteKey::ArsvagenMortavika,
                key: DirectionKey::ArsvagenToMortavika,
                label: "Arsvågen → Mortavika",
                from_label: "Arsvågen",
                to_label: "Mortavika",
                from_stop_place_id: "NSR:StopPlace:58499",
                to_stop_place_id: "NSR:StopPlace:58653",
                destination_aliases: &["Mortavika"],
            },
            RouteDirection {
                route: RouteKey::ArsvagenMortavika,
                key: DirectionKey::MortavikaToArsvagen,
                label: "Mortavika → Arsvågen",
                from_label: "Mortavika",
                to_label: "Arsvågen",
                from_stop_place_id: "NSR:StopPlace:58653",
                to_stop_place_id: "NSR:StopPlace:58499",
                destination_aliases: &["Arsvågen", "Arsvagen"],
            },
        ],
    },
    RouteConfig {
        key: RouteKey::HalhjemSandvikvag,
        label: "Halhjem-Sandvikvåg",
        directions: &[
            RouteDirection {
                route: RouteKey::HalhjemSandvikvag,
                key: DirectionKey::HalhjemToSandvikvag,
                label: "Halhjem → Sandvikvåg",
                from_label: "Halhjem",
                to_label: "Sandvikvåg",
                from_stop_place_id: "NSR:StopPlace:58463",
                to_stop_place_id: "NSR:StopPlace:58462",
                destination_aliases: &["Sandvikvåg", "Sandvikvag"],
            },
            RouteDirection {
                route: RouteKey::HalhjemSandvikvag,
                key: DirectionKey::SandvikvagToHalhjem,
                label: "Sandvikvåg → Halhjem",
                from_label: "Sandvikvåg",
                to_label: "Halhjem",
                from_stop_place_id: "NSR:StopPlace:58462",
                to_stop_place_id: "NSR:StopPlace:58463",
                destination_aliases: &["Halhjem"],
            },
        ],
    },
];

pub fn route(key: RouteKey) -> &'static RouteConfig {
    match key {
        RouteKey::ArsvagenMortavika => &ROUTES[0],
        RouteKey::HalhjemSandvikvag => &ROUTES[1],
    }
}

/// Look up a direction, but only if it belongs to the given route
pub fn direction(route_key: RouteKey, direction_key: DirectionKey) -> Option<&'static RouteDirection> {
    route(route_key)
        .directions
        .iter()
        .find(|direction| direction.key == direction_key)
}
