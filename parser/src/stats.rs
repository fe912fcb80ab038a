//! Per-player scoreboard pulled from the header's `PlayerStats` array.

use serde::Serialize;

use crate::ReplayFile;
use crate::error::ErrorKind;
use crate::property::{Property, PropertyType};

pub const PLAYER_STATS: &str = "PlayerStats";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlayerStats {
    pub name: String,
    /// Enum type of the platform, normally `OnlinePlatform`
    pub platform: String,
    /// e.g. `OnlinePlatform_Steam`
    pub platform_name: String,
    /// Zero for bots and some account types
    pub online_id: i64,
    pub team: i32,
    pub score: i32,
    pub goals: i32,
    pub assists: i32,
    pub saves: i32,
    pub shots: i32,
    pub is_bot: bool,
}

fn field<'a>(element: &'a [Property], name: &str) -> Option<&'a Property> {
    element.iter().find(|p| p.name() == name)
}

fn int_field(element: &[Property], name: &str) -> Result<i32, ErrorKind> {
    field(element, name).map_or(Ok(0), Property::as_int)
}

impl PlayerStats {
    /// Builds stats from one element of the `PlayerStats` array. Absent fields
    /// are left at their defaults; fields of the wrong type are an error.
    pub fn from_element(element: &[Property]) -> Result<PlayerStats, ErrorKind> {
        let name = field(element, "Name")
            .map_or(Ok(""), Property::as_str)?
            .to_string();
        let (platform, platform_name) = field(element, "Platform")
            .map_or(Ok(("", "")), Property::as_byte_pair)?;
        let online_id = field(element, "OnlineID").map_or(Ok(0), Property::as_long)?;
        let is_bot = field(element, "bBot").map_or(Ok(0), Property::as_bool)? != 0;

        Ok(PlayerStats {
            name,
            platform: platform.to_string(),
            platform_name: platform_name.to_string(),
            online_id,
            team: int_field(element, "Team")?,
            score: int_field(element, "Score")?,
            goals: int_field(element, "Goals")?,
            assists: int_field(element, "Assists")?,
            saves: int_field(element, "Saves")?,
            shots: int_field(element, "Shots")?,
            is_bot,
        })
    }

    /// Stable per-player key: the online id, or the name when the id is zero.
    pub fn sheet_key(&self) -> String {
        if self.online_id == 0 {
            format!("RL - {}", self.name)
        } else {
            format!("RL - {}", self.online_id)
        }
    }
}

/// One entry per element of the replay's `PlayerStats` array, in stream order.
pub fn player_stats(replay: &ReplayFile) -> Result<Vec<PlayerStats>, ErrorKind> {
    let property = replay
        .find_property(PLAYER_STATS, PropertyType::Array)
        .ok_or_else(|| ErrorKind::MissingProperty {
            name: PLAYER_STATS.to_string(),
        })?;
    property
        .as_array()?
        .iter()
        .map(|element| PlayerStats::from_element(element))
        .collect()
}

/// Keeps only players whose name appears in `tracked`. An empty list keeps
/// everyone.
pub fn tracked_players(stats: Vec<PlayerStats>, tracked: &[String]) -> Vec<PlayerStats> {
    if tracked.is_empty() {
        return stats;
    }
    stats
        .into_iter()
        .filter(|player| tracked.contains(&player.name))
        .collect()
}
