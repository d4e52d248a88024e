//! Station registry operations

use crate::error::QcResult;
use crate::models::Component;
use serde::{Deserialize, Serialize};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

/// Station record
///
/// Also the shape of `[[stations]]` entries in the config file, where only
/// `code` and `network` are required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    pub code: String,
    pub network: String,
    #[serde(default)]
    pub location: String,
    /// Operator grouping (e.g. sensor system type)
    #[serde(default)]
    pub network_group: Option<String>,
    /// Band/instrument prefixes in order of preference (e.g. `["BH", "SH"]`)
    #[serde(default = "default_prefixes")]
    pub channel_prefixes: Vec<String>,
    /// Component codes (e.g. `["E", "N", "Z"]` or `["1", "2", "Z"]`)
    #[serde(default = "default_components")]
    pub channel_components: Vec<String>,
}

fn default_prefixes() -> Vec<String> {
    vec!["BH".to_string()]
}

fn default_components() -> Vec<String> {
    Component::ALL.iter().map(|c| c.to_string()).collect()
}

impl Station {
    pub fn new(network: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            network: network.into(),
            location: String::new(),
            network_group: None,
            channel_prefixes: default_prefixes(),
            channel_components: default_components(),
        }
    }

    /// Channel code used for a component when no data names it
    ///
    /// Built from the preferred prefix, e.g. `BH` + `Z`.
    pub fn default_channel(&self, component: &str) -> String {
        let prefix = self.channel_prefixes.first().map(String::as_str).unwrap_or("");
        format!("{}{}", prefix, component)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn station_from_row(row: &SqliteRow) -> QcResult<Station> {
    let prefixes: String = row.try_get("channel_prefixes")?;
    let components: String = row.try_get("channel_components")?;

    Ok(Station {
        code: row.try_get("code")?,
        network: row.try_get("network")?,
        location: row.try_get("location")?,
        network_group: row.try_get("network_group")?,
        channel_prefixes: split_list(&prefixes),
        channel_components: split_list(&components),
    })
}

/// Insert or update a station
pub async fn upsert_station(pool: &SqlitePool, station: &Station) -> QcResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stations (
            code, network, location, network_group, channel_prefixes, channel_components, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(code) DO UPDATE SET
            network = excluded.network,
            location = excluded.location,
            network_group = excluded.network_group,
            channel_prefixes = excluded.channel_prefixes,
            channel_components = excluded.channel_components,
            updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(&station.code)
    .bind(&station.network)
    .bind(&station.location)
    .bind(&station.network_group)
    .bind(station.channel_prefixes.join(","))
    .bind(station.channel_components.join(","))
    .execute(pool)
    .await?;

    Ok(())
}

/// Load one station by code
pub async fn load_station(pool: &SqlitePool, code: &str) -> QcResult<Option<Station>> {
    let row = sqlx::query(
        r#"
        SELECT code, network, location, network_group, channel_prefixes, channel_components
        FROM stations
        WHERE code = ?
        "#,
    )
    .bind(code)
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(station_from_row).transpose()
}

/// Load stations ordered by code
///
/// An empty `codes` slice loads every station. Unknown codes are skipped.
pub async fn load_stations(pool: &SqlitePool, codes: &[String]) -> QcResult<Vec<Station>> {
    let rows = if codes.is_empty() {
        sqlx::query(
            r#"
            SELECT code, network, location, network_group, channel_prefixes, channel_components
            FROM stations
            ORDER BY code
            "#,
        )
        .fetch_all(pool)
        .await?
    } else {
        let placeholders = vec!["?"; codes.len()].join(", ");
        let sql = format!(
            r#"
            SELECT code, network, location, network_group, channel_prefixes, channel_components
            FROM stations
            WHERE code IN ({})
            ORDER BY code
            "#,
            placeholders
        );
        let mut query = sqlx::query(&sql);
        for code in codes {
            query = query.bind(code);
        }
        query.fetch_all(pool).await?
    };

    rows.iter().map(station_from_row).collect()
}

/// Count registered stations
pub async fn count_stations(pool: &SqlitePool) -> QcResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM stations")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
