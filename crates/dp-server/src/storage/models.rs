//! Persisted entities: CBSDs, requests, responses, grants, channels
//!
//! Row mapping is manual (`row.try_get`); state enums round-trip through
//! their lowercase string form in VARCHAR columns.

use super::{StorageError, StorageResult};
use chrono::{DateTime, Utc};
use sas_proto::RequestTypeName;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::Row;
use std::str::FromStr;

/// Lifecycle state of a CBSD
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CbsdState {
    /// Never successfully registered, or registration was rejected
    Unregistered,
    /// Registration request in flight
    Registering,
    /// Registered with the SAS
    Registered,
    /// Soft-deregistered; the row is retained
    Deregistered,
}

impl CbsdState {
    pub fn as_str(self) -> &'static str {
        match self {
            CbsdState::Unregistered => "unregistered",
            CbsdState::Registering => "registering",
            CbsdState::Registered => "registered",
            CbsdState::Deregistered => "deregistered",
        }
    }
}

impl FromStr for CbsdState {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unregistered" => Ok(CbsdState::Unregistered),
            "registering" => Ok(CbsdState::Registering),
            "registered" => Ok(CbsdState::Registered),
            "deregistered" => Ok(CbsdState::Deregistered),
            other => Err(StorageError::InvalidValue(format!(
                "Unknown CBSD state: {}",
                other
            ))),
        }
    }
}

/// Lifecycle state of a queued request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Waiting to be sent to the SAS
    Pending,
    /// A SAS response has been recorded; never dequeued again
    Processed,
}

impl RequestState {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestState::Pending => "pending",
            RequestState::Processed => "processed",
        }
    }
}

impl FromStr for RequestState {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestState::Pending),
            "processed" => Ok(RequestState::Processed),
            other => Err(StorageError::InvalidValue(format!(
                "Unknown request state: {}",
                other
            ))),
        }
    }
}

/// Lifecycle state of a spectrum grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrantState {
    /// Granted spectrum is not currently held (initial and relinquished state)
    Idle,
    /// Grant awarded, transmission not yet authorized
    Granted,
    /// Heartbeat accepted; transmission authorized
    Authorized,
    /// Terminal: the SAS no longer recognizes this grant
    Unsync,
}

impl GrantState {
    pub fn as_str(self) -> &'static str {
        match self {
            GrantState::Idle => "idle",
            GrantState::Granted => "granted",
            GrantState::Authorized => "authorized",
            GrantState::Unsync => "unsync",
        }
    }
}

impl FromStr for GrantState {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(GrantState::Idle),
            "granted" => Ok(GrantState::Granted),
            "authorized" => Ok(GrantState::Authorized),
            "unsync" => Ok(GrantState::Unsync),
            other => Err(StorageError::InvalidValue(format!(
                "Unknown grant state: {}",
                other
            ))),
        }
    }
}

/// A managed radio device
#[derive(Debug, Clone)]
pub struct Cbsd {
    pub id: i64,
    /// External SAS-assigned identifier; set at most once, on first
    /// successful registration
    pub cbsd_id: Option<String>,
    pub fcc_id: String,
    pub user_id: String,
    pub serial_number: String,
    pub network_id: String,
    pub state: CbsdState,
    pub last_seen: Option<DateTime<Utc>>,
    pub min_power: Option<f64>,
    pub max_power: Option<f64>,
    pub antenna_gain: Option<f64>,
    pub number_of_ports: Option<i32>,
}

impl Cbsd {
    pub fn from_row(row: &PgRow) -> StorageResult<Self> {
        let state: String = row.try_get("state")?;
        Ok(Cbsd {
            id: row.try_get("id")?,
            cbsd_id: row.try_get("cbsd_id")?,
            fcc_id: row.try_get("fcc_id")?,
            user_id: row.try_get("user_id")?,
            serial_number: row.try_get("serial_number")?,
            network_id: row.try_get("network_id")?,
            state: state.parse()?,
            last_seen: row.try_get("last_seen")?,
            min_power: row.try_get("min_power")?,
            max_power: row.try_get("max_power")?,
            antenna_gain: row.try_get("antenna_gain")?,
            number_of_ports: row.try_get("number_of_ports")?,
        })
    }
}

/// One queued action for a CBSD
#[derive(Debug, Clone)]
pub struct Request {
    pub id: i64,
    /// Internal id of the owning CBSD
    pub cbsd_id: i64,
    pub request_type: RequestTypeName,
    pub state: RequestState,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Request {
    pub fn from_row(row: &PgRow) -> StorageResult<Self> {
        let request_type: String = row.try_get("type")?;
        let state: String = row.try_get("state")?;
        Ok(Request {
            id: row.try_get("id")?,
            cbsd_id: row.try_get("cbsd_id")?,
            request_type: request_type
                .parse()
                .map_err(|e: sas_proto::RequestTypeParseError| {
                    StorageError::InvalidValue(e.to_string())
                })?,
            state: state.parse()?,
            payload: row.try_get("payload")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// A spectrum grant awarded by the SAS
#[derive(Debug, Clone)]
pub struct Grant {
    pub id: i64,
    pub cbsd_id: i64,
    pub grant_id: String,
    pub state: GrantState,
    pub heartbeat_interval_secs: Option<i64>,
    pub last_heartbeat_request_time: Option<DateTime<Utc>>,
    pub low_frequency_hz: Option<i64>,
    pub high_frequency_hz: Option<i64>,
    pub max_eirp: Option<f64>,
}

impl Grant {
    pub fn from_row(row: &PgRow) -> StorageResult<Self> {
        let state: String = row.try_get("state")?;
        Ok(Grant {
            id: row.try_get("id")?,
            cbsd_id: row.try_get("cbsd_id")?,
            grant_id: row.try_get("grant_id")?,
            state: state.parse()?,
            heartbeat_interval_secs: row.try_get("heartbeat_interval_secs")?,
            last_heartbeat_request_time: row.try_get("last_heartbeat_request_time")?,
            low_frequency_hz: row.try_get("low_frequency_hz")?,
            high_frequency_hz: row.try_get("high_frequency_hz")?,
            max_eirp: row.try_get("max_eirp")?,
        })
    }
}

/// A usable frequency range for a CBSD, learned from SAS responses
#[derive(Debug, Clone)]
pub struct Channel {
    pub id: i64,
    pub cbsd_id: i64,
    pub low_frequency_hz: i64,
    pub high_frequency_hz: i64,
    pub max_eirp: Option<f64>,
    pub last_used_max_eirp: Option<f64>,
}

impl Channel {
    pub fn from_row(row: &PgRow) -> StorageResult<Self> {
        Ok(Channel {
            id: row.try_get("id")?,
            cbsd_id: row.try_get("cbsd_id")?,
            low_frequency_hz: row.try_get("low_frequency_hz")?,
            high_frequency_hz: row.try_get("high_frequency_hz")?,
            max_eirp: row.try_get("max_eirp")?,
            last_used_max_eirp: row.try_get("last_used_max_eirp")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cbsd_state_round_trip() {
        for state in [
            CbsdState::Unregistered,
            CbsdState::Registering,
            CbsdState::Registered,
            CbsdState::Deregistered,
        ] {
            assert_eq!(state.as_str().parse::<CbsdState>().unwrap(), state);
        }
    }

    #[test]
    fn test_grant_state_round_trip() {
        for state in [
            GrantState::Idle,
            GrantState::Granted,
            GrantState::Authorized,
            GrantState::Unsync,
        ] {
            assert_eq!(state.as_str().parse::<GrantState>().unwrap(), state);
        }
    }

    #[test]
    fn test_unknown_state_is_rejected() {
        assert!("bogus".parse::<CbsdState>().is_err());
        assert!("bogus".parse::<RequestState>().is_err());
        assert!("bogus".parse::<GrantState>().is_err());
    }
}
