//! Grant state-transition table
//!
//! Which response outcomes move a grant between which states is regulatory
//! configuration, not code: the table ships with the known-safe defaults
//! (IDLE -> GRANTED -> AUTHORIZED plus the relinquishment paths) and can be
//! replaced wholesale from the service configuration. The response
//! processor's handlers only ever consult this table; they never invent
//! transitions.

use super::models::GrantState;
use super::{StorageError, StorageResult};
use sas_proto::{RequestTypeName, RESPONSE_CODE_SUCCESS, RESPONSE_CODE_SUSPENDED_GRANT};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Coarse classification of a SAS per-request response code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseOutcome {
    /// responseCode 0
    Success,
    /// responseCode 501: grant kept but transmission suspended
    SuspendedGrant,
    /// Any other response code
    Failure,
}

impl ResponseOutcome {
    /// Classify a numeric SAS response code
    pub fn from_code(code: i64) -> Self {
        match code {
            RESPONSE_CODE_SUCCESS => ResponseOutcome::Success,
            RESPONSE_CODE_SUSPENDED_GRANT => ResponseOutcome::SuspendedGrant,
            _ => ResponseOutcome::Failure,
        }
    }
}

/// One configured transition rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantTransitionRule {
    /// Request type key, e.g. `"heartbeatRequest"`
    pub request_type: String,
    /// Outcome class of the SAS response
    pub outcome: ResponseOutcome,
    /// Grant state to move to
    pub target: String,
}

/// Lookup table from (request type, response outcome) to target grant state
#[derive(Debug, Clone)]
pub struct GrantTransitionTable {
    map: HashMap<(RequestTypeName, ResponseOutcome), GrantState>,
}

impl GrantTransitionTable {
    /// The default lattice
    ///
    /// Only the explicitly known paths are encoded: grant success awards
    /// GRANTED, heartbeat success authorizes, heartbeat rejection and
    /// relinquishment return the grant to IDLE. Everything else is a no-op
    /// unless configured.
    pub fn standard() -> Self {
        let mut map = HashMap::new();
        map.insert(
            (RequestTypeName::Grant, ResponseOutcome::Success),
            GrantState::Granted,
        );
        map.insert(
            (RequestTypeName::Grant, ResponseOutcome::Failure),
            GrantState::Idle,
        );
        map.insert(
            (RequestTypeName::Heartbeat, ResponseOutcome::Success),
            GrantState::Authorized,
        );
        map.insert(
            (RequestTypeName::Heartbeat, ResponseOutcome::SuspendedGrant),
            GrantState::Granted,
        );
        map.insert(
            (RequestTypeName::Heartbeat, ResponseOutcome::Failure),
            GrantState::Idle,
        );
        map.insert(
            (RequestTypeName::Relinquishment, ResponseOutcome::Success),
            GrantState::Idle,
        );
        Self { map }
    }

    /// Build a table from configured rules, replacing the defaults entirely
    pub fn from_rules(rules: &[GrantTransitionRule]) -> StorageResult<Self> {
        let mut map = HashMap::new();
        for rule in rules {
            let request_type: RequestTypeName = rule.request_type.parse().map_err(
                |e: sas_proto::RequestTypeParseError| StorageError::InvalidValue(e.to_string()),
            )?;
            let target: GrantState = rule.target.parse()?;
            map.insert((request_type, rule.outcome), target);
        }
        Ok(Self { map })
    }

    /// Target state for a (request type, outcome) pair, if the table has one
    pub fn target(
        &self,
        request_type: RequestTypeName,
        outcome: ResponseOutcome,
    ) -> Option<GrantState> {
        self.map.get(&(request_type, outcome)).copied()
    }
}

impl Default for GrantTransitionTable {
    fn default() -> Self {
        Self::standard()
    }
}
