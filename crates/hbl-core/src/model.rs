//! Domain types: address records, reputation reports, alerts
//!
//! Validation happens in constructors so that a record reaching a store is
//! always well-formed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Action recorded for an address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Enforced on every registered endpoint
    Block,
    /// Local allow-list entry, never enforced on endpoints
    Allow,
}

impl Action {
    /// Canonical name ("Block" / "Allow")
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Block => "Block",
            Action::Allow => "Allow",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "block" => Ok(Action::Block),
            "allow" => Ok(Action::Allow),
            other => Err(Error::invalid_input(format!("Unknown action: '{}'", other))),
        }
    }
}

/// Parse and validate an IP address literal
pub fn parse_ip(value: &str) -> Result<IpAddr> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::invalid_input(format!("'{}' is not a valid IP address", value)))
}

/// Validated request to create an address record
///
/// The record's action is chosen by the service operation that consumes it
/// (`block` or `allow`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAddress {
    ip: IpAddr,
    author: String,
    comment: String,
}

impl NewAddress {
    /// Build a request, rejecting empty author or comment
    pub fn new(ip: IpAddr, author: impl Into<String>, comment: impl Into<String>) -> Result<Self> {
        let author = author.into();
        let comment = comment.into();

        if author.trim().is_empty() {
            return Err(Error::invalid_input("Field 'author' must not be empty"));
        }
        if comment.trim().is_empty() {
            return Err(Error::invalid_input("Field 'comment' must not be empty"));
        }

        Ok(Self {
            ip,
            author,
            comment,
        })
    }

    /// Build a request from an unparsed address literal
    pub fn parse(ip: &str, author: impl Into<String>, comment: impl Into<String>) -> Result<Self> {
        Self::new(parse_ip(ip)?, author, comment)
    }

    /// The requested address
    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    /// Turn the request into a record stamped with the current time
    pub(crate) fn into_record(self, action: Action) -> Address {
        Address {
            ip: self.ip,
            action,
            author: self.author,
            comment: self.comment,
            created_at: Utc::now(),
        }
    }
}

/// Authoritative address record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// The address this record describes
    pub ip: IpAddr,
    /// Block or Allow
    pub action: Action,
    /// Who created the record
    pub author: String,
    /// Why the record was created
    pub comment: String,
    /// When the record was created
    pub created_at: DateTime<Utc>,
}

impl Address {
    /// Whether endpoints are expected to hold an artifact for this address
    pub fn is_blocked(&self) -> bool {
        self.action == Action::Block
    }
}

/// Cached reputation facts about an address, owned by one checker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReputationReport {
    /// The address the report describes
    pub ip: IpAddr,
    /// Abuse confidence score (0-100, higher is worse)
    pub abuse_confidence_score: u8,
    /// ISO country code
    #[serde(default)]
    pub country_code: Option<String>,
    /// Usage type (e.g. "Data Center/Web Hosting/Transit")
    #[serde(default)]
    pub usage_type: Option<String>,
    /// ISP name
    #[serde(default)]
    pub isp: Option<String>,
    /// Total number of abuse reports
    pub total_reports: u32,
    /// Number of distinct reporters
    pub num_distinct_users: u32,
    /// Most recent report, if any
    #[serde(default)]
    pub last_reported_at: Option<DateTime<Utc>>,
    /// When the remote API produced this report
    pub fetched_at: DateTime<Utc>,
}

/// Action applied to an endpoint by the fan-out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointAction {
    /// Create or replace the artifact
    Block,
    /// Remove the artifact
    Unblock,
    /// Create the artifact only if it is missing
    Sync,
}

impl EndpointAction {
    /// Name used in error attribution
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointAction::Block => "Block",
            EndpointAction::Unblock => "Unblock",
            EndpointAction::Sync => "Sync",
        }
    }
}

impl fmt::Display for EndpointAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action reported to alerters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertAction {
    /// Address was blocked
    Block,
    /// Address was allow-listed
    Allow,
    /// A block was lifted and the record deleted
    Unblock,
}

impl AlertAction {
    /// Canonical name
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertAction::Block => "Block",
            AlertAction::Allow => "Allow",
            AlertAction::Unblock => "Unblock",
        }
    }
}

impl fmt::Display for AlertAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Action> for AlertAction {
    fn from(action: Action) -> Self {
        match action {
            Action::Block => AlertAction::Block,
            Action::Allow => AlertAction::Allow,
        }
    }
}

/// Notification about a completed action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// Affected address
    pub ip: IpAddr,
    /// What happened
    pub action: AlertAction,
    /// Who did it
    pub author: String,
    /// Why
    pub comment: String,
}

impl Alert {
    /// Alert describing the creation of a record
    pub fn for_record(address: &Address) -> Self {
        Self {
            ip: address.ip,
            action: address.action.into(),
            author: address.author.clone(),
            comment: address.comment.clone(),
        }
    }

    /// Alert describing the removal of a blocked record
    pub fn for_unblock(address: &Address) -> Self {
        Self {
            action: AlertAction::Unblock,
            ..Self::for_record(address)
        }
    }
}
