use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt, str::FromStr};

#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq, Eq, Hash)]
pub enum PermitStatus {
    #[default]
    Draft,
    #[serde(rename = "Work Permit Request")]
    Requested,
    #[serde(rename = "Work Permit Approved")]
    Approved,
    #[serde(rename = "Work Permit Rejected")]
    Rejected,
    #[serde(rename = "Real Time")]
    RealTime,
    #[serde(rename = "Time Out")]
    TimeOut,
    #[serde(rename = "Approve to Close")]
    ApproveToClose,
    #[serde(rename = "Reject to Close")]
    RejectToClose,
    #[serde(rename = "Close Permit")]
    Closed,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq, Eq, Hash)]
pub enum WorkType {
    #[default]
    Hotwork,
    Coldwork,
    #[serde(rename = "PM")]
    PreventiveMaintenance,
}

impl PermitStatus {
    pub const ALL: [PermitStatus; 9] = [
        Self::Draft,
        Self::Requested,
        Self::Approved,
        Self::Rejected,
        Self::RealTime,
        Self::TimeOut,
        Self::ApproveToClose,
        Self::RejectToClose,
        Self::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Requested => "Work Permit Request",
            Self::Approved => "Work Permit Approved",
            Self::Rejected => "Work Permit Rejected",
            Self::RealTime => "Real Time",
            Self::TimeOut => "Time Out",
            Self::ApproveToClose => "Approve to Close",
            Self::RejectToClose => "Reject to Close",
            Self::Closed => "Close Permit",
        }
    }

    /// Stored values outside the nine known stages read back as `Draft`.
    pub fn coerce(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }

    /// A new permit starts either as a draft or already submitted.
    pub fn is_initial(&self) -> bool {
        matches!(self, Self::Draft | Self::Requested)
    }

    pub fn next(&self) -> &'static [PermitStatus] {
        match self {
            Self::Draft => &[Self::Requested],
            Self::Requested => &[Self::Approved, Self::Rejected, Self::Draft],
            Self::Rejected => &[Self::Draft, Self::Requested],
            Self::Approved => &[Self::RealTime],
            Self::RealTime => &[Self::TimeOut, Self::ApproveToClose, Self::RejectToClose],
            Self::TimeOut => &[Self::ApproveToClose, Self::RejectToClose],
            Self::RejectToClose => &[Self::RealTime],
            Self::ApproveToClose => &[Self::Closed],
            Self::Closed => &[],
        }
    }

    pub fn can_transition_to(&self, to: &PermitStatus) -> bool {
        self == to || self.next().contains(to)
    }
}

impl fmt::Display for PermitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermitStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|status| status.as_str() == s)
            .copied()
            .ok_or_else(|| format!("UNKNOWN_STATUS: {s}"))
    }
}

impl WorkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hotwork => "Hotwork",
            Self::Coldwork => "Coldwork",
            Self::PreventiveMaintenance => "PM",
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Hotwork => "HW",
            Self::Coldwork => "CW",
            Self::PreventiveMaintenance => "PM",
        }
    }

    pub fn permit_number(&self, seq: u64) -> String {
        format!("{}_{:03}", self.prefix(), seq)
    }
    /// Sequence part of a permit number issued for this type.
    pub fn sequence_of(&self, permit_number: &str) -> Option<u64> {
        permit_number
            .strip_prefix(self.prefix())?
            .strip_prefix('_')?
            .parse()
            .ok()
    }
}

impl FromStr for WorkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Hotwork" => Ok(Self::Hotwork),
            "Coldwork" => Ok(Self::Coldwork),
            "PM" => Ok(Self::PreventiveMaintenance),
            _ => Err(format!("UNKNOWN_WORK_TYPE: {s}")),
        }
    }
}

/// Lenient reader for stored documents.
pub fn coerce_status<'de, D>(deserializer: D) -> Result<PermitStatus, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.map(|v| PermitStatus::coerce(&v)).unwrap_or_default())
}

pub fn coerce_work_type<'de, D>(deserializer: D) -> Result<WorkType, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.parse().ok()).unwrap_or_default())
}
