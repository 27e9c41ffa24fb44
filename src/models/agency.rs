//! Issuing-agency codes for primary-source historical documents.

use serde::{Deserialize, Serialize};

/// Closed enumeration of organizations presumed to have issued a document.
///
/// `Other` is the catch-all for documents whose letterhead matches none of
/// the known organizations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgencyCode {
    /// Federal Bureau of Investigation.
    Fbi,
    /// Central Intelligence Agency.
    Cia,
    /// United States Secret Service.
    SecretService,
    /// Dallas Police Department.
    Dpd,
    /// Dallas County Sheriff's Office.
    Dso,
    /// United States Marine Corps.
    Usmc,
    /// Department of State.
    StateDept,
    /// Warren Commission (President's Commission on the Assassination).
    Warren,
    /// House Select Committee on Assassinations.
    Hsca,
    /// Assassination Records Review Board.
    Arrb,
    /// National Archives and Records Administration.
    Nara,
    /// Unrecognized or unlisted issuing organization.
    Other,
}

impl AgencyCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fbi => "fbi",
            Self::Cia => "cia",
            Self::SecretService => "secret_service",
            Self::Dpd => "dpd",
            Self::Dso => "dso",
            Self::Usmc => "usmc",
            Self::StateDept => "state_dept",
            Self::Warren => "warren",
            Self::Hsca => "hsca",
            Self::Arrb => "arrb",
            Self::Nara => "nara",
            Self::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "fbi" => Some(Self::Fbi),
            "cia" => Some(Self::Cia),
            "secret_service" => Some(Self::SecretService),
            "dpd" => Some(Self::Dpd),
            "dso" => Some(Self::Dso),
            "usmc" => Some(Self::Usmc),
            "state_dept" => Some(Self::StateDept),
            "warren" => Some(Self::Warren),
            "hsca" => Some(Self::Hsca),
            "arrb" => Some(Self::Arrb),
            "nara" => Some(Self::Nara),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    /// Human-readable organization name for display.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Fbi => "Federal Bureau of Investigation",
            Self::Cia => "Central Intelligence Agency",
            Self::SecretService => "U.S. Secret Service",
            Self::Dpd => "Dallas Police Department",
            Self::Dso => "Dallas County Sheriff's Office",
            Self::Usmc => "U.S. Marine Corps",
            Self::StateDept => "Department of State",
            Self::Warren => "Warren Commission",
            Self::Hsca => "House Select Committee on Assassinations",
            Self::Arrb => "Assassination Records Review Board",
            Self::Nara => "National Archives",
            Self::Other => "Other",
        }
    }
}

impl std::fmt::Display for AgencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for code in [
            AgencyCode::Fbi,
            AgencyCode::SecretService,
            AgencyCode::Warren,
            AgencyCode::Other,
        ] {
            assert_eq!(AgencyCode::from_str(code.as_str()), Some(code));
        }
        assert_eq!(AgencyCode::from_str("kgb"), None);
    }
}
