//! ABO/Rh blood types and red-cell transfusion compatibility.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// ABO group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AboGroup {
    O,
    A,
    B,
    AB,
}

impl AboGroup {
    fn as_str(&self) -> &'static str {
        match self {
            AboGroup::O => "O",
            AboGroup::A => "A",
            AboGroup::B => "B",
            AboGroup::AB => "AB",
        }
    }

    /// Whether red cells of `self` carry no antigen the recipient group lacks.
    fn donates_to(self, recipient: AboGroup) -> bool {
        match (self, recipient) {
            (AboGroup::O, _) => true,
            (_, AboGroup::AB) => true,
            (donor, recipient) => donor == recipient,
        }
    }
}

/// A blood type such as `AB-`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BloodType {
    pub group: AboGroup,
    pub rh_positive: bool,
}

impl BloodType {
    /// All eight types, universal donor first.
    pub const ALL: [BloodType; 8] = [
        BloodType::new(AboGroup::O, false),
        BloodType::new(AboGroup::O, true),
        BloodType::new(AboGroup::B, false),
        BloodType::new(AboGroup::B, true),
        BloodType::new(AboGroup::A, false),
        BloodType::new(AboGroup::A, true),
        BloodType::new(AboGroup::AB, false),
        BloodType::new(AboGroup::AB, true),
    ];

    pub const fn new(group: AboGroup, rh_positive: bool) -> Self {
        Self { group, rh_positive }
    }

    /// Whether red cells of this type can be given to `recipient`.
    pub fn can_donate_to(&self, recipient: &BloodType) -> bool {
        self.group.donates_to(recipient.group) && (!self.rh_positive || recipient.rh_positive)
    }

    /// Whether this type can receive red cells from `donor`.
    pub fn can_receive_from(&self, donor: &BloodType) -> bool {
        donor.can_donate_to(self)
    }

    /// Types this one can donate to, in [`BloodType::ALL`] order.
    pub fn recipients(&self) -> Vec<BloodType> {
        Self::ALL
            .iter()
            .copied()
            .filter(|r| self.can_donate_to(r))
            .collect()
    }

    /// Types this one can receive from, in [`BloodType::ALL`] order.
    pub fn donors(&self) -> Vec<BloodType> {
        Self::ALL
            .iter()
            .copied()
            .filter(|d| self.can_receive_from(d))
            .collect()
    }
}

impl fmt::Display for BloodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            self.group.as_str(),
            if self.rh_positive { '+' } else { '-' }
        )
    }
}

/// Error parsing a blood type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a blood type: {0}")]
pub struct ParseBloodTypeError(String);

impl FromStr for BloodType {
    type Err = ParseBloodTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        let (group, rh_positive) = if let Some(group) = upper.strip_suffix('+') {
            (group, true)
        } else if let Some(group) = upper.strip_suffix('-') {
            (group, false)
        } else {
            return Err(ParseBloodTypeError(s.to_string()));
        };
        let group = match group {
            "O" => AboGroup::O,
            "A" => AboGroup::A,
            "B" => AboGroup::B,
            "AB" => AboGroup::AB,
            _ => return Err(ParseBloodTypeError(s.to_string())),
        };
        Ok(BloodType::new(group, rh_positive))
    }
}

impl TryFrom<String> for BloodType {
    type Error = ParseBloodTypeError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<BloodType> for String {
    fn from(t: BloodType) -> Self {
        t.to_string()
    }
}

/// First word of `text` that names a blood type, ignoring surrounding punctuation.
pub fn extract_blood_type(text: &str) -> Option<BloodType> {
    text.split_whitespace()
        .map(|word| word.trim_matches(|c| matches!(c, ',' | '.' | '?' | '!' | '¿' | '¡')))
        .find_map(|word| word.parse().ok())
}

/// Join types for display, e.g. `"O-, O+"`.
pub fn join_types(types: &[BloodType]) -> String {
    types
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
