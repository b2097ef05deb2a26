use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::str::FromStr;

use crate::errors::CoreError;

use super::attribute::Attribute;

/// How selected attribute values pick symbols, and how successive
/// filter rounds combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FilterMode {
    /// Symbols whose value is selected. Rounds are unioned.
    #[default]
    Any,
    /// Symbols whose value is selected. Rounds are intersected.
    All,
    /// Symbols whose value is not selected. Rounds are intersected.
    Exclude,
}

impl std::fmt::Display for FilterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterMode::Any => write!(f, "Any"),
            FilterMode::All => write!(f, "All"),
            FilterMode::Exclude => write!(f, "Exclude"),
        }
    }
}

impl FromStr for FilterMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Any" => Ok(FilterMode::Any),
            "All" => Ok(FilterMode::All),
            "Exclude" => Ok(FilterMode::Exclude),
            _ => Err(CoreError::InvalidMode(s.to_string())),
        }
    }
}

/// One filter round: an attribute and the values selected for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriterion {
    pub attribute: Attribute,
    pub selected_values: BTreeSet<String>,
}

impl FilterCriterion {
    pub fn new<I, S>(attribute: Attribute, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            attribute,
            selected_values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse the attribute by name, failing with `InvalidAttribute`.
    pub fn parse<I, S>(attribute: &str, values: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Self::new(attribute.parse()?, values))
    }
}

/// A set of related attributes from which one is chosen per round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterGroup {
    pub attributes: &'static [Attribute],
}

impl FilterGroup {
    /// The sidebar's groups, in evaluation order.
    pub const DEFAULT: [FilterGroup; 4] = [
        FilterGroup {
            attributes: &[Attribute::AssetType],
        },
        FilterGroup {
            attributes: &[Attribute::Exchange],
        },
        FilterGroup {
            attributes: &[Attribute::Sector, Attribute::Industry],
        },
        FilterGroup {
            attributes: &[Attribute::Country, Attribute::State, Attribute::City],
        },
    ];

    #[must_use]
    pub fn contains(&self, attribute: Attribute) -> bool {
        self.attributes.contains(&attribute)
    }
}
