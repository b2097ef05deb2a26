use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::CoreError;

use super::symbol::SymbolMetadata;

/// Metadata attributes symbols can be filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    AssetType,
    Exchange,
    Sector,
    Industry,
    Country,
    State,
    City,
}

type Accessor = fn(&SymbolMetadata) -> &str;

/// Closed accessor table, indexed by the enum discriminant.
const ACCESSORS: [(Attribute, Accessor); 7] = [
    (Attribute::AssetType, |m| m.asset_type.as_str()),
    (Attribute::Exchange, |m| m.exchange.as_str()),
    (Attribute::Sector, |m| m.sector.as_str()),
    (Attribute::Industry, |m| m.industry.as_str()),
    (Attribute::Country, |m| m.country.as_str()),
    (Attribute::State, |m| m.state.as_str()),
    (Attribute::City, |m| m.city.as_str()),
];

impl Attribute {
    pub const ALL: [Attribute; 7] = [
        Attribute::AssetType,
        Attribute::Exchange,
        Attribute::Sector,
        Attribute::Industry,
        Attribute::Country,
        Attribute::State,
        Attribute::City,
    ];

    /// Read this attribute's value from a symbol's metadata.
    #[must_use]
    pub fn value_of<'a>(&self, metadata: &'a SymbolMetadata) -> &'a str {
        let (attr, accessor) = ACCESSORS[*self as usize];
        debug_assert_eq!(attr, *self);
        accessor(metadata)
    }

    /// Human-readable label (e.g. "Asset Type").
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Attribute::AssetType => "Asset Type",
            Attribute::Exchange => "Exchange",
            Attribute::Sector => "Sector",
            Attribute::Industry => "Industry",
            Attribute::Country => "Country",
            Attribute::State => "State",
            Attribute::City => "City",
        }
    }
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Attribute::AssetType => "asset_type",
            Attribute::Exchange => "exchange",
            Attribute::Sector => "sector",
            Attribute::Industry => "industry",
            Attribute::Country => "country",
            Attribute::State => "state",
            Attribute::City => "city",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Attribute {
    type Err = CoreError;

    /// Accepts snake_case, camelCase and the legacy `home_exchange` name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != ' ')
            .collect::<String>()
            .to_lowercase();
        match key.as_str() {
            "assettype" => Ok(Attribute::AssetType),
            "exchange" | "homeexchange" => Ok(Attribute::Exchange),
            "sector" => Ok(Attribute::Sector),
            "industry" => Ok(Attribute::Industry),
            "country" => Ok(Attribute::Country),
            "state" => Ok(Attribute::State),
            "city" => Ok(Attribute::City),
            _ => Err(CoreError::InvalidAttribute(s.to_string())),
        }
    }
}
