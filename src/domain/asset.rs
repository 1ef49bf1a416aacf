//! Asset and side enumerations for the futures ledger.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Assets the oracle publishes prices for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Asset {
    /// Bitcoin, quoted in USD.
    Btc,
    /// Gold (troy ounce), quoted in USD.
    Xau,
}

impl Asset {
    /// Oracle symbol for this asset.
    #[must_use]
    pub fn symbol(&self) -> &'static str {
        match self {
            Asset::Btc => "BTC",
            Asset::Xau => "XAU",
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Asset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BTC" => Ok(Asset::Btc),
            "XAU" | "GOLD" => Ok(Asset::Xau),
            other => Err(format!("unknown asset '{other}'")),
        }
    }
}

/// Which direction the position creator takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Sign applied to the long party's profit to get this side's profit.
    #[must_use]
    pub fn sign(&self) -> i128 {
        match self {
            Side::Long => 1,
            Side::Short => -1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => f.write_str("LONG"),
            Side::Short => f.write_str("SHORT"),
        }
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "long" => Ok(Side::Long),
            "short" => Ok(Side::Short),
            other => Err(format!("unknown side '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_parses_case_insensitively() {
        assert_eq!("btc".parse::<Asset>().unwrap(), Asset::Btc);
        assert_eq!("GOLD".parse::<Asset>().unwrap(), Asset::Xau);
        assert!("doge".parse::<Asset>().is_err());
    }

    #[test]
    fn side_sign() {
        assert_eq!(Side::Long.sign(), 1);
        assert_eq!(Side::Short.sign(), -1);
    }
}
