//! Market data wire records
//!
//! Shapes returned by the quote API. Numeric fields arrive either as JSON
//! numbers or as numeric strings depending on endpoint and account type, so
//! they stay as [`NumericField`] until the pipeline parses them.

use serde::{Deserialize, Deserializer, Serialize};

/// A number that may have been sent as a string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericField {
    Number(f64),
    Text(String),
}

impl NumericField {
    /// Parse to a finite float, `None` if the value is not numeric
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NumericField::Number(n) => Some(*n).filter(|v| v.is_finite()),
            NumericField::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }
}

impl From<f64> for NumericField {
    fn from(value: f64) -> Self {
        NumericField::Number(value)
    }
}

impl From<&str> for NumericField {
    fn from(value: &str) -> Self {
        NumericField::Text(value.to_string())
    }
}

/// Deserialize a value that could be either a string or an integer
fn deserialize_string_or_int<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrInt {
        String(String),
        Int(u32),
    }

    match StringOrInt::deserialize(deserializer)? {
        StringOrInt::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
        StringOrInt::Int(i) => Ok(i),
    }
}

/// Quote detail block (`QuoteData[].All`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawQuote {
    #[serde(default)]
    pub bid: Option<NumericField>,
    #[serde(default)]
    pub ask: Option<NumericField>,
    #[serde(default)]
    pub high52: Option<NumericField>,
    #[serde(default)]
    pub low52: Option<NumericField>,
    #[serde(default)]
    pub beta: Option<NumericField>,
    #[serde(default)]
    pub next_earning_date: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
}

/// Expiry cadence as reported by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExpiryCadence {
    Monthly,
    Weekly,
    Quarterly,
    Daily,
    #[serde(other)]
    Other,
}

/// One entry of the option expiry date list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawExpiryDate {
    #[serde(deserialize_with = "deserialize_string_or_int")]
    pub year: u32,
    #[serde(deserialize_with = "deserialize_string_or_int")]
    pub month: u32,
    #[serde(deserialize_with = "deserialize_string_or_int")]
    pub day: u32,
    pub expiry_type: ExpiryCadence,
}

/// One leg (put or call) of an option pair
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionLeg {
    #[serde(default)]
    pub bid: Option<NumericField>,
    #[serde(default)]
    pub ask: Option<NumericField>,
    #[serde(default)]
    pub last_price: Option<NumericField>,
    #[serde(default)]
    pub volume: Option<NumericField>,
    #[serde(default)]
    pub open_interest: Option<NumericField>,
    #[serde(default)]
    pub strike_price: Option<NumericField>,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub option_type: String,
    #[serde(default)]
    pub net_change: Option<NumericField>,
    #[serde(rename = "OptionGreeks", default)]
    pub option_greeks: Option<serde_json::Value>,
}

/// Call/put pair sharing a strike in an option chain
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptionPair {
    #[serde(rename = "Call", default)]
    pub call: Option<OptionLeg>,
    #[serde(rename = "Put", default)]
    pub put: Option<OptionLeg>,
}
