use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// Swap-history record in the shape of the Helius enhanced transactions API.
/// Only the fields the classifier consults are modelled; everything else is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawSwapEvent {
    pub signature: String,

    /// Unix timestamp in seconds
    #[serde(default)]
    pub timestamp: i64,

    #[serde(default)]
    pub events: Option<SwapEvents>,
}

impl RawSwapEvent {
    pub fn swap(&self) -> Option<&SwapPayload> {
        self.events.as_ref()?.swap.as_ref()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SwapEvents {
    #[serde(default)]
    pub swap: Option<SwapPayload>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SwapPayload {
    #[serde(rename = "nativeInput", default)]
    pub native_input: Option<NativeAmount>,
    #[serde(rename = "nativeOutput", default)]
    pub native_output: Option<NativeAmount>,
    #[serde(rename = "tokenInputs", default)]
    pub token_inputs: Option<Vec<TokenAmount>>,
    #[serde(rename = "tokenOutputs", default)]
    pub token_outputs: Option<Vec<TokenAmount>>,
}

/// Lamport amount moved in or out of the wallet
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NativeAmount {
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub amount: RawAmount,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TokenAmount {
    #[serde(rename = "userAccount", default)]
    pub user_account: Option<String>,
    /// Empty when upstream omitted it; such an entry cannot be resolved
    #[serde(default)]
    pub mint: String,
    #[serde(rename = "rawTokenAmount", default)]
    pub raw_token_amount: Option<RawTokenAmount>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawTokenAmount {
    #[serde(rename = "tokenAmount", default, deserialize_with = "null_as_zero")]
    pub token_amount: RawAmount,
    #[serde(default)]
    pub decimals: Option<u32>,
}

/// Integer amount that upstream sends either as a JSON string or a JSON number
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawAmount {
    Integer(u64),
    Float(f64),
    Text(String),
}

impl Default for RawAmount {
    fn default() -> Self {
        RawAmount::Integer(0)
    }
}

/// Upstream sends `null` for amounts it could not compute
fn null_as_zero<'de, D>(deserializer: D) -> Result<RawAmount, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawAmount>::deserialize(deserializer)?.unwrap_or_default())
}

impl RawAmount {
    /// Parse into a decimal; anything unparsable or non-finite becomes zero
    pub fn to_decimal(&self) -> Decimal {
        match self {
            RawAmount::Integer(value) => Decimal::from(*value),
            RawAmount::Float(value) => {
                if value.is_finite() {
                    Decimal::from_f64(*value).unwrap_or(Decimal::ZERO)
                } else {
                    Decimal::ZERO
                }
            }
            RawAmount::Text(text) => {
                let text = text.trim();
                Decimal::from_str(text)
                    .or_else(|_| Decimal::from_scientific(text))
                    .unwrap_or(Decimal::ZERO)
            }
        }
    }
}
