//! Client and policy records as delivered by the back-office API

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Primary key shared by clients and policies
pub type RecordId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ClientStatus {
    New,
    Active,
    Vip,
    Inactive,
    /// Value the API sent that this build does not know
    Other(String),
}

impl ClientStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::New => "new",
            Self::Active => "active",
            Self::Vip => "vip",
            Self::Inactive => "inactive",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for ClientStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "new" => Self::New,
            "active" => Self::Active,
            "vip" => Self::Vip,
            "inactive" => Self::Inactive,
            _ => Self::Other(s),
        }
    }
}

impl From<ClientStatus> for String {
    fn from(status: ClientStatus) -> Self {
        status.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PolicyStatus {
    Active,
    Pending,
    Expired,
    Other(String),
}

impl PolicyStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Expired => "expired",
            Self::Other(s) => s,
        }
    }

    /// Policies that count towards the renewal rate
    pub fn is_in_force(&self) -> bool {
        matches!(self, Self::Active | Self::Pending)
    }
}

impl From<String> for PolicyStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "active" => Self::Active,
            "pending" => Self::Pending,
            "expired" => Self::Expired,
            _ => Self::Other(s),
        }
    }
}

impl From<PolicyStatus> for String {
    fn from(status: PolicyStatus) -> Self {
        status.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: RecordId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub legal_name: Option<String>,
    /// Taxpayer number
    #[serde(default)]
    pub inn: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub client_status: Option<ClientStatus>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub revenue: Option<f64>,
    #[serde(default)]
    pub revenue_currency: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub credit_limit: Option<f64>,
    #[serde(default)]
    pub limit_currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub id: RecordId,
    /// Owning client; may point at a client that is not in the snapshot
    #[serde(default)]
    pub client: Option<RecordId>,
    /// Denormalized client name some API versions include
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub creation_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub premium: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub net_premium: Option<f64>,
    #[serde(default)]
    pub premium_currency: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub insurance_amount: Option<f64>,
    #[serde(default)]
    pub insurance_amount_currency: Option<String>,
    /// Rate in percent
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rate: Option<f64>,
    #[serde(default, deserialize_with = "non_empty")]
    pub status: Option<PolicyStatus>,
    #[serde(default, deserialize_with = "non_empty")]
    pub underwriter: Option<String>,
    #[serde(default)]
    pub coverage_type: Option<String>,
    #[serde(default)]
    pub insurance_term: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Policy {
    pub fn premium_or_zero(&self) -> f64 {
        self.premium.unwrap_or(0.0)
    }

    pub fn rate_or_zero(&self) -> f64 {
        self.rate.unwrap_or(0.0)
    }
}

/// Accepts a JSON number, a numeric string (decimal fields) or null/"".
fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            match trimmed.parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(Some(n)),
                _ => Err(D::Error::custom(format!("invalid number '{}'", s))),
            }
        }
    }
}

/// `YYYY-MM-DD`, RFC 3339, or a naive `YYYY-MM-DDTHH:MM:SS`. Anything
/// unreadable becomes `None` and the policy is reported as undated.
fn lenient_date<'de, D>(deserializer: D) -> std::result::Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().map(str::trim).and_then(parse_date))
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    if s.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|dt| dt.date())
}

/// Empty strings collapse into `None`.
fn non_empty<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()).map(T::from))
}
