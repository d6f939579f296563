//! Campaign posts and the filters used to list them.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::de::{lenient_amount, lenient_bool, lenient_count, string_or_number};

/// Geographic scope of a campaign message listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignScope {
    Constituency,
    Region,
    #[default]
    National,
}

impl CampaignScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignScope::Constituency => "constituency",
            CampaignScope::Region => "region",
            CampaignScope::National => "national",
        }
    }
}

impl fmt::Display for CampaignScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort order of a campaign message listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignSort {
    #[default]
    Latest,
    Popular,
}

impl CampaignSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignSort::Latest => "latest",
            CampaignSort::Popular => "popular",
        }
    }
}

impl fmt::Display for CampaignSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Query filters for `GET /campaign-messages`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CampaignQuery {
    pub scope: CampaignScope,
    pub sort: CampaignSort,
}

impl CampaignQuery {
    pub fn new(scope: CampaignScope, sort: CampaignSort) -> Self {
        Self { scope, sort }
    }

    pub fn to_pairs(&self) -> [(&'static str, &'static str); 2] {
        [("scope", self.scope.as_str()), ("sort", self.sort.as_str())]
    }
}

/// Author attached to a campaign message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(default)]
    pub name: Option<String>,
}

/// A campaign post as returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignMessage {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub likes_count: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub shares_count: u64,
    #[serde(default)]
    pub shareable_url: Option<String>,
    #[serde(default)]
    pub user: Option<Author>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub reads: u64,
    #[serde(default, alias = "isLiked", deserialize_with = "lenient_bool")]
    pub is_liked: bool,
    #[serde(default, alias = "isShared", deserialize_with = "lenient_bool")]
    pub is_shared: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl CampaignMessage {
    pub fn author_name(&self) -> &str {
        self.user
            .as_ref()
            .and_then(|u| u.name.as_deref())
            .unwrap_or("Campaign Team")
    }
}

/// Server reply to a like or share.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EngagementReceipt {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "optional_count")]
    pub likes_count: Option<u64>,
    #[serde(default, deserialize_with = "optional_count")]
    pub shares_count: Option<u64>,
    #[serde(default, alias = "points", deserialize_with = "optional_amount")]
    pub points_awarded: Option<f64>,
}

// Confirmed counters are only trusted when the server actually sent them,
// so null and absent stay distinct from zero.
fn optional_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => lenient_count(v).map(Some).map_err(serde::de::Error::custom),
    }
}

fn optional_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => lenient_amount(v).map(Some).map_err(serde::de::Error::custom),
    }
}
