use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Entity type under which synthetic monitors are indexed.
pub const TYPE_MONITOR: &str = "MONITOR";

pub const TAG_ROUTE_NAMESPACE: &str = "openshiftRouteNamespace";
pub const TAG_ROUTE_NAME: &str = "openshiftRouteName";
pub const TAG_ROUTE_TO_KIND: &str = "openshiftRouteToKind";
pub const TAG_ROUTE_TO_NAME: &str = "openshiftRouteToName";
pub const TAG_TEAM: &str = "team";

pub const DEFAULT_TEAM: &str = "sapp";

/// Search result wrapping a synthetic monitor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub guid: String,
    pub name: String,
    #[serde(default)]
    pub monitor_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub values: Vec<String>,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            values: vec![value.into()],
        }
    }
}

fn first_value<'a>(entity: &str, tags: &'a [Tag], key: &'static str) -> Result<&'a str> {
    tags.iter()
        .find(|tag| tag.key == key)
        .and_then(|tag| tag.values.first())
        .map(String::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| Error::MissingTag {
            entity: entity.to_string(),
            key,
        })
}

/// Recovers the namespace and name of the route a monitor was provisioned for.
pub fn route_provenance<'a>(entity: &str, tags: &'a [Tag]) -> Result<(&'a str, &'a str)> {
    Ok((
        first_value(entity, tags, TAG_ROUTE_NAMESPACE)?,
        first_value(entity, tags, TAG_ROUTE_NAME)?,
    ))
}
