use async_trait::async_trait;
use reqwest::{header::LOCATION, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::debug;

use super::{Entity, ListMonitorsResponse, Monitor, MonitorRegistry, Region, Tag};
use crate::error::{Error, Result};

const SEARCH_ENTITIES_QUERY: &str = r#"
query($query: String!, $cursor: String) {
  actor {
    entitySearch(query: $query) {
      results(cursor: $cursor) {
        nextCursor
        entities {
          guid
          name
          ... on SyntheticMonitorEntityOutline {
            monitorId
          }
        }
      }
    }
  }
}"#;

const LIST_TAGS_QUERY: &str = r#"
query($guid: EntityGuid!) {
  actor {
    entity(guid: $guid) {
      tags {
        key
        values
      }
    }
  }
}"#;

const ADD_TAGS_MUTATION: &str = r#"
mutation($guid: EntityGuid!, $tags: [TaggingTagInput!]!) {
  taggingAddTagsToEntity(guid: $guid, tags: $tags) {
    errors {
      message
      type
    }
  }
}"#;

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchData {
    actor: SearchActor,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchActor {
    entity_search: EntitySearch,
}

#[derive(Deserialize)]
struct EntitySearch {
    results: EntitySearchResults,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EntitySearchResults {
    next_cursor: Option<String>,
    #[serde(default)]
    entities: Vec<Entity>,
}

#[derive(Deserialize)]
struct TagsData {
    actor: TagsActor,
}

#[derive(Deserialize)]
struct TagsActor {
    entity: Option<TaggedEntity>,
}

#[derive(Deserialize)]
struct TaggedEntity {
    #[serde(default)]
    tags: Vec<Tag>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddTagsData {
    tagging_add_tags_to_entity: MutationResult,
}

#[derive(Deserialize)]
struct MutationResult {
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

fn join_errors(errors: &[GraphQlError]) -> String {
    errors
        .iter()
        .map(|error| error.message.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Talks to the Synthetics REST API for monitors and to NerdGraph for
/// entities and tags.
pub struct NewRelicClient {
    http: reqwest::Client,
    api_key: String,
    region: Region,
}

impl NewRelicClient {
    pub fn new(api_key: impl Into<String>, region: Region) -> Result<Self> {
        let api_key = api_key.into();

        if api_key.trim().is_empty() {
            return Err(Error::Config("new relic api key is empty".to_string()));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            http,
            api_key,
            region,
        })
    }

    fn monitors_url(&self, id: Option<&str>) -> String {
        match id {
            Some(id) => format!("{}/v4/monitors/{id}", self.region.synthetics_url()),
            None => format!("{}/v4/monitors", self.region.synthetics_url()),
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.header("Api-Key", &self.api_key).send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(response)
        } else {
            Err(Error::Api {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }

    async fn graphql<T: DeserializeOwned + Send>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T> {
        let response: GraphQlResponse<T> = self
            .send(
                self.http
                    .post(self.region.nerdgraph_url())
                    .json(&json!({ "query": query, "variables": variables })),
            )
            .await?
            .json()
            .await?;

        if !response.errors.is_empty() {
            return Err(Error::GraphQl(join_errors(&response.errors)));
        }

        response
            .data
            .ok_or_else(|| Error::GraphQl("response carried no data".to_string()))
    }
}

/// The created monitor's identifier is the last segment of its location.
fn monitor_id_from_location(location: &str) -> Option<&str> {
    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
}

#[async_trait]
impl MonitorRegistry for NewRelicClient {
    async fn list_monitors_page(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<ListMonitorsResponse> {
        debug!(limit, offset, "listing monitors");

        Ok(self
            .send(
                self.http
                    .get(self.monitors_url(None))
                    .query(&[("limit", limit), ("offset", offset)]),
            )
            .await?
            .json()
            .await?)
    }

    async fn create_monitor(&self, monitor: &Monitor) -> Result<Monitor> {
        let response = self
            .send(self.http.post(self.monitors_url(None)).json(monitor))
            .await?;

        let id = response
            .headers()
            .get(LOCATION)
            .and_then(|location| location.to_str().ok())
            .and_then(monitor_id_from_location)
            .ok_or_else(|| Error::MissingMonitorId(monitor.name.clone()))?;

        Ok(Monitor {
            id: Some(id.to_string()),
            ..monitor.clone()
        })
    }

    async fn update_monitor(&self, monitor: &Monitor) -> Result<Monitor> {
        let id = monitor
            .id
            .as_deref()
            .ok_or_else(|| Error::MissingMonitorId(monitor.name.clone()))?;

        self.send(self.http.put(self.monitors_url(Some(id))).json(monitor))
            .await?;

        Ok(monitor.clone())
    }

    async fn delete_monitor(&self, id: &str) -> Result<()> {
        self.send(self.http.delete(self.monitors_url(Some(id))))
            .await?;

        Ok(())
    }

    async fn search_entities(&self, entity_type: &str) -> Result<Vec<Entity>> {
        let query = format!("type = '{entity_type}'");
        let mut cursor: Option<String> = None;
        let mut entities = Vec::new();

        loop {
            let data: SearchData = self
                .graphql(
                    SEARCH_ENTITIES_QUERY,
                    json!({ "query": query, "cursor": cursor }),
                )
                .await?;

            let results = data.actor.entity_search.results;
            entities.extend(results.entities);

            match results.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }

        debug!(entity_type, count = entities.len(), "searched entities");

        Ok(entities)
    }

    async fn list_tags(&self, guid: &str) -> Result<Vec<Tag>> {
        let data: TagsData = self
            .graphql(LIST_TAGS_QUERY, json!({ "guid": guid }))
            .await?;

        Ok(data
            .actor
            .entity
            .map(|entity| entity.tags)
            .unwrap_or_default())
    }

    async fn add_tags(&self, guid: &str, tags: &[Tag]) -> Result<()> {
        let data: AddTagsData = self
            .graphql(ADD_TAGS_MUTATION, json!({ "guid": guid, "tags": tags }))
            .await?;

        let errors = data.tagging_add_tags_to_entity.errors;
        if !errors.is_empty() {
            return Err(Error::GraphQl(join_errors(&errors)));
        }

        Ok(())
    }
}
