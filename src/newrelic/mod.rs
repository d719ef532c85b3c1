//! New Relic Synthetics monitors and the entities/tags wrapping them.

use async_trait::async_trait;
use clap::ValueEnum;
use tracing::debug;

use crate::error::Result;

mod client;
pub mod entity;
pub mod monitor;

pub use client::NewRelicClient;
pub use entity::{Entity, Tag};
pub use monitor::{ListMonitorsResponse, Monitor, MonitorStatus, MonitorType};

/// Page size used when listing monitors.
pub const LIST_MONITORS_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Region {
    #[default]
    Us,
    Eu,
}

impl Region {
    pub fn synthetics_url(&self) -> &'static str {
        match self {
            Region::Us => "https://synthetics.newrelic.com/synthetics/api",
            Region::Eu => "https://synthetics.eu.newrelic.com/synthetics/api",
        }
    }

    pub fn nerdgraph_url(&self) -> &'static str {
        match self {
            Region::Us => "https://api.newrelic.com/graphql",
            Region::Eu => "https://api.eu.newrelic.com/graphql",
        }
    }
}

/// Operations the reconciler needs from the monitoring service.
#[async_trait]
pub trait MonitorRegistry: Send + Sync {
    async fn list_monitors_page(&self, limit: usize, offset: usize)
        -> Result<ListMonitorsResponse>;

    /// Collects every page, stopping at the first one shorter than the limit.
    /// The entries returned drive paging, not the page's reported `count`.
    async fn list_monitors(&self) -> Result<Vec<Monitor>> {
        let mut monitors = Vec::new();
        let mut offset = 0;

        loop {
            let page = self.list_monitors_page(LIST_MONITORS_LIMIT, offset).await?;
            let count = page.monitors.len();
            debug!(offset, count, reported = page.count, "listed monitor page");
            monitors.extend(page.monitors);

            if count != LIST_MONITORS_LIMIT {
                break;
            }

            offset += count;
        }

        Ok(monitors)
    }

    /// Returns the monitor as created, carrying its assigned identifier.
    async fn create_monitor(&self, monitor: &Monitor) -> Result<Monitor>;

    async fn update_monitor(&self, monitor: &Monitor) -> Result<Monitor>;

    async fn delete_monitor(&self, id: &str) -> Result<()>;

    async fn search_entities(&self, entity_type: &str) -> Result<Vec<Entity>>;

    async fn list_tags(&self, guid: &str) -> Result<Vec<Tag>>;

    async fn add_tags(&self, guid: &str, tags: &[Tag]) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod fake {
    //! In-memory registry recording every mutating call.

    use std::{collections::BTreeMap, sync::Mutex};

    use super::*;
    use crate::error::Error;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Create(String),
        Update(String, String),
        Delete(String),
        AddTags(String, Vec<Tag>),
    }

    #[derive(Default)]
    pub struct FakeRegistry {
        pub monitors: Mutex<Vec<Monitor>>,
        pub entities: Vec<Entity>,
        pub tags: BTreeMap<String, Vec<Tag>>,
        pub calls: Mutex<Vec<Call>>,
        pub pages_served: Mutex<usize>,
        /// Overrides the `count` reported on every page.
        pub reported_count: Option<usize>,
        pub fail_updates: bool,
        pub fail_tag_reads: bool,
    }

    impl FakeRegistry {
        pub fn with_monitors(monitors: Vec<Monitor>) -> Self {
            Self {
                monitors: Mutex::new(monitors),
                ..Default::default()
            }
        }

        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: Call) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl MonitorRegistry for FakeRegistry {
        async fn list_monitors_page(
            &self,
            limit: usize,
            offset: usize,
        ) -> Result<ListMonitorsResponse> {
            *self.pages_served.lock().unwrap() += 1;

            let monitors: Vec<Monitor> = self
                .monitors
                .lock()
                .unwrap()
                .iter()
                .skip(offset)
                .take(limit)
                .cloned()
                .collect();

            Ok(ListMonitorsResponse {
                count: self.reported_count.unwrap_or(monitors.len()),
                monitors,
            })
        }

        async fn create_monitor(&self, monitor: &Monitor) -> Result<Monitor> {
            self.record(Call::Create(monitor.name.clone()));

            let mut monitors = self.monitors.lock().unwrap();
            let created = Monitor {
                id: Some(format!("id-{}", monitors.len())),
                ..monitor.clone()
            };
            monitors.push(created.clone());

            Ok(created)
        }

        async fn update_monitor(&self, monitor: &Monitor) -> Result<Monitor> {
            let id = monitor
                .id
                .clone()
                .ok_or_else(|| Error::MissingMonitorId(monitor.name.clone()))?;

            if self.fail_updates {
                return Err(Error::Api {
                    status: 500,
                    body: "internal error".to_string(),
                });
            }

            self.record(Call::Update(monitor.name.clone(), id));
            Ok(monitor.clone())
        }

        async fn delete_monitor(&self, id: &str) -> Result<()> {
            self.record(Call::Delete(id.to_string()));
            Ok(())
        }

        async fn search_entities(&self, _entity_type: &str) -> Result<Vec<Entity>> {
            Ok(self.entities.clone())
        }

        async fn list_tags(&self, guid: &str) -> Result<Vec<Tag>> {
            if self.fail_tag_reads {
                return Err(Error::GraphQl("not authorized".to_string()));
            }

            Ok(self.tags.get(guid).cloned().unwrap_or_default())
        }

        async fn add_tags(&self, guid: &str, tags: &[Tag]) -> Result<()> {
            self.record(Call::AddTags(guid.to_string(), tags.to_vec()));
            Ok(())
        }
    }

    pub fn monitor(id: &str, name: &str) -> Monitor {
        Monitor {
            id: Some(id.to_string()),
            name: name.to_string(),
            kind: MonitorType::Ping,
            frequency: 60,
            uri: name.to_string(),
            locations: vec!["AWS_AP_SOUTHEAST_2".to_string()],
            status: MonitorStatus::Enabled,
            sla_threshold: 7.0,
            options: Default::default(),
        }
    }

    pub fn entity(guid: &str, name: &str, monitor_id: Option<&str>) -> Entity {
        Entity {
            guid: guid.to_string(),
            name: name.to_string(),
            monitor_id: monitor_id.map(str::to_string),
        }
    }
}
