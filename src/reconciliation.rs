use std::collections::HashMap;

use kube::ResourceExt as _;
use openshift_route_crds::Route;
use tracing::{debug, info};

use crate::{
    error::Result,
    newrelic::{
        entity::{
            TAG_ROUTE_NAME, TAG_ROUTE_NAMESPACE, TAG_ROUTE_TO_KIND, TAG_ROUTE_TO_NAME, TAG_TEAM,
            TYPE_MONITOR,
        },
        monitor::MonitorOptions,
        Monitor, MonitorRegistry, MonitorStatus, MonitorType, Tag,
    },
};

/// Settings shared by every monitor provisioned in one run.
#[derive(Debug, Clone)]
pub struct MonitorTemplate {
    pub kind: MonitorType,
    pub frequency: u32,
    pub location: String,
    pub sla_threshold: f64,
    pub team: String,
}

#[derive(Debug, Default, PartialEq)]
pub struct SyncReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub skipped: Vec<String>,
    pub tagged: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    Create,
    Update,
}

/// Builds the address a monitor checks for a route. Paths are rooted with a
/// leading slash, and non-root paths get a trailing one so the check is not
/// redirected to it.
pub fn route_url(route: &Route) -> String {
    let scheme = if route.tls_enabled() { "https" } else { "http" };

    let mut path = route.path().to_string();
    if !path.is_empty() && !path.starts_with('/') {
        path.insert(0, '/');
    }
    if !path.is_empty() && path != "/" && !path.ends_with('/') {
        path.push('/');
    }

    format!("{scheme}://{}{path}", route.spec.host)
}

/// The monitor a route should have, or `None` when the route cannot be
/// reached from outside the cluster.
pub fn build_monitor(route: &Route, template: &MonitorTemplate) -> Option<Monitor> {
    if route.is_ip_whitelisted() {
        return None;
    }

    let url = route_url(route);

    let status = if route.synthetics_disabled() {
        MonitorStatus::Disabled
    } else {
        MonitorStatus::Enabled
    };

    Some(Monitor {
        id: None,
        name: url.clone(),
        kind: template.kind,
        frequency: template.frequency,
        uri: url,
        locations: vec![template.location.clone()],
        status,
        sla_threshold: template.sla_threshold,
        options: MonitorOptions::default(),
    })
}

/// Provenance tags linking a monitor back to the route it was built from.
pub fn route_tags(route: &Route, team: &str) -> Vec<Tag> {
    vec![
        Tag::new(TAG_ROUTE_NAMESPACE, route.namespace().unwrap_or_default()),
        Tag::new(TAG_ROUTE_NAME, route.name_any()),
        Tag::new(TAG_ROUTE_TO_KIND, route.target().kind.clone()),
        Tag::new(TAG_ROUTE_TO_NAME, route.target().name.clone()),
        Tag::new(TAG_TEAM, team),
    ]
}

/// Creates or updates one monitor per route, then tags every monitor that
/// was written. Nothing is written when `dry_run` is set.
pub async fn sync<R: MonitorRegistry + ?Sized>(
    registry: &R,
    routes: &[Route],
    template: &MonitorTemplate,
    dry_run: bool,
) -> Result<SyncReport> {
    let mut existing: HashMap<String, Monitor> = registry
        .list_monitors()
        .await?
        .into_iter()
        .map(|monitor| (monitor.name.clone(), monitor))
        .collect();

    debug!(count = existing.len(), "indexed existing monitors");

    let mut report = SyncReport::default();
    let mut tags: HashMap<String, Vec<Tag>> = HashMap::new();

    for route in routes {
        let Some(mut monitor) = build_monitor(route, template) else {
            info!(%route, url = %route_url(route), "skipping route with an ip whitelist");
            report.skipped.push(route.to_string());
            continue;
        };

        let change = match existing.get(&monitor.name) {
            Some(current) => {
                monitor.id = current.id.clone();
                Change::Update
            }
            None => Change::Create,
        };

        if dry_run {
            info!(
                %route,
                monitor = %monitor.name,
                status = %monitor.status,
                ?change,
                "dry run, monitor left untouched"
            );
            record(&mut report, change, monitor.name.clone());
            existing.insert(monitor.name.clone(), monitor);
            continue;
        }

        let applied = match change {
            Change::Create => {
                info!(%route, monitor = %monitor.name, "creating monitor");
                registry.create_monitor(&monitor).await?
            }
            Change::Update => {
                info!(%route, monitor = %monitor.name, id = ?monitor.id, "updating monitor");
                registry.update_monitor(&monitor).await?
            }
        };

        tags.insert(applied.name.clone(), route_tags(route, &template.team));
        record(&mut report, change, applied.name.clone());
        existing.insert(applied.name.clone(), applied);
    }

    if !tags.is_empty() {
        report.tagged = apply_tags(registry, &tags).await?;
    }

    info!(
        created = report.created.len(),
        updated = report.updated.len(),
        skipped = report.skipped.len(),
        tagged = report.tagged,
        dry_run,
        "sync finished"
    );

    Ok(report)
}

fn record(report: &mut SyncReport, change: Change, name: String) {
    match change {
        Change::Create => report.created.push(name),
        Change::Update => report.updated.push(name),
    }
}

/// Monitors are only addressable by tag through their entity, so look the
/// entities up and tag the ones written during this run.
async fn apply_tags<R: MonitorRegistry + ?Sized>(
    registry: &R,
    tags: &HashMap<String, Vec<Tag>>,
) -> Result<usize> {
    let mut tagged = 0;

    for entity in registry.search_entities(TYPE_MONITOR).await? {
        let Some(entity_tags) = tags.get(&entity.name) else {
            continue;
        };

        debug!(monitor = %entity.name, guid = %entity.guid, "tagging monitor");
        registry.add_tags(&entity.guid, entity_tags).await?;
        tagged += 1;
    }

    Ok(tagged)
}
