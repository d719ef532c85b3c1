//! Removal of monitors which no longer correspond to a route.
//!
//! Two deletion policies exist. [`cleanup`] is the one meant for scheduled
//! runs: it only removes monitors whose provenance tags point at a route that
//! is gone from the namespace being cleaned. [`purge`] ignores routes
//! entirely and removes every monitor carrying a name prefix, for
//! decommissioning a whole installation by hand.

use std::collections::HashSet;

use kube::ResourceExt as _;
use openshift_route_crds::Route;
use tracing::{debug, error, info};

use crate::{
    error::{Error, Result},
    newrelic::{entity, MonitorRegistry},
};

#[derive(Debug, Default, PartialEq)]
pub struct DeletionReport {
    /// Monitors deleted, or that would have been deleted during a dry run.
    pub removed: Vec<String>,
    pub retained: usize,
    pub unreadable: usize,
}

async fn remove<R: MonitorRegistry + ?Sized>(
    registry: &R,
    report: &mut DeletionReport,
    name: &str,
    id: &str,
    dry_run: bool,
) -> Result<()> {
    if dry_run {
        info!(monitor = name, id, "dry run, monitor would have been deleted");
    } else {
        info!(monitor = name, id, "deleting monitor");
        registry.delete_monitor(id).await?;
    }

    report.removed.push(name.to_string());
    Ok(())
}

/// Deletes monitors in `namespace` whose route no longer exists. Monitors
/// without readable provenance tags are logged and left alone.
pub async fn cleanup<R: MonitorRegistry + ?Sized>(
    registry: &R,
    namespace: &str,
    routes: &[Route],
    dry_run: bool,
) -> Result<DeletionReport> {
    let live: HashSet<(String, String)> = routes
        .iter()
        .map(|route| (route.namespace().unwrap_or_default(), route.name_any()))
        .collect();

    let mut report = DeletionReport::default();

    for monitor in registry.search_entities(entity::TYPE_MONITOR).await? {
        let tags = registry.list_tags(&monitor.guid).await?;

        let (route_namespace, route_name) = match entity::route_provenance(&monitor.name, &tags)
        {
            Ok(provenance) => provenance,
            Err(e) => {
                error!(monitor = %monitor.name, "{e}");
                report.unreadable += 1;
                continue;
            }
        };

        if route_namespace != namespace {
            debug!(monitor = %monitor.name, route_namespace, "monitor belongs to another namespace");
            report.retained += 1;
            continue;
        }

        if live.contains(&(route_namespace.to_string(), route_name.to_string())) {
            debug!(monitor = %monitor.name, route_name, "route still exists");
            report.retained += 1;
            continue;
        }

        let Some(id) = monitor.monitor_id.as_deref() else {
            error!(
                monitor = %monitor.name,
                "{}",
                Error::MissingMonitorId(monitor.name.clone())
            );
            report.unreadable += 1;
            continue;
        };

        remove(registry, &mut report, &monitor.name, id, dry_run).await?;
    }

    info!(
        namespace,
        removed = report.removed.len(),
        retained = report.retained,
        unreadable = report.unreadable,
        dry_run,
        "cleanup finished"
    );

    Ok(report)
}

/// Deletes every monitor whose name starts with `prefix`.
pub async fn purge<R: MonitorRegistry + ?Sized>(
    registry: &R,
    prefix: &str,
    dry_run: bool,
) -> Result<DeletionReport> {
    if prefix.is_empty() {
        return Err(Error::Config(
            "refusing to purge with an empty monitor prefix".to_string(),
        ));
    }

    let mut report = DeletionReport::default();

    for monitor in registry.list_monitors().await? {
        if !monitor.name.starts_with(prefix) {
            report.retained += 1;
            continue;
        }

        let Some(id) = monitor.id.as_deref() else {
            error!(monitor = %monitor.name, "monitor has no identifier");
            report.unreadable += 1;
            continue;
        };

        remove(registry, &mut report, &monitor.name, id, dry_run).await?;
    }

    info!(
        prefix,
        removed = report.removed.len(),
        retained = report.retained,
        unreadable = report.unreadable,
        dry_run,
        "purge finished"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::newrelic::{
        entity::{Tag, TAG_ROUTE_NAME, TAG_ROUTE_NAMESPACE},
        fake::{entity, monitor, Call, FakeRegistry},
        Monitor,
    };
    use crate::reconciliation::tests::route;

    fn provenance(namespace: &str, name: &str) -> Vec<Tag> {
        vec![
            Tag::new(TAG_ROUTE_NAMESPACE, namespace),
            Tag::new(TAG_ROUTE_NAME, name),
        ]
    }

    fn registry() -> FakeRegistry {
        FakeRegistry {
            entities: vec![
                entity("g-live", "http://live.example.org", Some("m-live")),
                entity("g-gone", "http://gone.example.org", Some("m-gone")),
                entity("g-other", "http://other.example.org", Some("m-other")),
                entity("g-untagged", "http://manual.example.org", Some("m-manual")),
                entity("g-noid", "http://noid.example.org", None),
            ],
            tags: BTreeMap::from([
                ("g-live".to_string(), provenance("shop", "live")),
                ("g-gone".to_string(), provenance("shop", "gone")),
                ("g-other".to_string(), provenance("blog", "gone")),
                ("g-noid".to_string(), provenance("shop", "noid")),
            ]),
            ..FakeRegistry::default()
        }
    }

    #[tokio::test]
    async fn cleanup_deletes_monitors_without_routes() {
        let registry = registry();
        let routes = vec![route("shop", "live", "live.example.org", None)];

        let report = cleanup(&registry, "shop", &routes, false).await.unwrap();

        assert_eq!(registry.calls(), vec![Call::Delete("m-gone".to_string())]);
        assert_eq!(
            report,
            DeletionReport {
                removed: vec!["http://gone.example.org".to_string()],
                retained: 2,
                unreadable: 2,
            }
        );
    }

    #[tokio::test]
    async fn cleanup_matches_namespace_and_name() {
        let registry = registry();
        // Same name, different namespace: does not keep shop/gone alive.
        let routes = vec![
            route("shop", "live", "live.example.org", None),
            route("blog", "gone", "blog.example.org", None),
        ];

        cleanup(&registry, "shop", &routes, false).await.unwrap();

        assert_eq!(registry.calls(), vec![Call::Delete("m-gone".to_string())]);
    }

    #[tokio::test]
    async fn cleanup_dry_run_deletes_nothing() {
        let registry = registry();

        let report = cleanup(&registry, "shop", &[], true).await.unwrap();

        assert!(registry.calls().is_empty());
        assert_eq!(
            report.removed,
            vec!["http://live.example.org", "http://gone.example.org"]
        );
    }

    #[tokio::test]
    async fn cleanup_aborts_when_tags_cannot_be_read() {
        let registry = FakeRegistry {
            fail_tag_reads: true,
            ..registry()
        };

        let result = cleanup(&registry, "shop", &[], false).await;

        assert!(matches!(result, Err(Error::GraphQl(_))));
        assert!(registry.calls().is_empty());
    }

    #[tokio::test]
    async fn purge_deletes_by_prefix_only() {
        let registry = FakeRegistry::with_monitors(vec![
            monitor("1", "https://shop.example.org/"),
            monitor("2", "https://blog.example.org/"),
            monitor("3", "https://shop.example.org/store/"),
        ]);

        let report = purge(&registry, "https://shop.", false).await.unwrap();

        assert_eq!(
            registry.calls(),
            vec![
                Call::Delete("1".to_string()),
                Call::Delete("3".to_string())
            ]
        );
        assert_eq!(report.retained, 1);
    }

    #[tokio::test]
    async fn purge_skips_monitors_without_identifier() {
        let unsaved = Monitor {
            id: None,
            ..monitor("", "https://shop.example.org/cart/")
        };
        let registry = FakeRegistry::with_monitors(vec![
            monitor("1", "https://shop.example.org/"),
            unsaved,
            monitor("3", "https://shop.example.org/store/"),
        ]);

        let report = purge(&registry, "https://shop.", false).await.unwrap();

        assert_eq!(
            registry.calls(),
            vec![
                Call::Delete("1".to_string()),
                Call::Delete("3".to_string())
            ]
        );
        assert_eq!(
            report,
            DeletionReport {
                removed: vec![
                    "https://shop.example.org/".to_string(),
                    "https://shop.example.org/store/".to_string(),
                ],
                retained: 0,
                unreadable: 1,
            }
        );
    }

    #[tokio::test]
    async fn purge_dry_run_and_empty_prefix() {
        let registry = FakeRegistry::with_monitors(vec![monitor("1", "https://shop.example.org/")]);

        let report = purge(&registry, "https://", true).await.unwrap();
        assert_eq!(report.removed, vec!["https://shop.example.org/"]);
        assert!(registry.calls().is_empty());

        assert!(matches!(
            purge(&registry, "", false).await,
            Err(Error::Config(_))
        ));
    }
}
