use std::fmt::Display;

use kube::{CustomResource, ResourceExt as _};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Routes carrying this annotation restrict which source addresses may reach
/// them, so an external synthetic check cannot be expected to get through.
pub const IP_WHITELIST_ANNOTATION: &str = "haproxy.router.openshift.io/ip_whitelist";

/// Presence of this annotation switches the route's monitor off.
pub const SYNTHETICS_STATUS_ANNOTATION: &str = "one.newrelic.com/synthetics-status";

/// Subset of the `route.openshift.io/v1` Route spec which is relevant when
/// deriving a monitor from it. Unknown fields are ignored on deserialization.
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default, JsonSchema)]
#[kube(
    group = "route.openshift.io",
    version = "v1",
    kind = "Route",
    doc = "Route exposes a service under a public hostname and path",
    namespaced
)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    #[serde(default)]
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub to: RouteTargetReference,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternate_backends: Vec<RouteTargetReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wildcard_policy: Option<String>,
}

/// The object a route forwards traffic to, usually a `Service`.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteTargetReference {
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i32>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TlsConfig {
    pub termination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure_edge_termination_policy: Option<String>,
}

impl Route {
    /// A route serves HTTPS whenever it has any TLS configuration at all.
    pub fn tls_enabled(&self) -> bool {
        self.spec.tls.is_some()
    }

    pub fn is_ip_whitelisted(&self) -> bool {
        self.annotations().contains_key(IP_WHITELIST_ANNOTATION)
    }

    pub fn synthetics_disabled(&self) -> bool {
        self.annotations().contains_key(SYNTHETICS_STATUS_ANNOTATION)
    }

    pub fn path(&self) -> &str {
        self.spec.path.as_deref().unwrap_or_default()
    }

    pub fn target(&self) -> &RouteTargetReference {
        &self.spec.to
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}",
            self.namespace().unwrap_or_default(),
            self.name_any()
        )
    }
}
