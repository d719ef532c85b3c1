use std::path::Path;

use kube::{
    api::ListParams,
    config::{KubeConfigOptions, Kubeconfig},
    Api, Client, Config,
};
use openshift_route_crds::Route;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Builds a client from an explicit kubeconfig file when one is given, or
/// the in-cluster/default configuration otherwise. `master_url` overrides the
/// API server address of whichever configuration was loaded.
pub async fn client(master_url: Option<&str>, kubeconfig: Option<&Path>) -> Result<Client> {
    let mut config = match kubeconfig {
        Some(path) => {
            debug!(path = %path.display(), "loading kubeconfig");
            let kubeconfig = Kubeconfig::read_from(path)?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?
        }
        None => Config::infer().await?,
    };

    if let Some(url) = master_url.filter(|url| !url.is_empty()) {
        config.cluster_url = url
            .parse()
            .map_err(|e| Error::Config(format!("invalid kubernetes master url {url}: {e}")))?;
    }

    Ok(Client::try_from(config)?)
}

pub async fn list_routes(client: Client, namespace: &str) -> Result<Vec<Route>> {
    let routes = Api::<Route>::namespaced(client, namespace)
        .list(&ListParams::default())
        .await?
        .items;

    info!(namespace, count = routes.len(), "listed routes");

    Ok(routes)
}
