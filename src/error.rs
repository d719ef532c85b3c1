use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to load kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    #[error("failed to infer kubernetes configuration: {0}")]
    InferConfig(#[from] kube::config::InferConfigError),

    #[error("kubernetes api error: {0}")]
    Kube(#[from] kube::Error),

    #[error("new relic transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("new relic api responded {status}: {body}")]
    Api { status: u16, body: String },

    #[error("new relic graphql error: {0}")]
    GraphQl(String),

    #[error("monitor {0} has no identifier")]
    MissingMonitorId(String),

    #[error("entity {entity} is missing the {key} tag")]
    MissingTag { entity: String, key: &'static str },
}
