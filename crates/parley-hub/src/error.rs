use hf_hub::api::tokio::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("failed to initialize the model hub client")]
    InitClient {
        #[source]
        source: ApiError,
    },

    #[error("failed to fetch {file_name} from {repo_id}")]
    Fetch {
        repo_id: String,
        file_name: String,
        #[source]
        source: ApiError,
    },
}
