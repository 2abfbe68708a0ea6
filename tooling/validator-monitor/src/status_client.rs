use crate::models::ValidatorSnapshot;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_GRAPHQL_ENDPOINT: &str = "https://cache-service.chainflip.io/graphql";

const VALIDATOR_QUERY: &str = "query GetValidatorByIdSs58($validatorId: String!) {
    validators: allValidators(condition: {idSs58: $validatorId}) {
        nodes {
            idSs58
            alias
            apyBp
            isCurrentAuthority
            isCurrentBackup
            isQualified
            isOnline
            isBidding
            isKeyholder
            reputationPoints
            lockedBalance
            unlockedBalance
        }
    }
}";

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("status endpoint returned {0}")]
    Status(StatusCode),
    #[error("graphql error: {0}")]
    GraphQl(String),
    #[error("response carried no data")]
    MissingData,
    #[error("no validator found for {0}")]
    NotFound(String),
}

/// Source of live validator snapshots.
#[async_trait::async_trait]
pub trait StatusSource: Send + Sync {
    async fn fetch(&self, identity: &str) -> Result<ValidatorSnapshot, UpstreamError>;
}

#[derive(Debug, Clone)]
pub struct ValidatorStatusClient {
    client: Client,
    endpoint: String,
}

impl ValidatorStatusClient {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait::async_trait]
impl StatusSource for ValidatorStatusClient {
    async fn fetch(&self, identity: &str) -> Result<ValidatorSnapshot, UpstreamError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({
                "query": VALIDATOR_QUERY,
                "variables": { "validatorId": identity },
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status));
        }

        let body = response.json::<GraphQlResponse>().await?;
        extract_snapshot(body, identity)
    }
}

fn extract_snapshot(
    response: GraphQlResponse,
    identity: &str,
) -> Result<ValidatorSnapshot, UpstreamError> {
    if !response.errors.is_empty() {
        let messages: Vec<String> = response
            .errors
            .into_iter()
            .map(|error| error.message)
            .collect();
        return Err(UpstreamError::GraphQl(messages.join("; ")));
    }

    response
        .data
        .ok_or(UpstreamError::MissingData)?
        .validators
        .nodes
        .into_iter()
        .next()
        .ok_or_else(|| UpstreamError::NotFound(identity.to_owned()))
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<ValidatorsData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct ValidatorsData {
    validators: ValidatorConnection,
}

#[derive(Debug, Deserialize)]
struct ValidatorConnection {
    nodes: Vec<ValidatorSnapshot>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDENTITY: &str = "cFLRQDfEdmnv6d2XfHJNRBQHi4fruPMReLSfvB8WWD2ENbqj7";

    fn parse(raw: &str) -> Result<ValidatorSnapshot, UpstreamError> {
        let response = serde_json::from_str::<GraphQlResponse>(raw);
        assert!(response.is_ok());
        match response {
            Ok(response) => extract_snapshot(response, IDENTITY),
            Err(_) => Err(UpstreamError::MissingData),
        }
    }

    #[test]
    fn extracts_first_matching_node() {
        let raw = r#"{"data":{"validators":{"nodes":[{
            "idSs58":"cFLRQDfEdmnv6d2XfHJNRBQHi4fruPMReLSfvB8WWD2ENbqj7",
            "alias":null,
            "apyBp":950,
            "isCurrentAuthority":false,
            "isCurrentBackup":true,
            "isQualified":true,
            "isOnline":true,
            "isBidding":false,
            "isKeyholder":false,
            "reputationPoints":-20,
            "lockedBalance":"0",
            "unlockedBalance":"5000000000000000000"
        }]}}}"#;

        let snapshot = parse(raw);
        assert!(matches!(
            snapshot,
            Ok(ref snapshot) if snapshot.identity == IDENTITY && snapshot.reputation_points == -20
        ));
    }

    #[test]
    fn empty_result_set_is_not_found() {
        let raw = r#"{"data":{"validators":{"nodes":[]}}}"#;
        assert!(matches!(parse(raw), Err(UpstreamError::NotFound(ref id)) if id == IDENTITY));
    }

    #[test]
    fn graphql_errors_are_surfaced() {
        let raw = r#"{"data":null,"errors":[{"message":"rate limited"},{"message":"try later"}]}"#;
        assert!(matches!(
            parse(raw),
            Err(UpstreamError::GraphQl(ref message)) if message == "rate limited; try later"
        ));
    }

    #[test]
    fn missing_data_is_an_error() {
        assert!(matches!(parse("{}"), Err(UpstreamError::MissingData)));
    }

    #[test]
    fn malformed_node_fails_to_deserialize() {
        let raw = r#"{"data":{"validators":{"nodes":[{"idSs58":"x"}]}}}"#;
        assert!(serde_json::from_str::<GraphQlResponse>(raw).is_err());
    }
}
