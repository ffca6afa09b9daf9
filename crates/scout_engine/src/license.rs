use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use scout_core::Status;
use scout_logging::scout_debug;
use serde::Serialize;

use crate::types::{ActivateRequest, ValidateRequest};
use crate::{FailureKind, LicenseError, ServiceResponse, SessionCredentials};

const ACTIVATE_PATH: &str = "licenses/activate";
const VALIDATE_PATH: &str = "licenses/validate";
const HEARTBEAT_PATH: &str = "sessions/heartbeat";
const END_PATH: &str = "sessions/end";

#[derive(Debug, Clone)]
pub struct LicenseSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub app_version: String,
}

impl Default for LicenseSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8010".to_string(),
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            app_version: "ui".to_string(),
        }
    }
}

/// Remote authorization service.
#[async_trait::async_trait]
pub trait LicenseService: Send + Sync {
    async fn activate(
        &self,
        license_key: &str,
        machine_hash: &str,
    ) -> Result<ServiceResponse, LicenseError>;

    async fn validate(
        &self,
        license_key: &str,
        machine_hash: &str,
    ) -> Result<ServiceResponse, LicenseError>;

    async fn heartbeat(
        &self,
        session: &SessionCredentials,
    ) -> Result<ServiceResponse, LicenseError>;

    /// Ends the session. A service without this endpoint answers
    /// `UNSUPPORTED` instead of failing.
    async fn end_session(
        &self,
        session: &SessionCredentials,
    ) -> Result<ServiceResponse, LicenseError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestLicenseService {
    base_url: Url,
    app_version: String,
    client: reqwest::Client,
}

impl ReqwestLicenseService {
    pub fn new(settings: LicenseSettings) -> Result<Self, LicenseError> {
        let mut base_url = Url::parse(&settings.base_url)
            .map_err(|err| LicenseError::new(FailureKind::InvalidUrl, err.to_string()))?;
        // Keep any path prefix when joining endpoint paths.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| LicenseError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self {
            base_url,
            app_version: settings.app_version,
            client,
        })
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, LicenseError> {
        self.base_url
            .join(path)
            .map_err(|err| LicenseError::new(FailureKind::InvalidUrl, err.to_string()))
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, LicenseError> {
        let url = self.endpoint(path)?;
        let payload = encode(body)?;
        scout_debug!("POST {}", url);
        self.client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(map_reqwest_error)
    }

    async fn decode(response: reqwest::Response) -> Result<ServiceResponse, LicenseError> {
        let status = response.status();
        if !status.is_success() {
            return Err(LicenseError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        serde_json::from_slice(&bytes)
            .map_err(|err| LicenseError::new(FailureKind::Decode, err.to_string()))
    }
}

#[async_trait::async_trait]
impl LicenseService for ReqwestLicenseService {
    async fn activate(
        &self,
        license_key: &str,
        machine_hash: &str,
    ) -> Result<ServiceResponse, LicenseError> {
        let body = ActivateRequest {
            license_key,
            machine_hash,
            app_version: &self.app_version,
        };
        Self::decode(self.post(ACTIVATE_PATH, &body).await?).await
    }

    async fn validate(
        &self,
        license_key: &str,
        machine_hash: &str,
    ) -> Result<ServiceResponse, LicenseError> {
        let body = ValidateRequest {
            license_key,
            machine_hash,
        };
        Self::decode(self.post(VALIDATE_PATH, &body).await?).await
    }

    async fn heartbeat(
        &self,
        session: &SessionCredentials,
    ) -> Result<ServiceResponse, LicenseError> {
        Self::decode(self.post(HEARTBEAT_PATH, session).await?).await
    }

    async fn end_session(
        &self,
        session: &SessionCredentials,
    ) -> Result<ServiceResponse, LicenseError> {
        let response = self.post(END_PATH, session).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(ServiceResponse::status(Status::Unsupported));
        }
        Self::decode(response).await
    }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<Vec<u8>, LicenseError> {
    serde_json::to_vec(body).map_err(|err| LicenseError::new(FailureKind::Encode, err.to_string()))
}

fn map_reqwest_error(err: reqwest::Error) -> LicenseError {
    if err.is_timeout() {
        return LicenseError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_decode() {
        return LicenseError::new(FailureKind::Decode, err.to_string());
    }
    LicenseError::new(FailureKind::Network, err.to_string())
}

#[cfg(test)]
mod tests {
    use serde::ser::{Error as _, Serializer};

    use super::*;

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("refused"))
        }
    }

    #[test]
    fn request_encoding_failure_is_not_a_decode_failure() {
        let err = encode(&Unserializable).unwrap_err();
        assert_eq!(err.kind, FailureKind::Encode);
        assert!(err.to_string().starts_with("unencodable request"));
    }
}
