use std::fmt::Display;
use std::time::SystemTime;

use agentrelay_core::GatewayError;
use aws_credential_types::Credentials;
use aws_sigv4::http_request::{SignableBody, SignableRequest, SigningSettings, sign};
use aws_sigv4::sign::v4;

/// Service name the agent runtime expects in the credential scope.
const SIGNING_NAME: &str = "bedrock";

/// Signs runtime requests with AWS Signature Version 4.
#[derive(Debug, Clone)]
pub struct SigV4Signer {
    region: String,
    credentials: Credentials,
}

impl SigV4Signer {
    pub fn new(
        region: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            region: region.into(),
            credentials: Credentials::new(
                access_key_id,
                secret_access_key,
                session_token,
                None,
                "agentrelay-config",
            ),
        }
    }

    /// Headers that authenticate a POST of `body` to `url` made at `time`.
    pub fn sign_post(
        &self,
        url: &str,
        content_type: &str,
        body: &[u8],
        time: SystemTime,
    ) -> Result<Vec<(String, String)>, GatewayError> {
        let identity = self.credentials.clone().into();
        let params = v4::SigningParams::builder()
            .identity(&identity)
            .region(&self.region)
            .name(SIGNING_NAME)
            .time(time)
            .settings(SigningSettings::default())
            .build()
            .map_err(|e| signing_error(&e))?
            .into();

        let request = SignableRequest::new(
            "POST",
            url,
            std::iter::once(("content-type", content_type)),
            SignableBody::Bytes(body),
        )
        .map_err(|e| signing_error(&e))?;

        let (instructions, _signature) = sign(request, &params)
            .map_err(|e| signing_error(&e))?
            .into_parts();
        Ok(instructions
            .headers()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect())
    }
}

fn signing_error(e: &dyn Display) -> GatewayError {
    GatewayError::Unclassified(format!("Failed to sign request: {e}"))
}
