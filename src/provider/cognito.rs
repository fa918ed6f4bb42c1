//! Hosted user-pool client speaking the `application/x-amz-json-1.1` protocol.

use super::{
    secret_hash, sigv4, IdentityProvider, Operation, ProviderUser, Registration, ServiceError,
    TokenBundle,
};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{header::CONTENT_TYPE, Client};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{collections::BTreeMap, time::Duration};
use tracing::{debug, info_span, Instrument};
use url::Url;

pub use sigv4::Credentials;

const CONTENT_TYPE_JSON: &str = "application/x-amz-json-1.1";
const TARGET_PREFIX: &str = "AWSCognitoIdentityProviderService";
const SERVICE: &str = "cognito-idp";
const USER_NOT_FOUND: &str = "UserNotFoundException";

#[derive(Debug, Clone)]
pub struct UserPoolConfig {
    pub endpoint: Url,
    pub region: String,
    pub pool_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub credentials: Credentials,
    pub timeout: Duration,
}

impl UserPoolConfig {
    /// Regional endpoint, `https://cognito-idp.<region>.amazonaws.com/`.
    ///
    /// # Errors
    /// Returns an error if `region` does not form a valid host name.
    pub fn regional_endpoint(region: &str) -> Result<Url> {
        Ok(Url::parse(&format!("https://{SERVICE}.{region}.amazonaws.com/"))?)
    }
}

pub struct UserPoolClient {
    http: Client,
    host: String,
    config: UserPoolConfig,
}

impl UserPoolClient {
    /// # Errors
    /// Returns an error if the endpoint has no host or the HTTP client cannot be built.
    pub fn new(config: UserPoolConfig) -> Result<Self> {
        let host = config
            .endpoint
            .host_str()
            .ok_or_else(|| anyhow!("Error parsing URL: no host specified"))?;
        let host = match config.endpoint.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        let http = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(config.timeout)
            .build()?;

        Ok(Self { http, host, config })
    }

    fn secret_hash(&self, username: &str, client_id: &str) -> String {
        secret_hash(
            username,
            client_id,
            self.config.client_secret.expose_secret(),
        )
    }

    /// Send one action. Admin actions (`signed`) carry a SigV4 signature; the
    /// public client actions are authenticated by `SecretHash` or an access
    /// token in the payload instead.
    async fn call<Req, Res>(
        &self,
        operation: Operation,
        action: &str,
        signed: bool,
        payload: &Req,
    ) -> Result<Res, ServiceError>
    where
        Req: Serialize + Sync,
        Res: DeserializeOwned,
    {
        let fail = |message: String| ServiceError::new(operation, None, message);

        let body = serde_json::to_vec(payload).map_err(|e| fail(e.to_string()))?;
        let target = format!("{TARGET_PREFIX}.{action}");

        let mut request = self
            .http
            .post(self.config.endpoint.clone())
            .header(CONTENT_TYPE, CONTENT_TYPE_JSON)
            .header("X-Amz-Target", &target);

        if signed {
            let headers = sigv4::sign(
                &self.config.credentials,
                &sigv4::SignableRequest {
                    region: &self.config.region,
                    service: SERVICE,
                    host: &self.host,
                    content_type: CONTENT_TYPE_JSON,
                    target: &target,
                    body: &body,
                },
                Utc::now(),
            );
            request = request
                .header("X-Amz-Date", headers.amz_date)
                .header("Authorization", headers.authorization);
            if let Some(token) = headers.security_token {
                request = request.header("X-Amz-Security-Token", token);
            }
        }

        let span = info_span!(
            "cognito.request",
            http.method = "POST",
            aws.action = action,
            url = %self.config.endpoint
        );
        let response = request
            .body(body)
            .send()
            .instrument(span)
            .await
            .map_err(|e| fail(e.to_string()))?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| fail(e.to_string()))?;

        if !status.is_success() {
            let (code, message) = error_details(&bytes);
            debug!(action, %status, code = ?code, "user pool rejected request");
            return Err(ServiceError::new(
                operation,
                code,
                message.unwrap_or_else(|| format!("{action} returned {status}")),
            ));
        }

        let body: &[u8] = if bytes.is_empty() {
            b"{}".as_slice()
        } else {
            &bytes[..]
        };
        serde_json::from_slice(body).map_err(|e| fail(format!("invalid {action} response: {e}")))
    }

    async fn initiate_auth(
        &self,
        operation: Operation,
        flow: &str,
        parameters: BTreeMap<&'static str, String>,
    ) -> Result<TokenBundle, ServiceError> {
        let response: InitiateAuthResponse = self
            .call(
                operation,
                "AdminInitiateAuth",
                true,
                &AdminInitiateAuthRequest {
                    auth_flow: flow,
                    auth_parameters: parameters,
                    client_id: &self.config.client_id,
                    user_pool_id: &self.config.pool_id,
                },
            )
            .await?;

        match (response.authentication_result, response.challenge_name) {
            (Some(result), _) => Ok(TokenBundle {
                access_token: result.access_token,
                refresh_token: result.refresh_token,
                id_token: result.id_token,
                expires_in: result.expires_in,
                token_type: result.token_type,
            }),
            (None, Some(challenge)) => Err(ServiceError::new(
                operation,
                Some(challenge.clone()),
                format!("authentication challenge {challenge} is not supported"),
            )),
            (None, None) => Err(ServiceError::new(
                operation,
                None,
                "no authentication result returned",
            )),
        }
    }
}

/// Extract the error type and message from a JSON error body. The type may
/// come namespaced (`com.amazonaws...#UserNotFoundException`).
fn error_details(body: &[u8]) -> (Option<String>, Option<String>) {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(parsed) => {
            let code = parsed
                .kind
                .map(|kind| kind.rsplit('#').next().unwrap_or_default().to_string())
                .filter(|kind| !kind.is_empty());
            (code, parsed.message)
        }
        Err(_) => (None, None),
    }
}

fn attribute_list(attributes: &BTreeMap<String, String>) -> Vec<Attribute> {
    attributes
        .iter()
        .map(|(name, value)| Attribute {
            name: name.clone(),
            value: value.clone(),
        })
        .collect()
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type")]
    kind: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Attribute {
    name: String,
    #[serde(default)]
    value: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SignUpRequest<'a> {
    client_id: &'a str,
    password: &'a str,
    secret_hash: String,
    user_attributes: Vec<Attribute>,
    username: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SignUpResponse {
    user_sub: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AdminUpdateUserAttributesRequest<'a> {
    user_pool_id: &'a str,
    username: &'a str,
    user_attributes: Vec<Attribute>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AdminInitiateAuthRequest<'a> {
    auth_flow: &'a str,
    auth_parameters: BTreeMap<&'static str, String>,
    client_id: &'a str,
    user_pool_id: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct InitiateAuthResponse {
    authentication_result: Option<AuthenticationResult>,
    challenge_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AuthenticationResult {
    access_token: String,
    refresh_token: Option<String>,
    id_token: Option<String>,
    expires_in: i64,
    token_type: String,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct RevokeTokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    token: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct CodeRequest<'a> {
    client_id: &'a str,
    secret_hash: String,
    username: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    confirmation_code: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ChangePasswordRequest<'a> {
    access_token: &'a str,
    previous_password: &'a str,
    proposed_password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AdminGetUserRequest<'a> {
    user_pool_id: &'a str,
    username: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AdminGetUserResponse {
    username: String,
    #[serde(default)]
    user_attributes: Vec<Attribute>,
    user_status: Option<String>,
    #[serde(default)]
    enabled: bool,
}

/// Responses whose content is ignored.
#[derive(Deserialize)]
struct Empty {}

#[async_trait]
impl IdentityProvider for UserPoolClient {
    async fn register(
        &self,
        email: &str,
        password: &str,
        attributes: &BTreeMap<String, String>,
    ) -> Result<Registration, ServiceError> {
        let mut attributes = attributes.clone();
        attributes.insert("email".to_string(), email.to_string());

        let response: SignUpResponse = self
            .call(
                Operation::Register,
                "SignUp",
                false,
                &SignUpRequest {
                    client_id: &self.config.client_id,
                    password,
                    secret_hash: self.secret_hash(email, &self.config.client_id),
                    user_attributes: attribute_list(&attributes),
                    username: email,
                },
            )
            .await?;

        let verified = BTreeMap::from([("email_verified".to_string(), "true".to_string())]);
        let _: Empty = self
            .call(
                Operation::Register,
                "AdminUpdateUserAttributes",
                true,
                &AdminUpdateUserAttributesRequest {
                    user_pool_id: &self.config.pool_id,
                    username: email,
                    user_attributes: attribute_list(&verified),
                },
            )
            .await?;

        Ok(Registration {
            subject: response.user_sub,
            client_ref: self.config.client_id.clone(),
        })
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<TokenBundle, ServiceError> {
        let parameters = BTreeMap::from([
            ("USERNAME", email.to_string()),
            ("PASSWORD", password.to_string()),
            ("SECRET_HASH", self.secret_hash(email, &self.config.client_id)),
        ]);
        self.initiate_auth(Operation::Authenticate, "ADMIN_NO_SRP_AUTH", parameters)
            .await
    }

    async fn refresh(&self, email: &str, refresh_token: &str) -> Result<TokenBundle, ServiceError> {
        let parameters = BTreeMap::from([
            ("REFRESH_TOKEN", refresh_token.to_string()),
            ("SECRET_HASH", self.secret_hash(email, &self.config.client_id)),
        ]);
        self.initiate_auth(Operation::Refresh, "REFRESH_TOKEN_AUTH", parameters)
            .await
    }

    async fn revoke_token(&self, refresh_token: &str) -> Result<(), ServiceError> {
        let _: Empty = self
            .call(
                Operation::RevokeToken,
                "RevokeToken",
                false,
                &RevokeTokenRequest {
                    client_id: &self.config.client_id,
                    client_secret: self.config.client_secret.expose_secret(),
                    token: refresh_token,
                },
            )
            .await?;
        Ok(())
    }

    async fn confirm_registration(
        &self,
        client_ref: &str,
        code: &str,
        email: &str,
    ) -> Result<(), ServiceError> {
        let _: Empty = self
            .call(
                Operation::ConfirmRegistration,
                "ConfirmSignUp",
                false,
                &CodeRequest {
                    client_id: client_ref,
                    secret_hash: self.secret_hash(email, client_ref),
                    username: email,
                    confirmation_code: Some(code),
                    password: None,
                },
            )
            .await?;
        Ok(())
    }

    async fn resend_confirmation_code(
        &self,
        client_ref: &str,
        email: &str,
    ) -> Result<(), ServiceError> {
        let _: Empty = self
            .call(
                Operation::ResendConfirmationCode,
                "ResendConfirmationCode",
                false,
                &CodeRequest {
                    client_id: client_ref,
                    secret_hash: self.secret_hash(email, client_ref),
                    username: email,
                    confirmation_code: None,
                    password: None,
                },
            )
            .await?;
        Ok(())
    }

    async fn change_password(
        &self,
        access_token: &str,
        previous_password: &str,
        proposed_password: &str,
    ) -> Result<(), ServiceError> {
        let _: Empty = self
            .call(
                Operation::ChangePassword,
                "ChangePassword",
                false,
                &ChangePasswordRequest {
                    access_token,
                    previous_password,
                    proposed_password,
                },
            )
            .await?;
        Ok(())
    }

    async fn forgot_password(&self, email: &str) -> Result<(), ServiceError> {
        let _: Empty = self
            .call(
                Operation::ForgotPassword,
                "ForgotPassword",
                false,
                &CodeRequest {
                    client_id: &self.config.client_id,
                    secret_hash: self.secret_hash(email, &self.config.client_id),
                    username: email,
                    confirmation_code: None,
                    password: None,
                },
            )
            .await?;
        Ok(())
    }

    async fn confirm_forgot_password(
        &self,
        email: &str,
        code: &str,
        password: &str,
    ) -> Result<(), ServiceError> {
        let _: Empty = self
            .call(
                Operation::ConfirmForgotPassword,
                "ConfirmForgotPassword",
                false,
                &CodeRequest {
                    client_id: &self.config.client_id,
                    secret_hash: self.secret_hash(email, &self.config.client_id),
                    username: email,
                    confirmation_code: Some(code),
                    password: Some(password),
                },
            )
            .await?;
        Ok(())
    }

    async fn find_user(&self, email: &str) -> Result<Option<ProviderUser>, ServiceError> {
        let result: Result<AdminGetUserResponse, ServiceError> = self
            .call(
                Operation::LookupUser,
                "AdminGetUser",
                true,
                &AdminGetUserRequest {
                    user_pool_id: &self.config.pool_id,
                    username: email,
                },
            )
            .await;

        match result {
            Ok(user) => Ok(Some(ProviderUser {
                username: user.username,
                status: user.user_status,
                enabled: user.enabled,
                attributes: user
                    .user_attributes
                    .into_iter()
                    .map(|attribute| (attribute.name, attribute.value))
                    .collect(),
            })),
            Err(err) if err.is_code(USER_NOT_FOUND) => Ok(None),
            Err(err) => Err(err),
        }
    }
}
