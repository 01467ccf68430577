//! Username/password login via the partner SOAP API

use std::sync::Arc;

use async_trait::async_trait;
use quick_xml::escape::escape;
use reqwest::Url;
use serde::Deserialize;

use crate::backend::transport::{HttpRequest, OrgTransport};
use crate::config::Credentials;
use crate::error::{BridgeError, BridgeResult};
use crate::session::{Authenticator, SessionGrant};

/// Fault codes that clear up on their own
const TRANSIENT_FAULTS: &[&str] = &["SERVER_UNAVAILABLE", "REQUEST_LIMIT_EXCEEDED"];

/// Logs in with username, password and security token
pub struct SoapLogin {
    transport: Arc<dyn OrgTransport>,
    login_url: String,
    api_version: String,
}

impl SoapLogin {
    pub fn new(transport: Arc<dyn OrgTransport>, login_url: &str, api_version: &str) -> Self {
        Self {
            transport,
            login_url: login_url.trim_end_matches('/').to_string(),
            api_version: api_version.to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/services/Soap/u/{}", self.login_url, self.api_version)
    }
}

#[async_trait]
impl Authenticator for SoapLogin {
    async fn login(&self, credentials: &Credentials) -> BridgeResult<SessionGrant> {
        let request = HttpRequest::post_raw(
            self.endpoint(),
            "text/xml; charset=UTF-8",
            login_envelope(credentials),
        )
        .header("SOAPAction", "login");

        let response = self.transport.send(request).await?;
        let parsed = quick_xml::de::from_str::<Envelope>(&response.body);

        match parsed {
            Ok(Envelope {
                body: Body {
                    fault: Some(fault), ..
                },
            }) => Err(fault.into_error(response.status)),
            _ if response.status >= 500 => Err(BridgeError::transient(
                Some(response.status),
                "login endpoint unavailable",
            )),
            Ok(Envelope {
                body: Body {
                    login_response: Some(LoginResponse { result }),
                    ..
                },
            }) => Ok(SessionGrant {
                instance_url: instance_origin(&result.server_url)?,
                valid_for_seconds: result.user_info.and_then(|info| info.session_seconds_valid),
                access_token: result.session_id,
            }),
            Ok(_) => Err(BridgeError::Internal(
                "login response has neither a result nor a fault".to_string(),
            )),
            Err(e) => Err(BridgeError::Internal(format!("unreadable login response: {}", e))),
        }
    }
}

// Namespace prefixes (`soapenv:`, `sf:`) are not part of the matched names.

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "Body")]
    body: Body,
}

#[derive(Debug, Deserialize)]
struct Body {
    #[serde(rename = "loginResponse")]
    login_response: Option<LoginResponse>,
    #[serde(rename = "Fault")]
    fault: Option<Fault>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    result: LoginResult,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResult {
    server_url: String,
    session_id: String,
    user_info: Option<UserInfo>,
}

impl std::fmt::Debug for LoginResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginResult")
            .field("server_url", &self.server_url)
            .field("session_id", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserInfo {
    session_seconds_valid: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Fault {
    faultcode: String,
    faultstring: Option<String>,
}

impl Fault {
    fn into_error(self, status: u16) -> BridgeError {
        // `sf:INVALID_LOGIN` -> `INVALID_LOGIN`
        let code = self
            .faultcode
            .rsplit(':')
            .next()
            .unwrap_or(&self.faultcode)
            .trim()
            .to_string();
        let message = self
            .faultstring
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| code.clone());

        if TRANSIENT_FAULTS.contains(&code.as_str()) {
            return BridgeError::transient(Some(status), message);
        }
        if message.starts_with(&code) {
            BridgeError::authentication(message)
        } else {
            BridgeError::authentication(format!("{}: {}", code, message))
        }
    }
}

fn login_envelope(credentials: &Credentials) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8" ?>
<env:Envelope xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xmlns:env="http://schemas.xmlsoap.org/soap/envelope/" xmlns:urn="urn:partner.soap.sforce.com">
  <env:Header>
    <urn:CallOptions>
      <urn:client>sfmcp</urn:client>
    </urn:CallOptions>
  </env:Header>
  <env:Body>
    <n1:login xmlns:n1="urn:partner.soap.sforce.com">
      <n1:username>{}</n1:username>
      <n1:password>{}{}</n1:password>
    </n1:login>
  </env:Body>
</env:Envelope>"#,
        escape(credentials.username.as_str()),
        escape(credentials.password.as_str()),
        escape(credentials.security_token.as_str()),
    )
}

/// `https://host/services/Soap/u/59.0/00D...` -> `https://host`
fn instance_origin(server_url: &str) -> BridgeResult<String> {
    let url = Url::parse(server_url).map_err(|e| {
        BridgeError::Internal(format!("login returned an invalid serverUrl '{}': {}", server_url, e))
    })?;
    let origin = url.origin();
    if !origin.is_tuple() {
        return Err(BridgeError::Internal(format!(
            "login returned a serverUrl without a host: '{}'",
            server_url
        )));
    }
    Ok(origin.ascii_serialization())
}
