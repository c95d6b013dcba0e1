//! Remote custodial signing.
//!
//! # Security
//! - The session token is loaded from the environment by the caller
//! - The token is never logged or serialized
//! - No private key material ever exists in this process
//!
//! # Protocol
//! ```text
//! POST {url}/v1/org/{url-encoded org id}/eth1/sign/{lower-cased signer}
//! Authorization: <session token>
//! {"chain_id": 43114, "tx": {"chain_id": "0xa86a", "gas": "0x5208", ...}}
//!
//! → {"rlp_signed_tx": "0x02f8..."}        signed, ready to broadcast
//! → {"error_code": "MfaRequired", ...}    waiting for a human approver
//! → {"error_code": "<other>", ...}        hard failure
//! ```

use alloy::primitives::{Address, Bytes};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::blockchain::transaction::UnsignedTransaction;
use crate::config::SignerConfig;
use crate::error::{SettlementError, SettlementResult};
use crate::observability::metrics;

/// Error code the signing service uses when a second factor must approve the request.
pub const MFA_REQUIRED_CODE: &str = "MfaRequired";

/// Transaction fields in the signing service's wire format.
///
/// Integer fields are `0x`-prefixed lowercase hex quantities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireTransaction {
    pub chain_id: String,
    pub gas: String,
    #[serde(rename = "maxFeePerGas")]
    pub max_fee_per_gas: String,
    #[serde(rename = "maxPriorityFeePerGas")]
    pub max_priority_fee_per_gas: String,
    pub nonce: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(rename = "type")]
    pub tx_type: String,
    pub value: String,
    pub data: String,
}

/// Body of a signing request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignRequest {
    pub chain_id: u64,
    pub tx: WireTransaction,
}

fn hex_quantity<T: std::fmt::LowerHex>(value: T) -> String {
    format!("0x{:x}", value)
}

impl From<&UnsignedTransaction> for SignRequest {
    fn from(tx: &UnsignedTransaction) -> Self {
        Self {
            chain_id: tx.chain_id.0,
            tx: WireTransaction {
                chain_id: hex_quantity(tx.chain_id.0),
                gas: hex_quantity(tx.gas_limit),
                max_fee_per_gas: hex_quantity(tx.max_fee_per_gas),
                max_priority_fee_per_gas: hex_quantity(tx.max_priority_fee_per_gas),
                nonce: hex_quantity(tx.nonce),
                to: tx.to.map(|to| to.to_checksum(None)),
                tx_type: hex_quantity(tx.tx_type),
                value: hex_quantity(tx.value),
                data: alloy::hex::encode_prefixed(&tx.data),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SignResponse {
    rlp_signed_tx: Option<String>,
    error_code: Option<String>,
    message: Option<String>,
    mfa_id: Option<String>,
    accepted: Option<serde_json::Value>,
}

/// Result of one signing attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SigningOutcome {
    /// Signed raw transaction, ready to broadcast.
    Signed(Bytes),
    /// A human must approve the request out of band before a signature exists.
    ApprovalRequired { mfa_id: Option<String> },
}

/// Characters left as-is in the org id path segment.
const ORG_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Client for the remote signing service, scoped to one organization.
#[derive(Clone)]
pub struct RemoteSigner {
    http: reqwest::Client,
    base_url: String,
    org_id: String,
    session_token: String,
}

impl RemoteSigner {
    /// Create a signer client.
    ///
    /// # Arguments
    /// * `config` - Signing service URL, organization and timeout
    /// * `session_token` - Bearer-style session token from the secrets store
    pub fn new(config: &SignerConfig, session_token: String) -> SettlementResult<Self> {
        if config.org_id.is_empty() {
            return Err(SettlementError::validation("signer org_id is not configured"));
        }
        if session_token.is_empty() {
            return Err(SettlementError::validation("signer session token is missing"));
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(SettlementError::SigningTransport)?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            org_id: config.org_id.clone(),
            session_token,
        })
    }

    /// Endpoint that signs for `signer`.
    ///
    /// The signer address is lower-cased; the service matches keys on the lower-case form.
    pub fn sign_url(&self, signer: Address) -> String {
        let org = utf8_percent_encode(&self.org_id, ORG_SEGMENT);
        format!(
            "{}/v1/org/{}/eth1/sign/{}",
            self.base_url,
            org,
            signer.to_string().to_lowercase()
        )
    }

    /// Ask the service to sign a transaction.
    ///
    /// `ApprovalRequired` is returned as a value, not an error, and is never retried.
    pub async fn sign(
        &self,
        tx: &UnsignedTransaction,
        signer: Address,
    ) -> SettlementResult<SigningOutcome> {
        let url = self.sign_url(signer);
        let body = SignRequest::from(tx);

        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, self.session_token.as_str())
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                metrics::record_signing("error");
                tracing::error!(signer = %signer, chain_id = tx.chain_id.0, error = %e, "Signing request failed");
                SettlementError::SigningTransport(e)
            })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(SettlementError::SigningTransport)?;

        let outcome = interpret_response(status, &text);
        match &outcome {
            Ok(SigningOutcome::Signed(_)) => {
                metrics::record_signing("signed");
                tracing::info!(signer = %signer, nonce = tx.nonce, "Transaction signed");
            }
            Ok(SigningOutcome::ApprovalRequired { mfa_id }) => {
                metrics::record_signing("mfa_required");
                tracing::warn!(signer = %signer, nonce = tx.nonce, mfa_id = ?mfa_id, "Signing requires MFA approval");
            }
            Err(e) => {
                metrics::record_signing("error");
                tracing::error!(signer = %signer, status = %status, error = %e, "Signing rejected");
            }
        }
        outcome
    }
}

fn interpret_response(status: reqwest::StatusCode, text: &str) -> SettlementResult<SigningOutcome> {
    let parsed: SignResponse = match serde_json::from_str(text) {
        Ok(parsed) => parsed,
        Err(_) if !status.is_success() => {
            return Err(SettlementError::Signing(format!("HTTP {}: {}", status, text)));
        }
        Err(e) => {
            return Err(SettlementError::Signing(format!("unreadable response: {}", e)));
        }
    };

    if let Some(signed) = parsed.rlp_signed_tx {
        let raw: Bytes = signed
            .parse()
            .map_err(|e| SettlementError::Signing(format!("invalid rlp_signed_tx: {}", e)))?;
        return Ok(SigningOutcome::Signed(raw));
    }

    let accepted_mfa = parsed
        .accepted
        .as_ref()
        .and_then(|accepted| accepted.get(MFA_REQUIRED_CODE));

    match parsed.error_code.as_deref() {
        Some(MFA_REQUIRED_CODE) => Ok(SigningOutcome::ApprovalRequired {
            mfa_id: parsed.mfa_id.or_else(|| mfa_id_of(accepted_mfa)),
        }),
        Some(code) => Err(SettlementError::Signing(format!(
            "{} ({})",
            code,
            parsed.message.unwrap_or_else(|| status.to_string())
        ))),
        None if accepted_mfa.is_some() => Ok(SigningOutcome::ApprovalRequired {
            mfa_id: parsed.mfa_id.or_else(|| mfa_id_of(accepted_mfa)),
        }),
        None => Err(SettlementError::Signing(format!(
            "HTTP {}: response carried neither a signed transaction nor an error code",
            status
        ))),
    }
}

fn mfa_id_of(accepted: Option<&serde_json::Value>) -> Option<String> {
    accepted
        .and_then(|mfa| mfa.get("id"))
        .and_then(|id| id.as_str())
        .map(str::to_string)
}

impl std::fmt::Debug for RemoteSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteSigner")
            .field("base_url", &self.base_url)
            .field("org_id", &self.org_id)
            .field("session_token", &"<redacted>")
            .finish()
    }
}
