//! HTTP JSON-RPC v3 client against the source chain.

use crate::client::ChainClient;
use crate::error::ChainClientError;
use crate::types::{AccountRecord, AnchorSearchResult, ChainEntryRecord, CommitHeader, Receipt};
use async_trait::async_trait;
use certen_types::Hash;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// A `ChainClient` backed by the source chain's v3 JSON-RPC `Query`
/// endpoint over HTTP.
pub struct RpcChainClient {
    http: reqwest::Client,
    endpoint: String,
}

impl RpcChainClient {
    /// Build a client against `endpoint` (the full v3 JSON-RPC URL), with a
    /// fixed per-request timeout.
    pub fn new(endpoint: impl Into<String>, request_timeout: Duration) -> Result<Self, ChainClientError> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ChainClientError::Unavailable(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, ChainClientError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let resp = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChainClientError::Unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ChainClientError::Unavailable(format!(
                "v3 query returned HTTP {}",
                resp.status()
            )));
        }

        let envelope: RpcEnvelope = resp
            .json()
            .await
            .map_err(|e| ChainClientError::Malformed(e.to_string()))?;

        if let Some(err) = envelope.error {
            return Err(classify_rpc_error(&err));
        }
        envelope
            .result
            .ok_or_else(|| ChainClientError::Malformed("missing result in v3 response".into()))
    }
}

#[derive(Deserialize)]
struct RpcEnvelope {
    result: Option<Value>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

fn classify_rpc_error(err: &RpcError) -> ChainClientError {
    // The v3 surface reserves -32601-ish codes for "not found"; anything
    // else at the protocol layer is treated as malformed/unavailable
    // rather than guessed at.
    if err.code == -32601 || err.message.to_lowercase().contains("not found") {
        ChainClientError::NotFound(err.message.clone())
    } else {
        ChainClientError::Unavailable(err.message.clone())
    }
}

fn parse_hash_field(value: &Value, field: &str) -> Result<Hash, ChainClientError> {
    let hex = value
        .get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| ChainClientError::Malformed(format!("missing field `{field}`")))?;
    Hash::from_hex(hex.trim_start_matches("0x"))
        .map_err(|e| ChainClientError::Malformed(format!("field `{field}`: {e}")))
}

fn parse_receipt(value: &Value) -> Result<Receipt, ChainClientError> {
    let start = parse_hash_field(value, "start")?;
    let anchor = parse_hash_field(value, "anchor")?;
    let local_block = value.get("localBlock").and_then(Value::as_u64);

    let entries_val = value
        .get("entries")
        .and_then(Value::as_array)
        .ok_or_else(|| ChainClientError::Malformed("receipt missing entries".into()))?;
    let mut entries = Vec::with_capacity(entries_val.len());
    for e in entries_val {
        let hash = parse_hash_field(e, "hash")?;
        let right = e
            .get("right")
            .and_then(Value::as_bool)
            .ok_or_else(|| ChainClientError::Malformed("receipt entry missing `right`".into()))?;
        entries.push(crate::types::ReceiptEntry { hash, right });
    }

    let next = match value.get("next") {
        Some(Value::Null) | None => None,
        Some(n) => Some(Box::new(parse_receipt(n)?)),
    };

    Ok(Receipt {
        start,
        anchor,
        entries,
        local_block,
        next,
    })
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn query_account(
        &self,
        url: &str,
        entry_hash: Option<Hash>,
    ) -> Result<AccountRecord, ChainClientError> {
        let mut params = json!({ "url": url });
        if let Some(h) = entry_hash {
            params["queryType"] = json!("chain");
            params["hash"] = json!(h.to_hex());
        }
        let result = self.call("query", params).await?;
        let receipt = match result.get("receipt") {
            Some(Value::Null) | None => None,
            Some(r) => Some(parse_receipt(r)?),
        };
        Ok(AccountRecord {
            url: url.to_string(),
            data: result.get("data").cloned().unwrap_or(Value::Null),
            receipt,
        })
    }

    async fn query_chain_entry(
        &self,
        account: &str,
        chain_name: &str,
        entry_hash: Hash,
    ) -> Result<ChainEntryRecord, ChainClientError> {
        let params = json!({
            "url": account,
            "queryType": "chain",
            "name": chain_name,
            "hash": entry_hash.to_hex(),
        });
        let result = self.call("query", params).await?;
        let index = result
            .get("index")
            .and_then(Value::as_u64)
            .ok_or_else(|| ChainClientError::Malformed("missing index".into()))?;
        let receipt_val = result
            .get("receipt")
            .ok_or_else(|| ChainClientError::Malformed("missing receipt".into()))?;
        Ok(ChainEntryRecord {
            index,
            entry_hash,
            receipt: parse_receipt(receipt_val)?,
        })
    }

    async fn search_anchor_chain(
        &self,
        partition: &str,
        suffix: &str,
        anchor_hash: Hash,
    ) -> Result<AnchorSearchResult, ChainClientError> {
        let chain_name = format!("anchor({partition})-{suffix}");
        let params = json!({
            "url": format!("acc://dn.acme/anchors"),
            "queryType": "anchorSearch",
            "name": chain_name,
            "anchor": anchor_hash.to_hex(),
        });
        let result = self.call("query", params).await?;
        parse_anchor_search_result(&result)
    }

    async fn anchor_chain_entry_at(
        &self,
        partition: &str,
        suffix: &str,
        index: u64,
    ) -> Result<AnchorSearchResult, ChainClientError> {
        let chain_name = format!("anchor({partition})-{suffix}");
        let params = json!({
            "url": format!("acc://dn.acme/anchors"),
            "queryType": "chain",
            "name": chain_name,
            "index": index,
        });
        let result = self.call("query", params).await?;
        parse_anchor_search_result(&result)
    }

    async fn commit_header(
        &self,
        partition: &str,
        height: u64,
    ) -> Result<CommitHeader, ChainClientError> {
        let params = json!({ "partition": partition, "height": height });
        let result = self.call("commit", params).await?;
        Ok(CommitHeader {
            height,
            app_hash: parse_hash_field(&result, "appHash")?,
        })
    }

    async fn network_status(&self) -> Result<Vec<String>, ChainClientError> {
        let result = self.call("network-status", json!({})).await?;
        result
            .get("partitions")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .ok_or_else(|| ChainClientError::Malformed("missing partitions".into()))
    }
}

fn parse_anchor_search_result(result: &Value) -> Result<AnchorSearchResult, ChainClientError> {
    let index = result
        .get("index")
        .and_then(Value::as_u64)
        .ok_or_else(|| ChainClientError::Malformed("missing index".into()))?;
    let local_block = result
        .get("localBlock")
        .and_then(Value::as_u64)
        .ok_or_else(|| ChainClientError::Malformed("missing localBlock".into()))?;
    let receipt_val = result
        .get("receipt")
        .ok_or_else(|| ChainClientError::Malformed("missing receipt".into()))?;
    Ok(AnchorSearchResult {
        index,
        local_block,
        receipt: parse_receipt(receipt_val)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_not_found_errors() {
        let err = RpcError {
            code: -32601,
            message: "no such record".into(),
        };
        assert!(matches!(classify_rpc_error(&err), ChainClientError::NotFound(_)));
    }

    #[test]
    fn classifies_other_errors_as_unavailable() {
        let err = RpcError {
            code: -32000,
            message: "timeout".into(),
        };
        assert!(matches!(
            classify_rpc_error(&err),
            ChainClientError::Unavailable(_)
        ));
    }

    #[test]
    fn parse_receipt_rejects_missing_entries() {
        let v = json!({ "start": Hash::ZERO.to_hex(), "anchor": Hash::ZERO.to_hex() });
        assert!(parse_receipt(&v).is_err());
    }
}
