use super::*;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Endpoint {
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RpcError {
    pub endpoint: String,
    pub method: String,
    pub message: String,
}

impl RpcError {
    fn new(endpoint: &str, method: &str, message: impl Display) -> Self {
        Self {
            endpoint: endpoint.into(),
            method: method.into(),
            message: message.to_string(),
        }
    }
}

impl Display for RpcError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "rpc `{}` on {}: {}", self.method, self.endpoint, self.message)
    }
}

impl std::error::Error for RpcError {}

/// The daemon's verdict on a block submission: transport succeeded either
/// way, but a rejection means the block is not going in a chain.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Accepted,
    Rejected(String),
}

/// An ordered set of daemon endpoints for one chain. Calls go to the active
/// endpoint; transport failures and HTTP ≥ 500 rotate to the next one.
/// `check_and_recover` probes the whole list and re-activates the first
/// healthy endpoint, and is the single recovery step between a submission
/// failure and its one retry.
pub struct RpcManager {
    chain: String,
    endpoints: Vec<Endpoint>,
    active: AtomicUsize,
    http: reqwest::Client,
}

impl RpcManager {
    pub fn new(chain: String, endpoints: Vec<Endpoint>) -> Result<Self> {
        ensure!(
            !endpoints.is_empty(),
            "chain {chain} has no rpc endpoints configured"
        );

        let http = reqwest::Client::builder()
            .timeout(RPC_DEADLINE)
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            chain,
            endpoints,
            active: AtomicUsize::new(0),
            http,
        })
    }

    pub fn chain(&self) -> &str {
        &self.chain
    }

    pub fn active_endpoint(&self) -> &Endpoint {
        &self.endpoints[self.active.load(Ordering::Relaxed) % self.endpoints.len()]
    }

    fn rotate(&self, from: usize) {
        let next = (from + 1) % self.endpoints.len();
        let _ = self
            .active
            .compare_exchange(from, next, Ordering::Relaxed, Ordering::Relaxed);
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let index = self.active.load(Ordering::Relaxed) % self.endpoints.len();

        match self.call_endpoint(index, method, params).await {
            Ok(result) => Ok(result),
            Err((err, retriable)) => {
                if retriable {
                    warn!(
                        "Rotating {} rpc away from {} after: {err}",
                        self.chain, err.endpoint
                    );
                    self.rotate(index);
                }
                Err(err)
            }
        }
    }

    /// Returns the error together with whether it should trigger failover.
    async fn call_endpoint(
        &self,
        index: usize,
        method: &str,
        params: Value,
    ) -> Result<Value, (RpcError, bool)> {
        let endpoint = &self.endpoints[index];

        let response = self
            .http
            .post(&endpoint.url)
            .basic_auth(&endpoint.username, Some(&endpoint.password))
            .json(&request_body(method, params))
            .send()
            .await
            .map_err(|err| (RpcError::new(&endpoint.url, method, err), true))?;

        let status = response.status();
        if status.is_server_error() {
            return Err((
                RpcError::new(&endpoint.url, method, format!("http {status}")),
                true,
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| (RpcError::new(&endpoint.url, method, err), true))?;

        if let Some(error) = body.get("error").filter(|error| !error.is_null()) {
            return Err((
                RpcError::new(&endpoint.url, method, error.to_string()),
                false,
            ));
        }

        Ok(body.get("result").cloned().unwrap_or(Value::Null))
    }

    pub async fn get_block_template(&self) -> Result<BlockTemplate, RpcError> {
        let params = json!([{
            "capabilities": ["coinbasetxn", "workid", "coinbase/append"],
            "rules": ["segwit"],
        }]);

        let result = self.call("getblocktemplate", params).await?;

        serde_json::from_value(result).map_err(|err| {
            RpcError::new(&self.active_endpoint().url, "getblocktemplate", err)
        })
    }

    pub async fn create_aux_block(&self, reward_address: &str) -> Result<AuxBlock, RpcError> {
        let result = self
            .call("createauxblock", json!([reward_address]))
            .await?;

        serde_json::from_value(result)
            .map_err(|err| RpcError::new(&self.active_endpoint().url, "createauxblock", err))
    }

    pub async fn submit_block(&self, block_hex: &str) -> Result<SubmitOutcome, RpcError> {
        let result = self.call("submitblock", json!([block_hex])).await?;
        Ok(submit_outcome(result))
    }

    pub async fn get_aux_block(
        &self,
        hash_hex: &str,
        auxpow_hex: &str,
    ) -> Result<SubmitOutcome, RpcError> {
        let result = self
            .call("getauxblock", json!([hash_hex, auxpow_hex]))
            .await?;
        Ok(submit_outcome(result))
    }

    pub async fn get_info(&self) -> Result<Value, RpcError> {
        self.call("getinfo", json!([])).await
    }

    pub async fn get_block_count(&self) -> Result<u64, RpcError> {
        let result = self.call("getblockcount", json!([])).await?;
        result.as_u64().ok_or_else(|| {
            RpcError::new(
                &self.active_endpoint().url,
                "getblockcount",
                format!("non-numeric result {result}"),
            )
        })
    }

    /// Probe every endpoint in order and re-activate the first that answers
    /// `getinfo`. Called once after a failure before a single retry.
    pub async fn check_and_recover(&self) -> Result<(), RpcError> {
        let mut last_error = None;

        for index in 0..self.endpoints.len() {
            match self.call_endpoint(index, "getinfo", json!([])).await {
                Ok(_) => {
                    self.active.store(index, Ordering::Relaxed);
                    info!(
                        "{} rpc recovered on {}",
                        self.chain, self.endpoints[index].url
                    );
                    return Ok(());
                }
                Err((err, _)) => last_error = Some(err),
            }
        }

        Err(last_error.expect("at least one endpoint is configured"))
    }
}

fn request_body(method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "1.0",
        "id": "remora",
        "method": method,
        "params": params,
    })
}

/// Daemons answer block submissions with null on acceptance and a reason
/// string on rejection; `getauxblock` answers with a boolean.
fn submit_outcome(result: Value) -> SubmitOutcome {
    match result {
        Value::Null => SubmitOutcome::Accepted,
        Value::Bool(true) => SubmitOutcome::Accepted,
        Value::Bool(false) => SubmitOutcome::Rejected("rejected".into()),
        Value::String(reason) => SubmitOutcome::Rejected(reason),
        other => SubmitOutcome::Rejected(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(url: &str) -> Endpoint {
        Endpoint {
            url: url.into(),
            username: "user".into(),
            password: "pass".into(),
        }
    }

    fn manager(urls: &[&str]) -> RpcManager {
        RpcManager::new(
            "dogecoin".into(),
            urls.iter().map(|url| endpoint(url)).collect(),
        )
        .unwrap()
    }

    #[test]
    fn empty_endpoint_list_is_a_config_error() {
        assert!(RpcManager::new("dogecoin".into(), Vec::new()).is_err());
    }

    #[test]
    fn rotation_wraps_and_ignores_stale_rotations() {
        let manager = manager(&["http://a", "http://b", "http://c"]);
        assert_eq!(manager.active_endpoint().url, "http://a");

        manager.rotate(0);
        assert_eq!(manager.active_endpoint().url, "http://b");

        // a stale failure observed on endpoint 0 must not rotate again
        manager.rotate(0);
        assert_eq!(manager.active_endpoint().url, "http://b");

        manager.rotate(1);
        manager.rotate(2);
        assert_eq!(manager.active_endpoint().url, "http://a");
    }

    #[test]
    fn request_body_is_json_rpc_1_0() {
        let body = request_body("getblocktemplate", json!([]));
        assert_eq!(body["jsonrpc"], "1.0");
        assert_eq!(body["method"], "getblocktemplate");
        assert_eq!(body["params"], json!([]));
    }

    #[test]
    fn submit_outcomes() {
        assert_eq!(submit_outcome(Value::Null), SubmitOutcome::Accepted);
        assert_eq!(submit_outcome(json!(true)), SubmitOutcome::Accepted);
        assert_eq!(
            submit_outcome(json!("high-hash")),
            SubmitOutcome::Rejected("high-hash".into())
        );
        assert_eq!(
            submit_outcome(json!(false)),
            SubmitOutcome::Rejected("rejected".into())
        );
    }

    #[test]
    fn rpc_error_display_names_endpoint_and_method() {
        let error = RpcError::new("http://a", "submitblock", "boom");
        assert_eq!(error.to_string(), "rpc `submitblock` on http://a: boom");
    }
}
