//! GetHttp block: makes an HTTP GET request to a URL derived from each
//! inbound message and broadcasts the response body.
//!
//! The rule carries a path expression (compiled once, evaluated per
//! message) and a comma-separated header list. JSON response bodies are
//! broadcast parsed; anything else is wrapped as `{"data": "<raw body>"}`.
//! Network failures drop the message and report a fault; retries are a
//! higher-layer concern.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::{mpsc, watch};

use streamkit_core::{
    Block, BlockError, BlockTemplate, Broadcast, Chassis, Message, MsgReceiver, QueryRequest,
    Reporter,
};
use streamkit_path::Expr;

/// Rule consumed on the `rule` route.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetHttpRule {
    /// Path expression evaluated against each inbound message to derive the
    /// target URL, e.g. `data.url`.
    pub path: String,
    /// Comma-separated `name:value` pairs added to every request. Later
    /// duplicates of a name overwrite earlier ones.
    pub header: String,
}

struct CompiledRule {
    raw: GetHttpRule,
    expr: Expr,
    headers: HashMap<String, String>,
}

/// Block that fetches a URL named by each inbound message.
#[derive(Default)]
pub struct GetHttp {
    rule: Option<CompiledRule>,
    input: Option<MsgReceiver>,
    rule_in: Option<MsgReceiver>,
    queries: Option<mpsc::Receiver<QueryRequest>>,
    quit: Option<watch::Receiver<bool>>,
    out: Option<Broadcast>,
    reporter: Option<Reporter>,
}

impl GetHttp {
    pub const TEMPLATE: BlockTemplate = BlockTemplate {
        block_type: "gethttp",
        route_names: &["in", "rule"],
        build: new_get_http,
    };
}

fn new_get_http() -> Box<dyn Block> {
    Box::new(GetHttp::default())
}

#[async_trait]
impl Block for GetHttp {
    fn setup(&mut self, hub: &mut Chassis) -> Result<(), BlockError> {
        hub.describe(
            "gethttp",
            "makes an HTTP GET request to a URL derived from each inbound message",
        );
        self.input = Some(hub.in_route("in")?);
        self.rule_in = Some(hub.in_route("rule")?);
        self.queries = Some(hub.query_route("rule")?);
        self.quit = Some(hub.quit());
        self.out = Some(hub.broadcast());
        self.reporter = Some(hub.reporter());
        Ok(())
    }

    async fn run(&mut self) {
        let (
            Some(mut input),
            Some(mut rule_in),
            Some(mut queries),
            Some(mut quit),
            Some(out),
            Some(reporter),
        ) = (
            self.input.take(),
            self.rule_in.take(),
            self.queries.take(),
            self.quit.take(),
            self.out.take(),
            self.reporter.take(),
        )
        else {
            return;
        };

        let client = match reqwest::Client::builder().build() {
            Ok(client) => client,
            Err(e) => {
                reporter.report(BlockError::external(format!("http client init: {e}")));
                return;
            }
        };

        loop {
            tokio::select! {
                biased;
                changed = quit.changed() => {
                    if changed.is_err() || *quit.borrow() {
                        return;
                    }
                }
                Some(rule_msg) = rule_in.recv() => {
                    // the whole candidate compiles first, then replaces the
                    // previous rule in one step
                    match compile_rule(&rule_msg) {
                        Ok(compiled) => self.rule = Some(compiled),
                        Err(e) => reporter.report(e),
                    }
                }
                Some(request) = queries.recv() => {
                    let raw = self.rule.as_ref().map(|r| r.raw.clone()).unwrap_or_default();
                    let _ = request.reply.send(json!({ "Path": raw.path, "Header": raw.header }));
                }
                Some(msg) = input.recv() => {
                    // armed only once configured
                    let Some(rule) = self.rule.as_ref() else { continue };
                    let url = match rule.expr.eval(&msg) {
                        Ok(value) => value,
                        Err(e) => {
                            reporter.report(BlockError::eval(e.to_string()));
                            continue;
                        }
                    };
                    let Some(url) = url.as_str() else {
                        reporter.report(BlockError::eval("url did not evaluate to a string"));
                        continue;
                    };
                    match fetch(&client, url, &rule.headers).await {
                        Ok(body) => out.send(parse_body(body)).await,
                        Err(e) => reporter.report(BlockError::external(e.to_string())),
                    }
                }
            }
        }
    }
}

fn compile_rule(msg: &Message) -> Result<CompiledRule, BlockError> {
    let raw: GetHttpRule =
        serde_json::from_value(msg.clone()).map_err(|e| BlockError::rule(e.to_string()))?;
    let expr = streamkit_path::compile(&raw.path).map_err(|e| BlockError::rule(e.to_string()))?;
    let headers = parse_headers(&raw.header)?;
    Ok(CompiledRule { raw, expr, headers })
}

/// Parses a comma-separated `name:value` header list. A pair without a `:`
/// delimiter rejects the whole rule. Later duplicates of a name win.
fn parse_headers(spec: &str) -> Result<HashMap<String, String>, BlockError> {
    let mut headers = HashMap::new();
    if spec.is_empty() {
        return Ok(headers);
    }
    for pair in spec.split(',') {
        let Some((name, value)) = pair.split_once(':') else {
            return Err(BlockError::rule(format!(
                "header pair missing ':' delimiter: {pair:?}"
            )));
        };
        headers.insert(name.trim().to_string(), value.trim().to_string());
    }
    Ok(headers)
}

async fn fetch(
    client: &reqwest::Client,
    url: &str,
    headers: &HashMap<String, String>,
) -> Result<String, reqwest::Error> {
    let mut request = client.get(url);
    for (name, value) in headers {
        request = request.header(name.as_str(), value.as_str());
    }
    let response = request.send().await?;
    response.text().await
}

fn parse_body(body: String) -> Message {
    match serde_json::from_str::<Message>(&body) {
        Ok(parsed) => parsed,
        Err(_) => json!({ "data": body }),
    }
}
