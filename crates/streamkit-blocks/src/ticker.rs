//! Ticker block: broadcasts a timestamp message on a fixed interval.
//!
//! Born configured with a one second interval; the rule changes it at run
//! time. The interval restarts when a new rule is applied.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use streamkit_core::{
    Block, BlockError, BlockTemplate, Broadcast, Chassis, Message, MsgReceiver, QueryRequest,
    Reporter,
};

const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// Block that emits `{"tick": <RFC 3339 timestamp>}` every interval.
pub struct Ticker {
    every: Duration,
    rule_in: Option<MsgReceiver>,
    queries: Option<mpsc::Receiver<QueryRequest>>,
    quit: Option<watch::Receiver<bool>>,
    out: Option<Broadcast>,
    reporter: Option<Reporter>,
}

impl Ticker {
    pub const TEMPLATE: BlockTemplate = BlockTemplate {
        block_type: "ticker",
        route_names: &["rule"],
        build: new_ticker,
    };
}

impl Default for Ticker {
    fn default() -> Self {
        Self {
            every: DEFAULT_INTERVAL,
            rule_in: None,
            queries: None,
            quit: None,
            out: None,
            reporter: None,
        }
    }
}

fn new_ticker() -> Box<dyn Block> {
    Box::new(Ticker::default())
}

#[async_trait]
impl Block for Ticker {
    fn setup(&mut self, hub: &mut Chassis) -> Result<(), BlockError> {
        hub.describe("ticker", "emits a timestamp message on a fixed interval");
        self.rule_in = Some(hub.in_route("rule")?);
        self.queries = Some(hub.query_route("rule")?);
        self.quit = Some(hub.quit());
        self.out = Some(hub.broadcast());
        self.reporter = Some(hub.reporter());
        Ok(())
    }

    async fn run(&mut self) {
        let (Some(mut rule_in), Some(mut queries), Some(mut quit), Some(out), Some(reporter)) = (
            self.rule_in.take(),
            self.queries.take(),
            self.quit.take(),
            self.out.take(),
            self.reporter.take(),
        ) else {
            return;
        };

        let mut ticker = interval_at(Instant::now() + self.every, self.every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                changed = quit.changed() => {
                    if changed.is_err() || *quit.borrow() {
                        return;
                    }
                }
                Some(rule_msg) = rule_in.recv() => {
                    match parse_interval(&rule_msg) {
                        Ok(every) => {
                            self.every = every;
                            ticker = interval_at(Instant::now() + every, every);
                            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                        }
                        Err(e) => reporter.report(e),
                    }
                }
                Some(request) = queries.recv() => {
                    let _ = request.reply.send(json!({ "Interval": self.every.as_secs_f64() }));
                }
                _ = ticker.tick() => {
                    out.send(json!({ "tick": Utc::now().to_rfc3339() })).await;
                }
            }
        }
    }
}

/// Reads the `Interval` rule field: seconds as a positive number, or a
/// string like `"250ms"`, `"2s"`, `"1m"` (a bare number string is seconds).
fn parse_interval(msg: &Message) -> Result<Duration, BlockError> {
    let value = msg
        .get("Interval")
        .ok_or_else(|| BlockError::rule("expected field \"Interval\""))?;
    let seconds = match value {
        Message::Number(n) => n
            .as_f64()
            .ok_or_else(|| BlockError::rule("interval out of range"))?,
        Message::String(text) => parse_duration_text(text)?,
        other => {
            return Err(BlockError::rule(format!(
                "interval must be a number or string, got {other}"
            )));
        }
    };
    if !(seconds.is_finite() && seconds > 0.0) {
        return Err(BlockError::rule(format!(
            "interval must be positive, got {seconds}"
        )));
    }
    Ok(Duration::from_secs_f64(seconds))
}

fn parse_duration_text(text: &str) -> Result<f64, BlockError> {
    let text = text.trim();
    let (number, scale) = if let Some(rest) = text.strip_suffix("ms") {
        (rest, 0.001)
    } else if let Some(rest) = text.strip_suffix('s') {
        (rest, 1.0)
    } else if let Some(rest) = text.strip_suffix('m') {
        (rest, 60.0)
    } else {
        (text, 1.0)
    };
    let value: f64 = number
        .trim()
        .parse()
        .map_err(|_| BlockError::rule(format!("bad interval {text:?}")))?;
    Ok(value * scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use streamkit_core::spawn;

    #[test]
    fn interval_accepts_numbers_and_suffixed_strings() {
        let cases = [
            (json!({ "Interval": 0.25 }), Duration::from_millis(250)),
            (json!({ "Interval": 2 }), Duration::from_secs(2)),
            (json!({ "Interval": "250ms" }), Duration::from_millis(250)),
            (json!({ "Interval": "2s" }), Duration::from_secs(2)),
            (json!({ "Interval": "1m" }), Duration::from_secs(60)),
            (json!({ "Interval": "0.5" }), Duration::from_millis(500)),
        ];
        for (msg, expected) in cases {
            assert_eq!(parse_interval(&msg).unwrap(), expected, "case {msg}");
        }
    }

    #[test]
    fn interval_rejects_bad_values() {
        for msg in [
            json!({}),
            json!({ "Interval": "fast" }),
            json!({ "Interval": -1 }),
            json!({ "Interval": 0 }),
            json!({ "Interval": true }),
        ] {
            assert!(
                matches!(parse_interval(&msg), Err(BlockError::Rule(_))),
                "case {msg}"
            );
        }
    }

    #[tokio::test]
    async fn ticks_are_broadcast_and_interval_is_queryable() {
        let handle = spawn(&Ticker::TEMPLATE, "tick-1").unwrap();
        let mut out = handle.subscribe();

        handle.send_rule(json!({ "Interval": 0.01 })).await.unwrap();
        let snapshot = handle.query("rule").await.unwrap();
        assert_eq!(snapshot, json!({ "Interval": 0.01 }));

        let tick = out.recv().await.unwrap();
        assert!(tick.get("tick").and_then(|v| v.as_str()).is_some());
        handle.stop().await;
    }

    #[tokio::test]
    async fn bad_interval_rule_keeps_previous_interval() {
        let mut handle = spawn(&Ticker::TEMPLATE, "tick-1").unwrap();
        let mut faults = handle.take_faults().unwrap();

        handle.send_rule(json!({ "Interval": 0.02 })).await.unwrap();
        handle.send_rule(json!({ "Interval": "fast" })).await.unwrap();

        let fault = faults.recv().await.unwrap();
        assert!(matches!(fault.error, BlockError::Rule(_)));
        let snapshot = handle.query("rule").await.unwrap();
        assert_eq!(snapshot, json!({ "Interval": 0.02 }));
        handle.stop().await;
    }
}
