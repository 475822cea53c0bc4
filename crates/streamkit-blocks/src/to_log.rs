//! ToLog block: writes every inbound message to the log and emits nothing.

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::info;

use streamkit_core::{Block, BlockError, BlockTemplate, Chassis, MsgReceiver};

/// Sink block for inspecting pipeline traffic.
#[derive(Default)]
pub struct ToLog {
    name: String,
    input: Option<MsgReceiver>,
    quit: Option<watch::Receiver<bool>>,
}

impl ToLog {
    pub const TEMPLATE: BlockTemplate = BlockTemplate {
        block_type: "tolog",
        route_names: &["in"],
        build: new_to_log,
    };
}

fn new_to_log() -> Box<dyn Block> {
    Box::new(ToLog::default())
}

#[async_trait]
impl Block for ToLog {
    fn setup(&mut self, hub: &mut Chassis) -> Result<(), BlockError> {
        hub.describe("tolog", "writes inbound messages to the log");
        self.name = hub.name().to_string();
        self.input = Some(hub.in_route("in")?);
        self.quit = Some(hub.quit());
        Ok(())
    }

    async fn run(&mut self) {
        let (Some(mut input), Some(mut quit)) = (self.input.take(), self.quit.take()) else {
            return;
        };

        loop {
            tokio::select! {
                biased;
                changed = quit.changed() => {
                    if changed.is_err() || *quit.borrow() {
                        return;
                    }
                }
                Some(msg) = input.recv() => {
                    info!(block = %self.name, message = %msg, "tolog");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use streamkit_core::spawn;

    #[tokio::test]
    async fn consumes_messages_and_stops_on_quit() {
        let mut handle = spawn(&ToLog::TEMPLATE, "log-1").unwrap();
        let mut faults = handle.take_faults().unwrap();

        handle.send("in", json!({ "n": 1 })).await.unwrap();
        handle.send("in", json!("text")).await.unwrap();

        handle.stop().await;
        assert!(faults.try_recv().is_err());
    }
}
