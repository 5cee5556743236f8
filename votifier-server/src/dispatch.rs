//! Forwarding votes to RCON targets.

use crate::config::RconTarget;
use crate::event::{ConnectionInfo, Event, Notifier};
use crate::template::Substitutions;
use async_trait::async_trait;
use std::time::Duration;
use votifier_protocol::Vote;
use votifier_rcon::{Client, ConnectionConfig, RconError};

/// Sends one rendered command to one target.
#[async_trait]
pub trait CommandSender: Send + Sync {
    async fn send_command(&self, target: &RconTarget, command: &str) -> Result<String, RconError>;
}

/// Sender that opens a fresh RCON connection for every command.
#[derive(Debug, Clone)]
pub struct RconCommandSender {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for RconCommandSender {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
        }
    }
}

#[async_trait]
impl CommandSender for RconCommandSender {
    async fn send_command(&self, target: &RconTarget, command: &str) -> Result<String, RconError> {
        let config = ConnectionConfig::new(target.address(), target.password.clone())
            .with_connect_timeout(self.connect_timeout)
            .with_request_timeout(self.request_timeout);
        Client::execute_once(config, command).await
    }
}

/// Renders every template of every target for `vote` and sends it.
///
/// Each command is attempted exactly once. A failure is reported as an event
/// and the remaining commands still run.
pub async fn dispatch_vote(
    vote: &Vote,
    conn: ConnectionInfo,
    targets: &[RconTarget],
    sender: &dyn CommandSender,
    notifier: &Notifier,
) {
    let subs = Substitutions::for_vote(vote);

    for target in targets {
        let address = target.address();
        for template in &target.commands {
            let command = subs.render(template);
            notifier.emit(Event::SendingCommand {
                conn,
                target: address.clone(),
                command: command.clone(),
            });

            match sender.send_command(target, &command).await {
                Ok(response) => notifier.emit(Event::CommandResponse {
                    conn,
                    target: address.clone(),
                    response,
                }),
                Err(error) => notifier.emit(Event::RconException {
                    conn,
                    target: address.clone(),
                    error,
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::context::ServerContext;
    use crate::event::{EventKind, ListenerRegistry};
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Fails every command sent to port 1, echoes the rest.
    struct FlakySender {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl CommandSender for FlakySender {
        async fn send_command(
            &self,
            target: &RconTarget,
            command: &str,
        ) -> Result<String, RconError> {
            self.sent.lock().push((target.address(), command.to_string()));
            if target.port == 1 || command.contains("fail") {
                Err(RconError::ConnectionClosed)
            } else {
                Ok(format!("done: {}", command))
            }
        }
    }

    fn recorder() -> (Notifier, Arc<Mutex<Vec<(EventKind, Option<String>)>>>) {
        let registry = Arc::new(ListenerRegistry::new());
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        registry.register(Arc::new(move |event: &Event, _: &ServerContext| {
            let target = match event {
                Event::SendingCommand { target, .. }
                | Event::CommandResponse { target, .. }
                | Event::RconException { target, .. } => Some(target.clone()),
                _ => None,
            };
            sink.lock().push((event.kind(), target));
        }));
        (
            Notifier::new(registry, ServerContext::new(Config::default())),
            events,
        )
    }

    fn conn() -> ConnectionInfo {
        ConnectionInfo::new("127.0.0.1:40000".parse().unwrap())
    }

    #[tokio::test]
    async fn test_failing_target_does_not_stop_others() {
        let targets = vec![
            RconTarget::new("a", 1, "pw").with_command("say ${user-name}"),
            RconTarget::new("b", 2, "pw").with_command("say ${user-name}"),
        ];
        let sender = FlakySender {
            sent: Mutex::new(Vec::new()),
        };
        let (notifier, events) = recorder();
        let vote = Vote::new("site", "Alice", "1.2.3.4", "1");

        dispatch_vote(&vote, conn(), &targets, &sender, &notifier).await;

        assert_eq!(
            *events.lock(),
            vec![
                (EventKind::SendingCommand, Some("a:1".to_string())),
                (EventKind::RconException, Some("a:1".to_string())),
                (EventKind::SendingCommand, Some("b:2".to_string())),
                (EventKind::CommandResponse, Some("b:2".to_string())),
            ]
        );
        assert_eq!(
            *sender.sent.lock(),
            vec![
                ("a:1".to_string(), "say Alice".to_string()),
                ("b:2".to_string(), "say Alice".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_failing_command_does_not_stop_same_target() {
        let targets = vec![RconTarget::new("a", 2, "pw")
            .with_command("fail ${user-name}")
            .with_command("give ${user-name} diamond")];
        let sender = FlakySender {
            sent: Mutex::new(Vec::new()),
        };
        let (notifier, events) = recorder();
        let vote = Vote::new("site", "Bob", "1.2.3.4", "1");

        dispatch_vote(&vote, conn(), &targets, &sender, &notifier).await;

        let kinds: Vec<_> = events.lock().iter().map(|(k, _)| *k).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::SendingCommand,
                EventKind::RconException,
                EventKind::SendingCommand,
                EventKind::CommandResponse,
            ]
        );
        assert_eq!(sender.sent.lock()[1].1, "give Bob diamond");
    }

    #[tokio::test]
    async fn test_no_targets_no_events() {
        let sender = FlakySender {
            sent: Mutex::new(Vec::new()),
        };
        let (notifier, events) = recorder();
        let vote = Vote::new("site", "Bob", "1.2.3.4", "1");

        dispatch_vote(&vote, conn(), &[], &sender, &notifier).await;
        assert!(events.lock().is_empty());
    }

    #[tokio::test]
    async fn test_rcon_sender_reports_unreachable_target() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let sender = RconCommandSender {
            connect_timeout: Duration::from_millis(500),
            request_timeout: Duration::from_millis(500),
        };
        let target = RconTarget::new("127.0.0.1", port, "pw");
        assert!(sender.send_command(&target, "list").await.is_err());
    }
}
