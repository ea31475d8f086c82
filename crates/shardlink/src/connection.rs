//! Backend connection capability traits.
//!
//! The backend's wire protocol is not specified here. The router depends on
//! exactly two capabilities: a command-execution round trip and a
//! publish/subscribe stream for a named channel. Anything implementing
//! [`BackendConnection`] can sit behind a shard.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ConnectionConfig;
use crate::error::Result;

/// A command addressed to the backend: a name plus raw byte arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    name: String,
    args: Vec<Vec<u8>>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Append an argument.
    pub fn arg(mut self, arg: impl Into<Vec<u8>>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Vec<u8>] {
        &self.args
    }
}

/// A backend reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Nil,
    Simple(String),
    Int(i64),
    Bulk(Vec<u8>),
    Array(Vec<Reply>),
}

/// Stream of raw message payloads from a subscription.
///
/// `None` from [`MessageStream::recv`] means the subscription ended and the
/// underlying connection is gone.
pub type MessageStream = tokio::sync::mpsc::Receiver<String>;

/// The two backend capabilities the router depends on.
#[async_trait]
pub trait BackendConnection: Send + Sync {
    /// Execute one command, blocking on the round trip.
    async fn execute(&self, cmd: Command) -> Result<Reply>;

    /// Subscribe to a named channel.
    async fn subscribe(&self, channel: &str) -> Result<MessageStream>;

    /// Address this connection was dialed against.
    fn addr(&self) -> &str;
}

/// Builds backend connections for shard bindings.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn connect(
        &self,
        addr: &str,
        config: &ConnectionConfig,
    ) -> Result<Arc<dyn BackendConnection>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let cmd = Command::new("SET").arg("key").arg(b"value".to_vec());
        assert_eq!(cmd.name(), "SET");
        assert_eq!(cmd.args().len(), 2);
        assert_eq!(cmd.args()[0], b"key");
        assert_eq!(cmd.args()[1], b"value");
    }
}
