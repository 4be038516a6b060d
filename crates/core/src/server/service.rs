use super::session::Session;
use super::table::NameTable;
use crate::protocol::{decode, encode};
use crate::transport::{FrameReceiver, FrameSender, Listener};
use nameplate_common::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// The directory server: accepts sessions and serves the shared table
///
/// The server never initiates traffic; every frame it sends is a reply
/// to a request, and a malformed session cannot take the server or any
/// other session down with it.
#[derive(Clone)]
pub struct DirectoryServer {
    table: Arc<Mutex<NameTable>>,
}

impl DirectoryServer {
    pub fn new() -> Self {
        Self {
            table: Arc::new(Mutex::new(NameTable::new())),
        }
    }

    /// Shared registration table, mainly for inspection in tests
    pub fn table(&self) -> Arc<Mutex<NameTable>> {
        self.table.clone()
    }

    /// Accept sessions until the listener closes
    pub async fn serve<L: Listener>(&self, mut listener: L) -> Result<()> {
        info!("directory server accepting sessions");

        loop {
            let (sender, receiver) = match listener.accept().await {
                Ok(duplex) => duplex,
                Err(e) => {
                    info!("listener closed: {e}");
                    return Ok(());
                }
            };

            let table = self.table.clone();
            tokio::spawn(async move {
                run_session(table, sender, receiver).await;
            });
        }
    }
}

impl Default for DirectoryServer {
    fn default() -> Self {
        Self::new()
    }
}

async fn run_session(
    table: Arc<Mutex<NameTable>>,
    mut sender: Box<dyn FrameSender>,
    mut receiver: Box<dyn FrameReceiver>,
) {
    let mut session = Session::new(table);

    loop {
        let frame = match receiver.recv().await {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(e) => {
                warn!("session receive failed: {e}");
                break;
            }
        };

        let message = match decode(&frame) {
            Ok(message) => message,
            Err(e) => {
                // Malformed input is this session's problem only.
                warn!("dropping malformed frame: {e}");
                continue;
            }
        };

        if let Some(reply) = session.handle(message).await {
            if let Err(e) = sender.send(encode(&reply)).await {
                debug!("session reply failed: {e}");
                break;
            }
        }
    }

    session.close();
    debug!("session closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Message, MessageBody};
    use crate::scope::ScopePath;
    use crate::transport::{Connector, MemoryNetwork};
    use nameplate_common::{ChannelLocation, Location};

    fn loc(address: &str) -> Location {
        Location::Channel(ChannelLocation::new(address, 0))
    }

    fn scope(s: &str) -> ScopePath {
        s.parse().unwrap()
    }

    async fn start_server(network: &MemoryNetwork) -> (DirectoryServer, Location) {
        let listener = network.listen("directory");
        let server = DirectoryServer::new();
        let serving = server.clone();
        tokio::spawn(async move {
            serving.serve(listener).await.unwrap();
        });
        (server, loc("directory"))
    }

    #[tokio::test]
    async fn test_session_over_memory_transport() {
        let network = MemoryNetwork::new();
        let (_server, target) = start_server(&network).await;

        let (mut tx, mut rx) = network.connect(&target).await.unwrap();

        tx.send(encode(&Message::new(
            0,
            MessageBody::Logon {
                reply_location: loc("client:1"),
            },
        )))
        .await
        .unwrap();
        let reply = decode(&rx.recv().await.unwrap().unwrap()).unwrap();
        assert_eq!(reply.body, MessageBody::LogonReply { success: true });

        tx.send(encode(&Message::new(
            1,
            MessageBody::RegisterRequest {
                name: "pipeline.in".into(),
                scope: scope("global"),
                location: loc("node1:9600"),
            },
        )))
        .await
        .unwrap();
        let reply = decode(&rx.recv().await.unwrap().unwrap()).unwrap();
        assert_eq!(reply.index, 1);
        assert!(matches!(
            reply.body,
            MessageBody::RegisterReply { key: Some(_) }
        ));
    }

    #[tokio::test]
    async fn test_malformed_frame_does_not_kill_session() {
        let network = MemoryNetwork::new();
        let (_server, target) = start_server(&network).await;

        let (mut tx, mut rx) = network.connect(&target).await.unwrap();

        tx.send(vec![0xFF, 0xFF, 0xFF]).await.unwrap();

        // The session must still answer a well-formed logon.
        tx.send(encode(&Message::new(
            0,
            MessageBody::Logon {
                reply_location: loc("client:1"),
            },
        )))
        .await
        .unwrap();
        let reply = decode(&rx.recv().await.unwrap().unwrap()).unwrap();
        assert_eq!(reply.body, MessageBody::LogonReply { success: true });
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let network = MemoryNetwork::new();
        let (server, target) = start_server(&network).await;

        // A session that only sends garbage...
        let (mut bad_tx, _bad_rx) = network.connect(&target).await.unwrap();
        bad_tx.send(b"not a message".to_vec()).await.unwrap();

        // ...does not disturb a well-behaved one.
        let (mut tx, mut rx) = network.connect(&target).await.unwrap();
        tx.send(encode(&Message::new(
            0,
            MessageBody::Logon {
                reply_location: loc("client:2"),
            },
        )))
        .await
        .unwrap();
        let _ = rx.recv().await.unwrap().unwrap();

        tx.send(encode(&Message::new(
            1,
            MessageBody::RegisterRequest {
                name: "svc".into(),
                scope: scope("global"),
                location: loc("node1:9600"),
            },
        )))
        .await
        .unwrap();
        let _ = rx.recv().await.unwrap().unwrap();

        assert_eq!(server.table().lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_register_single_winner() {
        let network = MemoryNetwork::new();
        let (server, target) = start_server(&network).await;

        let mut handles = Vec::new();
        for i in 0..2 {
            let network = network.clone();
            let target = target.clone();
            handles.push(tokio::spawn(async move {
                let (mut tx, mut rx) = network.connect(&target).await.unwrap();
                tx.send(encode(&Message::new(
                    0,
                    MessageBody::Logon {
                        reply_location: loc("client"),
                    },
                )))
                .await
                .unwrap();
                let _ = rx.recv().await.unwrap().unwrap();

                tx.send(encode(&Message::new(
                    1,
                    MessageBody::RegisterRequest {
                        name: "contested".into(),
                        scope: scope("global"),
                        location: loc(&format!("racer{i}:9600")),
                    },
                )))
                .await
                .unwrap();
                let reply = decode(&rx.recv().await.unwrap().unwrap()).unwrap();
                matches!(reply.body, MessageBody::RegisterReply { key: Some(_) })
            }));
        }

        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap() {
                wins += 1;
            }
        }

        assert_eq!(wins, 1);
        assert_eq!(server.table().lock().await.len(), 1);
    }
}
