use super::net::{EndpointId, NetInput, NetOutput};
use crate::client::DirectoryClient;
use crate::key::CapabilityKey;
use crate::scope::ScopePath;
use crate::transport::EndpointFactory;
use nameplate_common::{NameplateError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, warn};

/// Reported by `destroy_all` when some endpoints did not go down
/// cleanly; the sweep itself is always exhaustive.
#[derive(Debug, Error)]
#[error("{} endpoint(s) failed to destroy cleanly", failures.len())]
pub struct DestroyAllError {
    pub failures: Vec<NameplateError>,
}

struct OwnedInput {
    endpoint: NetInput,
    name: String,
    scope: ScopePath,
    key: CapabilityKey,
}

#[derive(Default)]
struct OwnedTable {
    inputs: HashMap<EndpointId, OwnedInput>,
    outputs: HashMap<EndpointId, NetOutput>,
}

/// Creates named endpoints and owns their lifecycle
///
/// Each manager exclusively owns the endpoints it created: only the
/// creating manager may destroy an endpoint, and destruction succeeds
/// at most once. Input endpoints are registered with the directory
/// and deregistered on destruction with the key minted for them.
pub struct EndpointManager {
    client: DirectoryClient,
    factory: Arc<dyn EndpointFactory>,
    next_id: AtomicU64,
    owned: Mutex<OwnedTable>,
}

impl EndpointManager {
    pub fn new(client: DirectoryClient, factory: Arc<dyn EndpointFactory>) -> Self {
        Self {
            client,
            factory,
            next_id: AtomicU64::new(1),
            owned: Mutex::new(OwnedTable::default()),
        }
    }

    fn fresh_id(&self) -> EndpointId {
        EndpointId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Create a local input endpoint and register it under `name`
    ///
    /// If registration fails the freshly created endpoint is closed
    /// before the failure is surfaced, so nothing leaks.
    pub async fn create_input(&self, name: &str, scope: &ScopePath) -> Result<NetInput> {
        let (location, source) = self.factory.create_input().await?;
        let endpoint = NetInput::new(self.fresh_id(), location.clone(), source);

        let key = match self.client.register(name, scope, location).await {
            Ok(key) => key,
            Err(e) => {
                debug!("discarding endpoint for {name}: registration failed");
                endpoint.close().await;
                return Err(e);
            }
        };

        let mut owned = self.owned.lock().expect("owned table poisoned");
        owned.inputs.insert(
            endpoint.id(),
            OwnedInput {
                endpoint: endpoint.clone(),
                name: name.to_string(),
                scope: scope.clone(),
                key,
            },
        );

        Ok(endpoint)
    }

    /// Resolve `name` and connect a local output endpoint to it
    pub async fn create_output(&self, name: &str, scope: &ScopePath) -> Result<NetOutput> {
        let resolution = self.client.resolve_location(name, scope).await?;
        let sink = self.factory.open_output(&resolution.location).await?;
        let endpoint = NetOutput::new(self.fresh_id(), resolution.location, sink);

        let mut owned = self.owned.lock().expect("owned table poisoned");
        owned.outputs.insert(endpoint.id(), endpoint.clone());

        Ok(endpoint)
    }

    /// Destroy an input endpoint created by this manager
    ///
    /// The registration is removed from the directory before local
    /// resources are released; a deregistration failure is propagated
    /// after the endpoint has been closed and untracked.
    pub async fn destroy_input(&self, endpoint: &NetInput) -> Result<()> {
        let record = {
            let mut owned = self.owned.lock().expect("owned table poisoned");
            owned
                .inputs
                .remove(&endpoint.id())
                .ok_or(NameplateError::OwnershipViolation)?
        };

        let result = self
            .client
            .deregister(&record.name, &record.scope, record.key)
            .await;
        if let Err(e) = &result {
            warn!("deregistering {} failed: {e}", record.name);
        }

        record.endpoint.close().await;
        result
    }

    /// Destroy an output endpoint created by this manager
    pub async fn destroy_output(&self, endpoint: &NetOutput) -> Result<()> {
        let tracked = {
            let mut owned = self.owned.lock().expect("owned table poisoned");
            owned
                .outputs
                .remove(&endpoint.id())
                .ok_or(NameplateError::OwnershipViolation)?
        };

        tracked.close().await;
        Ok(())
    }

    /// Destroy every endpoint this manager still tracks
    ///
    /// Exhaustive: an individual failure is collected and the sweep
    /// continues; afterwards the manager tracks nothing.
    pub async fn destroy_all(&self) -> std::result::Result<(), DestroyAllError> {
        let (inputs, outputs) = {
            let mut owned = self.owned.lock().expect("owned table poisoned");
            (
                owned.inputs.drain().collect::<Vec<_>>(),
                owned.outputs.drain().collect::<Vec<_>>(),
            )
        };

        let mut failures = Vec::new();

        for (_, record) in inputs {
            if let Err(e) = self
                .client
                .deregister(&record.name, &record.scope, record.key)
                .await
            {
                warn!("deregistering {} failed: {e}", record.name);
                failures.push(e);
            }
            record.endpoint.close().await;
        }

        for (_, endpoint) in outputs {
            endpoint.close().await;
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(DestroyAllError { failures })
        }
    }

    pub fn tracked_inputs(&self) -> usize {
        self.owned.lock().expect("owned table poisoned").inputs.len()
    }

    pub fn tracked_outputs(&self) -> usize {
        self.owned
            .lock()
            .expect("owned table poisoned")
            .outputs
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{decode, encode, Message, MessageBody};
    use crate::server::DirectoryServer;
    use crate::transport::{Listener, MemoryNetwork};
    use nameplate_common::{ChannelLocation, Location};

    fn loc(address: &str) -> Location {
        Location::Channel(ChannelLocation::new(address, 0))
    }

    fn scope(s: &str) -> ScopePath {
        s.parse().unwrap()
    }

    async fn start_directory(network: &MemoryNetwork) -> Location {
        let listener = network.listen("directory");
        let server = DirectoryServer::new();
        tokio::spawn(async move {
            server.serve(listener).await.unwrap();
        });
        loc("directory")
    }

    async fn manager(network: &MemoryNetwork, server: &Location) -> EndpointManager {
        let client = DirectoryClient::connect(network, server, loc("client:reply"))
            .await
            .unwrap();
        EndpointManager::new(client, Arc::new(network.clone()))
    }

    #[tokio::test]
    async fn test_create_input_then_output_and_exchange_data() {
        let network = MemoryNetwork::new();
        let server = start_directory(&network).await;
        let node = scope("global/acme/node1");

        let producer = manager(&network, &server).await;
        let consumer = manager(&network, &server).await;

        let input = producer.create_input("pipeline.in", &node).await.unwrap();
        let output = consumer.create_output("pipeline.in", &node).await.unwrap();

        output.send(b"work item".to_vec()).await.unwrap();
        assert_eq!(input.receive().await.unwrap().unwrap(), b"work item");

        assert_eq!(producer.tracked_inputs(), 1);
        assert_eq!(consumer.tracked_outputs(), 1);
    }

    #[tokio::test]
    async fn test_failed_registration_discards_endpoint() {
        let network = MemoryNetwork::new();
        let server = start_directory(&network).await;
        let node = scope("global/acme/node1");
        let mgr = manager(&network, &server).await;

        mgr.create_input("taken", &node).await.unwrap();
        let clash = mgr.create_input("taken", &node).await;
        assert!(matches!(clash, Err(NameplateError::NameClash { .. })));

        // Only the first endpoint is tracked; the second one was
        // discarded, not leaked into the table.
        assert_eq!(mgr.tracked_inputs(), 1);
    }

    #[tokio::test]
    async fn test_destroy_through_wrong_manager_is_ownership_violation() {
        let network = MemoryNetwork::new();
        let server = start_directory(&network).await;
        let node = scope("global/acme/node1");

        let owner = manager(&network, &server).await;
        let stranger = manager(&network, &server).await;

        let input = owner.create_input("pipeline.in", &node).await.unwrap();

        assert!(matches!(
            stranger.destroy_input(&input).await,
            Err(NameplateError::OwnershipViolation)
        ));

        // Still owned, still usable.
        assert_eq!(owner.tracked_inputs(), 1);
        assert!(!input.is_closed());
        let output = stranger.create_output("pipeline.in", &node).await.unwrap();
        output.send(b"still here".to_vec()).await.unwrap();
        assert_eq!(input.receive().await.unwrap().unwrap(), b"still here");
    }

    #[tokio::test]
    async fn test_destroy_input_deregisters_and_closes_once() {
        let network = MemoryNetwork::new();
        let server = start_directory(&network).await;
        let node = scope("global/acme/node1");
        let mgr = manager(&network, &server).await;

        let input = mgr.create_input("pipeline.in", &node).await.unwrap();
        mgr.destroy_input(&input).await.unwrap();

        assert!(input.is_closed());
        assert_eq!(mgr.tracked_inputs(), 0);

        // A second destroy of the same endpoint is an ownership error.
        assert!(matches!(
            mgr.destroy_input(&input).await,
            Err(NameplateError::OwnershipViolation)
        ));

        // And the name is free again.
        mgr.create_input("pipeline.in", &node).await.unwrap();
    }

    #[tokio::test]
    async fn test_destroy_all_clean() {
        let network = MemoryNetwork::new();
        let server = start_directory(&network).await;
        let node = scope("global/acme/node1");
        let mgr = manager(&network, &server).await;

        let a = mgr.create_input("a", &node).await.unwrap();
        let b = mgr.create_input("b", &node).await.unwrap();
        let out = mgr.create_output("a", &node).await.unwrap();

        mgr.destroy_all().await.unwrap();

        assert_eq!(mgr.tracked_inputs(), 0);
        assert_eq!(mgr.tracked_outputs(), 0);
        assert!(a.is_closed() && b.is_closed() && out.is_closed());

        // Registrations are gone from the directory.
        let probe = manager(&network, &server).await;
        assert!(probe.create_output("a", &node).await.is_err());
        assert!(probe.create_output("b", &node).await.is_err());
    }

    #[tokio::test]
    async fn test_destroy_wakes_a_blocked_receiver() {
        let network = MemoryNetwork::new();
        let server = start_directory(&network).await;
        let node = scope("global/acme/node1");
        let mgr = manager(&network, &server).await;

        let input = mgr.create_input("pipeline.in", &node).await.unwrap();

        // Park a receiver on the empty endpoint before destroying it.
        let parked = tokio::spawn({
            let input = input.clone();
            async move { input.receive().await }
        });
        tokio::task::yield_now().await;

        mgr.destroy_input(&input).await.unwrap();

        let woken = parked.await.unwrap();
        assert!(matches!(woken, Err(NameplateError::Communication(_))));
        assert!(input.is_closed());

        // The transport half is gone, so later calls fail immediately.
        assert!(input.receive().await.is_err());
    }

    /// Directory stand-in that accepts registrations but refuses every
    /// deregistration, to exercise the failure-collection path.
    async fn start_stubborn_directory(network: &MemoryNetwork) -> Location {
        let mut listener = network.listen("directory");
        tokio::spawn(async move {
            let (mut tx, mut rx) = listener.accept().await.unwrap();
            let mut registered: std::collections::HashMap<String, Location> =
                std::collections::HashMap::new();
            let minter = crate::key::KeyMinter::new();

            while let Ok(Some(frame)) = rx.recv().await {
                let message = decode(&frame).unwrap();
                let index = message.index;
                let reply = match message.body {
                    MessageBody::Logon { .. } => {
                        Message::new(index, MessageBody::LogonReply { success: true })
                    }
                    MessageBody::RegisterRequest { name, location, .. } => {
                        registered.insert(name, location);
                        Message::new(
                            index,
                            MessageBody::RegisterReply {
                                key: Some(minter.mint()),
                            },
                        )
                    }
                    MessageBody::ResolveRequest { name, scope } => {
                        let location = registered
                            .get(&name)
                            .cloned()
                            .unwrap_or(Location::None);
                        Message::new(
                            index,
                            MessageBody::ResolveReply {
                                location,
                                name,
                                scope,
                            },
                        )
                    }
                    MessageBody::DeregisterRequest { .. } => {
                        Message::new(index, MessageBody::DeregisterReply { success: false })
                    }
                    _ => continue,
                };
                tx.send(encode(&reply)).await.unwrap();
            }
        });
        loc("directory")
    }

    #[tokio::test]
    async fn test_destroy_all_is_exhaustive_under_failures() {
        let network = MemoryNetwork::new();
        let server = start_stubborn_directory(&network).await;
        let node = scope("global/acme/node1");
        let mgr = manager(&network, &server).await;

        let a = mgr.create_input("a", &node).await.unwrap();
        let b = mgr.create_input("b", &node).await.unwrap();
        let out = mgr.create_output("a", &node).await.unwrap();

        let err = mgr.destroy_all().await.unwrap_err();

        // Both deregistrations failed, yet every endpoint went down
        // and nothing is tracked any more.
        assert_eq!(err.failures.len(), 2);
        assert_eq!(mgr.tracked_inputs(), 0);
        assert_eq!(mgr.tracked_outputs(), 0);
        assert!(a.is_closed() && b.is_closed() && out.is_closed());
    }
}
