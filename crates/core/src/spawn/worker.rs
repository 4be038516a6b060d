use super::contract::{SpawnOutcome, SpawnRequest};
use crate::transport::{EndpointFactory, FrameReceiver};
use async_trait::async_trait;
use nameplate_common::{NameplateError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Initializes a worker for one kind of work and runs its payloads
#[async_trait]
pub trait WorkFactory: Send + Sync {
    async fn run(&self, payload: &[u8]) -> Result<()>;
}

/// Named work factories available to a worker process
#[derive(Default)]
pub struct FactoryRegistry {
    factories: HashMap<String, Arc<dyn WorkFactory>>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, factory: Arc<dyn WorkFactory>) {
        self.factories.insert(name.into(), factory);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn WorkFactory>> {
        self.factories.get(name).cloned()
    }
}

/// Worker side: run the unit of work and report the outcome
///
/// Every internal failure, including a factory name the worker does
/// not know, is captured into a `Failed` outcome and reported to the
/// reply location; only a failure to deliver the report itself is
/// returned as an error.
pub async fn run_worker<T: EndpointFactory + ?Sized>(
    request: SpawnRequest,
    registry: &FactoryRegistry,
    transport: &T,
) -> Result<()> {
    let outcome = match registry.get(&request.factory) {
        None => SpawnOutcome::Failed {
            message: format!("unknown work factory: {}", request.factory),
        },
        Some(factory) => match factory.run(&request.payload).await {
            Ok(()) => SpawnOutcome::Completed,
            Err(e) => SpawnOutcome::Failed {
                message: e.to_string(),
            },
        },
    };

    if let SpawnOutcome::Failed { message } = &outcome {
        warn!("work from {} failed: {message}", request.origin);
    }

    let mut sink = transport.open_output(&request.reply_location).await?;
    sink.send(outcome.to_bytes()?).await?;
    debug!("spawn outcome reported to {}", request.reply_location);
    Ok(())
}

/// Supervisor side: wait for the worker's report
///
/// A reply channel that closes without delivering a report means the
/// worker died before reporting; that is always a failure, even when
/// the process exit code was zero.
pub async fn await_outcome(receiver: &mut dyn FrameReceiver) -> Result<()> {
    match receiver.recv().await? {
        None => Err(NameplateError::AbruptWorkerExit),
        Some(frame) => match SpawnOutcome::from_bytes(&frame)? {
            SpawnOutcome::Completed => Ok(()),
            SpawnOutcome::Failed { message } => Err(NameplateError::RemoteExecution(message)),
        },
    }
}
