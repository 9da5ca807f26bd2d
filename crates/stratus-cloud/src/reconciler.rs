//! Generic resource lifecycle reconciler
//!
//! One [`Reconciler`] drives instances of a single resource type through
//! `Absent -> Creating -> Active <-> Updating -> Deleting -> Absent`. The
//! resource supplies descriptor, status vocabulary and attribute extraction;
//! the remote client is injected and shared.

use crate::action::{DesiredChange, Operation};
use crate::client::{ListFilter, RemoteClient, RemoteObject};
use crate::error::{CloudError, Result, TransportError};
use crate::poll::{Observation, Refresh, StateChangeConf, WaitError, wait_for};
use crate::projector::Projector;
use crate::resource::{DELETED, Lookup, Resource, Timeouts};
use crate::schema::ResourceDescriptor;
use crate::state::LocalState;
use async_trait::async_trait;
use std::sync::Arc;

/// Result of reading a tracked id
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    Found(LocalState),
    /// The remote object no longer exists
    Tombstone,
}

impl ReadOutcome {
    pub fn is_tombstone(&self) -> bool {
        matches!(self, ReadOutcome::Tombstone)
    }

    pub fn into_state(self) -> Option<LocalState> {
        match self {
            ReadOutcome::Found(state) => Some(state),
            ReadOutcome::Tombstone => None,
        }
    }
}

pub struct Reconciler<R, C> {
    resource: Arc<R>,
    client: Arc<C>,
}

impl<R, C> Clone for Reconciler<R, C> {
    fn clone(&self) -> Self {
        Self {
            resource: Arc::clone(&self.resource),
            client: Arc::clone(&self.client),
        }
    }
}

impl<R, C> Reconciler<R, C>
where
    R: Resource,
    C: RemoteClient<Object = R::Object>,
{
    pub fn new(resource: Arc<R>, client: Arc<C>) -> Self {
        Self { resource, client }
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn descriptor(&self) -> &ResourceDescriptor {
        self.resource.descriptor()
    }

    fn name(&self) -> &str {
        self.descriptor().name()
    }

    /// Create the remote object described by `state` and wait until it is ready.
    ///
    /// The id is recorded in `state` as soon as the create call returns, so a
    /// failed wait still leaves the object tracked.
    pub async fn create(&self, state: &mut LocalState, timeouts: &Timeouts) -> Result<()> {
        let descriptor = self.descriptor();
        descriptor.apply_defaults(state);
        descriptor.check(state)?;

        let payload = Projector::new(descriptor).to_request(state, Operation::Create, &[])?;
        tracing::debug!("Create {} payload: {:?}", self.name(), payload);

        let created = self
            .client
            .create(&payload)
            .await
            .map_err(|e| self.transport(Operation::Create, None, e))?;

        let id = created.id().to_string();
        if id.is_empty() {
            return Err(self.transport(
                Operation::Create,
                None,
                TransportError::unexpected("create response carried no id"),
            ));
        }
        state.set_id(id.clone());
        tracing::info!("Created {} {}, waiting for it to become ready", self.name(), id);

        let lifecycle = self.resource.lifecycle();
        let conf = StateChangeConf::new(
            lifecycle.pending_create.clone(),
            lifecycle.steady.clone(),
            timeouts.create,
        )
        .with_poll(lifecycle.poll.clone());

        let mut refresher = CreateRefresh {
            reconciler: self,
            id: &id,
        };
        let settled = wait_for(&conf, &mut refresher)
            .await
            .map_err(|e| self.wait_error(Operation::Create, &id, e))?;

        let object = settled.value.unwrap_or(created);
        let projected = self.project(&object, Some(&*state));
        *state = projected;

        tracing::info!("{} {} is {}", self.name(), id, settled.status);
        Ok(())
    }

    /// Fetch `id` and project it into fresh local state
    pub async fn read(&self, id: &str) -> Result<ReadOutcome> {
        match self.fetch(Operation::Read, id).await? {
            Some(object) => Ok(ReadOutcome::Found(self.project(&object, None))),
            None => {
                tracing::info!("{} {} no longer exists", self.name(), id);
                Ok(ReadOutcome::Tombstone)
            }
        }
    }

    /// Re-read tracked state in place.
    ///
    /// Write-only values are kept from `state`; a tombstone clears the id.
    pub async fn refresh(&self, state: &mut LocalState) -> Result<()> {
        let id = self.tracked_id(Operation::Read, state)?;

        match self.fetch(Operation::Read, &id).await? {
            Some(object) => {
                let projected = self.project(&object, Some(&*state));
                let drift = DesiredChange::compute(self.descriptor(), state, &projected);
                if !drift.is_empty() {
                    tracing::warn!(
                        "{} {} drifted from tracked state: {}",
                        self.name(),
                        id,
                        drift.summary()
                    );
                }
                *state = projected;
            }
            None => {
                tracing::info!("{} {} no longer exists, dropping it", self.name(), id);
                state.clear_id();
            }
        }
        Ok(())
    }

    /// Apply the in-place difference between `old` and `new`.
    ///
    /// No remote call is made when nothing changed or when a changed
    /// attribute can only be applied by replacing the object.
    pub async fn update(&self, old: &LocalState, new: &LocalState) -> Result<LocalState> {
        let id = self.tracked_id(Operation::Update, old)?;
        let descriptor = self.descriptor();

        let mut desired = new.clone();
        descriptor.apply_defaults(&mut desired);

        let change = DesiredChange::compute(descriptor, old, &desired);
        if change.is_empty() {
            tracing::debug!("{} {} is up to date", self.name(), id);
            return Ok(old.clone());
        }
        if change.requires_replacement() {
            return Err(CloudError::ReplacementRequired {
                resource: self.name().to_string(),
                attributes: change.replace,
            });
        }

        descriptor.check(&desired)?;
        let payload =
            Projector::new(descriptor).to_request(&desired, Operation::Update, &change.in_place)?;
        tracing::info!("Updating {} {}: {}", self.name(), id, change.summary());
        tracing::debug!("Update {} payload: {:?}", self.name(), payload);

        self.client
            .update(&id, &payload)
            .await
            .map_err(|e| self.transport(Operation::Update, Some(&id), e))?;

        desired.set_id(id.clone());
        match self.fetch(Operation::Update, &id).await? {
            Some(object) => Ok(self.project(&object, Some(&desired))),
            None => Err(self.transport(
                Operation::Update,
                Some(&id),
                TransportError::NotFound(format!("{} disappeared after update", id)),
            )),
        }
    }

    /// Delete the tracked object and wait until it is gone.
    ///
    /// An object that is already gone is dropped without calling delete. On
    /// timeout the id stays tracked.
    pub async fn delete(&self, state: &mut LocalState, timeouts: &Timeouts) -> Result<()> {
        let Some(id) = state.id().map(str::to_string) else {
            tracing::debug!("{} is not tracked, nothing to delete", self.name());
            return Ok(());
        };

        if self.fetch(Operation::Delete, &id).await?.is_none() {
            tracing::info!("{} {} is already gone", self.name(), id);
            state.clear_id();
            return Ok(());
        }

        let lifecycle = self.resource.lifecycle();
        let conf = StateChangeConf::new(lifecycle.pending_delete.clone(), [DELETED], timeouts.delete)
            .with_poll(lifecycle.poll.clone());

        let mut refresher = DeleteRefresh {
            reconciler: self,
            id: &id,
            accepted: false,
        };
        let settled = wait_for(&conf, &mut refresher)
            .await
            .map_err(|e| self.wait_error(Operation::Delete, &id, e))?;

        state.clear_id();
        tracing::info!(
            "Deleted {} {} after {} refreshes",
            self.name(),
            id,
            settled.refreshes
        );
        Ok(())
    }

    /// Adopt an existing remote object by id
    pub async fn import(&self, id: &str) -> Result<LocalState> {
        match self.fetch(Operation::Import, id).await? {
            Some(object) => {
                tracing::info!("Imported {} {}", self.name(), id);
                Ok(self.project(&object, None))
            }
            None => Err(self.transport(
                Operation::Import,
                Some(id),
                TransportError::NotFound(format!("{} {} does not exist", self.name(), id)),
            )),
        }
    }

    /// Look up one object by id; `None` means it no longer exists
    async fn fetch(&self, operation: Operation, id: &str) -> Result<Option<R::Object>> {
        match self.resource.lifecycle().lookup {
            Lookup::Get => match self.client.get(id).await {
                Ok(object) => Ok(Some(object)),
                Err(e) if e.is_not_found() => Ok(None),
                Err(e) => Err(self.transport(operation, Some(id), e)),
            },
            Lookup::List => {
                let filter = ListFilter::by_id(id);
                let mut matches = match self.client.list(&filter).await {
                    Ok(matches) => matches,
                    Err(e) if e.is_not_found() => return Ok(None),
                    Err(e) => return Err(self.transport(operation, Some(id), e)),
                };
                match matches.len() {
                    0 => Ok(None),
                    1 => Ok(matches.pop()),
                    n => Err(CloudError::AmbiguousResult {
                        resource: self.name().to_string(),
                        filter: filter.to_string(),
                        matches: n,
                    }),
                }
            }
        }
    }

    fn project(&self, object: &R::Object, prior: Option<&LocalState>) -> LocalState {
        Projector::new(self.descriptor()).to_local(
            object.id(),
            self.resource.extract(object),
            prior,
        )
    }

    fn tracked_id(&self, operation: Operation, state: &LocalState) -> Result<String> {
        state
            .id()
            .map(str::to_string)
            .ok_or_else(|| CloudError::NotTracked {
                operation,
                resource: self.name().to_string(),
            })
    }

    fn transport(&self, operation: Operation, id: Option<&str>, source: TransportError) -> CloudError {
        CloudError::Transport {
            operation,
            resource: self.name().to_string(),
            id: id.map(str::to_string),
            source,
        }
    }

    fn wait_error(&self, operation: Operation, id: &str, err: WaitError<CloudError>) -> CloudError {
        match err {
            WaitError::Timeout {
                last_status,
                timeout,
            } => CloudError::Timeout {
                operation,
                resource: self.name().to_string(),
                id: id.to_string(),
                last_status,
                timeout,
            },
            WaitError::UnexpectedState { status, expected } => CloudError::UnexpectedState {
                operation,
                resource: self.name().to_string(),
                id: id.to_string(),
                status,
                expected,
            },
            WaitError::Refresh(err) => err,
        }
    }
}

/// Observes a freshly created object
struct CreateRefresh<'a, R, C> {
    reconciler: &'a Reconciler<R, C>,
    id: &'a str,
}

#[async_trait]
impl<'a, R, C> Refresh for CreateRefresh<'a, R, C>
where
    R: Resource,
    C: RemoteClient<Object = R::Object>,
{
    type Output = R::Object;
    type Error = CloudError;

    async fn refresh(&mut self) -> Result<Observation<R::Object>> {
        let reconciler = self.reconciler;
        match reconciler.fetch(Operation::Create, self.id).await? {
            Some(object) => {
                let status = reconciler.resource.create_status(&object);
                Ok(Observation::new(object, status))
            }
            None => Err(reconciler.transport(
                Operation::Create,
                Some(self.id),
                TransportError::NotFound(format!(
                    "{} disappeared while waiting for it to become ready",
                    self.id
                )),
            )),
        }
    }
}

/// Issues delete until the remote accepts it, then observes the object
struct DeleteRefresh<'a, R, C> {
    reconciler: &'a Reconciler<R, C>,
    id: &'a str,
    accepted: bool,
}

#[async_trait]
impl<'a, R, C> Refresh for DeleteRefresh<'a, R, C>
where
    R: Resource,
    C: RemoteClient<Object = R::Object>,
{
    type Output = R::Object;
    type Error = CloudError;

    async fn refresh(&mut self) -> Result<Observation<R::Object>> {
        let reconciler = self.reconciler;

        if !self.accepted {
            match reconciler.client.delete(self.id).await {
                Ok(()) => {
                    tracing::debug!("Delete of {} {} accepted", reconciler.name(), self.id);
                    self.accepted = true;
                }
                Err(e) if e.is_not_found() => return Ok(Observation::gone(DELETED)),
                // a conflict is transient; the next refresh issues delete again
                Err(e) => return Err(reconciler.transport(Operation::Delete, Some(self.id), e)),
            }
        }

        match reconciler.fetch(Operation::Delete, self.id).await? {
            None => Ok(Observation::gone(DELETED)),
            Some(object) => {
                let status = reconciler.resource.delete_status(&object);
                Ok(Observation::new(object, status))
            }
        }
    }
}
