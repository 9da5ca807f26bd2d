use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use stratus_cloud::{
    AttributeSpec, Attributes, Lifecycle, ListFilter, LocalState, Lookup, RemoteClient,
    RemoteLister, RemoteObject, RequestPayload, Resource, ResourceDescriptor, Timeouts,
    TransportError, Value,
};

/// Remote object served by [`MockClient`]
#[derive(Debug, Clone, PartialEq)]
pub struct Thing {
    pub id: String,
    pub status: String,
    pub attrs: Attributes,
}

impl Thing {
    pub fn new(id: &str, status: &str) -> Self {
        Self {
            id: id.to_string(),
            status: status.to_string(),
            attrs: Attributes::new(),
        }
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.attrs.insert(name.to_string(), value.into());
        self
    }
}

impl RemoteObject for Thing {
    fn id(&self) -> &str {
        &self.id
    }

    fn status(&self) -> &str {
        &self.status
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(String),
    Get(String),
    Create(Vec<String>),
    Update(String, Vec<String>),
    Delete(String),
}

type Reply<T> = Result<T, TransportError>;

/// Scripted queue; falls back to a repeated reply once drained
struct Script<T> {
    queue: VecDeque<Reply<T>>,
    fallback: Option<Reply<T>>,
}

impl<T: Clone> Script<T> {
    fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            fallback: None,
        }
    }

    fn next(&mut self, what: &str) -> Reply<T> {
        self.queue
            .pop_front()
            .or_else(|| self.fallback.clone())
            .unwrap_or_else(|| Err(TransportError::unexpected(format!("unscripted {}", what))))
    }
}

/// Remote client that replays scripted replies and records every call
pub struct MockClient {
    calls: Mutex<Vec<Call>>,
    lists: Mutex<Script<Vec<Thing>>>,
    gets: Mutex<Script<Thing>>,
    creates: Mutex<Script<Thing>>,
    updates: Mutex<Script<Thing>>,
    deletes: Mutex<Script<()>>,
}

#[allow(dead_code)]
impl MockClient {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            lists: Mutex::new(Script::new()),
            gets: Mutex::new(Script::new()),
            creates: Mutex::new(Script::new()),
            updates: Mutex::new(Script::new()),
            deletes: Mutex::new(Script::new()),
        }
    }

    pub fn on_list(self, reply: Reply<Vec<Thing>>) -> Self {
        self.lists.lock().unwrap().queue.push_back(reply);
        self
    }

    pub fn on_get(self, reply: Reply<Thing>) -> Self {
        self.gets.lock().unwrap().queue.push_back(reply);
        self
    }

    pub fn always_get(self, reply: Reply<Thing>) -> Self {
        self.gets.lock().unwrap().fallback = Some(reply);
        self
    }

    pub fn on_create(self, reply: Reply<Thing>) -> Self {
        self.creates.lock().unwrap().queue.push_back(reply);
        self
    }

    pub fn on_update(self, reply: Reply<Thing>) -> Self {
        self.updates.lock().unwrap().queue.push_back(reply);
        self
    }

    pub fn on_delete(self, reply: Reply<()>) -> Self {
        self.deletes.lock().unwrap().queue.push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| matches(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl RemoteLister for MockClient {
    type Object = Thing;

    async fn list(&self, filter: &ListFilter) -> Reply<Vec<Thing>> {
        self.record(Call::List(filter.to_string()));
        self.lists.lock().unwrap().next("list")
    }
}

#[async_trait]
impl RemoteClient for MockClient {
    async fn get(&self, id: &str) -> Reply<Thing> {
        self.record(Call::Get(id.to_string()));
        self.gets.lock().unwrap().next("get")
    }

    async fn create(&self, payload: &RequestPayload) -> Reply<Thing> {
        self.record(Call::Create(payload.names().map(String::from).collect()));
        self.creates.lock().unwrap().next("create")
    }

    async fn update(&self, id: &str, payload: &RequestPayload) -> Reply<Thing> {
        self.record(Call::Update(
            id.to_string(),
            payload.names().map(String::from).collect(),
        ));
        self.updates.lock().unwrap().next("update")
    }

    async fn delete(&self, id: &str) -> Reply<()> {
        self.record(Call::Delete(id.to_string()));
        self.deletes.lock().unwrap().next("delete")
    }
}

/// Peering-shaped resource looked up by id
pub struct Connection {
    descriptor: ResourceDescriptor,
    lifecycle: Lifecycle,
}

impl Connection {
    pub fn new() -> Self {
        Self {
            descriptor: ResourceDescriptor::new("test_connection")
                .with(AttributeSpec::string("name").optional())
                .with(AttributeSpec::string("description").optional())
                .with(AttributeSpec::string("vpc_id").required().force_new())
                .with(AttributeSpec::string("peer_vpc_id").required().force_new())
                .with(AttributeSpec::string("region").optional_computed().force_new())
                .with(AttributeSpec::string("status").computed()),
            lifecycle: Lifecycle::new(["PENDING_ACCEPTANCE", "ACTIVE"])
                .timeouts(Timeouts::uniform(Duration::from_secs(60))),
        }
    }
}

impl Resource for Connection {
    type Object = Thing;

    fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn extract(&self, object: &Thing) -> Attributes {
        let mut attrs = object.attrs.clone();
        attrs.insert("status".to_string(), Value::from(object.status.as_str()));
        attrs
    }

    fn create_status(&self, object: &Thing) -> String {
        if self.lifecycle.is_steady(&object.status) {
            object.status.clone()
        } else {
            "CREATING".to_string()
        }
    }
}

/// Policy-shaped resource only reachable through list
pub struct Policy {
    descriptor: ResourceDescriptor,
    lifecycle: Lifecycle,
}

impl Policy {
    pub fn new() -> Self {
        Self {
            descriptor: ResourceDescriptor::new("test_policy")
                .with(AttributeSpec::string("name").required())
                .with(AttributeSpec::string("status").optional_computed()),
            lifecycle: Lifecycle::new(["ON", "OFF"])
                .lookup(Lookup::List)
                .pending_create(Vec::<String>::new()),
        }
    }
}

impl Resource for Policy {
    type Object = Thing;

    fn descriptor(&self) -> &ResourceDescriptor {
        &self.descriptor
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn extract(&self, object: &Thing) -> Attributes {
        let mut attrs = object.attrs.clone();
        attrs.insert("status".to_string(), Value::from(object.status.as_str()));
        attrs
    }
}

#[allow(dead_code)]
pub fn connection(id: &str, status: &str) -> Thing {
    Thing::new(id, status)
        .with("vpc_id", "v1")
        .with("peer_vpc_id", "v2")
}

#[allow(dead_code)]
pub fn tracked_connection(id: &str) -> LocalState {
    LocalState::new()
        .with_id(id)
        .with("vpc_id", "v1")
        .with("peer_vpc_id", "v2")
        .with("region", "eu-de")
        .with("status", "ACTIVE")
}

#[allow(dead_code)]
pub fn not_found() -> TransportError {
    TransportError::NotFound("Resource not found".to_string())
}
