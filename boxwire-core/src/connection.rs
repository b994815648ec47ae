//! Connection: the top-level handle to one engine.
//!
//! Owns the backend, the configuration, the compiled class map and the
//! identity cache. Every proxy holds a weak reference back to the
//! connection it was created by, so several independent connections can
//! coexist in one process.
//!
//! All calls are synchronous: a command returns only after every callback
//! event it produced has been decoded, and the engine is never asked to run
//! two commands at once from the same caller.

use std::fmt;
use std::sync::{Arc, Weak};

use boxwire_types::{path, CallbackEvent, Command, ObjectId, Value};

use crate::aggregate::{aggregate, ObjectResolver};
use crate::backend::EngineBackend;
use crate::codec::{self, Arg};
use crate::config::Config;
use crate::error::{ProtocolError, Result};
use crate::proxy::{expect_class, find_uuid, Address, EngineConfig, Engine, Master, Proxy, ProxyClass, ProxyCore, ProxyRef};
use crate::registry::{ClassMap, ClassMapBuilder, Registry};
use crate::schema::Schema;
use crate::snapshot::Snapshot;
use crate::wire;

pub struct Connection {
    backend: Box<dyn EngineBackend>,
    config: Config,
    classes: ClassMap,
    registry: Registry,
    this: Weak<Connection>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("namespace", &self.config.uuid_namespace())
            .field("classes", &self.classes.len())
            .field("cached", &self.registry.len())
            .finish()
    }
}

impl Connection {
    /// Open a connection with the default proxy catalogue.
    pub fn open(backend: impl EngineBackend + 'static, config: Config) -> Result<Arc<Self>> {
        Self::open_with_classes(backend, config, ClassMapBuilder::with_defaults())
    }

    /// Open a connection with a custom set of proxy types. Every status
    /// description is compiled here; a malformed one fails the open.
    pub fn open_with_classes(
        backend: impl EngineBackend + 'static,
        config: Config,
        classes: ClassMapBuilder,
    ) -> Result<Arc<Self>> {
        let classes = classes.build()?;
        log::info!(
            target: "protocol",
            "connection open ({} proxy classes, namespace {})",
            classes.len(),
            config.uuid_namespace()
        );
        Ok(Arc::new_cyclic(|this| Connection {
            backend: Box::new(backend),
            config,
            classes,
            registry: Registry::default(),
            this: this.clone(),
        }))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn classes(&self) -> &ClassMap {
        &self.classes
    }

    /// Number of identity-bound proxies currently cached.
    pub fn cached_objects(&self) -> usize {
        self.registry.len()
    }

    // ── Invoker ───────────────────────────────────────────────────

    /// Execute one command and return its callback events in emission order.
    pub fn invoke(&self, command: &Command) -> Result<Vec<CallbackEvent>> {
        let args: Vec<_> = command.args.iter().map(codec::to_wire).collect();
        let tags = wire::type_tags(&args);
        log::trace!(target: "protocol", "-> {}", command);

        let events = self.backend.execute(&command.path, &tags, &args).map_err(|e| {
            log::debug!(
                target: "protocol",
                "{} failed: [{}:{}] {}",
                command.path,
                e.domain,
                e.code,
                e.message
            );
            ProtocolError::Remote(e)
        })?;

        let decoded = events
            .iter()
            .map(codec::decode_event)
            .collect::<Result<Vec<_>>>()?;
        log::trace!(target: "protocol", "<- {} events from {}", decoded.len(), command.path);
        Ok(decoded)
    }

    /// Encode loosely-typed arguments and execute. Unencodable arguments
    /// fail here, before anything reaches the engine.
    pub fn cmd(&self, path: &str, args: Vec<Arg>) -> Result<Vec<CallbackEvent>> {
        let command = codec::encode_command(path, args)?;
        self.invoke(&command)
    }

    /// Read `<base>/status` and fold the reply through `schema`.
    pub fn status(&self, base: &str, schema: &Schema) -> Result<Snapshot> {
        let events = self.cmd(&path::join(base, "/status"), Vec::new())?;
        aggregate(schema, &events, self, self.config.unmatched())
    }

    /// Path addressing `id` under the identity namespace.
    pub fn identity_path(&self, id: ObjectId, rel: &str) -> String {
        path::identity_path(self.config.uuid_namespace(), id, rel)
    }

    // ── Object registry ───────────────────────────────────────────

    /// Identity of the object living at `path`.
    pub fn get_uuid(&self, base: &str) -> Result<ObjectId> {
        let full = path::join(base, "/get_uuid");
        let events = self.cmd(&full, Vec::new())?;
        find_uuid(&events).ok_or_else(|| ProtocolError::Decode {
            path: full,
            reason: "no /uuid in reply".to_string(),
        })
    }

    /// Remote class name of `id`.
    pub fn remote_class(&self, id: ObjectId) -> Result<String> {
        let full = self.identity_path(id, self.config.class_name_command());
        let events = self.cmd(&full, Vec::new())?;
        events
            .iter()
            .find(|e| e.key() == "class_name")
            .and_then(|e| e.args.first())
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ProtocolError::Decode {
                path: full,
                reason: "no /class_name in reply".to_string(),
            })
    }

    /// The cached proxy for `id`, constructing and caching it on first use.
    pub fn resolve(&self, id: ObjectId) -> Result<ProxyRef> {
        if let Some(p) = self.registry.get(id) {
            return Ok(p);
        }

        let class = self.remote_class(id)?;
        let Some(entry) = self.classes.get(&class) else {
            self.dump_object(id);
            log::error!(target: "registry", "object {} has unregistered class '{}'", id, class);
            return Err(ProtocolError::UnknownClass { id, class });
        };

        let core = ProxyCore::new(
            self.this.clone(),
            Address::Identity(id),
            self.identity_path(id, ""),
            entry.class,
            entry.schema.clone(),
        );
        let (proxy, fresh) = self.registry.insert_or_existing(id, entry.construct(core));
        if fresh {
            log::debug!(target: "registry", "cached {} {}", class, id);
            if let Err(e) = proxy.after_resolve() {
                self.registry.forget(id);
                return Err(e);
            }
        }
        Ok(proxy)
    }

    /// Resolve and downcast to a concrete proxy type.
    pub fn resolve_as<T: Proxy>(&self, id: ObjectId) -> Result<Arc<T>> {
        expect_class(self.resolve(id)?)
    }

    /// Resolve whatever object lives at `path`.
    pub fn resolve_path(&self, base: &str) -> Result<ProxyRef> {
        let id = self.get_uuid(base)?;
        self.resolve(id)
    }

    /// A transient proxy bound to a fixed path; never cached.
    pub fn path_proxy<T: ProxyClass>(&self, base: &str) -> Result<T> {
        let entry = self
            .classes
            .get(T::CLASS)
            .ok_or_else(|| ProtocolError::UnknownClass {
                id: ObjectId::NIL,
                class: T::CLASS.to_string(),
            })?;
        Ok(T::from_core(ProxyCore::new(
            self.this.clone(),
            Address::Path(base.to_string()),
            base.to_string(),
            entry.class,
            entry.schema.clone(),
        )))
    }

    // ── Root accessors ────────────────────────────────────────────

    /// Transport and timing state at `/master`.
    pub fn master(&self) -> Result<Master> {
        self.path_proxy("/master")
    }

    /// The engine's configuration store at `/config`.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        self.path_proxy("/config")
    }

    /// Root dispatch object of the engine.
    pub fn engine(&self) -> Result<Arc<Engine>> {
        let id = self.get_uuid("/engine")?;
        self.resolve_as(id)
    }

    // ── Unsolicited events ────────────────────────────────────────

    /// Drain events the engine queued outside any command (device input,
    /// hotplug). Expected to be called periodically by the host.
    pub fn idle(&self) -> Result<Vec<CallbackEvent>> {
        let mut out = Vec::new();
        for _ in 0..self.config.max_idle_batches() {
            let batch = self.cmd(self.config.idle_command(), Vec::new())?;
            if batch.is_empty() {
                break;
            }
            out.extend(batch);
        }
        Ok(out)
    }

    /// Log an object's raw status for diagnostics. Failures are logged too.
    pub fn dump_object(&self, id: ObjectId) {
        match self.cmd(&self.identity_path(id, "/status"), Vec::new()) {
            Ok(events) => {
                for ev in events {
                    let args: Vec<String> = ev.args.iter().map(|a| a.to_string()).collect();
                    log::error!(target: "registry", "  {} {} {}", id, ev.path, args.join(" "));
                }
            }
            Err(e) => log::error!(target: "registry", "  {} status unavailable: {}", id, e),
        }
    }
}

impl ObjectResolver for Connection {
    fn resolve(&self, id: ObjectId) -> Result<ProxyRef> {
        Connection::resolve(self, id)
    }
}
