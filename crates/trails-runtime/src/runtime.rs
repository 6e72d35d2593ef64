//! # Runtime Context
//!
//! The long-lived application object. Construction assembles the frozen
//! environment snapshot, the merged configuration, the bound registries, and
//! the ordered pack set; `start()` drives every pack through its lifecycle
//! phases to `trails:ready`, and `stop()` tears the instance back down so it
//! can be started again from a clean slate.
//!
//! # Architecture Note
//! The context *owns* its event bus rather than being one. Packs receive the
//! context by reference in every hook (the same context-injection pattern a
//! generic actor runtime uses for its entity hooks), and any number of
//! independent runtimes can coexist in one process without sharing listener
//! state.

use crate::config::{self, Config};
use crate::coordinator::{self, EVENT_ERROR, EVENT_START, EVENT_STOP};
use crate::env::{EnvProvider, EnvSnapshot, SystemEnv};
use crate::error::{BoxError, RuntimeError};
use crate::event::{EventBus, ListenerGuard};
use crate::logger::Logger;
use crate::pack::{Pack, PackConstructor};
use crate::paths;
use crate::registry::{ApiResources, Registries, Registry};
use crate::translate::{NoopTranslator, TranslateFn, Translator};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// Opaque package metadata describing the application being assembled.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PackageMeta {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Construction input for [`Runtime::build`].
///
/// `pkg`, `api`, and `logger` are required; their absence fails with the
/// corresponding [`RuntimeError`] identity before any pack is instantiated.
/// Pack constructors run synchronously, in declaration order.
pub struct AppOptions {
    pub pkg: Option<PackageMeta>,
    pub api: Option<ApiResources>,
    pub config: Value,
    pub logger: Option<Arc<dyn Logger>>,
    pub translator: Option<Arc<dyn Translator>>,
    pub packs: Vec<PackConstructor>,
    pub env: Arc<dyn EnvProvider>,
}

impl AppOptions {
    pub fn new(config: Value) -> Self {
        Self {
            pkg: None,
            api: None,
            config,
            logger: None,
            translator: None,
            packs: Vec::new(),
            env: Arc::new(SystemEnv),
        }
    }
}

/// The application runtime context.
pub struct Runtime {
    pkg: PackageMeta,
    env: EnvSnapshot,
    config: Config,
    registries: Registries,
    bus: EventBus,
    logger: Arc<dyn Logger>,
    translator: Arc<dyn Translator>,
    translate: Mutex<Option<TranslateFn>>,
    packs: Mutex<Vec<Arc<dyn Pack>>>,
    timers: Mutex<HashMap<String, JoinHandle<()>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    bound: AtomicBool,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("pkg", &self.pkg)
            .field("bound", &self.bound)
            .field("started", &self.started)
            .field("stopped", &self.stopped)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    /// Assembles a runtime: validation, environment snapshot, config merge,
    /// default paths, registry binding, then ordered pack instantiation.
    ///
    /// Fails atomically: if any pack constructor fails, no runtime is
    /// observable by the caller.
    pub fn build(options: AppOptions) -> Result<Arc<Self>, RuntimeError> {
        let AppOptions {
            pkg,
            api,
            config: raw_config,
            logger,
            translator,
            packs,
            env,
        } = options;

        let pkg = pkg.ok_or(RuntimeError::PackageNotDefined)?;
        let api = api.ok_or(RuntimeError::ApiNotDefined)?;
        let logger = logger.ok_or(RuntimeError::LoggerNotDefined)?;
        config::validate_config(&raw_config)?;

        let snapshot = EnvSnapshot::capture(env.as_ref());
        let merged = config::build_config(&raw_config, &snapshot);
        let max_listeners = merged
            .pointer("/main/maxListeners")
            .and_then(Value::as_u64)
            .map(|n| n as usize)
            .unwrap_or(crate::event::DEFAULT_MAX_LISTENERS);

        let config = Config::new(merged);
        paths::create_default_paths(&config)?;

        let registries = Registries::bind(&api);
        let bus = EventBus::new();
        bus.set_max_listeners(max_listeners);

        let runtime = Arc::new(Self {
            pkg,
            env: snapshot,
            config,
            registries,
            bus,
            logger,
            translator: translator.unwrap_or_else(|| Arc::new(NoopTranslator)),
            translate: Mutex::new(None),
            packs: Mutex::new(Vec::new()),
            timers: Mutex::new(HashMap::new()),
            tasks: Mutex::new(Vec::new()),
            bound: AtomicBool::new(true),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        });
        runtime.logger.debug(&format!(
            "assembled runtime for {} v{} ({} mode)",
            runtime.pkg.name,
            runtime.pkg.version,
            runtime.env.run_mode()
        ));

        // Construction order is significant: later packs may assume earlier
        // ones already mutated the context.
        for (index, constructor) in packs.into_iter().enumerate() {
            let pack = constructor(&runtime).map_err(|source| RuntimeError::PackConstruction {
                name: format!("pack at index {index}"),
                source,
            })?;
            runtime
                .logger
                .debug(&format!("loaded pack '{}'", pack.name()));
            runtime.packs.lock().unwrap().push(pack);
        }

        Ok(runtime)
    }

    /// Wires the phase coordinator, initializes the translation
    /// collaborator, emits `trails:start`, and resolves with the context
    /// once `trails:ready` fires.
    ///
    /// Calling `start()` while already started is undefined behavior to
    /// avoid; after a completed `stop()`, a subsequent `start()` re-wires
    /// everything from a clean slate.
    pub async fn start(self: &Arc<Self>) -> Result<Arc<Self>, RuntimeError> {
        self.stopped.store(false, Ordering::SeqCst);

        // Cycle detection and all listener registration happen here, before
        // any emission.
        let wired = coordinator::wire(self)?;
        self.tasks.lock().unwrap().extend(wired.tasks);

        let failure: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&failure);
        // Guarded so the listener is unbound on every exit, including a
        // caller dropping a still-pending start().
        let failure_id = self.bus.on(EVENT_ERROR, move |args| {
            let mut slot = slot.lock().unwrap();
            // first error wins
            if slot.is_none() {
                *slot = Some(
                    args.first()
                        .and_then(Value::as_str)
                        .unwrap_or("unknown lifecycle failure")
                        .to_string(),
                );
            }
        });
        let _failure_guard = ListenerGuard::new(self.bus.clone(), EVENT_ERROR, failure_id);
        let outcome = self
            .bus
            .once_any(&[coordinator::EVENT_READY, EVENT_ERROR]);

        let translate = match self.translator.init(&self.config).await {
            Ok(translate) => translate,
            Err(source) => {
                self.drain_wiring().await;
                return Err(RuntimeError::TranslatorInit(source));
            }
        };
        *self.translate.lock().unwrap() = Some(translate);

        self.logger.debug("lifecycle: emitting trails:start");
        self.bus.emit(EVENT_START, vec![]);
        outcome.await?;

        if let Some(msg) = failure.lock().unwrap().take() {
            return Err(RuntimeError::Lifecycle(msg));
        }
        self.started.store(true, Ordering::SeqCst);
        self.logger.debug("lifecycle: ready");
        Ok(Arc::clone(self))
    }

    /// Shuts the runtime down: emits `trails:stop`, unbinds everything the
    /// coordinator wired, clears timers, then unloads every pack
    /// concurrently, awaiting all unloads before resolving.
    ///
    /// When multiple unloads fail, the first failure (in load order) is
    /// reported; the remaining unloads still run to completion.
    pub async fn stop(self: &Arc<Self>, err: Option<BoxError>) -> Result<Arc<Self>, RuntimeError> {
        self.stopped.store(true, Ordering::SeqCst);
        if let Some(e) = &err {
            self.logger.error(&format!("fatal error during shutdown: {e}"));
        }
        if !self.started.load(Ordering::SeqCst) {
            self.logger
                .error("abnormal termination: runtime never reached ready");
        }

        self.logger.debug("lifecycle: emitting trails:stop");
        self.bus.emit(EVENT_STOP, vec![]);
        self.drain_wiring().await;
        self.clear_timers();

        let packs = self.loaded_packs();
        let mut unloads = Vec::with_capacity(packs.len());
        for pack in packs {
            let ctx = Arc::clone(self);
            unloads.push(tokio::spawn(async move {
                let name = pack.name().to_string();
                pack.unload(&ctx).await.map_err(|source| (name, source))
            }));
        }

        let mut first_failure = None;
        for handle in unloads {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err((name, source))) => {
                    self.logger
                        .error(&format!("pack '{name}' failed to unload: {source}"));
                    if first_failure.is_none() {
                        first_failure = Some(RuntimeError::PackUnload { name, source });
                    }
                }
                Err(join) => {
                    if first_failure.is_none() {
                        first_failure =
                            Some(RuntimeError::Lifecycle(format!("unload task failed: {join}")));
                    }
                }
            }
        }

        match first_failure {
            Some(e) => Err(e),
            None => {
                self.logger.debug("lifecycle: stopped");
                Ok(Arc::clone(self))
            }
        }
    }

    /// Removes everything the coordinator wired so a restart begins from a
    /// clean slate: pending driver and aggregate tasks are aborted and
    /// awaited, which drops the barriers they held and unregisters every
    /// lifecycle listener those barriers had on the bus.
    async fn drain_wiring(&self) {
        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().unwrap().drain(..).collect();
        for task in &tasks {
            task.abort();
        }
        for task in tasks {
            let _ = task.await;
        }
    }

    // --- shared state exposed to packs ---

    pub fn pkg(&self) -> &PackageMeta {
        &self.pkg
    }

    /// Frozen environment snapshot taken at construction.
    pub fn env(&self) -> &EnvSnapshot {
        &self.env
    }

    /// The configuration tree; mutable through the `configured` phase,
    /// sealed afterwards.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn logger(&self) -> &dyn Logger {
        self.logger.as_ref()
    }

    pub fn models(&self) -> &Registry {
        &self.registries.models
    }

    pub fn services(&self) -> &Registry {
        &self.registries.services
    }

    pub fn controllers(&self) -> &Registry {
        &self.registries.controllers
    }

    pub fn policies(&self) -> &Registry {
        &self.registries.policies
    }

    /// The instantiated packs, in construction order.
    pub fn loaded_packs(&self) -> Vec<Arc<dyn Pack>> {
        self.packs.lock().unwrap().clone()
    }

    pub fn pack(&self, name: &str) -> Option<Arc<dyn Pack>> {
        self.packs
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.name() == name)
            .cloned()
    }

    /// Translates `key` through the published translation function, falling
    /// back to the key itself before `start()` has published one.
    pub fn translate(&self, key: &str) -> String {
        match &*self.translate.lock().unwrap() {
            Some(translate) => translate(key),
            None => key.to_string(),
        }
    }

    /// Registers a named background timer task, owned by the runtime and
    /// aborted on `stop()`. Replacing a timer aborts the previous one.
    pub fn register_timer(&self, name: &str, handle: JoinHandle<()>) {
        if let Some(previous) = self.timers.lock().unwrap().insert(name.to_string(), handle) {
            previous.abort();
        }
    }

    pub fn clear_timers(&self) {
        for (_, handle) in self.timers.lock().unwrap().drain() {
            handle.abort();
        }
    }

    /// Listener budget applied from `main.maxListeners`.
    pub fn max_listeners(&self) -> usize {
        self.bus.max_listeners()
    }

    pub fn bound(&self) -> bool {
        self.bound.load(Ordering::SeqCst)
    }

    pub fn started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}
