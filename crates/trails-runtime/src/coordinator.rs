//! # Phase Coordinator
//!
//! Binds each pack's lifecycle phases onto the event bus so that,
//! collectively, the runtime reaches `trails:ready`.
//!
//! # Architecture Note
//! Wiring happens entirely before `trails:start` is emitted: every barrier a
//! driver will wait on is registered up front, so no milestone can fire
//! before its listeners exist. The dependency graph is checked by explicit
//! topological sort at wiring time — a cycle is a fatal configuration error
//! reported immediately, never a deadlock discovered at runtime.
//!
//! Per pack and phase the milestone `pack:{name}:{phase}` is emitted exactly
//! once. Per-phase aggregates (`pack:all:{phase}`) gate the next phase
//! globally; the configuration is sealed inside the `configured` aggregate,
//! so no pack initializes against an unsealed tree.

use crate::barrier::EventSet;
use crate::error::RuntimeError;
use crate::pack::{Pack, Phase};
use crate::runtime::Runtime;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Root signal that wiring is complete and initialization may proceed.
pub const EVENT_START: &str = "trails:start";
/// All packs reached their terminal phase.
pub const EVENT_READY: &str = "trails:ready";
/// Root shutdown signal.
pub const EVENT_STOP: &str = "trails:stop";
/// A pack lifecycle hook failed; payload carries the diagnostic.
pub const EVENT_ERROR: &str = "trails:error";

/// Milestone event name for one pack completing one phase.
pub fn milestone(pack: &str, phase: Phase) -> String {
    format!("pack:{}:{}", pack, phase.as_str())
}

/// Aggregate event name for every pack having completed one phase.
pub fn aggregate(phase: Phase) -> String {
    format!("pack:all:{}", phase.as_str())
}

/// Handles for everything the wiring spawned; aborted by `stop()` so a
/// restart re-wires from a clean slate.
pub struct Wired {
    pub tasks: Vec<JoinHandle<()>>,
}

/// Validates the dependency graph and wires drivers and aggregates.
///
/// Fails with [`RuntimeError::UnknownDependency`] or
/// [`RuntimeError::DependencyCycle`] before anything is spawned or emitted.
pub fn wire(runtime: &Arc<Runtime>) -> Result<Wired, RuntimeError> {
    let packs = runtime.loaded_packs();
    check_dependency_graph(&packs)?;

    let bus = runtime.bus().clone();
    let mut tasks = Vec::with_capacity(packs.len() + Phase::ALL.len() + 1);

    for pack in &packs {
        let deps = pack.dependencies();
        // Registered before trails:start so no emission can be missed.
        let start_gate = bus.once_any(&[EVENT_START]);
        let gates: Vec<_> = Phase::ALL
            .into_iter()
            .map(|phase| {
                let mut sets: Vec<EventSet> = Vec::new();
                match phase {
                    Phase::Validated => {}
                    Phase::Configured => sets.push(EventSet::one(aggregate(Phase::Validated))),
                    Phase::Initialized => sets.push(EventSet::one(aggregate(Phase::Configured))),
                }
                for dep in &deps {
                    sets.push(EventSet::one(milestone(dep, phase)));
                }
                (phase, bus.after(sets))
            })
            .collect();

        let pack = Arc::clone(pack);
        let ctx = Arc::clone(runtime);
        let bus = bus.clone();
        tasks.push(tokio::spawn(async move {
            if start_gate.await.is_err() {
                return;
            }
            for (phase, gate) in gates {
                if gate.await.is_err() {
                    return;
                }
                if let Err(e) = run_phase(&pack, &ctx, phase).await {
                    let msg = format!(
                        "pack '{}' failed during {}: {e}",
                        pack.name(),
                        phase.as_str()
                    );
                    ctx.logger().error(&msg);
                    bus.emit(EVENT_ERROR, vec![Value::String(msg)]);
                    return;
                }
                bus.emit(&milestone(pack.name(), phase), vec![]);
            }
        }));
    }

    for phase in Phase::ALL {
        let mut sets = vec![EventSet::one(EVENT_START)];
        for pack in &packs {
            sets.push(EventSet::one(milestone(pack.name(), phase)));
        }
        let barrier = bus.after(sets);
        let weak = Arc::downgrade(runtime);
        let bus = bus.clone();
        tasks.push(tokio::spawn(async move {
            if barrier.await.is_err() {
                return;
            }
            if phase == Phase::Configured {
                // Every pack reported configured; the tree is now immutable.
                if let Some(rt) = weak.upgrade() {
                    rt.config().seal();
                    rt.logger().debug("configuration sealed");
                }
            }
            bus.emit(&aggregate(phase), vec![]);
        }));
    }

    let ready_gate = bus.after(vec![EventSet::one(aggregate(Phase::Initialized))]);
    let ready_bus = bus.clone();
    tasks.push(tokio::spawn(async move {
        if ready_gate.await.is_ok() {
            ready_bus.emit(EVENT_READY, vec![]);
        }
    }));

    Ok(Wired { tasks })
}

async fn run_phase(
    pack: &Arc<dyn Pack>,
    ctx: &Runtime,
    phase: Phase,
) -> Result<(), crate::error::BoxError> {
    match phase {
        Phase::Validated => pack.validate(ctx).await,
        Phase::Configured => pack.configure(ctx).await,
        Phase::Initialized => pack.initialize(ctx).await,
    }
}

/// Kahn topological sort over the declared dependency graph. Leftover nodes
/// after the sort are exactly the packs locked in a cycle.
fn check_dependency_graph(packs: &[Arc<dyn Pack>]) -> Result<(), RuntimeError> {
    let declared: Vec<(String, Vec<String>)> = packs
        .iter()
        .map(|p| (p.name().to_string(), p.dependencies()))
        .collect();

    let mut indegree: HashMap<&str, usize> = declared.iter().map(|(n, _)| (n.as_str(), 0)).collect();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    for (name, deps) in &declared {
        for dep in deps {
            if !indegree.contains_key(dep.as_str()) {
                return Err(RuntimeError::UnknownDependency {
                    pack: name.clone(),
                    dependency: dep.clone(),
                });
            }
            *indegree.get_mut(name.as_str()).unwrap() += 1;
            dependents.entry(dep.as_str()).or_default().push(name.as_str());
        }
    }

    let mut queue: VecDeque<&str> = indegree
        .iter()
        .filter(|(_, deg)| **deg == 0)
        .map(|(name, _)| *name)
        .collect();
    let mut resolved = 0usize;
    while let Some(name) = queue.pop_front() {
        resolved += 1;
        if let Some(next) = dependents.get(name) {
            for dependent in next {
                let deg = indegree.get_mut(dependent).unwrap();
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(dependent);
                }
            }
        }
    }

    if resolved < declared.len() {
        let mut cycle: Vec<String> = indegree
            .into_iter()
            .filter(|(_, deg)| *deg > 0)
            .map(|(name, _)| name.to_string())
            .collect();
        cycle.sort();
        return Err(RuntimeError::DependencyCycle(cycle));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use async_trait::async_trait;

    struct Stub {
        name: &'static str,
        deps: Vec<String>,
    }

    #[async_trait]
    impl Pack for Stub {
        fn name(&self) -> &str {
            self.name
        }
        fn dependencies(&self) -> Vec<String> {
            self.deps.clone()
        }
        async fn validate(&self, _ctx: &Runtime) -> Result<(), BoxError> {
            Ok(())
        }
    }

    fn stub(name: &'static str, deps: &[&str]) -> Arc<dyn Pack> {
        Arc::new(Stub {
            name,
            deps: deps.iter().map(|d| d.to_string()).collect(),
        })
    }

    #[test]
    fn acyclic_graph_is_accepted() {
        let packs = vec![stub("a", &[]), stub("b", &["a"]), stub("c", &["a", "b"])];
        assert!(check_dependency_graph(&packs).is_ok());
    }

    #[test]
    fn cycle_is_reported_with_its_members() {
        let packs = vec![stub("a", &["c"]), stub("b", &[]), stub("c", &["a"])];
        let err = check_dependency_graph(&packs).unwrap_err();
        match err {
            RuntimeError::DependencyCycle(members) => {
                assert_eq!(members, vec!["a".to_string(), "c".to_string()]);
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let packs = vec![stub("a", &["ghost"])];
        let err = check_dependency_graph(&packs).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::UnknownDependency { ref pack, ref dependency }
                if pack == "a" && dependency == "ghost"
        ));
    }
}
