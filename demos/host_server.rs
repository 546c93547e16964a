//! A stand-in host application
//!
//! Keeps a small in-memory scene and serves it over hostlink, stepping the
//! server from a simulated host timer. Extended commands are off until a
//! client sends `set_extended`.
//!
//! ```text
//! HOSTLINK_PORT=9876 RUST_LOG=debug cargo run --example host_server
//! ```

use hostlink::core::ObservabilityConfig;
use hostlink::server::{from_fn, from_typed_fn, CommandSpec, HostContext};
use hostlink::{BridgeConfig, PollingServer, StepOutcome};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Object {
    name: String,
    #[serde(default)]
    location: [f64; 3],
}

#[derive(Default)]
struct Scene {
    objects: BTreeMap<String, Object>,
}

/// Logs entering and leaving editor modes the way a real host would switch them
struct EditorModes;

impl HostContext for EditorModes {
    fn enter(&self, name: &str) -> anyhow::Result<()> {
        tracing::debug!(mode = name, "Entering editor mode");
        Ok(())
    }

    fn leave(&self, name: &str) {
        tracing::debug!(mode = name, "Leaving editor mode");
    }
}

#[derive(Deserialize)]
struct NameParams {
    name: String,
}

#[derive(Deserialize)]
struct ToggleParams {
    enabled: bool,
}

fn main() -> anyhow::Result<()> {
    let config = BridgeConfig::from_env()?;
    hostlink::core::init_observability(
        ObservabilityConfig::new("host-server")
            .with_traces(false)
            .with_metrics(false),
    )
    .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let scene = Rc::new(RefCell::new(Scene::default()));
    let extended = Rc::new(Cell::new(false));

    let info_scene = Rc::clone(&scene);
    let create_scene = Rc::clone(&scene);
    let delete_scene = Rc::clone(&scene);
    let search_scene = Rc::clone(&scene);
    let toggle = Rc::clone(&extended);
    let flag = Rc::clone(&extended);

    let mut server = PollingServer::builder()
        .config(config)
        .handler(
            "get_scene_info",
            from_fn(move |_| {
                let scene = info_scene.borrow();
                Ok(json!({
                    "object_count": scene.objects.len(),
                    "objects": scene.objects.values().collect::<Vec<_>>(),
                }))
            }),
        )
        .handler(
            "create_object",
            from_typed_fn(move |object: Object| {
                let mut scene = create_scene.borrow_mut();
                anyhow::ensure!(
                    !scene.objects.contains_key(&object.name),
                    "Object already exists: {}",
                    object.name
                );
                scene.objects.insert(object.name.clone(), object.clone());
                Ok(object)
            }),
        )
        .command(
            "delete_object",
            CommandSpec::core().with_context("object_mode"),
            from_typed_fn(move |p: NameParams| {
                let removed = delete_scene.borrow_mut().objects.remove(&p.name);
                removed
                    .map(|object| json!({"deleted": object.name}))
                    .ok_or_else(|| anyhow::anyhow!("Object not found: {}", p.name))
            }),
        )
        .handler(
            "set_extended",
            from_typed_fn(move |p: ToggleParams| {
                toggle.set(p.enabled);
                Ok(json!({"enabled": p.enabled}))
            }),
        )
        .extended(
            "search_objects",
            from_fn(move |params| {
                let query = params.get("query").and_then(Value::as_str).unwrap_or("");
                let scene = search_scene.borrow();
                let names: Vec<&String> = scene
                    .objects
                    .keys()
                    .filter(|name| name.contains(query))
                    .collect();
                Ok(json!(names))
            }),
        )
        .capability(move || flag.get())
        .host_context(EditorModes)
        .with_metrics()
        .service_name("host-server")
        .build()?;

    tracing::info!(addr = %server.local_addr(), "Host ready; press Ctrl-C to quit");

    // The host's own timer: call step() and wait for the interval it returns.
    loop {
        match server.step() {
            StepOutcome::Reschedule(delay) => std::thread::sleep(delay),
            StepOutcome::Stop => break,
        }
    }

    hostlink::core::shutdown_observability();
    Ok(())
}
