//! listener-mux demo.
//!
//! Wires three pools onto one in-memory source, fires a few events and
//! prints the registry snapshot after each step. Set `RUST_LOG=debug` to
//! watch native listeners being attached and detached.

use std::rc::Rc;

use tracing_subscriber::EnvFilter;

use listener_mux::config::MuxConfig;
use listener_mux::domain::{EventType, Handler};
use listener_mux::service::DispatchMultiplexer;
use listener_mux::source::{MemorySource, Phase};

/// Pointer event fired by the demo source.
#[derive(Debug, Clone, Copy)]
struct Pointer {
    x: i32,
    y: i32,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = MuxConfig::from_env()?;
    tracing::info!(?config, "starting listener-mux demo");

    let source = Rc::new(MemorySource::<Pointer>::with_supported(["click", "mousemove"]));
    let mux = DispatchMultiplexer::with_config(Rc::clone(&source), config);

    let select = Handler::new(|p: &Pointer| tracing::info!(x = p.x, y = p.y, "toolbar: select"));
    let track = Handler::new(|p: &Pointer| tracing::info!(x = p.x, y = p.y, "analytics: track"));
    let hover = Handler::new(|p: &Pointer| tracing::info!(x = p.x, y = p.y, "tooltip: hover"));

    mux.add_handlers("toolbar", "click", vec![select.clone()], Phase::Bubble)?;
    mux.add_handlers("analytics", "click", vec![track.clone()], Phase::Capture)?;
    mux.add_handlers("analytics", "mousemove", vec![track.clone()], Phase::Bubble)?;
    mux.add_handlers("tooltip", "mousemove", vec![hover], Phase::Bubble)?;
    print_snapshot(&mux)?;

    if let Err(err) = mux.add_handlers("toolbar", "wheel", vec![select.clone()], Phase::Bubble) {
        tracing::warn!(code = err.error_code(), %err, "registration rejected");
    }

    let click = EventType::from("click");
    let mousemove = EventType::from("mousemove");
    source.fire(&click, &Pointer { x: 10, y: 20 });
    source.fire(&mousemove, &Pointer { x: 11, y: 21 });

    mux.remove_handlers("toolbar", "click", &[select], Phase::Bubble);
    mux.remove_handlers("analytics", "click", &[track.clone()], Phase::Capture);
    mux.remove_handlers("analytics", "mousemove", &[track], Phase::Bubble);
    print_snapshot(&mux)?;

    let delivered = source.fire(&click, &Pointer { x: 0, y: 0 });
    tracing::info!(delivered, "click after removal");

    mux.clear();
    tracing::info!(
        listeners = source.total_listeners(),
        add_calls = source.add_calls(),
        remove_calls = source.remove_calls(),
        "demo finished"
    );
    Ok(())
}

fn print_snapshot(mux: &DispatchMultiplexer<Pointer, Rc<MemorySource<Pointer>>>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&mux.snapshot())?;
    println!("{json}");
    Ok(())
}
