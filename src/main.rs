//! Vireo - headless loader driver
//!
//! Loads scene assets on the background loader and splices them into a live
//! scene, driving the render loop without a window.
//!
//! Usage:
//!   cargo run -- [--config runtime.json] [--root assets] chair.model table.model

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use vireo::core::{logging, Error, RuntimeConfig};
use vireo::loader::{DirectoryReader, FileReader, ModelLoader, PlatformBinding, ReaderBinding};
use vireo::render::RenderContext;
use vireo::resource::{Context, DeviceHandle, ManualDevice};
use vireo::scene::{NodeContent, SceneNodeId};

/// Frames to run before giving up on outstanding loads.
const MAX_FRAMES: u32 = 10_000;

fn main() -> Result<(), Error> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from);
    let root_override = args
        .iter()
        .position(|a| a == "--root")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from);

    let mut assets = Vec::new();
    let mut skip_next = false;
    for arg in &args {
        if skip_next {
            skip_next = false;
        } else if arg == "--config" || arg == "--root" {
            skip_next = true;
        } else {
            assets.push(arg.clone());
        }
    }

    let mut config = match &config_path {
        Some(path) => RuntimeConfig::load_sync(path)?,
        None => RuntimeConfig::default(),
    };
    if let Some(root) = root_override {
        config.loader.asset_root = root;
    }

    logging::init_with_filter(&config.log_filter);
    log::info!("Vireo v{}", env!("CARGO_PKG_VERSION"));

    if assets.is_empty() {
        log::warn!("No assets given; usage: vireo [--config FILE] [--root DIR] ASSET...");
        return Ok(());
    }

    let reader: Arc<dyn FileReader> = Arc::new(DirectoryReader::new(&config.loader.asset_root));
    let context = Context::builder().file_reader(reader.clone()).build();
    let mut render = RenderContext::new(context);

    let device = ManualDevice::new();
    if let Some(handle) = DeviceHandle::new(1) {
        device.make_current(handle);
    }
    render.attach_to_device(&device);

    let mut loader = ModelLoader::new(config.loader.clone());
    let binding: Arc<dyn PlatformBinding> = Arc::new(ReaderBinding::new(reader));
    loader.start(&mut render, binding)?;

    let finished = Arc::new(AtomicUsize::new(0));
    let root = render.scene().root();
    for asset in &assets {
        let Some(group) = render
            .scene_mut()
            .add_child(root, asset.as_str(), NodeContent::Group)
        else {
            continue;
        };

        let finished = finished.clone();
        let name = asset.clone();
        loader.handle().load_with(asset.as_str(), group, move |scene, target: SceneNodeId| {
            let children = scene.children(target).count();
            log::info!("Loaded {name}: {children} top-level nodes");
            finished.fetch_add(1, Ordering::SeqCst);
        });
    }

    let barrier = render.synchronizer();
    let mut frames = 0;
    while finished.load(Ordering::SeqCst) < assets.len() && frames < MAX_FRAMES {
        render.update();
        barrier.wait_for_request(Duration::from_millis(1));
        frames += 1;
    }
    // Activate geometry registered by the last loads.
    render.update();

    log::info!(
        "{} of {} loads finished after {frames} frames; {} nodes, {} active resources",
        finished.load(Ordering::SeqCst),
        assets.len(),
        render.scene().node_count(),
        render.context().active_count()
    );

    loader.stop(&mut render);
    render.detach_from_device(&device);
    Ok(())
}
