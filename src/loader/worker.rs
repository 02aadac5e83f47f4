//! Background model loader.
//!
//! A dedicated thread drains a queue of load requests. Each request is parsed
//! into a fresh detached [`Subgraph`], handed to the render thread through a
//! channel, and spliced into the live scene during the next barrier pass. The
//! worker blocks in [`SyncBarrier::request_synchronize`] until that pass has
//! run, so requests complete strictly in submission order.
//!
//! Resources a load registered but the scene never took (a failed parse, a
//! target removed in the meantime) are destroyed during that same pass, on the
//! render thread.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::config::LoaderConfig;
use super::parser::{AssetParser, JsonSceneParser, SubgraphBuilder};
use super::platform::{FileReader, PlatformBinding};
use crate::core::Error;
use crate::render::RenderContext;
use crate::resource::{Registrar, ResourceHandle};
use crate::scene::{SceneGraph, SceneNodeId, Subgraph};
use crate::sync::{lock, SyncBarrier, SyncObserver};

/// Invoked on the render thread once a load has been spliced into its target.
pub type LoadCallback = Box<dyn FnOnce(&mut SceneGraph, SceneNodeId) + Send>;

/// Builds the parser used by the worker thread. Called once per start, on the
/// worker thread.
pub type ParserFactory = Arc<dyn Fn() -> Box<dyn AssetParser> + Send + Sync>;

/// Lifecycle of a [`ModelLoader`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoaderState {
    Stopped,
    Starting,
    Running,
    Draining,
}

struct LoadRequest {
    asset: String,
    target: SceneNodeId,
    callback: Option<LoadCallback>,
}

#[derive(Default)]
struct QueueState {
    requests: Vec<LoadRequest>,
    shutdown: bool,
    accepting: bool,
}

#[derive(Default)]
struct Shared {
    queue: Mutex<QueueState>,
    wake: Condvar,
}

/// Cloneable handle for enqueueing loads from any thread.
#[derive(Clone)]
pub struct LoaderHandle {
    shared: Arc<Shared>,
}

impl LoaderHandle {
    /// Queue `asset` to be loaded under `target`.
    ///
    /// Never blocks. Returns `false` (and logs) when the loader is not
    /// running, in which case the request and its callback are dropped.
    pub fn load_asset(
        &self,
        asset: impl Into<String>,
        target: SceneNodeId,
        callback: Option<LoadCallback>,
    ) -> bool {
        let asset = asset.into();
        let mut queue = lock(&self.shared.queue);
        if !queue.accepting {
            log::warn!("Model loader is not running; dropping load of {asset}");
            return false;
        }

        log::debug!("Queueing load of {asset} into {target:?}");
        queue.requests.push(LoadRequest {
            asset,
            target,
            callback,
        });
        self.shared.wake.notify_one();
        true
    }

    /// [`load_asset`](Self::load_asset) with a callback.
    pub fn load_with(
        &self,
        asset: impl Into<String>,
        target: SceneNodeId,
        callback: impl FnOnce(&mut SceneGraph, SceneNodeId) + Send + 'static,
    ) -> bool {
        self.load_asset(asset, target, Some(Box::new(callback)))
    }

    /// Requests waiting for the worker to pick them up.
    pub fn queued(&self) -> usize {
        lock(&self.shared.queue).requests.len()
    }

    /// Whether new requests are currently accepted.
    pub fn is_running(&self) -> bool {
        lock(&self.shared.queue).accepting
    }
}

/// One finished load waiting to be spliced on the render thread.
struct SpliceJob {
    asset: String,
    subgraph: Subgraph,
    /// Resources registered by a load that failed part way
    orphaned: Vec<ResourceHandle>,
    target: SceneNodeId,
    callback: Option<LoadCallback>,
}

impl SpliceJob {
    fn apply(self, render: &mut RenderContext) {
        if !self.orphaned.is_empty() {
            let destroyed = render.destroy_resources(self.orphaned);
            log::debug!(
                "Destroyed {destroyed} resources left by failed load of {}",
                self.asset
            );
        }

        match render.scene_mut().graft(self.target, self.subgraph) {
            Ok(nodes) => {
                log::debug!(
                    "Spliced {} nodes from {} into {:?}",
                    nodes.len(),
                    self.asset,
                    self.target
                );
                if let Some(callback) = self.callback {
                    callback(render.scene_mut(), self.target);
                }
            }
            Err(subgraph) => {
                log::warn!(
                    "Load target {:?} for {} no longer exists; discarding",
                    self.target,
                    self.asset
                );
                render.destroy_resources(subgraph.resources());
            }
        }
    }
}

/// Barrier observer that splices every job the worker has sent.
struct SpliceObserver {
    jobs: Mutex<Receiver<SpliceJob>>,
}

impl SyncObserver<RenderContext> for SpliceObserver {
    fn contexts_synchronized(&self, render: &mut RenderContext) {
        let jobs = lock(&self.jobs);
        while let Ok(job) = jobs.try_recv() {
            job.apply(render);
        }
    }
}

/// Everything the worker thread owns.
struct Worker {
    shared: Arc<Shared>,
    binding: Arc<dyn PlatformBinding>,
    registrar: Registrar,
    barrier: Arc<SyncBarrier<RenderContext>>,
    parser_factory: ParserFactory,
}

impl Worker {
    fn run(self) {
        let reader = match self.binding.attach_worker() {
            Ok(reader) => reader,
            Err(e) => {
                log::error!("Model loader could not bind its thread: {e}");
                let mut queue = lock(&self.shared.queue);
                queue.accepting = false;
                queue.requests.clear();
                return;
            }
        };

        let (sender, receiver) = mpsc::channel();
        let observer: Arc<dyn SyncObserver<RenderContext>> = Arc::new(SpliceObserver {
            jobs: Mutex::new(receiver),
        });
        self.barrier.register_observer(observer.clone());

        let mut parser = (self.parser_factory)();
        while let Some(batch) = self.next_batch() {
            for request in batch {
                self.load(request, parser.as_mut(), reader.as_ref(), &sender);
            }
        }

        self.barrier.release_observer(&observer);
        self.binding.detach_worker();
        log::info!("Model loader thread stopping");
    }

    /// Block until there is work or shutdown. Returns `None` on shutdown,
    /// dropping anything still queued.
    fn next_batch(&self) -> Option<Vec<LoadRequest>> {
        let mut queue = lock(&self.shared.queue);
        while queue.requests.is_empty() && !queue.shutdown {
            queue = self
                .shared
                .wake
                .wait(queue)
                .unwrap_or_else(PoisonError::into_inner);
        }

        if queue.shutdown {
            if !queue.requests.is_empty() {
                log::warn!(
                    "Model loader shutting down; dropping {} queued loads",
                    queue.requests.len()
                );
                queue.requests.clear();
            }
            return None;
        }
        Some(std::mem::take(&mut queue.requests))
    }

    fn load(
        &self,
        request: LoadRequest,
        parser: &mut dyn AssetParser,
        reader: &dyn FileReader,
        sender: &Sender<SpliceJob>,
    ) {
        let mut subgraph = Subgraph::new();
        let result = {
            let mut factory = SubgraphBuilder::new(&mut subgraph, &self.registrar);
            parser.parse(&request.asset, reader, &mut factory)
        };

        // Whatever the parser registered before failing is handed to the
        // render thread to destroy; the splice itself grafts nothing.
        let mut orphaned = Vec::new();
        if let Err(e) = result {
            log::error!("Failed to load {}: {e}", request.asset);
            orphaned = subgraph.resources();
            subgraph.clear();
        }

        let job = SpliceJob {
            asset: request.asset,
            subgraph,
            orphaned,
            target: request.target,
            callback: request.callback,
        };
        if sender.send(job).is_err() {
            log::error!("Splice channel closed; load result lost");
            return;
        }
        self.barrier.request_synchronize();
    }
}

/// Owns the loader thread. Lives on the render thread.
pub struct ModelLoader {
    config: LoaderConfig,
    shared: Arc<Shared>,
    parser_factory: ParserFactory,
    state: LoaderState,
    worker: Option<JoinHandle<()>>,
    binding: Option<Arc<dyn PlatformBinding>>,
}

impl ModelLoader {
    /// Loader using [`JsonSceneParser`].
    pub fn new(config: LoaderConfig) -> Self {
        Self::with_parser(config, || -> Box<dyn AssetParser> {
            Box::new(JsonSceneParser::new())
        })
    }

    pub fn with_parser(
        config: LoaderConfig,
        parser_factory: impl Fn() -> Box<dyn AssetParser> + Send + Sync + 'static,
    ) -> Self {
        Self {
            config,
            shared: Arc::new(Shared::default()),
            parser_factory: Arc::new(parser_factory),
            state: LoaderState::Stopped,
            worker: None,
            binding: None,
        }
    }

    pub fn handle(&self) -> LoaderHandle {
        LoaderHandle {
            shared: self.shared.clone(),
        }
    }

    /// Current lifecycle state. A worker that has already exited (for example
    /// because its platform binding failed) reports `Stopped` even before
    /// [`stop`](Self::stop) reclaims it.
    pub fn state(&self) -> LoaderState {
        let exited = self.worker.as_ref().is_some_and(|w| w.is_finished());
        if self.state == LoaderState::Running && exited {
            return LoaderState::Stopped;
        }
        self.state
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// See [`LoaderHandle::load_asset`].
    pub fn load_asset(
        &self,
        asset: impl Into<String>,
        target: SceneNodeId,
        callback: Option<LoadCallback>,
    ) -> bool {
        self.handle().load_asset(asset, target, callback)
    }

    /// Spawn the worker thread. A running loader is stopped first.
    ///
    /// `binding` is retained until the worker has been joined.
    pub fn start(
        &mut self,
        render: &mut RenderContext,
        binding: Arc<dyn PlatformBinding>,
    ) -> Result<(), Error> {
        if self.state != LoaderState::Stopped {
            log::info!("Model loader already running; restarting");
            self.stop(render);
        }

        self.state = LoaderState::Starting;
        {
            let mut queue = lock(&self.shared.queue);
            queue.shutdown = false;
            queue.accepting = true;
        }

        let worker = Worker {
            shared: self.shared.clone(),
            binding: binding.clone(),
            registrar: render.registrar(),
            barrier: render.synchronizer(),
            parser_factory: self.parser_factory.clone(),
        };

        let spawned = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || worker.run());

        match spawned {
            Ok(handle) => {
                self.worker = Some(handle);
                self.binding = Some(binding);
                self.state = LoaderState::Running;
                log::info!("Model loader thread '{}' started", self.config.thread_name);
                Ok(())
            }
            Err(e) => {
                lock(&self.shared.queue).accepting = false;
                self.state = LoaderState::Stopped;
                Err(Error::Thread(format!(
                    "failed to spawn '{}': {e}",
                    self.config.thread_name
                )))
            }
        }
    }

    /// Shut the worker down and join it.
    ///
    /// Pumps one render update, then keeps servicing the barrier on the
    /// calling thread until the worker exits, so a worker blocked waiting for
    /// a splice can always finish. Must be called on the render thread.
    pub fn stop(&mut self, render: &mut RenderContext) {
        if self.state == LoaderState::Stopped {
            return;
        }
        self.state = LoaderState::Draining;

        render.update();
        {
            let mut queue = lock(&self.shared.queue);
            queue.shutdown = true;
            queue.accepting = false;
        }
        self.shared.wake.notify_all();

        if let Some(worker) = self.worker.take() {
            log::info!("Waiting for model loader thread to stop");
            let barrier = render.synchronizer();
            let poll = Duration::from_millis(self.config.shutdown_poll_ms.max(1));
            while !worker.is_finished() {
                if !render.service_synchronize() {
                    barrier.wait_for_request(poll);
                }
            }

            match worker.join() {
                Ok(()) => {
                    log::info!("Model loader thread stopped");
                    if let Some(binding) = self.binding.take() {
                        binding.release();
                    }
                }
                Err(_) => {
                    log::error!("Model loader thread failed to stop cleanly; leaking its platform binding");
                    if let Some(binding) = self.binding.take() {
                        std::mem::forget(binding);
                    }
                }
            }
        }

        lock(&self.shared.queue).requests.clear();
        self.state = LoaderState::Stopped;
    }
}

impl Drop for ModelLoader {
    fn drop(&mut self) {
        if self.worker.is_some() {
            log::warn!("Model loader dropped while running; signalling shutdown without joining");
            let mut queue = lock(&self.shared.queue);
            queue.shutdown = true;
            queue.accepting = false;
            self.shared.wake.notify_all();
        }
    }
}
