//! Rendezvous barrier serviced by the render thread.
//!
//! A requester (typically the model loader thread) calls
//! [`SyncBarrier::request_synchronize`] and blocks. The render thread calls
//! [`SyncBarrier::service_pending`] once per frame; if a request is pending it
//! runs every registered [`SyncObserver`] with mutable access to the
//! render-thread state, then releases the requester.
//!
//! Requests are ticketed: a requester is released by the first full
//! notification pass that *starts* after its request, so a pass already in
//! flight when the request arrives never counts for it.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use super::lock;

/// Receives a notification on the render thread each time the barrier is
/// serviced with a request pending.
///
/// Observers must tolerate being called when they have nothing to do: any
/// registered observer is notified on every pass, whoever requested it.
pub trait SyncObserver<T: ?Sized>: Send + Sync {
    fn contexts_synchronized(&self, target: &mut T);
}

#[derive(Default)]
struct BarrierState {
    /// Ticket of the most recent request
    requested: u64,
    /// Highest ticket released by a completed pass
    serviced: u64,
}

impl BarrierState {
    fn pending(&self) -> bool {
        self.serviced < self.requested
    }
}

/// Cross-thread synchronization point owned jointly by the render thread and
/// any number of requesters.
pub struct SyncBarrier<T: ?Sized> {
    observers: Mutex<Vec<Arc<dyn SyncObserver<T>>>>,
    state: Mutex<BarrierState>,
    signal: Condvar,
}

impl<T: ?Sized> Default for SyncBarrier<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> SyncBarrier<T> {
    pub fn new() -> Self {
        Self {
            observers: Mutex::new(Vec::new()),
            state: Mutex::new(BarrierState::default()),
            signal: Condvar::new(),
        }
    }

    /// Add an observer. Returns `false` if it was already registered.
    pub fn register_observer(&self, observer: Arc<dyn SyncObserver<T>>) -> bool {
        let mut observers = lock(&self.observers);
        if observers.iter().any(|o| Arc::ptr_eq(o, &observer)) {
            return false;
        }
        observers.push(observer);
        true
    }

    /// Remove an observer. Returns `false` if it was not registered.
    pub fn release_observer(&self, observer: &Arc<dyn SyncObserver<T>>) -> bool {
        let mut observers = lock(&self.observers);
        let before = observers.len();
        observers.retain(|o| !Arc::ptr_eq(o, observer));
        observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        lock(&self.observers).len()
    }

    /// Block the calling thread until the servicing thread has completed one
    /// full notification pass that started after this call.
    ///
    /// Must not be called from the servicing thread itself.
    pub fn request_synchronize(&self) {
        let mut state = lock(&self.state);
        state.requested += 1;
        let ticket = state.requested;
        self.signal.notify_all();

        while state.serviced < ticket {
            state = self
                .signal
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Whether a requester is waiting for a pass.
    pub fn is_pending(&self) -> bool {
        lock(&self.state).pending()
    }

    /// Run one notification pass if a request is pending, then release every
    /// requester whose ticket the pass covers. Returns whether a pass ran.
    ///
    /// Observers run in registration order on the calling thread.
    pub fn service_pending(&self, target: &mut T) -> bool {
        let ticket = {
            let state = lock(&self.state);
            if !state.pending() {
                return false;
            }
            state.requested
        };

        // Snapshot so observers may register or release observers themselves.
        let observers: Vec<_> = lock(&self.observers).clone();
        for observer in &observers {
            observer.contexts_synchronized(target);
        }

        {
            let mut state = lock(&self.state);
            state.serviced = state.serviced.max(ticket);
        }
        self.signal.notify_all();
        true
    }

    /// Block the servicing thread until a request is pending or `timeout`
    /// elapses. Returns whether a request is pending.
    pub fn wait_for_request(&self, timeout: Duration) -> bool {
        let state = lock(&self.state);
        let (state, _) = self
            .signal
            .wait_timeout_while(state, timeout, |s| !s.pending())
            .unwrap_or_else(PoisonError::into_inner);
        state.pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    struct Recorder {
        name: &'static str,
        calls: AtomicUsize,
    }

    impl Recorder {
        fn new(name: &'static str) -> Arc<Self> {
            Arc::new(Self {
                name,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl SyncObserver<Vec<String>> for Recorder {
        fn contexts_synchronized(&self, target: &mut Vec<String>) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            target.push(self.name.to_string());
        }
    }

    fn service_until_pass(barrier: &SyncBarrier<Vec<String>>, log: &mut Vec<String>) {
        loop {
            if barrier.service_pending(log) {
                return;
            }
            barrier.wait_for_request(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_service_without_request_is_noop() {
        let barrier: SyncBarrier<Vec<String>> = SyncBarrier::new();
        let recorder = Recorder::new("a");
        barrier.register_observer(recorder.clone());

        let mut log = Vec::new();
        assert!(!barrier.service_pending(&mut log));
        assert!(log.is_empty());
        assert_eq!(recorder.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_register_and_release_are_idempotent() {
        let barrier: SyncBarrier<Vec<String>> = SyncBarrier::new();
        let recorder: Arc<dyn SyncObserver<Vec<String>>> = Recorder::new("a");

        assert!(barrier.register_observer(recorder.clone()));
        assert!(!barrier.register_observer(recorder.clone()));
        assert_eq!(barrier.observer_count(), 1);

        assert!(barrier.release_observer(&recorder));
        assert!(!barrier.release_observer(&recorder));
        assert_eq!(barrier.observer_count(), 0);
    }

    #[test]
    fn test_request_blocks_until_serviced() {
        let barrier: Arc<SyncBarrier<Vec<String>>> = Arc::new(SyncBarrier::new());
        let recorder = Recorder::new("splice");
        barrier.register_observer(recorder.clone());

        let requester = {
            let barrier = barrier.clone();
            thread::spawn(move || barrier.request_synchronize())
        };

        let mut log = Vec::new();
        service_until_pass(&barrier, &mut log);
        requester.join().unwrap();

        assert_eq!(log, vec!["splice".to_string()]);
        assert_eq!(recorder.calls.load(Ordering::SeqCst), 1);
        assert!(!barrier.is_pending());
    }

    #[test]
    fn test_observers_run_in_registration_order() {
        let barrier: Arc<SyncBarrier<Vec<String>>> = Arc::new(SyncBarrier::new());
        barrier.register_observer(Recorder::new("first"));
        barrier.register_observer(Recorder::new("second"));
        barrier.register_observer(Recorder::new("third"));

        let requester = {
            let barrier = barrier.clone();
            thread::spawn(move || barrier.request_synchronize())
        };

        let mut log = Vec::new();
        service_until_pass(&barrier, &mut log);
        requester.join().unwrap();

        assert_eq!(log, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_observers_run_on_servicing_thread() {
        struct ThreadCheck;
        impl SyncObserver<thread::ThreadId> for ThreadCheck {
            fn contexts_synchronized(&self, target: &mut thread::ThreadId) {
                assert_eq!(thread::current().id(), *target);
            }
        }

        let barrier: Arc<SyncBarrier<thread::ThreadId>> = Arc::new(SyncBarrier::new());
        barrier.register_observer(Arc::new(ThreadCheck));

        let requester = {
            let barrier = barrier.clone();
            thread::spawn(move || barrier.request_synchronize())
        };

        let mut me = thread::current().id();
        while !barrier.service_pending(&mut me) {
            barrier.wait_for_request(Duration::from_millis(10));
        }
        requester.join().unwrap();
    }

    #[test]
    fn test_concurrent_requesters_are_all_released() {
        let barrier: Arc<SyncBarrier<Vec<String>>> = Arc::new(SyncBarrier::new());
        let recorder = Recorder::new("obs");
        barrier.register_observer(recorder.clone());

        let requesters: Vec<_> = (0..4)
            .map(|_| {
                let barrier = barrier.clone();
                thread::spawn(move || barrier.request_synchronize())
            })
            .collect();

        let mut log = Vec::new();
        while requesters.iter().any(|r| !r.is_finished()) {
            if !barrier.service_pending(&mut log) {
                barrier.wait_for_request(Duration::from_millis(5));
            }
        }
        for r in requesters {
            r.join().unwrap();
        }

        let passes = recorder.calls.load(Ordering::SeqCst);
        assert!((1..=4).contains(&passes));
        assert!(!barrier.is_pending());
    }

    #[test]
    fn test_wait_for_request_times_out() {
        let barrier: SyncBarrier<Vec<String>> = SyncBarrier::new();
        assert!(!barrier.wait_for_request(Duration::from_millis(1)));
    }
}
