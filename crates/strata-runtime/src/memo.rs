use std::collections::VecDeque;
use std::fmt::Debug;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use hashbrown::{HashMap, HashSet};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryState {
    Absent,
    Pending,
    Loading,
    Ready,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MemoStats {
    pub hits: u64,
    pub misses: u64,
    pub computed: u64,
    /// Computations that panicked. The key went back to Absent.
    pub failed: u64,
    pub pending: usize,
    pub loading: usize,
    pub ready: usize,
    pub compute_time: Duration,
}

struct State<K, V> {
    pending: VecDeque<K>,
    queued: HashSet<K>,
    loading: HashSet<K>,
    ready: HashMap<K, Arc<V>>,
    shutdown: bool,
}

struct Shared<K, V> {
    state: Mutex<State<K, V>>,
    work: Condvar,
    finished: Condvar,
    hits: AtomicU64,
    misses: AtomicU64,
    computed: AtomicU64,
    failed: AtomicU64,
    compute_nanos: AtomicU64,
}

impl<K, V> Shared<K, V> {
    // A panicking compute function never holds the lock, so a poisoned
    // mutex still guards consistent state.
    fn lock(&self) -> MutexGuard<'_, State<K, V>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Memoizing map whose values are computed once per key by a pool of
/// background workers.
///
/// Each key moves `Absent → Pending → Loading → Ready` and stays Ready for
/// the life of the map. Lookups never block: [`MemoMap::try_get`] schedules
/// missing keys and returns `None` until the value is available.
pub struct MemoMap<K, V> {
    shared: Arc<Shared<K, V>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
    done_rx: Receiver<K>,
}

impl<K, V> MemoMap<K, V>
where
    K: Clone + Eq + Hash + Debug + Send + 'static,
    V: Send + Sync + 'static,
{
    /// Spawns `workers` threads (one per available core when `0`) named
    /// `{name}-{i}`, each running `compute` on scheduled keys.
    pub fn new<F>(name: &str, workers: usize, compute: F) -> Self
    where
        F: Fn(&K) -> V + Send + Sync + 'static,
    {
        let worker_count = if workers == 0 {
            thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            workers
        };
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                pending: VecDeque::new(),
                queued: HashSet::new(),
                loading: HashSet::new(),
                ready: HashMap::new(),
                shutdown: false,
            }),
            work: Condvar::new(),
            finished: Condvar::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            computed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            compute_nanos: AtomicU64::new(0),
        });
        let compute = Arc::new(compute);
        let (done_tx, done_rx) = unbounded::<K>();
        let mut handles = Vec::with_capacity(worker_count);
        for i in 0..worker_count {
            let shared = shared.clone();
            let compute = compute.clone();
            let done_tx = done_tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("{name}-{i}"))
                .spawn(move || worker_loop(&shared, compute.as_ref(), &done_tx));
            match spawned {
                Ok(h) => handles.push(h),
                Err(e) => log::warn!("failed to spawn {name}-{i}: {e}"),
            }
        }
        log::debug!("{name}: started {} workers", handles.len());
        Self {
            shared,
            worker_count: handles.len(),
            workers: Mutex::new(handles),
            done_rx,
        }
    }

    /// Returns the value if Ready. Otherwise schedules the key (unless it is
    /// already Pending or Loading) and returns `None`.
    pub fn try_get(&self, key: &K) -> Option<Arc<V>> {
        let mut st = self.shared.lock();
        if let Some(v) = st.ready.get(key) {
            self.shared.hits.fetch_add(1, Ordering::Relaxed);
            return Some(v.clone());
        }
        self.shared.misses.fetch_add(1, Ordering::Relaxed);
        if st.shutdown || st.queued.contains(key) || st.loading.contains(key) {
            return None;
        }
        st.queued.insert(key.clone());
        st.pending.push_back(key.clone());
        drop(st);
        self.shared.work.notify_one();
        None
    }

    /// Ready value without scheduling anything.
    pub fn peek(&self, key: &K) -> Option<Arc<V>> {
        self.shared.lock().ready.get(key).cloned()
    }

    pub fn state(&self, key: &K) -> EntryState {
        let st = self.shared.lock();
        if st.ready.contains_key(key) {
            EntryState::Ready
        } else if st.loading.contains(key) {
            EntryState::Loading
        } else if st.queued.contains(key) {
            EntryState::Pending
        } else {
            EntryState::Absent
        }
    }

    /// Blocks until `key` is Ready or `timeout` elapses. Does not schedule.
    pub fn wait_for(&self, key: &K, timeout: Duration) -> Option<Arc<V>> {
        let deadline = Instant::now() + timeout;
        let mut st = self.shared.lock();
        loop {
            if let Some(v) = st.ready.get(key) {
                return Some(v.clone());
            }
            let now = Instant::now();
            if now >= deadline || st.shutdown {
                return None;
            }
            st = self
                .shared
                .finished
                .wait_timeout(st, deadline - now)
                .map(|(g, _)| g)
                .unwrap_or_else(|e| e.into_inner().0);
        }
    }

    /// Keys that became Ready since the last call.
    pub fn drain_completed(&self) -> Vec<K> {
        self.done_rx.try_iter().collect()
    }

    pub fn stats(&self) -> MemoStats {
        let (pending, loading, ready) = {
            let st = self.shared.lock();
            (st.pending.len(), st.loading.len(), st.ready.len())
        };
        MemoStats {
            hits: self.shared.hits.load(Ordering::Relaxed),
            misses: self.shared.misses.load(Ordering::Relaxed),
            computed: self.shared.computed.load(Ordering::Relaxed),
            failed: self.shared.failed.load(Ordering::Relaxed),
            pending,
            loading,
            ready,
            compute_time: Duration::from_nanos(self.shared.compute_nanos.load(Ordering::Relaxed)),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }
}

impl<K, V> MemoMap<K, V> {
    /// Stops the workers and joins them. Items being computed finish;
    /// Pending keys are abandoned. Idempotent.
    pub fn shutdown(&self) {
        {
            let mut st = self.shared.lock();
            st.shutdown = true;
        }
        self.shared.work.notify_all();
        self.shared.finished.notify_all();
        let handles: Vec<_> = {
            let mut w = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
            w.drain(..).collect()
        };
        for h in handles {
            if h.join().is_err() {
                log::warn!("memo worker panicked");
            }
        }
    }
}

impl<K, V> Drop for MemoMap<K, V> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop<K, V, F>(shared: &Shared<K, V>, compute: &F, done_tx: &Sender<K>)
where
    K: Clone + Eq + Hash + Debug,
    F: Fn(&K) -> V,
{
    loop {
        let key = {
            let mut st = shared.lock();
            loop {
                if st.shutdown {
                    return;
                }
                if let Some(k) = st.pending.pop_front() {
                    st.queued.remove(&k);
                    st.loading.insert(k.clone());
                    break k;
                }
                st = shared
                    .work
                    .wait(st)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        };

        let t0 = Instant::now();
        let value = match panic::catch_unwind(AssertUnwindSafe(|| compute(&key))) {
            Ok(v) => Arc::new(v),
            Err(_) => {
                log::error!(
                    "{} panicked computing {:?}; key is Absent again",
                    thread::current().name().unwrap_or("worker"),
                    key
                );
                shared.failed.fetch_add(1, Ordering::Relaxed);
                shared.lock().loading.remove(&key);
                shared.finished.notify_all();
                continue;
            }
        };
        let elapsed = t0.elapsed();
        log::debug!(
            "{} computed {:?} in {:.2}ms",
            thread::current().name().unwrap_or("worker"),
            key,
            elapsed.as_secs_f64() * 1000.0
        );

        shared.computed.fetch_add(1, Ordering::Relaxed);
        shared
            .compute_nanos
            .fetch_add(elapsed.as_nanos() as u64, Ordering::Relaxed);
        {
            // Ready state and the completion feed change under the same lock.
            let mut st = shared.lock();
            st.loading.remove(&key);
            st.ready.insert(key.clone(), value);
            let _ = done_tx.send(key);
        }
        shared.finished.notify_all();
    }
}
