//! Parallel worklist over the context arena.
//!
//! A context is *active* while it has undelivered items. The worker that
//! flips a context's activity flag from `false` to `true` enqueues it, and
//! only the worker that pops it drains its inbox, so a context is mutated
//! by one worker at a time. Items for other contexts are only ever pushed
//! into their inboxes; no worker holds two context locks. Workers with
//! nothing to pop park on a condition variable until work arrives or the
//! last active context drains.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::cancel::CancellationToken;
use crate::error::SaturationError;
use crate::index::{AxiomIndex, ConceptId};

use super::{Context, Item, Link};

/// How long an idle worker sleeps before rechecking for cancellation.
const IDLE_POLL: Duration = Duration::from_millis(5);

pub(super) struct Workspace<'a> {
    index: &'a AxiomIndex,
    cancel: &'a CancellationToken,
    contexts: Vec<Mutex<Context>>,
    inboxes: Vec<Mutex<Vec<Item>>>,
    active: Vec<AtomicBool>,
    queue: Mutex<VecDeque<ConceptId>>,
    /// Signalled, under the queue lock, on enqueue and when the last
    /// active context goes idle.
    idle: Condvar,
    /// Contexts whose activity flag is set.
    outstanding: AtomicUsize,
    processed: AtomicU64,
}

impl<'a> Workspace<'a> {
    pub(super) fn new(
        index: &'a AxiomIndex,
        cancel: &'a CancellationToken,
        contexts: Vec<Context>,
    ) -> Self {
        let len = contexts.len();
        Self {
            index,
            cancel,
            contexts: contexts.into_iter().map(Mutex::new).collect(),
            inboxes: (0..len).map(|_| Mutex::new(Vec::new())).collect(),
            active: (0..len).map(|_| AtomicBool::new(false)).collect(),
            queue: Mutex::new(VecDeque::new()),
            idle: Condvar::new(),
            outstanding: AtomicUsize::new(0),
            processed: AtomicU64::new(0),
        }
    }

    pub(super) fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Initialize a context with itself and top.
    pub(super) fn seed(&self, id: ConceptId) {
        self.send(id, Item::Subsumer(id));
        self.send(id, Item::Subsumer(ConceptId::TOP));
    }

    /// Run to fixpoint. `workers == 1` runs on the calling thread, `0`
    /// uses rayon's default thread count.
    pub(super) fn run(&self, workers: usize) -> Result<u64, SaturationError> {
        if workers == 1 {
            self.work()?;
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .thread_name(|i| format!("saturation-{i}"))
                .build()
                .map_err(|e| SaturationError::WorkerPool {
                    message: e.to_string(),
                })?;
            let results: Vec<Result<(), SaturationError>> = pool.broadcast(|_| self.work());
            results.into_iter().collect::<Result<Vec<()>, _>>()?;
        }
        Ok(self.processed.load(Ordering::Relaxed))
    }

    pub(super) fn into_contexts(self) -> Vec<Context> {
        self.contexts
            .into_iter()
            .map(|context| context.into_inner().expect("context lock poisoned"))
            .collect()
    }

    fn cancelled(&self) -> SaturationError {
        tracing::warn!("saturation cancelled");
        SaturationError::Cancelled {
            processed: self.processed.load(Ordering::Relaxed),
        }
    }

    fn work(&self) -> Result<(), SaturationError> {
        loop {
            let id = {
                let mut queue = self.queue.lock().expect("queue lock poisoned");
                loop {
                    if self.cancel.is_cancelled() {
                        return Err(self.cancelled());
                    }
                    if let Some(id) = queue.pop_front() {
                        break id;
                    }
                    if self.outstanding.load(Ordering::SeqCst) == 0 {
                        return Ok(());
                    }
                    queue = self
                        .idle
                        .wait_timeout(queue, IDLE_POLL)
                        .expect("queue lock poisoned")
                        .0;
                }
            };
            self.drain(id);
        }
    }

    /// Deliver `item` to `target`, activating it if it was idle.
    fn send(&self, target: ConceptId, item: Item) {
        let i = target.index();
        self.inboxes[i]
            .lock()
            .expect("inbox lock poisoned")
            .push(item);
        if !self.active[i].swap(true, Ordering::SeqCst) {
            self.outstanding.fetch_add(1, Ordering::SeqCst);
            self.queue
                .lock()
                .expect("queue lock poisoned")
                .push_back(target);
            self.idle.notify_one();
        }
    }

    fn drain(&self, id: ConceptId) {
        let i = id.index();
        let mut context = self.contexts[i].lock().expect("context lock poisoned");
        let mut local: Vec<Item> = Vec::new();
        let mut count = 0u64;
        loop {
            if local.is_empty() {
                let mut inbox = self.inboxes[i].lock().expect("inbox lock poisoned");
                std::mem::swap(&mut local, &mut *inbox);
            }
            if local.is_empty() {
                self.active[i].store(false, Ordering::SeqCst);
                let refilled = !self.inboxes[i]
                    .lock()
                    .expect("inbox lock poisoned")
                    .is_empty();
                if refilled && !self.active[i].swap(true, Ordering::SeqCst) {
                    continue;
                }
                break;
            }
            while let Some(item) = local.pop() {
                if self.cancel.is_cancelled() {
                    break;
                }
                count += 1;
                self.process(id, &mut context, item, &mut local);
            }
            if self.cancel.is_cancelled() {
                // Leave the context active; every worker is about to stop.
                self.processed.fetch_add(count, Ordering::Relaxed);
                return;
            }
        }
        self.processed.fetch_add(count, Ordering::Relaxed);
        if self.outstanding.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _queue = self.queue.lock().expect("queue lock poisoned");
            self.idle.notify_all();
        }
    }

    fn deliver(&self, from: ConceptId, to: ConceptId, item: Item, local: &mut Vec<Item>) {
        if from == to {
            local.push(item);
        } else {
            self.send(to, item);
        }
    }

    /// Apply the completion rules for one item in context `id`.
    fn process(&self, id: ConceptId, context: &mut Context, item: Item, local: &mut Vec<Item>) {
        let index = self.index;
        let roles = index.roles();
        match item {
            Item::Subsumer(concept) => {
                if !context.subsumers.insert(concept) {
                    return;
                }
                if concept == ConceptId::BOTTOM {
                    for pred in &context.predecessors {
                        self.deliver(id, pred.context, Item::Subsumer(ConceptId::BOTTOM), local);
                    }
                }
                for &sup in index.subsumptions(concept) {
                    local.push(Item::Subsumer(sup));
                }
                for &(other, sup) in index.conjunctions(concept) {
                    if context.subsumers.contains(&other) {
                        local.push(Item::Subsumer(sup));
                    }
                }
                for &(role, filler) in index.existentials_rhs(concept) {
                    local.push(Item::Link(Link {
                        role,
                        context: filler,
                    }));
                }
                for &(role, sup) in index.existentials_lhs(concept) {
                    for pred in &context.predecessors {
                        if roles.is_subrole(pred.role, role) {
                            self.deliver(id, pred.context, Item::Subsumer(sup), local);
                        }
                    }
                }
                for &datatype in index.datatypes_rhs(concept) {
                    local.push(Item::Datatype(datatype));
                }
            }
            Item::Link(link) => {
                if !context.successors.insert(link) {
                    return;
                }
                let back = Link {
                    role: link.role,
                    context: id,
                };
                self.deliver(id, link.context, Item::Predecessor(back), local);
                // id is the middle of pred.context -pred.role-> id -link.role-> link.context
                for pred in &context.predecessors {
                    for &composed in roles.compose(pred.role, link.role) {
                        let item = Item::Link(Link {
                            role: composed,
                            context: link.context,
                        });
                        self.deliver(id, pred.context, item, local);
                    }
                }
            }
            Item::Predecessor(pred) => {
                if !context.predecessors.insert(pred) {
                    return;
                }
                if context.is_unsatisfiable() {
                    self.deliver(id, pred.context, Item::Subsumer(ConceptId::BOTTOM), local);
                }
                for &concept in &context.subsumers {
                    for &(role, sup) in index.existentials_lhs(concept) {
                        if roles.is_subrole(pred.role, role) {
                            self.deliver(id, pred.context, Item::Subsumer(sup), local);
                        }
                    }
                }
                for succ in &context.successors {
                    for &composed in roles.compose(pred.role, succ.role) {
                        let item = Item::Link(Link {
                            role: composed,
                            context: succ.context,
                        });
                        self.deliver(id, pred.context, item, local);
                    }
                }
            }
            Item::Datatype(datatype) => {
                if !context.datatypes.insert(datatype) {
                    return;
                }
                if let Some(feature) = index.feature_of(datatype) {
                    let held = context.datatypes.iter().copied();
                    for sup in index.datatype_implications(feature, held) {
                        local.push(Item::Subsumer(sup));
                    }
                }
                if index
                    .datatype_conflicts(datatype)
                    .iter()
                    .any(|other| context.datatypes.contains(other))
                {
                    local.push(Item::Subsumer(ConceptId::BOTTOM));
                }
            }
        }
    }
}
