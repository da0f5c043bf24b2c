use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::rc::Rc;

use crate::defect::{report_unhandled, Defect};
use crate::outcome::{Outcome, State, Step};
use crate::scheduler::Schedule;

/// A three-channel promise: a deferred value that settles exactly once into
/// Success, Fail, or Error.
///
/// The handle is a cheap clone over shared state; the instance exclusively
/// owns its outcome slot and handler queue, and only its own resolvers and
/// drain routine mutate them.
///
/// # Examples
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use promise_tri::{MicrotaskQueue, Promise, Step};
///
/// let queue = MicrotaskQueue::new();
/// let got = Rc::new(Cell::new(0));
///
/// let promise: Promise<i32, String> = Promise::new(queue.clone(), |r| r.succeed(41));
/// let sink = Rc::clone(&got);
/// promise.success(move |n| {
///     sink.set(n + 1);
///     Step::Success(n)
/// });
///
/// assert_eq!(got.get(), 0); // nothing runs synchronously
/// queue.run_until_idle();
/// assert_eq!(got.get(), 42);
/// ```
pub struct Promise<S, F> {
    inner: Rc<RefCell<Inner<S, F>>>,
}

impl<S, F> Clone for Promise<S, F> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S, F> fmt::Debug for Promise<S, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self
            .inner
            .borrow()
            .outcome
            .as_ref()
            .map_or(State::Pending, Outcome::state);
        write!(f, "Promise({state:?})")
    }
}

struct Inner<S, F> {
    outcome: Option<Outcome<S, F>>,
    handlers: Vec<HandlerRecord<S, F>>,
    drained: bool,
    sched: Rc<dyn Schedule>,
}

/// One queued subscription: a callback per channel, each invoked only if
/// the promise settles into that channel. Combinators always install all
/// three; the `on_err` slot additionally falls back to the default error
/// reporter when absent at dispatch time.
pub(crate) struct HandlerRecord<S, F> {
    pub(crate) on_success: Option<Box<dyn FnOnce(S)>>,
    pub(crate) on_fail: Option<Box<dyn FnOnce(F)>>,
    pub(crate) on_err: Option<Box<dyn FnOnce(Defect)>>,
}

/// The write side of a promise, handed to the executor (and to the caller
/// by [`Promise::deferred`]). First settlement wins; everything after is a
/// no-op.
pub struct Resolver<S, F> {
    inner: Rc<RefCell<Inner<S, F>>>,
}

impl<S, F> Clone for Resolver<S, F> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: Clone + 'static, F: Clone + 'static> Promise<S, F> {
    /// Creates a promise and runs `executor` synchronously with its
    /// resolver, mirroring the native promise constructor contract.
    pub fn new(sched: Rc<dyn Schedule>, executor: impl FnOnce(Resolver<S, F>)) -> Self {
        let promise = Self::pending(sched);
        executor(promise.resolver());
        promise
    }

    /// Producer/consumer split: the promise and its resolver, for hosts
    /// that settle from somewhere other than an executor body.
    pub fn deferred(sched: Rc<dyn Schedule>) -> (Self, Resolver<S, F>) {
        let promise = Self::pending(sched);
        let resolver = promise.resolver();
        (promise, resolver)
    }

    /// An already-succeeded promise.
    pub fn succeed(sched: Rc<dyn Schedule>, value: S) -> Self {
        Self::new(sched, |r| r.succeed(value))
    }

    /// An already-failed promise. The fail channel carries a declared
    /// business failure, not a defect.
    pub fn failed(sched: Rc<dyn Schedule>, value: F) -> Self {
        Self::new(sched, |r| r.fail(value))
    }

    /// An already-errored promise.
    pub fn throw(sched: Rc<dyn Schedule>, defect: Defect) -> Self {
        Self::new(sched, |r| r.error(defect))
    }

    /// A promise settled with the given outcome.
    pub fn settled(sched: Rc<dyn Schedule>, outcome: Outcome<S, F>) -> Self {
        Self::new(sched, |r| r.settle(outcome))
    }

    /// Materializes a [`Step`]. A `Step::Chain` hands its promise back
    /// unchanged instead of wrapping it again.
    pub fn from_step(sched: Rc<dyn Schedule>, step: Step<S, F>) -> Self {
        match step {
            Step::Chain(promise) => promise,
            step => Self::new(sched, |r| r.apply(step)),
        }
    }

    fn pending(sched: Rc<dyn Schedule>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                outcome: None,
                handlers: Vec::new(),
                drained: false,
                sched,
            })),
        }
    }

    fn resolver(&self) -> Resolver<S, F> {
        Resolver {
            inner: Rc::clone(&self.inner),
        }
    }

    /// Current channel, `State::Pending` until settled.
    pub fn state(&self) -> State {
        self.inner
            .borrow()
            .outcome
            .as_ref()
            .map_or(State::Pending, Outcome::state)
    }

    pub fn is_settled(&self) -> bool {
        self.state().is_settled()
    }

    pub(crate) fn sched(&self) -> Rc<dyn Schedule> {
        self.inner.borrow().sched.clone()
    }

    /// Appends a record to the handler queue; if the promise is already
    /// settled, schedules a drain. Dispatch never happens synchronously
    /// from here.
    pub(crate) fn register(&self, record: HandlerRecord<S, F>) {
        let settled = {
            let mut inner = self.inner.borrow_mut();
            inner.handlers.push(record);
            inner.outcome.is_some()
        };
        if settled {
            Self::schedule_drain(&self.inner);
        }
    }

    fn schedule_drain(inner: &Rc<RefCell<Inner<S, F>>>) {
        let sched = inner.borrow().sched.clone();
        let inner = Rc::clone(inner);
        sched.schedule(Box::new(move || Self::drain(&inner)));
    }

    /// One dispatch turn. An Error settlement that drains with an empty
    /// queue and no prior drain is reported as unhandled; otherwise every
    /// queued record gets the callback matching the settled channel, in
    /// insertion order, and the queue is cleared.
    fn drain(inner: &Rc<RefCell<Inner<S, F>>>) {
        let (outcome, records) = {
            let mut inner = inner.borrow_mut();
            let Some(outcome) = inner.outcome.clone() else {
                return;
            };
            if matches!(outcome, Outcome::Error(_)) && inner.handlers.is_empty() && !inner.drained
            {
                drop(inner);
                if let Outcome::Error(defect) = outcome {
                    report_unhandled(&defect);
                }
                return;
            }
            let records = mem::take(&mut inner.handlers);
            inner.drained = true;
            (outcome, records)
        };
        for record in records {
            match &outcome {
                Outcome::Success(value) => {
                    if let Some(on_success) = record.on_success {
                        on_success(value.clone());
                    }
                }
                Outcome::Fail(value) => {
                    if let Some(on_fail) = record.on_fail {
                        on_fail(value.clone());
                    }
                }
                Outcome::Error(defect) => match record.on_err {
                    Some(on_err) => on_err(defect.clone()),
                    None => report_unhandled(defect),
                },
            }
        }
    }

    /// The general chaining combinator. All three handlers are required and
    /// return a [`Step`] for the derived promise; pass the `Step` variant
    /// constructors for channels that should flow through untouched:
    ///
    /// ```
    /// # use promise_tri::{MicrotaskQueue, Promise, Step};
    /// # let queue = MicrotaskQueue::new();
    /// let p: Promise<i32, String> = Promise::succeed(queue.clone(), 1);
    /// // identical to p.success(|n| Step::Success(n * 2))
    /// let doubled = p.next(|n| Step::Success(n * 2), Step::Fail, Step::Error);
    /// # queue.run_until_idle();
    /// ```
    ///
    /// A handler returning `Step::Error` is the typed form of throwing; a
    /// handler running on the error channel that returns `Step::Success`
    /// recovers the chain.
    pub fn next<S2, F2>(
        &self,
        on_success: impl FnOnce(S) -> Step<S2, F2> + 'static,
        on_fail: impl FnOnce(F) -> Step<S2, F2> + 'static,
        on_err: impl FnOnce(Defect) -> Step<S2, F2> + 'static,
    ) -> Promise<S2, F2>
    where
        S2: Clone + 'static,
        F2: Clone + 'static,
    {
        let derived = Promise::pending(self.sched());
        let resolver = derived.resolver();
        let success = {
            let resolver = resolver.clone();
            move |value| resolver.apply(on_success(value))
        };
        let fail = {
            let resolver = resolver.clone();
            move |value| resolver.apply(on_fail(value))
        };
        let err = move |defect| resolver.apply(on_err(defect));
        self.register(HandlerRecord {
            on_success: Some(Box::new(success)),
            on_fail: Some(Box::new(fail)),
            on_err: Some(Box::new(err)),
        });
        derived
    }

    /// Maps the success channel; fail and error pass through.
    pub fn success<S2>(&self, on_success: impl FnOnce(S) -> Step<S2, F> + 'static) -> Promise<S2, F>
    where
        S2: Clone + 'static,
    {
        self.next(on_success, Step::Fail, Step::Error)
    }

    /// Maps the success channel with an error-recovery handler attached.
    pub fn success_catch<S2>(
        &self,
        on_success: impl FnOnce(S) -> Step<S2, F> + 'static,
        on_err: impl FnOnce(Defect) -> Step<S2, F> + 'static,
    ) -> Promise<S2, F>
    where
        S2: Clone + 'static,
    {
        self.next(on_success, Step::Fail, on_err)
    }

    /// Maps the fail channel; success and error pass through.
    pub fn fail<F2>(&self, on_fail: impl FnOnce(F) -> Step<S, F2> + 'static) -> Promise<S, F2>
    where
        F2: Clone + 'static,
    {
        self.next(Step::Success, on_fail, Step::Error)
    }

    /// Maps the fail channel with an error-recovery handler attached.
    pub fn fail_catch<F2>(
        &self,
        on_fail: impl FnOnce(F) -> Step<S, F2> + 'static,
        on_err: impl FnOnce(Defect) -> Step<S, F2> + 'static,
    ) -> Promise<S, F2>
    where
        F2: Clone + 'static,
    {
        self.next(Step::Success, on_fail, on_err)
    }

    /// Handles the error channel. Returning `Step::Success` recovers the
    /// chain, promoting the derived promise back to the success channel.
    pub fn catch(&self, on_err: impl FnOnce(Defect) -> Step<S, F> + 'static) -> Promise<S, F> {
        self.next(Step::Success, Step::Fail, on_err)
    }

    /// Runs `callback` once on any settlement and re-emits the original
    /// channel and value.
    pub fn finally(&self, callback: impl FnOnce() + 'static) -> Promise<S, F> {
        // Only one channel fires, but the callback has to be shared across
        // all three closures.
        let callback: Rc<RefCell<Option<Box<dyn FnOnce()>>>> =
            Rc::new(RefCell::new(Some(Box::new(callback))));
        fn run(slot: &Rc<RefCell<Option<Box<dyn FnOnce()>>>>) {
            if let Some(callback) = slot.borrow_mut().take() {
                callback();
            }
        }
        self.next(
            {
                let slot = Rc::clone(&callback);
                move |value| {
                    run(&slot);
                    Step::Success(value)
                }
            },
            {
                let slot = Rc::clone(&callback);
                move |value| {
                    run(&slot);
                    Step::Fail(value)
                }
            },
            move |defect| {
                run(&callback);
                Step::Error(defect)
            },
        )
    }
}

impl<S: Clone + 'static, F: Clone + 'static> Resolver<S, F> {
    /// Settles into the success channel. No-op once settled.
    pub fn succeed(&self, value: S) {
        self.settle(Outcome::Success(value));
    }

    /// Settles into the fail channel. No-op once settled.
    pub fn fail(&self, value: F) {
        self.settle(Outcome::Fail(value));
    }

    /// Settles into the error channel. No-op once settled.
    pub fn error(&self, defect: Defect) {
        self.settle(Outcome::Error(defect));
    }

    /// The single settlement point: first call wins, and settling schedules
    /// exactly one dispatch turn.
    pub fn settle(&self, outcome: Outcome<S, F>) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.outcome.is_some() {
                return;
            }
            inner.outcome = Some(outcome);
        }
        Promise::schedule_drain(&self.inner);
    }

    /// Defers settlement to another promise: this promise adopts `other`'s
    /// eventual channel and value (flattening; nests to any depth).
    pub fn adopt(&self, other: Promise<S, F>) {
        if self.inner.borrow().outcome.is_some() {
            return;
        }
        let success = {
            let resolver = self.clone();
            move |value| resolver.succeed(value)
        };
        let fail = {
            let resolver = self.clone();
            move |value| resolver.fail(value)
        };
        let err = {
            let resolver = self.clone();
            move |defect| resolver.error(defect)
        };
        other.register(HandlerRecord {
            on_success: Some(Box::new(success)),
            on_fail: Some(Box::new(fail)),
            on_err: Some(Box::new(err)),
        });
    }

    /// Applies a handler's [`Step`] to this resolver.
    pub fn apply(&self, step: Step<S, F>) {
        match step {
            Step::Success(value) => self.succeed(value),
            Step::Fail(value) => self.fail(value),
            Step::Error(defect) => self.error(defect),
            Step::Chain(promise) => self.adopt(promise),
        }
    }
}
