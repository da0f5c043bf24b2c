use std::cell::RefCell;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use futures::executor::LocalSpawner;
use futures::task::LocalSpawnExt;

use crate::defect::Defect;
use crate::outcome::Settled;
use crate::promise::{HandlerRecord, Promise, Resolver};
use crate::scheduler::Schedule;

/// A [`Promise`] viewed as a standard [`Future`].
///
/// The three channels fold into the two a native future has: `Success` and
/// `Fail` are both fulfilled outcomes and arrive as `Ok(Settled::..)`; only
/// the error channel rejects, as `Err(Defect)`. Awaiting counts as handling
/// the error channel, so an awaited promise never trips the unhandled-error
/// report.
pub struct Thenable<S, F> {
    state: Rc<RefCell<ThenState<S, F>>>,
}

struct ThenState<S, F> {
    outcome: Option<Result<Settled<S, F>, Defect>>,
    waker: Option<Waker>,
}

fn complete<S, F>(state: &Rc<RefCell<ThenState<S, F>>>, outcome: Result<Settled<S, F>, Defect>) {
    let waker = {
        let mut state = state.borrow_mut();
        state.outcome = Some(outcome);
        state.waker.take()
    };
    if let Some(waker) = waker {
        waker.wake();
    }
}

impl<S, F> Future for Thenable<S, F> {
    type Output = Result<Settled<S, F>, Defect>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.state.borrow_mut();
        match state.outcome.take() {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                state.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

impl<S: Clone + 'static, F: Clone + 'static> Promise<S, F> {
    /// Bridges this promise to `await`.
    ///
    /// ```
    /// use futures::executor::LocalPool;
    /// use promise_tri::{Promise, Settled};
    /// use std::rc::Rc;
    ///
    /// let mut pool = LocalPool::new();
    /// let sched = Rc::new(pool.spawner());
    /// let p: Promise<i32, String> = Promise::succeed(sched, 7);
    /// let got = pool.run_until(async move { p.then().await });
    /// assert_eq!(got, Ok(Settled::Success(7)));
    /// ```
    pub fn then(&self) -> Thenable<S, F> {
        let state = Rc::new(RefCell::new(ThenState {
            outcome: None,
            waker: None,
        }));
        let success = {
            let state = Rc::clone(&state);
            move |value| complete(&state, Ok(Settled::Success(value)))
        };
        let fail = {
            let state = Rc::clone(&state);
            move |value| complete(&state, Ok(Settled::Fail(value)))
        };
        let err = {
            let state = Rc::clone(&state);
            move |defect| complete(&state, Err(defect))
        };
        self.register(HandlerRecord {
            on_success: Some(Box::new(success)),
            on_fail: Some(Box::new(fail)),
            on_err: Some(Box::new(err)),
        });
        Thenable { state }
    }

    /// Folds both arms into one value, the await-side sibling of
    /// [`Promise::finally`]-style terminal handling.
    pub fn then_map<T>(
        &self,
        on_fulfilled: impl FnOnce(Settled<S, F>) -> T + 'static,
        on_rejected: impl FnOnce(Defect) -> T + 'static,
    ) -> impl Future<Output = T> {
        let thenable = self.then();
        async move {
            match thenable.await {
                Ok(settled) => on_fulfilled(settled),
                Err(defect) => on_rejected(defect),
            }
        }
    }

    /// Wraps a native future. `Ok` settles the success channel; `Err`
    /// settles the error channel, since a future's error type models a
    /// defect unless declared otherwise via
    /// [`from_future_failing`](Promise::from_future_failing).
    pub fn from_future<E>(
        spawner: &LocalSpawner,
        future: impl Future<Output = Result<S, E>> + 'static,
    ) -> Self
    where
        E: std::error::Error + 'static,
    {
        let sched: Rc<dyn Schedule> = Rc::new(spawner.clone());
        let (promise, resolver) = Self::deferred(sched);
        spawn_driver(spawner, future, resolver, |resolver, error| {
            resolver.error(Defect::new(error))
        });
        promise
    }

    /// Wraps a native future whose `Err` is a declared failure: `Err`
    /// settles the fail channel instead of the error channel.
    pub fn from_future_failing(
        spawner: &LocalSpawner,
        future: impl Future<Output = Result<S, F>> + 'static,
    ) -> Self {
        let sched: Rc<dyn Schedule> = Rc::new(spawner.clone());
        let (promise, resolver) = Self::deferred(sched);
        spawn_driver(spawner, future, resolver, |resolver, value| {
            resolver.fail(value)
        });
        promise
    }
}

fn spawn_driver<S, F, E>(
    spawner: &LocalSpawner,
    future: impl Future<Output = Result<S, E>> + 'static,
    resolver: Resolver<S, F>,
    on_err: impl FnOnce(&Resolver<S, F>, E) + 'static,
) where
    S: Clone + 'static,
    F: Clone + 'static,
{
    let spawned = spawner.spawn_local(async move {
        match future.await {
            Ok(value) => resolver.succeed(value),
            Err(error) => on_err(&resolver, error),
        }
    });
    if spawned.is_err() {
        log::warn!("promise scheduler is shut down; wrapped future will never settle");
    }
}

impl<S: Clone + 'static, F: Clone + 'static> IntoFuture for Promise<S, F> {
    type Output = Result<Settled<S, F>, Defect>;
    type IntoFuture = Thenable<S, F>;

    fn into_future(self) -> Self::IntoFuture {
        self.then()
    }
}
