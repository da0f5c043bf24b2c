//! Aggregate operations over promises, expressed on the host's own future
//! combinators rather than reimplemented.
//!
//! Each function converts its promises through [`Promise::then`] and hands
//! the resulting futures to `futures::future`, so semantics (first error
//! short-circuits `all`, first settlement wins `race`, `all_settled` never
//! rejects) are exactly the host's.

use std::future::Future;

use futures::future;

use crate::defect::Defect;
use crate::outcome::Settled;
use crate::promise::Promise;

/// Resolves with every outcome once all promises fulfill; rejects with the
/// first defect.
pub async fn all<S, F>(
    promises: impl IntoIterator<Item = Promise<S, F>>,
) -> Result<Vec<Settled<S, F>>, Defect>
where
    S: Clone + 'static,
    F: Clone + 'static,
{
    future::try_join_all(promises.into_iter().map(|p| p.then())).await
}

/// Settles with the first promise to settle on any channel. An empty input
/// never settles, matching the native `race` contract.
pub async fn race<S, F>(
    promises: impl IntoIterator<Item = Promise<S, F>>,
) -> Result<Settled<S, F>, Defect>
where
    S: Clone + 'static,
    F: Clone + 'static,
{
    let futures: Vec<_> = promises.into_iter().map(|p| p.then()).collect();
    if futures.is_empty() {
        future::pending::<()>().await;
    }
    let (outcome, _, _) = future::select_all(futures).await;
    outcome
}

/// Waits for every promise to settle and reports each outcome, defects
/// included; never rejects.
pub async fn all_settled<S, F>(
    promises: impl IntoIterator<Item = Promise<S, F>>,
) -> Vec<Result<Settled<S, F>, Defect>>
where
    S: Clone + 'static,
    F: Clone + 'static,
{
    future::join_all(promises.into_iter().map(|p| p.then())).await
}

/// An immediately ready future, for symmetry with the promise factories
/// when plain `await` code needs a resolved value.
pub fn resolve<T>(value: T) -> impl Future<Output = T> {
    future::ready(value)
}

/// An immediately rejected future.
pub fn reject<T, E>(error: E) -> impl Future<Output = Result<T, E>> {
    future::err(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::LocalPool;
    use std::rc::Rc;

    #[test]
    fn all_collects_success_and_fail_alike() {
        let mut pool = LocalPool::new();
        let sched = Rc::new(pool.spawner());
        let a: Promise<u8, &str> = Promise::succeed(sched.clone(), 1);
        let b: Promise<u8, &str> = Promise::failed(sched, "soft");
        let got = pool.run_until(all(vec![a, b]));
        assert_eq!(got, Ok(vec![Settled::Success(1), Settled::Fail("soft")]));
    }

    #[test]
    fn resolve_and_reject_are_immediate() {
        let mut pool = LocalPool::new();
        assert_eq!(pool.run_until(resolve(9)), 9);
        assert_eq!(pool.run_until(reject::<u8, _>("no")), Err("no"));
    }
}
