//! A deferred value with three outcome channels instead of two.
//!
//! A [`Promise`] settles exactly once into one of:
//!
//! - **Success**: the operation produced its value.
//! - **Fail**: the operation declined in a way the caller declared up front,
//!   a business outcome rather than a bug (`F` is part of the type).
//! - **Error**: an unexpected defect, carried as a [`Defect`].
//!
//! Chaining keeps the channels apart: [`Promise::success`],
//! [`Promise::fail`], and [`Promise::catch`] each handle one channel and
//! pass the others through, and a handler moves the chain between channels
//! by what [`Step`] it returns. A defect that reaches the end of a chain
//! with nobody listening is reported through
//! [`set_unhandled_error_hook`] (or `log::error!` by default) instead of
//! being silently dropped.
//!
//! Everything is single-threaded and cooperative. Handlers never run
//! synchronously from registration or settlement; they run on the
//! [`Schedule`] collaborator the promise was built with, either the
//! bundled [`MicrotaskQueue`] or a `futures::executor::LocalSpawner`.
//!
//! ```
//! use promise_tri::{MicrotaskQueue, Promise, Step};
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let queue = MicrotaskQueue::new();
//! let log = Rc::new(RefCell::new(Vec::new()));
//!
//! let lookup: Promise<u32, String> = Promise::new(queue.clone(), |r| {
//!     r.fail("no such user".to_string())
//! });
//!
//! let sink = Rc::clone(&log);
//! let _with_fallback: Promise<u32, String> = lookup
//!     .success(|id| Step::Success(id * 2))
//!     .fail(move |reason| {
//!         sink.borrow_mut().push(reason);
//!         Step::Success(0) // fall back to the anonymous user
//!     });
//!
//! queue.run_until_idle();
//! assert_eq!(*log.borrow(), vec!["no such user".to_string()]);
//! ```
//!
//! Promises also interoperate with plain futures: [`Promise::then`] (and
//! `IntoFuture`) turns a promise into an awaitable where success and fail
//! both arrive fulfilled as [`Settled`] and only defects reject, and the
//! [`native`] module aggregates promises with the host's own combinators.

mod defect;
mod interop;
pub mod native;
mod outcome;
mod promise;
mod scheduler;

pub use defect::{clear_unhandled_error_hook, set_unhandled_error_hook, Defect, Message};
pub use interop::Thenable;
pub use outcome::{Outcome, Settled, State, Step};
pub use promise::{Promise, Resolver};
pub use scheduler::{Job, MicrotaskQueue, Schedule};
