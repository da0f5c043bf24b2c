use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use futures::executor::LocalSpawner;
use futures::task::LocalSpawnExt;

/// A deferred unit of work: one handler dispatch, one drain, one adoption
/// forward.
pub type Job = Box<dyn FnOnce()>;

/// The scheduling collaborator. Implementations must honor the microtask
/// contract: jobs run in FIFO order, before any timer or I/O callback
/// queued afterwards. Promises never run handlers synchronously; everything
/// goes through here.
pub trait Schedule {
    fn schedule(&self, job: Job);
}

/// A first-party FIFO job queue for hosts that drain the queue themselves
/// (and for deterministic tests).
///
/// One call to [`run_until_idle`](MicrotaskQueue::run_until_idle) is one
/// scheduling epoch: jobs scheduled while draining run in the same call,
/// so an entire settled chain resolves within a single turn.
///
/// # Examples
///
/// ```
/// use promise_tri::MicrotaskQueue;
/// use promise_tri::Schedule;
///
/// let queue = MicrotaskQueue::new();
/// queue.schedule(Box::new(|| println!("later")));
/// assert_eq!(queue.pending(), 1);
/// queue.run_until_idle();
/// assert_eq!(queue.pending(), 0);
/// ```
pub struct MicrotaskQueue {
    jobs: RefCell<VecDeque<Job>>,
}

impl MicrotaskQueue {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            jobs: RefCell::new(VecDeque::new()),
        })
    }

    /// Number of jobs waiting for the next turn.
    pub fn pending(&self) -> usize {
        self.jobs.borrow().len()
    }

    /// Runs queued jobs in FIFO order until none remain, including jobs
    /// scheduled by the jobs themselves.
    pub fn run_until_idle(&self) {
        loop {
            // Borrow is released before the job runs; jobs are free to
            // schedule more work onto this queue.
            let job = self.jobs.borrow_mut().pop_front();
            match job {
                Some(job) => job(),
                None => break,
            }
        }
    }
}

impl Schedule for MicrotaskQueue {
    fn schedule(&self, job: Job) {
        self.jobs.borrow_mut().push_back(job);
    }
}

/// The host event loop: jobs become ready local tasks on a
/// `futures::executor::LocalPool`. This is the scheduler to use when the
/// promise chain is consumed through `await`.
impl Schedule for LocalSpawner {
    fn schedule(&self, job: Job) {
        if self.spawn_local(async move { job() }).is_err() {
            // Pool is gone; the promise stays pending forever, which is the
            // documented fate of work nobody can run.
            log::warn!("promise scheduler is shut down; dropping queued job");
        }
    }
}
