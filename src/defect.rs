use std::cell::RefCell;
use std::error::Error;
use std::fmt;
use std::rc::Rc;

/// Payload of the error channel: an unexpected defect, the moral
/// equivalent of an uncaught exception.
///
/// A `Defect` is a cheap-to-clone wrapper so a single settled value can be
/// delivered to every queued handler record.
///
/// # Examples
///
/// ```
/// use promise_tri::Defect;
/// let defect = Defect::msg("boom");
/// assert_eq!(defect.to_string(), "boom");
/// ```
#[derive(Debug, Clone)]
pub struct Defect(Rc<dyn Error + 'static>);

impl Defect {
    /// Wraps any concrete error.
    pub fn new(source: impl Error + 'static) -> Self {
        Self(Rc::new(source))
    }

    /// A defect carrying only a message.
    pub fn msg(text: impl Into<String>) -> Self {
        Self::new(Message(text.into()))
    }

    /// Borrows the wrapped error.
    pub fn as_error(&self) -> &(dyn Error + 'static) {
        self.0.as_ref()
    }

    /// Downcasts to the concrete error type, if it matches.
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref()
    }
}

/// Equality is identity: clones of one settled defect compare equal,
/// independently constructed defects never do.
impl PartialEq for Defect {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Display for Defect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl<E: Error + 'static> From<E> for Defect {
    fn from(source: E) -> Self {
        Self::new(source)
    }
}

/// Message-only error backing [`Defect::msg`].
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct Message(pub String);

type Hook = Box<dyn Fn(&Defect)>;

thread_local! {
    static UNHANDLED_HOOK: RefCell<Option<Hook>> = const { RefCell::new(None) };
}

/// Installs a thread-local observer for unhandled error-channel settlements,
/// replacing the default `log::error!` report. Hosts use this to surface
/// unhandled defects on their own diagnostic channel; tests use it to assert
/// that a report happened.
pub fn set_unhandled_error_hook(hook: impl Fn(&Defect) + 'static) {
    UNHANDLED_HOOK.with(|cell| *cell.borrow_mut() = Some(Box::new(hook)));
}

/// Removes the thread-local hook, restoring the `log::error!` default.
pub fn clear_unhandled_error_hook() {
    UNHANDLED_HOOK.with(|cell| *cell.borrow_mut() = None);
}

/// Reports a defect that reached the end of a chain with no error handler.
/// Runs the installed hook when there is one, else logs. Never panics.
pub(crate) fn report_unhandled(defect: &Defect) {
    // Take the hook while running it so a hook that touches promises cannot
    // observe a held borrow.
    let hook = UNHANDLED_HOOK.with(|cell| cell.borrow_mut().take());
    match hook {
        Some(hook) => {
            hook(defect);
            UNHANDLED_HOOK.with(|cell| {
                let mut slot = cell.borrow_mut();
                if slot.is_none() {
                    *slot = Some(hook);
                }
            });
        }
        None => log::error!("unhandled promise error: {defect}"),
    }
}
