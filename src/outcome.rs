use crate::defect::Defect;
use crate::promise::Promise;

/// Observable lifecycle of a promise. Monotonic: once non-`Pending` it
/// never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Pending,
    Success,
    Fail,
    Error,
}

impl State {
    pub fn is_settled(self) -> bool {
        !matches!(self, State::Pending)
    }
}

/// The settled payload: exactly one of the three channels.
///
/// This is a closed union on purpose. Nothing probes values for
/// promise-ness at runtime; adopting another promise goes through
/// [`Step::Chain`] or [`crate::Resolver::adopt`].
#[derive(Debug, Clone)]
pub enum Outcome<S, F> {
    Success(S),
    Fail(F),
    Error(Defect),
}

impl<S, F> Outcome<S, F> {
    pub fn state(&self) -> State {
        match self {
            Outcome::Success(_) => State::Success,
            Outcome::Fail(_) => State::Fail,
            Outcome::Error(_) => State::Error,
        }
    }
}

/// Two-channel encoding used by the thenable adapter's fulfilled arm.
///
/// A declared `Fail` is not a defect, so both `Success` and `Fail` travel
/// through `Ok(..)` when awaited; only the error channel rejects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled<S, F> {
    Success(S),
    Fail(F),
}

impl<S, F> Settled<S, F> {
    pub fn is_success(&self) -> bool {
        matches!(self, Settled::Success(_))
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Settled::Fail(_))
    }

    pub fn into_success(self) -> Option<S> {
        match self {
            Settled::Success(value) => Some(value),
            Settled::Fail(_) => None,
        }
    }

    pub fn into_fail(self) -> Option<F> {
        match self {
            Settled::Success(_) => None,
            Settled::Fail(value) => Some(value),
        }
    }
}

/// Uniform return shape of a chaining handler.
///
/// `Success`/`Fail`/`Error` settle the derived promise directly; `Error` is
/// the typed form of "the handler threw". `Chain` hands back another promise
/// whose eventual outcome the derived promise adopts, which is how a handler
/// switches channel or defers (flattening, any depth).
///
/// The variant constructors double as pass-through slots for
/// [`Promise::next`]: `Step::Fail` forwards a fail value unchanged, and so
/// on. See [`Promise::success`] for the wiring.
pub enum Step<S, F> {
    Success(S),
    Fail(F),
    Error(Defect),
    Chain(Promise<S, F>),
}

impl<S, F> From<Outcome<S, F>> for Step<S, F> {
    fn from(outcome: Outcome<S, F>) -> Self {
        match outcome {
            Outcome::Success(value) => Step::Success(value),
            Outcome::Fail(value) => Step::Fail(value),
            Outcome::Error(defect) => Step::Error(defect),
        }
    }
}

impl<S, F> From<Promise<S, F>> for Step<S, F> {
    fn from(promise: Promise<S, F>) -> Self {
        Step::Chain(promise)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_maps_to_state() {
        assert_eq!(Outcome::<u8, u8>::Success(1).state(), State::Success);
        assert_eq!(Outcome::<u8, u8>::Fail(1).state(), State::Fail);
        assert_eq!(
            Outcome::<u8, u8>::Error(Defect::msg("x")).state(),
            State::Error
        );
        assert!(State::Error.is_settled());
        assert!(!State::Pending.is_settled());
    }

    #[test]
    fn settled_accessors() {
        let s: Settled<u8, &str> = Settled::Success(3);
        assert!(s.is_success());
        assert_eq!(s.into_success(), Some(3));

        let f: Settled<u8, &str> = Settled::Fail("no");
        assert!(f.is_fail());
        assert_eq!(f.into_fail(), Some("no"));
    }
}
