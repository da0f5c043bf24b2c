use std::cell::RefCell;
use std::rc::Rc;

use promise_tri::{
    clear_unhandled_error_hook, set_unhandled_error_hook, Defect, MicrotaskQueue, Promise, Step,
};

#[test]
fn handlers_never_run_synchronously() {
    let queue = MicrotaskQueue::new();
    let ran = Rc::new(RefCell::new(false));

    let p: Promise<u8, u8> = Promise::succeed(queue.clone(), 1);
    let flag = Rc::clone(&ran);
    p.success(move |v| {
        *flag.borrow_mut() = true;
        Step::Success(v)
    });

    // settled before registration, yet nothing may run until the queue turns
    assert!(!*ran.borrow());
    assert!(queue.pending() > 0);
    queue.run_until_idle();
    assert!(*ran.borrow());
}

#[test]
fn settlement_after_registration_defers_too() {
    let queue = MicrotaskQueue::new();
    let ran = Rc::new(RefCell::new(false));

    let (p, r) = Promise::<u8, u8>::deferred(queue.clone());
    let flag = Rc::clone(&ran);
    p.success(move |v| {
        *flag.borrow_mut() = true;
        Step::Success(v)
    });
    queue.run_until_idle();
    assert!(!*ran.borrow());

    r.succeed(1);
    assert!(!*ran.borrow());
    queue.run_until_idle();
    assert!(*ran.borrow());
}

#[test]
fn whole_settled_chain_drains_in_one_turn() {
    let queue = MicrotaskQueue::new();
    let order = Rc::new(RefCell::new(Vec::new()));

    let p: Promise<u8, u8> = Promise::succeed(queue.clone(), 0);
    let mut chain = p;
    for n in 1..=3u8 {
        let order = Rc::clone(&order);
        chain = chain.success(move |v| {
            order.borrow_mut().push(n);
            Step::Success(v + 1)
        });
    }

    queue.run_until_idle();
    assert_eq!(*order.borrow(), vec![1, 2, 3]);
    assert_eq!(queue.pending(), 0);
}

#[test]
fn unhandled_error_is_reported_once() {
    let queue = MicrotaskQueue::new();
    let reports = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&reports);
    set_unhandled_error_hook(move |d| sink.borrow_mut().push(d.to_string()));

    let _p: Promise<u8, u8> = Promise::throw(queue.clone(), Defect::msg("boom"));
    queue.run_until_idle();
    queue.run_until_idle();
    assert_eq!(*reports.borrow(), vec!["boom"]);

    clear_unhandled_error_hook();
}

#[test]
fn handled_error_is_not_reported() {
    let queue = MicrotaskQueue::new();
    let reports = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&reports);
    set_unhandled_error_hook(move |_| *sink.borrow_mut() += 1);

    let p: Promise<u8, u8> = Promise::throw(queue.clone(), Defect::msg("caught below"));
    p.catch(|_| Step::Success(0));
    queue.run_until_idle();
    assert_eq!(*reports.borrow(), 0);

    clear_unhandled_error_hook();
}

#[test]
fn defect_passing_through_a_chain_reports_once_at_the_end() {
    let queue = MicrotaskQueue::new();
    let reports = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&reports);
    set_unhandled_error_hook(move |d| sink.borrow_mut().push(d.to_string()));

    let p: Promise<u8, u8> = Promise::throw(queue.clone(), Defect::msg("leaked"));
    // the success link passes the defect through; only the chain end is bare
    let _tail = p.success(|v| Step::Success(v + 1));
    queue.run_until_idle();
    assert_eq!(*reports.borrow(), vec!["leaked"]);

    clear_unhandled_error_hook();
}

#[test]
fn late_registration_on_reported_promise_still_dispatches() {
    let queue = MicrotaskQueue::new();
    let reports = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&reports);
    set_unhandled_error_hook(move |d| sink.borrow_mut().push(d.to_string()));

    let p: Promise<u8, u8> = Promise::throw(queue.clone(), Defect::msg("late"));
    queue.run_until_idle();
    assert_eq!(*reports.borrow(), vec!["late"]);

    // a handler attached after the report still observes the defect
    let caught = Rc::new(RefCell::new(Vec::new()));
    let got = Rc::clone(&caught);
    p.catch(move |d| {
        got.borrow_mut().push(d.to_string());
        Step::Success(0)
    });
    queue.run_until_idle();
    assert_eq!(*caught.borrow(), vec!["late"]);
    assert_eq!(*reports.borrow(), vec!["late"]);

    clear_unhandled_error_hook();
}

#[test]
fn each_settlement_dispatches_queue_exactly_once() {
    let queue = MicrotaskQueue::new();
    let hits = Rc::new(RefCell::new(0));

    let (p, r) = Promise::<u8, u8>::deferred(queue.clone());
    let count = Rc::clone(&hits);
    p.success(move |v| {
        *count.borrow_mut() += 1;
        Step::Success(v)
    });

    r.succeed(1);
    r.succeed(2);
    r.fail(3);
    queue.run_until_idle();
    assert_eq!(*hits.borrow(), 1);
}
