use crate::test_support::{call_log, entries, recorder, CallLog, Probe};
use crate::{CollectionError, DomainObjectCollection};
use std::rc::Rc;

type Names = DomainObjectCollection<&'static str>;

#[test]
fn configure_each_waits_for_something_else_to_realize() {
    let log = call_log();
    let events = call_log();
    let names = Names::new();
    names.configure_each(recorder(&events, "configure"));
    names.add_later(Probe::new(&log, "p1", "a")).unwrap();

    assert!(entries(&events).is_empty());
    assert!(entries(&log).is_empty());

    assert_eq!(names.to_vec().unwrap(), vec!["a"]);
    assert_eq!(names.to_vec().unwrap(), vec!["a"]);
    assert_eq!(entries(&events), vec!["configure:a"]);
    assert_eq!(entries(&log), vec!["p1"]);
}

#[test]
fn configure_each_replays_realized_elements() {
    let log = call_log();
    let events = call_log();
    let names = Names::new();
    names.add("a");
    names.add_later(Probe::new(&log, "p1", "b")).unwrap();
    names.configure_each(recorder(&events, "configure"));

    assert_eq!(entries(&events), vec!["configure:a"]);
    names.add("c");
    assert_eq!(entries(&events), vec!["configure:a", "configure:c"]);
    assert!(entries(&log).is_empty());
}

#[test]
fn all_forces_pending_entries_and_later_providers() {
    let log = call_log();
    let events = call_log();
    let names = Names::new();
    names.add("a");
    names.add_later(Probe::new(&log, "p1", "b")).unwrap();
    names.all(recorder(&events, "all")).unwrap();

    assert_eq!(entries(&events), vec!["all:a", "all:b"]);
    assert_eq!(entries(&log), vec!["p1"]);
    assert_eq!(names.pending_len(), 0);

    names.add_later(Probe::new(&log, "p2", "c")).unwrap();
    assert_eq!(entries(&events), vec!["all:a", "all:b", "all:c"]);
    assert_eq!(entries(&log), vec!["p1", "p2"]);
}

#[test]
fn second_all_listener_does_not_realize_again() {
    let log = call_log();
    let events = call_log();
    let names = Names::new();
    names.add_later(Probe::new(&log, "p1", "a")).unwrap();
    names.all(recorder(&events, "first")).unwrap();
    names.all(recorder(&events, "second")).unwrap();

    assert_eq!(entries(&events), vec!["first:a", "second:a"]);
    assert_eq!(entries(&log), vec!["p1"]);
}

#[test]
fn all_listeners_fire_before_configure_each_for_one_realization() {
    let log = call_log();
    let events = call_log();
    let names = Names::new();
    names.configure_each(recorder(&events, "configure"));
    names.when_object_added(recorder(&events, "added"));
    names.all(recorder(&events, "all")).unwrap();

    names.add_later(Probe::new(&log, "p1", "a")).unwrap();
    names.add("b");
    assert_eq!(
        entries(&events),
        vec![
            "all:a",
            "configure:a",
            "added:a",
            "all:b",
            "configure:b",
            "added:b"
        ]
    );
}

#[test]
fn when_object_added_does_not_replay() {
    let events = call_log();
    let names = Names::new();
    names.add("a");
    names.when_object_added(recorder(&events, "added"));
    names.add("b");
    assert_eq!(entries(&events), vec!["added:b"]);
}

#[test]
fn removal_listeners_fire_in_registration_order() {
    let events = call_log();
    let names = Names::new();
    names.when_object_removed(recorder(&events, "first"));
    names.when_object_removed(recorder(&events, "second"));
    names.add("a");

    assert!(names.remove(&"a"));
    assert_eq!(entries(&events), vec!["first:a", "second:a"]);
}

#[test]
fn listener_registered_during_dispatch_fires_once() {
    let events = call_log();
    let names = Names::new();
    let registered = Rc::new(std::cell::Cell::new(false));
    {
        let names_for_listener = names.clone();
        let events = Rc::clone(&events);
        let registered = Rc::clone(&registered);
        names.configure_each(move |_: &&'static str| {
            if !registered.replace(true) {
                names_for_listener.configure_each(recorder(&events, "nested"));
            }
        });
    }

    names.add("a");
    names.add("b");
    assert_eq!(entries(&events), vec!["nested:a", "nested:b"]);
}

#[test]
fn all_listener_added_inside_all_listener_sees_each_element_once() {
    let log = call_log();
    let events = call_log();
    let names = Names::new();
    names.add_later(Probe::new(&log, "p1", "a")).unwrap();
    names.add_later(Probe::new(&log, "p2", "b")).unwrap();
    {
        let names_for_listener = names.clone();
        let events = Rc::clone(&events);
        let registered = Rc::new(std::cell::Cell::new(false));
        names
            .all(move |_: &&'static str| {
                if !registered.replace(true) {
                    names_for_listener
                        .all(recorder(&events, "inner"))
                        .unwrap();
                }
            })
            .unwrap();
    }

    assert_eq!(entries(&events), vec!["inner:a", "inner:b"]);
    assert_eq!(entries(&log), vec!["p1", "p2"]);
}

fn spawning_listener(names: &Names, log: &CallLog) -> impl Fn(&&'static str) + 'static {
    let names = names.clone();
    let log = Rc::clone(log);
    move |value: &&'static str| match *value {
        "a" => {
            names.add("x");
        }
        "b" => {
            names
                .add_later(Probe::new(&log, "p3", "y"))
                .unwrap();
        }
        _ => {}
    }
}

#[test]
fn elements_added_by_configure_each_extend_the_traversal() {
    let log = call_log();
    let names = Names::new();
    names.add_later(Probe::new(&log, "p1", "a")).unwrap();
    names.add_later(Probe::new(&log, "p2", "b")).unwrap();
    names.configure_each(spawning_listener(&names, &log));

    assert_eq!(names.to_vec().unwrap(), vec!["a", "x", "b", "y"]);
    assert_eq!(entries(&log), vec!["p1", "p2", "p3"]);
}

#[test]
fn all_propagates_provider_failures() {
    let log = call_log();
    let events = call_log();
    let names = Names::new();
    names.add_later(Probe::failing(&log, "p1", 1, "a")).unwrap();

    let error = names.all(recorder(&events, "all")).unwrap_err();
    assert!(matches!(error, CollectionError::Provider { .. }));
    assert!(entries(&events).is_empty());
    assert_eq!(names.pending_len(), 1);

    // The listener stays registered and sees the value once a retry succeeds.
    assert_eq!(names.to_vec().unwrap(), vec!["a"]);
    assert_eq!(entries(&events), vec!["all:a"]);
}

#[test]
fn eager_add_later_reports_failures_to_the_caller() {
    let log = call_log();
    let events = call_log();
    let names = Names::new();
    names.all(recorder(&events, "all")).unwrap();

    let error = names
        .add_later(Probe::failing(&log, "p1", 1, "a"))
        .unwrap_err();
    assert_eq!(error.provider_error().message(), "p1 failed");
    assert_eq!(names.len(), 1);
    assert!(names.contains(&"a").unwrap());
    assert_eq!(entries(&events), vec!["all:a"]);
}
