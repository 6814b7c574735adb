use spark_resettable::{
    effect, effect_scope, effect_with_cleanup, on_scope_dispose, signal, use_resettable, watch,
    AnySource, ResettableOptions, WatchOptions,
};
use std::cell::Cell;
use std::rc::Rc;

fn subscribers(source: &Rc<dyn AnySource>) -> usize {
    source.reactions().len()
}

#[test]
fn test_effect_drop_runs_teardown() {
    let cleanup_called = Rc::new(Cell::new(false));

    {
        let flag = cleanup_called.clone();
        let _effect = effect_with_cleanup(move || {
            let flag = flag.clone();
            Some(Box::new(move || flag.set(true)))
        });
        // No scope and no parent: this handle is the only owner
    }

    assert!(cleanup_called.get(), "dropping the only handle runs the teardown");
}

#[test]
fn test_effect_clone_keeps_it_alive() {
    let source = signal(0);
    let runs = Rc::new(Cell::new(0));

    let first = effect({
        let (source, runs) = (source.clone(), runs.clone());
        move || {
            source.get();
            runs.set(runs.get() + 1);
        }
    });
    let second = first.clone();

    drop(first);
    source.set(1);
    assert_eq!(runs.get(), 2);

    drop(second);
    source.set(2);
    assert_eq!(runs.get(), 2);
}

#[test]
fn test_watch_handle_drop_unsubscribes() {
    let source = signal(0);
    let handle = watch(
        &source,
        |_: &i32, _: Option<&i32>| {},
        WatchOptions::default(),
    );
    assert_eq!(subscribers(&source.as_any_source()), 1);

    drop(handle);
    assert_eq!(subscribers(&source.as_any_source()), 0);
}

#[test]
fn test_resettable_drop_stops_watching() {
    let source = signal(vec![1]);
    let erased = source.as_any_source();

    {
        let state = use_resettable(
            source.peek(),
            ResettableOptions::default().watch_source(&source),
        )
        .unwrap();
        let clone = state.clone();
        assert_eq!(subscribers(&erased), 1);

        drop(state);
        assert_eq!(subscribers(&erased), 1, "a clone still holds the tracker");

        source.set(vec![2]);
        assert_eq!(clone.value().get(), vec![2]);
    }

    assert_eq!(subscribers(&erased), 0);
    source.set(vec![3]);
}

#[test]
fn test_resettable_in_scope_is_dropped_with_scope() {
    let source = signal(1);
    let erased = source.as_any_source();

    {
        let scope = effect_scope(false);
        let state = scope
            .run(|| {
                use_resettable(
                    source.peek(),
                    ResettableOptions::default().watch_source(&source),
                )
            })
            .unwrap()
            .unwrap();

        // The last tracker handle stops its watcher even inside a live scope
        drop(state);
        assert_eq!(subscribers(&erased), 0);
        scope.stop();
    }

    let scope = effect_scope(false);
    let kept = scope
        .run(|| {
            use_resettable(
                source.peek(),
                ResettableOptions::default().watch_source(&source),
            )
        })
        .unwrap()
        .unwrap();
    assert_eq!(subscribers(&erased), 1);

    drop(scope);
    assert_eq!(subscribers(&erased), 0);
    assert!(!kept.is_watching());
}

#[test]
fn test_scope_drop_runs_cleanups_in_reverse() {
    let order = Rc::new(std::cell::RefCell::new(Vec::new()));

    {
        let scope = effect_scope(false);
        scope.run(|| {
            for i in 0..3 {
                let order = order.clone();
                on_scope_dispose(move || order.borrow_mut().push(i));
            }
        });
    }

    assert_eq!(*order.borrow(), vec![2, 1, 0]);
}

#[test]
fn test_child_effect_dies_with_parent() {
    let source = signal(0);
    let child_runs = Rc::new(Cell::new(0));

    let parent = effect({
        let (source, child_runs) = (source.clone(), child_runs.clone());
        move || {
            let (source, child_runs) = (source.clone(), child_runs.clone());
            // Owned by the parent, so dropping the handle here is fine
            drop(effect(move || {
                source.get();
                child_runs.set(child_runs.get() + 1);
            }));
        }
    });

    source.set(1);
    assert_eq!(child_runs.get(), 2);

    parent.dispose();
    source.set(2);
    assert_eq!(child_runs.get(), 2);
}
