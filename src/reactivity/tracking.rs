// ============================================================================
// spark-resettable - Dependency Tracking
// Recording reads and propagating writes through the graph
// ============================================================================
//
// Every function here follows the same borrow discipline: copy the edge list
// out of its RefCell first, then walk the copy. Walking a live borrow while
// marking or rescheduling nodes would panic as soon as a reaction touches the
// same list.
// ============================================================================

use std::rc::Rc;

use crate::core::constants::*;
use crate::core::context::with_context;
use crate::core::types::{AnyReaction, AnySource};
use crate::primitives::derived::update_derived_chain;
use crate::reactivity::scheduling::schedule_effect;

// =============================================================================
// READS
// =============================================================================

/// Record a read of `source` against the active reaction, if any.
pub fn track_read(source: Rc<dyn AnySource>) {
    let reaction = with_context(|ctx| {
        if ctx.is_untracking() {
            None
        } else {
            ctx.active_reaction()
        }
    });
    let Some(reaction) = reaction else {
        return;
    };

    if reaction.flags() & REACTION_IS_UPDATING != 0 {
        // One edge per source per run. A matching stamp means this run
        // already collected it; otherwise a nested run may have stamped it
        with_context(|ctx| {
            let run = ctx.read_version();
            if source.read_version() == run {
                return;
            }
            source.set_read_version(run);
            if !ctx.has_new_dep(&source) {
                ctx.push_new_dep(source.clone());
            }
        });
    } else {
        reaction.deps().push(source.clone());
        source.reactions().push(Rc::downgrade(&reaction));
    }
}

// =============================================================================
// WRITES
// =============================================================================

/// Stamp `source` with a fresh write version and invalidate its dependents.
///
/// # Panics
///
/// When called while a derived is computing. Deriveds must stay pure.
pub fn notify_write(source: Rc<dyn AnySource>) {
    let inside_derived = with_context(|ctx| {
        source.set_write_version(ctx.next_write_version());
        ctx.active_reaction()
            .is_some_and(|r| r.flags() & DERIVED != 0 && r.flags() & REACTION_IS_UPDATING != 0)
    });

    if inside_derived {
        panic!(
            "Cannot write to signals inside a derived. \
             Deriveds should be pure computations with no side effects."
        );
    }

    mark_reactions(source, DIRTY);
}

/// Mark every reaction downstream of `source`.
///
/// Direct dependents get `status`; anything behind a derived gets
/// MAYBE_DIRTY since the derived may recompute to the same value. Effects
/// that were clean before this call are scheduled once the walk is done.
pub fn mark_reactions(source: Rc<dyn AnySource>, status: u32) {
    let mut to_schedule: Vec<Rc<dyn AnyReaction>> = Vec::new();
    let mut stack: Vec<(Rc<dyn AnySource>, u32)> = vec![(source, status)];

    while let Some((current, status)) = stack.pop() {
        for reaction in current.reactions().snapshot() {
            let flags = reaction.flags();
            if flags & DESTROYED != 0 {
                continue;
            }

            let was_dirty = flags & DIRTY != 0;
            if !was_dirty {
                reaction.set_status(status);
            }

            if flags & DERIVED != 0 {
                if let Some(as_source) = reaction.as_derived_source() {
                    stack.push((as_source, MAYBE_DIRTY));
                }
            } else if flags & EFFECT != 0 && !was_dirty {
                to_schedule.push(reaction);
            }
        }
    }

    for effect in to_schedule {
        schedule_effect(effect);
    }
}

/// Whether a reaction has to rerun.
///
/// DIRTY always reruns. MAYBE_DIRTY first brings every stale derived dep up
/// to date and reruns only if some dep was written after the reaction's last
/// run; otherwise the reaction is marked CLEAN again.
pub fn is_dirty(reaction: &dyn AnyReaction) -> bool {
    let flags = reaction.flags();
    if flags & DIRTY != 0 {
        return true;
    }
    if flags & MAYBE_DIRTY == 0 {
        return false;
    }

    let since = reaction.run_version();
    for dep in reaction.deps().snapshot() {
        if dep.flags() & DERIVED != 0 {
            update_derived_chain(dep.clone());
        }
        if dep.write_version() > since {
            return true;
        }
    }

    reaction.set_status(CLEAN);
    false
}

// =============================================================================
// EDGE MAINTENANCE
// =============================================================================

/// Disconnect `reaction` from its deps at positions `start..`.
pub fn remove_reactions(reaction: &Rc<dyn AnyReaction>, start: usize) {
    for dep in reaction.deps().split_off(start) {
        dep.reactions().remove(reaction);
    }
}

/// Replace the deps of `reaction` with the ones collected during its run.
pub fn install_dependencies(reaction: &Rc<dyn AnyReaction>, new_deps: Vec<Rc<dyn AnySource>>) {
    remove_reactions(reaction, 0);
    for dep in new_deps {
        dep.reactions().push(Rc::downgrade(reaction));
        reaction.deps().push(dep);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{DepList, SourceInner};
    use std::any::Any;
    use std::cell::Cell;

    /// Bare reaction that only records status changes.
    struct Probe {
        flags: Cell<u32>,
        deps: DepList,
    }

    impl Probe {
        fn new(kind: u32) -> Rc<dyn AnyReaction> {
            Rc::new(Self {
                flags: Cell::new(kind | CLEAN),
                deps: DepList::default(),
            })
        }
    }

    impl AnyReaction for Probe {
        fn flags(&self) -> u32 {
            self.flags.get()
        }

        fn set_flags(&self, flags: u32) {
            self.flags.set(flags);
        }

        fn deps(&self) -> &DepList {
            &self.deps
        }

        fn update(&self) -> bool {
            self.set_status(CLEAN);
            false
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_derived_source(&self) -> Option<Rc<dyn AnySource>> {
            None
        }
    }

    fn with_active<R>(reaction: &Rc<dyn AnyReaction>, f: impl FnOnce() -> R) -> R {
        let prev = with_context(|ctx| ctx.set_active_reaction(Some(Rc::downgrade(reaction))));
        let out = f();
        with_context(|ctx| ctx.set_active_reaction(prev));
        out
    }

    #[test]
    fn read_outside_reaction_is_not_tracked() {
        let source: Rc<dyn AnySource> = Rc::new(SourceInner::new(1));
        track_read(source.clone());
        assert!(source.reactions().is_empty());
    }

    #[test]
    fn read_inside_reaction_links_both_sides() {
        let source: Rc<dyn AnySource> = Rc::new(SourceInner::new(1));
        let reaction = Probe::new(EFFECT);

        with_active(&reaction, || track_read(source.clone()));

        assert_eq!(reaction.deps().len(), 1);
        assert_eq!(source.reactions().len(), 1);
    }

    #[test]
    fn untracked_read_is_ignored() {
        let source: Rc<dyn AnySource> = Rc::new(SourceInner::new(1));
        let reaction = Probe::new(EFFECT);

        with_active(&reaction, || {
            let prev = with_context(|ctx| ctx.set_untracking(true));
            track_read(source.clone());
            with_context(|ctx| ctx.set_untracking(prev));
        });

        assert!(reaction.deps().is_empty());
    }

    #[test]
    fn repeated_reads_in_one_run_are_deduplicated() {
        let source: Rc<dyn AnySource> = Rc::new(SourceInner::new(1));
        let reaction = Probe::new(EFFECT);
        reaction.set_flags(reaction.flags() | REACTION_IS_UPDATING);

        with_active(&reaction, || {
            let saved = with_context(|ctx| {
                ctx.next_read_version();
                ctx.swap_new_deps(Vec::new())
            });
            track_read(source.clone());
            track_read(source.clone());
            assert_eq!(with_context(|ctx| ctx.new_dep_count()), 1);
            with_context(|ctx| ctx.swap_new_deps(saved));
        });
    }

    #[test]
    fn mark_reactions_never_downgrades_dirty() {
        let source: Rc<dyn AnySource> = Rc::new(SourceInner::new(1));
        let reaction = Probe::new(DERIVED);
        source.reactions().push(Rc::downgrade(&reaction));

        reaction.set_status(DIRTY);
        mark_reactions(source, MAYBE_DIRTY);
        assert!(reaction.is_dirty());
    }

    #[test]
    fn write_marks_every_dependent() {
        let source: Rc<dyn AnySource> = Rc::new(SourceInner::new(1));
        let reactions: Vec<_> = (0..5).map(|_| Probe::new(DERIVED)).collect();
        for r in &reactions {
            source.reactions().push(Rc::downgrade(r));
        }

        notify_write(source);

        assert!(reactions.iter().all(|r| r.is_dirty()));
    }

    #[test]
    fn remove_reactions_unlinks_tail() {
        let a: Rc<dyn AnySource> = Rc::new(SourceInner::new(1));
        let b: Rc<dyn AnySource> = Rc::new(SourceInner::new(2));
        let reaction = Probe::new(EFFECT);
        install_dependencies(&reaction, vec![a.clone(), b.clone()]);
        assert_eq!(b.reactions().len(), 1);

        remove_reactions(&reaction, 1);

        assert_eq!(reaction.deps().len(), 1);
        assert_eq!(a.reactions().len(), 1);
        assert!(b.reactions().is_empty());
    }

    #[test]
    fn maybe_dirty_reruns_only_for_newer_deps() {
        let source: Rc<dyn AnySource> = Rc::new(SourceInner::new(1));
        let reaction = Probe::new(EFFECT);
        install_dependencies(&reaction, vec![source.clone()]);
        assert!(!is_dirty(&*reaction));

        reaction.set_status(MAYBE_DIRTY);
        assert!(!is_dirty(&*reaction));
        assert!(reaction.is_clean());

        source.set_write_version(with_context(|ctx| ctx.next_write_version()));
        reaction.set_status(MAYBE_DIRTY);
        assert!(is_dirty(&*reaction));

        reaction.set_status(DIRTY);
        assert!(is_dirty(&*reaction));
    }

    #[test]
    fn maybe_dirty_effect_skips_unchanged_derived() {
        use crate::primitives::derived::derived;
        use crate::primitives::effect::effect;
        use crate::primitives::signal::signal;

        let n = signal(2);
        let parity = derived({
            let n = n.clone();
            move || n.get() % 2
        });
        let runs = Rc::new(Cell::new(0));
        let _e = effect({
            let (parity, runs) = (parity.clone(), runs.clone());
            move || {
                parity.get();
                runs.set(runs.get() + 1);
            }
        });

        n.set(4);
        assert_eq!(runs.get(), 1);
        n.set(5);
        assert_eq!(runs.get(), 2);
    }
}
