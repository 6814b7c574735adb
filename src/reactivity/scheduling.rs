// ============================================================================
// spark-resettable - Effect Scheduling
// ============================================================================
//
// There is no microtask queue to defer to, so dirty effects run synchronously
// right after the write that dirtied them. Inside a batch, or while a flush is
// already running, they are queued and picked up by the outer flush.
// ============================================================================

use std::rc::Rc;

use crate::core::constants::*;
use crate::core::context::with_context;
use crate::core::types::AnyReaction;
use crate::reactivity::tracking::is_dirty;

/// Flush iterations before an effect is assumed to retrigger itself forever.
const MAX_FLUSH_COUNT: u32 = 1000;

/// Queue an effect and flush unless a batch or flush is in progress.
pub fn schedule_effect(effect: Rc<dyn AnyReaction>) {
    let run_now = with_context(|ctx| {
        ctx.push_pending(Rc::downgrade(&effect));
        !ctx.is_batching() && !ctx.is_flushing()
    });

    if run_now {
        flush_sync();
    }
}

/// Run queued effects until the queue stays empty.
///
/// # Panics
///
/// After `MAX_FLUSH_COUNT` rounds, which means some effect keeps writing to a
/// signal it depends on.
pub fn flush_sync() {
    let was_flushing = with_context(|ctx| ctx.set_flushing(true));

    // Restores the flag even if an effect panics mid-flush
    struct FlushGuard(bool);

    impl Drop for FlushGuard {
        fn drop(&mut self) {
            with_context(|ctx| ctx.set_flushing(self.0));
        }
    }

    let _guard = FlushGuard(was_flushing);

    for _ in 0..MAX_FLUSH_COUNT {
        let pending = with_context(|ctx| ctx.take_pending());
        if pending.is_empty() {
            return;
        }

        for reaction in pending.iter().filter_map(|w| w.upgrade()) {
            let flags = reaction.flags();
            if flags & (INERT | DESTROYED) != 0 || flags & EFFECT == 0 {
                continue;
            }
            if is_dirty(&*reaction) {
                reaction.update();
            }
        }
    }

    tracing::error!(
        rounds = MAX_FLUSH_COUNT,
        "effect flush did not settle, an effect keeps retriggering itself"
    );
    panic!(
        "Maximum update depth exceeded. This can happen when an effect \
         continuously triggers itself."
    );
}
