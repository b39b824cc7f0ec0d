//! Guarded handles observing a framework-owned widget end to end:
//! copies, moves, clears, and polling threads that watch the owner
//! destroy it mid-poll.

use std::thread;
use std::time::Duration;

use tether::Tether;
use tether_test_utils::{DropCounter, TrackedWidget};

fn main() {
    let drops = DropCounter::new();
    let widget = TrackedWidget::pinned(7, &drops);

    let handle = Tether::bind(widget.as_ref());
    println!(
        "bound:        alive={} refs={}",
        handle.is_alive(),
        handle.ref_count()
    );

    {
        let mut scratch = Tether::bind(widget.as_ref());
        println!(
            "second bind:  alive={} refs={}",
            scratch.is_alive(),
            scratch.ref_count()
        );

        scratch.clear();
        println!(
            "cleared:      alive={} refs={}",
            scratch.is_alive(),
            handle.ref_count()
        );

        scratch.rebind(widget.as_ref());
        let copy = scratch.clone();
        let moved = scratch.take();
        println!(
            "after move:   source alive={} dest alive={} refs={}",
            scratch.is_alive(),
            moved.is_alive(),
            moved.ref_count()
        );
        drop(copy);
    }
    println!("scope closed: refs={}", handle.ref_count());

    let pollers: Vec<_> = (0..4)
        .map(|id| {
            let mine = handle.clone();
            thread::spawn(move || {
                while mine.is_alive() {
                    thread::yield_now();
                }
                println!("poller {id} saw the target die (refs={})", mine.ref_count());
            })
        })
        .collect();

    thread::sleep(Duration::from_millis(50));
    println!("destroying:   refs={}", handle.ref_count());
    drop(widget);

    for poller in pollers {
        poller.join().unwrap();
    }
    println!(
        "after death:  alive={} refs={} widgets destroyed={}",
        handle.is_alive(),
        handle.ref_count(),
        drops.count()
    );
}
