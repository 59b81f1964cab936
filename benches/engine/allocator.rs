//! Benchmarks for voice allocation.

use std::hint::black_box;

use criterion::Criterion;
use fmtg::{engine::queue::StandbyQueues, synth::VoiceAllocator};

pub fn bench_allocator(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/allocator");

    // Free pool: note-on then note-off, no stealing
    group.bench_function("on_off", |b| {
        let mut alloc = VoiceAllocator::new(6, 3, 1, 48_000);
        let mut queues = StandbyQueues::new(2, 64);
        b.iter(|| {
            alloc.note_on(black_box(60), 100, 0, &mut queues);
            alloc.note_off(black_box(60), 0, 0, &mut queues);
            for w in 0..2 {
                if let Some(q) = queues.get_mut(w) {
                    let batch = q.swap();
                    q.recycle(batch);
                }
            }
        })
    });

    // Full pool: every note-on steals the oldest voice
    group.bench_function("steal", |b| {
        let mut alloc = VoiceAllocator::new(6, 3, 1, 48_000);
        let mut queues = StandbyQueues::new(2, 64);
        for note in 48..54 {
            alloc.note_on(note, 100, 0, &mut queues);
        }
        let mut note = 54u8;
        b.iter(|| {
            alloc.note_on(black_box(note), 100, 0, &mut queues);
            note = if note >= 100 { 54 } else { note + 1 };
            for w in 0..2 {
                if let Some(q) = queues.get_mut(w) {
                    let batch = q.swap();
                    q.recycle(batch);
                }
            }
        })
    });

    group.finish();
}
