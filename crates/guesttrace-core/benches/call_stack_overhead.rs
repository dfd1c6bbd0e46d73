//! Benchmarks for call-stack tracking overhead

use criterion::{Criterion, criterion_group, criterion_main};
use guesttrace_core::{NullSink, RingSink, TagAllocator, ThreadContext, Tracer, TracerConfig};

fn bench_tag_allocation(c: &mut Criterion) {
    let tags = TagAllocator::new();

    c.bench_function("next_tag", |b| {
        b.iter(|| tags.next_tag(std::hint::black_box(3)))
    });
}

fn bench_enter_exit(c: &mut Criterion) {
    let Ok(tracer) = Tracer::new(TracerConfig::default(), NullSink) else {
        return;
    };
    let Ok(mut core) = tracer.core_context(0) else {
        return;
    };
    let mut thread = ThreadContext::new(1, 1, "bench");

    c.bench_function("enter_exit_null_sink", |b| {
        b.iter(|| {
            let _ = tracer.enter(&mut core, &mut thread, std::hint::black_box(0x1000));
            let _ = tracer.exit(&mut core, &mut thread);
        })
    });
}

fn bench_interrupt_nesting(c: &mut Criterion) {
    let Ok(tracer) = Tracer::new(TracerConfig::default(), NullSink) else {
        return;
    };
    let Ok(mut core) = tracer.core_context(1) else {
        return;
    };
    let mut thread = ThreadContext::new(7, 7, "bench");
    let _ = tracer.enter(&mut core, &mut thread, 0x2000);

    c.bench_function("irq_enter_exit_over_thread", |b| {
        b.iter(|| {
            let _ = tracer.irq_enter(&mut core, Some(&thread), std::hint::black_box(0xfee0));
            let _ = tracer.irq_exit(&mut core, Some(&thread));
        })
    });
}

fn bench_ring_sink(c: &mut Criterion) {
    let Ok(tracer) = Tracer::new(TracerConfig::default(), RingSink::with_capacity(1 << 14)) else {
        return;
    };
    let Ok(mut core) = tracer.core_context(2) else {
        return;
    };
    let mut thread = ThreadContext::new(9, 9, "bench");

    c.bench_function("enter_exit_ring_sink", |b| {
        b.iter(|| {
            let _ = tracer.enter(&mut core, &mut thread, std::hint::black_box(0x3000));
            let _ = tracer.exit(&mut core, &mut thread);
            if tracer.sink().len() > 1 << 13 {
                drop(tracer.sink().drain());
            }
        })
    });
}

criterion_group!(
    benches,
    bench_tag_allocation,
    bench_enter_exit,
    bench_interrupt_nesting,
    bench_ring_sink
);
criterion_main!(benches);
