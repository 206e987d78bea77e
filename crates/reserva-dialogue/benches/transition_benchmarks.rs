//! Benchmarks for the dialogue transition hot path.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

use reserva_core::catalog::Catalog;
use reserva_dialogue::{DialogueEngine, SessionStore, SlotGenerator};

fn make_engine() -> DialogueEngine {
    DialogueEngine::new(
        Catalog::demo(),
        SlotGenerator::default(),
        SessionStore::new(30),
    )
}

fn bench_greeting_transition(c: &mut Criterion) {
    let engine = make_engine();
    c.bench_function("transition_greeting", |b| {
        b.iter(|| {
            let t = engine.transition(None, black_box("hola"));
            black_box(t.step)
        })
    });
}

fn bench_service_to_slots(c: &mut Criterion) {
    let engine = make_engine();
    c.bench_function("transition_service_to_slots", |b| {
        b.iter_batched(
            || {
                // Fresh conversation parked at service selection.
                engine
                    .transition(None, "quiero ver los servicios")
                    .conversation_id
            },
            |id| {
                let t = engine.transition(Some(id), black_box("Selecciono: Masaje Relajante"));
                black_box(t.reply)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_fallback(c: &mut Criterion) {
    let engine = make_engine();
    // Parked at service selection, where unresolved text stays put.
    let id = engine
        .transition(None, "quiero ver los servicios")
        .conversation_id;
    c.bench_function("transition_fallback", |b| {
        b.iter(|| {
            let t = engine.transition(Some(id), black_box("texto sin intención alguna"));
            black_box(t.reply)
        })
    });
}

criterion_group!(
    benches,
    bench_greeting_transition,
    bench_service_to_slots,
    bench_fallback
);
criterion_main!(benches);
