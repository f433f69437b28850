use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tempfile::TempDir;

use voxloop::conversation::{ConversationManager, Message, Role, SessionStore};

/// Benchmark the retention policy on a log held at its cap
fn benchmark_append_at_cap(c: &mut Criterion) {
    c.bench_function("append_at_cap", |b| {
        let store = SessionStore::new(std::env::temp_dir().join("voxloop_bench_unused"));
        let mut manager = ConversationManager::open(store, "bench", 10, false);
        manager.append(Role::System, "You are a helpful assistant.");

        b.iter(|| {
            manager.append(Role::User, black_box("benchmark message"));
        });
    });
}

/// Benchmark one full persistence cycle of a capped log
fn benchmark_save_load_round_trip(c: &mut Criterion) {
    c.bench_function("save_load_round_trip", |b| {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::new(temp_dir.path().to_path_buf());
        let log: Vec<Message> = (0..10)
            .map(|i| {
                if i % 2 == 0 {
                    Message::user(format!("question {}", i))
                } else {
                    Message::assistant(format!("answer {}", i))
                }
            })
            .collect();

        b.iter(|| {
            store.save("bench", &log).unwrap();
            black_box(store.load("bench"));
        });
    });
}

/// Benchmark opening a session that already has a record on disk
fn benchmark_open_existing_session(c: &mut Criterion) {
    c.bench_function("open_existing_session", |b| {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::new(temp_dir.path().to_path_buf());
        let log: Vec<Message> = (0..50)
            .map(|i| Message::user(format!("message {}", i)))
            .collect();
        store.save("bench", &log).unwrap();

        b.iter(|| {
            let store = SessionStore::new(temp_dir.path().to_path_buf());
            black_box(ConversationManager::open(store, "bench", 100, false));
        });
    });
}

criterion_group!(
    benches,
    benchmark_append_at_cap,
    benchmark_save_load_round_trip,
    benchmark_open_existing_session
);
criterion_main!(benches);
