#![no_main]

use libfuzzer_sys::fuzz_target;
use scope_inject::{Injection, RecursionPolicy, Scope};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const ALIASES: [&str; 4] = ["a", "b", "c", "d"];

fuzz_target!(|data: &[u8]| {
    let scope = Scope::new();
    let calls = Arc::new(AtomicUsize::new(0));

    for chunk in data.chunks(2) {
        let op = chunk[0] % 6;
        let alias = ALIASES[(chunk.get(1).copied().unwrap_or(0) % 4) as usize];

        match op {
            0 => {
                // Attach with options derived from the input
                let flags = chunk.get(1).copied().unwrap_or(0);
                let counter = calls.clone();
                let _ = Injection::new(move || Ok(counter.fetch_add(1, Ordering::SeqCst)))
                    .once(flags & 0x10 != 0)
                    .dynamic(flags & 0x20 != 0)
                    .assign_to(&[alias, ALIASES[(flags as usize >> 6) % 4]], &scope);
            }
            1 => {
                let _ = scope.get::<usize>(alias);
            }
            2 => {
                scope.insert(alias, 0usize);
            }
            3 => {
                scope.remove(alias);
            }
            4 => {
                if let Some(early) = scope.peek(alias) {
                    let _ = early.inject();
                }
            }
            _ => {
                // Self-referencing factory under either policy
                let inner = scope.clone();
                let policy = if chunk.len() > 1 && chunk[1] & 1 == 1 {
                    RecursionPolicy::Strict
                } else {
                    RecursionPolicy::Lenient
                };
                let _ = Injection::new(move || Ok(*inner.get_or::<usize>(alias, 0)?))
                    .recursion(policy)
                    .assign_to(&[alias], &scope);
            }
        }
    }

    // A plain value must never be observed as a placeholder
    for alias in ALIASES {
        if scope.is_materialized(alias) {
            assert!(scope.peek(alias).is_none());
        }
    }
});
