use std::sync::Arc;
use std::thread;
use voucher_ledger::testing::TestDbFile;
use voucher_ledger::{LedgerError, LedgerStore, StoreOptions};

#[test]
fn withdrawals_survive_a_restart() {
    let file = TestDbFile::random();

    let store = LedgerStore::open(&file.path).unwrap();
    assert_eq!(store.path(), file.path.as_path());
    assert_eq!(store.accumulate("v1", 0).unwrap(), 0);
    assert_eq!(store.accumulate("v1", 500).unwrap(), 500);
    assert_eq!(store.accumulate("v1", 300).unwrap(), 800);
    assert_eq!(store.peek("v1").unwrap(), 800);
    store.close().unwrap();
    drop(store);

    let store = LedgerStore::open(&file.path).unwrap();
    assert_eq!(store.peek("v1").unwrap(), 800);
    assert_eq!(store.peek("v2").unwrap(), 0);
    store.close().unwrap();
}

#[test]
fn total_is_sum_of_deltas_mod_2_pow_32() {
    let file = TestDbFile::random();
    let store = LedgerStore::open(&file.path).unwrap();

    let deltas = [u32::MAX, 7, 0, 1_000_000, u32::MAX / 2, 3];
    let mut last = 0;
    for d in deltas {
        last = store.accumulate("wrap", d).unwrap();
    }

    let expected = deltas.iter().fold(0u64, |acc, d| acc + u64::from(*d)) % (1u64 << 32);
    assert_eq!(u64::from(last), expected);
    assert_eq!(u64::from(store.peek("wrap").unwrap()), expected);
}

#[test]
fn overflow_wraps_to_zero() {
    let file = TestDbFile::random();
    let store = LedgerStore::open(&file.path).unwrap();
    store.accumulate("edge", 0xFFFF_FFFF).unwrap();
    assert_eq!(store.accumulate("edge", 1).unwrap(), 0);
}

#[test]
fn concurrent_increments_are_not_lost() {
    const THREADS: u32 = 16;
    const PER_THREAD: u32 = 25;

    let file = TestDbFile::random();
    let store = Arc::new(LedgerStore::open(&file.path).unwrap());

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let store = store.clone();
            thread::spawn(move || {
                let mut seen = 0;
                for _ in 0..PER_THREAD {
                    let total = store.accumulate("shared", 1).unwrap();
                    assert!(total > seen, "totals seen by one caller must increase");
                    seen = total;
                }
            })
        })
        .collect();

    // readers run alongside the writers and must only ever see progress
    let reader = {
        let store = store.clone();
        thread::spawn(move || {
            let mut last = 0;
            for _ in 0..200 {
                let now = store.peek("shared").unwrap();
                assert!(now >= last);
                last = now;
            }
        })
    };

    for h in handles {
        h.join().unwrap();
    }
    reader.join().unwrap();

    assert_eq!(store.peek("shared").unwrap(), THREADS * PER_THREAD);
}

#[test]
fn full_map_rolls_back_the_failed_write() {
    let file = TestDbFile::random();
    let store = LedgerStore::open_with(&file.path, &StoreOptions { map_size: 1024 * 1024 }).unwrap();
    store.accumulate("anchor", 42).unwrap();

    let key = |i: usize| format!("{:0>500}", i);
    let mut failed_at = None;
    for i in 0..100_000 {
        match store.accumulate(key(i), 1) {
            Ok(total) => assert_eq!(total, 1),
            Err(e) => {
                assert!(matches!(e, LedgerError::PersistFailed(_)), "unexpected error: {e}");
                failed_at = Some(i);
                break;
            }
        }
    }

    let failed_at = failed_at.expect("a 1 MiB map must fill up");
    assert_eq!(store.peek(key(failed_at)).unwrap(), 0);
    assert_eq!(store.peek(key(0)).unwrap(), 1);
    assert_eq!(store.peek("anchor").unwrap(), 42);
}

#[test]
fn garbage_file_is_unavailable() {
    let file = TestDbFile::random();
    std::fs::write(&file.path, vec![0xAB; 8192]).unwrap();
    assert!(matches!(LedgerStore::open(&file.path), Err(LedgerError::StoreUnavailable(_))));
}

#[test]
fn missing_parent_dir_is_created() {
    let dir = std::env::temp_dir().join(format!("voucher-ledger-dir-{}", uuid::Uuid::new_v4().simple()));
    let file = TestDbFile::in_dir(&dir);

    let store = LedgerStore::open(&file.path).unwrap();
    store.accumulate("v", 1).unwrap();
    store.close().unwrap();
    drop(file);

    std::fs::remove_dir(&dir).unwrap();
}
