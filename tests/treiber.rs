use std::{
    error::Error,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

use elimination_stack::treiber::{Node, TreiberStack};

fn worker(num_inserts: u64, n: u64, stack: &TreiberStack<u64>, total: &AtomicU64) {
    let mut count = 0;
    for i in 0..num_inserts {
        stack.push(n * num_inserts + i);
        if i % 17 == 0 {
            while stack.pop().is_some() {
                count += 1;
            }
        }
    }
    while stack.pop().is_some() {
        count += 1;
    }
    total.fetch_add(count, Ordering::SeqCst);
}

const NUM_THREADS: u64 = 32;
const NUM_INSERTS: u64 = 10000;

#[test]
fn test_stack() {
    use std::thread;
    let stack: TreiberStack<u64> = Default::default();
    assert_eq!(stack.pop(), None);
    let total = AtomicU64::new(0);
    let start = Instant::now();
    thread::scope(|s| {
        for n in 0..NUM_THREADS {
            let stack = &stack;
            let total = &total;
            s.spawn(move || {
                worker(NUM_INSERTS, n, stack, total);
            });
        }
    });
    assert_eq!(total.load(Ordering::SeqCst), NUM_THREADS * NUM_INSERTS);
    assert_eq!(stack.pop(), None);
    let duration = start.elapsed().as_micros();
    println!("time elapsed (usec) {duration}");
}

#[test]
fn test_try_ops() {
    let stack = TreiberStack::new();
    assert_eq!(stack.try_pop(), Ok(None));
    assert!(stack.try_push(Node::boxed(1)).is_ok());
    assert!(stack.try_push(Node::boxed(2)).is_ok());
    // Uncontended attempts never lose a race.
    assert_eq!(stack.try_pop(), Ok(Some(2)));
    assert_eq!(stack.try_pop(), Ok(Some(1)));
    assert_eq!(stack.try_pop(), Ok(None));
}

#[test]
fn test_drop_releases_values() {
    let counter = Arc::new(());
    {
        let stack = TreiberStack::new();
        for _ in 0..100 {
            stack.push(counter.clone());
        }
        for _ in 0..30 {
            assert!(stack.pop().is_some());
        }
        assert_eq!(Arc::strong_count(&counter), 71);
    }
    assert_eq!(Arc::strong_count(&counter), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_tokio_stack() -> Result<(), Box<dyn Error>> {
    let stack = Arc::new(TreiberStack::<u64>::default());
    let total = Arc::new(AtomicU64::new(0));
    let mut workers = vec![];
    for n in 0..NUM_THREADS {
        let stack = stack.clone();
        let total = total.clone();
        workers.push(tokio::spawn(async move {
            worker(NUM_INSERTS, n, &stack, &total);
        }));
    }
    for w in workers {
        w.await?;
    }
    assert_eq!(total.load(Ordering::SeqCst), NUM_THREADS * NUM_INSERTS);
    Ok(())
}
