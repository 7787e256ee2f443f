use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use robguide_scan::{DifferencedScan, ScanBuffer, ScanLine};

const PUBLISHES: u64 = 20_000;
const READERS: usize = 4;
const LINE_LEN: usize = 1280;

// left carries the publish index, right carries its complement
fn marked_scan(index: u64) -> DifferencedScan {
    let marker = (index % 256) as u8;
    DifferencedScan::new(
        ScanLine::from_value(LINE_LEN, marker),
        ScanLine::from_value(LINE_LEN, 255 - marker),
    )
    .unwrap()
}

#[test]
fn concurrent_readers_never_see_mixed_pairs() {
    let buffer = ScanBuffer::new();
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let mut reader = buffer.reader();
            let done = done.clone();
            thread::spawn(move || {
                let mut seen = 0u64;
                let mut last = 0u64;
                loop {
                    let finished = done.load(Ordering::SeqCst);
                    while let Some(snapshot) = reader.poll() {
                        assert!(snapshot.sequence > last, "version observed twice");
                        last = snapshot.sequence;

                        let left = snapshot.scan.left().as_slice();
                        let right = snapshot.scan.right().as_slice();
                        let marker = ((snapshot.sequence - 1) % 256) as u8;
                        assert!(left.iter().all(|&v| v == marker));
                        assert!(right.iter().all(|&v| v == 255 - marker));
                        seen += 1;
                    }
                    if finished {
                        break;
                    }
                    thread::yield_now();
                }
                (seen, last)
            })
        })
        .collect();

    for index in 0..PUBLISHES {
        let published = buffer.publish(marked_scan(index));
        assert_eq!(published.sequence, index + 1);
    }
    done.store(true, Ordering::SeqCst);

    for handle in readers {
        let (seen, last) = handle.join().unwrap();
        assert!((1..=PUBLISHES).contains(&seen));
        assert_eq!(last, PUBLISHES);
    }
}
