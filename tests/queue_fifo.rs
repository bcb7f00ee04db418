use std::thread;

use proptest::prelude::*;
use tape_vt::Queue;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn single_producer_order_is_preserved(items in prop::collection::vec(any::<u32>(), 0..200)) {
        let queue = Queue::new();
        for item in &items {
            queue.push(*item);
        }
        queue.close();
        let mut received = Vec::new();
        while let Some(item) = queue.pop() {
            received.push(item);
        }
        prop_assert_eq!(received, items);
    }

    #[test]
    fn concurrent_producers_keep_their_own_order(
        counts in prop::collection::vec(0usize..100, 1..6),
    ) {
        let queue: Queue<(usize, usize)> = Queue::new();
        let handles: Vec<_> = counts
            .iter()
            .enumerate()
            .map(|(producer, &count)| {
                let queue = queue.clone();
                thread::spawn(move || {
                    for seq in 0..count {
                        queue.push((producer, seq));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        queue.close();

        let mut next_seq = vec![0usize; counts.len()];
        let mut total = 0;
        while let Some((producer, seq)) = queue.pop() {
            prop_assert_eq!(seq, next_seq[producer]);
            next_seq[producer] += 1;
            total += 1;
        }
        prop_assert_eq!(next_seq, counts.clone());
        prop_assert_eq!(total, counts.iter().sum::<usize>());
    }
}
