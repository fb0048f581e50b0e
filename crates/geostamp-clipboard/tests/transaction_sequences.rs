//! Exercises every short sequence of `write_text` / `cancel` calls against
//! one transaction and checks that only the first call succeeds.

use std::sync::Arc;

use geostamp_clipboard::{ClipboardError, ClipboardTransaction, MemoryClipboard, TransactionState};

#[derive(Debug, Clone, Copy)]
enum Op {
    Write,
    Cancel,
}

fn sequences(max_len: usize) -> Vec<Vec<Op>> {
    let mut all = vec![vec![]];
    let mut out = Vec::new();
    for _ in 0..max_len {
        let mut next = Vec::new();
        for seq in &all {
            for op in [Op::Write, Op::Cancel] {
                let mut extended: Vec<Op> = seq.clone();
                extended.push(op);
                out.push(extended.clone());
                next.push(extended);
            }
        }
        all = next;
    }
    out
}

#[tokio::test]
async fn test_only_first_call_succeeds() {
    for seq in sequences(4) {
        let clipboard = Arc::new(MemoryClipboard::new());
        let tx = ClipboardTransaction::begin(clipboard.clone());
        let mut confirmations = Vec::new();

        for (i, op) in seq.iter().enumerate() {
            let outcome = match op {
                Op::Write => tx.write_text("stamp").map(|pending| confirmations.push(pending)),
                Op::Cancel => tx.cancel().await,
            };

            if i == 0 {
                assert!(outcome.is_ok(), "first call failed for {:?}", seq);
            } else {
                assert!(
                    matches!(outcome, Err(ClipboardError::AlreadyCompleted)),
                    "call {} succeeded for {:?}",
                    i,
                    seq
                );
            }
        }

        for pending in confirmations {
            assert_eq!(pending.await, Ok(true));
        }

        let expected = match seq[0] {
            Op::Write => (TransactionState::Written, Some("stamp".to_string())),
            Op::Cancel => (TransactionState::Cancelled, None),
        };
        assert_eq!((tx.state(), clipboard.contents()), expected, "{:?}", seq);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_calls_have_one_winner() {
    for _ in 0..50 {
        let tx = Arc::new(ClipboardTransaction::begin(Arc::new(MemoryClipboard::new())));

        let writers: Vec<_> = (0..4)
            .map(|i| {
                let tx = Arc::clone(&tx);
                tokio::spawn(async move {
                    if i % 2 == 0 {
                        tx.write_text("race").is_ok()
                    } else {
                        tx.cancel().await.is_ok()
                    }
                })
            })
            .collect();

        let mut winners = 0;
        for handle in writers {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
