use forkledger::{Block, BlockHeader, Config, ForkPolicy, Ledger, LedgerError, Result};
use tempfile::TempDir;

fn child(parent: &BlockHeader, items: &[&str]) -> Block {
    let data = items.iter().map(|item| item.as_bytes().to_vec()).collect();
    Block::with_time(parent, parent.time + 60, Vec::new(), data)
}

#[test]
fn fork_rejection_and_traversal() {
    let temp_dir = TempDir::new().unwrap();
    let ledger = Ledger::open_path(temp_dir.path()).unwrap();
    let genesis = Block::genesis();
    assert_eq!(ledger.best_hash(), genesis.hash());

    let b1 = child(&genesis.header, &["lynn", "9388"]);
    let b2 = child(&genesis.header, &["other"]);
    let b1_hash = ledger.add_block(b1.clone(), None).unwrap();

    let err = ledger.add_block(b2, None).unwrap_err();
    assert!(matches!(err, LedgerError::Orphan { prev_hash } if prev_hash == genesis.hash()));
    assert!(err.is_rejection());

    let b3 = child(&b1.header, &["third"]);
    let b3_hash = ledger.add_block(b3, None).unwrap();
    assert_eq!(ledger.best_hash(), b3_hash);
    assert_eq!(ledger.best_tip().index, 2);

    let hashes: Vec<_> = ledger
        .iter()
        .map(|block| block.map(|b| b.hash()))
        .collect::<Result<_>>()
        .unwrap();
    assert_eq!(hashes, vec![b3_hash, b1_hash, genesis.hash()]);
}

#[test]
fn ledger_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.storage.db_path = temp_dir.path().join("ledger");

    let (tips, best) = {
        let ledger = Ledger::open(&config).unwrap();
        let mut parent = ledger.best_tip();
        for round in 0..5 {
            let block = child(&parent, &[&format!("round-{}", round)]);
            parent = block.header.clone();
            ledger.add_block(block, None).unwrap();
        }
        (ledger.tips(), ledger.best_tip())
    };

    let reopened = Ledger::open(&config).unwrap();
    assert_eq!(reopened.tips(), tips);
    assert_eq!(reopened.best_tip(), best);
    assert_eq!(reopened.iter().count(), 6);
    assert_eq!(reopened.block_at_index(3).unwrap().data, vec![b"round-2".to_vec()]);
}

#[test]
fn retained_forks_pick_the_longest_branch() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.storage.db_path = temp_dir.path().to_path_buf();
    config.ledger.fork_policy = ForkPolicy::RetainForks;

    let ledger = Ledger::open(&config).unwrap();
    let genesis = ledger.best_tip();
    let a1 = child(&genesis, &["a"]);
    let b1 = child(&genesis, &["b"]);
    ledger.add_block(a1.clone(), None).unwrap();
    ledger.add_block(b1.clone(), None).unwrap();
    assert_eq!(ledger.tips().len(), 2);

    let longer = if a1.hash() < b1.hash() { &b1 } else { &a1 };
    let b2 = ledger.add_block(child(&longer.header, &["c"]), None).unwrap();

    assert_eq!(ledger.best_hash(), b2);
    let branch: Vec<u64> = ledger.iter().map(|b| b.unwrap().index()).collect();
    assert_eq!(branch, vec![2, 1, 0]);
    assert_eq!(ledger.block_at_index(1).unwrap().hash(), longer.hash());
}
