use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;

#[test]
fn test_par_count_basic() {
    let items = [0usize, 1, 2, 3, 0, 1, 2, 0];
    let counts = par_count(&items, 4, |&v| v);
    assert_eq!(counts, vec![3, 2, 2, 1]);
}

#[test]
fn test_par_count_empty() {
    let items: [u8; 0] = [];
    let counts = par_count(&items, 256, |&v| v as usize);
    assert_eq!(counts.len(), 256);
    assert!(counts.iter().all(|&c| c == 0));
}

#[test]
fn test_par_count_into_accumulates() {
    let counters = atomic_counters(2);
    par_count_into(&[0u8, 1, 1], &counters, |&v| v as usize);
    par_count_into(&[1u8], &counters, |&v| v as usize);
    let counts: Vec<u32> = counters.into_iter().map(AtomicU32::into_inner).collect();
    assert_eq!(counts, vec![1, 3]);
}

#[test]
fn test_par_count_large_input_total() {
    let mut rng = StdRng::seed_from_u64(7);
    let items: Vec<u8> = (0..100_003).map(|_| rng.random()).collect();
    let counts = par_count(&items, 256, |&v| v as usize);
    assert_eq!(counts.iter().sum::<u32>(), items.len() as u32);

    let mut expected = [0u32; 256];
    for &v in &items {
        expected[v as usize] += 1;
    }
    assert_eq!(counts, expected.to_vec());
}

#[test]
#[should_panic]
fn test_par_count_key_out_of_range_panics() {
    par_count(&[5u8], 2, |&v| v as usize);
}

#[test]
fn test_inclusive_scan_basic() {
    let values = [1u32, 2, 3, 4, 5];
    assert_eq!(par_inclusive_scan(&values), vec![1, 3, 6, 10, 15]);
    assert_eq!(inclusive_scan_sequential(&values), vec![1, 3, 6, 10, 15]);
}

#[test]
fn test_inclusive_scan_single() {
    assert_eq!(par_inclusive_scan(&[42]), vec![42]);
}

#[test]
fn test_inclusive_scan_empty() {
    assert!(par_inclusive_scan(&[]).is_empty());
    assert!(inclusive_scan_sequential(&[]).is_empty());
}

#[test]
fn test_inclusive_scan_matches_sequential_for_all_lengths() {
    let mut rng = StdRng::seed_from_u64(11);
    for len in 1..=256 {
        let values: Vec<u32> = (0..len).map(|_| rng.random_range(0..10_000)).collect();
        assert_eq!(
            par_inclusive_scan(&values),
            inclusive_scan_sequential(&values),
            "scan mismatch for length {len}"
        );
    }
}

#[test]
fn test_auto_chunk_size_never_zero() {
    assert_eq!(auto_chunk_size(0), 1);
    assert!(auto_chunk_size(1_000_000) >= 1);
}
