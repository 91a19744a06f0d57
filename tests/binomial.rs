use first_blood_king::stats::{BinomialTest, binomial_pmf, binomial_sf};

// Reference tails computed as sum_{i >= k} C(n, i) p^i (1 - p)^(n - i).
const REFERENCE: &[(u64, u64, f64, f64)] = &[
    (10, 50, 0.1, 0.024_537_935_704_591_49),
    (1, 3, 0.1, 0.271),
    (20, 100, 0.1, 0.001_978_560_865_771_237_6),
    (5, 20, 0.25, 0.585_158_497_469_819_8),
    (37, 200, 0.1, 0.000_185_767_800_450_080_7),
    (3, 30, 0.1, 0.588_648_760_440_495_2),
];

#[test]
fn one_sided_tail_matches_reference_values() {
    for &(k, n, p, expected) in REFERENCE {
        let got = binomial_sf(k, n, p);
        let rel = ((got - expected) / expected).abs();
        assert!(rel < 1e-9, "k={k} n={n} p={p}: got {got}, expected {expected}");
    }
}

#[test]
fn fifty_matches_ten_first_bloods() {
    let test = BinomialTest::greater(10, 50, 0.1);
    assert_eq!(test.successes, 10);
    assert_eq!(test.trials, 50);
    assert!((test.p_value - 0.024_537_935_704_591_49).abs() < 1e-12);
    assert!(test.rejects(0.05));
}

#[test]
fn tail_is_monotone_in_observed_count() {
    let mut prev = 1.0;
    for k in 0..=30 {
        let p = binomial_sf(k, 30, 0.1);
        assert!(p <= prev + 1e-15, "k={k}");
        prev = p;
    }
}

#[test]
fn tail_equals_pmf_sum() {
    let direct: f64 = (7..=40).map(|k| binomial_pmf(k, 40, 0.15)).sum();
    assert!((binomial_sf(7, 40, 0.15) - direct).abs() < 1e-12);
}
