/// Outcome of a one-sided ("greater") binomial test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BinomialTest {
    pub successes: u64,
    pub trials: u64,
    pub p_null: f64,
    pub p_value: f64,
}

impl BinomialTest {
    pub fn greater(successes: u64, trials: u64, p_null: f64) -> Self {
        Self {
            successes,
            trials,
            p_null,
            p_value: binomial_sf(successes, trials, p_null),
        }
    }

    pub fn rejects(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

fn ln_factorial(n: u64) -> f64 {
    (2..=n).map(|i| (i as f64).ln()).sum()
}

fn ln_choose(n: u64, k: u64) -> f64 {
    let k = k.min(n - k);
    ((n - k + 1)..=n).map(|i| (i as f64).ln()).sum::<f64>() - ln_factorial(k)
}

/// P(X = k) for X ~ B(n, p).
pub fn binomial_pmf(k: u64, n: u64, p: f64) -> f64 {
    if k > n {
        return 0.0;
    }
    if p <= 0.0 {
        return if k == 0 { 1.0 } else { 0.0 };
    }
    if p >= 1.0 {
        return if k == n { 1.0 } else { 0.0 };
    }
    let ln = ln_choose(n, k) + (k as f64) * p.ln() + ((n - k) as f64) * (1.0 - p).ln();
    ln.exp()
}

/// The full pmf of B(n, p) for k = 0..=n, built by the ratio recurrence so the
/// whole vector costs O(n).
pub fn binomial_pmf_all(n: u64, p: f64) -> Vec<f64> {
    let len = n as usize + 1;
    if p <= 0.0 || p >= 1.0 {
        return (0..=n).map(|k| binomial_pmf(k, n, p)).collect();
    }
    // Start from the mode to stay clear of underflow on long tails.
    let mode = (((n + 1) as f64) * p).floor().min(n as f64) as u64;
    let mut out = vec![0.0; len];
    out[mode as usize] = binomial_pmf(mode, n, p);
    let odds = p / (1.0 - p);
    for k in (mode + 1)..=n {
        out[k as usize] = out[k as usize - 1] * ((n - k + 1) as f64) / (k as f64) * odds;
    }
    for k in (0..mode).rev() {
        out[k as usize] = out[k as usize + 1] * ((k + 1) as f64) / ((n - k) as f64) / odds;
    }
    out
}

/// P(X >= k) for X ~ B(n, p); the p value of the one-sided "greater" test.
pub fn binomial_sf(k: u64, n: u64, p: f64) -> f64 {
    if k == 0 {
        return 1.0;
    }
    if k > n {
        return 0.0;
    }
    let pmf = binomial_pmf_all(n, p);
    // Sum the smaller tail for accuracy.
    let upper: f64 = pmf[k as usize..].iter().sum();
    if upper <= 0.5 {
        return upper.clamp(0.0, 1.0);
    }
    let lower: f64 = pmf[..k as usize].iter().sum();
    (1.0 - lower).clamp(0.0, 1.0)
}
