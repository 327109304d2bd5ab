// src/utils.rs

/// Standard logistic transform of a log-odds margin.
pub fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

/// Shapley weight of a coalition: `k! * (n - k - 1)! / n!`, the probability
/// that exactly the `k` given players precede a fixed player in a uniformly
/// random ordering of `n` players.
pub fn shapley_weight(k: usize, n: usize) -> f64 {
    if n == 0 || k >= n {
        return 0.0;
    }
    // 1 / (n * C(n-1, k))
    1.0 / (n as f64 * n_choose_k(n - 1, k))
}

/// Helper for combinations C(n, k) = n! / (k! * (n-k)!)
pub fn n_choose_k(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    if k == 0 || k == n {
        return 1.0;
    }
    // Exploit symmetry C(n, k) = C(n, n-k) to keep k small
    let eff_k = if k > n / 2 { n - k } else { k };

    let mut res = 1.0;
    for i in 0..eff_k {
        res *= (n - i) as f64;
        res /= (i + 1) as f64;
    }
    res
}
