//! Stateless vector primitives: similarity, normalisation, role permutation.

use ndarray::{s, Array1};

/// Dense storage for every vector in the crate.
pub type Vector = Array1<f32>;

/// Cosine similarity. Range: [-1, 1]; 0 if either vector is all zeros.
pub fn cosine(a: &Vector, b: &Vector) -> f32 {
    let na = a.dot(a).sqrt();
    let nb = b.dot(b).sqrt();
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    a.dot(b) / (na * nb)
}

/// Scale to unit length. The zero vector is returned unchanged.
pub fn normalize(v: &Vector) -> Vector {
    let norm = v.dot(v).sqrt();
    if norm == 0.0 {
        v.clone()
    } else {
        v / norm
    }
}

/// Circular shift right by `shift`: out[(i + shift) mod n] = v[i].
pub fn permute(v: &Vector, shift: usize) -> Vector {
    let n = v.len();
    if n == 0 {
        return v.clone();
    }
    let k = shift % n;
    let mut out = Array1::zeros(n);
    out.slice_mut(s![k..]).assign(&v.slice(s![..n - k]));
    out.slice_mut(s![..k]).assign(&v.slice(s![n - k..]));
    out
}

/// Inverse of [`permute`] for the same shift.
pub fn unpermute(v: &Vector, shift: usize) -> Vector {
    let n = v.len();
    if n == 0 {
        return v.clone();
    }
    permute(v, n - shift % n)
}

/// Number of non-zero entries.
pub fn nonzero_count(v: &Vector) -> usize {
    v.iter().filter(|&&x| x != 0.0).count()
}

/// Circular convolution, iterating only over non-zero entries.
///
/// out[(i + j) mod n] += a[i] * b[j]
pub fn circular_convolution(a: &Vector, b: &Vector) -> Vector {
    let n = a.len();
    debug_assert_eq!(n, b.len(), "convolution operands must share a width");
    let mut out = Array1::zeros(n);
    let b_active: Vec<(usize, f32)> = b
        .iter()
        .enumerate()
        .filter(|(_, &y)| y != 0.0)
        .map(|(j, &y)| (j, y))
        .collect();

    for (i, &x) in a.iter().enumerate() {
        if x == 0.0 {
            continue;
        }
        for &(j, y) in &b_active {
            out[(i + j) % n] += x * y;
        }
    }
    out
}
