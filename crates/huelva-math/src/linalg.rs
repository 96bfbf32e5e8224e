//! Small dense linear algebra.

use ndarray::Array2;

const MAX_SWEEPS: usize = 100;

/// Eigenvalues of a symmetric matrix by cyclic Jacobi rotations, ascending.
///
/// Only the upper triangle's symmetric part is meaningful; the input is not
/// checked for symmetry. Suitable for the few dozen instruments of a cross
/// section.
pub fn symmetric_eigenvalues(matrix: &Array2<f64>) -> Vec<f64> {
    let n = matrix.nrows();
    if n == 0 || matrix.ncols() != n {
        return Vec::new();
    }
    let mut a = matrix.clone();
    let frobenius: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let threshold = 1e-14 * frobenius.max(f64::MIN_POSITIVE);

    for _ in 0..MAX_SWEEPS {
        let off: f64 = (0..n)
            .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
            .map(|(i, j)| a[[i, j]] * a[[i, j]])
            .sum::<f64>()
            .sqrt();
        if off <= threshold {
            break;
        }
        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[[p, q]];
                if apq.abs() <= f64::MIN_POSITIVE {
                    continue;
                }
                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;
                for k in 0..n {
                    let akp = a[[k, p]];
                    let akq = a[[k, q]];
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[[p, k]];
                    let aqk = a[[q, k]];
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
            }
        }
    }

    let mut eig: Vec<f64> = (0..n).map(|i| a[[i, i]]).collect();
    eig.sort_by(f64::total_cmp);
    eig
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_two_by_two() {
        let m = array![[2.0, 1.0], [1.0, 2.0]];
        let e = symmetric_eigenvalues(&m);
        assert_relative_eq!(e[0], 1.0, epsilon = 1e-10);
        assert_relative_eq!(e[1], 3.0, epsilon = 1e-10);
    }

    #[test]
    fn test_eigenvalues_sum_to_trace() {
        let m = array![[4.0, 1.0, 0.5], [1.0, 3.0, -0.2], [0.5, -0.2, 1.0]];
        let e = symmetric_eigenvalues(&m);
        assert_relative_eq!(e.iter().sum::<f64>(), 8.0, epsilon = 1e-10);
        let det: f64 = e.iter().product();
        let expected = 4.0 * (3.0 - 0.04) - 1.0 * (1.0 + 0.1) + 0.5 * (-0.2 - 1.5);
        assert_relative_eq!(det, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_all_ones_correlation() {
        let m = Array2::from_elem((4, 4), 1.0);
        let e = symmetric_eigenvalues(&m);
        assert_relative_eq!(e[3], 4.0, epsilon = 1e-10);
        assert!(e[..3].iter().all(|v| v.abs() < 1e-10));
    }
}
