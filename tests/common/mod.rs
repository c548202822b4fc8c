//! A switching system shared by the scenario tests and the demos.
//!
//! K continuous states `x1..xK` linked by K-1 between-measurements whose mean is chosen by a
//! binary mode `m_k`: the state stays put when `m_k = 0` and moves by one when `m_k = 1`.
//! A strong prior holds `x1` near 0 and strong unary measurements hold each `x_k` near
//! `k - 1`. Everything is linearized at `x_k = k`, so the solution is a delta near -1 and the
//! all-moving mode sequence reproduces the measurements exactly.
//!
//! The net is what eliminating the states first and then the modes produces: one mixture per
//! state, `p(x_j | x_{j+1}, m_1..m_j)`, followed by the discrete chain `p(m_1 | m_2..) ... p(m_{K-1})`.

#![allow(dead_code)]

use jerome_hybrid::{
    all_assignments, symbol, Assignment, DecisionTree, DiscreteConditional, DiscreteKey, GaussianConditional,
    GaussianMixture, HybridBayesNet, Key,
};
use ndarray::Array2;

use std::sync::Arc;

pub fn x(k: u64) -> Key {
    symbol('x', k)
}

pub fn m(k: u64) -> DiscreteKey {
    DiscreteKey::binary(symbol('m', k))
}

/// The modes `m1..m_{K-1}` of a chain with `k` states
pub fn modes(k: usize) -> Vec<DiscreteKey> {
    (1..k as u64).map(m).collect()
}

/// Build an assignment to the modes from their values
pub fn assignment(values: &[usize]) -> Assignment {
    values.iter().enumerate().map(|(i, &v)| (m(i as u64 + 1).key, v)).collect()
}

/// The square-root information form of the chain for one fixed mode sequence
struct Elimination {
    r: Vec<f64>,
    s: Vec<f64>,
    d: Vec<f64>,

    /// The least squares error left once every state is at its optimum
    residual: f64,
}

fn eliminate(k: usize, modes: &[usize]) -> Elimination {
    // each row is a whitened linear measurement: Σ a_i δ_i = b
    let mut rows: Vec<(Vec<(usize, f64)>, f64)> = vec![(vec![(0, 10.0)], -10.0)];
    for i in 1..k {
        let mean = modes[i - 1] as f64;
        rows.push((vec![(i - 1, -1.0), (i, 1.0)], mean - 1.0));
    }
    for i in 2..=k {
        rows.push((vec![(i - 1, 10.0)], -10.0));
    }

    let mut info = Array2::<f64>::zeros((k, k));
    let mut eta = vec![0.0; k];
    let mut bb = 0.0;
    for (coeffs, b) in rows.iter() {
        for &(i, a) in coeffs {
            eta[i] += a * b;
            for &(j, aj) in coeffs {
                info[[i, j]] += a * aj;
            }
        }
        bb += b * b;
    }

    let mut out = Elimination { r: vec![], s: vec![], d: vec![], residual: 0.0 };
    for j in 0..k {
        let r = info[[j, j]].sqrt();
        let row: Vec<f64> = (0..k).map(|l| info[[j, l]] / r).collect();
        let d = eta[j] / r;

        for l in j + 1..k {
            for n in j + 1..k {
                info[[l, n]] -= row[l] * row[n];
            }
            eta[l] -= row[l] * d;
        }

        out.r.push(r);
        out.s.push(if j + 1 < k { row[j + 1] } else { 0.0 });
        out.d.push(d);
    }

    out.residual = 0.5 * (bb - out.d.iter().map(|d| d * d).sum::<f64>());
    out
}

/// The prior over mode sequences: `P(m1)` uniform, `P(m_{k+1} | m_k)` given by "1/2 3/2"
fn mode_prior(values: &[usize]) -> f64 {
    let transition = [[1.0 / 3.0, 2.0 / 3.0], [3.0 / 5.0, 2.0 / 5.0]];
    values.windows(2).fold(0.5, |p, w| p * transition[w[0]][w[1]])
}

fn mode_values(k: usize, a: &Assignment) -> Vec<usize> {
    (1..k as u64).map(|i| a.get(m(i).key).unwrap_or(0)).collect()
}

/// The hybrid Bayes net of a switching chain with `k` states
pub fn switching(k: usize) -> HybridBayesNet {
    let keys = modes(k);
    let mut bn = HybridBayesNet::new();

    for j in 1..=k {
        // x_j only depends on the modes eliminated alongside the states before it
        let mixture_keys = keys[..j.min(k - 1)].to_vec();
        let tree = DecisionTree::from_fn(&mixture_keys, |a| {
            let e = eliminate(k, &mode_values(k, a));
            let parents: Vec<(Key, f64)> = if j < k { vec![(x(j as u64 + 1), e.s[j - 1])] } else { vec![] };
            Arc::new(GaussianConditional::scalar(x(j as u64), e.r[j - 1], &parents, e.d[j - 1]).unwrap())
        });
        bn.push(GaussianMixture::new(mixture_keys, tree).unwrap()).unwrap();
    }

    // unnormalized posterior of each mode sequence once the states are eliminated
    let posterior = |a: &Assignment| {
        let values = mode_values(k, a);
        mode_prior(&values) * (-eliminate(k, &values).residual).exp()
    };

    // marginal over m_i..m_{K-1}, summing out the modes before them
    let marginal = |i: usize, a: &Assignment| -> f64 {
        let tail = a.restrict(&keys[i - 1..]);
        all_assignments(&keys[..i - 1])
            .map(|b| posterior(&tail.iter().fold(b, |full, (key, v)| full.with(key, v))))
            .sum()
    };

    for i in 1..k {
        let table = DecisionTree::from_fn(&keys[i - 1..], |a| marginal(i, a) / marginal(i + 1, a));
        bn.push(DiscreteConditional::new(keys[i - 1], keys[i..].to_vec(), table).unwrap()).unwrap();
    }

    bn
}
