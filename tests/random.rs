//! Small random instances, solved through the encoder and checked against exhaustive search

use std::{fmt::Write, io::Cursor};

use maxsat_ilp::{
    encoding::{EncodeOptions, IlpEncoder},
    fio::dimacs::Parser,
    solvers::{Mip, MipStatus},
    types::{Cost, WClause},
};
use maxsat_ilp_bnb::Solver;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const N_INSTANCES: usize = 200;

fn random_instance(rng: &mut ChaCha8Rng) -> String {
    let n_vars: u32 = rng.random_range(1..=8);
    let n_clauses: usize = rng.random_range(1..=16);
    let mut clauses = Vec::with_capacity(n_clauses);
    for _ in 0..n_clauses {
        let len = rng.random_range(1..=3);
        let lits: Vec<i64> = (0..len)
            .map(|_| {
                let var = i64::from(rng.random_range(1..=n_vars));
                if rng.random_bool(0.5) {
                    var
                } else {
                    -var
                }
            })
            .collect();
        let weight = if rng.random_bool(0.25) {
            None
        } else {
            Some(rng.random_range(1..=10u64))
        };
        clauses.push((weight, lits));
    }
    let top = clauses.iter().filter_map(|(w, _)| *w).sum::<u64>() + 1;
    let mut text = format!("c random instance\np wcnf {n_vars} {n_clauses} {top}\n");
    for (weight, lits) in clauses {
        write!(text, "{}", weight.unwrap_or(top)).unwrap();
        for lit in lits {
            write!(text, " {lit}").unwrap();
        }
        text.push_str(" 0\n");
    }
    text
}

/// Minimum weight of violated soft clauses over all assignments satisfying the hard clauses
fn brute_force(n_vars: u32, clauses: &[WClause]) -> Option<u64> {
    let mut best = None;
    for bits in 0u32..(1 << n_vars) {
        let assignment: Vec<bool> = (0..n_vars).map(|idx| bits & (1 << idx) != 0).collect();
        if let Some(cost) = cost(clauses, &assignment) {
            best = Some(best.map_or(cost, |b: u64| b.min(cost)));
        }
    }
    best
}

fn cost(clauses: &[WClause], assignment: &[bool]) -> Option<u64> {
    clauses.iter().try_fold(0, |sum, cl| {
        if cl.is_sat(assignment) {
            return Some(sum);
        }
        match cl.cost() {
            Cost::Hard => None,
            Cost::Soft(w) => Some(sum + w),
        }
    })
}

/// Solves an instance and checks the result, returning the optimum
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn check(text: &str, opts: EncodeOptions, heuristics: bool) -> Option<u64> {
    let parser = Parser::new(Cursor::new(text)).unwrap();
    let header = *parser.header();
    let clauses: Vec<WClause> = parser.collect::<Result<_, _>>().unwrap();
    let mut solver = Solver::default();
    solver.set_heuristics(heuristics);
    let mut encoder = IlpEncoder::new(&mut solver, &header, opts).unwrap();
    encoder
        .encode(clauses.iter().cloned().map(Ok::<_, maxsat_ilp::encoding::EncodeError>))
        .unwrap();
    let encoding = encoder.finish();
    let expected = brute_force(header.n_vars, &clauses);
    match solver.solve().unwrap() {
        MipStatus::Optimal => {
            let objective = solver.best_objective().unwrap();
            assert_eq!(objective.fract(), 0., "{text}");
            let assignment = encoding.assignment(&solver).unwrap();
            assert_eq!(cost(&clauses, &assignment), Some(objective as u64), "{text}");
            assert_eq!(expected, Some(objective as u64), "{text}");
        }
        MipStatus::Infeasible => assert_eq!(expected, None, "{text}"),
        status => panic!("unexpected status {status} for\n{text}"),
    }
    expected
}

#[test]
fn random_against_brute_force() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x6d61_7873);
    for _ in 0..N_INSTANCES {
        let text = random_instance(&mut rng);
        check(&text, EncodeOptions::default(), true);
    }
}

#[test]
fn random_without_heuristics() {
    let mut rng = ChaCha8Rng::seed_from_u64(17);
    for _ in 0..N_INSTANCES {
        let text = random_instance(&mut rng);
        check(&text, EncodeOptions::default(), false);
    }
}

#[test]
fn unit_folding_equivalence() {
    let mut rng = ChaCha8Rng::seed_from_u64(4711);
    for _ in 0..N_INSTANCES {
        let text = random_instance(&mut rng);
        let folded = check(&text, EncodeOptions::default(), true);
        let general = check(
            &text,
            EncodeOptions {
                fold_soft_units: false,
            },
            true,
        );
        assert_eq!(folded, general, "{text}");
    }
}
