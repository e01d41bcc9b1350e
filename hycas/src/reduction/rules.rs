//! Rewrite rule tables, built once on first use.
//!
//! Every table is tried in order and the first rule that changes the tree wins. Rules that
//! need computed values (angle units, integer powers) are written as code in their pass.
use once_cell::sync::Lazy;

use crate::pattern::Rule;
use crate::pattern::placeholder::Tag::{A, B, C, D, E, F, G};
use crate::tree::owned::shapes::*;

/// User-facing forms into the system forms that reduction works on.
pub static PROJECTION: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule::new(
            "subtraction",
            sub(A.one(), B.one()),
            add([A.one(), mult([int(-1), B.one()])]),
        ),
        Rule::new(
            "division",
            div(A.one(), B.one()),
            mult([A.one(), pow(B.one(), int(-1))]),
        ),
        Rule::new("opposite", opposite(A.one()), mult([int(-1), A.one()])),
        Rule::new("square_root", sqrt(A.one()), pow(A.one(), rational(1, 2))),
        Rule::new(
            "nth_root",
            nth_root(A.one(), B.one()),
            pow(A.one(), pow(B.one(), int(-1))),
        ),
        Rule::new("natural_logarithm", logarithm(A.one(), e()), ln(A.one())),
        Rule::new(
            "logarithm",
            logarithm(A.one(), B.one()),
            mult([ln(A.one()), pow(ln(B.one()), int(-1))]),
        ),
        Rule::new(
            "decimal_logarithm",
            log(A.one()),
            mult([ln(A.one()), pow(ln(int(10)), int(-1))]),
        ),
        Rule::new("exponential", pow(e(), A.one()), exp(A.one())),
        Rule::new("euler_constant", e(), exp(int(1))),
    ]
});

/// Rewrites that make a tree larger but may open further simplifications.
pub static EXPAND: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule::new(
            "distribute_product",
            mult([A.zero_or_more(), add([B.one(), C.one_or_more()]), D.zero_or_more()]),
            add([
                mult([A.zero_or_more(), B.one(), D.zero_or_more()]),
                mult([A.zero_or_more(), add([C.one_or_more()]), D.zero_or_more()]),
            ]),
        ),
        Rule::new(
            "logarithm_of_product",
            ln(mult([A.one(), B.one_or_more()])),
            add([ln(A.one()), ln(mult([B.one_or_more()]))]),
        ),
        Rule::new(
            "logarithm_of_power",
            ln(pow(A.one(), B.one())),
            mult([B.one(), ln(A.one())]),
        ),
        Rule::new(
            "exponential_of_sum",
            exp(add([A.one(), B.one_or_more()])),
            mult([exp(A.one()), exp(add([B.one_or_more()]))]),
        ),
        Rule::new(
            "cosine_of_sum",
            trig(add([A.one(), B.one_or_more()]), int(0)),
            add([
                mult([trig(A.one(), int(0)), trig(add([B.one_or_more()]), int(0))]),
                mult([
                    int(-1),
                    trig(A.one(), int(1)),
                    trig(add([B.one_or_more()]), int(1)),
                ]),
            ]),
        ),
        Rule::new(
            "sine_of_sum",
            trig(add([A.one(), B.one_or_more()]), int(1)),
            add([
                mult([trig(A.one(), int(1)), trig(add([B.one_or_more()]), int(0))]),
                mult([trig(A.one(), int(0)), trig(add([B.one_or_more()]), int(1))]),
            ]),
        ),
    ]
});

/// Reverses of [`EXPAND`]: rewrites that gather terms together.
pub static CONTRACT: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule::new(
            "sum_of_logarithms",
            add([
                A.zero_or_more(),
                ln(B.one()),
                C.zero_or_more(),
                ln(D.one()),
                E.zero_or_more(),
            ]),
            add([
                A.zero_or_more(),
                ln(mult([B.one(), D.one()])),
                C.zero_or_more(),
                E.zero_or_more(),
            ]),
        ),
        Rule::new(
            "product_of_exponentials",
            mult([
                A.zero_or_more(),
                exp(B.one()),
                C.zero_or_more(),
                exp(D.one()),
                E.zero_or_more(),
            ]),
            mult([
                A.zero_or_more(),
                exp(add([B.one(), D.one()])),
                C.zero_or_more(),
                E.zero_or_more(),
            ]),
        ),
        Rule::new(
            "factor_common_term",
            add([
                A.zero_or_more(),
                mult([B.one(), C.one_or_more()]),
                D.zero_or_more(),
                mult([B.one(), E.one_or_more()]),
                F.zero_or_more(),
            ]),
            add([
                A.zero_or_more(),
                mult([B.one(), add([mult([C.one_or_more()]), mult([E.one_or_more()])])]),
                D.zero_or_more(),
                F.zero_or_more(),
            ]),
        ),
        Rule::new(
            "factor_bare_term",
            add([
                A.zero_or_more(),
                B.one(),
                C.zero_or_more(),
                mult([B.one(), D.one_or_more()]),
                E.zero_or_more(),
            ]),
            add([
                A.zero_or_more(),
                mult([B.one(), add([int(1), mult([D.one_or_more()])])]),
                C.zero_or_more(),
                E.zero_or_more(),
            ]),
        ),
        // cos(u)·cos(v) = (cos(u - v) + cos(u + v)) / 2 with u = B - C·π/2 and v = E - F·π/2
        Rule::new(
            "product_to_sum",
            mult([
                A.zero_or_more(),
                trig(B.one(), C.one()),
                D.zero_or_more(),
                trig(E.one(), F.one()),
                G.zero_or_more(),
            ]),
            mult([
                A.zero_or_more(),
                rational(1, 2),
                add([
                    trig(
                        add([B.one(), mult([int(-1), E.one()])]),
                        add([C.one(), mult([int(-1), F.one()])]),
                    ),
                    trig(add([B.one(), E.one()]), add([C.one(), F.one()])),
                ]),
                D.zero_or_more(),
                G.zero_or_more(),
            ]),
        ),
    ]
});

/// System forms back into their display forms.
pub static BEAUTIFY: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule::new("cosine", trig(A.one(), int(0)), cos(A.one())),
        Rule::new("sine", trig(A.one(), int(1)), sin(A.one())),
        Rule::new("arc_cosine", atrig(A.one(), int(0)), acos(A.one())),
        Rule::new("arc_sine", atrig(A.one(), int(1)), asin(A.one())),
        Rule::new("euler_constant", exp(int(1)), e()),
        Rule::new("exponential", exp(A.one()), pow(e(), A.one())),
        Rule::new(
            "logarithm",
            mult([
                C.zero_or_more(),
                ln(A.one()),
                D.zero_or_more(),
                pow(ln(B.one()), int(-1)),
                E.zero_or_more(),
            ]),
            mult([
                C.zero_or_more(),
                logarithm(A.one(), B.one()),
                D.zero_or_more(),
                E.zero_or_more(),
            ]),
        ),
        Rule::new("decimal_logarithm", logarithm(A.one(), int(10)), log(A.one())),
        Rule::new("square_root", pow(A.one(), rational(1, 2)), sqrt(A.one())),
        Rule::new(
            "nth_root",
            pow(A.one(), pow(B.one(), int(-1))),
            nth_root(A.one(), B.one()),
        ),
    ]
});
