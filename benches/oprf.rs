// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed
// licenses.

#[macro_use]
extern crate criterion;

use criterion::Criterion;
use opaque_pake::oprf::{
    OprfClient, OprfServer, PoprfClient, PoprfServer, VoprfClient, VoprfServer,
};
use rand::rngs::OsRng;

#[cfg(feature = "ristretto255")]
type Suite = opaque_pake::Ristretto255;
#[cfg(all(not(feature = "ristretto255"), feature = "p256"))]
type Suite = p256::NistP256;

#[cfg(feature = "ristretto255")]
static SUFFIX: &str = "ristretto255";
#[cfg(all(not(feature = "ristretto255"), feature = "p256"))]
static SUFFIX: &str = "p256";

fn oprf_blind(c: &mut Criterion) {
    let mut rng = OsRng;
    let input = b"hunter2";

    c.bench_function(&format!("oprf blind ({})", SUFFIX), move |b| {
        b.iter(|| {
            OprfClient::<Suite>::blind(&input[..], &mut rng).unwrap();
        })
    });
}

fn oprf_blind_evaluate(c: &mut Criterion) {
    let mut rng = OsRng;
    let input = b"hunter2";
    let server = OprfServer::<Suite>::new(&mut rng);
    let blind_result = OprfClient::<Suite>::blind(&input[..], &mut rng).unwrap();

    c.bench_function(&format!("oprf blind evaluate ({})", SUFFIX), move |b| {
        b.iter(|| {
            server.blind_evaluate(&blind_result.message);
        })
    });
}

fn oprf_finalize(c: &mut Criterion) {
    let mut rng = OsRng;
    let input = b"hunter2";
    let server = OprfServer::<Suite>::new(&mut rng);
    let blind_result = OprfClient::<Suite>::blind(&input[..], &mut rng).unwrap();
    let evaluation_element = server.blind_evaluate(&blind_result.message);

    c.bench_function(&format!("oprf finalize ({})", SUFFIX), move |b| {
        b.iter(|| {
            blind_result
                .state
                .finalize(&input[..], &evaluation_element)
                .unwrap();
        })
    });
}

fn oprf_evaluate(c: &mut Criterion) {
    let mut rng = OsRng;
    let input = b"hunter2";
    let server = OprfServer::<Suite>::new(&mut rng);

    c.bench_function(&format!("oprf evaluate ({})", SUFFIX), move |b| {
        b.iter(|| {
            server.evaluate(&input[..]).unwrap();
        })
    });
}

fn voprf_blind_evaluate(c: &mut Criterion) {
    let mut rng = OsRng;
    let input = b"hunter2";
    let server = VoprfServer::<Suite>::new(&mut rng);
    let blind_result = VoprfClient::<Suite>::blind(&input[..], &mut rng).unwrap();

    c.bench_function(&format!("voprf blind evaluate ({})", SUFFIX), move |b| {
        b.iter(|| {
            server.blind_evaluate(&mut rng, &blind_result.message).unwrap();
        })
    });
}

fn voprf_finalize(c: &mut Criterion) {
    let mut rng = OsRng;
    let input = b"hunter2";
    let server = VoprfServer::<Suite>::new(&mut rng);
    let blind_result = VoprfClient::<Suite>::blind(&input[..], &mut rng).unwrap();
    let evaluate_result = server.blind_evaluate(&mut rng, &blind_result.message).unwrap();
    let pk = server.get_public_key();

    c.bench_function(&format!("voprf finalize ({})", SUFFIX), move |b| {
        b.iter(|| {
            blind_result
                .state
                .finalize(
                    &input[..],
                    &evaluate_result.message,
                    &evaluate_result.proof,
                    pk,
                )
                .unwrap();
        })
    });
}

fn poprf_blind_evaluate(c: &mut Criterion) {
    let mut rng = OsRng;
    let input = b"hunter2";
    let info = b"pepper";
    let server = PoprfServer::<Suite>::new(&mut rng);
    let blind_result = PoprfClient::<Suite>::blind(&input[..], &mut rng).unwrap();

    c.bench_function(&format!("poprf blind evaluate ({})", SUFFIX), move |b| {
        b.iter(|| {
            server
                .blind_evaluate(&mut rng, &blind_result.message, &info[..])
                .unwrap();
        })
    });
}

fn poprf_finalize(c: &mut Criterion) {
    let mut rng = OsRng;
    let input = b"hunter2";
    let info = b"pepper";
    let server = PoprfServer::<Suite>::new(&mut rng);
    let blind_result = PoprfClient::<Suite>::blind(&input[..], &mut rng).unwrap();
    let evaluate_result = server
        .blind_evaluate(&mut rng, &blind_result.message, &info[..])
        .unwrap();
    let pk = server.get_public_key();

    c.bench_function(&format!("poprf finalize ({})", SUFFIX), move |b| {
        b.iter(|| {
            blind_result
                .state
                .finalize(
                    &input[..],
                    &evaluate_result.message,
                    &evaluate_result.proof,
                    pk,
                    &info[..],
                )
                .unwrap();
        })
    });
}

criterion_group!(
    oprf_benches,
    oprf_blind,
    oprf_blind_evaluate,
    oprf_finalize,
    oprf_evaluate,
    voprf_blind_evaluate,
    voprf_finalize,
    poprf_blind_evaluate,
    poprf_finalize,
);
criterion_main!(oprf_benches);
