//! Label hole filling regression test
//!
//! Fills rings in 2-D and hollow shells in 3-D, and checks on random fields
//! that filling is idempotent and only ever writes into background.
//!
//! Run with:
//! ```
//! cargo test -p vollseg-region --test holes_reg
//! ```

use ndarray::IxDyn;
use rand::prelude::*;
use vollseg_core::LabelField;
use vollseg_region::fill_label_holes;
use vollseg_test::{RegParams, fixtures, init_logging};

#[test]
fn holes_reg_ring() {
    init_logging();
    let mut rp = RegParams::new("holes_ring");

    let shape = [15, 15];
    let ring = fixtures::ring_mask(&shape, &[7.0, 7.0], 3.0, 5.0).unwrap();
    let mut field = LabelField::zeros(IxDyn(&shape));
    fixtures::paint(&mut field, &ring, 3).unwrap();

    let filled = fill_label_holes(&field).unwrap();
    let disk = fixtures::ball_mask(&shape, &[7.0, 7.0], 5.0).unwrap();
    let mut expected = LabelField::zeros(IxDyn(&shape));
    fixtures::paint(&mut expected, &disk, 3).unwrap();
    rp.compare_fields(&expected, &filled);

    assert!(rp.cleanup(), "holes_ring regression test failed");
}

#[test]
fn holes_reg_open_and_nested() {
    init_logging();
    let mut rp = RegParams::new("holes_open_nested");

    // A notch to the outside is not a hole
    let open = fixtures::labels_from_rows(&[
        ".......",
        ".44444.",
        ".4...4.",
        ".4....",
        ".44444.",
    ]);
    rp.check(open.is_err(), "ragged fixture rejected");

    let open = fixtures::labels_from_rows(&[
        ".......",
        ".44444.",
        ".4...4.",
        ".4.....",
        ".44444.",
        ".......",
    ])
    .unwrap();
    rp.compare_fields(&open, &fill_label_holes(&open).unwrap());

    // A region inside another region's hole keeps its id
    let nested = fixtures::labels_from_rows(&[
        "1111111",
        "1.....1",
        "1..2..1",
        "1.....1",
        "1111111",
    ])
    .unwrap();
    let expected = fixtures::labels_from_rows(&[
        "1111111",
        "1111111",
        "1112111",
        "1111111",
        "1111111",
    ])
    .unwrap();
    rp.compare_fields(&expected, &fill_label_holes(&nested).unwrap());

    assert!(rp.cleanup(), "holes_open_nested regression test failed");
}

#[test]
fn holes_reg_shell() {
    init_logging();
    let mut rp = RegParams::new("holes_shell");

    let shape = [9, 9, 9];
    let shell = fixtures::ring_mask(&shape, &[4.0, 4.0, 4.0], 2.0, 3.5).unwrap();
    let mut field = LabelField::zeros(IxDyn(&shape));
    fixtures::paint(&mut field, &shell, 6).unwrap();
    rp.compare_values(0.0, field[[4, 4, 4]] as f64, 0.0);

    let filled = fill_label_holes(&field).unwrap();
    rp.compare_values(6.0, filled[[4, 4, 4]] as f64, 0.0);
    rp.compare_values(0.0, filled[[0, 0, 0]] as f64, 0.0);
    let ball = fixtures::ball_mask(&shape, &[4.0, 4.0, 4.0], 3.5).unwrap();
    let count = ball.iter().filter(|&&b| b).count();
    rp.compare_values(
        count as f64,
        filled.iter().filter(|&&v| v == 6).count() as f64,
        0.0,
    );

    assert!(rp.cleanup(), "holes_shell regression test failed");
}

#[test]
fn holes_reg_random() {
    init_logging();
    let mut rp = RegParams::new("holes_random");
    let mut rng = StdRng::seed_from_u64(5);
    let shape = [12, 12];

    for _ in 0..25 {
        let mut field = LabelField::zeros(IxDyn(&shape));
        for id in 1..=3u32 {
            let center = [rng.random_range(2.0..10.0), rng.random_range(2.0..10.0)];
            let inner = rng.random_range(0.5..2.0);
            let ring = fixtures::ring_mask(&shape, &center, inner, inner + 1.5).unwrap();
            fixtures::paint(&mut field, &ring, id).unwrap();
        }

        let once = fill_label_holes(&field).unwrap();
        let twice = fill_label_holes(&once).unwrap();
        rp.compare_fields(&once, &twice);

        let background_only = field
            .iter()
            .zip(once.iter())
            .all(|(&before, &after)| before == 0 || before == after);
        rp.check(background_only, "only background pixels are filled");
    }

    assert!(rp.cleanup(), "holes_random regression test failed");
}
