use gsw_grid::{Axis, ParameterGrid};
use proptest::prelude::*;

fn build(sizes: &[usize]) -> ParameterGrid {
    let axes: Vec<Axis> = sizes
        .iter()
        .enumerate()
        .map(|(idx, &size)| {
            let values = (0..size).map(|v| v as f64 * 10.0 + 1.0).collect();
            Axis::new(format!("p{idx}"), values)
        })
        .collect();
    ParameterGrid::grid(&axes).expect("grid")
}

proptest! {
    #[test]
    fn cardinality_is_product_of_axis_sizes(sizes in prop::collection::vec(1usize..5, 1..5)) {
        let grid = build(&sizes);
        let expected: usize = sizes.iter().product();
        prop_assert_eq!(grid.len(), expected);
        prop_assert_eq!(grid.iter().len(), expected);
        prop_assert_eq!(grid.iter().count(), expected);
    }

    #[test]
    fn enumeration_is_deterministic(sizes in prop::collection::vec(1usize..4, 1..4)) {
        let grid = build(&sizes);
        let first: Vec<Vec<f64>> = grid.iter().map(|set| set.values().to_vec()).collect();
        let second: Vec<Vec<f64>> = grid.iter().map(|set| set.values().to_vec()).collect();
        prop_assert_eq!(&first, &second);
        let ids_a = grid.validate_identifiers().expect("ids");
        let ids_b = grid.validate_identifiers().expect("ids");
        prop_assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn distinct_integer_points_never_collide(sizes in prop::collection::vec(1usize..4, 1..4)) {
        let grid = build(&sizes);
        let ids = grid.validate_identifiers().expect("injective");
        prop_assert_eq!(ids.len(), grid.len());
    }
}
