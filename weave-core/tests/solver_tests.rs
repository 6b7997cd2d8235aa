//! End-to-end solver tests over socket-based catalogs.

use std::sync::Arc;
use weave_core::{
    Constraint, GenerationConfig, GenerationMode, RuleTable, Solver,
};
use weave_tiles::{
    Direction, Rotation, SocketDefinition, SocketSet, TileCatalog, TileCategory, TileDefinition,
    EMPTY_SOCKET,
};

fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn socket(name: &str, compatible: &[&str]) -> SocketDefinition {
    SocketDefinition::new(name, compatible.iter().map(|s| (*s).to_owned()).collect())
}

fn tile(name: &str, category: TileCategory, sockets: [&str; 6]) -> TileDefinition {
    TileDefinition {
        name: name.to_owned(),
        category,
        sockets: sockets.map(str::to_owned),
        weight: 1.0,
        rotatable: false,
        base_rotation: Rotation::R0,
        max_instances: None,
        requires_support: false,
        asset: format!("meshes/{name}"),
    }
}

/// A catalog where every tile pairs with every tile on every face.
fn open_catalog(names: &[&str]) -> Arc<TileCatalog> {
    let mut sockets = SocketSet::new();
    sockets.insert(socket("open", &["open"])).unwrap();
    let tiles = names
        .iter()
        .map(|n| tile(n, TileCategory::Structure, ["open"; 6]))
        .collect();
    Arc::new(TileCatalog::new(sockets, tiles).unwrap())
}

// --- Scenario A: trivial single-tile grid ---

#[test]
fn test_single_cell_single_tile() {
    init_test_logging();
    let mut sockets = SocketSet::new();
    sockets.insert(socket("unused", &[])).unwrap();
    let catalog = Arc::new(
        TileCatalog::new(
            sockets,
            vec![tile("only", TileCategory::Structure, [EMPTY_SOCKET; 6])],
        )
        .unwrap(),
    );
    let config = GenerationConfig::builder().size(1, 1, 1).seed(0).build();
    let mut solver = Solver::new(catalog, config).unwrap();
    let result = solver.generate();

    assert!(result.success);
    assert_eq!(result.assignments.len(), 1);
    assert_eq!(result.tile_at((0, 0, 0)), Some(0));
    assert_eq!(result.collapsed, 1);
    // Entropy invariant after the run: collapsed means zero.
    assert_eq!(solver.grid().get(0, 0, 0).unwrap().entropy(), 0.0);
}

#[test]
fn test_entropy_drops_to_zero_on_collapse() {
    let catalog = open_catalog(&["a", "b", "c"]);
    let config = GenerationConfig::builder().size(1, 1, 1).seed(3).build();
    let mut solver = Solver::new(catalog, config).unwrap();
    // Before the run: uncollapsed, nonzero entropy.
    let before = solver.grid().get(0, 0, 0).unwrap().entropy();
    assert!(before > 0.0);
    let result = solver.generate();
    assert!(result.success);
    assert_eq!(solver.grid().get(0, 0, 0).unwrap().entropy(), 0.0);
}

// --- Scenario B: mutually incompatible pair ---

/// Two tiles whose X-facing sockets match nothing at all, so any 2-wide row
/// is unsatisfiable.
fn hostile_catalog() -> Arc<TileCatalog> {
    let mut sockets = SocketSet::new();
    sockets.insert(socket("dead_a", &[])).unwrap();
    sockets.insert(socket("dead_b", &[])).unwrap();
    sockets.insert(socket("flat", &["flat"])).unwrap();
    let a = tile(
        "a",
        TileCategory::Structure,
        ["dead_a", "dead_a", "flat", "flat", "flat", "flat"],
    );
    let b = tile(
        "b",
        TileCategory::Structure,
        ["dead_b", "dead_b", "flat", "flat", "flat", "flat"],
    );
    Arc::new(TileCatalog::new(sockets, vec![a, b]).unwrap())
}

#[test]
fn test_unsatisfiable_row_fails_without_backtracking() {
    init_test_logging();
    let config = GenerationConfig::builder().size(2, 1, 1).seed(42).build();
    let mut solver = Solver::new(hostile_catalog(), config).unwrap();
    let result = solver.generate();

    assert!(!result.success);
    assert!(result.error.as_deref().unwrap_or("").contains("Contradiction"));
    // Partial results: the first collapse survived.
    assert_eq!(result.assignments.len(), 1);
    assert!(!result.failed_positions.is_empty());
}

#[test]
fn test_unsatisfiable_row_fails_with_backtracking() {
    // Backtracking retries both choices at the first cell; neither can ever
    // satisfy the row, so this seed's outcome is a documented failure.
    let config = GenerationConfig::builder()
        .size(2, 1, 1)
        .seed(42)
        .backtracking(true, 2)
        .build();
    let mut solver = Solver::new(hostile_catalog(), config).unwrap();
    let result = solver.generate();
    assert!(!result.success);
}

#[test]
fn test_failure_is_deterministic() {
    let config = GenerationConfig::builder().size(2, 1, 1).seed(42).build();
    let mut first = Solver::new(hostile_catalog(), config.clone()).unwrap();
    let mut second = Solver::new(hostile_catalog(), config).unwrap();
    let a = first.generate();
    let b = second.generate();
    assert_eq!(a.assignments, b.assignments);
    assert_eq!(a.failed_positions, b.failed_positions);
    assert_eq!(a.error, b.error);
}

// --- Scenario C lives in weave-tiles (rotation variants); here we check the
// --- rule table built from variants stays consistent. ---

#[test]
fn test_rule_table_pure_over_rotated_catalog() {
    let mut sockets = SocketSet::new();
    sockets.insert(socket("a", &["a"])).unwrap();
    sockets.insert(socket("b", &["b"])).unwrap();
    sockets.insert(socket("c", &["c"])).unwrap();
    sockets.insert(socket("d", &["d"])).unwrap();
    sockets.insert(socket("flat", &["flat"])).unwrap();
    let mut spinner = tile(
        "spinner",
        TileCategory::Structure,
        ["a", "c", "flat", "flat", "b", "d"],
    );
    spinner.rotatable = true;
    let mut catalog = TileCatalog::new(sockets, vec![spinner]).unwrap();
    catalog.generate_rotation_variants();
    assert_eq!(catalog.len(), 4);

    let table = RuleTable::build(&catalog);
    assert_eq!(table, RuleTable::build(&catalog));
    // A 90° variant's +X face carries the base tile's +Z socket, so the
    // compatibility row along +X must equal the base row along... itself
    // rotated; spot-check one derived pairing: base "a" (+X) matches only
    // sockets listing "a", i.e. nothing here, so base cannot sit left of
    // base.
    assert!(!table.check(0, 0, Direction::PosX));
}

// --- Adjacency soundness of successful runs ---

#[test]
fn test_successful_run_is_arc_consistent() {
    let mut sockets = SocketSet::new();
    sockets.insert(socket("grass", &["grass", "road"])).unwrap();
    sockets.insert(socket("road", &["road"])).unwrap();
    sockets.insert(socket("flat", &["flat"])).unwrap();
    let field = tile(
        "field",
        TileCategory::Ground,
        ["grass", "grass", "flat", "flat", "grass", "grass"],
    );
    let street = tile(
        "street",
        TileCategory::Ground,
        ["road", "road", "flat", "flat", "road", "road"],
    );
    let catalog = Arc::new(TileCatalog::new(sockets, vec![field, street]).unwrap());
    let config = GenerationConfig::builder().size(4, 1, 4).seed(11).build();
    let mut solver = Solver::new(catalog.clone(), config).unwrap();
    let result = solver.generate();
    assert!(result.success);

    // Every 6-adjacent collapsed pair must have mutually compatible facing
    // sockets.
    for (&(x, y, z), &tile_a) in &result.assignments {
        for dir in Direction::ALL {
            let (dx, dy, dz) = dir.offset();
            let neighbor = (
                x.wrapping_add_signed(dx),
                y.wrapping_add_signed(dy),
                z.wrapping_add_signed(dz),
            );
            let Some(&tile_b) = result.assignments.get(&neighbor) else {
                continue;
            };
            let socket_a = catalog.tile(tile_a).unwrap().socket(dir);
            let socket_b = catalog.tile(tile_b).unwrap().socket(dir.opposite());
            assert!(
                catalog.are_sockets_compatible(socket_a, socket_b),
                "incompatible pair {tile_a}/{tile_b} at {:?} along {dir:?}",
                (x, y, z)
            );
        }
    }
}

// --- Scenario D: support requirement ---

#[test]
fn test_unsupported_tile_never_placed() {
    let mut sockets = SocketSet::new();
    sockets.insert(socket("open", &["open"])).unwrap();
    let air = tile("air", TileCategory::Empty, ["open"; 6]);
    let mut platform = tile("platform", TileCategory::Structure, ["open"; 6]);
    platform.requires_support = true;
    let catalog = Arc::new(TileCatalog::new(sockets, vec![air, platform]).unwrap());

    // Pin the bottom cell to air; the cell above can then never host the
    // support-requiring platform.
    let mut pin = Constraint::new("bottom-air");
    pin.required_positions = vec![(0, 0, 0)];
    pin.allowed_tiles = vec![0];

    for seed in 0..32 {
        let config = GenerationConfig::builder()
            .size(1, 2, 1)
            .seed(seed)
            .backtracking(true, 2)
            .constraint(pin.clone())
            .build();
        let mut solver = Solver::new(catalog.clone(), config).unwrap();
        let result = solver.generate();
        assert_ne!(
            result.tile_at((0, 1, 0)),
            Some(1),
            "platform placed above an empty-only cell with seed {seed}"
        );
    }
}

#[test]
fn test_supported_tile_allowed_on_bottom_layer() {
    let mut sockets = SocketSet::new();
    sockets.insert(socket("open", &["open"])).unwrap();
    let mut platform = tile("platform", TileCategory::Structure, ["open"; 6]);
    platform.requires_support = true;
    let catalog = Arc::new(TileCatalog::new(sockets, vec![platform]).unwrap());

    let config = GenerationConfig::builder().size(2, 1, 2).seed(5).build();
    let mut solver = Solver::new(catalog, config).unwrap();
    let result = solver.generate();
    // The bottom layer of a finite grid counts as supported.
    assert!(result.success);
    assert_eq!(result.assignments.len(), 4);
}

// --- Instance caps ---

#[test]
fn test_max_instances_cap_is_respected() {
    let mut sockets = SocketSet::new();
    sockets.insert(socket("open", &["open"])).unwrap();
    let filler = tile("filler", TileCategory::Structure, ["open"; 6]);
    let mut rare = tile("rare", TileCategory::Decoration, ["open"; 6]);
    rare.max_instances = Some(2);
    rare.weight = 10.0; // strongly preferred, so the cap must do the work
    let catalog = Arc::new(TileCatalog::new(sockets, vec![filler, rare]).unwrap());

    let config = GenerationConfig::builder()
        .size(3, 1, 3)
        .seed(21)
        .backtracking(true, 4)
        .build();
    let mut solver = Solver::new(catalog, config).unwrap();
    let result = solver.generate();
    assert!(result.success);
    let rare_count = result.assignments.values().filter(|&&t| t == 1).count();
    assert!(
        rare_count <= 2,
        "instance cap exceeded: {rare_count} rare tiles placed"
    );
}

// --- Heuristics ---

#[test]
fn test_layered_bottom_up_completes() {
    let catalog = open_catalog(&["a", "b"]);
    let config = GenerationConfig::builder()
        .size(3, 3, 3)
        .seed(9)
        .mode(GenerationMode::LayeredBottomUp)
        .build();
    let mut solver = Solver::new(catalog, config).unwrap();
    let result = solver.generate();
    assert!(result.success);
    assert_eq!(result.assignments.len(), 27);
}

#[test]
fn test_center_outward_starts_at_center() {
    let catalog = open_catalog(&["a", "b"]);
    let config = GenerationConfig::builder()
        .size(3, 3, 3)
        .seed(13)
        .mode(GenerationMode::CenterOutward)
        .max_iterations(1)
        .build();
    let mut solver = Solver::new(catalog, config).unwrap();
    let result = solver.generate();
    // One iteration only: exactly the center cell was collapsed.
    assert!(result.tile_at((1, 1, 1)).is_some());
}

#[test]
fn test_ground_first_completes_floor() {
    let mut sockets = SocketSet::new();
    sockets.insert(socket("open", &["open"])).unwrap();
    let floor = tile("floor", TileCategory::Ground, ["open"; 6]);
    let block = tile("block", TileCategory::Structure, ["open"; 6]);
    let catalog = Arc::new(TileCatalog::new(sockets, vec![floor, block]).unwrap());
    let config = GenerationConfig::builder()
        .size(2, 2, 2)
        .seed(17)
        .mode(GenerationMode::GroundFirst)
        .build();
    let mut solver = Solver::new(catalog, config).unwrap();
    let result = solver.generate();
    assert!(result.success);
    assert_eq!(result.assignments.len(), 8);
}

// --- Periodic boundaries ---

#[test]
fn test_periodic_run_wraps_consistently() {
    let mut sockets = SocketSet::new();
    sockets.insert(socket("am", &["bm"])).unwrap();
    sockets.insert(socket("bm", &[])).unwrap();
    sockets.insert(socket("flat", &["flat"])).unwrap();
    // Along X each tile only pairs with the other one, so an even periodic
    // row is satisfiable only as a perfect alternation.
    let a = tile(
        "a",
        TileCategory::Structure,
        ["am", "am", "flat", "flat", "flat", "flat"],
    );
    let b = tile(
        "b",
        TileCategory::Structure,
        ["bm", "bm", "flat", "flat", "flat", "flat"],
    );
    let catalog = Arc::new(TileCatalog::new(sockets, vec![a, b]).unwrap());
    let config = GenerationConfig::builder()
        .size(4, 1, 1)
        .periodic(true)
        .seed(2)
        .backtracking(true, 4)
        .build();
    let mut solver = Solver::new(catalog, config).unwrap();
    let result = solver.generate();
    assert!(result.success);
    // Wrap-around adjacency holds: tiles alternate around the ring.
    let ring: Vec<usize> = (0..4).map(|x| result.tile_at((x, 0, 0)).unwrap()).collect();
    for x in 0..4 {
        assert_ne!(ring[x], ring[(x + 1) % 4], "ring {ring:?} does not alternate");
    }
}

// --- Iteration limit ---

#[test]
fn test_iteration_limit_surfaces_as_failure() {
    let catalog = open_catalog(&["a", "b"]);
    let config = GenerationConfig::builder()
        .size(4, 4, 4)
        .seed(1)
        .max_iterations(3)
        .build();
    let mut solver = Solver::new(catalog, config).unwrap();
    let result = solver.generate();
    assert!(!result.success);
    assert!(result.error.as_deref().unwrap_or("").contains("iterations"));
    // Partial progress was kept.
    assert!(!result.assignments.is_empty());
    assert!(!result.failed_positions.is_empty());
}
