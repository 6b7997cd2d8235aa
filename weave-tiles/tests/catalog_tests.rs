//! Integration tests for catalog loading and rotation expansion.

use proptest::prelude::*;
use std::io::Write;
use weave_tiles::direction::Direction;
use weave_tiles::loader::load_catalog_from_file;
use weave_tiles::{LoadError, TileCategory};

const CATALOG: &str = r#"(
    sockets: [
        (name: "path", compatible: ["path"]),
        (name: "wall", compatible: ["wall"]),
        (name: "flat", compatible: ["flat"]),
    ],
    tiles: [
        (
            name: "corridor",
            category: Structure,
            sockets: ["path", "path", "flat", "flat", "wall", "wall"],
            weight: 1.0,
            rotatable: true,
            asset: "meshes/corridor",
        ),
        (
            name: "void",
            category: Empty,
            sockets: ["empty", "empty", "empty", "empty", "empty", "empty"],
            asset: "none",
        ),
    ],
)"#;

fn write_catalog(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_with_rotation_expansion() {
    let file = write_catalog(CATALOG);
    let catalog = load_catalog_from_file(file.path(), true).unwrap();

    // 2 authored tiles, corridor gains 3 variants.
    assert_eq!(catalog.len(), 5);
    let r90 = catalog
        .tile(catalog.index_of("corridor_r90").unwrap())
        .unwrap();
    assert_eq!(r90.socket(Direction::PosX), "wall");
    assert_eq!(r90.socket(Direction::PosZ), "path");
    assert_eq!(r90.socket(Direction::PosY), "flat");
    assert!(!r90.rotatable);
}

#[test]
fn test_load_without_rotation_expansion() {
    let file = write_catalog(CATALOG);
    let catalog = load_catalog_from_file(file.path(), false).unwrap();
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.tiles_by_category(TileCategory::Empty), vec![1]);
}

#[test]
fn test_load_missing_file() {
    let result = load_catalog_from_file(std::path::Path::new("/no/such/catalog.ron"), false);
    assert!(matches!(result, Err(LoadError::Io(_))));
}

#[test]
fn test_load_rejects_unknown_socket_reference() {
    let content = r#"(
        sockets: [(name: "path", compatible: ["path"])],
        tiles: [(
            name: "broken",
            sockets: ["path", "path", "ghost", "path", "path", "path"],
            asset: "x",
        )],
    )"#;
    let file = write_catalog(content);
    let result = load_catalog_from_file(file.path(), false);
    assert!(matches!(result, Err(LoadError::InvalidData(msg)) if msg.contains("ghost")));
}

proptest! {
    /// Four quarter turns always restore the authored socket array.
    #[test]
    fn prop_four_rotations_identity(sockets in proptest::array::uniform6("[a-z]{1,8}")) {
        let tile = weave_tiles::TileDefinition {
            name: "probe".to_owned(),
            category: TileCategory::Structure,
            sockets: sockets.clone(),
            weight: 1.0,
            rotatable: true,
            base_rotation: weave_tiles::Rotation::R0,
            max_instances: None,
            requires_support: false,
            asset: "probe".to_owned(),
        };
        prop_assert_eq!(tile.rotated_sockets(4), sockets);
    }

    /// Rotation steps compose additively modulo a full turn.
    #[test]
    fn prop_rotations_compose(steps_a in 0usize..4, steps_b in 0usize..4) {
        for dir in Direction::ALL {
            prop_assert_eq!(
                dir.rotated_y_by(steps_a).rotated_y_by(steps_b),
                dir.rotated_y_by(steps_a + steps_b)
            );
        }
    }
}
