//! Sample graphs shared by unit tests

use super::graph::{PermissionGraph, TargetSpec};
use super::scope::{Group, GroupId, TargetKind, TargetPath};
use super::tree::PermissionTree;
use super::value::{CollectionAccess, DataAccess, NativeQuery, PermissionValues};

pub const ALL_USERS: u32 = 1;
pub const ADMINISTRATORS: u32 = 2;
pub const COLLECTION: u32 = 3;
pub const DATA: u32 = 4;
pub const NOSQL: u32 = 5;
pub const READONLY: u32 = 6;

pub const TABLES: [(&str, &str); 4] = [
    ("orders", "Orders"),
    ("people", "People"),
    ("products", "Products"),
    ("reviews", "Reviews"),
];

fn groups() -> Vec<Group> {
    vec![
        Group::admin(ADMINISTRATORS, "Administrators").with_members(1),
        Group::new(ALL_USERS, "All Users").with_members(5),
        Group::new(COLLECTION, "collection"),
        Group::new(DATA, "data"),
        Group::new(NOSQL, "nosql"),
        Group::new(READONLY, "readonly"),
    ]
}

fn database(data: DataAccess, native: NativeQuery) -> PermissionValues {
    PermissionValues {
        data: Some(data),
        native: Some(native),
        collection: None,
    }
}

fn collection(access: CollectionAccess) -> PermissionValues {
    PermissionValues {
        collection: Some(access),
        ..Default::default()
    }
}

/// "Sample Dataset" with four tables
pub fn sample_data_graph() -> PermissionGraph {
    let mut db = TargetSpec::new("1", "Sample Dataset", TargetKind::Database);
    for (id, name) in TABLES {
        db = db.with_child(TargetSpec::new(id, name, TargetKind::Table));
    }

    let mut graph = PermissionGraph {
        revision: 0,
        groups: groups(),
        targets: vec![db],
        grants: Default::default(),
    };

    let path = TargetPath::parse("1");
    graph.set_grant(
        GroupId(ADMINISTRATORS),
        &path,
        database(DataAccess::Allowed, NativeQuery::Allowed),
    );
    graph.set_grant(
        GroupId(DATA),
        &path,
        database(DataAccess::Allowed, NativeQuery::Allowed),
    );
    graph.set_grant(
        GroupId(NOSQL),
        &path,
        database(DataAccess::Allowed, NativeQuery::Disallowed),
    );
    graph
}

/// "Our analytics" plus the First -> Second -> Third collection chain
pub fn sample_collection_graph() -> PermissionGraph {
    let chain = TargetSpec::new("first", "First collection", TargetKind::Collection).with_child(
        TargetSpec::new("second", "Second collection", TargetKind::Collection).with_child(
            TargetSpec::new("third", "Third collection", TargetKind::Collection),
        ),
    );

    let mut graph = PermissionGraph {
        revision: 0,
        groups: groups(),
        targets: vec![
            TargetSpec::new("root", "Our analytics", TargetKind::Collection),
            chain,
        ],
        grants: Default::default(),
    };

    for path in ["root", "first", "first/second", "first/second/third"] {
        let path = TargetPath::parse(path);
        graph.set_grant(GroupId(ADMINISTRATORS), &path, collection(CollectionAccess::Curate));
        graph.set_grant(GroupId(COLLECTION), &path, collection(CollectionAccess::Curate));
        graph.set_grant(GroupId(READONLY), &path, collection(CollectionAccess::View));
    }
    graph
}

pub fn data_tree() -> PermissionTree {
    sample_data_graph().to_tree().expect("sample data graph is valid")
}

pub fn collection_tree() -> PermissionTree {
    sample_collection_graph()
        .to_tree()
        .expect("sample collection graph is valid")
}

/// Both sample graphs in one, as a store would hold them
pub fn sample_graph() -> PermissionGraph {
    let mut graph = sample_data_graph();
    let collections = sample_collection_graph();
    graph.targets.extend(collections.targets);
    for (group, grants) in collections.grants {
        graph.grants.entry(group).or_default().extend(grants);
    }
    graph
}
