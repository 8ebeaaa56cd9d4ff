use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use packmind::core::{ArtefactKind, Recipe, SpaceId};
use packmind::deployments::{
    AddArtefactsCommand, CreatePackageCommand, DeletePackagesCommand, PackageCatalog,
    UpdatePackageCommand,
};
use packmind::events::{DomainEvent, EventBus, EventKind, EventPublisher, register_package_cleanup};
use packmind::storage::CatalogData;
use packmind::test_utils::factories::{self, ORGANIZATION, SPACE, USER};
use packmind::test_utils::fakes::FakePorts;

fn foreign_recipe() -> Recipe {
    Recipe {
        id: "recipe-x".into(),
        space_id: "space-2".into(),
        ..factories::recipe(1)
    }
}

fn ports() -> FakePorts {
    FakePorts::new(
        CatalogData {
            spaces: vec![
                factories::space(SPACE, ORGANIZATION),
                factories::space("space-2", "org-2"),
            ],
            recipes: vec![factories::recipe(1), foreign_recipe()],
            standards: vec![factories::standard(1)],
            skills: vec![factories::skill(1)],
            ..CatalogData::default()
        },
        vec![factories::package("pkg-1", "Backend", &["recipe-1"], &[])],
    )
}

fn create(space: &str, name: &str, recipes: &[&str]) -> CreatePackageCommand {
    CreatePackageCommand {
        organization_id: ORGANIZATION.into(),
        user_id: USER.into(),
        space_id: space.into(),
        name: name.to_string(),
        description: "Shared rules".to_string(),
        recipe_ids: recipes.iter().map(|&id| id.into()).collect(),
        standard_ids: Vec::new(),
        skill_ids: Vec::new(),
    }
}

fn add(recipes: &[&str], standards: &[&str]) -> AddArtefactsCommand {
    AddArtefactsCommand {
        organization_id: ORGANIZATION.into(),
        user_id: USER.into(),
        package_id: "pkg-1".into(),
        recipe_ids: recipes.iter().map(|&id| id.into()).collect(),
        standard_ids: standards.iter().map(|&id| id.into()).collect(),
        skill_ids: Vec::new(),
    }
}

#[test]
fn test_create_package_gets_unique_slug_and_skips_unused_ports() {
    let ports = ports();
    let catalog = PackageCatalog::new(ports.catalog_ports());

    let package = catalog
        .create_package(&create(SPACE, "Backend", &["recipe-1"]))
        .unwrap();

    assert_eq!(package.slug, "backend-1");
    assert_eq!(package.description, "Shared rules");
    assert_eq!(package.created_by.as_str(), USER);
    assert_eq!(ports.packages.packages().len(), 2);
    assert_eq!(ports.catalog.calls.count("get_recipe_by_id"), 1);
    assert_eq!(ports.catalog.calls.count("get_standard_by_id"), 0);
    assert_eq!(ports.catalog.calls.count("get_skill_by_id"), 0);
}

#[test]
fn test_create_package_validates_space_and_artefacts() {
    let ports = ports();
    let catalog = PackageCatalog::new(ports.catalog_ports());

    let err = catalog.create_package(&create("space-404", "X", &[])).unwrap_err();
    assert_eq!(err.to_string(), "Space with id space-404 not found");

    let err = catalog.create_package(&create("space-2", "X", &[])).unwrap_err();
    assert_eq!(err.code(), "forbidden");

    let err = catalog
        .create_package(&create(SPACE, "X", &["recipe-x"]))
        .unwrap_err();
    assert_eq!(err.to_string(), "Recipe recipe-x does not belong to space space-1");

    let err = catalog
        .create_package(&create(SPACE, "X", &["recipe-404"]))
        .unwrap_err();
    assert_eq!(err.to_string(), "Recipe with id recipe-404 not found");

    assert_eq!(ports.packages.calls.count("add_package"), 0);
    assert_eq!(ports.packages.packages().len(), 1);
}

#[test]
fn test_add_artefacts_only_adds_new_members() {
    let ports = ports();
    let catalog = PackageCatalog::new(ports.catalog_ports());

    let package = catalog
        .add_artefacts_to_package(&add(&["recipe-1"], &["standard-1"]))
        .unwrap();

    assert_eq!(package.recipes.len(), 1);
    assert_eq!(package.standards.len(), 1);
    assert_eq!(ports.packages.calls.count("add_recipes"), 0);
    assert_eq!(ports.packages.calls.count("add_standards"), 1);
    assert_eq!(ports.catalog.calls.count("get_recipe_by_id"), 0);
}

#[test]
fn test_add_nothing_new_is_a_no_op() {
    let ports = ports();
    let catalog = PackageCatalog::new(ports.catalog_ports());

    let package = catalog.add_artefacts_to_package(&add(&["recipe-1"], &[])).unwrap();

    assert_eq!(package.recipes.len(), 1);
    assert_eq!(ports.catalog.calls.count("get_recipe_by_id"), 0);
    assert_eq!(ports.packages.calls.count("add_recipes"), 0);
}

#[test]
fn test_update_package_replaces_members() {
    let ports = ports();
    let catalog = PackageCatalog::new(ports.catalog_ports());

    let package = catalog
        .update_package(&UpdatePackageCommand {
            organization_id: ORGANIZATION.into(),
            user_id: USER.into(),
            package_id: "pkg-1".into(),
            name: "Backend rules".to_string(),
            description: "Renamed".to_string(),
            recipe_ids: Vec::new(),
            standard_ids: vec!["standard-1".into()],
            skill_ids: vec!["skill-1".into()],
        })
        .unwrap();

    assert_eq!(package.slug, "backend");
    assert!(package.recipes.is_empty());
    let stored = &ports.packages.packages()[0];
    assert_eq!(stored.name, "Backend rules");
    assert_eq!(stored.skills.len(), 1);
}

#[test]
fn test_delete_batch_is_all_or_nothing() {
    let ports = ports();
    let bus = Arc::new(EventBus::new());
    let deletions = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&deletions);
    bus.subscribe(EventKind::PackagesDeleted, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let catalog = PackageCatalog::new(ports.catalog_ports()).with_events(bus);

    let command = |ids: &[&str], space: &str| DeletePackagesCommand {
        space_id: space.into(),
        package_ids: ids.iter().map(|&id| id.into()).collect(),
        user_id: USER.into(),
    };

    let err = catalog
        .delete_packages_batch(&command(&["pkg-1", "pkg-404"], SPACE))
        .unwrap_err();
    assert_eq!(err.to_string(), "Package pkg-404 not found");
    let err = catalog
        .delete_packages_batch(&command(&["pkg-1"], "space-2"))
        .unwrap_err();
    assert_eq!(err.code(), "forbidden");
    assert!(ports.packages.deleted().is_empty());
    assert_eq!(deletions.load(Ordering::SeqCst), 0);

    catalog.delete_packages_batch(&command(&["pkg-1"], SPACE)).unwrap();
    assert_eq!(ports.packages.deleted().len(), 1);
    assert!(catalog.list_packages(&SpaceId::from(SPACE)).unwrap().is_empty());
    assert_eq!(deletions.load(Ordering::SeqCst), 1);
}

#[test]
fn test_deleted_artefact_is_removed_from_packages() {
    let ports = ports();
    let bus = EventBus::new();
    register_package_cleanup(&bus, ports.packages.clone());

    assert!(bus.publish(&DomainEvent::ArtefactDeleted {
        kind: ArtefactKind::Recipe,
        id: "recipe-1".to_string(),
        space_id: SPACE.into(),
    }));

    assert!(ports.packages.packages()[0].recipes.is_empty());
    assert_eq!(ports.packages.calls.count("remove_artefact_from_packages"), 1);
}
