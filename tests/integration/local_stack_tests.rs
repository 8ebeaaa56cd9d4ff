//! Publishing through the SQLite, JSON catalog and git2 adapters.

use std::sync::Arc;

use packmind::core::{ArtefactKind, DistributionStatus, OrganizationId, PackageId, TargetId};
use packmind::deployments::ports::{
    ActiveVersionsRepository, PackageRepository, PackagesDeploymentRepository,
};
use packmind::deployments::{
    CatalogPorts, CreatePackageCommand, MarkdownRenderer, PackageCatalog, PackagePublisher,
    PublishPackagesCommand, PublisherPorts,
};
use packmind::events::{DomainEvent, EventBus, EventPublisher, register_package_cleanup};
use packmind::storage::{Catalog, Database, GitArchive};
use packmind::test_utils::factories::{ORGANIZATION, SPACE, USER};
use packmind::test_utils::fixtures::PackmindFixture;

struct Stack {
    db: Arc<Database>,
    catalog: Arc<Catalog>,
    git: Arc<GitArchive>,
}

impl Stack {
    fn open(fixture: &PackmindFixture) -> Self {
        let catalog = Catalog::load(fixture.catalog_path()).unwrap();
        let git = GitArchive::new(catalog.repositories());
        Self {
            db: Arc::new(fixture.open_db()),
            catalog: Arc::new(catalog),
            git: Arc::new(git),
        }
    }

    fn package_catalog(&self) -> PackageCatalog {
        PackageCatalog::new(CatalogPorts {
            packages: self.db.clone(),
            spaces: self.catalog.clone(),
            recipes: self.catalog.clone(),
            standards: self.catalog.clone(),
            skills: self.catalog.clone(),
        })
    }

    fn publisher(&self) -> PackagePublisher {
        PackagePublisher::new(PublisherPorts {
            packages: self.db.clone(),
            recipes: self.catalog.clone(),
            standards: self.catalog.clone(),
            active_versions: self.db.clone(),
            git: self.git.clone(),
            coding_agents: Arc::new(MarkdownRenderer::new()),
            targets: self.catalog.clone(),
            render_modes: self.catalog.clone(),
            deployments: self.db.clone(),
        })
    }

    fn create_package(&self) -> PackageId {
        self.package_catalog()
            .create_package(&CreatePackageCommand {
                organization_id: ORGANIZATION.into(),
                user_id: USER.into(),
                space_id: SPACE.into(),
                name: "Backend".to_string(),
                description: String::new(),
                recipe_ids: vec!["recipe-1".into()],
                standard_ids: vec!["standard-1".into()],
                skill_ids: Vec::new(),
            })
            .unwrap()
            .id
    }
}

fn publish(stack: &Stack, package: &PackageId, target: &str) -> DistributionStatus {
    let deployments = stack
        .publisher()
        .publish(&PublishPackagesCommand {
            organization_id: ORGANIZATION.into(),
            user_id: USER.into(),
            package_ids: vec![package.clone()],
            target_ids: vec![target.into()],
        })
        .unwrap();
    assert_eq!(deployments.len(), 1);
    deployments[0].status
}

#[test]
fn test_publish_commits_rendered_files_then_reports_no_changes() {
    let fixture = PackmindFixture::new();
    let stack = Stack::open(&fixture);
    let package = stack.create_package();

    assert_eq!(publish(&stack, &package, "t-root"), DistributionStatus::Success);

    let recipe = fixture.repo_file(".packmind/recipes/my-command.md").unwrap();
    assert!(recipe.starts_with("# My Command\n"));
    assert!(fixture.repo_file(".packmind/standards/my-standard.md").is_some());
    let agents = fixture.repo_file("AGENTS.md").unwrap();
    assert!(agents.contains("<!-- start: Packmind recipes -->"));
    assert!(agents.contains("<!-- start: Packmind standards -->"));

    assert_eq!(publish(&stack, &package, "t-root"), DistributionStatus::NoChanges);

    let history = stack
        .db
        .list_deployments(&OrganizationId::from(ORGANIZATION), None)
        .unwrap();
    let statuses: Vec<DistributionStatus> = history.iter().map(|d| d.status).collect();
    assert_eq!(
        statuses,
        vec![DistributionStatus::NoChanges, DistributionStatus::Success]
    );

    let active = stack
        .db
        .list_active_recipe_versions_by_target(
            &OrganizationId::from(ORGANIZATION),
            &TargetId::from("t-root"),
        )
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].version, 2);
}

#[test]
fn test_target_path_prefixes_files_and_existing_instructions_survive() {
    let fixture = PackmindFixture::new();
    std::fs::create_dir_all(fixture.repo_path.join("services/api")).unwrap();
    std::fs::write(
        fixture.repo_path.join("services/api/AGENTS.md"),
        "# Team notes\n\nKeep handlers small.\n",
    )
    .unwrap();
    let stack = Stack::open(&fixture);
    let package = stack.create_package();

    assert_eq!(publish(&stack, &package, "t-api"), DistributionStatus::Success);

    assert!(
        fixture
            .repo_file("services/api/.packmind/recipes/my-command.md")
            .is_some()
    );
    assert!(fixture.repo_file(".packmind/recipes/my-command.md").is_none());
    let agents = fixture.repo_file("services/api/AGENTS.md").unwrap();
    assert!(agents.starts_with("# Team notes\n\nKeep handlers small.\n"));
    assert!(agents.contains("<!-- end: Packmind recipes -->"));
}

#[test]
fn test_artefact_deletion_cleans_stored_packages() {
    let fixture = PackmindFixture::new();
    let stack = Stack::open(&fixture);
    let package = stack.create_package();

    let bus = EventBus::new();
    register_package_cleanup(&bus, stack.db.clone());
    bus.publish(&DomainEvent::ArtefactDeleted {
        kind: ArtefactKind::Standard,
        id: "standard-1".to_string(),
        space_id: SPACE.into(),
    });

    let stored = stack.db.find_package_by_id(&package).unwrap().unwrap();
    assert!(stored.standards.is_empty());
    assert_eq!(stored.recipes.len(), 1);
}
