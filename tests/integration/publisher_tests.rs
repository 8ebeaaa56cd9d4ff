use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::Level;

use packmind::assert_log_contains;
use packmind::core::{CodingAgent, DistributionStatus, OrganizationId, RenderMode};
use packmind::deployments::{PackagePublisher, PublishPackagesCommand};
use packmind::events::{DomainEvent, EventBus, EventKind};
use packmind::storage::CatalogData;
use packmind::test_utils::factories::{self, ORGANIZATION, USER};
use packmind::test_utils::fakes::{FakePorts, GitBehaviour};
use packmind::test_utils::logging::capture_logs;

fn catalog() -> CatalogData {
    CatalogData {
        spaces: vec![factories::space(factories::SPACE, ORGANIZATION)],
        recipe_versions: vec![
            factories::recipe_version("r-1", "Alpha", 1),
            factories::recipe_version("r-1", "Alpha", 2),
            factories::recipe_version("r-2", "Beta", 1),
        ],
        standard_versions: vec![factories::standard_version("s-1", "Gamma", 3)],
        targets: vec![
            factories::target("t-1", "api", "repo-1"),
            factories::target("t-2", "worker", "repo-1"),
            factories::target("t-3", "web", "repo-2"),
        ],
        repositories: vec![factories::git_repo("repo-1"), factories::git_repo("repo-2")],
        render_modes: BTreeMap::from([(
            OrganizationId::from(ORGANIZATION),
            vec![RenderMode::Packmind],
        )]),
        ..CatalogData::default()
    }
}

fn ports() -> FakePorts {
    FakePorts::new(
        catalog(),
        vec![
            factories::package("pkg-1", "Backend", &["r-1", "r-2"], &["s-1"]),
            factories::package("pkg-2", "Frontend", &["r-1"], &[]),
            factories::package("pkg-3", "Broken", &["r-404"], &[]),
        ],
    )
}

fn command(packages: &[&str], targets: &[&str]) -> PublishPackagesCommand {
    PublishPackagesCommand {
        organization_id: ORGANIZATION.into(),
        user_id: USER.into(),
        package_ids: packages.iter().map(|&id| id.into()).collect(),
        target_ids: targets.iter().map(|&id| id.into()).collect(),
    }
}

#[test]
fn test_requires_packages_and_targets() {
    let ports = ports();
    let publisher = PackagePublisher::new(ports.publisher_ports());

    let err = publisher.publish(&command(&[], &["t-1"])).unwrap_err();
    assert_eq!(err.code(), "argument");
    assert_eq!(err.to_string(), "packageIds must be provided");

    let err = publisher.publish(&command(&["pkg-1"], &[])).unwrap_err();
    assert_eq!(err.to_string(), "targetIds must be provided");

    assert!(ports.catalog.calls.all().is_empty());
    assert!(ports.packages.calls.all().is_empty());
    assert!(ports.git.commits().is_empty());
}

#[test]
fn test_shared_recipe_is_resolved_once_at_latest_version() {
    let ports = ports();
    let publisher = PackagePublisher::new(ports.publisher_ports());

    let deployments = publisher
        .publish(&command(&["pkg-1", "pkg-2"], &["t-1"]))
        .unwrap();

    assert_eq!(ports.catalog.calls.count("list_recipe_versions"), 2);
    let recipes = &ports.coding_agents.recipe_commands()[0].recipe_versions;
    let summary: Vec<(&str, u32)> = recipes.iter().map(|v| (v.name.as_str(), v.version)).collect();
    assert_eq!(summary, vec![("Alpha", 2), ("Beta", 1)]);
    assert_eq!(ports.coding_agents.standard_commands().len(), 1);

    assert_eq!(deployments.len(), 1);
    assert_eq!(deployments[0].status, DistributionStatus::Success);
    assert_eq!(deployments[0].packages.len(), 2);
    assert_eq!(ports.git.commits().len(), 1);
}

#[test]
fn test_two_packages_sharing_artefacts_publish_as_one_deployment() {
    let ports = FakePorts::new(
        CatalogData {
            spaces: vec![factories::space(factories::SPACE, ORGANIZATION)],
            recipe_versions: vec![
                factories::recipe_version("R-shared", "Shared command", 1),
                factories::recipe_version("R-unique", "Unique command", 1),
            ],
            standard_versions: vec![
                factories::standard_version("S-shared", "Shared standard", 1),
                factories::standard_version("S-unique", "Unique standard", 1),
            ],
            targets: vec![factories::target("t-1", "api", "repo-1")],
            repositories: vec![factories::git_repo("repo-1")],
            render_modes: BTreeMap::from([(
                OrganizationId::from(ORGANIZATION),
                vec![RenderMode::Packmind],
            )]),
            ..CatalogData::default()
        },
        vec![
            factories::package("package-1", "Package one", &["R-shared", "R-unique"], &["S-shared"]),
            factories::package("package-2", "Package two", &["R-shared"], &["S-shared", "S-unique"]),
        ],
    );
    let publisher = PackagePublisher::new(ports.publisher_ports());

    let deployments = publisher
        .publish(&command(&["package-1", "package-2"], &["t-1"]))
        .unwrap();

    assert_eq!(ports.catalog.calls.count("list_recipe_versions"), 2);
    assert_eq!(ports.catalog.calls.count("get_latest_standard_version"), 2);

    let recipes = &ports.coding_agents.recipe_commands()[0].recipe_versions;
    let recipe_ids: Vec<&str> = recipes.iter().map(|v| v.recipe_id.as_str()).collect();
    assert_eq!(recipe_ids, vec!["R-shared", "R-unique"]);
    let standards = &ports.coding_agents.standard_commands()[0].standard_versions;
    let standard_ids: Vec<&str> = standards.iter().map(|v| v.standard_id.as_str()).collect();
    assert_eq!(standard_ids, vec!["S-shared", "S-unique"]);

    assert_eq!(deployments.len(), 1);
    assert_eq!(deployments[0].status, DistributionStatus::Success);
    assert_eq!(deployments[0].packages.len(), 2);
    assert_eq!(ports.deployments.records().len(), 1);
    assert_eq!(ports.git.commits().len(), 1);
}

#[test]
fn test_targets_sharing_a_repository_share_one_commit() {
    let ports = ports();
    let publisher = PackagePublisher::new(ports.publisher_ports());

    let deployments = publisher.publish(&command(&["pkg-1"], &["t-1", "t-2"])).unwrap();

    let commits = ports.git.commits();
    assert_eq!(commits.len(), 1);
    assert!(commits[0].message.contains("- Targets: api, worker"));
    assert_eq!(ports.coding_agents.recipe_commands()[0].targets.len(), 2);

    assert_eq!(deployments.len(), 2);
    let shas: Vec<&str> = deployments
        .iter()
        .map(|d| d.git_commit.as_ref().unwrap().sha.as_str())
        .collect();
    assert_eq!(shas[0], shas[1]);
    assert_eq!(ports.deployments.records().len(), 2);
}

#[test]
fn test_failure_in_one_repository_does_not_stop_others() {
    let ports = ports();
    ports
        .git
        .set_behaviour("repo-2", GitBehaviour::Fail("push rejected".to_string()));
    let publisher = PackagePublisher::new(ports.publisher_ports());

    let (result, logs) = capture_logs(|| publisher.publish(&command(&["pkg-1"], &["t-1", "t-3"])));
    let deployments = result.unwrap();

    assert_eq!(deployments.len(), 2);
    let ok = deployments.iter().find(|d| d.target.id.as_str() == "t-1").unwrap();
    assert_eq!(ok.status, DistributionStatus::Success);
    assert!(ok.error.is_none());
    assert_eq!(ok.recipe_versions.len(), 2);

    let failed = deployments.iter().find(|d| d.target.id.as_str() == "t-3").unwrap();
    assert_eq!(failed.status, DistributionStatus::Failure);
    assert_eq!(failed.error.as_deref(), Some("push rejected"));
    assert!(failed.git_commit.is_none());
    assert!(failed.recipe_versions.is_empty());
    assert!(failed.standard_versions.is_empty());

    assert_eq!(ports.deployments.records().len(), 2);
    assert_log_contains!(logs, Level::ERROR, "Repository deployment failed");
}

#[test]
fn test_no_changes_is_recorded_not_failed() {
    let ports = ports();
    ports.git.set_behaviour("repo-1", GitBehaviour::NoChanges);
    let publisher = PackagePublisher::new(ports.publisher_ports());

    let deployments = publisher.publish(&command(&["pkg-1"], &["t-1"])).unwrap();

    assert_eq!(deployments[0].status, DistributionStatus::NoChanges);
    assert!(deployments[0].error.is_none());
    assert!(deployments[0].git_commit.is_none());
    assert_eq!(deployments[0].recipe_versions.len(), 2);
    assert_eq!(deployments[0].standard_versions.len(), 1);
}

#[test]
fn test_previously_deployed_versions_are_kept_in_the_repository() {
    let ports = ports();
    ports.active_versions.set_recipes(
        "t-1",
        vec![
            factories::recipe_version("r-9", "Older", 4),
            factories::recipe_version("r-1", "Alpha", 1),
        ],
    );
    let publisher = PackagePublisher::new(ports.publisher_ports());

    let deployments = publisher.publish(&command(&["pkg-2"], &["t-1"])).unwrap();

    let recipes = &ports.coding_agents.recipe_commands()[0].recipe_versions;
    let summary: Vec<(&str, u32)> = recipes.iter().map(|v| (v.name.as_str(), v.version)).collect();
    assert_eq!(summary, vec![("Alpha", 2), ("Older", 4)]);
    assert_eq!(ports.coding_agents.calls.count("prepare_standards_deployment"), 0);

    let message = &ports.git.commits()[0].message;
    assert!(message.contains("- Updated 1 recipe(s)"));
    assert!(message.contains("- Total recipes in repository: 2"));
    assert_eq!(deployments[0].recipe_versions.len(), 2);
}

#[test]
fn test_recipe_without_versions_is_skipped_with_warning() {
    let ports = ports();
    let publisher = PackagePublisher::new(ports.publisher_ports());

    let (result, logs) = capture_logs(|| publisher.publish(&command(&["pkg-3"], &["t-1"])));
    let deployments = result.unwrap();

    assert_log_contains!(logs, Level::WARN, "Recipe has no versions");
    assert!(ports.coding_agents.recipe_commands().is_empty());
    assert!(deployments[0].recipe_versions.is_empty());
}

#[test]
fn test_unknown_target_or_package_fails_before_any_commit() {
    let ports = ports();
    let publisher = PackagePublisher::new(ports.publisher_ports());

    let err = publisher.publish(&command(&["pkg-1"], &["t-404"])).unwrap_err();
    assert_eq!(err.code(), "not_found");
    let err = publisher.publish(&command(&["pkg-404"], &["t-1"])).unwrap_err();
    assert_eq!(err.to_string(), "Package with id pkg-404 not found");

    assert!(ports.git.commits().is_empty());
    assert!(ports.deployments.records().is_empty());
}

#[test]
fn test_render_modes_choose_coding_agents() {
    let ports = ports();
    ports.catalog.update(|data| {
        data.render_modes.insert(
            ORGANIZATION.into(),
            vec![RenderMode::Packmind, RenderMode::Claude, RenderMode::Packmind],
        );
    });
    let publisher = PackagePublisher::new(ports.publisher_ports());

    let deployments = publisher.publish(&command(&["pkg-2"], &["t-1"])).unwrap();

    assert_eq!(
        ports.coding_agents.recipe_commands()[0].coding_agents,
        vec![CodingAgent::Packmind, CodingAgent::Claude]
    );
    assert_eq!(deployments[0].render_modes.len(), 3);
}

#[test]
fn test_published_event_and_commit_prefix() {
    let ports = ports();
    let bus = Arc::new(EventBus::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    bus.subscribe(EventKind::PackagesPublished, move |event| {
        sink.lock().push(event.clone());
    });
    let publisher = PackagePublisher::new(ports.publisher_ports())
        .with_events(bus)
        .with_commit_prefix("chore: sync playbook");

    let deployments = publisher.publish(&command(&["pkg-1"], &["t-1", "t-3"])).unwrap();

    assert!(ports.git.commits()[0].message.starts_with("chore: sync playbook\n"));
    let events = seen.lock();
    assert_eq!(events.len(), 1);
    let DomainEvent::PackagesPublished { deployment_ids, .. } = &events[0] else {
        panic!("unexpected event {:?}", events[0]);
    };
    assert_eq!(deployment_ids.len(), deployments.len());
}
