//! SQLite persistence for packages and deployment history

use std::path::Path;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

use crate::core::{
    DistributionStatus, OrganizationId, Package, PackageId, PackagesDeployment, RecipeId,
    RecipeVersion, SkillId, SpaceId, StandardId, StandardVersion, TargetId, UserId,
};
use crate::deployments::ports::{
    ActiveVersionsRepository, PackageRepository, PackagesDeploymentRepository,
};
use crate::error::Result;
use crate::storage::migrations;

const KIND_RECIPE: &str = "recipe";
const KIND_STANDARD: &str = "standard";
const KIND_SKILL: &str = "skill";

/// SQLite database holding packages and the append-only deployment log.
pub struct Database {
    conn: Mutex<Connection>,
    schema_version: u32,
}

impl Database {
    /// Open database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::configure_pragmas(&conn)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let schema_version = migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            schema_version,
        })
    }

    /// Current schema version after migrations.
    pub const fn schema_version(&self) -> u32 {
        self.schema_version
    }

    fn configure_pragmas(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;",
        )?;
        Ok(())
    }

    fn load_members(conn: &Connection, package: &mut Package) -> Result<()> {
        let mut stmt = conn.prepare(
            "SELECT kind, artefact_id FROM package_members
             WHERE package_id = ?1 ORDER BY position",
        )?;
        let rows = stmt.query_map([package.id.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for row in rows {
            let (kind, id) = row?;
            match kind.as_str() {
                KIND_RECIPE => package.recipes.push(RecipeId::from(id)),
                KIND_STANDARD => package.standards.push(StandardId::from(id)),
                KIND_SKILL => package.skills.push(SkillId::from(id)),
                _ => {}
            }
        }
        Ok(())
    }

    fn insert_members(
        conn: &Connection,
        package_id: &PackageId,
        kind: &str,
        ids: &[&str],
    ) -> Result<()> {
        let next: i64 = conn.query_row(
            "SELECT COALESCE(MAX(position), -1) + 1 FROM package_members WHERE package_id = ?1",
            [package_id.as_str()],
            |row| row.get(0),
        )?;
        let mut stmt = conn.prepare(
            "INSERT OR IGNORE INTO package_members (package_id, kind, artefact_id, position)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for (offset, id) in (0_i64..).zip(ids) {
            stmt.execute(params![package_id.as_str(), kind, id, next + offset])?;
        }
        Ok(())
    }

    fn insert_all_members(conn: &Connection, package: &Package) -> Result<()> {
        let recipes: Vec<&str> = package.recipes.iter().map(RecipeId::as_str).collect();
        let standards: Vec<&str> = package.standards.iter().map(StandardId::as_str).collect();
        let skills: Vec<&str> = package.skills.iter().map(SkillId::as_str).collect();
        Self::insert_members(conn, &package.id, KIND_RECIPE, &recipes)?;
        Self::insert_members(conn, &package.id, KIND_STANDARD, &standards)?;
        Self::insert_members(conn, &package.id, KIND_SKILL, &skills)?;
        Ok(())
    }

    fn deployments_for_target(
        &self,
        organization_id: &OrganizationId,
        target_id: &TargetId,
    ) -> Result<Vec<PackagesDeployment>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT payload_json FROM packages_deployments
             WHERE organization_id = ?1 AND target_id = ?2 AND status IN (?3, ?4)
             ORDER BY created_at",
        )?;
        let rows = stmt.query_map(
            params![
                organization_id.as_str(),
                target_id.as_str(),
                DistributionStatus::Success.as_str(),
                DistributionStatus::NoChanges.as_str()
            ],
            |row| row.get::<_, String>(0),
        )?;
        let mut deployments = Vec::new();
        for payload in rows {
            deployments.push(serde_json::from_str(&payload?)?);
        }
        Ok(deployments)
    }
}

fn package_from_row(row: &Row<'_>) -> rusqlite::Result<Package> {
    Ok(Package {
        id: PackageId::from(row.get::<_, String>(0)?),
        space_id: SpaceId::from(row.get::<_, String>(1)?),
        name: row.get(2)?,
        slug: row.get(3)?,
        description: row.get(4)?,
        created_by: UserId::from(row.get::<_, String>(5)?),
        recipes: Vec::new(),
        standards: Vec::new(),
        skills: Vec::new(),
    })
}

const PACKAGE_COLUMNS: &str = "id, space_id, name, slug, description, created_by";

impl PackageRepository for Database {
    fn find_package_by_id(&self, id: &PackageId) -> Result<Option<Package>> {
        let conn = self.conn.lock();
        let package = conn
            .query_row(
                &format!(
                    "SELECT {PACKAGE_COLUMNS} FROM packages WHERE id = ?1 AND deleted_at IS NULL"
                ),
                [id.as_str()],
                package_from_row,
            )
            .optional()?;
        match package {
            Some(mut package) => {
                Self::load_members(&conn, &mut package)?;
                Ok(Some(package))
            }
            None => Ok(None),
        }
    }

    fn list_packages_by_space(&self, space_id: &SpaceId) -> Result<Vec<Package>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PACKAGE_COLUMNS} FROM packages
             WHERE space_id = ?1 AND deleted_at IS NULL ORDER BY name, slug"
        ))?;
        let rows = stmt.query_map([space_id.as_str()], package_from_row)?;
        let mut packages = Vec::new();
        for row in rows {
            let mut package = row?;
            Self::load_members(&conn, &mut package)?;
            packages.push(package);
        }
        Ok(packages)
    }

    fn add_package(&self, package: &Package) -> Result<()> {
        let conn = self.conn.lock();
        let tx = conn.unchecked_transaction()?;
        let now = Utc::now().to_rfc3339();
        tx.execute(
            "INSERT INTO packages
                (id, space_id, name, slug, description, created_by, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                package.id.as_str(),
                package.space_id.as_str(),
                package.name,
                package.slug,
                package.description,
                package.created_by.as_str(),
                now
            ],
        )?;
        Self::insert_all_members(&tx, package)?;
        tx.commit()?;
        debug!(package_id = %package.id, "Stored package");
        Ok(())
    }

    fn update_package(&self, package: &Package) -> Result<()> {
        let conn = self.conn.lock();
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE packages SET name = ?2, description = ?3, updated_at = ?4
             WHERE id = ?1 AND deleted_at IS NULL",
            params![
                package.id.as_str(),
                package.name,
                package.description,
                Utc::now().to_rfc3339()
            ],
        )?;
        tx.execute(
            "DELETE FROM package_members WHERE package_id = ?1",
            [package.id.as_str()],
        )?;
        Self::insert_all_members(&tx, package)?;
        tx.commit()?;
        Ok(())
    }

    fn add_recipes(&self, package_id: &PackageId, ids: &[RecipeId]) -> Result<()> {
        let ids: Vec<&str> = ids.iter().map(RecipeId::as_str).collect();
        Self::insert_members(&self.conn.lock(), package_id, KIND_RECIPE, &ids)
    }

    fn add_standards(&self, package_id: &PackageId, ids: &[StandardId]) -> Result<()> {
        let ids: Vec<&str> = ids.iter().map(StandardId::as_str).collect();
        Self::insert_members(&self.conn.lock(), package_id, KIND_STANDARD, &ids)
    }

    fn add_skills(&self, package_id: &PackageId, ids: &[SkillId]) -> Result<()> {
        let ids: Vec<&str> = ids.iter().map(SkillId::as_str).collect();
        Self::insert_members(&self.conn.lock(), package_id, KIND_SKILL, &ids)
    }

    fn delete_packages(&self, ids: &[PackageId], deleted_by: &UserId) -> Result<()> {
        let conn = self.conn.lock();
        let tx = conn.unchecked_transaction()?;
        let now = Utc::now().to_rfc3339();
        for id in ids {
            tx.execute(
                "UPDATE packages SET deleted_at = ?2, deleted_by = ?3
                 WHERE id = ?1 AND deleted_at IS NULL",
                params![id.as_str(), now, deleted_by.as_str()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn remove_artefact_from_packages(&self, space_id: &SpaceId, artefact_id: &str) -> Result<usize> {
        let conn = self.conn.lock();
        let removed = conn.execute(
            "DELETE FROM package_members
             WHERE artefact_id = ?1 AND package_id IN
                (SELECT id FROM packages WHERE space_id = ?2 AND deleted_at IS NULL)",
            params![artefact_id, space_id.as_str()],
        )?;
        Ok(removed)
    }
}

impl PackagesDeploymentRepository for Database {
    fn add_deployment(&self, deployment: &PackagesDeployment) -> Result<()> {
        let payload = serde_json::to_string(deployment)?;
        self.conn.lock().execute(
            "INSERT INTO packages_deployments
                (id, organization_id, target_id, status, created_at, payload_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                deployment.id.as_str(),
                deployment.organization_id.as_str(),
                deployment.target.id.as_str(),
                deployment.status.as_str(),
                deployment.created_at.to_rfc3339(),
                payload
            ],
        )?;
        Ok(())
    }

    fn list_deployments(
        &self,
        organization_id: &OrganizationId,
        target_id: Option<&TargetId>,
    ) -> Result<Vec<PackagesDeployment>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT payload_json FROM packages_deployments
             WHERE organization_id = ?1 AND (?2 IS NULL OR target_id = ?2)
             ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map(
            params![organization_id.as_str(), target_id.map(TargetId::as_str)],
            |row| row.get::<_, String>(0),
        )?;
        let mut deployments = Vec::new();
        for payload in rows {
            deployments.push(serde_json::from_str(&payload?)?);
        }
        Ok(deployments)
    }
}

impl ActiveVersionsRepository for Database {
    fn list_active_recipe_versions_by_target(
        &self,
        organization_id: &OrganizationId,
        target_id: &TargetId,
    ) -> Result<Vec<RecipeVersion>> {
        let mut active: Vec<RecipeVersion> = Vec::new();
        for deployment in self.deployments_for_target(organization_id, target_id)? {
            for version in deployment.recipe_versions {
                match active.iter_mut().find(|v| v.recipe_id == version.recipe_id) {
                    Some(existing) if version.version > existing.version => *existing = version,
                    Some(_) => {}
                    None => active.push(version),
                }
            }
        }
        Ok(active)
    }

    fn list_active_standard_versions_by_target(
        &self,
        organization_id: &OrganizationId,
        target_id: &TargetId,
    ) -> Result<Vec<StandardVersion>> {
        let mut active: Vec<StandardVersion> = Vec::new();
        for deployment in self.deployments_for_target(organization_id, target_id)? {
            for version in deployment.standard_versions {
                match active.iter_mut().find(|v| v.standard_id == version.standard_id) {
                    Some(existing) if version.version > existing.version => *existing = version,
                    Some(_) => {}
                    None => active.push(version),
                }
            }
        }
        Ok(active)
    }
}
