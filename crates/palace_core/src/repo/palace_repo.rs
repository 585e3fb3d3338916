//! Palace repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist palace headers (create, touch, list, logical delete).
//! - Apply a validated snapshot to the historized tables in one transaction.
//! - Read active contents and per-key version history back.
//!
//! # Invariants
//! - Palace reads are scoped by owner; another owner's palace is never found.
//! - Snapshot classes are reconciled rooms, anchors, objects, connections,
//!   then infos, all stamped with the same instant.
//! - A failed save leaves no partial rows behind.

use super::history_repo::{
    list_active, list_versions, reconcile, ClassReport, HistoryTable, Versioned, ANCHORS,
    CONNECTIONS, INFOS, OBJECTS, ROOMS,
};
use super::{bool_to_int, ensure_connection_ready, parse_flag, parse_uuid, RepoError, RepoResult};
use crate::model::connection::{AnchorInfo, Connection as AnchorConnection};
use crate::model::element::{Element, ElementId, ElementKind};
use crate::model::palace::{Palace, PalaceId, PalaceSnapshot};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const PALACE_SELECT_SQL: &str = "SELECT
    palace_uuid,
    owner_id,
    name,
    created_at,
    updated_at,
    is_active
FROM palaces";

/// Per-class reconciliation counts of one save.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveReport {
    pub rooms: ClassReport,
    pub anchors: ClassReport,
    pub objects: ClassReport,
    pub connections: ClassReport,
    pub infos: ClassReport,
}

impl SaveReport {
    /// Returns whether the save wrote no historized row.
    pub fn is_noop(&self) -> bool {
        [
            self.rooms,
            self.anchors,
            self.objects,
            self.connections,
            self.infos,
        ]
        .iter()
        .all(ClassReport::is_noop)
    }
}

/// Result of applying one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPalace {
    pub palace: Palace,
    /// `true` when this save created the palace header.
    pub created: bool,
    pub report: SaveReport,
}

/// Repository interface for palace persistence.
pub trait PalaceRepository {
    /// Finds the owner's active palace with exactly `name`.
    fn find_active_by_name(&self, owner_id: &str, name: &str) -> RepoResult<Option<Palace>>;
    /// Loads one active palace of the owner.
    fn get_palace(&self, owner_id: &str, palace_uuid: PalaceId) -> RepoResult<Option<Palace>>;
    /// Lists the owner's active palaces, newest first.
    fn list_palaces(&self, owner_id: &str) -> RepoResult<Vec<Palace>>;
    /// Flips the palace's active flag off.
    fn deactivate_palace(&self, owner_id: &str, palace_uuid: PalaceId, now: i64)
        -> RepoResult<()>;
    /// Finds-or-creates the palace named by `snapshot` and reconciles its
    /// contents.
    fn save_snapshot(
        &self,
        owner_id: &str,
        snapshot: &PalaceSnapshot,
        now: i64,
    ) -> RepoResult<SavedPalace>;
    /// Loads the active contents of one palace.
    fn load_contents(&self, palace: &Palace) -> RepoResult<PalaceSnapshot>;
    /// All versions of one element, oldest first.
    fn element_history(
        &self,
        palace_uuid: PalaceId,
        kind: ElementKind,
        element_id: ElementId,
    ) -> RepoResult<Vec<Versioned<Element>>>;
    /// All versions of the outgoing connection of `from_anchor`, oldest first.
    fn connection_history(
        &self,
        palace_uuid: PalaceId,
        from_anchor: ElementId,
    ) -> RepoResult<Vec<Versioned<AnchorConnection>>>;
    /// All versions of one anchor's info, oldest first.
    fn info_history(
        &self,
        palace_uuid: PalaceId,
        anchor_id: ElementId,
    ) -> RepoResult<Vec<Versioned<AnchorInfo>>>;
}

/// SQLite-backed palace repository.
pub struct SqlitePalaceRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePalaceRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl PalaceRepository for SqlitePalaceRepository<'_> {
    fn find_active_by_name(&self, owner_id: &str, name: &str) -> RepoResult<Option<Palace>> {
        find_active_by_name(self.conn, owner_id, name)
    }

    fn get_palace(&self, owner_id: &str, palace_uuid: PalaceId) -> RepoResult<Option<Palace>> {
        let sql = format!(
            "{PALACE_SELECT_SQL}
             WHERE palace_uuid = ?1
               AND owner_id = ?2
               AND is_active = 1;"
        );
        self.conn
            .query_row(
                &sql,
                params![palace_uuid.to_string(), owner_id],
                |row| Ok(parse_palace_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn list_palaces(&self, owner_id: &str) -> RepoResult<Vec<Palace>> {
        let sql = format!(
            "{PALACE_SELECT_SQL}
             WHERE owner_id = ?1
               AND is_active = 1
             ORDER BY created_at DESC, rowid DESC;"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([owner_id])?;
        let mut palaces = Vec::new();
        while let Some(row) = rows.next()? {
            palaces.push(parse_palace_row(row)?);
        }
        Ok(palaces)
    }

    fn deactivate_palace(
        &self,
        owner_id: &str,
        palace_uuid: PalaceId,
        now: i64,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE palaces
             SET is_active = 0,
                 updated_at = ?3
             WHERE palace_uuid = ?1
               AND owner_id = ?2
               AND is_active = 1;",
            params![palace_uuid.to_string(), owner_id, now],
        )?;
        if changed == 0 {
            return Err(RepoError::PalaceNotFound(palace_uuid));
        }
        Ok(())
    }

    fn save_snapshot(
        &self,
        owner_id: &str,
        snapshot: &PalaceSnapshot,
        now: i64,
    ) -> RepoResult<SavedPalace> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let (palace, created) = match find_active_by_name(&tx, owner_id, &snapshot.name)? {
            Some(existing) => {
                tx.execute(
                    "UPDATE palaces
                     SET updated_at = ?2
                     WHERE palace_uuid = ?1;",
                    params![existing.palace_uuid.to_string(), now],
                )?;
                (
                    Palace {
                        updated_at: now,
                        ..existing
                    },
                    false,
                )
            }
            None => (insert_palace(&tx, owner_id, &snapshot.name, now)?, true),
        };

        let palace_uuid = palace.palace_uuid;
        let report = SaveReport {
            rooms: reconcile(&tx, &ROOMS, palace_uuid, &snapshot.rooms, now)?,
            anchors: reconcile(&tx, &ANCHORS, palace_uuid, &snapshot.anchors, now)?,
            objects: reconcile(&tx, &OBJECTS, palace_uuid, &snapshot.objects, now)?,
            connections: reconcile(&tx, &CONNECTIONS, palace_uuid, &snapshot.connections, now)?,
            infos: reconcile(&tx, &INFOS, palace_uuid, &snapshot.infos, now)?,
        };

        tx.commit()?;
        Ok(SavedPalace {
            palace,
            created,
            report,
        })
    }

    fn load_contents(&self, palace: &Palace) -> RepoResult<PalaceSnapshot> {
        let palace_uuid = palace.palace_uuid;
        Ok(PalaceSnapshot {
            name: palace.name.clone(),
            rooms: list_active(self.conn, &ROOMS, palace_uuid)?,
            objects: list_active(self.conn, &OBJECTS, palace_uuid)?,
            anchors: list_active(self.conn, &ANCHORS, palace_uuid)?,
            connections: list_active(self.conn, &CONNECTIONS, palace_uuid)?,
            infos: list_active(self.conn, &INFOS, palace_uuid)?,
        })
    }

    fn element_history(
        &self,
        palace_uuid: PalaceId,
        kind: ElementKind,
        element_id: ElementId,
    ) -> RepoResult<Vec<Versioned<Element>>> {
        list_versions(
            self.conn,
            &HistoryTable::for_kind(kind),
            palace_uuid,
            element_id,
        )
    }

    fn connection_history(
        &self,
        palace_uuid: PalaceId,
        from_anchor: ElementId,
    ) -> RepoResult<Vec<Versioned<AnchorConnection>>> {
        list_versions(self.conn, &CONNECTIONS, palace_uuid, from_anchor)
    }

    fn info_history(
        &self,
        palace_uuid: PalaceId,
        anchor_id: ElementId,
    ) -> RepoResult<Vec<Versioned<AnchorInfo>>> {
        list_versions(self.conn, &INFOS, palace_uuid, anchor_id)
    }
}

fn find_active_by_name(
    conn: &Connection,
    owner_id: &str,
    name: &str,
) -> RepoResult<Option<Palace>> {
    let sql = format!(
        "{PALACE_SELECT_SQL}
         WHERE owner_id = ?1
           AND name = ?2
           AND is_active = 1;"
    );
    conn.query_row(&sql, params![owner_id, name], |row| Ok(parse_palace_row(row)))
        .optional()?
        .transpose()
}

fn insert_palace(conn: &Connection, owner_id: &str, name: &str, now: i64) -> RepoResult<Palace> {
    let palace = Palace {
        palace_uuid: Uuid::new_v4(),
        owner_id: owner_id.to_string(),
        name: name.to_string(),
        created_at: now,
        updated_at: now,
        is_active: true,
    };
    conn.execute(
        "INSERT INTO palaces (
            palace_uuid,
            owner_id,
            name,
            created_at,
            updated_at,
            is_active
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        params![
            palace.palace_uuid.to_string(),
            palace.owner_id.as_str(),
            palace.name.as_str(),
            palace.created_at,
            palace.updated_at,
            bool_to_int(palace.is_active),
        ],
    )?;
    Ok(palace)
}

fn parse_palace_row(row: &Row<'_>) -> RepoResult<Palace> {
    let palace_uuid: String = row.get("palace_uuid")?;
    Ok(Palace {
        palace_uuid: parse_uuid(&palace_uuid, "palaces.palace_uuid")?,
        owner_id: row.get("owner_id")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        is_active: parse_flag(row.get("is_active")?, "palaces.is_active")?,
    })
}
