//! Historized record tables and snapshot reconciliation.
//!
//! # Responsibility
//! - Describe the five historized tables (rooms, objects, anchors,
//!   connections, anchor infos) behind one record contract.
//! - Reconcile an incoming record set against the active stored set:
//!   insert new keys, version changed keys, leave equal keys alone and
//!   deactivate keys that are absent.
//!
//! # Invariants
//! - At most one active row exists per `(palace_uuid, key)`.
//! - A changed value closes the old row (`valid_to`, `is_active=0`) before the
//!   new row is inserted; stored values are never updated in place.
//! - Active rows are listed in first-creation order of their key, so
//!   versioning an element does not reorder it.

use super::{parse_flag, parse_uuid, RepoError, RepoResult};
use crate::model::connection::{AnchorInfo, Connection as AnchorConnection};
use crate::model::element::{Element, ElementKind};
use crate::model::palace::PalaceId;
use crate::spatial::geometry::{Point, Size};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Static description of one historized table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryTable {
    pub name: &'static str,
    pub key_column: &'static str,
    /// Element kind stored in this table, `None` for connections and infos.
    pub kind: Option<ElementKind>,
}

pub const ROOMS: HistoryTable = HistoryTable {
    name: "palace_rooms",
    key_column: "element_uuid",
    kind: Some(ElementKind::Room),
};

pub const OBJECTS: HistoryTable = HistoryTable {
    name: "palace_objects",
    key_column: "element_uuid",
    kind: Some(ElementKind::Object),
};

pub const ANCHORS: HistoryTable = HistoryTable {
    name: "palace_anchors",
    key_column: "element_uuid",
    kind: Some(ElementKind::Anchor),
};

pub const CONNECTIONS: HistoryTable = HistoryTable {
    name: "anchor_connections",
    key_column: "from_anchor",
    kind: None,
};

pub const INFOS: HistoryTable = HistoryTable {
    name: "anchor_infos",
    key_column: "anchor_uuid",
    kind: None,
};

impl HistoryTable {
    /// Table that stores elements of `kind`.
    pub fn for_kind(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Room => ROOMS,
            ElementKind::Object => OBJECTS,
            ElementKind::Anchor => ANCHORS,
        }
    }
}

/// One stored version of a historized value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Versioned<T> {
    pub row_id: i64,
    pub value: T,
    /// Epoch ms.
    pub valid_from: i64,
    /// Epoch ms; `None` while the version is open.
    pub valid_to: Option<i64>,
    pub is_active: bool,
}

/// Per-class outcome of one reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassReport {
    /// Keys with no active row before the save.
    pub inserted: usize,
    /// Keys whose active row was closed and replaced.
    pub historized: usize,
    /// Keys whose active row already matched.
    pub unchanged: usize,
    /// Active keys absent from the incoming set.
    pub deactivated: usize,
}

impl ClassReport {
    pub fn is_noop(&self) -> bool {
        self.inserted == 0 && self.historized == 0 && self.deactivated == 0
    }
}

/// Value that can live in a historized table.
pub trait HistoryRecord: Clone + PartialEq + Sized {
    /// Columns read back by `parse_row`, in addition to the history columns.
    const VALUE_COLUMNS: &'static str;

    /// Identity used to match incoming values with stored rows.
    fn key(&self) -> Uuid;
    fn insert(
        &self,
        conn: &Connection,
        table: &HistoryTable,
        palace_uuid: PalaceId,
        valid_from: i64,
    ) -> RepoResult<()>;
    fn parse_row(row: &Row<'_>, table: &HistoryTable) -> RepoResult<Self>;
}

impl HistoryRecord for Element {
    const VALUE_COLUMNS: &'static str = "element_uuid, variant, pos_x, pos_y, width, height";

    fn key(&self) -> Uuid {
        self.id
    }

    fn insert(
        &self,
        conn: &Connection,
        table: &HistoryTable,
        palace_uuid: PalaceId,
        valid_from: i64,
    ) -> RepoResult<()> {
        if table.kind != Some(self.kind) {
            return Err(RepoError::InvalidData(format!(
                "{} element {} cannot be stored in {}",
                self.kind.as_str(),
                self.id,
                table.name
            )));
        }
        if self.kind == ElementKind::Room {
            conn.execute(
                "INSERT INTO palace_rooms (
                    palace_uuid, element_uuid, variant, pos_x, pos_y, width, height,
                    valid_from, valid_to, is_active
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, 1);",
                params![
                    palace_uuid.to_string(),
                    self.id.to_string(),
                    self.variant,
                    self.position.x,
                    self.position.y,
                    self.size.width,
                    self.size.height,
                    valid_from,
                ],
            )?;
        } else {
            conn.execute(
                &format!(
                    "INSERT INTO {} (
                        palace_uuid, element_uuid, variant, pos_x, pos_y, width, height,
                        parent_uuid, valid_from, valid_to, is_active
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL, 1);",
                    table.name
                ),
                params![
                    palace_uuid.to_string(),
                    self.id.to_string(),
                    self.variant,
                    self.position.x,
                    self.position.y,
                    self.size.width,
                    self.size.height,
                    self.parent.map(|value| value.to_string()),
                    valid_from,
                ],
            )?;
        }
        Ok(())
    }

    fn parse_row(row: &Row<'_>, table: &HistoryTable) -> RepoResult<Self> {
        let kind = table.kind.ok_or_else(|| {
            RepoError::InvalidData(format!("{} does not store elements", table.name))
        })?;
        let id_text: String = row.get("element_uuid")?;
        let id = parse_uuid(&id_text, "element_uuid")?;
        let parent = if kind == ElementKind::Room {
            None
        } else {
            row.get::<_, Option<String>>("parent_uuid")?
                .map(|value| parse_uuid(&value, "parent_uuid"))
                .transpose()?
        };

        let mut element = Element::with_id(
            id,
            kind,
            row.get("variant")?,
            Point::new(row.get("pos_x")?, row.get("pos_y")?),
            Size::new(row.get("width")?, row.get("height")?),
        );
        element.parent = parent;
        Ok(element)
    }
}

impl HistoryRecord for AnchorConnection {
    const VALUE_COLUMNS: &'static str = "from_anchor, to_anchor";

    fn key(&self) -> Uuid {
        self.from
    }

    fn insert(
        &self,
        conn: &Connection,
        table: &HistoryTable,
        palace_uuid: PalaceId,
        valid_from: i64,
    ) -> RepoResult<()> {
        conn.execute(
            &format!(
                "INSERT INTO {} (
                    palace_uuid, from_anchor, to_anchor, valid_from, valid_to, is_active
                ) VALUES (?1, ?2, ?3, ?4, NULL, 1);",
                table.name
            ),
            params![
                palace_uuid.to_string(),
                self.from.to_string(),
                self.to.to_string(),
                valid_from,
            ],
        )?;
        Ok(())
    }

    fn parse_row(row: &Row<'_>, _table: &HistoryTable) -> RepoResult<Self> {
        let from: String = row.get("from_anchor")?;
        let to: String = row.get("to_anchor")?;
        Ok(AnchorConnection::new(
            parse_uuid(&from, "anchor_connections.from_anchor")?,
            parse_uuid(&to, "anchor_connections.to_anchor")?,
        ))
    }
}

impl HistoryRecord for AnchorInfo {
    const VALUE_COLUMNS: &'static str = "anchor_uuid, title, material";

    fn key(&self) -> Uuid {
        self.anchor_id
    }

    fn insert(
        &self,
        conn: &Connection,
        table: &HistoryTable,
        palace_uuid: PalaceId,
        valid_from: i64,
    ) -> RepoResult<()> {
        conn.execute(
            &format!(
                "INSERT INTO {} (
                    palace_uuid, anchor_uuid, title, material, valid_from, valid_to, is_active
                ) VALUES (?1, ?2, ?3, ?4, ?5, NULL, 1);",
                table.name
            ),
            params![
                palace_uuid.to_string(),
                self.anchor_id.to_string(),
                self.title.as_str(),
                self.material.as_str(),
                valid_from,
            ],
        )?;
        Ok(())
    }

    fn parse_row(row: &Row<'_>, _table: &HistoryTable) -> RepoResult<Self> {
        let anchor_id: String = row.get("anchor_uuid")?;
        Ok(AnchorInfo::new(
            parse_uuid(&anchor_id, "anchor_infos.anchor_uuid")?,
            row.get::<_, String>("title")?,
            row.get::<_, String>("material")?,
        ))
    }
}

/// Reconciles `incoming` against the active rows of `table` for one palace.
///
/// Duplicate keys in `incoming` keep their first occurrence.
pub fn reconcile<T: HistoryRecord>(
    conn: &Connection,
    table: &HistoryTable,
    palace_uuid: PalaceId,
    incoming: &[T],
    now: i64,
) -> RepoResult<ClassReport> {
    let stored: HashMap<Uuid, Versioned<T>> =
        list_active_versions::<T>(conn, table, palace_uuid)?
            .into_iter()
            .map(|version| (version.value.key(), version))
            .collect();

    let mut report = ClassReport::default();
    let mut seen = HashSet::new();
    for record in incoming {
        let key = record.key();
        if !seen.insert(key) {
            continue;
        }
        match stored.get(&key) {
            None => {
                record.insert(conn, table, palace_uuid, now)?;
                report.inserted += 1;
            }
            Some(existing) if existing.value == *record => report.unchanged += 1,
            Some(existing) => {
                close_row(conn, table, existing.row_id, now)?;
                record.insert(conn, table, palace_uuid, now)?;
                report.historized += 1;
            }
        }
    }

    for (key, existing) in &stored {
        if !seen.contains(key) {
            close_row(conn, table, existing.row_id, now)?;
            report.deactivated += 1;
        }
    }
    Ok(report)
}

/// Active values of `table` for one palace, in first-creation order.
pub fn list_active<T: HistoryRecord>(
    conn: &Connection,
    table: &HistoryTable,
    palace_uuid: PalaceId,
) -> RepoResult<Vec<T>> {
    Ok(list_active_versions::<T>(conn, table, palace_uuid)?
        .into_iter()
        .map(|version| version.value)
        .collect())
}

/// Every stored version of one key, oldest first.
pub fn list_versions<T: HistoryRecord>(
    conn: &Connection,
    table: &HistoryTable,
    palace_uuid: PalaceId,
    key: Uuid,
) -> RepoResult<Vec<Versioned<T>>> {
    let sql = format!(
        "SELECT row_id, {columns}, valid_from, valid_to, is_active
         FROM {table}
         WHERE palace_uuid = ?1
           AND {key_column} = ?2
         ORDER BY row_id ASC;",
        columns = value_columns::<T>(table),
        table = table.name,
        key_column = table.key_column,
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params![palace_uuid.to_string(), key.to_string()])?;
    let mut versions = Vec::new();
    while let Some(row) = rows.next()? {
        versions.push(parse_versioned_row(row, table)?);
    }
    Ok(versions)
}

fn list_active_versions<T: HistoryRecord>(
    conn: &Connection,
    table: &HistoryTable,
    palace_uuid: PalaceId,
) -> RepoResult<Vec<Versioned<T>>> {
    let sql = format!(
        "SELECT t.row_id AS row_id, {columns}, t.valid_from AS valid_from,
                t.valid_to AS valid_to, t.is_active AS is_active
         FROM {table} t
         WHERE t.palace_uuid = ?1
           AND t.is_active = 1
         ORDER BY (
             SELECT MIN(h.row_id)
             FROM {table} h
             WHERE h.palace_uuid = t.palace_uuid
               AND h.{key_column} = t.{key_column}
         ) ASC;",
        columns = qualified_value_columns::<T>(table, "t"),
        table = table.name,
        key_column = table.key_column,
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([palace_uuid.to_string()])?;
    let mut versions = Vec::new();
    while let Some(row) = rows.next()? {
        versions.push(parse_versioned_row(row, table)?);
    }
    Ok(versions)
}

fn close_row(conn: &Connection, table: &HistoryTable, row_id: i64, now: i64) -> RepoResult<()> {
    let changed = conn.execute(
        &format!(
            "UPDATE {}
             SET valid_to = ?2,
                 is_active = 0
             WHERE row_id = ?1
               AND is_active = 1;",
            table.name
        ),
        params![row_id, now],
    )?;
    if changed != 1 {
        return Err(RepoError::InvalidData(format!(
            "active row {row_id} in {} vanished during reconciliation",
            table.name
        )));
    }
    Ok(())
}

fn parse_versioned_row<T: HistoryRecord>(
    row: &Row<'_>,
    table: &HistoryTable,
) -> RepoResult<Versioned<T>> {
    Ok(Versioned {
        row_id: row.get("row_id")?,
        value: T::parse_row(row, table)?,
        valid_from: row.get("valid_from")?,
        valid_to: row.get("valid_to")?,
        is_active: parse_flag(row.get("is_active")?, "is_active")?,
    })
}

fn value_columns<T: HistoryRecord>(table: &HistoryTable) -> String {
    match table.kind {
        Some(ElementKind::Object | ElementKind::Anchor) => {
            format!("{}, parent_uuid", T::VALUE_COLUMNS)
        }
        _ => T::VALUE_COLUMNS.to_string(),
    }
}

fn qualified_value_columns<T: HistoryRecord>(table: &HistoryTable, alias: &str) -> String {
    value_columns::<T>(table)
        .split(',')
        .map(|column| {
            let column = column.trim();
            format!("{alias}.{column} AS {column}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}
