//! Palace persistence use-case service.
//!
//! # Responsibility
//! - Normalize palace names and validate snapshots above the repository.
//! - Stamp each save with one clock reading and report what it changed.
//! - Expose load, list, existence, logical delete and history queries.
//!
//! # Invariants
//! - A save either applies the whole prepared snapshot or nothing.
//! - Every operation is scoped by the caller-supplied owner id.
//! - Log lines carry ids and counts only, never anchor titles or material.

use super::snapshot_rules::{prepare_snapshot, PruneReport};
use crate::clock::{Clock, SystemClock};
use crate::model::connection::{AnchorInfo, Connection};
use crate::model::element::{Element, ElementId, ElementKind};
use crate::model::palace::{Palace, PalaceId, PalaceSnapshot};
use crate::repo::history_repo::Versioned;
use crate::repo::palace_repo::{PalaceRepository, SaveReport};
use crate::repo::RepoError;
use crate::spatial::containment::ContainmentError;
use log::{error, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

static WHITESPACE_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Errors from palace service operations.
#[derive(Debug)]
pub enum PalaceServiceError {
    /// Palace name is blank after normalization.
    InvalidName,
    /// Owner id is blank.
    InvalidOwner,
    /// Palace does not exist, is deleted, or belongs to another owner.
    PalaceNotFound(PalaceId),
    /// Two rooms of the snapshot intersect.
    OverlappingRooms { first: ElementId, second: ElementId },
    /// A parent chain of the snapshot loops back on itself.
    CyclicContainment(ElementId),
    /// Any other containment failure while validating a snapshot.
    Containment(ContainmentError),
    /// Repository-level failure.
    Repo(RepoError),
}

impl Display for PalaceServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "palace name must not be blank"),
            Self::InvalidOwner => write!(f, "owner id must not be blank"),
            Self::PalaceNotFound(id) => write!(f, "palace not found: {id}"),
            Self::OverlappingRooms { first, second } => {
                write!(f, "rooms {first} and {second} overlap")
            }
            Self::CyclicContainment(id) => write!(f, "cyclic containment at element {id}"),
            Self::Containment(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PalaceServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Containment(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for PalaceServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::PalaceNotFound(id) => Self::PalaceNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Result of one successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub palace: Palace,
    /// `true` when the save created the palace.
    pub created: bool,
    pub report: SaveReport,
    pub pruned: PruneReport,
}

/// Palace header with its active contents.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedPalace {
    pub palace: Palace,
    pub contents: PalaceSnapshot,
}

impl LoadedPalace {
    /// Active info of `anchor_id`, if any.
    pub fn info_for(&self, anchor_id: ElementId) -> Option<&AnchorInfo> {
        self.contents
            .infos
            .iter()
            .find(|info| info.anchor_id == anchor_id)
    }

    /// Active anchors joined with their active info.
    pub fn anchors_with_info(&self) -> impl Iterator<Item = (&Element, Option<&AnchorInfo>)> {
        self.contents
            .anchors
            .iter()
            .map(|anchor| (anchor, self.info_for(anchor.id)))
    }
}

/// Palace service facade.
pub struct PalaceService<R: PalaceRepository, C: Clock = SystemClock> {
    repo: R,
    clock: C,
}

impl<R: PalaceRepository> PalaceService<R> {
    /// Creates service stamping rows with wall-clock time.
    pub fn new(repo: R) -> Self {
        Self::with_clock(repo, SystemClock)
    }
}

impl<R: PalaceRepository, C: Clock> PalaceService<R, C> {
    /// Creates service with an explicit time source.
    pub fn with_clock(repo: R, clock: C) -> Self {
        Self { repo, clock }
    }

    /// Validates and persists the full desired state of one palace.
    ///
    /// The palace is found by owner and normalized name, or created.
    /// Records with absent references are pruned; cyclic containment and
    /// overlapping rooms reject the whole save.
    pub fn save_palace(
        &self,
        owner_id: &str,
        snapshot: &PalaceSnapshot,
    ) -> Result<SaveOutcome, PalaceServiceError> {
        let started_at = Instant::now();
        let owner_id = normalize_owner(owner_id)?;
        let name = normalize_palace_name(&snapshot.name)?;
        let (prepared, pruned) = prepare_snapshot(snapshot, name).map_err(|err| {
            warn!("event=palace_save module=service status=rejected error={err}");
            err
        })?;

        if !pruned.is_empty() {
            warn!(
                "event=snapshot_pruned module=service elements={} connections={} infos={}",
                pruned.elements.len(),
                pruned.connections,
                pruned.infos
            );
        }

        let now = self.clock.now_ms();
        match self.repo.save_snapshot(owner_id, &prepared, now) {
            Ok(saved) => {
                info!(
                    "event=palace_save module=service status=ok palace_uuid={} created={} rooms={} objects={} anchors={} connections={} infos={} noop={} duration_ms={}",
                    saved.palace.palace_uuid,
                    saved.created,
                    prepared.rooms.len(),
                    prepared.objects.len(),
                    prepared.anchors.len(),
                    prepared.connections.len(),
                    prepared.infos.len(),
                    saved.report.is_noop(),
                    started_at.elapsed().as_millis()
                );
                Ok(SaveOutcome {
                    palace: saved.palace,
                    created: saved.created,
                    report: saved.report,
                    pruned,
                })
            }
            Err(err) => {
                error!(
                    "event=palace_save module=service status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err.into())
            }
        }
    }

    /// Loads one active palace with its active rooms, objects, anchors,
    /// connections and infos.
    pub fn load_palace(
        &self,
        owner_id: &str,
        palace_uuid: PalaceId,
    ) -> Result<LoadedPalace, PalaceServiceError> {
        let palace = self.require_palace(owner_id, palace_uuid)?;
        let contents = self.repo.load_contents(&palace)?;
        info!(
            "event=palace_load module=service status=ok palace_uuid={} elements={} connections={}",
            palace_uuid,
            contents.element_count(),
            contents.connections.len()
        );
        Ok(LoadedPalace { palace, contents })
    }

    /// Lists the owner's active palaces, newest first.
    pub fn list_palaces(&self, owner_id: &str) -> Result<Vec<Palace>, PalaceServiceError> {
        let owner_id = normalize_owner(owner_id)?;
        self.repo.list_palaces(owner_id).map_err(Into::into)
    }

    /// Returns whether the owner has an active palace with `name`.
    pub fn palace_exists(&self, owner_id: &str, name: &str) -> Result<bool, PalaceServiceError> {
        let owner_id = normalize_owner(owner_id)?;
        let name = normalize_palace_name(name)?;
        Ok(self.repo.find_active_by_name(owner_id, &name)?.is_some())
    }

    /// Logically deletes one palace.
    pub fn delete_palace(
        &self,
        owner_id: &str,
        palace_uuid: PalaceId,
    ) -> Result<(), PalaceServiceError> {
        let owner_id = normalize_owner(owner_id)?;
        self.repo
            .deactivate_palace(owner_id, palace_uuid, self.clock.now_ms())?;
        info!("event=palace_delete module=service status=ok palace_uuid={palace_uuid}");
        Ok(())
    }

    /// Every stored version of one element, oldest first.
    pub fn element_history(
        &self,
        owner_id: &str,
        palace_uuid: PalaceId,
        kind: ElementKind,
        element_id: ElementId,
    ) -> Result<Vec<Versioned<Element>>, PalaceServiceError> {
        self.require_palace(owner_id, palace_uuid)?;
        self.repo
            .element_history(palace_uuid, kind, element_id)
            .map_err(Into::into)
    }

    /// Every stored version of the outgoing connection of `from_anchor`.
    pub fn connection_history(
        &self,
        owner_id: &str,
        palace_uuid: PalaceId,
        from_anchor: ElementId,
    ) -> Result<Vec<Versioned<Connection>>, PalaceServiceError> {
        self.require_palace(owner_id, palace_uuid)?;
        self.repo
            .connection_history(palace_uuid, from_anchor)
            .map_err(Into::into)
    }

    /// Every stored version of one anchor's info.
    pub fn info_history(
        &self,
        owner_id: &str,
        palace_uuid: PalaceId,
        anchor_id: ElementId,
    ) -> Result<Vec<Versioned<AnchorInfo>>, PalaceServiceError> {
        self.require_palace(owner_id, palace_uuid)?;
        self.repo
            .info_history(palace_uuid, anchor_id)
            .map_err(Into::into)
    }

    fn require_palace(
        &self,
        owner_id: &str,
        palace_uuid: PalaceId,
    ) -> Result<Palace, PalaceServiceError> {
        let owner_id = normalize_owner(owner_id)?;
        self.repo
            .get_palace(owner_id, palace_uuid)?
            .ok_or(PalaceServiceError::PalaceNotFound(palace_uuid))
    }
}

/// Trims `value` and collapses internal whitespace runs to one space.
pub fn normalize_palace_name(value: &str) -> Result<String, PalaceServiceError> {
    let collapsed = WHITESPACE_RUN_RE.replace_all(value.trim(), " ");
    if collapsed.is_empty() {
        return Err(PalaceServiceError::InvalidName);
    }
    Ok(collapsed.into_owned())
}

fn normalize_owner(value: &str) -> Result<&str, PalaceServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PalaceServiceError::InvalidOwner);
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::{normalize_palace_name, PalaceServiceError};

    #[test]
    fn name_is_trimmed_and_collapsed() {
        assert_eq!(
            normalize_palace_name("  Grand \t  Hall \n").unwrap(),
            "Grand Hall"
        );
    }

    #[test]
    fn blank_name_is_rejected() {
        assert!(matches!(
            normalize_palace_name(" \n\t "),
            Err(PalaceServiceError::InvalidName)
        ));
    }
}
