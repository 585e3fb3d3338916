//! Quiz deck building and session flow.
//!
//! # Responsibility
//! - Turn a palace's active anchors into cards in authored connection order.
//! - Drive one review session: again/hard re-queue, good/easy retire.
//!
//! # Invariants
//! - A deck holds every active anchor exactly once.
//! - A session completes only after every card has been retired.

use super::palace_service::PalaceServiceError;
use crate::graph::linearize::linearize;
use crate::model::element::ElementId;
use crate::model::palace::{PalaceId, PalaceSnapshot};
use crate::repo::palace_repo::PalaceRepository;
use crate::spatial::containment::{ContainmentError, ElementIndex};
use crate::spatial::geometry::Point;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub const DEFAULT_CARD_TITLE: &str = "Untitled anchor";
pub const DEFAULT_CARD_MATERIAL: &str = "No material yet";

/// Where an anchor sits, for showing the learner a location cue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayHint {
    /// Absolute palace coordinates of the anchor.
    pub position: Point,
    /// Outermost room enclosing the anchor.
    pub room: Option<ElementId>,
}

/// One anchor as presented in a quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizCard {
    pub anchor_id: ElementId,
    pub title: String,
    pub material: String,
    pub display_hint: DisplayHint,
}

/// Learner's self-assessment of one card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    /// Returns whether the card comes back later in the same session.
    pub fn requeues(self) -> bool {
        matches!(self, Self::Again | Self::Hard)
    }
}

/// Builds cards for the anchors of `contents` in linearized order.
///
/// Blank titles and materials fall back to placeholder text.
pub fn build_deck(contents: &PalaceSnapshot) -> Result<Vec<QuizCard>, ContainmentError> {
    let index = ElementIndex::new(contents.elements());
    let ordered: Vec<ElementId> = linearize(
        contents.anchors.iter().map(|anchor| anchor.id).collect(),
        &contents.connections,
    );

    let mut deck = Vec::with_capacity(ordered.len());
    for anchor_id in ordered {
        let info = contents
            .infos
            .iter()
            .find(|info| info.anchor_id == anchor_id);
        deck.push(QuizCard {
            anchor_id,
            title: non_blank_or(info.map(|info| info.title.as_str()), DEFAULT_CARD_TITLE),
            material: non_blank_or(
                info.map(|info| info.material.as_str()),
                DEFAULT_CARD_MATERIAL,
            ),
            display_hint: DisplayHint {
                position: index.absolute_position(anchor_id)?,
                room: index.enclosing_room(anchor_id)?,
            },
        });
    }
    Ok(deck)
}

fn non_blank_or(value: Option<&str>, fallback: &str) -> String {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => fallback.to_string(),
    }
}

/// Quiz use-case service.
pub struct QuizService<R: PalaceRepository> {
    repo: R,
}

impl<R: PalaceRepository> QuizService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Loads the owner's palace and returns its cards in authored order.
    pub fn quiz_deck(
        &self,
        owner_id: &str,
        palace_uuid: PalaceId,
    ) -> Result<Vec<QuizCard>, PalaceServiceError> {
        let palace = self
            .repo
            .get_palace(owner_id.trim(), palace_uuid)?
            .ok_or(PalaceServiceError::PalaceNotFound(palace_uuid))?;
        let contents = self.repo.load_contents(&palace)?;
        let deck = build_deck(&contents).map_err(|err| match err {
            ContainmentError::CyclicContainment(id) => PalaceServiceError::CyclicContainment(id),
            other => PalaceServiceError::Containment(other),
        })?;
        info!(
            "event=quiz_deck module=service status=ok palace_uuid={} cards={}",
            palace_uuid,
            deck.len()
        );
        Ok(deck)
    }
}

/// Queue entry of a running session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionCard {
    pub card: QuizCard,
    /// `true` when the card was re-queued by an earlier rating.
    pub is_retry: bool,
}

/// One pass over a deck.
#[derive(Debug, Clone)]
pub struct QuizSession {
    deck: Vec<QuizCard>,
    queue: VecDeque<SessionCard>,
    reviews: usize,
    retired: usize,
}

impl QuizSession {
    pub fn new(deck: Vec<QuizCard>) -> Self {
        let queue = deck
            .iter()
            .cloned()
            .map(|card| SessionCard {
                card,
                is_retry: false,
            })
            .collect();
        Self {
            deck,
            queue,
            reviews: 0,
            retired: 0,
        }
    }

    /// Card currently shown, `None` once complete.
    pub fn current(&self) -> Option<&SessionCard> {
        self.queue.front()
    }

    /// Rates the current card and advances.
    ///
    /// Returns `false` when there was no card to rate.
    pub fn rate(&mut self, rating: Rating) -> bool {
        let Some(entry) = self.queue.pop_front() else {
            return false;
        };
        self.reviews += 1;
        if rating.requeues() {
            self.queue.push_back(SessionCard {
                card: entry.card,
                is_retry: true,
            });
        } else {
            self.retired += 1;
        }
        true
    }

    pub fn is_complete(&self) -> bool {
        self.queue.is_empty()
    }

    /// Cards still waiting, retries included.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// Total ratings given so far.
    pub fn reviews(&self) -> usize {
        self.reviews
    }

    pub fn retired(&self) -> usize {
        self.retired
    }

    pub fn deck_len(&self) -> usize {
        self.deck.len()
    }

    /// Starts over with the original deck order.
    pub fn restart(&mut self) {
        *self = Self::new(std::mem::take(&mut self.deck));
    }
}
