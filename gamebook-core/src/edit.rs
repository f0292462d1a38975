//! Mutations reachable from the editor UI.
//!
//! Every operation that changes a choice's target set re-balances the
//! probabilities, so a multi-target choice always sums to 100 until the author
//! edits a single probability by hand.

use thiserror::Error;

use crate::constants::{FULL_PROBABILITY, NEW_CHAPTER_TITLE_PREFIX};
use crate::model::{
    Chapter, ChapterId, Choice, EntryId, OnStartItem, RequirementDetail, ScalarValue, Story,
    Target,
};
use crate::numbers::equal_split;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("chapter {id} does not exist")]
    UnknownChapter { id: ChapterId },
    #[error("choice {id} does not exist")]
    UnknownChoice { id: EntryId },
    #[error("chapter {id} is not a target of this choice")]
    UnknownTarget { id: ChapterId },
    #[error("entry {id} does not exist")]
    UnknownEntry { id: EntryId },
    #[error("no entry is named '{key}'")]
    UnknownKey { key: String },
    #[error("a single target always has 100% probability")]
    ProbabilityLocked,
    #[error("probabilities would sum to {sum}%, above 100%")]
    ProbabilityOverflow { sum: u32 },
    #[error("key must not be blank")]
    BlankKey,
    #[error("key '{key}' is already used")]
    DuplicateKey { key: String },
    #[error("every chapter id is already in use")]
    ChapterIdsExhausted,
}

/// New contents for a requirement entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementUpdate {
    pub key: String,
    pub value: ScalarValue,
    pub is_cost: bool,
    pub is_hidden: bool,
}

impl Choice {
    /// Share 100% equally across the targets, remainder to the first ones.
    pub fn rebalance(&mut self) {
        let shares = equal_split(self.targets.len());
        for (target, share) in self.targets.iter_mut().zip(shares) {
            target.probability = share;
        }
    }

    /// Add destinations, skipping ones already present. Returns how many
    /// were added.
    pub fn add_targets<I>(&mut self, ids: I) -> usize
    where
        I: IntoIterator<Item = ChapterId>,
    {
        let before = self.targets.len();
        for id in ids {
            if !self.has_target(id) {
                self.targets.push(Target::new(id, 0));
            }
        }
        let added = self.targets.len() - before;
        if added > 0 {
            self.rebalance();
        }
        added
    }

    /// # Errors
    ///
    /// Fails when `id` is not a target of this choice.
    pub fn remove_target(&mut self, id: ChapterId) -> Result<(), EditError> {
        let index = self
            .targets
            .iter()
            .position(|target| target.target_id == id)
            .ok_or(EditError::UnknownTarget { id })?;
        self.targets.remove(index);
        self.rebalance();
        Ok(())
    }

    /// Set one target's probability and return the new sum.
    ///
    /// # Errors
    ///
    /// Fails for an unknown target, for a lone target (locked at 100), or
    /// when the new sum would exceed 100.
    pub fn set_probability(&mut self, id: ChapterId, probability: u32) -> Result<u32, EditError> {
        if self.targets.len() == 1 && self.has_target(id) {
            return Err(EditError::ProbabilityLocked);
        }
        let index = self
            .targets
            .iter()
            .position(|target| target.target_id == id)
            .ok_or(EditError::UnknownTarget { id })?;

        let sum = self
            .probability_sum()
            .saturating_sub(self.targets[index].probability)
            .saturating_add(probability);
        if sum > FULL_PROBABILITY {
            return Err(EditError::ProbabilityOverflow { sum });
        }
        self.targets[index].probability = probability;
        Ok(sum)
    }

    /// Append a blank requirement entry.
    pub fn add_requirement(&mut self) -> EntryId {
        self.requirement.insert(RequirementDetail::blank())
    }

    /// # Errors
    ///
    /// Fails when no entry has this id.
    pub fn update_requirement(
        &mut self,
        id: EntryId,
        update: RequirementUpdate,
    ) -> Result<(), EditError> {
        let detail = self
            .requirement
            .get_mut(id)
            .ok_or(EditError::UnknownEntry { id })?;
        detail.key = update.key;
        detail.value = update.value;
        detail.is_cost = update.is_cost;
        detail.is_hidden = update.is_hidden;
        Ok(())
    }

    /// # Errors
    ///
    /// Fails when no entry has this id.
    pub fn remove_requirement(&mut self, id: EntryId) -> Result<RequirementDetail, EditError> {
        self.requirement
            .remove(id)
            .ok_or(EditError::UnknownEntry { id })
    }
}

impl Chapter {
    /// Append a blank on-start item.
    pub fn add_on_start(&mut self) -> EntryId {
        let item = OnStartItem::new("", "", false);
        let id = item.id;
        self.on_start.push(item);
        id
    }

    /// # Errors
    ///
    /// Fails when no item has this id.
    pub fn update_on_start(
        &mut self,
        id: EntryId,
        key: impl Into<String>,
        value: impl Into<ScalarValue>,
        is_hidden: bool,
    ) -> Result<(), EditError> {
        let item = self
            .on_start
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(EditError::UnknownEntry { id })?;
        item.key = key.into();
        item.value = value.into();
        item.is_hidden = is_hidden;
        Ok(())
    }

    /// # Errors
    ///
    /// Fails when no item has this id.
    pub fn remove_on_start(&mut self, id: EntryId) -> Result<OnStartItem, EditError> {
        let index = self
            .on_start
            .iter()
            .position(|item| item.id == id)
            .ok_or(EditError::UnknownEntry { id })?;
        Ok(self.on_start.remove(index))
    }

    #[must_use]
    pub fn choice(&self, id: EntryId) -> Option<&Choice> {
        self.choices.iter().find(|choice| choice.id == id)
    }

    pub fn choice_mut(&mut self, id: EntryId) -> Option<&mut Choice> {
        self.choices.iter_mut().find(|choice| choice.id == id)
    }
}

impl Story {
    /// Append an empty chapter titled after its new id.
    ///
    /// # Errors
    ///
    /// Fails when no chapter id is left.
    pub fn add_chapter(&mut self) -> Result<ChapterId, EditError> {
        let id = self
            .next_chapter_id()
            .ok_or(EditError::ChapterIdsExhausted)?;
        self.chapters
            .push(Chapter::new(id, format!("{NEW_CHAPTER_TITLE_PREFIX}{id}")));
        Ok(id)
    }

    /// Remove a chapter and every target pointing at it.
    ///
    /// # Errors
    ///
    /// Fails when the chapter does not exist.
    pub fn remove_chapter(&mut self, id: ChapterId) -> Result<Chapter, EditError> {
        let index = self
            .chapters
            .iter()
            .position(|chapter| chapter.id == id)
            .ok_or(EditError::UnknownChapter { id })?;
        let removed = self.chapters.remove(index);

        for choice in self
            .chapters
            .iter_mut()
            .flat_map(|chapter| chapter.choices.iter_mut())
            .filter(|choice| choice.has_target(id))
        {
            choice.targets.retain(|target| target.target_id != id);
            choice.rebalance();
        }
        Ok(removed)
    }

    /// Flag one chapter as the start and clear the flag everywhere else.
    ///
    /// # Errors
    ///
    /// Fails when the chapter does not exist.
    pub fn set_start_chapter(&mut self, id: ChapterId) -> Result<(), EditError> {
        if self.chapter(id).is_none() {
            return Err(EditError::UnknownChapter { id });
        }
        for chapter in &mut self.chapters {
            chapter.is_start_chapter = chapter.id == id;
        }
        Ok(())
    }

    /// Remove every chapter.
    pub fn clear(&mut self) {
        self.chapters.clear();
    }

    /// # Errors
    ///
    /// Fails when the chapter does not exist.
    pub fn add_choice(&mut self, chapter: ChapterId) -> Result<EntryId, EditError> {
        let chapter = self.require_chapter(chapter)?;
        let choice = Choice::new("");
        let id = choice.id;
        chapter.choices.push(choice);
        Ok(id)
    }

    /// # Errors
    ///
    /// Fails when the chapter or the choice does not exist.
    pub fn remove_choice(&mut self, chapter: ChapterId, choice: EntryId) -> Result<Choice, EditError> {
        let chapter = self.require_chapter(chapter)?;
        let index = chapter
            .choices
            .iter()
            .position(|candidate| candidate.id == choice)
            .ok_or(EditError::UnknownChoice { id: choice })?;
        Ok(chapter.choices.remove(index))
    }

    /// # Errors
    ///
    /// Fails when the chapter or the choice does not exist.
    pub fn choice_mut(&mut self, chapter: ChapterId, choice: EntryId) -> Result<&mut Choice, EditError> {
        self.require_chapter(chapter)?
            .choice_mut(choice)
            .ok_or(EditError::UnknownChoice { id: choice })
    }

    /// Add destinations to a choice. Destinations must be existing chapters.
    ///
    /// # Errors
    ///
    /// Fails when the chapter, the choice or any destination does not exist.
    pub fn add_targets(
        &mut self,
        chapter: ChapterId,
        choice: EntryId,
        targets: &[ChapterId],
    ) -> Result<usize, EditError> {
        if let Some(&missing) = targets.iter().find(|id| self.chapter(**id).is_none()) {
            return Err(EditError::UnknownChapter { id: missing });
        }
        Ok(self
            .choice_mut(chapter, choice)?
            .add_targets(targets.iter().copied()))
    }

    fn require_chapter(&mut self, id: ChapterId) -> Result<&mut Chapter, EditError> {
        self.chapter_mut(id).ok_or(EditError::UnknownChapter { id })
    }
}
