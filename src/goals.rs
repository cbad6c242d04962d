//! Savings goals and how far along they are

use std::{collections::BTreeMap, fmt::Display};

use chrono::NaiveDate;
use log::info;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{errors::Error, money::Cents, validation::sanitize_text};

/// Days counted as one month when estimating the time left to a deadline
const DAYS_PER_MONTH: i64 = 30;

/// Unique identifier for a goal
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GoalId(u32);

impl From<u32> for GoalId {
    fn from(goal_id: u32) -> Self {
        Self(goal_id)
    }
}

impl Display for GoalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "goal[{}]", self.0)
    }
}

/// An amount to put aside by a deadline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub(crate) id: GoalId,
    pub(crate) name: String,
    pub(crate) category: String,
    /// Always positive
    pub(crate) target_amount: Cents,
    /// Never negative
    pub(crate) current_amount: Cents,
    pub(crate) deadline: NaiveDate,
}

impl Goal {
    /// Creates a goal.
    /// # Errors
    /// [`Error::InvalidArgument`] for a blank name, a target that is not positive or a negative
    /// saved amount
    pub fn new(
        id: GoalId,
        name: &str,
        category: &str,
        target_amount: Cents,
        current_amount: Cents,
        deadline: NaiveDate,
    ) -> Result<Self, Error> {
        let name = sanitize_text(name);
        if name.is_empty() {
            return Err(Error::InvalidArgument("goal name is required".into()));
        }
        if target_amount <= Cents::ZERO {
            return Err(Error::InvalidArgument(format!(
                "goal target must be positive, got {target_amount}"
            )));
        }
        if current_amount.is_negative() {
            return Err(Error::InvalidArgument(format!(
                "saved amount cannot be negative, got {current_amount}"
            )));
        }
        Ok(Self {
            id,
            name,
            category: sanitize_text(category),
            target_amount,
            current_amount,
            deadline,
        })
    }

    /// Returns the unique identifier
    #[must_use]
    #[inline]
    pub fn id(&self) -> GoalId {
        self.id
    }

    /// Returns the name
    #[must_use]
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the category
    #[must_use]
    #[inline]
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Returns the amount to reach
    #[must_use]
    #[inline]
    pub fn target_amount(&self) -> Cents {
        self.target_amount
    }

    /// Returns the amount saved so far
    #[must_use]
    #[inline]
    pub fn current_amount(&self) -> Cents {
        self.current_amount
    }

    /// Returns the deadline
    #[must_use]
    #[inline]
    pub fn deadline(&self) -> NaiveDate {
        self.deadline
    }

    /// Percentage of the target saved, with two decimals, capped at 100
    #[must_use]
    pub fn progress(&self) -> Decimal {
        let saved = self.current_amount.to_decimal() * Decimal::ONE_HUNDRED
            / self.target_amount.to_decimal();
        saved.min(Decimal::ONE_HUNDRED).round_dp(2)
    }

    /// Amount still missing; zero once the target is reached
    #[must_use]
    pub fn remaining(&self) -> Cents {
        // Both amounts are non-negative, so the difference cannot overflow
        Cents::from((self.target_amount.value() - self.current_amount.value()).max(0))
    }

    /// Returns whether the target has been reached
    #[must_use]
    pub fn is_reached(&self) -> bool {
        self.current_amount >= self.target_amount
    }

    /// Whole 30-day months left until the deadline, rounded up; zero once it has passed
    #[must_use]
    pub fn months_remaining(&self, today: NaiveDate) -> u32 {
        let days = (self.deadline - today).num_days();
        if days <= 0 {
            return 0;
        }
        u32::try_from((days + DAYS_PER_MONTH - 1) / DAYS_PER_MONTH).unwrap_or(u32::MAX)
    }

    /// Adds `amount` to the saved amount; a negative amount withdraws from it.
    /// # Errors
    /// [`Error::InvalidArgument`] if the saved amount would become negative,
    /// [`Error::Overflow`] if it does not fit. The goal is unchanged on error.
    pub fn contribute(&mut self, amount: Cents) -> Result<(), Error> {
        let saved = self.current_amount.try_add(amount)?;
        if saved.is_negative() {
            return Err(Error::InvalidArgument(format!(
                "cannot withdraw {amount} from {}, only {} saved",
                self.id, self.current_amount
            )));
        }
        self.current_amount = saved;
        Ok(())
    }

    /// Changes the target amount.
    /// # Errors
    /// [`Error::InvalidArgument`] if it is not positive
    pub fn set_target(&mut self, target_amount: Cents) -> Result<(), Error> {
        if target_amount <= Cents::ZERO {
            return Err(Error::InvalidArgument(format!(
                "goal target must be positive, got {target_amount}"
            )));
        }
        self.target_amount = target_amount;
        Ok(())
    }

    /// Moves the deadline
    pub fn set_deadline(&mut self, deadline: NaiveDate) {
        self.deadline = deadline;
    }
}

/// An interface to all goals
pub trait GoalBook
where
    for<'a> &'a Self: IntoIterator<Item = &'a Goal>,
    Self: Sized,
{
    /// Fetches a goal by ID, if one exists
    fn goal(&self, goal_id: GoalId) -> Result<Option<&Goal>, Error>;

    /// Fetches a goal by ID for modification, if one exists
    fn goal_mut(&mut self, goal_id: GoalId) -> Result<Option<&mut Goal>, Error>;

    /// Adds a goal with the id it already carries.
    /// # Errors
    /// [`Error::DuplicateGoal`] if the id is taken
    fn insert(&mut self, goal: Goal) -> Result<(), Error>;

    /// Removes a goal, returning it.
    /// # Errors
    /// [`Error::GoalNotFound`] if there is no such goal
    fn remove(&mut self, goal_id: GoalId) -> Result<Goal, Error>;

    /// Returns an id that is not in use: one past the highest stored id
    fn next_id(&self) -> Result<GoalId, Error> {
        self.into_iter()
            .map(|goal| goal.id.0)
            .max()
            .map_or(Some(1), |last| last.checked_add(1))
            .map(GoalId)
            .ok_or_else(|| Error::InvalidArgument("no goal id left".into()))
    }

    /// Stores `goal` under a fresh id and returns that id
    fn add(&mut self, goal: Goal) -> Result<GoalId, Error> {
        let id = self.next_id()?;
        self.insert(Goal { id, ..goal })?;
        info!("Added {id}");
        Ok(id)
    }
}

/// Holds all goals in memory, ordered by id
#[derive(Default, Debug)]
pub struct MemoryGoalBook {
    pub(crate) goals: BTreeMap<GoalId, Goal>,
}

impl MemoryGoalBook {
    /// Creates a new, empty [`MemoryGoalBook`]
    #[must_use]
    pub fn new() -> Self {
        MemoryGoalBook::default()
    }

    /// Returns the number of goals
    #[must_use]
    pub fn len(&self) -> usize {
        self.goals.len()
    }

    /// Returns whether there are no goals
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }
}

impl GoalBook for MemoryGoalBook {
    fn goal(&self, goal_id: GoalId) -> Result<Option<&Goal>, Error> {
        Ok(self.goals.get(&goal_id))
    }

    fn goal_mut(&mut self, goal_id: GoalId) -> Result<Option<&mut Goal>, Error> {
        Ok(self.goals.get_mut(&goal_id))
    }

    fn insert(&mut self, goal: Goal) -> Result<(), Error> {
        if self.goals.contains_key(&goal.id) {
            return Err(Error::DuplicateGoal(goal.id));
        }
        self.goals.insert(goal.id, goal);
        Ok(())
    }

    fn remove(&mut self, goal_id: GoalId) -> Result<Goal, Error> {
        self.goals.remove(&goal_id).ok_or(Error::GoalNotFound(goal_id))
    }
}

impl<'a> IntoIterator for &'a MemoryGoalBook {
    type Item = &'a Goal;

    type IntoIter = std::collections::btree_map::Values<'a, GoalId, Goal>;

    fn into_iter(self) -> Self::IntoIter {
        self.goals.values()
    }
}

impl IntoIterator for MemoryGoalBook {
    type Item = Goal;
    type IntoIter = std::collections::btree_map::IntoValues<GoalId, Goal>;

    fn into_iter(self) -> Self::IntoIter {
        self.goals.into_values()
    }
}
