use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use super::easing::Easing;
use super::interpolate::Interpolate;
use crate::error::TweenError;

/// Handle to a tween owned by a [`TweenEngine`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TweenId(u64);

impl TweenId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TweenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

type UpdateFn<T, C> = Box<dyn FnMut(&T, &mut C)>;
type CompleteFn<T, C> = Box<dyn FnOnce(&T, &mut C)>;

/// Start value of a tween that has no end yet
pub struct TweenFrom<T>(T);

impl<T: Interpolate> TweenFrom<T> {
    /// Set the end value and duration, validating the end against the start
    pub fn to<C>(self, end: T, duration_ms: f64) -> Result<Tween<T, C>, TweenError> {
        if !duration_ms.is_finite() || duration_ms < 0.0 {
            return Err(TweenError::InvalidDuration(duration_ms));
        }
        self.0.check_shape(&end)?;

        Ok(Tween {
            current: self.0.clone(),
            start: self.0,
            end,
            duration_ms,
            easing: Easing::Linear,
            on_update: None,
            on_complete: None,
        })
    }
}

/// Interpolation from `start` to `end` over `duration_ms`
///
/// Callbacks receive the interpolated value and the context the engine is
/// advanced with.
pub struct Tween<T, C> {
    start: T,
    end: T,
    current: T,
    duration_ms: f64,
    easing: Easing,
    on_update: Option<UpdateFn<T, C>>,
    on_complete: Option<CompleteFn<T, C>>,
}

impl<T: Interpolate> Tween<T, ()> {
    #[allow(clippy::should_implement_trait)]
    pub fn from(start: T) -> TweenFrom<T> {
        TweenFrom(start)
    }
}

impl<T: Interpolate, C> Tween<T, C> {
    pub fn easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    /// Called with the new value on every engine update while active
    pub fn on_update(mut self, callback: impl FnMut(&T, &mut C) + 'static) -> Self {
        self.on_update = Some(Box::new(callback));
        self
    }

    /// Called once with the end value when the duration has elapsed
    pub fn on_complete(mut self, callback: impl FnOnce(&T, &mut C) + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    pub fn value(&self) -> &T {
        &self.current
    }
}

/// Object-safe view of a tween, erasing its value type
trait Animate<C> {
    fn duration_ms(&self) -> f64;
    fn sample(&mut self, progress: f64, ctx: &mut C);
    fn complete(self: Box<Self>, ctx: &mut C);
}

impl<T: Interpolate, C> Animate<C> for Tween<T, C> {
    fn duration_ms(&self) -> f64 {
        self.duration_ms
    }

    fn sample(&mut self, progress: f64, ctx: &mut C) {
        self.current = if progress >= 1.0 {
            self.end.clone()
        } else {
            self.start.interpolate(&self.end, self.easing.apply(progress))
        };
        if let Some(update) = self.on_update.as_mut() {
            update(&self.current, ctx);
        }
    }

    fn complete(mut self: Box<Self>, ctx: &mut C) {
        if let Some(complete) = self.on_complete.take() {
            complete(&self.current, ctx);
        }
    }
}

/// Where a started tween measures its progress from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StartAt {
    /// A host timestamp in milliseconds
    Time(f64),
    /// Whatever timestamp the next `update` is given
    NextUpdate,
}

impl From<f64> for StartAt {
    fn from(now_ms: f64) -> Self {
        StartAt::Time(now_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SlotState {
    Pending,
    Scheduled,
    Active { start_ms: f64 },
}

struct Slot<C> {
    tween: Box<dyn Animate<C>>,
    state: SlotState,
    next: Option<TweenId>,
}

/// Owns every tween and advances the active ones
///
/// Tweens are added as pending, started explicitly or through a chain, and
/// dropped once they complete or are stopped.
pub struct TweenEngine<C> {
    slots: HashMap<TweenId, Slot<C>>,
    active: Vec<TweenId>,
    next_id: u64,
}

impl<C> Default for TweenEngine<C> {
    fn default() -> Self {
        Self {
            slots: HashMap::new(),
            active: Vec::new(),
            next_id: 0,
        }
    }
}

impl<C: 'static> TweenEngine<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tween without starting it
    pub fn add<T: Interpolate + 'static>(&mut self, tween: Tween<T, C>) -> TweenId {
        let id = TweenId(self.next_id);
        self.next_id += 1;
        self.slots.insert(
            id,
            Slot {
                tween: Box::new(tween),
                state: SlotState::Pending,
                next: None,
            },
        );
        id
    }

    /// Start `next` when `prev` completes, replacing any earlier successor
    pub fn chain(&mut self, prev: TweenId, next: TweenId) -> Result<(), TweenError> {
        if !self.slots.contains_key(&next) {
            return Err(TweenError::UnknownTween(next.raw()));
        }
        let slot = self
            .slots
            .get_mut(&prev)
            .ok_or(TweenError::UnknownTween(prev.raw()))?;
        slot.next = Some(next);
        Ok(())
    }

    /// Activate a tween; its progress is measured from `at`
    ///
    /// [`StartAt::NextUpdate`] anchors the tween to the next `update` call,
    /// for hosts that start animations between ticks.
    pub fn start(&mut self, id: TweenId, at: impl Into<StartAt>) -> Result<(), TweenError> {
        let slot = self
            .slots
            .get_mut(&id)
            .ok_or(TweenError::UnknownTween(id.raw()))?;
        let was_active = slot.state != SlotState::Pending;
        slot.state = match at.into() {
            StartAt::Time(start_ms) => SlotState::Active { start_ms },
            StartAt::NextUpdate => SlotState::Scheduled,
        };
        if !was_active {
            self.active.push(id);
        }
        Ok(())
    }

    /// Drop a tween without firing its completion
    ///
    /// Its chained successors stay registered as pending and never start on
    /// their own; use [`TweenEngine::discard_chain`] to drop them as well.
    pub fn stop(&mut self, id: TweenId) -> bool {
        self.active.retain(|active| *active != id);
        self.slots.remove(&id).is_some()
    }

    /// Stop `id` and drop every successor reachable through its chain
    pub fn discard_chain(&mut self, id: TweenId) -> usize {
        let mut visited = HashSet::new();
        let mut removed = 0;
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if !visited.insert(current) {
                break;
            }
            cursor = match self.slots.remove(&current) {
                Some(slot) => {
                    removed += 1;
                    slot.next
                }
                None => None,
            };
        }
        self.active.retain(|active| !visited.contains(active));
        removed
    }

    /// True while the tween is pending or running
    pub fn is_alive(&self, id: TweenId) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn is_active(&self, id: TweenId) -> bool {
        self.slots
            .get(&id)
            .is_some_and(|slot| slot.state != SlotState::Pending)
    }

    pub fn successor(&self, id: TweenId) -> Option<TweenId> {
        self.slots.get(&id).and_then(|slot| slot.next)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Number of pending and active tweens
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drop every tween without firing callbacks
    pub fn clear(&mut self) {
        self.slots.clear();
        self.active.clear();
    }

    /// Advance every active tween to `now_ms`
    ///
    /// Completed tweens fire `on_complete`, are dropped, and hand over to their
    /// successor, which starts at the predecessor's scheduled end and is
    /// advanced in this same call. Returns true while tweens remain active.
    pub fn update(&mut self, now_ms: f64, ctx: &mut C) -> bool {
        let mut queue: VecDeque<TweenId> = std::mem::take(&mut self.active).into();
        let mut still_active = Vec::with_capacity(queue.len());

        while let Some(id) = queue.pop_front() {
            let Some(slot) = self.slots.get_mut(&id) else {
                continue;
            };
            let start_ms = match slot.state {
                SlotState::Pending => continue,
                SlotState::Scheduled => {
                    slot.state = SlotState::Active { start_ms: now_ms };
                    now_ms
                }
                SlotState::Active { start_ms } => start_ms,
            };
            if now_ms < start_ms {
                still_active.push(id);
                continue;
            }

            let duration = slot.tween.duration_ms();
            let progress = if duration <= 0.0 {
                1.0
            } else {
                ((now_ms - start_ms) / duration).min(1.0)
            };
            slot.tween.sample(progress, ctx);

            if progress < 1.0 {
                still_active.push(id);
                continue;
            }

            if let Some(done) = self.slots.remove(&id) {
                done.tween.complete(ctx);
                if let Some(next) = done.next {
                    if let Some(successor) = self.slots.get_mut(&next) {
                        if successor.state == SlotState::Pending {
                            successor.state = SlotState::Active {
                                start_ms: start_ms + duration,
                            };
                            queue.push_back(next);
                        }
                    }
                }
            }
        }

        self.active = still_active;
        !self.active.is_empty()
    }
}
