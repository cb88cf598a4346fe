use serde::{Deserialize, Serialize};

/// Daisies die once their age reaches this value.
pub const MAX_AGE: u32 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DaisyColor {
    Black,
    White,
}

impl DaisyColor {
    pub fn as_str(self) -> &'static str {
        match self {
            DaisyColor::Black => "black",
            DaisyColor::White => "white",
        }
    }
}

/// A daisy bound to one patch. Color and albedo are fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Daisy {
    age: u32,
    color: DaisyColor,
    albedo: f64,
}

impl Daisy {
    pub(crate) fn new(color: DaisyColor, albedo: f64, age: u32) -> Self {
        Self { age, color, albedo }
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn color(&self) -> DaisyColor {
        self.color
    }

    pub fn albedo(&self) -> f64 {
        self.albedo
    }

    pub(crate) fn set_age(&mut self, age: u32) {
        self.age = age;
    }

    /// Offspring share the parent's color and albedo and start at age 0.
    pub(crate) fn offspring(&self) -> Self {
        Self::new(self.color, self.albedo, 0)
    }
}

/// Live daisies keyed by flat patch index; one slot per patch.
#[derive(Debug, Clone)]
pub struct DaisyPopulation {
    slots: Vec<Option<Daisy>>,
}

impl DaisyPopulation {
    pub fn new(cell_count: usize) -> Self {
        Self {
            slots: vec![None; cell_count],
        }
    }

    pub fn is_occupied(&self, index: usize) -> bool {
        matches!(self.slots.get(index), Some(Some(_)))
    }

    pub fn get(&self, index: usize) -> Option<&Daisy> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Daisy> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    /// Place a daisy on an empty patch. Returns `false` and leaves the
    /// population untouched when the patch is occupied or out of range.
    pub(crate) fn insert(&mut self, index: usize, daisy: Daisy) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) if slot.is_none() => {
                *slot = Some(daisy);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn remove(&mut self, index: usize) -> Option<Daisy> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    /// Drop every daisy for which `keep` returns false; returns how many went.
    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&Daisy) -> bool) -> usize {
        let mut removed = 0;
        for slot in &mut self.slots {
            if slot.as_ref().is_some_and(|daisy| !keep(daisy)) {
                *slot = None;
                removed += 1;
            }
        }
        removed
    }

    /// Occupied patch indices with their daisies, in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Daisy)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|daisy| (index, daisy)))
    }

    /// Per-patch occupancy flags, frozen at the moment of the call.
    pub fn occupancy(&self) -> Vec<bool> {
        self.slots.iter().map(Option::is_some).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn count(&self, color: DaisyColor) -> usize {
        self.iter().filter(|(_, daisy)| daisy.color == color).count()
    }
}
