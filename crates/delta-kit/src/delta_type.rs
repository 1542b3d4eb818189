use core::fmt;

/// The whole-record intent carried by every delta.
///
/// `Add` and `Update` both describe a record that exists after the delta is
/// applied; they differ only in whether a reference value existed before.
/// `Delete` dominates: once a builder observes it, the record is gone until a
/// later non-delete delta revives it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum DeltaType {
    /// The record (or element) did not exist in the reference.
    Add,
    /// The record (or element) existed and some of its content changed.
    Update,
    /// The record (or element) is removed.
    Delete,
}

impl DeltaType {
    /// Returns `true` for [`DeltaType::Delete`].
    #[must_use]
    pub fn is_delete(self) -> bool {
        self == DeltaType::Delete
    }
}

impl fmt::Display for DeltaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeltaType::Add => "ADD",
            DeltaType::Update => "UPDATE",
            DeltaType::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// Intent tracking shared by every delta builder.
///
/// A builder remembers the type it was created with (`initial`) and the type
/// it currently reports (`current`). Absorbing a non-delete delta restores the
/// initial intent, except that an initial `Delete` comes back as `Update`:
///
/// | initial \ incoming | ADD    | UPDATE | DELETE |
/// |--------------------|--------|--------|--------|
/// | ADD                | ADD    | ADD    | DELETE |
/// | UPDATE             | UPDATE | UPDATE | DELETE |
/// | DELETE             | UPDATE | UPDATE | DELETE |
///
/// # Example
///
/// ```
/// use delta_kit::{DeltaType, DeltaTypeState};
///
/// let mut state = DeltaTypeState::new(DeltaType::Add);
/// state.absorb(DeltaType::Delete);
/// assert_eq!(state.current(), DeltaType::Delete);
///
/// state.absorb(DeltaType::Update);
/// assert_eq!(state.current(), DeltaType::Add);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaTypeState {
    initial: DeltaType,
    current: DeltaType,
}

impl DeltaTypeState {
    /// Start tracking with `delta_type` as both the initial and current intent.
    #[must_use]
    pub fn new(delta_type: DeltaType) -> Self {
        Self {
            initial: delta_type,
            current: delta_type,
        }
    }

    /// The intent the builder was created with.
    #[must_use]
    pub fn initial(&self) -> DeltaType {
        self.initial
    }

    /// The intent the builder currently reports.
    #[must_use]
    pub fn current(&self) -> DeltaType {
        self.current
    }

    /// Overwrite the current intent.
    pub fn set(&mut self, delta_type: DeltaType) {
        self.current = delta_type;
    }

    /// Restore the initial intent; an initial `Delete` restores to `Update`.
    pub fn reset(&mut self) {
        self.current = match self.initial {
            DeltaType::Delete => DeltaType::Update,
            other => other,
        };
    }

    /// Fold the type of an incoming delta into this state.
    pub fn absorb(&mut self, incoming: DeltaType) {
        let before = self.current;
        self.set(incoming);
        if !incoming.is_delete() {
            self.reset();
        }
        tracing::trace!(%before, %incoming, after = %self.current, "absorbed delta type");
    }
}
