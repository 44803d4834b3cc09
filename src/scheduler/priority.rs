use std::cmp::Ordering as CmpOrdering;
use std::fmt;

/// Weight type for priority classes. Lower runs earlier.
pub type Weight = i32;

/// A named scheduling class.
///
/// The set of classes is supplied by the embedding application; the executor
/// only ever looks at [`weight`](PriorityClass::weight). Two classes with the
/// same weight are interchangeable for ordering purposes and are served in
/// submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PriorityClass {
    name: &'static str,
    weight: Weight,
}

impl PriorityClass {
    /// Class given to work submitted without an explicit class. Weighs less
    /// than any class an application would reasonably define.
    pub const UNSPECIFIED: PriorityClass = PriorityClass::new("unspecified", Weight::MAX - 1);

    pub const fn new(name: &'static str, weight: Weight) -> Self {
        Self { name, weight }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub const fn weight(&self) -> Weight {
        self.weight
    }

    /// True if `self` should be dequeued before `other`.
    pub fn precedes(&self, other: &PriorityClass) -> bool {
        self.weight < other.weight
    }
}

impl Default for PriorityClass {
    fn default() -> Self {
        PriorityClass::UNSPECIFIED
    }
}

impl PartialOrd for PriorityClass {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for PriorityClass {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.weight
            .cmp(&other.weight)
            .then_with(|| self.name.cmp(other.name))
    }
}

impl fmt::Display for PriorityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.weight)
    }
}

/// Weight of a class.
pub fn weight_of(class: &PriorityClass) -> Weight {
    class.weight()
}

/// Stock task classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskType {
    Computational,
    Io,
    Other,
}

impl TaskType {
    pub const ALL: [TaskType; 3] = [TaskType::Computational, TaskType::Io, TaskType::Other];

    pub const fn weight(self) -> Weight {
        match self {
            TaskType::Computational => 1,
            TaskType::Io => 2,
            TaskType::Other => 3,
        }
    }

    pub const fn class(self) -> PriorityClass {
        match self {
            TaskType::Computational => PriorityClass::new("computational", 1),
            TaskType::Io => PriorityClass::new("io", 2),
            TaskType::Other => PriorityClass::new("other", 3),
        }
    }
}

impl From<TaskType> for PriorityClass {
    fn from(task_type: TaskType) -> Self {
        task_type.class()
    }
}
