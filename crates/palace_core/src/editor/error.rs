use crate::model::element::{ElementId, ElementKind};
use crate::spatial::containment::ContainmentError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from editor commands.
///
/// Placement rejections are not errors; they are reported through
/// `PlacementOutcome::Reverted`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    /// Target element is not part of this session.
    UnknownElement(ElementId),
    /// Target element exists but has the wrong kind for the command.
    WrongKind {
        id: ElementId,
        expected: ElementKind,
        actual: ElementKind,
    },
    /// A drag is already in progress for the given element.
    AlreadyDragging(ElementId),
    /// `end_drag` was called without a matching `begin_drag`.
    NotDragging,
    /// Connection would point an anchor at itself.
    SelfConnection(ElementId),
    /// Source anchor already has an outgoing connection.
    SourceAlreadyConnected(ElementId),
    /// Session data has corrupted containment.
    Containment(ContainmentError),
}

impl Display for EditorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownElement(id) => write!(f, "element not found in session: {id}"),
            Self::WrongKind {
                id,
                expected,
                actual,
            } => write!(
                f,
                "element {id} is a {}, expected a {}",
                actual.as_str(),
                expected.as_str()
            ),
            Self::AlreadyDragging(id) => write!(f, "element {id} is already being dragged"),
            Self::NotDragging => write!(f, "no drag in progress"),
            Self::SelfConnection(id) => write!(f, "anchor {id} cannot connect to itself"),
            Self::SourceAlreadyConnected(id) => {
                write!(f, "anchor {id} already has an outgoing connection")
            }
            Self::Containment(err) => write!(f, "{err}"),
        }
    }
}

impl Error for EditorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Containment(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ContainmentError> for EditorError {
    fn from(value: ContainmentError) -> Self {
        Self::Containment(value)
    }
}
