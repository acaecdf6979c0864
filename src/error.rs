use crate::CellId;

/// Error produced by a fallible rule.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("rule of cell {cell} failed")]
	Evaluation {
		cell: CellId,
		#[source]
		source: BoxError,
	},

	#[error("cell {cell} is borrowed and cannot take a new value")]
	Busy { cell: CellId },
}

impl Error {
	/// The cell where the update pass stopped.
	pub fn cell(&self) -> CellId {
		match self {
			Error::Evaluation { cell, .. } | Error::Busy { cell } => *cell,
		}
	}
}
