use std::fmt::{self, Debug};

use crate::BoxError;

/// What a cell evaluates to.
pub enum Rule<T> {
	Constant(T),
	Derivation(Box<dyn Fn() -> T>),
	Fallible(Box<dyn Fn() -> Result<T, BoxError>>),
}

impl<T> Rule<T> {
	pub fn constant(value: T) -> Self {
		Rule::Constant(value)
	}

	pub fn derive(func: impl Fn() -> T + 'static) -> Self {
		Rule::Derivation(Box::new(func))
	}

	pub fn try_derive(func: impl Fn() -> Result<T, BoxError> + 'static) -> Self {
		Rule::Fallible(Box::new(func))
	}

	pub fn is_constant(&self) -> bool {
		matches!(self, Rule::Constant(_))
	}

	pub(crate) fn run(&self) -> Result<T, BoxError>
	where
		T: Clone,
	{
		match self {
			Rule::Constant(value) => Ok(value.clone()),
			Rule::Derivation(func) => Ok(func()),
			Rule::Fallible(func) => func(),
		}
	}
}

impl<T> From<T> for Rule<T> {
	fn from(value: T) -> Self {
		Rule::Constant(value)
	}
}

impl<T> Debug for Rule<T>
where
	T: Debug,
{
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Rule::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
			Rule::Derivation(_) => f.write_str("Derivation(..)"),
			Rule::Fallible(_) => f.write_str("Fallible(..)"),
		}
	}
}
