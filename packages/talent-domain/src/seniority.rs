use std::{
	fmt::{Display, Formatter},
	str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::Error;

/// Career level with a fixed total order. Ordinals are stable and used for threshold math.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SeniorityLevel {
	Intern,
	Junior,
	Mid,
	Senior,
	Lead,
	Principal,
	Staff,
}
impl SeniorityLevel {
	pub const ALL: [Self; 7] =
		[Self::Intern, Self::Junior, Self::Mid, Self::Senior, Self::Lead, Self::Principal, Self::Staff];

	pub fn ordinal(self) -> u32 {
		match self {
			Self::Intern => 0,
			Self::Junior => 1,
			Self::Mid => 2,
			Self::Senior => 3,
			Self::Lead => 4,
			Self::Principal => 5,
			Self::Staff => 6,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Intern => "Intern",
			Self::Junior => "Junior",
			Self::Mid => "Mid",
			Self::Senior => "Senior",
			Self::Lead => "Lead",
			Self::Principal => "Principal",
			Self::Staff => "Staff",
		}
	}

	/// Exact, case-sensitive label lookup. Metadata with other spellings is treated as missing.
	pub fn from_label(label: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|level| level.as_str() == label)
	}

	/// Labels of this level and every level above it, lowest first.
	pub fn at_or_above(self) -> impl Iterator<Item = Self> {
		Self::ALL.into_iter().filter(move |level| *level >= self)
	}
}
impl Display for SeniorityLevel {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}
impl FromStr for SeniorityLevel {
	type Err = Error;

	fn from_str(label: &str) -> Result<Self, Self::Err> {
		Self::from_label(label).ok_or_else(|| Error::UnknownSeniority { label: label.to_string() })
	}
}

#[cfg(test)]
mod tests {
	use super::SeniorityLevel;

	#[test]
	fn ordinals_follow_declaration_order() {
		let ordinals: Vec<u32> = SeniorityLevel::ALL.iter().map(|level| level.ordinal()).collect();

		assert_eq!(ordinals, vec![0, 1, 2, 3, 4, 5, 6]);
		assert!(SeniorityLevel::Lead > SeniorityLevel::Senior);
	}

	#[test]
	fn labels_are_case_sensitive() {
		assert_eq!(SeniorityLevel::from_label("Senior"), Some(SeniorityLevel::Senior));
		assert_eq!(SeniorityLevel::from_label("senior"), None);
		assert!("SENIOR".parse::<SeniorityLevel>().is_err());
	}

	#[test]
	fn at_or_above_includes_the_level_itself() {
		let labels: Vec<&str> =
			SeniorityLevel::Lead.at_or_above().map(SeniorityLevel::as_str).collect();

		assert_eq!(labels, vec!["Lead", "Principal", "Staff"]);
	}
}
