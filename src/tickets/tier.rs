// © 2024-2025 ElementalAlchemist and the Dainsleif Mains Development Team
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// A trade value band a ticket can be opened for
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Tier {
	pub key: &'static str,
	pub label: &'static str,
	pub description: &'static str,
}

pub const TIERS: [Tier; 4] = [
	Tier {
		key: "t1",
		label: "0–150M Trade Value",
		description: "$1–30 USD",
	},
	Tier {
		key: "t2",
		label: "150M–500M Trade Value",
		description: "$30–60 USD",
	},
	Tier {
		key: "t3",
		label: "500M–1B Trade Value",
		description: "$60–100 USD",
	},
	Tier {
		key: "t4",
		label: "OG Trade Value",
		description: "$100+ USD",
	},
];

pub fn find_tier(key: &str) -> Option<&'static Tier> {
	TIERS.iter().find(|tier| tier.key == key)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn tiers_are_looked_up_by_exact_key() {
		assert_eq!(find_tier("t3").map(|tier| tier.label), Some("500M–1B Trade Value"));
		assert_eq!(find_tier("T3"), None);
		assert_eq!(find_tier("t5"), None);
	}
}
