//! Ordered scope lists as reported by the platform and requested in install URLs.

// crates.io
use serde::{Deserializer, Serializer, de::Error as DeError, ser::SerializeSeq};
// self
use crate::_prelude::*;

/// Errors emitted when validating scopes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum ScopeValidationError {
	/// Empty scope entries are not allowed.
	#[error("Scope entries cannot be empty.")]
	Empty,
	/// Scopes cannot contain embedded whitespace or commas.
	#[error("Scope contains a delimiter: {scope}.")]
	ContainsDelimiter {
		/// The offending scope string.
		scope: String,
	},
}

/// Ordered list of OAuth scopes.
///
/// The platform reports scopes as a comma-delimited string and the order is preserved as
/// received; duplicates are kept because set semantics are never relied upon. Install URLs
/// render the list back with `,` as the delimiter.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ScopeList(Vec<String>);
impl ScopeList {
	/// Creates a scope list from any iterator, validating each entry.
	pub fn new<I, S>(scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut list = Vec::new();

		for scope in scopes {
			let owned: String = scope.into();

			validate(&owned)?;
			list.push(owned);
		}

		Ok(Self(list))
	}

	/// Parses a comma- or whitespace-delimited scope string (`"chat:write,commands"`).
	///
	/// Empty segments are skipped so trailing commas and `", "` separators are tolerated.
	pub fn parse_delimited(raw: &str) -> Self {
		Self(
			raw.split(|c: char| c == ',' || c.is_whitespace())
				.filter(|segment| !segment.is_empty())
				.map(str::to_owned)
				.collect(),
		)
	}

	/// Number of scopes.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true if no scopes are defined.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Returns true if the list contains the provided scope.
	pub fn contains(&self, scope: &str) -> bool {
		self.0.iter().any(|candidate| candidate == scope)
	}

	/// Iterator over scopes in their original order.
	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.0.iter().map(String::as_str)
	}

	/// Joins the scopes with `,`, the form used by install URLs.
	pub fn to_comma_separated(&self) -> String {
		self.0.join(",")
	}

	/// Returns the underlying slice of scope strings.
	pub fn as_slice(&self) -> &[String] {
		&self.0
	}
}
impl Debug for ScopeList {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ScopeList").field(&self.0).finish()
	}
}
impl Display for ScopeList {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.to_comma_separated())
	}
}
impl FromStr for ScopeList {
	type Err = ScopeValidationError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if !s.is_empty() && s.chars().all(|c| c == ',' || c.is_whitespace()) {
			return Err(ScopeValidationError::Empty);
		}

		Ok(Self::parse_delimited(s))
	}
}
impl TryFrom<Vec<String>> for ScopeList {
	type Error = ScopeValidationError;

	fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
		Self::new(value)
	}
}

impl Serialize for ScopeList {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut seq = serializer.serialize_seq(Some(self.0.len()))?;

		for scope in &self.0 {
			seq.serialize_element(scope)?;
		}

		seq.end()
	}
}
impl<'de> Deserialize<'de> for ScopeList {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let values = <Vec<String>>::deserialize(deserializer)?;

		ScopeList::new(values).map_err(DeError::custom)
	}
}

fn validate(scope: &str) -> Result<(), ScopeValidationError> {
	if scope.is_empty() {
		return Err(ScopeValidationError::Empty);
	}
	if scope.chars().any(|c| c == ',' || c.is_whitespace()) {
		return Err(ScopeValidationError::ContainsDelimiter { scope: scope.to_owned() });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn parse_preserves_order_and_duplicates() {
		let scopes = ScopeList::parse_delimited("commands,chat:write,commands");

		assert_eq!(scopes.iter().collect::<Vec<_>>(), vec!["commands", "chat:write", "commands"]);
		assert_eq!(scopes.to_comma_separated(), "commands,chat:write,commands");
	}

	#[test]
	fn parse_tolerates_mixed_delimiters() {
		let scopes = ScopeList::parse_delimited("channels:read, chat:write  users:read,");

		assert_eq!(scopes.len(), 3);
		assert!(scopes.contains("users:read"));
		assert!(ScopeList::parse_delimited("").is_empty());
	}

	#[test]
	fn from_str_rejects_delimiter_only_input() {
		assert!(ScopeList::from_str("").is_ok(), "Empty string represents an empty list.");
		assert_eq!(ScopeList::from_str(" , "), Err(ScopeValidationError::Empty));
	}

	#[test]
	fn new_rejects_embedded_delimiters() {
		assert!(matches!(
			ScopeList::new(["chat:write,commands"]),
			Err(ScopeValidationError::ContainsDelimiter { .. })
		));
		assert_eq!(ScopeList::new([""]), Err(ScopeValidationError::Empty));
	}

	#[test]
	fn serde_uses_json_arrays() {
		let scopes = ScopeList::new(["bot"]).expect("Scope fixture should be valid.");
		let payload = serde_json::to_string(&scopes).expect("Scopes should serialize.");

		assert_eq!(payload, "[\"bot\"]");
		assert!(serde_json::from_str::<ScopeList>("[\"a b\"]").is_err());
	}
}
