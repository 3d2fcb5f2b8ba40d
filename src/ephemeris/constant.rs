use std::cmp::Ordering;

/// A named numerical constant stored in an XEPH file (e.g. `AU`, `EMRAT`).
///
/// Names are case-insensitive: equality and ordering only look at the
/// ASCII-lowercased name, never at the value.
#[derive(Debug, Clone)]
pub struct EphemerisConstant {
    pub name: String,
    pub value: f64,
}

pub type EphemerisConstantList = Vec<EphemerisConstant>;

impl EphemerisConstant {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        EphemerisConstant {
            name: name.into(),
            value,
        }
    }
}

impl PartialEq for EphemerisConstant {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl Eq for EphemerisConstant {}

impl PartialOrd for EphemerisConstant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EphemerisConstant {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_ignore_case(&self.name, &other.name)
    }
}

/// ASCII case-insensitive ordering of two names.
pub(crate) fn compare_ignore_case(a: &str, b: &str) -> Ordering {
    a.bytes()
        .map(|c| c.to_ascii_lowercase())
        .cmp(b.bytes().map(|c| c.to_ascii_lowercase()))
}

/// Binary search a name-sorted constant list.
pub(crate) fn find_constant<'a>(
    constants: &'a [EphemerisConstant],
    name: &str,
) -> Option<&'a EphemerisConstant> {
    constants
        .binary_search_by(|c| compare_ignore_case(&c.name, name))
        .ok()
        .map(|i| &constants[i])
}
