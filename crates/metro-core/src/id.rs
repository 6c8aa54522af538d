use lasso::{Spur, ThreadedRodeo};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global string interner for map identifiers.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// An interned identifier for lines, stations, transfers and rivers.
/// Internally a 4-byte `Spur` index.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(Spur);

/// Station ids are globally unique across a document.
pub type StationId = Id;
/// Line ids are unique within a section.
pub type LineId = Id;
pub type TransferId = Id;

impl Id {
    /// Intern a string as an Id, or return the existing one.
    pub fn intern(s: &str) -> Self {
        Id(INTERNER.get_or_intern(s))
    }

    /// Resolve back to a string slice.
    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// The empty id, used for entries loaded without an `id` field.
    pub fn empty() -> Self {
        Self::intern("")
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }

    /// Generate a fresh id of the form `<prefix>_<unix-millis>_<suffix>`,
    /// e.g. `transfer_1718000000000_k3f9a`.
    pub fn generate(prefix: &str) -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let millis = chrono::Utc::now().timestamp_millis();
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let suffix = base36_suffix(mix(millis as u64 ^ n.rotate_left(32)).wrapping_add(n));
        Self::intern(&format!("{prefix}_{millis}_{suffix}"))
    }
}

impl Default for Id {
    fn default() -> Self {
        Self::empty()
    }
}

/// SplitMix64 finalizer; spreads counter + clock bits over the suffix.
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn base36_suffix(mut v: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut out = String::with_capacity(5);
    for _ in 0..5 {
        out.push(DIGITS[(v % 36) as usize] as char);
        v /= 36;
    }
    out
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Self::intern(s)
    }
}

impl Serialize for Id {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Accepts strings and integers; some exported maps use numeric station ids.
struct IdVisitor;

impl Visitor<'_> for IdVisitor {
    type Value = Id;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or integer identifier")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Id, E> {
        Ok(Id::intern(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Id, E> {
        Ok(Id::intern(&v.to_string()))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Id, E> {
        Ok(Id::intern(&v.to_string()))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Id, E> {
        Ok(Id::empty())
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(IdVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = Id::intern("S1");
        let b = Id::intern("S1");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "S1");
    }

    #[test]
    fn generated_ids_are_unique_and_prefixed() {
        let a = Id::generate("transfer");
        let b = Id::generate("transfer");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("transfer_"));
        let parts: Vec<&str> = a.as_str().split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[2].len(), 5);
    }

    #[test]
    fn numeric_ids_deserialize_as_strings() {
        let id: Id = serde_json::from_str("42").unwrap();
        assert_eq!(id.as_str(), "42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"42\"");
    }
}
