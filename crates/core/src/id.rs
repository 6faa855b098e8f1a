// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inline engine ids.
//!
//! Ids are short ASCII strings with a 4-char type prefix and a 17-char
//! nanoid payload, stored inline so task and execution keys never touch
//! the heap.

/// Inline id capacity: 4-char prefix + 17-char nanoid.
pub const ID_CAPACITY: usize = 21;

/// Returns a string slice truncated to at most `n` characters.
pub fn short(s: &str, n: usize) -> &str {
    s.get(..n).unwrap_or(s)
}

/// Fixed-size inline id storage, zero-padded. Ids never contain NUL, so
/// the first zero byte marks the end of the string.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct IdBuf([u8; ID_CAPACITY]);

impl IdBuf {
    pub fn new(s: &str) -> Self {
        debug_assert!(
            s.len() <= ID_CAPACITY,
            "id exceeds {ID_CAPACITY} bytes ({} bytes): {s:?}",
            s.len(),
        );
        debug_assert!(!s.contains('\0'), "id contains NUL: {s:?}");
        let len = s.len().min(ID_CAPACITY);
        let mut buf = [0u8; ID_CAPACITY];
        buf[..len].copy_from_slice(&s.as_bytes()[..len]);
        Self(buf)
    }

    fn len(&self) -> usize {
        self.0.iter().position(|b| *b == 0).unwrap_or(ID_CAPACITY)
    }

    pub fn as_str(&self) -> &str {
        // Invariant: only constructed from &str, always valid UTF-8.
        match std::str::from_utf8(&self.0[..self.len()]) {
            Ok(s) => s,
            Err(_) => unreachable!("IdBuf constructed from non-UTF-8"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }
}

impl std::hash::Hash for IdBuf {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        // Hash only the active bytes so it matches str::hash,
        // which is required for Borrow<str> HashMap lookups.
        self.as_str().hash(state);
    }
}

impl std::borrow::Borrow<str> for IdBuf {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Debug for IdBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self.as_str(), f)
    }
}

impl std::fmt::Display for IdBuf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl serde::Serialize for IdBuf {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for IdBuf {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // Owned String rather than &str: ids arriving in escaped JSON
        // would fail a borrowed-str deserialize.
        let s = String::deserialize(deserializer)?;
        if s.len() > ID_CAPACITY || s.contains('\0') {
            return Err(serde::de::Error::custom(format!("invalid id: {s:?}")));
        }
        Ok(IdBuf::new(&s))
    }
}

/// Define a newtype id wrapper around [`IdBuf`] with a type prefix.
///
/// The format is `{prefix}{nanoid}`: a 4-char type indicator plus a
/// 17-char random payload, exactly filling [`ID_CAPACITY`]. Generates the
/// constructors plus the `str`-flavored impls the engine relies on
/// (`Display`, `AsRef<str>`, `Borrow<str>`); parse ids with
/// `from_string`, there are no blanket `From` conversions.
///
/// ```ignore
/// define_id! {
///     /// Doc comment for the id type.
///     pub struct RunId("run-");
/// }
/// ```
#[macro_export]
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        pub struct $name:ident($prefix:literal);
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name($crate::id::IdBuf);

        impl $name {
            pub const PREFIX: &'static str = $prefix;

            /// Generate a new random id with the type prefix
            pub fn new() -> Self {
                Self($crate::id::IdBuf::new(&format!(
                    "{}{}",
                    Self::PREFIX,
                    nanoid::nanoid!(17)
                )))
            }

            /// Wrap an existing string (parsing, wire input)
            pub fn from_string(id: impl AsRef<str>) -> Self {
                Self($crate::id::IdBuf::new(id.as_ref()))
            }

            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }

            /// The random payload, without the type prefix
            pub fn suffix(&self) -> &str {
                self.as_str().strip_prefix(Self::PREFIX).unwrap_or(self.as_str())
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                self.as_str()
            }
        }
    };
}

crate::define_id! {
    /// Unique identifier for one run of a workflow.
    pub struct RunId("run-");
}

crate::define_id! {
    /// Unique identifier for a queued task (decision or activity).
    pub struct TaskId("tsk-");
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
