//! Incremental parsing of compound field paths

use crate::schema::ColumnType;

/// Consumes a dotted path (`a.b.c`) one segment at a time while the planner
/// descends nested schemas
#[derive(Debug, Clone)]
pub struct PathCursor<'a> {
    path: &'a str,
    rest: Option<&'a str>,
}

impl<'a> PathCursor<'a> {
    pub fn new(path: &'a str) -> Self {
        PathCursor {
            path,
            rest: Some(path),
        }
    }

    /// The full path being resolved
    pub fn path(&self) -> &'a str {
        self.path
    }

    /// Consume and return the next segment
    pub fn advance(&mut self) -> Option<&'a str> {
        let rest = self.rest?;
        match rest.split_once('.') {
            Some((segment, tail)) => {
                self.rest = Some(tail);
                Some(segment)
            }
            None => {
                self.rest = None;
                Some(rest)
            }
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.rest.is_none()
    }

    /// Type declared for the segment just consumed: `Record` when the path
    /// descends further, otherwise the wildcard, or `Map` when a key set was
    /// requested for this path.
    pub fn declared(&self, keyed: bool) -> ColumnType {
        match (self.is_exhausted(), keyed) {
            (false, _) => ColumnType::Record,
            (true, true) => ColumnType::Map,
            (true, false) => ColumnType::Any,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segments_and_declared_types() {
        let mut cursor = PathCursor::new("a.b.c");

        assert_eq!(cursor.advance(), Some("a"));
        assert_eq!(cursor.declared(false), ColumnType::Record);
        assert_eq!(cursor.advance(), Some("b"));
        assert_eq!(cursor.advance(), Some("c"));
        assert_eq!(cursor.declared(false), ColumnType::Any);
        assert_eq!(cursor.declared(true), ColumnType::Map);
        assert_eq!(cursor.advance(), None);
        assert_eq!(cursor.path(), "a.b.c");
    }

    #[test]
    fn test_trailing_dot_yields_empty_segment() {
        let mut cursor = PathCursor::new("a.");
        assert_eq!(cursor.advance(), Some("a"));
        assert_eq!(cursor.declared(false), ColumnType::Record);
        assert_eq!(cursor.advance(), Some(""));
        assert!(cursor.is_exhausted());
    }
}
