// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Schema nodes for the configuration-driven data engine.
//!
//! Every record type handled by the stack — SHIP handshake messages, SPINE
//! datagrams, function payloads, selectors, element masks — is described by
//! an immutable tree of [`DataCfg`] nodes. The engine operations in
//! [`crate::data::ops`] and [`crate::data::json`] interpret these tables;
//! no record type carries its own serialisation code.

/// Field is part of the record's identity (drives identifier matching and
/// keyed list merging).
pub const FLAG_IDENTIFIER: u8 = 0x01;
/// Field must not be overwritten by remote writes.
pub const FLAG_READ_ONLY: u8 = 0x02;

/// Name <-> value mapping for enumeration kinds.
pub struct EnumTable {
    /// Table name, for diagnostics only.
    pub name: &'static str,
    /// `(json name, value)` pairs.
    pub entries: &'static [(&'static str, u32)],
}

impl EnumTable {
    /// Look up the value for a JSON name.
    pub fn value_of(&self, name: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }

    /// Look up the JSON name for a value.
    pub fn name_of(&self, value: u32) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(n, _)| *n)
    }
}

/// The kind tag of a schema node. Selects the operation set and carries the
/// kind-specific metadata (child tables, enum mappings).
pub enum DataKind {
    /// Unsigned integers with width enforced at decode time.
    U8,
    U16,
    U32,
    U64,
    /// Signed integers with width enforced at decode time.
    I8,
    I16,
    I32,
    I64,
    Bool,
    String,
    /// Presence marker; encoded as an empty JSON array.
    Tag,
    /// String-encoded enumeration.
    Enum(&'static EnumTable),
    /// `YYYY-MM-DD`.
    Date,
    /// `HH:MM:SS[.fff][Z]`.
    Time,
    /// `[-]P[nY][nM][nD][T[nH][nM][nS]]`.
    Duration,
    /// `YYYY-MM-DDTHH:MM:SS[.fff][Z]`.
    DateTime,
    /// Duration if it parses as one, else DateTime.
    AbsoluteOrRelativeTime,
    /// Ordered children; JSON form is an array of singleton objects.
    Sequence(&'static [DataCfg]),
    /// Homogeneous JSON array; metadata is the element schema.
    List(&'static DataCfg),
    /// A named element whose sole payload is a list.
    Container(&'static DataCfg),
    /// One-of alternatives, selected by element name.
    Choice(&'static [DataCfg]),
    /// A choice appearing at message root.
    ChoiceRoot(&'static DataCfg),
    /// Accepts and produces nothing; placeholder for empty choice arms.
    Stub,
}

/// One field of a record type.
pub struct DataCfg {
    /// JSON element name. Choices use their arms' names instead.
    pub name: &'static str,
    /// `FLAG_*` bits.
    pub flags: u8,
    /// Kind tag plus kind-specific metadata.
    pub kind: DataKind,
}

impl DataCfg {
    /// Plain field.
    pub const fn new(name: &'static str, kind: DataKind) -> Self {
        Self {
            name,
            flags: 0,
            kind,
        }
    }

    /// Field flagged as identifier.
    pub const fn identifier(name: &'static str, kind: DataKind) -> Self {
        Self {
            name,
            flags: FLAG_IDENTIFIER,
            kind,
        }
    }

    /// Field flagged read-only.
    pub const fn read_only(name: &'static str, kind: DataKind) -> Self {
        Self {
            name,
            flags: FLAG_READ_ONLY,
            kind,
        }
    }

    pub fn is_identifier(&self) -> bool {
        self.flags & FLAG_IDENTIFIER != 0
    }

    pub fn is_read_only(&self) -> bool {
        self.flags & FLAG_READ_ONLY != 0
    }

    /// Sequence children, treating a container as a one-child sequence.
    pub fn children(&self) -> Option<&'static [DataCfg]> {
        match &self.kind {
            DataKind::Sequence(children) => Some(children),
            DataKind::Container(inner) => Some(std::slice::from_ref(*inner)),
            _ => None,
        }
    }

    /// The list-item schema for a list-typed function payload, walking
    /// through a container into its list.
    pub fn list_item_cfg(&self) -> Option<&'static DataCfg> {
        match &self.kind {
            DataKind::List(element) => Some(element),
            DataKind::Container(inner) => inner.list_item_cfg(),
            _ => None,
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.kind, DataKind::Sequence(_))
    }

    pub fn is_container(&self) -> bool {
        matches!(self.kind, DataKind::Container(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self.kind, DataKind::List(_))
    }

    pub fn is_stub(&self) -> bool {
        matches!(self.kind, DataKind::Stub)
    }

    /// Find a direct child by JSON name.
    pub fn child_named(&self, name: &str) -> Option<(usize, &'static DataCfg)> {
        let children = self.children()?;
        children
            .iter()
            .position(|c| c.name == name)
            .map(|i| (i, &children[i]))
    }

    /// Whether this schema (not an instance) declares identifier fields
    /// anywhere below this node. Lists consult their element schema.
    pub fn declares_identifiers(&self) -> bool {
        if self.is_identifier() {
            return true;
        }

        match &self.kind {
            DataKind::Sequence(children) => children.iter().any(|c| c.declares_identifiers()),
            DataKind::Container(inner) | DataKind::List(inner) => inner.declares_identifiers(),
            _ => false,
        }
    }

    /// Coarse kind group used for schema equality in `compare`.
    pub fn kind_group(&self) -> KindGroup {
        match &self.kind {
            DataKind::U8 | DataKind::U16 | DataKind::U32 | DataKind::U64 => KindGroup::Unsigned,
            DataKind::I8 | DataKind::I16 | DataKind::I32 | DataKind::I64 => KindGroup::Signed,
            DataKind::Bool => KindGroup::Bool,
            DataKind::String => KindGroup::String,
            DataKind::Tag => KindGroup::Tag,
            DataKind::Enum(_) => KindGroup::Enum,
            DataKind::Date => KindGroup::Date,
            DataKind::Time => KindGroup::Time,
            DataKind::Duration => KindGroup::Duration,
            DataKind::DateTime => KindGroup::DateTime,
            DataKind::AbsoluteOrRelativeTime => KindGroup::AbsoluteOrRelativeTime,
            DataKind::Sequence(_) | DataKind::Container(_) => KindGroup::Sequence,
            DataKind::List(_) => KindGroup::List,
            DataKind::Choice(_) | DataKind::ChoiceRoot(_) => KindGroup::Choice,
            DataKind::Stub => KindGroup::Stub,
        }
    }

    /// The choice arms, unwrapping a choice root.
    pub fn choice_arms(&self) -> Option<&'static [DataCfg]> {
        match &self.kind {
            DataKind::Choice(arms) => Some(arms),
            DataKind::ChoiceRoot(inner) => inner.choice_arms(),
            _ => None,
        }
    }
}

/// Kind groups: two schema nodes compare their values only when the groups
/// match before their values are compared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KindGroup {
    Unsigned,
    Signed,
    Bool,
    String,
    Tag,
    Enum,
    Date,
    Time,
    Duration,
    DateTime,
    AbsoluteOrRelativeTime,
    Sequence,
    List,
    Choice,
    Stub,
}

#[cfg(test)]
mod tests {
    use super::*;

    static COLOR_TABLE: EnumTable = EnumTable {
        name: "color",
        entries: &[("red", 0), ("green", 1), ("blue", 2)],
    };

    static POINT_CFG: [DataCfg; 2] = [
        DataCfg::identifier("x", DataKind::U32),
        DataCfg::new("y", DataKind::U32),
    ];

    #[test]
    fn test_enum_table_lookup() {
        assert_eq!(COLOR_TABLE.value_of("green"), Some(1));
        assert_eq!(COLOR_TABLE.value_of("mauve"), None);
        assert_eq!(COLOR_TABLE.name_of(2), Some("blue"));
        assert_eq!(COLOR_TABLE.name_of(7), None);
    }

    #[test]
    fn test_child_named() {
        let seq = DataCfg::new("point", DataKind::Sequence(&POINT_CFG));
        assert_eq!(seq.child_named("y").map(|(i, _)| i), Some(1));
        assert!(seq.child_named("z").is_none());
    }

    #[test]
    fn test_declares_identifiers() {
        let seq = DataCfg::new("point", DataKind::Sequence(&POINT_CFG));
        assert!(seq.declares_identifiers());

        static PLAIN_CFG: [DataCfg; 1] = [DataCfg::new("y", DataKind::U32)];
        let plain = DataCfg::new("plain", DataKind::Sequence(&PLAIN_CFG));
        assert!(!plain.declares_identifiers());
    }
}
