//! Interned composite types.
//!
//! A [`TypeId`] is an opaque 32-bit value. Small ids name the predefined
//! classes; ids at or above [`TypeId::NO_PREDEFINED`] index the
//! [`TypeRegistry`]. Three high bits carry the const / reference /
//! side-effect-free flags and never affect structural queries: editing flags
//! keeps the class, and `clear_flags` recovers the canonical id.

use serde::{Deserialize, Serialize};
use tack_base::{ErrorKind, ParseError, Result};

/// An interned type. Copyable; equality of ids implies equal structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeId(u32);

impl TypeId {
    pub const VOID: TypeId = TypeId(0);
    pub const CLOCK: TypeId = TypeId(1);
    pub const INT: TypeId = TypeId(2);
    pub const LOCATION: TypeId = TypeId(4);
    pub const CLOCATION: TypeId = TypeId(5);
    pub const ULOCATION: TypeId = TypeId(6);
    pub const CHANNEL: TypeId = TypeId(7);
    pub const UCHANNEL: TypeId = TypeId(8);
    pub const BCHANNEL: TypeId = TypeId(9);
    pub const UBCHANNEL: TypeId = TypeId(10);
    pub const TEMPLATE: TypeId = TypeId(11);
    pub const FUNCTION: TypeId = TypeId(12);
    pub const ARRAY: TypeId = TypeId(13);
    pub const RECORD: TypeId = TypeId(14);
    pub const NAMED: TypeId = TypeId(15);
    pub const DIFF: TypeId = TypeId(16);
    pub const INVARIANT: TypeId = TypeId(17);
    pub const GUARD: TypeId = TypeId(18);
    pub const CONSTRAINT: TypeId = TypeId(19);
    pub const PROCESS: TypeId = TypeId(20);

    /// First id assigned by the registry.
    pub const NO_PREDEFINED: u32 = 22;

    const FLAG_CONST: u32 = 1 << 30;
    const FLAG_REF: u32 = 1 << 29;
    const FLAG_SEFREE: u32 = 1 << 28;
    const FLAG_MASK: u32 = Self::FLAG_CONST | Self::FLAG_REF | Self::FLAG_SEFREE;

    pub fn is_constant(self) -> bool {
        self.0 & Self::FLAG_CONST != 0
    }

    pub fn is_reference(self) -> bool {
        self.0 & Self::FLAG_REF != 0
    }

    pub fn is_side_effect_free(self) -> bool {
        self.0 & Self::FLAG_SEFREE != 0
    }

    pub fn make_constant(self) -> TypeId {
        TypeId(self.0 | Self::FLAG_CONST)
    }

    pub fn make_reference(self) -> TypeId {
        TypeId(self.0 | Self::FLAG_REF)
    }

    pub fn make_side_effect_free(self) -> TypeId {
        TypeId(self.0 | Self::FLAG_SEFREE)
    }

    pub fn clear_reference(self) -> TypeId {
        TypeId(self.0 & !Self::FLAG_REF)
    }

    /// The flagless canonical id.
    pub fn clear_flags(self) -> TypeId {
        TypeId(self.0 & !Self::FLAG_MASK)
    }

    /// Registry slot, if this id is not predefined.
    fn slot(self) -> Option<usize> {
        let raw = self.0 & !Self::FLAG_MASK;
        if raw >= Self::NO_PREDEFINED {
            Some((raw - Self::NO_PREDEFINED) as usize)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TypeEntry {
    class: TypeId,
    range: Option<(i32, i32)>,
    /// (element, size) for arrays; (domain, range) for functions;
    /// (body, void) for templates; (aliased, void) for named types.
    subtype: (TypeId, TypeId),
    record: Option<Vec<(String, TypeId)>>,
}

impl TypeEntry {
    fn new(class: TypeId) -> Self {
        Self {
            class,
            range: None,
            subtype: (TypeId::VOID, TypeId::VOID),
            record: None,
        }
    }
}

/// The table of constructed composite types.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeRegistry {
    entries: Vec<TypeEntry>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, entry: TypeEntry) -> TypeId {
        let id = TypeId(TypeId::NO_PREDEFINED + self.entries.len() as u32);
        self.entries.push(entry);
        id
    }

    fn entry(&self, id: TypeId) -> Option<&TypeEntry> {
        id.slot().and_then(|slot| self.entries.get(slot))
    }

    /// True if the id names a predefined class or a live registry entry.
    pub fn is_valid(&self, id: TypeId) -> bool {
        match id.slot() {
            Some(slot) => slot < self.entries.len(),
            None => id.clear_flags().0 <= TypeId::PROCESS.0,
        }
    }

    /// A bounded integer with the given inclusive range.
    pub fn add_integer(&mut self, lo: i32, hi: i32) -> TypeId {
        let mut entry = TypeEntry::new(TypeId::INT);
        entry.range = Some((lo, hi));
        self.intern(entry)
    }

    /// An array indexed by `size` (an integer or scalar type) holding
    /// `element` values.
    pub fn add_array(&mut self, size: TypeId, element: TypeId) -> Result<TypeId> {
        if !self.is_valid(size) || !self.is_valid(element) {
            return Err(ParseError::new(
                ErrorKind::BadType,
                "invalid component type in array construction",
            ));
        }
        let mut entry = TypeEntry::new(TypeId::ARRAY);
        entry.subtype = (element, size);
        Ok(self.intern(entry))
    }

    /// A record with the given ordered fields.
    pub fn add_record(&mut self, fields: Vec<(String, TypeId)>) -> Result<TypeId> {
        for (i, (name, ty)) in fields.iter().enumerate() {
            if !self.is_valid(*ty) {
                return Err(ParseError::new(
                    ErrorKind::BadType,
                    format!("invalid type for field '{}'", name),
                ));
            }
            if fields[..i].iter().any(|(other, _)| other == name) {
                return Err(ParseError::new(
                    ErrorKind::BadType,
                    format!("duplicate field '{}' in structure", name),
                ));
            }
        }
        let mut entry = TypeEntry::new(TypeId::RECORD);
        entry.record = Some(fields);
        Ok(self.intern(entry))
    }

    /// A function from `domain` (the record of formal parameters) to `range`.
    pub fn add_function(&mut self, domain: TypeId, range: TypeId) -> TypeId {
        let mut entry = TypeEntry::new(TypeId::FUNCTION);
        entry.subtype = (domain, range);
        self.intern(entry)
    }

    /// A template type; `body` is the record of formal parameters.
    pub fn add_template(&mut self, body: TypeId) -> TypeId {
        let mut entry = TypeEntry::new(TypeId::TEMPLATE);
        entry.subtype = (body, TypeId::VOID);
        self.intern(entry)
    }

    /// A named alias for `aliased`.
    pub fn add_named(&mut self, aliased: TypeId) -> TypeId {
        let mut entry = TypeEntry::new(TypeId::NAMED);
        entry.subtype = (aliased, TypeId::VOID);
        self.intern(entry)
    }

    /// The class of a type, ignoring flags. Location and channel variants
    /// fold onto their base class; other predefined ids are their own class.
    pub fn class(&self, id: TypeId) -> TypeId {
        if let Some(entry) = self.entry(id) {
            return entry.class;
        }
        match id.clear_flags() {
            TypeId::CLOCATION | TypeId::ULOCATION => TypeId::LOCATION,
            TypeId::UCHANNEL | TypeId::BCHANNEL | TypeId::UBCHANNEL => TypeId::CHANNEL,
            other => other,
        }
    }

    /// The recorded range of a bounded integer.
    pub fn integer_range(&self, id: TypeId) -> Option<(i32, i32)> {
        self.entry(id).and_then(|e| e.range)
    }

    /// The ordered fields of a record.
    pub fn record(&self, id: TypeId) -> Option<&[(String, TypeId)]> {
        self.entry(id).and_then(|e| e.record.as_deref())
    }

    /// Array element, function domain, template body, or aliased type.
    pub fn first_sub_type(&self, id: TypeId) -> TypeId {
        self.entry(id).map_or(TypeId::VOID, |e| e.subtype.0)
    }

    /// Array size type or function range; void for templates and aliases.
    pub fn second_sub_type(&self, id: TypeId) -> TypeId {
        self.entry(id).map_or(TypeId::VOID, |e| e.subtype.1)
    }

    /// Follows named aliases down to the underlying type.
    pub fn unalias(&self, id: TypeId) -> TypeId {
        let mut ty = id.clear_flags();
        while self.class(ty) == TypeId::NAMED {
            ty = self.first_sub_type(ty).clear_flags();
        }
        ty
    }
}
